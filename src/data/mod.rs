pub mod items;
pub mod monsters;
pub mod spells;

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use items::{ItemDefinition, WeaponProfile};
pub use monsters::{ClassDefinition, NpcDefinition, NpcDrop, ResourceDefinition};
pub use spells::{
    CombatData, DashFlags, ProjectileDefinition, SpellDefinition, SpellKind, TargetType, WarpData,
};

macro_rules! definition_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            pub struct $name(pub u32);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}#{}", stringify!($name), self.0)
                }
            }
        )*
    };
}

definition_id!(SpellId, ItemId, NpcId, ResourceId, ProjectileId, ClassId, AnimationId);

/// Read-only access to the game database the core consumes.
pub trait DefinitionLookup: Send + Sync {
    fn spell(&self, id: SpellId) -> Option<&SpellDefinition>;
    fn item(&self, id: ItemId) -> Option<&ItemDefinition>;
    fn npc(&self, id: NpcId) -> Option<&NpcDefinition>;
    fn resource(&self, id: ResourceId) -> Option<&ResourceDefinition>;
    fn projectile(&self, id: ProjectileId) -> Option<&ProjectileDefinition>;
    fn class(&self, id: ClassId) -> Option<&ClassDefinition>;
}

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read definition pack {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("definition pack is malformed at `{path}`: {message}")]
    Parse { path: String, message: String },
    #[error("duplicate {kind} definition {id}")]
    Duplicate { kind: &'static str, id: u32 },
}

/// On-disk shape of a definition pack.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionPack {
    pub spells: Vec<SpellDefinition>,
    pub items: Vec<ItemDefinition>,
    pub npcs: Vec<NpcDefinition>,
    pub resources: Vec<ResourceDefinition>,
    pub projectiles: Vec<ProjectileDefinition>,
    pub classes: Vec<ClassDefinition>,
}

#[derive(Clone, Debug, Default)]
pub struct DefinitionTables {
    spells: BTreeMap<SpellId, SpellDefinition>,
    items: BTreeMap<ItemId, ItemDefinition>,
    npcs: BTreeMap<NpcId, NpcDefinition>,
    resources: BTreeMap<ResourceId, ResourceDefinition>,
    projectiles: BTreeMap<ProjectileId, ProjectileDefinition>,
    classes: BTreeMap<ClassId, ClassDefinition>,
}

fn index<K: Ord + Copy, V>(
    kind: &'static str,
    entries: Vec<V>,
    key: impl Fn(&V) -> K,
    raw: impl Fn(K) -> u32,
) -> Result<BTreeMap<K, V>, DefinitionError> {
    let mut table = BTreeMap::new();
    for entry in entries {
        let id = key(&entry);
        if table.insert(id, entry).is_some() {
            return Err(DefinitionError::Duplicate { kind, id: raw(id) });
        }
    }
    Ok(table)
}

impl DefinitionTables {
    pub fn from_pack(pack: DefinitionPack) -> Result<Self, DefinitionError> {
        Ok(Self {
            spells: index("spell", pack.spells, |d| d.id, |id| id.0)?,
            items: index("item", pack.items, |d| d.id, |id| id.0)?,
            npcs: index("npc", pack.npcs, |d| d.id, |id| id.0)?,
            resources: index("resource", pack.resources, |d| d.id, |id| id.0)?,
            projectiles: index("projectile", pack.projectiles, |d| d.id, |id| id.0)?,
            classes: index("class", pack.classes, |d| d.id, |id| id.0)?,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, DefinitionError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let pack: DefinitionPack = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| DefinitionError::Parse {
                path: error.path().to_string(),
                message: error.inner().to_string(),
            })?;
        Self::from_pack(pack)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn with_spell(mut self, spell: SpellDefinition) -> Self {
        self.spells.insert(spell.id, spell);
        self
    }

    pub fn with_item(mut self, item: ItemDefinition) -> Self {
        self.items.insert(item.id, item);
        self
    }

    pub fn with_npc(mut self, npc: NpcDefinition) -> Self {
        self.npcs.insert(npc.id, npc);
        self
    }

    pub fn with_resource(mut self, resource: ResourceDefinition) -> Self {
        self.resources.insert(resource.id, resource);
        self
    }

    pub fn with_projectile(mut self, projectile: ProjectileDefinition) -> Self {
        self.projectiles.insert(projectile.id, projectile);
        self
    }

    pub fn with_class(mut self, class: ClassDefinition) -> Self {
        self.classes.insert(class.id, class);
        self
    }
}

impl DefinitionLookup for DefinitionTables {
    fn spell(&self, id: SpellId) -> Option<&SpellDefinition> {
        self.spells.get(&id)
    }

    fn item(&self, id: ItemId) -> Option<&ItemDefinition> {
        self.items.get(&id)
    }

    fn npc(&self, id: NpcId) -> Option<&NpcDefinition> {
        self.npcs.get(&id)
    }

    fn resource(&self, id: ResourceId) -> Option<&ResourceDefinition> {
        self.resources.get(&id)
    }

    fn projectile(&self, id: ProjectileId) -> Option<&ProjectileDefinition> {
        self.projectiles.get(&id)
    }

    fn class(&self, id: ClassId) -> Option<&ClassDefinition> {
        self.classes.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pack_is_indexed_by_id() {
        let tables = DefinitionTables::from_json_str(
            r#"{
                "spells": [{ "id": 3, "name": "Ember" }],
                "resources": [{ "id": 1, "name": "Oak", "max_health": 20 }]
            }"#,
        )
        .expect("pack");
        assert_eq!(tables.spell(SpellId(3)).map(|s| s.name.as_str()), Some("Ember"));
        assert!(tables.spell(SpellId(4)).is_none());
        assert_eq!(tables.resource(ResourceId(1)).map(|r| r.max_health), Some(20));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let error = DefinitionTables::from_json_str(
            r#"{ "items": [{ "id": 1, "name": "a" }, { "id": 1, "name": "b" }] }"#,
        )
        .expect_err("duplicate");
        assert!(matches!(error, DefinitionError::Duplicate { kind: "item", id: 1 }));
    }
}
