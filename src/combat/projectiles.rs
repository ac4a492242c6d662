use bracket_geometry::prelude::Point;
use specs::{Builder, Entity, WorldExt};

use super::attack::AttackParams;
use crate::{
    data::{DashFlags, ProjectileDefinition, ProjectileId, SpellId},
    ecs::{
        SimWorld,
        components::{CombatState, EntityKind, EntityKindTag, Position, ProjectileData},
    },
    error::SimError,
    map::{MapAttribute, MapId, translate},
    notify::{CombatMessage, SimEvent},
};

/// What a projectile ran into on its new tile.
enum Impact {
    Entity(Entity),
    Wall,
    Clear,
}

impl SimWorld {
    /// Fires `projectile` from `owner` in its facing direction. `spell` is
    /// resolved on impact; without one the owner's weapon strikes.
    pub fn spawn_projectile(
        &mut self,
        owner: Entity,
        projectile: ProjectileId,
        spell: Option<SpellId>,
        now: u64,
    ) -> Result<Entity, SimError> {
        if self.definitions().projectile(projectile).is_none() {
            return Err(SimError::UnknownDefinition {
                kind: "projectile",
                id: projectile.0,
            });
        }
        let origin = self
            .component::<Position>(owner)
            .ok_or(SimError::UnknownEntity(owner))?;
        let item = self
            .inspect::<EntityKind, _>(owner, |kind| match kind {
                EntityKind::Player(data) => data.weapon,
                _ => None,
            })
            .flatten();

        let entity = self
            .ecs
            .create_entity()
            .with(Position {
                passable: true,
                ..origin.clone()
            })
            .with(EntityKind::Projectile(ProjectileData {
                def: projectile,
                owner,
                spell,
                item,
                dir: origin.dir,
                travelled: 0,
                next_step_at: now,
            }))
            .build();
        if let Some(map) = self.maps.get_mut(origin.map) {
            map.add_projectile(entity);
        }
        self.notify(SimEvent::ProjectileSpawned {
            projectile: entity,
            map: origin.map,
            x: origin.point.x,
            y: origin.point.y,
            dir: origin.dir,
        });
        Ok(entity)
    }

    fn projectile_data(&self, projectile: Entity) -> Option<ProjectileData> {
        self.inspect::<EntityKind, _>(projectile, |kind| match kind {
            EntityKind::Projectile(data) => Some(data.clone()),
            _ => None,
        })
        .flatten()
    }

    /// Steps every due projectile one tile and resolves what it meets.
    pub(crate) fn advance_projectiles(&mut self, now: u64) {
        let flying: Vec<Entity> = self
            .maps
            .map_ids()
            .into_iter()
            .filter_map(|id| self.maps.get(id))
            .flat_map(|map| map.projectiles().iter().copied())
            .collect();
        let defs = self.definitions();

        for projectile in flying {
            let Some(data) = self.projectile_data(projectile) else {
                continue;
            };
            if now < data.next_step_at {
                continue;
            }
            let Some(def) = defs.projectile(data.def) else {
                self.remove_projectile(projectile);
                continue;
            };
            if !self.exists(data.owner) {
                self.remove_projectile(projectile);
                continue;
            }
            self.step_projectile(projectile, &data, def, now);
        }
    }

    fn step_projectile(&mut self, projectile: Entity, data: &ProjectileData, def: &ProjectileDefinition, now: u64) {
        let Some(pos) = self.component::<Position>(projectile) else {
            return;
        };
        let Some((map, tile)) = translate(self.maps.as_ref(), pos.map, pos.point, data.dir.delta()) else {
            self.remove_projectile(projectile);
            return;
        };
        let attribute = self
            .maps
            .get(map)
            .map(|instance| instance.attribute(tile))
            .unwrap_or_default();
        let walled = match attribute {
            MapAttribute::Blocked => !def.pass.ignore_map_blocks,
            MapAttribute::ZDimension {
                blocked_level: Some(level),
                ..
            } => level == pos.z && !def.pass.ignore_z_dimension,
            _ => false,
        };
        if walled {
            self.remove_projectile(projectile);
            return;
        }

        self.relocate_projectile(projectile, pos.map, map, tile);
        let travelled = data.travelled + 1;
        self.update::<EntityKind, _>(projectile, |kind| {
            if let EntityKind::Projectile(data) = kind {
                data.travelled = travelled;
                data.next_step_at = now + def.speed_ms;
            }
        });
        self.notify(SimEvent::ProjectileMoved {
            projectile,
            map,
            x: tile.x,
            y: tile.y,
        });

        match self.impact_at(data.owner, map, tile, pos.z, def.pass) {
            Impact::Entity(victim) => {
                self.projectile_hit(projectile, victim, now);
                self.remove_projectile(projectile);
            }
            Impact::Wall => self.remove_projectile(projectile),
            Impact::Clear if travelled >= def.range => self.remove_projectile(projectile),
            Impact::Clear => {}
        }
    }

    fn relocate_projectile(&mut self, projectile: Entity, from: MapId, to: MapId, tile: Point) {
        if from != to {
            if let Some(old) = self.maps.get_mut(from) {
                old.remove_projectile(projectile);
            }
            if let Some(new) = self.maps.get_mut(to) {
                new.add_projectile(projectile);
            }
        }
        self.update::<Position, _>(projectile, |pos| {
            pos.map = to;
            pos.point = tile;
        });
    }

    /// First non-passable occupant a projectile collides with.
    fn impact_at(&self, owner: Entity, map: MapId, tile: Point, z: i32, pass: DashFlags) -> Impact {
        let Some(instance) = self.maps.get(map) else {
            return Impact::Wall;
        };
        for occupant in instance.entities() {
            if *occupant == owner {
                continue;
            }
            let Some(pos) = self.component::<Position>(*occupant) else {
                continue;
            };
            if pos.map != map || pos.point != tile || pos.z != z || pos.passable {
                continue;
            }
            let dead = self.is_dead(*occupant);
            match self.kind_tag(*occupant) {
                Some(EntityKindTag::Player | EntityKindTag::Npc) if !dead => return Impact::Entity(*occupant),
                Some(EntityKindTag::Resource) => {
                    let blocks = self
                        .inspect::<EntityKind, _>(*occupant, |kind| {
                            kind.blocks_movement_for(EntityKindTag::Projectile, dead, false)
                        })
                        .unwrap_or(false);
                    match (dead, blocks) {
                        (false, _) if !pass.ignore_active_resources => return Impact::Entity(*occupant),
                        (true, true) if !pass.ignore_dead_resources => return Impact::Wall,
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        Impact::Clear
    }

    fn projectile_hit(&mut self, projectile: Entity, victim: Entity, now: u64) {
        let Some(data) = self.projectile_data(projectile) else {
            return;
        };
        let defs = self.definitions();
        let Some(def) = defs.projectile(data.def) else {
            return;
        };

        let guarded = self
            .component::<CombatState>(victim)
            .is_some_and(|state| state.blocking)
            && self
                .component::<Position>(victim)
                .is_some_and(|pos| pos.dir == data.dir.opposite());
        if guarded {
            self.notify(SimEvent::Action {
                entity: victim,
                message: CombatMessage::Blocked,
            });
            return;
        }

        match data.spell.or(def.spell).and_then(|id| defs.spell(id)) {
            Some(spell) if spell.combat.hit_radius > 0 => {
                if let Some(at) = self.component::<Position>(victim) {
                    let splash = self.area_targets(at.map, at.point, spell.combat.hit_radius);
                    for target in splash {
                        self.try_attack_spell(data.owner, target, spell, false, now);
                    }
                }
            }
            Some(spell) => {
                self.try_attack_spell(data.owner, victim, spell, false, now);
            }
            None => {
                let params = AttackParams::from_weapon(&self.weapon_of(data.owner));
                self.attack(data.owner, victim, &params, now);
            }
        }

        let knockable = !self.is_dead(victim) && self.kind_tag(victim) != Some(EntityKindTag::Resource);
        if def.knockback > 0 && data.dir.is_cardinal() && knockable {
            self.dash(victim, def.knockback, data.dir, DashFlags::default(), now);
        }
    }

    /// Hits `entity` with any projectile already sitting on the tile it
    /// just walked onto.
    pub(crate) fn projectile_walk_in(&mut self, entity: Entity, now: u64) {
        let Some(pos) = self.component::<Position>(entity) else {
            return;
        };
        if pos.passable || !self.inspect::<EntityKind, _>(entity, EntityKind::is_combatant).unwrap_or(false) {
            return;
        }
        let waiting: Vec<Entity> = self
            .maps
            .get(pos.map)
            .map(|map| map.projectiles().to_vec())
            .unwrap_or_default();
        for projectile in waiting {
            let hit = self.component::<Position>(projectile).is_some_and(|at| at.point == pos.point && at.z == pos.z)
                && self.projectile_data(projectile).is_some_and(|data| data.owner != entity);
            if hit {
                self.projectile_hit(projectile, entity, now);
                self.remove_projectile(projectile);
                return;
            }
        }
    }

    fn remove_projectile(&mut self, projectile: Entity) {
        if let Some(pos) = self.component::<Position>(projectile) {
            if let Some(map) = self.maps.get_mut(pos.map) {
                map.remove_projectile(projectile);
            }
        }
        if self.ecs.delete_entity(projectile).is_ok() {
            self.notify(SimEvent::ProjectileRemoved { projectile });
        }
    }
}
