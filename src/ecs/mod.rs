pub mod components;
pub mod resources;
pub mod systems;

use std::sync::Arc;

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;
use crossbeam_channel::{Receiver, Sender};
use specs::prelude::{
    Builder, Component, Dispatcher, DispatcherBuilder, Entity, World, WorldExt,
};

use crate::{
    combat::formula::{DamageFormula, StandardFormula},
    config::SimConfig,
    data::{ClassDefinition, ClassId, DefinitionLookup, ItemId, NpcId, ResourceId, SpellId},
    error::SimError,
    map::{MapId, MapProvider},
    movement::{Direction, MoveRoute},
    notify::{NullNotifier, Notifier, SimEvent},
    rng::RandomSource,
    stats::{STAT_COUNT, StatKind, Stats, VITAL_COUNT, Vital, Vitals},
    status::{Statuses, dot::DotEffects},
};

use self::{
    components::{
        Appearance, CombatState, EntityKind, EntityKindTag, EventPageData, Inventory, NpcData,
        PartyId, PlayerData, Position, ResourceData, SpellBook,
    },
    resources::{ChangeSet, RegenSettings, SimClock},
    systems::{BuffExpirySystem, RegenSystem, StatusExpirySystem},
};

/// Where a new entity appears.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub map: MapId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub dir: Direction,
}

impl Placement {
    pub fn new(map: MapId, x: i32, y: i32) -> Self {
        Self {
            map,
            x,
            y,
            z: 0,
            dir: Direction::Down,
        }
    }

    pub fn facing(mut self, dir: Direction) -> Self {
        self.dir = dir;
        self
    }

    pub fn at_level(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerTemplate {
    pub name: String,
    pub class: Option<ClassId>,
    pub stats: [i32; STAT_COUNT],
    pub max_vitals: [i32; VITAL_COUNT],
    pub regen_percent: [i32; VITAL_COUNT],
    pub spells: Vec<SpellId>,
    pub party: Option<PartyId>,
}

impl PlayerTemplate {
    pub fn new(name: impl Into<String>, stats: [i32; STAT_COUNT], max_vitals: [i32; VITAL_COUNT]) -> Self {
        Self {
            name: name.into(),
            class: None,
            stats,
            max_vitals,
            regen_percent: [0; VITAL_COUNT],
            spells: Vec::new(),
            party: None,
        }
    }

    pub fn from_class(name: impl Into<String>, class: &ClassDefinition) -> Self {
        Self {
            class: Some(class.id),
            regen_percent: class.regen_percent,
            ..Self::new(name, class.base_stats, class.base_vitals)
        }
    }

    pub fn with_spells(mut self, spells: impl IntoIterator<Item = SpellId>) -> Self {
        self.spells = spells.into_iter().collect();
        self
    }

    pub fn in_party(mut self, party: PartyId) -> Self {
        self.party = Some(party);
        self
    }
}

/// Inputs queued by the network boundary and applied at the start of a tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Move { entity: Entity, dir: Direction },
    Face { entity: Entity, dir: Direction },
    Attack { entity: Entity, target: Entity },
    Cast { entity: Entity, slot: usize, target: Option<Entity> },
    Block { entity: Entity, blocking: bool },
}

/// The authoritative simulation: entity store, map index and tick driver.
pub struct SimWorld {
    pub(crate) ecs: World,
    dispatcher: Dispatcher<'static, 'static>,
    pub(crate) maps: Box<dyn MapProvider>,
    defs: Arc<dyn DefinitionLookup>,
    pub(crate) formula: Box<dyn DamageFormula>,
    notifier: Box<dyn Notifier>,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) config: SimConfig,
    intent_tx: Sender<Intent>,
    intent_rx: Receiver<Intent>,
    now: u64,
    pub tick: u64,
}

impl SimWorld {
    pub fn new(
        config: SimConfig,
        maps: impl MapProvider + 'static,
        defs: impl DefinitionLookup + 'static,
    ) -> Result<Self, SimError> {
        config.validate()?;

        let mut ecs = World::new();
        Self::register_components(&mut ecs);
        ecs.insert(SimClock::default());
        ecs.insert(RegenSettings {
            interval_ms: config.regen_interval_ms,
        });
        ecs.insert(ChangeSet::default());

        let dispatcher = DispatcherBuilder::new()
            .with(BuffExpirySystem, "buff_expiry", &[])
            .with(StatusExpirySystem, "status_expiry", &[])
            .with(RegenSystem, "regen", &[])
            .build();
        let (intent_tx, intent_rx) = crossbeam_channel::unbounded();

        Ok(Self {
            ecs,
            dispatcher,
            maps: Box::new(maps),
            defs: Arc::new(defs),
            formula: Box::new(StandardFormula),
            notifier: Box::new(NullNotifier),
            rng: Box::new(RandomNumberGenerator::seeded(0x51ec5ead)),
            config,
            intent_tx,
            intent_rx,
            now: 0,
            tick: 0,
        })
    }

    fn register_components(ecs: &mut World) {
        ecs.register::<Position>();
        ecs.register::<EntityKind>();
        ecs.register::<Stats>();
        ecs.register::<Vitals>();
        ecs.register::<Statuses>();
        ecs.register::<DotEffects>();
        ecs.register::<CombatState>();
        ecs.register::<SpellBook>();
        ecs.register::<Inventory>();
        ecs.register::<Appearance>();
        ecs.register::<MoveRoute>();
    }

    pub fn with_formula(mut self, formula: impl DamageFormula + 'static) -> Self {
        self.formula = Box::new(formula);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn maps(&self) -> &dyn MapProvider {
        self.maps.as_ref()
    }

    pub fn maps_mut(&mut self) -> &mut dyn MapProvider {
        self.maps.as_mut()
    }

    pub fn definitions(&self) -> Arc<dyn DefinitionLookup> {
        Arc::clone(&self.defs)
    }

    /// Time of the last `advance`.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn intent_sender(&self) -> Sender<Intent> {
        self.intent_tx.clone()
    }

    pub fn exists(&self, entity: Entity) -> bool {
        self.ecs.is_alive(entity)
    }

    pub fn component<C: Component + Clone>(&self, entity: Entity) -> Option<C> {
        self.ecs.read_storage::<C>().get(entity).cloned()
    }

    pub fn inspect<C: Component, R>(&self, entity: Entity, read: impl FnOnce(&C) -> R) -> Option<R> {
        self.ecs.read_storage::<C>().get(entity).map(read)
    }

    pub(crate) fn update<C: Component, R>(
        &mut self,
        entity: Entity,
        write: impl FnOnce(&mut C) -> R,
    ) -> Option<R> {
        self.ecs.write_storage::<C>().get_mut(entity).map(write)
    }

    pub fn kind_tag(&self, entity: Entity) -> Option<EntityKindTag> {
        self.inspect::<EntityKind, _>(entity, EntityKind::tag)
    }

    pub fn is_dead(&self, entity: Entity) -> bool {
        self.inspect::<CombatState, _>(entity, |state| state.dead)
            .unwrap_or(true)
    }

    pub(crate) fn notify(&mut self, event: SimEvent) {
        self.notifier.notify(event);
    }

    pub(crate) fn notify_vitals(&mut self, entity: Entity) {
        if let Some(vitals) = self.component::<Vitals>(entity) {
            self.notify(SimEvent::VitalsChanged {
                entity,
                current: vitals.current_all(),
                max: vitals.max_all(),
            });
        }
    }

    pub(crate) fn notify_stats(&mut self, entity: Entity) {
        if let Some(stats) = self.inspect::<Stats, _>(entity, Stats::effective_all) {
            self.notify(SimEvent::StatsChanged { entity, stats });
        }
    }

    fn placed(&self, placement: Placement, passable: bool) -> Result<Position, SimError> {
        let map = self.maps.get(placement.map).ok_or(SimError::OutOfBounds)?;
        if !map.in_bounds(placement.point()) {
            return Err(SimError::OutOfBounds);
        }
        Ok(Position {
            map: placement.map,
            point: placement.point(),
            z: placement.z,
            dir: placement.dir,
            passable,
        })
    }

    fn register_on_map(&mut self, entity: Entity, map: MapId, kind: EntityKindTag) {
        if let Some(instance) = self.maps.get_mut(map) {
            instance.add_entity(entity);
        }
        tracing::debug!(?entity, ?kind, ?map, "entity_spawned");
        self.notify(SimEvent::Spawned { entity, kind });
    }

    pub fn spawn_player(&mut self, template: PlayerTemplate, placement: Placement) -> Result<Entity, SimError> {
        let position = self.placed(placement, false)?;
        let mut vitals = Vitals::new(template.max_vitals);
        vitals.regen_percent = template.regen_percent;
        let entity = self
            .ecs
            .create_entity()
            .with(position)
            .with(EntityKind::Player(PlayerData {
                party: template.party,
                class: template.class,
                ..PlayerData::default()
            }))
            .with(Stats::new(template.stats))
            .with(vitals)
            .with(Statuses::default())
            .with(DotEffects::default())
            .with(CombatState::default())
            .with(SpellBook::with_spells(&template.spells, self.config.max_spell_slots))
            .with(Inventory::default())
            .with(Appearance {
                name: template.name,
                ..Appearance::default()
            })
            .build();
        self.register_on_map(entity, placement.map, EntityKindTag::Player);
        Ok(entity)
    }

    /// Spawns an NPC and rolls its drop table into its inventory.
    pub fn spawn_npc(&mut self, def: NpcId, placement: Placement) -> Result<Entity, SimError> {
        let defs = self.definitions();
        let npc = defs.npc(def).ok_or(SimError::UnknownDefinition {
            kind: "npc",
            id: def.0,
        })?;
        let position = self.placed(placement, false)?;

        let mut inventory = Inventory::default();
        for drop in &npc.drops {
            if self.rng.roll_percent() <= drop.chance {
                inventory.give(drop.item, drop.quantity);
            }
        }
        let mut vitals = Vitals::new(npc.max_vitals);
        vitals.regen_percent = npc.regen_percent;

        let entity = self
            .ecs
            .create_entity()
            .with(position)
            .with(EntityKind::Npc(NpcData {
                def,
                damage_map: Default::default(),
            }))
            .with(Stats::new(npc.stats))
            .with(vitals)
            .with(Statuses::default())
            .with(DotEffects::default())
            .with(CombatState::default())
            .with(SpellBook::with_spells(&npc.spells, self.config.max_spell_slots))
            .with(inventory)
            .with(Appearance {
                name: npc.name.clone(),
                sprite: npc.sprite.clone(),
                face: String::new(),
            })
            .build();
        self.register_on_map(entity, placement.map, EntityKindTag::Npc);
        Ok(entity)
    }

    pub fn spawn_resource(&mut self, def: ResourceId, placement: Placement) -> Result<Entity, SimError> {
        let defs = self.definitions();
        let resource = defs.resource(def).ok_or(SimError::UnknownDefinition {
            kind: "resource",
            id: def.0,
        })?;
        let position = self.placed(placement, false)?;

        let mut inventory = Inventory::default();
        for drop in &resource.drops {
            inventory.give(drop.item, drop.quantity);
        }
        let entity = self
            .ecs
            .create_entity()
            .with(position)
            .with(EntityKind::Resource(ResourceData {
                def,
                walkable_before: resource.walkable_before,
                walkable_after: resource.walkable_after,
            }))
            .with(Stats::default())
            .with(Vitals::new([resource.max_health, 0]))
            .with(Statuses::default())
            .with(DotEffects::default())
            .with(CombatState::default())
            .with(inventory)
            .with(Appearance {
                name: resource.name.clone(),
                ..Appearance::default()
            })
            .build();
        self.register_on_map(entity, placement.map, EntityKindTag::Resource);
        Ok(entity)
    }

    /// Spawns a map event page. Only global, non-passable pages take part in
    /// collision.
    pub fn spawn_event_page(&mut self, placement: Placement, global: bool, passable: bool) -> Result<Entity, SimError> {
        let position = self.placed(placement, passable)?;
        let entity = self
            .ecs
            .create_entity()
            .with(position)
            .with(EntityKind::EventPage(EventPageData { global }))
            .with(CombatState::default())
            .with(Appearance::default())
            .build();
        self.register_on_map(entity, placement.map, EntityKindTag::Event);
        Ok(entity)
    }

    pub fn despawn(&mut self, entity: Entity) {
        if !self.exists(entity) {
            return;
        }
        if let Some(pos) = self.component::<Position>(entity) {
            if let Some(map) = self.maps.get_mut(pos.map) {
                map.remove_entity(entity);
                map.remove_projectile(entity);
            }
        }
        self.forget_entity(entity);
        if let Err(error) = self.ecs.delete_entity(entity) {
            tracing::warn!(?entity, %error, "despawn_failed");
            return;
        }
        self.notify(SimEvent::Despawned { entity });
    }

    /// Equips `item` (or unequips with `None`) in a player's weapon slot and
    /// applies the item's passive bonuses.
    pub fn equip(&mut self, entity: Entity, item: Option<ItemId>) -> Result<(), SimError> {
        let defs = self.definitions();
        let def = match item {
            Some(id) => Some(defs.item(id).ok_or(SimError::UnknownDefinition {
                kind: "item",
                id: id.0,
            })?),
            None => None,
        };
        let equipped = self
            .update::<EntityKind, _>(entity, |kind| match kind {
                EntityKind::Player(data) => {
                    data.weapon = item;
                    data.lifesteal_percent = def.map_or(0, |d| d.lifesteal_percent);
                    data.cooldown_reduction_percent = def.map_or(0, |d| d.cooldown_reduction_percent);
                    true
                }
                _ => false,
            })
            .unwrap_or(false);
        if !equipped {
            return Err(SimError::invalid_target(entity));
        }
        self.update::<Stats, _>(entity, |stats| {
            stats.external = def.map_or([0; STAT_COUNT], |d| d.stat_bonus);
        });
        self.notify_stats(entity);
        Ok(())
    }

    pub fn stat(&self, entity: Entity, kind: StatKind) -> i32 {
        self.inspect::<Stats, _>(entity, |stats| stats.effective(kind))
            .unwrap_or(0)
    }

    pub fn vital(&self, entity: Entity, vital: Vital) -> i32 {
        self.inspect::<Vitals, _>(entity, |vitals| vitals.get(vital))
            .unwrap_or(0)
    }

    pub fn max_vital(&self, entity: Entity, vital: Vital) -> i32 {
        self.inspect::<Vitals, _>(entity, |vitals| vitals.max(vital))
            .unwrap_or(0)
    }

    pub fn set_vital(&mut self, entity: Entity, vital: Vital, value: i32) {
        if self.update::<Vitals, _>(entity, |vitals| vitals.set(vital, value)).is_some() {
            self.notify_vitals(entity);
        }
    }

    pub fn add_vital(&mut self, entity: Entity, vital: Vital, amount: i32) {
        if self.update::<Vitals, _>(entity, |vitals| vitals.add(vital, amount)).is_some() {
            self.notify_vitals(entity);
        }
    }

    /// Subtracts `amount` after shields have had their share. Returns what
    /// reached the vital.
    pub fn sub_vital(&mut self, entity: Entity, vital: Vital, amount: i32) -> i32 {
        let pierce = self
            .update::<Statuses, _>(entity, |statuses| statuses.absorb(vital, amount))
            .unwrap_or(amount);
        if pierce != amount {
            self.notify(SimEvent::StatusesChanged { entity });
        }
        if self.update::<Vitals, _>(entity, |vitals| vitals.sub(vital, pierce)).is_some() {
            self.notify_vitals(entity);
        }
        pierce
    }

    pub fn set_max_vital(&mut self, entity: Entity, vital: Vital, value: i32) {
        let corrected = self.update::<Vitals, _>(entity, |vitals| vitals.set_max(vital, value));
        match corrected {
            Some(true) => {
                tracing::warn!(?entity, vital = vital.as_str(), value, "max_vital_corrected");
                self.notify_vitals(entity);
            }
            Some(false) => self.notify_vitals(entity),
            None => {}
        }
    }

    /// Live entities in map order, then registration order within a map.
    pub fn ordered_entities(&self) -> Vec<Entity> {
        self.maps
            .map_ids()
            .into_iter()
            .filter_map(|id| self.maps.get(id))
            .flat_map(|map| map.entities().iter().copied())
            .filter(|entity| self.exists(*entity))
            .collect()
    }

    /// Runs one simulation tick at time `now`.
    pub fn advance(&mut self, now: u64) {
        self.now = now;
        self.apply_intents(now);

        let entities = self.ordered_entities();
        for entity in &entities {
            self.complete_cast(*entity, now);
        }
        for entity in &entities {
            if self.exists(*entity) {
                self.tick_dots(*entity, now);
            }
        }

        *self.ecs.write_resource::<SimClock>() = SimClock { now };
        self.dispatcher.dispatch(&mut self.ecs);
        self.flush_changes();

        for entity in self.ordered_entities() {
            if let Err(error) = self.step_route(entity, now) {
                tracing::debug!(?entity, %error, "route_step_failed");
            }
        }
        self.advance_projectiles(now);

        self.ecs.maintain();
        self.tick = self.tick.wrapping_add(1);
    }

    fn apply_intents(&mut self, now: u64) {
        while let Ok(intent) = self.intent_rx.try_recv() {
            if let Err(error) = self.apply_intent(intent, now) {
                tracing::debug!(?intent, %error, "intent_rejected");
            }
        }
    }

    fn apply_intent(&mut self, intent: Intent, now: u64) -> Result<(), SimError> {
        match intent {
            Intent::Move { entity, dir } => {
                self.move_entity(entity, dir, now);
            }
            Intent::Face { entity, dir } => self.face(entity, dir),
            Intent::Attack { entity, target } => {
                self.try_attack(entity, target, now)?;
            }
            Intent::Cast {
                entity,
                slot,
                target,
            } => self.begin_cast(entity, slot, target, now)?,
            Intent::Block { entity, blocking } => {
                self.set_blocking(entity, blocking, now);
            }
        }
        Ok(())
    }

    fn flush_changes(&mut self) {
        let changes = std::mem::take(&mut *self.ecs.write_resource::<ChangeSet>());
        if changes.is_empty() {
            return;
        }
        for entity in changes.vitals {
            self.notify_vitals(entity);
        }
        for entity in changes.stats {
            self.notify_stats(entity);
        }
        for entity in changes.statuses {
            self.notify(SimEvent::StatusesChanged { entity });
        }
    }
}
