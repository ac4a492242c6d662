use bracket_geometry::prelude::Point;
use bracket_pathfinding::prelude::DistanceAlg;
use smallvec::SmallVec;
use specs::Entity;

use crate::{
    data::{SpellDefinition, SpellId, SpellKind, TargetType},
    ecs::{
        SimWorld,
        components::{CombatState, EntityKind, PendingCast, Position, SpellBook},
    },
    error::SimError,
    map::{MapId, translate},
    movement::Direction,
    notify::{CombatMessage, SimEvent},
    stats::{Vital, Vitals},
    status::{StatusKind, Statuses},
};

impl SimWorld {
    /// Starts casting the spell in `slot`. Instant spells resolve right away,
    /// others complete on the first tick at or after their cast time.
    pub fn begin_cast(&mut self, entity: Entity, slot: usize, target: Option<Entity>, now: u64) -> Result<(), SimError> {
        let state = self
            .component::<CombatState>(entity)
            .ok_or(SimError::UnknownEntity(entity))?;
        if state.dead {
            return Err(SimError::Incapacitated);
        }
        if state.is_casting() {
            return Err(SimError::AlreadyCasting);
        }

        let book = self
            .component::<SpellBook>(entity)
            .ok_or(SimError::EmptySlot { slot })?;
        let spell_id = book.spell_in(slot).ok_or(SimError::EmptySlot { slot })?;
        let ready_at = book.slots[slot].ready_at;
        if now < ready_at {
            return Err(SimError::OnCooldown { slot, ready_at });
        }
        let defs = self.definitions();
        let spell = defs.spell(spell_id).ok_or(SimError::UnknownSpell(spell_id))?;

        for vital in Vital::ALL {
            let cost = spell.vital_cost[vital.index()];
            if cost > 0 && self.vital(entity, vital) < cost {
                return Err(SimError::InsufficientVital { vital: vital.as_str() });
            }
        }
        let silenced = self
            .inspect::<Statuses, _>(entity, |statuses| statuses.iter().any(|s| s.kind.prevents_casting()))
            .unwrap_or(false);
        if silenced {
            return Err(SimError::Incapacitated);
        }
        if self.needs_target(spell) {
            self.check_cast_range(entity, spell, target)?;
        }

        if spell.cast_time_ms == 0 {
            return self.cast_spell(entity, spell_id, Some(slot), target, now);
        }

        let completes_at = now + spell.cast_time_ms;
        self.update::<CombatState, _>(entity, |state| {
            state.cast = Some(PendingCast {
                slot,
                spell: spell_id,
                completes_at,
            });
            state.cast_target = target;
        });
        if let (Some(animation), Some(pos)) = (spell.cast_animation, self.component::<Position>(entity)) {
            self.notify(SimEvent::Animation {
                animation,
                entity: Some(entity),
                map: pos.map,
                x: pos.point.x,
                y: pos.point.y,
            });
        }
        self.notify(SimEvent::CastStarted {
            entity,
            spell: spell_id,
            completes_at,
        });
        Ok(())
    }

    fn needs_target(&self, spell: &SpellDefinition) -> bool {
        match spell.kind {
            SpellKind::WarpTo => true,
            SpellKind::CombatSpell | SpellKind::Event => spell.combat.target == TargetType::Single,
            SpellKind::Warp | SpellKind::Dash => false,
        }
    }

    fn check_cast_range(&self, caster: Entity, spell: &SpellDefinition, target: Option<Entity>) -> Result<(), SimError> {
        let target = target.ok_or(SimError::InvalidTarget { target: None })?;
        if !self.exists(target) || self.is_dead(target) {
            return Err(SimError::invalid_target(target));
        }
        let (Some(from), Some(to)) = (self.component::<Position>(caster), self.component::<Position>(target)) else {
            return Err(SimError::invalid_target(target));
        };
        let distance = DistanceAlg::Pythagoras.distance2d(from.point, to.point);
        if from.map != to.map || distance > spell.combat.cast_range as f32 {
            return Err(SimError::invalid_target(target));
        }
        Ok(())
    }

    /// Finishes a pending cast once its time has come.
    pub(crate) fn complete_cast(&mut self, entity: Entity, now: u64) {
        let Some(state) = self.component::<CombatState>(entity) else {
            return;
        };
        let Some(pending) = state.cast.filter(|cast| cast.completes_at <= now) else {
            return;
        };
        let target = state.cast_target;
        self.update::<CombatState, _>(entity, |state| {
            state.cast = None;
            state.cast_target = None;
        });
        if state.dead {
            return;
        }
        if let Err(error) = self.cast_spell(entity, pending.spell, Some(pending.slot), target, now) {
            tracing::debug!(?entity, spell = %pending.spell, %error, "cast_failed");
        }
    }

    /// Pays the spell's costs, resolves it and starts the slot's cooldown.
    pub fn cast_spell(
        &mut self,
        entity: Entity,
        spell_id: SpellId,
        slot: Option<usize>,
        target: Option<Entity>,
        now: u64,
    ) -> Result<(), SimError> {
        let defs = self.definitions();
        let spell = defs.spell(spell_id).ok_or(SimError::UnknownSpell(spell_id))?;
        let pos = self
            .component::<Position>(entity)
            .ok_or(SimError::UnknownEntity(entity))?;

        let cost = spell.vital_cost;
        if self
            .update::<Vitals, _>(entity, |vitals| {
                for vital in Vital::ALL {
                    vitals.sub(vital, cost[vital.index()].max(0));
                }
            })
            .is_some()
            && cost.iter().any(|c| *c > 0)
        {
            self.notify_vitals(entity);
        }
        self.notify(SimEvent::SpellCast {
            entity,
            spell: spell_id,
        });
        tracing::debug!(?entity, spell = %spell_id, kind = ?spell.kind, "spell_cast");

        match spell.kind {
            SpellKind::CombatSpell | SpellKind::Event => self.cast_combat(entity, spell, target, now)?,
            SpellKind::Warp => {
                if let Some(warp) = spell.warp {
                    self.warp(entity, warp.map, Point::new(warp.x, warp.y), warp.dir, None)?;
                }
            }
            SpellKind::WarpTo => {
                let target = target.ok_or(SimError::InvalidTarget { target: None })?;
                self.area_resolve(entity, spell, (pos.map, pos.point), spell.combat.cast_range, Some(target), now);
            }
            SpellKind::Dash => {
                self.notify(SimEvent::Action {
                    entity,
                    message: CombatMessage::Dash,
                });
                self.dash(entity, spell.combat.cast_range, pos.dir, spell.dash, now);
            }
        }

        if let Some(slot) = slot {
            self.start_cooldown(entity, slot, spell.cooldown_ms, now);
        }
        Ok(())
    }

    fn cast_combat(
        &mut self,
        caster: Entity,
        spell: &SpellDefinition,
        target: Option<Entity>,
        now: u64,
    ) -> Result<(), SimError> {
        let pos = self
            .component::<Position>(caster)
            .ok_or(SimError::UnknownEntity(caster))?;
        let radius = spell.combat.hit_radius;
        match spell.combat.target {
            TargetType::SelfTarget if radius > 0 => {
                self.area_resolve(caster, spell, (pos.map, pos.point), radius, None, now);
            }
            TargetType::SelfTarget => {
                self.try_attack_spell(caster, caster, spell, false, now);
            }
            TargetType::Single => {
                let target = target.ok_or(SimError::InvalidTarget { target: None })?;
                if self.has_status(target, StatusKind::Stealth) {
                    return Err(SimError::invalid_target(target));
                }
                if radius > 0 {
                    let at = self
                        .component::<Position>(target)
                        .ok_or(SimError::invalid_target(target))?;
                    self.area_resolve(caster, spell, (at.map, at.point), radius, None, now);
                } else {
                    self.try_attack_spell(caster, target, spell, false, now);
                }
            }
            TargetType::AoE => {
                self.area_resolve(caster, spell, (pos.map, pos.point), radius, None, now);
            }
            TargetType::Projectile => {
                let projectile = spell
                    .combat
                    .projectile
                    .ok_or_else(|| SimError::invariant(format!("{} has no projectile", spell.id)))?;
                self.spawn_projectile(caster, projectile, Some(spell.id), now)?;
            }
            TargetType::OnHit => {
                self.apply_status(caster, spell, StatusKind::OnHit, spell.combat.on_hit_duration_ms, now);
                self.notify(SimEvent::Action {
                    entity: caster,
                    message: CombatMessage::Status(StatusKind::OnHit),
                });
            }
        }
        Ok(())
    }

    /// Every Player or Npc standing in the `(2r+1)` square around `center`,
    /// following map links past the edges. Each entity appears once.
    pub fn area_targets(&self, map: MapId, center: Point, radius: i32) -> SmallVec<[Entity; 8]> {
        let mut hits: SmallVec<[Entity; 8]> = SmallVec::new();
        let positions = self.ecs.read_storage::<Position>();
        let kinds = self.ecs.read_storage::<EntityKind>();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let Some((tile_map, tile)) = translate(self.maps.as_ref(), map, center, Point::new(dx, dy)) else {
                    continue;
                };
                let Some(instance) = self.maps.get(tile_map) else {
                    continue;
                };
                for entity in instance.entities() {
                    let on_tile = positions
                        .get(*entity)
                        .is_some_and(|pos| pos.map == tile_map && pos.point == tile);
                    let combatant = kinds.get(*entity).is_some_and(EntityKind::is_combatant);
                    if on_tile && combatant && !hits.contains(entity) {
                        hits.push(*entity);
                    }
                }
            }
        }
        hits
    }

    /// Applies `spell` to everything within `radius` of `center`, or only to
    /// `requested` when one is named. WarpTo spells move the caster onto the
    /// matched target before hitting it.
    fn area_resolve(
        &mut self,
        caster: Entity,
        spell: &SpellDefinition,
        (map, center): (MapId, Point),
        radius: i32,
        requested: Option<Entity>,
        now: u64,
    ) -> usize {
        let hits = self.area_targets(map, center, radius);
        let mut resolved = 0;
        for target in hits {
            if self.is_dead(target) || requested.is_some_and(|wanted| wanted != target) {
                continue;
            }
            if spell.kind == SpellKind::WarpTo {
                if let Some(at) = self.component::<Position>(target) {
                    if let Err(error) = self.warp(caster, at.map, at.point, None, Some(at.z)) {
                        tracing::debug!(?caster, %error, "warp_to_failed");
                    }
                }
            }
            if self.try_attack_spell(caster, target, spell, false, now) != super::AttackOutcome::InvalidTarget {
                resolved += 1;
            }
        }
        tracing::debug!(?caster, spell = %spell.id, resolved, "area_resolved");
        resolved
    }

    fn start_cooldown(&mut self, entity: Entity, slot: usize, cooldown_ms: u64, now: u64) {
        let reduction = self
            .inspect::<EntityKind, _>(entity, |kind| match kind {
                EntityKind::Player(data) => data.cooldown_reduction_percent.clamp(0, 100),
                _ => 0,
            })
            .unwrap_or(0);
        let cooldown = (cooldown_ms as f64 * (1.0 - f64::from(reduction) / 100.0)) as u64;
        let ready_at = now + cooldown;
        let stored = self
            .update::<SpellBook, _>(entity, |book| {
                book.slots.get_mut(slot).map(|s| s.ready_at = ready_at).is_some()
            })
            .unwrap_or(false);
        if stored && cooldown > 0 {
            self.notify(SimEvent::CooldownStarted {
                entity,
                slot,
                ready_at,
            });
        }
    }

    /// Moves `entity` to `point` on `map`, optionally overriding its facing
    /// and level.
    pub fn warp(
        &mut self,
        entity: Entity,
        map: MapId,
        point: Point,
        dir: Option<Direction>,
        z: Option<i32>,
    ) -> Result<(), SimError> {
        let in_bounds = self.maps.get(map).is_some_and(|instance| instance.in_bounds(point));
        if !in_bounds {
            return Err(SimError::OutOfBounds);
        }
        let from = self
            .component::<Position>(entity)
            .ok_or(SimError::UnknownEntity(entity))?;
        if from.map != map {
            if let Some(old) = self.maps.get_mut(from.map) {
                old.remove_entity(entity);
            }
            if let Some(new) = self.maps.get_mut(map) {
                new.add_entity(entity);
            }
        }
        let z = z.unwrap_or(from.z);
        self.update::<Position, _>(entity, |pos| {
            pos.map = map;
            pos.point = point;
            pos.z = z;
            if let Some(dir) = dir {
                pos.dir = dir;
            }
        });
        self.notify(SimEvent::Warped {
            entity,
            map,
            x: point.x,
            y: point.y,
            z,
        });
        Ok(())
    }
}
