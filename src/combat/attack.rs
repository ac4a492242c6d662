use bracket_pathfinding::prelude::DistanceAlg;
use specs::Entity;

use super::formula::{DamageInput, DamageType};
use crate::{
    data::{AnimationId, ProjectileId, SpellDefinition, SpellKind, TargetType, WeaponProfile},
    ecs::{
        SimWorld,
        components::{CombatState, EntityKind, EntityKindTag, Inventory, Position},
    },
    error::SimError,
    map::{MapItem, ZoneType},
    notify::{CombatMessage, SimEvent},
    stats::{STAT_COUNT, StatKind, Stats, Vital, Vitals},
    status::{ApplyOutcome, StatusKind, Statuses, dot::DotEffects},
};

/// Everything `attack` needs, whatever produced the hit.
#[derive(Clone, Debug, PartialEq)]
pub struct AttackParams {
    /// Health component; positive damages, negative heals.
    pub primary: i32,
    /// Mana component.
    pub secondary: i32,
    pub damage_type: DamageType,
    pub scaling_stat: StatKind,
    pub scaling: i32,
    pub crit_chance: i32,
    pub crit_multiplier: f64,
    pub animation: Option<AnimationId>,
    /// Weapon swings trigger on-hit bonus spells; spells never do.
    pub auto_attack: bool,
}

impl AttackParams {
    pub fn from_spell(spell: &SpellDefinition) -> Self {
        let combat = &spell.combat;
        Self {
            primary: combat.vital_diff[Vital::Health.index()],
            secondary: combat.vital_diff[Vital::Mana.index()],
            damage_type: combat.damage_type,
            scaling_stat: combat.scaling_stat,
            scaling: combat.scaling,
            crit_chance: combat.crit_chance,
            crit_multiplier: combat.crit_multiplier,
            animation: spell.hit_animation,
            auto_attack: false,
        }
    }

    pub fn from_weapon(weapon: &WeaponProfile) -> Self {
        Self {
            primary: weapon.damage,
            secondary: 0,
            damage_type: weapon.damage_type,
            scaling_stat: weapon.scaling_stat,
            scaling: weapon.scaling,
            crit_chance: weapon.crit_chance,
            crit_multiplier: weapon.crit_multiplier,
            animation: weapon.attack_animation,
            auto_attack: true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttackOutcome {
    InvalidTarget,
    /// Attack timer running, caster busy, or blocking.
    NotReady,
    Missed,
    /// Stopped by facing-opposed blocking.
    Blocked,
    Invulnerable,
    /// The spell only installed a status (on-hit charge, shield).
    StatusOnly,
    ProjectileFired(Entity),
    Resolved {
        /// Amount removed from (positive) or restored to (negative) health.
        primary: i32,
        secondary: i32,
        critical: bool,
        killed: bool,
    },
}

impl SimWorld {
    /// Resolves one hit of `params` from `attacker` on `target`.
    pub fn attack(&mut self, attacker: Entity, target: Entity, params: &AttackParams, now: u64) -> AttackOutcome {
        if !self.exists(target) || self.is_dead(target) || self.component::<Vitals>(target).is_none() {
            return AttackOutcome::InvalidTarget;
        }

        if !self.remove_statuses(attacker, StatusKind::Stealth).is_empty() {
            tracing::debug!(?attacker, "stealth_broken");
        }
        if self.has_status(target, StatusKind::Invulnerable) {
            self.notify(SimEvent::Action {
                entity: target,
                message: CombatMessage::Invulnerable,
            });
            self.npc_attack_cooldown(attacker, now);
            return AttackOutcome::Invulnerable;
        }

        let critical = self.rng.roll_percent() <= params.crit_chance;
        if critical {
            self.notify(SimEvent::Action {
                entity: target,
                message: CombatMessage::Critical,
            });
        }
        let attacker_stats = self
            .inspect::<Stats, _>(attacker, Stats::effective_all)
            .unwrap_or([0; STAT_COUNT]);
        let defender_stats = self
            .inspect::<Stats, _>(target, Stats::effective_all)
            .unwrap_or([0; STAT_COUNT]);

        let mut applied = [0; 2];
        for (vital, raw) in [(Vital::Health, params.primary), (Vital::Mana, params.secondary)] {
            if raw == 0 {
                continue;
            }
            let input = DamageInput {
                raw,
                damage_type: params.damage_type,
                scaling_stat: params.scaling_stat,
                scaling: params.scaling,
                crit_multiplier: if critical { params.crit_multiplier } else { 1.0 },
                attacker: attacker_stats,
                defender: defender_stats,
            };
            let mut amount = self.formula.calculate(&input);
            if raw > 0 && amount < 0 {
                amount = 0;
            }
            applied[vital.index()] = self.apply_amount(attacker, target, vital, amount, params.damage_type, now);
        }

        let primary = applied[Vital::Health.index()];
        if primary > 0 {
            self.lifesteal(attacker, target, primary);
        }

        let killed = self.vital(target, Vital::Health) <= 0;
        if killed {
            self.resolve_kill(attacker, target);
        } else {
            self.notify_vitals(target);
            self.notify_stats(target);
            if params.auto_attack {
                self.trigger_on_hit(attacker, target, now);
            }
        }
        if let (Some(animation), Some(pos)) = (params.animation, self.component::<Position>(target)) {
            self.notify(SimEvent::Animation {
                animation,
                entity: (!killed).then_some(target),
                map: pos.map,
                x: pos.point.x,
                y: pos.point.y,
            });
        }
        self.npc_attack_cooldown(attacker, now);

        AttackOutcome::Resolved {
            primary,
            secondary: applied[Vital::Mana.index()],
            critical,
            killed,
        }
    }

    /// Applies one signed formula result to `vital`; returns the signed
    /// amount that actually changed.
    fn apply_amount(
        &mut self,
        attacker: Entity,
        target: Entity,
        vital: Vital,
        amount: i32,
        damage_type: DamageType,
        now: u64,
    ) -> i32 {
        if amount > 0 {
            let dealt = self.sub_vital(target, vital, amount);
            let message = match vital {
                Vital::Health => CombatMessage::Damage {
                    amount: dealt,
                    damage_type,
                },
                Vital::Mana => CombatMessage::ManaDrain(dealt),
            };
            self.notify(SimEvent::Action {
                entity: target,
                message,
            });

            let until = now + self.config.combat_timer_ms;
            for entity in [attacker, target] {
                self.update::<CombatState, _>(entity, |state| state.combat_until = until);
            }
            if !self.remove_statuses(target, StatusKind::Sleep).is_empty() {
                tracing::debug!(entity = ?target, "woken_by_damage");
            }
            if self.kind_tag(target) == Some(EntityKindTag::Npc) && attacker != target {
                self.record_aggro(target, attacker, amount);
                self.notify_swarm(target, attacker);
            }
            return dealt;
        }

        if amount < 0 {
            let full = self
                .inspect::<Vitals, _>(target, |vitals| vitals.is_full(vital))
                .unwrap_or(true);
            if full {
                return 0;
            }
            let before = self.vital(target, vital);
            self.add_vital(target, vital, -amount);
            let restored = self.vital(target, vital) - before;
            let message = match vital {
                Vital::Health => CombatMessage::Heal(restored),
                Vital::Mana => CombatMessage::ManaRestore(restored),
            };
            self.notify(SimEvent::Action {
                entity: target,
                message,
            });
            return -restored;
        }
        0
    }

    fn lifesteal(&mut self, attacker: Entity, target: Entity, dealt: i32) {
        if self.kind_tag(target) == Some(EntityKindTag::Resource) {
            return;
        }
        let percent = self
            .inspect::<EntityKind, _>(attacker, |kind| match kind {
                EntityKind::Player(data) => data.lifesteal_percent,
                _ => 0,
            })
            .unwrap_or(0);
        let healed = dealt * percent / 100;
        if healed > 0 {
            self.add_vital(attacker, Vital::Health, healed);
        }
    }

    fn resolve_kill(&mut self, killer: Entity, victim: Entity) {
        tracing::info!(?killer, ?victim, "entity_killed");
        self.notify(SimEvent::Killed { killer, victim });

        let victim_kind = self.kind_tag(victim);
        let drop_chance = match victim_kind {
            Some(EntityKindTag::Player) => self.config.item_drop_chance,
            _ => 100,
        };
        if victim_kind == Some(EntityKindTag::Player) && self.kind_tag(killer) == Some(EntityKindTag::Player) {
            let arena = self
                .component::<Position>(killer)
                .and_then(|pos| self.maps.get(pos.map).map(|map| map.zone == ZoneType::Arena))
                .unwrap_or(false);
            if !arena {
                self.notify(SimEvent::PvpKill { killer, victim });
            }
        }
        self.die(victim, drop_chance, Some(killer));
    }

    /// Spends every on-hit charge of `attacker` against `target`.
    fn trigger_on_hit(&mut self, attacker: Entity, target: Entity, now: u64) {
        let charges = self.remove_statuses(attacker, StatusKind::OnHit);
        let defs = self.definitions();
        for charge in charges {
            if let Some(spell) = defs.spell(charge.spell) {
                self.try_attack_spell(attacker, target, spell, true, now);
            }
        }
    }

    fn npc_attack_cooldown(&mut self, attacker: Entity, now: u64) {
        if self.kind_tag(attacker) != Some(EntityKindTag::Npc) {
            return;
        }
        let time = self.movement_time_of(attacker);
        self.update::<CombatState, _>(attacker, |state| {
            state.move_at = state.move_at.max(now + time);
        });
    }

    /// Weapon profile `entity` swings with.
    pub fn weapon_of(&self, entity: Entity) -> WeaponProfile {
        let defs = self.definitions();
        let profile = self
            .inspect::<EntityKind, _>(entity, |kind| match kind {
                EntityKind::Player(data) => data
                    .weapon
                    .and_then(|item| defs.item(item))
                    .and_then(|item| item.weapon.clone())
                    .or_else(|| {
                        data.class
                            .and_then(|class| defs.class(class))
                            .and_then(|class| class.unarmed.clone())
                    }),
                EntityKind::Npc(data) => defs.npc(data.def).map(|npc| npc.weapon.clone()),
                _ => None,
            })
            .flatten();
        profile.unwrap_or_else(|| self.config.unarmed.clone())
    }

    /// True when `a` and `b` stand on the same side: the same entity,
    /// party members, or NPCs whose definitions refuse to fight.
    pub fn are_allies(&self, a: Entity, b: Entity) -> bool {
        if a == b {
            return true;
        }
        let (Some(first), Some(second)) = (self.component::<EntityKind>(a), self.component::<EntityKind>(b)) else {
            return false;
        };
        match (first, second) {
            (EntityKind::Player(x), EntityKind::Player(y)) => x.party.is_some() && x.party == y.party,
            (EntityKind::Npc(x), EntityKind::Npc(y)) => {
                let defs = self.definitions();
                match (defs.npc(x.def), defs.npc(y.def)) {
                    (Some(x), Some(y)) => !x.can_fight(y),
                    _ => true,
                }
            }
            _ => false,
        }
    }

    /// Player versus player is refused in safe zones.
    fn pvp_forbidden(&self, attacker: Entity, target: Entity) -> bool {
        if attacker == target
            || self.kind_tag(attacker) != Some(EntityKindTag::Player)
            || self.kind_tag(target) != Some(EntityKindTag::Player)
        {
            return false;
        }
        self.component::<Position>(target)
            .and_then(|pos| self.maps.get(pos.map).map(|map| map.zone == ZoneType::Safe))
            .unwrap_or(false)
    }

    /// Weapon attack on an adjacent `target`, or a shot for ranged weapons.
    pub fn try_attack(&mut self, attacker: Entity, target: Entity, now: u64) -> Result<AttackOutcome, SimError> {
        let state = self
            .component::<CombatState>(attacker)
            .ok_or(SimError::UnknownEntity(attacker))?;
        if state.dead {
            return Err(SimError::Incapacitated);
        }
        if now < state.attack_at || state.blocking || state.is_casting() {
            return Ok(AttackOutcome::NotReady);
        }

        if let Some(projectile) = self.ranged_weapon(attacker) {
            self.start_attack_timer(attacker, now);
            let shot = self.spawn_projectile(attacker, projectile, None, now)?;
            return Ok(AttackOutcome::ProjectileFired(shot));
        }

        if attacker == target || !self.exists(target) || self.is_dead(target) {
            return Err(SimError::invalid_target(target));
        }
        let (Some(from), Some(to)) = (self.component::<Position>(attacker), self.component::<Position>(target)) else {
            return Err(SimError::invalid_target(target));
        };
        let adjacent = from.map == to.map
            && from.z == to.z
            && DistanceAlg::Pythagoras.distance2d(from.point, to.point) < 1.5;
        if !adjacent {
            return Err(SimError::invalid_target(target));
        }
        let resource_target = self.kind_tag(target) == Some(EntityKindTag::Resource);
        if !resource_target && (self.are_allies(attacker, target) || self.pvp_forbidden(attacker, target)) {
            return Err(SimError::invalid_target(target));
        }
        self.start_attack_timer(attacker, now);

        let taunted_elsewhere = self.has_status(attacker, StatusKind::Taunt) && state.target != Some(target);
        let impaired = self
            .inspect::<Statuses, _>(attacker, |statuses| statuses.iter().any(|s| s.kind.causes_miss()))
            .unwrap_or(false);
        if taunted_elsewhere || impaired {
            self.notify(SimEvent::Action {
                entity: target,
                message: CombatMessage::Miss,
            });
            return Ok(AttackOutcome::Missed);
        }

        let params = AttackParams::from_weapon(&self.weapon_of(attacker));
        Ok(self.attack(attacker, target, &params, now))
    }

    fn start_attack_timer(&mut self, attacker: Entity, now: u64) {
        let attack_time = self.config.attack_time_ms(self.stat(attacker, StatKind::Speed));
        self.update::<CombatState, _>(attacker, |state| state.attack_at = now + attack_time);
        self.notify(SimEvent::Attacked {
            entity: attacker,
            cooldown_ms: attack_time,
        });
    }

    fn ranged_weapon(&self, attacker: Entity) -> Option<ProjectileId> {
        let item = self
            .inspect::<EntityKind, _>(attacker, |kind| match kind {
                EntityKind::Player(data) => data.weapon,
                _ => None,
            })
            .flatten()?;
        self.definitions().item(item).and_then(|def| def.projectile)
    }

    /// Applies `spell` from `attacker` to one `target`: friendly-fire rules,
    /// buffs, status effects, the hit itself, then any recurring effect.
    /// `on_hit_trigger` marks an on-hit charge being spent.
    pub fn try_attack_spell(
        &mut self,
        attacker: Entity,
        target: Entity,
        spell: &SpellDefinition,
        on_hit_trigger: bool,
        now: u64,
    ) -> AttackOutcome {
        if !self.exists(target)
            || self.is_dead(target)
            || self.kind_tag(target) == Some(EntityKindTag::Resource)
        {
            return AttackOutcome::InvalidTarget;
        }
        if self.has_status(attacker, StatusKind::Taunt) && self.target_of(attacker) != Some(target) {
            self.notify(SimEvent::Action {
                entity: attacker,
                message: CombatMessage::Miss,
            });
            return AttackOutcome::Missed;
        }

        let combat = &spell.combat;
        let allies = self.are_allies(attacker, target);
        let self_cast = attacker == target
            && matches!(spell.kind, SpellKind::CombatSpell | SpellKind::Event)
            && combat.target == TargetType::SelfTarget;
        let hostile = !combat.friendly && (!self_cast || on_hit_trigger);
        if hostile {
            let self_hit = attacker == target;
            let on_hit_spell = combat.effect == Some(StatusKind::OnHit);
            if (self_hit && !on_hit_spell) || (!self_hit && allies) || self.pvp_forbidden(attacker, target) {
                return AttackOutcome::InvalidTarget;
            }
        } else if !allies {
            return AttackOutcome::InvalidTarget;
        }

        let recurring = combat.hot_dot && combat.hot_dot_interval_ms > 0;
        if combat.changes_stats() {
            self.update::<Stats, _>(target, |stats| {
                for kind in StatKind::ALL {
                    let amount = combat.buff_amount(kind, stats.base(kind));
                    stats.add_buff(kind, spell.id, amount, combat.duration_ms, now);
                }
            });
            self.notify_stats(target);
        }
        if combat.effect.is_none() && (combat.changes_stats() || recurring) {
            self.apply_status(target, spell, StatusKind::Buff, combat.duration_ms, now);
        }

        if let Some(effect) = combat.effect {
            let skip = on_hit_trigger && effect == StatusKind::OnHit;
            if !skip {
                let duration = if effect == StatusKind::OnHit {
                    combat.on_hit_duration_ms
                } else {
                    combat.duration_ms
                };
                let outcome = self.apply_status(target, spell, effect, duration, now);
                if outcome != ApplyOutcome::RejectedByCleanse {
                    self.notify(SimEvent::Action {
                        entity: target,
                        message: CombatMessage::Status(effect),
                    });
                    if effect == StatusKind::Taunt {
                        self.assign_target(target, Some(attacker));
                    }
                }
                if matches!(effect, StatusKind::OnHit | StatusKind::Shield) {
                    return AttackOutcome::StatusOnly;
                }
            }
        }

        let outcome = if combat.vital_diff.iter().any(|diff| *diff != 0) {
            self.attack(attacker, target, &AttackParams::from_spell(spell), now)
        } else {
            if let (Some(animation), Some(pos)) = (spell.hit_animation, self.component::<Position>(target)) {
                self.notify(SimEvent::Animation {
                    animation,
                    entity: Some(target),
                    map: pos.map,
                    x: pos.point.x,
                    y: pos.point.y,
                });
            }
            AttackOutcome::StatusOnly
        };

        if recurring && !self.is_dead(target) {
            self.add_dot(attacker, target, spell, now);
        }
        outcome
    }

    /// Marks `entity` dead: drops loot, clears aggro pointing at it and wipes
    /// its effects. `drop_chance` is the percent chance per unbound item.
    pub fn die(&mut self, entity: Entity, drop_chance: i32, killer: Option<Entity>) {
        self.drop_items(entity, drop_chance, killer);
        self.forget_entity(entity);

        self.update::<DotEffects, _>(entity, DotEffects::clear);
        self.update::<Statuses, _>(entity, Statuses::clear);
        self.update::<Stats, _>(entity, Stats::clear_buffs);
        self.update::<CombatState, _>(entity, |state| {
            state.dead = true;
            state.cast = None;
            state.cast_target = None;
            state.target = None;
            state.blocking = false;
        });
        self.update::<EntityKind, _>(entity, |kind| {
            if let EntityKind::Npc(data) = kind {
                data.damage_map.clear();
            }
        });
        tracing::debug!(?entity, "entity_died");
        self.notify(SimEvent::Died { entity });
        self.notify_vitals(entity);
    }

    fn drop_items(&mut self, entity: Entity, drop_chance: i32, killer: Option<Entity>) {
        let Some(pos) = self.component::<Position>(entity) else {
            return;
        };
        let Some(inventory) = self.component::<Inventory>(entity) else {
            return;
        };
        let player = self.kind_tag(entity) == Some(EntityKindTag::Player);
        let defs = self.definitions();

        let mut kept = Inventory::default();
        let mut dropped = Vec::new();
        for slot in inventory.slots {
            let bound = player && defs.item(slot.item).is_some_and(|item| item.bound);
            let fails_roll = drop_chance < 100 && (drop_chance <= 0 || self.rng.roll_percent() > drop_chance);
            if bound || fails_roll {
                kept.slots.push(slot);
            } else {
                dropped.push(slot);
            }
        }
        self.update::<Inventory, _>(entity, |inventory| *inventory = kept);

        for slot in dropped {
            if let Some(map) = self.maps.get_mut(pos.map) {
                map.items.push(MapItem {
                    item: slot.item,
                    quantity: slot.quantity,
                    x: pos.point.x,
                    y: pos.point.y,
                    dropped_by: killer,
                });
            }
            self.notify(SimEvent::ItemDropped {
                map: pos.map,
                x: pos.point.x,
                y: pos.point.y,
                item: slot.item,
                quantity: slot.quantity,
            });
        }
    }

    /// Brings a dead entity back with full vitals and cleared timers.
    pub fn reset(&mut self, entity: Entity) {
        self.update::<Vitals, _>(entity, Vitals::restore_all);
        self.update::<CombatState, _>(entity, |state| {
            *state = CombatState::default();
        });
        self.notify(SimEvent::Revived { entity });
        self.notify_vitals(entity);
    }

    /// Raises or lowers the guard. Raising waits for the attack timer.
    pub fn set_blocking(&mut self, entity: Entity, blocking: bool, now: u64) -> bool {
        let Some(state) = self.component::<CombatState>(entity) else {
            return false;
        };
        if state.dead || state.blocking == blocking || (blocking && now < state.attack_at) {
            return false;
        }
        self.update::<CombatState, _>(entity, |state| state.blocking = blocking);
        self.notify(SimEvent::BlockingChanged { entity, blocking });
        true
    }
}
