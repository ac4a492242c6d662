mod common;

use realmcore::{
    Placement, PlayerTemplate,
    combat::AttackOutcome,
    data::{CombatData, DefinitionTables, SpellDefinition, SpellId, TargetType},
    notify::SimEvent,
    stats::Vital,
    status::{ApplyOutcome, StatusKind},
};

use common::{TOWN, fighter, open_town};

fn spell(id: u32) -> SpellDefinition {
    SpellDefinition::new(SpellId(id), format!("spell {id}"))
}

#[test]
fn vitals_stay_within_bounds() {
    let mut h = open_town(DefinitionTables::default());
    let hero = fighter(&mut h.world, 4, 4);

    h.world.set_vital(hero, Vital::Health, 500);
    assert_eq!(h.world.vital(hero, Vital::Health), 100);
    h.world.set_vital(hero, Vital::Health, -5);
    assert_eq!(h.world.vital(hero, Vital::Health), 0);
    h.world.add_vital(hero, Vital::Health, i32::MAX);
    assert_eq!(h.world.vital(hero, Vital::Health), 100);
    h.world.sub_vital(hero, Vital::Mana, 1000);
    assert_eq!(h.world.vital(hero, Vital::Mana), 0);
    h.world.add_vital(hero, Vital::Mana, 30);
    assert_eq!(h.world.vital(hero, Vital::Mana), 30);
}

#[test]
fn non_positive_max_health_becomes_one() {
    let mut h = open_town(DefinitionTables::default());
    let hero = fighter(&mut h.world, 4, 4);

    h.world.set_max_vital(hero, Vital::Health, 0);
    assert_eq!(h.world.max_vital(hero, Vital::Health), 1);
    assert_eq!(h.world.vital(hero, Vital::Health), 1);

    h.world.set_max_vital(hero, Vital::Health, -40);
    assert_eq!(h.world.max_vital(hero, Vital::Health), 1);

    h.world.set_max_vital(hero, Vital::Mana, 60);
    assert_eq!(h.world.max_vital(hero, Vital::Mana), 60);
    assert_eq!(h.world.vital(hero, Vital::Mana), 60);
}

#[test]
fn shields_absorb_until_spent() {
    let mut h = open_town(DefinitionTables::default());
    let hero = fighter(&mut h.world, 4, 4);
    let barrier = spell(20).with_combat(CombatData {
        vital_diff: [50, 0],
        ..CombatData::default()
    });
    h.world.apply_status(hero, &barrier, StatusKind::Shield, 10_000, 0);

    assert_eq!(h.world.sub_vital(hero, Vital::Health, 20), 0);
    assert_eq!(h.world.vital(hero, Vital::Health), 100);
    let snapshot = h.world.snapshot(hero, 0).expect("snapshot");
    assert_eq!(snapshot.statuses.len(), 1);
    assert_eq!(snapshot.statuses[0].shield, [30, 0]);

    assert_eq!(h.world.sub_vital(hero, Vital::Health, 45), 15);
    assert_eq!(h.world.vital(hero, Vital::Health), 85);
    assert!(!h.world.has_status(hero, StatusKind::Shield));
}

#[test]
fn shields_ignore_heals_and_other_vitals() {
    let mut h = open_town(DefinitionTables::default());
    let hero = fighter(&mut h.world, 4, 4);
    let barrier = spell(21).with_combat(CombatData {
        vital_diff: [10, 0],
        ..CombatData::default()
    });
    h.world.apply_status(hero, &barrier, StatusKind::Shield, 10_000, 0);

    assert_eq!(h.world.sub_vital(hero, Vital::Mana, 25), 25);
    assert_eq!(h.world.vital(hero, Vital::Mana), 75);
    assert_eq!(h.world.sub_vital(hero, Vital::Health, -5), -5);
    assert!(h.world.has_status(hero, StatusKind::Shield));
}

#[test]
fn cleanse_removes_prior_statuses_and_blocks_new_ones() {
    let mut h = open_town(DefinitionTables::default());
    let hero = fighter(&mut h.world, 4, 4);
    for (id, kind) in [(10, StatusKind::Stun), (11, StatusKind::Silence), (12, StatusKind::Blind)] {
        assert_eq!(
            h.world.apply_status(hero, &spell(id), kind, 5000, 0),
            ApplyOutcome::Added
        );
    }
    assert_eq!(h.world.status_count(hero), 3);

    h.world.apply_status(hero, &spell(13), StatusKind::Cleanse, 2000, 0);

    for kind in [StatusKind::Stun, StatusKind::Silence, StatusKind::Blind] {
        assert!(!h.world.has_status(hero, kind));
    }
    assert_eq!(h.world.status_count(hero), 1);
    assert_eq!(
        h.world.apply_status(hero, &spell(10), StatusKind::Stun, 5000, 100),
        ApplyOutcome::RejectedByCleanse
    );
    assert!(!h.world.has_status(hero, StatusKind::Stun));

    h.world.advance(2000);
    assert_eq!(h.world.status_count(hero), 0);
    assert_eq!(
        h.world.apply_status(hero, &spell(10), StatusKind::Stun, 5000, 2000),
        ApplyOutcome::Added
    );
}

#[test]
fn reapplying_a_status_refreshes_its_timer() {
    let mut h = open_town(DefinitionTables::default());
    let hero = fighter(&mut h.world, 4, 4);
    let slow = spell(30);

    h.world.apply_status(hero, &slow, StatusKind::Snare, 1000, 0);
    assert_eq!(
        h.world.apply_status(hero, &slow, StatusKind::Snare, 1000, 800),
        ApplyOutcome::Refreshed
    );
    h.world.advance(1000);
    assert!(h.world.has_status(hero, StatusKind::Snare));
    h.world.advance(1800);
    assert!(!h.world.has_status(hero, StatusKind::Snare));
}

#[test]
fn damage_wakes_sleepers_and_breaks_stealth() {
    let mut h = open_town(DefinitionTables::default());
    let hero = fighter(&mut h.world, 4, 4);
    let foe = fighter(&mut h.world, 5, 4);
    h.world.apply_status(hero, &spell(40), StatusKind::Stealth, 5000, 0);
    h.world.apply_status(foe, &spell(41), StatusKind::Sleep, 5000, 0);

    let strike = spell(42).with_combat(CombatData {
        target: TargetType::Single,
        vital_diff: [10, 0],
        ..CombatData::default()
    });
    let outcome = h.world.try_attack_spell(hero, foe, &strike, false, 0);

    assert!(matches!(outcome, AttackOutcome::Resolved { primary: 10, .. }));
    assert!(!h.world.has_status(hero, StatusKind::Stealth));
    assert!(!h.world.has_status(foe, StatusKind::Sleep));
}

#[test]
fn on_hit_charges_fire_with_the_next_swing() {
    let empower = spell(50).with_combat(CombatData {
        target: TargetType::OnHit,
        effect: Some(StatusKind::OnHit),
        on_hit_duration_ms: 5000,
        vital_diff: [25, 0],
        ..CombatData::default()
    });
    let mut h = open_town(DefinitionTables::default().with_spell(empower.clone()));
    let hero = h
        .world
        .spawn_player(
            PlayerTemplate::new("hero", [5; 5], [100, 0]),
            Placement::new(TOWN, 4, 4),
        )
        .expect("hero");
    let foe = fighter(&mut h.world, 5, 4);

    h.world.cast_spell(hero, empower.id, None, None, 0).expect("empower");
    assert!(h.world.has_status(hero, StatusKind::OnHit));

    h.world.try_attack(hero, foe, 0).expect("swing");

    // flat unarmed swing, then the charge
    assert_eq!(h.world.vital(foe, Vital::Health), 100 - 1 - 25);
    assert!(!h.world.has_status(hero, StatusKind::OnHit));
}

#[test]
fn regeneration_waits_out_the_combat_timer() {
    let mut h = open_town(DefinitionTables::default());
    let mut template = PlayerTemplate::new("hero", [5; 5], [100, 100]);
    template.regen_percent = [10, 0];
    let hero = h
        .world
        .spawn_player(template, Placement::new(TOWN, 4, 4))
        .expect("hero");
    h.world.set_vital(hero, Vital::Health, 50);
    h.drain();

    h.world.advance(100);
    assert_eq!(h.world.vital(hero, Vital::Health), 60);
    assert!(h.drain().contains(&SimEvent::VitalsChanged {
        entity: hero,
        current: [60, 100],
        max: [100, 100],
    }));
    h.world.advance(200);
    assert_eq!(h.world.vital(hero, Vital::Health), 60);
    h.world.advance(3100);
    assert_eq!(h.world.vital(hero, Vital::Health), 70);
}

#[test]
fn snapshots_summarise_statuses_and_serialise() {
    let mut h = open_town(DefinitionTables::default());
    let hero = fighter(&mut h.world, 4, 4);
    h.world.apply_status(hero, &spell(60), StatusKind::Blind, 4000, 1000);

    let snapshot = h.world.snapshot(hero, 2500).expect("snapshot");

    assert_eq!((snapshot.x, snapshot.y), (4, 4));
    assert_eq!(snapshot.vitals, [100, 100]);
    assert_eq!(snapshot.statuses[0].kind, StatusKind::Blind);
    assert_eq!(snapshot.statuses[0].remaining_ms, 2500);
    assert_eq!(snapshot.statuses[0].total_ms, 4000);
    let json = serde_json::to_string(&snapshot).expect("json");
    assert!(json.contains("\"Blind\""));
    assert_eq!(h.world.snapshots(2500).len(), 1);
}
