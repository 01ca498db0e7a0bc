//! Death, evolution, weapon choice and respawn flows across the full
//! system roster.

use mitosis::{
    components::{Energy, Position, Projectile, StageState},
    config::Tuning,
    engine::{Command, Engine, EngineBuilder, EngineSettings},
    events::GameEvent,
    factory,
    spatial::Vec3,
    stage::{Stage, WeaponKind},
};

fn quiet_engine(seed: u64) -> Engine {
    let mut tuning = Tuning::default();
    tuning.world.obstacle_count = 0;
    tuning.world.swarm_count = 0;
    tuning.world.nutrient_count = 0;
    let settings = EngineSettings {
        seed,
        tick_rate_hz: 60,
        bot_count: 0,
    };
    EngineBuilder::new(settings, tuning)
        .with_default_systems()
        .build()
}

fn place(engine: &mut Engine, id: &str, pos: Vec3) {
    let entity = engine.world().entity_by_external(id).unwrap();
    engine.world_mut().add_component(entity, Position(pos));
}

#[test]
fn predation_kill_awards_bonus_and_human_respawns() {
    let mut engine = quiet_engine(7);
    engine.join("hunter").expect("join hunter");
    engine.join("prey").expect("join prey");

    let tuning = engine.tuning().clone();
    let hunter = engine.world().entity_by_external("hunter").unwrap();
    let prey = engine.world().entity_by_external("prey").unwrap();
    // The hunter lives on the sphere boundary; park both on its surface
    // so movement does not pull them apart.
    factory::set_stage(engine.world_mut(), &tuning, hunter, Stage::Hunter);
    place(&mut engine, "hunter", Vec3::xy(tuning.world.sphere_radius, 0.0));
    place(&mut engine, "prey", Vec3::xy(tuning.world.sphere_radius - 5.0, 0.0));
    engine.world_mut().get_component_mut::<Energy>(prey).unwrap().current = 5.0;

    let events = engine.run_ticks(20).expect("drain to death");

    let died = events
        .iter()
        .find_map(|e| match e {
            GameEvent::Died { id, source, killer } => {
                Some((id.clone(), *source, killer.clone()))
            }
            _ => None,
        })
        .expect("prey died");
    assert_eq!(died.0, "prey");
    assert_eq!(died.1, "predation");
    assert_eq!(died.2, Some("hunter".to_string()));

    // Killing a SingleCell raises the predator's ceiling by its cut
    let hunter_energy = engine.world().get_component::<Energy>(hunter).unwrap();
    let prey_max = tuning.stage(Stage::SingleCell).max_energy;
    let expected_max =
        tuning.stage(Stage::Hunter).max_energy + prey_max * tuning.predation.kill_bonus_pct[0];
    assert!((hunter_energy.max - expected_max).abs() < 1e-3);

    // Humans stay dead until they ask to come back
    engine.run_ticks(120).expect("idle while dead");
    let prey_energy = engine.world().get_component::<Energy>(prey).unwrap();
    assert!(prey_energy.current < 0.0, "still parked on the sentinel");

    engine
        .apply(Command::Respawn { id: "prey".into() })
        .expect("respawn command");
    let events = engine.run_ticks(2).expect("respawn tick");
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::Respawned { stage: Stage::SingleCell, .. })));
    let prey_energy = engine.world().get_component::<Energy>(prey).unwrap();
    assert!(prey_energy.current > 95.0);
}

#[test]
fn evolution_command_advances_stage() {
    let mut engine = quiet_engine(7);
    engine.join("ada").expect("join");
    engine.apply(Command::Evolve { id: "ada".into() }).expect("evolve");

    let events = engine.run_ticks(1).expect("tick");
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::Evolved { stage: Stage::MultiCell, .. })));

    let entity = engine.world().entity_by_external("ada").unwrap();
    let state = engine.world().get_component::<StageState>(entity).unwrap();
    assert_eq!(state.stage, Stage::MultiCell);
    let energy = engine.world().get_component::<Energy>(entity).unwrap();
    assert_eq!(energy.max, engine.tuning().stage(Stage::MultiCell).max_energy);
}

#[test]
fn hunter_choice_window_auto_resolves_when_ignored() {
    let mut engine = quiet_engine(7);
    engine.join("ada").expect("join");
    let tuning = engine.tuning().clone();
    let entity = engine.world().entity_by_external("ada").unwrap();
    factory::set_stage(engine.world_mut(), &tuning, entity, Stage::MultiCell);

    engine.apply(Command::Evolve { id: "ada".into() }).expect("evolve");
    let events = engine.run_ticks(1).expect("tick");
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::WeaponChoiceOpened { .. })));

    // Ignore the window past its deadline
    let window_ticks = (tuning.lifecycle.choice_window_secs * 60.0) as u64 + 2;
    let events = engine.run_ticks(window_ticks).expect("wait out the window");
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::WeaponChosen { auto_resolved: true, .. }
    )));
    let state = engine.world().get_component::<StageState>(entity).unwrap();
    assert!(state.weapon.is_some());
}

#[test]
fn explicit_weapon_choice_beats_the_deadline() {
    let mut engine = quiet_engine(7);
    engine.join("ada").expect("join");
    let tuning = engine.tuning().clone();
    let entity = engine.world().entity_by_external("ada").unwrap();
    factory::set_stage(engine.world_mut(), &tuning, entity, Stage::MultiCell);

    engine.apply(Command::Evolve { id: "ada".into() }).expect("evolve");
    engine.run_ticks(1).expect("tick");
    engine
        .apply(Command::ChooseWeapon {
            id: "ada".into(),
            weapon: WeaponKind::Rupture,
        })
        .expect("choose");
    let events = engine.run_ticks(1).expect("tick");

    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::WeaponChosen { auto_resolved: false, weapon: WeaponKind::Rupture, .. }
    )));
    let state = engine.world().get_component::<StageState>(entity).unwrap();
    assert_eq!(state.weapon, Some(WeaponKind::Rupture));
    assert_eq!(state.choice_deadline, None);
}

#[test]
fn fired_projectile_expires_in_flight() {
    let mut engine = quiet_engine(7);
    engine.join("ada").expect("join");
    let tuning = engine.tuning().clone();
    let entity = engine.world().entity_by_external("ada").unwrap();
    factory::set_stage(engine.world_mut(), &tuning, entity, Stage::Hunter);
    engine
        .world_mut()
        .get_component_mut::<StageState>(entity)
        .unwrap()
        .weapon = Some(WeaponKind::Pseudopod);

    engine
        .apply(Command::Fire {
            id: "ada".into(),
            target: Some(Vec3::xy(10_000.0, 0.0)),
        })
        .expect("fire");
    let events = engine.run_ticks(1).expect("spawn tick");
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::AbilityFired { .. })));
    assert_eq!(engine.world().ids_with::<Projectile>().len(), 1);

    // 500 units at 1000/s is 30 ticks of flight
    engine.run_ticks(40).expect("flight");
    assert!(engine.world().ids_with::<Projectile>().is_empty());
}

/// A disconnecting shooter's in-flight round keeps flying, but its kill
/// credit must not land on whoever joins into the freed slot next.
#[test]
fn kill_credit_dies_with_the_shooter() {
    let mut engine = quiet_engine(21);
    engine.join("gunner").expect("join gunner");
    engine.join("victim").expect("join victim");

    let tuning = engine.tuning().clone();
    let gunner = engine.world().entity_by_external("gunner").unwrap();
    let victim = engine.world().entity_by_external("victim").unwrap();
    factory::set_stage(engine.world_mut(), &tuning, gunner, Stage::Hunter);
    engine
        .world_mut()
        .get_component_mut::<StageState>(gunner)
        .unwrap()
        .weapon = Some(WeaponKind::Pseudopod);
    place(&mut engine, "gunner", Vec3::xy(tuning.world.sphere_radius, 0.0));
    place(
        &mut engine,
        "victim",
        Vec3::xy(tuning.world.sphere_radius + 60.0, 0.0),
    );
    engine
        .world_mut()
        .get_component_mut::<Energy>(victim)
        .unwrap()
        .current = 10.0;

    engine
        .apply(Command::Fire {
            id: "gunner".into(),
            target: Some(Vec3::xy(tuning.world.sphere_radius + 500.0, 0.0)),
        })
        .expect("fire");
    engine.run_ticks(1).expect("spawn tick");
    engine
        .apply(Command::Leave {
            id: "gunner".into(),
        })
        .expect("leave");
    engine.join("latecomer").expect("join into the freed slot");

    let events = engine.run_ticks(30).expect("flight");
    let died = events
        .iter()
        .find_map(|e| match e {
            GameEvent::Died { id, source, killer } => {
                Some((id.clone(), *source, killer.clone()))
            }
            _ => None,
        })
        .expect("victim died to the orphaned round");
    assert_eq!(died.0, "victim");
    assert_eq!(died.1, "pseudopod");
    assert_eq!(died.2, None, "no credit for a player who never fired");
}
