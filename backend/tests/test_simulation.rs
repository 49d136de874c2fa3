//! Whole-simulation behaviour: determinism, config, built-in modules

use dispatch_sim_core_rs::{
    spawn_guarded, Event, IncidentDispatchModule, LitterCrewModule, ModuleRegistry, SimConfig,
    Simulation, SimulationError,
};

fn busy_config(seed: u64) -> SimConfig {
    let mut config = SimConfig {
        rng_seed: seed,
        ..Default::default()
    };
    config.dispatch.cooldown_ms = 5_000;
    config.dispatch.generation_chance = 0.05;
    config
}

/// Ids of every generated incident, in generation order
fn generated_ids(sim: &Simulation) -> Vec<String> {
    sim.event_log()
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::IncidentGenerated { incident_id, .. } => Some(incident_id.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_same_seed_same_history() {
    let mut a = Simulation::new(busy_config(42), &ModuleRegistry::builtin()).unwrap();
    let mut b = Simulation::new(busy_config(42), &ModuleRegistry::builtin()).unwrap();

    a.run(1_500);
    b.run(1_500);

    assert!(a.event_log().len() > 10);
    assert_eq!(a.event_log().events(), b.event_log().events());
    assert_eq!(a.world().entity_count(), b.world().entity_count());
}

#[test]
fn test_same_seed_same_incident_ids() {
    let config = || {
        let mut config = SimConfig {
            rng_seed: 42,
            ..Default::default()
        };
        config.dispatch.cooldown_ms = 0;
        config.dispatch.generation_chance = 1.0;
        config
    };
    let mut a = Simulation::new(config(), &ModuleRegistry::builtin()).unwrap();
    let mut b = Simulation::new(config(), &ModuleRegistry::builtin()).unwrap();

    a.run(50);
    b.run(50);

    let ids = generated_ids(&a);
    assert!(!ids.is_empty());
    assert_eq!(ids, generated_ids(&b));

    let json_a = serde_json::to_string(a.event_log().events()).unwrap();
    let json_b = serde_json::to_string(b.event_log().events()).unwrap();
    assert_eq!(json_a, json_b);
}

#[test]
fn test_different_seed_different_history() {
    let mut a = Simulation::new(busy_config(1), &ModuleRegistry::builtin()).unwrap();
    let mut b = Simulation::new(busy_config(2), &ModuleRegistry::builtin()).unwrap();

    a.run(1_500);
    b.run(1_500);

    assert_ne!(a.event_log().events(), b.event_log().events());
    assert_ne!(generated_ids(&a), generated_ids(&b));
}

#[test]
fn test_builtin_modules_are_discovered() {
    let sim = Simulation::new(SimConfig::default(), &ModuleRegistry::builtin()).unwrap();

    assert_eq!(sim.host().module_names(), vec!["incidents", "litter_crew"]);
    assert!(sim.host().find::<IncidentDispatchModule>().is_some());
    assert!(sim.host().find::<LitterCrewModule>().is_some());
}

#[test]
fn test_incidents_run_to_completion_in_simulation() {
    let mut config = SimConfig::default();
    config.dispatch.cooldown_ms = 0;
    config.dispatch.generation_chance = 1.0;
    config.dispatch.max_active = 2;
    let mut sim = Simulation::new(config, &ModuleRegistry::builtin()).unwrap();

    // ten simulated minutes
    let mut peak = 0;
    for _ in 0..6_000 {
        let result = sim.tick();
        assert_eq!(result.module_failures, 0);
        peak = peak.max(result.active_incidents);
    }

    let log = sim.event_log();
    assert_eq!(peak, 2);
    assert!(!log.events_of_type("ResolutionStarted").is_empty());
    assert!(!log.events_of_type("IncidentCompleted").is_empty());
    assert!(!log.events_of_type("UnitRecalled").is_empty());
}

#[test]
fn test_litter_crew_finishes_errands() {
    let mut config = SimConfig::default();
    config.dispatch.generation_chance = 0.0;
    let mut sim = Simulation::new(config, &ModuleRegistry::builtin()).unwrap();

    sim.run(900);

    let log = sim.event_log();
    assert!(!log.events_of_type("SequenceStarted").is_empty());
    assert!(!log.events_of_type("SequenceCompleted").is_empty());
    let crew = sim.host().find::<LitterCrewModule>().unwrap();
    assert!(crew.errands_started() >= 1);
}

#[test]
fn test_module_init_failure_leaves_others_running() {
    let mut config = SimConfig::default();
    config.world.unavailable_models = vec![config.litter_crew.truck_model.clone()];
    let mut sim = Simulation::new(config, &ModuleRegistry::builtin()).unwrap();

    assert_eq!(sim.host().module_names(), vec!["incidents"]);
    let failed = sim.event_log().events_for_module("litter_crew");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].event_type(), "ModuleFailed");

    let result = sim.run(10).unwrap();
    assert_eq!(result.module_failures, 0);
}

#[test]
fn test_panicking_task_does_not_halt_simulation() {
    let mut sim = Simulation::new(SimConfig::default(), &ModuleRegistry::new()).unwrap();
    sim.context_mut()
        .scheduler
        .schedule(0, |_| panic!("bad callback"));

    let first = sim.tick();
    let second = sim.tick();

    assert_eq!(first.task_failures, 1);
    assert_eq!(second.task_failures, 0);
    assert_eq!(second.tick, 2);
}

#[test]
fn test_background_fault_reaches_tick_thread() {
    let mut sim = Simulation::new(SimConfig::default(), &ModuleRegistry::new()).unwrap();
    let scheduler = sim.context().scheduler.clone();

    spawn_guarded("traffic feed", scheduler, || panic!("lost connection"))
        .join()
        .unwrap();
    sim.tick();

    assert_eq!(sim.event_log().events_of_type("BackgroundFault").len(), 1);
    assert!(sim.world().notifications()[0].contains("traffic feed"));
}

#[test]
fn test_shutdown_disposes_every_module() {
    let mut sim = Simulation::new(SimConfig::default(), &ModuleRegistry::builtin()).unwrap();
    sim.run(50);

    assert_eq!(sim.shutdown(), 0);
    assert_eq!(sim.event_log().events_of_type("ModuleDisposed").len(), 2);
    assert!(sim.host().is_empty());
    assert_eq!(sim.world().marker_count(), 0);
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "frame_ms": 50,
        "rng_seed": 9,
        "dispatch": {
            "cooldown_ms": 0,
            "max_active": 1,
            "profiles": [
                {
                    "kind": "robbery",
                    "required_services": ["enforcement", "medical"],
                    "resolution_ms": 3000,
                    "priority": 4
                }
            ]
        },
        "litter_crew": { "enabled": false }
    }"#;

    let config = SimConfig::from_json_str(json).unwrap();

    assert_eq!(config.frame_ms, 50);
    assert_eq!(config.dispatch.profiles.len(), 1);
    assert_eq!(config.dispatch.profiles[0].required_services.len(), 2);
    assert!(config.dispatch.profiles[0].scene.is_empty());
    assert!(!config.litter_crew.enabled);
    assert_eq!(config.dispatch.max_lifetime_ms, 180_000);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = SimConfig::default();
    config.dispatch.max_active = 0;

    let result = Simulation::new(config, &ModuleRegistry::builtin());
    assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));

    let json = r#"{ "dispatch": { "spawn_radius_min": 500.0, "spawn_radius_max": 100.0 } }"#;
    assert!(matches!(
        SimConfig::from_json_str(json),
        Err(SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn test_events_serialize_to_json() {
    let mut config = SimConfig::default();
    config.dispatch.generation_chance = 1.0;
    let mut sim = Simulation::new(config, &ModuleRegistry::builtin()).unwrap();
    sim.run(5);

    let json = serde_json::to_string(sim.event_log().events()).unwrap();
    assert!(json.contains("\"event\":\"incident_generated\""));
}
