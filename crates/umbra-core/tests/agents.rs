use glam::Vec2;
use umbra_core::{Agent, AgentField, Limits, SimError, SlimeConfig, SpawnPolicy, DEFAULT_FORWARD, FIELD_CENTRE};

fn slime(agent_count: u32, spawn: SpawnPolicy) -> SlimeConfig {
    SlimeConfig {
        agent_count,
        spawn,
        ..SlimeConfig::default()
    }
}

#[test]
fn ring_spawn_is_evenly_spaced_and_faces_outward() {
    let field = AgentField::new(&slime(4, SpawnPolicy::Ring { radius: 0.25 }), &Limits::default()).unwrap();
    let agents = field.agents();
    assert_eq!(agents.len(), 4);

    for agent in agents {
        let offset = agent.position() - FIELD_CENTRE;
        assert!((offset.length() - 0.25).abs() < 1e-5);
        assert!(offset.normalize().dot(agent.heading()) > 0.9999);
    }

    // Consecutive agents are a quarter turn apart, counter-clockwise
    for pair in agents.windows(2) {
        let (a, b) = (pair[0].heading(), pair[1].heading());
        assert!(a.dot(b).abs() < 1e-5);
        assert!(a.perp_dot(b) > 0.9999);
    }
    assert!((agents[0].heading() - Vec2::X).length() < 1e-6);
}

#[test]
fn scattered_spawn_is_reproducible_from_the_seed() {
    let config = slime(64, SpawnPolicy::Scattered { radius: 0.4 });
    let first = AgentField::new(&config, &Limits::default()).unwrap();
    let second = AgentField::new(&config, &Limits::default()).unwrap();
    assert_eq!(first.agents(), second.agents());

    let reseeded = SlimeConfig { seed: config.seed + 1, ..config.clone() };
    let third = AgentField::new(&reseeded, &Limits::default()).unwrap();
    assert_ne!(first.agents(), third.agents());
}

#[test]
fn scattered_agents_stay_in_the_disc_and_face_the_centre() {
    let field = AgentField::new(&slime(256, SpawnPolicy::Scattered { radius: 0.4 }), &Limits::default()).unwrap();
    for agent in field.agents() {
        let offset = agent.position() - FIELD_CENTRE;
        assert!(offset.length() <= 0.4 + 1e-5);
        assert!((agent.heading().length() - 1.0).abs() < 1e-5);
        if offset.length() > 1e-4 {
            assert!(agent.heading().dot(-offset.normalize()) > 0.999);
        }
    }
}

#[test]
fn agent_at_the_centre_gets_the_default_heading() {
    let agent = Agent::facing_centre(Vec2::ZERO);
    assert_eq!(agent.position(), FIELD_CENTRE);
    assert_eq!(agent.heading(), DEFAULT_FORWARD);
    assert!(agent.is_finite());
}

#[test]
fn population_size_is_checked() {
    let limits = Limits {
        max_agents: 8,
        ..Limits::default()
    };
    assert_eq!(
        AgentField::new(&slime(9, SpawnPolicy::default()), &limits).unwrap_err(),
        SimError::Capacity { requested: 9, max: 8 }
    );
    assert_eq!(
        AgentField::new(&slime(0, SpawnPolicy::default()), &limits).unwrap_err(),
        SimError::EmptyPopulation
    );
}

#[test]
fn stats_summarize_the_population() {
    let mut field = AgentField::new(&slime(8, SpawnPolicy::Ring { radius: 0.2 }), &Limits::default()).unwrap();
    assert_eq!(field.stats.count, 8);
    assert!((field.stats.mean_position[0] - 0.5).abs() < 1e-5);
    assert!(field.stats.heading_spread > 0.99);

    field.agents_mut()[0].position = [f32::NAN, 0.5];
    field.update_stats();
    assert_eq!(field.stats.non_finite, 1);
}

#[test]
fn spawn_radius_must_fit_the_field() {
    let limits = Limits::default();
    assert_eq!(
        AgentField::new(&slime(1000, SpawnPolicy::Scattered { radius: 0.9 }), &limits).unwrap_err(),
        SimError::SpawnRadius(0.9)
    );
    assert_eq!(
        AgentField::new(&slime(4, SpawnPolicy::Ring { radius: 0.6 }), &limits).unwrap_err(),
        SimError::SpawnRadius(0.6)
    );
    assert!(matches!(
        AgentField::new(&slime(4, SpawnPolicy::Ring { radius: f32::NAN }), &limits),
        Err(SimError::SpawnRadius(_))
    ));

    let field = AgentField::new(&slime(1000, SpawnPolicy::Scattered { radius: 0.5 }), &limits).unwrap();
    assert!(field
        .agents()
        .iter()
        .all(|a| (0.0..=1.0).contains(&a.position[0]) && (0.0..=1.0).contains(&a.position[1])));
}
