use umbra_core::{
    ConfigError, CpuEvaluator, FrameCompositor, FrameStatus, RenderMode, RunConfig, SpawnPolicy,
};

const SCENE: &str = include_str!("../../../configs/scene.yaml");
const FRACTAL: &str = include_str!("../../../configs/fractal.yaml");
const SLIME: &str = include_str!("../../../configs/slime.yaml");

#[test]
fn default_config_survives_a_yaml_round_trip() {
    let yaml = RunConfig::default().to_yaml_string().unwrap();
    let parsed = RunConfig::from_yaml_str(&yaml).unwrap();
    assert_eq!(parsed.to_yaml_string().unwrap(), yaml);
}

#[test]
fn partial_files_fall_back_to_defaults() {
    let config = RunConfig::from_yaml_str("mode: fractal\nfractal:\n  power: 6.0\n").unwrap();
    assert_eq!(config.render.mode, RenderMode::Fractal);
    assert_eq!(config.render.fractal.power, 6.0);
    assert_eq!(config.render.surface.size, [800, 600]);
    assert!(config.scene.nodes.is_empty());
}

#[test]
fn invalid_values_are_rejected() {
    let err = RunConfig::from_yaml_str("surface:\n  size: [0, 600]\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");

    let err = RunConfig::from_yaml_str("mode: [not, a, mode]\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "{err}");
}

#[test]
fn missing_files_report_their_path() {
    let err = RunConfig::from_path("does/not/exist.yaml").unwrap_err();
    assert!(err.to_string().contains("does/not/exist.yaml"));
}

#[test]
fn sample_configs_load_cleanly() {
    let scene = RunConfig::from_yaml_str(SCENE).unwrap();
    assert_eq!(scene.render.mode, RenderMode::Scene);
    let (registry, diagnostics) = scene.build_registry();
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(registry.len(), 5);
    assert_eq!(registry.shape_count(), 7);

    let fractal = RunConfig::from_yaml_str(FRACTAL).unwrap();
    assert_eq!(fractal.render.mode, RenderMode::Fractal);
    assert_eq!(fractal.render.fractal.iterations, 12);

    let slime = RunConfig::from_yaml_str(SLIME).unwrap();
    assert_eq!(slime.render.mode, RenderMode::Slime);
    assert_eq!(slime.render.slime.spawn, SpawnPolicy::Ring { radius: 0.3 });
    assert_eq!(slime.render.slime.agent_count, 100_000);
}

#[test]
fn sample_scene_renders_on_the_cpu() {
    let mut config = RunConfig::from_yaml_str(SCENE).unwrap();
    config.render.surface.size = [24, 16];
    config.render.march.max_steps = 48;
    let (registry, _) = config.build_registry();

    let mut evaluator = CpuEvaluator::new([24, 16]);
    let mut compositor = FrameCompositor::new(config.render, registry, &mut evaluator).unwrap();
    let report = compositor.advance_frame(&mut evaluator, 1.0 / 60.0).unwrap();

    assert_eq!(report.status, FrameStatus::Rendered);
    assert_eq!((report.objects, report.shapes), (5, 7));
}
