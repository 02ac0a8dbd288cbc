use glam::Vec2;
use umbra_core::{
    total_energy, trail_stats, BufferId, CpuEvaluator, DispatchRequest, EvalError, Evaluator, Kernel, OutputImage,
    RenderConfig, RenderMode, SimError, SimulationStepper, SlimeConfig, SpawnPolicy, TrailField, TrailUniforms,
};

const FIELD: [u32; 2] = [32, 32];

fn slime_config(turn_strength: f32) -> RenderConfig {
    let mut config = RenderConfig {
        mode: RenderMode::Slime,
        slime: SlimeConfig {
            agent_count: 4,
            spawn: SpawnPolicy::Ring { radius: 0.25 },
            agent_speed: 0.1,
            turn_strength,
            ..SlimeConfig::default()
        },
        ..RenderConfig::default()
    };
    config.surface.size = FIELD;
    config
}

/// CPU evaluator that refuses trail evolution while `fail_trail` is set
struct TrailFailingEvaluator {
    inner: CpuEvaluator,
    fail_trail: bool,
}

impl Evaluator for TrailFailingEvaluator {
    fn output_size(&self) -> [u32; 2] {
        self.inner.output_size()
    }

    fn resize_output(&mut self, size: [u32; 2]) -> Result<(), EvalError> {
        self.inner.resize_output(size)
    }

    fn create_buffer(&mut self, label: &'static str, contents: &[u8], stride: usize) -> Result<BufferId, EvalError> {
        self.inner.create_buffer(label, contents, stride)
    }

    fn read_buffer(&mut self, id: BufferId, out: &mut [u8]) -> Result<(), EvalError> {
        self.inner.read_buffer(id, out)
    }

    fn release_buffer(&mut self, id: BufferId) {
        self.inner.release_buffer(id)
    }

    fn dispatch(&mut self, request: &DispatchRequest) -> Result<(), EvalError> {
        if self.fail_trail && request.kernel == Kernel::TrailEvolve {
            return Err(EvalError::Dispatch("trail kernel unavailable".to_string()));
        }
        self.inner.dispatch(request)
    }

    fn present(&mut self) -> Result<(), EvalError> {
        self.inner.present()
    }

    fn read_output(&mut self) -> Result<OutputImage, EvalError> {
        self.inner.read_output()
    }
}

#[test]
fn each_tick_moves_agents_exactly_once() {
    let config = slime_config(0.0);
    let mut evaluator = CpuEvaluator::new(FIELD);
    let mut stepper = SimulationStepper::new(&config, &mut evaluator).unwrap();
    let spawned: Vec<(Vec2, Vec2)> = stepper.agents().agents().iter().map(|a| (a.position(), a.heading())).collect();

    let dt = 0.05;
    stepper.tick(&mut evaluator, dt).unwrap();
    let report = stepper.tick(&mut evaluator, dt).unwrap();
    assert_eq!(report.tick, 2);
    assert_eq!(report.agents, 4);

    for (agent, (position, heading)) in stepper.agents().agents().iter().zip(&spawned) {
        let expected = *position + *heading * config.slime.agent_speed * dt * 2.0;
        assert!(
            (agent.position() - expected).length() < 1e-5,
            "{:?} vs {:?}",
            agent.position(),
            expected
        );
    }
}

#[test]
fn ticks_release_their_transient_buffers() {
    let config = slime_config(12.0);
    let mut evaluator = CpuEvaluator::new(FIELD);
    let mut stepper = SimulationStepper::new(&config, &mut evaluator).unwrap();
    assert_eq!(evaluator.live_buffers(), 1);

    for _ in 0..3 {
        stepper.tick(&mut evaluator, 0.016).unwrap();
    }
    assert_eq!(evaluator.live_buffers(), 1);
    assert_eq!(evaluator.dispatch_count(), 6);

    stepper.teardown(&mut evaluator);
    assert_eq!(evaluator.live_buffers(), 0);
}

#[test]
fn agents_deposit_into_the_trail() {
    let config = slime_config(0.0);
    let mut evaluator = CpuEvaluator::new(FIELD);
    let mut stepper = SimulationStepper::new(&config, &mut evaluator).unwrap();

    assert_eq!(total_energy(&stepper.read_trail(&mut evaluator).unwrap()), 0.0);
    stepper.tick(&mut evaluator, 0.016).unwrap();

    let stats = trail_stats(&stepper.read_trail(&mut evaluator).unwrap());
    assert!(stats.total_energy > 0.0);
    assert!(stats.covered >= 4);
}

#[test]
fn trail_decays_without_deposits() {
    let mut evaluator = CpuEvaluator::new([16, 16]);
    let mut texels = vec![[0.0f32, 0.0, 0.0, 1.0]; 256];
    texels[8 * 16 + 8] = [1.0, 1.0, 1.0, 1.0];
    texels[3 * 16 + 5] = [0.5, 0.2, 0.9, 1.0];
    let trail = TrailField::from_texels(&mut evaluator, [16, 16], &texels).unwrap();

    let params = TrailUniforms {
        blend_strength: 1.0,
        clean_up_strength: 0.1,
        delta_time: 0.1,
        size: [16, 16],
        ..bytemuck::Zeroable::zeroed()
    };

    let mut energy = total_energy(&trail.read(&mut evaluator).unwrap());
    for _ in 0..2 {
        trail.evolve(&mut evaluator, &params).unwrap();
        let next = total_energy(&trail.read(&mut evaluator).unwrap());
        assert!(next < energy, "energy went from {energy} to {next}");
        energy = next;
    }

    let texels = trail.read(&mut evaluator).unwrap();
    assert!(texels.iter().flatten().all(|&c| (0.0..=1.0).contains(&c)));
    trail.release(&mut evaluator);
}

#[test]
fn failed_trail_step_does_not_advance_the_agents() {
    let config = slime_config(0.0);
    let mut evaluator = TrailFailingEvaluator {
        inner: CpuEvaluator::new(FIELD),
        fail_trail: true,
    };
    let mut stepper = SimulationStepper::new(&config, &mut evaluator).unwrap();
    let spawned = stepper.agents().agents().to_vec();

    let dt = 0.1;
    let err = stepper.tick(&mut evaluator, dt).unwrap_err();
    assert!(matches!(err, SimError::Eval(EvalError::Dispatch(_))));
    assert_eq!(stepper.ticks(), 0);
    assert_eq!(stepper.agents().agents(), &spawned[..]);
    assert_eq!(evaluator.inner.live_buffers(), 1);

    evaluator.fail_trail = false;
    let report = stepper.tick(&mut evaluator, dt).unwrap();
    assert_eq!(report.tick, 1);
    for (agent, before) in stepper.agents().agents().iter().zip(&spawned) {
        let moved = (agent.position() - before.position()).length();
        assert!((moved - config.slime.agent_speed * dt).abs() < 1e-5, "moved {moved}");
    }
}

#[test]
fn full_ticks_without_deposits_drain_a_seeded_trail() {
    let mut config = slime_config(0.0);
    config.slime.colour = [0.0; 4];
    config.trail.blend_strength = 5.0;
    config.trail.clean_up_strength = 0.3;

    let mut evaluator = CpuEvaluator::new(FIELD);
    let mut stepper = SimulationStepper::new(&config, &mut evaluator).unwrap();

    let mut texels = vec![[0.0f32; 4]; (FIELD[0] * FIELD[1]) as usize];
    texels[(16 * FIELD[0] + 16) as usize] = [1.0, 1.0, 1.0, 1.0];
    let seeded = TrailField::from_texels(&mut evaluator, FIELD, &texels).unwrap();
    stepper.replace_trail(&mut evaluator, seeded);
    assert_eq!(evaluator.live_buffers(), 1);

    let mut energy = total_energy(&stepper.read_trail(&mut evaluator).unwrap());
    assert_eq!(energy, 3.0);
    for _ in 0..2 {
        stepper.tick(&mut evaluator, 0.1).unwrap();
        let next = total_energy(&stepper.read_trail(&mut evaluator).unwrap());
        assert!(next > 0.0 && next < energy, "energy went from {energy} to {next}");
        energy = next;
    }
    assert_eq!(stepper.ticks(), 2);
}

#[test]
fn evolved_trail_is_presented_as_the_image() {
    let mut evaluator = CpuEvaluator::new([8, 8]);
    let mut texels = vec![[0.0f32; 4]; 64];
    texels[0] = [1.0, 0.0, 0.0, 1.0];
    let trail = TrailField::from_texels(&mut evaluator, [8, 8], &texels).unwrap();
    let params = TrailUniforms {
        blend_strength: 0.0,
        clean_up_strength: 0.0,
        delta_time: 0.016,
        size: [8, 8],
        ..bytemuck::Zeroable::zeroed()
    };

    trail.evolve(&mut evaluator, &params).unwrap();
    evaluator.present().unwrap();

    let image = evaluator.read_output().unwrap();
    assert_eq!(image.pixel(0, 0), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(image.pixel(1, 0), [0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn resize_clears_the_trail_and_keeps_the_agents() {
    let config = slime_config(0.0);
    let mut evaluator = CpuEvaluator::new(FIELD);
    let mut stepper = SimulationStepper::new(&config, &mut evaluator).unwrap();
    stepper.tick(&mut evaluator, 0.016).unwrap();
    let before = stepper.agents().agents().to_vec();

    evaluator.resize_output([20, 10]).unwrap();
    stepper.resize(&mut evaluator, [20, 10]).unwrap();

    assert_eq!(stepper.trail().size(), [20, 10]);
    assert_eq!(stepper.agents().agents(), &before[..]);
    assert_eq!(total_energy(&stepper.read_trail(&mut evaluator).unwrap()), 0.0);
    stepper.tick(&mut evaluator, 0.016).unwrap();
    assert_eq!(evaluator.live_buffers(), 1);
}

#[test]
fn reset_respawns_the_population() {
    let config = slime_config(0.0);
    let mut evaluator = CpuEvaluator::new(FIELD);
    let mut stepper = SimulationStepper::new(&config, &mut evaluator).unwrap();
    let spawned = stepper.agents().agents().to_vec();

    stepper.tick(&mut evaluator, 0.1).unwrap();
    assert_ne!(stepper.agents().agents(), &spawned[..]);

    stepper.reset(&config, &mut evaluator).unwrap();
    assert_eq!(stepper.agents().agents(), &spawned[..]);
    assert_eq!(stepper.ticks(), 0);
}
