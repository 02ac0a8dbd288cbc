use glam::{Vec3, Vec4};
use umbra_core::{
    BlendOperator, BufferId, CpuEvaluator, DispatchRequest, EvalError, Evaluator, FrameCompositor, FrameError,
    FrameStatus, Limits, OutputImage, RenderConfig, RenderMode, SceneError, SceneNode, SceneRegistry,
    ShapeDescriptor, SimError, SlimeConfig,
};

const SIZE: [u32; 2] = [16, 12];
const BACKGROUND: [f32; 4] = [0.04, 0.05, 0.08, 1.0];

/// CPU evaluator that can be told to refuse dispatches
struct FlakyEvaluator {
    inner: CpuEvaluator,
    fail_dispatch: bool,
}

impl FlakyEvaluator {
    fn new(size: [u32; 2]) -> Self {
        Self {
            inner: CpuEvaluator::new(size),
            fail_dispatch: false,
        }
    }
}

impl Evaluator for FlakyEvaluator {
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
        if self.fail_dispatch {
            return Err(EvalError::Dispatch("injected failure".to_string()));
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

fn config(mode: RenderMode) -> RenderConfig {
    let mut config = RenderConfig {
        mode,
        slime: SlimeConfig {
            agent_count: 16,
            ..SlimeConfig::default()
        },
        ..RenderConfig::default()
    };
    config.surface.size = SIZE;
    config.march.max_steps = 64;
    config.fractal.iterations = 6;
    config
}

fn sphere_scene(limits: &Limits) -> SceneRegistry {
    let mut registry = SceneRegistry::new(limits);
    registry
        .register(SceneNode::primitive(
            "ball",
            ShapeDescriptor::sphere(Vec3::ZERO, 1.0, Vec4::new(0.9, 0.2, 0.2, 1.0)),
        ))
        .unwrap();
    registry
}

fn approx_eq(a: [f32; 4], b: [f32; 4]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
}

#[test]
fn scene_frame_renders_the_registered_objects() {
    let config = config(RenderMode::Scene);
    let registry = sphere_scene(&config.limits);
    let mut evaluator = CpuEvaluator::new(SIZE);
    let mut compositor = FrameCompositor::new(config, registry, &mut evaluator).unwrap();

    let report = compositor.advance_frame(&mut evaluator, 0.016).unwrap();
    assert_eq!(report.status, FrameStatus::Rendered);
    assert_eq!((report.objects, report.shapes), (1, 1));

    let image = evaluator.read_output().unwrap();
    assert!(approx_eq(image.pixel(0, 0), BACKGROUND));
    assert!(!approx_eq(image.pixel(SIZE[0] / 2, SIZE[1] / 2), BACKGROUND));
    assert_eq!(evaluator.live_buffers(), 0);
}

#[test]
fn empty_scene_renders_background() {
    let config = config(RenderMode::Scene);
    let registry = SceneRegistry::new(&config.limits);
    let mut evaluator = CpuEvaluator::new(SIZE);
    let mut compositor = FrameCompositor::new(config, registry, &mut evaluator).unwrap();

    let report = compositor.advance_frame(&mut evaluator, 0.016).unwrap();
    assert_eq!(report.status, FrameStatus::Rendered);
    assert_eq!((report.objects, report.shapes), (0, 0));

    let image = evaluator.read_output().unwrap();
    assert!(image.pixels.iter().all(|&p| approx_eq(p, BACKGROUND)));
    assert_eq!(evaluator.live_buffers(), 0);
}

#[test]
fn failed_dispatch_keeps_the_previous_front_image() {
    let config = config(RenderMode::Scene);
    let registry = sphere_scene(&config.limits);
    let mut evaluator = FlakyEvaluator::new(SIZE);
    let mut compositor = FrameCompositor::new(config, registry, &mut evaluator).unwrap();

    compositor.advance_frame(&mut evaluator, 0.016).unwrap();
    let shown = evaluator.read_output().unwrap();

    compositor.registry_mut().remove("ball");
    evaluator.fail_dispatch = true;
    let report = compositor.advance_frame(&mut evaluator, 0.016).unwrap();

    assert_eq!(report.status, FrameStatus::Retained);
    assert_eq!(compositor.retained_frames(), 1);
    assert_eq!(evaluator.read_output().unwrap(), shown);
    assert_eq!(evaluator.inner.live_buffers(), 0);

    evaluator.fail_dispatch = false;
    let report = compositor.advance_frame(&mut evaluator, 0.016).unwrap();
    assert_eq!(report.status, FrameStatus::Rendered);
    assert_eq!(compositor.frames(), 3);
}

#[test]
fn failed_tick_leaves_the_agents_untouched() {
    let config = config(RenderMode::Slime);
    let registry = SceneRegistry::new(&config.limits);
    let mut evaluator = FlakyEvaluator::new(SIZE);
    let mut compositor = FrameCompositor::new(config, registry, &mut evaluator).unwrap();
    let before = compositor.stepper().unwrap().agents().agents().to_vec();

    evaluator.fail_dispatch = true;
    let report = compositor.advance_frame(&mut evaluator, 0.016).unwrap();

    assert_eq!(report.status, FrameStatus::Retained);
    assert_eq!(compositor.stepper().unwrap().agents().agents(), &before[..]);
    assert_eq!(evaluator.inner.live_buffers(), 1);
}

#[test]
fn slime_frames_show_the_trail() {
    let config = config(RenderMode::Slime);
    let registry = SceneRegistry::new(&config.limits);
    let mut evaluator = CpuEvaluator::new(SIZE);
    let mut compositor = FrameCompositor::new(config, registry, &mut evaluator).unwrap();

    let report = compositor.advance_frame(&mut evaluator, 0.016).unwrap();
    assert_eq!(report.status, FrameStatus::Rendered);
    assert_eq!(report.agents, 16);
    assert!(evaluator.read_output().unwrap().mean_luminance() > 0.0);

    compositor.teardown(&mut evaluator);
    assert_eq!(evaluator.live_buffers(), 0);
}

#[test]
fn edited_trail_parameters_apply_on_the_next_frame() {
    let config = config(RenderMode::Slime);
    let registry = SceneRegistry::new(&config.limits);
    let mut evaluator = CpuEvaluator::new(SIZE);
    let mut compositor = FrameCompositor::new(config, registry, &mut evaluator).unwrap();
    compositor.advance_frame(&mut evaluator, 0.016).unwrap();

    // Stop depositing; the trail can then only fade
    compositor.config_mut().slime.colour = [0.0; 4];
    compositor.config_mut().trail.clean_up_strength = 2.0;

    let mut energy = f32::MAX;
    for _ in 0..3 {
        compositor.advance_frame(&mut evaluator, 0.016).unwrap();
        let trail = compositor.stepper().unwrap().read_trail(&mut evaluator).unwrap();
        let next = umbra_core::total_energy(&trail);
        assert!(next < energy);
        energy = next;
    }
}

#[test]
fn fractal_frame_renders_without_scene_buffers() {
    let config = config(RenderMode::Fractal);
    let registry = SceneRegistry::new(&config.limits);
    let mut evaluator = CpuEvaluator::new(SIZE);
    let mut compositor = FrameCompositor::new(config, registry, &mut evaluator).unwrap();

    let report = compositor.advance_frame(&mut evaluator, 0.016).unwrap();
    assert_eq!(report.status, FrameStatus::Rendered);
    assert_eq!(evaluator.live_buffers(), 0);
    assert_eq!(evaluator.read_output().unwrap().size, SIZE);
}

#[test]
fn capacity_violations_fail_startup() {
    let mut config = config(RenderMode::Scene);
    let mut registry = SceneRegistry::new(&Limits::default());
    registry
        .register(SceneNode::compound(
            "pair",
            BlendOperator::Union,
            vec![
                SceneNode::primitive("a", ShapeDescriptor::sphere(Vec3::ZERO, 1.0, Vec4::ONE)).as_child(),
                SceneNode::primitive("b", ShapeDescriptor::sphere(Vec3::X, 1.0, Vec4::ONE)).as_child(),
            ],
        ))
        .unwrap();
    config.limits.max_shapes = 1;

    let mut evaluator = CpuEvaluator::new(SIZE);
    let err = FrameCompositor::new(config, registry, &mut evaluator).err();
    assert_eq!(
        err,
        Some(FrameError::Scene(SceneError::Capacity {
            what: "shape",
            requested: 2,
            max: 1
        }))
    );

    let mut config = self::config(RenderMode::Slime);
    config.limits.max_agents = 8;
    let err = FrameCompositor::new(config.clone(), SceneRegistry::new(&config.limits), &mut evaluator).err();
    assert_eq!(err, Some(FrameError::Sim(SimError::Capacity { requested: 16, max: 8 })));
}

#[test]
fn compositor_sizes_the_evaluator_and_follows_resizes() {
    let config = config(RenderMode::Slime);
    let registry = SceneRegistry::new(&config.limits);
    let mut evaluator = CpuEvaluator::new([4, 4]);
    let mut compositor = FrameCompositor::new(config, registry, &mut evaluator).unwrap();
    assert_eq!(evaluator.output_size(), SIZE);

    compositor.resize(&mut evaluator, [20, 10]).unwrap();
    assert_eq!(evaluator.output_size(), [20, 10]);
    assert_eq!(compositor.stepper().unwrap().trail().size(), [20, 10]);
    assert!(compositor.advance_frame(&mut evaluator, 0.016).is_ok());

    assert!(matches!(
        compositor.resize(&mut evaluator, [0, 10]),
        Err(FrameError::Config(_))
    ));
}
