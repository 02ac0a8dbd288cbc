//! Error taxonomy for the core engine
//!
//! Configuration problems surface as [`SceneError`], construction-time capacity problems
//! as [`SimError`], and anything the evaluator refuses as [`EvalError`]. The compositor
//! folds all three into [`FrameError`].

use thiserror::Error;

/// Scene graph configuration errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SceneError {
    #[error("node `{0}` is part of a reference cycle")]
    Cycle(String),

    #[error("node `{0}` is used as a child and cannot register as a top-level object")]
    ChildSelfRegistration(String),

    #[error("node `{0}` is already registered")]
    DuplicateNode(String),

    #[error("node `{parent}` references unknown child `{child}`")]
    UnknownNode { parent: String, child: String },

    #[error("node `{child}` already has a parent; `{parent}` cannot adopt it")]
    SharedChild { parent: String, child: String },

    #[error("node `{0}` is marked as a child but no compound references it")]
    OrphanChild(String),

    #[error("object `{name}` reported {reported} shapes but emitted {emitted}")]
    ShapeCountMismatch {
        name: String,
        reported: u32,
        emitted: u32,
    },

    #[error("{what} capacity exceeded: {requested} requested, {max} allowed")]
    Capacity {
        what: &'static str,
        requested: usize,
        max: usize,
    },
}

/// Errors raised by the parallel evaluator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("buffer `{0}` has no elements")]
    EmptyBuffer(&'static str),

    #[error("buffer `{label}` is {len} bytes, not a multiple of its {stride}-byte stride")]
    StrideMismatch {
        label: &'static str,
        len: usize,
        stride: usize,
    },

    #[error("unknown buffer id {0}")]
    UnknownBuffer(u64),

    #[error("kernel {kernel} is missing its `{binding}` binding")]
    MissingBinding {
        kernel: &'static str,
        binding: &'static str,
    },

    #[error("kernel {kernel} expects {expected} uniform bytes, got {actual}")]
    UniformSize {
        kernel: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("read-back failed: {0}")]
    Readback(String),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("device error: {0}")]
    Device(String),
}

/// Simulation construction and tick errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    #[error("agent capacity exceeded: {requested} requested, {max} allowed")]
    Capacity { requested: u32, max: u32 },

    #[error("agent population must not be empty")]
    EmptyPopulation,

    #[error("spawn radius {0} must lie in (0, 0.5] to keep agents inside the field")]
    SpawnRadius(f32),

    #[error("agent parameters: {0}")]
    Params(String),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Anything that can stop a frame from being produced
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl FrameError {
    /// Resource errors skip a frame; everything else is fatal to the caller
    ///
    /// A scene that outgrows the capacity limits between frames is skipped too.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            FrameError::Eval(_) | FrameError::Sim(SimError::Eval(_)) | FrameError::Scene(SceneError::Capacity { .. })
        )
    }
}
