use crate::eval::Kernel;

/// Scene ray-marching shader
pub fn ray_march() -> &'static str {
    include_str!("ray_march.wgsl")
}

/// Mandelbulb ray-marching shader
pub fn fractal() -> &'static str {
    include_str!("fractal.wgsl")
}

/// Slime agent sense-steer-move-deposit shader
pub fn agent_update() -> &'static str {
    include_str!("agent_update.wgsl")
}

/// Trail blur and decay shader
pub fn trail_evolve() -> &'static str {
    include_str!("trail_evolve.wgsl")
}

pub fn source(kernel: Kernel) -> &'static str {
    match kernel {
        Kernel::RayMarch => ray_march(),
        Kernel::Fractal => fractal(),
        Kernel::AgentUpdate => agent_update(),
        Kernel::TrailEvolve => trail_evolve(),
    }
}
