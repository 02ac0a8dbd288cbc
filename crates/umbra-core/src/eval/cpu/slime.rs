use glam::{Vec2, Vec4};
use umbra_params::{AgentUniforms, TrailUniforms};

use crate::error::EvalError;
use crate::sim::Agent;

pub fn check_field(trail: &[[f32; 4]], size: [u32; 2]) -> Result<(), EvalError> {
    let expected = (size[0] * size[1]) as usize;
    if trail.len() != expected {
        return Err(EvalError::SizeMismatch {
            expected: expected * std::mem::size_of::<[f32; 4]>(),
            actual: std::mem::size_of_val(trail),
        });
    }
    Ok(())
}

fn cell(position: Vec2, size: [u32; 2]) -> usize {
    let x = ((position.x * size[0] as f32) as i64).clamp(0, size[0] as i64 - 1) as u32;
    let y = ((position.y * size[1] as f32) as i64).clamp(0, size[1] as i64 - 1) as u32;
    (y * size[0] + x) as usize
}

fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

fn sense(trail: &[[f32; 4]], size: [u32; 2], position: Vec2, direction: Vec2, distance: f32) -> f32 {
    let texel = trail[cell(position + direction * distance, size)];
    texel[0] + texel[1] + texel[2]
}

/// Sense, steer, move and deposit, one agent at a time in index order
pub fn update_agents(params: &AgentUniforms, agents: &mut [Agent], trail: &mut [[f32; 4]], size: [u32; 2]) {
    let dt = params.delta_time;
    let count = (params.agent_count as usize).min(agents.len());
    let colour = Vec4::from_array(params.colour);

    for agent in &mut agents[..count] {
        let mut forward = agent.heading();
        let mut position = agent.position();

        let left = sense(trail, size, position, rotate(forward, params.view_angle), params.view_distance);
        let centre = sense(trail, size, position, forward, params.view_distance);
        let right = sense(trail, size, position, rotate(forward, -params.view_angle), params.view_distance);

        let turn = params.turn_strength * dt;
        if centre < left || centre < right {
            if left > right {
                forward = rotate(forward, turn);
            } else if right > left {
                forward = rotate(forward, -turn);
            }
        }

        position += forward * params.agent_speed * dt;

        // Reflect off the field edges
        if position.x < 0.0 || position.x > 1.0 {
            position.x = if position.x < 0.0 { -position.x } else { 2.0 - position.x };
            forward.x = -forward.x;
        }
        if position.y < 0.0 || position.y > 1.0 {
            position.y = if position.y < 0.0 { -position.y } else { 2.0 - position.y };
            forward.y = -forward.y;
        }
        position = position.clamp(Vec2::ZERO, Vec2::ONE);

        let index = cell(position, size);
        let deposited = (Vec4::from_array(trail[index]) + colour).min(Vec4::ONE);
        trail[index] = deposited.to_array();

        agent.forward = forward.to_array();
        agent.position = position.to_array();
    }
}

/// 3x3 blur blended in by `blend_strength * dt`, then linear decay
///
/// Every texel reads the pre-step field; results go through a scratch copy and are
/// written back over `trail`.
pub fn evolve_trail(params: &TrailUniforms, trail: &mut [[f32; 4]], size: [u32; 2]) {
    let [w, h] = size;
    let dt = params.delta_time;
    let blend = (params.blend_strength * dt).clamp(0.0, 1.0);
    let decay = params.clean_up_strength * dt;

    let mut scratch = vec![[0.0f32; 4]; trail.len()];
    for y in 0..h {
        for x in 0..w {
            let mut sum = Vec4::ZERO;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                    let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                    sum += Vec4::from_array(trail[(sy * w + sx) as usize]);
                }
            }
            let index = (y * w + x) as usize;
            let original = Vec4::from_array(trail[index]);
            let blurred = original.lerp(sum / 9.0, blend);
            let mut evolved = (blurred - Vec4::splat(decay)).max(Vec4::ZERO);
            evolved.w = 1.0;
            scratch[index] = evolved.to_array();
        }
    }
    trail.copy_from_slice(&scratch);
}
