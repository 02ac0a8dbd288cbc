use glam::{Mat4, Vec2, Vec3, Vec4};
use umbra_params::FractalUniforms;

/// Mandelbulb distance estimate
pub fn mandelbulb(p: Vec3, power: f32, bailout: f32, iterations: u32) -> f32 {
    let mut z = p;
    let mut dr = 1.0f32;
    let mut r = 0.0f32;

    for _ in 0..iterations {
        r = z.length();
        if r > bailout || r < 1e-6 {
            break;
        }
        let theta = (z.z / r).acos() * power;
        let phi = z.y.atan2(z.x) * power;
        dr = r.powf(power - 1.0) * power * dr + 1.0;
        let zr = r.powf(power);
        z = zr * Vec3::new(theta.sin() * phi.cos(), phi.sin() * theta.sin(), theta.cos()) + p;
    }

    if r < 1e-6 {
        return 0.0;
    }
    0.5 * r.ln() * r / dr
}

pub fn render(params: &FractalUniforms, size: [u32; 2], out: &mut [[f32; 4]]) {
    let camera_to_world = Mat4::from_cols_array_2d(&params.camera_to_world);
    let projection_inverse = Mat4::from_cols_array_2d(&params.projection_inverse);
    let origin = camera_to_world.w_axis.truncate();

    let near = Vec4::from_array(params.near_colour);
    let far = Vec4::from_array(params.far_colour);
    let border = Vec4::from_array(params.border_colour);
    let light_pos = Vec4::from_array(params.light_position).truncate();
    let light_colour = Vec4::from_array(params.light_colour).truncate();

    let de = |p: Vec3| mandelbulb(p, params.power, params.bailout, params.iterations);

    for y in 0..size[1] {
        for x in 0..size[0] {
            let uv = Vec2::new(
                (x as f32 + 0.5) / size[0] as f32 * 2.0 - 1.0,
                1.0 - (y as f32 + 0.5) / size[1] as f32 * 2.0,
            );
            let view = projection_inverse.project_point3(uv.extend(0.0));
            let direction = camera_to_world.transform_vector3(view).normalize_or_zero();

            let mut t = 0.0f32;
            let mut steps = 0u32;
            let mut hit = None;
            while steps < params.max_steps && t < params.render_distance {
                let p = origin + direction * t;
                let d = de(p);
                if d < params.minimum_threshold {
                    hit = Some(p);
                    break;
                }
                t += d;
                steps += 1;
            }

            let colour = match hit {
                Some(p) => {
                    let e = params.minimum_threshold.max(1e-4);
                    let n = Vec3::new(
                        de(p + Vec3::X * e) - de(p - Vec3::X * e),
                        de(p + Vec3::Y * e) - de(p - Vec3::Y * e),
                        de(p + Vec3::Z * e) - de(p - Vec3::Z * e),
                    )
                    .normalize_or_zero();
                    let l = (light_pos - p).normalize_or_zero();
                    let diffuse = n.dot(l).max(0.0);
                    let albedo = near.lerp(far, (t / params.render_distance).clamp(0.0, 1.0)).truncate();
                    albedo * light_colour * (params.ambient_strength + diffuse)
                }
                None => {
                    // Rays that grazed the surface took many steps; light them as a rim
                    let glow = (steps as f32 / params.border_steps.max(1) as f32).clamp(0.0, 1.0);
                    border.truncate() * glow * glow * params.border_strength
                }
            };
            out[(y * size[0] + x) as usize] = colour.extend(1.0).to_array();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_is_positive_outside_the_bulb() {
        assert!(mandelbulb(Vec3::new(3.0, 0.0, 0.0), 8.0, 2.0, 16) > 0.5);
    }

    #[test]
    fn estimate_is_finite_at_the_origin() {
        assert!(mandelbulb(Vec3::ZERO, 8.0, 2.0, 16).is_finite());
    }
}
