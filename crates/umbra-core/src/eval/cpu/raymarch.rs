use glam::{Mat4, Vec2, Vec3, Vec4};
use umbra_params::SceneUniforms;

use crate::scene::{GpuObject, GpuShape, ShapeKind};

const BACKGROUND: Vec3 = Vec3::new(0.04, 0.05, 0.08);
const SHININESS: f32 = 32.0;

/// Decoded inputs of one ray-march dispatch
pub struct SceneView<'a> {
    params: &'a SceneUniforms,
    camera_to_world: Mat4,
    projection_inverse: Mat4,
    objects: Vec<GpuObject>,
    shapes: Vec<GpuShape>,
}

impl<'a> SceneView<'a> {
    pub fn new(params: &'a SceneUniforms, objects: Vec<GpuObject>, shapes: Vec<GpuShape>) -> Self {
        Self {
            params,
            camera_to_world: Mat4::from_cols_array_2d(&params.camera_to_world),
            projection_inverse: Mat4::from_cols_array_2d(&params.projection_inverse),
            objects,
            shapes,
        }
    }

    /// Signed distance and albedo of the nearest object
    fn sample(&self, p: Vec3) -> (f32, Vec3) {
        let object_count = (self.params.object_count as usize).min(self.objects.len());
        let mut nearest = (self.params.render_distance, BACKGROUND);

        for object in &self.objects[..object_count] {
            let start = object.start_index as usize;
            let end = (start + object.shape_count as usize).min(self.shapes.len());
            if start >= end {
                continue;
            }
            let hit = blend_object(object, &self.shapes[start..end], p);
            if hit.0 < nearest.0 {
                nearest = hit;
            }
        }
        nearest
    }

    fn distance(&self, p: Vec3) -> f32 {
        self.sample(p).0
    }

    fn normal(&self, p: Vec3) -> Vec3 {
        let e = self.params.minimum_threshold.max(1e-4);
        Vec3::new(
            self.distance(p + Vec3::X * e) - self.distance(p - Vec3::X * e),
            self.distance(p + Vec3::Y * e) - self.distance(p - Vec3::Y * e),
            self.distance(p + Vec3::Z * e) - self.distance(p - Vec3::Z * e),
        )
        .normalize_or_zero()
    }

    fn soft_shadow(&self, origin: Vec3, direction: Vec3, max_t: f32) -> f32 {
        let k = self.params.shadow_attenuation;
        let mut shade = 1.0f32;
        let mut t = self.params.minimum_threshold * 10.0;
        for _ in 0..self.params.max_steps {
            if t >= max_t {
                break;
            }
            let d = self.distance(origin + direction * t);
            if d < self.params.minimum_threshold {
                return 0.0;
            }
            shade = shade.min(k * d / t);
            t += d;
        }
        shade.clamp(0.0, 1.0)
    }

    fn shade(&self, x: u32, y: u32, size: [u32; 2]) -> [f32; 4] {
        let uv = Vec2::new(
            (x as f32 + 0.5) / size[0] as f32 * 2.0 - 1.0,
            1.0 - (y as f32 + 0.5) / size[1] as f32 * 2.0,
        );
        let origin = self.camera_to_world.w_axis.truncate();
        let view = self.projection_inverse.project_point3(uv.extend(0.0));
        let direction = self.camera_to_world.transform_vector3(view).normalize_or_zero();

        let mut t = 0.0f32;
        for _ in 0..self.params.max_steps {
            if t > self.params.render_distance {
                break;
            }
            let p = origin + direction * t;
            let (d, albedo) = self.sample(p);
            if d < self.params.minimum_threshold {
                return self.light(p, direction, albedo).extend(1.0).to_array();
            }
            t += d;
        }
        BACKGROUND.extend(1.0).to_array()
    }

    fn light(&self, p: Vec3, view_dir: Vec3, albedo: Vec3) -> Vec3 {
        let params = self.params;
        let n = self.normal(p);
        let light_pos = Vec4::from_array(params.light_position).truncate();
        let light_colour = Vec4::from_array(params.light_colour).truncate();
        let to_light = light_pos - p;
        let l = to_light.normalize_or_zero();

        let shadow = self.soft_shadow(p + n * params.minimum_threshold * 2.0, l, to_light.length());
        let diffuse = n.dot(l).max(0.0);
        let reflected = (-l) - 2.0 * (-l).dot(n) * n;
        let specular = reflected.dot(-view_dir).max(0.0).powf(SHININESS) * params.specular_strength;

        albedo * light_colour * (params.ambient_strength + diffuse * shadow) + light_colour * specular * shadow
    }
}

pub fn render(scene: &SceneView, size: [u32; 2], out: &mut [[f32; 4]]) {
    for y in 0..size[1] {
        for x in 0..size[0] {
            out[(y * size[0] + x) as usize] = scene.shade(x, y, size);
        }
    }
}

fn blend_object(object: &GpuObject, shapes: &[GpuShape], p: Vec3) -> (f32, Vec3) {
    let mut acc = (shape_distance(&shapes[0], p), shapes[0].colour().truncate());
    for shape in &shapes[1..] {
        let d = shape_distance(shape, p);
        let colour = shape.colour().truncate();
        acc = match object.blend {
            1 => smooth_union(acc, (d, colour), object.blend_strength),
            3 => {
                if d > acc.0 {
                    (d, colour)
                } else {
                    acc
                }
            }
            4 => (acc.0.max(-d), acc.1),
            // Union, and opaque objects that somehow carry more than one shape
            _ => {
                if d < acc.0 {
                    (d, colour)
                } else {
                    acc
                }
            }
        };
    }
    acc
}

fn smooth_union(a: (f32, Vec3), b: (f32, Vec3), k: f32) -> (f32, Vec3) {
    if k <= 0.0 {
        return if a.0 < b.0 { a } else { b };
    }
    let h = (0.5 + 0.5 * (b.0 - a.0) / k).clamp(0.0, 1.0);
    let d = b.0 + (a.0 - b.0) * h - k * h * (1.0 - h);
    (d, b.1.lerp(a.1, h))
}

pub fn shape_distance(shape: &GpuShape, p: Vec3) -> f32 {
    let q = p - shape.position();
    match ShapeKind::from_tag(shape.kind) {
        Some(ShapeKind::Sphere) => q.length() - shape.dimensions1,
        Some(ShapeKind::Box) => {
            let rounding = shape.dimensions1;
            let half = Vec3::from_array(shape.dimensions3) * 0.5;
            let d = q.abs() - half + Vec3::splat(rounding);
            d.max(Vec3::ZERO).length() + d.max_element().min(0.0) - rounding
        }
        Some(ShapeKind::Torus) => {
            let [major, minor] = shape.dimensions2;
            Vec2::new(Vec2::new(q.x, q.z).length() - major, q.y).length() - minor
        }
        Some(ShapeKind::Cone) => {
            // Apex at the shape position, opening downward
            let [angle, height] = shape.dimensions2;
            if height <= 0.0 {
                return q.length();
            }
            let tip = Vec2::new(angle.clamp(1e-3, 1.55).tan(), -1.0) * height;
            let w = Vec2::new(Vec2::new(q.x, q.z).length(), q.y);
            let a = w - tip * (w.dot(tip) / tip.dot(tip)).clamp(0.0, 1.0);
            let b = w - tip * Vec2::new((w.x / tip.x).clamp(0.0, 1.0), 1.0);
            let k = tip.y.signum();
            let d = a.dot(a).min(b.dot(b));
            let s = (k * (w.x * tip.y - w.y * tip.x)).max(k * (w.y - tip.y));
            d.sqrt() * s.signum()
        }
        Some(ShapeKind::Cylinder) => {
            let [radius, height] = shape.dimensions2;
            let d = Vec2::new(Vec2::new(q.x, q.z).length(), q.y).abs() - Vec2::new(radius, height * 0.5);
            d.x.max(d.y).min(0.0) + d.max(Vec2::ZERO).length()
        }
        None => f32::MAX,
    }
}
