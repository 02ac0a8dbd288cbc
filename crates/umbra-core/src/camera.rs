use glam::{Mat4, Vec3};
use umbra_params::CameraConfig;

/// Fixed look-at camera, expressed as the two inverse matrices the marching kernels need
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub camera_to_world: Mat4,
    pub projection_inverse: Mat4,
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let eye = Vec3::from_array(config.position);
        let target = Vec3::from_array(config.target);
        let up = Vec3::from_array(config.up);

        let view = Mat4::look_at_rh(eye, target, up);
        let projection = Mat4::perspective_rh(config.fov_y_deg.to_radians(), aspect.max(1e-6), config.near, config.far);

        Self {
            camera_to_world: view.inverse(),
            projection_inverse: projection.inverse(),
        }
    }

    /// Aspect ratio of a surface, width over height
    pub fn aspect(size: [u32; 2]) -> f32 {
        size[0] as f32 / size[1].max(1) as f32
    }

    pub fn origin(&self) -> Vec3 {
        self.camera_to_world.w_axis.truncate()
    }

    /// World-space unit ray through a point in normalized device coordinates
    pub fn ray_direction(&self, ndc: [f32; 2]) -> Vec3 {
        let view = self.projection_inverse.project_point3(Vec3::new(ndc[0], ndc[1], 0.0));
        self.camera_to_world.transform_vector3(view).normalize_or_zero()
    }

    /// Column-major arrays for the uniform blocks
    pub fn to_cols(&self) -> ([[f32; 4]; 4], [[f32; 4]; 4]) {
        (self.camera_to_world.to_cols_array_2d(), self.projection_inverse.to_cols_array_2d())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_matches_configured_position() {
        let config = CameraConfig::default();
        let camera = Camera::from_config(&config, 4.0 / 3.0);
        assert!(camera.origin().abs_diff_eq(Vec3::from_array(config.position), 1e-4));
    }

    #[test]
    fn centre_ray_points_at_target() {
        let config = CameraConfig::default();
        let camera = Camera::from_config(&config, 1.0);
        let expected = (Vec3::from_array(config.target) - Vec3::from_array(config.position)).normalize();
        assert!(camera.ray_direction([0.0, 0.0]).abs_diff_eq(expected, 1e-4));
    }
}
