use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

/// Primitive kind, tagged with the value the kernels switch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ShapeKind {
    Box = 0,
    Sphere = 1,
    Torus = 2,
    Cone = 3,
    Cylinder = 4,
}

impl ShapeKind {
    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(ShapeKind::Box),
            1 => Some(ShapeKind::Sphere),
            2 => Some(ShapeKind::Torus),
            3 => Some(ShapeKind::Cone),
            4 => Some(ShapeKind::Cylinder),
            _ => None,
        }
    }
}

/// Primitive geometry record
///
/// The dimension fields grow in arity and their meaning depends on `kind`:
///
/// | kind     | `dimensions1`   | `dimensions2`              | `dimensions3`  |
/// |----------|-----------------|----------------------------|----------------|
/// | Box      | corner rounding |                            | extents        |
/// | Sphere   | radius          |                            |                |
/// | Torus    |                 | (major, minor) radius      |                |
/// | Cone     |                 | (half-angle rad, height)   |                |
/// | Cylinder |                 | (radius, height)           |                |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeDescriptor {
    pub kind: ShapeKind,
    pub position: Vec3,
    pub dimensions1: f32,
    pub dimensions2: Vec2,
    pub dimensions3: Vec3,
    pub colour: Vec4,
}

impl ShapeDescriptor {
    fn blank(kind: ShapeKind, position: Vec3, colour: Vec4) -> Self {
        Self {
            kind,
            position,
            dimensions1: 0.0,
            dimensions2: Vec2::ZERO,
            dimensions3: Vec3::ZERO,
            colour,
        }
    }

    pub fn sphere(position: Vec3, radius: f32, colour: Vec4) -> Self {
        Self {
            dimensions1: radius,
            ..Self::blank(ShapeKind::Sphere, position, colour)
        }
    }

    /// Rounded box; `extents` are the full length, breadth and height
    pub fn cuboid(position: Vec3, extents: Vec3, rounding: f32, colour: Vec4) -> Self {
        Self {
            dimensions1: rounding,
            dimensions3: extents,
            ..Self::blank(ShapeKind::Box, position, colour)
        }
    }

    pub fn torus(position: Vec3, major_radius: f32, minor_radius: f32, colour: Vec4) -> Self {
        Self {
            dimensions2: Vec2::new(major_radius, minor_radius),
            ..Self::blank(ShapeKind::Torus, position, colour)
        }
    }

    /// Cone with its base angle given in degrees, clamped to [0, 90]
    pub fn cone(position: Vec3, base_angle_deg: f32, height: f32, colour: Vec4) -> Self {
        Self {
            dimensions2: Vec2::new(base_angle_deg.clamp(0.0, 90.0).to_radians(), height),
            ..Self::blank(ShapeKind::Cone, position, colour)
        }
    }

    pub fn cylinder(position: Vec3, radius: f32, height: f32, colour: Vec4) -> Self {
        Self {
            dimensions2: Vec2::new(radius, height),
            ..Self::blank(ShapeKind::Cylinder, position, colour)
        }
    }

    pub fn to_gpu(&self) -> GpuShape {
        GpuShape {
            position: self.position.to_array(),
            kind: self.kind.tag(),
            dimensions3: self.dimensions3.to_array(),
            dimensions1: self.dimensions1,
            dimensions2: self.dimensions2.to_array(),
            _pad: [0.0; 2],
            colour: self.colour.to_array(),
        }
    }
}

/// Shape record as laid out in the `shapes` storage buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuShape {
    pub position: [f32; 3],
    pub kind: u32,
    pub dimensions3: [f32; 3],
    pub dimensions1: f32,
    pub dimensions2: [f32; 2],
    pub _pad: [f32; 2],
    pub colour: [f32; 4],
}

impl GpuShape {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn colour(&self) -> Vec4 {
        Vec4::from_array(self.colour)
    }
}
