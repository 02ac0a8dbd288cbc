use bytemuck::{Pod, Zeroable};

use super::shape::ShapeDescriptor;

/// Rule combining the distance fields of one object's shapes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BlendOperator {
    Union,
    /// Polynomial smooth minimum; `None` falls back to the global blend strength
    SmoothUnion { strength: Option<f32> },
    /// A single shape drawn as-is; every primitive reports this
    #[default]
    Opaque,
    Intersection,
    /// First shape minus every following shape
    Subtraction,
}

impl BlendOperator {
    pub fn tag(&self) -> u32 {
        match self {
            BlendOperator::Union => 0,
            BlendOperator::SmoothUnion { .. } => 1,
            BlendOperator::Opaque => 2,
            BlendOperator::Intersection => 3,
            BlendOperator::Subtraction => 4,
        }
    }

    pub fn strength(&self, default_strength: f32) -> f32 {
        match self {
            BlendOperator::SmoothUnion { strength: Some(k) } => *k,
            _ => default_strength,
        }
    }
}

/// One entry of the flattened object table
///
/// `start_index` is assigned by the flattener; nodes report it as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRecord {
    pub blend: BlendOperator,
    pub shape_count: u32,
    pub start_index: u32,
}

impl ObjectRecord {
    pub fn to_gpu(&self, default_strength: f32) -> GpuObject {
        GpuObject {
            blend: self.blend.tag(),
            shape_count: self.shape_count,
            start_index: self.start_index,
            blend_strength: self.blend.strength(default_strength),
        }
    }
}

/// Object record as laid out in the `objects` storage buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuObject {
    pub blend: u32,
    pub shape_count: u32,
    pub start_index: u32,
    pub blend_strength: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub name: String,
    pub child_only: bool,
    pub shape: ShapeDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub name: String,
    pub child_only: bool,
    pub blend: BlendOperator,
    pub children: Vec<SceneNode>,
}

/// A scene graph node; compounds own their children
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Primitive(Primitive),
    Compound(Compound),
}

impl SceneNode {
    pub fn primitive(name: impl Into<String>, shape: ShapeDescriptor) -> Self {
        SceneNode::Primitive(Primitive {
            name: name.into(),
            child_only: false,
            shape,
        })
    }

    pub fn compound(name: impl Into<String>, blend: BlendOperator, children: Vec<SceneNode>) -> Self {
        SceneNode::Compound(Compound {
            name: name.into(),
            child_only: false,
            blend,
            children,
        })
    }

    /// Mark this node as living only inside a compound
    pub fn as_child(mut self) -> Self {
        match &mut self {
            SceneNode::Primitive(p) => p.child_only = true,
            SceneNode::Compound(c) => c.child_only = true,
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            SceneNode::Primitive(p) => &p.name,
            SceneNode::Compound(c) => &c.name,
        }
    }

    pub fn is_child_only(&self) -> bool {
        match self {
            SceneNode::Primitive(p) => p.child_only,
            SceneNode::Compound(c) => c.child_only,
        }
    }

    /// Total number of primitives in this subtree
    pub fn shape_count(&self) -> u32 {
        match self {
            SceneNode::Primitive(_) => 1,
            SceneNode::Compound(c) => c.children.iter().map(SceneNode::shape_count).sum(),
        }
    }

    pub fn as_object_record(&self) -> ObjectRecord {
        let blend = match self {
            SceneNode::Primitive(_) => BlendOperator::Opaque,
            SceneNode::Compound(c) => c.blend,
        };
        ObjectRecord {
            blend,
            shape_count: self.shape_count(),
            start_index: 0,
        }
    }

    /// Append this subtree's primitives in left-to-right depth-first order
    ///
    /// Only pushes to `out`; existing contents are never touched.
    pub fn emit_shapes(&self, out: &mut Vec<ShapeDescriptor>) {
        match self {
            SceneNode::Primitive(p) => out.push(p.shape),
            SceneNode::Compound(c) => {
                for child in &c.children {
                    child.emit_shapes(out);
                }
            }
        }
    }

    pub fn shapes(&self) -> Vec<ShapeDescriptor> {
        let mut out = Vec::with_capacity(self.shape_count() as usize);
        self.emit_shapes(&mut out);
        out
    }

    /// Visit every node name in this subtree, pre-order
    pub fn for_each_name<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        f(self.name());
        if let SceneNode::Compound(c) = self {
            for child in &c.children {
                child.for_each_name(f);
            }
        }
    }

    /// Find a node in this subtree by name
    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        if self.name() == name {
            return Some(self);
        }
        match self {
            SceneNode::Primitive(_) => None,
            SceneNode::Compound(c) => c.children.iter_mut().find_map(|child| child.find_mut(name)),
        }
    }
}
