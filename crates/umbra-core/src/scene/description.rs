//! Declarative scene descriptions
//!
//! A description is a flat list of named nodes; compounds refer to their children by
//! name. That indirection is what makes cycles, shared children and stray registrations
//! possible, so resolving a description into owned trees is where those configuration
//! errors are caught.

use std::collections::HashMap;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use umbra_params::Limits;

use super::node::{BlendOperator, Compound, Primitive, SceneNode};
use super::registry::SceneRegistry;
use super::shape::ShapeDescriptor;
use crate::error::SceneError;

fn default_colour() -> [f32; 4] {
    [0.8, 0.8, 0.8, 1.0]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub nodes: Vec<NodeDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDecl {
    pub name: String,
    /// Only ever rendered through a compound
    #[serde(default)]
    pub child: bool,
    #[serde(flatten)]
    pub body: NodeBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendDecl {
    Union,
    SmoothUnion,
    Opaque,
    Intersection,
    Subtraction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeBody {
    Sphere {
        position: [f32; 3],
        radius: f32,
        #[serde(default = "default_colour")]
        colour: [f32; 4],
    },
    Box {
        position: [f32; 3],
        extents: [f32; 3],
        #[serde(default)]
        rounding: f32,
        #[serde(default = "default_colour")]
        colour: [f32; 4],
    },
    Torus {
        position: [f32; 3],
        major_radius: f32,
        minor_radius: f32,
        #[serde(default = "default_colour")]
        colour: [f32; 4],
    },
    Cone {
        position: [f32; 3],
        base_angle_deg: f32,
        height: f32,
        #[serde(default = "default_colour")]
        colour: [f32; 4],
    },
    Cylinder {
        position: [f32; 3],
        radius: f32,
        height: f32,
        #[serde(default = "default_colour")]
        colour: [f32; 4],
    },
    Compound {
        blend: BlendDecl,
        #[serde(default)]
        strength: Option<f32>,
        children: Vec<String>,
    },
}

impl NodeBody {
    fn shape(&self) -> Option<ShapeDescriptor> {
        let v3 = Vec3::from_array;
        let v4 = Vec4::from_array;
        let shape = match *self {
            NodeBody::Sphere { position, radius, colour } => ShapeDescriptor::sphere(v3(position), radius, v4(colour)),
            NodeBody::Box { position, extents, rounding, colour } => {
                ShapeDescriptor::cuboid(v3(position), v3(extents), rounding, v4(colour))
            }
            NodeBody::Torus { position, major_radius, minor_radius, colour } => {
                ShapeDescriptor::torus(v3(position), major_radius, minor_radius, v4(colour))
            }
            NodeBody::Cone { position, base_angle_deg, height, colour } => {
                ShapeDescriptor::cone(v3(position), base_angle_deg, height, v4(colour))
            }
            NodeBody::Cylinder { position, radius, height, colour } => {
                ShapeDescriptor::cylinder(v3(position), radius, height, v4(colour))
            }
            NodeBody::Compound { .. } => return None,
        };
        Some(shape)
    }

    fn children(&self) -> &[String] {
        match self {
            NodeBody::Compound { children, .. } => children,
            _ => &[],
        }
    }
}

impl From<(BlendDecl, Option<f32>)> for BlendOperator {
    fn from((blend, strength): (BlendDecl, Option<f32>)) -> Self {
        match blend {
            BlendDecl::Union => BlendOperator::Union,
            BlendDecl::SmoothUnion => BlendOperator::SmoothUnion { strength },
            BlendDecl::Opaque => BlendOperator::Opaque,
            BlendDecl::Intersection => BlendOperator::Intersection,
            BlendDecl::Subtraction => BlendOperator::Subtraction,
        }
    }
}

impl SceneDescription {
    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }
}

impl SceneRegistry {
    /// Resolve a description into owned trees and register the top-level ones
    ///
    /// Never fails outright: every configuration error is returned as a diagnostic and
    /// the offending node or reference is left out.
    pub fn from_description(description: &SceneDescription, limits: &Limits) -> (SceneRegistry, Vec<SceneError>) {
        let mut diagnostics = Vec::new();

        let mut decls: HashMap<&str, &NodeDecl> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for decl in &description.nodes {
            if decls.contains_key(decl.name.as_str()) {
                diagnostics.push(SceneError::DuplicateNode(decl.name.clone()));
                continue;
            }
            decls.insert(&decl.name, decl);
            order.push(&decl.name);
        }

        // Accept each child reference at most once across the whole description
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut accepted: HashMap<&str, Vec<&str>> = HashMap::new();
        for &name in &order {
            let decl = decls[name];
            let mut kept = Vec::new();
            for child in decl.body.children() {
                let Some(&child_decl) = decls.get(child.as_str()) else {
                    diagnostics.push(SceneError::UnknownNode {
                        parent: name.to_string(),
                        child: child.clone(),
                    });
                    continue;
                };
                let child = child_decl.name.as_str();
                if parent.contains_key(child) {
                    diagnostics.push(SceneError::SharedChild {
                        parent: name.to_string(),
                        child: child.to_string(),
                    });
                    continue;
                }
                parent.insert(child, name);
                kept.push(child);
            }
            accepted.insert(name, kept);
        }

        // Break cycles by dropping the reference into the first repeated node
        for &start in &order {
            let mut path: Vec<&str> = vec![start];
            let mut current = start;
            while let Some(&up) = parent.get(current) {
                if path.contains(&up) {
                    diagnostics.push(SceneError::Cycle(up.to_string()));
                    if let Some(&owner) = parent.get(up) {
                        if let Some(children) = accepted.get_mut(owner) {
                            children.retain(|c| *c != up);
                        }
                    }
                    parent.remove(up);
                    break;
                }
                path.push(up);
                current = up;
            }
        }

        let mut registry = SceneRegistry::new(limits);
        for &name in &order {
            let decl = decls[name];
            match (parent.contains_key(name), decl.child) {
                (true, false) => {
                    diagnostics.push(SceneError::ChildSelfRegistration(name.to_string()));
                    continue;
                }
                (false, true) => {
                    diagnostics.push(SceneError::OrphanChild(name.to_string()));
                    continue;
                }
                (true, true) => continue,
                (false, false) => {}
            }

            let node = build(name, &decls, &accepted);
            if let Err(err) = registry.register(node) {
                diagnostics.push(err);
            }
        }

        for diagnostic in &diagnostics {
            log::warn!("Scene description: {}", diagnostic);
        }
        (registry, diagnostics)
    }
}

fn build(name: &str, decls: &HashMap<&str, &NodeDecl>, accepted: &HashMap<&str, Vec<&str>>) -> SceneNode {
    let decl = decls[name];
    if let Some(shape) = decl.body.shape() {
        return SceneNode::Primitive(Primitive {
            name: decl.name.clone(),
            child_only: decl.child,
            shape,
        });
    }

    let (blend, strength) = match decl.body {
        NodeBody::Compound { blend, strength, .. } => (blend, strength),
        _ => (BlendDecl::Union, None),
    };
    let children = accepted
        .get(name)
        .map(|kids| kids.iter().map(|kid| build(kid, decls, accepted)).collect::<Vec<_>>())
        .unwrap_or_default();

    SceneNode::Compound(Compound {
        name: decl.name.clone(),
        child_only: decl.child,
        blend: BlendOperator::from((blend, strength)),
        children,
    })
}
