use std::collections::HashSet;

use umbra_params::Limits;

use super::flatten::{flatten, FlatSceneBuffers};
use super::node::SceneNode;
use crate::error::SceneError;

/// Owns the top-level scene objects, in registration order
///
/// This is the explicit context shapes register with; nothing is global.
#[derive(Debug, Clone)]
pub struct SceneRegistry {
    nodes: Vec<SceneNode>,
    names: HashSet<String>,
    max_shapes: usize,
    max_objects: usize,
}

impl SceneRegistry {
    pub fn new(limits: &Limits) -> Self {
        Self {
            nodes: Vec::new(),
            names: HashSet::new(),
            max_shapes: limits.max_shapes as usize,
            max_objects: limits.max_objects as usize,
        }
    }

    /// Register a top-level node
    ///
    /// Child-only nodes, nodes sharing a name with anything already registered, and
    /// nodes that would overflow the shape or object limits are rejected and logged.
    pub fn register(&mut self, node: SceneNode) -> Result<(), SceneError> {
        let result = self.check(&node);
        match result {
            Ok(()) => {
                node.for_each_name(&mut |name| {
                    self.names.insert(name.to_string());
                });
                log::debug!("Registered scene object `{}` ({} shapes)", node.name(), node.shape_count());
                self.nodes.push(node);
                Ok(())
            }
            Err(err) => {
                log::warn!("Rejected scene object `{}`: {}", node.name(), err);
                Err(err)
            }
        }
    }

    fn check(&self, node: &SceneNode) -> Result<(), SceneError> {
        if node.is_child_only() {
            return Err(SceneError::ChildSelfRegistration(node.name().to_string()));
        }

        let mut seen = HashSet::new();
        let mut duplicate = None;
        node.for_each_name(&mut |name| {
            if duplicate.is_none() && (self.names.contains(name) || !seen.insert(name)) {
                duplicate = Some(name.to_string());
            }
        });
        if let Some(name) = duplicate {
            return Err(SceneError::DuplicateNode(name));
        }

        if self.nodes.len() + 1 > self.max_objects {
            return Err(SceneError::Capacity {
                what: "object",
                requested: self.nodes.len() + 1,
                max: self.max_objects,
            });
        }
        let shapes = self.shape_count() + node.shape_count() as usize;
        if shapes > self.max_shapes {
            return Err(SceneError::Capacity {
                what: "shape",
                requested: shapes,
                max: self.max_shapes,
            });
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn shape_count(&self) -> usize {
        self.nodes.iter().map(|n| n.shape_count() as usize).sum()
    }

    pub fn max_shapes(&self) -> usize {
        self.max_shapes
    }

    pub fn max_objects(&self) -> usize {
        self.max_objects
    }

    /// Look up any node, top-level or nested, for mutation between frames
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find_map(|node| node.find_mut(name))
    }

    /// Unregister a top-level node
    pub fn remove(&mut self, name: &str) -> Option<SceneNode> {
        let index = self.nodes.iter().position(|n| n.name() == name)?;
        let node = self.nodes.remove(index);
        node.for_each_name(&mut |n| {
            self.names.remove(n);
        });
        Some(node)
    }

    pub fn flatten(&self) -> Result<FlatSceneBuffers, SceneError> {
        flatten(&self.nodes)
    }
}
