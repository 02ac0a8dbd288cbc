use super::node::{GpuObject, ObjectRecord, SceneNode};
use super::shape::{GpuShape, ShapeDescriptor};
use crate::error::SceneError;

/// Flattened snapshot of the scene for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatSceneBuffers {
    pub objects: Vec<ObjectRecord>,
    pub shapes: Vec<ShapeDescriptor>,
}

impl FlatSceneBuffers {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.shapes.clear();
    }

    pub fn gpu_objects(&self, default_strength: f32) -> Vec<GpuObject> {
        self.objects.iter().map(|o| o.to_gpu(default_strength)).collect()
    }

    pub fn gpu_shapes(&self) -> Vec<GpuShape> {
        self.shapes.iter().map(ShapeDescriptor::to_gpu).collect()
    }

    /// True when the object ranges tile `shapes` exactly, in order
    pub fn is_partitioned(&self) -> bool {
        let mut next = 0u32;
        for object in &self.objects {
            if object.start_index != next {
                return false;
            }
            next += object.shape_count;
        }
        next as usize == self.shapes.len()
    }
}

/// Flatten top-level nodes into fresh buffers
pub fn flatten<'a, I>(nodes: I) -> Result<FlatSceneBuffers, SceneError>
where
    I: IntoIterator<Item = &'a SceneNode>,
{
    let mut buffers = FlatSceneBuffers::default();
    flatten_into(nodes, &mut buffers)?;
    Ok(buffers)
}

/// Flatten top-level nodes into a caller-owned buffer
///
/// `out` is cleared first and then only appended to. Start indices come from a running
/// total across all top-level nodes. Each object's reported shape count is checked
/// against what its subtree actually emitted.
pub fn flatten_into<'a, I>(nodes: I, out: &mut FlatSceneBuffers) -> Result<(), SceneError>
where
    I: IntoIterator<Item = &'a SceneNode>,
{
    out.clear();
    let mut running = 0u32;

    for node in nodes {
        let mut record = node.as_object_record();
        record.start_index = running;
        running += record.shape_count;

        let before = out.shapes.len();
        node.emit_shapes(&mut out.shapes);
        let emitted = (out.shapes.len() - before) as u32;

        if emitted != record.shape_count {
            return Err(SceneError::ShapeCountMismatch {
                name: node.name().to_string(),
                reported: record.shape_count,
                emitted,
            });
        }
        out.objects.push(record);
    }

    log::debug!("Flattened {} objects into {} shapes", out.objects.len(), out.shapes.len());
    Ok(())
}
