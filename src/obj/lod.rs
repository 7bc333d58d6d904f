//! Distance-gated geometry buckets

use std::sync::OnceLock;

use super::pool::VertexPool;
use crate::gpu::{GpuDevice, GpuResult};
use crate::lights::LightRole;
use crate::renderer::{DrawListId, PlaneRenderer};

/// A light position and its role code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightMarker {
    pub position: [f32; 3],
    /// Role code, e.g. `[11, 11, 11]` for the red nav light
    pub rgb: [i32; 3],
}

impl LightMarker {
    pub fn role(&self) -> LightRole {
        LightRole::from_code(self.rgb)
    }
}

/// Geometry and lights visible within `[near, far]`
#[derive(Debug)]
pub struct LodBucket {
    pub near: f32,
    pub far: f32,
    pool: VertexPool,
    indices: Vec<u32>,
    lights: Vec<LightMarker>,
    draw_list: OnceLock<DrawListId>,
}

impl LodBucket {
    pub fn new(near: f32, far: f32) -> Self {
        Self {
            near,
            far,
            pool: VertexPool::new(),
            indices: Vec::new(),
            lights: Vec::new(),
            draw_list: OnceLock::new(),
        }
    }

    /// Whether `distance` falls within this bucket, bounds included
    pub fn contains(&self, distance: f32) -> bool {
        distance >= self.near && distance <= self.far
    }

    pub fn pool(&self) -> &VertexPool {
        &self.pool
    }

    pub(crate) fn pool_mut(&mut self) -> &mut VertexPool {
        &mut self.pool
    }

    /// Triangle indices into [`Self::pool`], three per triangle
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub(crate) fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    pub fn lights(&self) -> &[LightMarker] {
        &self.lights
    }

    pub(crate) fn push_light(&mut self, light: LightMarker) {
        self.lights.push(light);
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Nothing to draw
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty() || self.indices.is_empty()
    }

    /// Accumulate face normals, blend and normalize them
    pub(crate) fn finish(&mut self) {
        for triangle in self.indices.chunks_exact(3) {
            self.pool
                .calc_tri_normal(triangle[0], triangle[1], triangle[2]);
        }
        self.pool.normalize_normals();
        self.pool.seal();
    }

    /// The compiled draw list, if this bucket was drawn before
    pub fn draw_list(&self) -> Option<DrawListId> {
        self.draw_list.get().copied()
    }

    /// Compile the draw list on first use
    ///
    /// Must be called on the render thread.
    pub fn compile<G, R>(&self, renderer: &mut R) -> GpuResult<DrawListId>
    where
        G: GpuDevice,
        R: PlaneRenderer<G>,
    {
        if let Some(list) = self.draw_list.get() {
            return Ok(*list);
        }
        let list = renderer.compile_draw_list(self.pool.vertices(), &self.indices)?;
        Ok(*self.draw_list.get_or_init(|| list))
    }
}

/// Index of the first bucket whose range contains `distance`
pub fn select_lod(lods: &[LodBucket], distance: f32) -> Option<usize> {
    lods.iter().position(|lod| lod.contains(distance))
}
