//! Render-thread collaborator and the vertex layout it consumes
//!
//! Nothing in the crate issues graphics API calls itself. Per frame the
//! context hands a [`PlaneRenderer`] the prepared vertex and index data of one
//! LOD (once, to compile), the texture handles to bind and the light sprites
//! to draw.

use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;

use crate::gpu::{BufferUsage, GpuDevice, GpuResult};
use crate::lights::LightSprite;

/// An interleaved position/texcoord/normal vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// 3D position
    pub position: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
    /// Normal vector; unit length once the model is built
    pub normal: [f32; 3],
}

impl Vertex {
    /// Size of a vertex in bytes
    pub const fn size() -> usize {
        std::mem::size_of::<Self>()
    }

    /// Number of floats per vertex
    pub const fn floats_per_vertex() -> usize {
        8 // 3 + 2 + 3
    }
}

/// Opaque handle to a compiled LOD draw list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawListId(pub u64);

/// Draws prepared plane geometry and lights
pub trait PlaneRenderer<G: GpuDevice> {
    /// Compile one LOD into a reusable draw list
    ///
    /// Called once per LOD; the returned id is cached by the LOD.
    fn compile_draw_list(&mut self, vertices: &[Vertex], indices: &[u32]) -> GpuResult<DrawListId>;

    /// Bind the base texture and the lit overlay for the next draw
    fn bind_textures(&mut self, base: Option<&G::Texture>, lit: Option<&G::Texture>);

    /// Draw a previously compiled list
    fn call_draw_list(&mut self, list: DrawListId);

    /// Draw one light sprite
    fn draw_light(&mut self, sprite: &LightSprite);
}

/// Everything a [`RecordingRenderer`] was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Compile {
        list: DrawListId,
        vertices: usize,
        indices: usize,
    },
    Bind {
        base: bool,
        lit: bool,
    },
    Draw(DrawListId),
    Light(LightSprite),
}

/// A renderer that uploads compiled lists into device buffers and records calls
///
/// Used by tests and benches in place of a real graphics backend.
#[derive(Debug)]
pub struct RecordingRenderer<G: GpuDevice> {
    gpu: G,
    lists: Vec<(G::Buffer, G::Buffer)>,
    calls: Vec<RenderCall>,
}

impl<G: GpuDevice> RecordingRenderer<G> {
    pub fn new(gpu: G) -> Self {
        Self {
            gpu,
            lists: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Recorded calls since creation or the last [`Self::take_calls`]
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of compiled draw lists
    pub fn compiled(&self) -> usize {
        self.lists.len()
    }

    /// Vertex and index buffers backing a compiled list
    pub fn buffers(&self, list: DrawListId) -> Option<&(G::Buffer, G::Buffer)> {
        self.lists.get(list.0 as usize)
    }
}

impl<G: GpuDevice> PlaneRenderer<G> for RecordingRenderer<G> {
    fn compile_draw_list(&mut self, vertices: &[Vertex], indices: &[u32]) -> GpuResult<DrawListId> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);

        let vertex_buffer = self.gpu.allocate_buffer(vertex_bytes.len(), BufferUsage::Vertex)?;
        self.gpu.upload_buffer_data(&vertex_buffer, 0, vertex_bytes)?;
        let index_buffer = self.gpu.allocate_buffer(index_bytes.len(), BufferUsage::Index)?;
        self.gpu.upload_buffer_data(&index_buffer, 0, index_bytes)?;

        let list = DrawListId(self.lists.len() as u64);
        self.lists.push((vertex_buffer, index_buffer));
        self.calls.push(RenderCall::Compile {
            list,
            vertices: vertices.len(),
            indices: indices.len(),
        });
        Ok(list)
    }

    fn bind_textures(&mut self, base: Option<&G::Texture>, lit: Option<&G::Texture>) {
        self.calls.push(RenderCall::Bind {
            base: base.is_some(),
            lit: lit.is_some(),
        });
    }

    fn call_draw_list(&mut self, list: DrawListId) {
        self.calls.push(RenderCall::Draw(list));
    }

    fn draw_light(&mut self, sprite: &LightSprite) {
        self.calls.push(RenderCall::Light(*sprite));
    }
}

impl<G: GpuDevice> Drop for RecordingRenderer<G> {
    fn drop(&mut self) {
        for (vertex_buffer, index_buffer) in self.lists.drain(..) {
            self.gpu.destroy_buffer(vertex_buffer);
            self.gpu.destroy_buffer(index_buffer);
        }
    }
}
