//! GPU abstraction layer for the render-thread side of resource loading
//!
//! Everything in here runs on the thread that owns the graphics context.
//! Background loaders never touch a [`GpuDevice`]; they only hand over CPU
//! side payloads that the render thread later uploads.

pub mod mock;

use std::fmt::Debug;
use thiserror::Error;

/// Error type for GPU operations
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Buffer allocation failed: {0}")]
    AllocationFailed(String),

    #[error("Buffer upload failed: {0}")]
    UploadFailed(String),

    #[error("Texture creation failed: {0}")]
    TextureCreationFailed(String),

    #[error("Invalid buffer size: {0}")]
    InvalidSize(usize),

    #[error("Device lost")]
    DeviceLost,
}

/// Result type for GPU operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Interleaved position/texcoord/normal data
    Vertex,
    /// Triangle index list
    Index,
}

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuTextureFormat {
    /// RGBA 8-bit with sRGB color space
    Rgba8Srgb,
    /// RGBA 8-bit unorm
    Rgba8Unorm,
}

/// Texture descriptor for creation and re-upload
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Texture format
    pub format: GpuTextureFormat,
    /// Generate mipmaps automatically
    pub generate_mipmaps: bool,
    /// Repeat instead of clamping at the edges
    pub wrap: bool,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            format: GpuTextureFormat::Rgba8Srgb,
            generate_mipmaps: true,
            wrap: false,
        }
    }
}

/// Core GPU device trait for backend-agnostic operations
///
/// # Associated Types
/// - `Buffer`: The buffer type for this GPU backend
/// - `Texture`: The texture handle type for this GPU backend. Handles are
///   recycled through [`crate::cache::recycler::HandleRecycler`], so a
///   handle must stay valid after its contents are overwritten by
///   [`GpuDevice::reload_texture`].
///
/// # Example
/// ```ignore
/// let gpu = MockGpu::new();
/// let texture = match recycler.acquire() {
///     Some(spare) => gpu.reload_texture(spare, &desc, &pixels)?,
///     None => gpu.create_texture(&desc, &pixels)?,
/// };
/// ```
pub trait GpuDevice: Send + Sync + Clone + Debug + 'static {
    /// Buffer type for this GPU backend
    type Buffer: Clone + Send + Sync + Debug;

    /// Texture handle type for this GPU backend
    type Texture: Clone + Send + Sync + Debug + 'static;

    /// Allocate a GPU buffer of `size` bytes
    fn allocate_buffer(&self, size: usize, usage: BufferUsage) -> GpuResult<Self::Buffer>;

    /// Upload data to a buffer at a byte offset
    fn upload_buffer_data(&self, buffer: &Self::Buffer, offset: usize, data: &[u8])
        -> GpuResult<()>;

    /// Create a fresh texture handle and fill it with pixel data
    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuResult<Self::Texture>;

    /// Overwrite the contents of an existing handle, reusing its allocation slot
    ///
    /// The handle is consumed either way: on error it has been destroyed.
    /// The default implementation destroys the old handle and creates a new one.
    fn reload_texture(
        &self,
        texture: Self::Texture,
        desc: &TextureDescriptor,
        data: &[u8],
    ) -> GpuResult<Self::Texture> {
        self.destroy_texture(texture);
        self.create_texture(desc, data)
    }

    /// Destroy a buffer
    fn destroy_buffer(&self, _buffer: Self::Buffer) {
        // Default: let Drop handle it
    }

    /// Destroy a texture handle
    fn destroy_texture(&self, _texture: Self::Texture) {
        // Default: let Drop handle it
    }

    /// Get the name of this GPU backend (for debugging)
    fn backend_name(&self) -> &'static str;
}

pub use mock::MockGpu;
