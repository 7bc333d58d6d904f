//! Mock GPU implementation for testing
//!
//! Stores buffers and textures in memory and counts handle creation and
//! destruction so tests can check that texture handles are recycled rather
//! than leaked.

use super::{BufferUsage, GpuDevice, GpuError, GpuResult, GpuTextureFormat, TextureDescriptor};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Counter for generating unique buffer/texture IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Default)]
struct MockGpuStats {
    allocated_bytes: AtomicU64,
    textures_created: AtomicUsize,
    textures_reloaded: AtomicUsize,
    textures_destroyed: AtomicUsize,
}

/// Mock GPU device for testing
///
/// Clones share their statistics, like clones of a real device share the
/// underlying context.
#[derive(Clone, Debug, Default)]
pub struct MockGpu {
    stats: Arc<MockGpuStats>,
}

impl MockGpu {
    /// Create a new mock GPU device
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total allocated memory
    pub fn allocated_bytes(&self) -> u64 {
        self.stats.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Number of fresh texture handles handed out
    pub fn textures_created(&self) -> usize {
        self.stats.textures_created.load(Ordering::Relaxed)
    }

    /// Number of times an existing handle was refilled
    pub fn textures_reloaded(&self) -> usize {
        self.stats.textures_reloaded.load(Ordering::Relaxed)
    }

    /// Number of texture handles given back to the device
    pub fn textures_destroyed(&self) -> usize {
        self.stats.textures_destroyed.load(Ordering::Relaxed)
    }

    /// Handles created but not yet destroyed
    pub fn live_textures(&self) -> usize {
        self.textures_created() - self.textures_destroyed()
    }
}

/// Mock buffer that stores data in memory
#[derive(Clone, Debug)]
pub struct MockBuffer {
    /// Unique identifier
    pub id: u64,
    /// Buffer data
    pub data: Arc<parking_lot::RwLock<Vec<u8>>>,
    /// Buffer usage
    pub usage: BufferUsage,
}

impl MockBuffer {
    /// Create a new mock buffer
    pub fn new(size: usize, usage: BufferUsage) -> Self {
        Self {
            id: next_id(),
            data: Arc::new(parking_lot::RwLock::new(vec![0u8; size])),
            usage,
        }
    }

    /// Get the size of the buffer
    pub fn size(&self) -> usize {
        self.data.read().len()
    }

    /// Read buffer data
    pub fn read_data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

/// Mock texture handle that keeps its pixel data in memory
#[derive(Clone, Debug)]
pub struct MockTexture {
    /// Unique identifier, stable across reloads
    pub id: u64,
    /// Texture width
    pub width: u32,
    /// Texture height
    pub height: u32,
    /// Texture format
    pub format: GpuTextureFormat,
    /// Pixel data
    pub data: Arc<parking_lot::RwLock<Vec<u8>>>,
}

impl MockTexture {
    /// Create a new mock texture
    pub fn new(desc: &TextureDescriptor, data: &[u8]) -> Self {
        Self {
            id: next_id(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            data: Arc::new(parking_lot::RwLock::new(data.to_vec())),
        }
    }

    fn byte_size(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * 4
    }
}

fn check_dimensions(desc: &TextureDescriptor) -> GpuResult<()> {
    if desc.width == 0 || desc.height == 0 {
        return Err(GpuError::TextureCreationFailed(
            "Invalid texture dimensions".to_string(),
        ));
    }
    Ok(())
}

impl GpuDevice for MockGpu {
    type Buffer = MockBuffer;
    type Texture = MockTexture;

    fn allocate_buffer(&self, size: usize, usage: BufferUsage) -> GpuResult<Self::Buffer> {
        if size == 0 {
            return Err(GpuError::InvalidSize(size));
        }

        self.stats
            .allocated_bytes
            .fetch_add(size as u64, Ordering::Relaxed);
        Ok(MockBuffer::new(size, usage))
    }

    fn upload_buffer_data(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        data: &[u8],
    ) -> GpuResult<()> {
        let mut buf_data = buffer.data.write();

        if offset + data.len() > buf_data.len() {
            return Err(GpuError::UploadFailed(format!(
                "Data exceeds buffer size: offset={}, data_len={}, buffer_size={}",
                offset,
                data.len(),
                buf_data.len()
            )));
        }

        buf_data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuResult<Self::Texture> {
        check_dimensions(desc)?;

        let texture = MockTexture::new(desc, data);
        self.stats
            .allocated_bytes
            .fetch_add(texture.byte_size(), Ordering::Relaxed);
        self.stats.textures_created.fetch_add(1, Ordering::Relaxed);
        Ok(texture)
    }

    fn reload_texture(
        &self,
        mut texture: Self::Texture,
        desc: &TextureDescriptor,
        data: &[u8],
    ) -> GpuResult<Self::Texture> {
        if let Err(err) = check_dimensions(desc) {
            self.destroy_texture(texture);
            return Err(err);
        }

        self.stats
            .allocated_bytes
            .fetch_sub(texture.byte_size(), Ordering::Relaxed);
        texture.width = desc.width;
        texture.height = desc.height;
        texture.format = desc.format;
        *texture.data.write() = data.to_vec();
        self.stats
            .allocated_bytes
            .fetch_add(texture.byte_size(), Ordering::Relaxed);
        self.stats.textures_reloaded.fetch_add(1, Ordering::Relaxed);
        Ok(texture)
    }

    fn destroy_buffer(&self, buffer: Self::Buffer) {
        let size = buffer.size() as u64;
        self.stats.allocated_bytes.fetch_sub(size, Ordering::Relaxed);
    }

    fn destroy_texture(&self, texture: Self::Texture) {
        self.stats
            .allocated_bytes
            .fetch_sub(texture.byte_size(), Ordering::Relaxed);
        self.stats.textures_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}
