//! Texture loading and processing
//!
//! Images are decoded, keyed and downsampled on a loader task. The GPU upload
//! happens later, on the render thread, into a recycled handle when one is
//! available.

use crossbeam_channel::Sender;
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::cache::recycler::HandleRecycler;
use crate::cache::{LoadFailure, ResourceLoader};
use crate::config::{derez_steps, Preferences, RuntimeConfig};
use crate::gpu::{GpuDevice, GpuResult, TextureDescriptor};

/// Error type for texture loading operations
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Image decoding error: {0}")]
    DecodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image size {width}x{height} (limit {limit})")]
    InvalidSize { width: u32, height: u32, limit: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl DecodedImage {
    fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    fn into_rgba(self) -> Result<RgbaImage, TextureError> {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.data).ok_or_else(|| {
            TextureError::DecodeError(format!("pixel buffer does not match {width}x{height}"))
        })
    }
}

/// Low-level image file decoder
pub trait ImageDecoder: Send + Sync + 'static {
    /// Decode the image at `path` into RGBA8
    fn decode(&self, path: &str) -> Result<DecodedImage, TextureError>;
}

/// Decodes PNG, JPEG and BMP files with the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileDecoder;

impl ImageFileDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode an in-memory image file
    pub fn decode_bytes(&self, data: &[u8]) -> Result<DecodedImage, TextureError> {
        let format =
            image::guess_format(data).map_err(|e| TextureError::DecodeError(e.to_string()))?;

        match format {
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp => {}
            _ => {
                return Err(TextureError::UnsupportedFormat(format!(
                    "Only PNG, JPEG and BMP are supported, got {:?}",
                    format.extensions_str()
                )))
            }
        }

        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| TextureError::DecodeError(e.to_string()))?;
        Ok(DecodedImage::from_rgba(img.into_rgba8()))
    }
}

impl ImageDecoder for ImageFileDecoder {
    fn decode(&self, path: &str) -> Result<DecodedImage, TextureError> {
        let data = std::fs::read(path)?;
        self.decode_bytes(&data)
    }
}

/// Make pure magenta pixels fully transparent
pub fn apply_magenta_key(image: &mut DecodedImage) {
    for pixel in image.data.chunks_exact_mut(4) {
        if pixel[0] == 255 && pixel[1] == 0 && pixel[2] == 255 {
            pixel[3] = 0;
        }
    }
}

/// Halve the image `steps` times, never below 1x1
pub fn derez(image: DecodedImage, steps: u32) -> Result<DecodedImage, TextureError> {
    if steps == 0 {
        return Ok(image);
    }
    let mut rgba = image.into_rgba()?;
    for _ in 0..steps {
        let (width, height) = rgba.dimensions();
        if width == 1 && height == 1 {
            break;
        }
        rgba = image::imageops::resize(
            &rgba,
            (width / 2).max(1),
            (height / 2).max(1),
            FilterType::Triangle,
        );
    }
    Ok(DecodedImage::from_rgba(rgba))
}

/// Reject images the GPU cannot take
pub fn verify_image(image: &DecodedImage, max_size: u32) -> Result<(), TextureError> {
    let invalid = image.width == 0
        || image.height == 0
        || image.width > max_size
        || image.height > max_size
        || image.data.len() != image.width as usize * image.height as usize * 4;
    if invalid {
        return Err(TextureError::InvalidSize {
            width: image.width,
            height: image.height,
            limit: max_size,
        });
    }
    Ok(())
}

/// A loaded texture; its GPU handle is created on first bind
pub struct CslTexture<G: GpuDevice> {
    path: String,
    image: DecodedImage,
    gpu_handle: OnceLock<G::Texture>,
    returner: Sender<G::Texture>,
}

impl<G: GpuDevice> CslTexture<G> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }

    /// The GPU handle, if uploaded
    pub fn gpu_texture(&self) -> Option<&G::Texture> {
        self.gpu_handle.get()
    }

    /// Upload to the GPU unless already done
    ///
    /// Must be called on the render thread. Reuses a spare handle from
    /// `recycler` when there is one.
    pub fn upload(&self, gpu: &G, recycler: &mut HandleRecycler<G>) -> GpuResult<&G::Texture> {
        if let Some(texture) = self.gpu_handle.get() {
            return Ok(texture);
        }

        let desc = TextureDescriptor {
            width: self.image.width,
            height: self.image.height,
            ..Default::default()
        };
        let texture = match recycler.acquire() {
            Some(spare) => gpu.reload_texture(spare, &desc, &self.image.data)?,
            None => gpu.create_texture(&desc, &self.image.data)?,
        };
        log::debug!(
            "Uploaded texture {} ({}x{})",
            self.path,
            self.image.width,
            self.image.height
        );
        Ok(self.gpu_handle.get_or_init(|| texture))
    }
}

impl<G: GpuDevice> std::fmt::Debug for CslTexture<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CslTexture")
            .field("path", &self.path)
            .field("width", &self.image.width)
            .field("height", &self.image.height)
            .field("uploaded", &self.gpu_handle.get().is_some())
            .finish()
    }
}

impl<G: GpuDevice> Drop for CslTexture<G> {
    fn drop(&mut self) {
        if let Some(texture) = self.gpu_handle.take() {
            if self.returner.send(texture).is_err() {
                log::debug!("Recycler gone, dropping handle of {}", self.path);
            }
        }
    }
}

/// Cache loader for textures
pub struct TextureLoader<G: GpuDevice, D: ImageDecoder> {
    decoder: D,
    prefs: Arc<dyn Preferences>,
    max_size: u32,
    returner: Sender<G::Texture>,
}

impl<G: GpuDevice, D: ImageDecoder> TextureLoader<G, D> {
    /// `returner` receives GPU handles of dropped textures; see
    /// [`HandleRecycler::returner`].
    pub fn new(
        decoder: D,
        prefs: Arc<dyn Preferences>,
        config: &RuntimeConfig,
        returner: Sender<G::Texture>,
    ) -> Self {
        Self {
            decoder,
            prefs,
            max_size: config.max_texture_size,
            returner,
        }
    }

    /// Decode, key, downsample and verify synchronously
    pub fn load_image(&self, path: &str) -> Result<DecodedImage, TextureError> {
        let mut image = self.decoder.decode(path)?;
        apply_magenta_key(&mut image);
        let image = derez(image, derez_steps(self.prefs.as_ref()))?;
        verify_image(&image, self.max_size)?;
        Ok(image)
    }
}

#[async_trait::async_trait]
impl<G: GpuDevice, D: ImageDecoder> ResourceLoader<CslTexture<G>> for TextureLoader<G, D> {
    async fn load(&self, key: &str) -> Result<CslTexture<G>, LoadFailure> {
        let image = self.load_image(key).map_err(LoadFailure::new)?;
        Ok(CslTexture {
            path: key.to_string(),
            image,
            gpu_handle: OnceLock::new(),
            returner: self.returner.clone(),
        })
    }
}
