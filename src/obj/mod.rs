//! Model geometry: command stream in, LOD buckets out
//!
//! [`build_model`] turns a parsed [`ObjFile`] into render-ready LOD buckets.
//! Each bucket owns a [`VertexPool`] of deduplicated vertices, a flat
//! triangle index list and its light markers. Normals are accumulated per
//! face, blended across texture seams and normalized once all commands are
//! consumed; the command stream is dropped afterwards.
//!
//! # Example
//! ```ignore
//! let loader = ObjLoader::new(MyReader, &RuntimeConfig::default());
//! let objects = ResourceCache::new(loader, TokioSpawner::new());
//! let handle = objects.get("CSL/B738/B738.obj", &mut TransientState::new());
//! ```

pub mod command;
pub mod lod;
pub mod pool;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::{LoadFailure, ResourceLoader};
use crate::config::RuntimeConfig;
pub use command::{LightPoint, ObjCommand, ObjFile, ObjVertex, ObjectReader, Topology};
pub use lod::{select_lod, LightMarker, LodBucket};
pub use pool::VertexPool;

/// Errors from reading object files
#[derive(Error, Debug)]
pub enum ObjError {
    #[error("Failed to read object {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A built model, ready to be drawn
#[derive(Debug)]
pub struct ObjModel {
    path: String,
    default_texture: String,
    default_lit_texture: Option<String>,
    lods: Vec<LodBucket>,
}

impl ObjModel {
    /// Path the model was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Texture declared by the object, resolved next to it
    pub fn default_texture(&self) -> &str {
        &self.default_texture
    }

    /// Lit variant of [`Self::default_texture`], if it has an extension
    pub fn default_lit_texture(&self) -> Option<&str> {
        self.default_lit_texture.as_deref()
    }

    pub fn lods(&self) -> &[LodBucket] {
        &self.lods
    }

    /// First LOD whose range contains `distance`
    pub fn lod_for_distance(&self, distance: f32) -> Option<&LodBucket> {
        select_lod(&self.lods, distance).map(|index| &self.lods[index])
    }

    /// Offset that puts the lowest point of the first LOD on the ground
    pub fn calculated_offset(&self) -> Option<f32> {
        self.lods
            .first()
            .and_then(|lod| lod.pool().min_height())
            .map(|min| -min)
    }
}

/// Turn a command stream into LOD buckets
///
/// `path` is the object's own path; the default texture is resolved in its
/// directory. `exists` probes for lit texture variants.
pub fn build_model(
    path: &str,
    file: ObjFile,
    default_lod_far: f32,
    exists: impl Fn(&str) -> bool,
) -> ObjModel {
    let mut lods = Vec::new();
    if !file.declares_lod() {
        lods.push(LodBucket::new(0.0, default_lod_far));
    }

    let default_texture = default_texture_path(path, &file.texture);
    let default_lit_texture = lit_texture_path(&default_texture, exists);

    let mut orphaned = 0usize;
    for command in file.commands {
        match command {
            ObjCommand::Lod { near, far } => lods.push(LodBucket::new(near, far)),
            ObjCommand::Lights(points) => {
                let Some(lod) = lods.last_mut() else {
                    orphaned += 1;
                    continue;
                };
                for point in points {
                    lod.push_light(LightMarker {
                        position: point.position,
                        rgb: point.rgb.map(|c| c as i32),
                    });
                }
            }
            ObjCommand::Polygon { topology, vertices } => {
                let Some(lod) = lods.last_mut() else {
                    orphaned += 1;
                    continue;
                };
                let indices: Vec<u32> = vertices
                    .iter()
                    .map(|v| lod.pool_mut().add_point(v.position, v.tex_coord))
                    .collect();
                tessellate(lod, topology, &indices);
            }
        }
    }

    if orphaned > 0 {
        log::warn!(
            "{}: skipped {} commands placed before the first LOD",
            path,
            orphaned
        );
    }

    for lod in &mut lods {
        lod.finish();
    }

    ObjModel {
        path: path.to_string(),
        default_texture,
        default_lit_texture,
        lods,
    }
}

fn tessellate(lod: &mut LodBucket, topology: Topology, v: &[u32]) {
    match topology {
        Topology::TriangleList => {
            for tri in v.chunks_exact(3) {
                lod.push_triangle(tri[0], tri[1], tri[2]);
            }
        }
        Topology::TriangleFan => {
            for n in 2..v.len() {
                lod.push_triangle(v[0], v[n - 1], v[n]);
            }
        }
        Topology::TriangleStrip | Topology::QuadStrip => {
            for n in 2..v.len() {
                if n % 2 == 1 {
                    lod.push_triangle(v[n - 2], v[n], v[n - 1]);
                } else {
                    lod.push_triangle(v[n - 2], v[n - 1], v[n]);
                }
            }
        }
        Topology::Quad => {
            for quad in v.chunks_exact(4) {
                lod.push_triangle(quad[0], quad[1], quad[2]);
                lod.push_triangle(quad[0], quad[2], quad[3]);
            }
        }
    }
}

/// Texture `name` resolved in the directory of `object_path`, as a PNG
pub fn default_texture_path(object_path: &str, name: &str) -> String {
    let dir_end = object_path
        .rfind(|c| c == '/' || c == '\\' || c == ':')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let name: String = name
        .chars()
        .map(|c| if c == '\\' || c == ':' { '/' } else { c })
        .collect();
    format!("{}{}.png", &object_path[..dir_end], name)
}

/// Lit variant of a texture path
///
/// Inserts `LIT` before the extension if that file exists, `_LIT` otherwise.
/// `None` when the path has no extension.
pub fn lit_texture_path(texture_path: &str, exists: impl Fn(&str) -> bool) -> Option<String> {
    let dot = texture_path.rfind('.')?;
    let (stem, extension) = texture_path.split_at(dot);

    let lit = format!("{stem}LIT{extension}");
    if exists(&lit) {
        return Some(lit);
    }
    Some(format!("{stem}_LIT{extension}"))
}

/// Cache loader for model geometry
pub struct ObjLoader<R: ObjectReader> {
    reader: R,
    default_lod_far: f32,
}

impl<R: ObjectReader> ObjLoader<R> {
    pub fn new(reader: R, config: &RuntimeConfig) -> Self {
        Self {
            reader,
            default_lod_far: config.default_lod_far,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Read and build synchronously
    pub fn load_now(&self, path: &str) -> Result<ObjModel, ObjError> {
        let file = self.reader.read(path)?;
        let model = build_model(path, file, self.default_lod_far, |candidate| {
            self.reader.file_exists(candidate)
        });
        log::debug!(
            "Built {} with {} LODs, {} vertices in LOD 0",
            path,
            model.lods.len(),
            model.lods.first().map_or(0, |lod| lod.pool().len())
        );
        Ok(model)
    }
}

#[async_trait]
impl<R: ObjectReader> ResourceLoader<ObjModel> for ObjLoader<R> {
    async fn load(&self, key: &str) -> Result<ObjModel, LoadFailure> {
        self.load_now(key).map_err(LoadFailure::new)
    }
}
