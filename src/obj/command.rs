//! Parsed object command stream handed over by an [`ObjectReader`]

use std::path::Path;

use super::ObjError;

/// Primitive topology of a polygon command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    TriangleList,
    TriangleFan,
    TriangleStrip,
    Quad,
    QuadStrip,
}

/// One polygon corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjVertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl ObjVertex {
    pub fn new(position: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            tex_coord,
        }
    }
}

/// A light definition; `rgb` carries the role code, not a color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightPoint {
    pub position: [f32; 3],
    pub rgb: [f32; 3],
}

/// One entry of the command stream
#[derive(Debug, Clone, PartialEq)]
pub enum ObjCommand {
    /// Start a new LOD; everything after belongs to it
    Lod { near: f32, far: f32 },
    /// Light markers
    Lights(Vec<LightPoint>),
    /// Polygon with its topology
    Polygon {
        topology: Topology,
        vertices: Vec<ObjVertex>,
    },
}

/// A parsed object file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjFile {
    pub commands: Vec<ObjCommand>,
    /// Texture name declared by the file, relative to its directory, without extension
    pub texture: String,
}

impl ObjFile {
    /// Whether the stream declares at least one LOD
    pub fn declares_lod(&self) -> bool {
        self.commands
            .iter()
            .any(|cmd| matches!(cmd, ObjCommand::Lod { .. }))
    }
}

/// Low-level object file parser
///
/// # Example
/// ```ignore
/// struct Fixed(ObjFile);
///
/// impl ObjectReader for Fixed {
///     fn read(&self, _path: &str) -> Result<ObjFile, ObjError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait ObjectReader: Send + Sync + 'static {
    /// Parse the object at `path`
    fn read(&self, path: &str) -> Result<ObjFile, ObjError>;

    /// Whether a file exists; used to probe for lit texture variants
    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}
