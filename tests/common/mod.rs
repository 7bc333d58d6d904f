//! Shared fixtures: in-memory object reader and image decoder

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use csl_multiplayer::{
    DecodedImage, ImageDecoder, ModelDescriptor, ObjCommand, ObjError, ObjFile, ObjVertex,
    ObjectReader, TextureError, Topology,
};
use parking_lot::Mutex;

/// Serves object files from a map; clones share the map
#[derive(Clone, Default)]
pub struct MapReader {
    files: Arc<Mutex<HashMap<String, ObjFile>>>,
}

impl MapReader {
    pub fn insert(&self, path: &str, file: ObjFile) {
        self.files.lock().insert(path.to_string(), file);
    }

    /// Make `path` exist without content
    pub fn touch(&self, path: &str) {
        self.insert(path, ObjFile::default());
    }
}

impl ObjectReader for MapReader {
    fn read(&self, path: &str) -> Result<ObjFile, ObjError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| ObjError::Read {
                path: path.to_string(),
                reason: "no such file".to_string(),
            })
    }

    fn file_exists(&self, path: &str) -> bool {
        self.files.lock().contains_key(path)
    }
}

/// Decodes every path it knows into a solid 4x4 image
#[derive(Clone, Default)]
pub struct MapDecoder {
    images: Arc<Mutex<HashMap<String, [u8; 4]>>>,
}

impl MapDecoder {
    pub fn insert(&self, path: &str, rgba: [u8; 4]) {
        self.images.lock().insert(path.to_string(), rgba);
    }
}

impl ImageDecoder for MapDecoder {
    fn decode(&self, path: &str) -> Result<DecodedImage, TextureError> {
        let rgba = self
            .images
            .lock()
            .get(path)
            .copied()
            .ok_or_else(|| TextureError::DecodeError(format!("{path} not found")))?;
        Ok(DecodedImage {
            width: 4,
            height: 4,
            data: rgba.repeat(16),
        })
    }
}

/// A unit quad in the z = 0 plane, lifted by `lift`
pub fn quad(lift: f32) -> ObjCommand {
    ObjCommand::Polygon {
        topology: Topology::Quad,
        vertices: vec![
            ObjVertex::new([0.0, lift, 0.0], [0.0, 0.0]),
            ObjVertex::new([1.0, lift, 0.0], [1.0, 0.0]),
            ObjVertex::new([1.0, lift + 1.0, 0.0], [1.0, 1.0]),
            ObjVertex::new([0.0, lift + 1.0, 0.0], [0.0, 1.0]),
        ],
    }
}

/// Object file holding one quad and the given texture name
pub fn quad_file(lift: f32, texture: &str) -> ObjFile {
    ObjFile {
        commands: vec![quad(lift)],
        texture: texture.to_string(),
    }
}

pub fn descriptor(name: &str, icao: &str, airline: &str, livery: &str) -> ModelDescriptor {
    ModelDescriptor {
        dir_names: vec!["Test".to_string()],
        object_name: name.to_string(),
        icao: icao.to_string(),
        airline: airline.to_string(),
        livery: livery.to_string(),
        obj_path: format!("CSL/{name}/{name}.obj"),
        ..Default::default()
    }
}
