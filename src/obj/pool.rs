//! Content-addressed vertex store with area-weighted normal blending

use glam::Vec3;
use std::collections::HashMap;
use std::hash::BuildHasher;
use xxhash_rust::xxh3::Xxh3;

use crate::renderer::Vertex;

#[derive(Debug, Clone, Copy, Default)]
struct Xxh3State;

impl BuildHasher for Xxh3State {
    type Hasher = Xxh3;

    fn build_hasher(&self) -> Xxh3 {
        Xxh3::new()
    }
}

/// Bit pattern of a float under `==`: both zeroes compare equal
fn key_bits(value: f32) -> u32 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

fn position_key(position: [f32; 3]) -> Option<[u32; 3]> {
    if position.iter().any(|c| c.is_nan()) {
        return None;
    }
    Some(position.map(key_bits))
}

type PointKey = ([u32; 3], [u32; 2]);

/// Unique (position, texcoord) vertices of one LOD
///
/// Lookups are exact: no epsilon. A coordinate containing NaN never equals
/// anything, so such points are always appended.
#[derive(Debug, Clone, Default)]
pub struct VertexPool {
    vertices: Vec<Vertex>,
    lookup: HashMap<PointKey, u32, Xxh3State>,
}

impl VertexPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the vertex at (`position`, `tex_coord`), inserting it if new
    pub fn add_point(&mut self, position: [f32; 3], tex_coord: [f32; 2]) -> u32 {
        let key = position_key(position).and_then(|pos| {
            if tex_coord.iter().any(|c| c.is_nan()) {
                None
            } else {
                Some((pos, tex_coord.map(key_bits)))
            }
        });

        if let Some(key) = key {
            if let Some(&index) = self.lookup.get(&key) {
                return index;
            }
            let index = self.push(position, tex_coord);
            self.lookup.insert(key, index);
            index
        } else {
            self.push(position, tex_coord)
        }
    }

    fn push(&mut self, position: [f32; 3], tex_coord: [f32; 2]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(Vertex {
            position,
            tex_coord,
            normal: [0.0; 3],
        });
        index
    }

    /// Accumulate the unnormalized face normal of a triangle onto its corners
    ///
    /// Triangles with two corners at the same position contribute nothing.
    pub fn calc_tri_normal(&mut self, i1: u32, i2: u32, i3: u32) {
        let (Some(p1), Some(p2), Some(p3)) = (
            self.position(i1),
            self.position(i2),
            self.position(i3),
        ) else {
            log::warn!("Triangle ({i1}, {i2}, {i3}) references a missing vertex");
            return;
        };

        if p1 == p2 || p1 == p3 || p2 == p3 {
            return;
        }

        let normal = (p2 - p1).cross(p2 - p3);
        for index in [i1, i2, i3] {
            let vertex = &mut self.vertices[index as usize];
            vertex.normal = (Vec3::from(vertex.normal) + normal).to_array();
        }
    }

    /// Blend normals across vertices sharing a position, then unit-normalize
    ///
    /// Every vertex ends up with the sum over all vertices at its position,
    /// so seams between texture islands shade smoothly. Zero-length normals
    /// stay zero.
    pub fn normalize_normals(&mut self) {
        let mut groups: HashMap<[u32; 3], Vec3, Xxh3State> = HashMap::default();
        for vertex in &self.vertices {
            if let Some(key) = position_key(vertex.position) {
                *groups.entry(key).or_insert(Vec3::ZERO) += Vec3::from(vertex.normal);
            }
        }

        for vertex in &mut self.vertices {
            let blended = position_key(vertex.position)
                .and_then(|key| groups.get(&key).copied())
                .unwrap_or_else(|| Vec3::from(vertex.normal));
            vertex.normal = blended.normalize_or_zero().to_array();
        }
    }

    fn position(&self, index: u32) -> Option<Vec3> {
        self.vertices
            .get(index as usize)
            .map(|vertex| Vec3::from(vertex.position))
    }

    /// Number of stored vertices
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Stored vertices in insertion order
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Drop the lookup table once no more points will be added
    pub fn seal(&mut self) {
        self.lookup = HashMap::default();
    }

    /// Lowest vertex height, if any
    pub fn min_height(&self) -> Option<f32> {
        self.vertices
            .iter()
            .map(|vertex| vertex.position[1])
            .filter(|y| !y.is_nan())
            .reduce(f32::min)
    }
}
