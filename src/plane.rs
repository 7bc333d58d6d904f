//! Plane instances, their cached resources and lifecycle events

use std::fmt;
use uuid::Uuid;

use crate::cache::{LoadState, ResourceHandle, TransientState};
use crate::gpu::GpuDevice;
use crate::lights::LightStatus;
use crate::matcher::ModelRef;
use crate::obj::ObjModel;
use crate::texture::CslTexture;

/// Identity of a plane inside one context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneId(Uuid);

impl PlaneId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle notifications sent to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneEvent {
    Created,
    Destroyed,
    ModelChanged,
}

/// Receives plane lifecycle events
///
/// Implemented for any `FnMut(PlaneId, PlaneEvent)`.
pub trait PlaneListener: Send {
    fn on_plane_event(&mut self, plane: PlaneId, event: PlaneEvent);
}

impl<F> PlaneListener for F
where
    F: FnMut(PlaneId, PlaneEvent) + Send,
{
    fn on_plane_event(&mut self, plane: PlaneId, event: PlaneEvent) {
        self(plane, event)
    }
}

/// Registration token of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A cache handle plus what this plane has observed of it
pub struct Tracked<T> {
    pub(crate) handle: Option<ResourceHandle<T>>,
    pub(crate) state: TransientState,
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Self {
            handle: None,
            state: TransientState::default(),
        }
    }
}

impl<T> Tracked<T> {
    pub fn handle(&self) -> Option<&ResourceHandle<T>> {
        self.handle.as_ref()
    }

    /// State of the entry, `None` if not requested yet
    pub fn state(&self) -> Option<LoadState> {
        self.handle.as_ref().map(ResourceHandle::state)
    }

    pub fn transient(&self) -> &TransientState {
        &self.state
    }
}

impl<T> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("state", &self.state())
            .field("transient", &self.state)
            .finish()
    }
}

/// Geometry and textures a plane holds in the caches
pub struct PlaneResources<G: GpuDevice> {
    pub object: Tracked<ObjModel>,
    pub texture: Tracked<CslTexture<G>>,
    pub lit_texture: Tracked<CslTexture<G>>,
}

impl<G: GpuDevice> Default for PlaneResources<G> {
    fn default() -> Self {
        Self {
            object: Tracked::default(),
            texture: Tracked::default(),
            lit_texture: Tracked::default(),
        }
    }
}

impl<G: GpuDevice> fmt::Debug for PlaneResources<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaneResources")
            .field("object", &self.object)
            .field("texture", &self.texture)
            .field("lit_texture", &self.lit_texture)
            .finish()
    }
}

/// One multiplayer aircraft
#[derive(Debug)]
pub struct Plane<G: GpuDevice> {
    id: PlaneId,
    pub(crate) icao: String,
    pub(crate) airline: String,
    pub(crate) livery: String,
    pub(crate) model: Option<ModelRef>,
    pub(crate) match_quality: i32,
    pub(crate) lights: LightStatus,
    pub(crate) resources: PlaneResources<G>,
}

impl<G: GpuDevice> Plane<G> {
    pub(crate) fn new(icao: &str, airline: &str, livery: &str) -> Self {
        Self {
            id: PlaneId::new(),
            icao: icao.to_string(),
            airline: airline.to_string(),
            livery: livery.to_string(),
            model: None,
            match_quality: crate::matcher::NO_MATCH,
            lights: LightStatus::default(),
            resources: PlaneResources::default(),
        }
    }

    pub fn id(&self) -> PlaneId {
        self.id
    }

    pub fn icao(&self) -> &str {
        &self.icao
    }

    pub fn airline(&self) -> &str {
        &self.airline
    }

    pub fn livery(&self) -> &str {
        &self.livery
    }

    /// The matched model, if any
    pub fn model(&self) -> Option<ModelRef> {
        self.model
    }

    pub fn match_quality(&self) -> i32 {
        self.match_quality
    }

    pub fn lights(&self) -> LightStatus {
        self.lights
    }

    pub fn resources(&self) -> &PlaneResources<G> {
        &self.resources
    }

    /// Release every cache handle and forget what was observed
    pub fn reset_resources(&mut self) {
        self.resources = PlaneResources::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::MockGpu;

    #[test]
    fn test_plane_ids_are_unique() {
        assert_ne!(PlaneId::new(), PlaneId::new());
    }

    #[test]
    fn test_new_plane_has_no_resources() {
        let plane: Plane<MockGpu> = Plane::new("B738", "SWA", "");
        assert_eq!(plane.match_quality(), -1);
        assert!(plane.resources().object.state().is_none());
        assert!(plane.resources().texture.handle().is_none());
    }

    #[test]
    fn test_closure_listener() {
        let mut seen = Vec::new();
        {
            let mut listener = |id: PlaneId, event: PlaneEvent| seen.push((id, event));
            let id = PlaneId::new();
            listener.on_plane_event(id, PlaneEvent::Created);
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, PlaneEvent::Created);
    }
}
