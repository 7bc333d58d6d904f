//! The runtime context: registry, planes, listeners and caches in one place
//!
//! A [`MultiplayerContext`] is owned by the render thread. Resource loads run
//! on its spawner; everything that touches the GPU happens in
//! [`MultiplayerContext::render_plane`] and [`MultiplayerContext::maintain`].

use std::sync::Arc;

use crate::cache::recycler::HandleRecycler;
use crate::cache::{LoadState, ResourceCache, ResourceHandle, ResourceLoader};
use crate::config::{Preferences, RuntimeConfig};
use crate::error::{CslError, Result};
use crate::gpu::GpuDevice;
use crate::lights::{light_sprites, LightStatus, LightView};
use crate::matcher::ModelRegistry;
use crate::obj::{ObjLoader, ObjModel, ObjectReader};
use crate::offset::OffsetSource;
use crate::plane::{ListenerId, Plane, PlaneEvent, PlaneId, PlaneListener, Tracked};
use crate::renderer::PlaneRenderer;
use crate::runtime::AsyncSpawner;
use crate::texture::{CslTexture, ImageDecoder, TextureLoader};

/// Geometry cache of a context
pub type ObjectCache<R, S> = ResourceCache<ObjModel, ObjLoader<R>, S>;

/// Texture cache of a context
pub type TextureCache<G, D, S> = ResourceCache<CslTexture<G>, TextureLoader<G, D>, S>;

/// Owns everything a multiplayer session needs
pub struct MultiplayerContext<G, S, R, D>
where
    G: GpuDevice,
    S: AsyncSpawner,
    R: ObjectReader,
    D: ImageDecoder,
{
    config: RuntimeConfig,
    registry: ModelRegistry,
    planes: Vec<Plane<G>>,
    listeners: Vec<(ListenerId, Box<dyn PlaneListener>)>,
    objects: ObjectCache<R, S>,
    textures: TextureCache<G, D, S>,
    recycler: HandleRecycler<G>,
    gpu: G,
}

impl<G, S, R, D> MultiplayerContext<G, S, R, D>
where
    G: GpuDevice,
    S: AsyncSpawner,
    R: ObjectReader,
    D: ImageDecoder,
{
    /// Create a context
    ///
    /// `reader` and `decoder` parse object and image files on the spawner's
    /// tasks; `prefs` supplies the texture resolution preference.
    pub fn new(
        gpu: G,
        spawner: S,
        reader: R,
        decoder: D,
        prefs: Arc<dyn Preferences>,
        config: RuntimeConfig,
    ) -> Self {
        let recycler = HandleRecycler::from_config(gpu.clone(), &config);
        let objects = ResourceCache::new(ObjLoader::new(reader, &config), spawner.clone());
        let textures = ResourceCache::new(
            TextureLoader::new(decoder, prefs, &config, recycler.returner()),
            spawner,
        );

        log::debug!(
            "Created multiplayer context on {} backend",
            gpu.backend_name()
        );

        Self {
            config,
            registry: ModelRegistry::new(),
            planes: Vec::new(),
            listeners: Vec::new(),
            objects,
            textures,
            recycler,
            gpu,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Packages are registered through here
    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        &mut self.registry
    }

    pub fn objects(&self) -> &ObjectCache<R, S> {
        &self.objects
    }

    pub fn textures(&self) -> &TextureCache<G, D, S> {
        &self.textures
    }

    pub fn recycler(&self) -> &HandleRecycler<G> {
        &self.recycler
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Model used when matching fails
    pub fn set_default_icao(&mut self, icao: &str) {
        self.config.default_icao = icao.to_string();
    }

    pub fn add_listener(&mut self, listener: Box<dyn PlaneListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if `id` was not registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, plane: PlaneId, event: PlaneEvent) {
        for (_, listener) in &mut self.listeners {
            listener.on_plane_event(plane, event);
        }
    }

    fn match_into(&self, plane: &mut Plane<G>) {
        let result = self.registry.match_plane(
            &plane.icao,
            &plane.airline,
            &plane.livery,
            Some(&self.config.default_icao),
        );
        if result.model.is_none() {
            log::warn!(
                "No model found for {} {} {}, not even the default {}",
                plane.icao,
                plane.airline,
                plane.livery,
                self.config.default_icao
            );
        }
        plane.model = result.model;
        plane.match_quality = result.quality;
    }

    /// Create a plane with the best matching model
    pub fn create_plane(&mut self, icao: &str, airline: &str, livery: &str) -> PlaneId {
        let mut plane = Plane::new(icao, airline, livery);
        self.match_into(&mut plane);
        self.insert_plane(plane)
    }

    /// Create a plane with a model picked by name, falling back to matching
    pub fn create_plane_with_model(
        &mut self,
        model_name: &str,
        icao: &str,
        airline: &str,
        livery: &str,
    ) -> PlaneId {
        let Some(model) = self.registry.model_by_name(model_name) else {
            log::warn!(
                "Requested model {} is unknown, falling back to model matching",
                model_name
            );
            return self.create_plane(icao, airline, livery);
        };

        let mut plane = Plane::new(icao, airline, livery);
        plane.model = Some(model);
        plane.match_quality = 0;
        self.insert_plane(plane)
    }

    fn insert_plane(&mut self, plane: Plane<G>) -> PlaneId {
        let id = plane.id();
        self.planes.push(plane);
        self.notify(id, PlaneEvent::Created);
        id
    }

    /// Re-match a plane and drop its resources; returns the new match quality
    pub fn change_plane_model(
        &mut self,
        id: PlaneId,
        icao: &str,
        airline: &str,
        livery: &str,
    ) -> Result<i32> {
        let index = self.plane_index(id)?;
        let result = self.registry.match_plane(
            icao,
            airline,
            livery,
            Some(&self.config.default_icao),
        );

        let plane = &mut self.planes[index];
        plane.icao = icao.to_string();
        plane.airline = airline.to_string();
        plane.livery = livery.to_string();
        plane.model = result.model;
        plane.match_quality = result.quality;
        plane.reset_resources();

        self.notify(id, PlaneEvent::ModelChanged);
        Ok(result.quality)
    }

    /// Remove a plane; listeners hear about it before it goes away
    pub fn destroy_plane(&mut self, id: PlaneId) -> Result<()> {
        let index = self.plane_index(id)?;
        self.notify(id, PlaneEvent::Destroyed);
        self.planes.remove(index);
        Ok(())
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// The `index`-th plane in creation order
    pub fn nth_plane(&self, index: usize) -> Option<PlaneId> {
        self.planes.get(index).map(Plane::id)
    }

    pub fn plane(&self, id: PlaneId) -> Option<&Plane<G>> {
        self.planes.iter().find(|plane| plane.id() == id)
    }

    fn plane_index(&self, id: PlaneId) -> Result<usize> {
        self.planes
            .iter()
            .position(|plane| plane.id() == id)
            .ok_or(CslError::UnknownPlane(id))
    }

    pub fn plane_match_quality(&self, id: PlaneId) -> Result<i32> {
        self.plane(id)
            .map(Plane::match_quality)
            .ok_or(CslError::UnknownPlane(id))
    }

    pub fn set_plane_lights(&mut self, id: PlaneId, lights: LightStatus) -> Result<()> {
        let index = self.plane_index(id)?;
        self.planes[index].lights = lights;
        Ok(())
    }

    /// Current ground clearance of the plane's model
    pub fn plane_vertical_offset(&self, id: PlaneId) -> Result<f64> {
        let plane = self.plane(id).ok_or(CslError::UnknownPlane(id))?;
        let Some(model) = plane.model else {
            return Ok(0.0);
        };
        self.registry
            .model(model)
            .map(|descriptor| descriptor.vertical_offset.offset())
            .ok_or(CslError::UnknownModel {
                package: model.package,
                plane: model.plane,
            })
    }

    /// See [`ModelRegistry::is_icao_valid`]
    pub fn is_icao_valid(&self, icao: &str) -> bool {
        self.registry.is_icao_valid(icao)
    }

    /// See [`ModelRegistry::model_match_quality`]
    pub fn model_match_quality(&self, icao: &str, airline: &str, livery: &str) -> i32 {
        self.registry.model_match_quality(icao, airline, livery)
    }

    /// Draw one plane at `distance` meters from the camera
    ///
    /// Starts loads on first use and draws nothing until the geometry is
    /// available. `night` is the fraction of lights switched on in the scene.
    /// Returns whether geometry was drawn.
    pub fn render_plane<P>(
        &mut self,
        id: PlaneId,
        distance: f32,
        night: f32,
        renderer: &mut P,
    ) -> Result<bool>
    where
        P: PlaneRenderer<G>,
    {
        let index = self.plane_index(id)?;
        let plane = &mut self.planes[index];
        let Some(model) = plane.model else {
            return Ok(false);
        };
        let descriptor = self
            .registry
            .model_mut(model)
            .ok_or(CslError::UnknownModel {
                package: model.package,
                plane: model.plane,
            })?;

        let resources = &mut plane.resources;
        let object = acquire(&self.objects, &descriptor.obj_path, &mut resources.object);
        if resources.object.state.just_resolved() {
            match object.payload() {
                Some(obj) => {
                    if let Some(offset) = obj.calculated_offset() {
                        descriptor
                            .vertical_offset
                            .set(OffsetSource::Calculated, f64::from(offset));
                        descriptor.vertical_offset.resolve();
                    }
                }
                None => log::warn!(
                    "Skipping {} since object could not be loaded",
                    descriptor.model_name()
                ),
            }
        }
        let Some(obj) = object.payload() else {
            return Ok(false);
        };

        let texture_path = descriptor
            .texture_path
            .clone()
            .unwrap_or_else(|| obj.default_texture().to_string());
        let texture = acquire(&self.textures, &texture_path, &mut resources.texture);
        if resources.texture.state.just_resolved() && texture.state() == LoadState::Failed {
            log::warn!("Texture for {} cannot be loaded", descriptor.model_name());
        }

        let lit_path = descriptor
            .lit_texture_path
            .clone()
            .or_else(|| obj.default_lit_texture().map(str::to_string));
        let lit_texture = lit_path
            .map(|path| acquire(&self.textures, &path, &mut resources.lit_texture));

        let base = upload(&texture, &self.gpu, &mut self.recycler);
        let lit = lit_texture
            .as_ref()
            .and_then(|lit| upload(lit, &self.gpu, &mut self.recycler));

        let Some(lod) = obj.lod_for_distance(distance) else {
            return Ok(false);
        };
        if lod.is_empty() {
            return Ok(false);
        }

        // The lit overlay only makes sense on top of a base texture
        let lit = if night > self.config.night_lighting_threshold && base.is_some() {
            lit
        } else {
            None
        };

        renderer.bind_textures(base, lit);
        let list = lod.compile::<G, P>(renderer)?;
        renderer.call_draw_list(list);
        Ok(true)
    }

    /// Draw the plane's lights for the LOD visible at `distance`
    ///
    /// Returns the number of sprites drawn.
    pub fn draw_lights<P>(
        &self,
        id: PlaneId,
        distance: f32,
        view: &LightView,
        renderer: &mut P,
    ) -> Result<usize>
    where
        P: PlaneRenderer<G>,
    {
        let plane = self.plane(id).ok_or(CslError::UnknownPlane(id))?;
        let Some(obj) = plane
            .resources
            .object
            .handle
            .as_ref()
            .and_then(ResourceHandle::payload)
        else {
            return Ok(0);
        };
        let Some(lod) = obj.lod_for_distance(distance) else {
            return Ok(0);
        };

        let sprites = light_sprites(lod, &plane.lights, view);
        for sprite in &sprites {
            renderer.draw_light(sprite);
        }
        Ok(sprites.len())
    }

    /// Per-frame housekeeping; call once per rendered frame
    pub fn maintain(&mut self) {
        self.recycler.maintain();
    }
}

/// Keep the tracked handle, requesting it from `cache` on first use
fn acquire<T, L, S>(
    cache: &ResourceCache<T, L, S>,
    key: &str,
    tracked: &mut Tracked<T>,
) -> ResourceHandle<T>
where
    T: Send + Sync + 'static,
    L: ResourceLoader<T>,
    S: AsyncSpawner,
{
    match &tracked.handle {
        Some(handle) => {
            handle.poll(&mut tracked.state);
            handle.clone()
        }
        None => {
            let handle = cache.get(key, &mut tracked.state);
            tracked.handle = Some(handle.clone());
            handle
        }
    }
}

fn upload<'a, G: GpuDevice>(
    texture: &'a ResourceHandle<CslTexture<G>>,
    gpu: &G,
    recycler: &mut HandleRecycler<G>,
) -> Option<&'a G::Texture> {
    let payload = texture.payload()?;
    match payload.upload(gpu, recycler) {
        Ok(handle) => Some(handle),
        Err(err) => {
            log::warn!("Failed to upload {}: {}", payload.path(), err);
            None
        }
    }
}

impl<G, S, R, D> std::fmt::Debug for MultiplayerContext<G, S, R, D>
where
    G: GpuDevice,
    S: AsyncSpawner,
    R: ObjectReader,
    D: ImageDecoder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplayerContext")
            .field("planes", &self.planes.len())
            .field("models", &self.registry.model_count())
            .field("listeners", &self.listeners.len())
            .field("objects", &self.objects)
            .field("textures", &self.textures)
            .finish()
    }
}

