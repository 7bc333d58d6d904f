//! csl_multiplayer - Asynchronous resource cache and CSL model pipeline
//!
//! # Features
//! - Generic resource cache with background loads and transient states
//! - GPU texture handle recycling with a bounded, decaying spare pool
//! - CSL object geometry: tessellation, vertex deduplication, LOD buckets
//! - 8-tier model matching and prioritized vertical offsets
//! - GPU abstraction and async runtime abstraction (via traits)
//!
//! # Quick Start
//!
//! ```ignore
//! use csl_multiplayer::{MultiplayerContext, MockGpu, TokioSpawner, RuntimeConfig};
//!
//! let mut ctx = MultiplayerContext::new(
//!     MockGpu::new(),
//!     TokioSpawner::new(),
//!     my_reader,
//!     ImageFileDecoder::new(),
//!     Arc::new(StaticPreferences::new()),
//!     RuntimeConfig::default(),
//! );
//! let plane = ctx.create_plane("B738", "SWA", "");
//! ctx.render_plane(plane, 500.0, 0.0, &mut renderer)?;
//! ctx.maintain();
//! ```
//!
//! # Feature Flags
//!
//! - `runtime-tokio`: Spawn resource loads on the Tokio runtime (default)

// Core modules
pub mod cache;
pub mod gpu;
pub mod obj;
pub mod runtime;

// Support modules
pub mod config;
pub mod context;
pub mod lights;
pub mod matcher;
pub mod offset;
pub mod plane;
pub mod renderer;
pub mod texture;

// Error types
mod error;
pub use error::{CslError, Result};

// Re-export main types from cache
pub use cache::metrics::{CacheMetrics, CacheMetricsHandle};
pub use cache::recycler::HandleRecycler;
pub use cache::{
    LoadFailure, LoadState, ResourceCache, ResourceHandle, ResourceLoader, TransientState,
};

// Re-export GPU types
pub use gpu::mock::MockGpu;
pub use gpu::{BufferUsage, GpuDevice, GpuError, GpuResult, GpuTextureFormat, TextureDescriptor};

// Re-export runtime types
pub use runtime::mock::{MockSpawnBehavior, MockSpawner};
#[cfg(feature = "runtime-tokio")]
pub use runtime::tokio_impl::TokioSpawner;
pub use runtime::{AsyncSpawner, JoinHandle};

// Re-export geometry types
pub use obj::command::{LightPoint, ObjCommand, ObjFile, ObjVertex, ObjectReader, Topology};
pub use obj::lod::{LightMarker, LodBucket};
pub use obj::pool::VertexPool;
pub use obj::{build_model, ObjError, ObjLoader, ObjModel};

// Re-export texture types
pub use texture::{CslTexture, DecodedImage, ImageDecoder, ImageFileDecoder, TextureError, TextureLoader};

// Re-export matching and plane types
pub use config::{Preferences, RuntimeConfig, StaticPreferences};
pub use context::MultiplayerContext;
pub use lights::{FlashPattern, LightRole, LightSprite, LightStatus, LightView};
pub use matcher::{MatchResult, MatchTier, ModelDescriptor, ModelRef, ModelRegistry, TypeGroups};
pub use offset::{OffsetSource, VerticalOffset};
pub use plane::{ListenerId, Plane, PlaneEvent, PlaneId, PlaneListener};

// Re-export renderer types
pub use renderer::{DrawListId, PlaneRenderer, RecordingRenderer, RenderCall, Vertex};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
