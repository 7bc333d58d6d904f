//! Bounded pool of spare GPU texture handles
//!
//! Texture payloads die on whatever thread drops the last handle, but GPU
//! handles may only be touched on the render thread. Dying payloads send
//! their handle through a channel; [`HandleRecycler::maintain`] drains it on
//! the render thread, keeps a few spares for reuse and lets the rest decay.

use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;

use crate::config::RuntimeConfig;
use crate::gpu::GpuDevice;

/// Spare handles are kept for the next texture upload instead of being destroyed
#[derive(Debug)]
pub struct HandleRecycler<G: GpuDevice> {
    gpu: G,
    spare: VecDeque<G::Texture>,
    capacity: usize,
    decay_frames: u32,
    /// Frames left before one spare is destroyed; `None` when disarmed
    countdown: Option<u32>,
    returned_tx: Sender<G::Texture>,
    returned_rx: Receiver<G::Texture>,
}

impl<G: GpuDevice> HandleRecycler<G> {
    /// Create a recycler with explicit capacity and decay period
    pub fn new(gpu: G, capacity: usize, decay_frames: u32) -> Self {
        let (returned_tx, returned_rx) = crossbeam_channel::unbounded();
        Self {
            gpu,
            spare: VecDeque::with_capacity(capacity),
            capacity,
            decay_frames: decay_frames.max(1),
            countdown: None,
            returned_tx,
            returned_rx,
        }
    }

    /// Create a recycler sized from the runtime configuration
    pub fn from_config(gpu: G, config: &RuntimeConfig) -> Self {
        Self::new(gpu, config.spare_texture_capacity, config.spare_texture_decay_frames)
    }

    /// Sender that dying texture payloads use to hand back their handle
    pub fn returner(&self) -> Sender<G::Texture> {
        self.returned_tx.clone()
    }

    /// Keep `handle` as a spare, or destroy it if the pool is full
    pub fn release(&mut self, handle: G::Texture) {
        if self.spare.len() < self.capacity {
            self.spare.push_back(handle);
            self.countdown = Some(self.decay_frames);
        } else {
            log::trace!("Spare texture pool full, destroying handle");
            self.gpu.destroy_texture(handle);
        }
    }

    /// Take a spare handle, if any
    pub fn acquire(&mut self) -> Option<G::Texture> {
        let handle = self.spare.pop_front()?;
        self.countdown = if self.spare.is_empty() {
            None
        } else {
            Some(self.decay_frames)
        };
        Some(handle)
    }

    /// Advance one frame; destroys one spare when the countdown runs out
    ///
    /// Returns true if a handle was destroyed.
    pub fn tick(&mut self) -> bool {
        let Some(frames) = self.countdown.as_mut() else {
            return false;
        };
        *frames = frames.saturating_sub(1);
        if *frames > 0 {
            return false;
        }

        match self.acquire() {
            Some(handle) => {
                log::trace!("Spare texture decayed, {} left", self.spare.len());
                self.gpu.destroy_texture(handle);
                true
            }
            None => {
                self.countdown = None;
                false
            }
        }
    }

    /// Collect handles returned by dropped payloads, then advance one frame
    pub fn maintain(&mut self) {
        while let Ok(handle) = self.returned_rx.try_recv() {
            self.release(handle);
        }
        self.tick();
    }

    /// Number of spare handles held
    pub fn spare_count(&self) -> usize {
        self.spare.len()
    }

    /// Maximum number of spare handles
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the decay countdown is running
    pub fn is_armed(&self) -> bool {
        self.countdown.is_some()
    }

    /// The device handles are destroyed on
    pub fn gpu(&self) -> &G {
        &self.gpu
    }
}

impl<G: GpuDevice> Drop for HandleRecycler<G> {
    fn drop(&mut self) {
        while let Ok(handle) = self.returned_rx.try_recv() {
            self.gpu.destroy_texture(handle);
        }
        for handle in self.spare.drain(..) {
            self.gpu.destroy_texture(handle);
        }
    }
}
