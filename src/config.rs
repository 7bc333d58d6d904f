//! Runtime tunables and the host preference collaborator

use std::collections::HashMap;

/// Tunables for the cache, recycler and per-frame rendering
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of released texture handles kept for reuse
    pub spare_texture_capacity: usize,
    /// Frames an idle spare handle survives before one is destroyed
    pub spare_texture_decay_frames: u32,
    /// Far distance of the LOD synthesized for models that declare none
    pub default_lod_far: f32,
    /// Largest accepted decoded image dimension
    pub max_texture_size: u32,
    /// Night factor above which lit textures are bound
    pub night_lighting_threshold: f32,
    /// ICAO type of the model used when matching fails
    pub default_icao: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            spare_texture_capacity: 4,
            spare_texture_decay_frames: 120,
            default_lod_far: 40000.0,
            max_texture_size: 4096,
            night_lighting_threshold: 0.25,
            default_icao: "A320".to_string(),
        }
    }
}

/// Host-provided integer preferences
pub trait Preferences: Send + Sync + 'static {
    /// Value for `section`/`key`, or `default` when unset
    fn int_pref(&self, section: &str, key: &str, default: i32) -> i32;
}

/// Resolution reduction steps requested by the host
///
/// The host stores a resolution level from 0 to 5; each level below 5 halves
/// decoded textures once more.
pub fn derez_steps(prefs: &dyn Preferences) -> u32 {
    let resolution = prefs.int_pref("planes", "resolution", 5);
    5i32.saturating_sub(resolution).max(0) as u32
}

/// Fixed in-memory preferences
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences {
    values: HashMap<(String, String), i32>,
}

impl StaticPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, section: &str, key: &str, value: i32) -> Self {
        self.set(section, key, value);
        self
    }

    pub fn set(&mut self, section: &str, key: &str, value: i32) {
        self.values
            .insert((section.to_string(), key.to_string()), value);
    }
}

impl Preferences for StaticPreferences {
    fn int_pref(&self, section: &str, key: &str, default: i32) -> i32 {
        self.values
            .get(&(section.to_string(), key.to_string()))
            .copied()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.spare_texture_capacity, 4);
        assert_eq!(config.spare_texture_decay_frames, 120);
        assert_eq!(config.default_lod_far, 40000.0);
        assert_eq!(config.default_icao, "A320");
    }

    #[test]
    fn test_derez_from_resolution() {
        assert_eq!(derez_steps(&StaticPreferences::new()), 0);

        let prefs = StaticPreferences::new().with("planes", "resolution", 3);
        assert_eq!(derez_steps(&prefs), 2);

        let prefs = StaticPreferences::new().with("planes", "resolution", 9);
        assert_eq!(derez_steps(&prefs), 0);
    }
}
