//! Light markers to sprites: roles, colors and flash patterns

use crate::obj::LodBucket;

const METERS_TO_NM: f32 = 0.000_539_956_8;

const NAV_RED: [f32; 4] = [1.0, 0.0, 0.2, 0.5];
const NAV_GREEN: [f32; 4] = [0.0, 1.0, 0.3, 0.5];
const LANDING: [f32; 4] = [1.0, 1.0, 0.7, 0.6];
const STROBE: [f32; 4] = [1.0, 1.0, 1.0, 0.7];

/// What a light marker's RGB code stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightRole {
    RedNav,
    GreenNav,
    Beacon,
    Strobe,
    Landing,
    /// Any other code: a steady nav light tinted by the code itself
    Other([i32; 3]),
}

impl LightRole {
    pub fn from_code(rgb: [i32; 3]) -> Self {
        match rgb {
            [11, 11, 11] => LightRole::RedNav,
            [22, 22, 22] => LightRole::GreenNav,
            [33, 33, 33] => LightRole::Beacon,
            [44, 44, 44] => LightRole::Strobe,
            [55, 55, 55] => LightRole::Landing,
            other => LightRole::Other(other),
        }
    }
}

/// Beacon and strobe timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashPattern {
    /// One flash per period
    #[default]
    Default,
    /// Double flashes
    Eads,
    /// Long beacon, slower strobe
    Ga,
}

/// Which lights are switched on for one plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightStatus {
    pub nav: bool,
    pub beacon: bool,
    pub strobe: bool,
    pub landing: bool,
    pub flash_pattern: FlashPattern,
    /// Per-plane phase shift in milliseconds, so fleets do not flash in sync
    pub time_offset: i32,
}

impl LightStatus {
    /// Everything on, default pattern
    pub fn all_on() -> Self {
        Self {
            nav: true,
            beacon: true,
            strobe: true,
            landing: true,
            ..Self::default()
        }
    }
}

/// Whether the beacon is lit at `time_ms`
pub fn beacon_lit(pattern: FlashPattern, time_ms: i64) -> bool {
    let x = time_ms.rem_euclid(1200);
    match pattern {
        FlashPattern::Default => x < 120,
        FlashPattern::Eads => x < 120 || (x > 240 && x < 360),
        FlashPattern::Ga => time_ms.rem_euclid(2100) < 900,
    }
}

/// Whether the strobe is lit at `time_ms`
pub fn strobe_lit(pattern: FlashPattern, time_ms: i64) -> bool {
    let x = time_ms.rem_euclid(1700);
    match pattern {
        FlashPattern::Default => x < 80,
        FlashPattern::Eads => x < 80 || (x > 260 && x < 340),
        FlashPattern::Ga => time_ms.rem_euclid(1900) < 100,
    }
}

/// Camera-dependent inputs for sizing light sprites
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightView {
    /// Distance from the camera to the plane, meters
    pub camera_distance: f32,
    /// Horizontal field of view, degrees
    pub fov_deg: f32,
    pub zoom: f32,
    /// Simulator time in milliseconds
    pub elapsed_ms: i64,
}

impl LightView {
    /// Distance in nautical miles, scaled for field of view and zoom
    pub fn apparent_distance_nm(&self) -> f32 {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        self.camera_distance * METERS_TO_NM * (self.fov_deg / 60.0) / zoom
    }
}

/// Sprite edge length for an apparent distance
pub fn light_size(distance_nm: f32) -> f32 {
    if distance_nm <= 3.6 {
        10.0 * distance_nm + 1.0
    } else {
        6.7 * distance_nm + 12.0
    }
}

/// Region of the light texture a sprite samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    /// Round glow, used for nav lights and beacons
    Glow,
    /// Bright flare, used for strobes and landing lights
    Flare,
}

/// One light to draw, in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSprite {
    pub position: [f32; 3],
    pub color: [f32; 4],
    /// Half the sprite edge length
    pub half_extent: f32,
    pub kind: SpriteKind,
}

/// Sprites for the lights of `lod` that are lit right now
pub fn light_sprites(lod: &LodBucket, status: &LightStatus, view: &LightView) -> Vec<LightSprite> {
    let time_ms = view.elapsed_ms + i64::from(status.time_offset);
    let beacon = status.beacon && beacon_lit(status.flash_pattern, time_ms);
    let strobe = status.strobe && strobe_lit(status.flash_pattern, time_ms);

    let distance = view.apparent_distance_nm();
    let size = light_size(distance);

    lod.lights()
        .iter()
        .filter_map(|light| {
            let (color, half_extent, kind) = match light.role() {
                LightRole::RedNav if status.nav => (NAV_RED, size / 2.0, SpriteKind::Glow),
                LightRole::GreenNav if status.nav => (NAV_GREEN, size / 2.0, SpriteKind::Glow),
                LightRole::Beacon if beacon => (NAV_RED, size / 2.0, SpriteKind::Glow),
                LightRole::Strobe if strobe => (STROBE, size / 1.5, SpriteKind::Flare),
                LightRole::Landing if status.landing => {
                    let mut color = LANDING;
                    color[3] = (LANDING[3] * (distance * -0.05882 + 1.1764)).clamp(0.0, 1.0);
                    (color, size / 2.0, SpriteKind::Flare)
                }
                LightRole::Other(rgb) if status.nav => {
                    let tint = rgb.map(|c| c as f32 * 0.1);
                    ([tint[0], tint[1], tint[2], 1.0], size / 2.0, SpriteKind::Glow)
                }
                _ => return None,
            };
            Some(LightSprite {
                position: light.position,
                color,
                half_extent,
                kind,
            })
        })
        .collect()
}
