//! Output canvas geometry.

use serde::{Deserialize, Serialize};

use crate::request::{Platform, ResolutionTier};

/// Target frame dimensions. Both sides are always even (yuv420p requires it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
}

impl CanvasSpec {
    /// Canvas for a platform variant at a resolution tier.
    ///
    /// The tier fixes the short edge; the long edge is 16/9 of it rounded
    /// to the nearest even pixel count.
    pub fn for_request(platform: Platform, tier: ResolutionTier) -> Self {
        let short = tier.pixels();
        let long = round_even(short as f64 * 16.0 / 9.0);
        match platform {
            Platform::Portrait => Self {
                width: short,
                height: long,
            },
            Platform::Landscape => Self {
                width: long,
                height: short,
            },
        }
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Canvas width relative to `reference_width`.
    pub fn scale_from(&self, reference_width: u32) -> f32 {
        if reference_width == 0 {
            return 1.0;
        }
        self.width as f32 / reference_width as f32
    }
}

impl std::fmt::Display for CanvasSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Round to the nearest even integer.
pub fn round_even(value: f64) -> u32 {
    ((value / 2.0).round() * 2.0).max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_canvases() {
        assert_eq!(
            CanvasSpec::for_request(Platform::Portrait, ResolutionTier::P720),
            CanvasSpec {
                width: 720,
                height: 1280
            }
        );
        assert_eq!(
            CanvasSpec::for_request(Platform::Landscape, ResolutionTier::P480),
            CanvasSpec {
                width: 854,
                height: 480
            }
        );
        assert_eq!(
            CanvasSpec::for_request(Platform::Landscape, ResolutionTier::P1080),
            CanvasSpec {
                width: 1920,
                height: 1080
            }
        );
        assert_eq!(
            CanvasSpec::for_request(Platform::Portrait, ResolutionTier::P360),
            CanvasSpec {
                width: 360,
                height: 640
            }
        );
    }

    #[test]
    fn test_round_even() {
        assert_eq!(round_even(853.33), 854);
        assert_eq!(round_even(640.0), 640);
        assert_eq!(round_even(3.0), 4);
    }

    #[test]
    fn test_scale_from_reference() {
        let canvas = CanvasSpec::for_request(Platform::Portrait, ResolutionTier::P1080);
        assert!((canvas.scale_from(1080) - 1.0).abs() < f32::EPSILON);
        let small = CanvasSpec::for_request(Platform::Portrait, ResolutionTier::P360);
        assert!((small.scale_from(1080) - 1.0 / 3.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_canvas_sides_are_even_and_oriented(portrait in any::<bool>(), idx in 0usize..4) {
            let tier = ResolutionTier::ALL[idx];
            let platform = if portrait { Platform::Portrait } else { Platform::Landscape };
            let canvas = CanvasSpec::for_request(platform, tier);
            prop_assert_eq!(canvas.width % 2, 0);
            prop_assert_eq!(canvas.height % 2, 0);
            prop_assert_eq!(canvas.is_portrait(), portrait);
            prop_assert_eq!(canvas.width.min(canvas.height), tier.pixels());
        }
    }
}
