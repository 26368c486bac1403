//! Generation requests.
//!
//! A request names a contiguous range of units inside one collection, the
//! two editions to draw narration and translation from, a background
//! video, and the target platform/resolution.

use serde::{Deserialize, Serialize};

/// Default narration edition.
pub const DEFAULT_NARRATOR: &str = "ar.alafasy";
/// Default translation edition.
pub const DEFAULT_TRANSLATION: &str = "en.sahih";
/// Default background video locator.
pub const DEFAULT_BACKGROUND_URL: &str = "https://www.pexels.com/download/video/34464845/";

/// Target platform variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// 9:16 (short-form vertical feeds).
    #[default]
    #[serde(alias = "reel")]
    Portrait,
    /// 16:9 (standard video).
    #[serde(alias = "youtube")]
    Landscape,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" | "reel" => Ok(Self::Portrait),
            "landscape" | "youtube" => Ok(Self::Landscape),
            other => Err(RequestError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Output resolution tier: the short edge of the canvas in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ResolutionTier {
    P360,
    P480,
    #[default]
    P720,
    P1080,
}

impl ResolutionTier {
    pub const ALL: [ResolutionTier; 4] = [Self::P360, Self::P480, Self::P720, Self::P1080];

    pub fn pixels(self) -> u32 {
        match self {
            Self::P360 => 360,
            Self::P480 => 480,
            Self::P720 => 720,
            Self::P1080 => 1080,
        }
    }
}

impl TryFrom<u32> for ResolutionTier {
    type Error = RequestError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.pixels() == value)
            .ok_or(RequestError::UnsupportedResolution(value))
    }
}

impl From<ResolutionTier> for u32 {
    fn from(tier: ResolutionTier) -> Self {
        tier.pixels()
    }
}

/// Validation failures for a [`GenerationRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("collection {collection} is outside 1..={max}")]
    CollectionOutOfBounds { collection: u32, max: u32 },

    #[error("unit indices are 1-based, got start {0}")]
    ZeroStart(u32),

    #[error("start {start} is after end {end}")]
    InvertedRange { start: u32, end: u32 },

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("narrator and translation editions must differ (both {0})")]
    SameEdition(String),

    #[error("unsupported resolution {0} (expected 360, 480, 720 or 1080)")]
    UnsupportedResolution(u32),

    #[error("unknown platform '{0}' (expected portrait or landscape)")]
    UnknownPlatform(String),
}

/// A request to render one video. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Collection id (1-based).
    #[serde(alias = "surah")]
    pub collection: u32,

    /// First unit index, inclusive.
    #[serde(alias = "ayah_start")]
    pub start: u32,

    /// Last unit index, inclusive.
    #[serde(alias = "ayah_end")]
    pub end: u32,

    /// Edition providing narration audio and original-script text.
    #[serde(default = "default_narrator", alias = "reciter_id")]
    pub narrator_id: String,

    /// Edition providing the translated text.
    #[serde(default = "default_translation")]
    pub translation_id: String,

    /// Where to fetch the background video from.
    #[serde(default = "default_background", alias = "background_url")]
    pub background: String,

    #[serde(default)]
    pub platform: Platform,

    #[serde(default)]
    pub resolution: ResolutionTier,

    /// Caller-chosen id used for progress subscription and output naming.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

fn default_narrator() -> String {
    DEFAULT_NARRATOR.to_string()
}

fn default_translation() -> String {
    DEFAULT_TRANSLATION.to_string()
}

fn default_background() -> String {
    DEFAULT_BACKGROUND_URL.to_string()
}

impl GenerationRequest {
    /// A request for `collection` `start..=end` with every other field defaulted.
    pub fn new(collection: u32, start: u32, end: u32) -> Self {
        Self {
            collection,
            start,
            end,
            narrator_id: default_narrator(),
            translation_id: default_translation(),
            background: default_background(),
            platform: Platform::default(),
            resolution: ResolutionTier::default(),
            correlation_id: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_resolution(mut self, resolution: ResolutionTier) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Check the request against provider bounds.
    ///
    /// The upper bound of the unit range is not checked here: a range that
    /// lies past the end of the collection surfaces later as an empty range.
    pub fn validate(&self, collection_count: u32) -> Result<(), RequestError> {
        if self.collection == 0 || self.collection > collection_count {
            return Err(RequestError::CollectionOutOfBounds {
                collection: self.collection,
                max: collection_count,
            });
        }
        if self.start == 0 {
            return Err(RequestError::ZeroStart(self.start));
        }
        if self.start > self.end {
            return Err(RequestError::InvertedRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.narrator_id.trim().is_empty() {
            return Err(RequestError::EmptyField {
                field: "narrator_id",
            });
        }
        if self.translation_id.trim().is_empty() {
            return Err(RequestError::EmptyField {
                field: "translation_id",
            });
        }
        if self.background.trim().is_empty() {
            return Err(RequestError::EmptyField {
                field: "background",
            });
        }
        if self.narrator_id == self.translation_id {
            return Err(RequestError::SameEdition(self.narrator_id.clone()));
        }
        Ok(())
    }

    /// Number of units the range asks for.
    pub fn unit_count(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn contains_unit(&self, unit: u32) -> bool {
        (self.start..=self.end).contains(&unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{ "collection": 108, "start": 1, "end": 3 }"#).unwrap();
        assert_eq!(req.narrator_id, "ar.alafasy");
        assert_eq!(req.translation_id, "en.sahih");
        assert_eq!(req.platform, Platform::Portrait);
        assert_eq!(req.resolution, ResolutionTier::P720);
        assert!(req.correlation_id.is_none());
    }

    #[test]
    fn test_legacy_field_names_are_accepted() {
        let req: GenerationRequest = serde_json::from_str(
            r#"{ "surah": 1, "ayah_start": 2, "ayah_end": 4, "reciter_id": "ar.husary",
                 "platform": "youtube", "resolution": 1080 }"#,
        )
        .unwrap();
        assert_eq!(req.collection, 1);
        assert_eq!(req.narrator_id, "ar.husary");
        assert_eq!(req.platform, Platform::Landscape);
        assert_eq!(req.resolution, ResolutionTier::P1080);
    }

    #[test]
    fn test_unsupported_resolution_rejected() {
        let result: Result<GenerationRequest, _> =
            serde_json::from_str(r#"{ "collection": 1, "start": 1, "end": 1, "resolution": 999 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_bounds() {
        assert!(GenerationRequest::new(108, 1, 1).validate(114).is_ok());
        assert_eq!(
            GenerationRequest::new(115, 1, 1).validate(114),
            Err(RequestError::CollectionOutOfBounds {
                collection: 115,
                max: 114
            })
        );
        assert_eq!(
            GenerationRequest::new(0, 1, 1).validate(114),
            Err(RequestError::CollectionOutOfBounds {
                collection: 0,
                max: 114
            })
        );
        assert_eq!(
            GenerationRequest::new(1, 0, 1).validate(114),
            Err(RequestError::ZeroStart(0))
        );
        assert_eq!(
            GenerationRequest::new(1, 5, 2).validate(114),
            Err(RequestError::InvertedRange { start: 5, end: 2 })
        );
    }

    #[test]
    fn test_validate_rejects_identical_editions() {
        let mut req = GenerationRequest::new(1, 1, 1);
        req.translation_id = req.narrator_id.clone();
        assert!(matches!(
            req.validate(114),
            Err(RequestError::SameEdition(_))
        ));
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!("reel".parse::<Platform>().unwrap(), Platform::Portrait);
        assert_eq!("Landscape".parse::<Platform>().unwrap(), Platform::Landscape);
        assert!("square".parse::<Platform>().is_err());
    }

    #[test]
    fn test_range_helpers() {
        let req = GenerationRequest::new(2, 3, 5);
        assert_eq!(req.unit_count(), 3);
        assert!(req.contains_unit(3));
        assert!(req.contains_unit(5));
        assert!(!req.contains_unit(6));
    }
}
