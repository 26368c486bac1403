pub mod canvas;
pub mod check;
pub mod config;
pub mod generate;

use versereel_common::GenerationError;
use versereel_project_model::{Platform, ResolutionTier};

pub(crate) fn parse_platform(raw: &str) -> Result<Platform, GenerationError> {
    raw.parse()
        .map_err(|e: versereel_project_model::RequestError| GenerationError::invalid_input(e.to_string()))
}

pub(crate) fn parse_resolution(raw: u32) -> Result<ResolutionTier, GenerationError> {
    ResolutionTier::try_from(raw).map_err(|e| GenerationError::invalid_input(e.to_string()))
}
