//! Timeline construction.
//!
//! Resolves a request's unit range into ordered [`Segment`]s: query the
//! provider, pair original and translated units, then download and measure
//! each narration clip. Any failure aborts the whole build.

use std::path::Path;
use std::sync::Arc;

use versereel_common::{GenerationError, GenerationResult, MediaProbe};
use versereel_project_model::{GenerationRequest, Segment, Timeline};

use crate::fetch::AssetFetcher;
use crate::provider::{parse_envelope, take_edition, ScriptureProvider};

/// A unit matched from the provider, before its audio is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUnit {
    pub unit_index: u32,
    pub original_text: String,
    pub translated_text: String,
    pub audio_url: String,
}

/// Audio locator used when the provider does not supply one.
pub fn fallback_audio_url(base: &str, narrator: &str, collection: u32, unit: u32) -> String {
    format!(
        "{}/{}/{:03}{:03}.mp3",
        base.trim_end_matches('/'),
        narrator,
        collection,
        unit
    )
}

/// Local file name for a unit's narration.
pub fn audio_file_name(collection: u32, unit: u32) -> String {
    format!("audio_{collection:03}_{unit:03}.mp3")
}

pub struct TimelineBuilder {
    provider: Arc<dyn ScriptureProvider>,
    fetcher: Arc<dyn AssetFetcher>,
    probe: Arc<dyn MediaProbe>,
    audio_fallback_base: String,
}

impl TimelineBuilder {
    pub fn new(
        provider: Arc<dyn ScriptureProvider>,
        fetcher: Arc<dyn AssetFetcher>,
        probe: Arc<dyn MediaProbe>,
        audio_fallback_base: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            fetcher,
            probe,
            audio_fallback_base: audio_fallback_base.into(),
        }
    }

    /// Query the provider and match the requested range.
    pub fn fetch_units(&self, request: &GenerationRequest) -> GenerationResult<Vec<PendingUnit>> {
        let value = self.provider.fetch(
            request.collection,
            &[request.narrator_id.as_str(), request.translation_id.as_str()],
        )?;

        let mut editions = parse_envelope(&value)?;
        let narration = take_edition(&mut editions, &request.narrator_id)?;
        let translation = take_edition(&mut editions, &request.translation_id)?;

        if narration.units.len() != translation.units.len() {
            return Err(GenerationError::provider_format(format!(
                "edition lengths differ: {} has {} units, {} has {}",
                narration.identifier,
                narration.units.len(),
                translation.identifier,
                translation.units.len()
            )));
        }

        let units: Vec<PendingUnit> = narration
            .units
            .into_iter()
            .zip(translation.units)
            .filter(|(original, _)| request.contains_unit(original.number))
            .map(|(original, translated)| {
                let audio_url = original
                    .audio
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| {
                        fallback_audio_url(
                            &self.audio_fallback_base,
                            &request.narrator_id,
                            request.collection,
                            original.number,
                        )
                    });
                PendingUnit {
                    unit_index: original.number,
                    original_text: original.text,
                    translated_text: translated.text,
                    audio_url,
                }
            })
            .collect();

        if units.is_empty() {
            return Err(GenerationError::EmptyRange {
                collection: request.collection,
                start: request.start,
                end: request.end,
            });
        }

        tracing::info!(
            collection = request.collection,
            units = units.len(),
            "Matched scripture units"
        );
        Ok(units)
    }

    /// Download and measure every unit's narration into `dir`.
    ///
    /// `dir` is owned by the caller, who is responsible for purging it when
    /// this returns an error.
    pub fn resolve_assets(
        &self,
        request: &GenerationRequest,
        units: Vec<PendingUnit>,
        dir: &Path,
    ) -> GenerationResult<Timeline> {
        let mut segments = Vec::with_capacity(units.len());

        for unit in units {
            let audio_path = dir.join(audio_file_name(request.collection, unit.unit_index));

            if !self.fetcher.fetch(&unit.audio_url, &audio_path) {
                return Err(GenerationError::asset_resolution(
                    unit.unit_index,
                    format!("download failed from {}", unit.audio_url),
                ));
            }

            let duration_secs = self
                .probe
                .audio_duration(&audio_path)
                .map_err(|e| GenerationError::asset_resolution(unit.unit_index, e.to_string()))?;
            if !duration_secs.is_finite() || duration_secs <= 0.0 {
                return Err(GenerationError::asset_resolution(
                    unit.unit_index,
                    format!("invalid duration {duration_secs}"),
                ));
            }

            tracing::debug!(unit = unit.unit_index, duration_secs, "Resolved narration");
            segments.push(Segment {
                unit_index: unit.unit_index,
                original_text: unit.original_text,
                translated_text: unit.translated_text,
                audio_url: unit.audio_url,
                audio_path,
                duration_secs,
                start_secs: 0.0,
            });
        }

        let timeline = Timeline::from_segments(segments);
        tracing::info!(
            segments = timeline.len(),
            total_secs = timeline.total_secs,
            "Timeline resolved"
        );
        Ok(timeline)
    }

    /// [`fetch_units`](Self::fetch_units) followed by
    /// [`resolve_assets`](Self::resolve_assets).
    pub fn build(&self, request: &GenerationRequest, dir: &Path) -> GenerationResult<Timeline> {
        let units = self.fetch_units(request)?;
        self.resolve_assets(request, units, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_audio_url_is_zero_padded() {
        assert_eq!(
            fallback_audio_url("https://everyayah.com/data/", "ar.alafasy", 2, 7),
            "https://everyayah.com/data/ar.alafasy/002007.mp3"
        );
    }

    #[test]
    fn test_audio_file_name() {
        assert_eq!(audio_file_name(108, 3), "audio_108_003.mp3");
    }
}
