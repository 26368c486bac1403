//! Scripture data provider.
//!
//! The provider answers one query: all units of a collection across a set
//! of editions. Two envelope shapes are accepted:
//!
//! ```json
//! { "data": [ { "edition": { "identifier": "ar.alafasy" }, "ayahs": [...] }, ... ] }
//! { "data": { "editions": [ ... ] } }
//! ```

use std::time::Duration;

use serde::Deserialize;
use versereel_common::{GenerationError, GenerationResult, ProviderConfig};

/// Browser-like agent; some CDNs reject default library agents.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Read-only source of scripture text and audio locators.
pub trait ScriptureProvider: Send + Sync {
    /// Raw response for `collection` across `editions`.
    fn fetch(&self, collection: u32, editions: &[&str]) -> GenerationResult<serde_json::Value>;
}

/// One unit as the provider describes it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawUnit {
    #[serde(rename = "numberInSurah")]
    pub number: u32,

    pub text: String,

    #[serde(default)]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct EditionMeta {
    #[serde(default)]
    identifier: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct EditionPayload {
    #[serde(default)]
    edition: EditionMeta,

    #[serde(default, rename = "ayahs")]
    units: Vec<RawUnit>,
}

/// One edition's units, in provider order.
#[derive(Debug, Clone, PartialEq)]
pub struct Edition {
    pub identifier: String,
    pub units: Vec<RawUnit>,
}

/// Extract editions from either recognized envelope shape.
pub fn parse_envelope(value: &serde_json::Value) -> GenerationResult<Vec<Edition>> {
    let data = value
        .get("data")
        .ok_or_else(|| GenerationError::provider_format("response has no 'data' field"))?;

    let list = match data {
        serde_json::Value::Array(_) => data,
        serde_json::Value::Object(map) => map.get("editions").ok_or_else(|| {
            GenerationError::provider_format("'data' object has no 'editions' field")
        })?,
        _ => {
            return Err(GenerationError::provider_format(
                "'data' is neither a list nor an object",
            ))
        }
    };

    let payloads: Vec<EditionPayload> = serde_json::from_value(list.clone())
        .map_err(|e| GenerationError::provider_format(format!("malformed editions: {e}")))?;

    Ok(payloads
        .into_iter()
        .map(|p| Edition {
            identifier: p.edition.identifier,
            units: p.units,
        })
        .collect())
}

/// Pick the edition with `identifier`.
pub fn take_edition(editions: &mut Vec<Edition>, identifier: &str) -> GenerationResult<Edition> {
    let idx = editions
        .iter()
        .position(|e| e.identifier == identifier)
        .ok_or_else(|| {
            GenerationError::provider_format(format!("edition '{identifier}' missing from response"))
        })?;
    Ok(editions.swap_remove(idx))
}

/// [`ScriptureProvider`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> GenerationResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::provider_format(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, collection: u32, editions: &[&str]) -> String {
        format!(
            "{}/surah/{}/editions/{}",
            self.base_url,
            collection,
            editions.join(",")
        )
    }
}

impl ScriptureProvider for HttpProvider {
    fn fetch(&self, collection: u32, editions: &[&str]) -> GenerationResult<serde_json::Value> {
        let url = self.url_for(collection, editions);
        tracing::info!(url = %url, "Querying scripture provider");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| GenerationError::provider_format(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::provider_format(format!(
                "provider returned status {status}"
            )));
        }

        response
            .json::<serde_json::Value>()
            .map_err(|e| GenerationError::provider_format(format!("response is not JSON: {e}")))
    }
}
