//! Output and workspace names.

use uuid::Uuid;
use versereel_common::fs::sanitize_component;
use versereel_project_model::GenerationRequest;

fn raw_correlation(request: &GenerationRequest) -> Option<&str> {
    request
        .correlation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// File-safe form of a correlation id.
///
/// Ids that survive sanitizing unchanged are used as they are. Lossy ones
/// (replaced characters, truncation) get a short tag derived from the raw
/// id, so distinct ids never map to the same name.
fn correlation_component(raw: &str) -> String {
    let clean = sanitize_component(raw);
    if clean == raw {
        return clean;
    }
    let tag = Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes()).simple().to_string();
    format!("{clean}_{}", &tag[..8])
}

/// `{prefix}_{platform}_{collection}_{start}-{end}[_{correlation}].mp4`
pub fn output_file_name(prefix: &str, request: &GenerationRequest) -> String {
    let mut name = format!(
        "{}_{}_{}_{}-{}",
        sanitize_component(prefix),
        request.platform.as_str(),
        request.collection,
        request.start,
        request.end
    );
    if let Some(raw) = raw_correlation(request) {
        name.push('_');
        name.push_str(&correlation_component(raw));
    }
    name.push_str(".mp4");
    name
}

/// Temporary directory name for one run of a request.
///
/// Always unique: the correlation id only prefixes a fresh random id, so two
/// runs never share a workspace even when their ids sanitize alike.
pub fn workspace_key(request: &GenerationRequest) -> String {
    let run = Uuid::new_v4().simple().to_string();
    match raw_correlation(request) {
        Some(raw) => format!("{}_{run}", sanitize_component(raw)),
        None => run,
    }
}
