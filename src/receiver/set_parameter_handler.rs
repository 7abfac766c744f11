//! SET_PARAMETER request routing

use super::volume_handler::{VolumeUpdate, parse_volume_parameter};
use crate::protocol::rtsp::RtspRequest;

/// Result of processing SET_PARAMETER
#[derive(Debug)]
pub enum ParameterUpdate {
    /// Volume update
    Volume(VolumeUpdate),
    /// Unknown parameter type
    Unknown(String),
}

/// Process a SET_PARAMETER request body, routed by its Content-Type.
///
/// Metadata/artwork/progress parameters (iTunes DACP extensions) are outside
/// a plain `AirTunes` receiver's scope; only the `text/parameters` volume
/// control this protocol actually requires is handled.
#[must_use]
pub fn process_set_parameter(request: &RtspRequest) -> Vec<ParameterUpdate> {
    let mut updates = Vec::new();

    let content_type = request.headers.get("Content-Type").unwrap_or("");
    let body_str = String::from_utf8_lossy(&request.body);

    if content_type.contains("text/parameters") {
        if let Some(volume) = parse_volume_parameter(&body_str) {
            updates.push(ParameterUpdate::Volume(volume));
        }
    } else if !content_type.is_empty() {
        updates.push(ParameterUpdate::Unknown(content_type.to_string()));
    }

    updates
}
