//! Voice-assistant request body.
//!
//! Only the fields blasterd looks at are modelled; everything else in the
//! request is ignored.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceRequest {
    #[serde(default)]
    pub version: String,
    pub request: RequestBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub intent: RequestIntent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIntent {
    pub name: String,
    #[serde(default)]
    pub confirmation_status: String,
    #[serde(default)]
    pub slots: BTreeMap<String, RequestSlot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestSlot {
    pub name: String,
    /// Missing when the user did not fill the slot.
    #[serde(default)]
    pub value: Option<String>,
}

impl VoiceRequest {
    pub fn intent(&self) -> &RequestIntent {
        &self.request.intent
    }
}
