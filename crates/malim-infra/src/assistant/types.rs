//! Wire types of the style-assistant endpoint.
//!
//! Field names are the endpoint's (`mensaje`, `imagen`, `historial`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest<'a> {
    pub mensaje: &'a str,
    pub imagen: Option<&'a str>,
    pub id_token: Option<&'a str>,
    pub user_data: Option<UserDataBody<'a>>,
    pub historial: Vec<HistoryEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct UserDataBody<'a> {
    pub nombre: &'a str,
    pub whatsapp: &'a str,
    pub email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry<'a> {
    pub role: String,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub requires_auth: bool,
    pub message: Option<String>,
    pub mode: Option<String>,
    pub response: Option<String>,
    pub extracted_attributes: Option<ExtractedAttributes>,
    pub missing_attributes: Option<Vec<String>>,
    pub error: Option<String>,
}

/// Attribute values arrive as a string, a list of strings, or null.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct ExtractedAttributes(BTreeMap<String, Value>);

impl ExtractedAttributes {
    /// Normalize to lists, dropping empty and non-string values.
    pub fn into_lists(self) -> BTreeMap<String, Vec<String>> {
        self.0
            .into_iter()
            .filter_map(|(name, value)| {
                let values: Vec<String> = match value {
                    Value::String(s) => vec![s],
                    Value::Array(items) => items
                        .into_iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                    _ => Vec::new(),
                };
                let values: Vec<String> = values.into_iter().filter(|v| !v.trim().is_empty()).collect();
                (!values.is_empty()).then_some((name, values))
            })
            .collect()
    }
}
