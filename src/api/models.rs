//! Request and response bodies for the admin API

use crate::games::types::ConfigUpdate;
use serde::{Deserialize, Deserializer, Serialize};

/// House edge used when `POST /admin/initialize` omits one
pub const DEFAULT_HOUSE_EDGE: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl OkResponse {
    pub fn new() -> Self {
        Self {
            ok: true,
            signature: None,
        }
    }

    pub fn with_signature(signature: String) -> Self {
        Self {
            ok: true,
            signature: Some(signature),
        }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub house_edge: Option<u8>,
}

impl InitializeRequest {
    pub fn house_edge(&self) -> u8 {
        self.house_edge.unwrap_or(DEFAULT_HOUSE_EDGE)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigRequest {
    #[serde(default, deserialize_with = "optional_number_or_string")]
    pub min_bet: Option<u64>,
    #[serde(default, deserialize_with = "optional_number_or_string")]
    pub max_bet: Option<u64>,
    pub house_edge: Option<u8>,
}

impl From<UpdateConfigRequest> for ConfigUpdate {
    fn from(req: UpdateConfigRequest) -> Self {
        ConfigUpdate {
            min_bet: req.min_bet,
            max_bet: req.max_bet,
            house_edge: req.house_edge,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRoundRequest {
    #[serde(deserialize_with = "number_or_string")]
    pub round_id: u64,
    pub crash_point: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRoundRequest {
    #[serde(deserialize_with = "number_or_string")]
    pub round_id: u64,
}

/// Lamport amounts can exceed what JSON clients represent exactly, so strings are accepted too
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

impl NumberOrString {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("'{}' is not an unsigned integer", s))),
        }
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?.into_u64()
}

fn optional_number_or_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_u64)
        .transpose()
}
