//! Query descriptor compiler.
//!
//! Turns a `(query_type, filters)` descriptor into the path and query string
//! appended to `/api`. Pure: no I/O, and required-filter violations are
//! reported before any request exists.

use crate::error::{Result, TarvenError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_HOPS: u32 = 3;
pub const DEFAULT_SUBGRAPH_DEPTH: u32 = 2;

/// The four query shapes the backend answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Entity,
    Relationship,
    Path,
    Subgraph,
}

/// How much of each node's property bag the backend returns in a subgraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    /// IDs and names only
    #[default]
    Skeleton,
    /// Adds descriptions
    Summary,
    /// Complete property bags
    Full,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Skeleton => "skeleton",
            DetailLevel::Summary => "summary",
            DetailLevel::Full => "full",
        }
    }
}

/// Optional filters; which ones matter depends on the query type
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryFilters {
    pub entity_name: Option<String>,
    pub entity_type: Option<String>,
    pub from_entity_id: Option<String>,
    pub to_entity_id: Option<String>,
    pub relationship_type: Option<String>,
    pub from_name: Option<String>,
    pub to_name: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    pub max_hops: Option<u32>,
    pub entity_id: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    pub depth: Option<u32>,
    pub detail_level: Option<DetailLevel>,
}

/// Arguments of the query operation
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query_type: QueryType,
    #[serde(flatten)]
    pub filters: QueryFilters,
}

/// Compile a query descriptor into a `/campaigns/{id}/...` path with query string.
pub fn compile(campaign_id: &str, request: &QueryRequest) -> Result<String> {
    let filters = &request.filters;

    let (suffix, params): (&str, Vec<(&str, String)>) = match request.query_type {
        QueryType::Entity => (
            "/entities",
            present_only(&[
                ("name", present(&filters.entity_name)),
                ("type", present(&filters.entity_type)),
            ]),
        ),
        QueryType::Relationship => (
            "/relationships",
            present_only(&[
                ("from_entity_id", present(&filters.from_entity_id)),
                ("to_entity_id", present(&filters.to_entity_id)),
                ("type", present(&filters.relationship_type)),
            ]),
        ),
        QueryType::Path => {
            let (from, to) = match (present(&filters.from_name), present(&filters.to_name)) {
                (Some(from), Some(to)) => (from, to),
                _ => {
                    return Err(TarvenError::Validation(
                        "from_name/to_name required".to_string(),
                    ))
                }
            };
            let max_hops = filters.max_hops.unwrap_or(DEFAULT_MAX_HOPS);
            (
                "/paths",
                vec![
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                    ("max_hops", max_hops.to_string()),
                ],
            )
        }
        QueryType::Subgraph => {
            let anchor = if let Some(id) = present(&filters.entity_id) {
                ("entity_id", id.to_string())
            } else if let Some(name) = present(&filters.entity_name) {
                ("name", name.to_string())
            } else {
                return Err(TarvenError::Validation(
                    "entity_id or entity_name required".to_string(),
                ));
            };
            let depth = filters.depth.unwrap_or(DEFAULT_SUBGRAPH_DEPTH);
            let detail_level = filters.detail_level.unwrap_or_default();
            (
                "/subgraph",
                vec![
                    anchor,
                    ("depth", depth.to_string()),
                    ("detail_level", detail_level.as_str().to_string()),
                ],
            )
        }
    };

    let mut path = format!("/campaigns/{}{}", urlencoding::encode(campaign_id), suffix);
    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        path.push('?');
        path.push_str(&query);
    }
    Ok(path)
}

/// Empty strings count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn present_only<'a>(pairs: &[(&'a str, Option<&str>)]) -> Vec<(&'a str, String)> {
    pairs
        .iter()
        .filter_map(|(key, value)| value.map(|v| (*key, v.to_string())))
        .collect()
}

/// Hop counts arrive as JSON numbers, sometimes written as `3.0`.
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n,
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a whole number, got {}",
                other
            )))
        }
    };
    number
        .as_u64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .and_then(|n| u32::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| {
            serde::de::Error::custom(format!("expected a whole number, got {}", number))
        })
}
