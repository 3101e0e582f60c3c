use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Property keys whose values accumulate across stores instead of being replaced.
pub const LIST_FIELDS: &[&str] = &["alias", "aliases", "used_name", "used_names", "note", "notes"];

pub fn is_list_field(key: &str) -> bool {
    LIST_FIELDS.contains(&key)
}

/// Kind of entity node in a campaign graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Character,
    Location,
    Event,
    Clue,
    Item,
    Organization,
    Skill,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        EntityType::Character,
        EntityType::Location,
        EntityType::Event,
        EntityType::Clue,
        EntityType::Item,
        EntityType::Organization,
        EntityType::Skill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Character => "Character",
            EntityType::Location => "Location",
            EntityType::Event => "Event",
            EntityType::Clue => "Clue",
            EntityType::Item => "Item",
            EntityType::Organization => "Organization",
            EntityType::Skill => "Skill",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Typed edge between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Knows,
    Trusts,
    Fears,
    Loves,
    Hates,
    LocatedAt,
    WorksAt,
    LivesAt,
    ParticipatedIn,
    Witnessed,
    Caused,
    Owns,
    Used,
    Found,
    BelongsTo,
    ConnectedTo,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 16] = [
        RelationshipType::Knows,
        RelationshipType::Trusts,
        RelationshipType::Fears,
        RelationshipType::Loves,
        RelationshipType::Hates,
        RelationshipType::LocatedAt,
        RelationshipType::WorksAt,
        RelationshipType::LivesAt,
        RelationshipType::ParticipatedIn,
        RelationshipType::Witnessed,
        RelationshipType::Caused,
        RelationshipType::Owns,
        RelationshipType::Used,
        RelationshipType::Found,
        RelationshipType::BelongsTo,
        RelationshipType::ConnectedTo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Knows => "KNOWS",
            RelationshipType::Trusts => "TRUSTS",
            RelationshipType::Fears => "FEARS",
            RelationshipType::Loves => "LOVES",
            RelationshipType::Hates => "HATES",
            RelationshipType::LocatedAt => "LOCATED_AT",
            RelationshipType::WorksAt => "WORKS_AT",
            RelationshipType::LivesAt => "LIVES_AT",
            RelationshipType::ParticipatedIn => "PARTICIPATED_IN",
            RelationshipType::Witnessed => "WITNESSED",
            RelationshipType::Caused => "CAUSED",
            RelationshipType::Owns => "OWNS",
            RelationshipType::Used => "USED",
            RelationshipType::Found => "FOUND",
            RelationshipType::BelongsTo => "BELONGS_TO",
            RelationshipType::ConnectedTo => "CONNECTED_TO",
        }
    }
}

/// `POST /api/campaigns` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignCreate {
    pub name: String,
    pub system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Campaign as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub campaign_id: String,
    pub name: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Campaign {
    /// Creation timestamp; naive backend timestamps are read as UTC.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn created_label(&self) -> String {
        self.created_at()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

/// Entity in an ingest batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEntity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Relationship in an ingest batch, endpoints named by entity name or id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRelationship {
    #[serde(alias = "from")]
    pub from_entity_name: String,
    #[serde(alias = "to")]
    pub to_entity_name: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_type: Option<RelationshipType>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl IngestRelationship {
    /// Type of the inverse edge the backend materialises, if any.
    pub fn effective_reverse_type(&self) -> Option<RelationshipType> {
        if self.bidirectional {
            Some(self.reverse_type.unwrap_or(self.relationship_type))
        } else {
            None
        }
    }
}

/// `POST /api/campaigns/{id}/ingest` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub entities: Vec<IngestEntity>,
    pub relationships: Vec<IngestRelationship>,
}

impl IngestRequest {
    /// Fill `reverse_type` on bidirectional relationships that left it unset.
    /// Entity properties are passed through untouched: list-field merging is
    /// the backend's job.
    pub fn normalized(mut self) -> Self {
        for rel in &mut self.relationships {
            rel.reverse_type = rel.effective_reverse_type();
        }
        self
    }
}

/// Full entity record (`GET /entities/{id}` and entity listings)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default, deserialize_with = "opt_id_string")]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Subgraph node as sent by the backend (may be a skeleton)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, deserialize_with = "opt_id_string", skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl RawNode {
    /// Identifier used for the full-record follow-up fetch.
    pub fn record_id(&self) -> &str {
        self.entity_id.as_deref().unwrap_or(&self.id)
    }
}

/// Subgraph edge as sent by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub from_id: String,
    #[serde(deserialize_with = "id_string")]
    pub to_id: String,
    #[serde(rename = "type", default)]
    pub edge_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// `GET /subgraph` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSubgraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

/// Accept string or numeric identifiers, normalised to a string.
fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}

fn opt_id_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}
