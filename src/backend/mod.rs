//! Graph backend REST contract and client.

pub mod client;
pub mod types;

pub use client::BackendClient;
pub use types::{
    is_list_field, Campaign, CampaignCreate, EntityRecord, EntityType, IngestEntity,
    IngestRelationship, IngestRequest, RawEdge, RawNode, RawSubgraph, RelationshipType,
    LIST_FIELDS,
};
