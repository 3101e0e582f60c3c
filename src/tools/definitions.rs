use crate::backend::{EntityType, RelationshipType};
use serde_json::{json, Value};

pub const CREATE_CAMPAIGN: &str = "tarven_create_campaign";
pub const DELETE_CAMPAIGN: &str = "tarven_delete_campaign";
pub const STORE_ENTITIES: &str = "tarven_store_entities";
pub const QUERY: &str = "tarven_query";

/// Every operation name the dispatcher owns, in registration order.
pub const OPERATION_NAMES: [&str; 4] = [CREATE_CAMPAIGN, DELETE_CAMPAIGN, STORE_ENTITIES, QUERY];

pub const CREATE_CAMPAIGN_DESCRIPTION: &str = "Create a new TRPG campaign and make it the active one.";
pub const DELETE_CAMPAIGN_DESCRIPTION: &str = "Delete a campaign and all its entities/relationships. Use when campaign is finished or no longer needed.";
pub const STORE_ENTITIES_DESCRIPTION: &str = "Store or update entities and relationships. Supports upsert - same entity/relationship will be updated. List fields (alias, used_name, note) append values; other fields overwrite.";
pub const QUERY_DESCRIPTION: &str = "Query knowledge graph. Types: entity (by name/type), relationship (by entity IDs), path (between two entities), subgraph (around one entity).";

const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-04/schema#";

fn entity_types() -> Vec<&'static str> {
    EntityType::ALL.iter().map(EntityType::as_str).collect()
}

fn relationship_types() -> Vec<&'static str> {
    RelationshipType::ALL.iter().map(RelationshipType::as_str).collect()
}

pub fn create_campaign_schema() -> Value {
    json!({
        "$schema": SCHEMA_DRAFT,
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": "Campaign name"},
            "system": {"type": "string", "description": "Rule system (COC7, DND5e, Cyberpunk, ...)"},
            "description": {"type": "string", "description": "Campaign description"},
            "metadata": {"type": "object", "description": "Free-form metadata"}
        },
        "required": ["name", "system"]
    })
}

pub fn delete_campaign_schema() -> Value {
    json!({
        "$schema": SCHEMA_DRAFT,
        "type": "object",
        "properties": {
            "campaign_id": {"type": "string", "description": "ID of the campaign to delete"}
        },
        "required": ["campaign_id"]
    })
}

fn string_list(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "string"}, "description": description})
}

fn typed(kind: &str, description: &str) -> Value {
    json!({"type": kind, "description": description})
}

/// Rule-system attribute block nested under `properties.attributes`.
fn attributes_schema() -> Value {
    let fields = [
        ("stats", typed("object", "Base stats, e.g. {STR: 50, CON: 60}")),
        ("skills", typed("object", "Skill values, e.g. {Spot Hidden: 60}")),
        ("hp", typed("integer", "Hit points")),
        ("mp", typed("integer", "Magic points")),
        ("san", typed("integer", "Sanity (COC)")),
        ("luck", typed("integer", "Luck")),
        ("level", typed("integer", "Level (DND)")),
        ("class", typed("string", "Class (DND)")),
        ("race", typed("string", "Race")),
        ("ext", typed("object", "Extension fields")),
    ];
    json!({
        "type": "object",
        "description": "Rule-system attributes (COC, DND, ...)",
        "properties": object_of(fields)
    })
}

/// Fixed entity property keys.
fn entity_properties_schema() -> Value {
    let fields = [
        ("description", typed("string", "Description")),
        ("aliases", string_list("Aliases (appended, never replaced)")),
        ("used_names", string_list("Former names (appended)")),
        ("notes", string_list("Notes (appended)")),
        ("occupation", typed("string", "Occupation")),
        ("age", typed("integer", "Age")),
        ("gender", typed("string", "Gender")),
        ("appearance", typed("string", "Appearance")),
        ("personality", typed("string", "Personality")),
        ("background", typed("string", "Background")),
        ("location_type", typed("string", "Kind of location")),
        ("address", typed("string", "Address")),
        ("item_type", typed("string", "Kind of item")),
        ("rarity", typed("string", "Rarity")),
        ("event_time", typed("string", "When the event happened")),
        ("participants", string_list("Participants")),
        ("org_type", typed("string", "Kind of organization")),
        ("members", string_list("Members")),
        ("attributes", attributes_schema()),
    ];
    json!({
        "type": "object",
        "description": "Entity properties. Keys are fixed; store values only under the fields defined here.",
        "properties": object_of(fields)
    })
}

fn object_of<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(key, schema)| (key.to_string(), schema))
            .collect(),
    )
}

fn entity_item_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": {
                "type": "string",
                "enum": entity_types(),
                "description": "Entity type - MUST use one of these exact values. For character skill values use properties.attributes.skills; the Skill type is for standalone skill nodes."
            },
            "name": {"type": "string"},
            "properties": entity_properties_schema(),
            "metadata": {"type": "object"}
        },
        "required": ["type", "name"]
    })
}

fn relationship_item_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "from_entity_name": {"type": "string"},
            "to_entity_name": {"type": "string"},
            "type": {
                "type": "string",
                "enum": relationship_types(),
                "description": "Relationship type"
            },
            "bidirectional": {
                "type": "boolean",
                "description": "Also create the inverse edge, e.g. 'A and B are friends'",
                "default": false
            },
            "reverse_type": {
                "type": "string",
                "enum": relationship_types(),
                "description": "Type of the inverse edge when bidirectional is true. If A HATES B and B FEARS A, use type=HATES, reverse_type=FEARS. Defaults to type."
            },
            "properties": {"type": "object"}
        },
        "required": ["from_entity_name", "to_entity_name", "type"]
    })
}

pub fn store_entities_schema() -> Value {
    json!({
        "$schema": SCHEMA_DRAFT,
        "type": "object",
        "properties": {
            "entities": {
                "type": "array",
                "description": "Entities to upsert, matched by name within the campaign",
                "items": entity_item_schema()
            },
            "relationships": {
                "type": "array",
                "description": "Relationships between entities, endpoints given by entity name",
                "items": relationship_item_schema()
            }
        },
        "required": ["entities", "relationships"]
    })
}

pub fn query_schema() -> Value {
    json!({
        "$schema": SCHEMA_DRAFT,
        "type": "object",
        "properties": {
            "query_type": {
                "type": "string",
                "enum": ["entity", "relationship", "path", "subgraph"],
                "description": "Query shape"
            },
            "entity_name": {"type": "string", "description": "Entity name"},
            "entity_type": {"type": "string", "description": "Entity type filter"},
            "from_entity_id": {"type": "string", "description": "Relationship source entity ID"},
            "to_entity_id": {"type": "string", "description": "Relationship target entity ID"},
            "relationship_type": {"type": "string", "description": "Relationship type filter"},
            "from_name": {"type": "string", "description": "Path start entity name"},
            "to_name": {"type": "string", "description": "Path end entity name"},
            "max_hops": {"type": "number", "description": "Maximum path length (default 3)"},
            "entity_id": {"type": "string", "description": "Subgraph centre entity ID (or use entity_name)"},
            "depth": {"type": "number", "description": "Subgraph depth (default 2)"},
            "detail_level": {
                "type": "string",
                "enum": ["skeleton", "summary", "full"],
                "description": "skeleton (IDs and names), summary (adds description), full (all properties)"
            }
        },
        "required": ["query_type"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_are_unique() {
        let mut names = OPERATION_NAMES.to_vec();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_store_schema_enums() {
        let schema = store_entities_schema();
        let entity_enum = &schema["properties"]["entities"]["items"]["properties"]["type"]["enum"];
        assert_eq!(entity_enum.as_array().unwrap().len(), 7);

        let rel_props = &schema["properties"]["relationships"]["items"]["properties"];
        assert_eq!(rel_props["type"]["enum"].as_array().unwrap().len(), 16);
        assert_eq!(rel_props["bidirectional"]["default"], false);
        assert!(rel_props["type"]["enum"]
            .as_array()
            .unwrap()
            .contains(&Value::from("CONNECTED_TO")));
    }

    #[test]
    fn test_store_schema_entity_properties() {
        let schema = store_entities_schema();
        let items = &schema["properties"]["entities"]["items"];
        assert_eq!(items["required"], json!(["type", "name"]));

        let props = items["properties"]["properties"]["properties"].as_object().unwrap();
        assert_eq!(props.len(), 19);
        assert_eq!(props["aliases"]["items"]["type"], "string");
        assert_eq!(props["age"]["type"], "integer");

        let attributes = props["attributes"]["properties"].as_object().unwrap();
        assert_eq!(attributes.len(), 10);
        assert_eq!(attributes["san"]["description"], "Sanity (COC)");
        assert_eq!(attributes["ext"]["type"], "object");
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(create_campaign_schema()["required"], json!(["name", "system"]));
        assert_eq!(delete_campaign_schema()["required"], json!(["campaign_id"]));
        assert_eq!(query_schema()["required"], json!(["query_type"]));
        assert_eq!(
            query_schema()["properties"]["detail_level"]["enum"],
            json!(["skeleton", "summary", "full"])
        );
    }
}
