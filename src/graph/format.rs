//! Detail formatting for the side panel.
//!
//! Property bags are classified into [`PropertyValue`] first and rendered
//! from that, so recursion only ever sees four shapes.

use crate::backend::{is_list_field, EntityRecord, RawEdge, RawNode};
use crate::graph::node_color;
use serde_json::{Map, Value};

const INDENT: &str = "  ";

/// A property value classified for display
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Scalar(String),
    List(Vec<PropertyValue>),
    Map(Vec<(String, PropertyValue)>),
}

impl From<&Value> for PropertyValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => PropertyValue::Null,
            Value::String(s) => PropertyValue::Scalar(s.clone()),
            Value::Bool(b) => PropertyValue::Scalar(b.to_string()),
            Value::Number(n) => PropertyValue::Scalar(n.to_string()),
            Value::Array(items) => PropertyValue::List(items.iter().map(Self::from).collect()),
            Value::Object(map) => PropertyValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl PropertyValue {
    /// Fits on one line: nulls, scalars, and lists of those.
    pub fn is_inline(&self) -> bool {
        match self {
            PropertyValue::Null | PropertyValue::Scalar(_) => true,
            PropertyValue::List(items) => items
                .iter()
                .all(|item| matches!(item, PropertyValue::Null | PropertyValue::Scalar(_))),
            PropertyValue::Map(_) => false,
        }
    }

    /// One-line text; nested structures are flattened.
    pub fn inline(&self) -> String {
        match self {
            PropertyValue::Null => String::new(),
            PropertyValue::Scalar(s) => s.clone(),
            PropertyValue::List(items) => items
                .iter()
                .map(PropertyValue::inline)
                .collect::<Vec<_>>()
                .join(", "),
            PropertyValue::Map(entries) => entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.inline()))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// A property bag split into label/value fields and accumulated lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySheet {
    pub fields: Vec<(String, PropertyValue)>,
    pub lists: Vec<(String, Vec<String>)>,
}

impl PropertySheet {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.lists.is_empty()
    }

    /// Indented text markup: a "Properties" block, then one bulleted block per list field.
    pub fn render(&self) -> String {
        let mut out = Vec::new();
        if !self.fields.is_empty() {
            out.push("Properties".to_string());
            for (key, value) in &self.fields {
                render_value(key, value, 1, &mut out);
            }
        }
        for (key, items) in &self.lists {
            out.push(key.clone());
            for item in items {
                out.push(format!("{}• {}", INDENT, item));
            }
        }
        out.join("\n")
    }
}

/// Split a property bag; a missing bag yields an empty sheet.
pub fn format_properties(bag: Option<&Map<String, Value>>) -> PropertySheet {
    let mut sheet = PropertySheet::default();
    let Some(bag) = bag else {
        return sheet;
    };
    for (key, raw) in bag {
        let value = PropertyValue::from(raw);
        if is_list_field(key) {
            let items = match value {
                PropertyValue::List(items) => items.iter().map(PropertyValue::inline).collect(),
                PropertyValue::Null => Vec::new(),
                other => vec![other.inline()],
            };
            sheet.lists.push((key.clone(), items));
        } else {
            sheet.fields.push((key.clone(), value));
        }
    }
    sheet
}

fn render_value(key: &str, value: &PropertyValue, depth: usize, out: &mut Vec<String>) {
    let pad = INDENT.repeat(depth);
    if value.is_inline() {
        out.push(format!("{}{}: {}", pad, key, value.inline()));
        return;
    }
    out.push(format!("{}{}:", pad, key));
    match value {
        PropertyValue::Map(entries) => {
            for (k, v) in entries {
                render_value(k, v, depth + 1, out);
            }
        }
        PropertyValue::List(items) => {
            let item_pad = INDENT.repeat(depth + 1);
            for item in items {
                match item {
                    PropertyValue::Map(entries) => {
                        out.push(format!("{}-", item_pad));
                        for (k, v) in entries {
                            render_value(k, v, depth + 2, out);
                        }
                    }
                    PropertyValue::List(_) => {
                        render_value("-", item, depth + 1, out);
                    }
                    scalar => out.push(format!("{}- {}", item_pad, scalar.inline())),
                }
            }
        }
        PropertyValue::Null | PropertyValue::Scalar(_) => {}
    }
}

/// Panel content for a clicked node
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDetails {
    pub name: String,
    pub entity_type: String,
    pub color: &'static str,
    pub sheet: PropertySheet,
}

impl EntityDetails {
    /// Prefer the full record's properties over the (possibly skeleton) node's.
    pub fn from_node(node: &RawNode, record: Option<&EntityRecord>) -> Self {
        let properties = record.map(|r| &r.properties).unwrap_or(&node.properties);
        Self {
            name: node.label.clone(),
            entity_type: node.node_type.clone(),
            color: node_color(&node.node_type),
            sheet: format_properties(Some(properties)),
        }
    }

    pub fn render(&self) -> String {
        let mut text = format!("{}\n[{}]", self.name, self.entity_type);
        if !self.sheet.is_empty() {
            text.push_str("\n\n");
            text.push_str(&self.sheet.render());
        }
        text
    }
}

/// Panel content for a clicked edge
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDetails {
    pub label: String,
    pub sheet: PropertySheet,
}

impl RelationshipDetails {
    pub fn from_edge(edge: &RawEdge) -> Self {
        Self {
            label: edge.edge_type.clone(),
            sheet: format_properties(Some(&edge.properties)),
        }
    }

    pub fn render(&self) -> String {
        let mut text = format!("Relationship: {}", self.label);
        if !self.sheet.is_empty() {
            text.push_str("\n\n");
            text.push_str(&self.sheet.render());
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_bag_is_empty() {
        let sheet = format_properties(None);
        assert!(sheet.is_empty());
        assert_eq!(sheet.render(), "");
    }

    #[test]
    fn test_list_fields_are_separated() {
        let props = bag(json!({
            "occupation": "Journalist",
            "aliases": ["The Reporter", "A."],
            "note": "Owes money"
        }));
        let sheet = format_properties(Some(&props));

        assert_eq!(
            sheet.fields,
            vec![("occupation".to_string(), PropertyValue::Scalar("Journalist".to_string()))]
        );
        assert_eq!(
            sheet.lists,
            vec![
                ("aliases".to_string(), vec!["The Reporter".to_string(), "A.".to_string()]),
                ("note".to_string(), vec!["Owes money".to_string()]),
            ]
        );
    }

    #[test]
    fn test_nested_objects_indent() {
        let props = bag(json!({
            "attributes": {"hp": 11, "skills": {"Spot Hidden": 60}},
            "age": 34
        }));
        let rendered = format_properties(Some(&props)).render();

        assert_eq!(
            rendered,
            "Properties\n  age: 34\n  attributes:\n    hp: 11\n    skills:\n      Spot Hidden: 60"
        );
    }

    #[test]
    fn test_arrays_of_scalars_join_and_objects_recurse() {
        let props = bag(json!({
            "participants": ["Arkady", "Mira"],
            "inventory": [{"name": "Lantern"}, "Rope"]
        }));
        let rendered = format_properties(Some(&props)).render();

        assert!(rendered.contains("  participants: Arkady, Mira"));
        assert!(rendered.contains("  inventory:\n    -\n      name: Lantern\n    - Rope"));
    }

    #[test]
    fn test_entity_details_prefer_full_record() {
        let node = RawNode {
            id: "e1".to_string(),
            label: "Arkady".to_string(),
            node_type: "Character".to_string(),
            properties: Map::new(),
            entity_id: None,
        };
        let record = EntityRecord {
            properties: bag(json!({"occupation": "Sailor"})),
            ..EntityRecord::default()
        };

        let skeleton = EntityDetails::from_node(&node, None);
        assert!(skeleton.sheet.is_empty());
        assert_eq!(skeleton.color, "#e74c3c");
        assert_eq!(skeleton.render(), "Arkady\n[Character]");

        let full = EntityDetails::from_node(&node, Some(&record));
        assert!(full.render().contains("occupation: Sailor"));
    }

    #[test]
    fn test_relationship_details() {
        let edge = RawEdge {
            id: "r1".to_string(),
            from_id: "e1".to_string(),
            to_id: "e2".to_string(),
            edge_type: "KNOWS".to_string(),
            properties: bag(json!({"since": "1923"})),
        };
        let details = RelationshipDetails::from_edge(&edge);
        assert_eq!(details.render(), "Relationship: KNOWS\n\nProperties\n  since: 1923");
    }
}
