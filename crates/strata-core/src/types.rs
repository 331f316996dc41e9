//! Core domain types shared by the graph and migration crates.
//!
//! An entity kind is described by an explicit [`EntitySchema`] rather than by
//! inspecting Rust types at runtime: the schema names the node label, the
//! natural-key property and the ordered list of declared properties.

use serde::{Deserialize, Serialize};

// ── Schema ────────────────────────────────────────────────────────

/// Scalar kinds a declared property may hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    StringList,
}

impl FieldKind {
    /// Whether a JSON value is acceptable for this kind. `null` always is.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match (self, value) {
            (_, Value::Null) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Float, Value::Number(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::StringList, Value::Array(items)) => items.iter().all(Value::is_string),
            _ => false,
        }
    }
}

/// One declared property of an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Describes how an entity kind maps onto labelled graph nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitySchema {
    /// Node label, one per entity kind.
    pub label: String,
    /// Natural-key property. Uniqueness is enforced by a store constraint.
    pub key: String,
    /// Declared properties, in declaration order. Includes the key.
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    pub fn new(label: impl Into<String>, key: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            fields,
        }
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared field names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

// ── Category ──────────────────────────────────────────────────────

/// A product category. Categories form a hierarchy through
/// `(child)-[:SUBCATEGORY_OF]->(parent)` edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
}

impl Category {
    pub const LABEL: &'static str = "Category";
    pub const PARENT_EDGE: &'static str = "SUBCATEGORY_OF";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn schema() -> EntitySchema {
        EntitySchema::new(
            Self::LABEL,
            "name",
            vec![FieldDef::new("name", FieldKind::String)],
        )
    }

    /// Human-readable name: language prefixes stripped, dashes to spaces,
    /// first letter upper-cased and the rest lower-cased.
    ///
    /// `"en:dairy-products"` → `"Dairy products"`.
    pub fn friendly_name(&self) -> String {
        let cleaned = self
            .name
            .replace('-', " ")
            .replace("en:", "")
            .replace("pt:", "");
        let mut chars = cleaned.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        }
    }
}

/// Filter projection of [`Category`]: unset fields do not constrain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Partial update of [`Category`]: only set fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_name_strips_prefix_and_dashes() {
        assert_eq!(
            Category::new("en:dairy-products").friendly_name(),
            "Dairy products"
        );
        assert_eq!(Category::new("pt:carnes").friendly_name(), "Carnes");
        assert_eq!(Category::new("MEAT").friendly_name(), "Meat");
        assert_eq!(Category::new("").friendly_name(), "");
    }

    #[test]
    fn category_schema_declares_name_key() {
        let schema = Category::schema();
        assert_eq!(schema.label, "Category");
        assert_eq!(schema.key, "name");
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(schema.field("name").unwrap().kind, FieldKind::String);
        assert!(schema.field("id").is_none());
    }

    #[test]
    fn empty_filter_serializes_to_empty_map() {
        let json = serde_json::to_value(CategoryFilter::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn field_kind_accepts_matching_values() {
        use serde_json::json;
        assert!(FieldKind::String.accepts(&json!("dairy")));
        assert!(FieldKind::String.accepts(&json!(null)));
        assert!(!FieldKind::String.accepts(&json!(3)));
        assert!(FieldKind::Integer.accepts(&json!(3)));
        assert!(!FieldKind::Integer.accepts(&json!(3.5)));
        assert!(FieldKind::Float.accepts(&json!(3)));
        assert!(FieldKind::StringList.accepts(&json!(["a", "b"])));
        assert!(!FieldKind::StringList.accepts(&json!(["a", 1])));
    }
}
