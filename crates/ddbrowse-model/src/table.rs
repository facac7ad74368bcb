//! Table key metadata used by the planner.

use serde::{Deserialize, Serialize};

/// A partition key and optional sort key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAttribute {
    /// The partition (HASH) key attribute name.
    pub partition_key: String,
    /// The optional sort (RANGE) key attribute name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
}

impl KeyAttribute {
    /// Creates a key with only a partition key.
    #[must_use]
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// Adds a sort key.
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    /// Returns `true` if `name` is either key attribute.
    #[must_use]
    pub fn is_key(&self, name: &str) -> bool {
        self.partition_key == name || self.sort_key.as_deref() == Some(name)
    }
}

/// A global secondary index and its key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableGsi {
    /// The index name.
    pub name: String,
    /// The index key attributes.
    pub keys: KeyAttribute,
}

/// Table description as seen by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// The table name.
    pub name: String,
    /// The primary key attributes.
    pub keys: KeyAttribute,
    /// Attributes declared in the table definition.
    #[serde(default)]
    pub defined_attributes: Vec<String>,
    /// Global secondary indexes.
    #[serde(default)]
    pub gsis: Vec<TableGsi>,
}

impl TableInfo {
    /// Creates a table description without secondary indexes.
    #[must_use]
    pub fn new(name: impl Into<String>, keys: KeyAttribute) -> Self {
        let mut defined_attributes = vec![keys.partition_key.clone()];
        defined_attributes.extend(keys.sort_key.clone());
        Self {
            name: name.into(),
            keys,
            defined_attributes,
            gsis: Vec::new(),
        }
    }

    /// Adds a global secondary index.
    #[must_use]
    pub fn with_gsi(mut self, name: impl Into<String>, keys: KeyAttribute) -> Self {
        for attr in std::iter::once(&keys.partition_key).chain(keys.sort_key.as_ref()) {
            if !self.defined_attributes.contains(attr) {
                self.defined_attributes.push(attr.clone());
            }
        }
        self.gsis.push(TableGsi {
            name: name.into(),
            keys,
        });
        self
    }

    /// Looks up a global secondary index by name.
    #[must_use]
    pub fn gsi(&self, name: &str) -> Option<&TableGsi> {
        self.gsis.iter().find(|gsi| gsi.name == name)
    }

    /// Returns `true` if `name` is a key of the table or of any index.
    #[must_use]
    pub fn is_key_attribute(&self, name: &str) -> bool {
        self.keys.is_key(name) || self.gsis.iter().any(|gsi| gsi.keys.is_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_recognise_keys_of_indexes() {
        let info = TableInfo::new("test", KeyAttribute::new("pk").with_sort_key("sk"))
            .with_gsi("with-color", KeyAttribute::new("color").with_sort_key("shade"));

        assert!(info.is_key_attribute("pk"));
        assert!(info.is_key_attribute("shade"));
        assert!(!info.is_key_attribute("other"));
        assert_eq!(info.defined_attributes, vec!["pk", "sk", "color", "shade"]);
        assert!(info.gsi("with-color").is_some());
        assert!(info.gsi("missing").is_none());
    }

    #[test]
    fn test_should_deserialize_table_description() {
        let json = r#"{
            "name": "orders",
            "keys": {"partitionKey": "pk"},
            "gsis": [{"name": "by-user", "keys": {"partitionKey": "user", "sortKey": "ts"}}]
        }"#;
        let info: TableInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.keys.sort_key, None);
        assert_eq!(info.gsis[0].keys.sort_key.as_deref(), Some("ts"));
        assert!(info.defined_attributes.is_empty());
    }
}
