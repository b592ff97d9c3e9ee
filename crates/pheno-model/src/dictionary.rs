#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Description of one output column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescription {
    pub original_field_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<BTreeMap<String, String>>,
}

/// Column descriptions keyed by output column, serialised in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDictionary {
    entries: Vec<(String, ColumnDescription)>,
}

impl MetadataDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the description for `column`.
    pub fn insert(&mut self, column: impl Into<String>, description: ColumnDescription) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = description,
            None => self.entries.push((column, description)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDescription> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, description)| description)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetadataDictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, description) in &self.entries {
            map.serialize_entry(column, description)?;
        }
        map.end()
    }
}

/// Default human-readable description of a canonical column.
pub fn default_description(column: &str) -> String {
    match column {
        "participant_id" => "Unique identifier for each participant".to_string(),
        "session" => "Session label of the phenotype record".to_string(),
        "age" => "Age of the participant in years".to_string(),
        "sex" => "Sex of the participant".to_string(),
        "site" => "Site of imaging data collection".to_string(),
        "diagnosis" => "Diagnosis of the participant".to_string(),
        "handedness" => "Dominant hand of the participant".to_string(),
        "education" => "Total years of schooling".to_string(),
        "scanner" => "Scanner used for imaging data collection".to_string(),
        other => format!("Derived column {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_insertion_order() {
        let mut dictionary = MetadataDictionary::new();
        dictionary.insert(
            "site",
            ColumnDescription {
                original_field_name: "centre".into(),
                description: default_description("site"),
                levels: None,
            },
        );
        dictionary.insert(
            "age",
            ColumnDescription {
                original_field_name: "age".into(),
                description: default_description("age"),
                levels: Some(BTreeMap::new()),
            },
        );
        let json = serde_json::to_string(&dictionary).expect("serialize dictionary");
        assert_eq!(
            json,
            r#"{"site":{"original_field_name":"centre","description":"Site of imaging data collection"},"age":{"original_field_name":"age","description":"Age of the participant in years","levels":{}}}"#
        );
    }
}
