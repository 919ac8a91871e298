//! Group catalog: named sets of polygon files resolved together.
//!
//! The catalog file (`grupos.json`) is either a bare array of groups or an
//! object with a `groups` array. Each group lists the files whose features
//! compete for the single per-group winner.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{GeonemoError, Result};

/// Tie-break strategy used when several features qualify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PickStrategy {
    /// The first feature in file order, then feature order, wins
    #[default]
    First,
}

/// One entry of the group catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    #[serde(default)]
    pub id: String,

    /// Display name; falls back to the id
    #[serde(default)]
    pub label: Option<String>,

    /// Only a literal `false` disables a group
    #[serde(default = "enabled_by_default", deserialize_with = "deserialize_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub pick: Option<String>,

    /// Ordered file references; anything that is not a list reads as empty
    #[serde(default, deserialize_with = "deserialize_files")]
    pub files: Vec<String>,
}

fn enabled_by_default() -> bool {
    true
}

fn deserialize_enabled<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(!matches!(value, Value::Bool(false)))
}

fn deserialize_files<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let files = match value {
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(files)
}

impl GroupDefinition {
    /// Create an enabled group with the default pick strategy
    pub fn new(id: impl Into<String>, files: Vec<String>) -> Self {
        Self { id: id.into(), label: None, enabled: true, pick: None, files }
    }

    /// Set the display name
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the raw pick strategy name
    pub fn with_pick(mut self, pick: impl Into<String>) -> Self {
        self.pick = Some(pick.into());
        self
    }

    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => &self.id,
        }
    }

    /// Parse the pick strategy; missing or blank means `first`
    pub fn pick_strategy(&self) -> Result<PickStrategy> {
        let raw = self.pick.as_deref().map(|p| p.trim().to_lowercase()).unwrap_or_default();
        match raw.as_str() {
            "" | "first" => Ok(PickStrategy::First),
            other => Err(GeonemoError::InvalidGroup {
                group_id: self.id.clone(),
                reason: format!("unsupported pick strategy '{}'", other),
            }),
        }
    }

    /// Check that the group can be resolved
    pub fn validate(&self) -> Result<PickStrategy> {
        if self.id.trim().is_empty() {
            return Err(GeonemoError::InvalidGroup {
                group_id: self.id.clone(),
                reason: "group id is empty".to_string(),
            });
        }
        self.pick_strategy()
    }
}

/// The full set of groups, in catalog order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupCatalog {
    pub groups: Vec<GroupDefinition>,
}

impl GroupCatalog {
    pub fn new(groups: Vec<GroupDefinition>) -> Self {
        Self { groups }
    }

    /// Parse a catalog from an already decoded JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let groups = match value {
            Value::Array(_) => value,
            Value::Object(mut map) => match map.remove("groups") {
                Some(groups @ Value::Array(_)) => groups,
                _ => {
                    return Err(GeonemoError::CatalogInvalid {
                        reason: "expected a list of groups or an object with a 'groups' list"
                            .to_string(),
                    })
                }
            },
            other => {
                return Err(GeonemoError::CatalogInvalid {
                    reason: format!("expected a list or object, found {}", json_type_name(&other)),
                })
            }
        };

        let groups: Vec<GroupDefinition> = serde_json::from_value(groups)
            .map_err(|e| GeonemoError::CatalogInvalid { reason: e.to_string() })?;

        Ok(Self { groups })
    }

    /// Parse a catalog from JSON text, tolerating a UTF-8 byte order mark
    pub fn from_json_str(content: &str) -> Result<Self> {
        let content = content.trim_start_matches('\u{feff}');
        let value: Value = serde_json::from_str(content)
            .map_err(|e| GeonemoError::CatalogInvalid { reason: e.to_string() })?;
        Self::from_value(value)
    }

    /// Read a catalog file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GeonemoError::CatalogNotFound { path: path.to_path_buf() });
        }
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Groups with `enabled` set, in catalog order
    pub fn enabled(&self) -> impl Iterator<Item = &GroupDefinition> {
        self.groups.iter().filter(|g| g.enabled)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_from_array() {
        let catalog = GroupCatalog::from_json_str(
            r#"[{"id": "snaspe", "label": "SNASPE", "files": ["capas/snaspe.geojson"]}]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        let group = &catalog.groups[0];
        assert_eq!(group.display_name(), "SNASPE");
        assert!(group.enabled);
        assert_eq!(group.pick_strategy().unwrap(), PickStrategy::First);
        assert_eq!(group.files, vec!["capas/snaspe.geojson"]);
    }

    #[test]
    fn test_catalog_from_object_with_bom() {
        let catalog = GroupCatalog::from_json_str(
            "\u{feff}{\"groups\": [{\"id\": \"ramsar\", \"enabled\": false, \"files\": []}]}",
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(!catalog.groups[0].enabled);
        assert_eq!(catalog.enabled().count(), 0);
    }

    #[test]
    fn test_catalog_rejects_other_shapes() {
        assert!(GroupCatalog::from_json_str(r#"{"layers": []}"#).is_err());
        assert!(GroupCatalog::from_json_str(r#""groups""#).is_err());
        assert!(GroupCatalog::from_json_str("not json").is_err());
    }

    #[test]
    fn test_lenient_group_fields() {
        let catalog = GroupCatalog::from_json_str(
            r#"[
                {"id": "a", "enabled": "no", "files": "capas/a.geojson"},
                {"id": "b", "pick": "  FIRST ", "files": [" capas/b.geojson ", null]}
            ]"#,
        )
        .unwrap();

        let a = &catalog.groups[0];
        assert!(a.enabled, "only a literal false disables a group");
        assert!(a.files.is_empty(), "non-list files read as empty");
        assert_eq!(a.display_name(), "a");

        let b = &catalog.groups[1];
        assert_eq!(b.pick_strategy().unwrap(), PickStrategy::First);
        assert_eq!(b.files, vec!["capas/b.geojson"]);
    }

    #[test]
    fn test_group_validation() {
        assert!(GroupDefinition::new("", vec![]).validate().is_err());
        assert!(GroupDefinition::new("x", vec![]).with_pick("largest").validate().is_err());
        assert!(GroupDefinition::new("x", vec![]).validate().is_ok());
    }
}
