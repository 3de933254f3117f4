//! Ingredient Models
//!
//! Data structures matching the remote API's JSON shapes (camelCase keys).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Measurement unit vocabulary accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Kg,
    Mg,
    Oz,
    Lb,
    Ml,
    L,
    Tsp,
    Tbsp,
    Cup,
    Piece,
    Pinch,
}

impl Unit {
    pub const ALL: [Unit; 12] = [
        Unit::G,
        Unit::Kg,
        Unit::Mg,
        Unit::Oz,
        Unit::Lb,
        Unit::Ml,
        Unit::L,
        Unit::Tsp,
        Unit::Tbsp,
        Unit::Cup,
        Unit::Piece,
        Unit::Pinch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::G => "g",
            Unit::Kg => "kg",
            Unit::Mg => "mg",
            Unit::Oz => "oz",
            Unit::Lb => "lb",
            Unit::Ml => "ml",
            Unit::L => "l",
            Unit::Tsp => "tsp",
            Unit::Tbsp => "tbsp",
            Unit::Cup => "cup",
            Unit::Piece => "piece",
            Unit::Pinch => "pinch",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Unit::ALL
            .iter()
            .copied()
            .find(|unit| unit.as_str() == needle)
            .ok_or_else(|| format!("unknown unit '{}'", s))
    }
}

/// One line item in a recipe's ingredient list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    /// Server-assigned id, or a UUID generated locally when created offline
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Dietary tags; read-only to the user
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub allergens: BTreeSet<String>,
    /// Display position
    #[serde(default)]
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    /// Apply every field present in `patch`. Timestamps are left to the caller.
    pub fn apply(&mut self, patch: &IngredientPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
    }

    /// Case-insensitive match on name, notes and tags. A blank query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self
                .notes
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&query))
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

/// Create payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIngredient {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewIngredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: Unit) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update; absent fields stay untouched.
///
/// `notes: Some(None)` clears the notes and is sent as an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_explicit_null"
    )]
    pub notes: Option<Option<String>>,
}

impl IngredientPatch {
    pub fn quantity(quantity: f64) -> Self {
        Self {
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.quantity.is_none() && self.unit.is_none() && self.notes.is_none()
    }
}

/// Keeps `"notes": null` distinct from a missing key.
fn deserialize_explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Result of the analyze endpoint or of local keyword inference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAnalysis {
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub allergens: BTreeSet<String>,
}

/// One element of the reorder payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: String,
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ingredient {
        let now = Utc::now();
        Ingredient {
            id: "abc".to_string(),
            name: "Butter".to_string(),
            quantity: 100.0,
            unit: Unit::G,
            notes: Some("unsalted".to_string()),
            tags: BTreeSet::new(),
            allergens: BTreeSet::from(["dairy".to_string()]),
            order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_unit_from_str() {
        assert_eq!("tbsp".parse::<Unit>().unwrap(), Unit::Tbsp);
        assert_eq!(" KG ".parse::<Unit>().unwrap(), Unit::Kg);
        assert!("bucket".parse::<Unit>().is_err());
    }

    #[test]
    fn test_ingredient_wire_format_is_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["unit"], "g");
        assert_eq!(json["allergens"], serde_json::json!(["dairy"]));
    }

    #[test]
    fn test_ingredient_defaults_missing_sets() {
        let json = r#"{
            "id": "1", "name": "Salt", "quantity": 1.5, "unit": "tsp",
            "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        let parsed: Ingredient = serde_json::from_str(json).unwrap();
        assert!(parsed.tags.is_empty());
        assert!(parsed.allergens.is_empty());
        assert_eq!(parsed.order, 0);
        assert_eq!(parsed.notes, None);
    }

    #[test]
    fn test_unknown_unit_rejected_at_boundary() {
        let json = r#"{
            "id": "1", "name": "Salt", "quantity": 1, "unit": "bucket",
            "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Ingredient>(json).is_err());
    }

    #[test]
    fn test_apply_patch_touches_only_present_fields() {
        let mut item = sample();
        item.apply(&IngredientPatch::quantity(5.0));
        assert_eq!(item.quantity, 5.0);
        assert_eq!(item.name, "Butter");
        assert_eq!(item.notes.as_deref(), Some("unsalted"));
    }

    #[test]
    fn test_matches_query() {
        let item = sample();
        assert!(item.matches("butt"));
        assert!(item.matches("UNSALTED"));
        assert!(item.matches("  "));
        assert!(!item.matches("dairy"));
    }

    #[test]
    fn test_patch_can_clear_notes() {
        let mut item = sample();
        let patch = IngredientPatch {
            notes: Some(None),
            ..Default::default()
        };
        item.apply(&patch);
        assert_eq!(item.notes, None);
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"notes":null}"#);
    }

    #[test]
    fn test_patch_distinguishes_null_from_missing() {
        let cleared: IngredientPatch = serde_json::from_str(r#"{"notes":null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));
        let untouched: IngredientPatch = serde_json::from_str(r#"{"quantity":2}"#).unwrap();
        assert_eq!(untouched.notes, None);
        assert!(!untouched.is_empty());
    }
}
