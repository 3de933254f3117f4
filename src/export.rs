//! Local Export
//!
//! Renders the in-memory list when the remote export endpoint is unreachable.

use crate::models::{ExportFormat, Ingredient};

const CSV_HEADER: &str = "id,name,quantity,unit,notes,tags,allergens,order";

pub fn render(items: &[Ingredient], format: ExportFormat) -> String {
    match format {
        ExportFormat::Csv => render_csv(items),
        ExportFormat::Json => render_json(items),
    }
}

/// Pretty-printed array of records.
///
/// `Ingredient` has no fallible fields; non-finite floats become `null`.
pub fn render_json(items: &[Ingredient]) -> String {
    serde_json::to_string_pretty(items).unwrap_or_else(|e| {
        log::error!("Failed to serialize ingredients: {}", e);
        "[]".to_string()
    })
}

/// One row per ingredient; set-valued columns are joined with `;`.
pub fn render_csv(items: &[Ingredient]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for item in items {
        let tags = item.tags.iter().cloned().collect::<Vec<_>>().join(";");
        let allergens = item.allergens.iter().cloned().collect::<Vec<_>>().join(";");
        let fields = [
            escape(&item.id),
            escape(&item.name),
            item.quantity.to_string(),
            item.unit.as_str().to_string(),
            escape(item.notes.as_deref().unwrap_or("")),
            escape(&tags),
            escape(&allergens),
            item.order.to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn item(id: &str, name: &str, notes: Option<&str>) -> Ingredient {
        let now = Utc::now();
        Ingredient {
            id: id.to_string(),
            name: name.to_string(),
            quantity: 2.5,
            unit: Unit::Cup,
            notes: notes.map(str::to_string),
            tags: BTreeSet::from(["gluten-free".to_string(), "vegan".to_string()]),
            allergens: BTreeSet::new(),
            order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_csv_rows() {
        let csv = render_csv(&[item("1", "Oat milk", None)]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "1,Oat milk,2.5,cup,,gluten-free;vegan,,0");
    }

    #[test]
    fn test_csv_quotes_special_characters() {
        let csv = render_csv(&[item("2", "Salt, coarse", Some("say \"pinch\""))]);
        assert!(csv.contains("\"Salt, coarse\""));
        assert!(csv.contains("\"say \"\"pinch\"\"\""));
    }

    #[test]
    fn test_json_export_is_array() {
        let json = render(&[item("1", "Rice", None)], ExportFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_json_export_of_non_finite_quantity() {
        let mut odd = item("1", "Rice", None);
        odd.quantity = f64::NAN;
        let parsed: serde_json::Value = serde_json::from_str(&render_json(&[odd])).unwrap();
        assert!(parsed[0]["quantity"].is_null());
    }
}
