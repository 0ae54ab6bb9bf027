//! Wire shapes for the label and ground records embedded in feed documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ShapeError;

/// One translated label: `text` for `variable` in `locale`.
///
/// Every field is optional on the wire; an entry with all three missing is
/// treated as padding and skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub locale: Option<String>,
    pub variable: Option<String>,
    pub text: Option<String>,
}

impl LabelEntry {
    pub fn is_empty(&self) -> bool {
        self.locale.is_none() && self.variable.is_none() && self.text.is_none()
    }
}

/// Parse a label-list cell. Null cells and null items yield nothing.
pub fn parse_label_entries(cell: &Value, column: &str) -> Result<Vec<LabelEntry>, ShapeError> {
    let items = match cell {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(ShapeError::malformed(
                column,
                format!("expected a label list, found {other}"),
            ));
        }
    };
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Null => {}
            Value::Object(_) => {
                let entry: LabelEntry = serde_json::from_value(item.clone())
                    .map_err(|e| ShapeError::malformed(column, e))?;
                if !entry.is_empty() {
                    entries.push(entry);
                }
            }
            other => {
                return Err(ShapeError::malformed(
                    column,
                    format!("expected a label object, found {other}"),
                ));
            }
        }
    }
    Ok(entries)
}

/// The surface a stretch of a sector runs over, with its translated name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ground {
    #[serde(default)]
    pub ground_langs: Vec<LabelEntry>,
    #[serde(default)]
    pub percentage: Value,
    #[serde(default)]
    pub color: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub sections: Vec<GroundSection>,
}

/// A numbered distance range within a sector.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundSection {
    #[serde(default)]
    pub section: Value,
    #[serde(default)]
    pub start: Value,
    #[serde(default)]
    pub finish: Value,
}

impl Ground {
    /// `text_<locale>` → text for every translated name. A repeated locale keeps
    /// the last text.
    pub fn translations(&self) -> BTreeMap<String, Value> {
        self.ground_langs
            .iter()
            .filter_map(|l| {
                let locale = l.locale.as_ref()?;
                let text = l.text.clone().map(Value::String).unwrap_or(Value::Null);
                Some((format!("text_{locale}"), text))
            })
            .collect()
    }

    /// Canonical surface key: the English name, lowercased.
    pub fn surface_type(&self, context: &str) -> Result<String, ShapeError> {
        self.ground_langs
            .iter()
            .rev()
            .find(|l| l.locale.as_deref() == Some("en"))
            .and_then(|l| l.text.as_deref())
            .map(str::to_lowercase)
            .ok_or_else(|| ShapeError::MissingTranslation {
                locale: "en".into(),
                context: context.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_entries_skip_padding() {
        let cell = json!([
            {"locale": "en", "variable": "A", "text": "Auto"},
            null,
            {},
            {"locale": null, "variable": null, "text": null},
        ]);
        let entries = parse_label_entries(&cell, "categoryLangs").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text.as_deref(), Some("Auto"));
    }

    #[test]
    fn label_entries_null_cell() {
        assert!(parse_label_entries(&Value::Null, "x").unwrap().is_empty());
    }

    #[test]
    fn label_entries_reject_scalars() {
        assert!(parse_label_entries(&json!("en"), "x").is_err());
        assert!(parse_label_entries(&json!([1]), "x").is_err());
    }

    #[test]
    fn ground_parses_camel_case() {
        let ground: Ground = serde_json::from_value(json!({
            "groundLangs": [{"locale": "en", "text": "Sand"}, {"locale": "fr", "text": "Sable"}],
            "percentage": 40,
            "color": "#ffcc00",
            "sections": [{"section": 1, "start": 0, "finish": 12.5}],
        }))
        .unwrap();
        assert_eq!(ground.surface_type("01100").unwrap(), "sand");
        let t = ground.translations();
        assert_eq!(t["text_fr"], json!("Sable"));
        assert_eq!(ground.sections.len(), 1);
        assert_eq!(ground.name, Value::Null);
    }

    #[test]
    fn ground_without_english_name() {
        let ground: Ground = serde_json::from_value(json!({
            "groundLangs": [{"locale": "fr", "text": "Sable"}],
        }))
        .unwrap();
        let err = ground.surface_type("01100").unwrap_err();
        assert!(matches!(err, ShapeError::MissingTranslation { locale, .. } if locale == "en"));
    }
}
