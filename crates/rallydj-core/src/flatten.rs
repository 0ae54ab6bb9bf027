//! Nested-list flatteners: teams with competitor lists, and sector grounds with
//! section lists.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::records::Ground;
use crate::table::{Record, record};
use crate::{ShapeError, Table};

/// List column holding a team's competitors, after normalization.
pub const COMPETITORS_COLUMN: &str = "team.competitors";
/// Prefix of every team-level column, after normalization.
pub const TEAM_PREFIX: &str = "team.";
/// Team identifier carried into every output table.
pub const TEAM_KEY: &str = "bib";

/// Leading columns of the section table.
pub const SECTION_COLUMNS: [&str; 6] = ["code", "section", "start", "finish", "color", "type"];

/// Output of [`flatten_competitors`].
#[derive(Debug, Clone, Default)]
pub struct CompetitorTables {
    /// One row per distinct team: `bib` then the `team.*` fields without prefix.
    pub teams: Table,
    /// One row per competitor: `bib` then the competitor's own fields.
    pub competitors: Table,
    /// The input rows with every `team.*` column removed.
    pub results: Table,
}

/// Split a normalized table of team entries into teams, competitors and the rest.
///
/// The team identifier is `bib`, or `team.bib` when the entry has no `bib`.
/// A team with an empty or null competitor list contributes no competitor rows
/// but still gets its team row.
pub fn flatten_competitors(table: &Table) -> Result<CompetitorTables, ShapeError> {
    table.require_column(COMPETITORS_COLUMN)?;
    let key_column = [TEAM_KEY, "team.bib"]
        .into_iter()
        .find(|c| table.has_column(c))
        .ok_or_else(|| ShapeError::missing(TEAM_KEY))?;

    let mut competitors = table.explode_records(COMPETITORS_COLUMN, &[key_column])?;
    if key_column != TEAM_KEY {
        competitors.rename_column(key_column, TEAM_KEY)?;
    }
    competitors.sort_by(&[TEAM_KEY])?;

    let team_columns: Vec<(&str, &str)> = table
        .columns()
        .iter()
        .filter(|c| c.as_str() != COMPETITORS_COLUMN && c.as_str() != "team.bib")
        .filter_map(|c| Some((c.as_str(), c.strip_prefix(TEAM_PREFIX)?)))
        .collect();

    let mut teams = Table::with_columns(
        std::iter::once(TEAM_KEY).chain(team_columns.iter().map(|(_, short)| *short)),
    );
    let mut seen = HashSet::new();
    for row in table.rows() {
        let key = row.value(key_column);
        if !seen.insert(key.to_string()) {
            continue;
        }
        let mut rec = Record::new();
        rec.insert(TEAM_KEY.to_string(), key);
        for (full, short) in &team_columns {
            rec.insert(short.to_string(), row.value(full));
        }
        teams.push_record(rec);
    }
    teams.sort_by(&[TEAM_KEY])?;

    let result_columns: Vec<&str> = table
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| !c.starts_with(TEAM_PREFIX))
        .collect();
    let mut results = table.select(&result_columns)?;
    if key_column != TEAM_KEY {
        results.add_column(TEAM_KEY, |r| r.value(key_column));
    }

    Ok(CompetitorTables {
        teams,
        competitors,
        results,
    })
}

/// Output of [`flatten_grounds`].
#[derive(Debug, Clone, Default)]
pub struct GroundTables {
    /// One row per section: [`SECTION_COLUMNS`] then `text_<locale>` columns.
    pub sections: Table,
    /// One row per ground: `code, percentage, color, type`.
    pub percentages: Table,
    /// One row per distinct surface type: `type` then `text_<locale>` columns.
    pub surfaces: Table,
}

/// Flatten sector grounds into section, percentage and surface-type tables.
///
/// Input rows carry a sector `code` and one `grounds` object each. Rows are
/// walked in `code` order. The surface type is the lowercased English name; the
/// first ground seen for a type fixes that type's translations, and section
/// rows carry those translations rather than their own.
pub fn flatten_grounds(table: &Table) -> Result<GroundTables, ShapeError> {
    table.require_column("code")?;
    table.require_column("grounds")?;

    let mut ordered = table.clone();
    ordered.sort_by(&["code"])?;

    let mut percentages = Table::with_columns(["code", "percentage", "color", "type"]);
    let mut surfaces = Table::with_columns(["type"]);
    let mut sections = Table::with_columns(SECTION_COLUMNS);
    let mut taxonomy: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();

    for row in ordered.rows() {
        let code = row.value("code");
        let ground: Ground = match row.get("grounds") {
            Some(v @ Value::Object(_)) => serde_json::from_value(v.clone())
                .map_err(|e| ShapeError::malformed("grounds", e))?,
            other => {
                return Err(ShapeError::malformed(
                    "grounds",
                    format!("expected an object, found {}", other.unwrap_or(&Value::Null)),
                ));
            }
        };
        let context = format!("ground of sector {code}");
        let surface_type = ground.surface_type(&context)?;

        percentages.push_record(record([
            ("code", code.clone()),
            ("percentage", ground.percentage.clone()),
            ("color", ground.color.clone()),
            ("type", Value::String(surface_type.clone())),
        ]));

        let translations = taxonomy.entry(surface_type.clone()).or_insert_with(|| {
            let translations = ground.translations();
            let mut rec = record([("type", Value::String(surface_type.clone()))]);
            rec.extend(translations.clone());
            surfaces.push_record(rec);
            translations
        });

        for section in &ground.sections {
            let mut rec = record([
                ("code", code.clone()),
                ("section", section.section.clone()),
                ("start", section.start.clone()),
                ("finish", section.finish.clone()),
                ("color", ground.color.clone()),
                ("type", Value::String(surface_type.clone())),
            ]);
            rec.extend(translations.clone());
            sections.push_record(rec);
        }
    }

    let mut text_columns: Vec<&str> = sections
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| c.starts_with("text_"))
        .collect();
    text_columns.sort_unstable();
    let ordering: Vec<&str> = SECTION_COLUMNS.iter().copied().chain(text_columns).collect();
    let mut sections = sections.select(&ordering)?;
    sections.dedup_rows();
    sections.sort_by(&["code", "section"])?;

    Ok(GroundTables {
        sections,
        percentages,
        surfaces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries() -> Table {
        Table::from_document(&json!([
            {
                "stage": 3, "bib": "101", "reason": "Mechanical",
                "team": {"bib": "101", "model": "X", "competitors": [
                    {"name": "A. Driver", "role": "pilot"},
                    {"name": "B. Navigator", "role": "copilot"},
                ]},
            },
            {
                "stage": 1, "bib": "7", "reason": "Medical",
                "team": {"bib": "7", "model": "Y", "competitors": []},
            },
            {
                "stage": 2, "bib": "42", "reason": "Accident",
                "team": {"bib": "42", "model": "Z", "competitors": [
                    {"name": "C. Rider", "nationality": {"code": "FRA"}},
                ]},
            },
        ]))
        .unwrap()
        .normalized()
    }

    #[test]
    fn competitor_counts_are_conserved() {
        let out = flatten_competitors(&entries()).unwrap();
        assert_eq!(out.competitors.num_rows(), 3);
        assert_eq!(out.teams.num_rows(), 3);
        assert_eq!(out.results.num_rows(), 3);

        let per_team: Vec<Value> = out.competitors.rows().map(|r| r.value("bib")).collect();
        assert_eq!(per_team, [json!("101"), json!("101"), json!("42")]);
    }

    #[test]
    fn column_partition() {
        let out = flatten_competitors(&entries()).unwrap();
        assert_eq!(out.teams.columns(), ["bib", "model"]);
        assert_eq!(out.results.columns(), ["stage", "bib", "reason"]);
        assert_eq!(
            out.competitors.columns(),
            ["bib", "name", "role", "nationality.code"]
        );
    }

    #[test]
    fn teams_deduplicated_first_wins() {
        let t = Table::from_document(&json!([
            {"bib": "1", "team": {"model": "first", "competitors": [{"name": "a"}]}},
            {"bib": "1", "team": {"model": "second", "competitors": [{"name": "b"}]}},
        ]))
        .unwrap()
        .normalized();
        let out = flatten_competitors(&t).unwrap();
        assert_eq!(out.teams.num_rows(), 1);
        assert_eq!(out.teams.row(0).unwrap().value("model"), json!("first"));
        assert_eq!(out.competitors.num_rows(), 2);
    }

    #[test]
    fn team_bib_fallback() {
        let t = Table::from_document(&json!([
            {"position": 1, "team": {"bib": 5, "competitors": [{"name": "a"}]}},
        ]))
        .unwrap()
        .normalized();
        let out = flatten_competitors(&t).unwrap();
        assert_eq!(out.competitors.columns(), ["bib", "name"]);
        assert_eq!(out.teams.row(0).unwrap().value("bib"), json!(5));
        assert_eq!(out.results.columns(), ["position", "bib"]);
    }

    #[test]
    fn missing_competitors_column() {
        let t = Table::from_document(&json!([{"bib": "1"}])).unwrap();
        let err = flatten_competitors(&t).unwrap_err();
        assert!(matches!(err, ShapeError::MissingColumn { column } if column == COMPETITORS_COLUMN));
    }

    fn ground(en: &str, fr: &str, color: &str, sections: Value) -> Value {
        json!({
            "name": en,
            "color": color,
            "percentage": 50,
            "groundLangs": [
                {"locale": "en", "text": en},
                {"locale": "fr", "text": fr},
            ],
            "sections": sections,
        })
    }

    #[test]
    fn surface_types_first_seen_wins() {
        let t = Table::from_document(&json!([
            {"code": "02100", "grounds": ground("SAND", "Sable (bis)", "#ff0", json!([]))},
            {"code": "01100", "grounds": ground("Sand", "Sable", "#ff0", json!([]))},
            {"code": "01100", "grounds": ground("Rocks", "Pierres", "#888", json!([]))},
        ]))
        .unwrap();
        let out = flatten_grounds(&t).unwrap();
        assert_eq!(out.surfaces.num_rows(), 2);
        let sand = out.surfaces.row(0).unwrap();
        assert_eq!(sand.value("type"), json!("sand"));
        assert_eq!(sand.value("text_en"), json!("Sand"));
        assert_eq!(sand.value("text_fr"), json!("Sable"));
        assert_eq!(out.percentages.num_rows(), 3);
        assert_eq!(out.percentages.columns(), ["code", "percentage", "color", "type"]);
    }

    #[test]
    fn sections_sorted_and_deduplicated() {
        let t = Table::from_document(&json!([
            {"code": "01100", "grounds": ground("Sand", "Sable", "#ff0", json!([
                {"section": 3, "start": 20, "finish": 30},
                {"section": 1, "start": 0, "finish": 10},
            ]))},
            {"code": "01100", "grounds": ground("Sand", "Sable", "#ff0", json!([
                {"section": 1, "start": 0, "finish": 10},
            ]))},
            {"code": "01100", "grounds": ground("Dunes", "Dunes", "#f80", json!([
                {"section": 2, "start": 10, "finish": 20},
            ]))},
        ]))
        .unwrap();
        let out = flatten_grounds(&t).unwrap();
        assert_eq!(
            out.sections.columns(),
            ["code", "section", "start", "finish", "color", "type", "text_en", "text_fr"]
        );
        let order: Vec<Value> = out.sections.rows().map(|r| r.value("section")).collect();
        assert_eq!(order, [json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn missing_english_translation() {
        let t = Table::from_document(&json!([
            {"code": "01100", "grounds": {
                "groundLangs": [{"locale": "fr", "text": "Sable"}],
                "sections": [],
            }},
        ]))
        .unwrap();
        let err = flatten_grounds(&t).unwrap_err();
        assert!(matches!(err, ShapeError::MissingTranslation { .. }));
    }

    #[test]
    fn null_ground_is_malformed() {
        let t = Table::from_document(&json!([{"code": "01100", "grounds": null}])).unwrap();
        assert!(matches!(
            flatten_grounds(&t).unwrap_err(),
            ShapeError::MalformedRecord { .. }
        ));
    }
}
