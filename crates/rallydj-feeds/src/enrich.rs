//! Joins across feed outputs.

use rallydj_core::{ShapeError, Table};
use serde_json::{Value, json};

use crate::client::CATEGORY_COLUMN;

/// Stage code given to prologue sectors so they sort before stage one.
pub const PROLOGUE_STAGE_CODE: &str = "00000";

/// Class and group metadata for each team.
///
/// `teams` needs `bib, clazz`; `clazz` needs `_id, reference, categoryClazz, en`;
/// `groups` needs `reference, tinyLabel, label, color, en`. Teams whose class or
/// group is unknown are left out. The output is `bib`, `reference`,
/// `categoryClazz`, `clazz_label`, then `tinyLabel, label, color, group_label`.
pub fn derive_clazz_metadata(
    teams: &Table,
    clazz: &Table,
    groups: &Table,
) -> Result<Table, ShapeError> {
    let teams = teams.select(&with_category(teams, clazz, vec!["bib", "clazz"]))?;
    let clazz = clazz.select(&with_category(
        &teams,
        clazz,
        vec!["_id", "reference", "categoryClazz", "en"],
    ))?;
    let mut on = vec![("clazz", "_id")];
    if teams.has_column(CATEGORY_COLUMN) {
        on.push((CATEGORY_COLUMN, CATEGORY_COLUMN));
    }
    let mut meta = teams.inner_join(&clazz, &on)?;
    meta.drop_columns(&["clazz", "_id"]);
    meta.rename_column("en", "clazz_label")?;

    let mut groups = groups.select(&["reference", "tinyLabel", "label", "color", "en"])?;
    groups.rename_column("reference", "categoryClazz")?;
    let mut meta = meta.inner_join(&groups, &[("categoryClazz", "categoryClazz")])?;
    meta.rename_column("en", "group_label")?;
    Ok(meta)
}

/// Distance covered by each surface of each sector: `length * percentage / 100`.
///
/// Joins `sectors` (`code, length`) with `stage_surfaces` on `code`, and on
/// `category` when both tables carry it.
pub fn surface_distances(sectors: &Table, stage_surfaces: &Table) -> Result<Table, ShapeError> {
    let lengths = sectors.select(&with_category(sectors, stage_surfaces, vec!["code", "length"]))?;
    let mut on = vec![("code", "code")];
    if lengths.has_column(CATEGORY_COLUMN) {
        on.push((CATEGORY_COLUMN, CATEGORY_COLUMN));
    }
    let mut out = lengths.inner_join(stage_surfaces, &on)?;
    out.require_column("percentage")?;
    out.add_column("distance", |r| {
        let length = r.get("length").and_then(Value::as_f64);
        let percentage = r.get("percentage").and_then(Value::as_f64);
        match (length, percentage) {
            (Some(l), Some(p)) => json!(l * p / 100.0),
            _ => Value::Null,
        }
    });
    Ok(out)
}

/// Give prologue sectors (code starting `0P`) the stage code `00000`.
pub fn normalize_prologue_codes(sectors: &mut Table) -> Result<(), ShapeError> {
    sectors.require_column("code")?;
    sectors.require_column("stage_code")?;
    sectors.add_column("stage_code", |r| {
        if r.get_str("code").is_some_and(|c| c.starts_with("0P")) {
            json!(PROLOGUE_STAGE_CODE)
        } else {
            r.value("stage_code")
        }
    });
    Ok(())
}

/// `columns` plus `category` when both tables carry it.
fn with_category<'a>(left: &Table, right: &Table, mut columns: Vec<&'a str>) -> Vec<&'a str> {
    if left.has_column(CATEGORY_COLUMN) && right.has_column(CATEGORY_COLUMN) {
        columns.push(CATEGORY_COLUMN);
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(doc: Value) -> Table {
        Table::from_document(&doc).unwrap()
    }

    #[test]
    fn clazz_metadata_for_teams() {
        let teams = table(json!([
            {"bib": "101", "clazz": "c1", "category": "A"},
            {"bib": "102", "clazz": "c9", "category": "A"},
            {"bib": "7", "clazz": "c2", "category": "M"},
        ]));
        let clazz = table(json!([
            {"_id": "c1", "reference": "T1", "categoryClazz": "G1", "en": "Prototype", "category": "A"},
            {"_id": "c2", "reference": "M1", "categoryClazz": "G2", "en": "Rally GP", "category": "M"},
        ]));
        let groups = table(json!([
            {"reference": "G1", "tinyLabel": "U", "label": "Ultimate", "color": "#f00", "en": "Ultimate"},
            {"reference": "G2", "tinyLabel": "RGP", "label": "RallyGP", "color": "#00f", "en": "RallyGP"},
        ]));
        let meta = derive_clazz_metadata(&teams, &clazz, &groups).unwrap();
        assert_eq!(
            meta.columns(),
            [
                "bib",
                "category",
                "reference",
                "categoryClazz",
                "clazz_label",
                "tinyLabel",
                "label",
                "color",
                "group_label"
            ]
        );
        assert_eq!(meta.num_rows(), 2);
        let first = meta.row(0).unwrap();
        assert_eq!(first.value("clazz_label"), json!("Prototype"));
        assert_eq!(first.value("group_label"), json!("Ultimate"));
        assert_eq!(meta.row(1).unwrap().value("bib"), json!("7"));
    }

    #[test]
    fn distances_per_surface() {
        let sectors = table(json!([
            {"code": "01100", "length": 200, "category": "A"},
            {"code": "01100", "length": 150, "category": "M"},
        ]));
        let surfaces = table(json!([
            {"code": "01100", "percentage": 25, "type": "sand", "category": "A"},
            {"code": "01100", "percentage": 75, "type": "dunes", "category": "A"},
            {"code": "01100", "percentage": 100, "type": "track", "category": "M"},
        ]));
        let out = surface_distances(&sectors, &surfaces).unwrap();
        let distances: Vec<Value> = out.rows().map(|r| r.value("distance")).collect();
        assert_eq!(distances, [json!(50.0), json!(150.0), json!(150.0)]);
    }

    #[test]
    fn prologue_sorts_first() {
        let mut sectors = table(json!([
            {"code": "0P100", "stage_code": "0P000"},
            {"code": "01100", "stage_code": "01000"},
        ]));
        normalize_prologue_codes(&mut sectors).unwrap();
        sectors.sort_by(&["stage_code"]).unwrap();
        assert_eq!(sectors.row(0).unwrap().value("stage_code"), json!("00000"));
        assert_eq!(sectors.row(1).unwrap().value("code"), json!("01100"));
    }
}
