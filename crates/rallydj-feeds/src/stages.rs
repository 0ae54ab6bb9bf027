//! Stage schedule, sectors and surface breakdown.

use std::collections::{BTreeSet, HashMap};

use rallydj_core::flatten::SECTION_COLUMNS;
use rallydj_core::{
    GroundTables, Record, ShapeError, Table, flatten_grounds, label_columns, merge_labels,
};
use rallydj_fetch::Transport;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::{CATEGORY_COLUMN, sort_with_category, tag_category};
use crate::{Feed, FeedError, FeedParams, RallyClient};

/// Stage table columns, followed by the merged locale columns.
pub const STAGE_COLUMNS: [&str; 16] = [
    "stage_code",
    "stage",
    "date",
    "startDate",
    "endDate",
    "isCancelled",
    "generalDisplay",
    "isDelayed",
    "marathon",
    "length",
    "type",
    "timezone",
    "stageWithBonus",
    "mapCategoryDisplay",
    "podiumDisplay",
    "_bind",
];

pub const SECTOR_COLUMNS: [&str; 9] = [
    "stage_code",
    "code",
    "id",
    "sector_number",
    "powerStage",
    "length",
    "startTime",
    "type",
    "arrivalTime",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTables {
    /// One row per stage, by `startDate`.
    pub stages: Table,
    /// One row per sector, by `code`.
    pub sectors: Table,
    /// Share of each surface per competitive sector.
    pub stage_surfaces: Table,
    /// One row per surface section of a competitive sector.
    pub section_surfaces: Table,
    /// Surface taxonomy: one row per surface `type`.
    pub surfaces: Table,
}

impl<T: Transport> RallyClient<T> {
    /// Stages of every requested category.
    pub async fn stages(&self, params: &FeedParams) -> Result<StageTables, FeedError> {
        let mut parts = Vec::new();
        for category in params.canonical_categories()? {
            let doc = self.fetch_table(Feed::Stages, params, &category).await?;
            let mut tables = stage_tables(&doc)?;
            for table in [
                &mut tables.stages,
                &mut tables.sectors,
                &mut tables.stage_surfaces,
                &mut tables.section_surfaces,
            ] {
                tag_category(table, &category);
            }
            parts.push(tables);
        }

        let mut out = StageTables::default();
        let (mut stages, mut sectors, mut stage_surfaces, mut section_surfaces, mut surfaces) =
            (vec![], vec![], vec![], vec![], vec![]);
        for part in parts {
            stages.push(part.stages);
            sectors.push(part.sectors);
            stage_surfaces.push(part.stage_surfaces);
            section_surfaces.push(part.section_surfaces);
            surfaces.push(part.surfaces);
        }
        out.stages = Table::concat(stages);
        sort_with_category(&mut out.stages, Feed::Stages.sort_key())?;
        out.sectors = Table::concat(sectors);
        sort_with_category(&mut out.sectors, &["code"])?;
        out.stage_surfaces = Table::concat(stage_surfaces);
        sort_with_category(&mut out.stage_surfaces, &["code"])?;
        out.surfaces = Table::concat(surfaces);
        out.surfaces.dedup_by("type")?;
        out.section_surfaces =
            apply_taxonomy(&Table::concat(section_surfaces), &out.surfaces)?;
        sort_with_category(&mut out.section_surfaces, &["code", "section"])?;

        info!(
            stages = out.stages.num_rows(),
            sectors = out.sectors.num_rows(),
            surfaces = out.surfaces.num_rows(),
            "stages loaded"
        );
        Ok(out)
    }
}

/// Replace the `text_*` cells of section rows with the translations of their
/// `type` in `surfaces`, so every section of a type reads the same across
/// categories.
fn apply_taxonomy(sections: &Table, surfaces: &Table) -> Result<Table, ShapeError> {
    let mut taxonomy: HashMap<String, Record> = HashMap::new();
    for row in surfaces.rows() {
        taxonomy.insert(row.value("type").to_string(), row.to_record());
    }

    let text_columns: Vec<String> = sections
        .columns()
        .iter()
        .chain(surfaces.columns())
        .filter(|c| c.starts_with("text_"))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut out = sections.clone();
    for column in &text_columns {
        out.add_column(column, |r| {
            taxonomy
                .get(&r.value("type").to_string())
                .and_then(|rec| rec.get(column))
                .cloned()
                .unwrap_or(Value::Null)
        });
    }
    let ordering: Vec<&str> = SECTION_COLUMNS
        .iter()
        .copied()
        .chain(text_columns.iter().map(String::as_str))
        .chain([CATEGORY_COLUMN])
        .collect();
    out.select(&ordering)
}

/// Reshape one category's stage document.
fn stage_tables(doc: &Table) -> Result<StageTables, FeedError> {
    let mut stages = doc.clone();
    stages.require_column("code")?;
    stages.add_column("variable", |r| match r.get_str("code") {
        Some(code) => json!(format!("stage.name.{code}")),
        None => Value::Null,
    });
    let before = stages.columns().to_vec();
    let mut stages = merge_labels(&stages, "stageLangs", "variable")?;
    let locales = label_columns(&before, &stages);
    stages.add_column("stage_code", |r| r.value("code"));
    stages.sort_by(Feed::Stages.sort_key())?;

    let mut sectors = stages.explode_records("sectors", &[])?;
    sectors.require_column("code")?;
    sectors.add_column("stage_code", |r| match r.get_str("code") {
        Some(code) => json!(format!("{}000", code.chars().take(2).collect::<String>())),
        None => Value::Null,
    });
    let mut counts: HashMap<String, u64> = HashMap::new();
    sectors.add_column("sector_number", |r| {
        let n = counts.entry(r.value("stage_code").to_string()).or_default();
        *n += 1;
        json!(*n)
    });

    let mut competitive = if sectors.has_column("grounds") {
        sectors.select(&["grounds", "code"])?
    } else {
        Table::with_columns(["grounds", "code"])
    };
    competitive.retain_rows(|r| !r.value("grounds").is_null() && !r.value("code").is_null());
    let competitive = competitive.explode("grounds")?;
    debug!(rows = competitive.num_rows(), "competitive sector grounds");
    let GroundTables {
        sections,
        percentages,
        surfaces,
    } = flatten_grounds(&competitive)?;

    let stage_columns: Vec<&str> = STAGE_COLUMNS
        .iter()
        .copied()
        .chain(locales.iter().map(String::as_str))
        .collect();
    let stages = stages.select(&stage_columns)?;
    let mut sectors = sectors.select(&SECTOR_COLUMNS)?;
    sectors.sort_by(&["code"])?;

    Ok(StageTables {
        stages,
        sectors,
        stage_surfaces: percentages,
        section_surfaces: sections,
        surfaces,
    })
}
