use rallydj_core::{CompetitorTables, Table, flatten_competitors};
use rallydj_fetch::Transport;
use serde_json::json;
use tracing::info;

use crate::client::{sort_with_category, tag_category};
use crate::{Feed, FeedError, FeedParams, RallyClient};

/// Latest stage scores with the scored teams and their crews.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTables {
    /// One row per scored entry, by `(position, bib)`.
    pub scores: Table,
    pub competitors: Table,
    pub teams: Table,
}

impl<T: Transport> RallyClient<T> {
    /// Latest scores of one stage for every requested category.
    pub async fn scores(&self, params: &FeedParams) -> Result<ScoreTables, FeedError> {
        let drop = Feed::Scores.drop_columns();
        let (mut scores, mut competitors, mut teams) = (vec![], vec![], vec![]);
        for category in params.canonical_categories()? {
            let doc = self.fetch_table(Feed::Scores, params, &category).await?;
            let CompetitorTables {
                teams: mut t,
                competitors: mut c,
                results: mut s,
            } = flatten_competitors(&doc.normalized())?;
            s.add_column("stage", |_| json!(params.stage));
            for table in [&mut s, &mut c, &mut t] {
                table.drop_columns(drop);
                tag_category(table, &category);
            }
            scores.push(s);
            competitors.push(c);
            teams.push(t);
        }

        let mut out = ScoreTables {
            scores: Table::concat(scores),
            competitors: Table::concat(competitors),
            teams: Table::concat(teams),
        };
        sort_with_category(&mut out.scores, Feed::Scores.sort_key())?;
        sort_with_category(&mut out.competitors, &["bib"])?;
        sort_with_category(&mut out.teams, &["bib"])?;
        info!(rows = out.scores.num_rows(), stage = params.stage, "scores loaded");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::{client, url};

    #[tokio::test]
    async fn scores_ranked_with_crews() {
        let params = FeedParams::default().with_stage(5);
        let c = client(vec![(
            url(Feed::Scores, &params, "A"),
            json!([
                {"_id": "s2", "_key": "k", "position": 2, "bib": "202", "time": 3600,
                 "team": {"bib": "202", "brand": "B", "_id": "t2",
                          "competitors": [{"name": "C"}]}},
                {"_id": "s1", "_origin": "o", "position": 1, "bib": "101", "time": 3500,
                 "team": {"bib": "101", "brand": "A", "_id": "t1",
                          "competitors": [{"name": "A"}, {"name": "B"}]}},
            ]),
        )]);
        let out = c.scores(&params).await.unwrap();

        assert_eq!(out.scores.columns(), ["position", "bib", "time", "stage", "category"]);
        let bibs: Vec<Value> = out.scores.rows().map(|r| r.value("bib")).collect();
        assert_eq!(bibs, [json!("101"), json!("202")]);
        assert_eq!(out.scores.row(0).unwrap().value("stage"), json!(5));

        assert_eq!(out.teams.columns(), ["bib", "brand", "category"]);
        assert_eq!(out.competitors.num_rows(), 3);
        assert_eq!(out.competitors.row(2).unwrap().value("name"), json!("C"));
    }
}
