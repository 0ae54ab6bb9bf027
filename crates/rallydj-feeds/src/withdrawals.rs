use rallydj_core::{CompetitorTables, Table, flatten_competitors};
use rallydj_fetch::Transport;
use tracing::info;

use crate::client::{sort_with_category, tag_category};
use crate::{Feed, FeedError, FeedParams, RallyClient};

/// Withdrawn teams, split three ways.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithdrawalTables {
    /// `stage, bib, reason` and any other non-team entry fields, by `(stage, reason)`.
    pub withdrawals: Table,
    /// One row per withdrawn competitor, by `bib`.
    pub competitors: Table,
    /// One row per withdrawn team, by `bib`.
    pub teams: Table,
}

impl<T: Transport> RallyClient<T> {
    /// Withdrawals of every requested category.
    ///
    /// The document has one row per stage, each listing the teams withdrawn on
    /// that stage.
    pub async fn withdrawals(&self, params: &FeedParams) -> Result<WithdrawalTables, FeedError> {
        let mut out = WithdrawalTables::default();
        let (mut withdrawals, mut competitors, mut teams) = (vec![], vec![], vec![]);
        for category in params.canonical_categories()? {
            let doc = self.fetch_table(Feed::Withdrawals, params, &category).await?;
            let entries = doc.explode_records("list", &["stage"])?;
            let CompetitorTables {
                teams: mut t,
                competitors: mut c,
                results: mut w,
            } = flatten_competitors(&entries)?;
            for table in [&mut w, &mut c, &mut t] {
                tag_category(table, &category);
            }
            withdrawals.push(w);
            competitors.push(c);
            teams.push(t);
        }

        out.withdrawals = Table::concat(withdrawals);
        sort_with_category(&mut out.withdrawals, Feed::Withdrawals.sort_key())?;
        out.competitors = Table::concat(competitors);
        sort_with_category(&mut out.competitors, &["bib"])?;
        out.teams = Table::concat(teams);
        sort_with_category(&mut out.teams, &["bib"])?;

        info!(
            withdrawals = out.withdrawals.num_rows(),
            competitors = out.competitors.num_rows(),
            "withdrawals loaded"
        );
        Ok(out)
    }
}
