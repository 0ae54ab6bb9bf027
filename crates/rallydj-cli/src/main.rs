mod display;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rallydj_core::Table;
use rallydj_feeds::{
    DEFAULT_CATEGORY, DEFAULT_STAGE, DEFAULT_YEAR, Feed, FeedOutput, FeedParams, RallyClient,
};
use rallydj_fetch::{CacheMode, HttpTransport};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::display::View;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CacheArg {
    Off,
    Memory,
    Disk,
}

#[derive(Debug, Parser)]
#[command(
    name = "rallydj",
    version,
    about = "Fetch rally live API feeds as tables",
    after_help = "Every option falls back to its RALLYDJ_* environment variable. Log level follows RUST_LOG."
)]
struct Cli {
    #[arg(
        value_name = "FEED",
        help = "category, groups, clazz, waypoints, withdrawals, stages or scores"
    )]
    feed: Feed,
    #[arg(long, env = "RALLYDJ_YEAR", default_value_t = DEFAULT_YEAR)]
    year: u16,
    #[arg(
        long = "category",
        env = "RALLYDJ_CATEGORY",
        value_delimiter = ',',
        default_value = DEFAULT_CATEGORY,
        help = "Category to fetch; repeat or comma-separate to fan out"
    )]
    categories: Vec<String>,
    #[arg(long, env = "RALLYDJ_STAGE", default_value_t = DEFAULT_STAGE)]
    stage: u32,
    #[arg(long, value_enum, env = "RALLYDJ_CACHE", default_value = "off")]
    cache: CacheArg,
    #[arg(
        long = "cache-dir",
        env = "RALLYDJ_CACHE_DIR",
        value_name = "DIR",
        default_value = ".rallydj-cache",
        help = "Response cache directory for --cache disk"
    )]
    cache_dir: PathBuf,
    #[arg(
        long = "expire-after",
        env = "RALLYDJ_EXPIRE_AFTER",
        value_name = "SECS",
        default_value_t = 300,
        help = "Age after which a cached response is fetched again"
    )]
    expire_after: u64,
    #[arg(long, value_enum, default_value = "table")]
    view: View,
    #[arg(
        long = "table",
        value_name = "NAME",
        help = "Print only this output table, e.g. sectors or teams"
    )]
    table: Option<String>,
}

impl Cli {
    fn cache_mode(&self) -> CacheMode {
        let expire_after = Duration::from_secs(self.expire_after);
        match self.cache {
            CacheArg::Off => CacheMode::Disabled,
            CacheArg::Memory => CacheMode::Memory { expire_after },
            CacheArg::Disk => CacheMode::Disk {
                dir: self.cache_dir.clone(),
                expire_after,
            },
        }
    }

    fn params(&self) -> FeedParams {
        FeedParams::new(self.year)
            .with_categories(self.categories.iter().cloned())
            .with_stage(self.stage)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("rallydj v{}", env!("CARGO_PKG_VERSION"));

    let transport = HttpTransport::new(cli.cache_mode()).context("building HTTP client")?;
    let client = RallyClient::new(transport);
    let output = client
        .run(cli.feed, &cli.params())
        .await
        .with_context(|| format!("loading {} feed", cli.feed))?;

    for (name, table) in selected_tables(&output, cli.table.as_deref())? {
        display::print_table(name, table, cli.view)?;
    }
    Ok(())
}

fn selected_tables<'a>(
    output: &'a FeedOutput,
    name: Option<&'a str>,
) -> anyhow::Result<Vec<(&'a str, &'a Table)>> {
    let Some(name) = name else {
        return Ok(output.tables());
    };
    let table = output.table(name).with_context(|| {
        let names: Vec<&str> = output.tables().into_iter().map(|(n, _)| n).collect();
        format!("no table '{name}', available: {}", names.join(", "))
    })?;
    Ok(vec![(name, table)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_fan_out_flags() {
        let cli = Cli::try_parse_from(["rallydj", "stages"]).unwrap();
        assert_eq!(cli.feed, Feed::Stages);
        assert_eq!(cli.params(), FeedParams::default());
        assert_eq!(cli.cache_mode(), CacheMode::Disabled);

        let cli = Cli::try_parse_from([
            "rallydj",
            "withdrawals",
            "--category",
            "M,A",
            "--category",
            "K",
            "--cache",
            "memory",
            "--expire-after",
            "60",
        ])
        .unwrap();
        assert_eq!(cli.params().canonical_categories().unwrap(), ["A", "K", "M"]);
        assert_eq!(
            cli.cache_mode(),
            CacheMode::Memory {
                expire_after: Duration::from_secs(60)
            }
        );
    }

    #[test]
    fn unknown_feed_rejected() {
        assert!(Cli::try_parse_from(["rallydj", "podium"]).is_err());
    }

    #[test]
    fn table_selection() {
        let output = FeedOutput::Single(Feed::Groups, Table::new());
        assert_eq!(selected_tables(&output, None).unwrap().len(), 1);
        assert!(selected_tables(&output, Some("groups")).is_ok());
        let err = selected_tables(&output, Some("teams")).unwrap_err();
        assert!(err.to_string().contains("available: groups"));
    }
}
