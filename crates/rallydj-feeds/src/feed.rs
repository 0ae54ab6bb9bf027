//! Per-feed configuration: resource path, label merge, drop list and sort key.

use std::fmt;
use std::str::FromStr;

/// A feed's embedded label list and the column it joins on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelMerge {
    pub list_column: &'static str,
    pub join_key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Category,
    Groups,
    Clazz,
    Waypoints,
    Withdrawals,
    Stages,
    Scores,
}

impl Feed {
    pub const ALL: [Feed; 7] = [
        Feed::Category,
        Feed::Groups,
        Feed::Clazz,
        Feed::Waypoints,
        Feed::Withdrawals,
        Feed::Stages,
        Feed::Scores,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feed::Category => "category",
            Feed::Groups => "groups",
            Feed::Clazz => "clazz",
            Feed::Waypoints => "waypoints",
            Feed::Withdrawals => "withdrawals",
            Feed::Stages => "stages",
            Feed::Scores => "scores",
        }
    }

    pub fn path_template(self) -> &'static str {
        match self {
            Feed::Category => "category-{year}",
            Feed::Groups => "allGroups-{year}",
            Feed::Clazz => "allClazz-{year}-{category}",
            Feed::Waypoints => "waypoint-{year}-{category}-{stage}",
            Feed::Withdrawals => "withdrawal-{year}-{category}",
            Feed::Stages => "stage-{year}-{category}",
            Feed::Scores => "lastScore-{year}-{category}-{stage}",
        }
    }

    /// Resource path with the template placeholders filled in.
    pub fn resource(self, year: u16, category: &str, stage: u32) -> String {
        self.path_template()
            .replace("{year}", &year.to_string())
            .replace("{category}", category)
            .replace("{stage}", &stage.to_string())
    }

    /// Whether the feed is fetched once per category.
    pub fn per_category(self) -> bool {
        !matches!(self, Feed::Category | Feed::Groups)
    }

    pub fn labels(self) -> Option<LabelMerge> {
        let (list_column, join_key) = match self {
            Feed::Category => ("categoryLangs", "shortLabel"),
            Feed::Groups => ("categoryGroupLangs", "shortLabel"),
            Feed::Clazz => ("categoryClazzLangs", "shortLabel"),
            Feed::Stages => ("stageLangs", "variable"),
            Feed::Waypoints | Feed::Withdrawals | Feed::Scores => return None,
        };
        Some(LabelMerge {
            list_column,
            join_key,
        })
    }

    /// Columns removed from the feed's main table.
    pub fn drop_columns(self) -> &'static [&'static str] {
        match self {
            Feed::Groups => &["liveDisplay", "updatedAt", "refueling", "_key", "_updatedAt"],
            Feed::Clazz => &[
                "liveDisplay",
                "updatedAt",
                "_origin",
                "_gets",
                "categoryGroupLangs",
                "_key",
                "_updatedAt",
            ],
            Feed::Waypoints => &["isFirstDss"],
            Feed::Scores => &["_id", "_key", "_updatedAt", "_origin"],
            Feed::Category | Feed::Withdrawals | Feed::Stages => &[],
        }
    }

    /// Sort key of the feed's main table, before the fan-out `category` tie-break.
    pub fn sort_key(self) -> &'static [&'static str] {
        match self {
            Feed::Category => &["reference"],
            Feed::Groups => &["_origin", "position"],
            Feed::Clazz => &["shortLabel"],
            Feed::Waypoints => &["stage", "checkpoint"],
            Feed::Withdrawals => &["stage", "reason"],
            Feed::Stages => &["startDate"],
            Feed::Scores => &["position", "bib"],
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feed::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Feed::ALL.iter().map(|f| f.name()).collect();
                format!("unknown feed '{s}', expected one of: {}", names.join(", "))
            })
    }
}
