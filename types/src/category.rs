//! Stat categories and grouping dimensions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named grouping of stat columns.
///
/// `Unlabeled` has no static member list; it collects every column that no
/// other category claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum StatCategory {
    #[default]
    Default,
    Offense,
    Defense,
    Boons,
    Miscellaneous,
    Unlabeled,
}

impl StatCategory {
    pub const ALL: [StatCategory; 6] = [
        StatCategory::Default,
        StatCategory::Offense,
        StatCategory::Defense,
        StatCategory::Boons,
        StatCategory::Miscellaneous,
        StatCategory::Unlabeled,
    ];

    /// Categories with a static column list
    pub const LISTED: [StatCategory; 5] = [
        StatCategory::Default,
        StatCategory::Offense,
        StatCategory::Defense,
        StatCategory::Boons,
        StatCategory::Miscellaneous,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatCategory::Default => "Default",
            StatCategory::Offense => "Offense",
            StatCategory::Defense => "Defense",
            StatCategory::Boons => "Boons",
            StatCategory::Miscellaneous => "Miscellaneous",
            StatCategory::Unlabeled => "Unlabeled",
        }
    }

    /// One-line help text shown next to the category selector.
    pub fn description(self) -> &'static str {
        match self {
            StatCategory::Default => "Stats that are usually helpful",
            StatCategory::Offense => "Offensive stats (damage, boon strips, crowd control)",
            StatCategory::Defense => "Defensive stats (healing, cleanses, avoidance)",
            StatCategory::Boons => "Boon generation",
            StatCategory::Miscellaneous => "Rarely useful values reported by the log parser",
            StatCategory::Unlabeled => "New data points that are not classified yet",
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category or group-by name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

impl FromStr for StatCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "stat category",
                value: s.to_string(),
            })
    }
}

/// Dimension rows are grouped by before averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Profession,
    CharacterName,
    AccountName,
    ProfessionAndName,
}

impl GroupBy {
    pub const ALL: [GroupBy; 4] = [
        GroupBy::CharacterName,
        GroupBy::ProfessionAndName,
        GroupBy::Profession,
        GroupBy::AccountName,
    ];

    /// Table column holding the group key
    pub fn column(self) -> &'static str {
        match self {
            GroupBy::Profession => "profession",
            GroupBy::CharacterName => "name",
            GroupBy::AccountName => "account",
            GroupBy::ProfessionAndName => "profession+name",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupBy::Profession => "profession",
            GroupBy::CharacterName => "character name",
            GroupBy::AccountName => "account name",
            GroupBy::ProfessionAndName => "character name & profession",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GroupBy {
    type Err = ParseEnumError;

    /// Accepts either the label ("character name") or the column ("name").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        GroupBy::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(s) || g.column().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError {
                kind: "group-by dimension",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in StatCategory::ALL {
            assert_eq!(category.as_str().parse::<StatCategory>(), Ok(category));
        }
        assert_eq!("boons".parse::<StatCategory>(), Ok(StatCategory::Boons));
        assert!("Utility".parse::<StatCategory>().is_err());
    }

    #[test]
    fn test_listed_excludes_unlabeled() {
        assert!(!StatCategory::LISTED.contains(&StatCategory::Unlabeled));
        assert_eq!(StatCategory::LISTED.len() + 1, StatCategory::ALL.len());
    }

    #[test]
    fn test_descriptions_are_distinct() {
        let mut seen: Vec<&str> = StatCategory::ALL.iter().map(|c| c.description()).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), StatCategory::ALL.len());
    }

    #[test]
    fn test_group_by_accepts_label_and_column() {
        assert_eq!("character name".parse::<GroupBy>(), Ok(GroupBy::CharacterName));
        assert_eq!("name".parse::<GroupBy>(), Ok(GroupBy::CharacterName));
        assert_eq!("profession+name".parse::<GroupBy>(), Ok(GroupBy::ProfessionAndName));
        assert_eq!("account name".parse::<GroupBy>(), Ok(GroupBy::AccountName));
        assert!("guild".parse::<GroupBy>().is_err());
    }
}
