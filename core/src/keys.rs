//! Column naming and stat category membership.
//!
//! This is the single source of truth for which column belongs to which
//! [`StatCategory`]. Table projection at fetch time and at filter time both
//! go through [`category_columns`].

use std::sync::LazyLock;

use hashbrown::HashSet;
use phf::phf_map;

use crate::boons::boon_keys;
use fightstats_types::StatCategory;

/// Columns every row carries and that are never selectable as stats
pub const IDENTITY_COLUMNS: [&str; 7] = [
    "id",
    "timeStart",
    "profession",
    "name",
    "profession+name",
    "spec_color",
    "account",
];

/// Report field name -> display column name
pub static RENAMED_KEYS: phf::Map<&'static str, &'static str> = phf_map! {
    "dps" => "Damage (dps)",
    "condiDps" => "Condition Damage (dps)",
    "powerDps" => "Power Damage (dps)",
    "criticalDmg" => "Critical Damage",
    "downContribution" => "Down Contribution",
    "healing" => "Healing",
    "downedHealing" => "Healing on Downed Allies",
    "barrier" => "Barrier",
    "boonStrips" => "Boon Strips",
    "boonStripDownContribution" => "Boon Strips (down contribution)",
    "appliedCrowdControl" => "Crowd Control",
    "appliedCrowdControlDownContribution" => "Crowd Control (down contribution)",
    "appliedCrowdControlDuration" => "Crowd Control Duration (ms)",
    "appliedCrowdControlDurationDownContribution" => "Crowd Control Duration (down contribution, ms)",
    "condiCleanse" => "Condition Cleanses",
    "condiCleanseSelf" => "Condition Cleanses (self)",
    "avgActiveBoons" => "Active Boons (avg)",
    "avgActiveConditions" => "Active Conditions (avg)",
    "distToCom" => "Distance to Commander",
    "swapCount" => "Weapon Swaps",
    "skillCastUptime" => "Skill Cast Uptime (%)",
    "skillCastUptimeNoAA" => "Skill Cast Uptime without Auto Attacks (%)",
    "percentageAlive" => "Time Alive (%)",
    "killed" => "Kills",
    "downed" => "Downs",
    "interrupts" => "Interrupts",
    "missed" => "Missed Attacks",
    "criticalRate" => "Critical Hits",
    "glanceRate" => "Glancing Hits",
    "flankingRate" => "Flanking Hits",
    "resurrects" => "Resurrects",
    "resurrectTime" => "Resurrect Time (s)",
    "stunBreak" => "Stun Breaks",
    "removedStunDuration" => "Removed Stun Duration (s)",
    "evaded" => "Evaded Attacks",
    "blocked" => "Blocked Attacks",
    "invulned" => "Invulnerable Hits",
    "totalDamageCount" => "Damage Hits",
};

const DEFAULT_RAW: &[&str] = &[
    "dps",
    "downContribution",
    "healing",
    "barrier",
    "boonStrips",
    "boonStripDownContribution",
    "appliedCrowdControl",
    "appliedCrowdControlDownContribution",
    "condiCleanse",
    "avgActiveBoons",
    "avgActiveConditions",
    "distToCom",
    "swapCount",
    "skillCastUptime",
    "percentageAlive",
];

const OFFENSE_RAW: &[&str] = &[
    "dps",
    "downContribution",
    "condiDps",
    "powerDps",
    "criticalDmg",
    "boonStrips",
    "boonStripDownContribution",
    "killed",
    "downed",
    "interrupts",
    "appliedCrowdControl",
    "appliedCrowdControlDownContribution",
    "appliedCrowdControlDuration",
    "appliedCrowdControlDurationDownContribution",
    "missed",
    "criticalRate",
    "glanceRate",
    "flankingRate",
];

const DEFENSE_RAW: &[&str] = &[
    "healing",
    "barrier",
    "downedHealing",
    "resurrects",
    "resurrectTime",
    "condiCleanse",
    "condiCleanseSelf",
    "stunBreak",
    "removedStunDuration",
    "evaded",
    "blocked",
    "invulned",
];

// Values someone might be interested in but which clutter most views
const MISCELLANEOUS_RAW: &[&str] = &[
    "distToCom",
    "skillCastUptime",
    "skillCastUptimeNoAA",
    "swapCount",
    "totalDamageCount",
    "removedStunDuration",
    "appliedCrowdControlDuration",
    "appliedCrowdControlDurationDownContribution",
];

/// Display name for a report field, or the field itself if unclassified
pub fn display_name(raw: &str) -> &str {
    RENAMED_KEYS.get(raw).copied().unwrap_or(raw)
}

fn renamed(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|k| display_name(k).to_string()).collect()
}

static DEFAULT_KEYS: LazyLock<Vec<String>> = LazyLock::new(|| renamed(DEFAULT_RAW));
static OFFENSE_KEYS: LazyLock<Vec<String>> = LazyLock::new(|| renamed(OFFENSE_RAW));
static DEFENSE_KEYS: LazyLock<Vec<String>> = LazyLock::new(|| renamed(DEFENSE_RAW));
static MISCELLANEOUS_KEYS: LazyLock<Vec<String>> = LazyLock::new(|| renamed(MISCELLANEOUS_RAW));

/// Identity columns plus every column claimed by a listed category
static CLASSIFIED: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut set: HashSet<&'static str> = IDENTITY_COLUMNS.into_iter().collect();
    for category in StatCategory::LISTED {
        set.extend(listed_columns(category).iter().map(String::as_str));
    }
    set
});

/// Static member list of a category. Empty for `Unlabeled`.
pub fn listed_columns(category: StatCategory) -> &'static [String] {
    match category {
        StatCategory::Default => &DEFAULT_KEYS,
        StatCategory::Offense => &OFFENSE_KEYS,
        StatCategory::Defense => &DEFENSE_KEYS,
        StatCategory::Boons => boon_keys(),
        StatCategory::Miscellaneous => &MISCELLANEOUS_KEYS,
        StatCategory::Unlabeled => &[],
    }
}

pub fn is_identity(column: &str) -> bool {
    IDENTITY_COLUMNS.contains(&column)
}

/// True if the column is an identity column or belongs to a listed category
pub fn is_classified(column: &str) -> bool {
    CLASSIFIED.contains(column)
}

/// Known columns that neither identity nor any listed category claims,
/// in the order they were seen.
pub fn unlabeled_columns<'a>(known: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    known
        .into_iter()
        .filter(|c| !is_classified(c) && seen.insert(*c))
        .map(str::to_string)
        .collect()
}

/// Stat columns projected for `category`, given the columns present in a table.
pub fn category_columns<'a>(
    category: StatCategory,
    known: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    match category {
        StatCategory::Unlabeled => unlabeled_columns(known),
        listed => listed_columns(listed).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_raw_key_is_renamed() {
        for raw in DEFAULT_RAW
            .iter()
            .chain(OFFENSE_RAW)
            .chain(DEFENSE_RAW)
            .chain(MISCELLANEOUS_RAW)
        {
            assert!(RENAMED_KEYS.contains_key(raw), "{raw} has no display name");
        }
    }

    #[test]
    fn test_overlapping_membership_is_preserved() {
        let dps = display_name("dps").to_string();
        assert!(listed_columns(StatCategory::Default).contains(&dps));
        assert!(listed_columns(StatCategory::Offense).contains(&dps));
        assert!(!unlabeled_columns([dps.as_str()]).contains(&dps));
    }

    #[test]
    fn test_unlabeled_is_known_minus_identity_minus_listed() {
        let known = [
            "id",
            "timeStart",
            "name",
            "Damage (dps)",
            "Might (Group Generation/s)",
            "Stun Breaks",
            "breakbarDamage",
            "someNewField",
            "breakbarDamage",
        ];
        assert_eq!(unlabeled_columns(known), vec!["breakbarDamage", "someNewField"]);
    }

    #[test]
    fn test_unlabeled_disjoint_from_listed_categories() {
        let mut known: Vec<&str> = IDENTITY_COLUMNS.to_vec();
        for category in StatCategory::LISTED {
            known.extend(listed_columns(category).iter().map(String::as_str));
        }
        known.push("damageTaken");
        let unlabeled = category_columns(StatCategory::Unlabeled, known.iter().copied());
        assert_eq!(unlabeled, vec!["damageTaken"]);
    }

    #[test]
    fn test_listed_category_ignores_known_columns() {
        let boons = category_columns(StatCategory::Boons, ["Damage (dps)"]);
        assert_eq!(boons, boon_keys());
        assert!(boons.iter().all(|c| c.contains("Generation/s")));
    }

    #[test]
    fn test_identity_columns_are_never_listed() {
        for category in StatCategory::ALL {
            for column in listed_columns(category) {
                assert!(!is_identity(column));
            }
        }
    }
}
