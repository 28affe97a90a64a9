//! Row predicates over an assembled table.

use arrow::array::{Array, BooleanArray, StringArray};
use arrow::compute::filter_record_batch;
use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::TableError;
use crate::table::StatTable;
use fightstats_types::{GroupBy, StatCategory};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("start time range is inverted: {min} > {max}")]
    InvertedTimeRange {
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// User selection applied by [`filter_data`].
///
/// An empty allow-list means "no restriction", never "exclude everything".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub stat_category: StatCategory,
    /// Consumed by grouping, not by row filtering
    pub group_by: GroupBy,
    pub account_name_filter: Vec<String>,
    pub character_name_filter: Vec<String>,
    pub profession_filter: Vec<String>,
    /// Selectable fight start times offered to the user. Not a predicate;
    /// the range is `start_time_min..=start_time_max`.
    pub dates: Vec<DateTime<Utc>>,
    pub start_time_min: DateTime<Utc>,
    pub start_time_max: DateTime<Utc>,
}

impl FilterParams {
    /// Parameters that keep every row of `table`
    pub fn unrestricted(table: &StatTable, category: StatCategory) -> Result<Self, FilterError> {
        let dates = FilterOptions::from_table(table)?.dates;
        let (start_time_min, start_time_max) = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => (DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC),
        };
        Ok(Self {
            stat_category: category,
            group_by: GroupBy::default(),
            account_name_filter: Vec::new(),
            character_name_filter: Vec::new(),
            profession_filter: Vec::new(),
            dates,
            start_time_min,
            start_time_max,
        })
    }
}

/// Keep rows matching `params`, then reproject for `params.stat_category`.
pub fn filter_data(table: &StatTable, params: &FilterParams) -> Result<StatTable, FilterError> {
    if params.start_time_min > params.start_time_max {
        return Err(FilterError::InvertedTimeRange {
            min: params.start_time_min,
            max: params.start_time_max,
        });
    }

    let min = params.start_time_min.timestamp_millis();
    let max = params.start_time_max.timestamp_millis();
    let starts = table.time_starts()?;
    let mut keep: Vec<bool> = starts
        .iter()
        .map(|ms| ms.is_some_and(|ms| (min..=max).contains(&ms)))
        .collect();

    for (column, allowed) in [
        ("account", &params.account_name_filter),
        ("name", &params.character_name_filter),
        ("profession", &params.profession_filter),
    ] {
        if allowed.is_empty() {
            continue;
        }
        let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
        let values = table.strings(column)?;
        for (row, flag) in keep.iter_mut().enumerate() {
            *flag &= values.is_valid(row) && allowed.contains(values.value(row));
        }
    }

    if params.stat_category != table.category() {
        tracing::warn!(
            built_for = %table.category(),
            requested = %params.stat_category,
            "Reprojecting table for another category; columns it lacks will be null"
        );
    }

    let mask = BooleanArray::from(keep);
    let batch = filter_record_batch(table.batch(), &mask).map_err(TableError::from)?;
    let kept = table.with_batch(batch);
    tracing::debug!(rows_in = table.num_rows(), rows_out = kept.num_rows(), "Filtered table");
    Ok(kept.project(params.stat_category)?)
}

/// Selectable values for each filter, sorted and deduplicated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub accounts: Vec<String>,
    pub names: Vec<String>,
    pub professions: Vec<String>,
    pub dates: Vec<DateTime<Utc>>,
}

impl FilterOptions {
    pub fn from_table(table: &StatTable) -> Result<Self, TableError> {
        let mut dates = table.start_times()?;
        dates.sort();
        dates.dedup();
        Ok(Self {
            accounts: unique_sorted(table.strings("account")?),
            names: unique_sorted(table.strings("name")?),
            professions: unique_sorted(table.strings("profession")?),
            dates,
        })
    }
}

fn unique_sorted(column: &StringArray) -> Vec<String> {
    let mut values: Vec<String> = column.iter().flatten().map(str::to_string).collect();
    values.sort();
    values.dedup();
    values
}
