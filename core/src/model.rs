//! Row-level data model produced by the normalizer.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identifier of one uploaded log on the report service.
///
/// Uploaded logs never change, so the id doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LogId(String);

impl LogId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LogId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for LogId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => LogId(s),
            Raw::Number(n) => LogId(n.to_string()),
        })
    }
}

/// Identity attributes carried by every row regardless of stat category
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerIdentity {
    pub log_id: LogId,
    pub time_start: DateTime<Utc>,
    pub profession: String,
    pub name: String,
    pub account: String,
    pub spec_color: String,
}

impl PlayerIdentity {
    /// Composite key used by the "character name & profession" grouping
    pub fn profession_name(&self) -> String {
        format!("{} {}", self.profession, self.name)
    }
}

/// One player in one fight
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub identity: PlayerIdentity,
    /// Column name -> value. Columns absent here become nulls in the table.
    pub stats: BTreeMap<String, f64>,
}

/// All rows contributed by a single log
pub type RowSet = Vec<PlayerRow>;
