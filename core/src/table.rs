//! Arrow-backed stat table.
//!
//! A [`StatTable`] is a `RecordBatch` with the identity columns first (in
//! [`IDENTITY_COLUMNS`] order) followed by nullable Float64 stat columns.
//! [`StatTable::project`] is the only code that decides which stat columns a
//! table carries; both assembly and filtering end with it.

use std::fmt;
use std::sync::{Arc, LazyLock};

use arrow::array::{
    Array, ArrayRef, Float64Array, StringArray, TimestampMillisecondArray, new_null_array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{DateTime, Utc};
use hashbrown::HashSet;

use crate::error::TableError;
use crate::fetcher::Slot;
use crate::keys::{self, IDENTITY_COLUMNS};
use crate::model::PlayerRow;
use fightstats_types::StatCategory;

pub const TIME_START: &str = "timeStart";

const UTC: &str = "UTC";

static IDENTITY_FIELDS: LazyLock<Vec<Field>> = LazyLock::new(|| {
    IDENTITY_COLUMNS
        .iter()
        .map(|name| match *name {
            TIME_START => Field::new(
                *name,
                DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into())),
                false,
            ),
            _ => Field::new(*name, DataType::Utf8, false),
        })
        .collect()
});

fn stat_field(name: &str) -> Field {
    Field::new(name, DataType::Float64, true)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatTable {
    batch: RecordBatch,
    category: StatCategory,
}

impl StatTable {
    /// Zero-row table with the stable schema of `category`
    pub fn empty(category: StatCategory) -> Result<Self, TableError> {
        Self::from_rows(&[], category)
    }

    /// Build a table from batch slots, in fight start order.
    ///
    /// Failed and empty slots contribute nothing. Rows of equal start time
    /// keep their slot order.
    pub fn assemble(slots: &[Slot], category: StatCategory) -> Result<Self, TableError> {
        let mut rows: Vec<&PlayerRow> = slots
            .iter()
            .filter_map(|slot| slot.as_ref().ok())
            .flat_map(|rows| rows.iter())
            .collect();
        rows.sort_by_key(|row| row.identity.time_start);
        Self::from_rows(&rows, category)
    }

    fn from_rows(rows: &[&PlayerRow], category: StatCategory) -> Result<Self, TableError> {
        let mut stat_names: Vec<&str> = Vec::new();
        let mut seen = HashSet::new();
        for row in rows {
            for name in row.stats.keys() {
                if seen.insert(name.as_str()) {
                    stat_names.push(name);
                }
            }
        }

        let text = |f: fn(&PlayerRow) -> &str| -> ArrayRef {
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| f(r))))
        };

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(IDENTITY_COLUMNS.len() + stat_names.len());
        for name in IDENTITY_COLUMNS {
            let column = match name {
                "id" => text(|r| r.identity.log_id.as_str()),
                TIME_START => Arc::new(
                    TimestampMillisecondArray::from_iter_values(
                        rows.iter().map(|r| r.identity.time_start.timestamp_millis()),
                    )
                    .with_timezone(UTC),
                ),
                "profession" => text(|r| &r.identity.profession),
                "name" => text(|r| &r.identity.name),
                "profession+name" => Arc::new(StringArray::from_iter_values(
                    rows.iter().map(|r| r.identity.profession_name()),
                )),
                "spec_color" => text(|r| &r.identity.spec_color),
                "account" => text(|r| &r.identity.account),
                other => return Err(TableError::MissingColumn(other.to_string())),
            };
            columns.push(column);
        }

        let mut fields = IDENTITY_FIELDS.clone();
        for name in &stat_names {
            fields.push(stat_field(name));
            columns.push(Arc::new(Float64Array::from_iter(
                rows.iter().map(|r| r.stats.get(*name).copied()),
            )));
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Self { batch, category }.project(category)
    }

    /// Identity columns plus the stat columns of `category`, in list order.
    ///
    /// Listed columns absent from this table become all-null columns.
    /// `Unlabeled` takes whatever stat columns this table has that no
    /// listed category claims.
    pub fn project(&self, category: StatCategory) -> Result<Self, TableError> {
        let schema = self.batch.schema();
        let present = schema.fields().iter().map(|f| f.name().as_str());
        let stat_names = keys::category_columns(category, present);

        let mut fields: Vec<Field> = Vec::with_capacity(IDENTITY_COLUMNS.len() + stat_names.len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
        for name in IDENTITY_COLUMNS {
            let idx = schema
                .index_of(name)
                .map_err(|_| TableError::MissingColumn(name.to_string()))?;
            fields.push(schema.field(idx).clone());
            columns.push(self.batch.column(idx).clone());
        }

        let mut seen = HashSet::new();
        for name in &stat_names {
            if !seen.insert(name.as_str()) {
                continue;
            }
            match schema.index_of(name) {
                Ok(idx) => {
                    fields.push(schema.field(idx).clone());
                    columns.push(self.batch.column(idx).clone());
                }
                Err(_) => {
                    fields.push(stat_field(name));
                    columns.push(new_null_array(&DataType::Float64, self.batch.num_rows()));
                }
            }
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Self { batch, category })
    }

    /// Same table with a different row subset of the same schema
    pub(crate) fn with_batch(&self, batch: RecordBatch) -> Self {
        Self {
            batch,
            category: self.category,
        }
    }

    pub fn category(&self) -> StatCategory {
        self.category
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Stat columns only, in table order
    pub fn stat_columns(&self) -> Vec<String> {
        self.column_names()
            .into_iter()
            .filter(|name| !keys::is_identity(name))
            .collect()
    }

    pub fn strings(&self, column: &str) -> Result<&StringArray, TableError> {
        self.typed_column(column, "Utf8")
    }

    pub fn values(&self, column: &str) -> Result<&Float64Array, TableError> {
        self.typed_column(column, "Float64")
    }

    pub fn time_starts(&self) -> Result<&TimestampMillisecondArray, TableError> {
        self.typed_column(TIME_START, "Timestamp(ms)")
    }

    /// Fight start times as chrono values, one per row
    pub fn start_times(&self) -> Result<Vec<DateTime<Utc>>, TableError> {
        let column = self.time_starts()?;
        Ok(column
            .values()
            .iter()
            .filter_map(|ms| DateTime::from_timestamp_millis(*ms))
            .collect())
    }

    fn typed_column<T: 'static>(&self, column: &str, expected: &'static str) -> Result<&T, TableError> {
        self.batch
            .column_by_name(column)
            .ok_or_else(|| TableError::MissingColumn(column.to_string()))?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| TableError::ColumnType {
                column: column.to_string(),
                expected,
            })
    }
}

impl fmt::Display for StatTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match pretty_format_batches(std::slice::from_ref(&self.batch)) {
            Ok(table) => write!(f, "{table}"),
            Err(_) => Err(fmt::Error),
        }
    }
}
