//! Consolidated validation report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tables::Table;
use crate::types::{Schema, Value};
use crate::validation::{PartitionStats, TablePartition};

/// Outcome of one row: its key, whether it was clean, and every reason it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Key column text; `{recipe_id}:{step_no}` for steps. `None` when the key is null.
    pub id: Option<String>,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl RecordOutcome {
    /// Outcomes of every row of a partition, clean rows first, each side in row order.
    pub fn from_partition(partition: &TablePartition) -> Vec<Self> {
        let clean = partition.clean.rows.iter().map(|row| Self {
            id: record_id(partition.table, &partition.clean.schema, row),
            is_valid: true,
            errors: Vec::new(),
        });
        let quarantined = partition
            .quarantine
            .rows
            .iter()
            .zip(&partition.quarantine.reasons)
            .map(|(row, reasons)| Self {
                id: record_id(partition.table, &partition.quarantine.schema, row),
                is_valid: false,
                errors: reasons.clone(),
            });
        clean.chain(quarantined).collect()
    }
}

fn record_id(table: Table, schema: &Schema, row: &[Value]) -> Option<String> {
    let cell = |name: &str| schema.index_of(name).and_then(|i| row.get(i)).and_then(Value::key);
    match table {
        Table::Steps => {
            let recipe = cell("recipe_id");
            let step = cell("step_no");
            if recipe.is_none() && step.is_none() {
                return None;
            }
            Some(format!("{}:{}", recipe.unwrap_or_default(), step.unwrap_or_default()))
        }
        other => cell(other.key_column()),
    }
}

/// Counts for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub clean_count: usize,
    pub quarantine_count: usize,
    /// Quarantined rows per failure reason. A row with several reasons counts once under each.
    pub reasons: BTreeMap<String, usize>,
    /// Per-row outcomes. Only reports built from partitions carry them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RecordOutcome>,
}

impl From<PartitionStats> for TableReport {
    fn from(stats: PartitionStats) -> Self {
        Self {
            clean_count: stats.clean_count,
            quarantine_count: stats.quarantine_count,
            reasons: stats.reasons,
            records: Vec::new(),
        }
    }
}

/// Run-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub rows_processed: usize,
    pub clean_count: usize,
    pub quarantine_count: usize,
}

/// Summary of one validation run, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub per_table: BTreeMap<Table, TableReport>,
    pub totals: Totals,
}

impl ValidationReport {
    /// Fold per-table statistics into one report. Later entries for a table replace earlier ones.
    pub fn aggregate<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (Table, PartitionStats)>,
    {
        let per_table: BTreeMap<Table, TableReport> = tables
            .into_iter()
            .map(|(table, stats)| (table, TableReport::from(stats)))
            .collect();

        let totals = per_table.values().fold(Totals::default(), |acc, t| Totals {
            rows_processed: acc.rows_processed + t.clean_count + t.quarantine_count,
            clean_count: acc.clean_count + t.clean_count,
            quarantine_count: acc.quarantine_count + t.quarantine_count,
        });

        Self { per_table, totals }
    }

    /// Report over finished partitions, including every row's [`RecordOutcome`].
    pub fn from_partitions<'a, I>(partitions: I) -> Self
    where
        I: IntoIterator<Item = &'a TablePartition>,
    {
        let partitions: Vec<&TablePartition> = partitions.into_iter().collect();
        let mut report = Self::aggregate(partitions.iter().map(|p| (p.table, p.stats())));
        for partition in partitions {
            if let Some(table) = report.per_table.get_mut(&partition.table) {
                table.records = RecordOutcome::from_partition(partition);
            }
        }
        report
    }

    pub fn table(&self, table: Table) -> Option<&TableReport> {
        self.per_table.get(&table)
    }

    /// Pretty-printed JSON form.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::{RecordOutcome, ValidationReport};
    use crate::tables::Table;
    use crate::types::{DataSet, Value};
    use crate::validation::{PartitionStats, TablePartition};

    fn stats(clean: usize, quarantined: usize, reasons: &[(&str, usize)]) -> PartitionStats {
        PartitionStats {
            clean_count: clean,
            quarantine_count: quarantined,
            reasons: reasons.iter().map(|(r, n)| (r.to_string(), *n)).collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn totals_sum_every_table() {
        let report = ValidationReport::aggregate([
            (Table::Recipes, stats(3, 1, &[("missing name", 1)])),
            (Table::Users, stats(2, 2, &[("duplicate user_id", 2)])),
        ]);
        assert_eq!(report.totals.rows_processed, 8);
        assert_eq!(report.totals.clean_count, 5);
        assert_eq!(report.totals.quarantine_count, 3);
        assert_eq!(report.table(Table::Users).unwrap().reasons["duplicate user_id"], 2);
        assert!(report.table(Table::Steps).is_none());
    }

    #[test]
    fn serializes_with_table_names_as_keys() {
        let report = ValidationReport::aggregate([(Table::Interactions, stats(0, 1, &[("unknown user_id", 1)]))]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({
                "per_table": {
                    "interactions": {
                        "clean_count": 0,
                        "quarantine_count": 1,
                        "reasons": {"unknown user_id": 1}
                    }
                },
                "totals": {"rows_processed": 1, "clean_count": 0, "quarantine_count": 1}
            })
        );
        let back: ValidationReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    #[test]
    fn partitions_contribute_one_record_per_row() {
        let mut users = TablePartition::empty(Table::Users);
        let width = users.clean.schema.fields.len();
        let mut clean_row = vec![Value::Null; width];
        clean_row[0] = utf8("u1");
        users.clean = DataSet::new(users.clean.schema.clone(), vec![clean_row]);
        users.quarantine.rows.push(vec![Value::Null; width]);
        users.quarantine.reasons.push(vec!["missing user_id".to_string(), "missing name".to_string()]);

        let report = ValidationReport::from_partitions([&users]);
        let records = &report.table(Table::Users).unwrap().records;
        assert_eq!(
            records,
            &vec![
                RecordOutcome { id: Some("u1".to_string()), is_valid: true, errors: Vec::new() },
                RecordOutcome {
                    id: None,
                    is_valid: false,
                    errors: vec!["missing user_id".to_string(), "missing name".to_string()],
                },
            ]
        );
        assert_eq!(report.totals.rows_processed, records.len());

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["per_table"]["users"]["records"][0], json!({"id": "u1", "is_valid": true, "errors": []}));
        let back: ValidationReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn step_records_combine_recipe_and_step_number() {
        let mut steps = TablePartition::empty(Table::Steps);
        let row = vec![utf8("r1"), Value::Int64(2), utf8("Stir"), Value::Int64(3)];
        steps.clean = DataSet::new(steps.clean.schema.clone(), vec![row]);
        let records = RecordOutcome::from_partition(&steps);
        assert_eq!(records[0].id.as_deref(), Some("r1:2"));
    }

    #[test]
    fn empty_input_gives_zero_totals() {
        let report = ValidationReport::aggregate(Vec::<(Table, PartitionStats)>::new());
        assert!(report.per_table.is_empty());
        assert_eq!(report.totals.rows_processed, 0);
    }
}
