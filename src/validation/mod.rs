//! Row partitioning into clean and quarantined streams.
//!
//! The [`Validator`] evaluates every compiled rule of a table against every row and routes the
//! row, unmodified, to exactly one side of a [`TablePartition`]. Quarantined rows keep all of
//! their fields and carry the failure reasons in declared rule order.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::rules::{ParentKeys, RuleEngine, TableScan};
use crate::tables::{REASONS_COLUMN, REASONS_SEPARATOR, Table};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Rows rejected by validation, each paired with its failure reasons.
#[derive(Debug, Clone, PartialEq)]
pub struct Quarantine {
    pub schema: Schema,
    pub rows: Vec<Vec<Value>>,
    /// `reasons[i]` belongs to `rows[i]` and is never empty.
    pub reasons: Vec<Vec<String>>,
}

impl Quarantine {
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            reasons: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn push(&mut self, row: Vec<Value>, reasons: Vec<String>) {
        debug_assert!(!reasons.is_empty(), "quarantined row without a reason");
        self.rows.push(row);
        self.reasons.push(reasons);
    }

    /// Table form with an extra trailing `reasons` column (reasons joined with `"; "`).
    pub fn to_flat_dataset(&self) -> DataSet {
        let mut fields = self.schema.fields.clone();
        fields.push(Field::new(REASONS_COLUMN, DataType::Utf8));
        let rows = self
            .rows
            .iter()
            .zip(&self.reasons)
            .map(|(row, reasons)| {
                let mut flat = row.clone();
                flat.push(Value::Utf8(reasons.join(REASONS_SEPARATOR)));
                flat
            })
            .collect();
        DataSet::new(Schema::new(fields), rows)
    }
}

/// Per-table counts consumed by the report aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub clean_count: usize,
    pub quarantine_count: usize,
    /// Number of quarantined rows carrying each reason.
    pub reasons: BTreeMap<String, usize>,
}

impl PartitionStats {
    pub fn rows_processed(&self) -> usize {
        self.clean_count + self.quarantine_count
    }
}

/// Validation result of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePartition {
    pub table: Table,
    pub clean: DataSet,
    pub quarantine: Quarantine,
}

impl TablePartition {
    /// An empty partition for `table`.
    pub fn empty(table: Table) -> Self {
        Self {
            table,
            clean: DataSet::empty(table.schema()),
            quarantine: Quarantine::empty(table.schema()),
        }
    }

    pub fn row_count(&self) -> usize {
        self.clean.row_count() + self.quarantine.row_count()
    }

    /// Route one row by its (possibly empty) failure reasons.
    pub(crate) fn route(&mut self, row: Vec<Value>, reasons: Vec<String>) {
        if reasons.is_empty() {
            self.clean.rows.push(row);
        } else {
            self.quarantine.push(row, reasons);
        }
    }

    /// Append `other`'s rows after this partition's rows.
    pub(crate) fn append(&mut self, other: TablePartition) {
        self.clean.rows.extend(other.clean.rows);
        self.quarantine.rows.extend(other.quarantine.rows);
        self.quarantine.reasons.extend(other.quarantine.reasons);
    }

    pub fn stats(&self) -> PartitionStats {
        let mut reasons = BTreeMap::new();
        for reason in self.quarantine.reasons.iter().flatten() {
            *reasons.entry(reason.clone()).or_insert(0) += 1;
        }
        PartitionStats {
            clean_count: self.clean.row_count(),
            quarantine_count: self.quarantine.row_count(),
            reasons,
        }
    }
}

/// Applies a [`RuleEngine`] to normalized tables.
#[derive(Debug, Clone)]
pub struct Validator {
    engine: RuleEngine,
}

impl Validator {
    pub fn new(engine: RuleEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Prepare a scan of `dataset`; used by chunked execution to share one scan across chunks.
    pub fn scan<'a>(&'a self, table: Table, dataset: &DataSet, parent_keys: &'a ParentKeys) -> TableScan<'a> {
        self.engine.scan(table, dataset, parent_keys)
    }

    /// Partition `dataset` (rows of `table`) into clean and quarantined rows.
    pub fn validate(&self, table: Table, dataset: &DataSet, parent_keys: &ParentKeys) -> TablePartition {
        let scan = self.scan(table, dataset, parent_keys);
        let partition = partition_rows(table, &dataset.rows, &scan);
        info!(
            table = %table,
            clean = partition.clean.row_count(),
            quarantined = partition.quarantine.row_count(),
            "validated table"
        );
        partition
    }
}

/// Evaluate `rows` with an already prepared scan, preserving row order.
pub(crate) fn partition_rows(table: Table, rows: &[Vec<Value>], scan: &TableScan<'_>) -> TablePartition {
    let mut partition = TablePartition::empty(table);
    for row in rows {
        let reasons = scan.check_row(row);
        if !reasons.is_empty() {
            debug!(table = %table, reasons = ?reasons, "quarantining row");
        }
        partition.route(row.clone(), reasons);
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::Validator;
    use crate::rules::{ParentKeys, RuleEngine};
    use crate::tables::Table;
    use crate::types::{DataSet, Value};

    fn user(id: Option<&str>, name: &str) -> Vec<Value> {
        let mut row = vec![Value::Null; 8];
        row[0] = id.map_or(Value::Null, |s| Value::Utf8(s.to_string()));
        row[1] = Value::Utf8(name.to_string());
        row
    }

    fn validator() -> Validator {
        Validator::new(RuleEngine::standard().unwrap())
    }

    #[test]
    fn partitions_every_row_exactly_once() {
        let ds = DataSet::new(
            Table::Users.schema(),
            vec![
                user(Some("u1"), "Asha"),
                user(None, "Nobody"),
                user(Some("u2"), ""),
                user(Some("u3"), "Ravi"),
            ],
        );
        let part = validator().validate(Table::Users, &ds, &ParentKeys::new());
        assert_eq!(part.row_count(), ds.row_count());
        assert_eq!(part.clean.rows, vec![ds.rows[0].clone(), ds.rows[3].clone()]);
        assert_eq!(part.quarantine.rows, vec![ds.rows[1].clone(), ds.rows[2].clone()]);
        assert_eq!(part.quarantine.reasons[0], vec!["missing user_id"]);
        assert_eq!(part.quarantine.reasons[1], vec!["missing name"]);
    }

    #[test]
    fn stats_count_reasons_per_row() {
        let ds = DataSet::new(
            Table::Users.schema(),
            vec![user(Some("u1"), "A"), user(Some("u1"), ""), user(Some("Bad Id"), "C")],
        );
        let stats = validator().validate(Table::Users, &ds, &ParentKeys::new()).stats();
        assert_eq!(stats.clean_count, 1);
        assert_eq!(stats.quarantine_count, 2);
        assert_eq!(stats.rows_processed(), 3);
        assert_eq!(stats.reasons.get("duplicate user_id"), Some(&2));
        assert_eq!(stats.reasons.get("missing name"), Some(&1));
        assert_eq!(stats.reasons.get("malformed user_id"), Some(&1));
    }

    #[test]
    fn flat_quarantine_appends_joined_reasons() {
        let ds = DataSet::new(Table::Users.schema(), vec![user(Some("u1"), ""), user(Some("u1"), "")]);
        let part = validator().validate(Table::Users, &ds, &ParentKeys::new());
        let flat = part.quarantine.to_flat_dataset();
        assert_eq!(flat.schema.fields.len(), 9);
        assert_eq!(
            flat.value(0, "reasons"),
            Some(&Value::Utf8("duplicate user_id; missing name".to_string()))
        );
    }

    #[test]
    fn empty_table_yields_empty_partition() {
        let part = validator().validate(Table::Steps, &DataSet::empty(Table::Steps.schema()), &ParentKeys::new());
        assert_eq!(part.row_count(), 0);
        assert_eq!(part.clean.schema, Table::Steps.schema());
    }
}
