use std::collections::{BTreeMap, BTreeSet};

use crate::normalize::NormalizedBatch;
use crate::tables::Table;
use crate::types::DataSet;

/// Key sets of parent tables, used by referential rules.
///
/// Keys are taken from every normalized row of the run, clean or not: a dependent row is judged
/// on whether its parent exists, independently of whether that parent passes validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentKeys {
    keys: BTreeMap<Table, BTreeSet<String>>,
}

impl ParentKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the recipe and user key sets of a normalized batch.
    pub fn from_batch(batch: &NormalizedBatch) -> Self {
        let mut keys = Self::new();
        for table in [Table::Recipes, Table::Users] {
            keys.insert_from(table, batch.table(table));
        }
        keys
    }

    /// Register every non-null key of `table`'s key column found in `dataset`.
    pub fn insert_from(&mut self, table: Table, dataset: &DataSet) {
        let set = self.keys.entry(table).or_default();
        if let Some(column) = dataset.column(table.key_column()) {
            set.extend(column.filter_map(|v| v.key()));
        }
    }

    /// Register one key.
    pub fn insert(&mut self, table: Table, key: impl Into<String>) {
        self.keys.entry(table).or_default().insert(key.into());
    }

    /// Builder form of [`Self::insert`].
    pub fn with_key(mut self, table: Table, key: impl Into<String>) -> Self {
        self.insert(table, key);
        self
    }

    /// Returns `true` when `key` is a known key of `table`. Unregistered tables know no keys.
    pub fn contains(&self, table: Table, key: &str) -> bool {
        self.keys.get(&table).is_some_and(|set| set.contains(key))
    }

    /// Number of known keys for `table`.
    pub fn len(&self, table: Table) -> usize {
        self.keys.get(&table).map_or(0, BTreeSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::ParentKeys;
    use crate::tables::Table;
    use crate::types::{DataSet, Value};

    #[test]
    fn collects_non_null_keys() {
        let ds = DataSet::new(
            Table::Users.schema(),
            vec![
                {
                    let mut row = vec![Value::Null; 8];
                    row[0] = Value::Utf8("u1".to_string());
                    row
                },
                vec![Value::Null; 8],
            ],
        );
        let mut keys = ParentKeys::new();
        keys.insert_from(Table::Users, &ds);
        assert!(keys.contains(Table::Users, "u1"));
        assert_eq!(keys.len(Table::Users), 1);
        assert!(!keys.contains(Table::Recipes, "u1"));
    }

    #[test]
    fn builder_registers_keys() {
        let keys = ParentKeys::new().with_key(Table::Recipes, "r1");
        assert!(keys.contains(Table::Recipes, "r1"));
        assert_eq!(keys.len(Table::Users), 0);
    }
}
