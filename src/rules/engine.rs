//! Rule compilation and evaluation.
//!
//! [`RuleEngine::new`] resolves every rule's field names to column indices once, failing fast
//! on a broken rule set. [`RuleEngine::scan`] then prepares the table-wide context some rules
//! need (duplicate detection) and evaluates rows against it.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::DateTime;

use crate::error::{PipelineError, PipelineResult};
use crate::normalize::ids::is_well_formed_id;
use crate::tables::{REASONS_SEPARATOR, Table};
use crate::types::{DataSet, Value};

use super::{Check, ParentKeys, Rule, RuleCategory, RuleSet};

/// Check with field names resolved to column indices.
#[derive(Debug, Clone, PartialEq)]
enum Op {
    Required,
    Integer,
    Number,
    Boolean,
    Timestamp,
    Identifier,
    Range { min: Option<f64>, max: Option<f64> },
    OneOf(Vec<String>),
    NullUnless { column: usize, equals: String },
    RequiredWhen { column: usize, equals: String },
    Unique { within: Option<usize> },
    References(Table),
}

/// A rule bound to its table's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    rule: Rule,
    column: usize,
    op: Op,
}

impl CompiledRule {
    /// The declarative rule this was compiled from.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn reason(&self) -> &str {
        &self.rule.reason
    }

    pub fn category(&self) -> RuleCategory {
        self.rule.category
    }
}

/// Compiled, per-table rule lists.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    by_table: BTreeMap<Table, Vec<CompiledRule>>,
}

impl RuleEngine {
    /// Compile `rules` against the table schemas.
    ///
    /// Fails with [`PipelineError::RuleConfig`] when a rule names a field its table does not
    /// have, has an empty reason, or carries an unusable check (empty enum, inverted range).
    pub fn new(rules: &RuleSet) -> PipelineResult<Self> {
        let mut by_table: BTreeMap<Table, Vec<CompiledRule>> = BTreeMap::new();
        for rule in &rules.rules {
            let compiled = compile(rule)?;
            by_table.entry(rule.table).or_default().push(compiled);
        }
        Ok(Self { by_table })
    }

    /// Engine over [`RuleSet::standard`].
    pub fn standard() -> PipelineResult<Self> {
        Self::new(&RuleSet::standard())
    }

    /// Compiled rules for `table`, in declaration order.
    pub fn rules_for(&self, table: Table) -> &[CompiledRule] {
        self.by_table.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Prepare evaluation of `dataset` as `table`.
    ///
    /// Uniqueness rules look at the whole dataset here, so rows can afterwards be checked
    /// independently and in any order.
    pub fn scan<'a>(&'a self, table: Table, dataset: &DataSet, parent_keys: &'a ParentKeys) -> TableScan<'a> {
        let rules = self.rules_for(table);
        let duplicates = rules
            .iter()
            .map(|compiled| match compiled.op {
                Op::Unique { within } => Some(duplicate_keys(dataset, compiled.column, within)),
                _ => None,
            })
            .collect();
        TableScan {
            rules,
            duplicates,
            parent_keys,
        }
    }
}

type GroupedKey = (Option<String>, String);

/// Evaluation context for the rows of one table.
#[derive(Debug)]
pub struct TableScan<'a> {
    rules: &'a [CompiledRule],
    /// Per rule: keys occurring more than once (only for uniqueness rules).
    duplicates: Vec<Option<HashSet<GroupedKey>>>,
    parent_keys: &'a ParentKeys,
}

impl<'a> TableScan<'a> {
    /// Rules that `row` fails, in declaration order.
    pub fn failures(&self, row: &[Value]) -> Vec<&'a CompiledRule> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(idx, compiled)| !self.passes(*idx, compiled, row))
            .map(|(_, compiled)| compiled)
            .collect()
    }

    /// Failure reasons for `row`, in declaration order. Empty means the row is clean.
    pub fn check_row(&self, row: &[Value]) -> Vec<String> {
        self.failures(row)
            .into_iter()
            .map(|compiled| compiled.rule.reason.clone())
            .collect()
    }

    fn passes(&self, idx: usize, compiled: &CompiledRule, row: &[Value]) -> bool {
        let value = row.get(compiled.column).unwrap_or(&Value::Null);
        if value.is_blank() {
            return match &compiled.op {
                Op::Required => false,
                Op::RequiredWhen { column, equals } => !field_equals(row, *column, equals),
                _ => true,
            };
        }

        match &compiled.op {
            Op::Required | Op::RequiredWhen { .. } => true,
            Op::Integer => matches!(value, Value::Int64(_)),
            Op::Number => value.as_f64().is_some(),
            Op::Boolean => matches!(value, Value::Bool(_)),
            Op::Timestamp => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s.trim()).is_ok()),
            Op::Identifier => value.as_str().is_some_and(is_well_formed_id),
            Op::Range { min, max } => match value.as_f64() {
                Some(v) => min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m),
                None => true,
            },
            Op::OneOf(values) => match value.as_str() {
                Some(s) => values.iter().any(|allowed| allowed == s),
                None => true,
            },
            Op::NullUnless { column, equals } => field_equals(row, *column, equals),
            Op::Unique { within } => {
                let key = grouped_key(row, compiled.column, *within);
                match (&self.duplicates[idx], key) {
                    (Some(dups), Some(key)) => !dups.contains(&key),
                    _ => true,
                }
            }
            Op::References(parent) => match value.key() {
                Some(key) => self.parent_keys.contains(*parent, &key),
                None => true,
            },
        }
    }
}

fn compile(rule: &Rule) -> PipelineResult<CompiledRule> {
    let schema = rule.table.schema();
    let resolve = |field: &str| {
        schema.index_of(field).ok_or_else(|| {
            PipelineError::rule_config(
                rule.label(),
                format!("table '{}' has no field '{field}'", rule.table),
            )
        })
    };

    let column = resolve(&rule.field)?;
    if rule.reason.trim().is_empty() {
        return Err(PipelineError::rule_config(rule.label(), "reason must not be empty"));
    }
    // Flattened quarantine output joins reasons with the separator.
    if rule.reason.contains(REASONS_SEPARATOR) {
        return Err(PipelineError::rule_config(
            rule.label(),
            format!("reason must not contain '{REASONS_SEPARATOR}'"),
        ));
    }

    let op = match &rule.check {
        Check::Required => Op::Required,
        Check::Integer => Op::Integer,
        Check::Number => Op::Number,
        Check::Boolean => Op::Boolean,
        Check::Timestamp => Op::Timestamp,
        Check::Identifier => Op::Identifier,
        Check::Range { min, max } => {
            match (min, max) {
                (None, None) => {
                    return Err(PipelineError::rule_config(rule.label(), "range needs a min or a max"));
                }
                (Some(lo), Some(hi)) if lo > hi => {
                    return Err(PipelineError::rule_config(
                        rule.label(),
                        format!("range min {lo} is greater than max {hi}"),
                    ));
                }
                _ => {}
            }
            Op::Range { min: *min, max: *max }
        }
        Check::OneOf { values } => {
            if values.is_empty() {
                return Err(PipelineError::rule_config(rule.label(), "one_of needs at least one value"));
            }
            Op::OneOf(values.clone())
        }
        Check::NullUnless { field, equals } => Op::NullUnless {
            column: resolve(field)?,
            equals: equals.clone(),
        },
        Check::RequiredWhen { field, equals } => Op::RequiredWhen {
            column: resolve(field)?,
            equals: equals.clone(),
        },
        Check::Unique { within } => Op::Unique {
            within: within.as_deref().map(resolve).transpose()?,
        },
        Check::References { table } => Op::References(*table),
    };

    Ok(CompiledRule {
        rule: rule.clone(),
        column,
        op,
    })
}

fn field_equals(row: &[Value], column: usize, equals: &str) -> bool {
    row.get(column).and_then(Value::as_str) == Some(equals)
}

fn grouped_key(row: &[Value], column: usize, within: Option<usize>) -> Option<GroupedKey> {
    let value = row.get(column)?.key()?;
    let group = within.and_then(|g| row.get(g)).and_then(Value::key);
    Some((group, value))
}

fn duplicate_keys(dataset: &DataSet, column: usize, within: Option<usize>) -> HashSet<GroupedKey> {
    let mut counts: HashMap<GroupedKey, usize> = HashMap::new();
    for row in &dataset.rows {
        if row.get(column).is_some_and(Value::is_blank) {
            continue;
        }
        if let Some(key) = grouped_key(row, column, within) {
            *counts.entry(key).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(key, _)| key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::RuleEngine;
    use crate::error::PipelineError;
    use crate::rules::{Check, ParentKeys, Rule, RuleCategory, RuleSet};
    use crate::tables::Table;
    use crate::types::{DataSet, Value};

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn interaction(kind: &str, like: Value, rating: Value) -> Vec<Value> {
        vec![
            utf8("i1"),
            utf8("u1"),
            utf8("r1"),
            utf8(kind),
            like,
            rating,
            utf8("2024-01-01T00:00:00Z"),
        ]
    }

    fn keys() -> ParentKeys {
        ParentKeys::new()
            .with_key(Table::Users, "u1")
            .with_key(Table::Recipes, "r1")
    }

    fn check(table: Table, rows: Vec<Vec<Value>>) -> Vec<Vec<String>> {
        let engine = RuleEngine::standard().unwrap();
        let ds = DataSet::new(table.schema(), rows);
        let keys = keys();
        let scan = engine.scan(table, &ds, &keys);
        ds.rows.iter().map(|row| scan.check_row(row)).collect()
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        let rows = [5.0, 0.0, 6.0, -0.5]
            .into_iter()
            .enumerate()
            .map(|(n, rating)| {
                let mut row = interaction("rating", Value::Null, Value::Float64(rating));
                row[0] = utf8(&format!("i{n}"));
                row
            })
            .collect();
        let out = check(Table::Interactions, rows);
        assert!(out[0].is_empty());
        assert!(out[1].is_empty());
        assert_eq!(out[2], vec!["rating out of range"]);
        assert_eq!(out[3], vec!["rating out of range"]);
    }

    #[test]
    fn rating_and_like_are_tied_to_interaction_type() {
        let out = check(
            Table::Interactions,
            vec![interaction("view", Value::Bool(true), Value::Float64(4.0))],
        );
        assert_eq!(out[0], vec!["rating on non-rating interaction", "like on non-like interaction"]);

        let out = check(Table::Interactions, vec![interaction("rating", Value::Null, Value::Null)]);
        assert_eq!(out[0], vec!["missing rating"]);

        let out = check(Table::Interactions, vec![interaction("like", utf8("sure"), Value::Null)]);
        assert_eq!(out[0], vec!["non-boolean like"]);
    }

    #[test]
    fn unknown_foreign_keys_are_reported_once() {
        let mut row = interaction("view", Value::Null, Value::Null);
        row[1] = utf8("u_unknown");
        let out = check(Table::Interactions, vec![row]);
        assert_eq!(out[0], vec!["unknown user_id"]);

        let mut row = interaction("view", Value::Null, Value::Null);
        row[1] = Value::Null;
        let out = check(Table::Interactions, vec![row]);
        assert_eq!(out[0], vec!["missing user_id"]);
    }

    #[test]
    fn invalid_timestamp_and_type_are_flagged() {
        let mut row = interaction("share", Value::Null, Value::Null);
        row[6] = utf8("yesterday");
        let out = check(Table::Interactions, vec![row]);
        assert_eq!(out[0], vec!["invalid type", "invalid timestamp"]);
    }

    #[test]
    fn duplicate_step_numbers_are_scoped_to_recipe() {
        let step = |recipe: &str, no: i64| vec![utf8(recipe), Value::Int64(no), utf8("Stir"), Value::Null];
        let mut rows = vec![step("r1", 1), step("r1", 1), step("r1", 2)];
        rows.push(step("r2", 1));
        let out = check(Table::Steps, rows);
        assert_eq!(out[0], vec!["duplicate step_no"]);
        assert_eq!(out[1], vec!["duplicate step_no"]);
        assert!(out[2].is_empty());
        assert_eq!(out[3], vec!["unknown recipe_id"]);
    }

    #[test]
    fn pass_through_values_fail_type_but_not_range() {
        let row = vec![utf8("r1"), utf8("nope"), utf8("Stir"), Value::Int64(-3)];
        let out = check(Table::Steps, vec![row]);
        assert_eq!(out[0], vec!["non-integer step_no", "negative duration_minutes"]);
    }

    #[test]
    fn unknown_field_is_a_configuration_error() {
        let rules = RuleSet::new(vec![Rule::new(
            Table::Recipes,
            "calories",
            RuleCategory::Required,
            Check::Required,
            "missing calories",
        )]);
        let err = RuleEngine::new(&rules).unwrap_err();
        assert!(matches!(err, PipelineError::RuleConfig { .. }));
        assert!(err.to_string().contains("has no field 'calories'"));
    }

    #[test]
    fn unknown_dependent_field_is_a_configuration_error() {
        let rules = RuleSet::new(vec![Rule::new(
            Table::Interactions,
            "rating",
            RuleCategory::Structural,
            Check::NullUnless {
                field: "kind".to_string(),
                equals: "rating".to_string(),
            },
            "rating without type",
        )]);
        assert!(RuleEngine::new(&rules).is_err());
    }

    #[test]
    fn inverted_range_and_empty_reason_are_rejected() {
        let inverted = Rule::new(
            Table::Interactions,
            "rating",
            RuleCategory::Domain,
            Check::Range {
                min: Some(5.0),
                max: Some(0.0),
            },
            "bad rating",
        );
        assert!(RuleEngine::new(&RuleSet::new(vec![inverted])).is_err());

        let unnamed = Rule::new(Table::Users, "name", RuleCategory::Required, Check::Required, " ");
        assert!(RuleEngine::new(&RuleSet::new(vec![unnamed])).is_err());
    }

    #[test]
    fn reason_containing_the_reasons_separator_is_rejected() {
        let ambiguous = Rule::new(
            Table::Users,
            "name",
            RuleCategory::Required,
            Check::Required,
            "missing name; check source",
        );
        let err = RuleEngine::new(&RuleSet::new(vec![ambiguous])).unwrap_err();
        match err {
            PipelineError::RuleConfig { message, .. } => assert!(message.contains("; "), "{message}"),
            other => panic!("unexpected error {other:?}"),
        }

        let plain = Rule::new(Table::Users, "name", RuleCategory::Required, Check::Required, "missing name;x");
        assert!(RuleEngine::new(&RuleSet::new(vec![plain])).is_ok());
    }

    #[test]
    fn rules_keep_declaration_order() {
        let engine = RuleEngine::standard().unwrap();
        let reasons: Vec<&str> = engine
            .rules_for(Table::Users)
            .iter()
            .map(|r| r.reason())
            .collect();
        assert_eq!(
            reasons,
            vec!["missing user_id", "malformed user_id", "duplicate user_id", "missing name"]
        );
    }
}
