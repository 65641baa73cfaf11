//! Declarative validation rules.
//!
//! A [`Rule`] is plain data: `(table, field, category, check, reason)`. The standard set lives in
//! [`RuleSet::standard`]; alternative sets can be loaded from JSON. Rules are compiled against
//! the table schemas by [`RuleEngine::new`], which rejects rules that name unknown fields.
//!
//! Each check judges one concern only. Non-required checks pass on blank values (absence is the
//! `Required` rule's business) and range/enum checks pass on values of the wrong type (that is
//! the type rule's business), so one defect produces one reason.

mod engine;
mod keys;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::tables::Table;

pub use engine::{CompiledRule, RuleEngine, TableScan};
pub use keys::ParentKeys;

/// Broad class of a rule, used for report breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Field present and non-blank.
    Required,
    /// Field holds the expected type after coercion.
    Type,
    /// Value within an enumerated set or numeric bound.
    Domain,
    /// Condition spanning several fields, dependent rows or sibling rows.
    Structural,
    /// Foreign key resolves within the run.
    Referential,
}

/// Predicate applied to one field of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Check {
    /// Value is neither null nor blank text.
    Required,
    /// Value is an integer.
    Integer,
    /// Value is numeric.
    Number,
    /// Value is a boolean.
    Boolean,
    /// Value is an RFC 3339 timestamp.
    Timestamp,
    /// Value is a canonical identifier (`[a-z0-9_-]+`).
    Identifier,
    /// Numeric value within inclusive bounds.
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Value is one of an enumerated set (case-sensitive).
    OneOf { values: Vec<String> },
    /// Value must be blank unless `field` equals `equals`.
    NullUnless { field: String, equals: String },
    /// Value must be present when `field` equals `equals`.
    RequiredWhen { field: String, equals: String },
    /// Value occurs once in the table, or once per distinct value of `within`.
    Unique {
        #[serde(default)]
        within: Option<String>,
    },
    /// Value is a key of `table` produced in the same run.
    References { table: Table },
}

/// One declarative rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub table: Table,
    pub field: String,
    pub category: RuleCategory,
    pub check: Check,
    /// Reason recorded on quarantined rows that fail this rule.
    pub reason: String,
}

impl Rule {
    pub fn new(
        table: Table,
        field: impl Into<String>,
        category: RuleCategory,
        check: Check,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            table,
            field: field.into(),
            category,
            check,
            reason: reason.into(),
        }
    }

    /// Short identifier for diagnostics: `table.field (reason)`.
    pub fn label(&self) -> String {
        format!("{}.{} ({})", self.table, self.field, self.reason)
    }
}

/// An ordered list of rules. Order within a table is the order reasons are reported in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

/// Allowed recipe difficulties.
pub const DIFFICULTIES: [&str; 3] = ["Easy", "Medium", "Hard"];

/// Allowed interaction types.
pub const INTERACTION_TYPES: [&str; 4] = ["view", "like", "cook_attempt", "rating"];

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parse a rule set from JSON (`{"rules": [...]}`).
    pub fn from_json_str(input: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Read a rule set from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rules declared for `table`, in declaration order.
    pub fn for_table(&self, table: Table) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.table == table)
    }

    /// The built-in rule set for the five recipe tables.
    pub fn standard() -> Self {
        use Check::{Boolean, Identifier, Integer, Number, Required, Timestamp};
        use RuleCategory as C;

        fn rule(table: Table, field: &str, category: RuleCategory, check: Check, reason: &str) -> Rule {
            Rule::new(table, field, category, check, reason)
        }
        fn at_least(min: f64) -> Check {
            Check::Range {
                min: Some(min),
                max: None,
            }
        }
        fn one_of(values: &[&str]) -> Check {
            Check::OneOf {
                values: values.iter().map(|v| v.to_string()).collect(),
            }
        }
        fn unique(within: Option<&str>) -> Check {
            Check::Unique {
                within: within.map(str::to_string),
            }
        }
        fn null_unless(field: &str, equals: &str) -> Check {
            Check::NullUnless {
                field: field.to_string(),
                equals: equals.to_string(),
            }
        }
        fn required_when(field: &str, equals: &str) -> Check {
            Check::RequiredWhen {
                field: field.to_string(),
                equals: equals.to_string(),
            }
        }
        let references = |table: Table| Check::References { table };

        let r = Table::Recipes;
        let g = Table::Ingredients;
        let s = Table::Steps;
        let u = Table::Users;
        let i = Table::Interactions;

        Self::new(vec![
            // recipes
            rule(r, "recipe_id", C::Required, Required, "missing recipe_id"),
            rule(r, "recipe_id", C::Domain, Identifier, "malformed recipe_id"),
            rule(r, "recipe_id", C::Structural, unique(None), "duplicate recipe_id"),
            rule(r, "name", C::Required, Required, "missing name"),
            rule(r, "prep_time_minutes", C::Required, Required, "missing prep_time_minutes"),
            rule(r, "prep_time_minutes", C::Type, Integer, "non-numeric prep_time_minutes"),
            rule(r, "prep_time_minutes", C::Domain, at_least(0.0), "negative prep_time_minutes"),
            rule(r, "cook_time_minutes", C::Required, Required, "missing cook_time_minutes"),
            rule(r, "cook_time_minutes", C::Type, Integer, "non-numeric cook_time_minutes"),
            rule(r, "cook_time_minutes", C::Domain, at_least(0.0), "negative cook_time_minutes"),
            rule(r, "servings", C::Required, Required, "missing servings"),
            rule(r, "servings", C::Type, Integer, "non-numeric servings"),
            rule(r, "servings", C::Domain, at_least(1.0), "non-positive servings"),
            rule(r, "difficulty", C::Required, Required, "missing difficulty"),
            rule(r, "difficulty", C::Domain, one_of(&DIFFICULTIES), "invalid difficulty"),
            rule(r, "ingredient_count", C::Structural, at_least(1.0), "recipe has no ingredients"),
            rule(r, "step_count", C::Structural, at_least(1.0), "recipe has no steps"),
            // ingredients
            rule(g, "recipe_id", C::Required, Required, "missing recipe_id"),
            rule(g, "recipe_id", C::Referential, references(r), "unknown recipe_id"),
            rule(g, "ingredient_id", C::Structural, unique(None), "duplicate ingredient_id"),
            rule(g, "name", C::Required, Required, "missing name"),
            rule(g, "quantity", C::Required, Required, "missing quantity"),
            rule(g, "quantity", C::Type, Number, "non-numeric quantity"),
            rule(g, "quantity", C::Domain, at_least(0.0), "negative quantity"),
            rule(g, "unit", C::Required, Required, "missing unit"),
            // steps
            rule(s, "recipe_id", C::Required, Required, "missing recipe_id"),
            rule(s, "recipe_id", C::Referential, references(r), "unknown recipe_id"),
            rule(s, "step_no", C::Required, Required, "missing step_no"),
            rule(s, "step_no", C::Type, Integer, "non-integer step_no"),
            rule(s, "step_no", C::Domain, at_least(1.0), "step_no below 1"),
            rule(s, "step_no", C::Structural, unique(Some("recipe_id")), "duplicate step_no"),
            rule(s, "instruction", C::Required, Required, "missing instruction"),
            rule(s, "duration_minutes", C::Type, Integer, "non-integer duration_minutes"),
            rule(s, "duration_minutes", C::Domain, at_least(0.0), "negative duration_minutes"),
            // users
            rule(u, "user_id", C::Required, Required, "missing user_id"),
            rule(u, "user_id", C::Domain, Identifier, "malformed user_id"),
            rule(u, "user_id", C::Structural, unique(None), "duplicate user_id"),
            rule(u, "name", C::Required, Required, "missing name"),
            // interactions
            rule(i, "interaction_id", C::Required, Required, "missing interaction_id"),
            rule(i, "interaction_id", C::Structural, unique(None), "duplicate interaction_id"),
            rule(i, "user_id", C::Required, Required, "missing user_id"),
            rule(i, "user_id", C::Referential, references(u), "unknown user_id"),
            rule(i, "recipe_id", C::Required, Required, "missing recipe_id"),
            rule(i, "recipe_id", C::Referential, references(r), "unknown recipe_id"),
            rule(i, "type", C::Required, Required, "missing type"),
            rule(i, "type", C::Domain, one_of(&INTERACTION_TYPES), "invalid type"),
            rule(i, "timestamp", C::Required, Required, "missing timestamp"),
            rule(i, "timestamp", C::Type, Timestamp, "invalid timestamp"),
            rule(i, "rating", C::Type, Number, "non-numeric rating"),
            rule(
                i,
                "rating",
                C::Domain,
                Check::Range {
                    min: Some(0.0),
                    max: Some(5.0),
                },
                "rating out of range",
            ),
            rule(i, "rating", C::Structural, required_when("type", "rating"), "missing rating"),
            rule(i, "rating", C::Structural, null_unless("type", "rating"), "rating on non-rating interaction"),
            rule(i, "like", C::Type, Boolean, "non-boolean like"),
            rule(i, "like", C::Structural, required_when("type", "like"), "missing like"),
            rule(i, "like", C::Structural, null_unless("type", "like"), "like on non-like interaction"),
        ])
    }
}
