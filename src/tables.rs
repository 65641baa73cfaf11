//! The five relational tables produced by normalization and their fixed schemas.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{DataType, Field, Schema};

/// Separator used when a quarantined row's reasons are flattened into one column.
pub const REASONS_SEPARATOR: &str = "; ";

/// Name of the extra column carried by flattened quarantine output.
pub const REASONS_COLUMN: &str = "reasons";

/// A normalized table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Recipes,
    Ingredients,
    Steps,
    Users,
    Interactions,
}

impl Table {
    /// All tables, parents before children.
    pub const ALL: [Table; 5] = [
        Table::Recipes,
        Table::Ingredients,
        Table::Steps,
        Table::Users,
        Table::Interactions,
    ];

    /// Table name as used in reports and output file names.
    pub fn name(self) -> &'static str {
        match self {
            Table::Recipes => "recipes",
            Table::Ingredients => "ingredients",
            Table::Steps => "steps",
            Table::Users => "users",
            Table::Interactions => "interactions",
        }
    }

    /// Primary key column of a parent table, used to build referential key sets.
    pub fn key_column(self) -> &'static str {
        match self {
            Table::Recipes | Table::Steps => "recipe_id",
            Table::Ingredients => "ingredient_id",
            Table::Users => "user_id",
            Table::Interactions => "interaction_id",
        }
    }

    /// Column layout of the table.
    pub fn schema(self) -> Schema {
        use DataType::{Bool, Float64, Int64, Utf8};

        let fields: &[(&str, DataType)] = match self {
            Table::Recipes => &[
                ("recipe_id", Utf8),
                ("name", Utf8),
                ("description", Utf8),
                ("prep_time_minutes", Int64),
                ("cook_time_minutes", Int64),
                ("servings", Int64),
                ("difficulty", Utf8),
                ("cuisines", Utf8),
                ("tags", Utf8),
                ("ingredient_count", Int64),
                ("step_count", Int64),
            ],
            Table::Ingredients => &[
                ("ingredient_id", Utf8),
                ("recipe_id", Utf8),
                ("name", Utf8),
                ("quantity", Float64),
                ("unit", Utf8),
            ],
            Table::Steps => &[
                ("recipe_id", Utf8),
                ("step_no", Int64),
                ("instruction", Utf8),
                ("duration_minutes", Int64),
            ],
            Table::Users => &[
                ("user_id", Utf8),
                ("name", Utf8),
                ("email", Utf8),
                ("signup_date", Utf8),
                ("country", Utf8),
                ("state", Utf8),
                ("city", Utf8),
                ("phone", Utf8),
            ],
            Table::Interactions => &[
                ("interaction_id", Utf8),
                ("user_id", Utf8),
                ("recipe_id", Utf8),
                ("type", Utf8),
                ("like", Bool),
                ("rating", Float64),
                ("timestamp", Utf8),
            ],
        };

        Schema::new(
            fields
                .iter()
                .map(|(name, data_type)| Field::new(*name, *data_type))
                .collect(),
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown table '{s}'"))
    }
}
