//! Flattening of raw documents into relational rows.
//!
//! - One recipe document yields one `recipes` row, one `ingredients` row per embedded ingredient
//!   and one `steps` row per embedded step.
//! - One user document yields one `users` row; one interaction document one `interactions` row.
//!
//! Normalization never fails and never drops a document: malformed input is normalized to
//! explicit null or pass-through values and left for the rule engine to judge.
//!
//! ## Example
//!
//! ```rust
//! use recipe_pipeline::normalize::{Normalizer, NormalizerConfig};
//! use recipe_pipeline::raw::{FromDocument, RawBatch, RawRecipe};
//! use recipe_pipeline::tables::Table;
//! use recipe_pipeline::types::Value;
//!
//! let recipe = RawRecipe::from_document(&serde_json::json!({
//!     "recipe_id": "Idli Sambar",
//!     "name": "Idli Sambar",
//!     "tags": ["breakfast", "steamed"],
//!     "ingredients": [{"name": "Rice", "quantity": 2, "unit": "cups"}],
//!     "steps": [{"step_no": 1, "instruction": "Soak", "duration_minutes": 0}],
//! }));
//! let batch = RawBatch { recipes: vec![recipe], ..Default::default() };
//!
//! let out = Normalizer::new(NormalizerConfig::default()).normalize_batch(&batch);
//! let recipes = out.table(Table::Recipes);
//! assert_eq!(recipes.value(0, "recipe_id"), Some(&Value::Utf8("idli_sambar".into())));
//! assert_eq!(recipes.value(0, "tags"), Some(&Value::Utf8("breakfast|steamed".into())));
//! assert_eq!(
//!     out.table(Table::Ingredients).value(0, "ingredient_id"),
//!     Some(&Value::Utf8("idli_sambar_ing_1".into()))
//! );
//! ```

pub mod codec;
pub mod coerce;
pub mod ids;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::raw::{FromDocument, Presence, RawBatch, RawIngredient, RawInteraction, RawRecipe, RawStep, RawUser};
use crate::tables::Table;
use crate::types::{DataSet, Value};

pub use codec::ListCodec;

/// Defaults applied to recipe fields that are *absent* from a document.
///
/// An explicit `null` is never defaulted. `None` disables the default, leaving the cell null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub default_prep_time_minutes: Option<i64>,
    pub default_cook_time_minutes: Option<i64>,
    pub default_servings: Option<i64>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            default_prep_time_minutes: Some(0),
            default_cook_time_minutes: Some(0),
            default_servings: Some(1),
        }
    }
}

/// Rows derived from one recipe document.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRows {
    pub recipe: Vec<Value>,
    pub ingredients: Vec<Vec<Value>>,
    pub steps: Vec<Vec<Value>>,
}

/// The five normalized tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub recipes: DataSet,
    pub ingredients: DataSet,
    pub steps: DataSet,
    pub users: DataSet,
    pub interactions: DataSet,
}

impl NormalizedBatch {
    /// Empty tables with their schemas.
    pub fn empty() -> Self {
        Self {
            recipes: DataSet::empty(Table::Recipes.schema()),
            ingredients: DataSet::empty(Table::Ingredients.schema()),
            steps: DataSet::empty(Table::Steps.schema()),
            users: DataSet::empty(Table::Users.schema()),
            interactions: DataSet::empty(Table::Interactions.schema()),
        }
    }

    /// Dataset for `table`.
    pub fn table(&self, table: Table) -> &DataSet {
        match table {
            Table::Recipes => &self.recipes,
            Table::Ingredients => &self.ingredients,
            Table::Steps => &self.steps,
            Table::Users => &self.users,
            Table::Interactions => &self.interactions,
        }
    }

    /// Total number of normalized rows across all tables.
    pub fn row_count(&self) -> usize {
        Table::ALL.iter().map(|t| self.table(*t).row_count()).sum()
    }
}

/// Flattens raw documents into table rows.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
    codec: ListCodec,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            codec: ListCodec,
        }
    }

    /// Normalize every document of the batch.
    pub fn normalize_batch(&self, batch: &RawBatch) -> NormalizedBatch {
        let mut out = NormalizedBatch::empty();

        for (index, raw) in batch.recipes.iter().enumerate() {
            let rows = self.normalize_recipe(index, raw);
            out.recipes.push_row(rows.recipe);
            for row in rows.ingredients {
                out.ingredients.push_row(row);
            }
            for row in rows.steps {
                out.steps.push_row(row);
            }
        }
        for raw in &batch.users {
            out.users.push_row(self.normalize_user(raw));
        }
        for raw in &batch.interactions {
            out.interactions.push_row(self.normalize_interaction(raw));
        }

        info!(
            recipes = out.recipes.row_count(),
            ingredients = out.ingredients.row_count(),
            steps = out.steps.row_count(),
            users = out.users.row_count(),
            interactions = out.interactions.row_count(),
            "normalized batch"
        );
        out
    }

    /// Normalize one recipe document found at batch position `index`.
    ///
    /// `index` only matters when the document has no usable ID: it then seeds the stand-in key
    /// used for the recipe's ingredient IDs.
    pub fn normalize_recipe(&self, index: usize, raw: &RawRecipe) -> RecipeRows {
        let recipe_id = ids::id_value(&raw.recipe_id);
        let recipe_key = recipe_id
            .key()
            .unwrap_or_else(|| ids::positional_recipe_key(index));

        let ingredients: Vec<Vec<Value>> = array_items(&raw.ingredients)
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let ing = RawIngredient::from_document(item);
                vec![
                    Value::Utf8(ids::ingredient_id(&recipe_key, i + 1)),
                    recipe_id.clone(),
                    coerce::text(&ing.name),
                    coerce::number(&ing.quantity),
                    coerce::text(&ing.unit),
                ]
            })
            .collect();

        let steps: Vec<Vec<Value>> = array_items(&raw.steps)
            .iter()
            .map(|item| {
                let step = RawStep::from_document(item);
                vec![
                    recipe_id.clone(),
                    coerce::integer(&step.step_no),
                    coerce::text(&step.instruction),
                    coerce::integer(&step.duration_minutes),
                ]
            })
            .collect();

        if raw.ingredients.value().is_some_and(|v| !v.is_array()) {
            debug!(recipe = %recipe_key, "ingredients is not an array");
        }
        if raw.steps.value().is_some_and(|v| !v.is_array()) {
            debug!(recipe = %recipe_key, "steps is not an array");
        }

        let recipe = vec![
            recipe_id,
            coerce::text(&raw.name),
            coerce::text(&raw.description),
            integer_or_default(&raw.prep_time_minutes, self.config.default_prep_time_minutes),
            integer_or_default(&raw.cook_time_minutes, self.config.default_cook_time_minutes),
            integer_or_default(&raw.servings, self.config.default_servings),
            coerce::text(&raw.difficulty),
            Value::Utf8(self.codec.encode(&coerce::string_list(&raw.cuisines))),
            Value::Utf8(self.codec.encode(&coerce::string_list(&raw.tags))),
            Value::Int64(ingredients.len() as i64),
            Value::Int64(steps.len() as i64),
        ];

        RecipeRows {
            recipe,
            ingredients,
            steps,
        }
    }

    /// Normalize one user document.
    pub fn normalize_user(&self, raw: &RawUser) -> Vec<Value> {
        vec![
            ids::id_value(&raw.user_id),
            coerce::text(&raw.name),
            coerce::text(&raw.email),
            coerce::text(&raw.signup_date),
            coerce::text(&raw.country),
            coerce::text(&raw.state),
            coerce::text(&raw.city),
            coerce::text(&raw.phone),
        ]
    }

    /// Normalize one interaction document.
    pub fn normalize_interaction(&self, raw: &RawInteraction) -> Vec<Value> {
        vec![
            ids::id_value(&raw.interaction_id),
            ids::id_value(&raw.user_id),
            ids::id_value(&raw.recipe_id),
            coerce::text(&raw.kind),
            coerce::boolean(&raw.like),
            coerce::number(&raw.rating),
            coerce::text(&raw.timestamp),
        ]
    }
}

fn integer_or_default(slot: &Presence<JsonValue>, default: Option<i64>) -> Value {
    if slot.is_absent() {
        default.map(Value::Int64).unwrap_or(Value::Null)
    } else {
        coerce::integer(slot)
    }
}

fn array_items(slot: &Presence<JsonValue>) -> &[JsonValue] {
    match slot.value() {
        Some(JsonValue::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Normalizer, NormalizerConfig};
    use crate::raw::{FromDocument, RawBatch, RawInteraction, RawRecipe, RawUser};
    use crate::tables::Table;
    use crate::types::Value;

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn idli() -> RawRecipe {
        RawRecipe::from_document(&json!({
            "recipe_id": "Idli Sambar",
            "name": "Idli Sambar",
            "description": "Steamed idlis",
            "prep_time_minutes": 20,
            "cook_time_minutes": "30",
            "servings": 4,
            "difficulty": "Medium",
            "cuisines": ["South Indian"],
            "tags": ["breakfast", "vegetarian"],
            "ingredients": [
                {"ingredient_id": "idli_ing_1", "name": "Parboiled rice", "quantity": 2, "unit": "cups"},
                {"name": "Urad dal", "quantity": "1", "unit": "cup"}
            ],
            "steps": [
                {"step_no": 1, "instruction": "Soak", "duration_minutes": 0},
                {"step_no": 2, "instruction": "Grind", "duration_minutes": 15},
                {"step_no": 3, "instruction": "Steam", "duration_minutes": 12}
            ]
        }))
    }

    #[test]
    fn recipe_document_fans_out_into_three_tables() {
        let rows = Normalizer::default().normalize_recipe(0, &idli());
        assert_eq!(rows.ingredients.len(), 2);
        assert_eq!(rows.steps.len(), 3);

        let schema = Table::Recipes.schema();
        let col = |name: &str| rows.recipe[schema.index_of(name).unwrap()].clone();
        assert_eq!(col("recipe_id"), utf8("idli_sambar"));
        assert_eq!(col("cook_time_minutes"), Value::Int64(30));
        assert_eq!(col("cuisines"), utf8("South Indian"));
        assert_eq!(col("tags"), utf8("breakfast|vegetarian"));
        assert_eq!(col("ingredient_count"), Value::Int64(2));
        assert_eq!(col("step_count"), Value::Int64(3));

        assert_eq!(rows.ingredients[0][0], utf8("idli_sambar_ing_1"));
        assert_eq!(rows.ingredients[1][0], utf8("idli_sambar_ing_2"));
        assert_eq!(rows.ingredients[1][1], utf8("idli_sambar"));
        assert_eq!(rows.ingredients[1][3], Value::Float64(1.0));
        assert_eq!(rows.steps[2][0], utf8("idli_sambar"));
        assert_eq!(rows.steps[2][1], Value::Int64(3));
    }

    #[test]
    fn missing_arrays_still_emit_the_recipe_row() {
        let raw = RawRecipe::from_document(&json!({"recipe_id": "r1", "name": "Toast", "ingredients": "oops"}));
        let rows = Normalizer::default().normalize_recipe(0, &raw);
        assert!(rows.ingredients.is_empty());
        assert!(rows.steps.is_empty());
        let schema = Table::Recipes.schema();
        assert_eq!(rows.recipe[schema.index_of("ingredient_count").unwrap()], Value::Int64(0));
        assert_eq!(rows.recipe[schema.index_of("tags").unwrap()], utf8(""));
    }

    #[test]
    fn absent_numbers_default_but_explicit_null_does_not() {
        let raw = RawRecipe::from_document(&json!({"recipe_id": "r1", "servings": null}));
        let rows = Normalizer::default().normalize_recipe(0, &raw);
        let schema = Table::Recipes.schema();
        assert_eq!(rows.recipe[schema.index_of("prep_time_minutes").unwrap()], Value::Int64(0));
        assert_eq!(rows.recipe[schema.index_of("cook_time_minutes").unwrap()], Value::Int64(0));
        assert_eq!(rows.recipe[schema.index_of("servings").unwrap()], Value::Null);
        assert_eq!(rows.recipe[schema.index_of("difficulty").unwrap()], Value::Null);
    }

    #[test]
    fn defaults_can_be_disabled() {
        let normalizer = Normalizer::new(NormalizerConfig {
            default_prep_time_minutes: None,
            ..NormalizerConfig::default()
        });
        let rows = normalizer.normalize_recipe(0, &RawRecipe::default());
        let schema = Table::Recipes.schema();
        assert_eq!(rows.recipe[schema.index_of("prep_time_minutes").unwrap()], Value::Null);
    }

    #[test]
    fn recipe_without_id_uses_positional_key_for_ingredients() {
        let raw = RawRecipe::from_document(&json!({
            "name": "Mystery",
            "ingredients": [{"name": "Salt", "quantity": 1, "unit": "tsp"}]
        }));
        let rows = Normalizer::default().normalize_recipe(7, &raw);
        assert_eq!(rows.recipe[0], Value::Null);
        assert_eq!(rows.ingredients[0][0], utf8("doc.7_ing_1"));
        assert_eq!(rows.ingredients[0][1], Value::Null);
    }

    #[test]
    fn positional_key_never_shadows_a_real_recipe_id() {
        let batch = RawBatch {
            recipes: vec![
                RawRecipe::from_document(&json!({
                    "recipe_id": "doc1",
                    "name": "Bread",
                    "ingredients": [{"name": "Flour", "quantity": 2, "unit": "cups"}]
                })),
                RawRecipe::from_document(&json!({
                    "name": "Mystery",
                    "ingredients": [{"name": "Salt", "quantity": 1, "unit": "tsp"}]
                })),
            ],
            ..RawBatch::default()
        };
        let out = Normalizer::default().normalize_batch(&batch);
        let ids: Vec<Value> = out
            .table(Table::Ingredients)
            .rows
            .iter()
            .map(|row| row[0].clone())
            .collect();
        assert_eq!(ids, vec![utf8("doc1_ing_1"), utf8("doc.1_ing_1")]);
    }

    #[test]
    fn non_object_ingredient_becomes_null_row() {
        let raw = RawRecipe::from_document(&json!({"recipe_id": "r1", "ingredients": [42]}));
        let rows = Normalizer::default().normalize_recipe(0, &raw);
        assert_eq!(
            rows.ingredients,
            vec![vec![utf8("r1_ing_1"), utf8("r1"), Value::Null, Value::Null, Value::Null]]
        );
    }

    #[test]
    fn interaction_optional_fields_stay_null() {
        let raw = RawInteraction::from_document(&json!({
            "interaction_id": "I1",
            "user_id": "U 1",
            "recipe_id": "Idli Sambar",
            "type": "view",
            "timestamp": "2024-01-01T00:00:00Z"
        }));
        let row = Normalizer::default().normalize_interaction(&raw);
        assert_eq!(
            row,
            vec![
                utf8("i1"),
                utf8("u_1"),
                utf8("idli_sambar"),
                utf8("view"),
                Value::Null,
                Value::Null,
                utf8("2024-01-01T00:00:00Z"),
            ]
        );
    }

    #[test]
    fn batch_normalization_is_deterministic() {
        let batch = RawBatch {
            recipes: vec![idli(), RawRecipe::default()],
            users: vec![RawUser::from_document(&json!({"user_id": "u1", "name": "Amit"}))],
            interactions: Vec::new(),
        };
        let normalizer = Normalizer::default();
        let first = normalizer.normalize_batch(&batch);
        let second = normalizer.normalize_batch(&batch);
        assert_eq!(first, second);
        assert_eq!(first.table(Table::Recipes).row_count(), 2);
        assert_eq!(first.table(Table::Users).row_count(), 1);
        assert_eq!(first.row_count(), 2 + 2 + 3 + 1);
    }
}
