//! Raw record model: source documents as received, before normalization.
//!
//! Every field is a [`Presence`] of a loosely-typed JSON value. Decoding never fails for an
//! object document, so one odd value cannot take a whole document (or batch) down with it.

use serde::de::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use tracing::warn;

/// Three-state optional: distinguishes a missing key from an explicit `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence<T> {
    /// The key does not appear in the document.
    Absent,
    /// The key appears with a `null` value.
    Null,
    /// The key appears with a value.
    Present(T),
}

impl<T> Default for Presence<T> {
    fn default() -> Self {
        Presence::Absent
    }
}

impl<T> Presence<T> {
    /// The present value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Presence::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Presence::Absent)
    }
}

impl<'de, T> Deserialize<'de> for Presence<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only reached when the key exists; missing keys take `Default` via `#[serde(default)]`.
        Ok(match Option::<T>::deserialize(deserializer)? {
            None => Presence::Null,
            Some(v) => Presence::Present(v),
        })
    }
}

type Slot = Presence<JsonValue>;

/// A recipe document with embedded ingredient and step arrays.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RawRecipe {
    pub recipe_id: Slot,
    pub name: Slot,
    pub description: Slot,
    pub prep_time_minutes: Slot,
    pub cook_time_minutes: Slot,
    pub servings: Slot,
    pub difficulty: Slot,
    pub cuisines: Slot,
    pub tags: Slot,
    /// Expected to be an array of ingredient objects; anything else yields no ingredients.
    pub ingredients: Slot,
    /// Expected to be an array of step objects; anything else yields no steps.
    pub steps: Slot,
}

/// One element of a recipe's `ingredients` array.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RawIngredient {
    pub ingredient_id: Slot,
    pub name: Slot,
    pub quantity: Slot,
    pub unit: Slot,
}

/// One element of a recipe's `steps` array.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RawStep {
    pub step_no: Slot,
    pub instruction: Slot,
    pub duration_minutes: Slot,
}

/// A user profile document.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RawUser {
    pub user_id: Slot,
    pub name: Slot,
    pub email: Slot,
    pub signup_date: Slot,
    pub country: Slot,
    pub state: Slot,
    pub city: Slot,
    pub phone: Slot,
}

/// An interaction event document.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RawInteraction {
    pub interaction_id: Slot,
    pub user_id: Slot,
    pub recipe_id: Slot,
    #[serde(rename = "type")]
    pub kind: Slot,
    pub like: Slot,
    pub rating: Slot,
    pub timestamp: Slot,
}

/// Tolerant decoding from an arbitrary JSON document.
pub trait FromDocument: Sized + Default + for<'de> serde::Deserialize<'de> {
    /// Document kind, for diagnostics.
    const KIND: &'static str;

    /// Decode `doc`. A non-object document becomes an all-absent record.
    fn from_document(doc: &JsonValue) -> Self {
        if !doc.is_object() {
            warn!(kind = Self::KIND, "document is not an object; treating every field as absent");
            return Self::default();
        }
        match serde_json::from_value(doc.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!(kind = Self::KIND, error = %e, "undecodable document; treating every field as absent");
                Self::default()
            }
        }
    }
}

impl FromDocument for RawRecipe {
    const KIND: &'static str = "recipe";
}

impl FromDocument for RawIngredient {
    const KIND: &'static str = "ingredient";
}

impl FromDocument for RawStep {
    const KIND: &'static str = "step";
}

impl FromDocument for RawUser {
    const KIND: &'static str = "user";
}

impl FromDocument for RawInteraction {
    const KIND: &'static str = "interaction";
}

/// The complete set of raw documents for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    pub recipes: Vec<RawRecipe>,
    pub users: Vec<RawUser>,
    pub interactions: Vec<RawInteraction>,
}

impl RawBatch {
    /// Decode three document collections into a batch.
    pub fn from_documents(
        recipes: &[JsonValue],
        users: &[JsonValue],
        interactions: &[JsonValue],
    ) -> Self {
        Self {
            recipes: recipes.iter().map(RawRecipe::from_document).collect(),
            users: users.iter().map(RawUser::from_document).collect(),
            interactions: interactions.iter().map(RawInteraction::from_document).collect(),
        }
    }

    /// Total number of source documents.
    pub fn document_count(&self) -> usize {
        self.recipes.len() + self.users.len() + self.interactions.len()
    }
}
