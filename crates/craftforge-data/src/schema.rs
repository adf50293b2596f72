//! Serde data file structs for stored recipes and their products.
//!
//! These structs define the on-disk format. Ids are plain integers so the
//! same file reads identically from RON, JSON, and TOML; the loader turns
//! them into core id types and product records.

use chrono::{DateTime, Utc};
use craftforge_core::id::{CharacteristicId, InputId};
use craftforge_core::input::{InputKind, RecipeInput};
use serde::Deserialize;
use serde_json::Value;

// ===========================================================================
// Recipes
// ===========================================================================

/// One revision of a recipe.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub id: u64,
    #[serde(default = "first_revision")]
    pub revision: u32,
    #[serde(default)]
    pub inputs: Vec<InputData>,
    #[serde(default)]
    pub products: Vec<ProductData>,
}

fn first_revision() -> u32 {
    1
}

// ===========================================================================
// Inputs
// ===========================================================================

/// A declared input slot.
#[derive(Debug, Clone, Deserialize)]
pub struct InputData {
    pub id: u64,
    pub kind: InputKindData,
    #[serde(default)]
    pub description: String,
    /// Characteristic ids this input can determine.
    #[serde(default)]
    pub determines: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKindData {
    Item,
    ItemGroup,
    Liquid,
    Characteristic,
}

impl From<InputKindData> for InputKind {
    fn from(kind: InputKindData) -> Self {
        match kind {
            InputKindData::Item => InputKind::Item,
            InputKindData::ItemGroup => InputKind::ItemGroup,
            InputKindData::Liquid => InputKind::Liquid,
            InputKindData::Characteristic => InputKind::Characteristic,
        }
    }
}

impl InputData {
    pub fn to_recipe_input(&self) -> RecipeInput {
        let mut input =
            RecipeInput::new(InputId(self.id), self.kind.into()).with_description(&self.description);
        for &characteristic in &self.determines {
            input = input.determining(CharacteristicId(characteristic));
        }
        input
    }
}

// ===========================================================================
// Products
// ===========================================================================

/// A stored product. `definition` is the variant's own blob and is handed
/// to the product registry untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductData {
    pub id: u64,
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default = "empty_definition")]
    pub definition: Value,
    #[serde(default)]
    pub failure: bool,
    /// Id of the input whose material overrides the product's own.
    #[serde(default)]
    pub material_input: Option<u64>,
    /// RFC 3339 creation time. Missing means "now".
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn empty_definition() -> Value {
    Value::Object(serde_json::Map::new())
}
