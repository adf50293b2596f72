//! Resolution of recipe data into core recipe revisions.
//!
//! Checks that recipe revisions, input ids, and product ids are unique,
//! resolves each product's material input from an input id to its position,
//! and hands the resulting records to [`RecipeRevision::load_products`],
//! which skips product types the registry does not know.

use crate::loader::{DataLoadError, check_duplicate, resolve_name};
use crate::schema::RecipeData;
use chrono::Utc;
use craftforge_core::id::{InputId, ProductId, RecipeId};
use craftforge_core::product::ProductRecord;
use craftforge_core::recipe::RecipeRevision;
use craftforge_core::registry::ProductRegistry;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Resolved recipes plus how many stored products could not be loaded.
#[derive(Debug, Default)]
pub struct ResolvedRecipes {
    pub recipes: Vec<RecipeRevision>,
    pub skipped_products: usize,
}

pub(crate) fn resolve_recipes(
    data: Vec<RecipeData>,
    registry: &ProductRegistry,
    file: &Path,
) -> Result<ResolvedRecipes, DataLoadError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut resolved = ResolvedRecipes::default();

    for recipe in data {
        let key = format!("recipe {} revision {}", RecipeId(recipe.id), recipe.revision);
        check_duplicate(&seen, &key, file)?;
        seen.insert(key);

        let (revision, skipped) = resolve_recipe(recipe, registry, file)?;
        resolved.skipped_products += skipped;
        resolved.recipes.push(revision);
    }

    Ok(resolved)
}

fn resolve_recipe(
    data: RecipeData,
    registry: &ProductRegistry,
    file: &Path,
) -> Result<(RecipeRevision, usize), DataLoadError> {
    let recipe = RecipeId(data.id);

    // Input name -> position in the input list.
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut inputs = Vec::with_capacity(data.inputs.len());
    for (position, input) in data.inputs.iter().enumerate() {
        let name = InputId(input.id).to_string();
        check_duplicate(&positions, &name, file)?;
        positions.insert(name, position);
        inputs.push(input.to_recipe_input());
    }

    let mut product_ids: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(data.products.len());
    for product in data.products {
        let name = format!("product {}", ProductId(product.id));
        check_duplicate(&product_ids, &name, file)?;
        product_ids.insert(name);

        let material_input = product
            .material_input
            .map(|id| resolve_name(&positions, &InputId(id).to_string(), file, "input").copied())
            .transpose()?;

        records.push(ProductRecord {
            id: ProductId(product.id),
            recipe,
            revision: data.revision,
            tag: product.tag,
            definition: product.definition,
            created_at: product.created_at.unwrap_or_else(Utc::now),
            failure: product.failure,
            material_input,
        });
    }

    let mut revision = RecipeRevision::new(recipe, data.revision, inputs);
    let skipped = revision.load_products(registry, &records);
    if skipped > 0 {
        log::warn!(
            "{}: recipe {recipe} revision {} skipped {skipped} product(s)",
            file.display(),
            data.revision
        );
    }
    Ok((revision, skipped))
}

// ===========================================================================
// Tests
// ===========================================================================
