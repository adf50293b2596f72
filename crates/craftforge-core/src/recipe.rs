//! One revision of a recipe: its ordered inputs and the products it yields.
//!
//! [`RecipeRevision`] is the aggregate that owns products. Edits are routed
//! through it so that each applied change marks the product dirty and the
//! revision's validity is recomputed by re-querying every product.

use crate::command::{Actor, CommandTokens, EditContext, EditError, EditHistory, EditReport};
use crate::config::ProductionConfig;
use crate::context::ProductionContext;
use crate::dirty::DirtyTracker;
use crate::id::{ProductId, RecipeId};
use crate::input::{ConsumedInputs, RecipeInput};
use crate::item::ItemQuality;
use crate::output::ProducedOutput;
use crate::product::{DefinitionError, Product, ProductRecord, ProductionError};
use crate::registry::{ProductRegistry, RegistryError};
use crate::revision::reallocate_inputs;
use crate::rng::RandomSource;
use crate::validation::ValidationContext;
use crate::world::{ScriptHost, World, WorldCatalog};

/// Edits kept per revision for the editor's history view.
pub const DEFAULT_EDIT_HISTORY: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("this recipe has no product {0}")]
    UnknownProduct(ProductId),
    #[error("there is no such product type: {0}")]
    UnknownProductType(String),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

#[derive(Debug, Clone)]
pub struct RecipeRevision {
    recipe: RecipeId,
    revision: u32,
    inputs: Vec<RecipeInput>,
    products: Vec<Product>,
    next_input_id: u64,
    next_product_id: u64,
    dirty: DirtyTracker,
    history: EditHistory,
    invalid_reason: Option<String>,
}

impl RecipeRevision {
    pub fn new(recipe: RecipeId, revision: u32, inputs: Vec<RecipeInput>) -> Self {
        let next_input_id = inputs.iter().map(|i| i.id.0 + 1).max().unwrap_or(1);
        Self {
            recipe,
            revision,
            inputs,
            products: Vec::new(),
            next_input_id,
            next_product_id: 1,
            dirty: DirtyTracker::new(),
            history: EditHistory::with_max_history(DEFAULT_EDIT_HISTORY),
            invalid_reason: None,
        }
    }

    /// Start product ids at `next` instead of 1. Hosts that allocate ids
    /// from shared storage call this before adding products.
    pub fn with_next_product_id(mut self, next: u64) -> Self {
        self.next_product_id = next.max(self.next_product_id);
        self
    }

    pub fn recipe(&self) -> RecipeId {
        self.recipe
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn inputs(&self) -> &[RecipeInput] {
        &self.inputs
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id() == id)
    }

    pub fn success_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| !p.is_failure())
    }

    pub fn failure_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.is_failure())
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Called by the host once every dirty product has been written.
    pub fn mark_saved(&mut self) {
        self.dirty.mark_clean();
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    fn allocate_product_id(&mut self) -> ProductId {
        let id = ProductId(self.next_product_id);
        self.next_product_id += 1;
        id
    }

    // -----------------------------------------------------------------------
    // Loading and persistence
    // -----------------------------------------------------------------------

    /// Rebuild products from stored records. Records belonging to another
    /// recipe or revision, and records whose tag or definition cannot be
    /// loaded, are skipped. Returns how many were skipped.
    pub fn load_products(&mut self, registry: &ProductRegistry, records: &[ProductRecord]) -> usize {
        let mut skipped = 0;
        for record in records {
            if record.recipe != self.recipe || record.revision != self.revision {
                log::warn!(
                    "recipe {} revision {}: skipping product {} stored for recipe {} revision {}",
                    self.recipe,
                    self.revision,
                    record.id,
                    record.recipe,
                    record.revision
                );
                skipped += 1;
                continue;
            }
            match Product::from_record(registry, record) {
                Ok(product) => {
                    self.next_product_id = self.next_product_id.max(record.id.0 + 1);
                    self.products.push(product);
                }
                Err(_) => skipped += 1,
            }
        }
        log::debug!(
            "recipe {} revision {}: loaded {} product(s), skipped {skipped}",
            self.recipe,
            self.revision,
            self.products.len()
        );
        skipped
    }

    /// Records for every product, in list order.
    pub fn records(&self) -> Result<Vec<ProductRecord>, DefinitionError> {
        self.products.iter().map(Product::to_record).collect()
    }

    /// Records for the products changed since the last save.
    pub fn dirty_records(&self) -> Result<Vec<ProductRecord>, DefinitionError> {
        self.products
            .iter()
            .filter(|p| self.dirty.is_product_dirty(p.id()))
            .map(Product::to_record)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Add a blank product of `tag`. It is dirty from the start so its
    /// first save is scheduled, and the revision's validity is recomputed.
    pub fn add_product(
        &mut self,
        registry: &ProductRegistry,
        tag: &str,
        failure: bool,
        catalog: &dyn WorldCatalog,
    ) -> Result<ProductId, RecipeError> {
        let id = ProductId(self.next_product_id);
        let mut product =
            Product::create_for_editing(registry, tag, id, self.recipe, self.revision)
                .ok_or_else(|| RecipeError::UnknownProductType(tag.to_string()))?;
        self.allocate_product_id();
        product.set_failure(failure);
        self.products.push(product);
        self.dirty.mark_product(id);
        self.refresh_validity(catalog);
        Ok(id)
    }

    pub fn remove_product(
        &mut self,
        id: ProductId,
        catalog: &dyn WorldCatalog,
    ) -> Result<Product, RecipeError> {
        let index = self
            .products
            .iter()
            .position(|p| p.id() == id)
            .ok_or(RecipeError::UnknownProduct(id))?;
        self.dirty.mark_removed(id);
        let removed = self.products.remove(index);
        self.refresh_validity(catalog);
        Ok(removed)
    }

    /// Route one editing command line to a product.
    ///
    /// On success the product is marked dirty, the edit is recorded and the
    /// revision's validity is recomputed. On failure nothing changes.
    pub fn apply_edit(
        &mut self,
        product: ProductId,
        line: &str,
        catalog: &dyn WorldCatalog,
        actor: &Actor,
    ) -> Result<EditReport, RecipeError> {
        let target = self
            .products
            .iter_mut()
            .find(|p| p.id() == product)
            .ok_or(RecipeError::UnknownProduct(product))?;
        let ctx = EditContext {
            catalog,
            inputs: &self.inputs,
            actor,
        };
        let mut staged = target.clone();
        let report = staged.edit(&mut CommandTokens::parse(line), &ctx)?;
        if staged != *target {
            *target = staged;
            self.dirty.mark_product(product);
        }
        self.history.record(product, &report);
        self.refresh_validity(catalog);
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Validity
    // -----------------------------------------------------------------------

    /// The first reason any product cannot be used, prefixed by its id.
    pub fn why_not_valid(&self, catalog: &dyn WorldCatalog) -> Option<String> {
        let ctx = ValidationContext::new(&self.inputs, catalog);
        self.products.iter().find_map(|product| {
            product
                .why_not_valid(&ctx)
                .map(|reason| format!("Product {}: {reason}", product.id()))
        })
    }

    pub fn is_valid(&self, catalog: &dyn WorldCatalog) -> bool {
        self.why_not_valid(catalog).is_none()
    }

    /// Re-query every product and cache the outcome. Returns validity.
    pub fn refresh_validity(&mut self, catalog: &dyn WorldCatalog) -> bool {
        self.invalid_reason = self.why_not_valid(catalog);
        self.dirty.clear_validity();
        self.invalid_reason.is_none()
    }

    /// The cached outcome of the last [`refresh_validity`](Self::refresh_validity).
    pub fn cached_invalid_reason(&self) -> Option<&str> {
        self.invalid_reason.as_deref()
    }

    // -----------------------------------------------------------------------
    // Revision
    // -----------------------------------------------------------------------

    /// The next revision of this recipe.
    ///
    /// Inputs keep their order and kinds but get fresh ids. Every product is
    /// carried across through its remapped definition and reloaded through
    /// the registry, under a fresh product id. All carried products are dirty.
    pub fn revise(&self, registry: &ProductRegistry) -> Result<RecipeRevision, RecipeError> {
        let (inputs, remap, next_input_id) = reallocate_inputs(&self.inputs, self.next_input_id);
        let revision = self.revision + 1;
        let mut next = Self {
            recipe: self.recipe,
            revision,
            inputs,
            products: Vec::with_capacity(self.products.len()),
            next_input_id,
            next_product_id: self.next_product_id,
            dirty: DirtyTracker::new(),
            history: EditHistory::with_max_history(DEFAULT_EDIT_HISTORY),
            invalid_reason: None,
        };
        for product in &self.products {
            let id = next.allocate_product_id();
            let record = product.record_for_revision(&remap, id, revision)?;
            next.products.push(Product::from_record(registry, &record)?);
            next.dirty.mark_product(id);
        }
        log::info!(
            "recipe {} revised to revision {revision}: {} input(s), {} product(s)",
            self.recipe,
            next.inputs.len(),
            next.products.len()
        );
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    /// A production context over this revision's inputs.
    pub fn production_context<'a>(
        &'a self,
        world: &'a mut dyn World,
        scripts: &'a mut dyn ScriptHost,
        rng: &'a mut dyn RandomSource,
        config: &'a ProductionConfig,
    ) -> ProductionContext<'a> {
        ProductionContext::new(world, scripts, rng, config, &self.inputs)
    }

    /// Produce every success (or failure) product for one completed attempt.
    ///
    /// If any product fails, the outputs already made by this call are
    /// deleted before the error is returned.
    pub fn produce(
        &self,
        failure: bool,
        consumed: &ConsumedInputs,
        quality: ItemQuality,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<Vec<ProducedOutput>, ProductionError> {
        let mut outputs = Vec::new();
        for product in self.products.iter().filter(|p| p.is_failure() == failure) {
            match product.produce(consumed, quality, ctx) {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    log::warn!(
                        "recipe {} revision {}: product {} failed: {err}",
                        self.recipe,
                        self.revision,
                        product.id()
                    );
                    for output in outputs {
                        output.delete(ctx.world);
                    }
                    return Err(err);
                }
            }
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{InputId, PrototypeId};
    use crate::input::{ConsumedInput, InputKind};
    use crate::product::{ItemTemplate, NpcProduct, SimpleProduct};
    use crate::test_utils::{EntityState, TestHarness, actor};
    use crate::world::RevisionStatus;

    fn setup() -> (TestHarness, RecipeRevision, PrototypeId) {
        let mut harness = TestHarness::new();
        let sword = harness.world.add_prototype("sword", false, Vec::new());
        let inputs = vec![
            RecipeInput::new(InputId(1), InputKind::Item),
            RecipeInput::new(InputId(2), InputKind::Liquid),
        ];
        harness.inputs = inputs.clone();
        (harness, RecipeRevision::new(RecipeId(7), 1, inputs), sword)
    }

    #[test]
    fn new_revision_allocates_after_highest_input() {
        let (_, recipe, _) = setup();
        assert_eq!(recipe.next_input_id, 3);
        assert!(recipe.products().is_empty());
    }

    #[test]
    fn add_edit_and_validity() {
        let (harness, mut recipe, _) = setup();
        let registry = ProductRegistry::builtin();
        let id = recipe.add_product(&registry, "simple", false, &harness.world).unwrap();
        assert!(recipe.dirty().is_product_dirty(id));
        assert!(!recipe.is_valid(&harness.world));
        assert!(recipe.why_not_valid(&harness.world).unwrap().starts_with("Product #1:"));

        recipe.mark_saved();
        let actor = actor();
        recipe
            .apply_edit(id, "item sword", &harness.world, &actor)
            .unwrap();
        assert!(recipe.dirty().is_product_dirty(id));
        assert!(recipe.is_valid(&harness.world));
        assert_eq!(recipe.cached_invalid_reason(), None);
        assert_eq!(recipe.history().entries().len(), 1);
    }

    #[test]
    fn rejected_edit_changes_nothing() {
        let (harness, mut recipe, _) = setup();
        let registry = ProductRegistry::builtin();
        let id = recipe.add_product(&registry, "simple", false, &harness.world).unwrap();
        recipe.mark_saved();
        let before = recipe.product(id).cloned();
        let err = recipe
            .apply_edit(id, "item excalibur", &harness.world, &actor())
            .unwrap_err();
        assert!(matches!(err, RecipeError::Edit(EditError::UnknownName { .. })));
        assert_eq!(recipe.product(id).cloned(), before);
        assert!(!recipe.dirty().is_dirty());
    }

    #[test]
    fn unknown_product_and_type() {
        let (harness, mut recipe, _) = setup();
        let registry = ProductRegistry::builtin();
        assert!(matches!(
            recipe.add_product(&registry, "teleporter", false, &harness.world),
            Err(RecipeError::UnknownProductType(_))
        ));
        assert!(matches!(
            recipe.apply_edit(ProductId(9), "show", &harness.world, &actor()),
            Err(RecipeError::UnknownProduct(ProductId(9)))
        ));
    }

    #[test]
    fn remove_product_tracks_removal() {
        let (harness, mut recipe, _) = setup();
        let registry = ProductRegistry::builtin();
        let id = recipe
            .add_product(&registry, "dna-test", true, &harness.world)
            .unwrap();
        assert_eq!(recipe.failure_products().count(), 1);
        recipe.remove_product(id, &harness.world).unwrap();
        assert!(recipe.products().is_empty());
        assert!(recipe.dirty().removed_products().contains(&id));
    }

    #[test]
    fn adding_and_removing_products_refreshes_cached_validity() {
        let (harness, mut recipe, _) = setup();
        let registry = ProductRegistry::builtin();
        assert!(recipe.refresh_validity(&harness.world));
        assert_eq!(recipe.cached_invalid_reason(), None);

        // A blank simple product has no item yet.
        let id = recipe
            .add_product(&registry, "simple", false, &harness.world)
            .unwrap();
        let cached = recipe.cached_invalid_reason().map(str::to_string);
        assert_eq!(cached, recipe.why_not_valid(&harness.world));
        assert!(cached.unwrap().starts_with("Product #1:"));
        assert!(!recipe.dirty().is_validity_dirty());

        recipe.remove_product(id, &harness.world).unwrap();
        assert_eq!(recipe.cached_invalid_reason(), None);
    }

    #[test]
    fn load_skips_unknown_and_foreign_records() {
        let (_, mut recipe, sword) = setup();
        let registry = ProductRegistry::builtin();
        let simple = SimpleProduct::new(ItemTemplate::new(sword, 1));
        let good = Product::new(ProductId(4), RecipeId(7), 1, simple)
            .to_record()
            .unwrap();
        let unknown = ProductRecord {
            id: ProductId(5),
            tag: "teleporter".into(),
            ..good.clone()
        };
        let foreign = ProductRecord {
            id: ProductId(6),
            recipe: RecipeId(8),
            ..good.clone()
        };
        let skipped = recipe.load_products(&registry, &[good, unknown, foreign]);
        assert_eq!(skipped, 2);
        assert_eq!(recipe.products().len(), 1);
        assert_eq!(recipe.next_product_id, 5);
    }

    #[test]
    fn revise_remaps_inputs_and_products() {
        let (harness, mut recipe, _) = setup();
        let registry = ProductRegistry::builtin();
        let id = recipe.add_product(&registry, "blood-typing", false, &harness.world).unwrap();
        recipe
            .apply_edit(id, "input 2", &harness.world, &actor())
            .unwrap();

        let next = recipe.revise(&registry).unwrap();
        assert_eq!(next.revision(), 2);
        assert_eq!(next.inputs()[0].id, InputId(3));
        assert_eq!(next.inputs()[1].id, InputId(4));
        assert_eq!(next.inputs()[1].kind, InputKind::Liquid);
        let carried = &next.products()[0];
        assert_ne!(carried.id(), id);
        assert_eq!(carried.revision(), 2);
        assert!(next.dirty().is_product_dirty(carried.id()));
        let definition = carried.serialize_definition().unwrap();
        assert_eq!(definition["input"], serde_json::json!(4));
    }

    #[test]
    fn produce_runs_only_the_requested_set() {
        let (mut harness, mut recipe, sword) = setup();
        recipe.products.push(Product::new(
            ProductId(1),
            RecipeId(7),
            1,
            SimpleProduct::new(ItemTemplate::new(sword, 2)),
        ));
        let mut failed = Product::new(
            ProductId(2),
            RecipeId(7),
            1,
            SimpleProduct::new(ItemTemplate::new(sword, 5)),
        );
        failed.set_failure(true);
        recipe.products.push(failed);

        let consumed = ConsumedInputs::new();
        let TestHarness {
            world,
            scripts,
            rng,
            config,
            ..
        } = &mut harness;
        let mut ctx = recipe.production_context(world, scripts, rng, config);
        let outputs = recipe
            .produce(false, &consumed, ItemQuality::Good, &mut ctx)
            .unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].created().len(), 2);
    }

    #[test]
    fn produce_failure_discards_earlier_outputs() {
        let (mut harness, mut recipe, sword) = setup();
        let template = harness
            .world
            .add_npc_template("guard", RevisionStatus::Current);
        recipe.products.push(Product::new(
            ProductId(1),
            RecipeId(7),
            1,
            SimpleProduct::new(ItemTemplate::new(sword, 1)),
        ));
        recipe.products.push(Product::new(
            ProductId(2),
            RecipeId(7),
            1,
            NpcProduct::new(template, 1),
        ));

        let entity = harness.world.add_item(sword, 1);
        let consumed = ConsumedInputs::new().with(InputId(1), ConsumedInput::Item(entity));
        let err = {
            let TestHarness {
                world,
                scripts,
                rng,
                config,
                ..
            } = &mut harness;
            let mut ctx = recipe.production_context(world, scripts, rng, config);
            recipe
                .produce(false, &consumed, ItemQuality::Standard, &mut ctx)
                .unwrap_err()
        };
        assert_eq!(err, ProductionError::NotImplemented("npc"));
        let created: Vec<_> = harness
            .world
            .events
            .events()
            .iter()
            .filter_map(|e| match e {
                crate::event::ProductionEvent::EntityCreated { entity, .. } => Some(*entity),
                _ => None,
            })
            .collect();
        assert_eq!(created.len(), 1);
        assert_eq!(
            harness.world.entity_state(created[0]),
            Some(EntityState::Deleted)
        );
    }
}
