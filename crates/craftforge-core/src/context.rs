//! Everything one production call can reach.

use crate::config::ProductionConfig;
use crate::event::ProductionEvent;
use crate::id::{EntityId, MaterialId, ProductId};
use crate::input::{ConsumedInputs, RecipeInput};
use crate::item::{CommoditySpawn, CurrencySpawn, ItemQuality, ItemSpawn};
use crate::rng::RandomSource;
use crate::world::{PrototypeInfo, ScriptHost, World};

/// Collaborators handed to a product when an attempt completes.
///
/// The caller owns every collaborator; the product borrows them for the
/// duration of one `produce` call.
pub struct ProductionContext<'a> {
    pub world: &'a mut dyn World,
    pub scripts: &'a mut dyn ScriptHost,
    pub rng: &'a mut dyn RandomSource,
    pub config: &'a ProductionConfig,
    /// The owning revision's inputs, in recipe order.
    pub inputs: &'a [RecipeInput],
}

impl<'a> ProductionContext<'a> {
    pub fn new(
        world: &'a mut dyn World,
        scripts: &'a mut dyn ScriptHost,
        rng: &'a mut dyn RandomSource,
        config: &'a ProductionConfig,
        inputs: &'a [RecipeInput],
    ) -> Self {
        Self {
            world,
            scripts,
            rng,
            config,
            inputs,
        }
    }

    /// Quality for a newly made item: the attempt's, unless quality
    /// calculation is switched off server-wide.
    pub fn item_quality(&self, attempt: ItemQuality) -> Option<ItemQuality> {
        if self.config.disable_quality_calculation {
            None
        } else {
            Some(attempt)
        }
    }

    pub fn create_item(&mut self, product: ProductId, spawn: ItemSpawn) -> EntityId {
        let entity = self.world.create_item(spawn);
        self.world
            .notify(ProductionEvent::EntityCreated { product, entity });
        entity
    }

    pub fn create_commodity(&mut self, product: ProductId, spawn: CommoditySpawn) -> EntityId {
        let entity = self.world.create_commodity(spawn);
        self.world
            .notify(ProductionEvent::EntityCreated { product, entity });
        entity
    }

    pub fn create_currency_pile(&mut self, product: ProductId, spawn: CurrencySpawn) -> EntityId {
        let entity = self.world.create_currency_pile(spawn);
        self.world
            .notify(ProductionEvent::EntityCreated { product, entity });
        entity
    }

    /// Create `quantity` items from `base`: one stack when the prototype
    /// stacks and more than one is wanted, otherwise discrete items.
    pub fn create_copies(
        &mut self,
        product: ProductId,
        prototype: &PrototypeInfo,
        quantity: u32,
        base: ItemSpawn,
    ) -> Vec<EntityId> {
        if quantity > 1 && prototype.stackable {
            let spawn = ItemSpawn { quantity, ..base };
            return vec![self.create_item(product, spawn)];
        }
        (0..quantity)
            .map(|_| {
                let spawn = ItemSpawn {
                    quantity: 1,
                    ..base.clone()
                };
                self.create_item(product, spawn)
            })
            .collect()
    }
}

/// The facts of one completed attempt, as seen by one product.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub product: ProductId,
    pub consumed: &'a ConsumedInputs,
    pub quality: ItemQuality,
    /// Material read off the product's material-defining input, if any.
    pub material: Option<MaterialId>,
}
