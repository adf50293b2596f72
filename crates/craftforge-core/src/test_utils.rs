//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests and, via the `test-utils` feature, in other
//! crates' tests.

use std::collections::{BTreeMap, HashMap, VecDeque};

use slotmap::SlotMap;

use crate::command::{Actor, EditContext};
use crate::config::ProductionConfig;
use crate::context::{Attempt, ProductionContext};
use crate::event::{EventLog, ProductionEvent};
use crate::fixed::Fixed64;
use crate::id::*;
use crate::input::{ConsumedInputs, RecipeInput};
use crate::item::{CommoditySpawn, CurrencySpawn, EntityInfo, ItemQuality, ItemSpawn};
use crate::output::ProducedOutput;
use crate::product::{Product, ProductVariant, ProductionError};
use crate::rng::RandomSource;
use crate::validation::ValidationContext;
use crate::world::*;

// ===========================================================================
// Helpers
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// The character every test edit is made by.
pub fn actor() -> Actor {
    Actor {
        id: CharacterId(1),
        name: "Editor".into(),
    }
}

fn matches_text(id: u64, name: &str, text: &str) -> bool {
    match parse_id_text(text) {
        Some(wanted) => wanted == id,
        None => name.eq_ignore_ascii_case(text.trim()),
    }
}

// ===========================================================================
// TestWorld
// ===========================================================================

/// Where an entity currently is, as far as the test world knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Live,
    Placed(LocationId, Layer),
    Deleted,
    Quit,
    Finalized,
}

#[derive(Debug, Clone)]
enum Body {
    Item(ItemSpawn),
    Commodity(CommoditySpawn),
    Currency(CurrencySpawn),
}

#[derive(Debug, Clone)]
struct TestEntity {
    body: Body,
    weight: Fixed64,
    characteristics: HashMap<CharacteristicId, CharacteristicValueId>,
    state: EntityState,
}

/// In-memory world: a catalog plus a slotmap of entities.
///
/// Every catalog id comes from one counter, so ids never collide across
/// kinds.
#[derive(Debug, Default)]
pub struct TestWorld {
    next_id: u64,
    entities: SlotMap<EntityId, TestEntity>,
    prototypes: Vec<PrototypeInfo>,
    materials: Vec<MaterialInfo>,
    skins: Vec<SkinInfo>,
    tags: Vec<TagInfo>,
    currencies: Vec<CurrencyInfo>,
    characteristics: Vec<CharacteristicInfo>,
    npc_templates: Vec<NpcTemplateInfo>,
    blood_models: Vec<BloodModel>,
    scripts: Vec<ScriptInfo>,
    pub events: EventLog,
    pub broadcasts: Vec<(LocationId, Layer, String)>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    // -- catalog builders ---------------------------------------------------

    pub fn add_prototype(
        &mut self,
        name: &str,
        stackable: bool,
        characteristics: Vec<CharacteristicId>,
    ) -> PrototypeId {
        let id = PrototypeId(self.allocate());
        self.prototypes.push(PrototypeInfo {
            id,
            name: name.to_string(),
            stackable,
            characteristics,
        });
        id
    }

    pub fn add_material(&mut self, name: &str) -> MaterialId {
        let id = MaterialId(self.allocate());
        self.materials.push(MaterialInfo {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_skin(&mut self, name: &str, prototype: PrototypeId) -> SkinId {
        let id = SkinId(self.allocate());
        self.skins.push(SkinInfo {
            id,
            name: name.to_string(),
            prototype,
        });
        id
    }

    pub fn add_tag(&mut self, name: &str) -> TagId {
        let id = TagId(self.allocate());
        self.tags.push(TagInfo {
            id,
            name: name.to_string(),
        });
        id
    }

    /// A currency with `(coin name, value)` denominations.
    pub fn add_currency(&mut self, name: &str, coins: &[(&str, f64)]) -> CurrencyId {
        let id = CurrencyId(self.allocate());
        let coins = coins
            .iter()
            .map(|(coin, value)| CoinInfo {
                id: CoinId(self.allocate()),
                name: coin.to_string(),
                value: fixed(*value),
            })
            .collect();
        self.currencies.push(CurrencyInfo {
            id,
            name: name.to_string(),
            coins,
        });
        id
    }

    pub fn add_characteristic(&mut self, name: &str, values: &[&str]) -> CharacteristicId {
        let id = CharacteristicId(self.allocate());
        let values = values
            .iter()
            .map(|value| CharacteristicValueInfo {
                id: CharacteristicValueId(self.allocate()),
                name: value.to_string(),
            })
            .collect();
        self.characteristics.push(CharacteristicInfo {
            id,
            name: name.to_string(),
            values,
        });
        id
    }

    pub fn value_named(&self, characteristic: CharacteristicId, name: &str) -> CharacteristicValueId {
        self.characteristic(characteristic)
            .and_then(|c| c.find_value(name).map(|v| v.id))
            .expect("characteristic value registered in the test world")
    }

    pub fn add_npc_template(&mut self, name: &str, status: RevisionStatus) -> NpcTemplateId {
        let id = NpcTemplateId(self.allocate());
        self.npc_templates.push(NpcTemplateInfo {
            id,
            name: name.to_string(),
            status,
        });
        id
    }

    /// A blood model from antigen names and `(type name, antigen names)`.
    pub fn add_blood_model(
        &mut self,
        name: &str,
        antigens: &[&str],
        types: &[(&str, &[&str])],
    ) -> BloodModelId {
        let id = BloodModelId(self.allocate());
        let antigens: Vec<AntigenInfo> = antigens
            .iter()
            .map(|antigen| AntigenInfo {
                id: AntigenId(self.allocate()),
                name: antigen.to_string(),
            })
            .collect();
        let blood_types = types
            .iter()
            .map(|(type_name, carried)| BloodTypeInfo {
                id: BloodTypeId(self.allocate()),
                name: type_name.to_string(),
                antigens: antigens
                    .iter()
                    .filter(|a| carried.contains(&a.name.as_str()))
                    .map(|a| a.id)
                    .collect(),
            })
            .collect();
        self.blood_models.push(BloodModel {
            id,
            name: name.to_string(),
            antigens,
            blood_types,
        });
        id
    }

    pub fn blood_model_info(&self, model: BloodModelId) -> BloodModel {
        self.blood_model(model)
            .expect("blood model registered in the test world")
    }

    pub fn blood_type_named(&self, model: BloodModelId, name: &str) -> BloodTypeId {
        self.blood_model_info(model)
            .blood_types
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.id)
            .expect("blood type registered in the test world")
    }

    /// A compiled script with the given signature.
    pub fn add_script(
        &mut self,
        name: &str,
        return_type: ScriptType,
        parameters: Vec<ScriptType>,
    ) -> ScriptId {
        let id = ScriptId(self.allocate());
        self.scripts.push(ScriptInfo {
            id,
            name: name.to_string(),
            compiled: true,
            return_type,
            parameters,
        });
        id
    }

    pub fn set_script_compiled(&mut self, script: ScriptId, compiled: bool) {
        if let Some(info) = self.scripts.iter_mut().find(|s| s.id == script) {
            info.compiled = compiled;
        }
    }

    // -- entity builders ----------------------------------------------------

    /// An existing item weighing one unit per item, with no material.
    pub fn add_item(&mut self, prototype: PrototypeId, quantity: u32) -> EntityId {
        self.insert_item(ItemSpawn::new(prototype, quantity), fixed(quantity as f64))
    }

    /// An existing item with an explicit total weight and material.
    pub fn add_item_of(
        &mut self,
        prototype: PrototypeId,
        quantity: u32,
        weight: Fixed64,
        material: MaterialId,
    ) -> EntityId {
        let spawn = ItemSpawn {
            material: Some(material),
            ..ItemSpawn::new(prototype, quantity)
        };
        self.insert_item(spawn, weight)
    }

    fn insert_item(&mut self, spawn: ItemSpawn, weight: Fixed64) -> EntityId {
        let characteristics = spawn.characteristics.iter().copied().collect();
        self.entities.insert(TestEntity {
            body: Body::Item(spawn),
            weight,
            characteristics,
            state: EntityState::Live,
        })
    }

    pub fn set_characteristic(
        &mut self,
        entity: EntityId,
        characteristic: CharacteristicId,
        value: CharacteristicValueId,
    ) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.characteristics.insert(characteristic, value);
        }
    }

    // -- queries ------------------------------------------------------------

    pub fn entity_info(&self, id: EntityId) -> Option<EntityInfo> {
        self.entity(id)
    }

    /// The request an item entity was created from.
    pub fn spawn_of(&self, id: EntityId) -> Option<ItemSpawn> {
        match &self.entities.get(id)?.body {
            Body::Item(spawn) => Some(spawn.clone()),
            _ => None,
        }
    }

    pub fn commodity_of(&self, id: EntityId) -> Option<CommoditySpawn> {
        match &self.entities.get(id)?.body {
            Body::Commodity(spawn) => Some(spawn.clone()),
            _ => None,
        }
    }

    pub fn currency_of(&self, id: EntityId) -> Option<CurrencySpawn> {
        match &self.entities.get(id)?.body {
            Body::Currency(spawn) => Some(spawn.clone()),
            _ => None,
        }
    }

    pub fn entity_state(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(id).map(|e| e.state)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn set_state(&mut self, id: EntityId, state: EntityState) {
        if let Some(e) = self.entities.get_mut(id) {
            e.state = state;
        }
    }
}

impl WorldCatalog for TestWorld {
    fn prototype(&self, id: PrototypeId) -> Option<PrototypeInfo> {
        self.prototypes.iter().find(|p| p.id == id).cloned()
    }

    fn find_prototype(&self, text: &str) -> Option<PrototypeInfo> {
        self.prototypes
            .iter()
            .find(|p| matches_text(p.id.0, &p.name, text))
            .cloned()
    }

    fn material(&self, id: MaterialId) -> Option<MaterialInfo> {
        self.materials.iter().find(|m| m.id == id).cloned()
    }

    fn find_material(&self, text: &str) -> Option<MaterialInfo> {
        self.materials
            .iter()
            .find(|m| matches_text(m.id.0, &m.name, text))
            .cloned()
    }

    fn skin(&self, id: SkinId) -> Option<SkinInfo> {
        self.skins.iter().find(|s| s.id == id).cloned()
    }

    fn find_skin(&self, text: &str) -> Option<SkinInfo> {
        self.skins
            .iter()
            .find(|s| matches_text(s.id.0, &s.name, text))
            .cloned()
    }

    fn tag(&self, id: TagId) -> Option<TagInfo> {
        self.tags.iter().find(|t| t.id == id).cloned()
    }

    fn find_tag(&self, text: &str) -> Option<TagInfo> {
        self.tags
            .iter()
            .find(|t| matches_text(t.id.0, &t.name, text))
            .cloned()
    }

    fn currency(&self, id: CurrencyId) -> Option<CurrencyInfo> {
        self.currencies.iter().find(|c| c.id == id).cloned()
    }

    fn find_currency(&self, text: &str) -> Option<CurrencyInfo> {
        self.currencies
            .iter()
            .find(|c| matches_text(c.id.0, &c.name, text))
            .cloned()
    }

    fn characteristic(&self, id: CharacteristicId) -> Option<CharacteristicInfo> {
        self.characteristics.iter().find(|c| c.id == id).cloned()
    }

    fn find_characteristic(&self, text: &str) -> Option<CharacteristicInfo> {
        self.characteristics
            .iter()
            .find(|c| matches_text(c.id.0, &c.name, text))
            .cloned()
    }

    fn npc_template(&self, id: NpcTemplateId) -> Option<NpcTemplateInfo> {
        self.npc_templates.iter().find(|t| t.id == id).cloned()
    }

    fn find_npc_template(&self, text: &str) -> Option<NpcTemplateInfo> {
        self.npc_templates
            .iter()
            .find(|t| matches_text(t.id.0, &t.name, text))
            .cloned()
    }

    fn blood_model(&self, id: BloodModelId) -> Option<BloodModel> {
        self.blood_models.iter().find(|m| m.id == id).cloned()
    }

    fn find_blood_model(&self, text: &str) -> Option<BloodModel> {
        self.blood_models
            .iter()
            .find(|m| matches_text(m.id.0, &m.name, text))
            .cloned()
    }

    fn script(&self, id: ScriptId) -> Option<ScriptInfo> {
        self.scripts.iter().find(|s| s.id == id).cloned()
    }

    fn find_script(&self, text: &str) -> Option<ScriptInfo> {
        self.scripts
            .iter()
            .find(|s| matches_text(s.id.0, &s.name, text))
            .cloned()
    }
}

impl World for TestWorld {
    fn create_item(&mut self, spawn: ItemSpawn) -> EntityId {
        let weight = fixed(spawn.quantity as f64);
        self.insert_item(spawn, weight)
    }

    fn create_commodity(&mut self, spawn: CommoditySpawn) -> EntityId {
        let weight = spawn.weight;
        self.entities.insert(TestEntity {
            body: Body::Commodity(spawn),
            weight,
            characteristics: HashMap::new(),
            state: EntityState::Live,
        })
    }

    fn create_currency_pile(&mut self, spawn: CurrencySpawn) -> EntityId {
        self.entities.insert(TestEntity {
            body: Body::Currency(spawn),
            weight: Fixed64::ZERO,
            characteristics: HashMap::new(),
            state: EntityState::Live,
        })
    }

    fn entity(&self, id: EntityId) -> Option<EntityInfo> {
        let entity = self.entities.get(id)?;
        if matches!(entity.state, EntityState::Deleted) {
            return None;
        }
        let info = match &entity.body {
            Body::Item(spawn) => EntityInfo {
                id,
                prototype: spawn.prototype,
                quantity: spawn.quantity,
                weight: entity.weight,
                material: spawn.material,
                quality: spawn.quality.unwrap_or(ItemQuality::Standard),
                skin: spawn.skin,
            },
            Body::Commodity(spawn) => EntityInfo {
                id,
                prototype: PrototypeId(0),
                quantity: 1,
                weight: entity.weight,
                material: Some(spawn.material),
                quality: ItemQuality::Standard,
                skin: None,
            },
            Body::Currency(_) => EntityInfo {
                id,
                prototype: PrototypeId(0),
                quantity: 1,
                weight: entity.weight,
                material: None,
                quality: ItemQuality::Standard,
                skin: None,
            },
        };
        Some(info)
    }

    fn characteristic_value(
        &self,
        id: EntityId,
        characteristic: CharacteristicId,
    ) -> Option<CharacteristicValueId> {
        self.entities
            .get(id)?
            .characteristics
            .get(&characteristic)
            .copied()
    }

    fn place(&mut self, id: EntityId, location: LocationId, layer: Layer) {
        self.set_state(id, EntityState::Placed(location, layer));
    }

    fn delete(&mut self, id: EntityId) {
        self.set_state(id, EntityState::Deleted);
    }

    fn quit(&mut self, id: EntityId) {
        self.set_state(id, EntityState::Quit);
    }

    fn finalize_loading(&mut self, id: EntityId) {
        self.set_state(id, EntityState::Finalized);
    }

    fn broadcast(&mut self, location: LocationId, layer: Layer, text: &str) {
        self.broadcasts.push((location, layer, text.to_string()));
    }

    fn notify(&mut self, event: ProductionEvent) {
        self.events.record(event);
    }
}

// ===========================================================================
// Scripts and randomness
// ===========================================================================

/// Script host answering with canned values and recording every call.
#[derive(Debug, Default)]
pub struct TestScripts {
    responses: BTreeMap<ScriptId, ScriptValue>,
    calls: Vec<(ScriptId, Vec<ScriptValue>)>,
}

impl TestScripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call to `script` returns `value`. Unset scripts return `Null`.
    pub fn respond(&mut self, script: ScriptId, value: ScriptValue) {
        self.responses.insert(script, value);
    }

    pub fn calls(&self) -> &[(ScriptId, Vec<ScriptValue>)] {
        &self.calls
    }
}

impl ScriptHost for TestScripts {
    fn invoke(&mut self, script: ScriptId, args: Vec<ScriptValue>) -> ScriptValue {
        self.calls.push((script, args));
        self.responses
            .get(&script)
            .cloned()
            .unwrap_or(ScriptValue::Null)
    }
}

/// Random source replaying queued answers. An empty queue rolls `false` and
/// picks index 0.
#[derive(Debug, Default)]
pub struct ScriptedRng {
    rolls: VecDeque<bool>,
    picks: VecDeque<usize>,
}

impl ScriptedRng {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_roll(&mut self, outcome: bool) {
        self.rolls.push_back(outcome);
    }

    pub fn push_pick(&mut self, index: usize) {
        self.picks.push_back(index);
    }
}

impl RandomSource for ScriptedRng {
    fn roll(&mut self, _probability: Fixed64) -> bool {
        self.rolls.pop_front().unwrap_or(false)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.picks.pop_front().unwrap_or(0) % len.max(1)
    }
}

// ===========================================================================
// TestHarness
// ===========================================================================

/// Everything a production call needs, owned in one place.
#[derive(Debug)]
pub struct TestHarness {
    pub world: TestWorld,
    pub scripts: TestScripts,
    pub rng: ScriptedRng,
    pub config: ProductionConfig,
    pub inputs: Vec<RecipeInput>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            world: TestWorld::new(),
            scripts: TestScripts::new(),
            rng: ScriptedRng::new(),
            config: ProductionConfig::default(),
            inputs: Vec::new(),
        }
    }

    /// Run one variant directly as product `#1`, with no material override.
    pub fn produce<T: ProductVariant>(
        &mut self,
        product: &T,
        consumed: &ConsumedInputs,
        quality: ItemQuality,
    ) -> Result<ProducedOutput, ProductionError> {
        let attempt = Attempt {
            product: ProductId(1),
            consumed,
            quality,
            material: None,
        };
        let mut ctx = ProductionContext::new(
            &mut self.world,
            &mut self.scripts,
            &mut self.rng,
            &self.config,
            &self.inputs,
        );
        product.produce(&attempt, &mut ctx)
    }

    /// Run a full product, including its material override.
    pub fn produce_product(
        &mut self,
        product: &Product,
        consumed: &ConsumedInputs,
        quality: ItemQuality,
    ) -> Result<ProducedOutput, ProductionError> {
        let mut ctx = ProductionContext::new(
            &mut self.world,
            &mut self.scripts,
            &mut self.rng,
            &self.config,
            &self.inputs,
        );
        product.produce(consumed, quality, &mut ctx)
    }

    pub fn validation(&self) -> ValidationContext<'_> {
        ValidationContext::new(&self.inputs, &self.world)
    }

    pub fn edit_context<'a>(&'a self, actor: &'a Actor) -> EditContext<'a> {
        EditContext {
            catalog: &self.world,
            inputs: &self.inputs,
            actor,
        }
    }
}
