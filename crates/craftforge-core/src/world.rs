//! Seams to the surrounding game world.
//!
//! Products never own the world object model. They read catalog facts through
//! [`WorldCatalog`], create and move entities through [`World`], and call out
//! to the scripting engine through [`ScriptHost`]. Hosts implement these
//! traits over their own storage; `test_utils` provides in-memory versions.

use crate::event::ProductionEvent;
use crate::fixed::{Fixed64, basis_points};
use crate::id::*;
use crate::item::{CommoditySpawn, CurrencySpawn, EntityInfo, ItemSpawn};
use crate::liquid::LiquidMixture;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Vertical layer within a location that released products land in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    #[default]
    GroundLevel,
    Underwater,
    InTrees,
    InAir,
}

/// Approval state of a revisable world definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionStatus {
    #[default]
    UnderDesign,
    PendingRevision,
    Current,
    Obsolete,
}

// ---------------------------------------------------------------------------
// Catalog facts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrototypeInfo {
    pub id: PrototypeId,
    pub name: String,
    /// Whether one entity can represent a stack of this prototype.
    pub stackable: bool,
    /// Characteristic definitions every item of this prototype must carry.
    pub characteristics: Vec<CharacteristicId>,
}

impl PrototypeInfo {
    pub fn describe(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialInfo {
    pub id: MaterialId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinInfo {
    pub id: SkinId,
    pub name: String,
    /// The prototype this skin was designed for.
    pub prototype: PrototypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinInfo {
    pub id: CoinId,
    pub name: String,
    /// Value of one coin in the currency's base units.
    pub value: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub id: CurrencyId,
    pub name: String,
    pub coins: Vec<CoinInfo>,
}

impl CurrencyInfo {
    /// Greedy largest-coin-first breakdown of `amount`.
    ///
    /// Values are counted in whole ten-thousandths, so decimal coins such as
    /// 0.01 divide exactly. Any remainder smaller than the smallest coin is
    /// dropped.
    pub fn breakdown(&self, amount: Fixed64) -> Vec<(CoinId, u32)> {
        let mut coins: Vec<(CoinId, u64)> = self
            .coins
            .iter()
            .map(|c| (c.id, basis_points(c.value)))
            .filter(|&(_, value)| value > 0)
            .collect();
        coins.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut remaining = basis_points(amount);
        let mut result = Vec::new();
        for (id, value) in coins {
            let count = (remaining / value).min(u32::MAX as u64);
            if count > 0 {
                remaining -= value * count;
                result.push((id, count as u32));
            }
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicValueInfo {
    pub id: CharacteristicValueId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub id: CharacteristicId,
    pub name: String,
    /// Every legal value, in catalog order.
    pub values: Vec<CharacteristicValueInfo>,
}

impl CharacteristicInfo {
    pub fn contains(&self, value: CharacteristicValueId) -> bool {
        self.values.iter().any(|v| v.id == value)
    }

    pub fn value(&self, value: CharacteristicValueId) -> Option<&CharacteristicValueInfo> {
        self.values.iter().find(|v| v.id == value)
    }

    /// Find a value by name (case-insensitive) or `#id`.
    pub fn find_value(&self, text: &str) -> Option<&CharacteristicValueInfo> {
        match parse_id_text(text) {
            Some(id) => self.values.iter().find(|v| v.id.0 == id),
            None => self
                .values
                .iter()
                .find(|v| v.name.eq_ignore_ascii_case(text.trim())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcTemplateInfo {
    pub id: NpcTemplateId,
    pub name: String,
    pub status: RevisionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntigenInfo {
    pub id: AntigenId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloodTypeInfo {
    pub id: BloodTypeId,
    pub name: String,
    pub antigens: BTreeSet<AntigenId>,
}

/// Association of named blood types to the antigen markers each carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloodModel {
    pub id: BloodModelId,
    pub name: String,
    pub antigens: Vec<AntigenInfo>,
    pub blood_types: Vec<BloodTypeInfo>,
}

impl BloodModel {
    pub fn blood_type(&self, id: BloodTypeId) -> Option<&BloodTypeInfo> {
        self.blood_types.iter().find(|t| t.id == id)
    }

    /// The single type whose antigen set equals `observed` exactly.
    pub fn exact_match(&self, observed: &BTreeSet<AntigenId>) -> Option<&BloodTypeInfo> {
        self.blood_types.iter().find(|t| &t.antigens == observed)
    }

    pub fn antigen_name(&self, id: AntigenId) -> String {
        self.antigens
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

/// Declared shape of a script parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptType {
    Void,
    Boolean,
    Number,
    Text,
    Item,
    ItemCollection,
    Liquid,
    Dictionary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub id: ScriptId,
    pub name: String,
    pub compiled: bool,
    pub return_type: ScriptType,
    pub parameters: Vec<ScriptType>,
}

impl ScriptInfo {
    pub fn accepts(&self, parameters: &[ScriptType]) -> bool {
        self.parameters == parameters
    }
}

/// A value passed to or returned from a script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
    Item(EntityId),
    Liquid(LiquidMixture),
    Collection(Vec<ScriptValue>),
    Dictionary(BTreeMap<String, ScriptValue>),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Null => "null",
            ScriptValue::Boolean(_) => "a boolean",
            ScriptValue::Number(_) => "a number",
            ScriptValue::Text(_) => "text",
            ScriptValue::Item(_) => "an item",
            ScriptValue::Liquid(_) => "a liquid",
            ScriptValue::Collection(_) => "a collection",
            ScriptValue::Dictionary(_) => "a dictionary",
        }
    }
}

/// Parse editor text of the form `#12` or `12` into a raw id.
pub fn parse_id_text(text: &str) -> Option<u64> {
    let text = text.trim();
    text.strip_prefix('#').unwrap_or(text).parse().ok()
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read-only lookups into world definitions.
///
/// `find_*` methods resolve what an editor typed: a name (case-insensitive)
/// or an id written as `#12` / `12`.
pub trait WorldCatalog {
    fn prototype(&self, id: PrototypeId) -> Option<PrototypeInfo>;
    fn find_prototype(&self, text: &str) -> Option<PrototypeInfo>;

    fn material(&self, id: MaterialId) -> Option<MaterialInfo>;
    fn find_material(&self, text: &str) -> Option<MaterialInfo>;

    fn skin(&self, id: SkinId) -> Option<SkinInfo>;
    fn find_skin(&self, text: &str) -> Option<SkinInfo>;

    fn tag(&self, id: TagId) -> Option<TagInfo>;
    fn find_tag(&self, text: &str) -> Option<TagInfo>;

    fn currency(&self, id: CurrencyId) -> Option<CurrencyInfo>;
    fn find_currency(&self, text: &str) -> Option<CurrencyInfo>;

    fn characteristic(&self, id: CharacteristicId) -> Option<CharacteristicInfo>;
    fn find_characteristic(&self, text: &str) -> Option<CharacteristicInfo>;

    fn npc_template(&self, id: NpcTemplateId) -> Option<NpcTemplateInfo>;
    fn find_npc_template(&self, text: &str) -> Option<NpcTemplateInfo>;

    fn blood_model(&self, id: BloodModelId) -> Option<BloodModel>;
    fn find_blood_model(&self, text: &str) -> Option<BloodModel>;

    fn script(&self, id: ScriptId) -> Option<ScriptInfo>;
    fn find_script(&self, text: &str) -> Option<ScriptInfo>;
}

/// Mutating access to the world object model.
pub trait World: WorldCatalog {
    fn create_item(&mut self, spawn: ItemSpawn) -> EntityId;
    fn create_commodity(&mut self, spawn: CommoditySpawn) -> EntityId;
    fn create_currency_pile(&mut self, spawn: CurrencySpawn) -> EntityId;

    fn entity(&self, id: EntityId) -> Option<EntityInfo>;
    fn characteristic_value(
        &self,
        id: EntityId,
        characteristic: CharacteristicId,
    ) -> Option<CharacteristicValueId>;

    /// Insert an entity into a location at the given layer.
    fn place(&mut self, id: EntityId, location: LocationId, layer: Layer);
    /// Permanently remove an entity.
    fn delete(&mut self, id: EntityId);
    /// Unload an entity without deleting its persisted state.
    fn quit(&mut self, id: EntityId);
    /// Finish wiring up an entity that was restored from a save.
    fn finalize_loading(&mut self, id: EntityId);

    /// Show text to everyone present at a location and layer.
    fn broadcast(&mut self, location: LocationId, layer: Layer, text: &str);
    fn notify(&mut self, event: ProductionEvent);
}

/// The scripting engine. Arguments are positional.
pub trait ScriptHost {
    fn invoke(&mut self, script: ScriptId, args: Vec<ScriptValue>) -> ScriptValue;
}
