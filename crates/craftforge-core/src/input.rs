//! Recipe inputs as products see them, and the per-attempt record of what
//! each input actually consumed.

use crate::id::{CharacteristicId, EntityId, InputId};
use crate::liquid::LiquidMixture;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// What an input slot consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    /// A single item.
    Item,
    /// A homogeneous group of items.
    ItemGroup,
    /// A measured quantity of liquid.
    Liquid,
    /// Supplies a characteristic from an entity without consuming it.
    Characteristic,
}

impl InputKind {
    /// Item and item-group inputs consume physical items.
    pub fn consumes_items(self) -> bool {
        matches!(self, InputKind::Item | InputKind::ItemGroup)
    }

    pub fn is_liquid(self) -> bool {
        self == InputKind::Liquid
    }

    pub fn name(self) -> &'static str {
        match self {
            InputKind::Item => "item",
            InputKind::ItemGroup => "item group",
            InputKind::Liquid => "liquid",
            InputKind::Characteristic => "characteristic",
        }
    }
}

/// One declared input of a recipe revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeInput {
    pub id: InputId,
    pub kind: InputKind,
    /// Operator-facing summary, e.g. "2x an iron ingot".
    #[serde(default)]
    pub description: String,
    /// Characteristics this input can determine from the entity filling it.
    #[serde(default)]
    pub determines: Vec<CharacteristicId>,
}

impl RecipeInput {
    pub fn new(id: InputId, kind: InputKind) -> Self {
        Self {
            id,
            kind,
            description: String::new(),
            determines: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn determining(mut self, characteristic: CharacteristicId) -> Self {
        self.determines.push(characteristic);
        self
    }

    /// Whether the entity filling this input decides `characteristic`.
    pub fn determines_variable(&self, characteristic: CharacteristicId) -> bool {
        self.determines.contains(&characteristic)
    }
}

/// Find an input by id, with its 0-based position.
pub fn find_input(inputs: &[RecipeInput], id: InputId) -> Option<(usize, &RecipeInput)> {
    inputs.iter().enumerate().find(|(_, input)| input.id == id)
}

/// Render an input reference for operator output.
pub fn describe_input(inputs: &[RecipeInput], id: Option<InputId>) -> String {
    match id.and_then(|id| find_input(inputs, id)) {
        Some((index, input)) if input.description.is_empty() => {
            format!("input ${} ({})", index + 1, input.kind.name())
        }
        Some((index, input)) => format!("input ${} ({})", index + 1, input.description),
        None if id.is_some() => "a missing input".to_string(),
        None => "no input".to_string(),
    }
}

/// What one input consumed during an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumedInput {
    Item(EntityId),
    ItemGroup(Vec<EntityId>),
    Liquid(LiquidMixture),
    Characteristic(EntityId),
}

impl ConsumedInput {
    /// Consumed item entities, in consumption order. Empty for liquids and
    /// characteristic suppliers.
    pub fn items(&self) -> &[EntityId] {
        match self {
            ConsumedInput::Item(entity) => std::slice::from_ref(entity),
            ConsumedInput::ItemGroup(entities) => entities,
            ConsumedInput::Liquid(_) | ConsumedInput::Characteristic(_) => &[],
        }
    }

    /// The entity a characteristic is read from: the single item, the first
    /// group member, or the characteristic supplier.
    pub fn lead_entity(&self) -> Option<EntityId> {
        match self {
            ConsumedInput::Item(entity) | ConsumedInput::Characteristic(entity) => Some(*entity),
            ConsumedInput::ItemGroup(entities) => entities.first().copied(),
            ConsumedInput::Liquid(_) => None,
        }
    }

    pub fn liquid(&self) -> Option<&LiquidMixture> {
        match self {
            ConsumedInput::Liquid(mixture) => Some(mixture),
            _ => None,
        }
    }
}

/// Snapshot of everything one craft attempt consumed, keyed by input.
///
/// Production only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedInputs {
    entries: BTreeMap<InputId, ConsumedInput>,
}

impl ConsumedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, input: InputId, consumed: ConsumedInput) {
        self.entries.insert(input, consumed);
    }

    pub fn with(mut self, input: InputId, consumed: ConsumedInput) -> Self {
        self.insert(input, consumed);
        self
    }

    pub fn get(&self, input: InputId) -> Option<&ConsumedInput> {
        self.entries.get(&input)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InputId, &ConsumedInput)> {
        self.entries.iter().map(|(id, c)| (*id, c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entity involved in the attempt that a participant could
    /// perceive: consumed items, group members and characteristic suppliers.
    pub fn perceivable_entities(&self) -> Vec<EntityId> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for consumed in self.entries.values() {
            let entities = match consumed {
                ConsumedInput::Item(entity) | ConsumedInput::Characteristic(entity) => {
                    std::slice::from_ref(entity)
                }
                ConsumedInput::ItemGroup(entities) => entities.as_slice(),
                ConsumedInput::Liquid(_) => &[],
            };
            result.extend(entities.iter().copied().filter(|e| seen.insert(*e)));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn entities(n: usize) -> Vec<EntityId> {
        let mut sm: SlotMap<EntityId, ()> = SlotMap::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    #[test]
    fn kind_predicates() {
        assert!(InputKind::Item.consumes_items());
        assert!(InputKind::ItemGroup.consumes_items());
        assert!(!InputKind::Liquid.consumes_items());
        assert!(InputKind::Liquid.is_liquid());
        assert!(!InputKind::Characteristic.consumes_items());
    }

    #[test]
    fn find_and_describe_inputs() {
        let inputs = vec![
            RecipeInput::new(InputId(10), InputKind::Item).with_description("an iron ingot"),
            RecipeInput::new(InputId(11), InputKind::Liquid),
        ];
        assert_eq!(find_input(&inputs, InputId(11)).map(|(i, _)| i), Some(1));
        assert!(find_input(&inputs, InputId(12)).is_none());
        assert_eq!(
            describe_input(&inputs, Some(InputId(10))),
            "input $1 (an iron ingot)"
        );
        assert_eq!(describe_input(&inputs, Some(InputId(11))), "input $2 (liquid)");
        assert_eq!(describe_input(&inputs, Some(InputId(99))), "a missing input");
        assert_eq!(describe_input(&inputs, None), "no input");
    }

    #[test]
    fn determines_variable() {
        let input = RecipeInput::new(InputId(1), InputKind::Item).determining(CharacteristicId(4));
        assert!(input.determines_variable(CharacteristicId(4)));
        assert!(!input.determines_variable(CharacteristicId(5)));
    }

    #[test]
    fn consumed_items_and_lead_entity() {
        let ids = entities(3);
        let group = ConsumedInput::ItemGroup(vec![ids[1], ids[2]]);
        assert_eq!(group.items(), &[ids[1], ids[2]]);
        assert_eq!(group.lead_entity(), Some(ids[1]));
        assert_eq!(ConsumedInput::Item(ids[0]).items(), &[ids[0]]);
        assert!(ConsumedInput::Liquid(LiquidMixture::default()).items().is_empty());
        assert_eq!(ConsumedInput::Characteristic(ids[0]).lead_entity(), Some(ids[0]));
    }

    #[test]
    fn perceivable_entities_union() {
        let ids = entities(4);
        let consumed = ConsumedInputs::new()
            .with(InputId(1), ConsumedInput::Item(ids[0]))
            .with(InputId(2), ConsumedInput::ItemGroup(vec![ids[1], ids[2]]))
            .with(InputId(3), ConsumedInput::Liquid(LiquidMixture::default()))
            .with(InputId(4), ConsumedInput::Characteristic(ids[3]));
        assert_eq!(consumed.perceivable_entities(), ids);
        assert_eq!(consumed.len(), 4);
    }

    #[test]
    fn perceivable_entities_lists_shared_entities_once() {
        let ids = entities(3);
        // The same tool supplies an item input and a characteristic, with
        // an unrelated group in between.
        let consumed = ConsumedInputs::new()
            .with(InputId(1), ConsumedInput::Item(ids[0]))
            .with(InputId(2), ConsumedInput::ItemGroup(vec![ids[1], ids[2]]))
            .with(InputId(3), ConsumedInput::Characteristic(ids[0]))
            .with(InputId(4), ConsumedInput::ItemGroup(vec![ids[2], ids[1]]));
        assert_eq!(consumed.perceivable_entities(), vec![ids[0], ids[1], ids[2]]);
    }
}
