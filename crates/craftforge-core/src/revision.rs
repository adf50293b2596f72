//! Id remapping applied when a recipe is revised.
//!
//! A revision allocates fresh ids for every input and tool. Products carry
//! their references across through a [`RevisionRemap`]: a reference with a
//! mapping takes the new id, a reference without one becomes unset (`None`).
//! Stale ids never survive a revision.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::id::{InputId, ToolId};
use crate::input::RecipeInput;
use crate::registry::{ProductRegistry, RegistryError};

/// Old id to new id lookup for one revision step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionRemap {
    inputs: BTreeMap<InputId, InputId>,
    tools: BTreeMap<ToolId, ToolId>,
}

impl RevisionRemap {
    /// An empty remap. Applying it unsets every reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// A remap that maps every listed id to itself.
    pub fn identity(
        inputs: impl IntoIterator<Item = InputId>,
        tools: impl IntoIterator<Item = ToolId>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(|id| (id, id)).collect(),
            tools: tools.into_iter().map(|id| (id, id)).collect(),
        }
    }

    pub fn insert_input(&mut self, old: InputId, new: InputId) {
        self.inputs.insert(old, new);
    }

    pub fn insert_tool(&mut self, old: ToolId, new: ToolId) {
        self.tools.insert(old, new);
    }

    /// Carry an input reference across the revision.
    pub fn input(&self, old: Option<InputId>) -> Option<InputId> {
        old.and_then(|id| self.inputs.get(&id).copied())
    }

    /// Carry a tool reference across the revision.
    pub fn tool(&self, old: Option<ToolId>) -> Option<ToolId> {
        old.and_then(|id| self.tools.get(&id).copied())
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

/// Allocate fresh ids for `inputs`, starting at `next_id`.
///
/// Returns the re-identified inputs (same order, same kinds) and the remap
/// from their old ids, plus the next unused id.
pub fn reallocate_inputs(
    inputs: &[RecipeInput],
    mut next_id: u64,
) -> (Vec<RecipeInput>, RevisionRemap, u64) {
    let mut remap = RevisionRemap::new();
    let mut fresh = Vec::with_capacity(inputs.len());
    for input in inputs {
        let new_id = InputId(next_id);
        next_id += 1;
        remap.insert_input(input.id, new_id);
        fresh.push(RecipeInput {
            id: new_id,
            ..input.clone()
        });
    }
    (fresh, remap, next_id)
}

/// Remap a stored definition blob without building a live product.
///
/// Pure: the same blob and remap always give the same result. Fails only if
/// the tag is unknown or the blob cannot be decoded as that tag.
pub fn remap_definition(
    registry: &ProductRegistry,
    tag: &str,
    definition: &Value,
    remap: &RevisionRemap,
) -> Result<Value, RegistryError> {
    let kind = registry.decode(tag, definition)?;
    kind.remapped(remap)
        .to_definition()
        .map_err(|source| RegistryError::Definition {
            tag: tag.to_string(),
            source,
        })
}
