//! Configuration checks shared by product variants.
//!
//! Invalid configuration is never an error: each check returns the reason a
//! product cannot be used, or `None` when it is fine.

use crate::fixed::Fixed64;
use crate::id::InputId;
use crate::input::{RecipeInput, find_input};
use crate::world::WorldCatalog;

/// What a product is validated against: its owning revision's current input
/// list and the world catalog.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub inputs: &'a [RecipeInput],
    pub catalog: &'a dyn WorldCatalog,
}

impl<'a> ValidationContext<'a> {
    pub fn new(inputs: &'a [RecipeInput], catalog: &'a dyn WorldCatalog) -> Self {
        Self { inputs, catalog }
    }
}

/// The reference must name a live input that consumes items.
pub fn check_item_input(
    inputs: &[RecipeInput],
    input: Option<InputId>,
    role: &str,
) -> Option<String> {
    let Some(id) = input else {
        return Some(format!("You must set the {role} input."));
    };
    match find_input(inputs, id) {
        None => Some(format!("The {role} input no longer exists in this recipe.")),
        Some((index, found)) if !found.kind.consumes_items() => Some(format!(
            "The {role} input (${}) consumes a {}, but it must consume items.",
            index + 1,
            found.kind.name()
        )),
        Some(_) => None,
    }
}

/// The reference must name a live input that consumes a liquid.
pub fn check_liquid_input(
    inputs: &[RecipeInput],
    input: Option<InputId>,
    role: &str,
) -> Option<String> {
    let Some(id) = input else {
        return Some(format!("You must set the {role} input."));
    };
    match find_input(inputs, id) {
        None => Some(format!("The {role} input no longer exists in this recipe.")),
        Some((index, found)) if !found.kind.is_liquid() => Some(format!(
            "The {role} input (${}) consumes {}, but it must consume a liquid.",
            index + 1,
            found.kind.name()
        )),
        Some(_) => None,
    }
}

/// A material-defining input index, when set, must point at an item input.
pub fn check_material_input(inputs: &[RecipeInput], index: Option<usize>) -> Option<String> {
    let index = index?;
    match inputs.get(index) {
        None => Some(format!(
            "The material-defining input ${} does not exist in this recipe.",
            index + 1
        )),
        Some(input) if !input.kind.consumes_items() => Some(format!(
            "The material-defining input ${} consumes a {}, which has no material.",
            index + 1,
            input.kind.name()
        )),
        Some(_) => None,
    }
}

/// Check a fraction lies in (0, 1].
pub fn check_percentage(value: Fixed64, role: &str) -> Option<String> {
    if value <= Fixed64::ZERO || value > Fixed64::from_num(1) {
        return Some(format!(
            "The {role} percentage must be greater than 0% and at most 100%."
        ));
    }
    None
}
