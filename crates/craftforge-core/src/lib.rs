//! Craftforge Core -- the product production engine for crafting recipes.
//!
//! A recipe revision owns an ordered list of inputs and two sets of
//! products, one released when a craft attempt succeeds and one when it
//! fails. Each product is a configured output strategy: it turns a snapshot
//! of what the attempt consumed into new world entities or a forensic
//! report.
//!
//! # Production Flow
//!
//! 1. **Load** -- [`registry::ProductRegistry`] rebuilds each stored product
//!    from its type tag and definition blob. Unknown tags are skipped.
//! 2. **Validate** -- every product reports why it cannot be used (if it
//!    cannot) against the revision's current inputs and the world catalog.
//! 3. **Produce** -- when an attempt completes, each product reads the
//!    [`input::ConsumedInputs`] snapshot and returns a
//!    [`output::ProducedOutput`].
//! 4. **Release** -- the caller hands the output to a location exactly once,
//!    or deletes or unloads it.
//!
//! # Editing and Revision
//!
//! Products are edited live through a line-oriented command protocol
//! ([`command`]). An applied edit marks the product dirty and the owning
//! [`recipe::RecipeRevision`] recomputes validity. Revising a recipe
//! allocates fresh input ids; every product carries its references across
//! through a [`revision::RevisionRemap`], and references with no mapping
//! become unset.
//!
//! # Key Types
//!
//! - [`product::ProductVariant`] -- The contract every variant implements.
//! - [`product::ProductKind`] -- The closed set of twelve variants.
//! - [`product::Product`] -- A variant plus its persisted common fields.
//! - [`world::World`] / [`world::WorldCatalog`] / [`world::ScriptHost`] --
//!   Seams to the host's object model and scripting engine.
//! - [`rng::RandomSource`] -- Injected randomness for forensic test error.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for weights and amounts.

pub mod command;
pub mod config;
pub mod context;
pub mod dirty;
pub mod event;
pub mod fixed;
pub mod id;
pub mod input;
pub mod item;
pub mod liquid;
pub mod output;
pub mod product;
pub mod recipe;
pub mod registry;
pub mod revision;
pub mod rng;
pub mod validation;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
