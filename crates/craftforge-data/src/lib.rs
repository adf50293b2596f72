//! Data-file loading for the craftforge production engine.
//!
//! Reads the production configuration and stored recipe revisions from a
//! directory of RON, TOML, or JSON files and rebuilds them into core types.
//!
//! | File                      | Required | Contents                       |
//! |---------------------------|----------|--------------------------------|
//! | `production.{ron,toml,json}` | no    | [`ProductionConfig`] switches  |
//! | `recipes.{ron,toml,json}`    | yes   | recipe revisions and products  |
//!
//! [`ProductionConfig`]: craftforge_core::config::ProductionConfig

pub mod loader;
pub mod recipes;
pub mod schema;

pub use loader::{CraftData, DataLoadError, load_craft_data, load_production_config};
