use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;

use crate::id::RecipeId;
use crate::product::{DefinitionError, ProductKind, register_builtin_products};

/// Rebuilds a product kind from its definition blob.
pub type LoadFn = fn(&Value) -> Result<ProductKind, DefinitionError>;

/// Creates a blank product kind for the live editor.
pub type CreateFn = fn() -> ProductKind;

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    load: LoadFn,
    create: CreateFn,
}

/// Builder for constructing an immutable ProductRegistry.
/// Every tag is registered once; the result is frozen by `build()`.
#[derive(Debug, Default)]
pub struct ProductRegistryBuilder {
    entries: HashMap<&'static str, RegistryEntry>,
    order: Vec<&'static str>,
}

impl ProductRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the construction functions for one type tag.
    pub fn register(
        &mut self,
        tag: &'static str,
        load: LoadFn,
        create: CreateFn,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(tag) {
            return Err(RegistryError::DuplicateTag(tag.to_string()));
        }
        self.entries.insert(tag, RegistryEntry { load, create });
        self.order.push(tag);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn build(self) -> ProductRegistry {
        log::info!(
            "product registry populated with {} type(s): {}",
            self.order.len(),
            self.order.join(", ")
        );
        ProductRegistry {
            entries: self.entries,
            order: self.order,
        }
    }
}

/// Immutable tag -> construction table. Frozen after build(). Thread-safe to
/// share.
#[derive(Debug)]
pub struct ProductRegistry {
    entries: HashMap<&'static str, RegistryEntry>,
    order: Vec<&'static str>,
}

static GLOBAL: OnceLock<ProductRegistry> = OnceLock::new();

impl ProductRegistry {
    /// A registry holding every built-in product type.
    pub fn builtin() -> Self {
        let mut builder = ProductRegistryBuilder::new();
        if let Err(err) = register_builtin_products(&mut builder) {
            log::error!("built-in product registration failed: {err}");
        }
        builder.build()
    }

    /// The process-wide registry, populated with the built-in types on
    /// first use and never again.
    pub fn global() -> &'static ProductRegistry {
        GLOBAL.get_or_init(Self::builtin)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Decode a definition blob as the given tag.
    pub fn decode(&self, tag: &str, definition: &Value) -> Result<ProductKind, RegistryError> {
        let entry = self
            .entries
            .get(tag)
            .ok_or_else(|| RegistryError::UnknownTag(tag.to_string()))?;
        (entry.load)(definition).map_err(|source| RegistryError::Definition {
            tag: tag.to_string(),
            source,
        })
    }

    /// Rebuild a stored product of `recipe`. Callers loading a whole recipe
    /// skip products that fail here instead of aborting.
    pub fn load(
        &self,
        tag: &str,
        definition: &Value,
        recipe: RecipeId,
    ) -> Result<ProductKind, RegistryError> {
        let result = self.decode(tag, definition);
        if let Err(err) = &result {
            log::warn!("recipe {recipe}: cannot load product: {err}");
        }
        result
    }

    /// A blank product for the live editor. `None` for an unknown tag.
    pub fn create_for_editing(&self, tag: &str) -> Option<ProductKind> {
        self.entries.get(tag).map(|entry| (entry.create)())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no such product type: {0}")]
    UnknownTag(String),
    #[error("product type registered twice: {0}")]
    DuplicateTag(String),
    #[error("invalid {tag} product definition: {source}")]
    Definition {
        tag: String,
        #[source]
        source: DefinitionError,
    },
}
