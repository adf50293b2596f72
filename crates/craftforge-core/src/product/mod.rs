//! Products: configured output strategies attached to a recipe revision.
//!
//! Every variant implements [`ProductVariant`]. [`ProductKind`] is the closed
//! set of variants and dispatches via enum match. [`Product`] wraps a kind
//! with the persisted fields every product shares: owning recipe and
//! revision, creation time, failure flag and material-defining input.

pub mod blood_typing;
pub mod commodity;
pub mod currency;
pub mod dna;
pub mod input_variable;
pub mod npc;
pub mod scrap;
pub mod script;
pub mod script_variable;
pub mod simple;
pub mod template;
pub mod unused;
pub mod variable;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{CommandTokens, EditContext, EditError, EditReport, resolve_input};
use crate::context::{Attempt, ProductionContext};
use crate::id::{
    CharacteristicId, EntityId, InputId, MaterialId, ProductId, PrototypeId, RecipeId, ScriptId,
};
use crate::input::{ConsumedInputs, RecipeInput};
use crate::item::ItemQuality;
use crate::output::ProducedOutput;
use crate::registry::{ProductRegistry, ProductRegistryBuilder, RegistryError};
use crate::revision::RevisionRemap;
use crate::validation::{ValidationContext, check_material_input};
use crate::world::World;

pub use blood_typing::BloodTypingProduct;
pub use commodity::CommodityProduct;
pub use currency::CurrencyProduct;
pub use dna::DnaTestProduct;
pub use input_variable::{InputLookup, InputVariableProduct};
pub use npc::NpcProduct;
pub use scrap::ScrapProduct;
pub use script::ScriptProduct;
pub use script_variable::{ScriptBinding, ScriptVariableProduct};
pub use simple::SimpleProduct;
pub use template::ItemTemplate;
pub use unused::UnusedInputProduct;
pub use variable::{VariableBinding, VariableProduct};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A definition blob could not be read or written.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("malformed product definition: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Production was asked of a configuration that cannot produce. Fatal for
/// that production call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProductionError {
    #[error("the {0} of this product is not set")]
    NotConfigured(&'static str),
    #[error("input {0} was not consumed by this attempt")]
    InputNotConsumed(InputId),
    #[error("input {0} consumed nothing this product can use")]
    InputEmpty(InputId),
    #[error("entity {0:?} no longer exists")]
    MissingEntity(EntityId),
    #[error("the world has no {kind} {id}")]
    MissingDefinition { kind: &'static str, id: String },
    #[error("entity {entity:?} has no value for characteristic {characteristic}")]
    MissingCharacteristic {
        entity: EntityId,
        characteristic: CharacteristicId,
    },
    #[error("no value of characteristic {characteristic} is mapped for prototype {prototype}")]
    NoMapping {
        characteristic: CharacteristicId,
        prototype: PrototypeId,
    },
    #[error("script {script} returned {found}, which is not an item or a collection of items")]
    ScriptResult { script: ScriptId, found: String },
    #[error("{0} products cannot produce output yet")]
    NotImplemented(&'static str),
}

impl ProductionError {
    pub(crate) fn missing(kind: &'static str, id: impl std::fmt::Display) -> Self {
        ProductionError::MissingDefinition {
            kind,
            id: id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// The shared contract
// ---------------------------------------------------------------------------

/// Behaviour every product variant provides.
///
/// The definition blob is the variant's serde form, so
/// `Serialize`/`DeserializeOwned` double as save and load.
pub trait ProductVariant:
    Clone + Default + Serialize + DeserializeOwned + Into<ProductKind>
{
    /// Persisted type tag.
    const TAG: &'static str;
    /// Editing commands this variant understands, one per line.
    const HELP: &'static str;

    fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError>;

    /// The reason this configuration cannot be used, or `None` if it can.
    fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String>;

    /// This configuration with every input and tool reference carried
    /// through `remap`. Must not touch anything else.
    fn remapped(&self, remap: &RevisionRemap) -> Self;

    /// One-line operator summary.
    fn describe(&self, ctx: &ValidationContext<'_>) -> String;

    /// Apply one editing command. `command` is the lower-cased keyword that
    /// was already taken from `tokens`.
    fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError>;
}

/// Rejection for a keyword no handler recognised: the variant's help plus
/// the commands every product understands.
pub fn unknown_command(variant_help: &str) -> EditError {
    EditError::UnknownCommand {
        help: format!("{variant_help}\n{BASE_HELP}"),
    }
}

const BASE_HELP: &str = "\
show - describes this product
materialinput <#> - sets the input whose material overrides the product's
materialinput none - clears the material-defining input";

fn load_variant<T: ProductVariant>(definition: &Value) -> Result<ProductKind, DefinitionError> {
    let variant: T = serde_json::from_value(definition.clone())?;
    Ok(variant.into())
}

fn create_variant<T: ProductVariant>() -> ProductKind {
    T::default().into()
}

fn tag_of<T: ProductVariant>(_: &T) -> &'static str {
    T::TAG
}

fn help_of<T: ProductVariant>(_: &T) -> &'static str {
    T::HELP
}

fn register<T: ProductVariant>(builder: &mut ProductRegistryBuilder) -> Result<(), RegistryError> {
    builder.register(T::TAG, load_variant::<T>, create_variant::<T>)
}

/// Register every built-in variant exactly once.
pub fn register_builtin_products(builder: &mut ProductRegistryBuilder) -> Result<(), RegistryError> {
    register::<SimpleProduct>(builder)?;
    register::<VariableProduct>(builder)?;
    register::<ScriptVariableProduct>(builder)?;
    register::<InputVariableProduct>(builder)?;
    register::<CommodityProduct>(builder)?;
    register::<CurrencyProduct>(builder)?;
    register::<ScrapProduct>(builder)?;
    register::<UnusedInputProduct>(builder)?;
    register::<ScriptProduct>(builder)?;
    register::<NpcProduct>(builder)?;
    register::<BloodTypingProduct>(builder)?;
    register::<DnaTestProduct>(builder)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// ProductKind
// ---------------------------------------------------------------------------

/// Every product variant. Dispatches via enum match (no trait objects).
#[derive(Debug, Clone, PartialEq)]
pub enum ProductKind {
    Simple(SimpleProduct),
    Variable(VariableProduct),
    ScriptVariable(ScriptVariableProduct),
    InputVariable(InputVariableProduct),
    Commodity(CommodityProduct),
    Currency(CurrencyProduct),
    Scrap(ScrapProduct),
    UnusedInput(UnusedInputProduct),
    Script(ScriptProduct),
    Npc(NpcProduct),
    BloodTyping(BloodTypingProduct),
    DnaTest(DnaTestProduct),
}

macro_rules! dispatch {
    ($value:expr, $p:ident => $body:expr) => {
        match $value {
            ProductKind::Simple($p) => $body,
            ProductKind::Variable($p) => $body,
            ProductKind::ScriptVariable($p) => $body,
            ProductKind::InputVariable($p) => $body,
            ProductKind::Commodity($p) => $body,
            ProductKind::Currency($p) => $body,
            ProductKind::Scrap($p) => $body,
            ProductKind::UnusedInput($p) => $body,
            ProductKind::Script($p) => $body,
            ProductKind::Npc($p) => $body,
            ProductKind::BloodTyping($p) => $body,
            ProductKind::DnaTest($p) => $body,
        }
    };
}

macro_rules! into_kind {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for ProductKind {
                fn from(product: $ty) -> Self {
                    ProductKind::$variant(product)
                }
            }
        )*
    };
}

into_kind!(
    Simple(SimpleProduct),
    Variable(VariableProduct),
    ScriptVariable(ScriptVariableProduct),
    InputVariable(InputVariableProduct),
    Commodity(CommodityProduct),
    Currency(CurrencyProduct),
    Scrap(ScrapProduct),
    UnusedInput(UnusedInputProduct),
    Script(ScriptProduct),
    Npc(NpcProduct),
    BloodTyping(BloodTypingProduct),
    DnaTest(DnaTestProduct),
);

impl ProductKind {
    pub fn tag(&self) -> &'static str {
        dispatch!(self, p => tag_of(p))
    }

    pub fn help(&self) -> &'static str {
        dispatch!(self, p => help_of(p))
    }

    pub fn produce(
        &self,
        attempt: &Attempt<'_>,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        dispatch!(self, p => p.produce(attempt, ctx))
    }

    pub fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        dispatch!(self, p => p.why_not_valid(ctx))
    }

    pub fn remapped(&self, remap: &RevisionRemap) -> ProductKind {
        dispatch!(self, p => p.remapped(remap).into())
    }

    pub fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        dispatch!(self, p => p.describe(ctx))
    }

    pub fn edit(
        &mut self,
        command: &str,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        dispatch!(self, p => p.edit(command, tokens, ctx))
    }

    /// The definition blob for this configuration.
    pub fn to_definition(&self) -> Result<Value, DefinitionError> {
        Ok(dispatch!(self, p => serde_json::to_value(p)?))
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// Persisted form of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub recipe: RecipeId,
    pub revision: u32,
    pub tag: String,
    pub definition: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub failure: bool,
    /// 0-based position of the material-defining input.
    #[serde(default)]
    pub material_input: Option<usize>,
}

/// A product owned by exactly one recipe revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    recipe: RecipeId,
    revision: u32,
    created_at: DateTime<Utc>,
    failure: bool,
    material_input: Option<usize>,
    kind: ProductKind,
}

impl Product {
    pub fn new(
        id: ProductId,
        recipe: RecipeId,
        revision: u32,
        kind: impl Into<ProductKind>,
    ) -> Self {
        Self {
            id,
            recipe,
            revision,
            created_at: Utc::now(),
            failure: false,
            material_input: None,
            kind: kind.into(),
        }
    }

    /// A blank product of the given tag for a live editor. `None` when the
    /// tag is unknown.
    pub fn create_for_editing(
        registry: &ProductRegistry,
        tag: &str,
        id: ProductId,
        recipe: RecipeId,
        revision: u32,
    ) -> Option<Self> {
        let kind = registry.create_for_editing(tag)?;
        Some(Self::new(id, recipe, revision, kind))
    }

    /// Rehydrate from a persisted record.
    pub fn from_record(
        registry: &ProductRegistry,
        record: &ProductRecord,
    ) -> Result<Self, RegistryError> {
        let kind = registry.load(&record.tag, &record.definition, record.recipe)?;
        Ok(Self {
            id: record.id,
            recipe: record.recipe,
            revision: record.revision,
            created_at: record.created_at,
            failure: record.failure,
            material_input: record.material_input,
            kind,
        })
    }

    pub fn to_record(&self) -> Result<ProductRecord, DefinitionError> {
        Ok(ProductRecord {
            id: self.id,
            recipe: self.recipe,
            revision: self.revision,
            tag: self.tag().to_string(),
            definition: self.serialize_definition()?,
            created_at: self.created_at,
            failure: self.failure,
            material_input: self.material_input,
        })
    }

    /// The record this product becomes in the next revision. Only the
    /// definition's references change; the material input index is
    /// positional and survives as-is.
    pub fn record_for_revision(
        &self,
        remap: &RevisionRemap,
        id: ProductId,
        revision: u32,
    ) -> Result<ProductRecord, DefinitionError> {
        Ok(ProductRecord {
            id,
            revision,
            definition: self.serialize_definition_for_revision(remap)?,
            ..self.to_record()?
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn recipe(&self) -> RecipeId {
        self.recipe
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn kind(&self) -> &ProductKind {
        &self.kind
    }

    pub fn is_failure(&self) -> bool {
        self.failure
    }

    pub fn set_failure(&mut self, failure: bool) {
        self.failure = failure;
    }

    pub fn material_input(&self) -> Option<usize> {
        self.material_input
    }

    pub fn set_material_input(&mut self, index: Option<usize>) {
        self.material_input = index;
    }

    pub fn serialize_definition(&self) -> Result<Value, DefinitionError> {
        self.kind.to_definition()
    }

    /// As [`serialize_definition`](Self::serialize_definition), with every
    /// stored input and tool reference carried through `remap`.
    pub fn serialize_definition_for_revision(
        &self,
        remap: &RevisionRemap,
    ) -> Result<Value, DefinitionError> {
        self.kind.remapped(remap).to_definition()
    }

    /// Material of whatever filled the material-defining input, if that
    /// input is set, consumes items and was actually consumed.
    pub fn material_override(
        &self,
        inputs: &[RecipeInput],
        consumed: &ConsumedInputs,
        world: &dyn World,
    ) -> Option<MaterialId> {
        let input = inputs.get(self.material_input?)?;
        if !input.kind.consumes_items() {
            return None;
        }
        let entity = consumed.get(input.id)?.items().first().copied()?;
        world.entity(entity)?.material
    }

    pub fn produce(
        &self,
        consumed: &ConsumedInputs,
        quality: ItemQuality,
        ctx: &mut ProductionContext<'_>,
    ) -> Result<ProducedOutput, ProductionError> {
        let material = self.material_override(ctx.inputs, consumed, &*ctx.world);
        let attempt = Attempt {
            product: self.id,
            consumed,
            quality,
            material,
        };
        log::debug!(
            "product {} ({}) producing for recipe {} revision {}",
            self.id,
            self.tag(),
            self.recipe,
            self.revision
        );
        self.kind.produce(&attempt, ctx)
    }

    pub fn why_not_valid(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        check_material_input(ctx.inputs, self.material_input).or_else(|| self.kind.why_not_valid(ctx))
    }

    pub fn is_valid(&self, ctx: &ValidationContext<'_>) -> bool {
        self.why_not_valid(ctx).is_none()
    }

    pub fn describe(&self, ctx: &ValidationContext<'_>) -> String {
        let mut text = format!("Product {} [{}]: {}", self.id, self.tag(), self.kind.describe(ctx));
        if let Some(index) = self.material_input {
            text.push_str(&format!(" (material from input ${})", index + 1));
        }
        if self.failure {
            text.push_str(" (on failure)");
        }
        text
    }

    pub fn help(&self) -> String {
        format!("{}\n{BASE_HELP}", self.kind.help())
    }

    /// Apply one editing command. On error the product is unchanged.
    pub fn edit(
        &mut self,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        let Some(command) = tokens.pop_keyword() else {
            return Err(EditError::UnknownCommand { help: self.help() });
        };
        let validation = ValidationContext::new(ctx.inputs, ctx.catalog);
        let result = match command.as_str() {
            "show" => Ok(EditReport::new(self.describe(&validation))),
            "materialinput" => self.edit_material_input(tokens, ctx),
            _ => self.kind.edit(&command, tokens, ctx),
        };
        if let Ok(report) = &result {
            log::debug!(
                "{} edited product {}: {}",
                ctx.actor.name,
                self.id,
                report.message
            );
        }
        result
    }

    fn edit_material_input(
        &mut self,
        tokens: &mut CommandTokens,
        ctx: &EditContext<'_>,
    ) -> Result<EditReport, EditError> {
        let Some(text) = tokens.pop() else {
            return Err(EditError::MissingArgument {
                usage: "materialinput <#> | materialinput none",
            });
        };
        if text.eq_ignore_ascii_case("none") {
            self.material_input = None;
            return Ok(EditReport::new(
                "This product no longer takes its material from an input.",
            ));
        }
        let (index, input) = resolve_input(ctx.inputs, &text)?;
        if !input.kind.consumes_items() {
            return Err(EditError::IncompatibleInput {
                ordinal: index + 1,
                actual: input.kind.name(),
                expected: "an item input",
            });
        }
        self.material_input = Some(index);
        Ok(EditReport::new(format!(
            "This product now takes its material from input ${}.",
            index + 1
        )))
    }
}
