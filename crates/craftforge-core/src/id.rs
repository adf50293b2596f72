use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a live world entity (item, commodity pile, currency pile)
    /// created by or consumed in a craft.
    pub struct EntityId;
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifies a persisted product. Cheap to copy and compare.
    ProductId
);
numeric_id!(
    /// Identifies a recipe (craft). Revisions share the recipe id.
    RecipeId
);
numeric_id!(
    /// Stable identifier of one input slot within a single recipe revision.
    /// Freshly allocated on every revision.
    InputId
);
numeric_id!(
    /// Stable identifier of one tool slot within a single recipe revision.
    ToolId
);
numeric_id!(
    /// Identifies an item prototype in the world catalog.
    PrototypeId
);
numeric_id!(MaterialId);
numeric_id!(SkinId);
numeric_id!(TagId);
numeric_id!(CurrencyId);
numeric_id!(
    /// Identifies one coin denomination of a currency.
    CoinId
);
numeric_id!(
    /// Identifies a characteristic definition (colour, fine colour, shape...).
    CharacteristicId
);
numeric_id!(CharacteristicValueId);
numeric_id!(NpcTemplateId);
numeric_id!(BloodModelId);
numeric_id!(BloodTypeId);
numeric_id!(AntigenId);
numeric_id!(ScriptId);
numeric_id!(LiquidId);
numeric_id!(
    /// Identifies a character. Used as the source identity of blood.
    CharacterId
);
numeric_id!(LocationId);
