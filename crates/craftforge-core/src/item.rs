use crate::fixed::Fixed64;
use crate::id::*;
use serde::{Deserialize, Serialize};

/// Quality grade carried by crafted items, lowest to highest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ItemQuality {
    Terrible,
    ExtremelyBad,
    Bad,
    Poor,
    Substandard,
    #[default]
    Standard,
    Good,
    VeryGood,
    Great,
    Excellent,
    Heroic,
    Legendary,
}

impl ItemQuality {
    pub const ALL: [ItemQuality; 12] = [
        ItemQuality::Terrible,
        ItemQuality::ExtremelyBad,
        ItemQuality::Bad,
        ItemQuality::Poor,
        ItemQuality::Substandard,
        ItemQuality::Standard,
        ItemQuality::Good,
        ItemQuality::VeryGood,
        ItemQuality::Great,
        ItemQuality::Excellent,
        ItemQuality::Heroic,
        ItemQuality::Legendary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ItemQuality::Terrible => "terrible",
            ItemQuality::ExtremelyBad => "extremely bad",
            ItemQuality::Bad => "bad",
            ItemQuality::Poor => "poor",
            ItemQuality::Substandard => "substandard",
            ItemQuality::Standard => "standard",
            ItemQuality::Good => "good",
            ItemQuality::VeryGood => "very good",
            ItemQuality::Great => "great",
            ItemQuality::Excellent => "excellent",
            ItemQuality::Heroic => "heroic",
            ItemQuality::Legendary => "legendary",
        }
    }

    /// Grade from its ordinal, clamping out-of-range values to the ends.
    pub fn from_ordinal(ordinal: i32) -> Self {
        let index = ordinal.clamp(0, Self::ALL.len() as i32 - 1) as usize;
        Self::ALL[index]
    }
}

/// Request to create one item entity (possibly a stack).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpawn {
    pub prototype: PrototypeId,
    /// Stack size. 1 for a discrete item.
    pub quantity: u32,
    /// `None` leaves the prototype's default quality.
    pub quality: Option<ItemQuality>,
    pub skin: Option<SkinId>,
    /// `None` leaves the prototype's default material.
    pub material: Option<MaterialId>,
    pub characteristics: Vec<(CharacteristicId, CharacteristicValueId)>,
}

impl ItemSpawn {
    pub fn new(prototype: PrototypeId, quantity: u32) -> Self {
        Self {
            prototype,
            quantity,
            quality: None,
            skin: None,
            material: None,
            characteristics: Vec::new(),
        }
    }
}

/// Request to create a raw-material (commodity) pile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommoditySpawn {
    pub material: MaterialId,
    pub weight: Fixed64,
    pub tag: Option<TagId>,
}

/// Request to create a currency pile with an exact coin breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencySpawn {
    pub currency: CurrencyId,
    pub coins: Vec<(CoinId, u32)>,
}

/// What production may read off an existing world entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    pub id: EntityId,
    pub prototype: PrototypeId,
    pub quantity: u32,
    /// Total weight of the entity including its whole stack.
    pub weight: Fixed64,
    pub material: Option<MaterialId>,
    pub quality: ItemQuality,
    pub skin: Option<SkinId>,
}
