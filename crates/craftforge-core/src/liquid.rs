//! Liquid mixtures consumed by liquid inputs.
//!
//! A mixture is a bag of liquid instances. Blood instances additionally carry
//! the identity of the character the blood came from and, when known, the
//! blood type; the forensic products read those.

use crate::fixed::Fixed64;
use crate::id::{BloodTypeId, CharacterId, LiquidId};
use serde::{Deserialize, Serialize};

/// Where a quantity of blood came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BloodSample {
    /// Source identity compared by DNA tests.
    pub donor: CharacterId,
    pub blood_type: Option<BloodTypeId>,
}

/// One liquid within a mixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidInstance {
    pub liquid: LiquidId,
    pub amount: Fixed64,
    #[serde(default)]
    pub blood: Option<BloodSample>,
}

impl LiquidInstance {
    pub fn new(liquid: LiquidId, amount: Fixed64) -> Self {
        Self {
            liquid,
            amount,
            blood: None,
        }
    }

    pub fn blood(liquid: LiquidId, amount: Fixed64, sample: BloodSample) -> Self {
        Self {
            liquid,
            amount,
            blood: Some(sample),
        }
    }
}

/// The exact mixture a liquid input consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidMixture {
    pub instances: Vec<LiquidInstance>,
}

impl LiquidMixture {
    pub fn new(instances: Vec<LiquidInstance>) -> Self {
        Self { instances }
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn total_amount(&self) -> Fixed64 {
        self.instances.iter().map(|i| i.amount).sum()
    }

    /// Every blood sample in the mixture, in mixture order.
    pub fn blood_samples(&self) -> impl Iterator<Item = &BloodSample> {
        self.instances.iter().filter_map(|i| i.blood.as_ref())
    }
}
