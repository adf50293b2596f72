//! The transient result of one production call.
//!
//! A [`ProducedOutput`] owns the entities a product just created until it is
//! released into a location. Its lifecycle methods take `self` by value, so
//! an output can be released, deleted or quit at most once. If the server
//! saves while a craft is still running, the output is written with
//! [`to_bytes`](ProducedOutput::to_bytes) and restored with
//! [`from_bytes`](ProducedOutput::from_bytes) followed by
//! [`finalize_after_load`](ProducedOutput::finalize_after_load).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::event::ProductionEvent;
use crate::id::{AntigenId, BloodTypeId, EntityId, LocationId, ProductId};
use crate::liquid::LiquidMixture;
use crate::world::{Layer, World};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a produced-output snapshot.
pub const OUTPUT_MAGIC: u32 = 0xC4AF_0001;

/// Current output snapshot version. Increment when breaking the format.
pub const OUTPUT_FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", OUTPUT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported output version {0} (this build reads {OUTPUT_FORMAT_VERSION})")]
    UnsupportedVersion(u32),
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// What a forensic test concluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForensicFinding {
    BloodType {
        /// Antigens the test reported, after any simulated error.
        antigens: BTreeSet<AntigenId>,
        matched: Option<BloodTypeId>,
    },
    Dna {
        matched: bool,
    },
}

/// A narrative test result broadcast on release instead of objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForensicReport {
    pub text: String,
    pub finding: ForensicFinding,
    /// The mixtures that were tested.
    pub samples: Vec<LiquidMixture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Payload {
    Entities(Vec<EntityId>),
    Forensic(ForensicReport),
}

#[derive(Serialize, Deserialize)]
struct OutputSnapshot {
    magic: u32,
    version: u32,
    product: ProductId,
    payload: Payload,
}

// ---------------------------------------------------------------------------
// ProducedOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedOutput {
    product: ProductId,
    payload: Payload,
}

impl ProducedOutput {
    /// Output owning freshly created world entities.
    pub fn entities(product: ProductId, entities: Vec<EntityId>) -> Self {
        Self {
            product,
            payload: Payload::Entities(entities),
        }
    }

    /// Output carrying a forensic report and no entities.
    pub fn forensic(product: ProductId, report: ForensicReport) -> Self {
        Self {
            product,
            payload: Payload::Forensic(report),
        }
    }

    pub fn product(&self) -> ProductId {
        self.product
    }

    /// The entities this output owns. Empty for forensic reports.
    pub fn created(&self) -> &[EntityId] {
        match &self.payload {
            Payload::Entities(entities) => entities,
            Payload::Forensic(_) => &[],
        }
    }

    pub fn report(&self) -> Option<&ForensicReport> {
        match &self.payload {
            Payload::Forensic(report) => Some(report),
            Payload::Entities(_) => None,
        }
    }

    /// Finish restoring owned entities after a save was loaded.
    pub fn finalize_after_load(&mut self, world: &mut dyn World) {
        for &entity in self.created() {
            world.finalize_loading(entity);
        }
    }

    /// Hand every owned entity to `location`, or announce the forensic
    /// result to everyone there.
    pub fn release_into(self, world: &mut dyn World, location: LocationId, layer: Layer) {
        match self.payload {
            Payload::Entities(entities) => {
                for &entity in &entities {
                    world.place(entity, location, layer);
                }
                log::debug!(
                    "product {} released {} entities into {location}",
                    self.product,
                    entities.len()
                );
                world.notify(ProductionEvent::OutputReleased {
                    product: self.product,
                    location,
                    entities: entities.len(),
                });
            }
            Payload::Forensic(report) => {
                world.broadcast(location, layer, &report.text);
                world.notify(ProductionEvent::ForensicReported {
                    product: self.product,
                    location,
                    text: report.text,
                });
            }
        }
    }

    /// Permanently remove every owned entity.
    pub fn delete(self, world: &mut dyn World) {
        for &entity in self.created() {
            world.delete(entity);
        }
        world.notify(ProductionEvent::OutputDiscarded {
            product: self.product,
            deleted: true,
        });
    }

    /// Unload every owned entity without deleting it.
    pub fn quit(self, world: &mut dyn World) {
        for &entity in self.created() {
            world.quit(entity);
        }
        world.notify(ProductionEvent::OutputDiscarded {
            product: self.product,
            deleted: false,
        });
    }

    /// Serialize for a mid-craft save.
    pub fn to_bytes(&self) -> Result<Vec<u8>, OutputError> {
        let snapshot = OutputSnapshot {
            magic: OUTPUT_MAGIC,
            version: OUTPUT_FORMAT_VERSION,
            product: self.product,
            payload: self.payload.clone(),
        };
        bitcode::serialize(&snapshot).map_err(|e| OutputError::Encode(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, OutputError> {
        let snapshot: OutputSnapshot =
            bitcode::deserialize(data).map_err(|e| OutputError::Decode(e.to_string()))?;
        if snapshot.magic != OUTPUT_MAGIC {
            return Err(OutputError::InvalidMagic(snapshot.magic));
        }
        if snapshot.version != OUTPUT_FORMAT_VERSION {
            return Err(OutputError::UnsupportedVersion(snapshot.version));
        }
        Ok(Self {
            product: snapshot.product,
            payload: snapshot.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::id::{CharacterId, LiquidId};
    use crate::item::ItemSpawn;
    use crate::liquid::{BloodSample, LiquidInstance};
    use crate::fixed::Fixed64;
    use crate::test_utils::{EntityState, TestWorld};

    fn world_with_items(n: usize) -> (TestWorld, Vec<EntityId>) {
        let mut world = TestWorld::new();
        let proto = world.add_prototype("nail", true, vec![]);
        let ids = (0..n)
            .map(|_| world.create_item(ItemSpawn::new(proto, 1)))
            .collect();
        (world, ids)
    }

    fn report() -> ForensicReport {
        ForensicReport {
            text: "The DNA test reports a match.".into(),
            finding: ForensicFinding::Dna { matched: true },
            samples: vec![LiquidMixture::new(vec![LiquidInstance::blood(
                LiquidId(1),
                Fixed64::from_num(1),
                BloodSample {
                    donor: CharacterId(3),
                    blood_type: None,
                },
            )])],
        }
    }

    #[test]
    fn release_places_every_entity() {
        let (mut world, ids) = world_with_items(2);
        let output = ProducedOutput::entities(ProductId(1), ids.clone());
        output.release_into(&mut world, LocationId(5), Layer::InTrees);
        for id in ids {
            assert_eq!(
                world.entity_state(id),
                Some(EntityState::Placed(LocationId(5), Layer::InTrees))
            );
        }
        assert_eq!(world.events.of_kind(EventKind::OutputReleased).count(), 1);
    }

    #[test]
    fn forensic_release_broadcasts() {
        let mut world = TestWorld::new();
        let output = ProducedOutput::forensic(ProductId(2), report());
        assert!(output.created().is_empty());
        output.release_into(&mut world, LocationId(9), Layer::GroundLevel);
        assert_eq!(
            world.broadcasts,
            vec![(
                LocationId(9),
                Layer::GroundLevel,
                "The DNA test reports a match.".to_string()
            )]
        );
        assert_eq!(world.events.of_kind(EventKind::ForensicReported).count(), 1);
    }

    #[test]
    fn delete_and_quit_discard() {
        let (mut world, ids) = world_with_items(2);
        ProducedOutput::entities(ProductId(1), vec![ids[0]]).delete(&mut world);
        ProducedOutput::entities(ProductId(1), vec![ids[1]]).quit(&mut world);
        assert_eq!(world.entity_state(ids[0]), Some(EntityState::Deleted));
        assert_eq!(world.entity_state(ids[1]), Some(EntityState::Quit));
        assert_eq!(world.events.of_kind(EventKind::OutputDiscarded).count(), 2);
    }

    #[test]
    fn snapshot_round_trip_then_finalize() {
        let (mut world, ids) = world_with_items(3);
        let output = ProducedOutput::entities(ProductId(4), ids.clone());
        let bytes = output.to_bytes().unwrap();
        let mut restored = ProducedOutput::from_bytes(&bytes).unwrap();
        assert_eq!(restored, output);
        restored.finalize_after_load(&mut world);
        for id in ids {
            assert_eq!(world.entity_state(id), Some(EntityState::Finalized));
        }
    }

    #[test]
    fn forensic_snapshot_round_trip() {
        let output = ProducedOutput::forensic(ProductId(8), report());
        let restored = ProducedOutput::from_bytes(&output.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.report(), output.report());
        assert_eq!(restored.product(), ProductId(8));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ProducedOutput::from_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn entities_output_has_no_report() {
        let output = ProducedOutput::entities(ProductId(1), vec![]);
        assert!(output.report().is_none());
        assert!(output.created().is_empty());
    }
}
