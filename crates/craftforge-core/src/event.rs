//! Notifications production sends to the world.
//!
//! Products emit a [`ProductionEvent`] whenever they materialise an entity,
//! and produced outputs emit one when they are released or discarded. Hosts
//! receive them through [`World::notify`](crate::world::World::notify);
//! [`EventLog`] is a ready-made recorder with per-kind suppression.

use crate::id::{EntityId, LocationId, ProductId};
use std::collections::BTreeSet;

/// A production notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductionEvent {
    /// A product created a new world entity.
    EntityCreated {
        product: ProductId,
        entity: EntityId,
    },
    /// A produced output handed its entities to a location.
    OutputReleased {
        product: ProductId,
        location: LocationId,
        entities: usize,
    },
    /// A forensic product announced its result at a location.
    ForensicReported {
        product: ProductId,
        location: LocationId,
        text: String,
    },
    /// A produced output was thrown away without release.
    OutputDiscarded {
        product: ProductId,
        /// `true` when entities were deleted, `false` when only unloaded.
        deleted: bool,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    EntityCreated,
    OutputReleased,
    ForensicReported,
    OutputDiscarded,
}

impl ProductionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProductionEvent::EntityCreated { .. } => EventKind::EntityCreated,
            ProductionEvent::OutputReleased { .. } => EventKind::OutputReleased,
            ProductionEvent::ForensicReported { .. } => EventKind::ForensicReported,
            ProductionEvent::OutputDiscarded { .. } => EventKind::OutputDiscarded,
        }
    }

    pub fn product(&self) -> ProductId {
        match self {
            ProductionEvent::EntityCreated { product, .. }
            | ProductionEvent::OutputReleased { product, .. }
            | ProductionEvent::ForensicReported { product, .. }
            | ProductionEvent::OutputDiscarded { product, .. } => *product,
        }
    }
}

/// Records events in arrival order. Suppressed kinds are dropped on entry.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<ProductionEvent>,
    suppressed: BTreeSet<EventKind>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed.insert(kind);
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed.contains(&kind)
    }

    pub fn record(&mut self, event: ProductionEvent) {
        if !self.is_suppressed(event.kind()) {
            self.events.push(event);
        }
    }

    pub fn events(&self) -> &[ProductionEvent] {
        &self.events
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &ProductionEvent> {
        self.events.iter().filter(move |e| e.kind() == kind)
    }

    /// Take every recorded event, leaving the log empty.
    pub fn drain(&mut self) -> Vec<ProductionEvent> {
        std::mem::take(&mut self.events)
    }
}
