//! Directed edges between components.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The side of a component an anchor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Top edge.
    Top,
    /// Bottom edge.
    Bottom,
    /// Left edge.
    Left,
    /// Right edge.
    Right,
}

/// An attachment point of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    /// The component the anchor belongs to.
    pub owner: Uuid,
    /// Where on the owner the anchor sits.
    pub side: Side,
}

impl Anchor {
    /// Creates an anchor.
    #[must_use]
    pub const fn new(owner: Uuid, side: Side) -> Self {
        Self { owner, side }
    }
}

/// What a connection represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    /// A control action from a controller towards the process.
    ControlAction,
    /// Feedback from the process back to a controller.
    Feedback,
    /// A plain arrow.
    ArrowSimple,
    /// A dashed arrow.
    ArrowDashed,
}

/// A directed, typed edge between two anchors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub(crate) id: Uuid,
    pub(crate) source: Anchor,
    pub(crate) target: Anchor,
    pub(crate) connection_type: ConnectionType,
}

impl Connection {
    /// Creates a connection.
    #[must_use]
    pub const fn new(
        id: Uuid,
        source: Anchor,
        target: Anchor,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            id,
            source,
            target,
            connection_type,
        }
    }

    /// The connection's identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Where the connection starts.
    #[must_use]
    pub const fn source(&self) -> Anchor {
        self.source
    }

    /// Where the connection ends.
    #[must_use]
    pub const fn target(&self) -> Anchor {
        self.target
    }

    /// The connection's type.
    #[must_use]
    pub const fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    /// Whether either end is attached to `component`.
    #[must_use]
    pub fn touches(&self, component: Uuid) -> bool {
        self.source.owner == component || self.target.owner == component
    }
}
