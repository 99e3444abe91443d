//! Domain models for STPA safety analysis.
//!
//! This module contains the control structure (components and the
//! connections between them), the causal factor overlay, the link registry
//! and the events every mutation produces.

/// Causal factors, their entries and the numbered safety constraints.
pub mod causal;
pub use causal::{
    CausalComponent, CausalEntry, CausalFactor, CausalFactors, EntryChange, EntryTarget,
    SafetyConstraint,
};

/// Components of a control structure diagram.
pub mod component;
pub use component::{Component, ComponentType, Rectangle, compare_components};

mod config;
pub use config::Config;

/// Connections drawn between components.
pub mod connection;
pub use connection::{Anchor, Connection, ConnectionType, Side};

mod control_structure;
pub use control_structure::ControlStructure;

/// Change events and the bus that delivers them.
pub mod event;
pub use event::{
    CausalEvent, ComponentEvent, ConnectionEvent, Event, EventBus, LinkEvent, SubscriptionId,
};

mod identifier;
pub use identifier::IdGenerator;

mod link;
pub use link::{Link, LinkType};

mod link_registry;
pub use link_registry::{LinkRegistry, Prune};

mod trash;
