//! In-memory model for STPA safety analysis
//!
//! A project is a control structure diagram, the causal factors documented
//! for its components, and a registry of typed links between any of the
//! identified artifacts. Every mutation goes through [`Model`], which reports
//! what changed as [`Event`]s.

pub mod domain;
pub use domain::{
    Component, ComponentType, Config, ControlStructure, Event, EventBus, IdGenerator, Link,
    LinkRegistry, LinkType, Rectangle,
};

mod model;
pub use model::Model;

/// On-disk project format.
pub mod storage;
pub use storage::{ProjectError, ProjectFile};
