//! Persistence of whole projects.
//!
//! The in-memory types are never serialized directly. A [`ProjectFile`] is a
//! versioned snapshot built from a [`Model`](crate::Model) and turned back
//! into one on load.

mod project;

pub use project::{ProjectError, ProjectFile};
