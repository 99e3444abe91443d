use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The category a link belongs to.
///
/// Each category is a separate namespace: the same pair of ids may be linked
/// under several categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    /// Unsafe control action ↔ hazard.
    UcaHazard,
    /// Causal factor ↔ unsafe control action.
    CausalFactorUca,
    /// Causal entry ↔ hazard.
    CausalEntryHazard,
    /// Causal entry ↔ safety constraint.
    CausalEntryConstraint,
    /// Control action ↔ unsafe control action.
    ControlActionUca,
    /// Unsafe control action ↔ causal scenario.
    UcaScenario,
    /// Hazard ↔ accident.
    HazardAccident,
    /// Component ↔ process variable.
    ComponentVariable,
}

impl LinkType {
    /// Every category, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::UcaHazard,
        Self::CausalFactorUca,
        Self::CausalEntryHazard,
        Self::CausalEntryConstraint,
        Self::ControlActionUca,
        Self::UcaScenario,
        Self::HazardAccident,
        Self::ComponentVariable,
    ];

    /// The persisted name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UcaHazard => "UCA_HAZARD",
            Self::CausalFactorUca => "CAUSAL_FACTOR_UCA",
            Self::CausalEntryHazard => "CAUSAL_ENTRY_HAZARD",
            Self::CausalEntryConstraint => "CAUSAL_ENTRY_CONSTRAINT",
            Self::ControlActionUca => "CONTROL_ACTION_UCA",
            Self::UcaScenario => "UCA_SCENARIO",
            Self::HazardAccident => "HAZARD_ACCIDENT",
            Self::ComponentVariable => "COMPONENT_VARIABLE",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An association between two identified entities.
///
/// Either side may be missing while a link is being built up one side at a
/// time. Such half links are kept in the registry but never reported by
/// queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub(crate) id: Uuid,
    pub(crate) link_type: LinkType,
    pub(crate) a: Option<Uuid>,
    pub(crate) b: Option<Uuid>,
    pub(crate) note: String,
}

impl Link {
    /// Creates a link with an empty note.
    #[must_use]
    pub const fn new(id: Uuid, link_type: LinkType, a: Option<Uuid>, b: Option<Uuid>) -> Self {
        Self {
            id,
            link_type,
            a,
            b,
            note: String::new(),
        }
    }

    /// Sets the note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// The link's own identifier. Links can themselves be linked.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The link's category.
    #[must_use]
    pub const fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// First side.
    #[must_use]
    pub const fn a(&self) -> Option<Uuid> {
        self.a
    }

    /// Second side.
    #[must_use]
    pub const fn b(&self) -> Option<Uuid> {
        self.b
    }

    /// Free-form note.
    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }

    /// Whether `part` is one of the two sides.
    #[must_use]
    pub fn links(&self, part: Uuid) -> bool {
        self.a == Some(part) || self.b == Some(part)
    }

    /// The side opposite to `part`.
    #[must_use]
    pub fn other(&self, part: Uuid) -> Option<Uuid> {
        if self.a == Some(part) {
            self.b
        } else if self.b == Some(part) {
            self.a
        } else {
            None
        }
    }

    /// Whether the link has the given sides, in this order.
    #[must_use]
    pub fn has_parts(&self, a: Option<Uuid>, b: Option<Uuid>) -> bool {
        self.a == a && self.b == b
    }

    /// Whether both sides are set.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.a.is_some() && self.b.is_some()
    }

    /// Whether neither side is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.a.is_none() && self.b.is_none()
    }
}
