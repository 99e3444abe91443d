use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a causal factor entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "uca")]
pub enum EntryTarget {
    /// The entry analyses an unsafe control action.
    Uca(Uuid),
    /// The entry links the factor directly to hazards.
    Hazard,
}

/// One analysed row of a causal factor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CausalEntry {
    pub(crate) id: Uuid,
    pub(crate) target: EntryTarget,
    pub(crate) hazards: Vec<Uuid>,
    pub(crate) constraint: Option<Uuid>,
    pub(crate) note: String,
    pub(crate) scenarios: Vec<Uuid>,
}

impl CausalEntry {
    pub(crate) const fn new(id: Uuid, target: EntryTarget) -> Self {
        Self {
            id,
            target,
            hazards: Vec::new(),
            constraint: None,
            note: String::new(),
            scenarios: Vec::new(),
        }
    }

    /// The entry's identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// What the entry is about.
    #[must_use]
    pub const fn target(&self) -> EntryTarget {
        self.target
    }

    /// The unsafe control action, for UCA entries.
    #[must_use]
    pub const fn uca(&self) -> Option<Uuid> {
        match self.target {
            EntryTarget::Uca(uca) => Some(uca),
            EntryTarget::Hazard => None,
        }
    }

    /// Hazards the entry leads to.
    #[must_use]
    pub fn hazards(&self) -> &[Uuid] {
        &self.hazards
    }

    /// The safety constraint derived from this entry.
    #[must_use]
    pub const fn constraint(&self) -> Option<Uuid> {
        self.constraint
    }

    /// Free-form note.
    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }

    /// Causal scenarios attached to the entry.
    #[must_use]
    pub fn scenarios(&self) -> &[Uuid] {
        &self.scenarios
    }
}

/// A set of field updates for a [`CausalEntry`].
///
/// Fields left as `None` are not touched. The same type describes the values
/// an update replaced, which is what an undo needs to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChange {
    /// The entry to change.
    pub id: Uuid,
    /// New hazard list.
    pub hazards: Option<Vec<Uuid>>,
    /// New safety constraint text. An empty string detaches the constraint.
    pub constraint_text: Option<String>,
    /// New note.
    pub note: Option<String>,
    /// New scenario list.
    pub scenarios: Option<Vec<Uuid>>,
}

impl EntryChange {
    /// A change that touches nothing yet.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self {
            id,
            hazards: None,
            constraint_text: None,
            note: None,
            scenarios: None,
        }
    }

    /// Sets the hazard list.
    #[must_use]
    pub fn hazards(mut self, hazards: Vec<Uuid>) -> Self {
        self.hazards = Some(hazards);
        self
    }

    /// Sets the safety constraint text.
    #[must_use]
    pub fn constraint_text(mut self, text: impl Into<String>) -> Self {
        self.constraint_text = Some(text.into());
        self
    }

    /// Sets the note.
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the scenario list.
    #[must_use]
    pub fn scenarios(mut self, scenarios: Vec<Uuid>) -> Self {
        self.scenarios = Some(scenarios);
        self
    }

    /// Whether the change touches no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.hazards.is_none()
            && self.constraint_text.is_none()
            && self.note.is_none()
            && self.scenarios.is_none()
    }
}

/// A documented potential cause of a hazard, attached to one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CausalFactor {
    pub(crate) id: Uuid,
    pub(crate) text: String,
    pub(crate) entries: Vec<CausalEntry>,
}

impl CausalFactor {
    pub(crate) const fn new(id: Uuid) -> Self {
        Self {
            id,
            text: String::new(),
            entries: Vec::new(),
        }
    }

    /// The factor's identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Description of the factor.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Entries in the order they were added.
    #[must_use]
    pub fn entries(&self) -> &[CausalEntry] {
        &self.entries
    }

    /// Finds an entry.
    #[must_use]
    pub fn entry(&self, id: Uuid) -> Option<&CausalEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub(crate) fn entry_mut(&mut self, id: Uuid) -> Option<&mut CausalEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// Unsafe control actions analysed by this factor, in entry order.
    pub fn linked_ucas(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.entries.iter().filter_map(CausalEntry::uca)
    }
}
