use uuid::Uuid;

/// A numbered requirement derived from causal analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyConstraint {
    pub(crate) id: Uuid,
    pub(crate) number: usize,
    pub(crate) title: String,
    pub(crate) owner: Option<Uuid>,
}

impl SafetyConstraint {
    /// The constraint's identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Display number, starting at 1.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// The constraint text.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The component whose causal entry references this constraint.
    #[must_use]
    pub const fn owner(&self) -> Option<Uuid> {
        self.owner
    }
}

/// The numbered collection all causal safety constraints live in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyConstraints {
    items: Vec<SafetyConstraint>,
}

impl SafetyConstraints {
    pub(crate) const fn from_vec(items: Vec<SafetyConstraint>) -> Self {
        Self { items }
    }

    /// Appends a constraint numbered one past the current highest number.
    pub(crate) fn push(&mut self, id: Uuid, title: String, owner: Option<Uuid>) {
        let number = self.items.iter().map(|c| c.number).max().unwrap_or(0) + 1;
        self.items.push(SafetyConstraint {
            id,
            number,
            title,
            owner,
        });
    }

    /// All constraints in list order.
    #[must_use]
    pub fn as_slice(&self) -> &[SafetyConstraint] {
        &self.items
    }

    /// Finds a constraint.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&SafetyConstraint> {
        self.items.iter().find(|c| c.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: Uuid) -> Option<&mut SafetyConstraint> {
        self.items.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&SafetyConstraint) -> bool) {
        self.items.retain(keep);
    }

    /// Closes gaps so numbers run 1..=n in list order.
    pub(crate) fn renumber(&mut self) {
        for (index, constraint) in self.items.iter_mut().enumerate() {
            constraint.number = index + 1;
        }
    }

    /// Number of constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
