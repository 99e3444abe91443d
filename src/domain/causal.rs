//! Causal factor analysis attached to control structure components.
//!
//! The overlay is keyed by component id and kept apart from the tree. Only
//! some component types can carry causal factors; see [`accepts`].

mod factor;
mod safety_constraint;

use std::collections::{BTreeMap, HashMap};

pub use factor::{CausalEntry, CausalFactor, EntryChange, EntryTarget};
pub use safety_constraint::{SafetyConstraint, SafetyConstraints};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    component::{Component, ComponentType},
    event::{CausalEvent, Event},
    identifier::IdGenerator,
};

/// Whether components of this type can carry causal factors.
#[must_use]
pub const fn accepts(component_type: ComponentType) -> bool {
    matches!(
        component_type,
        ComponentType::Actuator
            | ComponentType::Controller
            | ComponentType::ControlledProcess
            | ComponentType::Sensor
            | ComponentType::Undefined
    )
}

/// The causal factors of one component.
///
/// Text and type are a snapshot of the component, refreshed whenever the
/// overlay is fetched through [`CausalFactors::get_or_create_overlay`] and
/// during [`CausalFactors::prepare_for_save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CausalComponent {
    pub(crate) id: Uuid,
    pub(crate) text: String,
    pub(crate) component_type: ComponentType,
    pub(crate) factors: Vec<CausalFactor>,
}

impl CausalComponent {
    fn snapshot(component: &Component) -> Self {
        Self {
            id: component.id(),
            text: component.text().to_string(),
            component_type: component.component_type(),
            factors: Vec::new(),
        }
    }

    /// Id of the component this overlay belongs to.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Component text at the last refresh.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Component type at the last refresh.
    #[must_use]
    pub const fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// The causal factors, in the order they were added.
    #[must_use]
    pub fn factors(&self) -> &[CausalFactor] {
        &self.factors
    }

    /// Finds a causal factor.
    #[must_use]
    pub fn factor(&self, id: Uuid) -> Option<&CausalFactor> {
        self.factors.iter().find(|factor| factor.id == id)
    }
}

/// Causal factor overlay over the whole control structure.
#[derive(Debug, Clone, Default)]
pub struct CausalFactors {
    components: BTreeMap<Uuid, CausalComponent>,
    constraints: SafetyConstraints,
    use_scenarios: bool,
    ids: IdGenerator,
    events: Vec<Event>,
}

impl CausalFactors {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new(use_scenarios: bool) -> Self {
        Self {
            use_scenarios,
            ..Self::default()
        }
    }

    /// Rebuilds an overlay from persisted parts.
    #[must_use]
    pub fn from_parts(
        components: impl IntoIterator<Item = CausalComponent>,
        constraints: Vec<SafetyConstraint>,
        use_scenarios: bool,
    ) -> Self {
        Self {
            components: components.into_iter().map(|c| (c.id, c)).collect(),
            constraints: SafetyConstraints::from_vec(constraints),
            use_scenarios,
            ..Self::default()
        }
    }

    /// Replaces the identifier source.
    #[must_use]
    pub fn with_ids(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Drains the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn post(&mut self, event: CausalEvent) {
        self.events.push(event.into());
    }

    /// Whether scenario based causal analysis is active.
    #[must_use]
    pub const fn use_scenarios(&self) -> bool {
        self.use_scenarios
    }

    /// Toggles scenario based causal analysis.
    pub fn set_use_scenarios(&mut self, value: bool) -> bool {
        if self.use_scenarios == value {
            return false;
        }
        self.use_scenarios = value;
        self.post(CausalEvent::UseScenariosChanged { value });
        true
    }

    /// Returns the overlay of `component`, creating it on first use.
    ///
    /// Returns `None` without creating anything when the component type
    /// cannot carry causal factors.
    pub fn get_or_create_overlay(&mut self, component: &Component) -> Option<&mut CausalComponent> {
        if !accepts(component.component_type()) {
            return None;
        }
        let overlay = self
            .components
            .entry(component.id())
            .or_insert_with(|| CausalComponent::snapshot(component));
        overlay.text = component.text().to_string();
        overlay.component_type = component.component_type();
        Some(overlay)
    }

    /// The overlay of a component, if one exists.
    #[must_use]
    pub fn overlay(&self, component_id: Uuid) -> Option<&CausalComponent> {
        self.components.get(&component_id)
    }

    /// Every overlay, ordered by component id.
    pub fn overlays(&self) -> impl Iterator<Item = &CausalComponent> + '_ {
        self.components.values()
    }

    /// Number of overlays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether no component carries causal factors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Appends a new, empty causal factor to `component`.
    #[instrument(skip(self, component), fields(component = %component.id()))]
    pub fn add_causal_factor(&mut self, component: &Component) -> Option<Uuid> {
        if !accepts(component.component_type()) {
            return None;
        }
        let id = self.ids.next_id();
        self.get_or_create_overlay(component)?
            .factors
            .push(CausalFactor::new(id));
        self.post(CausalEvent::FactorAdded {
            component: component.id(),
            factor: id,
        });
        Some(id)
    }

    /// Finds a causal factor of a component.
    #[must_use]
    pub fn get_causal_factor(&self, component_id: Uuid, factor_id: Uuid) -> Option<&CausalFactor> {
        self.components.get(&component_id)?.factor(factor_id)
    }

    fn factor_mut(&mut self, component_id: Uuid, factor_id: Uuid) -> Option<&mut CausalFactor> {
        self.components
            .get_mut(&component_id)?
            .factors
            .iter_mut()
            .find(|factor| factor.id == factor_id)
    }

    /// Sets the description of a causal factor.
    pub fn set_causal_factor_text(&mut self, component_id: Uuid, factor_id: Uuid, text: &str) -> bool {
        let Some(factor) = self.factor_mut(component_id, factor_id) else {
            return false;
        };
        if factor.text == text {
            return false;
        }
        let old = std::mem::replace(&mut factor.text, text.to_string());
        self.post(CausalEvent::FactorTextChanged {
            component: component_id,
            factor: factor_id,
            old,
            new: text.to_string(),
        });
        true
    }

    /// Removes a causal factor.
    ///
    /// Without a component id every overlay is searched.
    pub fn remove_causal_factor(&mut self, component_id: Option<Uuid>, factor_id: Uuid) -> bool {
        let found = self
            .components
            .values_mut()
            .filter(|overlay| component_id.is_none_or(|id| id == overlay.id))
            .find_map(|overlay| {
                let index = overlay.factors.iter().position(|f| f.id == factor_id)?;
                Some((overlay.id, index, overlay.factors.remove(index)))
            });
        let Some((component, index, factor)) = found else {
            return false;
        };
        self.post(CausalEvent::FactorRemoved {
            component,
            index,
            factor,
        });
        true
    }

    /// Adds an entry analysing the unsafe control action `uca`.
    ///
    /// A factor holds at most one entry per unsafe control action; adding it
    /// again returns the existing entry.
    pub fn add_uca_entry(&mut self, component_id: Uuid, factor_id: Uuid, uca: Uuid) -> Option<Uuid> {
        let factor = self.factor_mut(component_id, factor_id)?;
        if let Some(existing) = factor.entries.iter().find(|e| e.uca() == Some(uca)) {
            return Some(existing.id);
        }
        let id = self.ids.next_id();
        self.push_entry(component_id, factor_id, CausalEntry::new(id, EntryTarget::Uca(uca)))
    }

    /// Adds an entry linking the factor directly to hazards.
    pub fn add_hazard_entry(&mut self, component_id: Uuid, factor_id: Uuid) -> Option<Uuid> {
        self.factor_mut(component_id, factor_id)?;
        let id = self.ids.next_id();
        self.push_entry(component_id, factor_id, CausalEntry::new(id, EntryTarget::Hazard))
    }

    fn push_entry(&mut self, component_id: Uuid, factor_id: Uuid, entry: CausalEntry) -> Option<Uuid> {
        let id = entry.id;
        self.factor_mut(component_id, factor_id)?.entries.push(entry);
        self.post(CausalEvent::EntryAdded {
            component: component_id,
            factor: factor_id,
            entry: id,
        });
        Some(id)
    }

    /// Applies `change` to an entry and returns the values it replaced.
    ///
    /// Returns `None` if the component, factor or entry is unknown, or if
    /// nothing actually changed. A non-empty constraint text creates a safety
    /// constraint for the entry (or retitles the existing one); an empty text
    /// detaches it.
    pub fn change_entry(
        &mut self,
        component_id: Uuid,
        factor_id: Uuid,
        change: EntryChange,
    ) -> Option<EntryChange> {
        let ids = &mut self.ids;
        let constraints = &mut self.constraints;
        let entry = self
            .components
            .get_mut(&component_id)?
            .factors
            .iter_mut()
            .find(|factor| factor.id == factor_id)?
            .entry_mut(change.id)?;

        let mut previous = EntryChange::new(change.id);
        if let Some(hazards) = change.hazards.filter(|h| *h != entry.hazards) {
            previous.hazards = Some(std::mem::replace(&mut entry.hazards, hazards));
        }
        if let Some(note) = change.note.filter(|n| *n != entry.note) {
            previous.note = Some(std::mem::replace(&mut entry.note, note));
        }
        if let Some(scenarios) = change.scenarios.filter(|s| *s != entry.scenarios) {
            previous.scenarios = Some(std::mem::replace(&mut entry.scenarios, scenarios));
        }
        if let Some(text) = change.constraint_text {
            let existing = entry.constraint.and_then(|id| constraints.get_mut(id));
            match existing {
                Some(constraint) if text.is_empty() => {
                    previous.constraint_text = Some(constraint.title.clone());
                    entry.constraint = None;
                }
                Some(constraint) if constraint.title != text => {
                    previous.constraint_text = Some(std::mem::replace(&mut constraint.title, text));
                }
                Some(_) => {}
                None if text.is_empty() => {}
                None => {
                    let constraint_id = ids.next_id();
                    constraints.push(constraint_id, text, Some(component_id));
                    entry.constraint = Some(constraint_id);
                    previous.constraint_text = Some(String::new());
                }
            }
        }

        if previous.is_empty() {
            return None;
        }
        self.post(CausalEvent::EntryChanged {
            component: component_id,
            factor: factor_id,
            previous: previous.clone(),
        });
        Some(previous)
    }

    /// Removes an entry from a factor.
    pub fn remove_entry(&mut self, component_id: Uuid, factor_id: Uuid, entry_id: Uuid) -> bool {
        let Some(factor) = self.factor_mut(component_id, factor_id) else {
            return false;
        };
        let Some(index) = factor.entries.iter().position(|e| e.id == entry_id) else {
            return false;
        };
        let entry = factor.entries.remove(index);
        self.post(CausalEvent::EntryRemoved {
            component: component_id,
            factor: factor_id,
            index,
            entry,
        });
        true
    }

    /// Unsafe control actions analysed by the factor `factor_id`, wherever it
    /// lives.
    #[must_use]
    pub fn get_linked_uca_list(&self, factor_id: Uuid) -> Vec<Uuid> {
        self.components
            .values()
            .flat_map(|overlay| overlay.factors.iter())
            .filter(|factor| factor.id == factor_id)
            .flat_map(CausalFactor::linked_ucas)
            .collect()
    }

    /// The numbered safety constraints.
    #[must_use]
    pub fn safety_constraints(&self) -> &[SafetyConstraint] {
        self.constraints.as_slice()
    }

    /// Finds a safety constraint.
    #[must_use]
    pub fn get_safety_constraint(&self, id: Uuid) -> Option<&SafetyConstraint> {
        self.constraints.get(id)
    }

    /// The text of a safety constraint, or an empty string when unknown.
    #[must_use]
    pub fn constraint_text_for(&self, id: Option<Uuid>) -> &str {
        id.and_then(|id| self.constraints.get(id))
            .map_or("", SafetyConstraint::title)
    }

    /// Reconciles the overlay with the live components before persisting.
    ///
    /// Overlays of components that no longer exist (or can no longer carry
    /// causal factors) are discarded and their ids returned. Safety
    /// constraints are reassigned to the component whose entry references
    /// them; unreferenced constraints are dropped and the rest renumbered.
    #[instrument(skip_all)]
    pub fn prepare_for_save<'a>(
        &mut self,
        components: impl IntoIterator<Item = &'a Component>,
    ) -> Vec<Uuid> {
        let live: HashMap<Uuid, &Component> = components
            .into_iter()
            .filter(|component| accepts(component.component_type()))
            .map(|component| (component.id(), component))
            .collect();

        let mut purged = Vec::new();
        self.components.retain(|id, overlay| match live.get(id) {
            Some(component) => {
                overlay.text = component.text().to_string();
                overlay.component_type = component.component_type();
                true
            }
            None => {
                purged.push(*id);
                false
            }
        });

        let mut owners = HashMap::new();
        for overlay in self.components.values() {
            for entry in overlay.factors.iter().flat_map(|f| f.entries.iter()) {
                if let Some(constraint) = entry.constraint {
                    owners.entry(constraint).or_insert(overlay.id);
                }
            }
        }
        let before = self.constraints.len();
        self.constraints.retain(|c| owners.contains_key(&c.id));
        for (constraint, owner) in &owners {
            if let Some(constraint) = self.constraints.get_mut(*constraint) {
                constraint.owner = Some(*owner);
            }
        }
        self.constraints.renumber();

        let dropped = before - self.constraints.len();
        if !purged.is_empty() || dropped > 0 {
            tracing::debug!(
                overlays = purged.len(),
                constraints = dropped,
                "collected causal data of deleted components"
            );
        }
        if !purged.is_empty() {
            self.post(CausalEvent::OverlaysCollected {
                components: purged.clone(),
            });
        }
        purged
    }
}
