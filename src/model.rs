use std::{collections::BTreeMap, path::Path, sync::mpsc};

use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    Config,
    domain::{
        Anchor, CausalFactors, Component, ComponentType, ConnectionType, ControlStructure,
        EntryChange, Event, EventBus, IdGenerator, Link, LinkEvent, LinkRegistry, LinkType, Prune,
        Rectangle, SubscriptionId,
    },
    storage::{ProjectError, ProjectFile},
};

/// One safety analysis project held in memory.
///
/// The model owns the control structure, the causal factor overlay and the
/// link registry. Every command is forwarded to the subsystem it concerns;
/// afterwards the events it produced are delivered to subscribers, in the
/// order the changes were made.
///
/// Removing a component, a causal factor or an entry also removes the links
/// that pointed at it, following links to links up to
/// [`Config::cascade_depth`] levels. Those removals are reported as
/// [`LinkEvent::Removed`], one event per link category. Links dropped with a
/// trashed component are kept until the trash lets go of it, so recovering
/// the component brings them back.
#[derive(Debug)]
pub struct Model {
    structure: ControlStructure,
    causal: CausalFactors,
    links: LinkRegistry,
    trashed_links: BTreeMap<Uuid, Vec<Link>>,
    bus: EventBus,
    config: Config,
    created: DateTime<Utc>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Model {
    /// Creates an empty project.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            structure: ControlStructure::new(config.trash_capacity()),
            causal: CausalFactors::new(config.use_scenarios),
            links: LinkRegistry::new(),
            trashed_links: BTreeMap::new(),
            bus: EventBus::default(),
            config,
            created: Utc::now(),
        }
    }

    /// Creates an empty project whose identifiers are deterministic.
    ///
    /// Each subsystem counts in its own range so identifiers never collide.
    #[must_use]
    pub fn sequential(config: Config) -> Self {
        let mut model = Self::new(config);
        model.structure = model.structure.with_ids(IdGenerator::Sequential(0));
        model.causal = model.causal.with_ids(IdGenerator::Sequential(1 << 32));
        model.links = model.links.with_ids(IdGenerator::Sequential(1 << 64));
        model
    }

    pub(super) fn from_parts(
        structure: ControlStructure,
        causal: CausalFactors,
        links: LinkRegistry,
        config: Config,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            structure,
            causal,
            links,
            trashed_links: BTreeMap::new(),
            bus: EventBus::default(),
            config,
            created,
        }
    }

    /// Loads a project file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path, config: Config) -> Result<Self, ProjectError> {
        let model = ProjectFile::load(path)?.into_model(config);
        tracing::info!(
            components = model.structure.len(),
            links = model.links.len(),
            "loaded project from {}",
            path.display()
        );
        Ok(model)
    }

    /// Reconciles the model and writes it to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    #[instrument(skip(self))]
    pub fn save(&mut self, path: &Path) -> Result<(), ProjectError> {
        self.prepare_for_save();
        ProjectFile::from_model(self).save(path)
    }

    /// The configuration the model was created with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// When the project was first created.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// The control structure.
    #[must_use]
    pub const fn structure(&self) -> &ControlStructure {
        &self.structure
    }

    /// The causal factor overlay.
    #[must_use]
    pub const fn causal(&self) -> &CausalFactors {
        &self.causal
    }

    /// The link registry, unpruned.
    #[must_use]
    pub const fn links(&self) -> &LinkRegistry {
        &self.links
    }

    /// Registers a callback for change events.
    pub fn subscribe(&mut self, callback: impl FnMut(&Event) + 'static) -> SubscriptionId {
        self.bus.subscribe(callback)
    }

    /// Registers a channel for change events.
    pub fn subscribe_channel(&mut self) -> (SubscriptionId, mpsc::Receiver<Event>) {
        self.bus.subscribe_channel()
    }

    /// Removes a subscriber.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Total number of events delivered so far.
    #[must_use]
    pub const fn delivered(&self) -> u64 {
        self.bus.delivered()
    }

    fn drain(&mut self) {
        self.bus.extend(self.structure.take_events());
        self.bus.extend(self.causal.take_events());
        self.bus.extend(self.links.take_events());
    }

    fn flush<T>(&mut self, result: T) -> T {
        self.drain();
        self.bus.flush();
        result
    }

    /// Removes every link attached to `parts`, reporting one event per
    /// category.
    fn cascade(&mut self, parts: impl IntoIterator<Item = Uuid>) -> Vec<Link> {
        let depth = self.config.cascade_depth();
        let mut removed: BTreeMap<LinkType, Vec<Link>> = BTreeMap::new();
        for part in parts {
            for link in self.links.delete_links_for(part, depth) {
                removed.entry(link.link_type()).or_default().push(link);
            }
        }

        let count = removed.values().map(Vec::len).sum();
        if count > 0 {
            tracing::debug!(count, depth, "removed dependent links");
        }
        let mut all = Vec::with_capacity(count);
        for (link_type, links) in removed {
            all.extend(links.iter().cloned());
            self.bus.post(LinkEvent::Removed { link_type, links }.into());
        }
        all
    }

    // ---- component tree ----

    /// Starts a new diagram. See [`ControlStructure::set_root`].
    pub fn set_root(&mut self, layout: Rectangle, text: &str) -> Uuid {
        let id = self.structure.set_root(layout, text);
        self.flush(id)
    }

    /// Looks up a live component.
    #[must_use]
    pub fn get_component(&self, id: Uuid) -> Option<&Component> {
        self.structure.get_component(id)
    }

    /// Children of a component. See [`ControlStructure::get_children`].
    #[must_use]
    pub fn get_children(&self, id: Uuid, pm_step: bool) -> Option<Vec<&Component>> {
        self.structure.get_children(id, pm_step)
    }

    /// Adds a component. See [`ControlStructure::add_component`].
    pub fn add_component(
        &mut self,
        parent_id: Uuid,
        layout: Rectangle,
        text: &str,
        component_type: ComponentType,
        control_action: Option<Uuid>,
    ) -> Option<Uuid> {
        let id = self
            .structure
            .add_component(parent_id, layout, text, component_type, control_action);
        self.flush(id)
    }

    /// Moves a subtree to the trash and drops every link attached to it or to
    /// its causal factors and entries.
    #[instrument(skip(self))]
    pub fn remove_component(&mut self, id: Uuid) -> bool {
        let mut parts: Vec<Uuid> = match self.structure.get_component(id) {
            Some(component) => component.iter().map(Component::id).collect(),
            None => return false,
        };
        if !self.structure.remove_component(id) {
            return false;
        }

        let analysed: Vec<Uuid> = parts
            .iter()
            .filter_map(|member| self.causal.overlay(*member))
            .flat_map(|overlay| overlay.factors())
            .flat_map(|factor| {
                std::iter::once(factor.id()).chain(factor.entries().iter().map(|e| e.id()))
            })
            .collect();
        parts.extend(analysed);

        self.drain();
        let removed = self.cascade(parts);
        if !removed.is_empty() {
            self.trashed_links.insert(id, removed);
        }
        let structure = &self.structure;
        self.trashed_links.retain(|trashed, _| structure.is_trashed(*trashed));
        self.flush(true)
    }

    /// Restores a trashed subtree together with the links removed along
    /// with it.
    pub fn recover_component(&mut self, parent_id: Uuid, id: Uuid) -> bool {
        if !self.structure.recover_component(parent_id, id) {
            return false;
        }
        self.drain();
        if let Some(links) = self.trashed_links.remove(&id) {
            let restored: Vec<Link> = links
                .into_iter()
                .filter(|link| self.links.restore_links([link.clone()]) == 1)
                .collect();
            tracing::debug!(
                count = restored.len(),
                "restored links of recovered component"
            );
            for link in restored {
                self.bus.post(LinkEvent::Added { link }.into());
            }
        }
        self.flush(true)
    }

    /// Reorders a component among its siblings.
    pub fn move_component(&mut self, all_the_way: bool, move_up: bool, id: Uuid) -> bool {
        let moved = self.structure.move_component(all_the_way, move_up, id);
        self.flush(moved)
    }

    /// Replaces a layout of a component.
    pub fn change_layout(&mut self, id: Uuid, layout: Rectangle, step0: bool) -> bool {
        let changed = self.structure.change_layout(id, layout, step0);
        self.flush(changed)
    }

    /// Copies every primary layout to the secondary one.
    pub fn synchronize_layouts(&mut self) -> bool {
        let changed = self.structure.synchronize_layouts();
        self.flush(changed)
    }

    /// Renames a component.
    pub fn change_text(&mut self, id: Uuid, text: &str) -> bool {
        let changed = self.structure.change_text(id, text);
        self.flush(changed)
    }

    /// Sets the comment of a component.
    pub fn change_comment(&mut self, id: Uuid, comment: &str) -> bool {
        let changed = self.structure.change_comment(id, comment);
        self.flush(changed)
    }

    /// Points a control action component at a control action.
    pub fn link_to_control_action(&mut self, id: Uuid, control_action: Option<Uuid>) -> bool {
        let changed = self.structure.link_to_control_action(id, control_action);
        self.flush(changed)
    }

    /// Sets the relative of a component.
    pub fn set_relative(&mut self, id: Uuid, relative: Option<Uuid>) -> bool {
        let changed = self.structure.set_relative(id, relative);
        self.flush(changed)
    }

    /// Marks a component as safety critical or not.
    pub fn set_safety_critical(&mut self, id: Uuid, value: bool) -> bool {
        let changed = self.structure.set_safety_critical(id, value);
        self.flush(changed)
    }

    /// Marks a process variable of a component as unsafe.
    pub fn add_unsafe_process_variable(&mut self, id: Uuid, variable: Uuid) -> bool {
        let changed = self.structure.add_unsafe_process_variable(id, variable);
        self.flush(changed)
    }

    /// Clears the unsafe mark of a process variable.
    pub fn remove_unsafe_process_variable(&mut self, id: Uuid, variable: Uuid) -> bool {
        let changed = self.structure.remove_unsafe_process_variable(id, variable);
        self.flush(changed)
    }

    // ---- connections ----

    /// Connects two anchors.
    pub fn add_connection(
        &mut self,
        source: Anchor,
        target: Anchor,
        connection_type: ConnectionType,
    ) -> Option<Uuid> {
        let id = self
            .structure
            .add_connection(source, target, connection_type);
        self.flush(id)
    }

    /// Changes what a connection represents.
    pub fn change_connection_type(&mut self, id: Uuid, connection_type: ConnectionType) -> bool {
        let changed = self.structure.change_connection_type(id, connection_type);
        self.flush(changed)
    }

    /// Reattaches the start of a connection.
    pub fn change_connection_source(&mut self, id: Uuid, source: Anchor) -> bool {
        let changed = self.structure.change_connection_source(id, source);
        self.flush(changed)
    }

    /// Reattaches the end of a connection.
    pub fn change_connection_target(&mut self, id: Uuid, target: Anchor) -> bool {
        let changed = self.structure.change_connection_target(id, target);
        self.flush(changed)
    }

    /// Moves a connection to the trash.
    pub fn remove_connection(&mut self, id: Uuid) -> bool {
        let removed = self.structure.remove_connection(id);
        self.flush(removed)
    }

    /// Restores a trashed connection.
    pub fn recover_connection(&mut self, id: Uuid) -> bool {
        let recovered = self.structure.recover_connection(id);
        self.flush(recovered)
    }

    // ---- causal factors ----

    /// Toggles scenario based causal analysis.
    pub fn set_use_scenarios(&mut self, value: bool) -> bool {
        let changed = self.causal.set_use_scenarios(value);
        self.flush(changed)
    }

    /// Appends a causal factor to a component.
    ///
    /// Returns `None` if the component is unknown or of a type that cannot
    /// carry causal factors.
    pub fn add_causal_factor(&mut self, component_id: Uuid) -> Option<Uuid> {
        let component = self.structure.get_component(component_id)?;
        let id = self.causal.add_causal_factor(component);
        self.flush(id)
    }

    /// Sets the description of a causal factor.
    pub fn set_causal_factor_text(&mut self, component_id: Uuid, factor_id: Uuid, text: &str) -> bool {
        let changed = self
            .causal
            .set_causal_factor_text(component_id, factor_id, text);
        self.flush(changed)
    }

    /// Removes a causal factor and the links attached to it or its entries.
    pub fn remove_causal_factor(&mut self, component_id: Option<Uuid>, factor_id: Uuid) -> bool {
        let entries: Vec<Uuid> = self
            .causal
            .overlays()
            .filter(|overlay| component_id.is_none_or(|id| id == overlay.id()))
            .find_map(|overlay| overlay.factor(factor_id))
            .map(|factor| factor.entries().iter().map(|e| e.id()).collect())
            .unwrap_or_default();
        if !self.causal.remove_causal_factor(component_id, factor_id) {
            return false;
        }
        self.drain();
        self.cascade(std::iter::once(factor_id).chain(entries));
        self.flush(true)
    }

    /// Adds an entry analysing `uca` and links the factor to it.
    pub fn add_uca_entry(&mut self, component_id: Uuid, factor_id: Uuid, uca: Uuid) -> Option<Uuid> {
        let entry = self.causal.add_uca_entry(component_id, factor_id, uca);
        if entry.is_some() {
            self.links
                .add_link(LinkType::CausalFactorUca, Some(factor_id), Some(uca));
        }
        self.flush(entry)
    }

    /// Adds an entry linking a factor directly to hazards.
    pub fn add_hazard_entry(&mut self, component_id: Uuid, factor_id: Uuid) -> Option<Uuid> {
        let entry = self.causal.add_hazard_entry(component_id, factor_id);
        self.flush(entry)
    }

    /// Updates an entry. See [`CausalFactors::change_entry`].
    pub fn change_entry(
        &mut self,
        component_id: Uuid,
        factor_id: Uuid,
        change: EntryChange,
    ) -> Option<EntryChange> {
        let previous = self.causal.change_entry(component_id, factor_id, change);
        self.flush(previous)
    }

    /// Removes an entry and the links attached to it.
    ///
    /// Removing a UCA entry also unlinks the factor from that unsafe control
    /// action.
    pub fn remove_entry(&mut self, component_id: Uuid, factor_id: Uuid, entry_id: Uuid) -> bool {
        let uca = self
            .causal
            .get_causal_factor(component_id, factor_id)
            .and_then(|factor| factor.entry(entry_id))
            .and_then(|entry| entry.uca());
        if !self.causal.remove_entry(component_id, factor_id, entry_id) {
            return false;
        }
        if let Some(uca) = uca {
            self.links
                .delete_link_by_parts(LinkType::CausalFactorUca, Some(factor_id), Some(uca));
        }
        self.drain();
        self.cascade([entry_id]);
        self.flush(true)
    }

    /// Unsafe control actions analysed by a causal factor.
    #[must_use]
    pub fn get_linked_uca_list(&self, factor_id: Uuid) -> Vec<Uuid> {
        self.causal.get_linked_uca_list(factor_id)
    }

    /// Reconciles the model before it is persisted.
    ///
    /// Causal data of deleted components is discarded, safety constraints are
    /// renumbered and links with neither side set are dropped. Returns the
    /// ids of the components whose causal data was discarded.
    #[instrument(skip(self))]
    pub fn prepare_for_save(&mut self) -> Vec<Uuid> {
        let purged = self.causal.prepare_for_save(self.structure.iter());
        let pruned = self.links.prune(Prune::BothNull);
        if pruned > 0 {
            tracing::debug!(pruned, "dropped empty links");
        }
        self.flush(purged)
    }

    // ---- links ----

    /// Links `a` with `b`. See [`LinkRegistry::add_link`].
    pub fn add_link(&mut self, link_type: LinkType, a: Option<Uuid>, b: Option<Uuid>) -> Uuid {
        let id = self.links.add_link(link_type, a, b);
        self.flush(id)
    }

    /// Ids linked to `part`. See [`LinkRegistry::get_links_for`].
    pub fn get_links_for(&mut self, link_type: LinkType, part: Uuid) -> Vec<Uuid> {
        self.links.get_links_for(link_type, part)
    }

    /// Complete links touching `part`.
    pub fn get_raw_links_for(&mut self, link_type: LinkType, part: Uuid) -> Vec<Link> {
        self.links.get_raw_links_for(link_type, part)
    }

    /// Whether `part` is linked. See [`LinkRegistry::is_linked`].
    pub fn is_linked(&mut self, link_type: LinkType, part: Uuid, right_part: Option<Uuid>) -> bool {
        self.links.is_linked(link_type, part, right_part)
    }

    /// Rebinds the sides of a link.
    pub fn change_link(
        &mut self,
        link_type: LinkType,
        link_id: Uuid,
        a: Option<Uuid>,
        b: Option<Uuid>,
    ) -> bool {
        let changed = self.links.change_link(link_type, link_id, a, b);
        self.flush(changed)
    }

    /// Sets the note of a link.
    pub fn change_link_note(&mut self, link_type: LinkType, link_id: Uuid, note: &str) -> bool {
        let changed = self.links.change_link_note(link_type, link_id, note);
        self.flush(changed)
    }

    /// Deletes a link by id.
    pub fn delete_link(&mut self, link_type: LinkType, link_id: Uuid) -> bool {
        let deleted = self.links.delete_link(link_type, link_id);
        self.flush(deleted)
    }

    /// Deletes the link with exactly the sides `(a, b)`.
    pub fn delete_link_by_parts(&mut self, link_type: LinkType, a: Option<Uuid>, b: Option<Uuid>) -> bool {
        let deleted = self.links.delete_link_by_parts(link_type, a, b);
        self.flush(deleted)
    }

    /// Deletes every link of a category touching `part`, or all of them.
    pub fn delete_all_for(&mut self, link_type: LinkType, part: Option<Uuid>) -> usize {
        let count = self.links.delete_all_for(link_type, part);
        self.flush(count)
    }

    /// Removes every link touching `part`, silently.
    /// See [`LinkRegistry::delete_links_for`].
    pub fn delete_links_for(&mut self, part: Uuid, depth: usize) -> Vec<Link> {
        self.links.delete_links_for(part, depth)
    }

    /// Drops dangling links. See [`LinkRegistry::prune`].
    pub fn prune_links(&mut self, mode: Prune) -> usize {
        self.links.prune(mode)
    }

    /// Undoes a link event without reporting it again.
    pub fn revert_link_event(&mut self, event: &LinkEvent) -> bool {
        self.links.revert(event)
    }

    /// Redoes a reverted link event without reporting it again.
    pub fn replay_link_event(&mut self, event: &LinkEvent) -> bool {
        self.links.replay(event)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::domain::{CausalEvent, ComponentEvent, Side};

    fn rect() -> Rectangle {
        Rectangle::new(0, 0, 100, 50)
    }

    fn recording(model: &mut Model) -> Rc<RefCell<Vec<Event>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        model.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        seen
    }

    #[test]
    fn analysis_of_a_removed_component_is_collected() {
        let mut model = Model::sequential(Config::default());
        let root = model.set_root(rect(), "root");

        let dashed = model
            .add_component(root, rect(), "B", ComponentType::DashedBox, None)
            .unwrap();
        let controller = model
            .add_component(root, rect(), "A", ComponentType::Controller, None)
            .unwrap();
        let children: Vec<_> = model
            .get_children(root, false)
            .unwrap()
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(children, [controller, dashed]);

        let uca = Uuid::from_u128(0xCAFE);
        let factor = model.add_causal_factor(controller).unwrap();
        model.add_uca_entry(controller, factor, uca).unwrap();
        assert_eq!(model.get_linked_uca_list(factor), [uca]);
        assert!(model.is_linked(LinkType::CausalFactorUca, factor, Some(uca)));

        assert!(model.remove_component(controller));
        assert!(!model.is_linked(LinkType::CausalFactorUca, factor, None));
        assert!(model.causal().overlay(controller).is_some());

        assert_eq!(model.prepare_for_save(), [controller]);
        assert!(model.causal().overlay(controller).is_none());
        assert!(model.get_linked_uca_list(factor).is_empty());
    }

    #[test]
    fn events_arrive_after_each_command_in_order() {
        let mut model = Model::sequential(Config::default());
        let seen = recording(&mut model);

        let root = model.set_root(rect(), "root");
        let sensor = model
            .add_component(root, rect(), "sensor", ComponentType::Sensor, None)
            .unwrap();
        assert!(model.change_text(sensor, "speed sensor"));
        assert!(!model.change_text(sensor, "speed sensor"));

        let kinds: Vec<_> = seen.borrow().iter().map(Event::kind).collect();
        assert_eq!(kinds, ["root set", "component added", "component text changed"]);
        assert_eq!(model.delivered(), 3);
        assert_eq!(
            seen.borrow()[2],
            Event::Component(ComponentEvent::TextChanged {
                id: sensor,
                old: "sensor".into(),
                new: "speed sensor".into(),
            })
        );
    }

    #[test]
    fn removing_a_component_reports_cascaded_links() {
        let mut model = Model::sequential(Config::default());
        let root = model.set_root(rect(), "root");
        let actuator = model
            .add_component(root, rect(), "valve", ComponentType::Actuator, None)
            .unwrap();
        let process = model
            .add_component(root, rect(), "tank", ComponentType::ControlledProcess, None)
            .unwrap();
        model
            .add_connection(
                Anchor::new(actuator, Side::Bottom),
                Anchor::new(process, Side::Top),
                ConnectionType::ControlAction,
            )
            .unwrap();

        let variable = Uuid::from_u128(0xBEEF);
        let link = model.add_link(LinkType::ComponentVariable, Some(actuator), Some(variable));
        let note = model.add_link(LinkType::HazardAccident, Some(link), Some(Uuid::from_u128(7)));

        let (_, events) = model.subscribe_channel();
        assert!(model.remove_component(actuator));
        assert!(model.structure().connections().is_empty());

        let received: Vec<Event> = events.try_iter().collect();
        assert_eq!(received.len(), 3);
        assert!(matches!(
            received[0],
            Event::Component(ComponentEvent::Removed { id, .. }) if id == actuator
        ));
        let removed: Vec<Uuid> = received[1..]
            .iter()
            .flat_map(|event| match event {
                Event::Link(LinkEvent::Removed { links, .. }) => {
                    links.iter().map(Link::id).collect::<Vec<Uuid>>()
                }
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&link) && removed.contains(&note));

        assert!(model.recover_component(root, actuator));
        assert_eq!(model.structure().connections().len(), 1);
        assert_eq!(model.get_links_for(LinkType::ComponentVariable, actuator), [variable]);
        assert_eq!(model.links().len(), 2);
    }

    #[test]
    fn recovering_a_component_restores_its_links() {
        let mut model = Model::sequential(Config::default());
        let root = model.set_root(rect(), "root");
        let controller = model
            .add_component(root, rect(), "controller", ComponentType::Controller, None)
            .unwrap();
        let factor = model.add_causal_factor(controller).unwrap();
        let uca = Uuid::from_u128(0xCAFE);
        let entry = model.add_uca_entry(controller, factor, uca).unwrap();
        let variable = Uuid::from_u128(0xBEEF);
        let link = model.add_link(LinkType::ComponentVariable, Some(controller), Some(variable));

        assert!(model.remove_component(controller));
        assert!(!model.is_linked(LinkType::CausalFactorUca, factor, Some(uca)));

        let seen = recording(&mut model);
        assert!(model.recover_component(root, controller));
        assert_eq!(model.get_linked_uca_list(factor), [uca]);
        assert!(model.is_linked(LinkType::CausalFactorUca, factor, Some(uca)));
        assert_eq!(model.get_links_for(LinkType::ComponentVariable, controller), [variable]);
        assert!(model.links().iter().any(|restored| restored.id() == link));

        let kinds: Vec<_> = seen.borrow().iter().map(Event::kind).collect();
        assert_eq!(kinds[0], "component recovered");
        assert_eq!(kinds.len(), 3);

        assert!(model.remove_entry(controller, factor, entry));
        assert!(!model.is_linked(LinkType::CausalFactorUca, factor, None));
    }

    #[test]
    fn evicted_components_take_their_links_with_them() {
        let mut config = Config::default();
        config.set_trash_capacity(1);
        let mut model = Model::sequential(config);
        let root = model.set_root(rect(), "root");
        let first = model
            .add_component(root, rect(), "first", ComponentType::Sensor, None)
            .unwrap();
        let second = model
            .add_component(root, rect(), "second", ComponentType::Sensor, None)
            .unwrap();
        model.add_link(LinkType::ComponentVariable, Some(first), Some(Uuid::from_u128(1)));
        model.add_link(LinkType::ComponentVariable, Some(second), Some(Uuid::from_u128(2)));

        assert!(model.remove_component(first));
        assert!(model.remove_component(second));
        assert!(!model.recover_component(root, first));
        assert_eq!(model.trashed_links.len(), 1);

        assert!(model.recover_component(root, second));
        assert!(model.trashed_links.is_empty());
        assert_eq!(model.links().len(), 1);
    }

    #[test]
    fn removing_an_entry_unlinks_its_uca() {
        let mut model = Model::sequential(Config::default());
        let root = model.set_root(rect(), "root");
        let controller = model
            .add_component(root, rect(), "controller", ComponentType::Controller, None)
            .unwrap();
        let factor = model.add_causal_factor(controller).unwrap();
        let uca = Uuid::from_u128(0xAB);
        let entry = model.add_uca_entry(controller, factor, uca).unwrap();
        let hazard = Uuid::from_u128(0xCD);
        model.add_link(LinkType::CausalEntryHazard, Some(entry), Some(hazard));

        let seen = recording(&mut model);
        assert!(model.remove_entry(controller, factor, entry));
        assert!(!model.remove_entry(controller, factor, entry));
        assert!(model.links().is_empty());

        let seen = seen.borrow();
        assert!(matches!(seen[0], Event::Causal(CausalEvent::EntryRemoved { .. })));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn factors_need_a_suitable_component() {
        let mut model = Model::sequential(Config::default());
        let root = model.set_root(rect(), "root");
        let action = model
            .add_component(root, rect(), "open", ComponentType::ControlAction, None)
            .unwrap();

        assert_eq!(model.add_causal_factor(action), None);
        assert_eq!(model.add_causal_factor(Uuid::from_u128(404)), None);
        assert!(model.causal().is_empty());
    }

    #[test]
    fn link_events_can_be_reverted() {
        let mut model = Model::sequential(Config::default());
        let (_, events) = model.subscribe_channel();
        let (a, b) = (Uuid::from_u128(1), Uuid::from_u128(2));

        let link = model.add_link(LinkType::UcaHazard, Some(a), Some(b));
        assert!(model.delete_link(LinkType::UcaHazard, link));

        let history: Vec<Event> = events.try_iter().collect();
        let Event::Link(removal) = &history[1] else {
            panic!("unexpected event {:?}", history[1]);
        };
        assert!(model.revert_link_event(removal));
        assert_eq!(model.get_links_for(LinkType::UcaHazard, a), [b]);
        assert!(model.replay_link_event(removal));
        assert!(model.get_links_for(LinkType::UcaHazard, a).is_empty());
    }
}
