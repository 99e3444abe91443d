//! The control structure: a tree of components plus the connections drawn
//! between them.
//!
//! Lookup-based operations never fail loudly. An unknown id, or a change that
//! would leave a value as it was, is reported as `false`/`None` and produces
//! no event.

use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    component::{Component, ComponentType, Rectangle},
    connection::{Anchor, Connection, ConnectionType},
    event::{ComponentEvent, ConnectionEvent, Event},
    identifier::IdGenerator,
    trash::Trash,
};

/// A removed subtree, together with the connections that were attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TrashedComponent {
    component: Component,
    connections: Vec<Connection>,
}

/// The component tree of a control structure diagram.
#[derive(Debug, Clone)]
pub struct ControlStructure {
    root: Option<Component>,
    connections: Vec<Connection>,
    component_trash: Trash<TrashedComponent>,
    connection_trash: Trash<Connection>,
    ids: IdGenerator,
    events: Vec<Event>,
}

impl Default for ControlStructure {
    fn default() -> Self {
        Self::new(crate::Config::default().trash_capacity())
    }
}

impl ControlStructure {
    /// Creates an empty structure whose trashes hold `trash_capacity` items each.
    #[must_use]
    pub fn new(trash_capacity: usize) -> Self {
        Self {
            root: None,
            connections: Vec::new(),
            component_trash: Trash::new(trash_capacity),
            connection_trash: Trash::new(trash_capacity),
            ids: IdGenerator::default(),
            events: Vec::new(),
        }
    }

    /// Rebuilds a structure from persisted parts.
    #[must_use]
    pub fn from_parts(
        root: Option<Component>,
        connections: Vec<Connection>,
        trash_capacity: usize,
    ) -> Self {
        let mut structure = Self::new(trash_capacity);
        structure.root = root;
        structure.connections = connections;
        structure
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

    fn post(&mut self, event: impl Into<Event>) {
        self.events.push(event.into());
    }

    /// Starts a new diagram with a fresh root.
    ///
    /// The previous tree and all connections are discarded.
    #[instrument(skip(self))]
    pub fn set_root(&mut self, layout: Rectangle, text: &str) -> Uuid {
        let id = self.ids.next_id();
        self.root = Some(Component::new(id, ComponentType::Root, text, layout, None));
        self.connections.clear();
        self.post(ComponentEvent::RootSet { id });
        id
    }

    /// The root component, if a diagram has been started.
    #[must_use]
    pub const fn root(&self) -> Option<&Component> {
        self.root.as_ref()
    }

    /// Iterates over every live component, depth first, root first.
    pub fn iter(&self) -> impl Iterator<Item = &Component> + '_ {
        self.root.iter().flat_map(Component::iter)
    }

    /// Number of live components, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether the structure has no root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Creates a component under `parent_id` and returns its id.
    ///
    /// Returns `None` if the parent does not exist.
    #[instrument(skip(self, layout))]
    pub fn add_component(
        &mut self,
        parent_id: Uuid,
        layout: Rectangle,
        text: &str,
        component_type: ComponentType,
        control_action: Option<Uuid>,
    ) -> Option<Uuid> {
        let parent = self.root.as_mut()?.find_mut(parent_id)?;
        let id = self.ids.next_id();
        parent.attach(Component::new(
            id,
            component_type,
            text,
            layout,
            control_action,
        ));
        self.post(ComponentEvent::Added {
            parent: parent_id,
            id,
        });
        Some(id)
    }

    /// Finds a component anywhere in the tree.
    #[must_use]
    pub fn get_component(&self, id: Uuid) -> Option<&Component> {
        self.root.as_ref()?.find(id)
    }

    /// Children of `id`, dashed boxes last.
    ///
    /// With `pm_step` set, process model components are left out; they only
    /// appear in the diagram step without process models.
    #[must_use]
    pub fn get_children(&self, id: Uuid, pm_step: bool) -> Option<Vec<&Component>> {
        let component = self.get_component(id)?;
        Some(
            component
                .children
                .iter()
                .filter(|child| !pm_step || child.component_type != ComponentType::ProcessModel)
                .collect(),
        )
    }

    /// Detaches the subtree rooted at `id` and moves it to the trash.
    ///
    /// Connections touching the subtree go with it. The root cannot be
    /// removed.
    #[instrument(skip(self))]
    pub fn remove_component(&mut self, id: Uuid) -> bool {
        let Some(parent) = self.root.as_mut().and_then(|root| root.find_parent_mut(id)) else {
            return false;
        };
        let Some(index) = parent.children.iter().position(|child| child.id == id) else {
            return false;
        };
        let parent_id = parent.id;
        let component = parent.children.remove(index);

        let subtree: Vec<Uuid> = component.iter().map(Component::id).collect();
        let (detached, kept) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|connection: &Connection| {
                subtree.iter().any(|member| connection.touches(*member))
            });
        self.connections = kept;

        let trashed = TrashedComponent {
            component,
            connections: detached,
        };
        if let Some((purged, _)) = self.component_trash.put(id, trashed) {
            tracing::info!("purged component {purged} from trash");
        }

        self.post(ComponentEvent::Removed {
            parent: parent_id,
            id,
        });
        true
    }

    /// Reattaches a trashed subtree under `parent_id`.
    ///
    /// Connections removed along with the subtree are restored when both of
    /// their ends exist again.
    #[instrument(skip(self))]
    pub fn recover_component(&mut self, parent_id: Uuid, id: Uuid) -> bool {
        if !self.component_trash.contains(id) || self.get_component(parent_id).is_none() {
            return false;
        }
        let Some(trashed) = self.component_trash.take(id) else {
            return false;
        };
        if let Some(parent) = self.root.as_mut().and_then(|root| root.find_mut(parent_id)) {
            parent.attach(trashed.component);
        }

        for connection in trashed.connections {
            if self.get_component(connection.source.owner).is_some()
                && self.get_component(connection.target.owner).is_some()
            {
                self.connections.push(connection);
            } else {
                tracing::debug!("dropping connection {} with a missing end", connection.id);
            }
        }

        self.post(ComponentEvent::Recovered {
            parent: parent_id,
            id,
        });
        true
    }

    /// Whether the subtree rooted at `id` is waiting in the component trash.
    #[must_use]
    pub fn is_trashed(&self, id: Uuid) -> bool {
        self.component_trash.contains(id)
    }

    /// Number of subtrees waiting in the component trash.
    #[must_use]
    pub fn component_trash_size(&self) -> usize {
        self.component_trash.len()
    }

    /// How many items each trash holds before the oldest is purged.
    #[must_use]
    pub const fn trash_capacity(&self) -> usize {
        self.component_trash.capacity()
    }

    /// Moves a component one position towards the end of its siblings
    /// (`move_up`) or towards the start, or all the way when `all_the_way` is
    /// set.
    ///
    /// A component never crosses into the dashed box segment (or out of it),
    /// so dashed boxes stay last. Returns `false` when the component is the
    /// root, unknown, or already at the target end.
    #[instrument(skip(self))]
    pub fn move_component(&mut self, all_the_way: bool, move_up: bool, id: Uuid) -> bool {
        let Some(parent) = self.root.as_mut().and_then(|root| root.find_parent_mut(id)) else {
            return false;
        };
        let children = &mut parent.children;
        let Some(index) = children.iter().position(|child| child.id == id) else {
            return false;
        };

        let undashed = children
            .iter()
            .filter(|child| child.component_type != ComponentType::DashedBox)
            .count();
        let (start, end) = if children[index].component_type == ComponentType::DashedBox {
            (undashed, children.len() - 1)
        } else {
            (0, undashed - 1)
        };

        let target = match (move_up, all_the_way) {
            (true, true) => end,
            (true, false) => (index + 1).min(end),
            (false, true) => start,
            (false, false) => index.saturating_sub(1).max(start),
        };
        if target == index {
            return false;
        }

        let component = children.remove(index);
        children.insert(target, component);
        let parent_id = parent.id;

        self.post(ComponentEvent::Moved {
            parent: parent_id,
            id,
            from: index,
            to: target,
        });
        true
    }

    fn update(
        &mut self,
        id: Uuid,
        change: impl FnOnce(&mut Component) -> Option<ComponentEvent>,
    ) -> bool {
        let Some(component) = self.root.as_mut().and_then(|root| root.find_mut(id)) else {
            return false;
        };
        match change(component) {
            Some(event) => {
                self.post(event);
                true
            }
            None => false,
        }
    }

    /// Sets the primary (`step0`) or secondary layout of a component.
    pub fn change_layout(&mut self, id: Uuid, layout: Rectangle, step0: bool) -> bool {
        self.update(id, |component| {
            let slot = if step0 {
                &mut component.layout_primary
            } else {
                &mut component.layout_secondary
            };
            if *slot == layout {
                return None;
            }
            let old = std::mem::replace(slot, layout);
            Some(ComponentEvent::LayoutChanged {
                id,
                step0,
                old,
                new: layout,
            })
        })
    }

    /// Copies every primary layout onto the secondary layout where they
    /// differ. Produces a single event listing every change.
    pub fn synchronize_layouts(&mut self) -> bool {
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        let mut previous = Vec::new();
        root.for_each_mut(&mut |component: &mut Component| {
            if component.layout_primary != component.layout_secondary {
                previous.push((component.id, component.layout_secondary));
                component.layout_secondary = component.layout_primary;
            }
        });
        if previous.is_empty() {
            return false;
        }
        self.post(ComponentEvent::LayoutsSynchronized { previous });
        true
    }

    /// Sets the display text of a component.
    pub fn change_text(&mut self, id: Uuid, text: &str) -> bool {
        self.update(id, |component| {
            (component.text != text).then(|| ComponentEvent::TextChanged {
                id,
                old: std::mem::replace(&mut component.text, text.to_string()),
                new: text.to_string(),
            })
        })
    }

    /// Sets the comment of a component.
    pub fn change_comment(&mut self, id: Uuid, comment: &str) -> bool {
        self.update(id, |component| {
            (component.comment != comment).then(|| ComponentEvent::CommentChanged {
                id,
                old: std::mem::replace(&mut component.comment, comment.to_string()),
                new: comment.to_string(),
            })
        })
    }

    /// Links a control action component to a control action.
    ///
    /// Fails for every other component type.
    pub fn link_to_control_action(&mut self, id: Uuid, control_action: Option<Uuid>) -> bool {
        self.update(id, |component| {
            if component.component_type != ComponentType::ControlAction
                || component.control_action == control_action
            {
                return None;
            }
            let old = std::mem::replace(&mut component.control_action, control_action);
            Some(ComponentEvent::ControlActionLinked {
                id,
                old,
                new: control_action,
            })
        })
    }

    /// Sets the loose back-reference of a component.
    pub fn set_relative(&mut self, id: Uuid, relative: Option<Uuid>) -> bool {
        self.update(id, |component| {
            (component.relative != relative).then(|| ComponentEvent::RelativeChanged {
                id,
                old: std::mem::replace(&mut component.relative, relative),
                new: relative,
            })
        })
    }

    /// Marks a component safety critical or not.
    pub fn set_safety_critical(&mut self, id: Uuid, value: bool) -> bool {
        self.update(id, |component| {
            (component.safety_critical != value).then(|| {
                component.safety_critical = value;
                ComponentEvent::SafetyCriticalChanged { id, value }
            })
        })
    }

    /// Records a process variable as unsafe for a component.
    ///
    /// Control action components carry no process variables.
    pub fn add_unsafe_process_variable(&mut self, id: Uuid, variable: Uuid) -> bool {
        self.update(id, |component| {
            (component.component_type != ComponentType::ControlAction
                && component.unsafe_variables.insert(variable))
            .then_some(ComponentEvent::UnsafeVariableAdded { id, variable })
        })
    }

    /// Removes an unsafe process variable from a component.
    pub fn remove_unsafe_process_variable(&mut self, id: Uuid, variable: Uuid) -> bool {
        self.update(id, |component| {
            component
                .unsafe_variables
                .remove(&variable)
                .then_some(ComponentEvent::UnsafeVariableRemoved { id, variable })
        })
    }

    /// Connects two anchors. Both owners must exist.
    #[instrument(skip(self))]
    pub fn add_connection(
        &mut self,
        source: Anchor,
        target: Anchor,
        connection_type: ConnectionType,
    ) -> Option<Uuid> {
        self.get_component(source.owner)?;
        self.get_component(target.owner)?;
        let id = self.ids.next_id();
        self.connections
            .push(Connection::new(id, source, target, connection_type));
        self.post(ConnectionEvent::Added { id });
        Some(id)
    }

    /// All live connections, in creation order.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Finds a live connection.
    #[must_use]
    pub fn get_connection(&self, id: Uuid) -> Option<&Connection> {
        self.connections.iter().find(|connection| connection.id == id)
    }

    fn update_connection(
        &mut self,
        id: Uuid,
        change: impl FnOnce(&mut Connection) -> Option<ConnectionEvent>,
    ) -> bool {
        let Some(connection) = self.connections.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        match change(connection) {
            Some(event) => {
                self.post(event);
                true
            }
            None => false,
        }
    }

    /// Changes the type of a connection.
    pub fn change_connection_type(&mut self, id: Uuid, connection_type: ConnectionType) -> bool {
        self.update_connection(id, |connection| {
            (connection.connection_type != connection_type).then(|| ConnectionEvent::TypeChanged {
                id,
                old: std::mem::replace(&mut connection.connection_type, connection_type),
                new: connection_type,
            })
        })
    }

    /// Reattaches the start of a connection. The new owner must exist.
    pub fn change_connection_source(&mut self, id: Uuid, source: Anchor) -> bool {
        if self.get_component(source.owner).is_none() {
            return false;
        }
        self.update_connection(id, |connection| {
            (connection.source != source).then(|| ConnectionEvent::SourceChanged {
                id,
                old: std::mem::replace(&mut connection.source, source),
                new: source,
            })
        })
    }

    /// Reattaches the end of a connection. The new owner must exist.
    pub fn change_connection_target(&mut self, id: Uuid, target: Anchor) -> bool {
        if self.get_component(target.owner).is_none() {
            return false;
        }
        self.update_connection(id, |connection| {
            (connection.target != target).then(|| ConnectionEvent::TargetChanged {
                id,
                old: std::mem::replace(&mut connection.target, target),
                new: target,
            })
        })
    }

    /// Moves a connection to the connection trash.
    #[instrument(skip(self))]
    pub fn remove_connection(&mut self, id: Uuid) -> bool {
        let Some(index) = self.connections.iter().position(|c| c.id == id) else {
            return false;
        };
        let connection = self.connections.remove(index);
        if let Some((purged, _)) = self.connection_trash.put(id, connection) {
            tracing::info!("purged connection {purged} from trash");
        }
        self.post(ConnectionEvent::Removed { id });
        true
    }

    /// Restores a trashed connection, provided both of its ends still exist.
    #[instrument(skip(self))]
    pub fn recover_connection(&mut self, id: Uuid) -> bool {
        let Some(connection) = self.connection_trash.get(id) else {
            return false;
        };
        if self.get_component(connection.source.owner).is_none()
            || self.get_component(connection.target.owner).is_none()
        {
            return false;
        }
        let Some(connection) = self.connection_trash.take(id) else {
            return false;
        };
        self.connections.push(connection);
        self.post(ConnectionEvent::Recovered { id });
        true
    }

    /// Number of connections waiting in the connection trash.
    #[must_use]
    pub fn connection_trash_size(&self) -> usize {
        self.connection_trash.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::Side;

    fn structure() -> (ControlStructure, Uuid) {
        let mut structure = ControlStructure::new(3).with_ids(IdGenerator::sequential());
        let root = structure.set_root(Rectangle::new(0, 0, 800, 600), "root");
        structure.take_events();
        (structure, root)
    }

    fn add(structure: &mut ControlStructure, parent: Uuid, kind: ComponentType) -> Uuid {
        structure
            .add_component(parent, Rectangle::default(), "", kind, None)
            .expect("parent should exist")
    }

    fn child_ids(structure: &ControlStructure, parent: Uuid) -> Vec<Uuid> {
        structure
            .get_children(parent, false)
            .unwrap()
            .iter()
            .map(|c| c.id())
            .collect()
    }

    fn assert_dashed_last(structure: &ControlStructure) {
        for component in structure.iter() {
            let types: Vec<_> = component
                .children()
                .iter()
                .map(Component::component_type)
                .collect();
            let first_dashed = types
                .iter()
                .position(|t| *t == ComponentType::DashedBox)
                .unwrap_or(types.len());
            assert!(
                types[first_dashed..]
                    .iter()
                    .all(|t| *t == ComponentType::DashedBox),
                "non-dashed sibling after a dashed box: {types:?}"
            );
        }
    }

    #[test]
    fn dashed_box_added_first_still_sorts_last() {
        let (mut structure, root) = structure();
        let dashed = add(&mut structure, root, ComponentType::DashedBox);
        let controller = add(&mut structure, root, ComponentType::Controller);

        assert_eq!(child_ids(&structure, root), [controller, dashed]);
        assert_eq!(
            structure.take_events(),
            [
                Event::Component(ComponentEvent::Added {
                    parent: root,
                    id: dashed
                }),
                Event::Component(ComponentEvent::Added {
                    parent: root,
                    id: controller
                }),
            ]
        );
    }

    #[test]
    fn add_under_unknown_parent_fails_without_event() {
        let (mut structure, root) = structure();
        let result = structure.add_component(
            Uuid::from_u128(999),
            Rectangle::default(),
            "x",
            ComponentType::Sensor,
            None,
        );
        assert!(result.is_none());
        assert!(structure.take_events().is_empty());

        let sensor = structure
            .add_component(root, Rectangle::default(), "y", ComponentType::Sensor, None)
            .unwrap();
        assert_eq!(sensor, Uuid::from_u128(root.as_u128() + 1));
    }

    #[test]
    fn get_children_hides_process_models_in_pm_step() {
        let (mut structure, root) = structure();
        let controller = add(&mut structure, root, ComponentType::Controller);
        let model = add(&mut structure, controller, ComponentType::ProcessModel);
        let variable = add(&mut structure, controller, ComponentType::Undefined);

        assert_eq!(child_ids(&structure, controller), [model, variable]);
        let pm: Vec<_> = structure
            .get_children(controller, true)
            .unwrap()
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(pm, [variable]);
        assert!(structure.get_children(Uuid::from_u128(999), false).is_none());
    }

    #[test]
    fn remove_and_recover_subtree() {
        let (mut structure, root) = structure();
        let controller = add(&mut structure, root, ComponentType::Controller);
        let inner = add(&mut structure, controller, ComponentType::ProcessModel);
        let sensor = add(&mut structure, root, ComponentType::Sensor);
        structure
            .add_connection(
                Anchor::new(inner, Side::Bottom),
                Anchor::new(sensor, Side::Top),
                ConnectionType::Feedback,
            )
            .unwrap();

        assert!(structure.remove_component(controller));
        assert!(structure.get_component(inner).is_none());
        assert!(structure.connections().is_empty());
        assert_eq!(structure.component_trash_size(), 1);

        assert!(!structure.recover_component(Uuid::from_u128(999), controller));
        assert!(structure.recover_component(root, controller));
        assert_eq!(structure.get_component(inner).unwrap().id(), inner);
        assert_eq!(structure.connections().len(), 1);
        assert_eq!(structure.component_trash_size(), 0);
        assert!(!structure.recover_component(root, controller));
    }

    #[test]
    fn root_cannot_be_removed_or_moved() {
        let (mut structure, root) = structure();
        assert!(!structure.remove_component(root));
        assert!(!structure.move_component(false, true, root));
    }

    #[test]
    fn trash_is_bounded() {
        let (mut structure, root) = structure();
        let ids: Vec<_> = (0..4)
            .map(|_| add(&mut structure, root, ComponentType::Sensor))
            .collect();
        for id in &ids {
            assert!(structure.remove_component(*id));
        }
        assert_eq!(structure.trash_capacity(), 3);
        assert_eq!(structure.component_trash_size(), 3);
        assert!(!structure.recover_component(root, ids[0]));
        assert!(structure.recover_component(root, ids[3]));
    }

    #[test]
    fn move_reorders_within_segment() {
        let (mut structure, root) = structure();
        let a = add(&mut structure, root, ComponentType::Controller);
        let b = add(&mut structure, root, ComponentType::Actuator);
        let c = add(&mut structure, root, ComponentType::Sensor);
        let dashed = add(&mut structure, root, ComponentType::DashedBox);
        structure.take_events();

        assert!(structure.move_component(false, true, a));
        assert_eq!(child_ids(&structure, root), [b, a, c, dashed]);
        assert_eq!(
            structure.take_events(),
            [Event::Component(ComponentEvent::Moved {
                parent: root,
                id: a,
                from: 0,
                to: 1
            })]
        );

        // already the last non-dashed sibling: cannot pass the dashed box
        assert!(structure.move_component(true, true, a));
        assert!(!structure.move_component(false, true, a));
        assert_eq!(child_ids(&structure, root), [b, c, a, dashed]);

        assert!(structure.move_component(true, false, a));
        assert_eq!(child_ids(&structure, root), [a, b, c, dashed]);
        assert!(!structure.move_component(true, false, a));
        assert!(!structure.move_component(false, false, dashed));
        assert_dashed_last(&structure);
    }

    #[test]
    fn setters_skip_unchanged_values() {
        let (mut structure, root) = structure();
        let id = add(&mut structure, root, ComponentType::Controller);
        structure.take_events();

        assert!(structure.change_text(id, "Controller"));
        assert!(!structure.change_text(id, "Controller"));
        assert!(!structure.change_text(Uuid::from_u128(999), "x"));

        let layout = Rectangle::new(10, 10, 50, 20);
        assert!(structure.change_layout(id, layout, true));
        assert!(!structure.change_layout(id, layout, true));
        assert_eq!(structure.get_component(id).unwrap().layout(false), Rectangle::default());

        assert!(structure.change_comment(id, "note"));
        assert!(structure.set_safety_critical(id, true));
        assert!(!structure.set_safety_critical(id, true));
        assert!(structure.set_relative(id, Some(root)));
        assert!(!structure.set_relative(id, Some(root)));

        assert_eq!(structure.take_events().len(), 5);
    }

    #[test]
    fn synchronize_layouts_copies_primary_to_secondary() {
        let (mut structure, root) = structure();
        let id = add(&mut structure, root, ComponentType::Controller);
        let layout = Rectangle::new(1, 2, 3, 4);
        structure.change_layout(id, layout, true);
        structure.take_events();

        assert!(structure.synchronize_layouts());
        assert_eq!(structure.get_component(id).unwrap().layout(false), layout);
        assert_eq!(
            structure.take_events(),
            [Event::Component(ComponentEvent::LayoutsSynchronized {
                previous: vec![(id, Rectangle::default())]
            })]
        );
        assert!(!structure.synchronize_layouts());
    }

    #[test]
    fn control_action_link_requires_control_action_type() {
        let (mut structure, root) = structure();
        let action = Uuid::from_u128(500);
        let controller = add(&mut structure, root, ComponentType::Controller);
        let ca = add(&mut structure, root, ComponentType::ControlAction);

        assert!(!structure.link_to_control_action(controller, Some(action)));
        assert!(structure.link_to_control_action(ca, Some(action)));
        assert!(!structure.link_to_control_action(ca, Some(action)));
        assert_eq!(structure.get_component(ca).unwrap().control_action(), Some(action));
    }

    #[test]
    fn unsafe_variables_form_a_set() {
        let (mut structure, root) = structure();
        let variable = Uuid::from_u128(700);
        let controller = add(&mut structure, root, ComponentType::Controller);
        let ca = add(&mut structure, root, ComponentType::ControlAction);

        assert!(structure.add_unsafe_process_variable(controller, variable));
        assert!(!structure.add_unsafe_process_variable(controller, variable));
        assert!(!structure.add_unsafe_process_variable(ca, variable));
        assert!(structure.remove_unsafe_process_variable(controller, variable));
        assert!(!structure.remove_unsafe_process_variable(controller, variable));
    }

    #[test]
    fn connection_lifecycle() {
        let (mut structure, root) = structure();
        let controller = add(&mut structure, root, ComponentType::Controller);
        let process = add(&mut structure, root, ComponentType::ControlledProcess);
        let from = Anchor::new(controller, Side::Bottom);
        let to = Anchor::new(process, Side::Top);

        assert!(structure
            .add_connection(from, Anchor::new(Uuid::from_u128(999), Side::Top), ConnectionType::Feedback)
            .is_none());
        let id = structure
            .add_connection(from, to, ConnectionType::ControlAction)
            .unwrap();

        assert!(structure.change_connection_type(id, ConnectionType::Feedback));
        assert!(!structure.change_connection_type(id, ConnectionType::Feedback));
        assert!(structure.change_connection_target(id, Anchor::new(process, Side::Left)));
        assert!(!structure.change_connection_source(id, Anchor::new(Uuid::from_u128(999), Side::Left)));

        assert!(structure.remove_connection(id));
        assert_eq!(structure.connection_trash_size(), 1);
        assert!(structure.get_connection(id).is_none());

        structure.remove_component(process);
        assert!(!structure.recover_connection(id));
        structure.recover_component(root, process);
        assert!(structure.recover_connection(id));
        assert_eq!(
            structure.get_connection(id).unwrap().connection_type(),
            ConnectionType::Feedback
        );
    }
}
