//! Nodes of the control structure diagram.

use std::{cmp::Ordering, collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position and size of a component in one diagram step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rectangle {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// The role a component plays in the control structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    /// The diagram root.
    Root,
    /// Acts on the controlled process.
    Actuator,
    /// Issues control actions.
    Controller,
    /// The process under control.
    ControlledProcess,
    /// Observes the controlled process.
    Sensor,
    /// A control action drawn on the diagram.
    #[serde(rename = "CONTROLACTION")]
    ControlAction,
    /// The process model held by a controller.
    ProcessModel,
    /// A dashed grouping box. Always drawn after its siblings.
    #[serde(rename = "DASHEDBOX")]
    DashedBox,
    /// Anything else.
    Undefined,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Root => "root",
            Self::Actuator => "actuator",
            Self::Controller => "controller",
            Self::ControlledProcess => "controlled process",
            Self::Sensor => "sensor",
            Self::ControlAction => "control action",
            Self::ProcessModel => "process model",
            Self::DashedBox => "dashed box",
            Self::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// Sibling order: dashed boxes sort after everything else.
///
/// Every other pair compares equal, so this must be used with a stable sort
/// to keep insertion and move order among the remaining siblings.
#[must_use]
pub fn compare_components(x: &Component, y: &Component) -> Ordering {
    match (
        x.component_type == ComponentType::DashedBox,
        y.component_type == ComponentType::DashedBox,
    ) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// A node of the control structure tree.
///
/// A component owns its children. Everything else it refers to (control
/// actions, process variables, its relative) is referenced by id only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub(crate) id: Uuid,
    pub(crate) component_type: ComponentType,
    pub(crate) text: String,
    pub(crate) comment: String,
    pub(crate) control_action: Option<Uuid>,
    pub(crate) layout_primary: Rectangle,
    pub(crate) layout_secondary: Rectangle,
    pub(crate) relative: Option<Uuid>,
    pub(crate) safety_critical: bool,
    pub(crate) unsafe_variables: BTreeSet<Uuid>,
    pub(crate) children: Vec<Component>,
}

impl Component {
    /// Creates a childless component. Both layouts start out equal.
    ///
    /// The control action is dropped unless the type is
    /// [`ComponentType::ControlAction`].
    #[must_use]
    pub fn new(
        id: Uuid,
        component_type: ComponentType,
        text: impl Into<String>,
        layout: Rectangle,
        control_action: Option<Uuid>,
    ) -> Self {
        Self {
            id,
            component_type,
            text: text.into(),
            comment: String::new(),
            control_action: control_action
                .filter(|_| component_type == ComponentType::ControlAction),
            layout_primary: layout,
            layout_secondary: layout,
            relative: None,
            safety_critical: false,
            unsafe_variables: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    /// The component's identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The component's type.
    #[must_use]
    pub const fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Display text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Free-form comment.
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// The linked control action. Only ever set on control action components.
    #[must_use]
    pub const fn control_action(&self) -> Option<Uuid> {
        self.control_action
    }

    /// Layout in the first diagram step when `step0` is set, in the process
    /// model step otherwise.
    #[must_use]
    pub const fn layout(&self, step0: bool) -> Rectangle {
        if step0 {
            self.layout_primary
        } else {
            self.layout_secondary
        }
    }

    /// The loose back-reference to a mirrored component.
    #[must_use]
    pub const fn relative(&self) -> Option<Uuid> {
        self.relative
    }

    /// Whether the component is marked safety critical.
    #[must_use]
    pub const fn is_safety_critical(&self) -> bool {
        self.safety_critical
    }

    /// Process variables recorded as unsafe for this component.
    #[must_use]
    pub const fn unsafe_process_variables(&self) -> &BTreeSet<Uuid> {
        &self.unsafe_variables
    }

    /// Children in stored order (dashed boxes last).
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Depth-first search, this node first.
    #[must_use]
    pub fn find(&self, id: Uuid) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: Uuid) -> Option<&mut Self> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Finds the node whose direct children contain `id`.
    pub(crate) fn find_parent_mut(&mut self, id: Uuid) -> Option<&mut Self> {
        if self.children.iter().any(|child| child.id == id) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_parent_mut(id))
    }

    /// Attaches a child and restores the sibling order.
    pub(crate) fn attach(&mut self, child: Self) {
        self.children.push(child);
        self.sort_children();
    }

    pub(crate) fn sort_children(&mut self) {
        self.children.sort_by(compare_components);
    }

    /// Iterates over this node and all descendants, depth first.
    pub fn iter(&self) -> impl Iterator<Item = &Self> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    pub(crate) fn for_each_mut(&mut self, f: &mut impl FnMut(&mut Self)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }
}
