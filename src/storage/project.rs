use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::Path,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Config, Model,
    domain::{
        Anchor, CausalComponent, CausalEntry, CausalFactor, CausalFactors, Component,
        ComponentType, Connection, ConnectionType, ControlStructure, EntryTarget, Link,
        LinkRegistry, LinkType, Rectangle, SafetyConstraint, causal,
    },
};

/// Errors that can occur when reading or writing a project file.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// The file could not be read or written.
    #[error("failed to access project file: {0}")]
    Io(#[from] io::Error),
    /// The file is not a valid project.
    #[error("failed to parse project file: {0}")]
    Json(#[from] serde_json::Error),
}

/// A persisted project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProjectVersion")]
#[serde(into = "ProjectVersion")]
pub struct ProjectFile {
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    use_scenarios: bool,
    root: Option<ComponentRecord>,
    connections: Vec<ConnectionRecord>,
    links: BTreeMap<LinkType, Vec<LinkRecord>>,
    causal_factors: BTreeMap<Uuid, Vec<FactorRecord>>,
    safety_constraints: Vec<ConstraintRecord>,
}

impl ProjectFile {
    /// Takes a snapshot of `model`, stamped with the current time.
    #[must_use]
    pub fn from_model(model: &Model) -> Self {
        let mut links: BTreeMap<LinkType, Vec<LinkRecord>> = BTreeMap::new();
        for link in model.links().iter() {
            links
                .entry(link.link_type())
                .or_default()
                .push(LinkRecord::from(link));
        }

        let causal = model.causal();
        Self {
            created: model.created(),
            modified: Utc::now(),
            use_scenarios: causal.use_scenarios(),
            root: model.structure().root().map(ComponentRecord::from),
            connections: model
                .structure()
                .connections()
                .iter()
                .map(ConnectionRecord::from)
                .collect(),
            links,
            causal_factors: causal
                .overlays()
                .map(|overlay| {
                    let factors = overlay.factors().iter().map(FactorRecord::from).collect();
                    (overlay.id(), factors)
                })
                .collect(),
            safety_constraints: causal
                .safety_constraints()
                .iter()
                .map(ConstraintRecord::from)
                .collect(),
        }
    }

    /// Rebuilds a model from the snapshot.
    ///
    /// Causal factors stored for a component that is missing from the tree,
    /// or cannot carry causal factors, are dropped.
    #[must_use]
    pub fn into_model(self, config: Config) -> Model {
        let Self {
            created,
            modified: _,
            use_scenarios,
            root,
            connections,
            links,
            causal_factors,
            safety_constraints,
        } = self;

        let structure = ControlStructure::from_parts(
            root.map(Component::from),
            connections.into_iter().map(Connection::from).collect(),
            config.trash_capacity(),
        );

        let mut overlays = Vec::with_capacity(causal_factors.len());
        for (id, factors) in causal_factors {
            match structure.get_component(id) {
                Some(component) if causal::accepts(component.component_type()) => {
                    overlays.push(CausalComponent {
                        id,
                        text: component.text().to_string(),
                        component_type: component.component_type(),
                        factors: factors.into_iter().map(CausalFactor::from).collect(),
                    });
                }
                _ => tracing::warn!("dropping causal factors of unknown component {id}"),
            }
        }
        let causal = CausalFactors::from_parts(
            overlays,
            safety_constraints
                .into_iter()
                .map(SafetyConstraint::from)
                .collect(),
            use_scenarios,
        );

        let links = LinkRegistry::from_links(links.into_iter().flat_map(|(link_type, records)| {
            records.into_iter().map(move |record| record.into_link(link_type))
        }));

        Model::from_parts(structure, causal, links, config, created)
    }

    /// When the project was first created.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// When the snapshot was taken.
    #[must_use]
    pub const fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    /// Reads a project file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid project.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the project as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ComponentRecord {
    id: Uuid,
    #[serde(rename = "type")]
    component_type: ComponentType,
    text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    control_action: Option<Uuid>,
    layout: Rectangle,
    layout_pm: Rectangle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relative: Option<Uuid>,
    #[serde(default)]
    safety_critical: bool,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    unsafe_variables: BTreeSet<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<ComponentRecord>,
}

impl From<&Component> for ComponentRecord {
    fn from(component: &Component) -> Self {
        Self {
            id: component.id,
            component_type: component.component_type,
            text: component.text.clone(),
            comment: component.comment.clone(),
            control_action: component.control_action,
            layout: component.layout_primary,
            layout_pm: component.layout_secondary,
            relative: component.relative,
            safety_critical: component.safety_critical,
            unsafe_variables: component.unsafe_variables.clone(),
            children: component.children.iter().map(Self::from).collect(),
        }
    }
}

impl From<ComponentRecord> for Component {
    fn from(record: ComponentRecord) -> Self {
        let mut component = Self::new(
            record.id,
            record.component_type,
            record.text,
            record.layout,
            record.control_action,
        );
        component.comment = record.comment;
        component.layout_secondary = record.layout_pm;
        component.relative = record.relative;
        component.safety_critical = record.safety_critical;
        component.unsafe_variables = record.unsafe_variables;
        component.children = record.children.into_iter().map(Self::from).collect();
        component.sort_children();
        component
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ConnectionRecord {
    id: Uuid,
    source: Anchor,
    target: Anchor,
    #[serde(rename = "type")]
    connection_type: ConnectionType,
}

impl From<&Connection> for ConnectionRecord {
    fn from(connection: &Connection) -> Self {
        Self {
            id: connection.id,
            source: connection.source,
            target: connection.target,
            connection_type: connection.connection_type,
        }
    }
}

impl From<ConnectionRecord> for Connection {
    fn from(record: ConnectionRecord) -> Self {
        Self::new(record.id, record.source, record.target, record.connection_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LinkRecord {
    id: Uuid,
    a: Option<Uuid>,
    b: Option<Uuid>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    note: String,
}

impl From<&Link> for LinkRecord {
    fn from(link: &Link) -> Self {
        Self {
            id: link.id(),
            a: link.a(),
            b: link.b(),
            note: link.note().to_string(),
        }
    }
}

impl LinkRecord {
    fn into_link(self, link_type: LinkType) -> Link {
        Link::new(self.id, link_type, self.a, self.b).with_note(self.note)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FactorRecord {
    id: Uuid,
    text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    entries: Vec<EntryRecord>,
}

impl From<&CausalFactor> for FactorRecord {
    fn from(factor: &CausalFactor) -> Self {
        Self {
            id: factor.id,
            text: factor.text.clone(),
            entries: factor.entries.iter().map(EntryRecord::from).collect(),
        }
    }
}

impl From<FactorRecord> for CausalFactor {
    fn from(record: FactorRecord) -> Self {
        let mut factor = Self::new(record.id);
        factor.text = record.text;
        factor.entries = record.entries.into_iter().map(CausalEntry::from).collect();
        factor
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EntryRecord {
    id: Uuid,
    target: EntryTarget,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hazards: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constraint: Option<Uuid>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    note: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    scenarios: Vec<Uuid>,
}

impl From<&CausalEntry> for EntryRecord {
    fn from(entry: &CausalEntry) -> Self {
        Self {
            id: entry.id,
            target: entry.target,
            hazards: entry.hazards.clone(),
            constraint: entry.constraint,
            note: entry.note.clone(),
            scenarios: entry.scenarios.clone(),
        }
    }
}

impl From<EntryRecord> for CausalEntry {
    fn from(record: EntryRecord) -> Self {
        let mut entry = Self::new(record.id, record.target);
        entry.hazards = record.hazards;
        entry.constraint = record.constraint;
        entry.note = record.note;
        entry.scenarios = record.scenarios;
        entry
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ConstraintRecord {
    id: Uuid,
    number: usize,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<Uuid>,
}

impl From<&SafetyConstraint> for ConstraintRecord {
    fn from(constraint: &SafetyConstraint) -> Self {
        Self {
            id: constraint.id,
            number: constraint.number,
            title: constraint.title.clone(),
            owner: constraint.owner,
        }
    }
}

impl From<ConstraintRecord> for SafetyConstraint {
    fn from(record: ConstraintRecord) -> Self {
        Self {
            id: record.id,
            number: record.number,
            title: record.title,
            owner: record.owner,
        }
    }
}

/// The serialized versions of a project file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum ProjectVersion {
    #[serde(rename = "1")]
    V1 {
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
        #[serde(default)]
        use_scenarios: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        root: Option<ComponentRecord>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        connections: Vec<ConnectionRecord>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        links: BTreeMap<LinkType, Vec<LinkRecord>>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        causal_factors: BTreeMap<Uuid, Vec<FactorRecord>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        safety_constraints: Vec<ConstraintRecord>,
    },
}

impl From<ProjectVersion> for ProjectFile {
    fn from(version: ProjectVersion) -> Self {
        match version {
            ProjectVersion::V1 {
                created,
                modified,
                use_scenarios,
                root,
                connections,
                links,
                causal_factors,
                safety_constraints,
            } => Self {
                created,
                modified,
                use_scenarios,
                root,
                connections,
                links,
                causal_factors,
                safety_constraints,
            },
        }
    }
}

impl From<ProjectFile> for ProjectVersion {
    fn from(project: ProjectFile) -> Self {
        let ProjectFile {
            created,
            modified,
            use_scenarios,
            root,
            connections,
            links,
            causal_factors,
            safety_constraints,
        } = project;
        Self::V1 {
            created,
            modified,
            use_scenarios,
            root,
            connections,
            links,
            causal_factors,
            safety_constraints,
        }
    }
}
