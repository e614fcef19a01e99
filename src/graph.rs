//! Logical graph: the component/port/connection intermediate representation.
//!
//! The graph sits between the source syntax and physical placement. Each
//! component is a typed node with string-keyed properties and lazily created
//! ports; each connection is a directed edge from an output port to an input
//! port carrying a signal strength and inclusive delay bounds.
//!
//! Signal loops are legal. Anything that walks the graph uses
//! [`LogicalGraph::topological_order`], which reports loop members instead
//! of recursing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::diagnostics::GraphError;
use crate::materials;
use crate::types::{ComponentId, ConnectionId, GroupId, PortId, Ticks};

/// Maximum redstone signal strength.
pub const MAX_SIGNAL_STRENGTH: u8 = 15;

/// The closed set of component kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Piston,
    StickyPiston,
    Repeater,
    Comparator,
    Lever,
    Lamp,
    Observer,
    Dropper,
    Hopper,
    Target,
    SlimeBlock,
    HoneyBlock,
    RedstoneTorch,
    PressurePlate,
    Button,
}

impl ComponentKind {
    /// Material placed for this kind.
    pub fn material(self) -> &'static str {
        match self {
            ComponentKind::Piston => materials::PISTON,
            ComponentKind::StickyPiston => materials::STICKY_PISTON,
            ComponentKind::Repeater => materials::REPEATER,
            ComponentKind::Comparator => "minecraft:comparator",
            ComponentKind::Lever => "minecraft:lever",
            ComponentKind::Lamp => "minecraft:redstone_lamp",
            ComponentKind::Observer => "minecraft:observer",
            ComponentKind::Dropper => "minecraft:dropper",
            ComponentKind::Hopper => "minecraft:hopper",
            ComponentKind::Target => "minecraft:target",
            ComponentKind::SlimeBlock => materials::SLIME_BLOCK,
            ComponentKind::HoneyBlock => materials::HONEY_BLOCK,
            ComponentKind::RedstoneTorch => "minecraft:redstone_torch",
            ComponentKind::PressurePlate => "minecraft:stone_pressure_plate",
            ComponentKind::Button => "minecraft:stone_button",
        }
    }
}

impl FromStr for ComponentKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "Piston" | "Door" => ComponentKind::Piston,
            "StickyPiston" => ComponentKind::StickyPiston,
            "Repeater" => ComponentKind::Repeater,
            "Comparator" => ComponentKind::Comparator,
            "Lever" => ComponentKind::Lever,
            "Lamp" => ComponentKind::Lamp,
            "Observer" => ComponentKind::Observer,
            "Dropper" => ComponentKind::Dropper,
            "Hopper" => ComponentKind::Hopper,
            "Target" => ComponentKind::Target,
            "SlimeBlock" => ComponentKind::SlimeBlock,
            "HoneyBlock" => ComponentKind::HoneyBlock,
            "RedstoneTorch" => ComponentKind::RedstoneTorch,
            "PressurePlate" => ComponentKind::PressurePlate,
            "Button" => ComponentKind::Button,
            other => return Err(GraphError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What travels through a port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    #[default]
    Redstone,
    /// Block movement, e.g. a piston head driving a slime contraption.
    Mechanical,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Redstone => f.write_str("redstone"),
            SignalKind::Mechanical => f.write_str("mechanical"),
        }
    }
}

/// Which side of a component a port is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// A named signal endpoint owned by exactly one component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub component: ComponentId,
    /// Unique within the component and direction
    pub name: String,
    pub direction: PortDirection,
    pub signal: SignalKind,
    /// Nominal strength, 0..=15
    pub strength: u8,
}

/// A typed node of the logical graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub kind: ComponentKind,
    properties: BTreeMap<String, String>,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
}

impl Component {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Finds a port by direction and name.
    pub fn port(&self, direction: PortDirection, name: &str) -> Option<&Port> {
        self.ports(direction).iter().find(|p| p.name == name)
    }

    fn ports(&self, direction: PortDirection) -> &Vec<Port> {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    fn ports_mut(&mut self, direction: PortDirection) -> &mut Vec<Port> {
        match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        }
    }
}

/// Static description of a component to be added to the graph.
#[derive(Clone, Debug)]
pub struct ComponentSpec {
    pub kind: ComponentKind,
    pub properties: BTreeMap<String, String>,
}

impl ComponentSpec {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Adds a property (e.g. `facing`, `delay`, `mode`).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl From<ComponentKind> for ComponentSpec {
    fn from(kind: ComponentKind) -> Self {
        Self::new(kind)
    }
}

/// Inclusive bounds on propagation delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelayBounds {
    min: Ticks,
    max: Ticks,
}

impl DelayBounds {
    /// Creates bounds, rejecting `min > max`.
    pub fn new(min: Ticks, max: Ticks) -> Result<Self, GraphError> {
        if min > max {
            return Err(GraphError::InvalidDelayBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// A fixed delay.
    pub fn exact(ticks: Ticks) -> Self {
        Self {
            min: ticks,
            max: ticks,
        }
    }

    /// Any delay is acceptable.
    pub fn unbounded() -> Self {
        Self {
            min: 0,
            max: Ticks::MAX,
        }
    }

    pub fn min(&self) -> Ticks {
        self.min
    }

    pub fn max(&self) -> Ticks {
        self.max
    }

    pub fn contains(&self, ticks: Ticks) -> bool {
        (self.min..=self.max).contains(&ticks)
    }

    pub fn clamp(&self, ticks: Ticks) -> Ticks {
        ticks.clamp(self.min, self.max)
    }
}

impl Default for DelayBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// A directed edge from an output port to an input port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: PortId,
    pub target: PortId,
    pub source_component: ComponentId,
    pub target_component: ComponentId,
    pub signal: SignalKind,
    pub signal_strength: u8,
    pub delay: DelayBounds,
    /// Parallel construct this connection fires with, if any
    pub group: Option<GroupId>,
}

impl Connection {
    pub fn min_delay(&self) -> Ticks {
        self.delay.min()
    }

    pub fn max_delay(&self) -> Ticks {
        self.delay.max()
    }
}

/// Description of a connection to be added, naming ports by string.
#[derive(Clone, Debug)]
pub struct Link {
    pub source: ComponentId,
    pub source_port: String,
    pub target: ComponentId,
    pub target_port: String,
    pub signal: SignalKind,
    pub signal_strength: u8,
    pub delay: DelayBounds,
    pub group: Option<GroupId>,
}

impl Link {
    pub fn new(
        source: ComponentId,
        source_port: impl Into<String>,
        target: ComponentId,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_port: source_port.into(),
            target,
            target_port: target_port.into(),
            signal: SignalKind::Redstone,
            signal_strength: MAX_SIGNAL_STRENGTH,
            delay: DelayBounds::unbounded(),
            group: None,
        }
    }

    pub fn signal(mut self, signal: SignalKind) -> Self {
        self.signal = signal;
        self
    }

    pub fn strength(mut self, strength: u8) -> Self {
        self.signal_strength = strength;
        self
    }

    pub fn delay(mut self, bounds: DelayBounds) -> Self {
        self.delay = bounds;
        self
    }

    pub fn in_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }
}

/// Components that could not be ordered because they sit on, or downstream
/// of, a signal loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedbackLoops {
    /// Components that could be ordered
    pub ordered: Vec<ComponentId>,
    /// Components left with unresolved inputs
    pub unresolved: Vec<ComponentId>,
}

/// The logical graph. Owns all components and connections.
#[derive(Clone, Debug, Default)]
pub struct LogicalGraph {
    components: IndexMap<ComponentId, Component>,
    connections: IndexMap<ConnectionId, Connection>,
    port_owner: HashMap<PortId, ComponentId>,
    by_component: HashMap<ComponentId, Vec<ConnectionId>>,
    groups: Vec<GroupId>,
    next_component: u64,
    next_connection: u64,
    next_port: u64,
}

impl LogicalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component and returns its generated identifier.
    pub fn add_component(&mut self, spec: impl Into<ComponentSpec>) -> ComponentId {
        let spec = spec.into();
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        self.components.insert(
            id,
            Component {
                id,
                kind: spec.kind,
                properties: spec.properties,
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
        );
        id
    }

    /// Returns the port with the given name, creating it on first reference.
    ///
    /// New ports carry full-strength redstone.
    pub fn port(
        &mut self,
        component: ComponentId,
        direction: PortDirection,
        name: &str,
    ) -> Result<PortId, GraphError> {
        self.port_with(component, direction, name, SignalKind::Redstone, MAX_SIGNAL_STRENGTH)
    }

    fn port_with(
        &mut self,
        component: ComponentId,
        direction: PortDirection,
        name: &str,
        signal: SignalKind,
        strength: u8,
    ) -> Result<PortId, GraphError> {
        let next_port = &mut self.next_port;
        let comp = self
            .components
            .get_mut(&component)
            .ok_or(GraphError::UnknownComponent(component))?;
        if let Some(existing) = comp.port(direction, name) {
            return Ok(existing.id);
        }
        let id = PortId(*next_port);
        *next_port += 1;
        comp.ports_mut(direction).push(Port {
            id,
            component,
            name: name.to_string(),
            direction,
            signal,
            strength,
        });
        self.port_owner.insert(id, component);
        Ok(id)
    }

    /// Adds a connection, creating the named ports as needed.
    pub fn connect(&mut self, link: Link) -> Result<ConnectionId, GraphError> {
        if link.signal_strength > MAX_SIGNAL_STRENGTH {
            return Err(GraphError::InvalidSignalStrength(link.signal_strength));
        }
        if let Some(group) = link.group {
            if !self.groups.contains(&group) {
                return Err(GraphError::UnknownGroup(group));
            }
        }
        let endpoints = [
            (link.source, PortDirection::Output, &link.source_port),
            (link.target, PortDirection::Input, &link.target_port),
        ];
        for (component, direction, name) in endpoints {
            let comp = self
                .components
                .get(&component)
                .ok_or(GraphError::UnknownComponent(component))?;
            if let Some(existing) = comp.port(direction, name) {
                if existing.signal != link.signal {
                    return Err(GraphError::SignalMismatch {
                        component,
                        port: name.clone(),
                        expected: existing.signal,
                        found: link.signal,
                    });
                }
            }
        }
        let source = self.port_with(
            link.source,
            PortDirection::Output,
            &link.source_port,
            link.signal,
            link.signal_strength,
        )?;
        let target = self.port_with(
            link.target,
            PortDirection::Input,
            &link.target_port,
            link.signal,
            link.signal_strength,
        )?;

        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(
            id,
            Connection {
                id,
                source,
                target,
                source_component: link.source,
                target_component: link.target,
                signal: link.signal,
                signal_strength: link.signal_strength,
                delay: link.delay,
                group: link.group,
            },
        );
        self.by_component.entry(link.source).or_default().push(id);
        if link.target != link.source {
            self.by_component.entry(link.target).or_default().push(id);
        }
        Ok(id)
    }

    /// Opens a new parallel group; connections tagged with it fire in the same tick.
    pub fn new_parallel_group(&mut self) -> GroupId {
        let id = GroupId(self.groups.len() as u32);
        self.groups.push(id);
        id
    }

    /// Records a derived property (such as a realized `delay`) on a component.
    pub fn set_derived_property(
        &mut self,
        component: ComponentId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), GraphError> {
        let comp = self
            .components
            .get_mut(&component)
            .ok_or(GraphError::UnknownComponent(component))?;
        comp.properties.insert(key.into(), value.into());
        Ok(())
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Components in insertion order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Connections in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Owning component of a port.
    pub fn port_owner(&self, port: PortId) -> Option<ComponentId> {
        self.port_owner.get(&port).copied()
    }

    /// All connections touching a component, in insertion order.
    pub fn connections_for(&self, component: ComponentId) -> impl Iterator<Item = &Connection> {
        self.by_component
            .get(&component)
            .into_iter()
            .flatten()
            .filter_map(|id| self.connections.get(id))
    }

    /// Connections terminating at one of the component's inputs.
    pub fn connections_into(&self, component: ComponentId) -> impl Iterator<Item = &Connection> {
        self.connections_for(component)
            .filter(move |c| c.target_component == component)
    }

    /// Parallel groups in creation order with their member connections.
    pub fn parallel_groups(&self) -> Vec<(GroupId, Vec<ConnectionId>)> {
        self.groups
            .iter()
            .map(|&group| {
                let members = self
                    .connections
                    .values()
                    .filter(|c| c.group == Some(group))
                    .map(|c| c.id)
                    .collect();
                (group, members)
            })
            .collect()
    }

    /// Orders components so every connection's source precedes its target.
    ///
    /// Uses Kahn's algorithm seeded in insertion order. Self-loops and
    /// longer signal loops leave their members (and everything fed only
    /// through them) unresolved; those are returned as the error.
    pub fn topological_order(&self) -> Result<Vec<ComponentId>, FeedbackLoops> {
        let mut in_degree: IndexMap<ComponentId, usize> =
            self.components.keys().map(|&id| (id, 0)).collect();
        let mut adj: HashMap<ComponentId, Vec<ComponentId>> = HashMap::new();

        for conn in self.connections.values() {
            adj.entry(conn.source_component)
                .or_default()
                .push(conn.target_component);
            if let Some(deg) = in_degree.get_mut(&conn.target_component) {
                *deg += 1;
            }
        }

        let mut queue: VecDeque<ComponentId> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut order = Vec::with_capacity(self.components.len());
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for next in adj.get(&node).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(next) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(*next);
                    }
                }
            }
        }

        if order.len() == self.components.len() {
            Ok(order)
        } else {
            let unresolved = in_degree
                .into_iter()
                .filter(|(_, deg)| *deg > 0)
                .map(|(id, _)| id)
                .collect();
            Err(FeedbackLoops {
                ordered: order,
                unresolved,
            })
        }
    }
}
