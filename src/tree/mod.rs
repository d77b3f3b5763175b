//! Hierarchical sensor aggregation tree
//!
//! Nodes live in an arena (`Vec<Node>`) and reference each other by index,
//! so a leaf can be linked into several groups (its type group, manufacturer
//! group, and the root) without shared-ownership plumbing. The whole arena
//! sits behind one mutex; operations are short and never perform I/O while
//! holding it.
//!
//! The tree always has a root group "All Sensors" with the two predefined
//! type groups "Temperature Sensors" and "Humidity Sensors" beneath it.
//! Leaves are created on first sight of a serial and linked into the root
//! and, when the record carries a known type, into the matching type group.

pub mod visitor;

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::{SensorRecord, SensorType};

use visitor::Visitor;

pub type NodeId = usize;

pub const ROOT_KEY: &str = "root";

/// Default serial-prefix → manufacturer table.
///
/// Clearly a placeholder mapping; the tree accepts a custom table at
/// construction so deployments can swap it without touching this module.
pub fn default_manufacturer_table() -> Vec<(char, String)> {
    [
        ('1', "Qualcomm"),
        ('2', "Texas Instruments"),
        ('3', "NXP"),
        ('9', "Infineon"),
    ]
    .into_iter()
    .map(|(prefix, name)| (prefix, name.to_string()))
    .collect()
}

/// Aggregated statistics for a node
///
/// For a leaf: data point count plus arithmetic means over records where the
/// field is present (battery as `level/max · 100`). For a group: the count
/// covers each distinct descendant leaf once; the means average the direct
/// children whose own mean is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregatedStats {
    pub data_point_count: usize,
    pub temperature: f64,
    pub humidity: f64,
    pub battery_level: f64,
}

/// A sensor with its append-only record history
#[derive(Debug)]
pub struct LeafNode {
    pub serial: String,
    pub name: String,
    pub kind: SensorType,
    pub history: Vec<SensorRecord>,
}

impl LeafNode {
    fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            name: format!("Sensor {serial}"),
            kind: SensorType::Unknown,
            history: Vec::new(),
        }
    }

    /// Append a record; a record for a different serial is rejected.
    fn add(&mut self, record: &SensorRecord) -> bool {
        if record.serial != self.serial {
            return false;
        }

        if record.kind.is_known() {
            self.kind = record.kind;
        }

        self.history.push(record.clone());
        true
    }

    pub fn stats(&self) -> AggregatedStats {
        AggregatedStats {
            data_point_count: self.history.len(),
            temperature: mean(self.history.iter().filter_map(|r| {
                r.has_temperature().then_some(r.temperature)
            })),
            humidity: mean(
                self.history
                    .iter()
                    .filter_map(|r| r.has_humidity().then_some(r.humidity)),
            ),
            battery_level: mean(self.history.iter().filter_map(|r| r.battery_percent())),
        }
    }
}

/// A named collection of child nodes
#[derive(Debug)]
pub struct GroupNode {
    pub name: String,
    pub kind: String,
    pub children: Vec<NodeId>,
}

#[derive(Debug)]
pub enum Node {
    Leaf(LeafNode),
    Group(GroupNode),
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn type_group_name(kind: SensorType) -> Option<&'static str> {
    match kind {
        SensorType::Temp => Some("Temperature Sensors"),
        SensorType::Humidity => Some("Humidity Sensors"),
        _ => None,
    }
}

#[derive(Debug)]
struct TreeInner {
    nodes: Vec<Node>,
    root: NodeId,
    groups: HashMap<String, NodeId>,
    leaves: HashMap<String, NodeId>,
}

impl TreeInner {
    fn new() -> Self {
        let mut inner = Self {
            nodes: Vec::new(),
            root: 0,
            groups: HashMap::new(),
            leaves: HashMap::new(),
        };

        inner.root = inner.new_group("All Sensors", "Root");
        let temperature = inner.new_group("Temperature Sensors", SensorType::Temp.as_str());
        let humidity = inner.new_group("Humidity Sensors", SensorType::Humidity.as_str());

        let root = inner.root;
        inner.link(root, temperature);
        inner.link(root, humidity);

        inner
    }

    fn new_group(&mut self, name: &str, kind: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::Group(GroupNode {
            name: name.to_string(),
            kind: kind.to_string(),
            children: Vec::new(),
        }));
        self.groups.insert(name.to_string(), id);
        id
    }

    fn new_leaf(&mut self, serial: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf(LeafNode::new(serial)));
        self.leaves.insert(serial.to_string(), id);
        id
    }

    /// Link `child` under `group`; duplicate insertions (same node identity)
    /// are rejected.
    fn link(&mut self, group: NodeId, child: NodeId) -> bool {
        let Node::Group(g) = &mut self.nodes[group] else {
            return false;
        };

        if g.children.contains(&child) {
            return false;
        }

        g.children.push(child);
        true
    }

    /// Distinct descendant leaves of `id`, in first-encountered order.
    fn collect_leaves(&self, id: NodeId, seen: &mut HashSet<NodeId>, out: &mut Vec<NodeId>) {
        match &self.nodes[id] {
            Node::Leaf(_) => {
                if seen.insert(id) {
                    out.push(id);
                }
            }
            Node::Group(g) => {
                for &child in &g.children {
                    self.collect_leaves(child, seen, out);
                }
            }
        }
    }

    fn stats(&self, id: NodeId) -> AggregatedStats {
        match &self.nodes[id] {
            Node::Leaf(leaf) => leaf.stats(),
            Node::Group(group) => {
                let mut seen = HashSet::new();
                let mut leaves = Vec::new();
                self.collect_leaves(id, &mut seen, &mut leaves);

                let data_point_count = leaves
                    .iter()
                    .map(|&leaf| match &self.nodes[leaf] {
                        Node::Leaf(l) => l.history.len(),
                        Node::Group(_) => 0,
                    })
                    .sum();

                let child_stats: Vec<AggregatedStats> =
                    group.children.iter().map(|&c| self.stats(c)).collect();

                AggregatedStats {
                    data_point_count,
                    temperature: mean(
                        child_stats
                            .iter()
                            .filter_map(|s| (s.temperature > 0.0).then_some(s.temperature)),
                    ),
                    humidity: mean(
                        child_stats
                            .iter()
                            .filter_map(|s| (s.humidity > 0.0).then_some(s.humidity)),
                    ),
                    battery_level: mean(
                        child_stats
                            .iter()
                            .filter_map(|s| (s.battery_level > 0.0).then_some(s.battery_level)),
                    ),
                }
            }
        }
    }

    fn display_into(&self, id: NodeId, depth: usize, out: &mut dyn Write) -> io::Result<()> {
        let indent = "  ".repeat(depth);
        let stats = self.stats(id);

        match &self.nodes[id] {
            Node::Group(group) => {
                let mut seen = HashSet::new();
                let mut leaves = Vec::new();
                self.collect_leaves(id, &mut seen, &mut leaves);

                writeln!(
                    out,
                    "{indent}+ {} ({}) sensors={} points={}",
                    group.name,
                    group.kind,
                    leaves.len(),
                    stats.data_point_count
                )?;

                for &child in &group.children {
                    self.display_into(child, depth + 1, out)?;
                }
            }
            Node::Leaf(leaf) => {
                writeln!(
                    out,
                    "{indent}- {} ({}) readings={} temp={:.2} hum={:.2} bat={:.1}%",
                    leaf.name,
                    leaf.kind,
                    stats.data_point_count,
                    stats.temperature,
                    stats.humidity,
                    stats.battery_level
                )?;
            }
        }

        Ok(())
    }

    fn visit(&self, id: NodeId, visitor: &mut dyn Visitor) {
        match &self.nodes[id] {
            Node::Group(group) => {
                visitor.visit_group(group, &self.stats(id));
                for &child in &group.children {
                    self.visit(child, visitor);
                }
            }
            Node::Leaf(leaf) => visitor.visit_leaf(leaf, &leaf.stats()),
        }
    }
}

/// Thread-safe manager over the composite tree
pub struct SensorTree {
    inner: Mutex<TreeInner>,
    manufacturers: Vec<(char, String)>,
}

impl SensorTree {
    pub fn new() -> Self {
        Self::with_manufacturer_table(default_manufacturer_table())
    }

    pub fn with_manufacturer_table(manufacturers: Vec<(char, String)>) -> Self {
        Self {
            inner: Mutex::new(TreeInner::new()),
            manufacturers,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TreeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a record: get-or-create the leaf for its serial, link it under
    /// the root (and its type group when the type is known), append the
    /// record to the leaf history. Records without a serial are ignored.
    pub fn add_record(&self, record: &SensorRecord) -> bool {
        if record.serial.is_empty() {
            return false;
        }

        let mut inner = self.lock();

        let leaf = match inner.leaves.get(&record.serial) {
            Some(&id) => id,
            None => {
                let id = inner.new_leaf(&record.serial);
                let root = inner.root;
                inner.link(root, id);
                debug!(serial = %record.serial, "new sensor leaf created");
                id
            }
        };

        if let Some(group_name) = type_group_name(record.kind) {
            if let Some(&group) = inner.groups.get(group_name) {
                inner.link(group, leaf);
            }
        }

        match &mut inner.nodes[leaf] {
            Node::Leaf(l) => l.add(record),
            Node::Group(_) => false,
        }
    }

    /// Number of distinct sensors reachable from the root.
    pub fn sensor_count(&self) -> usize {
        let inner = self.lock();
        let mut seen = HashSet::new();
        let mut leaves = Vec::new();
        inner.collect_leaves(inner.root, &mut seen, &mut leaves);
        leaves.len()
    }

    /// Aggregated statistics for a group; the key `"root"` addresses the
    /// whole tree, anything else is a group name.
    pub fn group_stats(&self, key: &str) -> Option<AggregatedStats> {
        let inner = self.lock();

        let id = if key == ROOT_KEY {
            inner.root
        } else {
            *inner.groups.get(key)?
        };

        Some(inner.stats(id))
    }

    /// Partition existing leaves into per-manufacturer groups derived from
    /// the serial's first character. Leaves stay members of their existing
    /// groups; manufacturer groups are created on demand and reused.
    /// Returns the number of leaves organized.
    pub fn organize_by_manufacturer(&self) -> usize {
        let mut inner = self.lock();

        let leaf_ids: Vec<NodeId> = (0..inner.nodes.len())
            .filter(|&id| matches!(inner.nodes[id], Node::Leaf(_)))
            .collect();

        let mut organized = 0;
        for leaf in leaf_ids {
            let prefix = match &inner.nodes[leaf] {
                Node::Leaf(l) => l.serial.chars().next(),
                Node::Group(_) => None,
            };

            let manufacturer = prefix
                .and_then(|p| {
                    self.manufacturers
                        .iter()
                        .find(|(prefix_char, _)| *prefix_char == p)
                        .map(|(_, name)| name.as_str())
                })
                .unwrap_or("Unknown");

            let group_name = format!("Manufacturer: {manufacturer}");
            let group = match inner.groups.get(&group_name) {
                Some(&id) => id,
                None => {
                    let id = inner.new_group(&group_name, "Manufacturer");
                    let root = inner.root;
                    inner.link(root, id);
                    id
                }
            };

            inner.link(group, leaf);
            organized += 1;
        }

        organized
    }

    /// Write the tree, indented by depth, in insertion order.
    pub fn display(&self, out: &mut dyn Write) -> io::Result<()> {
        let inner = self.lock();
        inner.display_into(inner.root, 0, out)
    }

    /// `display` into a string, for logs and reports.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // writing to a Vec<u8> cannot fail
        let _ = self.display(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Reset the visitor, walk the tree from the root, return its report.
    pub fn apply_visitor(&self, visitor: &mut dyn Visitor) -> String {
        visitor.reset();

        let inner = self.lock();
        inner.visit(inner.root, visitor);

        visitor.result()
    }
}

impl Default for SensorTree {
    fn default() -> Self {
        Self::new()
    }
}
