//! Node roles and capacity inventory

use crate::k8s::kubectl;
use crate::k8s::models::{ItemList, Node, quantity};
use crate::k8s::quantity::{cpu_millis, memory_bytes};
use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::Path;

/// Node classification derived from labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Master,
    Worker,
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => write!(f, "Master"),
            Role::Worker => write!(f, "Worker"),
            Role::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A node is a master when it carries any of the control-plane label keys
pub fn classify(node: &Node, control_plane_labels: &[String]) -> Role {
    let is_control_plane = node
        .metadata
        .labels
        .as_ref()
        .is_some_and(|labels| control_plane_labels.iter().any(|key| labels.contains_key(key)));

    if is_control_plane {
        Role::Master
    } else {
        Role::Worker
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub role: Role,
    pub cpu_millis: u64,
    pub memory_bytes: u64,
}

impl NodeInfo {
    pub fn from_node(node: &Node, control_plane_labels: &[String]) -> Result<Self> {
        let name = node
            .metadata
            .name
            .clone()
            .ok_or_else(|| anyhow!("Node without metadata.name in kubectl output"))?;

        let capacity = node.status.as_ref().and_then(|s| s.capacity.as_ref());
        let cpu = quantity(capacity, "cpu")
            .ok_or_else(|| anyhow!("Node {} has no status.capacity.cpu", name))?;
        let memory = quantity(capacity, "memory")
            .ok_or_else(|| anyhow!("Node {} has no status.capacity.memory", name))?;

        Ok(Self {
            role: classify(node, control_plane_labels),
            cpu_millis: cpu_millis(cpu).with_context(|| format!("Node {} cpu capacity", name))?,
            memory_bytes: memory_bytes(memory)
                .with_context(|| format!("Node {} memory capacity", name))?,
            name,
        })
    }
}

/// All nodes of the cluster in listing order
#[derive(Debug, Clone, Default)]
pub struct NodeInventory {
    nodes: Vec<NodeInfo>,
}

impl NodeInventory {
    /// Query `kubectl get nodes`, optionally narrowed by a label selector
    pub fn fetch(
        selector: Option<&str>,
        control_plane_labels: &[String],
        kubeconfig: Option<&Path>,
    ) -> Result<Self> {
        let mut args = vec!["get", "nodes"];
        if let Some(selector) = selector {
            args.push("-l");
            args.push(selector);
        }

        let list: ItemList<Node> = kubectl::get_json(&args, kubeconfig).context("Failed to get nodes")?;
        Self::from_nodes(&list.items, control_plane_labels)
    }

    pub fn from_nodes(nodes: &[Node], control_plane_labels: &[String]) -> Result<Self> {
        let nodes = nodes
            .iter()
            .map(|node| NodeInfo::from_node(node, control_plane_labels))
            .collect::<Result<Vec<_>>>()?;
        crate::log_debug!("Loaded {} nodes", nodes.len());
        Ok(Self { nodes })
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeInfo> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&NodeInfo> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Role of a node by name; nodes missing from the listing are `Unknown`
    pub fn role_of(&self, name: &str) -> Role {
        self.get(name).map_or(Role::Unknown, |n| n.role)
    }

    pub fn count(&self, role: Role) -> usize {
        self.nodes.iter().filter(|n| n.role == role).count()
    }
}
