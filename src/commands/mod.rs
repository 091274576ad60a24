//! Report tasks and the dispatch table that selects them

pub mod info;
pub mod nfs;
pub mod nodes;
pub mod pvcs;
pub mod resourcequotas;
pub mod top;

use crate::config::{Params, Settings};
use crate::k8s::nodes::{NodeInfo, NodeInventory};
use crate::k8s::quantity::{gibibytes, mebibytes, percent};
use crate::output::Report;
use crate::utils::prereqs::CommandPrereq;
use crate::utils::{CommonPrereqs, Prerequisite};
use anyhow::Result;
use clap::ValueEnum;
use std::fmt;
use std::path::Path;

/// Tasks selectable with `--task`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Task {
    /// Node roles and capacity
    #[value(name = "get-nodes")]
    GetNodes,

    /// Container requests summed per node
    #[value(name = "get-resourcequotas")]
    GetResourceQuotas,

    /// Live node usage from the metrics API
    #[value(name = "get-top")]
    GetTop,

    /// Persistent volume claims and their volumes
    #[value(name = "get-pvcs")]
    GetPvcs,

    /// Mount NFS exports backing volumes and measure them
    #[value(name = "check-nfs")]
    CheckNfs,

    /// Context, versions and node counts
    #[value(name = "get-k8s-info")]
    GetK8sInfo,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        f.write_str(&name)
    }
}

impl Task {
    /// External tools the task shells out to
    pub fn prerequisites(self) -> Vec<CommandPrereq> {
        let mut tools = vec![CommonPrereqs::kubectl()];
        if self == Task::CheckNfs {
            tools.push(CommonPrereqs::mount());
            tools.push(CommonPrereqs::umount());
            tools.push(CommonPrereqs::df());
        }
        tools
    }
}

/// Everything a task needs besides the cluster itself
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    pub settings: &'a Settings,
    pub params: &'a Params,
    pub kubeconfig: Option<&'a Path>,
    pub nfs_level: usize,
}

impl TaskContext<'_> {
    /// Node inventory honoring the `selector` parameter and configured role labels
    pub fn node_inventory(&self) -> Result<NodeInventory> {
        let inventory = NodeInventory::fetch(
            self.params.selector.as_deref(),
            &self.settings.roles.control_plane_labels,
            self.kubeconfig,
        )?;
        if inventory.is_empty() {
            match self.params.selector.as_deref() {
                Some(selector) => crate::log_warn!("No nodes match selector {}", selector),
                None => crate::log_warn!("The cluster reports no nodes"),
            }
        }
        Ok(inventory)
    }
}

/// Check prerequisites and run a task
pub fn run(task: Task, ctx: &TaskContext<'_>) -> Result<Report> {
    let tools = task.prerequisites();
    let tools: Vec<&dyn Prerequisite> = tools.iter().map(|t| t as &dyn Prerequisite).collect();
    CommonPrereqs::require(&tools)?;

    crate::log_info!("Running task {}", task);

    let report = match task {
        Task::GetNodes => nodes::run(ctx),
        Task::GetResourceQuotas => resourcequotas::run(ctx),
        Task::GetTop => top::run(ctx),
        Task::GetPvcs => pvcs::run(ctx),
        Task::CheckNfs => nfs::run(ctx),
        Task::GetK8sInfo => info::run(ctx),
    }?;

    crate::log_info!("Task {} produced {} rows", task, report.rows().len());
    Ok(report)
}

/// Running CPU / memory sums and the capacity they are measured against.
///
/// RAM totals shown in a report add up the per-row values as printed
/// (truncated GiB or MiB), so a total row always equals the sum of the rows
/// above it. Percentages use the exact byte sums.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Totals {
    pub cpu_millis: u64,
    pub memory_bytes: u64,
    pub memory_gib: u64,
    pub memory_mib: u64,
    pub cpu_capacity: u64,
    pub memory_capacity: u64,
}

impl Totals {
    pub fn add(&mut self, cpu_millis: u64, memory_bytes: u64) {
        self.cpu_millis += cpu_millis;
        self.memory_bytes += memory_bytes;
        self.memory_gib += gibibytes(memory_bytes);
        self.memory_mib += mebibytes(memory_bytes);
    }

    /// Sum of the per-row GiB values
    pub fn gi_of_rows(&self) -> String {
        format!("{}Gi", self.memory_gib)
    }

    /// Sum of the per-row MiB values, in GiB
    pub fn gi_of_mi_rows(&self) -> String {
        format!("{}Gi", self.memory_mib / 1024)
    }

    pub fn add_capacity(&mut self, node: &NodeInfo) {
        self.cpu_capacity += node.cpu_millis;
        self.memory_capacity += node.memory_bytes;
    }

    pub fn cpu_pct(&self) -> Option<u64> {
        (self.cpu_capacity > 0).then(|| percent(self.cpu_millis, self.cpu_capacity))
    }

    pub fn memory_pct(&self) -> Option<u64> {
        (self.memory_capacity > 0).then(|| percent(self.memory_bytes, self.memory_capacity))
    }
}

pub(crate) fn gi(bytes: u64) -> String {
    format!("{}Gi", gibibytes(bytes))
}

pub(crate) fn mi(bytes: u64) -> String {
    format!("{}Mi", mebibytes(bytes))
}

pub(crate) fn millicores(millis: u64) -> String {
    format!("{}m", millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_names() {
        let names: Vec<String> = Task::value_variants().iter().map(|t| t.to_string()).collect();
        assert_eq!(
            names,
            [
                "get-nodes",
                "get-resourcequotas",
                "get-top",
                "get-pvcs",
                "check-nfs",
                "get-k8s-info"
            ]
        );
        assert_eq!(Task::from_str("get-top", false), Ok(Task::GetTop));
    }

    #[test]
    fn test_prerequisites() {
        assert_eq!(Task::GetNodes.prerequisites().len(), 1);
        let nfs: Vec<String> = Task::CheckNfs
            .prerequisites()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(nfs, ["kubectl", "mount", "umount", "df"]);
    }

    #[test]
    fn test_totals_percentages() {
        let mut totals = Totals::default();
        assert_eq!(totals.cpu_pct(), None);
        totals.add(500, 1024);
        totals.add_capacity(&NodeInfo {
            name: "n".to_string(),
            role: crate::k8s::nodes::Role::Worker,
            cpu_millis: 2000,
            memory_bytes: 4096,
        });
        assert_eq!(totals.cpu_pct(), Some(25));
        assert_eq!(totals.memory_pct(), Some(25));
    }

    #[test]
    fn test_totals_sum_displayed_values() {
        let mut totals = Totals::default();
        // 1.9Gi twice: rows show 1Gi each
        totals.add(0, 1945 * 1024 * 1024);
        totals.add(0, 1945 * 1024 * 1024);
        assert_eq!(totals.gi_of_rows(), "2Gi");
        assert_eq!(gi(totals.memory_bytes), "3Gi");

        // 1023.99Mi + 1024.01Mi: rows show 1023Mi and 1024Mi
        let mut totals = Totals::default();
        totals.add(0, 1048575 * 1024);
        totals.add(0, 1048577 * 1024);
        assert_eq!(totals.memory_mib, 2047);
        assert_eq!(totals.gi_of_mi_rows(), "1Gi");
    }

    #[test]
    fn test_unit_labels() {
        assert_eq!(gi(16318480 * 1024), "15Gi");
        assert_eq!(mi(2097152 * 1024), "2048Mi");
        assert_eq!(millicores(351), "351m");
    }
}
