//! get-k8s-info: context, versions and node counts

use super::{TaskContext, Totals};
use crate::k8s::context;
use crate::k8s::kubectl;
use crate::k8s::models::VersionReport;
use crate::k8s::nodes::{NodeInventory, Role};
use crate::output::Report;
use crate::row;
use anyhow::{Context, Result};

const HEADERS: &str = "context,client_version,server_version,nodes,masters,workers,total_cpu,total_ram_gb,worker_cpu,worker_ram_gb";

pub fn run(ctx: &TaskContext<'_>) -> Result<Report> {
    let current = context::current_context(ctx.kubeconfig)?;
    let version: VersionReport =
        kubectl::get_json(&["version"], ctx.kubeconfig).context("Failed to get cluster version")?;
    let inventory = ctx.node_inventory()?;

    build_report(&current, &version, &inventory)
}

pub fn build_report(context: &str, version: &VersionReport, inventory: &NodeInventory) -> Result<Report> {
    let mut total = Totals::default();
    let mut workers = Totals::default();
    for node in inventory.iter() {
        total.add(node.cpu_millis, node.memory_bytes);
        if node.role == Role::Worker {
            workers.add(node.cpu_millis, node.memory_bytes);
        }
    }

    let git_version = |info: &Option<crate::k8s::models::BuildInfo>| {
        info.as_ref().map(|i| i.git_version.clone()).unwrap_or_default()
    };

    let mut report = Report::new(HEADERS);
    report.push_row(row![
        context,
        git_version(&version.client_version),
        git_version(&version.server_version),
        inventory.len(),
        inventory.count(Role::Master),
        inventory.count(Role::Worker),
        total.cpu_millis / 1000,
        total.gi_of_rows(),
        workers.cpu_millis / 1000,
        workers.gi_of_rows(),
    ])?;

    Ok(report)
}
