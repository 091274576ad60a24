//! get-nodes: node roles and capacity

use super::{TaskContext, Totals, gi};
use crate::config::settings::Labels;
use crate::k8s::nodes::{NodeInventory, Role};
use crate::output::Report;
use crate::row;
use anyhow::Result;

const HEADERS: &str = "role,node,ram_gb,cpu";

pub fn run(ctx: &TaskContext<'_>) -> Result<Report> {
    let inventory = ctx.node_inventory()?;
    build_report(&inventory, &ctx.settings.labels)
}

/// One row per node, then the all-nodes and worker totals
pub fn build_report(inventory: &NodeInventory, labels: &Labels) -> Result<Report> {
    let mut report = Report::new(HEADERS);
    let mut total = Totals::default();
    let mut workers = Totals::default();

    for node in inventory.iter() {
        report.push_row(row![
            node.role.to_string(),
            node.name.as_str(),
            gi(node.memory_bytes),
            node.cpu_millis / 1000,
        ])?;

        total.add(node.cpu_millis, node.memory_bytes);
        if node.role == Role::Worker {
            workers.add(node.cpu_millis, node.memory_bytes);
        }
    }

    report.push_row(row![
        labels.total.as_str(),
        "",
        total.gi_of_rows(),
        total.cpu_millis / 1000,
    ])?;
    report.push_row(row![
        labels.worker_total.as_str(),
        "",
        workers.gi_of_rows(),
        workers.cpu_millis / 1000,
    ])?;

    Ok(report)
}
