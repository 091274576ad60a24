//! get-top: live node usage from the metrics API

use super::{TaskContext, Totals, mi, millicores};
use crate::config::settings::Labels;
use crate::k8s::kubectl;
use crate::k8s::models::{ItemList, NodeMetrics, quantity};
use crate::k8s::nodes::{NodeInventory, Role};
use crate::k8s::quantity::{cpu_millis, memory_bytes, percent};
use crate::output::Report;
use crate::row;
use anyhow::{Context, Result, anyhow};

const HEADERS: &str = "role,node,ram_mi,cpu_m,ram_pct,cpu_pct";

pub fn run(ctx: &TaskContext<'_>) -> Result<Report> {
    let inventory = ctx.node_inventory()?;

    let mut args = vec!["get", "nodes.metrics.k8s.io"];
    if let Some(selector) = ctx.params.selector.as_deref() {
        args.push("-l");
        args.push(selector);
    }
    let metrics: ItemList<NodeMetrics> =
        kubectl::get_json(&args, ctx.kubeconfig).context("Failed to get node metrics")?;

    build_report(&inventory, &metrics.items, &ctx.settings.labels)
}

/// Usage per node in metrics order, then all-nodes and worker totals
pub fn build_report(inventory: &NodeInventory, metrics: &[NodeMetrics], labels: &Labels) -> Result<Report> {
    let mut report = Report::new(HEADERS);
    let mut total = Totals::default();
    let mut workers = Totals::default();

    for item in metrics {
        let name = item.name();
        let cpu = quantity(Some(&item.usage), "cpu")
            .ok_or_else(|| anyhow!("Metrics for node {} have no cpu usage", name))?;
        let memory = quantity(Some(&item.usage), "memory")
            .ok_or_else(|| anyhow!("Metrics for node {} have no memory usage", name))?;
        let cpu = cpu_millis(cpu).with_context(|| format!("cpu usage of node {}", name))?;
        let ram = memory_bytes(memory).with_context(|| format!("memory usage of node {}", name))?;

        let node = inventory.get(name);
        let role = inventory.role_of(name);

        report.push_row(row![
            role.to_string(),
            name,
            mi(ram),
            millicores(cpu),
            node.map(|n| percent(ram, n.memory_bytes)),
            node.map(|n| percent(cpu, n.cpu_millis)),
        ])?;

        total.add(cpu, ram);
        if let Some(node) = node {
            total.add_capacity(node);
        }
        if role == Role::Worker {
            workers.add(cpu, ram);
            if let Some(node) = node {
                workers.add_capacity(node);
            }
        }
    }

    for (label, sums) in [(&labels.total, total), (&labels.worker_total, workers)] {
        report.push_row(row![
            label.as_str(),
            "",
            sums.gi_of_mi_rows(),
            millicores(sums.cpu_millis),
            sums.memory_pct(),
            sums.cpu_pct(),
        ])?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::nodes::fixtures;
    use crate::output::Cell;
    use serde_json::json;

    fn metrics() -> Vec<NodeMetrics> {
        let raw = json!({
            "kind": "List",
            "apiVersion": "v1",
            "items": [
                {"metadata": {"name": "cp-1"}, "usage": {"cpu": "400000000n", "memory": "4194304Ki"}},
                {"metadata": {"name": "worker-1"}, "usage": {"cpu": "2000000000n", "memory": "16777216Ki"}},
                {"metadata": {"name": "worker-2"}, "usage": {"cpu": "999999n", "memory": "1048575Ki"}},
                {"metadata": {"name": "virtual-1"}, "usage": {"cpu": "10m", "memory": "1Mi"}}
            ]
        });
        let list: ItemList<NodeMetrics> = serde_json::from_value(raw).unwrap();
        list.items
    }

    #[test]
    fn test_usage_rows() {
        let inventory = NodeInventory::from_nodes(&fixtures::nodes(), &fixtures::default_labels()).unwrap();
        let report = build_report(&inventory, &metrics(), &Labels::default()).unwrap();
        let rows = report.rows();

        assert_eq!(report.headers()[2], "ram_mi");
        assert_eq!(rows.len(), 6);
        // 4096Mi of 15936Mi, 400m of 4000m
        assert_eq!(rows[0], row!["Master", "cp-1", "4096Mi", "400m", 26u64, 10u64]);
        assert_eq!(rows[1], row!["Worker", "worker-1", "16384Mi", "2000m", 51u64, 25u64]);
        assert_eq!(rows[2][2], Cell::from("1023Mi"));
        assert_eq!(rows[2][3], Cell::from("0m"));
        assert_eq!(rows[3][0], Cell::from("Unknown"));
        assert_eq!(rows[3][4], Cell::empty());
    }

    #[test]
    fn test_totals() {
        let inventory = NodeInventory::from_nodes(&fixtures::nodes(), &fixtures::default_labels()).unwrap();
        let report = build_report(&inventory, &metrics(), &Labels::default()).unwrap();
        let rows = report.rows();

        assert_eq!(rows[4][0], Cell::from("Somma Totale"));
        assert_eq!(rows[4][2], Cell::from("21Gi"));
        assert_eq!(rows[4][3], Cell::from("2410m"));
        assert_eq!(rows[5][0], Cell::from("Somma Worker"));
        assert_eq!(rows[5][2], Cell::from("16Gi"));
        assert_eq!(rows[5][3], Cell::from("2000m"));
        // 2000m of 16000m worker capacity
        assert_eq!(rows[5][5], Cell::Int(13));
    }

    #[test]
    fn test_total_ram_sums_displayed_mebibytes() {
        let raw = json!({
            "items": [
                {"metadata": {"name": "worker-1"}, "usage": {"cpu": "1m", "memory": "1048575Ki"}},
                {"metadata": {"name": "worker-2"}, "usage": {"cpu": "1m", "memory": "1048577Ki"}}
            ]
        });
        let list: ItemList<NodeMetrics> = serde_json::from_value(raw).unwrap();
        let inventory = NodeInventory::from_nodes(&fixtures::nodes(), &fixtures::default_labels()).unwrap();
        let report = build_report(&inventory, &list.items, &Labels::default()).unwrap();
        let rows = report.rows();

        assert_eq!(rows[0][2], Cell::from("1023Mi"));
        assert_eq!(rows[1][2], Cell::from("1024Mi"));
        // 2047Mi shown, although the exact sum is exactly 2Gi
        assert_eq!(rows[2][2], Cell::from("1Gi"));
        assert_eq!(rows[3][2], Cell::from("1Gi"));
    }

    #[test]
    fn test_missing_usage_is_an_error() {
        let raw = json!({"items": [{"metadata": {"name": "n1"}, "usage": {"cpu": "1m"}}]});
        let list: ItemList<NodeMetrics> = serde_json::from_value(raw).unwrap();
        let err = build_report(&NodeInventory::default(), &list.items, &Labels::default()).unwrap_err();
        assert!(err.to_string().contains("n1"));
    }
}
