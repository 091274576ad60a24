//! get-resourcequotas: container requests allocated on each node

use super::{TaskContext, Totals, gi};
use crate::config::settings::Labels;
use crate::k8s::kubectl;
use crate::k8s::models::{ItemList, Pod, quantity};
use crate::k8s::nodes::{NodeInventory, Role};
use crate::k8s::quantity::{cpu_millis, memory_bytes, percent};
use crate::output::Report;
use crate::row;
use anyhow::{Context, Result};
use std::collections::BTreeMap;

const HEADERS: &str = "role,node,allocated_ram_gb,allocated_cpu_millicores,ram_pct,cpu_pct";

/// Requests summed over the containers scheduled on one node
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub cpu_millis: u64,
    pub memory_bytes: u64,
}

pub fn run(ctx: &TaskContext<'_>) -> Result<Report> {
    let inventory = ctx.node_inventory()?;

    let mut args = vec!["get", "pods"];
    args.extend(kubectl::namespace_args(ctx.params.namespace.as_deref()));
    let pods: ItemList<Pod> = kubectl::get_json(&args, ctx.kubeconfig).context("Failed to get pods")?;

    let allocations = sum_requests(&pods.items)?;
    // With a node selector only the selected nodes are reported
    let include_unlisted = ctx.params.selector.is_none();
    build_report(&inventory, &allocations, include_unlisted, &ctx.settings.labels)
}

fn is_terminated(pod: &Pod) -> bool {
    matches!(
        pod.status.as_ref().and_then(|s| s.phase.as_deref()),
        Some("Succeeded") | Some("Failed")
    )
}

/// Sum cpu and memory requests of regular containers per node.
/// Unscheduled and terminated pods hold no node resources and are skipped.
pub fn sum_requests(pods: &[Pod]) -> Result<BTreeMap<String, Allocation>> {
    let mut allocations: BTreeMap<String, Allocation> = BTreeMap::new();

    for pod in pods {
        let Some(spec) = pod.spec.as_ref() else {
            continue;
        };
        let Some(node) = spec.node_name.as_deref() else {
            continue;
        };
        if is_terminated(pod) {
            continue;
        }

        let pod_name = pod.metadata.name.as_deref().unwrap_or("<unnamed>");

        for container in &spec.containers {
            let requests = container.resources.as_ref().and_then(|r| r.requests.as_ref());
            let cpu = quantity(requests, "cpu");
            let memory = quantity(requests, "memory");
            if cpu.is_none() && memory.is_none() {
                continue;
            }

            let entry = allocations.entry(node.to_string()).or_default();
            if let Some(cpu) = cpu {
                entry.cpu_millis += cpu_millis(cpu)
                    .with_context(|| format!("cpu request of {}/{}", pod_name, container.name))?;
            }
            if let Some(memory) = memory {
                entry.memory_bytes += memory_bytes(memory)
                    .with_context(|| format!("memory request of {}/{}", pod_name, container.name))?;
            }
        }
    }

    Ok(allocations)
}

/// Rows follow node listing order; nodes missing from the listing come last, by name
pub fn build_report(
    inventory: &NodeInventory,
    allocations: &BTreeMap<String, Allocation>,
    include_unlisted: bool,
    labels: &Labels,
) -> Result<Report> {
    let mut report = Report::new(HEADERS);
    let mut total = Totals::default();
    let mut workers = Totals::default();

    for node in inventory.iter() {
        total.add_capacity(node);
        if node.role == Role::Worker {
            workers.add_capacity(node);
        }
    }

    let listed = inventory
        .iter()
        .filter_map(|n| allocations.get(&n.name).map(|a| (n.name.as_str(), a)));
    let unlisted = allocations
        .iter()
        .filter(|(name, _)| include_unlisted && inventory.get(name).is_none())
        .map(|(name, a)| (name.as_str(), a));

    for (name, alloc) in listed.chain(unlisted) {
        let node = inventory.get(name);
        let role = inventory.role_of(name);

        report.push_row(row![
            role.to_string(),
            name,
            gi(alloc.memory_bytes),
            alloc.cpu_millis,
            node.map(|n| percent(alloc.memory_bytes, n.memory_bytes)),
            node.map(|n| percent(alloc.cpu_millis, n.cpu_millis)),
        ])?;

        total.add(alloc.cpu_millis, alloc.memory_bytes);
        if role == Role::Worker {
            workers.add(alloc.cpu_millis, alloc.memory_bytes);
        }
    }

    for (label, sums) in [(&labels.total, total), (&labels.worker_total, workers)] {
        report.push_row(row![
            label.as_str(),
            "",
            sums.gi_of_rows(),
            sums.cpu_millis,
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

    fn pods() -> Vec<Pod> {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [
                {
                    "apiVersion": "v1", "kind": "Pod",
                    "metadata": {"name": "etcd-cp-1", "namespace": "kube-system"},
                    "spec": {
                        "nodeName": "cp-1",
                        "containers": [{"name": "etcd", "resources": {"requests": {"cpu": "100m", "memory": "100Mi"}}}]
                    },
                    "status": {"phase": "Running"}
                },
                {
                    "apiVersion": "v1", "kind": "Pod",
                    "metadata": {"name": "api", "namespace": "shop"},
                    "spec": {
                        "nodeName": "worker-1",
                        "containers": [
                            {"name": "app", "resources": {"requests": {"cpu": "1500m", "memory": "2Gi"}}},
                            {"name": "sidecar", "resources": {"requests": {"cpu": "1", "memory": "524288Ki"}}},
                            {"name": "nolimits"}
                        ]
                    },
                    "status": {"phase": "Running"}
                },
                {
                    "apiVersion": "v1", "kind": "Pod",
                    "metadata": {"name": "batch", "namespace": "shop"},
                    "spec": {
                        "nodeName": "worker-1",
                        "containers": [{"name": "job", "resources": {"requests": {"cpu": "4", "memory": "8Gi"}}}]
                    },
                    "status": {"phase": "Succeeded"}
                },
                {
                    "apiVersion": "v1", "kind": "Pod",
                    "metadata": {"name": "pending", "namespace": "shop"},
                    "spec": {
                        "containers": [{"name": "app", "resources": {"requests": {"cpu": "2"}}}]
                    },
                    "status": {"phase": "Pending"}
                },
                {
                    "apiVersion": "v1", "kind": "Pod",
                    "metadata": {"name": "stray", "namespace": "shop"},
                    "spec": {
                        "nodeName": "old-node",
                        "containers": [{"name": "app", "resources": {"requests": {"memory": "1Gi"}}}]
                    }
                }
            ]
        });
        let list: ItemList<Pod> = serde_json::from_value(raw).unwrap();
        list.items
    }

    #[test]
    fn test_sum_requests() {
        let allocations = sum_requests(&pods()).unwrap();
        assert_eq!(allocations.len(), 3);
        assert_eq!(
            allocations["worker-1"],
            Allocation {
                cpu_millis: 2500,
                memory_bytes: 2 * 1024 * 1024 * 1024 + 512 * 1024 * 1024,
            }
        );
        assert_eq!(allocations["cp-1"].cpu_millis, 100);
        assert_eq!(allocations["old-node"].cpu_millis, 0);
        assert!(!allocations.contains_key("worker-2"));
    }

    #[test]
    fn test_report_rows() {
        let inventory = NodeInventory::from_nodes(&fixtures::nodes(), &fixtures::default_labels()).unwrap();
        let allocations = sum_requests(&pods()).unwrap();
        let report = build_report(&inventory, &allocations, true, &Labels::default()).unwrap();

        let rows = report.rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], row!["Master", "cp-1", "0Gi", 100u64, 1u64, 3u64]);
        // 2.5Gi of ~31.3Gi, 2500m of 8000m
        assert_eq!(rows[1], row!["Worker", "worker-1", "2Gi", 2500u64, 8u64, 31u64]);
        assert_eq!(rows[2][0], Cell::from("Unknown"));
        assert_eq!(rows[2][1], Cell::from("old-node"));
        assert_eq!(rows[2][4], Cell::empty());
        assert_eq!(rows[3][0], Cell::from("Somma Totale"));
        // 0Gi + 2Gi + 1Gi
        assert_eq!(rows[3][2], Cell::from("3Gi"));
        assert_eq!(rows[3][3], Cell::Int(2600));
        assert_eq!(rows[4][0], Cell::from("Somma Worker"));
        assert_eq!(rows[4][3], Cell::Int(2500));
        // 2500m of 16000m worker capacity
        assert_eq!(rows[4][5], Cell::Int(16));
    }

    #[test]
    fn test_selector_drops_unlisted_nodes() {
        let inventory = NodeInventory::from_nodes(&fixtures::nodes(), &fixtures::default_labels()).unwrap();
        let allocations = sum_requests(&pods()).unwrap();
        let report = build_report(&inventory, &allocations, false, &Labels::default()).unwrap();
        assert_eq!(report.rows().len(), 4);
        assert!(report.rows().iter().all(|r| r[1] != Cell::from("old-node")));
    }

    #[test]
    fn test_bad_request_quantity() {
        let raw = json!({
            "apiVersion": "v1", "kind": "Pod",
            "metadata": {"name": "broken"},
            "spec": {"nodeName": "w", "containers": [{"name": "c", "resources": {"requests": {"cpu": "lots"}}}]}
        });
        let pod: Pod = serde_json::from_value(raw).unwrap();
        let err = sum_requests(&[pod]).unwrap_err();
        assert!(format!("{:#}", err).contains("broken/c"));
    }
}
