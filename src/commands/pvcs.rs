//! get-pvcs: persistent volume claims joined with their volumes

use super::{TaskContext, gi};
use crate::config::settings::Labels;
use crate::k8s::kubectl;
use crate::k8s::models::{ItemList, PersistentVolume, PersistentVolumeClaim, quantity};
use crate::k8s::quantity::{gibibytes, memory_bytes};
use crate::output::Report;
use crate::row;
use anyhow::{Context, Result};
use std::collections::HashMap;

const HEADERS: &str =
    "namespace,pvc,status,volume,storage_class,capacity_gb,access_modes,nfs_server,nfs_path";

pub fn run(ctx: &TaskContext<'_>) -> Result<Report> {
    let mut args = vec!["get", "pvc"];
    args.extend(kubectl::namespace_args(ctx.params.namespace.as_deref()));
    let claims: ItemList<PersistentVolumeClaim> =
        kubectl::get_json(&args, ctx.kubeconfig).context("Failed to get persistent volume claims")?;

    let volumes: ItemList<PersistentVolume> =
        kubectl::get_json(&["get", "pv"], ctx.kubeconfig).context("Failed to get persistent volumes")?;

    build_report(&claims.items, &volumes.items, &ctx.settings.labels)
}

/// Bound capacity when known, else the requested size
fn claim_capacity(claim: &PersistentVolumeClaim) -> Option<&str> {
    let bound = claim.status.as_ref().and_then(|s| s.capacity.as_ref());
    let requested = claim
        .spec
        .as_ref()
        .and_then(|s| s.resources.as_ref())
        .and_then(|r| r.requests.as_ref());

    quantity(bound, "storage").or_else(|| quantity(requested, "storage"))
}

pub fn build_report(
    claims: &[PersistentVolumeClaim],
    volumes: &[PersistentVolume],
    labels: &Labels,
) -> Result<Report> {
    let by_name: HashMap<&str, &PersistentVolume> = volumes
        .iter()
        .filter_map(|pv| pv.metadata.name.as_deref().map(|name| (name, pv)))
        .collect();

    let mut report = Report::new(HEADERS);
    let mut total_gib = 0u64;

    for claim in claims {
        let name = claim.metadata.name.as_deref().unwrap_or_default();
        let namespace = claim.metadata.namespace.as_deref().unwrap_or_default();
        let spec = claim.spec.as_ref();

        let phase = claim
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or_default();
        let volume_name = spec.and_then(|s| s.volume_name.as_deref()).unwrap_or_default();
        let volume = by_name.get(volume_name).copied();
        let volume_spec = volume.and_then(|pv| pv.spec.as_ref());

        let storage_class = spec
            .and_then(|s| s.storage_class_name.as_deref())
            .or_else(|| volume_spec.and_then(|s| s.storage_class_name.as_deref()))
            .unwrap_or_default();

        let capacity = claim_capacity(claim)
            .map(|q| {
                memory_bytes(q).with_context(|| format!("capacity of claim {}/{}", namespace, name))
            })
            .transpose()?;
        if let Some(bytes) = capacity {
            total_gib += gibibytes(bytes);
        }

        let access_modes = spec
            .and_then(|s| s.access_modes.as_ref())
            .map(|modes| modes.join(" "))
            .unwrap_or_default();

        let nfs = volume_spec.and_then(|s| s.nfs.as_ref());

        report.push_row(row![
            namespace,
            name,
            phase,
            volume_name,
            storage_class,
            capacity.map(gi),
            access_modes,
            nfs.map(|n| n.server.as_str()),
            nfs.map(|n| n.path.as_str()),
        ])?;
    }

    report.push_row(row![
        labels.total.as_str(),
        "",
        "",
        "",
        "",
        format!("{}Gi", total_gib),
        "",
        "",
        "",
    ])?;

    Ok(report)
}
