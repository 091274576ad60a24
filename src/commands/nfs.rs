//! check-nfs: mount every NFS export backing a volume and measure it
//!
//! Exports are grouped by server and by the first `--nfs-level` components of
//! their path, then measured one at a time: mount on a temporary directory,
//! `df`, unmount.

use super::TaskContext;
use crate::k8s::kubectl;
use crate::k8s::models::{ItemList, PersistentVolume};
use crate::k8s::quantity::percent;
use crate::output::{Cell, Report};
use crate::row;
use crate::utils::mount::{DiskUsage, HostTools, NfsMount, disk_usage};
use crate::utils::progress;
use anyhow::{Context, Result};
use std::collections::HashMap;

const HEADERS: &str = "nfs_server,nfs_path,pv_count,size_gb,used_gb,available_gb,used_pct";

/// A distinct server/path pair and how many volumes live under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsExport {
    pub server: String,
    pub path: String,
    pub pv_count: usize,
}

pub fn run(ctx: &TaskContext<'_>) -> Result<Report> {
    let volumes: ItemList<PersistentVolume> =
        kubectl::get_json(&["get", "pv"], ctx.kubeconfig).context("Failed to get persistent volumes")?;

    let exports = collect_exports(&volumes.items, ctx.nfs_level);
    let mut report = Report::new(HEADERS);

    if exports.is_empty() {
        crate::log_warn!("No NFS-backed persistent volumes found");
        return Ok(report);
    }

    let nfs = &ctx.settings.nfs;
    let options = ctx
        .params
        .mount_options
        .as_deref()
        .or(nfs.mount_options.as_deref());

    let pb = progress::create_progress_bar(
        exports.len() as u64,
        "Measuring NFS exports",
        ctx.settings.behavior.show_progress,
    );

    let tools = HostTools::default();
    for export in &exports {
        pb.set_message(format!("{}:{}", export.server, export.path));
        let usage = pb.suspend(|| measure(&tools, export, &nfs.mount_type, options))?;
        report.push_row(usage_row(export, &usage))?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(report)
}

/// Mount, run df, and always unmount before returning
fn measure(tools: &HostTools, export: &NfsExport, mount_type: &str, options: Option<&str>) -> Result<DiskUsage> {
    let mount = NfsMount::mount(tools, &export.server, &export.path, mount_type, options)?;
    let usage = disk_usage(&tools.df, mount.path());
    let unmounted = mount.unmount();

    // The df error wins; an unmount failure behind it still gets reported
    if let (Err(_), Err(e)) = (&usage, &unmounted) {
        crate::log_error!("{:#}", e);
    }

    let usage = usage?;
    unmounted?;
    Ok(usage)
}

/// Keep the first `level` components of an export path; 0 keeps them all
pub fn export_root(path: &str, level: usize) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let kept = if level == 0 {
        &parts[..]
    } else {
        &parts[..level.min(parts.len())]
    };
    format!("/{}", kept.join("/"))
}

/// Distinct server/path pairs of NFS volumes, in first-seen order
pub fn collect_exports(volumes: &[PersistentVolume], level: usize) -> Vec<NfsExport> {
    let mut exports: Vec<NfsExport> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for nfs in volumes.iter().filter_map(|pv| pv.spec.as_ref()?.nfs.as_ref()) {
        let key = (nfs.server.clone(), export_root(&nfs.path, level));

        match index.get(&key) {
            Some(&i) => exports[i].pv_count += 1,
            None => {
                index.insert(key.clone(), exports.len());
                exports.push(NfsExport {
                    server: key.0,
                    path: key.1,
                    pv_count: 1,
                });
            }
        }
    }

    crate::log_debug!("Found {} distinct NFS exports", exports.len());
    exports
}

pub fn usage_row(export: &NfsExport, usage: &DiskUsage) -> Vec<Cell> {
    const KIB_PER_GIB: u64 = 1024 * 1024;

    row![
        export.server.as_str(),
        export.path.as_str(),
        export.pv_count,
        usage.size_kib / KIB_PER_GIB,
        usage.used_kib / KIB_PER_GIB,
        usage.available_kib / KIB_PER_GIB,
        percent(usage.used_kib, usage.size_kib),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn volumes() -> Vec<PersistentVolume> {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [
                {"apiVersion": "v1", "kind": "PersistentVolume", "metadata": {"name": "a"},
                 "spec": {"nfs": {"server": "nas01", "path": "/export/k8s/shop-a"}}},
                {"apiVersion": "v1", "kind": "PersistentVolume", "metadata": {"name": "b"},
                 "spec": {"nfs": {"server": "nas01", "path": "/export/k8s/shop-b/"}}},
                {"apiVersion": "v1", "kind": "PersistentVolume", "metadata": {"name": "local"},
                 "spec": {"hostPath": {"path": "/data"}}},
                {"apiVersion": "v1", "kind": "PersistentVolume", "metadata": {"name": "c"},
                 "spec": {"nfs": {"server": "nas02", "path": "/export/k8s/media"}}},
                {"apiVersion": "v1", "kind": "PersistentVolume", "metadata": {"name": "d"},
                 "spec": {"nfs": {"server": "nas01", "path": "/export//k8s/shop-a"}}}
            ]
        });
        let list: ItemList<PersistentVolume> = serde_json::from_value(raw).unwrap();
        list.items
    }

    #[test]
    fn test_export_root() {
        assert_eq!(export_root("/export/k8s/pvc-1", 0), "/export/k8s/pvc-1");
        assert_eq!(export_root("/export/k8s/pvc-1", 2), "/export/k8s");
        assert_eq!(export_root("/export/k8s/pvc-1", 1), "/export");
        assert_eq!(export_root("/export/k8s/pvc-1", 9), "/export/k8s/pvc-1");
        assert_eq!(export_root("/export/k8s/", 0), "/export/k8s");
        assert_eq!(export_root("/", 3), "/");
    }

    #[test]
    fn test_collect_full_paths() {
        let exports = collect_exports(&volumes(), 0);
        assert_eq!(exports.len(), 3);
        assert_eq!(exports[0].path, "/export/k8s/shop-a");
        // "/export//k8s/shop-a" normalizes onto the first export
        assert_eq!(exports[0].pv_count, 2);
        assert_eq!(exports[1].path, "/export/k8s/shop-b");
        assert_eq!(exports[2].server, "nas02");
    }

    #[test]
    fn test_collect_with_level() {
        let exports = collect_exports(&volumes(), 2);
        assert_eq!(
            exports,
            vec![
                NfsExport {
                    server: "nas01".to_string(),
                    path: "/export/k8s".to_string(),
                    pv_count: 3,
                },
                NfsExport {
                    server: "nas02".to_string(),
                    path: "/export/k8s".to_string(),
                    pv_count: 1,
                },
            ]
        );
    }

    #[cfg(unix)]
    mod measuring {
        use super::*;
        use crate::utils::testing::FakeTools;

        const DF_OUTPUT: &str = "printf 'Filesystem 1024-blocks Used Available Capacity Mounted on\\nnas01:/export/k8s 2097152 524288 1572864 25%% /mnt/x\\n'";

        fn export() -> NfsExport {
            NfsExport {
                server: "nas01".to_string(),
                path: "/export/k8s".to_string(),
                pv_count: 2,
            }
        }

        fn commands(calls: &[String]) -> Vec<&str> {
            calls.iter().filter_map(|c| c.split(' ').next()).collect()
        }

        #[test]
        fn test_measure_mounts_runs_df_and_unmounts() {
            let fake = FakeTools::new();
            let tools = HostTools {
                mount: fake.add("mount", ""),
                umount: fake.add("umount", ""),
                df: fake.add("df", DF_OUTPUT),
            };

            let usage = measure(&tools, &export(), "nfs", Some("vers=4.1")).unwrap();
            assert_eq!(
                usage,
                DiskUsage {
                    size_kib: 2097152,
                    used_kib: 524288,
                    available_kib: 1572864,
                }
            );
            assert_eq!(commands(&fake.calls()), ["mount", "df", "umount"]);
        }

        #[test]
        fn test_unmounts_when_df_fails() {
            let fake = FakeTools::new();
            let tools = HostTools {
                mount: fake.add("mount", ""),
                umount: fake.add("umount", ""),
                df: fake.add("df", "echo 'df: stale file handle' >&2\nexit 1"),
            };

            let err = measure(&tools, &export(), "nfs", None).unwrap_err();
            assert!(format!("{:#}", err).contains("stale file handle"));
            assert_eq!(commands(&fake.calls()), ["mount", "df", "umount"]);
        }

        #[test]
        fn test_df_error_wins_over_unmount_error() {
            let fake = FakeTools::new();
            let tools = HostTools {
                mount: fake.add("mount", ""),
                umount: fake.add("umount", "echo 'umount: target is busy' >&2\nexit 32"),
                df: fake.add("df", "echo 'df: stale file handle' >&2\nexit 1"),
            };

            let err = measure(&tools, &export(), "nfs", None).unwrap_err();
            let message = format!("{:#}", err);
            assert!(message.contains("stale file handle"));
            assert!(!message.contains("target is busy"));

            let calls = fake.calls();
            assert_eq!(commands(&calls), ["mount", "df", "umount"]);
            // the still-mounted directory is left behind
            let dir = calls[2].trim_start_matches("umount ");
            assert!(std::path::Path::new(dir).is_dir());
            std::fs::remove_dir(dir).unwrap();
        }
    }

    #[test]
    fn test_usage_row() {
        let export = NfsExport {
            server: "nas01".to_string(),
            path: "/export/k8s".to_string(),
            pv_count: 3,
        };
        let usage = DiskUsage {
            size_kib: 104857600,
            used_kib: 36700160,
            available_kib: 68157440,
        };
        assert_eq!(
            usage_row(&export, &usage),
            row!["nas01", "/export/k8s", 3usize, 100u64, 35u64, 65u64, 35u64]
        );
    }
}
