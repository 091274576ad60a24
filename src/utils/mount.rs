//! Host mount, df and umount helpers for NFS probing

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DfParseError {
    #[error("df printed no data line")]
    NoData,

    #[error("unexpected df line: '{0}'")]
    BadLine(String),
}

/// Filesystem usage in KiB, as reported by `df -kP`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub size_kib: u64,
    pub used_kib: u64,
    pub available_kib: u64,
}

/// Parse POSIX `df -kP` output. Fields are read from the end of the data
/// line so filesystem names containing spaces still parse.
pub fn parse_df_output(output: &str) -> Result<DiskUsage, DfParseError> {
    let line = output
        .lines()
        .skip(1)
        .find(|l| !l.trim().is_empty())
        .ok_or(DfParseError::NoData)?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 {
        return Err(DfParseError::BadLine(line.to_string()));
    }

    let n = fields.len();
    let parse = |s: &str| s.parse::<u64>().map_err(|_| DfParseError::BadLine(line.to_string()));

    Ok(DiskUsage {
        size_kib: parse(fields[n - 5])?,
        used_kib: parse(fields[n - 4])?,
        available_kib: parse(fields[n - 3])?,
    })
}

fn run(program: &str, args: &[&str]) -> Result<String> {
    crate::log_debug!(
        "Running: {}",
        shell_words::join(std::iter::once(program).chain(args.iter().copied()))
    );

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "{} failed: {} {}\n{}",
            program,
            program,
            args.join(" "),
            stderr.trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Host programs used to mount and measure an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTools {
    pub mount: String,
    pub umount: String,
    pub df: String,
}

impl Default for HostTools {
    fn default() -> Self {
        Self {
            mount: "mount".to_string(),
            umount: "umount".to_string(),
            df: "df".to_string(),
        }
    }
}

/// Usage of the filesystem mounted at `path`
pub fn disk_usage(df: &str, path: &Path) -> Result<DiskUsage> {
    let path_str = path.to_string_lossy();
    let output = run(df, &["-kP", &path_str])?;
    parse_df_output(&output).with_context(|| format!("Failed to parse df output for {}", path.display()))
}

/// `server:/export` source string for mount
pub fn nfs_source(server: &str, export: &str) -> String {
    format!("{}:{}", server, export)
}

/// Argument list for `mount`
pub fn mount_args<'a>(fs_type: &'a str, options: Option<&'a str>, source: &'a str, target: &'a str) -> Vec<&'a str> {
    let mut args = vec!["-t", fs_type];
    if let Some(options) = options.filter(|o| !o.is_empty()) {
        args.push("-o");
        args.push(options);
    }
    args.push(source);
    args.push(target);
    args
}

/// An NFS export mounted on a temporary directory. The export is unmounted
/// when the value is dropped; the directory is only removed once unmounted.
#[derive(Debug)]
pub struct NfsMount {
    dir: Option<TempDir>,
    source: String,
    umount: String,
    mounted: bool,
}

impl NfsMount {
    pub fn mount(
        tools: &HostTools,
        server: &str,
        export: &str,
        fs_type: &str,
        options: Option<&str>,
    ) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("kube-report-nfs-")
            .tempdir()
            .context("Failed to create temporary mount point")?;
        let source = nfs_source(server, export);
        let target = dir.path().to_string_lossy().into_owned();

        crate::log_info!("Mounting {} on {}", source, target);
        run(&tools.mount, &mount_args(fs_type, options, &source, &target))
            .with_context(|| format!("Failed to mount {}", source))?;

        Ok(Self {
            dir: Some(dir),
            source,
            umount: tools.umount.clone(),
            mounted: true,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.as_ref().map(TempDir::path).unwrap_or_else(|| Path::new(""))
    }

    /// Unmount now, reporting failure to the caller
    pub fn unmount(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.mounted {
            return Ok(());
        }

        let target = self.path().to_string_lossy().into_owned();
        crate::log_info!("Unmounting {}", self.source);

        match run(&self.umount, &[&target]) {
            Ok(_) => {
                self.mounted = false;
                Ok(())
            }
            Err(e) => {
                // Never recurse into a directory that may still be an NFS mount
                if let Some(dir) = self.dir.take() {
                    let kept = dir.keep();
                    crate::log_warn!("Leaving mount point {} in place", kept.display());
                }
                self.mounted = false;
                Err(e.context(format!("Failed to unmount {}", self.source)))
            }
        }
    }
}

impl Drop for NfsMount {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            crate::log_error!("{:#}", e);
        }
    }
}
