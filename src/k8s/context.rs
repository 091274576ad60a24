//! Kubeconfig context selection

use crate::k8s::kubectl::{self, KUBECTL};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Name of the context kubectl currently points at
pub fn current_context(kubeconfig: Option<&Path>) -> Result<String> {
    read_context(KUBECTL, kubeconfig)
}

fn read_context(program: &str, kubeconfig: Option<&Path>) -> Result<String> {
    kubectl::run_program_output(program, &["config", "current-context"], kubeconfig)
        .context("Failed to read current kubectl context")
}

fn use_context(program: &str, name: &str, kubeconfig: Option<&Path>) -> Result<()> {
    kubectl::run_program_output(program, &["config", "use-context", name], kubeconfig)
        .map(|_| ())
        .with_context(|| format!("Failed to switch to context '{}'", name))
}

/// Switches the kubectl context for the lifetime of the guard and puts the
/// previous one back when dropped
#[derive(Debug)]
pub struct ContextGuard {
    program: String,
    previous: Option<String>,
    kubeconfig: Option<PathBuf>,
}

impl ContextGuard {
    pub fn switch(name: &str, kubeconfig: Option<&Path>) -> Result<Self> {
        Self::switch_with(KUBECTL, name, kubeconfig)
    }

    fn switch_with(program: &str, name: &str, kubeconfig: Option<&Path>) -> Result<Self> {
        // No current context is fine; there is just nothing to restore
        let previous = read_context(program, kubeconfig).ok();

        let mut guard = Self {
            program: program.to_string(),
            previous: None,
            kubeconfig: kubeconfig.map(Path::to_path_buf),
        };

        if previous.as_deref() == Some(name) {
            crate::log_debug!("Already on context {}", name);
            return Ok(guard);
        }

        crate::log_info!("Switching to context {}", name);
        use_context(program, name, kubeconfig)?;
        guard.previous = previous;

        Ok(guard)
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            crate::log_info!("Restoring context {}", previous);
            if let Err(e) = use_context(&self.program, &previous, self.kubeconfig.as_deref()) {
                crate::log_warn!("Failed to restore context {}: {:#}", previous, e);
            }
        }
    }
}
