//! Kubectl wrapper utilities

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::process::Command;

/// Program invoked for every cluster call
pub const KUBECTL: &str = "kubectl";

fn kubectl_command(program: &str, args: &[&str], kubeconfig: Option<&Path>) -> Command {
    let mut cmd = Command::new(program);

    if let Some(kc) = kubeconfig {
        cmd.env("KUBECONFIG", kc);
    }

    cmd.args(args);

    crate::log_debug!(
        "Running: {}",
        shell_words::join(std::iter::once(program).chain(args.iter().copied()))
    );

    cmd
}

/// Run kubectl and capture output
pub fn run_kubectl_output(args: &[&str], kubeconfig: Option<&Path>) -> Result<String> {
    run_program_output(KUBECTL, args, kubeconfig)
}

/// Run `program` as kubectl would be run and capture trimmed stdout. A
/// non-zero exit becomes an error carrying the arguments and stderr.
pub(crate) fn run_program_output(program: &str, args: &[&str], kubeconfig: Option<&Path>) -> Result<String> {
    let output = kubectl_command(program, args, kubeconfig)
        .output()
        .with_context(|| format!("Failed to run {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "kubectl command failed: {}\n{}",
            args.join(" "),
            stderr.trim()
        ));
    }

    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}

/// Run `kubectl <args> -o json` and deserialize the result
pub fn get_json<T: DeserializeOwned>(args: &[&str], kubeconfig: Option<&Path>) -> Result<T> {
    let mut full: Vec<&str> = args.to_vec();
    full.extend(["-o", "json"]);

    let raw = run_kubectl_output(&full, kubeconfig)?;
    parse_json(&raw).with_context(|| format!("Failed to parse output of kubectl {}", args.join(" ")))
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

/// Arguments selecting one namespace, or all of them
pub fn namespace_args(namespace: Option<&str>) -> Vec<&str> {
    match namespace {
        Some(ns) => vec!["-n", ns],
        None => vec!["--all-namespaces"],
    }
}
