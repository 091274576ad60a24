//! Enhanced error types with actionable suggestions

use colored::Colorize;
use thiserror::Error;

/// Enhanced error with suggestions
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ReportError {
    pub message: String,
    pub suggestions: Vec<String>,
}

impl ReportError {
    /// Create a new error with suggestions
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Add a suggestion to the error
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// The error and its suggestions as shown to the user
    pub fn render(&self) -> String {
        let mut out = format!("{} {}", "error:".red().bold(), self.message);

        if !self.suggestions.is_empty() {
            out.push_str(&format!("\n\n{}", "Suggestions:".yellow().bold()));
            for suggestion in &self.suggestions {
                out.push_str(&format!("\n  {} {}", "→".blue(), suggestion));
            }
        }
        out
    }

    /// Display the error with suggestions on stderr
    pub fn display(&self) {
        eprintln!("{}", self.render());
    }

    // Common error patterns

    /// Cluster unreachable
    pub fn cluster_unreachable() -> Self {
        Self::new("Could not reach the Kubernetes API server")
            .suggest("Check that the cluster is running: kubectl cluster-info")
            .suggest("Verify the active context with: kubectl config current-context")
            .suggest("Use --context or --kubeconfig to point at another cluster")
    }

    /// Context missing from kubeconfig
    pub fn context_not_found(name: &str) -> Self {
        Self::new(format!("Context '{}' not found in kubeconfig", name))
            .suggest("List available contexts with: kubectl config get-contexts")
    }

    /// Permission denied by the API server
    pub fn permission_denied(operation: &str) -> Self {
        Self::new(format!("Permission denied: {}", operation))
            .suggest("Verify you have list permissions on nodes, pods and persistent volumes")
            .suggest("Check your credentials with: kubectl auth can-i list nodes")
    }

    /// Metrics API not served
    pub fn metrics_unavailable() -> Self {
        Self::new("The metrics API (nodes.metrics.k8s.io) is not available on this cluster")
            .suggest("Install metrics-server: https://github.com/kubernetes-sigs/metrics-server")
            .suggest("Check it is ready with: kubectl top nodes")
    }

    /// Mount requires privileges
    pub fn mount_not_permitted() -> Self {
        Self::new("Mounting NFS exports requires root privileges")
            .suggest("Run check-nfs as root or through sudo")
            .suggest("Make sure the NFS client utilities are installed (nfs-common / nfs-utils)")
    }

    /// Tool not found error
    pub fn tool_not_found(tool: &str, install_hint: &str) -> Self {
        Self::new(format!("Required tool '{}' not found", tool))
            .suggest(install_hint.to_string())
            .suggest("Ensure the tool is in your PATH")
    }
}

/// Helper to display error and exit
pub fn display_error_and_exit(error: ReportError) -> ! {
    error.display();
    std::process::exit(1);
}

/// Convert anyhow error to ReportError when possible
pub fn enhance_error(err: &anyhow::Error) -> ReportError {
    if let Some(report_error) = err.downcast_ref::<ReportError>() {
        return ReportError {
            message: report_error.message.clone(),
            suggestions: report_error.suggestions.clone(),
        };
    }

    let err_str = format!("{:#}", err);
    let lower = err_str.to_lowercase();

    if lower.contains("no context exists") {
        let name = extract_quoted(&err_str, "no context exists with the name: ").unwrap_or("unknown");
        return ReportError::context_not_found(name);
    }

    if lower.contains("nodes.metrics.k8s.io") && (lower.contains("doesn't have a resource type") || lower.contains("the server could not find")) {
        return ReportError::metrics_unavailable();
    }

    if lower.contains("connection refused") || lower.contains("unable to connect") || lower.contains("i/o timeout") {
        return ReportError::cluster_unreachable();
    }

    if lower.contains("unauthorized") || lower.contains("forbidden") {
        return ReportError::permission_denied("cluster query");
    }

    if lower.contains("mount") && (lower.contains("only root") || lower.contains("permission denied") || lower.contains("not permitted")) {
        return ReportError::mount_not_permitted();
    }

    ReportError::new(err_str).suggest("Run with --debug DEBUG for more details")
}

/// Extract a quoted name following a prefix, e.g. `...name: "prod"`
fn extract_quoted<'a>(msg: &'a str, prefix: &str) -> Option<&'a str> {
    let start = msg.find(prefix)? + prefix.len();
    let rest = msg[start..].trim_start_matches('"');
    let end = rest.find('"').unwrap_or(rest.len());
    Some(&rest[..end])
}
