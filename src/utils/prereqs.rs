//! Prerequisite checking system for required tools

use crate::utils::errors::ReportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrereqError {
    #[error("Tool '{name}' not found")]
    NotFound { name: String, hint: String },
}

impl From<PrereqError> for ReportError {
    fn from(err: PrereqError) -> Self {
        match err {
            PrereqError::NotFound { name, hint } => ReportError::tool_not_found(&name, &hint),
        }
    }
}

/// Trait for checking prerequisites
pub trait Prerequisite {
    /// Name of the prerequisite tool
    fn name(&self) -> &str;

    /// Check if the tool is available
    fn check(&self) -> Result<(), PrereqError>;

    /// Installation hint for the user
    fn install_hint(&self) -> &str;
}

/// Basic prerequisite that checks if a command exists
pub struct CommandPrereq {
    pub name: String,
    pub hint: String,
}

impl CommandPrereq {
    pub fn new(name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hint: hint.into(),
        }
    }
}

impl Prerequisite for CommandPrereq {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<(), PrereqError> {
        which::which(&self.name).map_err(|_| PrereqError::NotFound {
            name: self.name.clone(),
            hint: self.hint.clone(),
        })?;
        Ok(())
    }

    fn install_hint(&self) -> &str {
        &self.hint
    }
}

/// Common prerequisites for kube-report
pub struct CommonPrereqs;

impl CommonPrereqs {
    /// Get kubectl prerequisite
    pub fn kubectl() -> CommandPrereq {
        CommandPrereq::new(
            "kubectl",
            "Install from: https://kubernetes.io/docs/tasks/tools/",
        )
    }

    /// Get mount prerequisite
    pub fn mount() -> CommandPrereq {
        CommandPrereq::new("mount", "Install util-linux with your package manager")
    }

    /// Get umount prerequisite
    pub fn umount() -> CommandPrereq {
        CommandPrereq::new("umount", "Install util-linux with your package manager")
    }

    /// Get df prerequisite
    pub fn df() -> CommandPrereq {
        CommandPrereq::new("df", "Install coreutils with your package manager")
    }

    /// Check all prerequisites and return detailed results
    /// Returns (found_tools, missing_tools)
    pub fn check_all(prereqs: &[&dyn Prerequisite]) -> (Vec<String>, Vec<PrereqError>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for prereq in prereqs {
            match prereq.check() {
                Ok(_) => found.push(prereq.name().to_string()),
                Err(e) => missing.push(e),
            }
        }

        (found, missing)
    }

    /// Fail on the first missing tool
    pub fn require(prereqs: &[&dyn Prerequisite]) -> Result<(), ReportError> {
        let (found, missing) = Self::check_all(prereqs);
        crate::log_debug!("Found tools: {}", found.join(", "));

        match missing.into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
