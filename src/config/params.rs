//! Custom `-p:key=value` parameters

use thiserror::Error;

const KNOWN_KEYS: &[&str] = &["namespace", "selector", "mount_options"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParamError {
    #[error("parameter '{0}' is not of the form key=value")]
    MissingValue(String),

    #[error("parameter '{0}' has an empty key")]
    EmptyKey(String),

    #[error("unknown parameter '{key}' (known: {known})")]
    UnknownKey { key: String, known: String },
}

/// Task parameters passed with `-p`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    /// Restrict pod and claim queries to one namespace
    pub namespace: Option<String>,

    /// Label selector applied to `kubectl get nodes`
    pub selector: Option<String>,

    /// Options passed to `mount -o` by check-nfs
    pub mount_options: Option<String>,
}

impl Params {
    /// Parse raw `-p` values; the leading `:` of `-p:key=value` is optional
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, ParamError> {
        let mut params = Params::default();

        for item in raw {
            let item = item.as_ref();
            let body = item.strip_prefix(':').unwrap_or(item);
            let (key, value) = body
                .split_once('=')
                .ok_or_else(|| ParamError::MissingValue(item.to_string()))?;

            let key = key.trim().replace('-', "_");
            if key.is_empty() {
                return Err(ParamError::EmptyKey(item.to_string()));
            }
            let value = value.trim().to_string();

            match key.as_str() {
                "namespace" => params.namespace = Some(value),
                "selector" => params.selector = Some(value),
                "mount_options" => params.mount_options = Some(value),
                _ => {
                    return Err(ParamError::UnknownKey {
                        key,
                        known: KNOWN_KEYS.join(", "),
                    });
                }
            }
        }

        Ok(params)
    }
}
