//! kube-report: node inventory, allocation, live metrics and storage reports
//! gathered through kubectl and printed as CSV, JSON or YAML

pub mod commands;
pub mod config;
pub mod k8s;
pub mod output;
pub mod utils;
