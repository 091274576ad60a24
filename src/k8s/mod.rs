//! Kubernetes queries through kubectl

pub mod context;
pub mod kubectl;
pub mod models;
pub mod nodes;
pub mod quantity;
