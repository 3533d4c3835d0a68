//! NodeSet rollout controller (§4.2): materializes, updates, scales and
//! tears down the StatefulSet/Service pair backing each NodeSet.

pub mod diff;
pub mod manifest;
pub mod reconcile;

pub use manifest::WORKER_CONTAINER_NAME;
pub use reconcile::{cleanup_cluster_resources, run};
