//! Resource-binding & finalizer manager (§4.1): keeps the DatabaseServer ↔
//! PlatformCluster claim consistent and serializes teardown so drain always
//! precedes data loss.

pub mod actions;
pub mod claim;
pub mod reconcile;

/// Finalizer held on a DatabaseServer while a PlatformCluster claims it.
pub const CLUSTER_FINALIZER: &str = "cluster.finalizers.platform.example.io";
/// Finalizer held on a PlatformCluster while any worker shard may still
/// hold in-flight tasks.
pub const DRAIN_FINALIZER: &str = "waitNodeTasks.finalizers.platform.example.io";

pub use reconcile::run;
