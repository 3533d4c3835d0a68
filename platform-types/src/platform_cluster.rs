use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{DatabaseServerRef, Image, IngressSettings, VolumeClaimDeletePolicy};
use crate::node_set::NodeSet;

/// A declarative request for N shards of JVM workers bound to one
/// [`crate::DatabaseServer`].
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "platform.example.io",
    version = "v1",
    kind = "PlatformCluster",
    plural = "platformclusters",
    derive = "PartialEq",
    status = "PlatformClusterStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.lastUpdated\", \"name\": \"AGE\", \"type\": \"date\" }"
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformClusterSpec {
    pub image: Image,
    #[serde(default)]
    pub image_pull_policy: Option<String>,
    #[serde(default)]
    pub max_client_body_size: Option<String>,
    #[serde(default)]
    pub extra_env: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub config_map_name: Option<String>,
    pub app_database_ref: DatabaseServerRef,
    /// Logical (schema) name of the application database on the server
    /// referenced by `app_database_ref`.
    pub app_database_name: String,
    #[serde(default)]
    pub stats_database_ref: Option<DatabaseServerRef>,
    #[serde(default)]
    pub stats_database_name: Option<String>,
    #[serde(default)]
    pub ingress: Option<IngressSettings>,
    #[serde(default)]
    pub pvc_delete_policy: Option<VolumeClaimDeletePolicy>,
    #[serde(default = "default_node_termination_period_secs")]
    pub node_termination_period_secs: i64,
    /// At least one NodeSet is required; ordering is significant (see §4.2
    /// "Ordering across NodeSets").
    pub node_sets: Vec<NodeSet>,
}

fn default_node_termination_period_secs() -> i64 {
    30
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema, Default)]
pub enum PlatformClusterPhase {
    #[default]
    Pending,
    Reconciling,
    Draining,
    Ready,
    Error,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformClusterStatus {
    #[serde(default)]
    pub phase: PlatformClusterPhase,
    #[serde(default)]
    pub message: Option<String>,
    /// Names of worker nodes observed to exist. Declared but intentionally
    /// left unpopulated by the core (see the status-subresource design note);
    /// kept here so the field shape matches what a future status-writer
    /// would need.
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub last_updated: Option<Time>,
}

impl PlatformClusterSpec {
    /// The prefix every derived NodeSet pod-name and `job_node.node_name`
    /// row shares, used by `DisableAllJobs`'s `LIKE` query (§4.4).
    pub fn node_name_prefix(cluster_basename: &str) -> String {
        format!("{cluster_basename}-node-")
    }
}
