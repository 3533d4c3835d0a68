use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{Image, ProbeTimings, default_database_port};

/// A managed, single-replica MySQL-compatible database instance.
///
/// At most one [`crate::PlatformCluster`] may hold the claim recorded in
/// `status.cluster_ref`; see the binding manager for the claim protocol.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "platform.example.io",
    version = "v1",
    kind = "DatabaseServer",
    plural = "databaseservers",
    derive = "PartialEq",
    status = "DatabaseServerStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.phase\", \"name\": \"PHASE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.clusterRef.name\", \"name\": \"CLAIMED-BY\", \"type\": \"string\" }"
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseServerSpec {
    pub image: Image,
    #[serde(default)]
    pub image_pull_policy: Option<String>,
    #[serde(default = "default_database_port")]
    pub port: i32,
    #[serde(default)]
    pub probe_timings: ProbeTimings,
    #[serde(default)]
    pub storage_class_name: Option<String>,
    #[serde(default)]
    pub storage_size: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema, Default)]
pub enum DatabaseServerPhase {
    #[default]
    Unclaimed,
    Claimed,
    Terminating,
}

/// A back-reference to the single PlatformCluster permitted to claim this
/// DatabaseServer. This is the authoritative claim record (see §4.1).
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct ClusterRef {
    pub name: String,
    pub namespace: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseServerStatus {
    #[serde(default)]
    pub phase: DatabaseServerPhase,
    #[serde(default)]
    pub cluster_ref: Option<ClusterRef>,
    #[serde(default)]
    pub last_updated: Option<k8s_openapi::apimachinery::pkg::apis::meta::v1::Time>,
}
