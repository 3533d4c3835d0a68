//! Minimal StatefulSet/Service assembly for a NodeSet. Full manifest
//! fidelity (ConfigMaps, Secrets, Ingress, TLS, JVM flags) is the
//! manifest-assembly collaborator's contract and out of scope (§1); this
//! builds just enough of a PodSpec for the rollout controller to diff and
//! apply against.

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, Probe, ResourceRequirements as K8sResourceRequirements, Service,
    ServiceSpec, TCPSocketAction,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{ObjectMeta, Resource};
use platform_types::{NodeSet, PlatformCluster};
use std::collections::BTreeMap;

use crate::util;
use platform_common::annotations;

pub const WORKER_CONTAINER_NAME: &str = "platform-node";
const WORKER_PORT: i32 = 8080;

pub fn selector_labels(cluster_name: &str, nodeset_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("platform.example.io/cluster".to_owned(), cluster_name.to_owned());
    labels.insert("platform.example.io/nodeset".to_owned(), nodeset_name.to_owned());
    labels
}

pub fn cluster_labels(cluster_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("platform.example.io/cluster".to_owned(), cluster_name.to_owned());
    labels
}

pub fn statefulset(cluster: &PlatformCluster, nodeset: &NodeSet) -> StatefulSet {
    let cluster_name = cluster.meta().name.clone().unwrap_or_default();
    let namespace = cluster.meta().namespace.clone();
    let name = NodeSet::statefulset_name(&cluster_name, &nodeset.name);
    let labels = selector_labels(&cluster_name, &nodeset.name);

    let resources = K8sResourceRequirements {
        requests: Some(quantities(&nodeset.resources.requests)),
        limits: Some(quantities(&nodeset.resources.limits)),
        ..Default::default()
    };

    let container = Container {
        name: WORKER_CONTAINER_NAME.to_owned(),
        image: Some(cluster.spec.image.reference()),
        image_pull_policy: cluster.spec.image_pull_policy.clone(),
        ports: Some(vec![ContainerPort {
            container_port: WORKER_PORT,
            ..Default::default()
        }]),
        resources: Some(resources),
        liveness_probe: Some(probe(nodeset)),
        ..Default::default()
    };

    StatefulSet {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: namespace.clone(),
            labels: Some(labels.clone()),
            owner_references: Some(vec![cluster.controller_owner_ref(&()).unwrap()]),
            annotations: Some(BTreeMap::from([(
                annotations::SPEC_HASH.to_owned(),
                util::hash_spec(nodeset),
            )])),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            replicas: Some(nodeset.count),
            service_name: name,
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: k8s_openapi::api::core::v1::PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(k8s_openapi::api::core::v1::PodSpec {
                    containers: vec![container],
                    termination_grace_period_seconds: Some(cluster.spec.node_termination_period_secs),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

pub fn service(cluster: &PlatformCluster, nodeset: &NodeSet) -> Service {
    let cluster_name = cluster.meta().name.clone().unwrap_or_default();
    let namespace = cluster.meta().namespace.clone();
    let name = NodeSet::statefulset_name(&cluster_name, &nodeset.name);
    let labels = selector_labels(&cluster_name, &nodeset.name);

    Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace,
            labels: Some(labels.clone()),
            owner_references: Some(vec![cluster.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_owned()),
            selector: Some(labels),
            ports: Some(vec![k8s_openapi::api::core::v1::ServicePort {
                port: WORKER_PORT,
                target_port: Some(IntOrString::Int(WORKER_PORT)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

fn probe(nodeset: &NodeSet) -> Probe {
    Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(WORKER_PORT),
            ..Default::default()
        }),
        initial_delay_seconds: Some(nodeset.liveness_probe_timings.initial_delay_seconds),
        period_seconds: Some(nodeset.liveness_probe_timings.period_seconds),
        timeout_seconds: Some(nodeset.liveness_probe_timings.timeout_seconds),
        success_threshold: Some(nodeset.liveness_probe_timings.success_threshold),
        failure_threshold: Some(nodeset.liveness_probe_timings.failure_threshold),
        ..Default::default()
    }
}

fn quantities(
    values: &BTreeMap<String, String>,
) -> BTreeMap<String, k8s_openapi::apimachinery::pkg::api::resource::Quantity> {
    values
        .iter()
        .map(|(k, v)| (k.clone(), k8s_openapi::apimachinery::pkg::api::resource::Quantity(v.clone())))
        .collect()
}
