use futures::stream::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    Api, ResourceExt,
    api::{DeleteParams, ListParams, Patch, PatchParams, PostParams},
    client::Client,
    runtime::{Controller, controller::Action},
};
use owo_colors::OwoColorize;
use platform_types::*;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

use super::diff::{self, DesiredStatefulSet, ObservedStatefulSet};
use super::manifest;
use crate::util::{Error, MANAGER_NAME, PROBE_INTERVAL, colors::FG1};

#[cfg(feature = "metrics")]
use crate::util::metrics::ControllerMetrics;

pub async fn run(client: Client, lease_namespace: &str, shutdown: CancellationToken) {
    let context = Arc::new(ContextData::new(client.clone()));
    let namespace = lease_namespace.to_owned();
    crate::leader::run_leader_elected(client, lease_namespace, "nodeset", shutdown, move |client| {
        let context = context.clone();
        let namespace = namespace.clone();
        async move {
            let api: Api<PlatformCluster> = Api::namespaced(client.clone(), &namespace);
            Controller::new(api, Default::default())
                .owns(
                    Api::<StatefulSet>::namespaced(client.clone(), &namespace),
                    Default::default(),
                )
                .owns(Api::<Service>::namespaced(client, &namespace), Default::default())
                .run(reconcile, on_error, context)
                .for_each(|_res| async move {})
                .await;
        }
    })
    .await;
}

struct ContextData {
    client: Client,
    #[cfg(feature = "metrics")]
    metrics: ControllerMetrics,
}

impl ContextData {
    fn new(client: Client) -> Self {
        #[cfg(feature = "metrics")]
        let metrics = ControllerMetrics::new("nodeset");
        #[cfg(feature = "metrics")]
        metrics.register(prometheus::default_registry());
        Self {
            client,
            #[cfg(feature = "metrics")]
            metrics,
        }
    }
}

/// Outcome of processing one NodeSet, used to decide whether the outer
/// loop should stop and defer the remaining NodeSets (§4.2 "Ordering
/// across NodeSets").
#[derive(Debug, PartialEq, Eq)]
enum StepOutcome {
    Settled,
    Settling,
}

async fn reconcile(instance: Arc<PlatformCluster>, context: Arc<ContextData>) -> Result<Action, Error> {
    let client = context.client.clone();
    let namespace = instance
        .namespace()
        .ok_or_else(|| Error::UserInput("PlatformCluster must be namespaced".to_owned()))?;

    if instance.metadata.deletion_timestamp.is_some() {
        // Teardown is driven entirely by the binding manager; this
        // controller only materializes/updates while the cluster is alive.
        return Ok(Action::await_change());
    }

    #[cfg(feature = "metrics")]
    context
        .metrics
        .reconcile_counter
        .with_label_values(&[&instance.name_any(), &namespace])
        .inc();

    // The binding manager owns claim resolution and sets `phase == Ready`
    // only once the claim CAS has landed and both finalizers are present
    // (§5 "Claim ... precedes any child creation"). Until then, no
    // StatefulSet/Service may be created for this cluster.
    let ready = instance
        .status
        .as_ref()
        .map(|s| s.phase == PlatformClusterPhase::Ready)
        .unwrap_or(false);
    if !ready {
        return Ok(Action::requeue(PROBE_INTERVAL));
    }

    let mut outcome = StepOutcome::Settled;
    for nodeset in &instance.spec.node_sets {
        let step = reconcile_nodeset(client.clone(), &namespace, &instance, nodeset).await?;
        if step == StepOutcome::Settling {
            outcome = StepOutcome::Settling;
            break;
        }
    }

    match outcome {
        StepOutcome::Settling => Ok(Action::requeue(Duration::from_secs(2))),
        StepOutcome::Settled => Ok(Action::requeue(PROBE_INTERVAL)),
    }
}

async fn reconcile_nodeset(
    client: Client,
    namespace: &str,
    cluster: &PlatformCluster,
    nodeset: &NodeSet,
) -> Result<StepOutcome, Error> {
    let cluster_name = cluster.name_any();
    let statefulset_name = NodeSet::statefulset_name(&cluster_name, &nodeset.name);
    let sts_api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);

    let existing = match sts_api.get_opt(&statefulset_name).await? {
        Some(sts) => sts,
        None => {
            let desired = manifest::statefulset(cluster, nodeset);
            sts_api.create(&PostParams::default(), &desired).await?;
            ensure_service(client, namespace, cluster, nodeset).await?;
            println!("{}", format!("{namespace}/{cluster_name}: created StatefulSet '{statefulset_name}'").color(FG1));
            return Ok(StepOutcome::Settling);
        }
    };

    let observed = ObservedStatefulSet {
        replicas: existing.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
        image: existing
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|p| p.containers.first())
            .and_then(|c| c.image.clone())
            .unwrap_or_default(),
        image_pull_policy: existing
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|p| p.containers.first())
            .and_then(|c| c.image_pull_policy.clone()),
        termination_grace_period_secs: existing
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|p| p.termination_grace_period_seconds)
            .unwrap_or(30),
    };
    let desired = DesiredStatefulSet {
        replicas: nodeset.count,
        image: cluster.spec.image.reference(),
        image_pull_policy: cluster.spec.image_pull_policy.clone(),
        termination_grace_period_secs: cluster.spec.node_termination_period_secs,
    };

    let change = diff::diff_statefulset(&observed, &desired);
    if change.is_empty() {
        ensure_service(client, namespace, cluster, nodeset).await?;
        return Ok(StepOutcome::Settled);
    }

    let patch = serde_json::json!({
        "spec": {
            "replicas": desired.replicas,
            "template": {
                "spec": {
                    "terminationGracePeriodSeconds": desired.termination_grace_period_secs,
                    "containers": [{
                        "name": manifest::WORKER_CONTAINER_NAME,
                        "image": desired.image,
                        "imagePullPolicy": desired.image_pull_policy,
                    }]
                }
            }
        }
    });
    sts_api
        .patch(&statefulset_name, &PatchParams::apply(MANAGER_NAME), &Patch::Apply(&patch))
        .await?;

    if let Some(new_count) = change.replicas
        && observed.replicas > new_count
        && matches!(
            cluster.spec.pvc_delete_policy,
            Some(VolumeClaimDeletePolicy::DeleteOnScaledownOnly)
                | Some(VolumeClaimDeletePolicy::DeleteOnScaledownAndClusterDeletion)
        )
    {
        reclaim_pvcs(&client, namespace, &statefulset_name, observed.replicas, new_count).await;
    }

    Ok(StepOutcome::Settling)
}

/// Volume-claim-template name used by `manifest::statefulset`'s future PVC
/// template, matching the original controller's single data volume.
const NODE_PVC_TEMPLATE_NAME: &str = "data";

async fn reclaim_pvcs(client: &Client, namespace: &str, statefulset_name: &str, old_count: i32, new_count: i32) {
    let pvc_api: Api<PersistentVolumeClaim> = Api::namespaced(client.clone(), namespace);
    for ordinal in diff::pvcs_to_reclaim(old_count, new_count) {
        let pvc_name = NodeSet::pvc_name(NODE_PVC_TEMPLATE_NAME, statefulset_name, ordinal);
        match pvc_api.delete(&pvc_name, &DeleteParams::default()).await {
            Ok(_) => {}
            Err(kube::Error::Api(e)) if e.code == 404 => {
                eprintln!("PVC '{pvc_name}' not found during scale-down reclaim; skipping");
            }
            Err(e) => eprintln!("failed to delete PVC '{pvc_name}': {e}"),
        }
    }
}

async fn ensure_service(
    client: Client,
    namespace: &str,
    cluster: &PlatformCluster,
    nodeset: &NodeSet,
) -> Result<(), Error> {
    let cluster_name = cluster.name_any();
    let name = NodeSet::statefulset_name(&cluster_name, &nodeset.name);
    let api: Api<Service> = Api::namespaced(client, namespace);
    if api.get_opt(&name).await?.is_some() {
        return Ok(());
    }
    let svc = manifest::service(cluster, nodeset);
    match api.create(&PostParams::default(), &svc).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 409 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Cluster-wide cleanup on deletion (§4.2 "Cluster-wide cleanup"), invoked
/// by the binding manager once drain has completed.
pub async fn cleanup_cluster_resources(
    client: Client,
    namespace: &str,
    cluster: &PlatformCluster,
) -> Result<(), Error> {
    let cluster_name = cluster.name_any();
    let selector = manifest::cluster_labels(&cluster_name)
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");

    let ingresses: Api<Ingress> = Api::namespaced(client.clone(), namespace);
    for ingress in ingresses.list(&ListParams::default().labels(&selector)).await?.items {
        if let Some(name) = ingress.metadata.name {
            ingresses.delete(&name, &DeleteParams::default()).await.ok();
        }
    }

    if matches!(
        cluster.spec.pvc_delete_policy,
        Some(VolumeClaimDeletePolicy::DeleteOnScaledownAndClusterDeletion)
    ) {
        let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(client, namespace);
        for pvc in pvcs.list(&ListParams::default().labels(&selector)).await?.items {
            if let Some(name) = pvc.metadata.name {
                pvcs.delete(&name, &DeleteParams::default()).await.ok();
            }
        }
    }

    Ok(())
}

fn on_error(instance: Arc<PlatformCluster>, error: &Error, _context: Arc<ContextData>) -> Action {
    eprintln!(
        "{}",
        format!("nodeset reconcile error: {error:?} ({:?})", instance.name_any()).red()
    );
    let backoff = if error.is_retryable() { Duration::from_secs(5) } else { Duration::from_secs(60) };
    Action::requeue(backoff)
}
