use futures::stream::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    Api, ResourceExt,
    api::ListParams,
    client::Client,
    runtime::{Controller, controller::Action},
};
use owo_colors::OwoColorize;
use platform_types::*;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::adjust;
use super::metric_store::MetricStore;
use super::metrics_api::{self, PodMetrics};
use crate::db;
use crate::nodeset::manifest::selector_labels;
use crate::util::Error;

#[cfg(feature = "metrics")]
use crate::util::metrics::ControllerMetrics;

/// The autoscaler is never driven by a fixed wall-clock timer beyond its
/// own self-requeue (§4.3 "Scheduling model").
const REQUEUE_INTERVAL: Duration = Duration::from_secs(10);

pub async fn run(client: Client, lease_namespace: &str, shutdown: CancellationToken) {
    let context = Arc::new(ContextData::new(client.clone()));
    let namespace = lease_namespace.to_owned();
    crate::leader::run_leader_elected(client, lease_namespace, "autoscaler", shutdown, move |client| {
        let context = context.clone();
        let namespace = namespace.clone();
        async move {
            let api: Api<TaskAutoscaler> = Api::namespaced(client, &namespace);
            Controller::new(api, Default::default())
                .run(reconcile, on_error, context)
                .for_each(|_res| async move {})
                .await;
        }
    })
    .await;
}

struct ContextData {
    client: Client,
    store: Mutex<MetricStore>,
    #[cfg(feature = "metrics")]
    metrics: ControllerMetrics,
}

impl ContextData {
    fn new(client: Client) -> Self {
        #[cfg(feature = "metrics")]
        let metrics = ControllerMetrics::new("autoscaler");
        #[cfg(feature = "metrics")]
        metrics.register(prometheus::default_registry());
        Self {
            client,
            store: Mutex::new(MetricStore::new()),
            #[cfg(feature = "metrics")]
            metrics,
        }
    }
}

async fn reconcile(instance: Arc<TaskAutoscaler>, context: Arc<ContextData>) -> Result<Action, Error> {
    let namespace = instance
        .namespace()
        .ok_or_else(|| Error::UserInput("TaskAutoscaler must be namespaced".to_owned()))?;

    if let Err(reason) = instance.spec.validate() {
        eprintln!(
            "{}",
            format!("{namespace}/{}: invalid TaskAutoscaler spec: {reason}", instance.name_any()).red()
        );
        return Ok(Action::await_change());
    }

    #[cfg(feature = "metrics")]
    context
        .metrics
        .reconcile_counter
        .with_label_values(&[&instance.name_any(), &namespace])
        .inc();

    let cluster_namespace = instance.spec.cluster_ref.namespace_or(&namespace);
    let clusters: Api<PlatformCluster> = Api::namespaced(context.client.clone(), cluster_namespace);
    let cluster = match clusters.get_opt(&instance.spec.cluster_ref.name).await? {
        Some(cluster) => cluster,
        None => {
            eprintln!(
                "{}",
                format!(
                    "{namespace}/{}: referenced PlatformCluster '{}' not found",
                    instance.name_any(),
                    instance.spec.cluster_ref.name
                )
                .red()
            );
            return Ok(Action::requeue(REQUEUE_INTERVAL));
        }
    };
    let cluster_name = cluster.name_any();

    let now = Instant::now();
    for nodeset in cluster.spec.node_sets.iter().filter(|n| n.runs_tasks()) {
        reconcile_nodeset(&context, &cluster, &cluster_name, cluster_namespace, nodeset, &instance, now).await?;
    }

    Ok(Action::requeue(REQUEUE_INTERVAL))
}

async fn reconcile_nodeset(
    context: &ContextData,
    cluster: &PlatformCluster,
    cluster_name: &str,
    cluster_namespace: &str,
    nodeset: &NodeSet,
    autoscaler: &TaskAutoscaler,
    now: Instant,
) -> Result<(), Error> {
    let Some(limit_millicores) = nodeset.cpu_limit_millicores() else {
        return Ok(());
    };

    let labels = selector_labels(cluster_name, &nodeset.name);
    let selector = labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");
    let pods: Api<Pod> = Api::namespaced(context.client.clone(), cluster_namespace);
    let metrics_api: Api<PodMetrics> = Api::namespaced(context.client.clone(), cluster_namespace);

    for pod in pods.list(&ListParams::default().labels(&selector)).await?.items {
        let pod_name = pod.name_any();
        let pod_metrics = match metrics_api.get_opt(&pod_name).await {
            Ok(Some(m)) => m,
            Ok(None) => {
                context.store.lock().await.purge(&pod_name);
                continue;
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {
                context.store.lock().await.purge(&pod_name);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let Some(cpu) = pod_metrics
            .containers
            .iter()
            .find(|c| c.name == crate::nodeset::WORKER_CONTAINER_NAME)
            .and_then(|c| metrics_api::cpu_millicores(&c.usage.cpu))
        else {
            continue;
        };

        let mut store = context.store.lock().await;
        store.record_sample(&pod_name, now, cpu);

        if store.start_cooldown_if_new(&pod_name, now) {
            continue;
        }

        let interval = Duration::from_secs((autoscaler.spec.adjustment_interval_mins.max(1) as u64) * 60);
        if !store.due_for_adjustment(&pod_name, now, interval) {
            continue;
        }

        let window = Duration::from_secs((autoscaler.spec.metrics_sliding_window_mins.max(1) as u64) * 60);
        let Some(avg) = store.sliding_window_mean(&pod_name, now, window) else {
            continue;
        };
        store.mark_scaled(&pod_name, now);
        drop(store);

        let cpu_pct = adjust::cpu_percent(avg, limit_millicores);
        if adjust::in_band(cpu_pct, &autoscaler.spec) {
            continue;
        }

        apply_adjustment(context, cluster, cluster_namespace, &pod_name, cpu_pct, autoscaler).await?;
    }

    Ok(())
}

async fn apply_adjustment(
    context: &ContextData,
    cluster: &PlatformCluster,
    cluster_namespace: &str,
    node_name: &str,
    cpu_pct: i64,
    autoscaler: &TaskAutoscaler,
) -> Result<(), Error> {
    let connection_info =
        db::resolve_connection_info(&context.client, &cluster.spec.app_database_ref, cluster_namespace).await?;
    let pool = db::open(&context.client, &connection_info, cluster_namespace, &cluster.spec.app_database_name).await?;

    let (current_limit, active_tasks) =
        db::read_node_task_state(&pool, node_name, &autoscaler.spec.task_name).await?;
    let new_limit = adjust::new_task_limit(cpu_pct, current_limit as i64, active_tasks, &autoscaler.spec);

    if new_limit as i32 != current_limit {
        db::write_node_task_limit(&pool, node_name, &autoscaler.spec.task_name, new_limit as i32).await?;
        println!(
            "{}",
            format!(
                "{cluster_namespace}/{}: adjusted '{node_name}' task_limit {current_limit} -> {new_limit} (cpu {cpu_pct}%)",
                cluster.name_any()
            )
            .green()
        );
    }

    pool.close().await;
    Ok(())
}

fn on_error(instance: Arc<TaskAutoscaler>, error: &Error, _context: Arc<ContextData>) -> Action {
    eprintln!(
        "{}",
        format!("autoscaler reconcile error: {error:?} ({:?})", instance.name_any()).red()
    );
    let backoff = if error.is_retryable() { Duration::from_secs(5) } else { Duration::from_secs(60) };
    Action::requeue(backoff)
}
