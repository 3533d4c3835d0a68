use futures::stream::StreamExt;
use kube::{
    Api, ResourceExt,
    client::Client,
    runtime::{Controller, controller::Action},
};
use owo_colors::OwoColorize;
use platform_types::*;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::{sync::Mutex, time::Duration};
use tokio_util::sync::CancellationToken;

use super::claim::ClaimOutcome;
use super::{CLUSTER_FINALIZER, DRAIN_FINALIZER, actions};
use crate::util::{
    Error, PROBE_INTERVAL,
    colors::{FG1, FG2},
};
use crate::{db, nodeset};

#[cfg(feature = "metrics")]
use crate::util::metrics::ControllerMetrics;

pub async fn run(client: Client, lease_namespace: &str, shutdown: CancellationToken) {
    let context = Arc::new(ContextData::new(client.clone()));
    let namespace = lease_namespace.to_owned();
    crate::leader::run_leader_elected(client, lease_namespace, "binding", shutdown, move |client| {
        let context = context.clone();
        let namespace = namespace.clone();
        async move {
            let api: Api<PlatformCluster> = Api::namespaced(client, &namespace);
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
    #[cfg(feature = "metrics")]
    metrics: ControllerMetrics,
    last_action: Mutex<HashMap<(String, String), (BindingAction, Instant)>>,
}

impl ContextData {
    fn new(client: Client) -> Self {
        #[cfg(feature = "metrics")]
        let metrics = ControllerMetrics::new("binding");
        #[cfg(feature = "metrics")]
        metrics.register(prometheus::default_registry());
        Self {
            client,
            #[cfg(feature = "metrics")]
            metrics,
            last_action: Mutex::new(HashMap::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BindingAction {
    ClaimConflict { holder: String },
    EnsureBound,
    Draining { remaining_total: i64 },
    ReleaseAndCleanup,
    NoOp,
}

impl BindingAction {
    fn to_str(&self) -> &str {
        match self {
            BindingAction::ClaimConflict { .. } => "ClaimConflict",
            BindingAction::EnsureBound => "EnsureBound",
            BindingAction::Draining { .. } => "Draining",
            BindingAction::ReleaseAndCleanup => "ReleaseAndCleanup",
            BindingAction::NoOp => "NoOp",
        }
    }
}

async fn reconcile(instance: Arc<PlatformCluster>, context: Arc<ContextData>) -> Result<Action, Error> {
    let client = context.client.clone();
    let namespace = instance
        .namespace()
        .ok_or_else(|| Error::UserInput("PlatformCluster must be namespaced".to_owned()))?;
    let name = instance.name_any();

    #[cfg(feature = "metrics")]
    context
        .metrics
        .reconcile_counter
        .with_label_values(&[&name, &namespace])
        .inc();
    #[cfg(feature = "metrics")]
    let start = std::time::Instant::now();

    let action = determine_action(client.clone(), &namespace, &name, &instance).await?;

    if action != BindingAction::NoOp {
        let mut la = context.last_action.lock().await;
        let previous = la.insert((namespace.clone(), name.clone()), (action.clone(), Instant::now()));
        if previous.map(|(a, _)| a) != Some(action.clone()) {
            println!(
                "{}{}{}{}{}",
                namespace.color(FG2),
                "/".color(FG1),
                name.color(FG2),
                " BINDING ACTION: ".color(FG1),
                format!("{action:?}").color(FG2),
            );
        }
    }

    #[cfg(feature = "metrics")]
    context
        .metrics
        .read_histogram
        .with_label_values(&[&name, &namespace, action.to_str()])
        .observe(start.elapsed().as_secs_f64());
    #[cfg(feature = "metrics")]
    context
        .metrics
        .action_counter
        .with_label_values(&[&name, &namespace, action.to_str()])
        .inc();

    let result = match action {
        BindingAction::ClaimConflict { holder } => {
            actions::set_claim_conflict(client, &instance, &holder).await?;
            Action::requeue(Duration::from_secs(300))
        }
        BindingAction::EnsureBound => {
            ensure_bound(client, &namespace, &name, &instance).await?;
            Action::requeue(PROBE_INTERVAL)
        }
        BindingAction::Draining { remaining_total } => {
            println!(
                "{}",
                format!("{namespace}/{name}: draining, {remaining_total} task(s) still in-flight").color(FG1)
            );
            Action::requeue(PROBE_INTERVAL)
        }
        BindingAction::ReleaseAndCleanup => {
            release_and_cleanup(client, &namespace, &name, &instance).await?;
            Action::await_change()
        }
        BindingAction::NoOp => Action::requeue(PROBE_INTERVAL),
    };

    Ok(result)
}

async fn determine_action(
    client: Client,
    namespace: &str,
    name: &str,
    instance: &PlatformCluster,
) -> Result<BindingAction, Error> {
    if instance.metadata.deletion_timestamp.is_some() {
        let finalizers = instance.finalizers();
        if finalizers.is_empty() {
            return Ok(BindingAction::NoOp);
        }

        let prefix = PlatformClusterSpec::node_name_prefix(name);
        let conn = db::resolve_connection_info(&client, &instance.spec.app_database_ref, namespace).await?;
        let pool = db::open(&client, &conn, namespace, &instance.spec.app_database_name).await?;
        db::disable_all_jobs(&pool, &prefix).await?;
        let remaining = db::count_active_tasks(&pool, &prefix).await?;
        let total: i64 = remaining.values().sum();
        if total > 0 {
            return Ok(BindingAction::Draining { remaining_total: total });
        }
        return Ok(BindingAction::ReleaseAndCleanup);
    }

    if let Some(server_ref) = &instance.spec.app_database_ref.server_ref {
        let db_namespace = server_ref.namespace_or(namespace);
        let api: Api<DatabaseServer> = Api::namespaced(client, db_namespace);
        let observed = api.get(&server_ref.name).await?;
        let current = observed.status.as_ref().and_then(|s| s.cluster_ref.clone());
        let outcome = crate::binding::claim::evaluate_claim(&current, namespace, name);
        if let ClaimOutcome::Conflict { holder } = outcome {
            return Ok(BindingAction::ClaimConflict {
                holder: actions::describe(&holder),
            });
        }
    }

    Ok(BindingAction::EnsureBound)
}

async fn ensure_bound(
    client: Client,
    namespace: &str,
    name: &str,
    instance: &PlatformCluster,
) -> Result<(), Error> {
    if let Some(server_ref) = &instance.spec.app_database_ref.server_ref {
        let db_namespace = server_ref.namespace_or(namespace);
        let outcome =
            actions::claim_database_server(client.clone(), db_namespace, &server_ref.name, namespace, name)
                .await?;
        if let ClaimOutcome::Conflict { holder } = outcome {
            actions::set_claim_conflict(client.clone(), instance, &actions::describe(&holder)).await?;
            return Ok(());
        }
        let db_api: Api<DatabaseServer> = Api::namespaced(client.clone(), db_namespace);
        crate::util::finalizer::ensure_present(&db_api, &server_ref.name, CLUSTER_FINALIZER).await?;
    }

    let cluster_api: Api<PlatformCluster> = Api::namespaced(client.clone(), namespace);
    crate::util::finalizer::ensure_present(&cluster_api, name, DRAIN_FINALIZER).await?;

    actions::set_bound(client, instance).await?;
    Ok(())
}

async fn release_and_cleanup(
    client: Client,
    namespace: &str,
    name: &str,
    instance: &PlatformCluster,
) -> Result<(), Error> {
    let cluster_api: Api<PlatformCluster> = Api::namespaced(client.clone(), namespace);
    crate::util::finalizer::ensure_absent(&cluster_api, name, DRAIN_FINALIZER).await?;

    if let Some(server_ref) = &instance.spec.app_database_ref.server_ref {
        let db_namespace = server_ref.namespace_or(namespace);
        actions::release_database_server(client.clone(), db_namespace, &server_ref.name).await?;
        let db_api: Api<DatabaseServer> = Api::namespaced(client.clone(), db_namespace);
        crate::util::finalizer::ensure_absent(&db_api, &server_ref.name, CLUSTER_FINALIZER).await?;
    }

    nodeset::cleanup_cluster_resources(client, namespace, instance).await?;
    Ok(())
}

fn on_error(instance: Arc<PlatformCluster>, error: &Error, _context: Arc<ContextData>) -> Action {
    eprintln!(
        "{}",
        format!("binding reconcile error: {error:?} ({:?})", instance.name_any()).red()
    );
    let backoff = if error.is_retryable() { Duration::from_secs(5) } else { Duration::from_secs(60) };
    Action::requeue(backoff)
}
