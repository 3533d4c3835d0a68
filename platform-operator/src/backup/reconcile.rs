use futures::stream::StreamExt;
use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec, Volume};
use kube::{
    Api, ResourceExt,
    api::{ObjectMeta, PostParams},
    client::Client,
    runtime::{Controller, controller::Action},
};
use owo_colors::OwoColorize;
use platform_types::{DatabaseBackup, DatabaseBackupSpec};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::db;
use crate::util::{Error, PROBE_INTERVAL};

#[cfg(feature = "metrics")]
use crate::util::metrics::ControllerMetrics;

pub async fn run(client: Client, lease_namespace: &str, shutdown: CancellationToken) {
    let context = Arc::new(ContextData::new(client.clone()));
    let namespace = lease_namespace.to_owned();
    crate::leader::run_leader_elected(client, lease_namespace, "backup", shutdown, move |client| {
        let context = context.clone();
        let namespace = namespace.clone();
        async move {
            let api: Api<DatabaseBackup> = Api::namespaced(client, &namespace);
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
}

impl ContextData {
    fn new(client: Client) -> Self {
        #[cfg(feature = "metrics")]
        let metrics = ControllerMetrics::new("backup");
        #[cfg(feature = "metrics")]
        metrics.register(prometheus::default_registry());
        Self {
            client,
            #[cfg(feature = "metrics")]
            metrics,
        }
    }
}

/// Ensure-exists-only reconciler (§11.1): no diff/update loop and no
/// finalizer, since deleting a DatabaseBackup simply lets Kubernetes
/// garbage-collect its owned CronJob.
async fn reconcile(instance: Arc<DatabaseBackup>, context: Arc<ContextData>) -> Result<Action, Error> {
    let namespace = instance
        .namespace()
        .ok_or_else(|| Error::UserInput("DatabaseBackup must be namespaced".to_owned()))?;

    #[cfg(feature = "metrics")]
    context
        .metrics
        .reconcile_counter
        .with_label_values(&[&instance.name_any(), &namespace])
        .inc();

    // Resolved only to validate the reference resolves; the connection
    // itself is the backup image's job, not the controller's (§11.1).
    db::resolve_connection_info(&context.client, &instance.spec.database_server_ref, &namespace).await?;

    let name = DatabaseBackupSpec::base_name(&instance.name_any());
    let api: Api<CronJob> = Api::namespaced(context.client.clone(), &namespace);
    if api.get_opt(&name).await?.is_some() {
        return Ok(Action::requeue(PROBE_INTERVAL));
    }

    let cronjob = build_cronjob(&name, &instance);
    match api.create(&PostParams::default(), &cronjob).await {
        Ok(_) => {
            println!("{}", format!("{namespace}/{name}: created backup CronJob").green());
        }
        Err(kube::Error::Api(e)) if e.code == 409 => {}
        Err(e) => return Err(e.into()),
    }

    Ok(Action::requeue(PROBE_INTERVAL))
}

fn build_cronjob(name: &str, instance: &DatabaseBackup) -> CronJob {
    let container = Container {
        name: "db-backup".to_owned(),
        image: Some(instance.spec.image.reference()),
        image_pull_policy: instance.spec.image_pull_policy.clone(),
        volume_mounts: Some(vec![k8s_openapi::api::core::v1::VolumeMount {
            name: "backup-data".to_owned(),
            mount_path: "/backup".to_owned(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    CronJob {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: instance.namespace(),
            owner_references: Some(vec![instance.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: Some(CronJobSpec {
            schedule: instance.spec.schedule.clone(),
            job_template: JobTemplateSpec {
                spec: Some(JobSpec {
                    template: PodTemplateSpec {
                        spec: Some(PodSpec {
                            containers: vec![container],
                            restart_policy: Some("OnFailure".to_owned()),
                            volumes: Some(vec![Volume {
                                name: "backup-data".to_owned(),
                                ..instance.spec.target_volume.clone()
                            }]),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }),
        status: None,
    }
}

fn on_error(instance: Arc<DatabaseBackup>, error: &Error, _context: Arc<ContextData>) -> Action {
    eprintln!(
        "{}",
        format!("backup reconcile error: {error:?} ({:?})", instance.name_any()).red()
    );
    let backoff = if error.is_retryable() { Duration::from_secs(5) } else { Duration::from_secs(60) };
    Action::requeue(backoff)
}
