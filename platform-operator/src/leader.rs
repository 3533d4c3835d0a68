//! Shared leader-election + controller-lifecycle runner.
//!
//! The teacher's own two controllers (`clusters::reconcile::run` and
//! `shards::reconcile::run`) each implemented this loop by hand, nearly
//! identically: acquire-or-renew a Lease every `renew_every`, spawn the
//! `kube_runtime::Controller` task while leading, abort it on leadership
//! loss or shutdown. Our operator runs four such controllers, so the loop
//! is factored once here instead of copy-pasted a third and fourth time.

use kube::Client;
use kube_leader_election::{LeaseLock, LeaseLockParams, LeaseLockResult};
use owo_colors::OwoColorize;
use std::future::Future;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::util::colors::{FG1, FG2};

/// Runs `spawn_controller` only while this process holds the named Lease,
/// renewing on `renew_every` and aborting the controller task on
/// leadership loss or on `shutdown` being cancelled.
pub async fn run_leader_elected<F, Fut>(
    client: Client,
    lease_namespace: &str,
    controller_label: &str,
    shutdown: CancellationToken,
    spawn_controller: F,
) where
    F: Fn(Client) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let holder_id = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("platform-operator-{}", uuid::Uuid::new_v4()));
    let lease_name = format!("platform-operator-{controller_label}-lock");
    let lease_ttl = Duration::from_secs(15);
    let renew_every = Duration::from_secs(5);
    let leadership = LeaseLock::new(
        client.clone(),
        lease_namespace,
        LeaseLockParams {
            holder_id,
            lease_name,
            lease_ttl,
        },
    );

    let mut controller_task: Option<tokio::task::JoinHandle<()>> = None;
    let mut tick = tokio::time::interval(renew_every);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                if let Some(task) = controller_task.take() {
                    task.abort();
                    task.await.ok();
                }
                return;
            }
            _ = tick.tick() => {}
        }

        let lease = match leadership.try_acquire_or_renew().await {
            Ok(l) => l,
            Err(e) => {
                eprintln!("{controller_label}: leader election renew/acquire failed: {e}");
                if let Some(task) = controller_task.take() {
                    task.abort();
                    eprintln!("{controller_label}: aborted controller due to leader election error");
                }
                continue;
            }
        };

        if matches!(lease, LeaseLockResult::Acquired(_)) {
            if controller_task.is_none() {
                println!(
                    "{}",
                    format!("{controller_label}: acquired leadership; starting controller")
                        .color(FG2)
                );
                let client_for_controller = client.clone();
                controller_task = Some(tokio::spawn(async move {
                    println!("{}", format!("{controller_label}: controller started").color(FG1));
                    spawn_controller(client_for_controller).await;
                }));
            }
        } else if let Some(task) = controller_task.take() {
            eprintln!("{controller_label}: lost leadership; stopping controller");
            task.abort();
        }
    }
}
