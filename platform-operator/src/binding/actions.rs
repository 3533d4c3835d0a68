use crate::util::{Error, patch_status};
use kube::{Api, Client, api::PostParams};
use platform_types::{ClusterRef, DatabaseServer, PlatformCluster, PlatformClusterPhase};

use super::claim::{ClaimOutcome, evaluate_claim};

/// Claims `database_server` for `(claimant_namespace, claimant_name)` if it
/// is currently unclaimed. The write is a `replace_status` of the object as
/// observed immediately before: the object carries the `resourceVersion` it
/// was read with, so the API server rejects the write with a conflict if
/// another claimant's write landed first — the compare-and-set guard
/// required by §4.1 step 1. Returns the outcome that was observed.
pub async fn claim_database_server(
    client: Client,
    namespace: &str,
    database_server_name: &str,
    claimant_namespace: &str,
    claimant_name: &str,
) -> Result<ClaimOutcome, Error> {
    let api: Api<DatabaseServer> = Api::namespaced(client, namespace);
    let mut observed = api.get(database_server_name).await?;
    let current_ref = observed.status.as_ref().and_then(|s| s.cluster_ref.clone());
    let outcome = evaluate_claim(&current_ref, claimant_namespace, claimant_name);

    if let ClaimOutcome::ShouldClaim(new_ref) = &outcome {
        let status = observed.status.get_or_insert_with(Default::default);
        status.cluster_ref = Some(new_ref.clone());
        let body = serde_json::to_vec(&observed)?;
        api.replace_status(database_server_name, &PostParams::default(), body)
            .await?;
    }

    Ok(outcome)
}

/// Releases the claim held on `database_server`, if any. A missing
/// DatabaseServer is tolerated (§4.1 "Failure semantics").
pub async fn release_database_server(
    client: Client,
    namespace: &str,
    database_server_name: &str,
) -> Result<(), Error> {
    let api: Api<DatabaseServer> = Api::namespaced(client, namespace);
    match api.get(database_server_name).await {
        Ok(mut observed) => {
            let status = observed.status.get_or_insert_with(Default::default);
            status.cluster_ref = None;
            let body = serde_json::to_vec(&observed)?;
            api.replace_status(database_server_name, &PostParams::default(), body)
                .await?;
            Ok(())
        }
        Err(kube::Error::Api(e)) if e.code == 404 => {
            eprintln!(
                "DatabaseServer '{namespace}/{database_server_name}' not found during release; proceeding"
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn describe(cluster_ref: &ClusterRef) -> String {
    format!("{}/{}", cluster_ref.namespace, cluster_ref.name)
}

/// Records that the binding is fully established: both finalizers are in
/// place and the claim (if any) is held by this cluster.
pub async fn set_bound(client: Client, instance: &PlatformCluster) -> Result<(), Error> {
    patch_status::<platform_types::PlatformClusterStatus, PlatformCluster>(client, instance, |status| {
        status.phase = PlatformClusterPhase::Ready;
        status.message = None;
    })
    .await?;
    Ok(())
}

/// Surfaces a non-retryable claim conflict on the PlatformCluster's status
/// (§7 "ClaimConflict ... surfaced on the PlatformCluster's status/events").
pub async fn set_claim_conflict(client: Client, instance: &PlatformCluster, holder: &str) -> Result<(), Error> {
    let holder = holder.to_owned();
    patch_status::<platform_types::PlatformClusterStatus, PlatformCluster>(client, instance, move |status| {
        status.phase = PlatformClusterPhase::Error;
        status.message = Some(format!("DatabaseServer already claimed by {holder}"));
    })
    .await?;
    Ok(())
}
