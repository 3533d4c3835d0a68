use super::MANAGER_NAME;
use k8s_openapi::{apimachinery::pkg::apis::meta::v1::Time, jiff::Timestamp};
use kube::{
    Api, Client, Error,
    api::{Patch, PatchParams, Resource},
    core::NamespaceResourceScope,
};
use platform_types::*;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

pub trait Object<S: Status> {
    /// Returns a mutable reference to the status object, initializing it
    /// with the default value if it does not exist.
    fn mut_status(&mut self) -> &mut S;
}

pub trait Status {
    fn set_last_updated(&mut self, last_updated: Time);
}

impl Object<DatabaseServerStatus> for DatabaseServer {
    fn mut_status(&mut self) -> &mut DatabaseServerStatus {
        if self.status.is_none() {
            self.status = Some(Default::default());
        }
        self.status.as_mut().unwrap()
    }
}

impl Status for DatabaseServerStatus {
    fn set_last_updated(&mut self, last_updated: Time) {
        self.last_updated = Some(last_updated);
    }
}

impl Object<PlatformClusterStatus> for PlatformCluster {
    fn mut_status(&mut self) -> &mut PlatformClusterStatus {
        if self.status.is_none() {
            self.status = Some(Default::default());
        }
        self.status.as_mut().unwrap()
    }
}

impl Status for PlatformClusterStatus {
    fn set_last_updated(&mut self, last_updated: Time) {
        self.last_updated = Some(last_updated);
    }
}

/// Patches the resource's status with the provided mutation, using a JSON
/// merge-patch diff so unrelated concurrent status writers aren't clobbered.
pub async fn patch_status<S: Status, T>(
    client: Client,
    instance: &T,
    f: impl FnOnce(&mut S),
) -> Result<T, Error>
where
    <T as Resource>::DynamicType: Default,
    T: Clone
        + Resource
        + Object<S>
        + Serialize
        + DeserializeOwned
        + Debug
        + Resource<Scope = NamespaceResourceScope>,
{
    let patch = Patch::Json::<T>({
        let mut modified = instance.clone();
        let status = modified.mut_status();
        f(status);
        status.set_last_updated(Time::from(Timestamp::now()));
        json_patch::diff(
            &serde_json::to_value(instance).unwrap(),
            &serde_json::to_value(&modified).unwrap(),
        )
    });
    let name = instance.meta().name.as_deref().unwrap();
    let namespace = instance.meta().namespace.as_deref().unwrap();
    let api: Api<T> = Api::namespaced(client, namespace);
    api.patch_status(name, &PatchParams::apply(MANAGER_NAME), &patch)
        .await
}
