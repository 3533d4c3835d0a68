use crate::util::Error;
use kube::{
    Api,
    api::{Patch, PatchParams, Resource},
};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

/// Adds `finalizer` to `name`'s finalizer list if absent. No-op (and no
/// write) if already present.
pub async fn ensure_present<K>(api: &Api<K>, name: &str, finalizer: &str) -> Result<(), Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Serialize,
{
    let obj = api.get(name).await?;
    let mut finalizers = obj.meta().finalizers.clone().unwrap_or_default();
    if finalizers.iter().any(|f| f == finalizer) {
        return Ok(());
    }
    finalizers.push(finalizer.to_owned());
    let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// Removes `finalizer` from `name`'s finalizer list if present.
pub async fn ensure_absent<K>(api: &Api<K>, name: &str, finalizer: &str) -> Result<(), Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Serialize,
{
    let obj = api.get(name).await?;
    let Some(finalizers) = obj.meta().finalizers.clone() else {
        return Ok(());
    };
    if !finalizers.iter().any(|f| f == finalizer) {
        return Ok(());
    }
    let remaining: Vec<String> = finalizers.into_iter().filter(|f| f != finalizer).collect();
    let patch = serde_json::json!({ "metadata": { "finalizers": remaining } });
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}
