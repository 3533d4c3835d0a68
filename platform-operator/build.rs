use kube::CustomResourceExt;
use platform_types::*;
use std::fs;

fn main() {
    let _ = fs::create_dir("../crds");
    for (name, yaml) in [
        (
            "platform.example.io_databaseservers_crd.yaml",
            serde_yaml::to_string(&DatabaseServer::crd()).unwrap(),
        ),
        (
            "platform.example.io_platformclusters_crd.yaml",
            serde_yaml::to_string(&PlatformCluster::crd()).unwrap(),
        ),
        (
            "platform.example.io_taskautoscalers_crd.yaml",
            serde_yaml::to_string(&TaskAutoscaler::crd()).unwrap(),
        ),
        (
            "platform.example.io_databasebackups_crd.yaml",
            serde_yaml::to_string(&DatabaseBackup::crd()).unwrap(),
        ),
    ] {
        fs::write(format!("../crds/{name}"), yaml).unwrap();
    }
}
