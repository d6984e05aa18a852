//! Prints the CRD manifests for all workbench kinds as a multi-document
//! YAML stream, suitable for `kubectl apply -f -`.

use kube::CustomResourceExt;

use crds::{Tunnel, Unit, Workspace};

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Workspace::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&Unit::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&Tunnel::crd())?);
    Ok(())
}
