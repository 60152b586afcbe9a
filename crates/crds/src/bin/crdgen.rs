//! Prints the CRD manifests as YAML
//!
//! `cargo run -p crds --bin crdgen > config/crd/ipm.microscaler.io.yaml`

use crds::IpmTransportCapacity;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = IpmTransportCapacity::crd();
    print!("---\n{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
