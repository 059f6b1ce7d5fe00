//! Instance inspection commands

use serde_json::json;

use crate::error::Result;
use crate::output::Output;
use crate::provider::{CloudProvider, Instance};

fn summary(inst: &Instance) -> serde_json::Value {
    json!({
        "id": inst.id,
        "name": inst.name,
        "status": inst.status.to_string(),
        "ip": inst.ip,
        "region": inst.region,
        "instance_type": inst.instance_type_slug
    })
}

pub async fn run_list_instances<P: CloudProvider + ?Sized>(provider: &P, out: &Output) -> Result<()> {
    out.log("info", "Fetching instances");

    let instances = provider.list_instances().await?;

    out.result(json!({
        "success": true,
        "count": instances.len(),
        "instances": instances.iter().map(summary).collect::<Vec<_>>()
    }));

    Ok(())
}

pub async fn run_get_instance<P: CloudProvider + ?Sized>(
    provider: &P,
    id: &str,
    out: &Output,
) -> Result<()> {
    out.log("info", &format!("Fetching instance {}", id));

    let instance = provider.get_instance(id).await?;

    out.result(json!({
        "success": true,
        "instance": summary(&instance)
    }));

    Ok(())
}
