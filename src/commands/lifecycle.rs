//! Lifecycle commands: launch and terminate
//!
//! Launch makes at most one filesystem lookup and exactly one creation
//! request. Terminate sends one request per instance id so each outcome
//! can be reported on its own.

use serde_json::json;

use crate::config::LaunchSpec;
use crate::error::{Error, Result};
use crate::output::Output;
use crate::provider::{ApiError, CloudProvider, Filesystem, Instance, InstanceStatus, LaunchRequest};

// ============ Launch ============

/// What a successful launch reports.
#[derive(Debug)]
pub struct Launched {
    pub instance: Instance,
    pub filesystem: Option<Filesystem>,
}

/// Find a filesystem by name, preferring one in the launch region.
async fn resolve_filesystem<P: CloudProvider + ?Sized>(
    provider: &P,
    name: &str,
    region: &str,
) -> Result<Filesystem> {
    let matches: Vec<Filesystem> = provider
        .list_filesystems()
        .await?
        .into_iter()
        .filter(|fs| fs.name == name)
        .collect();

    if let Some(fs) = matches.iter().find(|fs| fs.region == region) {
        return Ok(fs.clone());
    }
    match matches.into_iter().next() {
        Some(fs) => Err(Error::FilesystemRegionMismatch {
            name: name.to_string(),
            filesystem_region: fs.region,
            region: region.to_string(),
        }),
        None => Err(Error::FilesystemNotFound(name.to_string())),
    }
}

/// Launch one instance from a resolved spec.
///
/// Capacity or validation failures come back as the provider's error; there
/// is no retry.
pub async fn launch<P: CloudProvider + ?Sized>(provider: &P, spec: &LaunchSpec) -> Result<Launched> {
    let filesystem = match &spec.filesystem {
        Some(name) => Some(resolve_filesystem(provider, name, &spec.region).await?),
        None => None,
    };

    let req = LaunchRequest {
        region: spec.region.clone(),
        instance_type_slug: spec.instance_type.clone(),
        ssh_key_name: spec.ssh_key.clone(),
        filesystem_name: filesystem.as_ref().map(|fs| fs.name.clone()),
        filesystem_mounts: spec.filesystem_mounts.clone(),
        name: spec.name.clone(),
        hostname: spec.hostname.clone(),
        tags: spec.tags.clone(),
        image: spec.image.clone(),
        firewall_rulesets: spec.firewall_rulesets.clone(),
        user_data: spec.user_data.clone(),
    };

    let ids = provider.launch_instance(&req).await?;
    let id = ids.into_iter().next().ok_or(Error::NoInstanceReturned)?;

    Ok(Launched {
        instance: Instance {
            id,
            name: spec.name.clone(),
            ip: None,
            status: InstanceStatus::Booting,
            region: spec.region.clone(),
            instance_type_slug: spec.instance_type.clone(),
        },
        filesystem,
    })
}

pub async fn run_launch<P: CloudProvider + ?Sized>(
    provider: &P,
    spec: LaunchSpec,
    out: &Output,
) -> Result<()> {
    out.log(
        "info",
        &format!(
            "Launching {} in {} with key '{}'",
            spec.instance_type, spec.region, spec.ssh_key
        ),
    );
    if let Some(fs) = &spec.filesystem {
        out.log("info", &format!("Resolving filesystem '{}'", fs));
    }

    let launched = launch(provider, &spec).await?;
    let inst = &launched.instance;

    out.result(json!({
        "success": true,
        "instance_id": inst.id,
        "name": inst.name,
        "status": inst.status.to_string(),
        "ip": inst.ip,
        "region": inst.region,
        "instance_type": inst.instance_type_slug,
        "ssh_key": spec.ssh_key,
        "filesystem": launched.filesystem.as_ref().map(|fs| json!({
            "id": fs.id,
            "name": fs.name,
            "mount_point": fs.mount_point
        })),
        "filesystem_mounts": spec.filesystem_mounts
    }));

    Ok(())
}

// ============ Terminate ============

/// Result of terminating one instance.
#[derive(Debug)]
pub struct Termination {
    pub id: String,
    pub result: std::result::Result<(), ApiError>,
}

/// Terminate each id in order; a failure never hides the other outcomes.
/// Repeated ids are submitted once.
pub async fn terminate<P: CloudProvider + ?Sized>(provider: &P, ids: &[String]) -> Vec<Termination> {
    let mut seen = std::collections::HashSet::new();
    let mut outcomes = Vec::new();
    for id in ids.iter().filter(|id| seen.insert(*id)) {
        let result = provider.terminate_instance(id).await;
        outcomes.push(Termination {
            id: id.clone(),
            result,
        });
    }
    outcomes
}

pub async fn run_terminate<P: CloudProvider + ?Sized>(
    provider: &P,
    ids: &[String],
    out: &Output,
) -> Result<()> {
    out.log("info", &format!("Terminating {} instance(s)", ids.len()));

    let outcomes = terminate(provider, ids).await;
    let total = outcomes.len();

    let rendered: Vec<_> = outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(()) => json!({"id": o.id, "status": "terminated"}),
            Err(e) => json!({
                "id": o.id,
                "status": "failed",
                "error": {
                    "cat": e.category().as_str(),
                    "status": e.status(),
                    "retryable": e.is_retryable(),
                    "message": e.to_string()
                }
            }),
        })
        .collect();
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

    out.result(json!({
        "success": failed == 0,
        "requested": total,
        "terminated": total - failed,
        "failed": failed,
        "outcomes": rendered
    }));

    match outcomes.into_iter().find_map(|o| o.result.err()) {
        Some(first) => Err(Error::TerminationIncomplete {
            failed,
            total,
            first,
        }),
        None => Ok(()),
    }
}
