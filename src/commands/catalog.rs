//! Catalog commands: instance types, filesystems, SSH keys

use std::path::Path;

use serde_json::json;
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};
use crate::output::Output;
use crate::provider::{CloudProvider, Filesystem, InstanceType, SshKey};

// ============ Operations ============

/// Full catalog, or only the types with capacity (optionally in one region).
///
/// The provider has no server-side filter, so this filters the full response.
pub async fn list_instance_types<P: CloudProvider + ?Sized>(
    provider: &P,
    available_only: bool,
    region: Option<&str>,
) -> Result<Vec<InstanceType>> {
    let types = provider.list_instance_types().await?;
    if !available_only {
        return Ok(types);
    }
    Ok(types
        .into_iter()
        .filter(|t| t.is_available_in(region))
        .collect())
}

pub async fn list_filesystems<P: CloudProvider + ?Sized>(provider: &P) -> Result<Vec<Filesystem>> {
    Ok(provider.list_filesystems().await?)
}

pub async fn list_ssh_keys<P: CloudProvider + ?Sized>(provider: &P) -> Result<Vec<SshKey>> {
    Ok(provider.list_ssh_keys().await?)
}

/// Register a public key. A name collision is returned as the provider's error.
pub async fn add_ssh_key<P: CloudProvider + ?Sized>(
    provider: &P,
    name: &str,
    public_key: &str,
) -> Result<SshKey> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Input("SSH key name is empty".to_string()));
    }
    let public_key = public_key.trim();
    if public_key.is_empty() {
        return Err(Error::Input("public key content is empty".to_string()));
    }
    Ok(provider.add_ssh_key(name, public_key).await?)
}

async fn read_public_key(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Input(format!("failed to read {}: {}", path.display(), e))),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .map_err(|e| Error::Input(format!("failed to read public key from stdin: {}", e)))?;
            Ok(buf)
        }
    }
}

fn price(cents: i64) -> String {
    format!("${}.{:02}/hr", cents / 100, cents % 100)
}

// ============ Commands ============

pub async fn run_list_instance_types<P: CloudProvider + ?Sized>(
    provider: &P,
    available_only: bool,
    region: Option<&str>,
    out: &Output,
) -> Result<()> {
    out.log("info", "Fetching instance types");

    let types = list_instance_types(provider, available_only, region).await?;

    out.result(json!({
        "success": true,
        "available_only": available_only,
        "region": region,
        "count": types.len(),
        "instance_types": types.iter().map(|t| json!({
            "slug": t.slug,
            "description": t.description,
            "price_cents_per_hour": t.price_cents,
            "price": price(t.price_cents),
            "available_now": t.is_available_in(region),
            "regions": t.regions_available
        })).collect::<Vec<_>>()
    }));

    Ok(())
}

pub async fn run_list_filesystems<P: CloudProvider + ?Sized>(provider: &P, out: &Output) -> Result<()> {
    out.log("info", "Fetching filesystems");

    let filesystems = list_filesystems(provider).await?;

    out.result(json!({
        "success": true,
        "count": filesystems.len(),
        "filesystems": filesystems.iter().map(|fs| json!({
            "id": fs.id,
            "name": fs.name,
            "region": fs.region,
            "mount_point": fs.mount_point,
            "status": if fs.in_use { "in-use" } else { "available" },
            "bytes_used": fs.bytes_used
        })).collect::<Vec<_>>()
    }));

    Ok(())
}

pub async fn run_list_ssh_keys<P: CloudProvider + ?Sized>(provider: &P, out: &Output) -> Result<()> {
    out.log("info", "Fetching SSH keys");

    let keys = list_ssh_keys(provider).await?;

    out.result(json!({
        "success": true,
        "count": keys.len(),
        "ssh_keys": keys.iter().map(|k| json!({
            "id": k.id,
            "name": k.name,
            "fingerprint": k.fingerprint()
        })).collect::<Vec<_>>()
    }));

    Ok(())
}

pub async fn run_add_ssh_key<P: CloudProvider + ?Sized>(
    provider: &P,
    name: &str,
    public_key: Option<&Path>,
    generate: bool,
    out: &Output,
) -> Result<()> {
    if generate && public_key.is_some() {
        return Err(Error::Input(
            "--generate cannot be used with --public-key".to_string(),
        ));
    }

    let key = if generate {
        out.log("info", &format!("Generating SSH key pair '{}'", name));
        provider.generate_ssh_key(name).await?
    } else {
        let content = read_public_key(public_key).await?;
        out.log("info", &format!("Uploading SSH key '{}'", name));
        add_ssh_key(provider, name, &content).await?
    };

    if key.private_key.is_some() {
        out.log("warn", "Save the private key now; it is not shown again");
    }

    out.result(json!({
        "success": true,
        "id": key.id,
        "name": key.name,
        "fingerprint": key.fingerprint(),
        "private_key": key.private_key
    }));

    Ok(())
}

pub async fn run_delete_ssh_key<P: CloudProvider + ?Sized>(
    provider: &P,
    id: &str,
    out: &Output,
) -> Result<()> {
    out.log("info", &format!("Deleting SSH key {}", id));

    provider.delete_ssh_key(id).await?;

    out.result(json!({
        "success": true,
        "deleted": true,
        "id": id
    }));

    Ok(())
}
