//! Provider trait and domain types.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::ApiError;

/// Instance lifecycle status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Launch accepted, no address yet.
    Booting,
    /// Running and reachable.
    Active,
    /// Termination accepted.
    Terminating,
    /// Gone.
    Terminated,
    /// Anything else the provider reports (e.g. `unhealthy`).
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Booting => write!(f, "booting"),
            Self::Active => write!(f, "active"),
            Self::Terminating => write!(f, "terminating"),
            Self::Terminated => write!(f, "terminated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A compute configuration offered by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceType {
    /// Provider slug, e.g. `gpu_1x_a100_sxm4`.
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    /// Regions with capacity right now.
    pub regions_available: Vec<String>,
    /// True when at least one region has capacity.
    pub available_now: bool,
}

impl InstanceType {
    /// Whether the type has capacity, optionally scoped to one region.
    pub fn is_available_in(&self, region: Option<&str>) -> bool {
        match region {
            Some(region) => self.regions_available.iter().any(|r| r == region),
            None => self.available_now,
        }
    }
}

/// A persistent filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filesystem {
    pub id: String,
    pub name: String,
    pub region: String,
    pub mount_point: Option<String>,
    pub in_use: bool,
    pub bytes_used: Option<u64>,
}

/// An SSH key registered with the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SshKey {
    pub id: String,
    pub name: String,
    pub public_key: String,
    /// Only present right after the provider generated a key pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl SshKey {
    /// OpenSSH-style `SHA256:...` fingerprint of the public key blob.
    ///
    /// `None` when the key text has no decodable base64 body.
    pub fn fingerprint(&self) -> Option<String> {
        let body = self.public_key.split_whitespace().nth(1)?;
        let blob = STANDARD.decode(body).ok()?;
        let digest = Sha256::digest(&blob);
        Some(format!("SHA256:{}", STANDARD_NO_PAD.encode(digest)))
    }
}

/// A GPU instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ip: Option<String>,
    pub status: InstanceStatus,
    pub region: String,
    pub instance_type_slug: String,
}

/// Boot image selection: a specific image id or the latest of a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRef {
    Id(String),
    Family(String),
}

/// A filesystem attached by id at an explicit mount path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilesystemMount {
    pub file_system_id: String,
    pub mount_point: String,
}

/// Body of a launch call, built from a resolved launch specification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub region: String,
    pub instance_type_slug: String,
    pub ssh_key_name: String,
    pub filesystem_name: Option<String>,
    pub filesystem_mounts: Vec<FilesystemMount>,
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub image: Option<ImageRef>,
    pub firewall_rulesets: Vec<String>,
    /// cloud-init user data, sent verbatim.
    pub user_data: Option<String>,
}

/// Provider control-plane operations.
///
/// Implementations perform at most one HTTP exchange per call and never
/// retry.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Full instance type catalog, unfiltered.
    async fn list_instance_types(&self) -> Result<Vec<InstanceType>, ApiError>;

    async fn list_filesystems(&self) -> Result<Vec<Filesystem>, ApiError>;

    async fn list_ssh_keys(&self) -> Result<Vec<SshKey>, ApiError>;

    /// Register a public key. Fails if the name is taken.
    async fn add_ssh_key(&self, name: &str, public_key: &str) -> Result<SshKey, ApiError>;

    /// Ask the provider to generate a key pair under `name`.
    async fn generate_ssh_key(&self, name: &str) -> Result<SshKey, ApiError>;

    async fn delete_ssh_key(&self, id: &str) -> Result<(), ApiError>;

    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError>;

    async fn get_instance(&self, id: &str) -> Result<Instance, ApiError>;

    /// Submit one launch request and return the new instance IDs.
    async fn launch_instance(&self, req: &LaunchRequest) -> Result<Vec<String>, ApiError>;

    /// Terminate a single instance.
    async fn terminate_instance(&self, id: &str) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(InstanceStatus::Booting.to_string(), "booting");
        assert_eq!(InstanceStatus::Terminated.to_string(), "terminated");
    }

    #[test]
    fn test_status_unknown_value() {
        let status: InstanceStatus = serde_json::from_str("\"unhealthy\"").unwrap();
        assert_eq!(status, InstanceStatus::Unknown);
    }

    #[test]
    fn test_availability_scope() {
        let t = InstanceType {
            slug: "gpu_1x_a10".into(),
            description: String::new(),
            price_cents: 75,
            regions_available: vec!["us-east-1".into()],
            available_now: true,
        };
        assert!(t.is_available_in(None));
        assert!(t.is_available_in(Some("us-east-1")));
        assert!(!t.is_available_in(Some("us-west-1")));
    }

    #[test]
    fn test_fingerprint() {
        let key = SshKey {
            id: "k1".into(),
            name: "laptop".into(),
            public_key: "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFPmGyWlbNJE68J/zhkhUqyKOm5pUt+iAkpDBAtKdLip me@host".into(),
            private_key: None,
        };
        // matches `ssh-keygen -lf`
        assert_eq!(
            key.fingerprint().as_deref(),
            Some("SHA256:xZ+DvsE0XHwKNE9PQG5esAXaDt3NpJ2V/0KWBrN5+Tw")
        );
    }

    #[test]
    fn test_fingerprint_of_garbage_key() {
        let key = SshKey {
            id: "k2".into(),
            name: "broken".into(),
            public_key: "not-a-key".into(),
            private_key: None,
        };
        assert_eq!(key.fingerprint(), None);
    }

    #[test]
    fn test_image_ref_wire_shape() {
        assert_eq!(
            serde_json::to_value(ImageRef::Family("lambda-stack-22-04".into())).unwrap(),
            serde_json::json!({"family": "lambda-stack-22-04"})
        );
    }
}
