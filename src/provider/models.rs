//! Lambda Cloud API wire types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::types::{
    Filesystem, FilesystemMount, ImageRef, Instance, InstanceStatus, InstanceType, LaunchRequest,
    SshKey,
};

/// Every successful response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

// ============ Errors ============

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default)]
    pub field_errors: BTreeMap<String, ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl ErrorDetail {
    /// `code: message (suggestion)`, keeping whatever the provider sent.
    pub fn render(&self) -> String {
        let message = self.message.as_deref().unwrap_or("<no error message>");
        let mut out = match &self.code {
            Some(code) => format!("{code}: {message}"),
            None => message.to_string(),
        };
        if let Some(suggestion) = &self.suggestion {
            out.push_str(&format!(" ({suggestion})"));
        }
        out
    }
}

// ============ Instance types ============

#[derive(Debug, Deserialize)]
pub struct InstanceTypeEntry {
    pub instance_type: InstanceTypeInfo,
    #[serde(default)]
    pub regions_with_capacity_available: Vec<RegionRef>,
}

#[derive(Debug, Deserialize)]
pub struct InstanceTypeInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price_cents_per_hour: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionRef {
    pub name: String,
}

pub type InstanceTypeMap = HashMap<String, InstanceTypeEntry>;

/// Flatten the keyed catalog into a slug-sorted list.
pub fn to_instance_types(map: InstanceTypeMap) -> Vec<InstanceType> {
    let mut types: Vec<InstanceType> = map
        .into_iter()
        .map(|(key, entry)| {
            let regions: Vec<String> = entry
                .regions_with_capacity_available
                .into_iter()
                .map(|r| r.name)
                .collect();
            InstanceType {
                slug: entry.instance_type.name.unwrap_or(key),
                description: entry.instance_type.description.trim().to_string(),
                price_cents: entry.instance_type.price_cents_per_hour,
                available_now: !regions.is_empty(),
                regions_available: regions,
            }
        })
        .collect();
    types.sort_by(|a, b| a.slug.cmp(&b.slug));
    types
}

// ============ Filesystems ============

#[derive(Debug, Deserialize)]
pub struct FilesystemResource {
    pub id: String,
    pub name: String,
    pub region: RegionRef,
    #[serde(default)]
    pub mount_point: Option<String>,
    #[serde(default)]
    pub is_in_use: bool,
    #[serde(default)]
    pub bytes_used: Option<u64>,
}

impl From<FilesystemResource> for Filesystem {
    fn from(fs: FilesystemResource) -> Self {
        Self {
            id: fs.id,
            name: fs.name,
            region: fs.region.name,
            mount_point: fs.mount_point,
            in_use: fs.is_in_use,
            bytes_used: fs.bytes_used,
        }
    }
}

// ============ SSH keys ============

#[derive(Debug, Deserialize)]
pub struct SshKeyResource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub private_key: Option<String>,
}

impl From<SshKeyResource> for SshKey {
    fn from(key: SshKeyResource) -> Self {
        Self {
            id: key.id,
            name: key.name,
            public_key: key.public_key,
            private_key: key.private_key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddSshKeyBody<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<&'a str>,
}

// ============ Instances ============

#[derive(Debug, Deserialize)]
pub struct InstanceResource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    pub status: InstanceStatus,
    pub region: RegionRef,
    pub instance_type: InstanceTypeRef,
}

#[derive(Debug, Deserialize)]
pub struct InstanceTypeRef {
    pub name: String,
}

impl From<InstanceResource> for Instance {
    fn from(inst: InstanceResource) -> Self {
        Self {
            id: inst.id,
            name: inst.name,
            ip: inst.ip,
            status: inst.status,
            region: inst.region.name,
            instance_type_slug: inst.instance_type.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagBody<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
pub struct IdRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LaunchBody<'a> {
    pub region_name: &'a str,
    pub instance_type_name: &'a str,
    pub ssh_key_names: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_system_names: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_system_mounts: Vec<&'a FilesystemMount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a ImageRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub firewall_rulesets: Vec<IdRef<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<&'a str>,
}

impl<'a> From<&'a LaunchRequest> for LaunchBody<'a> {
    fn from(req: &'a LaunchRequest) -> Self {
        Self {
            region_name: &req.region,
            instance_type_name: &req.instance_type_slug,
            ssh_key_names: vec![req.ssh_key_name.as_str()],
            file_system_names: req.filesystem_name.as_deref().into_iter().collect(),
            file_system_mounts: req.filesystem_mounts.iter().collect(),
            name: req.name.as_deref(),
            hostname: req.hostname.as_deref(),
            tags: req
                .tags
                .iter()
                .map(|(key, value)| TagBody {
                    key: key.as_str(),
                    value: value.as_str(),
                })
                .collect(),
            image: req.image.as_ref(),
            firewall_rulesets: req
                .firewall_rulesets
                .iter()
                .map(|id| IdRef { id: id.as_str() })
                .collect(),
            user_data: req.user_data.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LaunchData {
    pub instance_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TerminateBody<'a> {
    pub instance_ids: Vec<&'a str>,
}

/// Terminate responses list the instances the provider accepted.
#[derive(Debug, Deserialize)]
pub struct TerminateData {
    pub terminated_instances: Vec<TerminatedInstance>,
}

#[derive(Debug, Deserialize)]
pub struct TerminatedInstance {
    pub id: String,
}

impl TerminateData {
    pub fn contains(&self, id: &str) -> bool {
        self.terminated_instances.iter().any(|i| i.id == id)
    }
}
