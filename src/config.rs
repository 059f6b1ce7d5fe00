//! Configuration loading (.env + launch profiles)

use anyhow::{Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::provider::{FilesystemMount, ImageRef};

/// Project directory (where .env and configs/ live)
pub fn project_dir() -> PathBuf {
    // Check LAMBDA_PROJECT_DIR env first
    if let Ok(dir) = std::env::var("LAMBDA_PROJECT_DIR") {
        return PathBuf::from(dir);
    }
    // Default to current directory
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Default directory searched for named profiles
pub fn default_profile_dir() -> PathBuf {
    project_dir().join("configs").join("lambda")
}

/// Load .env file if one exists
pub fn load_env() -> Result<()> {
    let env_path = project_dir().join(".env");
    if !env_path.exists() {
        return Ok(());
    }
    dotenvy::from_path(&env_path)
        .with_context(|| format!("Failed to load .env from {:?}", env_path))?;
    Ok(())
}

// ============ Errors ============

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profile '{name}' not found (checked: {})", .searched.join(", "))]
    ProfileNotFound { name: String, searched: Vec<String> },

    #[error("missing required field(s): {}", .0.join(", "))]
    MissingRequiredField(Vec<&'static str>),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid profile {path}: {message}")]
    InvalidProfile { path: String, message: String },

    #[error("invalid tag '{0}', expected KEY=VALUE")]
    InvalidTag(String),

    #[error("invalid filesystem mount '{0}', expected FS_ID=/absolute/path")]
    InvalidMount(String),
}

// ============ Launch specification ============

/// A partial launch specification: one precedence layer.
///
/// Built-in defaults, profiles and command-line overrides all share this
/// shape; any field may be absent. Profiles may use the provider's field
/// names (`region_name`, `ssh_key_names`, ...) and list forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PartialLaunchSpec {
    #[serde(alias = "region_name")]
    pub region: Option<String>,
    #[serde(alias = "instance_type_name")]
    pub instance_type: Option<String>,
    #[serde(
        alias = "ssh_key_name",
        alias = "ssh_keys",
        alias = "ssh_key_names",
        deserialize_with = "single"
    )]
    pub ssh_key: Option<String>,
    #[serde(
        alias = "filesystem_name",
        alias = "file_system_name",
        alias = "filesystems",
        alias = "filesystem_names",
        alias = "file_system_names",
        deserialize_with = "single"
    )]
    pub filesystem: Option<String>,
    #[serde(alias = "file_system_mounts", deserialize_with = "mount_list")]
    pub filesystem_mounts: Vec<FilesystemMount>,
    pub name: Option<String>,
    pub hostname: Option<String>,
    #[serde(deserialize_with = "tag_map")]
    pub tags: BTreeMap<String, String>,
    #[serde(deserialize_with = "image")]
    pub image: Option<ImageRef>,
    #[serde(deserialize_with = "string_list")]
    pub firewall_rulesets: Vec<String>,
    /// Inline cloud-init user data. A profile's `user_data_file` is read
    /// into this field when the profile is loaded.
    pub user_data: Option<String>,
}

impl PartialLaunchSpec {
    /// Stack `upper` on top of `self`; `upper` wins field by field.
    ///
    /// Tags merge by key and mounts by filesystem id; firewall rulesets
    /// are replaced as a whole.
    pub fn layered(&self, upper: &PartialLaunchSpec) -> PartialLaunchSpec {
        fn pick(upper: &Option<String>, lower: &Option<String>) -> Option<String> {
            non_blank(upper).or_else(|| non_blank(lower))
        }

        let mut tags = self.tags.clone();
        tags.extend(upper.tags.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut mounts = self.filesystem_mounts.clone();
        for mount in &upper.filesystem_mounts {
            match mounts
                .iter_mut()
                .find(|m| m.file_system_id == mount.file_system_id)
            {
                Some(existing) => *existing = mount.clone(),
                None => mounts.push(mount.clone()),
            }
        }

        let firewall_rulesets = if upper.firewall_rulesets.is_empty() {
            self.firewall_rulesets.clone()
        } else {
            upper.firewall_rulesets.clone()
        };

        // User data keeps its exact content; only an all-blank value is skipped.
        let user_data = [&upper.user_data, &self.user_data]
            .into_iter()
            .flatten()
            .find(|v| !v.trim().is_empty())
            .cloned();

        PartialLaunchSpec {
            region: pick(&upper.region, &self.region),
            instance_type: pick(&upper.instance_type, &self.instance_type),
            ssh_key: pick(&upper.ssh_key, &self.ssh_key),
            filesystem: pick(&upper.filesystem, &self.filesystem),
            filesystem_mounts: mounts,
            name: pick(&upper.name, &self.name),
            hostname: pick(&upper.hostname, &self.hostname),
            tags,
            image: upper.image.clone().or_else(|| self.image.clone()),
            firewall_rulesets,
            user_data,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fully resolved launch parameters. Built only by [`Resolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub region: String,
    pub instance_type: String,
    pub ssh_key: String,
    pub filesystem: Option<String>,
    pub filesystem_mounts: Vec<FilesystemMount>,
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub image: Option<ImageRef>,
    pub firewall_rulesets: Vec<String>,
    pub user_data: Option<String>,
}

fn parse_tag(item: &str) -> Result<(String, String), ConfigError> {
    match item.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::InvalidTag(item.to_string())),
    }
}

/// Parse `KEY=VALUE` tag arguments.
pub fn parse_tags(items: &[String]) -> Result<BTreeMap<String, String>, ConfigError> {
    items.iter().map(|item| parse_tag(item)).collect()
}

/// Parse a `FS_ID=/mount/path` argument. The mount point must be absolute.
pub fn parse_mount(item: &str) -> Result<FilesystemMount, ConfigError> {
    match item.split_once('=') {
        Some((id, mount_point)) => checked_mount(id, mount_point, item),
        None => Err(ConfigError::InvalidMount(item.to_string())),
    }
}

fn checked_mount(id: &str, mount_point: &str, raw: &str) -> Result<FilesystemMount, ConfigError> {
    let (id, mount_point) = (id.trim(), mount_point.trim());
    if id.is_empty() || !mount_point.starts_with('/') {
        return Err(ConfigError::InvalidMount(raw.to_string()));
    }
    Ok(FilesystemMount {
        file_system_id: id.to_string(),
        mount_point: mount_point.to_string(),
    })
}

/// Read a cloud-init user-data file.
pub fn read_user_data(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

// ============ Lenient profile fields ============

/// Scalars become strings (`2` -> "2", `true` -> "true").
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A string or a list of strings.
fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let items = match Value::deserialize(d)? {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items,
        other => vec![other],
    };
    items
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| scalar(v).ok_or_else(|| D::Error::custom("expected string entries")))
        .collect()
}

/// A string or a one-element list.
fn single<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let mut items = string_list(d)?;
    match items.len() {
        0 | 1 => Ok(items.pop()),
        n => Err(D::Error::custom(format!(
            "expected a single value, got a list of {n}"
        ))),
    }
}

/// Tags as a mapping, a list of `KEY=VALUE` strings, a list of
/// `{key, value}` mappings, or one `KEY=VALUE` string.
fn tag_map<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    tags_from_value(&Value::deserialize(d)?).map_err(D::Error::custom)
}

fn tags_from_value(value: &Value) -> Result<BTreeMap<String, String>, ConfigError> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| match (scalar(k), scalar(v)) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err(ConfigError::InvalidTag(format!("{k:?}: {v:?}"))),
            })
            .collect(),
        Value::Sequence(items) => items.iter().map(tag_entry).collect(),
        Value::String(item) => parse_tag(item).map(|tag| BTreeMap::from([tag])),
        other => Err(ConfigError::InvalidTag(format!("{other:?}"))),
    }
}

fn tag_entry(item: &Value) -> Result<(String, String), ConfigError> {
    match item {
        Value::String(item) => parse_tag(item),
        Value::Mapping(map) => {
            match (
                map.get("key").and_then(scalar),
                map.get("value").and_then(scalar),
            ) {
                (Some(key), Some(value)) => Ok((key, value)),
                _ => Err(ConfigError::InvalidTag(format!("{item:?}"))),
            }
        }
        other => Err(ConfigError::InvalidTag(format!("{other:?}"))),
    }
}

/// Mounts as `FS_ID=/path` strings or `{file_system_id | name, mount_point}`
/// mappings, singly or in a list.
fn mount_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<FilesystemMount>, D::Error> {
    let items = match Value::deserialize(d)? {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items,
        other => vec![other],
    };
    items
        .iter()
        .map(mount_entry)
        .collect::<Result<_, _>>()
        .map_err(D::Error::custom)
}

fn mount_entry(item: &Value) -> Result<FilesystemMount, ConfigError> {
    match item {
        Value::String(item) => parse_mount(item),
        Value::Mapping(map) => {
            let id = map
                .get("file_system_id")
                .or_else(|| map.get("name"))
                .and_then(scalar);
            match (id, map.get("mount_point").and_then(scalar)) {
                (Some(id), Some(mount_point)) => {
                    checked_mount(&id, &mount_point, &format!("{id}={mount_point}"))
                }
                _ => Err(ConfigError::InvalidMount(format!("{item:?}"))),
            }
        }
        other => Err(ConfigError::InvalidMount(format!("{other:?}"))),
    }
}

/// `{id: ...}` / `{family: ...}`, or a bare string naming an image family.
fn image<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ImageRef>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::String(family) if family.trim().is_empty() => Ok(None),
        Value::String(family) => Ok(Some(ImageRef::Family(family.trim().to_string()))),
        other => ImageRef::deserialize(other)
            .map(Some)
            .map_err(D::Error::custom),
    }
}

// ============ Profile store ============

/// Source of named launch profiles.
pub trait ProfileStore {
    fn load(&self, name: &str) -> Result<PartialLaunchSpec, ConfigError>;
}

/// YAML profiles on disk, looked up by explicit path or by name.
pub struct FileProfileStore {
    dirs: Vec<PathBuf>,
}

impl FileProfileStore {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let explicit = PathBuf::from(name);
        let mut candidates = vec![explicit.clone()];
        if explicit.extension().is_none() {
            for dir in &self.dirs {
                candidates.push(dir.join(format!("{name}.yaml")));
                candidates.push(dir.join(format!("{name}.yml")));
            }
        }
        candidates
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self, name: &str) -> Result<PartialLaunchSpec, ConfigError> {
        let candidates = self.candidates(name);
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => parse_profile(path),
            None => Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
                searched: candidates.iter().map(|p| p.display().to_string()).collect(),
            }),
        }
    }
}

/// Parse one profile file. Launch fields may sit under a top-level `launch:`
/// key; `user_data_file` is read relative to the profile's directory.
fn parse_profile(path: &Path) -> Result<PartialLaunchSpec, ConfigError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    let doc: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: display.clone(),
        source,
    })?;

    let mut doc = match doc {
        Value::Null => return Ok(PartialLaunchSpec::default()),
        Value::Mapping(mut map) => match map.remove("launch") {
            Some(Value::Mapping(launch)) => launch,
            Some(_) => {
                return Err(ConfigError::InvalidProfile {
                    path: display,
                    message: "'launch' must be a mapping".to_string(),
                })
            }
            None => map,
        },
        _ => {
            return Err(ConfigError::InvalidProfile {
                path: display,
                message: "top level must be a mapping".to_string(),
            })
        }
    };

    let user_data_file = match doc.remove("user_data_file") {
        None | Some(Value::Null) => None,
        Some(Value::String(file)) => Some(PathBuf::from(file)),
        Some(_) => {
            return Err(ConfigError::InvalidProfile {
                path: display,
                message: "'user_data_file' must be a path".to_string(),
            })
        }
    };

    let mut spec: PartialLaunchSpec =
        serde_yaml::from_value(Value::Mapping(doc)).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;

    if let Some(file) = user_data_file {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        spec.user_data = Some(read_user_data(&base.join(file))?);
    }

    Ok(spec)
}

/// In-memory profiles, keyed by name.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: std::collections::HashMap<String, PartialLaunchSpec>,
}

#[cfg(test)]
impl MemoryProfileStore {
    pub fn with(mut self, name: &str, profile: PartialLaunchSpec) -> Self {
        self.profiles.insert(name.to_string(), profile);
        self
    }
}

#[cfg(test)]
impl ProfileStore for MemoryProfileStore {
    fn load(&self, name: &str) -> Result<PartialLaunchSpec, ConfigError> {
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
                searched: vec!["<memory>".to_string()],
            })
    }
}

// ============ Resolver ============

/// Merges defaults, a named profile and overrides into a [`LaunchSpec`].
pub struct Resolver<S> {
    store: S,
    defaults: PartialLaunchSpec,
}

impl<S: ProfileStore> Resolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            defaults: PartialLaunchSpec::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: PartialLaunchSpec) -> Self {
        self.defaults = defaults;
        self
    }

    /// Resolve default -> profile -> override. Every missing required field
    /// is reported in one error.
    pub fn resolve(
        &self,
        profile: Option<&str>,
        overrides: &PartialLaunchSpec,
    ) -> Result<LaunchSpec, ConfigError> {
        let profile = match profile {
            Some(name) => self.store.load(name)?,
            None => PartialLaunchSpec::default(),
        };
        let merged = self.defaults.layered(&profile).layered(overrides);

        let mut missing = Vec::new();
        if merged.region.is_none() {
            missing.push("region");
        }
        if merged.instance_type.is_none() {
            missing.push("instance_type");
        }
        if merged.ssh_key.is_none() {
            missing.push("ssh_key");
        }

        match (merged.region, merged.instance_type, merged.ssh_key) {
            (Some(region), Some(instance_type), Some(ssh_key)) => Ok(LaunchSpec {
                region,
                instance_type,
                ssh_key,
                filesystem: merged.filesystem,
                filesystem_mounts: merged.filesystem_mounts,
                name: merged.name,
                hostname: merged.hostname,
                tags: merged.tags,
                image: merged.image,
                firewall_rulesets: merged.firewall_rulesets,
                user_data: merged.user_data,
            }),
            _ => Err(ConfigError::MissingRequiredField(missing)),
        }
    }
}
