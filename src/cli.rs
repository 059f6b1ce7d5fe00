//! CLI definition using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{self, ConfigError, PartialLaunchSpec};
use crate::provider::DEFAULT_BASE_URL;

#[derive(Parser)]
#[command(name = "lambda")]
#[command(version)]
#[command(about = "Lambda Cloud GPU instance lifecycle tool")]
#[command(long_about = r#"
Lambda Cloud CLI - launch and tear down GPU instances

Commands:
  list-instance-types   Instance types and current regional capacity
  list-instances        Running instances
  get-instance          One instance
  list-filesystems      Persistent filesystems
  list-ssh-keys         SSH keys on the account
  add-ssh-key           Upload (or generate) an SSH key
  delete-ssh-key        Remove an SSH key
  launch-instance       Launch an instance from a profile and/or flags
  terminate-instances   Terminate instances by id

Setup:
  Put LAMBDA_API_KEY in the environment or in a .env file.
  Launch profiles live in configs/lambda/<name>.yaml.
"#)]
#[command(after_help = r#"
Examples:

  List instance types with capacity right now:
    lambda list-instance-types --available-only

  Launch using a profile:
    lambda launch-instance --config wan2-instance

  Override profile values at runtime:
    lambda launch-instance --config wan2-instance --region us-east-1

  Terminate instances:
    lambda terminate-instances i-123abc i-456def
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Lambda Cloud API key
    #[arg(long, env = "LAMBDA_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// API base URL
    #[arg(long, env = "LAMBDA_API_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Directory searched for named launch profiles (default: ./configs/lambda)
    #[arg(long, env = "LAMBDA_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Machine output mode (JSON Lines)
    #[arg(long, visible_alias = "json", global = true)]
    pub agent: bool,

    /// Print tool metadata
    #[arg(long)]
    pub manifest: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    pub fn profile_dir(&self) -> PathBuf {
        self.config_dir
            .clone()
            .unwrap_or_else(config::default_profile_dir)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List instance types and the regions with capacity
    #[command(after_help = "Examples:
  lambda list-instance-types
  lambda list-instance-types --available-only --region us-east-1")]
    ListInstanceTypes {
        /// Hide types that have no capacity
        #[arg(long)]
        available_only: bool,

        /// Scope availability to one region
        #[arg(long)]
        region: Option<String>,
    },

    /// List running instances
    ListInstances,

    /// Show one instance
    GetInstance {
        /// Instance ID
        instance_id: String,
    },

    /// List persistent filesystems
    ListFilesystems,

    /// List SSH keys
    ListSshKeys,

    /// Upload an SSH public key
    #[command(after_help = "Examples:
  lambda add-ssh-key --name laptop --public-key ~/.ssh/id_ed25519.pub
  cat key.pub | lambda add-ssh-key --name ci
  lambda add-ssh-key --name fresh --generate")]
    AddSshKey {
        /// Name to assign to the key
        #[arg(long)]
        name: String,

        /// Public key file (reads stdin when omitted)
        #[arg(long)]
        public_key: Option<PathBuf>,

        /// Let the provider generate a key pair
        #[arg(long)]
        generate: bool,
    },

    /// Delete an SSH key by ID
    DeleteSshKey {
        /// SSH key ID
        ssh_key_id: String,
    },

    /// Launch a new instance
    LaunchInstance(LaunchArgs),

    /// Terminate one or more instances
    #[command(after_help = "Examples:
  lambda terminate-instances i-123abc i-456def")]
    TerminateInstances {
        /// Instance IDs to terminate
        #[arg(required = true, num_args = 1..)]
        instance_ids: Vec<String>,
    },
}

impl Commands {
    /// Action id used in error reports and the manifest.
    pub fn op(&self) -> &'static str {
        match self {
            Commands::ListInstanceTypes { .. } => "list-instance-types",
            Commands::ListInstances => "list-instances",
            Commands::GetInstance { .. } => "get-instance",
            Commands::ListFilesystems => "list-filesystems",
            Commands::ListSshKeys => "list-ssh-keys",
            Commands::AddSshKey { .. } => "add-ssh-key",
            Commands::DeleteSshKey { .. } => "delete-ssh-key",
            Commands::LaunchInstance(_) => "launch-instance",
            Commands::TerminateInstances { .. } => "terminate-instances",
        }
    }
}

#[derive(Args, Debug, Default)]
#[command(after_help = "Examples:
  lambda launch-instance --config wan2-instance
  lambda launch-instance --region us-east-1 --instance-type gpu_1x_a10 --ssh-key my-key --filesystem models
  lambda launch-instance --config wan2-instance --filesystem-mount fs-123=/data --user-data-file init.yaml")]
pub struct LaunchArgs {
    /// Profile name or path to a YAML profile
    #[arg(long)]
    pub config: Option<String>,

    /// Region (overrides profile)
    #[arg(long)]
    pub region: Option<String>,

    /// Instance type slug (overrides profile)
    #[arg(long)]
    pub instance_type: Option<String>,

    /// SSH key name (overrides profile)
    #[arg(long)]
    pub ssh_key: Option<String>,

    /// Persistent filesystem name to attach (overrides profile)
    #[arg(long)]
    pub filesystem: Option<String>,

    /// Attach a filesystem by id at a custom path, FS_ID=/mount/path (repeatable)
    #[arg(long = "filesystem-mount")]
    pub filesystem_mounts: Vec<String>,

    /// Friendly instance name
    #[arg(long)]
    pub name: Option<String>,

    /// Hostname to assign
    #[arg(long)]
    pub hostname: Option<String>,

    /// Instance tag KEY=VALUE (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// cloud-init user-data file applied on launch (overrides profile)
    #[arg(long)]
    pub user_data_file: Option<PathBuf>,
}

impl LaunchArgs {
    /// Flags as the highest-precedence layer.
    pub fn overrides(&self) -> Result<PartialLaunchSpec, ConfigError> {
        let user_data = match &self.user_data_file {
            Some(path) => Some(config::read_user_data(path)?),
            None => None,
        };
        Ok(PartialLaunchSpec {
            region: self.region.clone(),
            instance_type: self.instance_type.clone(),
            ssh_key: self.ssh_key.clone(),
            filesystem: self.filesystem.clone(),
            filesystem_mounts: self
                .filesystem_mounts
                .iter()
                .map(|m| config::parse_mount(m))
                .collect::<Result<_, _>>()?,
            name: self.name.clone(),
            hostname: self.hostname.clone(),
            tags: config::parse_tags(&self.tags)?,
            user_data,
            ..Default::default()
        })
    }
}
