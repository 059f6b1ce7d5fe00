//! Cloud provider seam.
//!
//! [`CloudProvider`] is the only way commands talk to the provider;
//! [`LambdaClient`] binds it to the Lambda Cloud REST API.

pub mod client;
pub mod error;
pub mod models;
pub mod types;

pub use client::{LambdaClient, DEFAULT_BASE_URL};
pub use error::{ApiError, ErrorCategory, FieldError};
pub use types::{
    CloudProvider, Filesystem, FilesystemMount, ImageRef, Instance, InstanceStatus, InstanceType,
    LaunchRequest, SshKey,
};
