use crate::control_plane::{ApiError, ClusterStatus, FailureKind, IngressRule};
use snafu::Snafu;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "Failed to attach policy '{}' to role '{}': {}",
        policy_arn,
        role_name,
        source
    ))]
    AttachRolePolicy {
        role_name: String,
        policy_arn: String,
        source: ApiError,
    },

    #[snafu(display("Unable to open ingress {}: {}", rule, source))]
    AuthorizeIngress { rule: IngressRule, source: ApiError },

    #[snafu(display("Cluster '{}' already exists", cluster_id))]
    ClusterExists { cluster_id: String },

    #[snafu(display(
        "Cluster '{}' entered status '{}' and will not become available",
        cluster_id,
        status
    ))]
    ClusterFailed {
        cluster_id: String,
        status: ClusterStatus,
    },

    #[snafu(display("Cluster '{}' does not exist", cluster_id))]
    ClusterNotFound { cluster_id: String },

    #[snafu(display("Unable to create cluster '{}': {}", cluster_id, source))]
    CreateCluster { cluster_id: String, source: ApiError },

    #[snafu(display("Unable to create role '{}': {}", role_name, source))]
    CreateRole { role_name: String, source: ApiError },

    #[snafu(display("Unable to delete cluster '{}': {}", cluster_id, source))]
    DeleteCluster { cluster_id: String, source: ApiError },

    #[snafu(display("Unable to describe cluster '{}': {}", cluster_id, source))]
    DescribeCluster { cluster_id: String, source: ApiError },

    #[snafu(display("Unable to get role '{}': {}", role_name, source))]
    GetRole { role_name: String, source: ApiError },

    #[snafu(display(
        "Cannot {} cluster '{}' while its status is '{}'",
        operation,
        cluster_id,
        status
    ))]
    InvalidState {
        cluster_id: String,
        operation: String,
        status: ClusterStatus,
    },

    #[snafu(display("Unable to list policies attached to role '{}': {}", role_name, source))]
    ListRolePolicies { role_name: String, source: ApiError },

    #[snafu(display("Key '{}' in section [{}] is malformed: {}", key, section, reason))]
    MalformedKey {
        section: String,
        key: String,
        reason: String,
    },

    #[snafu(display("Key '{}' is missing from section [{}]", key, section))]
    MissingKey { section: String, key: String },

    #[snafu(display("Section [{}] is missing from the configuration", section))]
    MissingSection { section: String },

    #[snafu(display("Cluster '{}' has no VPC security group to open", cluster_id))]
    NoSecurityGroup { cluster_id: String },

    #[snafu(display(
        "Unable to parse configuration '{}' as TOML ({}) or as INI: {}",
        path.display(),
        toml_error,
        source
    ))]
    ParseConfig {
        path: PathBuf,
        toml_error: toml::de::Error,
        source: ini::ParseError,
    },

    #[snafu(display(
        "Cluster '{}' was not {} after {} polls, last status '{}'",
        cluster_id,
        waiting_for,
        attempts,
        last_status.as_ref().map(|s| s.as_str()).unwrap_or("unknown")
    ))]
    PollTimeout {
        cluster_id: String,
        waiting_for: String,
        attempts: u32,
        last_status: Option<ClusterStatus>,
    },

    #[snafu(display("Unable to read configuration '{}': {}", path.display(), source))]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to close ingress {}: {}", rule, source))]
    RevokeIngress { rule: IngressRule, source: ApiError },

    #[snafu(display(
        "Role '{}' does not exist, create it first with the create-role action",
        role_name
    ))]
    RoleNotFound { role_name: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The broad categories of failure. The CLI chooses its exit code from these.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// The configuration file is missing, unreadable, or has a missing or malformed key.
    Config,
    Permission,
    /// The provider rejected the request, or the cluster is not in a state that allows it.
    Validation,
    NotFound,
    /// A poll ran out of attempts.
    Timeout,
    /// A failure that may succeed if tried again later.
    Transient,
    Other,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Transient)
    }
}

impl Display for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorClass::Config => "configuration error",
            ErrorClass::Permission => "permission denied",
            ErrorClass::Validation => "validation error",
            ErrorClass::NotFound => "not found",
            ErrorClass::Timeout => "timed out",
            ErrorClass::Transient => "transient error",
            ErrorClass::Other => "error",
        };
        Display::fmt(s, f)
    }
}

impl From<FailureKind> for ErrorClass {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Permission => ErrorClass::Permission,
            FailureKind::Validation | FailureKind::AlreadyExists => ErrorClass::Validation,
            FailureKind::NotFound => ErrorClass::NotFound,
            FailureKind::Transient => ErrorClass::Transient,
            FailureKind::Other => ErrorClass::Other,
        }
    }
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::MalformedKey { .. }
            | Error::MissingKey { .. }
            | Error::MissingSection { .. }
            | Error::ParseConfig { .. }
            | Error::ReadConfig { .. } => ErrorClass::Config,
            Error::AttachRolePolicy { source, .. }
            | Error::AuthorizeIngress { source, .. }
            | Error::CreateCluster { source, .. }
            | Error::CreateRole { source, .. }
            | Error::DeleteCluster { source, .. }
            | Error::DescribeCluster { source, .. }
            | Error::GetRole { source, .. }
            | Error::ListRolePolicies { source, .. }
            | Error::RevokeIngress { source, .. } => source.kind().into(),
            Error::ClusterExists { .. }
            | Error::ClusterFailed { .. }
            | Error::InvalidState { .. }
            | Error::NoSecurityGroup { .. } => ErrorClass::Validation,
            Error::ClusterNotFound { .. } | Error::RoleNotFound { .. } => ErrorClass::NotFound,
            Error::PollTimeout { .. } => ErrorClass::Timeout,
        }
    }
}
