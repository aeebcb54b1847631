/*!

The seam between this crate and the provider's control plane. Everything the lifecycle, access,
network and status components need from the provider goes through [`ControlPlane`], which makes
it possible to drive those components with a test double instead of the real SDK clients.

!*/

use crate::config::ClusterSpec;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// The operations this tool consumes from the provider. Implementations translate provider
/// failures into [`ApiError`]s with a [`FailureKind`] so that callers can tell retryable failures
/// from fatal ones.
#[async_trait::async_trait]
pub trait ControlPlane: Send + Sync {
    /// Look up a role by name. A missing role is an error of kind [`FailureKind::NotFound`].
    async fn get_role(&self, role_name: &str) -> ApiResult<AccessRole>;

    /// Create a role that `trust_policy` allows to be assumed. A role that already exists is an
    /// error of kind [`FailureKind::AlreadyExists`].
    async fn create_role(
        &self,
        role_name: &str,
        description: &str,
        trust_policy: &str,
    ) -> ApiResult<AccessRole>;

    async fn attached_role_policies(&self, role_name: &str) -> ApiResult<BTreeSet<String>>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ApiResult<()>;

    /// Request a new cluster built from `spec` that can assume `role_arn`.
    async fn create_cluster(&self, spec: &ClusterSpec, role_arn: &str) -> ApiResult<ClusterState>;

    /// Fetch a fresh snapshot of the cluster. A missing cluster is an error of kind
    /// [`FailureKind::NotFound`].
    async fn describe_cluster(&self, cluster_id: &str) -> ApiResult<ClusterState>;

    /// Request deletion of the cluster. When `final_snapshot` is `Some`, the provider keeps a
    /// snapshot under that identifier.
    async fn delete_cluster(
        &self,
        cluster_id: &str,
        final_snapshot: Option<&str>,
    ) -> ApiResult<ClusterState>;

    /// Allow TCP traffic on `port` from `cidr`. An identical existing rule is an error of kind
    /// [`FailureKind::AlreadyExists`].
    async fn authorize_ingress(&self, group_id: &str, cidr: &str, port: u16) -> ApiResult<()>;

    /// Remove the rule added by `authorize_ingress`. A missing rule is an error of kind
    /// [`FailureKind::NotFound`].
    async fn revoke_ingress(&self, group_id: &str, cidr: &str, port: u16) -> ApiResult<()>;
}

/// The IAM role that grants the cluster read access to object storage.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRole {
    pub name: String,
    pub arn: String,
    pub attached_policies: BTreeSet<String>,
}

/// A snapshot of the cluster as reported by the provider. Everything except the identifier and
/// status may be absent, e.g. there is no endpoint until the cluster is available.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterState {
    pub identifier: String,
    pub status: ClusterStatus,
    pub node_type: Option<String>,
    pub number_of_nodes: Option<u32>,
    pub master_username: Option<String>,
    pub db_name: Option<String>,
    pub endpoint: Option<Endpoint>,
    pub vpc_id: Option<String>,
    pub security_group_ids: Vec<String>,
    pub iam_role_arns: Vec<String>,
}

impl ClusterState {
    pub fn new<S>(identifier: S, status: ClusterStatus) -> Self
    where
        S: Into<String>,
    {
        Self {
            identifier: identifier.into(),
            status,
            node_type: None,
            number_of_nodes: None,
            master_username: None,
            db_name: None,
            endpoint: None,
            vpc_id: None,
            security_group_ids: Vec::new(),
            iam_role_arns: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Endpoint {
    pub address: String,
    pub port: Option<u16>,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.address, port),
            None => write!(f, "{}", self.address),
        }
    }
}

/// The provider's cluster status string, with the values this tool acts on broken out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClusterStatus {
    Creating,
    Available,
    Modifying,
    Rebooting,
    Resizing,
    Deleting,
    FinalSnapshot,
    Paused,
    /// The cluster will not become available without intervention.
    Failed(String),
    Other(String),
}

impl ClusterStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ClusterStatus::Creating => "creating",
            ClusterStatus::Available => "available",
            ClusterStatus::Modifying => "modifying",
            ClusterStatus::Rebooting => "rebooting",
            ClusterStatus::Resizing => "resizing",
            ClusterStatus::Deleting => "deleting",
            ClusterStatus::FinalSnapshot => "final-snapshot",
            ClusterStatus::Paused => "paused",
            ClusterStatus::Failed(s) | ClusterStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ClusterStatus::Available)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ClusterStatus::Failed(_))
    }

    /// The cluster is on its way out.
    pub fn is_deleting(&self) -> bool {
        matches!(self, ClusterStatus::Deleting | ClusterStatus::FinalSnapshot)
    }
}

impl From<&str> for ClusterStatus {
    fn from(s: &str) -> Self {
        match s {
            "creating" => ClusterStatus::Creating,
            "available" => ClusterStatus::Available,
            "modifying" => ClusterStatus::Modifying,
            "rebooting" => ClusterStatus::Rebooting,
            "resizing" => ClusterStatus::Resizing,
            "deleting" => ClusterStatus::Deleting,
            "final-snapshot" => ClusterStatus::FinalSnapshot,
            "paused" => ClusterStatus::Paused,
            "hardware-failure" | "storage-full" => ClusterStatus::Failed(s.to_string()),
            s if s.starts_with("incompatible-") => ClusterStatus::Failed(s.to_string()),
            other => ClusterStatus::Other(other.to_string()),
        }
    }
}

impl Display for ClusterStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.as_str(), f)
    }
}

impl Serialize for ClusterStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A rule admitting TCP traffic to the cluster.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressRule {
    pub group_id: String,
    pub cidr: String,
    pub port: u16,
}

impl Display for IngressRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tcp/{} from {} on '{}'", self.port, self.cidr, self.group_id)
    }
}

/// What went wrong when talking to the control plane, in terms a caller can act on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The credentials are not allowed to perform the operation.
    Permission,
    /// The request was rejected as invalid, or it would exceed a quota.
    Validation,
    NotFound,
    AlreadyExists,
    /// A network failure, throttling or a provider-side fault. Worth retrying.
    Transient,
    Other,
}

impl FailureKind {
    /// Classify a provider error code. `retryable` is the SDK's own opinion of the error and
    /// is used when the code is not one we recognize.
    pub fn from_code(code: Option<&str>, retryable: bool) -> Self {
        match code.unwrap_or_default() {
            "AccessDenied"
            | "AccessDeniedException"
            | "AccessDeniedFault"
            | "AuthFailure"
            | "ExpiredToken"
            | "InvalidClientTokenId"
            | "SignatureDoesNotMatch"
            | "UnauthorizedAccess"
            | "UnauthorizedOperation"
            | "UnrecognizedClientException" => FailureKind::Permission,
            "NoSuchEntity"
            | "ClusterNotFound"
            | "InvalidGroup.NotFound"
            | "InvalidPermission.NotFound" => FailureKind::NotFound,
            "EntityAlreadyExists" | "ClusterAlreadyExists" | "InvalidPermission.Duplicate" => {
                FailureKind::AlreadyExists
            }
            "Throttling"
            | "ThrottlingException"
            | "RequestLimitExceeded"
            | "ServiceUnavailable"
            | "InternalFailure"
            | "InternalError" => FailureKind::Transient,
            "ClusterQuotaExceeded"
            | "InsufficientClusterCapacity"
            | "InvalidClusterState"
            | "InvalidClusterSubnetGroupState"
            | "InvalidParameterCombination"
            | "InvalidParameterValue"
            | "InvalidSubnet"
            | "InvalidVPCNetworkStateFault"
            | "LimitExceeded"
            | "MalformedPolicyDocument"
            | "NumberOfNodesPerClusterLimitExceeded"
            | "NumberOfNodesQuotaExceeded"
            | "RulesPerSecurityGroupLimitExceeded"
            | "UnsupportedOperation"
            | "ValidationError" => FailureKind::Validation,
            _ if retryable => FailureKind::Transient,
            _ => FailureKind::Other,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Transient)
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Permission => "permission denied",
            FailureKind::Validation => "rejected by the provider",
            FailureKind::NotFound => "not found",
            FailureKind::AlreadyExists => "already exists",
            FailureKind::Transient => "transient failure",
            FailureKind::Other => "failed",
        };
        Display::fmt(s, f)
    }
}

/// The error type returned by [`ControlPlane`] implementations.
#[derive(Debug)]
pub struct ApiError {
    /// How the failure should be treated by the caller.
    kind: FailureKind,

    /// Any message to be included with the error. This will be included in the formatted display
    /// before `inner`.
    context: Option<String>,

    /// The error that caused this error.
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn new_with_source_and_context<S, E>(kind: FailureKind, context: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            kind,
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<S>(kind: FailureKind, context: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            kind,
            context: Some(context.into()),
            inner: None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(context) = self.context() {
            write!(f, ", {}", context)?;
        }
        if let Some(inner) = self.inner() {
            write!(f, ": {}", inner)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A trait that makes it possible to convert error types to `ApiError` using a familiar
/// `context` function.
pub trait IntoApiError<T> {
    fn context<S>(self, kind: FailureKind, message: S) -> ApiResult<T>
    where
        S: Into<String>;
}

impl<T, E> IntoApiError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S>(self, kind: FailureKind, message: S) -> ApiResult<T>
    where
        S: Into<String>,
    {
        self.map_err(|e| ApiError::new_with_source_and_context(kind, message, e))
    }
}

// A missing field in a provider response is converted into an error.
impl<T> IntoApiError<T> for std::option::Option<T> {
    fn context<S>(self, kind: FailureKind, message: S) -> ApiResult<T>
    where
        S: Into<String>,
    {
        self.ok_or_else(|| ApiError::new_with_context(kind, message))
    }
}
