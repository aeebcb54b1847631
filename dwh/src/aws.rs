use crate::config::{AwsCredentials, ClusterSpec, ClusterType};
use crate::constants::{ROLE_PATH, SDK_MAX_ATTEMPTS};
use crate::control_plane::{
    AccessRole, ApiError, ApiResult, ClusterState, ClusterStatus, ControlPlane, Endpoint,
    FailureKind, IntoApiError,
};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_redshift::model::Cluster;
use aws_sdk_redshift::types::SdkError;
use aws_smithy_types::retry::{ProvideErrorKind, RetryConfig, RetryMode};
use aws_types::region::Region;
use aws_types::SdkConfig;
use log::{debug, info};
use std::collections::BTreeSet;

/// Set up the config for aws calls using the key pair from the configuration file and the given
/// region. The SDK retries throttling and transient failures on its own, adaptively.
pub async fn aws_config(credentials: &AwsCredentials, region: &str) -> SdkConfig {
    info!(
        "Creating a custom region provider for '{}' to be used in the aws config.",
        region
    );
    let provider = SharedCredentialsProvider::new(Credentials::new(
        credentials.access_key_id.clone(),
        credentials.secret_access_key.clone(),
        None,
        None,
        "dwh_config",
    ));
    aws_config::from_env()
        .retry_config(
            RetryConfig::standard()
                .with_retry_mode(RetryMode::Adaptive)
                .with_max_attempts(SDK_MAX_ATTEMPTS),
        )
        .credentials_provider(provider)
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// [`ControlPlane`] backed by the IAM, Redshift and EC2 SDK clients.
#[derive(Clone, Debug)]
pub struct AwsControlPlane {
    iam: aws_sdk_iam::Client,
    redshift: aws_sdk_redshift::Client,
    ec2: aws_sdk_ec2::Client,
}

impl AwsControlPlane {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            iam: aws_sdk_iam::Client::new(config),
            redshift: aws_sdk_redshift::Client::new(config),
            ec2: aws_sdk_ec2::Client::new(config),
        }
    }
}

#[async_trait::async_trait]
impl ControlPlane for AwsControlPlane {
    async fn get_role(&self, role_name: &str) -> ApiResult<AccessRole> {
        let output = self
            .iam
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| api_error(e, format!("Unable to get role '{}'", role_name)))?;
        let arn = output
            .role()
            .and_then(|role| role.arn())
            .context(FailureKind::Other, "Role does not contain an arn.")?;
        Ok(AccessRole {
            name: role_name.to_string(),
            arn: arn.to_string(),
            attached_policies: BTreeSet::new(),
        })
    }

    async fn create_role(
        &self,
        role_name: &str,
        description: &str,
        trust_policy: &str,
    ) -> ApiResult<AccessRole> {
        let output = self
            .iam
            .create_role()
            .path(ROLE_PATH)
            .role_name(role_name)
            .description(description)
            .assume_role_policy_document(trust_policy)
            .send()
            .await
            .map_err(|e| api_error(e, format!("Unable to create role '{}'", role_name)))?;
        let arn = output
            .role()
            .and_then(|role| role.arn())
            .context(FailureKind::Other, "Created role does not contain an arn.")?;
        Ok(AccessRole {
            name: role_name.to_string(),
            arn: arn.to_string(),
            attached_policies: BTreeSet::new(),
        })
    }

    async fn attached_role_policies(&self, role_name: &str) -> ApiResult<BTreeSet<String>> {
        let output = self
            .iam
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| {
                api_error(
                    e,
                    format!("Unable to list policies attached to '{}'", role_name),
                )
            })?;
        Ok(output
            .attached_policies()
            .unwrap_or_default()
            .iter()
            .filter_map(|policy| policy.policy_arn())
            .map(|arn| arn.to_string())
            .collect())
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ApiResult<()> {
        self.iam
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| {
                api_error(
                    e,
                    format!("Unable to attach '{}' to '{}'", policy_arn, role_name),
                )
            })?;
        Ok(())
    }

    async fn create_cluster(&self, spec: &ClusterSpec, role_arn: &str) -> ApiResult<ClusterState> {
        let number_of_nodes = requested_node_count(spec)?;
        debug!(
            "Requesting {} cluster '{}' of {} x {}",
            spec.cluster_type, spec.identifier, spec.node_count, spec.node_type
        );
        let output = self
            .redshift
            .create_cluster()
            .cluster_identifier(&spec.identifier)
            .cluster_type(spec.cluster_type.as_str())
            .node_type(&spec.node_type)
            .set_number_of_nodes(number_of_nodes)
            .db_name(&spec.db_name)
            .master_username(&spec.master.username)
            .master_user_password(&spec.master.password)
            .port(i32::from(spec.port))
            .iam_roles(role_arn)
            .send()
            .await
            .map_err(|e| {
                api_error(
                    e,
                    format!("Unable to create cluster '{}'", spec.identifier),
                )
            })?;
        output
            .cluster()
            .and_then(cluster_state)
            .context(FailureKind::Other, "Create response does not describe the cluster.")
    }

    async fn describe_cluster(&self, cluster_id: &str) -> ApiResult<ClusterState> {
        let output = self
            .redshift
            .describe_clusters()
            .cluster_identifier(cluster_id)
            .send()
            .await
            .map_err(|e| api_error(e, format!("Unable to describe cluster '{}'", cluster_id)))?;
        output
            .clusters()
            .and_then(|clusters| clusters.first())
            .and_then(cluster_state)
            .context(
                FailureKind::NotFound,
                format!("Cluster '{}' is missing from the response.", cluster_id),
            )
    }

    async fn delete_cluster(
        &self,
        cluster_id: &str,
        final_snapshot: Option<&str>,
    ) -> ApiResult<ClusterState> {
        let output = self
            .redshift
            .delete_cluster()
            .cluster_identifier(cluster_id)
            .skip_final_cluster_snapshot(final_snapshot.is_none())
            .set_final_cluster_snapshot_identifier(final_snapshot.map(|s| s.to_string()))
            .send()
            .await
            .map_err(|e| api_error(e, format!("Unable to delete cluster '{}'", cluster_id)))?;
        output
            .cluster()
            .and_then(cluster_state)
            .context(FailureKind::Other, "Delete response does not describe the cluster.")
    }

    async fn authorize_ingress(&self, group_id: &str, cidr: &str, port: u16) -> ApiResult<()> {
        self.ec2
            .authorize_security_group_ingress()
            .group_id(group_id)
            .ip_protocol("tcp")
            .cidr_ip(cidr)
            .from_port(i32::from(port))
            .to_port(i32::from(port))
            .send()
            .await
            .map_err(|e| {
                api_error(
                    e,
                    format!("Unable to authorize ingress on '{}'", group_id),
                )
            })?;
        Ok(())
    }

    async fn revoke_ingress(&self, group_id: &str, cidr: &str, port: u16) -> ApiResult<()> {
        self.ec2
            .revoke_security_group_ingress()
            .group_id(group_id)
            .ip_protocol("tcp")
            .cidr_ip(cidr)
            .from_port(i32::from(port))
            .to_port(i32::from(port))
            .send()
            .await
            .map_err(|e| api_error(e, format!("Unable to revoke ingress on '{}'", group_id)))?;
        Ok(())
    }
}

/// The node count to send with a create request. The provider rejects a node count for single
/// node clusters.
fn requested_node_count(spec: &ClusterSpec) -> ApiResult<Option<i32>> {
    match spec.cluster_type {
        ClusterType::SingleNode => Ok(None),
        ClusterType::MultiNode => i32::try_from(spec.node_count).map(Some).context(
            FailureKind::Validation,
            format!("Cannot request {} nodes", spec.node_count),
        ),
    }
}

/// Classify an SDK error. Anything that failed before a service response arrived is transient;
/// service errors are classified by their error code.
fn api_error<E, R>(err: SdkError<E, R>, message: String) -> ApiError
where
    E: ProvideErrorKind + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            FailureKind::Transient
        }
        SdkError::ServiceError(service_error) => {
            let err = service_error.err();
            FailureKind::from_code(err.code(), err.retryable_error_kind().is_some())
        }
        _ => FailureKind::Other,
    };
    ApiError::new_with_source_and_context(kind, message, err)
}

fn cluster_state(cluster: &Cluster) -> Option<ClusterState> {
    let identifier = cluster.cluster_identifier()?;
    let status = ClusterStatus::from(cluster.cluster_status().unwrap_or("unknown"));
    let mut state = ClusterState::new(identifier, status);
    state.node_type = cluster.node_type().map(|s| s.to_string());
    state.number_of_nodes = u32::try_from(cluster.number_of_nodes())
        .ok()
        .filter(|n| *n > 0);
    state.master_username = cluster.master_username().map(|s| s.to_string());
    state.db_name = cluster.db_name().map(|s| s.to_string());
    state.endpoint = cluster.endpoint().and_then(|endpoint| {
        endpoint.address().map(|address| Endpoint {
            address: address.to_string(),
            port: u16::try_from(endpoint.port()).ok().filter(|p| *p > 0),
        })
    });
    state.vpc_id = cluster.vpc_id().map(|s| s.to_string());
    state.security_group_ids = cluster
        .vpc_security_groups()
        .unwrap_or_default()
        .iter()
        .filter_map(|group| group.vpc_security_group_id())
        .map(|id| id.to_string())
        .collect();
    state.iam_role_arns = cluster
        .iam_roles()
        .unwrap_or_default()
        .iter()
        .filter_map(|role| role.iam_role_arn())
        .map(|arn| arn.to_string())
        .collect();
    Some(state)
}
