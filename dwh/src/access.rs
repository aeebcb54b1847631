/*!

Provisions the IAM role that lets the cluster read from S3.

!*/

use crate::backoff::{retry_transient, Backoff};
use crate::constants::{ROLE_DESCRIPTION, ROLE_TRUSTED_SERVICE, S3_READ_ONLY_POLICY_ARN};
use crate::control_plane::{AccessRole, ApiResult, ControlPlane, FailureKind};
use crate::error::{self, Result};
use log::{debug, info};
use serde_json::json;
use snafu::ResultExt;

/// Create the role named `role_name` if it does not exist and make sure the S3 read-only policy
/// is attached to it. Safe to call repeatedly: an existing role is reused, including one created
/// concurrently by someone else.
pub async fn ensure_access_role<C>(
    client: &C,
    role_name: &str,
    backoff: &Backoff,
) -> Result<AccessRole>
where
    C: ControlPlane,
{
    let mut role = match find_role(client, role_name, backoff)
        .await
        .context(error::GetRoleSnafu { role_name })?
    {
        Some(role) => {
            info!("Role '{}' already exists, reusing it", role_name);
            role
        }
        None => {
            info!("Creating a new IAM Role '{}'...", role_name);
            create_role(client, role_name, backoff).await?
        }
    };

    role.attached_policies = retry_transient(backoff, "list_attached_role_policies", || {
        client.attached_role_policies(role_name)
    })
    .await
    .context(error::ListRolePoliciesSnafu { role_name })?;

    if role.attached_policies.contains(S3_READ_ONLY_POLICY_ARN) {
        debug!(
            "Policy '{}' is already attached to '{}'",
            S3_READ_ONLY_POLICY_ARN, role_name
        );
    } else {
        info!("Attaching S3 read-only access policy...");
        retry_transient(backoff, "attach_role_policy", || {
            client.attach_role_policy(role_name, S3_READ_ONLY_POLICY_ARN)
        })
        .await
        .context(error::AttachRolePolicySnafu {
            role_name,
            policy_arn: S3_READ_ONLY_POLICY_ARN,
        })?;
        role.attached_policies.insert(S3_READ_ONLY_POLICY_ARN.to_string());
    }

    info!("Role '{}' is ready: {}", role_name, role.arn);
    Ok(role)
}

/// The ARN of an existing role. A missing role is reported as such so that the user knows to
/// create it first.
pub async fn role_arn<C>(client: &C, role_name: &str, backoff: &Backoff) -> Result<String>
where
    C: ControlPlane,
{
    match find_role(client, role_name, backoff)
        .await
        .context(error::GetRoleSnafu { role_name })?
    {
        Some(role) => Ok(role.arn),
        None => error::RoleNotFoundSnafu { role_name }.fail(),
    }
}

async fn find_role<C>(
    client: &C,
    role_name: &str,
    backoff: &Backoff,
) -> ApiResult<Option<AccessRole>>
where
    C: ControlPlane,
{
    match retry_transient(backoff, "get_role", || client.get_role(role_name)).await {
        Ok(role) => Ok(Some(role)),
        Err(e) if e.kind() == FailureKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

async fn create_role<C>(client: &C, role_name: &str, backoff: &Backoff) -> Result<AccessRole>
where
    C: ControlPlane,
{
    let trust_policy = trust_policy_document();
    let created = retry_transient(backoff, "create_role", || {
        client.create_role(role_name, ROLE_DESCRIPTION, &trust_policy)
    })
    .await;
    match created {
        Ok(role) => Ok(role),
        Err(e) if e.kind() == FailureKind::AlreadyExists => {
            info!(
                "Role '{}' was created by someone else in the meantime, reusing it",
                role_name
            );
            retry_transient(backoff, "get_role", || client.get_role(role_name))
                .await
                .context(error::GetRoleSnafu { role_name })
        }
        Err(e) => Err(e).context(error::CreateRoleSnafu { role_name }),
    }
}

/// Allows the warehouse service to assume the role.
fn trust_policy_document() -> String {
    json!({
        "Statement": [
            {
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": ROLE_TRUSTED_SERVICE }
            }
        ],
        "Version": "2012-10-17"
    })
    .to_string()
}

#[test]
fn trust_policy_names_the_service() {
    let policy: serde_json::Value = serde_json::from_str(&trust_policy_document()).unwrap();
    assert_eq!(
        policy["Statement"][0]["Principal"]["Service"],
        "redshift.amazonaws.com"
    );
    assert_eq!(policy["Statement"][0]["Action"], "sts:AssumeRole");
    assert_eq!(policy["Version"], "2012-10-17");
}
