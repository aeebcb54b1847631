use crate::backoff::{retry_transient, Backoff};
use crate::control_plane::{ControlPlane, FailureKind, IngressRule};
use crate::error::{self, Result};
use crate::status::status;
use log::info;
use snafu::{OptionExt, ResultExt};

/// Open TCP `port` to `cidr` on the cluster's VPC security group. The cluster must be available.
/// An identical rule that is already in place counts as success.
pub async fn enable_access<C>(
    client: &C,
    cluster_id: &str,
    cidr: &str,
    port: u16,
) -> Result<IngressRule>
where
    C: ControlPlane,
{
    let rule = ingress_rule(client, cluster_id, cidr, port, true).await?;
    info!("Opening {} for cluster '{}'", rule, cluster_id);
    match retry_transient(&Backoff::transient(), "authorize_ingress", || {
        client.authorize_ingress(&rule.group_id, &rule.cidr, rule.port)
    })
    .await
    {
        Ok(()) => {}
        Err(e) if e.kind() == FailureKind::AlreadyExists => {
            info!("Ingress {} is already open", rule)
        }
        Err(e) => {
            return Err(e).context(error::AuthorizeIngressSnafu { rule: rule.clone() });
        }
    }
    Ok(rule)
}

/// Remove the rule opened by [`enable_access`]. A rule that is not there counts as success.
pub async fn revoke_access<C>(
    client: &C,
    cluster_id: &str,
    cidr: &str,
    port: u16,
) -> Result<IngressRule>
where
    C: ControlPlane,
{
    let rule = ingress_rule(client, cluster_id, cidr, port, false).await?;
    info!("Closing {} for cluster '{}'", rule, cluster_id);
    match retry_transient(&Backoff::transient(), "revoke_ingress", || {
        client.revoke_ingress(&rule.group_id, &rule.cidr, rule.port)
    })
    .await
    {
        Ok(()) => {}
        Err(e) if e.kind() == FailureKind::NotFound => info!("Ingress {} is not open", rule),
        Err(e) => {
            return Err(e).context(error::RevokeIngressSnafu { rule: rule.clone() });
        }
    }
    Ok(rule)
}

async fn ingress_rule<C>(
    client: &C,
    cluster_id: &str,
    cidr: &str,
    port: u16,
    require_available: bool,
) -> Result<IngressRule>
where
    C: ControlPlane,
{
    let state = status(client, cluster_id).await?;
    if require_available && !state.status.is_available() {
        return error::InvalidStateSnafu {
            cluster_id,
            operation: "enable access to",
            status: state.status,
        }
        .fail();
    }
    let group_id = state
        .security_group_ids
        .first()
        .context(error::NoSecurityGroupSnafu { cluster_id })?;
    Ok(IngressRule {
        group_id: group_id.clone(),
        cidr: cidr.to_string(),
        port,
    })
}
