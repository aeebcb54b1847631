/*!

Drives the cluster through `absent → creating → available → deleting → absent`. Each transition
is started by an explicit command; nothing here tries to converge on a desired state.

!*/

use crate::backoff::Backoff;
use crate::config::ClusterSpec;
use crate::control_plane::{ClusterState, ControlPlane, FailureKind};
use crate::error::{self, Error, Result};
use crate::status::status;
use log::{debug, info, warn};
use snafu::ResultExt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Whether deleting the cluster keeps a final snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FinalSnapshot {
    Skip,
    Retain(String),
}

impl FinalSnapshot {
    /// Keep a snapshot named `<cluster>-final-<unix seconds>`.
    pub fn timestamped(cluster_id: &str) -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        FinalSnapshot::Retain(format!("{}-final-{}", cluster_id.to_lowercase(), secs))
    }

    fn identifier(&self) -> Option<&str> {
        match self {
            FinalSnapshot::Skip => None,
            FinalSnapshot::Retain(id) => Some(id.as_str()),
        }
    }
}

/// Request a new cluster. Rejections are reported right away and never retried.
pub async fn create<C>(client: &C, spec: &ClusterSpec, role_arn: &str) -> Result<ClusterState>
where
    C: ControlPlane,
{
    let cluster_id = spec.identifier.as_str();
    info!("Creating cluster '{}'", cluster_id);
    match client.create_cluster(spec, role_arn).await {
        Ok(state) => {
            info!("Cluster '{}' is '{}'", cluster_id, state.status);
            Ok(state)
        }
        Err(e) if e.kind() == FailureKind::AlreadyExists => {
            error::ClusterExistsSnafu { cluster_id }.fail()
        }
        Err(e) => Err(e).context(error::CreateClusterSnafu { cluster_id }),
    }
}

/// Poll the cluster until it is available, at most `backoff.attempts()` times. Returns as soon
/// as a poll sees the cluster available.
pub async fn await_available<C>(
    client: &C,
    cluster_id: &str,
    backoff: &Backoff,
) -> Result<ClusterState>
where
    C: ControlPlane,
{
    let attempts = backoff.attempts();
    let mut last_status = None;
    for attempt in 1..=attempts {
        match client.describe_cluster(cluster_id).await {
            Ok(state) if state.status.is_available() => {
                info!("Cluster '{}' is available", cluster_id);
                return Ok(state);
            }
            Ok(state) if state.status.is_failed() || state.status.is_deleting() => {
                return error::ClusterFailedSnafu {
                    cluster_id,
                    status: state.status,
                }
                .fail();
            }
            Ok(state) => {
                info!(
                    "Cluster '{}' is '{}' (poll {} of {})",
                    cluster_id, state.status, attempt, attempts
                );
                last_status = Some(state.status);
            }
            Err(e) if e.kind() == FailureKind::NotFound => {
                return error::ClusterNotFoundSnafu { cluster_id }.fail();
            }
            Err(e) if e.kind().is_retryable() => {
                warn!(
                    "Unable to poll cluster '{}' (poll {} of {}): {}",
                    cluster_id, attempt, attempts, e
                );
            }
            Err(e) => return Err(e).context(error::DescribeClusterSnafu { cluster_id }),
        }
        if attempt < attempts {
            tokio::time::sleep(backoff.delay(attempt)).await;
        }
    }
    error::PollTimeoutSnafu {
        cluster_id,
        waiting_for: "available",
        attempts,
        last_status,
    }
    .fail()
}

/// Create the cluster and wait for it to become available. A cluster that already exists is
/// waited for instead of being treated as a failure.
pub async fn launch<C>(
    client: &C,
    spec: &ClusterSpec,
    role_arn: &str,
    backoff: &Backoff,
) -> Result<ClusterState>
where
    C: ControlPlane,
{
    match create(client, spec, role_arn).await {
        Ok(_) => {}
        Err(Error::ClusterExists { .. }) => {
            info!(
                "Cluster '{}' already exists, waiting for it to become available",
                spec.identifier
            );
        }
        Err(e) => return Err(e),
    }
    await_available(client, &spec.identifier, backoff).await
}

/// Request deletion of the cluster. A cluster that is already being deleted is left alone.
pub async fn terminate<C>(
    client: &C,
    cluster_id: &str,
    snapshot: &FinalSnapshot,
) -> Result<ClusterState>
where
    C: ControlPlane,
{
    let current = status(client, cluster_id).await?;
    if current.status.is_deleting() {
        info!("Cluster '{}' is already '{}'", cluster_id, current.status);
        return Ok(current);
    }

    match snapshot.identifier() {
        Some(snapshot_id) => info!(
            "Deleting cluster '{}', keeping final snapshot '{}'",
            cluster_id, snapshot_id
        ),
        None => info!("Deleting cluster '{}' without a final snapshot", cluster_id),
    }
    match client
        .delete_cluster(cluster_id, snapshot.identifier())
        .await
    {
        Ok(state) => {
            debug!("Cluster '{}' is '{}'", cluster_id, state.status);
            Ok(state)
        }
        Err(e) if e.kind() == FailureKind::NotFound => {
            error::ClusterNotFoundSnafu { cluster_id }.fail()
        }
        Err(e) => Err(e).context(error::DeleteClusterSnafu { cluster_id }),
    }
}

/// Poll until the cluster no longer exists, at most `backoff.attempts()` times.
pub async fn await_deleted<C>(client: &C, cluster_id: &str, backoff: &Backoff) -> Result<()>
where
    C: ControlPlane,
{
    let attempts = backoff.attempts();
    let mut last_status = None;
    for attempt in 1..=attempts {
        match client.describe_cluster(cluster_id).await {
            Err(e) if e.kind() == FailureKind::NotFound => {
                info!("Cluster '{}' has been deleted", cluster_id);
                return Ok(());
            }
            Err(e) if e.kind().is_retryable() => {
                warn!(
                    "Unable to poll cluster '{}' (poll {} of {}): {}",
                    cluster_id, attempt, attempts, e
                );
            }
            Err(e) => return Err(e).context(error::DescribeClusterSnafu { cluster_id }),
            Ok(state) => {
                info!(
                    "Cluster '{}' is '{}' (poll {} of {})",
                    cluster_id, state.status, attempt, attempts
                );
                last_status = Some(state.status);
            }
        }
        if attempt < attempts {
            tokio::time::sleep(backoff.delay(attempt)).await;
        }
    }
    error::PollTimeoutSnafu {
        cluster_id,
        waiting_for: "deleted",
        attempts,
        last_status,
    }
    .fail()
}

#[test]
fn timestamped_snapshot_name() {
    match FinalSnapshot::timestamped("dwhCluster") {
        FinalSnapshot::Retain(name) => {
            assert!(name.starts_with("dwhcluster-final-"));
            assert!(name["dwhcluster-final-".len()..]
                .chars()
                .all(|c| c.is_ascii_digit()));
        }
        FinalSnapshot::Skip => panic!("expected a snapshot to be retained"),
    }
    assert_eq!(FinalSnapshot::Skip.identifier(), None);
}
