use crate::backoff::{retry_transient, Backoff};
use crate::control_plane::{ClusterState, ControlPlane, FailureKind};
use crate::error::{self, Result};
use snafu::ResultExt;
use std::fmt::{Display, Formatter};

/// Fetch a fresh snapshot of the cluster. An unknown identifier is [`Error::ClusterNotFound`].
///
/// [`Error::ClusterNotFound`]: crate::Error::ClusterNotFound
pub async fn status<C>(client: &C, cluster_id: &str) -> Result<ClusterState>
where
    C: ControlPlane,
{
    match retry_transient(&Backoff::transient(), "describe_cluster", || {
        client.describe_cluster(cluster_id)
    })
    .await
    {
        Ok(state) => Ok(state),
        Err(e) if e.kind() == FailureKind::NotFound => {
            error::ClusterNotFoundSnafu { cluster_id }.fail()
        }
        Err(e) => Err(e).context(error::DescribeClusterSnafu { cluster_id }),
    }
}

/// Renders a fixed set of cluster attributes, one per line. Attributes the provider did not
/// report are left out.
pub struct StatusReport<'a> {
    state: &'a ClusterState,
}

impl<'a> StatusReport<'a> {
    pub fn new(state: &'a ClusterState) -> Self {
        Self { state }
    }

    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let state = self.state;
        [
            ("ClusterIdentifier", Some(state.identifier.clone())),
            ("NodeType", state.node_type.clone()),
            ("NumberOfNodes", state.number_of_nodes.map(|n| n.to_string())),
            ("ClusterStatus", Some(state.status.to_string())),
            ("MasterUsername", state.master_username.clone()),
            ("DBName", state.db_name.clone()),
            ("Endpoint", state.endpoint.as_ref().map(|e| e.to_string())),
            ("VpcId", state.vpc_id.clone()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect()
    }
}

impl Display for StatusReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (key, value) in self.fields() {
            writeln!(f, "{:20} {}", key, value)?;
        }
        Ok(())
    }
}
