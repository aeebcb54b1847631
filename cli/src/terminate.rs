use anyhow::{Context, Result};
use dwh::lifecycle::{await_deleted, terminate, FinalSnapshot};
use dwh::{Backoff, ControlPlane, Settings};

/// Request deletion of the cluster, keeping a timestamped final snapshot unless
/// `skip_final_snapshot` is set. With a `wait` backoff, poll until the cluster is gone.
pub(crate) async fn run<C>(
    client: &C,
    settings: &Settings,
    skip_final_snapshot: bool,
    wait: Option<Backoff>,
) -> Result<()>
where
    C: ControlPlane,
{
    let cluster_id = settings.cluster.identifier.as_str();
    let snapshot = if skip_final_snapshot {
        FinalSnapshot::Skip
    } else {
        FinalSnapshot::timestamped(cluster_id)
    };
    let state = terminate(client, cluster_id, &snapshot)
        .await
        .context(format!("Unable to terminate cluster '{}'", cluster_id))?;
    if let FinalSnapshot::Retain(snapshot_id) = &snapshot {
        println!("Final snapshot: {}", snapshot_id);
    }

    match wait {
        Some(backoff) => {
            await_deleted(client, cluster_id, &backoff)
                .await
                .context(format!("Cluster '{}' was not deleted", cluster_id))?;
            println!("Cluster '{}' has been deleted", cluster_id);
        }
        None => println!("Cluster '{}' is '{}'", cluster_id, state.status),
    }
    Ok(())
}
