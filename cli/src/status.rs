use anyhow::{Context, Result};
use dwh::status::{status, StatusReport};
use dwh::{ControlPlane, Settings};

/// Print the cluster's current attributes, either as aligned `key value` lines or as JSON.
pub(crate) async fn run<C>(client: &C, settings: &Settings, json: bool) -> Result<()>
where
    C: ControlPlane,
{
    let cluster_id = &settings.cluster.identifier;
    let state = status(client, cluster_id)
        .await
        .context(format!("Unable to get the status of cluster '{}'", cluster_id))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state)
                .context("Could not create string from status.")?
        );
    } else {
        print!("{}", StatusReport::new(&state));
    }
    Ok(())
}
