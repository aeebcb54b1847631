use anyhow::{Context, Result};
use dwh::access::role_arn;
use dwh::lifecycle::launch;
use dwh::status::StatusReport;
use dwh::{Backoff, ControlPlane, Settings};

/// Launch the cluster with the access role attached and wait for it to become available.
pub(crate) async fn run<C>(client: &C, settings: &Settings, backoff: &Backoff) -> Result<()>
where
    C: ControlPlane,
{
    let spec = &settings.cluster;
    let role_arn = role_arn(client, &spec.role_name, &Backoff::transient())
        .await
        .context(format!("Unable to find access role '{}'", spec.role_name))?;
    let state = launch(client, spec, &role_arn, backoff)
        .await
        .context(format!("Unable to launch cluster '{}'", spec.identifier))?;
    print!("{}", StatusReport::new(&state));
    Ok(())
}
