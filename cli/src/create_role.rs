use anyhow::{Context, Result};
use dwh::access::ensure_access_role;
use dwh::{Backoff, ControlPlane, Settings};

/// Create the cluster's access role, or bring an existing one up to date, and print its ARN.
pub(crate) async fn run<C>(client: &C, settings: &Settings) -> Result<()>
where
    C: ControlPlane,
{
    let role_name = &settings.cluster.role_name;
    let role = ensure_access_role(client, role_name, &Backoff::transient())
        .await
        .context(format!("Unable to create access role '{}'", role_name))?;
    println!("{}", role.arn);
    Ok(())
}
