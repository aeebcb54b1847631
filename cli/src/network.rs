use anyhow::{Context, Result};
use dwh::network::{enable_access, revoke_access};
use dwh::{ControlPlane, Settings};

pub(crate) async fn enable<C>(client: &C, settings: &Settings) -> Result<()>
where
    C: ControlPlane,
{
    let cluster = &settings.cluster;
    let rule = enable_access(
        client,
        &cluster.identifier,
        settings.ingress_cidr()?,
        cluster.port,
    )
    .await
    .context(format!(
        "Unable to enable access to cluster '{}'",
        cluster.identifier
    ))?;
    println!("Opened {}", rule);
    Ok(())
}

pub(crate) async fn disable<C>(client: &C, settings: &Settings) -> Result<()>
where
    C: ControlPlane,
{
    let cluster = &settings.cluster;
    let rule = revoke_access(
        client,
        &cluster.identifier,
        settings.ingress_cidr()?,
        cluster.port,
    )
    .await
    .context(format!(
        "Unable to disable access to cluster '{}'",
        cluster.identifier
    ))?;
    println!("Closed {}", rule);
    Ok(())
}
