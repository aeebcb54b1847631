/*!

`dwh` provisions and inspects a single Redshift data-warehouse cluster.

- [`config`] reads the credentials and cluster parameters from the configuration file.
- [`access`] creates the IAM role that lets the cluster read from S3.
- [`lifecycle`] creates, waits for, and deletes the cluster.
- [`network`] opens and closes ingress to the cluster.
- [`status`] reports the cluster's current attributes.

All of them talk to the provider through a [`ControlPlane`]; [`AwsControlPlane`] is the real one.

!*/

pub mod access;
mod aws;
pub mod backoff;
pub mod config;
pub mod constants;
pub mod control_plane;
mod error;
pub mod lifecycle;
pub mod network;
pub mod status;

pub use aws::{aws_config, AwsControlPlane};
pub use backoff::Backoff;
pub use config::{ClusterSpec, Settings};
pub use control_plane::{AccessRole, ClusterState, ClusterStatus, ControlPlane, IngressRule};
pub use error::{Error, ErrorClass, Result};
