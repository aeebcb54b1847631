use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_CONFIG_PATH: &str = "config.cfg";

/// Attempts the SDK makes on its own before an error reaches us.
pub const SDK_MAX_ATTEMPTS: u32 = 15;

pub const ROLE_PATH: &str = "/";
pub const ROLE_DESCRIPTION: &str = "Allows Redshift clusters to access AWS services.";
pub const ROLE_TRUSTED_SERVICE: &str = "redshift.amazonaws.com";
pub const S3_READ_ONLY_POLICY_ARN: &str = "arn:aws:iam::aws:policy/AmazonS3ReadOnlyAccess";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_POLLS: u32 = 60;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Backoff used for retrying transient control-plane failures outside of the polls.
pub const TRANSIENT_RETRY_ATTEMPTS: u32 = 4;
pub const TRANSIENT_RETRY_INITIAL_DELAY: Duration = Duration::from_millis(500);
