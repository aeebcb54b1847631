/*!

This is the command line interface for provisioning and inspecting the data-warehouse cluster
described by a configuration file.

!*/

mod action;
mod create_role;
mod launch;
mod network;
mod status;
mod terminate;

use action::Action;
use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgGroup, CommandFactory, Parser};
use dwh::{aws_config, AwsControlPlane, Backoff, ErrorClass, Settings};
use env_logger::Builder;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// Provision, open up, inspect and tear down a Redshift data-warehouse cluster.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
#[clap(group(ArgGroup::new("mode").required(true).args(&["status", "action"])))]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,

    /// Path to the configuration file.
    #[clap(long = "config", default_value = dwh::constants::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the cluster's current attributes.
    #[clap(long = "status")]
    status: bool,

    /// Print the status as JSON.
    #[clap(long = "json")]
    json: bool,

    /// The action to run: 1|create-role, 2|launch, 3|enable-access, 4|terminate,
    /// 5|disable-access.
    #[clap(long = "action", short = 'a')]
    action: Option<Action>,

    /// Seconds to wait between the first cluster status polls.
    #[clap(long = "poll-interval", default_value = "15")]
    poll_interval: u64,

    /// The number of times to poll the cluster status before giving up.
    #[clap(long = "max-polls", default_value = "60")]
    max_polls: u32,

    /// Delete the cluster without keeping a final snapshot.
    #[clap(long = "skip-final-snapshot")]
    skip_final_snapshot: bool,

    /// After requesting deletion, wait until the cluster is gone.
    #[clap(long = "wait")]
    wait: bool,
}

impl Args {
    /// `--json` only applies to `--status`.
    fn validate(&self) -> std::result::Result<(), clap::Error> {
        if self.json && !self.status {
            return Err(Args::command().error(
                ErrorKind::MissingRequiredArgument,
                "--json can only be used with --status",
            ));
        }
        Ok(())
    }

    fn backoff(&self) -> Backoff {
        Backoff::polling(Duration::from_secs(self.poll_interval), self.max_polls)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = args.validate() {
        e.exit();
    }
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{}", error_message(&e));
        std::process::exit(exit_code(&e));
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::from_path(&args.config).context(format!(
        "Unable to load configuration from '{}'",
        args.config.display()
    ))?;
    // The network actions cannot run without a source CIDR, so check before touching AWS.
    if matches!(args.action, Some(action) if action.needs_ingress_cidr()) {
        settings
            .ingress_cidr()
            .context("The network actions need an ingress CIDR")?;
    }

    let config = aws_config(&settings.credentials, &settings.region).await;
    let client = AwsControlPlane::new(&config);

    match args.action {
        None => status::run(&client, &settings, args.json).await,
        Some(Action::CreateRole) => create_role::run(&client, &settings).await,
        Some(Action::Launch) => launch::run(&client, &settings, &args.backoff()).await,
        Some(Action::EnableAccess) => network::enable(&client, &settings).await,
        Some(Action::Terminate) => {
            let backoff = args.wait.then(|| args.backoff());
            terminate::run(&client, &settings, args.skip_final_snapshot, backoff).await
        }
        Some(Action::DisableAccess) => network::disable(&client, &settings).await,
    }
}

/// Pick the exit code from the first `dwh::Error` in the chain.
fn exit_code(e: &anyhow::Error) -> i32 {
    let class = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<dwh::Error>())
        .map(dwh::Error::class);
    match class {
        Some(ErrorClass::Config) => 3,
        Some(ErrorClass::Permission) => 4,
        Some(ErrorClass::Validation) => 5,
        Some(ErrorClass::NotFound) => 6,
        Some(ErrorClass::Timeout) => 7,
        Some(ErrorClass::Transient) => 8,
        Some(ErrorClass::Other) | None => 1,
    }
}

/// The outermost context followed by the library error. The library error's message already
/// includes its causes, so the rest of the chain is not repeated.
fn error_message(e: &anyhow::Error) -> String {
    match e
        .chain()
        .skip(1)
        .find_map(|cause| cause.downcast_ref::<dwh::Error>())
    {
        Some(cause) => format!("{}: {}", e, cause),
        None if e.is::<dwh::Error>() => e.to_string(),
        None => format!("{:#}", e),
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use the log level for this crate and the library only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("dwh"), level)
                .init();
        }
    }
}
