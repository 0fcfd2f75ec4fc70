//! Deploys a compiled contract to the configured network and reports the
//! address of the new instance.

pub mod arguments;
pub mod artifact;
pub mod chain;
pub mod config;
pub mod deployer;
pub mod error;
pub mod factory;

pub use {
    deployer::{ConfirmationPolicy, Deployment},
    error::DeploymentError,
};
use {
    crate::{
        arguments::Arguments,
        artifact::ArtifactStore,
        chain::{Chain, ethereum},
        config::Config,
        deployer::Deployer,
        factory::ContractFactory,
    },
    clap::Parser,
    std::io::Write,
};

/// Exit code of a failed run. Successful runs exit with 0.
pub const EXIT_FAILURE: u8 = 1;

pub async fn start(args: impl Iterator<Item = String>) -> u8 {
    let args = match parse_arguments(args) {
        Ok(args) => args,
        Err(code) => return code,
    };
    let obs_config = observe::Config::new(&args.logging.log_filter, args.logging.use_json_logs);
    observe::tracing::initialize(&obs_config);
    observe::panic_hook::install();
    tracing::info!("running deploy with validated arguments:\n{}", args);

    let result = run(args).await;
    report(result, &mut std::io::stdout(), &mut std::io::stderr())
}

/// Parses the command line and the environment. On `Err` clap already printed
/// the help or the parse error and the value is the exit code.
pub fn parse_arguments(args: impl IntoIterator<Item = String>) -> Result<Arguments, u8> {
    Arguments::try_parse_from(args).map_err(|err| {
        let _ = err.print();
        if err.use_stderr() { EXIT_FAILURE } else { 0 }
    })
}

pub async fn run(args: Arguments) -> Result<Deployment, DeploymentError> {
    let config = config::load(&args.config, args.overrides())
        .await
        .map_err(DeploymentError::Config)?;
    let factory = factory(&config)?;
    let timeout = config.confirmation.timeout;
    let chain = tokio::time::timeout(timeout, ethereum::Node::connect(&config.network))
        .await
        .map_err(|_| DeploymentError::NodeTimeout(timeout))?
        .map_err(DeploymentError::Node)?;
    tracing::info!(
        network = %config.network.name,
        url = %config.network.url,
        deployer = %chain.signer(),
        "connected to network"
    );
    deploy(&config, chain, &factory).await
}

/// Resolves the configured contract into a factory for new instances.
pub fn factory(config: &Config) -> Result<ContractFactory, DeploymentError> {
    let artifact = ArtifactStore::new(&config.artifacts).resolve(&config.contract)?;
    ContractFactory::new(artifact, &config.constructor_args)
}

pub async fn deploy<C: Chain>(
    config: &Config,
    chain: C,
    factory: &ContractFactory,
) -> Result<Deployment, DeploymentError> {
    Deployer::new(
        chain,
        config.network.name.clone(),
        config.network.chain_id,
        config.confirmation.clone(),
    )
    .deploy(factory)
    .await
}

/// Reports the outcome of a run to the operator and returns the process exit
/// code. This is the only place errors are handled: whatever went wrong, the
/// full error chain ends up on `stderr` and nothing is written to `stdout`.
pub fn report(
    result: Result<Deployment, DeploymentError>,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> u8 {
    let err = match result {
        Ok(deployment) => match writeln!(stdout, "{deployment}") {
            Ok(()) => return 0,
            Err(err) => anyhow::Error::new(err).context("failed to print the deployment"),
        },
        Err(err) => anyhow::Error::new(err),
    };
    // Nothing left to do if even stderr is broken.
    let _ = writeln!(stderr, "Error: {err:?}");
    EXIT_FAILURE
}
