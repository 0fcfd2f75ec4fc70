use {
    crate::config::Overrides,
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
    },
};

#[derive(clap::Parser)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,deploy_contracts=info")]
    pub log_filter: String,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,
}

/// Everything has a default so the deployment can run without any argument,
/// taking its settings from the config file and the environment.
#[derive(clap::Parser)]
#[clap(name = "deploy", about = "Deploys a compiled contract and prints its address")]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    /// Path to the deployment configuration file in TOML format.
    #[clap(long, env, default_value = "deploy.toml")]
    pub config: PathBuf,

    /// Network to deploy to. Defaults to the `default-network` of the config.
    #[clap(long, env)]
    pub network: Option<String>,

    /// Bare (`Token`) or fully qualified (`contracts/Token.sol:Token`) name of
    /// the contract to deploy. Defaults to the `contract` of the config.
    #[clap(long, env)]
    pub contract: Option<String>,

    /// Private key of the deployer. Takes precedence over the accounts
    /// configured for the network.
    #[clap(long, env)]
    pub private_key: Option<String>,
}

impl Arguments {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            network: self.network.clone(),
            contract: self.contract.clone(),
            private_key: self.private_key.clone(),
        }
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            config,
            network,
            contract,
            private_key,
        } = self;

        writeln!(f, "log_filter: {}", logging.log_filter)?;
        writeln!(f, "use_json_logs: {}", logging.use_json_logs)?;
        writeln!(f, "config: {}", config.display())?;
        display_option(f, "network", network)?;
        display_option(f, "contract", contract)?;
        display_secret_option(f, "private_key", private_key)?;
        Ok(())
    }
}

fn display_secret_option<T>(f: &mut Formatter<'_>, name: &str, option: &Option<T>) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

fn display_option(f: &mut Formatter<'_>, name: &str, option: &Option<impl Display>) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}
