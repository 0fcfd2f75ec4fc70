//! Deployment configuration.
//!
//! Describes what to deploy and where, similar to a Hardhat project config:
//!
//! ```toml
//! contract = "ChainBattles"
//! artifacts = "artifacts"
//! default-network = "localhost"
//!
//! [confirmation]
//! confirmations = 1
//! timeout = "5m"
//!
//! [networks.localhost]
//! url = "http://127.0.0.1:8545"
//! chain-id = 31337
//! accounts = ["0x..."]
//! ```

use {
    crate::deployer::ConfirmationPolicy,
    alloy::signers::local::PrivateKeySigner,
    anyhow::{Context, Result, anyhow, ensure},
    serde::Deserialize,
    std::{
        collections::HashMap,
        path::{Path, PathBuf},
        time::Duration,
    },
    url::Url,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Bare or fully qualified name of the contract to deploy.
    pub contract: String,
    pub constructor_args: Vec<String>,
    /// Directory holding the compiled artifacts.
    pub artifacts: PathBuf,
    pub network: Network,
    pub confirmation: ConfirmationPolicy,
}

#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    pub url: Url,
    /// Chain id the node is expected to report.
    pub chain_id: Option<u64>,
    /// Signing accounts. The first one is the deployer.
    pub accounts: Vec<PrivateKeySigner>,
}

/// Values from the command line that take precedence over the file.
#[derive(Default)]
pub struct Overrides {
    pub network: Option<String>,
    pub contract: Option<String>,
    pub private_key: Option<String>,
}

/// Loads the deployment configuration from a TOML file. Relative paths in the
/// file are resolved against the directory of the file.
pub async fn load(path: &Path, overrides: Overrides) -> Result<Config> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("I/O error while reading {path:?}"))?;
    let base = path.parent().unwrap_or(Path::new(""));
    parse(&data, path, base, overrides)
}

fn parse(data: &str, path: &Path, base: &Path, overrides: Overrides) -> Result<Config> {
    let file = toml::from_str::<File>(data).map_err(|err| {
        if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") {
            anyhow!("failed to parse TOML config at {path:?}: {err:#?}")
        } else {
            anyhow!(
                "failed to parse TOML config at: {path:?}. Set TOML_TRACE_ERROR=1 to print \
                 parsing error but this may leak secrets."
            )
        }
    })?;
    file.into_config(base, overrides)
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct File {
    contract: Option<String>,
    #[serde(default)]
    constructor_args: Vec<String>,
    #[serde(default = "default_artifacts")]
    artifacts: PathBuf,
    default_network: Option<String>,
    #[serde(default)]
    confirmation: ConfirmationFile,
    #[serde(default)]
    networks: HashMap<String, NetworkFile>,
}

fn default_artifacts() -> PathBuf {
    "artifacts".into()
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
struct ConfirmationFile {
    /// Number of blocks, including the one with the transaction, that have
    /// to be mined before a deployment counts as final.
    confirmations: u64,
    /// How long to wait for confirmation before giving up.
    #[serde(with = "humantime_serde")]
    timeout: Duration,
    /// How often to ask the node for the receipt.
    #[serde(with = "humantime_serde")]
    poll_interval: Duration,
}

impl Default for ConfirmationFile {
    fn default() -> Self {
        let policy = ConfirmationPolicy::default();
        Self {
            confirmations: policy.confirmations,
            timeout: policy.timeout,
            poll_interval: policy.poll_interval,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct NetworkFile {
    url: Url,
    chain_id: Option<u64>,
    /// Hex encoded private keys.
    #[serde(default)]
    accounts: Vec<String>,
}

impl File {
    fn into_config(mut self, base: &Path, overrides: Overrides) -> Result<Config> {
        let contract = overrides
            .contract
            .or(self.contract)
            .context("no contract selected, set `contract` or pass --contract")?;

        let name = overrides
            .network
            .or(self.default_network)
            .context("no network selected, set `default-network` or pass --network")?;
        let network = self
            .networks
            .remove(&name)
            .with_context(|| format!("network {name:?} is not configured"))?;
        let mut accounts = network
            .accounts
            .iter()
            .enumerate()
            .map(|(i, key)| {
                parse_private_key(key)
                    .with_context(|| format!("invalid account #{i} of network {name:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(key) = overrides.private_key {
            let signer = parse_private_key(&key).context("invalid private key argument")?;
            accounts.insert(0, signer);
        }

        let ConfirmationFile {
            confirmations,
            timeout,
            poll_interval,
        } = self.confirmation;
        ensure!(confirmations > 0, "at least one confirmation is required");
        ensure!(!timeout.is_zero(), "confirmation timeout must not be zero");
        ensure!(
            !poll_interval.is_zero(),
            "confirmation poll interval must not be zero"
        );

        Ok(Config {
            contract,
            constructor_args: self.constructor_args,
            artifacts: base.join(self.artifacts),
            network: Network {
                name,
                url: network.url,
                chain_id: network.chain_id,
                accounts,
            },
            confirmation: ConfirmationPolicy {
                confirmations,
                timeout,
                poll_interval,
            },
        })
    }
}

fn parse_private_key(key: &str) -> Result<PrivateKeySigner> {
    // The parse error is not propagated since it could contain the key.
    key.trim()
        .parse()
        .map_err(|_| anyhow!("not a hex encoded secp256k1 private key"))
}
