use {
    crate::{
        chain::{Chain, Receipt},
        error::DeploymentError,
        factory::ContractFactory,
    },
    alloy::primitives::{Address, TxHash},
    std::{fmt, time::Duration},
    tokio::time::Instant,
};

/// When a submitted deployment counts as final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Number of blocks, including the one containing the transaction.
    pub confirmations: u64,
    /// Upper bound on the whole deployment, from the first request to the
    /// node until the contract is confirmed.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            confirmations: 1,
            timeout: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// A confirmed contract deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub deployer: Address,
}

/// The line reported to the operator.
impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contract address: {}", self.address)
    }
}

pub struct Deployer<C> {
    chain: C,
    network: String,
    expected_chain_id: Option<u64>,
    confirmation: ConfirmationPolicy,
}

impl<C: Chain> Deployer<C> {
    pub fn new(
        chain: C,
        network: String,
        expected_chain_id: Option<u64>,
        confirmation: ConfirmationPolicy,
    ) -> Self {
        Self {
            chain,
            network,
            expected_chain_id,
            confirmation,
        }
    }

    /// Deploys a new instance from `factory` and waits until it is confirmed.
    ///
    /// Every call submits a new transaction, so calling this twice creates two
    /// contracts.
    pub async fn deploy(&self, factory: &ContractFactory) -> Result<Deployment, DeploymentError> {
        let timeout = self.confirmation.timeout;
        let deadline = Instant::now() + timeout;
        let submission = async {
            self.check_chain_id().await?;
            self.chain
                .send_deployment(factory.creation_code())
                .await
                .map_err(DeploymentError::Node)
        };
        let tx = until(deadline, submission, || DeploymentError::NodeTimeout(timeout)).await?;

        let deployer = self.chain.signer();
        tracing::info!(
            ?tx,
            %deployer,
            contract = %factory.artifact().fully_qualified_name(),
            "submitted deployment transaction"
        );

        let confirmation = async {
            let receipt = self.poll_confirmation(tx).await?;
            if !receipt.success {
                return Err(DeploymentError::Reverted(tx));
            }
            let address = receipt
                .contract_address
                .ok_or(DeploymentError::MissingContract(tx))?;
            let code = self
                .chain
                .code_at(address)
                .await
                .map_err(DeploymentError::Node)?;
            if code.is_empty() {
                return Err(DeploymentError::MissingContract(tx));
            }
            Ok((receipt, address))
        };
        let (receipt, address) = until(deadline, confirmation, || {
            DeploymentError::ConfirmationTimeout { tx, timeout }
        })
        .await?;

        tracing::info!(
            %address,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "deployment confirmed"
        );
        Ok(Deployment {
            address,
            transaction_hash: tx,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            deployer,
        })
    }

    async fn check_chain_id(&self) -> Result<(), DeploymentError> {
        let Some(expected) = self.expected_chain_id else {
            return Ok(());
        };
        let actual = self.chain.chain_id().await.map_err(DeploymentError::Node)?;
        if actual != expected {
            return Err(DeploymentError::ChainMismatch {
                network: self.network.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    async fn poll_confirmation(&self, tx: TxHash) -> Result<Receipt, DeploymentError> {
        let required = self.confirmation.confirmations;
        loop {
            if let Some(receipt) = self.chain.receipt(tx).await.map_err(DeploymentError::Node)? {
                if required <= 1 {
                    return Ok(receipt);
                }
                let latest = self
                    .chain
                    .block_number()
                    .await
                    .map_err(DeploymentError::Node)?;
                let confirmations = latest
                    .checked_sub(receipt.block_number)
                    .map_or(0, |depth| depth.saturating_add(1));
                if confirmations >= required {
                    return Ok(receipt);
                }
                tracing::debug!(?tx, confirmations, required, "waiting for confirmations");
            }
            tokio::time::sleep(self.confirmation.poll_interval).await;
        }
    }
}

async fn until<T>(
    deadline: Instant,
    future: impl Future<Output = Result<T, DeploymentError>>,
    elapsed: impl FnOnce() -> DeploymentError,
) -> Result<T, DeploymentError> {
    tokio::time::timeout_at(deadline, future)
        .await
        .map_err(|_| elapsed())?
}
