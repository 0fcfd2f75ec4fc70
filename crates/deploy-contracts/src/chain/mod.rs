//! Boundary between the deployment procedure and the blockchain node.
//!
//! The trait abstracts the handful of RPC interactions a deployment needs so
//! the procedure can be unit tested with mocks.

pub mod ethereum;

use {
    alloy::primitives::{Address, Bytes, TxHash},
    anyhow::Result,
};

/// The parts of a transaction receipt a deployment cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Whether the transaction executed without reverting.
    pub success: bool,
    /// Address of the contract the transaction created.
    pub contract_address: Option<Address>,
    pub gas_used: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Chain: Send + Sync {
    /// Chain id reported by the node.
    async fn chain_id(&self) -> Result<u64>;

    /// Account that signs and pays for deployments.
    fn signer(&self) -> Address;

    /// Signs and submits a contract creation transaction carrying
    /// `creation_code`. Returns as soon as the node accepted the transaction.
    async fn send_deployment(&self, creation_code: Bytes) -> Result<TxHash>;

    /// Receipt of a mined transaction or `None` while it is still pending.
    async fn receipt(&self, tx: TxHash) -> Result<Option<Receipt>>;

    /// Number of the latest block.
    async fn block_number(&self) -> Result<u64>;

    /// Runtime code stored at `address`.
    async fn code_at(&self, address: Address) -> Result<Bytes>;
}
