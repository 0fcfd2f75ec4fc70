use {
    crate::artifact::ArtifactError,
    alloy::primitives::TxHash,
    std::time::Duration,
};

/// Every way a deployment can fail.
///
/// The variants only exist to produce helpful messages for the operator. The
/// binary treats all of them the same: report and exit with a non-zero code.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("invalid deployment configuration")]
    Config(#[source] anyhow::Error),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("invalid constructor arguments for contract {contract:?}")]
    ConstructorArgs {
        contract: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("network {network:?} expects chain id {expected} but the node reports {actual}")]
    ChainMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },
    #[error("request to the node failed")]
    Node(#[source] anyhow::Error),
    #[error("node did not respond within {0:?}")]
    NodeTimeout(Duration),
    #[error("deployment transaction {0} reverted")]
    Reverted(TxHash),
    #[error("deployment transaction {0} did not create a contract")]
    MissingContract(TxHash),
    #[error("deployment transaction {tx} was not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx: TxHash, timeout: Duration },
}
