use {
    super::{Chain, Receipt},
    crate::config::Network,
    alloy::{
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        primitives::{Address, Bytes, TxHash},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::TransactionRequest,
    },
    anyhow::{Context, Result},
};

/// [`Chain`] implementation talking to an Ethereum JSON-RPC node over HTTP.
pub struct Node {
    provider: DynProvider,
    signer: Address,
}

impl Node {
    /// Connects to the node of `network`. Transactions are signed locally
    /// with the first configured account. Without configured accounts the
    /// node has to sign itself with the first account it manages, which is
    /// what development nodes like anvil or hardhat offer.
    pub async fn connect(network: &Network) -> Result<Self> {
        let Some((default, additional)) = network.accounts.split_first() else {
            return Self::connect_unlocked(network).await;
        };

        let mut wallet = EthereumWallet::new(default.clone());
        for signer in additional {
            wallet.register_signer(signer.clone());
        }
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(network.url.clone())
            .erased();
        Ok(Self::from_provider(provider, default.address()))
    }

    async fn connect_unlocked(network: &Network) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .connect_http(network.url.clone())
            .erased();
        let accounts = provider
            .get_accounts()
            .await
            .context("could not fetch the accounts managed by the node")?;
        let signer = accounts.first().copied().with_context(|| {
            format!(
                "network {:?} configures no accounts and the node manages none",
                network.name
            )
        })?;
        tracing::debug!(%signer, "using account managed by the node");
        Ok(Self::from_provider(provider, signer))
    }

    pub fn from_provider(provider: DynProvider, signer: Address) -> Self {
        Self { provider, signer }
    }
}

#[async_trait::async_trait]
impl Chain for Node {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .context("could not fetch current chain id")
    }

    fn signer(&self) -> Address {
        self.signer
    }

    async fn send_deployment(&self, creation_code: Bytes) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(self.signer)
            .with_deploy_code(creation_code);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .context("failed to submit deployment transaction")?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, tx: TxHash) -> Result<Option<Receipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx)
            .await
            .with_context(|| format!("could not fetch receipt of {tx}"))?;
        let Some(receipt) = receipt else {
            return Ok(None);
        };
        // Some nodes return receipts of pending transactions without a block.
        let Some(block_number) = receipt.block_number else {
            return Ok(None);
        };
        Ok(Some(Receipt {
            transaction_hash: receipt.transaction_hash,
            block_number,
            success: ReceiptResponse::status(&receipt),
            contract_address: receipt.contract_address,
            gas_used: receipt.gas_used,
        }))
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("could not fetch latest block number")
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        self.provider
            .get_code_at(address)
            .await
            .with_context(|| format!("could not fetch code of {address}"))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::{U64, address, b256},
            providers::mock::Asserter,
        },
        serde_json::json,
    };

    fn node(asserter: &Asserter) -> Node {
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter.clone())
            .erased();
        Node::from_provider(provider, Address::repeat_byte(1))
    }

    #[tokio::test]
    async fn reads_chain_state() {
        let asserter = Asserter::new();
        let node = node(&asserter);

        asserter.push_success(&U64::from(31337));
        assert_eq!(node.chain_id().await.unwrap(), 31337);

        asserter.push_success(&U64::from(12));
        assert_eq!(node.block_number().await.unwrap(), 12);

        asserter.push_success(&Bytes::from_static(&[0x60, 0x80]));
        let code = node.code_at(Address::repeat_byte(2)).await.unwrap();
        assert_eq!(code.as_ref(), [0x60, 0x80]);

        assert_eq!(node.signer(), Address::repeat_byte(1));
    }

    #[tokio::test]
    async fn pending_transactions_have_no_receipt() {
        let asserter = Asserter::new();
        let node = node(&asserter);

        asserter.push_success(&serde_json::Value::Null);
        assert_eq!(node.receipt(TxHash::ZERO).await.unwrap(), None);
    }

    #[tokio::test]
    async fn converts_receipts() {
        let asserter = Asserter::new();
        let node = node(&asserter);
        let tx = b256!("0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060");
        let contract = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

        asserter.push_success(&json!({
            "type": "0x2",
            "status": "0x1",
            "cumulativeGasUsed": "0x2dc6c0",
            "logs": [],
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "transactionHash": tx,
            "transactionIndex": "0x0",
            "blockHash": "0xb3b20624f8f0f86eb50dd04688409e5cea4bd02d700bf6e79e9384d47d6a5a35",
            "blockNumber": "0x10",
            "gasUsed": "0x2dc6c0",
            "effectiveGasPrice": "0x3b9aca00",
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": null,
            "contractAddress": contract,
        }));

        let receipt = node.receipt(tx).await.unwrap().unwrap();
        assert_eq!(
            receipt,
            Receipt {
                transaction_hash: tx,
                block_number: 16,
                success: true,
                contract_address: Some(contract),
                gas_used: 3_000_000,
            }
        );
    }

    #[tokio::test]
    async fn surfaces_node_errors() {
        let asserter = Asserter::new();
        let node = node(&asserter);

        asserter.push_failure_msg("connection refused");
        let err = node.chain_id().await.unwrap_err();
        assert!(format!("{err:#}").contains("could not fetch current chain id"));
    }
}
