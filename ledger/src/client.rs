//! JSON-RPC client for `getTransaction`.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use stakequiz_types::TxSignature;

use crate::{LedgerError, ParsedTransaction};

/// Read access to the chain, as the verification pipeline sees it.
pub trait LedgerClient: Send + Sync {
    /// Fetch a confirmed transaction by signature.
    ///
    /// `None` means the chain has no record of the signature yet. Finality
    /// lags submission, so callers should retry rather than fail.
    fn fetch_transaction(
        &self,
        signature: &TxSignature,
    ) -> impl Future<Output = Result<Option<ParsedTransaction>, LedgerError>> + Send;
}

/// [`LedgerClient`] over HTTP JSON-RPC against a Solana node.
#[derive(Clone, Debug)]
pub struct SolanaRpcClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<ParsedTransaction>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl SolanaRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

impl LedgerClient for SolanaRpcClient {
    async fn fetch_transaction(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<ParsedTransaction>, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTransaction",
            "params": [
                signature.as_str(),
                {
                    "encoding": "jsonParsed",
                    "commitment": "confirmed",
                    "maxSupportedTransactionVersion": 0
                }
            ]
        });

        debug!(%signature, url = %self.url, "fetching transaction");
        let response = self.http.post(&self.url).json(&body).send().await?;
        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_with_null_result_is_not_found() {
        let envelope: RpcEnvelope =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(envelope.result.is_none());
        assert!(envelope.error.is_none());
    }

    #[test]
    fn envelope_with_error_is_parsed() {
        let envelope: RpcEnvelope = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32004,"message":"Block not available"}}"#,
        )
        .unwrap();
        let err = envelope.error.unwrap();
        assert_eq!(err.code, -32004);
        assert!(err.message.contains("not available"));
    }

    #[test]
    fn envelope_with_transaction_is_parsed() {
        let envelope: RpcEnvelope = serde_json::from_str(
            r#"{
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "blockTime": 1700000000,
                    "meta": {"err": null},
                    "transaction": {"message": {"instructions": []}}
                }
            }"#,
        )
        .unwrap();
        let tx = envelope.result.unwrap();
        assert!(tx.succeeded());
        assert_eq!(tx.block_time, Some(1_700_000_000));
    }
}
