//! Nullable ledger — scripted chain lookups without a network.

use std::collections::HashMap;
use std::sync::Mutex;

use stakequiz_ledger::{LedgerClient, LedgerError, ParsedTransaction};
use stakequiz_types::TxSignature;

/// What a scripted lookup returns.
#[derive(Clone, Debug)]
pub enum ScriptedLookup {
    /// The chain has the transaction.
    Found(ParsedTransaction),
    /// The chain has no record of the signature.
    NotFound,
    /// The node is down; the error classifies as retryable.
    Unreachable,
}

/// A [`LedgerClient`] that serves pre-programmed responses.
///
/// Unscripted signatures behave as not-yet-confirmed. Every lookup is
/// recorded for assertions.
#[derive(Default)]
pub struct NullLedger {
    responses: Mutex<HashMap<String, ScriptedLookup>>,
    lookups: Mutex<Vec<TxSignature>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program the response for one signature.
    pub fn script(&self, signature: &TxSignature, lookup: ScriptedLookup) {
        self.responses
            .lock()
            .unwrap()
            .insert(signature.as_str().to_string(), lookup);
    }

    /// Signatures looked up so far, in order.
    pub fn lookups(&self) -> Vec<TxSignature> {
        self.lookups.lock().unwrap().clone()
    }
}

impl LedgerClient for NullLedger {
    async fn fetch_transaction(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<ParsedTransaction>, LedgerError> {
        self.lookups.lock().unwrap().push(signature.clone());
        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get(signature.as_str())
            .cloned();
        match scripted {
            Some(ScriptedLookup::Found(tx)) => Ok(Some(tx)),
            Some(ScriptedLookup::NotFound) | None => Ok(None),
            Some(ScriptedLookup::Unreachable) => Err(LedgerError::Rpc {
                code: -32005,
                message: "node is unhealthy".into(),
            }),
        }
    }
}
