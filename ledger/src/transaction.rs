//! Serde model for `getTransaction` responses with `jsonParsed` encoding.
//!
//! Only the fields the verifier inspects are modeled; instruction `info`
//! payloads stay as raw JSON because their shape varies per instruction type.

use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    /// Unix time of the containing block, absent on very old ledger entries.
    pub block_time: Option<i64>,
    pub meta: TransactionMeta,
    pub transaction: TransactionBody,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TransactionMeta {
    /// Present when the transaction executed but failed.
    pub err: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TransactionBody {
    pub message: TransactionMessage,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TransactionMessage {
    pub instructions: Vec<ParsedInstruction>,
}

/// One instruction of a parsed transaction.
///
/// Instructions of programs the node cannot parse carry no `parsed` field
/// and are skipped by the verifier.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstruction {
    /// Short program name (`"system"`, `"stake"`), absent for unparsed ones.
    #[serde(default)]
    pub program: Option<String>,
    pub program_id: String,
    #[serde(default)]
    pub parsed: Option<InstructionPayload>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InstructionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub info: Value,
}

impl ParsedTransaction {
    pub fn succeeded(&self) -> bool {
        self.meta.err.is_none()
    }

    /// Instructions of `program` whose parsed type is `kind`.
    pub fn instructions_of<'a>(
        &'a self,
        program: &'a str,
        kind: &'a str,
    ) -> impl Iterator<Item = &'a ParsedInstruction> + 'a {
        self.transaction
            .message
            .instructions
            .iter()
            .filter(move |ix| {
                ix.program.as_deref() == Some(program)
                    && ix.parsed.as_ref().is_some_and(|p| p.kind == kind)
            })
    }
}

impl ParsedInstruction {
    /// String field of the `info` payload, if present.
    pub fn info_str(&self, field: &str) -> Option<&str> {
        self.parsed.as_ref()?.info.get(field)?.as_str()
    }

    /// Unsigned integer field of the `info` payload, if present.
    pub fn info_u64(&self, field: &str) -> Option<u64> {
        self.parsed.as_ref()?.info.get(field)?.as_u64()
    }

    /// Nested object field of the `info` payload, if present.
    pub fn info_object(&self, field: &str) -> Option<&Value> {
        let value = self.parsed.as_ref()?.info.get(field)?;
        value.is_object().then_some(value)
    }
}
