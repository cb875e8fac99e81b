//! JSON-RPC ledger client.
//!
//! Speaks the standard `eth_*` read surface over HTTP. Every request is
//! bounded by a request timeout and a connect timeout; timeouts and
//! connection failures map to [`ChainError::Unreachable`] so callers can
//! treat them as retryable.

use crate::types::{LogEntry, ReceiptInfo, TransactionInfo};
use crate::{ChainError, LedgerSource};

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tally_types::{Address, Timestamp, TokenAmount, TxHash};

/// Default timeout for ledger queries.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-RPC 2.0 client for a ledger node endpoint.
pub struct JsonRpcLedger {
    http_client: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl JsonRpcLedger {
    /// Create a client for `endpoint` with default timeout settings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Unreachable(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    ChainError::Unreachable(format!("connection failed: {e}"))
                } else {
                    ChainError::Rpc(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::Rpc(format!("HTTP status {}", response.status())));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("bad RPC envelope: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(ChainError::Rpc(format!("{} (code {})", err.message, err.code)));
        }
        envelope
            .result
            .ok_or_else(|| ChainError::InvalidResponse(format!("{method}: missing result")))
    }
}

impl LedgerSource for JsonRpcLedger {
    async fn latest_block_height(&self) -> Result<u64, ChainError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity_u64(&result)
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        addresses: &[Address],
    ) -> Result<Vec<LogEntry>, ChainError> {
        let mut filter = json!({
            "fromBlock": hex_quantity(from),
            "toBlock": hex_quantity(to),
        });
        match addresses {
            [] => {}
            [single] => filter["address"] = json!(single.as_str()),
            many => {
                filter["address"] = json!(many.iter().map(Address::as_str).collect::<Vec<_>>())
            }
        }

        let result = self.call("eth_getLogs", json!([filter])).await?;
        let raw_logs = result
            .as_array()
            .ok_or_else(|| ChainError::InvalidResponse("eth_getLogs: not an array".into()))?;
        raw_logs.iter().map(parse_log).collect()
    }

    async fn get_block_timestamp(&self, height: u64) -> Result<Timestamp, ChainError> {
        let result = self
            .call("eth_getBlockByNumber", json!([hex_quantity(height), false]))
            .await?;
        let ts = result
            .get("timestamp")
            .ok_or_else(|| ChainError::InvalidResponse("block missing timestamp".into()))?;
        Ok(Timestamp::normalize(parse_quantity_u64(ts)?))
    }

    async fn get_transaction(&self, hash: &TxHash) -> Result<Option<TransactionInfo>, ChainError> {
        let result = self
            .call("eth_getTransactionByHash", json!([hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let from = parse_address(result.get("from"))?
            .ok_or_else(|| ChainError::InvalidResponse("transaction missing sender".into()))?;
        let to = parse_address(result.get("to"))?;
        let value = result
            .get("value")
            .map(parse_quantity_u128)
            .transpose()?
            .unwrap_or(0);
        Ok(Some(TransactionInfo {
            hash: *hash,
            from,
            to,
            value: TokenAmount::new(value),
        }))
    }

    async fn get_receipt(&self, hash: &TxHash) -> Result<Option<ReceiptInfo>, ChainError> {
        let result = self
            .call("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let status = result
            .get("status")
            .map(parse_quantity_u64)
            .transpose()?
            .unwrap_or(0)
            == 1;
        let block_number = result
            .get("blockNumber")
            .map(parse_quantity_u64)
            .transpose()?
            .ok_or_else(|| ChainError::InvalidResponse("receipt missing blockNumber".into()))?;
        Ok(Some(ReceiptInfo {
            status,
            block_number,
        }))
    }

    async fn get_balance(&self, address: &Address) -> Result<TokenAmount, ChainError> {
        let result = self
            .call("eth_getBalance", json!([address.as_str(), "latest"]))
            .await?;
        Ok(TokenAmount::new(parse_quantity_u128(&result)?))
    }
}

// ── Hex codec helpers ─────────────────────────────────────────────────

fn hex_quantity(value: u64) -> String {
    format!("0x{value:x}")
}

fn quantity_str(value: &Value) -> Result<&str, ChainError> {
    value
        .as_str()
        .and_then(|s| s.strip_prefix("0x"))
        .ok_or_else(|| ChainError::InvalidResponse(format!("expected hex quantity, got {value}")))
}

fn parse_quantity_u64(value: &Value) -> Result<u64, ChainError> {
    u64::from_str_radix(quantity_str(value)?, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad u64 quantity: {e}")))
}

fn parse_quantity_u128(value: &Value) -> Result<u128, ChainError> {
    u128::from_str_radix(quantity_str(value)?, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad u128 quantity: {e}")))
}

fn parse_address(value: Option<&Value>) -> Result<Option<Address>, ChainError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| ChainError::InvalidResponse(format!("expected address, got {v}")))?;
            Address::parse(s)
                .map(Some)
                .map_err(|e| ChainError::InvalidResponse(e.to_string()))
        }
    }
}

fn parse_word(s: &str) -> Result<[u8; 32], ChainError> {
    let hex_part = s
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("expected 0x word, got {s}")))?;
    let bytes =
        hex::decode(hex_part).map_err(|e| ChainError::InvalidResponse(format!("bad word: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| ChainError::InvalidResponse("topic is not 32 bytes".into()))
}

fn parse_log(raw: &Value) -> Result<LogEntry, ChainError> {
    let address = parse_address(raw.get("address"))?
        .ok_or_else(|| ChainError::InvalidResponse("log missing address".into()))?;
    let block_number = raw
        .get("blockNumber")
        .map(parse_quantity_u64)
        .transpose()?
        .ok_or_else(|| ChainError::InvalidResponse("log missing blockNumber".into()))?;
    let log_index = raw
        .get("logIndex")
        .map(parse_quantity_u64)
        .transpose()?
        .unwrap_or(0);
    let tx_hash_str = raw
        .get("transactionHash")
        .and_then(Value::as_str)
        .ok_or_else(|| ChainError::InvalidResponse("log missing transactionHash".into()))?;
    let transaction_hash =
        TxHash::parse(tx_hash_str).map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
    let topics = raw
        .get("topics")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .map(|t| {
                    t.as_str()
                        .ok_or_else(|| ChainError::InvalidResponse("topic is not a string".into()))
                        .and_then(parse_word)
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();
    let data = raw
        .get("data")
        .and_then(Value::as_str)
        .and_then(|s| s.strip_prefix("0x"))
        .map(hex::decode)
        .transpose()
        .map_err(|e| ChainError::InvalidResponse(format!("bad log data: {e}")))?
        .unwrap_or_default();

    Ok(LogEntry {
        address,
        block_number,
        log_index,
        transaction_hash,
        topics,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_quantity_roundtrip() {
        assert_eq!(hex_quantity(0), "0x0");
        assert_eq!(hex_quantity(255), "0xff");
        assert_eq!(parse_quantity_u64(&json!("0xff")).unwrap(), 255);
    }

    #[test]
    fn parse_quantity_rejects_bare_number() {
        assert!(parse_quantity_u64(&json!(255)).is_err());
    }

    #[test]
    fn parse_log_full_entry() {
        let raw = json!({
            "address": "0xAbCdEf0123456789abcdef0123456789abcdef01",
            "blockNumber": "0x10",
            "logIndex": "0x2",
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "topics": [format!("0x{}", "22".repeat(32))],
            "data": "0x0001",
        });
        let log = parse_log(&raw).unwrap();
        assert_eq!(log.block_number, 16);
        assert_eq!(log.log_index, 2);
        assert_eq!(log.topics.len(), 1);
        assert_eq!(log.data, vec![0x00, 0x01]);
        assert_eq!(log.address.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn parse_log_missing_address_fails() {
        let raw = json!({ "blockNumber": "0x1" });
        assert!(parse_log(&raw).is_err());
    }
}
