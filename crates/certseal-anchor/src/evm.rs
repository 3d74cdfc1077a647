//! # EVM JSON-RPC Ledger Client
//!
//! Production ledger adapter that records batch roots on EVM-compatible
//! chains via JSON-RPC.
//!
//! ## How It Works
//!
//! 1. Anchoring calls the registry contract's
//!    `anchorRoot(bytes32 batchId, bytes32 root)` via `eth_sendTransaction`.
//!    The RPC endpoint handles transaction signing — this client does NOT
//!    hold private keys.
//! 2. Root queries call `getAnchoredRoot(bytes32 batchId)` via `eth_call`.
//!    An all-zero word is an unset mapping slot, reported as absent.
//! 3. The 4-byte function selectors are derived at runtime from the
//!    keccak-256 of the Solidity signatures, using the same keccak the
//!    Merkle layer uses — one hash implementation, one wire format.
//!
//! ## Contract Interface
//!
//! ```solidity
//! function anchorRoot(bytes32 batchId, bytes32 root) external;
//! function getAnchoredRoot(bytes32 batchId) external view returns (bytes32);
//! ```

use certseal_core::{ArtifactHash, BatchId};
use certseal_crypto::keccak256;

use crate::ledger::{Ledger, LedgerError, TxRef};

/// Configuration for the EVM JSON-RPC ledger client.
#[derive(Debug, Clone)]
pub struct EvmLedgerConfig {
    /// JSON-RPC endpoint URL (must be HTTPS in production).
    pub rpc_url: String,
    /// Address of the root registry contract (0x-prefixed, 40 hex chars).
    pub contract_address: String,
    /// Sender address whose transactions are signed by the RPC provider.
    pub from_address: String,
    /// Human-readable chain name (e.g., "ethereum", "polygon").
    pub chain_name: String,
    /// EVM chain ID (e.g., 1 for Ethereum mainnet).
    pub chain_id: u64,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl EvmLedgerConfig {
    /// Create a configuration with a 30 second request timeout.
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: impl Into<String>,
        from_address: impl Into<String>,
        chain_name: impl Into<String>,
        chain_id: u64,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address: contract_address.into(),
            from_address: from_address.into(),
            chain_name: chain_name.into(),
            chain_id,
            timeout_secs: 30,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// EVM JSON-RPC ledger client.
#[derive(Debug)]
pub struct EvmLedger {
    client: reqwest::Client,
    config: EvmLedgerConfig,
}

impl EvmLedger {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Rejected`] for malformed contract or sender
    /// addresses, and [`LedgerError::Unreachable`] if the HTTP client
    /// cannot be constructed.
    pub fn new(config: EvmLedgerConfig) -> Result<Self, LedgerError> {
        if !is_valid_eth_address(&config.contract_address) {
            return Err(LedgerError::Rejected(format!(
                "invalid contract address: {}",
                config.contract_address
            )));
        }
        if !is_valid_eth_address(&config.from_address) {
            return Err(LedgerError::Rejected(format!(
                "invalid from address: {}",
                config.from_address
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LedgerError::Unreachable {
                chain_id: config.chain_name.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    /// Send a JSON-RPC request and return the result field.
    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Timeout {
                        chain_id: self.config.chain_name.clone(),
                    }
                } else {
                    LedgerError::Unreachable {
                        chain_id: self.config.chain_name.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if !resp.status().is_success() {
            return Err(LedgerError::Unreachable {
                chain_id: self.config.chain_name.clone(),
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let json: serde_json::Value =
            resp.json().await.map_err(|e| LedgerError::Unreachable {
                chain_id: self.config.chain_name.clone(),
                reason: format!("invalid JSON response: {e}"),
            })?;

        if let Some(error) = json.get("error") {
            let msg = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(LedgerError::TransactionFailed {
                chain_id: self.config.chain_name.clone(),
                reason: msg.to_string(),
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Unreachable {
                chain_id: self.config.chain_name.clone(),
                reason: "JSON-RPC response missing 'result' field".to_string(),
            })
    }

    fn block_on<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| LedgerError::Unreachable {
            chain_id: self.config.chain_name.clone(),
            reason: "no async runtime available".to_string(),
        })?;
        rt.block_on(fut)
    }
}

impl Ledger for EvmLedger {
    fn anchor_root(&self, batch_id: &BatchId, root: &ArtifactHash) -> Result<TxRef, LedgerError> {
        let data = anchor_root_calldata(batch_id, root);
        let chain_name = self.config.chain_name.clone();
        self.block_on(async {
            let tx = serde_json::json!({
                "from": self.config.from_address,
                "to": self.config.contract_address,
                "data": data,
            });
            let result = self
                .rpc_call("eth_sendTransaction", serde_json::json!([tx]))
                .await?;
            result
                .as_str()
                .map(|s| TxRef(s.to_string()))
                .ok_or_else(|| LedgerError::TransactionFailed {
                    chain_id: chain_name,
                    reason: "eth_sendTransaction returned non-string result".to_string(),
                })
        })
    }

    fn anchored_root(&self, batch_id: &BatchId) -> Result<Option<ArtifactHash>, LedgerError> {
        let data = get_anchored_root_calldata(batch_id);
        let chain_name = self.config.chain_name.clone();
        self.block_on(async {
            let call = serde_json::json!({
                "to": self.config.contract_address,
                "data": data,
            });
            let result = self
                .rpc_call("eth_call", serde_json::json!([call, "latest"]))
                .await?;
            let word = result.as_str().ok_or_else(|| LedgerError::Unreachable {
                chain_id: chain_name.clone(),
                reason: "eth_call returned non-string result".to_string(),
            })?;
            parse_bytes32_result(word).map_err(|reason| LedgerError::Unreachable {
                chain_id: chain_name,
                reason,
            })
        })
    }

    fn chain_id(&self) -> &str {
        &self.config.chain_name
    }
}

/// First 4 bytes of keccak-256 over a Solidity function signature, hex.
fn selector(signature: &str) -> String {
    let hash = keccak256(signature.as_bytes());
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}

/// A batch id as a bytes32 word: the 16 UUID bytes, zero-padded on the left.
fn batch_key(batch_id: &BatchId) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(batch_id.as_uuid().as_bytes());
    out
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Calldata for `anchorRoot(bytes32 batchId, bytes32 root)`.
fn anchor_root_calldata(batch_id: &BatchId, root: &ArtifactHash) -> String {
    format!(
        "0x{}{}{}",
        selector("anchorRoot(bytes32,bytes32)"),
        hex_encode(&batch_key(batch_id)),
        root.to_hex()
    )
}

/// Calldata for `getAnchoredRoot(bytes32 batchId)`.
fn get_anchored_root_calldata(batch_id: &BatchId) -> String {
    format!(
        "0x{}{}",
        selector("getAnchoredRoot(bytes32)"),
        hex_encode(&batch_key(batch_id))
    )
}

/// Parse an `eth_call` bytes32 result. The all-zero word is an unset
/// mapping slot, reported as absent.
fn parse_bytes32_result(word: &str) -> Result<Option<ArtifactHash>, String> {
    let hex = word.strip_prefix("0x").unwrap_or(word);
    if hex.len() != 64 {
        return Err(format!("expected 32-byte word, got {} hex chars", hex.len()));
    }
    let hash =
        ArtifactHash::from_hex(hex).map_err(|e| format!("invalid bytes32 result: {e}"))?;
    if hash.as_bytes() == &[0u8; 32] {
        Ok(None)
    } else {
        Ok(Some(hash))
    }
}

/// Validate a well-formed Ethereum address (0x + 40 hex chars).
fn is_valid_eth_address(addr: &str) -> bool {
    addr.len() == 42
        && addr.starts_with("0x")
        && addr[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use certseal_core::content_digest;

    #[test]
    fn valid_eth_addresses() {
        assert!(is_valid_eth_address("0x0000000000000000000000000000000000000000"));
        assert!(is_valid_eth_address("0xAbCdEf0123456789AbCdEf0123456789AbCdEf01"));
    }

    #[test]
    fn invalid_eth_addresses() {
        assert!(!is_valid_eth_address(""));
        assert!(!is_valid_eth_address("0x"));
        assert!(!is_valid_eth_address("0x123"));
        assert!(!is_valid_eth_address("0xGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG"));
    }

    #[test]
    fn selectors_are_4_bytes_and_distinct() {
        let anchor = selector("anchorRoot(bytes32,bytes32)");
        let query = selector("getAnchoredRoot(bytes32)");
        assert_eq!(anchor.len(), 8);
        assert_eq!(query.len(), 8);
        assert_ne!(anchor, query);
    }

    #[test]
    fn anchor_calldata_shape() {
        let root = content_digest(b"root");
        let data = anchor_root_calldata(&BatchId::new(), &root);
        // 0x + 8 (selector) + 64 (batch key) + 64 (root) = 138 chars
        assert_eq!(data.len(), 138);
        assert!(data.starts_with("0x"));
        assert!(data.ends_with(&root.to_hex()));
    }

    #[test]
    fn query_calldata_shape() {
        let data = get_anchored_root_calldata(&BatchId::new());
        // 0x + 8 (selector) + 64 (batch key) = 74 chars
        assert_eq!(data.len(), 74);
    }

    #[test]
    fn batch_key_is_left_padded() {
        let id = BatchId::new();
        let key = batch_key(&id);
        assert_eq!(&key[..16], &[0u8; 16]);
        assert_eq!(&key[16..], id.as_uuid().as_bytes());
    }

    #[test]
    fn parse_zero_word_is_absent() {
        let word = format!("0x{}", "0".repeat(64));
        assert_eq!(parse_bytes32_result(&word).unwrap(), None);
    }

    #[test]
    fn parse_nonzero_word_is_root() {
        let root = content_digest(b"anchored");
        let word = format!("0x{}", root.to_hex());
        assert_eq!(parse_bytes32_result(&word).unwrap(), Some(root));
    }

    #[test]
    fn parse_short_word_is_error() {
        assert!(parse_bytes32_result("0x1234").is_err());
    }

    #[test]
    fn config_validation() {
        let bad = EvmLedgerConfig::new(
            "https://rpc.example.com",
            "not-an-address",
            "0x0000000000000000000000000000000000000002",
            "ethereum",
            1,
        );
        assert!(EvmLedger::new(bad).is_err());

        let good = EvmLedgerConfig::new(
            "https://rpc.example.com",
            "0x0000000000000000000000000000000000000001",
            "0x0000000000000000000000000000000000000002",
            "ethereum",
            1,
        )
        .with_timeout_secs(5);
        assert_eq!(good.timeout_secs, 5);
        let ledger = EvmLedger::new(good).expect("should build");
        assert_eq!(ledger.chain_id(), "ethereum");
    }
}
