//! Bounded-timeout health probes against a worker's RPC endpoint.
//!
//! Probes never fail: any transport or decoding error collapses to an
//! unreachable report, so a dead node can never error out of the polling
//! loop.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::models::ProbeReport;

/// Health-check transport consumed by the scheduler.
pub trait HealthProbe {
    /// Query a worker's status. Must never panic or block past the
    /// configured timeout.
    fn probe(&self, endpoint: &str) -> ProbeReport;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
}

/// JSON-RPC probe speaking the execution-client wire protocol:
/// `eth_blockNumber` for the progress counter and `eth_syncing` for the
/// bulk-sync flag.
pub struct RpcProbe {
    client: Client,
}

impl RpcProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent("vigil-monitor")
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    fn call(&self, endpoint: &str, method: &str) -> Option<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": [],
            "id": 1,
        });
        let response: RpcResponse = self
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .ok()?
            .json()
            .ok()?;
        response.result
    }

    fn block_number(&self, endpoint: &str) -> Option<u64> {
        let result = self.call(endpoint, "eth_blockNumber")?;
        parse_hex_quantity(result.as_str()?)
    }

    /// `eth_syncing` returns literal `false` once synced, or a progress
    /// object while bulk sync is running.
    fn syncing(&self, endpoint: &str) -> Option<bool> {
        match self.call(endpoint, "eth_syncing")? {
            Value::Bool(false) => Some(false),
            Value::Object(_) => Some(true),
            _ => None,
        }
    }
}

impl HealthProbe for RpcProbe {
    fn probe(&self, endpoint: &str) -> ProbeReport {
        let Some(progress) = self.block_number(endpoint) else {
            return ProbeReport::unreachable();
        };
        ProbeReport {
            reachable: true,
            progress: Some(progress),
            syncing: self.syncing(endpoint),
        }
    }
}

fn parse_hex_quantity(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok()
}
