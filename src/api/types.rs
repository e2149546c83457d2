//! Typed response records for the explorer API.
//!
//! The explorer mixes snake_case and camelCase field names across (and
//! even within) payloads, so renames are applied per field or per struct
//! rather than globally. Every container takes `#[serde(default)]`:
//! fields absent from a payload decode to zero values, while a present
//! field of the wrong type is still a hard decode error.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response of `GET /accounts/{account}`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccountInfo {
    pub address: String,
    pub balance: AccountBalance,
    pub assets: Vec<AccountAsset>,
}

/// Account balance breakdown, in base denomination units.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccountBalance {
    pub available: i64,
    pub vesting: i64,
    pub delegated: i64,
    pub unbonding: i64,
    pub reward: i64,
    pub commission: i64,
}

/// One asset held by an account. Amounts are string-encoded decimals.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AccountAsset {
    pub denom: String,
    pub amount: String,
}

/// Response of `GET /validators/{operatorAddress}`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidatorInfo {
    pub status: i64,
    pub tokens: i64,
    pub delegator_shares: String,
    pub unbonding_time: Option<DateTime<Utc>>,
    pub commission: ValidatorCommission,
    pub min_self_delegation: String,
    pub participation: Participation,
    #[serde(rename = "signingInfo")]
    pub signing_info: SigningInfo,
    pub uptime: Uptime,
    #[serde(rename = "votingPowerPercent")]
    pub voting_power_percent: f64,
    #[serde(rename = "cumulativeShare")]
    pub cumulative_share: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidatorCommission {
    pub commission_rates: CommissionRates,
    pub update_time: Option<DateTime<Utc>>,
}

/// Commission bounds as string-encoded decimals.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommissionRates {
    pub rate: String,
    pub max_rate: String,
    pub max_change_rate: String,
}

/// Governance participation counts.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Participation {
    pub rate: i64,
    pub total: i64,
    pub voted: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SigningInfo {
    pub bonded_height: i64,
    pub jailed_until: String,
    pub tombstoned: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Uptime {
    pub historical_uptime: HistoricalUptime,
    pub window_uptime: WindowUptime,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoricalUptime {
    pub earliest_height: i64,
    pub last_sync_height: i64,
    pub success_blocks: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowUptime {
    pub uptime: f64,
    pub window_start: i64,
    pub window_end: i64,
}

/// Response of `GET /validators/{operatorAddress}/delegators`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DelegatorCount {
    pub validator_delegators: i64,
}
