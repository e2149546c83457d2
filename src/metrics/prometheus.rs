//! Prometheus-backed metrics and their registration lifecycle.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and the full metric surface of the exporter:
//!
//! - [`ChainMetrics`]: chain-wide and per-validator consensus series,
//!   written by companion collectors sharing the registry,
//! - [`ValidatorApiMetrics`]: per-validator series written by the
//!   validators API watcher,
//! - [`NodeMetrics`]: per-node sync state.
//!
//! Every series is a label-keyed vector, so concurrent writers stay
//! isolated per label tuple without extra locking by callers.

use prometheus::{self, Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

const CHAIN_LABELS: &[&str] = &["chain_id"];
const CHAIN_VALIDATOR_LABELS: &[&str] = &["chain_id", "address", "name"];
const NODE_LABELS: &[&str] = &["chain_id", "node"];
const API_VALIDATOR_LABELS: &[&str] = &["address", "name"];

/// Converts a boolean flag into the 1.0/0.0 convention used by the gauges.
pub fn bool_to_f64(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

fn gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<GaugeVec, prometheus::Error> {
    let vec = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

fn counter_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec, prometheus::Error> {
    let vec = IntCounterVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

/// Chain-wide and per-validator consensus metrics.
///
/// These are registered into a [`Registry`] and updated by the block and
/// governance collectors that share it; the validators API watcher never
/// writes them.
#[derive(Clone)]
pub struct ChainMetrics {
    // Chain-wide series.
    pub block_height: GaugeVec,
    pub active_set: GaugeVec,
    pub seat_price: GaugeVec,
    pub tracked_blocks: IntCounterVec,
    pub transactions: IntCounterVec,
    pub skipped_blocks: IntCounterVec,
    pub upgrade_plan: GaugeVec,
    pub proposal_end_time: GaugeVec,
    // Per-validator consensus series.
    pub rank: GaugeVec,
    pub proposed_blocks: IntCounterVec,
    pub validated_blocks: IntCounterVec,
    pub missed_blocks: IntCounterVec,
    pub solo_missed_blocks: IntCounterVec,
    pub consecutive_missed_blocks: GaugeVec,
    pub tokens: GaugeVec,
    pub is_bonded: GaugeVec,
    pub is_jailed: GaugeVec,
    pub commission: GaugeVec,
    pub vote: GaugeVec,
    pub last_validated_block_time: GaugeVec,
}

impl ChainMetrics {
    /// Registers the chain metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let block_height = gauge_vec(
            registry,
            "block_height",
            "Latest known block height (all nodes mixed up)",
            CHAIN_LABELS,
        )?;
        let active_set = gauge_vec(
            registry,
            "active_set",
            "Number of validators in the active set",
            CHAIN_LABELS,
        )?;
        let seat_price = gauge_vec(
            registry,
            "seat_price",
            "Min seat price to be in the active set (ie. bonded tokens of the latest validator)",
            &["chain_id", "denom"],
        )?;
        let tracked_blocks = counter_vec(
            registry,
            "tracked_blocks",
            "Number of blocks tracked since start",
            CHAIN_LABELS,
        )?;
        let transactions = counter_vec(
            registry,
            "transactions_total",
            "Number of transactions since start",
            CHAIN_LABELS,
        )?;
        let skipped_blocks = counter_vec(
            registry,
            "skipped_blocks",
            "Number of blocks skipped (ie. not tracked) since start",
            CHAIN_LABELS,
        )?;
        let upgrade_plan = gauge_vec(
            registry,
            "upgrade_plan",
            "Block height of the upcoming upgrade (hard fork)",
            &["chain_id", "version"],
        )?;
        let proposal_end_time = gauge_vec(
            registry,
            "proposal_end_time",
            "Timestamp of the voting end time of a proposal",
            &["chain_id", "proposal_id"],
        )?;
        let rank = gauge_vec(
            registry,
            "rank",
            "Rank of the validator",
            CHAIN_VALIDATOR_LABELS,
        )?;
        let proposed_blocks = counter_vec(
            registry,
            "proposed_blocks",
            "Number of proposed blocks per validator (for a bonded validator)",
            CHAIN_VALIDATOR_LABELS,
        )?;
        let validated_blocks = counter_vec(
            registry,
            "validated_blocks",
            "Number of validated blocks per validator (for a bonded validator)",
            CHAIN_VALIDATOR_LABELS,
        )?;
        let missed_blocks = counter_vec(
            registry,
            "missed_blocks",
            "Number of missed blocks per validator (for a bonded validator)",
            CHAIN_VALIDATOR_LABELS,
        )?;
        let solo_missed_blocks = counter_vec(
            registry,
            "solo_missed_blocks",
            "Number of missed blocks per validator, unless block is missed by many other validators",
            CHAIN_VALIDATOR_LABELS,
        )?;
        let consecutive_missed_blocks = gauge_vec(
            registry,
            "consecutive_missed_blocks",
            "Number of consecutive missed blocks per validator (for a bonded validator)",
            CHAIN_VALIDATOR_LABELS,
        )?;
        let tokens = gauge_vec(
            registry,
            "tokens",
            "Number of staked tokens per validator",
            &["chain_id", "address", "name", "denom"],
        )?;
        let is_bonded = gauge_vec(
            registry,
            "is_bonded",
            "Set to 1 if the validator is bonded",
            CHAIN_VALIDATOR_LABELS,
        )?;
        let is_jailed = gauge_vec(
            registry,
            "is_jailed",
            "Set to 1 if the validator is jailed",
            CHAIN_VALIDATOR_LABELS,
        )?;
        let commission = gauge_vec(
            registry,
            "commission",
            "Earned validator commission",
            &["chain_id", "address", "name", "denom"],
        )?;
        let vote = gauge_vec(
            registry,
            "vote",
            "Set to 1 if the validator has voted on a proposal",
            &["chain_id", "address", "name", "proposal_id"],
        )?;
        let last_validated_block_time = gauge_vec(
            registry,
            "last_validated_block_time",
            "Timestamp of the last validated block",
            CHAIN_VALIDATOR_LABELS,
        )?;

        Ok(Self {
            block_height,
            active_set,
            seat_price,
            tracked_blocks,
            transactions,
            skipped_blocks,
            upgrade_plan,
            proposal_end_time,
            rank,
            proposed_blocks,
            validated_blocks,
            missed_blocks,
            solo_missed_blocks,
            consecutive_missed_blocks,
            tokens,
            is_bonded,
            is_jailed,
            commission,
            vote,
            last_validated_block_time,
        })
    }
}

/// Per-validator metrics sourced from the explorer validators API.
///
/// All series share the `{address, name}` label tuple, where `address` is
/// the validator's operator address. Each gauge holds the value of the
/// most recent successful fetch; a failed fetch leaves it untouched.
#[derive(Clone)]
pub struct ValidatorApiMetrics {
    // Account balance.
    pub balance_available: GaugeVec,
    pub balance_commission: GaugeVec,
    pub balance_delegated: GaugeVec,
    pub balance_reward: GaugeVec,
    pub balance_unbonding: GaugeVec,
    // Delegations.
    pub delegators: GaugeVec,
    // Validator state.
    pub status: GaugeVec,
    pub tokens: GaugeVec,
    pub commission_rate: GaugeVec,
    pub delegator_shares: GaugeVec,
    pub unbonding_time: GaugeVec,
    pub min_self_delegation: GaugeVec,
    pub participation_rate: GaugeVec,
    pub participation_total: GaugeVec,
    pub participation_voted: GaugeVec,
    pub signing_info_bonded_height: GaugeVec,
    pub signing_info_tombstoned: GaugeVec,
    pub uptime_historical_earliest_height: GaugeVec,
    pub uptime_historical_last_sync_height: GaugeVec,
    pub uptime_historical_success_blocks: GaugeVec,
    pub uptime_window_uptime: GaugeVec,
    pub uptime_window_start: GaugeVec,
    pub uptime_window_end: GaugeVec,
    pub voting_power_percent: GaugeVec,
    pub cumulative_share: GaugeVec,
}

impl ValidatorApiMetrics {
    /// Registers the validators API metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let balance_available = gauge_vec(
            registry,
            "validator_balance_available",
            "Validator balance available",
            API_VALIDATOR_LABELS,
        )?;
        let balance_commission = gauge_vec(
            registry,
            "validator_balance_commission",
            "Validator commission",
            API_VALIDATOR_LABELS,
        )?;
        let balance_delegated = gauge_vec(
            registry,
            "validator_balance_delegated",
            "Validator balance delegated",
            API_VALIDATOR_LABELS,
        )?;
        let balance_reward = gauge_vec(
            registry,
            "validator_balance_reward",
            "Validator balance reward",
            API_VALIDATOR_LABELS,
        )?;
        let balance_unbonding = gauge_vec(
            registry,
            "validator_balance_unbonding",
            "Validator balance unbonding",
            API_VALIDATOR_LABELS,
        )?;
        let delegators = gauge_vec(
            registry,
            "validator_delegators",
            "Validator delegators",
            API_VALIDATOR_LABELS,
        )?;
        let status = gauge_vec(
            registry,
            "validator_status",
            "Validator status",
            API_VALIDATOR_LABELS,
        )?;
        let tokens = gauge_vec(
            registry,
            "validator_tokens",
            "Validator tokens",
            API_VALIDATOR_LABELS,
        )?;
        let commission_rate = gauge_vec(
            registry,
            "validator_commission_rate",
            "Validator commission rate",
            API_VALIDATOR_LABELS,
        )?;
        let delegator_shares = gauge_vec(
            registry,
            "validator_delegator_shares",
            "Validator delegator shares",
            API_VALIDATOR_LABELS,
        )?;
        let unbonding_time = gauge_vec(
            registry,
            "validator_unbonding_time",
            "Validator unbonding time",
            API_VALIDATOR_LABELS,
        )?;
        let min_self_delegation = gauge_vec(
            registry,
            "validator_min_self_delegation",
            "Validator min self delegation",
            API_VALIDATOR_LABELS,
        )?;
        let participation_rate = gauge_vec(
            registry,
            "validator_participation_rate",
            "Validator participation rate",
            API_VALIDATOR_LABELS,
        )?;
        let participation_total = gauge_vec(
            registry,
            "validator_participation_total",
            "Validator participation total",
            API_VALIDATOR_LABELS,
        )?;
        let participation_voted = gauge_vec(
            registry,
            "validator_participation_voted",
            "Validator participation voted",
            API_VALIDATOR_LABELS,
        )?;
        let signing_info_bonded_height = gauge_vec(
            registry,
            "validator_signing_info_bonded_height",
            "Validator signing info bonded height",
            API_VALIDATOR_LABELS,
        )?;
        let signing_info_tombstoned = gauge_vec(
            registry,
            "validator_signing_info_tombstoned",
            "Validator signing info tombstoned",
            API_VALIDATOR_LABELS,
        )?;
        let uptime_historical_earliest_height = gauge_vec(
            registry,
            "validator_uptime_historical_earliest_height",
            "Validator uptime historical earliest height",
            API_VALIDATOR_LABELS,
        )?;
        let uptime_historical_last_sync_height = gauge_vec(
            registry,
            "validator_uptime_historical_last_sync_height",
            "Validator uptime historical last sync height",
            API_VALIDATOR_LABELS,
        )?;
        let uptime_historical_success_blocks = gauge_vec(
            registry,
            "validator_uptime_historical_success_blocks",
            "Validator uptime historical success blocks",
            API_VALIDATOR_LABELS,
        )?;
        let uptime_window_uptime = gauge_vec(
            registry,
            "validator_uptime_window_uptime",
            "Validator uptime window uptime",
            API_VALIDATOR_LABELS,
        )?;
        let uptime_window_start = gauge_vec(
            registry,
            "validator_uptime_window_start",
            "Validator uptime window start",
            API_VALIDATOR_LABELS,
        )?;
        let uptime_window_end = gauge_vec(
            registry,
            "validator_uptime_window_end",
            "Validator uptime window end",
            API_VALIDATOR_LABELS,
        )?;
        let voting_power_percent = gauge_vec(
            registry,
            "validator_voting_power_percent",
            "Validator voting power percent",
            API_VALIDATOR_LABELS,
        )?;
        let cumulative_share = gauge_vec(
            registry,
            "validator_cumulative_share",
            "Validator cumulative share",
            API_VALIDATOR_LABELS,
        )?;

        Ok(Self {
            balance_available,
            balance_commission,
            balance_delegated,
            balance_reward,
            balance_unbonding,
            delegators,
            status,
            tokens,
            commission_rate,
            delegator_shares,
            unbonding_time,
            min_self_delegation,
            participation_rate,
            participation_total,
            participation_voted,
            signing_info_bonded_height,
            signing_info_tombstoned,
            uptime_historical_earliest_height,
            uptime_historical_last_sync_height,
            uptime_historical_success_blocks,
            uptime_window_uptime,
            uptime_window_start,
            uptime_window_end,
            voting_power_percent,
            cumulative_share,
        })
    }
}

/// Per-node sync metrics, written by the node collectors.
#[derive(Clone)]
pub struct NodeMetrics {
    pub block_height: GaugeVec,
    pub synced: GaugeVec,
}

impl NodeMetrics {
    /// Registers the node metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let block_height = gauge_vec(
            registry,
            "node_block_height",
            "Latest fetched block height for each node",
            NODE_LABELS,
        )?;
        let synced = gauge_vec(
            registry,
            "node_synced",
            "Set to 1 if the node is synced (ie. not catching-up)",
            NODE_LABELS,
        )?;

        Ok(Self {
            block_height,
            synced,
        })
    }
}

/// Wrapper around a Prometheus registry and every metric group.
///
/// This is the main handle you pass around in the process. It can be
/// wrapped in an [`std::sync::Arc`] and shared across threads/tasks; the
/// underlying vectors synchronize internally.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub chain: ChainMetrics,
    pub validator_api: ValidatorApiMetrics,
    pub node: NodeMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers every metric group.
    ///
    /// `namespace`, when set, is prepended to every metric name. A
    /// duplicate registration surfaces as a `prometheus::Error`; callers
    /// treat it as fatal at startup.
    pub fn new(namespace: Option<String>) -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(namespace, None)?;
        let chain = ChainMetrics::register(&registry)?;
        let validator_api = ValidatorApiMetrics::register(&registry)?;
        let node = NodeMetrics::register(&registry)?;
        Ok(Self {
            registry,
            chain,
            validator_api,
            node,
        })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    ///
    /// The encoding works on a point-in-time `gather()` snapshot, so
    /// writers are never blocked beyond that copy.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
