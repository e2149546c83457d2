//! Identities of the validators this exporter tracks.
//!
//! A [`TrackedValidator`] names one validator the watcher polls: the bech32
//! account address used for balance lookups, the operator address used for
//! validator state and delegation lookups, and a display name surfaced as
//! a metric label.

/// A validator identity polled on every tick.
///
/// Loaded once at startup and read-only afterwards. Two entries refer to
/// the same validator exactly when their `account` addresses match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedValidator {
    /// Bech32 account address, e.g. `"story1..."`.
    pub account: String,
    /// Bech32 operator address, e.g. `"storyvaloper1..."`.
    pub operator_address: String,
    /// Human-readable name, surfaced as the `name` metric label.
    pub name: String,
}

impl TrackedValidator {
    /// Constructs a new `TrackedValidator`.
    pub fn new(
        account: impl Into<String>,
        operator_address: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            operator_address: operator_address.into(),
            name: name.into(),
        }
    }

    /// Label values for validator-scoped metrics, in `{address, name}` order.
    ///
    /// The operator address is the `address` label: validator state and
    /// delegations are keyed on the operator identity upstream.
    pub fn label_values(&self) -> [&str; 2] {
        [self.operator_address.as_str(), self.name.as_str()]
    }
}
