//! # Free Balance
//!
//! Token-indexed ledger of each participant's undedicated funds plus the
//! identity hashes of the apps currently installed.
//!
//! The ledger lives inside the free balance `AppInstance` as a JSON state
//! blob of shape `FREE_BALANCE_STATE_ENCODING`:
//!
//! ```text
//! { tokenAddresses: [token],
//!   balances:       [[{ to, amount: {_hex} }]],   // one list per token
//!   activeApps:     [identityHash] }
//! ```

use super::errors::ModelError;
use super::value_objects::CONVENTION_FOR_ETH_TOKEN_ADDRESS;
use primitive_types::U256;
use serde_json::{json, Value};
use shared_types::{
    amount_from_json, amount_to_json, Address, BalanceDelta, Bytes32, CoinTransferMap,
    TokenIndexedCoinTransferMap, TokenIndexedIncrements,
};

/// The decoded free balance ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeBalance {
    balances: TokenIndexedCoinTransferMap,
    active_apps: Vec<Bytes32>,
}

impl FreeBalance {
    /// Ledger with `amount` for each participant in each token.
    pub fn with_funded_tokens(participants: &[Address], amount: U256, tokens: &[Address]) -> Self {
        let balances = tokens
            .iter()
            .map(|token| {
                let map: CoinTransferMap = participants.iter().map(|p| (*p, amount)).collect();
                (*token, map)
            })
            .collect();
        Self {
            balances,
            active_apps: Vec::new(),
        }
    }

    /// Balance of `beneficiary` in `token`; zero when either is unknown.
    pub fn get_balance(&self, token: &Address, beneficiary: &Address) -> U256 {
        self.balances
            .get(token)
            .and_then(|map| map.get(beneficiary))
            .copied()
            .unwrap_or_default()
    }

    /// Balances for `token`.
    ///
    /// An unseen token reports zero for every beneficiary of the ETH entry.
    pub fn with_token_address(&self, token: &Address) -> CoinTransferMap {
        match self.balances.get(token) {
            Some(map) => map.clone(),
            None => self
                .balances
                .get(&CONVENTION_FOR_ETH_TOKEN_ADDRESS)
                .map(|eth| eth.keys().map(|to| (*to, U256::zero())).collect())
                .unwrap_or_default(),
        }
    }

    /// Full token-indexed ledger.
    pub fn to_token_indexed_map(&self) -> &TokenIndexedCoinTransferMap {
        &self.balances
    }

    /// Installed app identity hashes, in installation order.
    pub fn active_apps(&self) -> &[Bytes32] {
        &self.active_apps
    }

    /// Whether `app` is active.
    pub fn has_active_app(&self, app: &Bytes32) -> bool {
        self.active_apps.contains(app)
    }

    /// Ledger with `app` marked active.
    pub fn add_active_app(&self, app: Bytes32) -> Self {
        let mut next = self.clone();
        if !next.active_apps.contains(&app) {
            next.active_apps.push(app);
        }
        next
    }

    /// Ledger with `app` no longer active.
    pub fn remove_active_app(&self, app: &Bytes32) -> Self {
        let mut next = self.clone();
        next.active_apps.retain(|a| a != app);
        next
    }

    /// Merge per-token deltas into the ledger.
    ///
    /// All-or-nothing: any negative or overflowing result rejects the whole
    /// call and `self` is untouched.
    pub fn increment(&self, increments: &TokenIndexedIncrements) -> Result<Self, ModelError> {
        let mut balances = self.balances.clone();
        for (token, deltas) in increments {
            let entry = balances.entry(*token).or_default();
            for (beneficiary, delta) in deltas {
                let current = entry.get(beneficiary).copied().unwrap_or_default();
                let next = delta.apply(current).ok_or_else(|| match delta {
                    BalanceDelta::Debit(debit) => ModelError::NegativeBalance {
                        token: *token,
                        beneficiary: *beneficiary,
                        balance: current,
                        debit: *debit,
                    },
                    BalanceDelta::Credit(_) => ModelError::BalanceOverflow {
                        token: *token,
                        beneficiary: *beneficiary,
                    },
                })?;
                entry.insert(*beneficiary, next);
            }
        }
        Ok(Self {
            balances,
            active_apps: self.active_apps.clone(),
        })
    }

    /// The ledger as the free balance app's JSON state.
    pub fn to_state_json(&self) -> Value {
        let token_addresses: Vec<Value> =
            self.balances.keys().map(|t| Value::String(t.to_hex())).collect();
        let balances: Vec<Value> = self
            .balances
            .values()
            .map(|map| {
                Value::Array(
                    map.iter()
                        .map(|(to, amount)| json!({ "to": to.to_hex(), "amount": amount_to_json(amount) }))
                        .collect(),
                )
            })
            .collect();
        let active_apps: Vec<Value> = self
            .active_apps
            .iter()
            .map(|a| Value::String(a.to_hex()))
            .collect();
        json!({
            "tokenAddresses": token_addresses,
            "balances": balances,
            "activeApps": active_apps,
        })
    }

    /// Parse the free balance app's JSON state.
    pub fn from_state_json(state: &Value) -> Result<Self, ModelError> {
        let invalid = |reason: &str| ModelError::InvalidFreeBalanceState(reason.to_string());

        let tokens = state
            .get("tokenAddresses")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("missing tokenAddresses"))?;
        let lists = state
            .get("balances")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("missing balances"))?;
        if tokens.len() != lists.len() {
            return Err(invalid("tokenAddresses and balances differ in length"));
        }

        let mut balances = TokenIndexedCoinTransferMap::new();
        for (token, list) in tokens.iter().zip(lists) {
            let token: Address = token
                .as_str()
                .ok_or_else(|| invalid("token address is not a string"))?
                .parse()?;
            let entries = list
                .as_array()
                .ok_or_else(|| invalid("balance list is not an array"))?;
            let map = balances.entry(token).or_default();
            for entry in entries {
                let to: Address = entry
                    .get("to")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("coin transfer missing `to`"))?
                    .parse()?;
                let amount = amount_from_json(
                    entry
                        .get("amount")
                        .ok_or_else(|| invalid("coin transfer missing `amount`"))?,
                )?;
                map.insert(to, amount);
            }
        }

        let active_apps = state
            .get("activeApps")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("missing activeApps"))?
            .iter()
            .map(|a| {
                a.as_str()
                    .ok_or_else(|| invalid("active app is not a string"))
                    .and_then(|s| s.parse::<Bytes32>().map_err(ModelError::from))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            balances,
            active_apps,
        })
    }
}
