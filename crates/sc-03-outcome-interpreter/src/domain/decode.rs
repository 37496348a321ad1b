//! # Outcome Decoding
//!
//! Pure mapping from an encoded outcome to payouts, by outcome type:
//!
//! | Outcome type | Encoded outcome | Payout |
//! |--------------|-----------------|--------|
//! | Two-party fixed | `uint256` enum | fixed amount to one, two, or split |
//! | Single asset | `tuple(address to,uint256 amount)[2]` | both pairs, params token |
//! | Multi asset | `tuple(address to,uint256 amount)[][]` | list `i` in token `i` |

use super::errors::OutcomeError;
use primitive_types::U256;
use sc_01_channel_model::{
    AppInstance, InterpreterParams, MultiAssetMultiPartyCoinTransferInterpreterParams,
    SingleAssetTwoPartyCoinTransferInterpreterParams, TwoPartyFixedOutcome,
    TwoPartyFixedOutcomeInterpreterParams,
};
use serde_json::Value;
use shared_crypto::abi::{decode, ParamType, Token};
use shared_types::{Address, Bytes32, TokenIndexedCoinTransferMap};

/// Encoded outcome of a single-asset two-party coin transfer app.
pub const SINGLE_ASSET_TWO_PARTY_OUTCOME_ENCODING: &str = "tuple(address to,uint256 amount)[2]";

/// Encoded outcome of a multi-asset multi-party coin transfer app.
pub const MULTI_ASSET_MULTI_PARTY_OUTCOME_ENCODING: &str = "tuple(address to,uint256 amount)[][]";

/// State field marking a coin balance refund app.
pub const REFUND_THRESHOLD_FIELD: &str = "threshold";

/// Whether `app` is a refund-style app whose outcome depends on an on-chain balance.
pub fn is_refund_app(app: &AppInstance) -> bool {
    app.latest_state.get(REFUND_THRESHOLD_FIELD).is_some()
}

/// Token a refund app pays out in, read from its state.
pub fn refund_token(app: &AppInstance) -> Option<Address> {
    app.latest_state
        .get("tokenAddress")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

/// Decode `encoded` according to `app`'s interpreter params.
///
/// `token_override` replaces the single-asset params token.
pub fn decode_outcome(
    app: &AppInstance,
    encoded: &[u8],
    token_override: Option<Address>,
) -> Result<TokenIndexedCoinTransferMap, OutcomeError> {
    let id = app.identity_hash();
    match &app.interpreter_params {
        InterpreterParams::TwoPartyFixed(params) => two_party_fixed(id, params, encoded),
        InterpreterParams::SingleAssetTwoParty(params) => {
            single_asset(id, params, encoded, token_override)
        }
        InterpreterParams::MultiAssetMultiParty(params) => multi_asset(id, params, encoded),
    }
}

/// Total of every payout in `payouts`.
pub fn total_payout(payouts: &TokenIndexedCoinTransferMap) -> U256 {
    payouts
        .values()
        .flat_map(|m| m.values())
        .fold(U256::zero(), |acc, v| acc.saturating_add(*v))
}

fn two_party_fixed(
    app: Bytes32,
    params: &TwoPartyFixedOutcomeInterpreterParams,
    encoded: &[u8],
) -> Result<TokenIndexedCoinTransferMap, OutcomeError> {
    let word = decode(&[ParamType::Uint(256)], encoded)?
        .first()
        .and_then(Token::as_uint)
        .ok_or_else(|| malformed(app, "missing outcome word"))?;
    let outcome = TwoPartyFixedOutcome::from_word(word)
        .ok_or_else(|| malformed(app, &format!("{word} is not a two-party fixed outcome")))?;

    let [one, two] = params.player_addrs;
    let amount = params.amount;
    let mut payouts = TokenIndexedCoinTransferMap::new();
    let map = payouts.entry(params.token_address).or_default();
    match outcome {
        TwoPartyFixedOutcome::SendToAddrOne => {
            map.insert(one, amount);
        }
        TwoPartyFixedOutcome::SendToAddrTwo => {
            map.insert(two, amount);
        }
        TwoPartyFixedOutcome::SplitAndSendToBothAddrs => {
            let half = amount / 2;
            map.insert(one, amount - half);
            map.insert(two, half);
        }
    }
    Ok(payouts)
}

fn single_asset(
    app: Bytes32,
    params: &SingleAssetTwoPartyCoinTransferInterpreterParams,
    encoded: &[u8],
    token_override: Option<Address>,
) -> Result<TokenIndexedCoinTransferMap, OutcomeError> {
    let kind = ParamType::parse(SINGLE_ASSET_TWO_PARTY_OUTCOME_ENCODING)?;
    let decoded = decode(std::slice::from_ref(&kind), encoded)?;
    let pairs = decoded
        .first()
        .and_then(Token::as_list)
        .ok_or_else(|| malformed(app, "expected two coin transfers"))?;

    let token = token_override.unwrap_or(params.token_address);
    let mut payouts = TokenIndexedCoinTransferMap::new();
    for pair in pairs {
        let (to, amount) = coin_transfer(app, pair)?;
        add_payout(&mut payouts, app, token, to, amount)?;
    }
    Ok(payouts)
}

fn multi_asset(
    app: Bytes32,
    params: &MultiAssetMultiPartyCoinTransferInterpreterParams,
    encoded: &[u8],
) -> Result<TokenIndexedCoinTransferMap, OutcomeError> {
    let kind = ParamType::parse(MULTI_ASSET_MULTI_PARTY_OUTCOME_ENCODING)?;
    let decoded = decode(std::slice::from_ref(&kind), encoded)?;
    let lists = decoded
        .first()
        .and_then(Token::as_list)
        .ok_or_else(|| malformed(app, "expected a list of coin transfer lists"))?;
    if lists.len() != params.token_addresses.len() {
        return Err(OutcomeError::TokenCountMismatch {
            app,
            expected: params.token_addresses.len(),
            found: lists.len(),
        });
    }

    let mut payouts = TokenIndexedCoinTransferMap::new();
    for (token, list) in params.token_addresses.iter().zip(lists) {
        let transfers = list
            .as_list()
            .ok_or_else(|| malformed(app, "coin transfer list is not a list"))?;
        for pair in transfers {
            let (to, amount) = coin_transfer(app, pair)?;
            add_payout(&mut payouts, app, *token, to, amount)?;
        }
    }
    Ok(payouts)
}

fn coin_transfer(app: Bytes32, token: &Token) -> Result<(Address, U256), OutcomeError> {
    match token.as_list() {
        Some([to, amount]) => {
            let to = to
                .as_address()
                .ok_or_else(|| malformed(app, "coin transfer `to` is not an address"))?;
            let amount = amount
                .as_uint()
                .ok_or_else(|| malformed(app, "coin transfer `amount` is not a uint"))?;
            Ok((to, amount))
        }
        _ => Err(malformed(app, "coin transfer is not a (to, amount) pair")),
    }
}

fn add_payout(
    payouts: &mut TokenIndexedCoinTransferMap,
    app: Bytes32,
    token: Address,
    to: Address,
    amount: U256,
) -> Result<(), OutcomeError> {
    let entry = payouts.entry(token).or_default().entry(to).or_default();
    *entry = entry
        .checked_add(amount)
        .ok_or(OutcomeError::PayoutOverflow {
            app,
            beneficiary: to,
        })?;
    Ok(())
}

fn malformed(app: Bytes32, reason: &str) -> OutcomeError {
    OutcomeError::Malformed {
        app,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sc_01_channel_model::AppInterface;
    use serde_json::json;
    use shared_crypto::abi::encode;

    pub(crate) const ONE: Address = Address([1; 20]);
    pub(crate) const TWO: Address = Address([2; 20]);
    pub(crate) const TOKEN: Address = Address([0x70; 20]);

    pub(crate) fn app(params: InterpreterParams, state: Value) -> AppInstance {
        AppInstance {
            multisig_address: Address([0x4D; 20]),
            participants: vec![ONE, TWO],
            default_timeout: 100,
            app_interface: AppInterface {
                addr: Address([0xAD; 20]),
                state_encoding: "tuple(uint256 threshold)".into(),
                action_encoding: None,
            },
            app_seq_no: 1,
            latest_state: state,
            latest_version_number: 1,
            latest_timeout: 0,
            interpreter_params: params,
            meta: None,
        }
    }

    pub(crate) fn transfers(pairs: &[(Address, u64)]) -> Token {
        Token::FixedArray(
            pairs
                .iter()
                .map(|(to, amount)| Token::Tuple(vec![Token::Address(*to), Token::Uint(U256::from(*amount))]))
                .collect(),
        )
    }

    fn two_party(amount: u64) -> AppInstance {
        app(
            InterpreterParams::TwoPartyFixed(TwoPartyFixedOutcomeInterpreterParams {
                player_addrs: [ONE, TWO],
                amount: U256::from(amount),
                token_address: TOKEN,
            }),
            json!({}),
        )
    }

    fn word(value: u64) -> Vec<u8> {
        encode(&[Token::Uint(U256::from(value))])
    }

    #[test]
    fn test_two_party_split_gives_remainder_to_first() {
        let payouts = decode_outcome(&two_party(11), &word(2), None).unwrap();
        assert_eq!(payouts[&TOKEN][&ONE], U256::from(6));
        assert_eq!(payouts[&TOKEN][&TWO], U256::from(5));
    }

    #[test]
    fn test_two_party_send_to_one_or_two() {
        let to_one = decode_outcome(&two_party(10), &word(0), None).unwrap();
        assert_eq!(to_one[&TOKEN].len(), 1);
        assert_eq!(to_one[&TOKEN][&ONE], U256::from(10));
        let to_two = decode_outcome(&two_party(10), &word(1), None).unwrap();
        assert_eq!(to_two[&TOKEN][&TWO], U256::from(10));
    }

    #[test]
    fn test_two_party_out_of_range_is_malformed() {
        assert!(matches!(
            decode_outcome(&two_party(10), &word(3), None),
            Err(OutcomeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_single_asset_pairs() {
        let app = app(
            InterpreterParams::SingleAssetTwoParty(SingleAssetTwoPartyCoinTransferInterpreterParams {
                limit: U256::from(10),
                token_address: TOKEN,
            }),
            json!({}),
        );
        let encoded = encode(&[transfers(&[(ONE, 3), (TWO, 7)])]);
        let payouts = decode_outcome(&app, &encoded, None).unwrap();
        assert_eq!(payouts[&TOKEN][&ONE], U256::from(3));
        assert_eq!(payouts[&TOKEN][&TWO], U256::from(7));

        let overridden = decode_outcome(&app, &encoded, Some(Address::ZERO)).unwrap();
        assert!(overridden.contains_key(&Address::ZERO));
    }

    #[test]
    fn test_single_asset_truncated_outcome_rejected() {
        let app = app(
            InterpreterParams::SingleAssetTwoParty(SingleAssetTwoPartyCoinTransferInterpreterParams {
                limit: U256::from(10),
                token_address: TOKEN,
            }),
            json!({}),
        );
        assert!(decode_outcome(&app, &[0u8; 40], None).is_err());
    }

    #[test]
    fn test_multi_asset_positional_tokens() {
        let app = app(
            InterpreterParams::MultiAssetMultiParty(MultiAssetMultiPartyCoinTransferInterpreterParams {
                limit: vec![],
                token_addresses: vec![Address::ZERO, TOKEN],
            }),
            json!({}),
        );
        let list = |pairs: &[(Address, u64)]| match transfers(pairs) {
            Token::FixedArray(items) => Token::Array(items),
            other => other,
        };
        let encoded = encode(&[Token::Array(vec![list(&[(ONE, 4)]), list(&[(TWO, 9), (TWO, 1)])])]);
        let payouts = decode_outcome(&app, &encoded, None).unwrap();
        assert_eq!(payouts[&Address::ZERO][&ONE], U256::from(4));
        assert_eq!(payouts[&TOKEN][&TWO], U256::from(10));

        let short = encode(&[Token::Array(vec![list(&[(ONE, 4)])])]);
        assert!(matches!(
            decode_outcome(&app, &short, None),
            Err(OutcomeError::TokenCountMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn test_refund_detection() {
        let refund = app(
            InterpreterParams::SingleAssetTwoParty(SingleAssetTwoPartyCoinTransferInterpreterParams {
                limit: U256::MAX,
                token_address: Address::ZERO,
            }),
            json!({ "threshold": { "_hex": "0x0" }, "tokenAddress": TOKEN.to_hex() }),
        );
        assert!(is_refund_app(&refund));
        assert_eq!(refund_token(&refund), Some(TOKEN));
        assert!(!is_refund_app(&two_party(1)));
    }
}
