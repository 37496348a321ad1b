//! # Value Objects
//!
//! Outcome tags, interpreter parameters, app interface and identity, and the
//! on-chain addresses a channel is bound to.

use super::errors::ModelError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_crypto::abi::{encode, Token};
use shared_crypto::keccak256;
use shared_types::{hex_amount, hex_amount_vec, Address, Bytes32};
use std::fmt;
use std::str::FromStr;

/// Token address used to denote ETH.
pub const CONVENTION_FOR_ETH_TOKEN_ADDRESS: Address = Address::ZERO;

/// Default timeout of the free balance app, in blocks.
pub const FREE_BALANCE_DEFAULT_TIMEOUT: u64 = 172_800;

/// Timeout of the free balance's initial state, in blocks.
pub const FREE_BALANCE_INITIAL_STATE_TIMEOUT: u64 = 172_800;

/// Sequence number of the free balance app.
pub const FREE_BALANCE_APP_SEQ_NO: u32 = 0;

/// ABI encoding of the free balance state.
pub const FREE_BALANCE_STATE_ENCODING: &str = "tuple(address[] tokenAddresses, tuple(address to, uint256 amount)[][] balances, bytes32[] activeApps)";

/// ABI encoding of two-party fixed outcome interpreter params.
pub const TWO_PARTY_FIXED_OUTCOME_PARAMS_ENCODING: &str =
    "tuple(address[2] playerAddrs, uint256 amount, address tokenAddress)";

/// ABI encoding of single-asset two-party coin transfer interpreter params.
pub const SINGLE_ASSET_TWO_PARTY_PARAMS_ENCODING: &str =
    "tuple(uint256 limit, address tokenAddress)";

/// ABI encoding of multi-asset multi-party coin transfer interpreter params.
pub const MULTI_ASSET_MULTI_PARTY_PARAMS_ENCODING: &str =
    "tuple(uint256[] limit, address[] tokenAddresses)";

/// How a terminated app's outcome becomes a balance distribution.
///
/// The string values are what external contracts and stored channels use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeType {
    /// One of three fixed splits of a fixed amount.
    TwoPartyFixedOutcome,
    /// Two (to, amount) pairs in one token.
    SingleAssetTwoPartyCoinTransfer,
    /// One list of (to, amount) pairs per token.
    MultiAssetMultiPartyCoinTransfer,
}

impl OutcomeType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeType::TwoPartyFixedOutcome => "TWO_PARTY_FIXED_OUTCOME",
            OutcomeType::SingleAssetTwoPartyCoinTransfer => "SINGLE_ASSET_TWO_PARTY_COIN_TRANSFER",
            OutcomeType::MultiAssetMultiPartyCoinTransfer => {
                "MULTI_ASSET_MULTI_PARTY_COIN_TRANSFER"
            }
        }
    }
}

impl fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TWO_PARTY_FIXED_OUTCOME" => Ok(OutcomeType::TwoPartyFixedOutcome),
            "SINGLE_ASSET_TWO_PARTY_COIN_TRANSFER" => Ok(OutcomeType::SingleAssetTwoPartyCoinTransfer),
            "MULTI_ASSET_MULTI_PARTY_COIN_TRANSFER" => {
                Ok(OutcomeType::MultiAssetMultiPartyCoinTransfer)
            }
            other => Err(ModelError::UnknownOutcomeType(other.to_string())),
        }
    }
}

/// Decoded value of a two-party fixed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoPartyFixedOutcome {
    /// Whole amount to the first player.
    SendToAddrOne = 0,
    /// Whole amount to the second player.
    SendToAddrTwo = 1,
    /// Half each; the odd unit goes to the first player.
    SplitAndSendToBothAddrs = 2,
}

impl TwoPartyFixedOutcome {
    /// Map the on-chain enum word. Values above 2 are not outcomes.
    pub fn from_word(word: U256) -> Option<Self> {
        if word == U256::from(0) {
            Some(Self::SendToAddrOne)
        } else if word == U256::from(1) {
            Some(Self::SendToAddrTwo)
        } else if word == U256::from(2) {
            Some(Self::SplitAndSendToBothAddrs)
        } else {
            None
        }
    }
}

/// Parameters of the two-party fixed outcome interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoPartyFixedOutcomeInterpreterParams {
    /// Player one and player two.
    pub player_addrs: [Address; 2],
    /// Fixed amount distributed.
    #[serde(with = "hex_amount")]
    pub amount: U256,
    /// Token the amount is denominated in.
    pub token_address: Address,
}

/// Parameters of the single-asset two-party coin transfer interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleAssetTwoPartyCoinTransferInterpreterParams {
    /// Maximum total payout.
    #[serde(with = "hex_amount")]
    pub limit: U256,
    /// Token of the payout.
    pub token_address: Address,
}

/// Parameters of the multi-asset multi-party coin transfer interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAssetMultiPartyCoinTransferInterpreterParams {
    /// Maximum payout per token, positionally matched with `token_addresses`.
    #[serde(with = "hex_amount_vec")]
    pub limit: Vec<U256>,
    /// Tokens the outcome lists are matched with.
    pub token_addresses: Vec<Address>,
}

/// Interpreter parameters, one variant per outcome type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterParams {
    /// `TWO_PARTY_FIXED_OUTCOME`
    TwoPartyFixed(TwoPartyFixedOutcomeInterpreterParams),
    /// `SINGLE_ASSET_TWO_PARTY_COIN_TRANSFER`
    SingleAssetTwoParty(SingleAssetTwoPartyCoinTransferInterpreterParams),
    /// `MULTI_ASSET_MULTI_PARTY_COIN_TRANSFER`
    MultiAssetMultiParty(MultiAssetMultiPartyCoinTransferInterpreterParams),
}

impl InterpreterParams {
    /// The outcome type these params belong to.
    pub fn outcome_type(&self) -> OutcomeType {
        match self {
            InterpreterParams::TwoPartyFixed(_) => OutcomeType::TwoPartyFixedOutcome,
            InterpreterParams::SingleAssetTwoParty(_) => OutcomeType::SingleAssetTwoPartyCoinTransfer,
            InterpreterParams::MultiAssetMultiParty(_) => {
                OutcomeType::MultiAssetMultiPartyCoinTransfer
            }
        }
    }

    /// Interpreter contract for these params.
    pub fn interpreter_address(&self, network: &NetworkContext) -> Address {
        match self {
            InterpreterParams::TwoPartyFixed(_) => network.two_party_fixed_outcome_interpreter,
            InterpreterParams::SingleAssetTwoParty(_) => {
                network.single_asset_two_party_coin_transfer_interpreter
            }
            InterpreterParams::MultiAssetMultiParty(_) => {
                network.multi_asset_multi_party_coin_transfer_interpreter
            }
        }
    }

    /// ABI encoding passed to the interpreter by the conditional transaction.
    pub fn encode(&self) -> Vec<u8> {
        let token = match self {
            InterpreterParams::TwoPartyFixed(p) => Token::Tuple(vec![
                Token::FixedArray(p.player_addrs.iter().map(|a| Token::Address(*a)).collect()),
                Token::Uint(p.amount),
                Token::Address(p.token_address),
            ]),
            InterpreterParams::SingleAssetTwoParty(p) => Token::Tuple(vec![
                Token::Uint(p.limit),
                Token::Address(p.token_address),
            ]),
            InterpreterParams::MultiAssetMultiParty(p) => Token::Tuple(vec![
                Token::Array(p.limit.iter().map(|l| Token::Uint(*l)).collect()),
                Token::Array(p.token_addresses.iter().map(|a| Token::Address(*a)).collect()),
            ]),
        };
        encode(&[token])
    }
}

/// ABI encodings of an app's state and action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAbiEncodings {
    /// State encoding.
    pub state_encoding: String,
    /// Action encoding, absent for apps without actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_encoding: Option<String>,
}

/// The contract address and encodings of an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInterface {
    /// App definition contract.
    pub addr: Address,
    /// State encoding.
    pub state_encoding: String,
    /// Action encoding, absent for apps without actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_encoding: Option<String>,
}

/// The immutable fields an app's identity hash is computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppIdentity {
    /// The app's sequence number within its channel.
    pub channel_nonce: u64,
    /// Sorted participant signer addresses.
    pub participants: Vec<Address>,
    /// App definition contract.
    pub app_definition: Address,
    /// Default timeout in blocks.
    pub default_timeout: u64,
}

impl AppIdentity {
    /// The identity as an ABI tuple.
    pub fn to_token(&self) -> Token {
        Token::Tuple(self.fields())
    }

    fn fields(&self) -> Vec<Token> {
        vec![
            Token::Uint(U256::from(self.channel_nonce)),
            Token::Array(self.participants.iter().map(|a| Token::Address(*a)).collect()),
            Token::Address(self.app_definition),
            Token::Uint(U256::from(self.default_timeout)),
        ]
    }

    /// `keccak256(abi.encode(channelNonce, participants, appDefinition, defaultTimeout))`
    pub fn identity_hash(&self) -> Bytes32 {
        keccak256(&encode(&self.fields()))
    }
}

/// Proxy factory and multisig mastercopy a channel's multisig is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalStateChannelAddresses {
    /// Proxy factory contract.
    pub proxy_factory: Address,
    /// Multisig mastercopy contract.
    pub multisig_mastercopy: Address,
}

/// Addresses of the contracts the channel's commitments target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkContext {
    /// Challenge registry (SetState commitments).
    pub challenge_registry: Address,
    /// Delegate target for setup and conditional transactions.
    pub conditional_transaction_delegate_target: Address,
    /// Free balance app definition.
    pub identity_app: Address,
    /// Multi-asset multi-party coin transfer interpreter.
    pub multi_asset_multi_party_coin_transfer_interpreter: Address,
    /// Single-asset two-party coin transfer interpreter.
    pub single_asset_two_party_coin_transfer_interpreter: Address,
    /// Two-party fixed outcome interpreter.
    pub two_party_fixed_outcome_interpreter: Address,
    /// Proxy factory used to deploy multisigs.
    pub proxy_factory: Address,
    /// Multisig mastercopy.
    pub minimum_viable_multisig: Address,
    /// Coin balance refund app.
    pub coin_balance_refund_app: Address,
}

impl NetworkContext {
    /// Critical addresses recorded on every channel.
    pub fn critical_addresses(&self) -> CriticalStateChannelAddresses {
        CriticalStateChannelAddresses {
            proxy_factory: self.proxy_factory,
            multisig_mastercopy: self.minimum_viable_multisig,
        }
    }
}
