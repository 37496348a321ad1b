//! Two nodes sharing a bus and a chain, and an app that splits its pot
//! evenly on uninstall.

use node_runtime::{AppLogic, MemoryChain, MessageBus, Node, NodeConfig, ProposeInstallRequest};
use primitive_types::U256;
use sc_01_channel_model::{AppAbiEncodings, AppInstance, FreeBalance, InterpreterParams, NetworkContext, OutcomeType};
use serde_json::{json, Value};
use shared_crypto::abi::{encode, Token};
use shared_crypto::{xkey_kth_address, ExtendedPrivateKey};
use shared_types::Address;
use std::sync::Arc;

pub const MULTISIG: Address = Address([0x4D; 20]);
pub const TOKEN: Address = Address([0x70; 20]);
pub const SPLIT_APP: Address = Address([0x5A; 20]);

/// `{round}` state, `{advance}` action. The outcome always splits the
/// limit evenly between the two payees.
pub struct EvenSplitApp {
    payees: [Address; 2],
}

impl AppLogic for EvenSplitApp {
    fn apply_action(&self, state: &Value, action: &Value) -> Result<Value, String> {
        let round = state["round"].as_u64().ok_or("state has no round")?;
        let advance = action["advance"].as_u64().ok_or("action has no advance")?;
        Ok(json!({ "round": round + advance }))
    }

    fn compute_outcome(&self, app: &AppInstance) -> Result<Vec<u8>, String> {
        let InterpreterParams::SingleAssetTwoParty(params) = &app.interpreter_params else {
            return Err("even split pays out a single asset".into());
        };
        let half = params.limit / 2;
        let shares = [params.limit - half, half];
        Ok(encode(&[Token::FixedArray(
            self.payees
                .iter()
                .zip(shares)
                .map(|(to, amount)| Token::Tuple(vec![Token::Address(*to), Token::Uint(amount)]))
                .collect(),
        )]))
    }
}

pub fn config() -> NodeConfig {
    NodeConfig {
        network: NetworkContext {
            identity_app: Address([0xFB; 20]),
            challenge_registry: Address([0xCC; 20]),
            ..NetworkContext::default()
        },
        ..NodeConfig::default()
    }
}

pub struct TwoNodes {
    pub alice: Node,
    pub bob: Node,
    pub bus: MessageBus,
    pub chain: Arc<MemoryChain>,
}

impl TwoNodes {
    /// Two started nodes with `EvenSplitApp` registered on the chain.
    pub fn start() -> Self {
        let bus = MessageBus::new();
        let chain = Arc::new(MemoryChain::new());
        let [alice, bob] = [b"alice-seed-alice-seed", b"bob-seed-bob-seed-bob"].map(|seed| {
            let key = ExtendedPrivateKey::from_seed(seed).unwrap();
            let node = Node::new(config(), key, bus.clone(), chain.clone());
            node.start();
            node
        });
        let payees = [&alice, &bob].map(|n| xkey_kth_address(n.public_identifier(), 0).unwrap());
        chain.register_app(SPLIT_APP, Arc::new(EvenSplitApp { payees }));
        Self {
            alice,
            bob,
            bus,
            chain,
        }
    }

    /// Set up `MULTISIG` and give both owners `amount` of TOKEN on both nodes.
    pub async fn fund(&self, amount: u64) {
        self.alice
            .create_channel(self.bob.public_identifier(), MULTISIG)
            .await
            .unwrap();
        for node in [&self.alice, &self.bob] {
            let channel = node.store().channel(&MULTISIG).unwrap();
            let fb = FreeBalance::with_funded_tokens(
                &channel.multisig_owners().unwrap(),
                U256::from(amount),
                &[TOKEN],
            );
            node.store().put_channel(channel.set_free_balance(&fb).unwrap());
        }
    }
}

pub fn split_proposal(initiator_deposit: u64, responder_deposit: u64) -> ProposeInstallRequest {
    ProposeInstallRequest {
        multisig_address: MULTISIG,
        app_definition: SPLIT_APP,
        abi_encodings: AppAbiEncodings {
            state_encoding: "tuple(uint256 round)".into(),
            action_encoding: Some("tuple(uint256 advance)".into()),
        },
        initiator_deposit: U256::from(initiator_deposit),
        initiator_deposit_token_address: TOKEN,
        responder_deposit: U256::from(responder_deposit),
        responder_deposit_token_address: TOKEN,
        timeout: 100,
        initial_state: json!({ "round": 0 }),
        outcome_type: OutcomeType::SingleAssetTwoPartyCoinTransfer,
        meta: None,
    }
}
