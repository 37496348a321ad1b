//! Two started nodes on one bus and one chain, for controller tests.

use crate::adapters::{AppLogic, MemoryChain, MessageBus};
use crate::container::{Node, NodeConfig};
use crate::controllers::ProposeInstallRequest;
use primitive_types::U256;
use sc_01_channel_model::{
    AppAbiEncodings, AppInstance, FreeBalance, InterpreterParams, NetworkContext, OutcomeType,
};
use serde_json::{json, Value};
use shared_crypto::abi::{encode, Token};
use shared_crypto::{xkey_kth_address, ExtendedPrivateKey};
use shared_types::{Address, Bytes32};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const MULTISIG: Address = Address([0x4D; 20]);
pub(crate) const TOKEN: Address = Address([0x70; 20]);
pub(crate) const COUNTER_APP: Address = Address([0xAD; 20]);
pub(crate) const REFUND_APP: Address = Address([0xBA; 20]);

/// `{counter}` state, `{increment}` action. Pays everything to the first
/// payee once the counter reaches 10, otherwise splits evenly.
struct CounterApp {
    payees: [Address; 2],
}

impl AppLogic for CounterApp {
    fn apply_action(&self, state: &Value, action: &Value) -> Result<Value, String> {
        let counter = state["counter"].as_u64().ok_or("state has no counter")?;
        let increment = action["increment"].as_u64().ok_or("action has no increment")?;
        Ok(json!({ "counter": counter + increment }))
    }

    fn compute_outcome(&self, app: &AppInstance) -> Result<Vec<u8>, String> {
        let InterpreterParams::SingleAssetTwoParty(params) = &app.interpreter_params else {
            return Err("counter app pays out a single asset".into());
        };
        let total = params.limit;
        let counter = app.latest_state["counter"].as_u64().unwrap_or(0);
        let pairs = if counter >= 10 {
            [(self.payees[0], total), (self.payees[1], U256::zero())]
        } else {
            let half = total / 2;
            [(self.payees[0], total - half), (self.payees[1], half)]
        };
        Ok(encode(&[Token::FixedArray(
            pairs
                .iter()
                .map(|(to, amount)| Token::Tuple(vec![Token::Address(*to), Token::Uint(*amount)]))
                .collect(),
        )]))
    }
}

/// Coin balance refund app whose deposit never showed up: pays nothing.
struct EmptyRefundApp {
    payees: [Address; 2],
}

impl AppLogic for EmptyRefundApp {
    fn apply_action(&self, _state: &Value, _action: &Value) -> Result<Value, String> {
        Err("refund app takes no actions".into())
    }

    fn compute_outcome(&self, _app: &AppInstance) -> Result<Vec<u8>, String> {
        Ok(encode(&[Token::FixedArray(
            self.payees
                .iter()
                .map(|to| Token::Tuple(vec![Token::Address(*to), Token::Uint(U256::zero())]))
                .collect(),
        )]))
    }
}

pub(crate) struct TestNode {
    pub node: Node,
    pub chain: Arc<MemoryChain>,
}

fn config() -> NodeConfig {
    NodeConfig {
        network: NetworkContext {
            identity_app: Address([0xFB; 20]),
            challenge_registry: Address([0xCC; 20]),
            coin_balance_refund_app: REFUND_APP,
            ..NetworkContext::default()
        },
        ..NodeConfig::default()
    }
}

/// Two started nodes sharing a bus and a chain.
pub(crate) fn pair() -> (TestNode, TestNode) {
    let bus = MessageBus::new();
    let chain = Arc::new(MemoryChain::new());
    let [a, b] = [1u8, 2].map(|seed| {
        let key = ExtendedPrivateKey::from_seed(&[seed; 32]).unwrap();
        let node = Node::new(config(), key, bus.clone(), chain.clone());
        node.start();
        TestNode {
            node,
            chain: chain.clone(),
        }
    });
    let payees = [&a, &b].map(|n| xkey_kth_address(n.node.public_identifier(), 0).unwrap());
    chain.register_app(COUNTER_APP, Arc::new(CounterApp { payees }));
    chain.register_app(REFUND_APP, Arc::new(EmptyRefundApp { payees }));
    (a, b)
}

/// A set-up channel where both owners hold `amount` of TOKEN on both nodes.
pub(crate) async fn funded_pair(amount: u64) -> (TestNode, TestNode) {
    let (a, b) = pair();
    a.node
        .create_channel(b.node.public_identifier(), MULTISIG)
        .await
        .unwrap();
    for n in [&a, &b] {
        let channel = n.node.store().channel(&MULTISIG).unwrap();
        let fb = FreeBalance::with_funded_tokens(
            &channel.multisig_owners().unwrap(),
            U256::from(amount),
            &[TOKEN],
        );
        n.node.store().put_channel(channel.set_free_balance(&fb).unwrap());
    }
    (a, b)
}

pub(crate) fn counter_proposal(initiator_deposit: u64, responder_deposit: u64) -> ProposeInstallRequest {
    ProposeInstallRequest {
        multisig_address: MULTISIG,
        app_definition: COUNTER_APP,
        abi_encodings: AppAbiEncodings {
            state_encoding: "tuple(uint256 counter)".into(),
            action_encoding: Some("tuple(uint256 increment)".into()),
        },
        initiator_deposit: U256::from(initiator_deposit),
        initiator_deposit_token_address: TOKEN,
        responder_deposit: U256::from(responder_deposit),
        responder_deposit_token_address: TOKEN,
        timeout: 100,
        initial_state: json!({ "counter": 0 }),
        outcome_type: OutcomeType::SingleAssetTwoPartyCoinTransfer,
        meta: None,
    }
}

/// A zero-deposit refund app paying `recipient` in TOKEN.
pub(crate) fn refund_proposal(recipient: Address) -> ProposeInstallRequest {
    ProposeInstallRequest {
        multisig_address: MULTISIG,
        app_definition: REFUND_APP,
        abi_encodings: AppAbiEncodings {
            state_encoding:
                "tuple(address recipient, address multisig, uint256 threshold, address tokenAddress)"
                    .into(),
            action_encoding: None,
        },
        initiator_deposit: U256::zero(),
        initiator_deposit_token_address: TOKEN,
        responder_deposit: U256::zero(),
        responder_deposit_token_address: TOKEN,
        timeout: 100,
        initial_state: json!({
            "recipient": recipient.to_hex(),
            "multisig": MULTISIG.to_hex(),
            "threshold": { "_hex": "0x0" },
            "tokenAddress": TOKEN.to_hex(),
        }),
        outcome_type: OutcomeType::SingleAssetTwoPartyCoinTransfer,
        meta: None,
    }
}

/// `a` proposes a counter app, `b` installs it.
pub(crate) async fn installed_counter(
    a: &TestNode,
    b: &TestNode,
    a_deposit: u64,
    b_deposit: u64,
) -> Bytes32 {
    let app = a
        .node
        .propose_install(counter_proposal(a_deposit, b_deposit))
        .await
        .unwrap();
    b.node.install(app, false).await.unwrap();
    app
}

/// Poll `check` until it holds.
pub(crate) async fn settle<F, Fut>(check: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never held");
}
