//! Full channel lifecycles between two nodes.
//!
//! 1. Setup yields the same free balance on both sides, empty, with the
//!    default timeout.
//! 2. Installing with 5/5 deposits and uninstalling on an even split
//!    leaves the free balance where it started.
//! 3. Update bumps the version by exactly one and touches nothing but
//!    state and timeout.
//! 4. A silent counterparty fails the run at the send-and-wait timeout
//!    and leaves the initiator's store untouched.

#[cfg(test)]
mod tests {
    use super::super::harness::{split_proposal, TwoNodes, MULTISIG, TOKEN};
    use primitive_types::U256;
    use sc_01_channel_model::{CONVENTION_FOR_ETH_TOKEN_ADDRESS, FREE_BALANCE_DEFAULT_TIMEOUT};
    use serde_json::json;
    use shared_crypto::ExtendedPrivateKey;
    use shared_types::CoinTransferMap;

    // =============================================================================
    // SCENARIO 1: SETUP
    // =============================================================================

    #[tokio::test]
    async fn test_setup_agrees_on_empty_free_balance() {
        let nodes = TwoNodes::start();
        nodes
            .alice
            .create_channel(nodes.bob.public_identifier(), MULTISIG)
            .await
            .unwrap();

        let ours = nodes.alice.get_state_channel(MULTISIG).await.unwrap();
        let theirs = nodes.bob.get_state_channel(MULTISIG).await.unwrap();
        let (ours_fb, theirs_fb) = (ours.free_balance_app_instance(), theirs.free_balance_app_instance());
        assert_eq!(ours_fb.state_hash().unwrap(), theirs_fb.state_hash().unwrap());
        assert_eq!(ours_fb.latest_timeout, FREE_BALANCE_DEFAULT_TIMEOUT);
        assert_eq!(ours_fb.default_timeout, FREE_BALANCE_DEFAULT_TIMEOUT);

        for node in [&nodes.alice, &nodes.bob] {
            let eth = node
                .get_free_balance_state(MULTISIG, CONVENTION_FOR_ETH_TOKEN_ADDRESS)
                .await
                .unwrap();
            assert_eq!(eth.keys().copied().collect::<Vec<_>>(), ours.multisig_owners().unwrap());
            assert!(eth.values().all(U256::is_zero));
        }
    }

    // =============================================================================
    // SCENARIO 2: INSTALL + UNINSTALL CONSERVES BALANCES
    // =============================================================================

    #[tokio::test]
    async fn test_even_split_uninstall_restores_free_balance() {
        let nodes = TwoNodes::start();
        nodes.fund(10).await;
        let before: CoinTransferMap = nodes.alice.get_free_balance_state(MULTISIG, TOKEN).await.unwrap();

        let app = nodes.alice.propose_install(split_proposal(5, 5)).await.unwrap();
        nodes.bob.install(app, false).await.unwrap();
        for node in [&nodes.alice, &nodes.bob] {
            let during = node.get_free_balance_state(MULTISIG, TOKEN).await.unwrap();
            assert!(during.values().all(|v| *v == U256::from(5)));
        }

        nodes.alice.uninstall(app, None).await.unwrap();
        for node in [&nodes.alice, &nodes.bob] {
            assert_eq!(node.get_free_balance_state(MULTISIG, TOKEN).await.unwrap(), before);
            assert!(node.get_app_instances(MULTISIG).await.unwrap().is_empty());
        }
    }

    // =============================================================================
    // SCENARIO 3: UPDATE
    // =============================================================================

    #[tokio::test]
    async fn test_update_bumps_version_only() {
        let nodes = TwoNodes::start();
        nodes.fund(10).await;
        let app = nodes.alice.propose_install(split_proposal(1, 1)).await.unwrap();
        nodes.bob.install(app, false).await.unwrap();
        let before = nodes.alice.get_app_instance(app).await.unwrap();

        nodes.bob.update_state(app, json!({ "round": 3 })).await.unwrap();

        for node in [&nodes.alice, &nodes.bob] {
            let after = node.get_app_instance(app).await.unwrap();
            assert_eq!(after.latest_version_number, before.latest_version_number + 1);
            assert_eq!(after.latest_state, json!({ "round": 3 }));
            let mut unchanged = after.clone();
            unchanged.latest_state = before.latest_state.clone();
            unchanged.latest_timeout = before.latest_timeout;
            unchanged.latest_version_number = before.latest_version_number;
            assert_eq!(unchanged, before);
        }
    }

    #[tokio::test]
    async fn test_take_action_then_update_versions_chain() {
        let nodes = TwoNodes::start();
        nodes.fund(10).await;
        let app = nodes.alice.propose_install(split_proposal(2, 2)).await.unwrap();
        nodes.bob.install(app, false).await.unwrap();

        let state = nodes.alice.take_action(app, json!({ "advance": 2 })).await.unwrap();
        assert_eq!(state, json!({ "round": 2 }));
        nodes.bob.update_state(app, json!({ "round": 9 })).await.unwrap();

        let instance = nodes.alice.get_app_instance(app).await.unwrap();
        assert_eq!(instance.latest_version_number, 2);
        assert_eq!(instance, nodes.bob.get_app_instance(app).await.unwrap());
    }

    // =============================================================================
    // TIMEOUTS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_silent_counterparty_times_out() {
        let nodes = TwoNodes::start();
        let silent = ExtendedPrivateKey::from_seed(b"silent-seed-silent-seed")
            .unwrap()
            .neuter()
            .to_string();
        // connected, never answers
        let _inbox = nodes.bus.connect(&silent);

        let err = nodes.alice.create_channel(&silent, MULTISIG).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 90s"), "{err}");
        assert!(nodes.alice.get_state_channel(MULTISIG).await.is_err());
        assert!(nodes.alice.get_channel_addresses().is_empty());
    }
}
