use anyhow::Result;
use cryptodevs_dapp::config::RoleRefresh;
use cryptodevs_dapp::testing::FakeWallet;
use axum::http::StatusCode;
use cryptodevs_types::{Action, MintPhase, PhaseObservation};
use std::time::Duration;

use crate::utils::{dapp_on, dapp_with, test_config, unix_now, BUYER, OWNER};

#[tokio::test(start_paused = true)]
async fn test_presale_to_public_sale_stops_phase_poll_only() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_presale(true, unix_now() + 3600);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(d.state.poller.phase_ticks(), 3);
    assert_eq!(d.state.gate.current_action(), Action::PresaleMint);

    d.wallet.set_presale(true, unix_now() - 1);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(d.state.mint.phase(), Some(MintPhase::PublicSale));
    assert!(!d.state.poller.phase_polling_active());

    let phase_ticks = d.state.poller.phase_ticks();
    let supply_ticks = d.state.poller.supply_ticks();
    d.wallet.set_token_ids(7);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(d.state.poller.phase_ticks(), phase_ticks);
    assert!(d.state.poller.supply_ticks() > supply_ticks);
    assert_eq!(d.state.mint.supply().minted, 7);

    d.state.poller.stop();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unknown_phase_is_reported_distinctly() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_fail_reads(true);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(d.state.poller.phase_ticks(), 4);

    let (_, body) = d.get("/status").await?;
    assert_eq!(body["phase"]["status"], "unknown");
    assert!(body["phase"]["last_known"].is_null());
    assert_eq!(body["action"], "loading");

    d.wallet.set_fail_reads(false);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        d.state.mint.observation(),
        PhaseObservation::Known {
            phase: MintPhase::NotStarted
        }
    );
    assert_eq!(d.state.gate.current_action(), Action::PresaleNotStarted);

    d.state.poller.stop();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_tick_keeps_last_known_phase() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_presale(true, unix_now() + 3600);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    d.wallet.set_fail_reads(true);
    tokio::time::sleep(Duration::from_secs(5)).await;

    match d.state.mint.observation() {
        PhaseObservation::Unknown { last_known, .. } => {
            assert_eq!(last_known, Some(MintPhase::Presale))
        }
        other => panic!("unexpected observation: {other:?}"),
    }
    assert_eq!(d.state.gate.current_action(), Action::PresaleMint);

    d.state.poller.stop();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_role_refresh_policies() -> Result<()> {
    for (policy, owner_after_switch) in [(RoleRefresh::Always, false), (RoleRefresh::NotStarted, true)] {
        let wallet = FakeWallet::new(4);
        wallet.set_accounts(vec![OWNER]);
        let config = cryptodevs_dapp::Config {
            role_refresh: policy,
            ..test_config()
        };
        let d = dapp_with(wallet, config)?;

        d.action("connect_wallet").await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(d.state.mint.role().is_owner, "{policy:?}");

        d.action("start_presale").await?;
        d.wallet.set_accounts(vec![BUYER]);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(d.state.mint.role().is_owner, owner_after_switch, "{policy:?}");

        d.state.poller.stop();
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() -> Result<()> {
    let d = dapp_on(FakeWallet::new(4))?;
    d.action("connect_wallet").await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    d.state.poller.stop();
    d.state.poller.stop();
    let (phase, supply) = (d.state.poller.phase_ticks(), d.state.poller.supply_ticks());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(d.state.poller.phase_ticks(), phase);
    assert_eq!(d.state.poller.supply_ticks(), supply);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_halts_polling_until_reconnect() -> Result<()> {
    let d = dapp_on(FakeWallet::new(4))?;
    d.action("connect_wallet").await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(d.state.session.modal_opens(), 1);

    let (status, body) = d.disconnect().await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next"], "connect_wallet");
    let (phase, supply) = (d.state.poller.phase_ticks(), d.state.poller.supply_ticks());
    let calls = d.wallet.call_count();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(d.state.poller.phase_ticks(), phase);
    assert_eq!(d.state.poller.supply_ticks(), supply);
    assert_eq!(d.wallet.call_count(), calls);
    assert_eq!(d.state.session.modal_opens(), 1);
    assert!(!d.state.session.is_connected());

    let (status, _) = d.action("connect_wallet").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d.state.session.modal_opens(), 2);
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(d.state.poller.phase_ticks() >= phase + 2);
    assert!(d.state.poller.supply_ticks() > supply);
    assert_eq!(d.state.gate.current_action(), Action::PresaleNotStarted);

    d.state.poller.stop();
    Ok(())
}
