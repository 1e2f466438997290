use anyhow::Result;
use axum::http::StatusCode;
use cryptodevs_dapp::testing::FakeWallet;
use cryptodevs_dapp::Error;
use cryptodevs_types::Action;
use std::sync::Arc;
use std::time::Duration;

use crate::utils::{dapp_on, unix_now};

#[tokio::test]
async fn test_double_mint_produces_single_write() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_presale(true, unix_now() - 1);
    wallet.hold_receipts(true);
    let d = dapp_on(wallet)?;

    d.state.gate.execute(Action::ConnectWallet).await?;
    d.state.poller.stop();
    d.state.poller.phase_tick().await;
    assert_eq!(d.state.gate.current_action(), Action::PublicMint);

    let state = Arc::clone(&d.state);
    let first = tokio::spawn(async move { state.gate.execute(Action::PublicMint).await });
    while !d.state.gate.in_flight() {
        tokio::task::yield_now().await;
    }

    let (_, body) = d.get("/status").await?;
    assert_eq!(body["action"], "loading");
    assert_eq!(body["in_flight"], true);

    let (status, _) = d.action("public_mint").await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(matches!(
        d.state.gate.execute(Action::PublicMint).await,
        Err(Error::ActionInFlight)
    ));

    d.wallet.hold_receipts(false);
    first.await??;
    assert_eq!(d.wallet.send_count(), 1);
    assert_eq!(d.wallet.token_ids(), 1);
    assert!(!d.state.gate.in_flight());
    assert_eq!(d.state.gate.current_action(), Action::PublicMint);
    Ok(())
}

#[tokio::test]
async fn test_reverted_presale_mint_is_422_and_releases_gate() -> Result<()> {
    let wallet = FakeWallet::new(4);
    // Not whitelisted.
    wallet.set_presale(true, unix_now() + 3600);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    d.state.poller.stop();
    d.state.poller.phase_tick().await;

    let (status, body) = d.action("presale_mint").await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(!d.state.gate.in_flight());
    assert_eq!(d.wallet.token_ids(), 0);
    assert!(d.state.notices.latest().is_none());
    Ok(())
}

#[tokio::test]
async fn test_no_automatic_retry_after_rejected_signature() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_presale(true, unix_now() - 1);
    wallet.reject_sends(true);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    d.state.poller.stop();
    d.state.poller.phase_tick().await;

    let (status, _) = d.action("public_mint").await?;
    assert!(status.is_server_error());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(d.wallet.send_count(), 0);
    assert!(!d.state.gate.in_flight());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stuck_transaction_times_out_with_504() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_presale(true, unix_now() - 1);
    wallet.hold_receipts(true);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    d.state.poller.stop();
    d.state.poller.phase_tick().await;

    let (status, body) = d.action("public_mint").await?;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].as_str().unwrap_or_default().contains("180s"));
    assert!(!d.state.gate.in_flight());
    assert_eq!(d.state.gate.current_action(), Action::PublicMint);
    Ok(())
}

#[tokio::test]
async fn test_owner_cannot_mint_before_presale() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_accounts(vec![crate::utils::OWNER]);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    d.state.poller.stop();
    d.state.poller.phase_tick().await;

    for action in ["presale_mint", "public_mint"] {
        let (status, body) = d.action(action).await?;
        assert_eq!(status, StatusCode::CONFLICT, "{action}");
        assert!(body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("start_presale"));
    }
    assert_eq!(d.wallet.send_count(), 0);
    Ok(())
}
