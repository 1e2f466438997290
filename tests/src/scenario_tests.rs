use anyhow::Result;
use axum::http::StatusCode;
use cryptodevs_dapp::gate::MINT_SUCCESS_NOTICE;
use cryptodevs_dapp::testing::FakeWallet;
use cryptodevs_types::{Action, MintPhase};
use std::time::Duration;

use crate::utils::{dapp_on, unix_now, BUYER, OWNER};

// =============================================================================
// A: owner starts the presale, phase re-resolves without waiting for a tick
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_owner_start_presale_re_resolves_immediately() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_accounts(vec![OWNER]);
    let d = dapp_on(wallet)?;

    let (status, _) = d.action("connect_wallet").await?;
    assert_eq!(status, StatusCode::OK);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let (_, body) = d.get("/status").await?;
    assert_eq!(body["action"], "start_presale");
    assert_eq!(body["role"]["is_owner"], true);
    let ticks = d.state.poller.phase_ticks();

    let (status, body) = d.action("start_presale").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "presale");

    // Same tick count: the new phase came from the post-action resolution.
    assert_eq!(d.state.poller.phase_ticks(), ticks);
    assert_eq!(d.state.mint.phase(), Some(MintPhase::Presale));
    assert_eq!(d.state.gate.current_action(), Action::PresaleMint);
    assert!(d.wallet.presale_started());

    d.state.poller.stop();
    Ok(())
}

// =============================================================================
// B: presale running, non-owner gets presale mint
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_presale_offers_presale_mint_to_non_owner() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_presale(true, unix_now() + 3600);
    wallet.whitelist(BUYER);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let (_, body) = d.get("/status").await?;
    assert_eq!(body["phase"]["status"], "known");
    assert_eq!(body["phase"]["phase"], "presale");
    assert_eq!(body["role"]["is_owner"], false);
    assert_eq!(body["action"], "presale_mint");

    let (status, body) = d.action("presale_mint").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["tx_hash"].as_str().is_some_and(|h| h.starts_with("0x")));
    assert_eq!(d.wallet.balance_of(BUYER), 1);
    assert_eq!(d.state.mint.supply().minted, 1);
    assert_eq!(
        d.state.notices.latest().map(|n| n.message),
        Some(MINT_SUCCESS_NOTICE.to_string())
    );

    d.state.poller.stop();
    Ok(())
}

// =============================================================================
// C: presale ended, public mint, phase never flips back
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_public_sale_is_terminal() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_presale(true, unix_now() - 1);
    let d = dapp_on(wallet)?;

    d.action("connect_wallet").await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(d.state.mint.phase(), Some(MintPhase::PublicSale));
    assert_eq!(d.state.gate.current_action(), Action::PublicMint);

    // Whatever the chain reports afterwards, no phase tick runs again.
    d.wallet.set_presale(false, 0);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(d.state.poller.phase_ticks(), 1);
    assert_eq!(d.state.mint.phase(), Some(MintPhase::PublicSale));

    let (_, body) = d.get("/status").await?;
    assert_eq!(body["phase_polling"], false);
    assert_eq!(body["action"], "public_mint");

    let (status, _) = d.action("public_mint").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d.wallet.token_ids(), 1);

    d.state.poller.stop();
    Ok(())
}

// =============================================================================
// D: wrong network fails before any contract call
// =============================================================================

#[tokio::test]
async fn test_wrong_network_rejects_provider_and_signer() -> Result<()> {
    let d = dapp_on(FakeWallet::new(1))?;

    let err = d.state.session.connect().await.err();
    assert!(matches!(
        err,
        Some(cryptodevs_dapp::Error::WrongNetwork {
            expected: 4,
            actual: 1
        })
    ));
    let err = d.state.session.signer().await.err();
    assert!(matches!(
        err,
        Some(cryptodevs_dapp::Error::WrongNetwork { .. })
    ));

    let (status, body) = d.action("connect_wallet").await?;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(body["error"].as_str().unwrap_or_default().contains("wrong network"));

    assert_eq!(d.wallet.call_count(), 0);
    assert_eq!(d.wallet.send_count(), 0);
    assert_eq!(d.wallet.accounts_requests(), 0);
    assert!(!d.state.poller.is_started());

    let (_, body) = d.get("/status").await?;
    assert_eq!(body["action"], "connect_wallet");
    assert_eq!(body["notices"][0]["message"], "Change the network to Rinkeby");
    assert_eq!(body["notices"][0]["repeats"], 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_switching_to_required_network_recovers() -> Result<()> {
    let d = dapp_on(FakeWallet::new(1))?;
    let (status, _) = d.action("connect_wallet").await?;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    d.wallet.set_chain_id(4);
    let (status, _) = d.action("connect_wallet").await?;
    assert_eq!(status, StatusCode::OK);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(d.state.session.modal_opens(), 1);
    assert_eq!(d.state.gate.current_action(), Action::PresaleNotStarted);

    d.state.poller.stop();
    Ok(())
}
