//! Prometheus metrics (lock-free atomics, zero allocation on hot path).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Polling ---
    pub phase_polls: AtomicU64,
    pub phase_poll_errors: AtomicU64,
    pub supply_polls: AtomicU64,
    pub supply_poll_errors: AtomicU64,
    pub rotation_errors: AtomicU64,

    // --- Transactions ---
    pub tx_sent: AtomicU64,
    pub tx_confirmed: AtomicU64,
    pub tx_failed: AtomicU64,
    pub actions_rejected: AtomicU64,

    // --- Latency (μs, updated via CAS) ---
    pub tx_wait_us_sum: AtomicU64,
    pub tx_wait_us_max: AtomicU64,

    // --- Wallet / RPC ---
    pub wrong_network: AtomicU64,
    pub rpc_errors: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            phase_polls: AtomicU64::new(0),
            phase_poll_errors: AtomicU64::new(0),
            supply_polls: AtomicU64::new(0),
            supply_poll_errors: AtomicU64::new(0),
            rotation_errors: AtomicU64::new(0),
            tx_sent: AtomicU64::new(0),
            tx_confirmed: AtomicU64::new(0),
            tx_failed: AtomicU64::new(0),
            actions_rejected: AtomicU64::new(0),
            tx_wait_us_sum: AtomicU64::new(0),
            tx_wait_us_max: AtomicU64::new(0),
            wrong_network: AtomicU64::new(0),
            rpc_errors: AtomicU64::new(0),
        }
    }

    pub fn record_tx_wait(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.tx_wait_us_sum.fetch_add(us, Ordering::Relaxed);
        // CAS loop for max tracking
        let mut cur = self.tx_wait_us_max.load(Ordering::Relaxed);
        while us > cur {
            match self.tx_wait_us_max.compare_exchange_weak(
                cur,
                us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, minted: u64, cap: u64, in_flight: bool, connected: bool) -> String {
        let phase_polls = self.phase_polls.load(Ordering::Relaxed);
        let phase_poll_errors = self.phase_poll_errors.load(Ordering::Relaxed);
        let supply_polls = self.supply_polls.load(Ordering::Relaxed);
        let supply_poll_errors = self.supply_poll_errors.load(Ordering::Relaxed);
        let rotation_errors = self.rotation_errors.load(Ordering::Relaxed);
        let tx_sent = self.tx_sent.load(Ordering::Relaxed);
        let tx_confirmed = self.tx_confirmed.load(Ordering::Relaxed);
        let tx_failed = self.tx_failed.load(Ordering::Relaxed);
        let actions_rejected = self.actions_rejected.load(Ordering::Relaxed);
        let wait_sum = self.tx_wait_us_sum.load(Ordering::Relaxed);
        let wait_max = self.tx_wait_us_max.swap(0, Ordering::Relaxed);
        let wrong_network = self.wrong_network.load(Ordering::Relaxed);
        let rpc_errors = self.rpc_errors.load(Ordering::Relaxed);

        let wait_sum_s = wait_sum as f64 / 1_000_000.0;
        let wait_max_s = wait_max as f64 / 1_000_000.0;
        let in_flight = in_flight as u8;
        let connected = connected as u8;

        format!(
            "\
# HELP cryptodevs_phase_polls_total Phase resolutions run by the poller.\n\
# TYPE cryptodevs_phase_polls_total counter\n\
cryptodevs_phase_polls_total {phase_polls}\n\
# HELP cryptodevs_phase_poll_errors_total Phase resolutions that failed.\n\
# TYPE cryptodevs_phase_poll_errors_total counter\n\
cryptodevs_phase_poll_errors_total {phase_poll_errors}\n\
# HELP cryptodevs_supply_polls_total Supply counter reads.\n\
# TYPE cryptodevs_supply_polls_total counter\n\
cryptodevs_supply_polls_total {supply_polls}\n\
# HELP cryptodevs_supply_poll_errors_total Supply counter reads that failed.\n\
# TYPE cryptodevs_supply_poll_errors_total counter\n\
cryptodevs_supply_poll_errors_total {supply_poll_errors}\n\
# HELP cryptodevs_rotation_errors_total Showcase metadata fetch failures.\n\
# TYPE cryptodevs_rotation_errors_total counter\n\
cryptodevs_rotation_errors_total {rotation_errors}\n\
# HELP cryptodevs_tx_sent_total Transactions handed to the wallet.\n\
# TYPE cryptodevs_tx_sent_total counter\n\
cryptodevs_tx_sent_total {tx_sent}\n\
# HELP cryptodevs_tx_confirmed_total Transactions mined successfully.\n\
# TYPE cryptodevs_tx_confirmed_total counter\n\
cryptodevs_tx_confirmed_total {tx_confirmed}\n\
# HELP cryptodevs_tx_failed_total Transactions reverted, timed out or lost.\n\
# TYPE cryptodevs_tx_failed_total counter\n\
cryptodevs_tx_failed_total {tx_failed}\n\
# HELP cryptodevs_actions_rejected_total Actions refused by the gate.\n\
# TYPE cryptodevs_actions_rejected_total counter\n\
cryptodevs_actions_rejected_total {actions_rejected}\n\
# HELP cryptodevs_tx_wait_seconds_sum Total confirmation wait (seconds).\n\
# TYPE cryptodevs_tx_wait_seconds_sum counter\n\
cryptodevs_tx_wait_seconds_sum {wait_sum_s:.6}\n\
# HELP cryptodevs_tx_wait_seconds_max Max confirmation wait since last scrape (seconds).\n\
# TYPE cryptodevs_tx_wait_seconds_max gauge\n\
cryptodevs_tx_wait_seconds_max {wait_max_s:.6}\n\
# HELP cryptodevs_wrong_network_total Network checks that found the wrong chain.\n\
# TYPE cryptodevs_wrong_network_total counter\n\
cryptodevs_wrong_network_total {wrong_network}\n\
# HELP cryptodevs_rpc_errors_total Wallet provider request errors.\n\
# TYPE cryptodevs_rpc_errors_total counter\n\
cryptodevs_rpc_errors_total {rpc_errors}\n\
# HELP cryptodevs_minted Tokens minted so far.\n\
# TYPE cryptodevs_minted gauge\n\
cryptodevs_minted {minted}\n\
# HELP cryptodevs_supply_cap Collection cap.\n\
# TYPE cryptodevs_supply_cap gauge\n\
cryptodevs_supply_cap {cap}\n\
# HELP cryptodevs_action_in_flight A mutating action is outstanding.\n\
# TYPE cryptodevs_action_in_flight gauge\n\
cryptodevs_action_in_flight {in_flight}\n\
# HELP cryptodevs_wallet_connected Wallet session is connected.\n\
# TYPE cryptodevs_wallet_connected gauge\n\
cryptodevs_wallet_connected {connected}\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_gauges() {
        let m = Metrics::new();
        m.tx_sent.fetch_add(2, Ordering::Relaxed);
        let out = m.render(3, 20, true, false);
        assert!(out.contains("cryptodevs_tx_sent_total 2\n"));
        assert!(out.contains("cryptodevs_minted 3\n"));
        assert!(out.contains("cryptodevs_action_in_flight 1\n"));
        assert!(out.contains("cryptodevs_wallet_connected 0\n"));
    }

    #[test]
    fn test_wait_max_resets_on_scrape() {
        let m = Metrics::new();
        m.tx_wait_us_max.store(2_000_000, Ordering::Relaxed);
        assert!(m.render(0, 20, false, true).contains("cryptodevs_tx_wait_seconds_max 2.000000"));
        assert!(m.render(0, 20, false, true).contains("cryptodevs_tx_wait_seconds_max 0.000000"));
    }
}
