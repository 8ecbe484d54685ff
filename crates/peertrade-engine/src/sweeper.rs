//! Background expiry sweeper.
//!
//! Runs [`TradeEngine::sweep_expired`] on a fixed interval so escrows whose
//! payment window elapsed are refunded without any user action. Shutdown is
//! signaled through a watch channel; the task drains one final sweep before
//! exiting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::engine::TradeEngine;

/// Handle to a running sweeper task.
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep loop. The interval comes from the engine's config.
    #[must_use]
    pub fn spawn(engine: Arc<Mutex<TradeEngine>>) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let secs = engine.lock().await.config().sweep_interval_secs;
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            // The first tick fires immediately; skip it so a fresh engine
            // is not swept at time zero.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let swept = engine.lock().await.sweep_expired();
                        if !swept.is_empty() {
                            tracing::debug!(count = swept.len(), "sweeper pass");
                        }
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            engine.lock().await.sweep_expired();
                            tracing::info!("sweeper shutting down");
                            return;
                        }
                    }
                }
            }
        });
        Self { shutdown, handle }
    }

    /// Signal shutdown and wait for the final sweep to finish.
    pub async fn shutdown(self) {
        // Receiver may already be gone if the task panicked; join reports it.
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            tracing::error!(%err, "sweeper task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use peertrade_types::{EngineConfig, ManualClock, OfferTerms, TradeStatus, UserId};
    use rust_decimal::Decimal;

    use crate::notify::InMemoryNotifier;

    fn engine_with_clock(clock: ManualClock) -> TradeEngine {
        TradeEngine::new(
            EngineConfig::default(),
            Arc::new(clock),
            Box::new(InMemoryNotifier::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_refunds_expired_trade() {
        let clock = ManualClock::default();
        let mut engine = engine_with_clock(clock.clone());

        let seller = UserId::new();
        let buyer = UserId::new();
        engine.deposit(seller, "PEZ", Decimal::new(500, 0));
        let offer_id = engine
            .create_offer(
                seller,
                OfferTerms {
                    token: "PEZ".to_string(),
                    total_amount: Decimal::new(500, 0),
                    price_per_unit: Decimal::new(5, 0),
                    fiat_currency: "TRY".to_string(),
                    min_order: Decimal::new(10, 0),
                    max_order: Decimal::new(500, 0),
                    payment_method: "bank_transfer".to_string(),
                },
            )
            .unwrap();
        let trade_id = engine
            .accept_offer(buyer, offer_id, Decimal::new(100, 0))
            .unwrap();

        let engine = Arc::new(Mutex::new(engine));
        let sweeper = Sweeper::spawn(Arc::clone(&engine));

        // Past the payment deadline on the engine's clock, then one tick of
        // paused tokio time to let the sweep run.
        clock.advance(ChronoDuration::minutes(31));
        tokio::time::sleep(Duration::from_secs(31)).await;

        {
            let engine = engine.lock().await;
            assert_eq!(engine.trade(trade_id).unwrap().status, TradeStatus::Cancelled);
            assert_eq!(engine.balance(seller, "PEZ").available, Decimal::new(500, 0));
        }
        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_runs_a_final_sweep() {
        let clock = ManualClock::default();
        let mut engine = engine_with_clock(clock.clone());

        let seller = UserId::new();
        let buyer = UserId::new();
        engine.deposit(seller, "PEZ", Decimal::new(500, 0));
        let offer_id = engine
            .create_offer(
                seller,
                OfferTerms {
                    token: "PEZ".to_string(),
                    total_amount: Decimal::new(500, 0),
                    price_per_unit: Decimal::new(5, 0),
                    fiat_currency: "TRY".to_string(),
                    min_order: Decimal::new(10, 0),
                    max_order: Decimal::new(500, 0),
                    payment_method: "bank_transfer".to_string(),
                },
            )
            .unwrap();
        let trade_id = engine
            .accept_offer(buyer, offer_id, Decimal::new(100, 0))
            .unwrap();

        let engine = Arc::new(Mutex::new(engine));
        let sweeper = Sweeper::spawn(Arc::clone(&engine));

        // Expire on the engine clock without letting a tick fire.
        clock.advance(ChronoDuration::minutes(31));
        sweeper.shutdown().await;

        let engine = engine.lock().await;
        assert_eq!(engine.trade(trade_id).unwrap().status, TradeStatus::Cancelled);
    }
}
