//! End-to-end arbitration scenarios spanning the trade and dispute engines.

use std::sync::Arc;

use chrono::Duration;
use peertrade_dispute::{DisputeEngine, StaticArbitratorSet};
use peertrade_engine::{InMemoryNotifier, TradeEngine};
use peertrade_types::{
    DisputeOpener, DisputeOutcome, EngineConfig, ManualClock, NotificationKind, OfferTerms,
    TradeId, TradeStatus, UserId,
};
use rust_decimal::Decimal;

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

struct World {
    engine: TradeEngine,
    disputes: DisputeEngine,
    clock: ManualClock,
    notifier: InMemoryNotifier,
    arbitrator: UserId,
    seller: UserId,
    buyer: UserId,
}

fn world() -> World {
    let clock = ManualClock::default();
    let notifier = InMemoryNotifier::new();
    let mut engine = TradeEngine::new(
        EngineConfig::default(),
        Arc::new(clock.clone()),
        Box::new(notifier.clone()),
    );
    let seller = UserId::new();
    let buyer = UserId::new();
    engine.deposit(seller, "HEZ", dec(1000));

    let arbitrator = UserId::new();
    let disputes = DisputeEngine::new(Box::new(StaticArbitratorSet::new([arbitrator])));
    World {
        engine,
        disputes,
        clock,
        notifier,
        arbitrator,
        seller,
        buyer,
    }
}

fn paid_trade(w: &mut World, amount: i64) -> TradeId {
    let offer_id = w
        .engine
        .create_offer(
            w.seller,
            OfferTerms {
                token: "HEZ".to_string(),
                total_amount: dec(1000),
                price_per_unit: dec(10),
                fiat_currency: "TRY".to_string(),
                min_order: dec(10),
                max_order: dec(1000),
                payment_method: "bank_transfer".to_string(),
            },
        )
        .unwrap();
    let trade_id = w.engine.accept_offer(w.buyer, offer_id, dec(amount)).unwrap();
    w.engine.mark_payment_sent(trade_id, w.buyer).unwrap();
    trade_id
}

#[test]
fn silent_seller_is_escalated_and_buyer_made_whole() {
    // The buyer pays; the seller disappears. After the confirmation grace
    // period the system opens a dispute on the buyer's behalf, and the
    // arbitrator releases the escrow to the buyer.
    let mut w = world();
    let trade_id = paid_trade(&mut w, 200);

    // Within the grace period nothing escalates.
    w.clock.advance(Duration::minutes(60));
    assert!(w.disputes.escalate_stalled(&mut w.engine).is_empty());

    w.clock.advance(Duration::minutes(61));
    let opened = w.disputes.escalate_stalled(&mut w.engine);
    assert_eq!(opened.len(), 1);

    let dispute = w.disputes.get(opened[0]).unwrap();
    assert_eq!(dispute.opened_by, DisputeOpener::System);
    assert_eq!(w.engine.trade(trade_id).unwrap().status, TradeStatus::Disputed);

    // A second pass must not open a duplicate case.
    assert!(w.disputes.escalate_stalled(&mut w.engine).is_empty());

    w.disputes
        .resolve(&mut w.engine, opened[0], w.arbitrator, DisputeOutcome::ReleaseToBuyer)
        .unwrap();
    assert_eq!(w.engine.balance(w.buyer, "HEZ").available, dec(200));
    assert_eq!(w.engine.reputation(w.seller).score, 35);
}

#[test]
fn fraudulent_payment_claim_refunds_seller() {
    // The buyer claims payment that never arrived. The seller disputes with
    // evidence; the arbitrator refunds the escrow and the buyer takes the
    // reputation hit.
    let mut w = world();
    let trade_id = paid_trade(&mut w, 300);

    let dispute_id = w
        .disputes
        .open(
            &mut w.engine,
            trade_id,
            w.seller,
            "no incoming transfer matches this trade",
            vec!["bank-statement.pdf".to_string()],
        )
        .unwrap();
    w.disputes
        .append_evidence(&w.engine, dispute_id, w.buyer, "transfer-screenshot.png")
        .unwrap();
    w.disputes.claim(&w.engine, dispute_id, w.arbitrator).unwrap();
    w.disputes
        .resolve(&mut w.engine, dispute_id, w.arbitrator, DisputeOutcome::RefundToSeller)
        .unwrap();

    assert_eq!(w.engine.trade(trade_id).unwrap().status, TradeStatus::Cancelled);
    assert_eq!(w.engine.balance(w.seller, "HEZ").available, dec(1000));
    assert_eq!(w.engine.balance(w.buyer, "HEZ").available, dec(0));
    assert_eq!(w.engine.reputation(w.buyer).score, 35);
    assert_eq!(w.engine.reputation(w.seller).score, 50);

    // Refund restored the offer's liquidity.
    let offer_id = w.engine.trade(trade_id).unwrap().offer_id;
    assert_eq!(w.engine.offer(offer_id).unwrap().remaining_amount, dec(1000));
}

#[test]
fn disputed_trade_is_frozen_until_verdict() {
    let mut w = world();
    let trade_id = paid_trade(&mut w, 100);
    w.disputes
        .open(&mut w.engine, trade_id, w.buyer, "stalling", Vec::new())
        .unwrap();

    // Neither party can move the trade while the case is open.
    assert!(w.engine.confirm_and_complete(trade_id, w.seller).is_err());
    assert!(w.engine.cancel(trade_id, w.buyer).is_err());
    assert_eq!(w.engine.balance(w.seller, "HEZ").locked, dec(100));
}

#[test]
fn split_verdict_conserves_supply() {
    let mut w = world();
    let supply = w.engine.total_supply("HEZ");
    let trade_id = paid_trade(&mut w, 333);

    let dispute_id = w
        .disputes
        .open(&mut w.engine, trade_id, w.buyer, "half delivered", Vec::new())
        .unwrap();
    w.disputes
        .resolve(
            &mut w.engine,
            dispute_id,
            w.arbitrator,
            DisputeOutcome::Split {
                buyer_bps: Some(5_000),
            },
        )
        .unwrap();

    let buyer_share = w.engine.balance(w.buyer, "HEZ").available;
    let seller_total = w.engine.balance(w.seller, "HEZ").available;
    assert_eq!(buyer_share + seller_total, dec(1000));
    assert_eq!(w.engine.total_supply("HEZ"), supply);
    assert_eq!(w.engine.balance(w.seller, "HEZ").locked, dec(0));
}

#[test]
fn dispute_notifications_reach_both_parties() {
    let mut w = world();
    let trade_id = paid_trade(&mut w, 100);
    let dispute_id = w
        .disputes
        .open(&mut w.engine, trade_id, w.buyer, "stalling", Vec::new())
        .unwrap();
    w.disputes
        .resolve(&mut w.engine, dispute_id, w.arbitrator, DisputeOutcome::ReleaseToBuyer)
        .unwrap();

    let delivered = w.notifier.delivered();
    for kind in [NotificationKind::DisputeOpened, NotificationKind::DisputeResolved] {
        let recipients: Vec<UserId> = delivered
            .iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.user_id)
            .collect();
        assert!(recipients.contains(&w.buyer), "{kind} missing for buyer");
        assert!(recipients.contains(&w.seller), "{kind} missing for seller");
    }

    // The arbitration roster hears about new cases.
    assert!(delivered
        .iter()
        .any(|n| n.kind == NotificationKind::DisputeOpened && n.user_id == w.arbitrator));
}

#[test]
fn pending_trade_can_also_be_disputed() {
    // Disputes are not limited to PAYMENT_SENT; a pending trade with a
    // disagreement goes to arbitration too.
    let mut w = world();
    let offer_id = w
        .engine
        .create_offer(
            w.seller,
            OfferTerms {
                token: "HEZ".to_string(),
                total_amount: dec(1000),
                price_per_unit: dec(10),
                fiat_currency: "TRY".to_string(),
                min_order: dec(10),
                max_order: dec(1000),
                payment_method: "bank_transfer".to_string(),
            },
        )
        .unwrap();
    let trade_id = w.engine.accept_offer(w.buyer, offer_id, dec(50)).unwrap();

    let dispute_id = w
        .disputes
        .open(&mut w.engine, trade_id, w.seller, "buyer unresponsive", Vec::new())
        .unwrap();
    w.disputes
        .resolve(&mut w.engine, dispute_id, w.arbitrator, DisputeOutcome::RefundToSeller)
        .unwrap();
    assert_eq!(w.engine.balance(w.seller, "HEZ").available, dec(1000));
}

#[test]
fn resolved_trade_cannot_be_redisputed() {
    let mut w = world();
    let trade_id = paid_trade(&mut w, 100);
    let dispute_id = w
        .disputes
        .open(&mut w.engine, trade_id, w.buyer, "first", Vec::new())
        .unwrap();
    w.disputes
        .resolve(&mut w.engine, dispute_id, w.arbitrator, DisputeOutcome::ReleaseToBuyer)
        .unwrap();

    // The trade is terminal now; a fresh dispute is rejected at the state
    // machine, not just the duplicate guard.
    let err = w
        .disputes
        .open(&mut w.engine, trade_id, w.buyer, "second", Vec::new())
        .unwrap_err();
    assert!(matches!(
        err,
        peertrade_types::PeertradeError::InvalidTradeState { .. }
    ));
}
