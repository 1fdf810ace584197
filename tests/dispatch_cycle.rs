mod common;

use std::sync::Arc;
use std::time::Duration;
use chrono::Duration as ChronoDuration;
use tokio_test::assert_ok;
use crypto_rates_bot::clock::FixedClock;
use crypto_rates_bot::models::PricePoint;
use crypto_rates_bot::services::{DispatchEngine, RateAnalytics, SubscriptionService};
use crypto_rates_bot::storage::{MemoryStore, PriceHistoryStore, SubscriptionStore};
use common::{t0, tracked, RecordingNotifier};

struct Harness {
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    engine: DispatchEngine,
    subscriptions: SubscriptionService,
}

async fn harness(notifier: RecordingNotifier) -> Harness {
    let store = Arc::new(MemoryStore::new());
    assert_ok!(
        store
            .save_batch(&[
                PricePoint::new("BTC", 105.0, t0()),
                PricePoint::new("ETH", 2500.0, t0()),
            ])
            .await
    );
    let analytics = Arc::new(RateAnalytics::new(
        tracked(),
        store.clone(),
        Arc::new(FixedClock::new(t0())),
    ));
    let notifier = Arc::new(notifier);
    let engine = DispatchEngine::new(
        store.clone(),
        analytics,
        notifier.clone(),
        Duration::from_secs(4),
    );
    let subscriptions = SubscriptionService::new(store.clone());
    Harness { store, notifier, engine, subscriptions }
}

#[test_log::test(tokio::test)]
async fn test_one_failed_recipient_does_not_block_others() {
    let h = harness(RecordingNotifier::failing_for(&[2])).await;
    assert_ok!(h.subscriptions.enable(1, 10).await);
    assert_ok!(h.subscriptions.enable(2, 10).await);

    let sent = assert_ok!(h.engine.dispatch_due(t0()).await);
    assert_eq!(sent, 1);
    assert_eq!(h.notifier.recipients().await, vec![1]);

    let chat1 = h.store.get(1).await.unwrap().unwrap();
    let chat2 = h.store.get(2).await.unwrap().unwrap();
    assert_eq!(chat1.last_sent_at, Some(t0()));
    assert_eq!(chat2.last_sent_at, None);

    // Chat 2 stays due and is retried on the next tick.
    let next = t0() + ChronoDuration::minutes(1);
    assert_eq!(h.store.find_due(next).await.unwrap(), vec![2]);
}

#[tokio::test]
async fn test_interval_is_honored_between_cycles() {
    let h = harness(RecordingNotifier::default()).await;
    assert_ok!(h.subscriptions.enable(7, 10).await);

    assert_eq!(assert_ok!(h.engine.dispatch_due(t0()).await), 1);
    assert_eq!(
        assert_ok!(h.engine.dispatch_due(t0() + ChronoDuration::minutes(9)).await),
        0
    );
    assert_eq!(
        assert_ok!(h.engine.dispatch_due(t0() + ChronoDuration::minutes(10)).await),
        1
    );

    let delivered = h.notifier.delivered.lock().await;
    assert_eq!(delivered.len(), 2);
    assert_eq!(
        delivered[0].1,
        "BTC | price: 105.00 | updated: 12:00:00\nETH | price: 2500.00 | updated: 12:00:00"
    );
}

#[tokio::test]
async fn test_disabled_chat_gets_nothing() {
    let h = harness(RecordingNotifier::default()).await;
    assert_ok!(h.subscriptions.enable(3, 5).await);
    assert_ok!(h.subscriptions.disable(3).await);
    assert_ok!(h.subscriptions.disable(3).await);

    assert_eq!(assert_ok!(h.engine.dispatch_due(t0()).await), 0);
    assert!(h.notifier.recipients().await.is_empty());
}
