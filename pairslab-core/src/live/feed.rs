//! Cancellable bounded price feed between a market-data thread and the
//! strategy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

/// One quote from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
    pub instant: DateTime<Utc>,
}

/// Producer half: owned by the market-data thread.
pub struct Feed {
    symbol: String,
    sender: SyncSender<PriceTick>,
    cancelled: Arc<AtomicBool>,
}

/// Consumer half: owned by the strategy.
pub struct Subscription {
    symbol: String,
    receiver: Receiver<PriceTick>,
    cancelled: Arc<AtomicBool>,
}

/// Open a bounded feed for one symbol. A full buffer drops the newest tick
/// rather than blocking the producer.
pub fn subscribe(symbol: impl Into<String>, capacity: usize) -> (Feed, Subscription) {
    assert!(capacity > 0, "feed capacity must be positive");
    let symbol = symbol.into();
    let (sender, receiver) = sync_channel(capacity);
    let cancelled = Arc::new(AtomicBool::new(false));
    (
        Feed {
            symbol: symbol.clone(),
            sender,
            cancelled: cancelled.clone(),
        },
        Subscription {
            symbol,
            receiver,
            cancelled,
        },
    )
}

impl Feed {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Publish one tick. Returns `false` once the subscription is cancelled
    /// or its receiver is gone.
    pub fn publish(&self, tick: PriceTick) -> bool {
        if self.is_cancelled() {
            return false;
        }
        match self.sender.try_send(tick) {
            Ok(()) => true,
            Err(TrySendError::Full(tick)) => {
                debug!(symbol = %tick.symbol, "feed buffer full; tick dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                self.cancelled.store(true, Ordering::Release);
                false
            }
        }
    }
}

impl Subscription {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Stop the producer. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Drain whatever has arrived without blocking.
    pub fn drain(&self) -> Vec<PriceTick> {
        self.receiver.try_iter().collect()
    }

    /// Block for the next tick; `None` once the feed is gone.
    pub fn next(&self) -> Option<PriceTick> {
        self.receiver.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tick(price: f64) -> PriceTick {
        PriceTick {
            symbol: "GLD".into(),
            price,
            instant: Utc.with_ymd_and_hms(2020, 3, 2, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn ticks_flow_producer_to_consumer() {
        let (feed, sub) = subscribe("GLD", 8);
        assert!(feed.publish(tick(100.0)));
        assert!(feed.publish(tick(101.0)));

        let drained = sub.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].price, 101.0);
    }

    #[test]
    fn full_buffer_drops_the_newest_tick() {
        let (feed, sub) = subscribe("GLD", 1);
        assert!(feed.publish(tick(100.0)));
        assert!(feed.publish(tick(101.0)));
        assert_eq!(sub.drain(), vec![tick(100.0)]);
    }

    #[test]
    fn cancel_is_idempotent_and_stops_the_producer() {
        let (feed, sub) = subscribe("GLD", 8);
        sub.cancel();
        sub.cancel();
        assert!(!feed.publish(tick(100.0)));
        assert!(feed.is_cancelled());
    }

    #[test]
    fn dropped_receiver_cancels_the_feed() {
        let (feed, sub) = subscribe("GLD", 1);
        drop(sub);
        assert!(!feed.publish(tick(100.0)));
        assert!(feed.is_cancelled());
    }
}
