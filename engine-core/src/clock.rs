//! Monotonic wall time and a cancellable one-shot scheduler.
//!
//! The teacher's `Timer` (formerly in this file) is a per-frame polled
//! countdown list, suited to a client game loop that calls
//! `update_and_get_list(delta_time)` once a heartbeat. This server has no
//! heartbeat: handlers run to completion between events (spec.md §5), so a
//! firing timer must *post* a synthetic event onto the dispatcher's mailbox
//! rather than being polled. The shape — start/cancel by id, overwrite on
//! restart — is kept; the mechanism is now an async `tokio::time::sleep`
//! task guarded by a generation counter so a cancelled or superseded timer
//! can never deliver a stale firing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, Mutex};

pub type TimerId = u16;

/// Returns the current wall time in milliseconds since the Unix epoch.
/// Used for `question_start_ms` and client timestamp clamping.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

/// A cancellable one-shot scheduler. Every live question holds at most one
/// primary timer (spec.md §5); other ids are used for the word-chain bomb
/// and blind-map phase transitions, which run alongside it.
#[derive(Clone)]
pub struct Clock<Event> {
    generations: Arc<Mutex<HashMap<TimerId, u64>>>,
    sender: mpsc::Sender<Event>,
}

impl<Event> Clock<Event>
where
    Event: Send + 'static,
{
    /// `sender` is the dispatcher's own mailbox: firing a timer re-enqueues
    /// `on_fire(id)` rather than running any work on the timer task itself.
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Clock {
            generations: Arc::new(Mutex::new(HashMap::new())),
            sender,
        }
    }

    /// Arms (or re-arms, overwriting any existing timer of the same id)
    /// a one-shot that fires after `delay_ms`.
    pub async fn arm(&self, id: TimerId, delay_ms: u64, on_fire: impl FnOnce(TimerId) -> Event + Send + 'static) {
        let generation = {
            let mut generations = self.generations.lock().await;
            let entry = generations.entry(id).or_insert(0);
            *entry += 1;
            *entry
        };

        let generations = self.generations.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            let still_current = {
                let generations = generations.lock().await;
                generations.get(&id).copied() == Some(generation)
            };
            if still_current {
                // A send error means the dispatcher shut down; nothing to do.
                let _ = sender.send(on_fire(id)).await;
            }
        });
    }

    /// Cancels a timer if still armed. No-op if it already fired or was
    /// never set.
    pub async fn cancel(&self, id: TimerId) {
        let mut generations = self.generations.lock().await;
        generations.remove(&id);
    }

    /// Reschedules the remaining time of an armed timer to a shorter (or
    /// longer) delay without losing the cancellation guarantee — used by
    /// math-quiz's `fast_forward_timer`. This is just `arm` again: arming
    /// bumps the generation, so the earlier sleep becomes stale.
    pub async fn reschedule(
        &self,
        id: TimerId,
        delay_ms: u64,
        on_fire: impl FnOnce(TimerId) -> Event + Send + 'static,
    ) {
        self.arm(id, delay_ms, on_fire).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(8);
        let clock: Clock<TimerId> = Clock::new(tx);
        clock.arm(7, 100, |id| id).await;
        tokio::time::advance(std::time::Duration::from_millis(150)).await;
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::channel(8);
        let clock: Clock<TimerId> = Clock::new(tx);
        clock.arm(1, 100, |id| id).await;
        clock.cancel(1).await;
        tokio::time::advance(std::time::Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_overwrites_previous_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let clock: Clock<&'static str> = Clock::new(tx);
        clock.arm(1, 100, |_| "first").await;
        clock.arm(1, 200, |_| "second").await;
        tokio::time::advance(std::time::Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err(), "stale first timer must not fire");
        tokio::time::advance(std::time::Duration::from_millis(100)).await;
        assert_eq!(rx.recv().await, Some("second"));
    }

    #[tokio::test]
    async fn now_ms_is_monotonic_increasing() {
        let a = now_ms();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = now_ms();
        assert!(b >= a);
    }
}
