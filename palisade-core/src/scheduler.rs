//! ## palisade-core::scheduler
//! **Logical clock + time-ordered action queue**
//!
//! The scheduler never sleeps. It pops the earliest pending action, moves the
//! clock to that action's fire time, and hands the action to the caller's
//! handler, which may schedule more work (including zero-delay work).
//!
//! Ordering is total: actions are keyed by `(fire_at, sequence)`, where the
//! sequence number grows with every `schedule` call. Equal fire times are
//! therefore served first-in first-out, and an action scheduled at `t1`
//! (plus anything it schedules at `t1`) always completes before anything
//! at `t2 > t1` starts.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{trace, warn};

use crate::error::SchedulerError;

/// Opaque handle to a pending action. Doubles as the queue key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken {
    fire_at: Duration,
    sequence: u64,
}

impl TimerToken {
    /// Logical time at which the action fires (or would have fired).
    #[inline]
    pub fn fire_at(&self) -> Duration {
        self.fire_at
    }
}

/// Counters describing what the scheduler did during a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub fired: u64,
    pub cancelled: u64,
    /// `cancel` calls for tokens that had already fired or been cancelled.
    pub stale_cancels: u64,
    /// `schedule_secs` calls rejected for a negative or non-finite delay.
    pub rejected: u64,
}

/// Single-threaded discrete-event scheduler over action payloads of type `A`.
#[derive(Debug)]
pub struct Scheduler<A> {
    queue: BTreeMap<TimerToken, A>,
    sequence: u64,
    now: Duration,
    stats: SchedulerStats,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            stats: SchedulerStats::default(),
        }
    }

    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[inline]
    pub fn now_secs(&self) -> f64 {
        self.now.as_secs_f64()
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn next_fire_time(&self) -> Option<Duration> {
        self.queue.first_key_value().map(|(token, _)| token.fire_at)
    }

    /// Schedules `action` to fire `delay` after the current logical time.
    pub fn schedule(&mut self, delay: Duration, action: A) -> TimerToken {
        self.sequence += 1;
        let token = TimerToken {
            fire_at: self.now.saturating_add(delay),
            sequence: self.sequence,
        };
        self.queue.insert(token, action);
        self.stats.scheduled += 1;
        token
    }

    /// Like [`Scheduler::schedule`] but takes a delay in seconds.
    ///
    /// Negative, NaN and infinite delays are rejected without touching the
    /// queue; the rejection is counted in [`SchedulerStats::rejected`].
    pub fn schedule_secs(
        &mut self,
        delay_secs: f64,
        action: A,
    ) -> Result<TimerToken, SchedulerError> {
        match Duration::try_from_secs_f64(delay_secs) {
            Ok(delay) => Ok(self.schedule(delay, action)),
            Err(_) => {
                self.stats.rejected += 1;
                warn!(delay_secs, "Rejected schedule with invalid delay");
                Err(SchedulerError::InvalidDelay(delay_secs))
            }
        }
    }

    /// Cancels a pending action. Returns `false` (and does nothing else) if
    /// the action already fired or was already cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        if self.queue.remove(&token).is_some() {
            self.stats.cancelled += 1;
            true
        } else {
            self.stats.stale_cancels += 1;
            trace!(?token, "Cancel of stale token ignored");
            false
        }
    }

    /// Removes the earliest action if it fires no later than `stop_time`,
    /// advancing the clock to its fire time.
    pub fn pop_next(&mut self, stop_time: Duration) -> Option<(TimerToken, A)> {
        let (&token, _) = self.queue.first_key_value()?;
        if token.fire_at > stop_time {
            return None;
        }
        let (token, action) = self.queue.pop_first()?;
        self.now = token.fire_at;
        self.stats.fired += 1;
        Some((token, action))
    }

    /// Runs actions in time order until the queue drains or the next action
    /// lies beyond `stop_time`. Returns the number of actions executed.
    pub fn run<F>(&mut self, stop_time: Duration, mut handler: F) -> u64
    where
        F: FnMut(&mut Self, A),
    {
        let mut executed = 0;
        while let Some((token, action)) = self.pop_next(stop_time) {
            trace!(time = ?token.fire_at, pending = self.queue.len(), "Firing action");
            handler(self, action);
            executed += 1;
        }
        executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut Scheduler<&'static str>) -> Vec<&'static str> {
        let mut fired = Vec::new();
        scheduler.run(Duration::MAX, |_, action| fired.push(action));
        fired
    }

    #[test]
    fn fires_in_time_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Duration::from_secs(3), "c");
        scheduler.schedule(Duration::from_secs(1), "a");
        scheduler.schedule(Duration::from_secs(2), "b");
        assert_eq!(drain(&mut scheduler), vec!["a", "b", "c"]);
        assert_eq!(scheduler.now(), Duration::from_secs(3));
    }

    #[test]
    fn equal_times_are_fifo() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Duration::from_secs(1), "first");
        scheduler.schedule(Duration::from_secs(1), "second");
        scheduler.schedule(Duration::from_secs(1), "third");
        assert_eq!(drain(&mut scheduler), vec!["first", "second", "third"]);
    }

    #[test]
    fn zero_delay_runs_before_later_actions() {
        let mut scheduler: Scheduler<u32> = Scheduler::new();
        scheduler.schedule(Duration::from_secs(1), 1);
        scheduler.schedule(Duration::from_secs(2), 2);
        let mut order = Vec::new();
        scheduler.run(Duration::MAX, |sched, action| {
            order.push((action, sched.now()));
            if action == 1 {
                sched.schedule(Duration::ZERO, 10);
            }
        });
        assert_eq!(
            order,
            vec![
                (1, Duration::from_secs(1)),
                (10, Duration::from_secs(1)),
                (2, Duration::from_secs(2)),
            ]
        );
    }

    #[test]
    fn zero_delay_queues_behind_same_instant() {
        let mut scheduler: Scheduler<u32> = Scheduler::new();
        scheduler.schedule(Duration::from_secs(1), 1);
        scheduler.schedule(Duration::from_secs(1), 2);
        let mut order = Vec::new();
        scheduler.run(Duration::MAX, |sched, action| {
            order.push(action);
            if action == 1 {
                sched.schedule(Duration::ZERO, 3);
            }
        });
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut scheduler = Scheduler::new();
        let token = scheduler.schedule(Duration::from_secs(1), "timer");
        assert!(scheduler.cancel(token));
        assert!(!scheduler.cancel(token));
        assert!(drain(&mut scheduler).is_empty());
        let stats = scheduler.stats();
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.stale_cancels, 1);
        assert_eq!(stats.fired, 0);
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let mut scheduler = Scheduler::new();
        let token = scheduler.schedule(Duration::from_secs(1), "timer");
        assert_eq!(drain(&mut scheduler), vec!["timer"]);
        assert!(!scheduler.cancel(token));
        assert!(drain(&mut scheduler).is_empty());
        assert_eq!(scheduler.stats().fired, 1);
    }

    #[test]
    fn stop_time_leaves_later_actions_pending() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Duration::from_secs(1), "early");
        scheduler.schedule(Duration::from_secs(10), "late");
        let mut fired = Vec::new();
        let executed = scheduler.run(Duration::from_secs(5), |_, a| fired.push(a));
        assert_eq!(executed, 1);
        assert_eq!(fired, vec!["early"]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.next_fire_time(), Some(Duration::from_secs(10)));
        assert_eq!(scheduler.now(), Duration::from_secs(1));
    }

    #[test]
    fn rejects_invalid_delays() {
        let mut scheduler = Scheduler::new();
        for bad in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                scheduler.schedule_secs(bad, "bad"),
                Err(SchedulerError::InvalidDelay(_))
            ));
        }
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.stats().rejected, 4);

        let token = scheduler.schedule_secs(0.25, "ok").unwrap();
        assert_eq!(token.fire_at(), Duration::from_millis(250));
    }
}
