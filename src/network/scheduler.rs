//! Draw Scheduler
//!
//! Repeating auto-draw timers, one per channel. The manager arms a timer
//! when a game starts and cancels it whenever the game stops; ticks come back
//! as [`TimerKey`]s so a tick from a replaced session can be recognised.

use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;
use uuid::Uuid;

/// Identifies one armed timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    /// Channel whose game is drawn.
    pub channel: String,
    /// Session the timer was armed for.
    pub session_id: Uuid,
    /// Unique per arming.
    pub timer_id: Uuid,
}

impl TimerKey {
    /// Fresh key for `session_id` in `channel`.
    pub fn new(channel: impl Into<String>, session_id: Uuid) -> Self {
        Self {
            channel: channel.into(),
            session_id,
            timer_id: Uuid::new_v4(),
        }
    }
}

/// Owner of per-channel repeating timers.
///
/// At most one timer is active per channel: scheduling replaces the
/// previous one.
pub trait DrawScheduler {
    /// Arm a repeating timer; the first tick comes after `every`.
    fn schedule(&mut self, key: TimerKey, every: Duration);

    /// Disarm the channel's timer, if any.
    fn cancel(&mut self, channel: &str);

    /// Key of the channel's active timer.
    fn active(&self, channel: &str) -> Option<&TimerKey>;
}

// =============================================================================
// TOKIO SCHEDULER
// =============================================================================

struct ArmedTimer {
    key: TimerKey,
    task: JoinHandle<()>,
}

/// Scheduler backed by tokio interval tasks.
///
/// Each tick is sent on the channel returned by [`TokioScheduler::new`].
/// Must be used inside a tokio runtime.
pub struct TokioScheduler {
    ticks: mpsc::UnboundedSender<TimerKey>,
    timers: BTreeMap<String, ArmedTimer>,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its ticks arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerKey>) {
        let (ticks, rx) = mpsc::unbounded_channel();
        (Self { ticks, timers: BTreeMap::new() }, rx)
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl DrawScheduler for TokioScheduler {
    fn schedule(&mut self, key: TimerKey, every: Duration) {
        self.cancel(&key.channel);

        let tx = self.ticks.clone();
        let tick_key = key.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(tick_key.clone()).is_err() {
                    break;
                }
            }
        });

        debug!(channel = %key.channel, interval_ms = every.as_millis() as u64, "Timer armed");
        self.timers.insert(key.channel.clone(), ArmedTimer { key, task });
    }

    fn cancel(&mut self, channel: &str) {
        if let Some(timer) = self.timers.remove(channel) {
            timer.task.abort();
            debug!(channel, "Timer cancelled");
        }
    }

    fn active(&self, channel: &str) -> Option<&TimerKey> {
        self.timers.get(channel).map(|t| &t.key)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for timer in self.timers.values() {
            timer.task.abort();
        }
    }
}

// =============================================================================
// MANUAL SCHEDULER
// =============================================================================

/// Clock-free scheduler; ticks are produced on demand with [`ManualScheduler::fire`].
#[derive(Debug, Default)]
pub struct ManualScheduler {
    timers: BTreeMap<String, (TimerKey, Duration)>,
    scheduled: usize,
    cancelled: usize,
}

impl ManualScheduler {
    /// Empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key a tick of the channel's timer would carry.
    pub fn fire(&self, channel: &str) -> Option<TimerKey> {
        self.timers.get(channel).map(|(key, _)| key.clone())
    }

    /// Interval of the channel's timer.
    pub fn interval(&self, channel: &str) -> Option<Duration> {
        self.timers.get(channel).map(|(_, every)| *every)
    }

    /// Armed timer count.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Total `schedule` calls.
    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    /// Total cancellations of an armed timer.
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl DrawScheduler for ManualScheduler {
    fn schedule(&mut self, key: TimerKey, every: Duration) {
        self.cancel(&key.channel);
        self.scheduled += 1;
        self.timers.insert(key.channel.clone(), (key, every));
    }

    fn cancel(&mut self, channel: &str) {
        if self.timers.remove(channel).is_some() {
            self.cancelled += 1;
        }
    }

    fn active(&self, channel: &str) -> Option<&TimerKey> {
        self.timers.get(channel).map(|(key, _)| key)
    }
}

// =============================================================================
// TESTS
// =============================================================================
