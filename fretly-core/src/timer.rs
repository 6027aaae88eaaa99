//! # Countdown Timer Module
//!
//! Per-question countdown anchored to the wall clock. Every tick recomputes
//! the time left from an absolute deadline instead of decrementing a
//! counter, so late or bunched ticks never accumulate drift.
//!
//! Each run owns a ticker thread. Stopping, pausing or resetting cancels that
//! thread and bumps a generation counter; a tick that was already in flight
//! sees the newer generation and drops itself, so a stale timeout can never
//! fire after the timer has moved on.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, bounded, select, tick};
use parking_lot::Mutex;

/// Interval between remaining-time updates.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
}

/// Emitted from the ticker thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerEvent {
    /// Time left after a tick, in seconds.
    Tick { remaining_secs: f32 },
    /// The countdown reached zero. Sent exactly once per run.
    Expired,
}

type Callback = Arc<dyn Fn(TimerEvent) + Send + Sync>;

struct Inner {
    state: TimerState,
    /// Length of the last run started or reset.
    length: Duration,
    /// Remaining time frozen by the last pause/reset, or the run's full length.
    base: Duration,
    deadline: Option<Instant>,
    generation: u64,
}

impl Inner {
    fn remaining(&self, now: Instant) -> Duration {
        match (self.state, self.deadline) {
            (TimerState::Running, Some(deadline)) => deadline.saturating_duration_since(now),
            _ => self.base,
        }
    }
}

/// Handle to one ticker thread; dropping it cancels and joins the thread.
struct Ticker {
    cancel_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let _ = self.cancel_tx.try_send(());
        if let Some(handle) = self.thread.take() {
            // The ticker never blocks on the timer itself, so joining is safe
            // unless we are the ticker thread (a callback stopping its own timer).
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Wall-clock countdown with pause, resume and reset.
pub struct CountdownTimer {
    inner: Arc<Mutex<Inner>>,
    callback: Callback,
    ticker: Option<Ticker>,
    tick_interval: Duration,
}

impl CountdownTimer {
    /// Creates a stopped timer that reports through `on_event`.
    ///
    /// The callback runs on the ticker thread; it should hand the event off
    /// (for example into a channel) rather than do work in place.
    pub fn new<F>(on_event: F) -> Self
    where
        F: Fn(TimerEvent) + Send + Sync + 'static,
    {
        Self::with_tick_interval(TICK_INTERVAL, on_event)
    }

    pub fn with_tick_interval<F>(tick_interval: Duration, on_event: F) -> Self
    where
        F: Fn(TimerEvent) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: TimerState::Stopped,
                length: Duration::ZERO,
                base: Duration::ZERO,
                deadline: None,
                generation: 0,
            })),
            callback: Arc::new(on_event),
            ticker: None,
            tick_interval,
        }
    }

    pub fn state(&self) -> TimerState {
        self.inner.lock().state
    }

    /// Seconds left, computed from the deadline while running.
    pub fn remaining_secs(&self) -> f32 {
        self.inner.lock().remaining(Instant::now()).as_secs_f32()
    }

    /// Starts a fresh countdown of `duration_secs`, replacing any run in progress.
    pub fn start(&mut self, duration_secs: f32) {
        self.cancel_ticker();
        let duration = secs_to_duration(duration_secs);
        {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.length = duration;
            inner.base = duration;
            inner.state = TimerState::Running;
            inner.deadline = Some(Instant::now() + duration);
        }
        log::debug!("[TIMER] Started {:.1}s countdown", duration.as_secs_f32());
        self.spawn_ticker();
    }

    /// Freezes the countdown. Only valid while running.
    pub fn pause(&mut self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state != TimerState::Running {
                return false;
            }
            inner.base = inner.remaining(Instant::now());
            inner.deadline = None;
            inner.state = TimerState::Paused;
            inner.generation += 1;
        }
        self.cancel_ticker();
        log::debug!("[TIMER] Paused with {:.2}s left", self.remaining_secs());
        true
    }

    /// Continues a paused countdown from where it was frozen.
    pub fn resume(&mut self) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state != TimerState::Paused || inner.base.is_zero() {
                return false;
            }
            inner.generation += 1;
            inner.deadline = Some(Instant::now() + inner.base);
            inner.state = TimerState::Running;
        }
        log::debug!("[TIMER] Resumed");
        self.spawn_ticker();
        true
    }

    /// Stops the countdown and sets the remaining time to `duration_secs`,
    /// or to the length of the last run when `None`. Valid from any state.
    pub fn reset(&mut self, duration_secs: Option<f32>) {
        {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            if let Some(secs) = duration_secs {
                inner.length = secs_to_duration(secs);
            }
            inner.base = inner.length;
            inner.deadline = None;
            inner.state = TimerState::Stopped;
        }
        self.cancel_ticker();
    }

    fn cancel_ticker(&mut self) {
        // Dropping the handle cancels and joins the thread.
        self.ticker = None;
    }

    fn spawn_ticker(&mut self) {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let inner = Arc::clone(&self.inner);
        let callback = Arc::clone(&self.callback);
        let generation = inner.lock().generation;
        let ticks = tick(self.tick_interval);

        let thread = thread::Builder::new()
            .name("countdown-ticker".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(ticks) -> _ => {
                            let event = {
                                let mut inner = inner.lock();
                                if inner.generation != generation
                                    || inner.state != TimerState::Running
                                {
                                    break;
                                }
                                let remaining = inner.remaining(Instant::now());
                                if remaining.is_zero() {
                                    inner.state = TimerState::Stopped;
                                    inner.base = Duration::ZERO;
                                    inner.deadline = None;
                                    TimerEvent::Expired
                                } else {
                                    TimerEvent::Tick { remaining_secs: remaining.as_secs_f32() }
                                }
                            };
                            (*callback)(event);
                            if event == TimerEvent::Expired {
                                log::debug!("[TIMER] Expired");
                                break;
                            }
                        }
                        recv(cancel_rx) -> _ => break,
                    }
                }
            });

        match thread {
            Ok(handle) => {
                self.ticker = Some(Ticker {
                    cancel_tx,
                    thread: Some(handle),
                });
            }
            Err(e) => log::error!("[TIMER] Could not spawn ticker thread: {}", e),
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.inner.lock().generation += 1;
        self.cancel_ticker();
    }
}

fn secs_to_duration(secs: f32) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f32(secs)
    } else {
        Duration::ZERO
    }
}
