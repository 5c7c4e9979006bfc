//! Cancellable periodic and one-shot timers.
//!
//! Every timer is a Tokio task owned through a `TimerHandle`. Dropping or
//! cancelling the handle aborts the task, so a component that owns its
//! handles leaves no callbacks behind once it shuts down.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{ExecutionError, PulseResult};

/// Owned handle to an armed timer. Aborts the timer on drop.
#[derive(Debug)]
pub struct TimerHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Timer name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Cancels the timer. A callback already running is allowed to finish
    /// its current synchronous step.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// True once a one-shot fired or the timer was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn runtime(name: &'static str) -> PulseResult<Handle> {
    Handle::try_current().map_err(|_| ExecutionError::NoRuntime { timer: name.to_string() }.into())
}

/// Runs `tick` every `period`, first after one full period.
///
/// # Errors
///
/// Returns `ExecutionError::NoRuntime` outside a Tokio runtime.
pub fn every<F>(name: &'static str, period: Duration, mut tick: F) -> PulseResult<TimerHandle>
where
    F: FnMut() + Send + 'static,
{
    every_async(name, period, move || {
        tick();
        std::future::ready(())
    })
}

/// Async variant of [`every`]: ticks do not overlap, a slow tick delays the
/// next one.
///
/// # Errors
///
/// Returns `ExecutionError::NoRuntime` outside a Tokio runtime.
pub fn every_async<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> PulseResult<TimerHandle>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let rt = runtime(name)?;
    let period = period.max(Duration::from_millis(1));
    let task = rt.spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            tracing::trace!(timer = name, "tick");
            tick().await;
        }
    });
    Ok(TimerHandle { name, task })
}

/// Runs `fire` once after `delay`.
///
/// # Errors
///
/// Returns `ExecutionError::NoRuntime` outside a Tokio runtime.
pub fn after<F>(name: &'static str, delay: Duration, fire: F) -> PulseResult<TimerHandle>
where
    F: FnOnce() + Send + 'static,
{
    let rt = runtime(name)?;
    let task = rt.spawn(async move {
        time::sleep(delay).await;
        fire();
    });
    Ok(TimerHandle { name, task })
}

/// Runs `fut` as an owned background task.
///
/// # Errors
///
/// Returns `ExecutionError::NoRuntime` outside a Tokio runtime.
pub fn detach<Fut>(name: &'static str, fut: Fut) -> PulseResult<TimerHandle>
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let rt = runtime(name)?;
    Ok(TimerHandle { name, task: rt.spawn(fut) })
}

/// A set of timers cancelled together.
#[derive(Debug, Default)]
pub struct TimerSet {
    timers: Mutex<Vec<TimerHandle>>,
}

impl TimerSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `timer`, forgetting timers that already finished.
    pub fn push(&self, timer: TimerHandle) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        timers.retain(|t| !t.is_finished());
        timers.push(timer);
    }

    /// Number of timers still pending.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    /// Cancels and drops every timer.
    pub fn cancel_all(&self) {
        let drained: Vec<TimerHandle> = self.timers.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect();
        for timer in &drained {
            tracing::debug!(timer = timer.name(), "cancelled");
            timer.cancel();
        }
    }
}
