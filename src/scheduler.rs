use crate::message::AutoAdvanceTemplates;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

pub type TimerId = u64;

pub type FireCallback = Arc<dyn Fn(TimerId, AutoAdvanceJob) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoAdvanceJob {
    pub user: String,
    pub templates: AutoAdvanceTemplates,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerStatus {
    pub id: TimerId,
    pub interval: Duration,
    pub remaining: Duration,
    pub alive: bool,
}

pub struct TimerSlot {
    id: TimerId,
    interval: Duration,
    started_at: Instant,
    task: Option<AbortHandle>,
    job: AutoAdvanceJob,
    on_fire: FireCallback,
}

impl fmt::Debug for TimerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSlot")
            .field("id", &self.id)
            .field("interval", &self.interval)
            .field("alive", &self.is_alive())
            .field("user", &self.job.user)
            .finish()
    }
}

impl TimerSlot {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_alive(&self) -> bool {
        self.task.is_some()
    }

    pub fn status(&self) -> TimerStatus {
        let remaining = if self.is_alive() {
            self.interval.saturating_sub(self.started_at.elapsed())
        } else {
            Duration::ZERO
        };
        TimerStatus {
            id: self.id,
            interval: self.interval,
            remaining,
            alive: self.is_alive(),
        }
    }

    pub fn deactivate(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Debug)]
pub struct Scheduler {
    runtime: Handle,
    next_id: AtomicU64,
}

impl Scheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn arm(
        &self,
        slot: &mut Option<TimerSlot>,
        interval: Duration,
        job: AutoAdvanceJob,
        on_fire: FireCallback,
    ) -> TimerId {
        cancel(slot);
        let id = self.allocate_id();
        let task = self.spawn(id, interval, job.clone(), on_fire.clone());
        debug!(user = %job.user, id, secs = interval.as_secs_f64(), "armed auto-advance");
        *slot = Some(TimerSlot {
            id,
            interval,
            started_at: Instant::now(),
            task: Some(task),
            job,
            on_fire,
        });
        id
    }

    pub fn reschedule(&self, timer: &mut TimerSlot, interval: Duration) -> TimerId {
        timer.abort();
        let id = self.allocate_id();
        timer.task = Some(self.spawn(id, interval, timer.job.clone(), timer.on_fire.clone()));
        timer.id = id;
        timer.interval = interval;
        timer.started_at = Instant::now();
        debug!(user = %timer.job.user, id, secs = interval.as_secs_f64(), "rescheduled auto-advance");
        id
    }

    pub fn reactivate(&self, timer: &mut TimerSlot) -> bool {
        if timer.is_alive() {
            return false;
        }
        let interval = timer.interval;
        self.reschedule(timer, interval);
        true
    }

    fn allocate_id(&self) -> TimerId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn spawn(
        &self,
        id: TimerId,
        interval: Duration,
        job: AutoAdvanceJob,
        on_fire: FireCallback,
    ) -> AbortHandle {
        self.runtime
            .spawn(async move {
                tokio::time::sleep(interval).await;
                on_fire(id, job);
            })
            .abort_handle()
    }
}

pub fn cancel(slot: &mut Option<TimerSlot>) -> bool {
    match slot.take() {
        Some(mut timer) => {
            timer.abort();
            debug!(user = %timer.job.user, id = timer.id, "cancelled auto-advance");
            true
        }
        None => false,
    }
}

// A fired task may act only while its id still owns a live slot.
pub fn claim(slot: &mut Option<TimerSlot>, id: TimerId) -> Option<TimerSlot> {
    let owned = slot
        .as_ref()
        .is_some_and(|timer| timer.id == id && timer.is_alive());
    if owned { slot.take() } else { None }
}
