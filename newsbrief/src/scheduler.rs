use chrono::{
    DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};
use common::Cadence;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::job::{Job, JobOutcome};

/// Source of wall-clock time for due-checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The real local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// The single schedule entry of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    cadence: Cadence,
    next_run_at: DateTime<Local>,
}

impl ScheduleEntry {
    pub fn new(cadence: Cadence, now: DateTime<Local>) -> Self {
        Self {
            cadence,
            next_run_at: next_run_after(cadence, now),
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn next_run_at(&self) -> DateTime<Local> {
        self.next_run_at
    }

    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        now >= self.next_run_at
    }

    fn advance(&mut self, now: DateTime<Local>) {
        self.next_run_at = next_run_after(self.cadence, now);
    }
}

/// Daily: the next occurrence of the time strictly after `now`.
/// Interval: `now` plus the interval.
pub fn next_run_after(cadence: Cadence, now: DateTime<Local>) -> DateTime<Local> {
    match cadence {
        Cadence::EveryMinutes(k) => now + ChronoDuration::minutes(i64::from(k)),
        Cadence::DailyAt(time) => {
            let today = local_at(now.date_naive(), time);
            if today > now {
                today
            } else {
                let tomorrow = now.date_naive().succ_opt().unwrap_or(NaiveDate::MAX);
                local_at(tomorrow, time)
            }
        }
    }
}

fn local_at(date: NaiveDate, time: NaiveTime) -> DateTime<Local> {
    let naive = date.and_time(time);
    resolve_wall_time(naive, |n| n.and_local_timezone(Local))
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Map a wall-clock time to an instant. An ambiguous time (clocks going back)
/// takes the earlier instant; a time inside a spring-forward gap moves one
/// hour later, past the gap.
fn resolve_wall_time<Tz, F>(naive: NaiveDateTime, lookup: F) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
    F: Fn(NaiveDateTime) -> LocalResult<DateTime<Tz>>,
{
    match lookup(naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => lookup(naive + ChronoDuration::hours(1)).earliest(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Polls one schedule entry and runs the job inline when it is due.
///
/// Running a job needs `&mut self` and is awaited to completion before the
/// scheduler does anything else, so two runs can never overlap.
pub struct Scheduler<C: Clock = SystemClock> {
    entry: ScheduleEntry,
    state: SchedulerState,
    tick: Duration,
    clock: C,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(cadence: Cadence, tick: Duration, clock: C) -> Self {
        let entry = ScheduleEntry::new(cadence, clock.now());
        info!(?cadence, next_run_at = %entry.next_run_at, "Scheduler initialized");
        Self {
            entry,
            state: SchedulerState::Idle,
            tick,
            clock,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn entry(&self) -> &ScheduleEntry {
        &self.entry
    }

    /// Run the job once, now, without touching the schedule.
    pub async fn run_job<J: Job + ?Sized>(&mut self, job: &J) -> JobOutcome {
        debug_assert_eq!(self.state, SchedulerState::Idle);
        self.state = SchedulerState::Running;
        let outcome = job.run().await;
        self.state = SchedulerState::Idle;
        outcome
    }

    /// One due-check. Runs the job if due and reschedules from the time it finished.
    pub async fn run_pending<J: Job + ?Sized>(&mut self, job: &J) -> Option<JobOutcome> {
        let now = self.clock.now();
        debug!(next_run_at = %self.entry.next_run_at, "Checking schedule...");
        if !self.entry.is_due(now) {
            return None;
        }

        let outcome = self.run_job(job).await;
        self.entry.advance(self.clock.now());
        info!(next_run_at = %self.entry.next_run_at, "Next run scheduled");
        Some(outcome)
    }

    /// Poll every tick until `shutdown` completes. A job in flight when
    /// `shutdown` fires is dropped.
    pub async fn run_until<J, F>(&mut self, job: &J, shutdown: F)
    where
        J: Job + ?Sized,
        F: Future<Output = ()>,
    {
        info!(tick_secs = self.tick.as_secs(), "Scheduler started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = self.run_pending(job) => {}
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.tick) => {}
            }
        }

        self.state = SchedulerState::Idle;
        info!("Scheduler stopped");
    }
}
