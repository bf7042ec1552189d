use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Local};
use common::Cadence;
use newsbrief::job::{Job, JobOutcome};
use newsbrief::scheduler::{Clock, Scheduler, SchedulerState};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Wall clock driven by tokio's (pausable) clock
struct TokioClock {
    base: DateTime<Local>,
    started: Instant,
}

impl TokioClock {
    fn new() -> Self {
        Self {
            base: Local::now(),
            started: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Local> {
        let elapsed = ChronoDuration::from_std(self.started.elapsed()).unwrap_or_else(|_| ChronoDuration::zero());
        self.base + elapsed
    }
}

#[derive(Clone)]
struct ManualClock(Arc<Mutex<DateTime<Local>>>);

impl ManualClock {
    fn advance(&self, by: ChronoDuration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct Counters {
    runs: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

/// Records starts and concurrency; optionally takes a while and always fails
struct RecordingJob {
    counters: Arc<Counters>,
    duration: Duration,
    fail: bool,
}

impl RecordingJob {
    fn new(duration: Duration, fail: bool) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                counters: counters.clone(),
                duration,
                fail,
            },
            counters,
        )
    }
}

#[async_trait]
impl Job for RecordingJob {
    async fn run(&self) -> JobOutcome {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        let current = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.duration.is_zero() {
            tokio::time::sleep(self.duration).await;
        }

        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            JobOutcome::Failed {
                kind: "fetch_error",
                message: "simulated".to_string(),
            }
        } else {
            JobOutcome::Delivered
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_interval_runs_once_per_minute() {
    let (job, counters) = RecordingJob::new(Duration::ZERO, false);
    let mut scheduler = Scheduler::new(Cadence::EveryMinutes(1), Duration::from_secs(60), TokioClock::new());

    scheduler
        .run_until(&job, tokio::time::sleep(Duration::from_secs(630)))
        .await;

    let runs = counters.runs.load(Ordering::SeqCst);
    assert!((9..=10).contains(&runs), "unexpected run count {}", runs);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_slow_job_never_overlaps() {
    // Each run outlasts the interval
    let (job, counters) = RecordingJob::new(Duration::from_secs(150), false);
    let mut scheduler = Scheduler::new(Cadence::EveryMinutes(1), Duration::from_secs(60), TokioClock::new());

    scheduler
        .run_until(&job, tokio::time::sleep(Duration::from_secs(630)))
        .await;

    assert_eq!(counters.max_in_flight.load(Ordering::SeqCst), 1);
    let runs = counters.runs.load(Ordering::SeqCst);
    assert!((2..=3).contains(&runs), "unexpected run count {}", runs);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_failing_job_keeps_being_scheduled() {
    let (job, counters) = RecordingJob::new(Duration::ZERO, true);
    let mut scheduler = Scheduler::new(Cadence::EveryMinutes(1), Duration::from_secs(60), TokioClock::new());

    scheduler
        .run_until(&job, tokio::time::sleep(Duration::from_secs(330)))
        .await;

    assert!(counters.runs.load(Ordering::SeqCst) >= 4);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_first_due_runs_nothing() {
    let (job, counters) = RecordingJob::new(Duration::ZERO, false);
    let mut scheduler = Scheduler::new(Cadence::EveryMinutes(10), Duration::from_secs(60), TokioClock::new());

    scheduler
        .run_until(&job, tokio::time::sleep(Duration::from_secs(120)))
        .await;

    assert_eq!(counters.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_pending_only_when_due() {
    let clock = ManualClock(Arc::new(Mutex::new(Local::now())));
    let (job, counters) = RecordingJob::new(Duration::ZERO, false);
    let mut scheduler = Scheduler::new(Cadence::EveryMinutes(5), Duration::from_secs(60), clock.clone());
    let first_due = scheduler.entry().next_run_at();

    assert_eq!(scheduler.run_pending(&job).await, None);
    assert_eq!(counters.runs.load(Ordering::SeqCst), 0);

    clock.advance(ChronoDuration::minutes(4));
    assert_eq!(scheduler.run_pending(&job).await, None);

    clock.advance(ChronoDuration::minutes(1));
    assert_eq!(scheduler.run_pending(&job).await, Some(JobOutcome::Delivered));
    assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.entry().next_run_at(), first_due + ChronoDuration::minutes(5));

    // Already rescheduled, so an immediate re-check does nothing
    assert_eq!(scheduler.run_pending(&job).await, None);
}

#[tokio::test]
async fn test_failed_run_still_reschedules() {
    let clock = ManualClock(Arc::new(Mutex::new(Local::now())));
    let (job, _counters) = RecordingJob::new(Duration::ZERO, true);
    let mut scheduler = Scheduler::new(Cadence::EveryMinutes(1), Duration::from_secs(60), clock.clone());

    clock.advance(ChronoDuration::minutes(1));
    assert!(matches!(scheduler.run_pending(&job).await, Some(JobOutcome::Failed { .. })));
    assert!(!scheduler.entry().is_due(clock.now()));

    clock.advance(ChronoDuration::minutes(1));
    assert!(matches!(scheduler.run_pending(&job).await, Some(JobOutcome::Failed { .. })));
}

#[tokio::test]
async fn test_run_job_ignores_schedule() {
    let clock = ManualClock(Arc::new(Mutex::new(Local::now())));
    let (job, counters) = RecordingJob::new(Duration::ZERO, false);
    let mut scheduler = Scheduler::new(Cadence::EveryMinutes(30), Duration::from_secs(60), clock);
    let due = scheduler.entry().next_run_at();

    assert_eq!(scheduler.run_job(&job).await, JobOutcome::Delivered);
    assert_eq!(counters.runs.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.entry().next_run_at(), due);
}
