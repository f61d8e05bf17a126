//! Round orchestration.
//!
//! One task per account per round. Tasks are spawned with a small delay
//! between launches, then wait on a counting gate so at most
//! [`MAX_CONCURRENT_TASKS`] are doing account work at once. Each task runs
//! the worker under the retry policy and always yields a [`TaskOutcome`];
//! nothing a task does can fail the round.
//!
//! The proxy rotator is owned by the launch loop and advanced before each
//! spawn, so no two tasks ever see the same cursor value.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::retry::RetryPolicy;
use crate::proxy::ProxyRotator;
use crate::storage;
use crate::types::{Account, ActionOutcome, RoundReport, TaskOutcome};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Admission gate capacity.
pub const MAX_CONCURRENT_TASKS: usize = 10;
/// Pause between the end of one round and the start of the next.
pub const ROUND_DELAY: Duration = Duration::from_secs(15);

const JITTER_MIN: Duration = Duration::from_secs(1);
const JITTER_MAX: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Launch delay
// ---------------------------------------------------------------------------

/// Delay inserted between successive task launches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaunchDelay {
    /// Uniformly random in `[min, max]`.
    Jitter { min: Duration, max: Duration },
    Fixed(Duration),
}

impl Default for LaunchDelay {
    fn default() -> Self {
        LaunchDelay::Jitter {
            min: JITTER_MIN,
            max: JITTER_MAX,
        }
    }
}

impl LaunchDelay {
    /// A configured fixed delay, or the default jitter.
    pub fn from_config(fixed: Option<Duration>) -> Self {
        fixed.map(LaunchDelay::Fixed).unwrap_or_default()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            LaunchDelay::Fixed(d) => d,
            LaunchDelay::Jitter { min, max } if max <= min => min,
            LaunchDelay::Jitter { min, max } => {
                Duration::from_secs_f64(rng.gen_range(min.as_secs_f64()..=max.as_secs_f64()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Worker seam
// ---------------------------------------------------------------------------

/// One attempt of per-account work. Called again by the retry policy on
/// failure, so every call must start from scratch.
#[async_trait]
pub trait AccountWorker: Send + Sync + 'static {
    async fn work(&self, account: &Account, proxy: Option<&str>) -> Result<ActionOutcome>;
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<W> {
    worker: Arc<W>,
    accounts: Vec<Account>,
    rotator: ProxyRotator,
    gate: Arc<Semaphore>,
    retry: RetryPolicy,
    launch_delay: LaunchDelay,
    round_delay: Duration,
    run_log: Option<PathBuf>,
    rounds: u64,
}

impl<W: AccountWorker> Orchestrator<W> {
    pub fn new(worker: W, accounts: Vec<Account>, proxies: Vec<String>) -> Self {
        Self {
            worker: Arc::new(worker),
            accounts,
            rotator: ProxyRotator::new(proxies),
            gate: Arc::new(Semaphore::new(MAX_CONCURRENT_TASKS)),
            retry: RetryPolicy::default(),
            launch_delay: LaunchDelay::default(),
            round_delay: ROUND_DELAY,
            run_log: None,
            rounds: 0,
        }
    }

    pub fn with_launch_delay(mut self, delay: LaunchDelay) -> Self {
        self.launch_delay = delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_round_delay(mut self, delay: Duration) -> Self {
        self.round_delay = delay;
        self
    }

    /// Append one JSON line per finished round to `path`.
    pub fn with_run_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.run_log = Some(path.into());
        self
    }

    pub fn proxy_cursor(&self) -> usize {
        self.rotator.cursor()
    }

    pub fn rounds_completed(&self) -> u64 {
        self.rounds
    }

    /// Run rounds until the future is dropped.
    ///
    /// Dropping it mid-round aborts every in-flight task, which closes
    /// their connections.
    pub async fn run_forever(&mut self) {
        loop {
            let report = self.run_round().await;
            log_round_report(&report);

            if let Some(path) = &self.run_log {
                if let Err(e) = storage::append_round(path, &report) {
                    error!(error = %e, path = %path.display(), "Failed to append run log");
                }
            }

            info!(delay_secs = self.round_delay.as_secs(), "Waiting before next round");
            tokio::time::sleep(self.round_delay).await;
        }
    }

    /// Run one task per account and wait for all of them.
    pub async fn run_round(&mut self) -> RoundReport {
        let round = self.rounds + 1;
        let started_at = Utc::now();
        let total = self.accounts.len();

        if total == 0 {
            warn!(round, "No accounts to run");
        }
        info!(
            round,
            accounts = total,
            proxies = self.rotator.pool_size(),
            "Starting round"
        );

        let mut rng = StdRng::from_entropy();
        let mut tasks = JoinSet::new();

        for (index, account) in self.accounts.iter().enumerate() {
            if index > 0 {
                let delay = self.launch_delay.sample(&mut rng);
                debug!(delay_ms = delay.as_millis() as u64, "Delaying next launch");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let proxy = self.rotator.next();
            let span = info_span!("account", id = %account.short_id(), round);
            let task = run_account(
                Arc::clone(&self.worker),
                Arc::clone(&self.gate),
                self.retry,
                account.clone(),
                proxy,
            );
            tasks.spawn(async move { (index, task.await) }.instrument(span));
        }

        let mut slots: Vec<Option<TaskOutcome>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!(round, error = %e, "Account task did not finish"),
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(&self.accounts)
            .map(|(slot, account)| {
                slot.unwrap_or_else(|| TaskOutcome {
                    account: account.short_id(),
                    attempts: 0,
                    succeeded: false,
                    detail: "task panicked".to_string(),
                })
            })
            .collect();

        self.rounds = round;
        RoundReport {
            round,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        }
    }
}

/// One account's task: wait for admission, then retry the worker.
///
/// The permit is held across retries and released on every exit path when
/// it drops.
async fn run_account<W: AccountWorker>(
    worker: Arc<W>,
    gate: Arc<Semaphore>,
    retry: RetryPolicy,
    account: Account,
    proxy: Option<String>,
) -> TaskOutcome {
    let label = account.short_id();
    let _permit = match gate.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return TaskOutcome {
                account: label,
                attempts: 0,
                succeeded: false,
                detail: "admission gate closed".to_string(),
            }
        }
    };
    debug!(proxied = proxy.is_some(), "Task admitted");

    let worker = &*worker;
    let account_ref = &account;
    let proxy_ref = proxy.as_deref();
    let attempted = retry
        .run(&label, move |_| worker.work(account_ref, proxy_ref))
        .await;

    match attempted.result {
        Ok(outcome) => {
            info!(attempts = attempted.attempts, outcome = %outcome, "Task succeeded");
            TaskOutcome {
                account: label,
                attempts: attempted.attempts,
                succeeded: true,
                detail: outcome.to_string(),
            }
        }
        Err(e) => {
            error!(attempts = attempted.attempts, error = %e, "Task failed for this round");
            TaskOutcome {
                account: label,
                attempts: attempted.attempts,
                succeeded: false,
                detail: format!("{e:#}"),
            }
        }
    }
}

/// Log a round summary in one structured line.
fn log_round_report(report: &RoundReport) {
    info!(
        round = report.round,
        accounts = report.outcomes.len(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        took_secs = report.duration_secs(),
        "Round complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
