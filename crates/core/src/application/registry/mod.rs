// Job Registry - owns every job record and its cancellation handle
//
// One crawl task per job, bounded by a semaphore. The map is the only state
// shared between tasks; every read hands out a cloned snapshot.

use crate::application::cancellation::{cancel_channel, CancelHandle, CancellationToken};
use crate::application::crawl::{CrawlLoop, CrawlOutcome, CrawlStatus};
use crate::application::extractor::LinkExtractor;
use crate::config::CrawlConfig;
use crate::domain::{Job, JobId, JobState};
use crate::error::{AppError, Result};
use crate::port::{BrowserLauncher, Clock, CompletionListener, IdProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

struct Entry {
    /// Submission order, used for listings
    seq: u64,
    job: Job,
    /// Dropped once the job is terminal
    cancel: Option<CancelHandle>,
}

struct Inner {
    jobs: RwLock<HashMap<JobId, Entry>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_seq: AtomicU64,
    permits: Arc<Semaphore>,
    crawler: CrawlLoop,
    id_provider: Arc<dyn IdProvider>,
    clock: Arc<dyn Clock>,
    listener: Arc<dyn CompletionListener>,
    default_target: usize,
}

/// Job Registry (cheap to clone, all clones share state)
#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<Inner>,
}

impl JobRegistry {
    /// Create a registry
    ///
    /// # Arguments
    /// * `config` - Crawl and scheduling settings (validated here)
    /// * `launcher` - Opens one browser session per running job
    /// * `id_provider` - Job id generator (injected for determinism)
    /// * `clock` - Timestamps and every crawl wait (injected for determinism)
    /// * `listener` - Notified when a job reaches COMPLETED
    pub fn new(
        config: CrawlConfig,
        launcher: Arc<dyn BrowserLauncher>,
        id_provider: Arc<dyn IdProvider>,
        clock: Arc<dyn Clock>,
        listener: Arc<dyn CompletionListener>,
    ) -> Result<Self> {
        config.validate()?;
        let extractor = Arc::new(LinkExtractor::from_config(&config)?);
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let default_target = config.target_count;
        let crawler = CrawlLoop::new(launcher, clock.clone(), extractor, Arc::new(config));

        Ok(Self {
            inner: Arc::new(Inner {
                jobs: RwLock::new(HashMap::new()),
                tasks: Mutex::new(Vec::new()),
                next_seq: AtomicU64::new(0),
                permits,
                crawler,
                id_provider,
                clock,
                listener,
                default_target,
            }),
        })
    }

    /// Queue a crawl with the configured default target
    pub async fn submit(&self, query: &str) -> Result<JobId> {
        self.submit_with_target(query, self.inner.default_target)
            .await
    }

    /// Queue a crawl and return its id immediately; the crawl runs in the background
    pub async fn submit_with_target(&self, query: &str, target: usize) -> Result<JobId> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("query must not be empty".into()));
        }
        if target == 0 {
            return Err(AppError::Validation("target must be at least 1".into()));
        }

        let id = self.inner.id_provider.generate_id();
        let job = Job::new(id.clone(), self.inner.clock.now_millis(), query, target);
        let (handle, token) = cancel_channel();

        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.jobs.write().await.insert(
            id.clone(),
            Entry {
                seq,
                job,
                cancel: Some(handle),
            },
        );
        info!(job_id = %id, query = %query, target_count = target, "Queued scrape job");

        let span = tracing::info_span!("crawl", job_id = %id, query = %query);
        let inner = Arc::clone(&self.inner);
        let job_id = id.clone();
        let query = query.to_string();
        let task = tokio::spawn(
            async move { inner.execute(job_id, query, target, token).await }.instrument(span),
        );
        let mut tasks = self.inner.tasks.lock().await;
        // Finished jobs live on in the map; their handles are not needed
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);

        Ok(id)
    }

    /// Submit one job per non-blank line of `text`
    pub async fn submit_batch(&self, text: &str) -> Result<Vec<JobId>> {
        let queries: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if queries.is_empty() {
            return Err(AppError::Validation(
                "input contains no valid search terms".into(),
            ));
        }

        let mut ids = Vec::with_capacity(queries.len());
        for query in queries {
            ids.push(self.submit(query).await?);
        }
        info!(count = ids.len(), "Queued batch of scrape jobs");
        Ok(ids)
    }

    /// Request cancellation. Best-effort and idempotent: unknown or terminal
    /// jobs are ignored. Returns whether a signal was sent.
    pub async fn cancel(&self, id: &str) -> bool {
        let jobs = self.inner.jobs.read().await;
        match jobs.get(id) {
            Some(entry) if !entry.job.state.is_terminal() => match &entry.cancel {
                Some(handle) => {
                    handle.cancel();
                    info!(job_id = %id, state = %entry.job.state, "Stop signal sent");
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Signal every job that is not terminal yet; returns how many were signalled
    pub async fn cancel_all(&self) -> usize {
        let jobs = self.inner.jobs.read().await;
        let mut signalled = 0;
        for (id, entry) in jobs.iter() {
            if entry.job.state.is_terminal() {
                continue;
            }
            if let Some(handle) = &entry.cancel {
                handle.cancel();
                signalled += 1;
                info!(job_id = %id, "Stop signal sent");
            }
        }
        signalled
    }

    /// Read-only snapshot of one job
    pub async fn status(&self, id: &str) -> Result<Job> {
        self.inner
            .jobs
            .read()
            .await
            .get(id)
            .map(|entry| entry.job.clone())
            .ok_or_else(|| AppError::NotFound(format!("job {}", id)))
    }

    /// Ids of COMPLETED jobs in submission order
    pub async fn list_completed(&self) -> Vec<JobId> {
        self.list()
            .await
            .into_iter()
            .filter(|job| job.state == JobState::Completed)
            .map(|job| job.id)
            .collect()
    }

    /// Snapshots of all jobs in submission order
    pub async fn list(&self) -> Vec<Job> {
        let jobs = self.inner.jobs.read().await;
        let mut entries: Vec<&Entry> = jobs.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.job.clone()).collect()
    }

    /// Task handles still held: running jobs plus any that finished since
    /// the last submit
    pub async fn tracked_tasks(&self) -> usize {
        self.inner.tasks.lock().await.len()
    }

    /// Wait until every job submitted so far has reached a terminal state
    pub async fn wait_all(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = self.inner.tasks.lock().await.drain(..).collect();
            if pending.is_empty() {
                return;
            }
            for task in pending {
                if let Err(e) = task.await {
                    error!(error = ?e, "Job task aborted");
                }
            }
        }
    }
}

impl Inner {
    async fn execute(
        self: Arc<Self>,
        id: JobId,
        query: String,
        target: usize,
        token: CancellationToken,
    ) {
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Scheduler closed before job could start");
                return;
            }
        };

        let now = self.clock.now_millis();
        if let Err(e) = self.update(&id, |job| job.start(now)).await {
            warn!(error = %e, "Job could not be started");
            return;
        }
        info!("Starting scrape job");

        // Isolate panics in the crawl from the registry
        let crawler = self.crawler.clone();
        let crawl = tokio::spawn(
            async move { crawler.run(&query, target, &token).await }.in_current_span(),
        );

        match crawl.await {
            Ok(outcome) => self.record(&id, outcome).await,
            Err(join_err) => {
                error!(error = ?join_err, "Crawl task panicked");
                let now = self.clock.now_millis();
                let reason = format!("crawl task aborted: {}", join_err);
                if let Err(e) = self.update(&id, |job| job.fail(now, reason, 0)).await {
                    error!(error = %e, "Failed to record aborted job");
                }
            }
        }
    }

    async fn record(&self, id: &str, outcome: CrawlOutcome) {
        let now = self.clock.now_millis();
        let CrawlOutcome {
            status,
            collected,
            cycles,
        } = outcome;

        let result = match status {
            CrawlStatus::Stopped(reason) => self
                .update(id, |job| {
                    let state = job.finish(now, reason, collected, cycles)?;
                    match state {
                        JobState::Completed => info!(
                            reason = %reason,
                            channels = job.result.len(),
                            "Scrape job completed"
                        ),
                        _ if reason.is_success() => warn!(
                            reason = %reason,
                            "Scrape job failed: crawl ended but no channels found (EmptyResult)"
                        ),
                        _ => warn!(reason = %reason, "Scrape job failed"),
                    }
                    Ok(())
                })
                .await,
            CrawlStatus::Cancelled => self
                .update(id, |job| {
                    job.cancel(now, collected, cycles)?;
                    info!(channels = job.result.len(), "Scrape job cancelled");
                    Ok(())
                })
                .await,
            CrawlStatus::Failed(e) => self
                .update(id, |job| {
                    job.fail(now, e.to_string(), cycles)?;
                    warn!(error = %e, "Scrape job failed due to a browser error");
                    Ok(())
                })
                .await,
        };

        match result {
            Ok(job) if job.state == JobState::Completed => {
                if let Err(e) = self.listener.on_completed(&job).await {
                    error!(error = %e, "Completion listener failed");
                }
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Failed to record crawl outcome"),
        }
    }

    /// Apply `f` to the job under the write lock. Terminal jobs lose their
    /// cancel handle. Returns the updated snapshot.
    async fn update<F>(&self, id: &str, f: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> std::result::Result<(), crate::domain::DomainError>,
    {
        let mut jobs = self.jobs.write().await;
        let entry = jobs
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("job {}", id)))?;
        f(&mut entry.job)?;
        if entry.job.state.is_terminal() {
            entry.cancel = None;
        }
        Ok(entry.job.clone())
    }
}
