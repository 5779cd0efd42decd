//! Hosts live quiz sessions, their countdown tasks and result delivery.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use uuid::Uuid;

use kobun_core::{
    PendingResult, Phase, QuestionBank, QuizConfig, QuizSession, ResultPayload, SinkStatus, Tick,
};

use crate::error::{ApiError, Result};
use crate::services::sink::ResultsSink;

const TICK_PERIOD: Duration = Duration::from_secs(1);
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// A hosted session plus its countdown task and last built result.
pub struct SessionEntry {
    pub session: QuizSession,
    pub pending: Option<PendingResult>,
    timer: Option<JoinHandle<()>>,
    deliveries: u64,
    last_active: Instant,
}

impl SessionEntry {
    fn new(session: QuizSession) -> Self {
        Self {
            session,
            pending: None,
            timer: None,
            deliveries: 0,
            last_active: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    fn next_delivery(&mut self) -> u64 {
        self.deliveries += 1;
        self.deliveries
    }

    /// A result was built but has not reached the sink yet.
    fn has_unsent_result(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_sent())
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

/// Inner state shared across clones.
struct QuizServiceInner {
    bank: Arc<QuestionBank>,
    config: QuizConfig,
    subject: String,
    sink: Arc<dyn ResultsSink>,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

/// Session host. Cheap to clone; all state lives behind an `Arc`.
///
/// Every mutation runs under the sessions lock, so timer ticks and learner
/// actions never interleave. Sessions without learner activity for
/// `idle_timeout` are dropped by a background sweep; timer ticks and result
/// deliveries do not count as activity.
#[derive(Clone)]
pub struct QuizService {
    inner: Arc<QuizServiceInner>,
}

impl QuizService {
    /// Must be called within a tokio runtime; the idle sweep is spawned here
    /// and stops once the last clone is dropped.
    pub fn new(
        bank: Arc<QuestionBank>,
        config: QuizConfig,
        subject: String,
        sink: Arc<dyn ResultsSink>,
        idle_timeout: Duration,
    ) -> Self {
        let service = Self {
            inner: Arc::new(QuizServiceInner {
                bank,
                config,
                subject,
                sink,
                idle_timeout,
                sessions: Mutex::new(HashMap::new()),
            }),
        };
        spawn_sweeper(Arc::downgrade(&service.inner));
        service
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.inner.bank
    }

    pub fn config(&self) -> &QuizConfig {
        &self.inner.config
    }

    pub fn subject(&self) -> &str {
        &self.inner.subject
    }

    /// Start a session for `student_name` and arm its countdown.
    pub async fn start(&self, student_name: &str, question_count: Option<usize>) -> Result<Uuid> {
        let student_name = student_name.trim();
        if student_name.is_empty() {
            return Err(ApiError::BadRequest("student name is required".to_string()));
        }
        if self.inner.bank.is_empty() {
            return Err(ApiError::Conflict("question bank is empty".to_string()));
        }

        let mut config = self.inner.config.clone();
        if let Some(count) = question_count {
            if count == 0 {
                return Err(ApiError::BadRequest(
                    "question count must be at least 1".to_string(),
                ));
            }
            config.session_size = count;
        }

        let session = QuizSession::start(
            student_name,
            &self.inner.bank,
            config,
            &mut rand::thread_rng(),
        );
        let id = Uuid::new_v4();

        let mut sessions = self.inner.sessions.lock().await;
        let mut entry = SessionEntry::new(session);
        entry.timer = Some(self.spawn_timer(id, entry.session.timer_epoch()));
        sessions.insert(id, entry);

        tracing::info!(%id, student = %student_name, "Started session");
        Ok(id)
    }

    /// Read a session through `f`.
    pub async fn read<T>(&self, id: Uuid, f: impl FnOnce(&SessionEntry) -> T) -> Result<T> {
        let sessions = self.inner.sessions.lock().await;
        let entry = sessions.get(&id).ok_or_else(|| not_found(id))?;
        Ok(f(entry))
    }

    /// Apply a state machine action. Returns `Conflict` when the action does
    /// not apply to the current phase.
    ///
    /// The countdown is replaced whenever the action moved the session into
    /// or out of Quiz.
    pub async fn apply(
        &self,
        id: Uuid,
        action: &str,
        f: impl FnOnce(&mut QuizSession, &QuestionBank) -> bool,
    ) -> Result<()> {
        let mut sessions = self.inner.sessions.lock().await;
        let entry = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;

        entry.touch();
        let epoch = entry.session.timer_epoch();
        if !f(&mut entry.session, &self.inner.bank) {
            return Err(ApiError::Conflict(format!(
                "cannot {action} in {} phase",
                entry.session.phase().as_str()
            )));
        }

        if entry.session.timer_epoch() != epoch {
            entry.cancel_timer();
            if entry.session.phase() == Phase::Quiz {
                entry.timer = Some(self.spawn_timer(id, entry.session.timer_epoch()));
            }
        }
        Ok(())
    }

    pub async fn set_draft(&self, id: Uuid, draft: String) -> Result<()> {
        self.apply(id, "edit the answer", |session, _| session.set_draft(draft))
            .await
    }

    /// Submit `answer`, or the stored draft when `None`.
    pub async fn answer(&self, id: Uuid, answer: Option<String>) -> Result<()> {
        self.apply(id, "answer", |session, _| match answer {
            Some(answer) => session.submit(&answer).is_some(),
            None => session.submit_draft().is_some(),
        })
        .await
    }

    pub async fn advance(&self, id: Uuid) -> Result<()> {
        self.apply(id, "advance", |session, _| session.advance()).await
    }

    pub async fn show_result(&self, id: Uuid) -> Result<()> {
        self.apply(id, "show the result", |session, _| session.show_result())
            .await
    }

    pub async fn retry_all(&self, id: Uuid) -> Result<()> {
        self.apply(id, "retry", |session, bank| {
            session.retry_all(bank, &mut rand::thread_rng())
        })
        .await
    }

    /// Replay the missed questions. With nothing missed the session is left
    /// untouched and `Conflict` is returned.
    pub async fn retry_missed(&self, id: Uuid) -> Result<()> {
        self.apply(id, "retry missed questions", |session, _| {
            session.retry_missed(&mut rand::thread_rng())
        })
        .await
    }

    /// Build the result payload, move Summary to Result and start delivery in
    /// the background. Returns the immediate local status.
    pub async fn submit_results(&self, id: Uuid, device_info: &str) -> Result<SinkStatus> {
        let mut sessions = self.inner.sessions.lock().await;
        let entry = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        entry.touch();

        let payload = entry
            .session
            .result_payload(&self.inner.subject, device_info, Utc::now())
            .ok_or_else(|| {
                ApiError::Conflict(format!(
                    "cannot submit results in {} phase",
                    entry.session.phase().as_str()
                ))
            })?;
        entry.session.show_result();

        let delivery = entry.next_delivery();
        entry.pending = Some(PendingResult::new(payload.clone(), delivery));
        self.spawn_delivery(id, delivery, payload);
        Ok(SinkStatus::Sending)
    }

    /// Resend the retained payload after a failed delivery.
    pub async fn resend_results(&self, id: Uuid) -> Result<SinkStatus> {
        let mut sessions = self.inner.sessions.lock().await;
        let entry = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        entry.touch();

        let delivery = entry.next_delivery();
        let pending = entry
            .pending
            .as_mut()
            .ok_or_else(|| ApiError::NotFound("no unsent result".to_string()))?;
        if !pending.can_resend() {
            return Err(ApiError::Conflict(format!(
                "result is already {}",
                pending.status
            )));
        }

        pending.resend(delivery);
        let payload = pending.payload.clone();
        self.spawn_delivery(id, delivery, payload);
        Ok(SinkStatus::Sending)
    }

    /// Drop a session and stop its countdown. Refused while its result has
    /// not been delivered, so it can still be resent.
    pub async fn end(&self, id: Uuid) -> Result<()> {
        let mut sessions = self.inner.sessions.lock().await;
        let entry = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        if entry.has_unsent_result() {
            entry.touch();
            return Err(ApiError::Conflict(
                "result has not been delivered yet".to_string(),
            ));
        }

        let mut entry = sessions.remove(&id).ok_or_else(|| not_found(id))?;
        entry.cancel_timer();
        tracing::info!(%id, "Ended session");
        Ok(())
    }

    /// Tick the session once per second until its epoch goes stale or the
    /// countdown expires.
    fn spawn_timer(&self, id: Uuid, epoch: u64) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            loop {
                ticker.tick().await;
                let mut sessions = service.inner.sessions.lock().await;
                let Some(entry) = sessions.get_mut(&id) else {
                    break;
                };
                match entry.session.tick(epoch) {
                    Tick::Running(_) => {}
                    Tick::Stale => break,
                    Tick::Expired => {
                        tracing::info!(%id, phase = entry.session.phase().as_str(), "Session timed out");
                        entry.timer = None;
                        break;
                    }
                }
            }
        })
    }

    fn spawn_delivery(&self, id: Uuid, delivery: u64, payload: ResultPayload) {
        let service = self.clone();
        tokio::spawn(async move {
            let status = match service.inner.sink.deliver(&payload).await {
                Ok(()) => SinkStatus::Sent,
                Err(e) => {
                    tracing::warn!(%id, error = %e, "Result delivery failed");
                    SinkStatus::Failed(e.to_string())
                }
            };

            let mut sessions = service.inner.sessions.lock().await;
            let pending = sessions
                .get_mut(&id)
                .and_then(|entry| entry.pending.as_mut());
            if let Some(pending) = pending {
                if !pending.finish(delivery, status) {
                    tracing::debug!(%id, delivery, "Ignoring outcome of superseded delivery");
                }
            }
        });
    }
}

/// Periodically drop sessions idle for longer than the configured timeout.
fn spawn_sweeper(inner: Weak<QuizServiceInner>) {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + SWEEP_PERIOD, SWEEP_PERIOD);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let idle_timeout = inner.idle_timeout;
            let mut sessions = inner.sessions.lock().await;
            let before = sessions.len();
            sessions.retain(|id, entry| {
                let keep = entry.last_active.elapsed() < idle_timeout;
                if !keep {
                    entry.cancel_timer();
                    tracing::info!(%id, "Dropped idle session");
                }
                keep
            });
            let dropped = before - sessions.len();
            if dropped > 0 {
                tracing::debug!(dropped, remaining = sessions.len(), "Swept idle sessions");
            }
        }
    });
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Session {id}"))
}
