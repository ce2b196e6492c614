//! The dashboard state container.
//!
//! [`CityDataStore`] is a cheap, clonable handle over one shared state. Views
//! read snapshots from it and invoke its actions; the simulation timer and the
//! continuations it schedules mutate the same state through a weak reference.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use chrono::{Local, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assistant::{Assistant, ReplyContext};
use crate::config::StoreConfig;
use crate::error::ValidationError;
use crate::ingest;
use crate::models::{
    ChatMessage, ChatRole, HeatPoint, Pagination, ProblemReport, Statistics, Warning,
    WarningStatus, TIMESTAMP_FORMAT,
};
use crate::notify::{self, NotificationSink, TracingSink};
use crate::report::{self, ReportRequest};
use crate::simulation::{self, SimulationHandle};
use crate::stats;

#[derive(Debug, Clone)]
struct DashboardState {
    reports: Vec<ProblemReport>,
    live_reports: Vec<ProblemReport>,
    pagination: Pagination,
    chat: Vec<ChatMessage>,
    warnings: Vec<Warning>,
    loading: bool,
    upload_error: String,
    new_ids: HashSet<String>,
}

impl DashboardState {
    fn new(page_size: usize) -> Self {
        Self {
            reports: Vec::new(),
            live_reports: Vec::new(),
            pagination: Pagination {
                page: 1,
                page_size,
                total: 0,
            },
            chat: Vec::new(),
            warnings: Vec::new(),
            loading: false,
            upload_error: String::new(),
            new_ids: HashSet::new(),
        }
    }

    fn reply_context(&self) -> ReplyContext {
        let today = Local::now().date_naive();
        ReplyContext {
            statistics: stats::compute_statistics(&self.reports, today),
            today,
        }
    }
}

struct StoreInner {
    config: StoreConfig,
    state: RwLock<DashboardState>,
    rng: Mutex<StdRng>,
    assistant: Assistant,
    notifier: Arc<dyn NotificationSink>,
    timer: Mutex<Option<SimulationHandle>>,
}

#[derive(Clone)]
pub struct CityDataStore {
    inner: Arc<StoreInner>,
}

fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

fn timestamp(now: NaiveDateTime) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Builds the pending alert for one high-priority report.
pub fn warning_for(report: &ProblemReport, now: NaiveDateTime) -> Warning {
    Warning {
        id: Uuid::new_v4().to_string(),
        problem_id: report.id.clone(),
        area: report.area_label().to_string(),
        kind: report.sub_type_label().to_string(),
        priority: report.priority,
        message: format!(
            "【高优先级】{}发生{}问题",
            report.area_label(),
            report.sub_type_label()
        ),
        status: WarningStatus::Pending,
        created_at: timestamp(now),
        ai_suggestion: None,
    }
}

/// One warning per report that is both high priority and pending.
pub fn warnings_for(reports: &[ProblemReport], now: NaiveDateTime) -> Vec<Warning> {
    reports
        .iter()
        .filter(|report| report.is_pending_high_priority())
        .map(|report| warning_for(report, now))
        .collect()
}

fn suggestion_prompt(warning: &Warning) -> String {
    format!(
        "针对{}的{}问题（{}优先级），请给出具体的处置建议，控制在200字以内",
        warning.area,
        warning.kind,
        warning.priority.as_str()
    )
}

fn chat_message(role: ChatRole, content: String) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4().to_string(),
        role,
        content,
        timestamp: Utc::now().timestamp_millis(),
    }
}

impl CityDataStore {
    pub fn new(config: StoreConfig) -> Self {
        let assistant = Assistant::canned(config.assistant_latency);
        Self::with_parts(config, assistant, Arc::new(TracingSink))
    }

    pub fn with_parts(
        config: StoreConfig,
        assistant: Assistant,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(DashboardState::new(config.page_size)),
                rng: Mutex::new(rng),
                assistant,
                notifier,
                timer: Mutex::new(None),
                config,
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // ---- ingestion ----

    /// Validates `raw` and, on success, replaces every report, regenerates
    /// warnings and (re)starts the simulation. On failure nothing but the
    /// stored error string changes.
    pub async fn import_reports(&self, raw: &str) -> Result<usize, ValidationError> {
        {
            let mut state = self.inner.state.write().await;
            state.loading = true;
            state.upload_error.clear();
        }

        let reports = match ingest::parse_reports(raw) {
            Ok(reports) => reports,
            Err(err) => {
                warn!(error = %err, "report import rejected");
                let mut state = self.inner.state.write().await;
                state.upload_error = err.to_string();
                state.loading = false;
                return Err(err);
            }
        };

        let imported = reports.len();
        let warning_count = {
            let mut state = self.inner.state.write().await;
            state.warnings = warnings_for(&reports, now_local());
            state.live_reports = reports.clone();
            state.reports = reports;
            state.pagination.total = imported;
            state.loading = false;
            state.warnings.len()
        };
        info!(imported, warnings = warning_count, "reports imported");

        self.start_simulation().await;
        Ok(imported)
    }

    // ---- warnings ----

    /// Replaces the warning list from the current report collection.
    pub async fn generate_warnings(&self) -> usize {
        let mut state = self.inner.state.write().await;
        state.warnings = warnings_for(&state.reports, now_local());
        state.warnings.len()
    }

    /// Returns `false` when no warning has this id.
    pub async fn update_warning_status(&self, warning_id: &str, status: WarningStatus) -> bool {
        let mut state = self.inner.state.write().await;
        match state.warnings.iter_mut().find(|w| w.id == warning_id) {
            Some(warning) => {
                warning.status = status;
                true
            }
            None => false,
        }
    }

    /// Asks the assistant for handling advice and attaches it to the warning.
    pub async fn request_suggestion(&self, warning_id: &str) -> Option<String> {
        let (prompt, context) = {
            let state = self.inner.state.read().await;
            let warning = state.warnings.iter().find(|w| w.id == warning_id)?;
            (suggestion_prompt(warning), state.reply_context())
        };

        let suggestion = self
            .inner
            .assistant
            .suggest(&[], Some(&prompt), &context)
            .await;

        let mut state = self.inner.state.write().await;
        if let Some(warning) = state.warnings.iter_mut().find(|w| w.id == warning_id) {
            warning.ai_suggestion = Some(suggestion.clone());
            debug!(warning_id, "suggestion attached");
        }
        Some(suggestion)
    }

    // ---- simulation ----

    /// Starts the repeating tick, cancelling any timer already running.
    pub async fn start_simulation(&self) {
        let mut timer = self.inner.timer.lock().await;
        if let Some(previous) = timer.take() {
            previous.cancel();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available, simulation not started");
            return;
        };

        let period = self.inner.config.tick_interval;
        let token = CancellationToken::new();
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let cancelled = token.clone();

        let task = runtime.spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticks.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        CityDataStore { inner }.simulate_tick().await;
                    }
                }
            }
            debug!("simulation timer finished");
        });

        *timer = Some(SimulationHandle::new(token, task));
        info!(interval_secs = period.as_secs_f64(), "simulation started");
    }

    /// Cancels the timer. Calling it with no timer running is a no-op.
    pub async fn stop_simulation(&self) {
        if let Some(handle) = self.inner.timer.lock().await.take() {
            handle.cancel();
            info!("simulation stopped");
        }
    }

    pub async fn shutdown(&self) {
        self.stop_simulation().await;
    }

    pub async fn is_simulating(&self) -> bool {
        self.inner
            .timer
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Performs one simulated arrival and returns the new report.
    pub async fn simulate_tick(&self) -> ProblemReport {
        let now = now_local();
        let report = {
            let mut rng = self.inner.rng.lock().await;
            simulation::synthesize_report(&mut *rng, now)
        };

        let warning = {
            let mut state = self.inner.state.write().await;
            state.live_reports.insert(0, report.clone());
            state.reports.push(report.clone());
            state.pagination.total = state.reports.len();
            state.new_ids.insert(report.id.clone());

            if report.is_pending_high_priority() {
                let warning = warning_for(&report, now);
                state.warnings.insert(0, warning.clone());
                Some(warning)
            } else {
                None
            }
        };
        debug!(id = %report.id, area = report.area_label(), "simulated report arrived");

        self.schedule_new_marker_expiry(report.id.clone());

        if let Some(warning) = warning {
            info!(warning_id = %warning.id, text = %warning.message, "high priority warning raised");
            let store = self.clone();
            let warning_id = warning.id.clone();
            tokio::spawn(async move {
                store.request_suggestion(&warning_id).await;
            });
            self.inner
                .notifier
                .notify(notify::warning_notification(&warning));
        }

        report
    }

    fn schedule_new_marker_expiry(&self, id: String) {
        let weak = Arc::downgrade(&self.inner);
        let ttl = self.inner.config.new_marker_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = weak.upgrade() {
                inner.state.write().await.new_ids.remove(&id);
            }
        });
    }

    // ---- chat ----

    /// Canned assistant reply over `history` plus an optional prompt.
    pub async fn get_suggestion(&self, history: &[ChatMessage], prompt: Option<&str>) -> String {
        let context = self.inner.state.read().await.reply_context();
        self.inner.assistant.suggest(history, prompt, &context).await
    }

    /// Returns `None` without touching the history when `content` is blank.
    pub async fn send_message(&self, content: &str) -> Option<String> {
        if content.trim().is_empty() {
            return None;
        }

        let (history, context) = {
            let mut state = self.inner.state.write().await;
            state
                .chat
                .push(chat_message(ChatRole::User, content.to_string()));
            state.loading = true;
            (state.chat.clone(), state.reply_context())
        };

        let reply = self
            .inner
            .assistant
            .suggest(&history, None, &context)
            .await;

        let mut state = self.inner.state.write().await;
        state
            .chat
            .push(chat_message(ChatRole::Assistant, reply.clone()));
        state.loading = false;
        Some(reply)
    }

    pub async fn clear_chat(&self) {
        self.inner.state.write().await.chat.clear();
    }

    // ---- reporting ----

    pub async fn build_report(&self, request: &ReportRequest) -> String {
        let state = self.inner.state.read().await;
        let mut rng = self.inner.rng.lock().await;
        report::build_report(&state.reports, request, &mut *rng)
    }

    // ---- pagination ----

    pub async fn set_pagination(&self, page: usize, page_size: usize) {
        let mut state = self.inner.state.write().await;
        state.pagination.page = page;
        state.pagination.page_size = page_size;
    }

    pub async fn pagination(&self) -> Pagination {
        self.inner.state.read().await.pagination
    }

    /// Current page of the full collection. Pages are 1-based; page 0 reads as page 1.
    pub async fn paginated(&self) -> Vec<ProblemReport> {
        let state = self.inner.state.read().await;
        let Pagination {
            page, page_size, ..
        } = state.pagination;
        state
            .reports
            .iter()
            .skip(page.saturating_sub(1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect()
    }

    // ---- derived views ----

    pub async fn statistics(&self) -> Statistics {
        let state = self.inner.state.read().await;
        stats::compute_statistics(&state.reports, Local::now().date_naive())
    }

    pub async fn heatmap(&self) -> Vec<HeatPoint> {
        stats::heatmap(&self.inner.state.read().await.reports)
    }

    pub async fn live_list(&self) -> Vec<ProblemReport> {
        let state = self.inner.state.read().await;
        stats::most_recent(&state.live_reports, self.inner.config.live_list_limit)
    }

    pub async fn reports(&self) -> Vec<ProblemReport> {
        self.inner.state.read().await.reports.clone()
    }

    pub async fn live_reports(&self) -> Vec<ProblemReport> {
        self.inner.state.read().await.live_reports.clone()
    }

    pub async fn warnings(&self) -> Vec<Warning> {
        self.inner.state.read().await.warnings.clone()
    }

    pub async fn chat_history(&self) -> Vec<ChatMessage> {
        self.inner.state.read().await.chat.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.state.read().await.loading
    }

    /// Message of the last failed import; empty after a successful one.
    pub async fn upload_error(&self) -> String {
        self.inner.state.read().await.upload_error.clone()
    }

    pub async fn is_new(&self, id: &str) -> bool {
        self.inner.state.read().await.new_ids.contains(id)
    }

    pub async fn new_problem_ids(&self) -> Vec<String> {
        self.inner.state.read().await.new_ids.iter().cloned().collect()
    }
}
