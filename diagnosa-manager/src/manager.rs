use chrono::Utc;
use diagnosa_agent::TranscriptManager;
use diagnosa_core::Session;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::{ApiRequest, ChatOutcome, ManagerCommand, TranscriptView};

/// Owns the session registry and serves commands from the HTTP handlers.
///
/// Each session sits behind its own async mutex, so exchanges within one
/// session run one at a time while separate sessions proceed concurrently.
/// With an idle limit set, sessions untouched for longer than the limit are
/// ended by a periodic sweep.
pub struct Manager {
    api_rx: mpsc::Receiver<ManagerCommand>,
    transcripts: Arc<TranscriptManager>,
    sessions: HashMap<String, Arc<Mutex<Session>>>,
    idle_limit: Option<Duration>,
}

impl Manager {
    pub fn new(api_rx: mpsc::Receiver<ManagerCommand>, transcripts: Arc<TranscriptManager>) -> Self {
        Self {
            api_rx,
            transcripts,
            sessions: HashMap::new(),
            idle_limit: None,
        }
    }

    /// End sessions idle for longer than `limit`; `None` disables the sweep
    pub fn with_idle_limit(mut self, limit: Option<Duration>) -> Self {
        self.idle_limit = limit;
        self
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Manager loop started");

        let period = self.idle_limit.map_or(MAX_SWEEP_PERIOD, sweep_period);
        let mut sweep = interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.api_rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = sweep.tick(), if self.idle_limit.is_some() => self.evict_idle(),
            }
        }

        info!(
            "Manager channel closed, stopping loop ({} sessions dropped)",
            self.sessions.len()
        );
        Ok(())
    }

    /// Drop sessions past the idle limit. Sessions mid-exchange hold their
    /// lock and are skipped.
    fn evict_idle(&mut self) {
        let Some(limit) = self.idle_limit else {
            return;
        };
        let now = Utc::now();

        self.sessions.retain(|id, handle| {
            let Ok(session) = handle.try_lock() else {
                return true;
            };
            let idle = session.idle_for(now);
            if idle < limit {
                return true;
            }
            info!("Evicting session {} after {}s idle", id, idle.as_secs());
            false
        });
    }

    fn handle(&mut self, cmd: ManagerCommand) {
        match cmd {
            ManagerCommand::CreateSession(reply_tx) => {
                let mut session = Session::generate();
                self.transcripts.initialize(&mut session);
                let view = TranscriptView::of(&session);
                self.sessions
                    .insert(session.id.clone(), Arc::new(Mutex::new(session)));
                let _ = reply_tx.send(view);
            }
            ManagerCommand::Chat(req) => self.spawn_chat(req),
            ManagerCommand::GetTranscript(session_id, reply_tx) => {
                let Some(handle) = self.sessions.get(&session_id).cloned() else {
                    let _ = reply_tx.send(None);
                    return;
                };
                tokio::spawn(async move {
                    let mut session = handle.lock().await;
                    session.touch();
                    let _ = reply_tx.send(Some(TranscriptView::of(&session)));
                });
            }
            ManagerCommand::EndSession(session_id, reply_tx) => {
                let removed = self.sessions.remove(&session_id).is_some();
                if removed {
                    info!("Ended session {}", session_id);
                }
                let _ = reply_tx.send(removed);
            }
        }
    }

    fn spawn_chat(&mut self, req: ApiRequest) {
        let handle = self
            .sessions
            .entry(req.session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(req.session_id.clone()))))
            .clone();
        let transcripts = self.transcripts.clone();

        tokio::spawn(async move {
            let mut session = handle.lock().await;
            transcripts.initialize(&mut session);
            let result = transcripts.exchange(&mut session, req.message).await;
            session.touch();
            let transcript_len = session.transcript().map_or(0, |t| t.len());

            if req
                .reply_tx
                .send(ChatOutcome::from_result(result, transcript_len))
                .is_err()
            {
                debug!("Chat caller for session {} went away", session.id);
            }
        });
    }
}

const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(10);
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

fn sweep_period(limit: Duration) -> Duration {
    (limit / 2).clamp(MIN_SWEEP_PERIOD, MAX_SWEEP_PERIOD)
}
