//! tasks.rs — Feed de tarefas do diretor (barra lateral)
//!
//! Mesmo padrão do controlador de métricas, com cadência própria. Tarefas com id
//! inédito geram alerta "Nova tarefa", exceto na primeira busca.

use crate::alert::{AlertEvent, detect_new_tasks};
use crate::client::TaskSource;
use crate::controller::status_without_update;
use crate::error::{ApiError, ErrorKind};
use crate::scheduler::{PollOutcome, Poller};
use crate::types::{ConnectionStatus, Notice, NoticeLevel, Task, TaskStatus};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Estado da barra lateral.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TaskFeedView {
    pub status: ConnectionStatus,
    pub tasks: Vec<Task>,
    pub notice: Option<Notice>,
}

impl TaskFeedView {
    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.status == TaskStatus::Pending)
    }
}

pub struct TaskFeedController {
    source: Arc<dyn TaskSource>,
    alerts: mpsc::UnboundedSender<AlertEvent>,
    view: watch::Sender<TaskFeedView>,
    known_ids: Mutex<Option<Vec<String>>>,
    /// Um ciclo por vez; `resolve` espera o ciclo em andamento terminar.
    cycle_lock: Mutex<()>,
    cycle: AtomicU64,
    cancel: CancellationToken,
}

impl TaskFeedController {
    pub fn new(
        source: Arc<dyn TaskSource>,
        alerts: mpsc::UnboundedSender<AlertEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let (view, _) = watch::channel(TaskFeedView::default());
        Self {
            source,
            alerts,
            view,
            known_ids: Mutex::new(None),
            cycle_lock: Mutex::new(()),
            cycle: AtomicU64::new(0),
            cancel,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskFeedView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> TaskFeedView {
        self.view.borrow().clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub async fn poll(&self) -> PollOutcome {
        if self.cancel.is_cancelled() {
            return PollOutcome::Discarded;
        }
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!("[TAREFAS] Busca anterior ainda em andamento; ciclo ignorado.");
            return PollOutcome::Skipped;
        };
        self.run_cycle().await
    }

    /// Um ciclo completo; quem chama precisa segurar `cycle_lock`.
    async fn run_cycle(&self) -> PollOutcome {
        let cycle = self.cycle.fetch_add(1, Ordering::Relaxed) + 1;
        let known = self.known_ids.lock().await.clone();
        let status_before = self.view.borrow().status;
        self.view.send_modify(|v| v.status = ConnectionStatus::Waiting);

        let result = self.source.fetch_tasks().await;
        if self.cancel.is_cancelled() {
            self.view.send_modify(|v| {
                v.status = status_without_update(status_before, known.is_some())
            });
            return PollOutcome::Discarded;
        }

        match result {
            Ok(tasks) => {
                let events = detect_new_tasks(known.as_deref(), &tasks);
                for event in &events {
                    info!("[TAREFAS][CICLO {}] {}", cycle, event);
                    if self.alerts.send(event.clone()).is_err() {
                        warn!("[TAREFAS] Notificador indisponível; alerta não entregue.");
                    }
                }

                *self.known_ids.lock().await = Some(tasks.iter().map(|t| t.id.clone()).collect());
                info!(
                    "[TAREFAS][CICLO {}] {} tarefas recebidas.",
                    cycle,
                    tasks.len()
                );
                self.view.send_modify(|v| {
                    v.status = ConnectionStatus::Connected;
                    v.tasks = tasks;
                    v.notice = None;
                });
                PollOutcome::Updated {
                    alerts: events.len(),
                }
            }
            Err(err) => {
                let kind = err.kind();
                error!("[TAREFAS][CICLO {}] Erro ao buscar tarefas: {}", cycle, err);
                let (status, level) = match kind {
                    ErrorKind::RateLimited => (
                        status_without_update(status_before, known.is_some()),
                        NoticeLevel::Info,
                    ),
                    _ => (ConnectionStatus::Disconnected, NoticeLevel::Error),
                };
                let message = err.user_message();
                self.view.send_modify(|v| {
                    v.status = status;
                    v.notice = Some(Notice { level, message });
                });
                PollOutcome::Failed(kind)
            }
        }
    }

    /// Marca a tarefa como resolvida e recarrega a lista. Se um ciclo agendado estiver
    /// em andamento, espera por ele e busca de novo, já que ele pode ter lido a lista
    /// antes da resolução.
    pub async fn resolve(&self, id: &str) -> Result<PollOutcome, ApiError> {
        if let Err(e) = self.source.resolve_task(id).await {
            error!("[TAREFAS] Erro ao resolver tarefa {}: {}", id, e);
            return Err(e);
        }
        info!("[TAREFAS] Tarefa {} resolvida.", id);

        let _guard = self.cycle_lock.lock().await;
        if self.cancel.is_cancelled() {
            return Ok(PollOutcome::Discarded);
        }
        Ok(self.run_cycle().await)
    }
}

#[async_trait]
impl Poller for TaskFeedController {
    fn name(&self) -> &'static str {
        "TAREFAS"
    }

    async fn poll(&self) -> PollOutcome {
        TaskFeedController::poll(self).await
    }
}
