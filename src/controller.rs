//! controller.rs — Controlador de métricas: busca, normaliza, compara e publica
//!
//! Estados: Disconnected (inicial) -> Waiting -> Connected | Disconnected.
//! O snapshot de alerta só é trocado depois de um ciclo bem-sucedido.

use crate::alert::{AlertEvent, AlertSnapshot, detect_changes};
use crate::client::TicketSource;
use crate::error::ErrorKind;
use crate::normalizer::normalize;
use crate::scheduler::{PollOutcome, Poller};
use crate::types::{ConnectionStatus, DashboardView, Notice, NoticeLevel};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Marca um ciclo em andamento; libera ao sair de escopo.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Estado a publicar quando o ciclo não trouxe dados novos mas também não é falha
/// de conexão: volta ao estado anterior, desde que já exista um dado válido.
pub(crate) fn status_without_update(
    before: ConnectionStatus,
    has_valid_data: bool,
) -> ConnectionStatus {
    match before {
        ConnectionStatus::Connected if has_valid_data => ConnectionStatus::Connected,
        _ => ConnectionStatus::Disconnected,
    }
}

pub struct MetricsController {
    source: Arc<dyn TicketSource>,
    alerts: mpsc::UnboundedSender<AlertEvent>,
    view: watch::Sender<DashboardView>,
    snapshot: Mutex<Option<AlertSnapshot>>,
    in_flight: AtomicBool,
    cycle: AtomicU64,
    interval: Duration,
    cancel: CancellationToken,
}

impl MetricsController {
    pub fn new(
        source: Arc<dyn TicketSource>,
        alerts: mpsc::UnboundedSender<AlertEvent>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (view, _) = watch::channel(DashboardView::default());
        Self {
            source,
            alerts,
            view,
            snapshot: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            cycle: AtomicU64::new(0),
            interval,
            cancel,
        }
    }

    /// Canal com o estado mais recente para a camada de exibição.
    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> DashboardView {
        self.view.borrow().clone()
    }

    pub async fn snapshot(&self) -> Option<AlertSnapshot> {
        *self.snapshot.lock().await
    }

    /// Encerra o controlador: ciclos futuros e resultados ainda em voo são descartados.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub async fn poll(&self) -> PollOutcome {
        if self.cancel.is_cancelled() {
            return PollOutcome::Discarded;
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            warn!("[PAINEL] Atualização anterior ainda em andamento; ciclo ignorado.");
            return PollOutcome::Skipped;
        };

        let cycle = self.cycle.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = *self.snapshot.lock().await;
        let status_before = self.view.borrow().status;
        self.view.send_modify(|v| v.status = ConnectionStatus::Waiting);
        info!("[PAINEL][CICLO {}] Buscando chamados...", cycle);

        let result = self.source.fetch_tickets().await;
        if self.cancel.is_cancelled() {
            debug!(
                "[PAINEL][CICLO {}] Controlador encerrado durante a busca; resultado descartado.",
                cycle
            );
            self.view.send_modify(|v| {
                v.status = status_without_update(status_before, v.metrics.is_some())
            });
            return PollOutcome::Discarded;
        }

        match result {
            Ok(raw) => {
                let mut metrics = normalize(&raw);
                let now = Utc::now();
                metrics.last_update = Some(now);
                metrics.next_update = chrono::Duration::from_std(self.interval)
                    .ok()
                    .map(|d| now + d);

                let events = detect_changes(previous.as_ref(), &metrics);
                for event in &events {
                    info!("[PAINEL][CICLO {}] Alerta: {}", cycle, event);
                    if self.alerts.send(event.clone()).is_err() {
                        warn!("[PAINEL] Notificador indisponível; alerta não entregue.");
                    }
                }

                *self.snapshot.lock().await = Some(AlertSnapshot::from(&metrics));
                info!(
                    "[PAINEL][CICLO {}] {} abertos, {} em atraso, {} alertas de servidor, {}% resolvidos.",
                    cycle,
                    metrics.total_open,
                    metrics.overdue,
                    metrics.server_alerts,
                    metrics.resolution_rate
                );

                let notice = metrics.error.clone().map(|message| Notice {
                    level: NoticeLevel::Error,
                    message,
                });
                self.view.send_modify(|v| {
                    v.status = ConnectionStatus::Connected;
                    v.metrics = Some(metrics);
                    v.notice = notice;
                });
                PollOutcome::Updated {
                    alerts: events.len(),
                }
            }
            Err(err) => {
                let kind = err.kind();
                let message = err.user_message();
                match kind {
                    ErrorKind::RateLimited => {
                        info!("[PAINEL][CICLO {}] Backend ocupado: {}", cycle, err);
                        self.view.send_modify(|v| {
                            v.status = status_without_update(status_before, v.metrics.is_some());
                            v.notice = Some(Notice {
                                level: NoticeLevel::Info,
                                message,
                            });
                        });
                    }
                    _ => {
                        error!("[PAINEL][CICLO {}] Erro ao carregar chamados: {}", cycle, err);
                        self.view.send_modify(|v| {
                            v.status = ConnectionStatus::Disconnected;
                            if let Some(stale) = v.metrics.as_mut() {
                                stale.error = Some(message.clone());
                            }
                            v.notice = Some(Notice {
                                level: NoticeLevel::Error,
                                message,
                            });
                        });
                    }
                }
                PollOutcome::Failed(kind)
            }
        }
    }
}

#[async_trait]
impl Poller for MetricsController {
    fn name(&self) -> &'static str {
        "PAINEL"
    }

    async fn poll(&self) -> PollOutcome {
        MetricsController::poll(self).await
    }
}
