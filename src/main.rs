use anyhow::Result;
use painel_chamados::client::ApiClient;
use painel_chamados::config::Config;
use painel_chamados::controller::MetricsController;
use painel_chamados::notifier::{Announcer, CommandAnnouncer, LogAnnouncer, Notifier};
use painel_chamados::scheduler::spawn_scheduler;
use painel_chamados::session::MemorySession;
use painel_chamados::tasks::TaskFeedController;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializa o sistema de logging (tracing)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config: Arc<Config> = Arc::new(Config::load()?);
    info!("Configuração carregada: API em {}", config.api_url);

    let session = Arc::new(MemorySession::new());
    let client = Arc::new(ApiClient::new(&config, session)?);

    let shutdown = CancellationToken::new();
    let (alert_tx, alert_rx) = mpsc::unbounded_channel();

    let announcer: Arc<dyn Announcer> = match CommandAnnouncer::from_config(&config) {
        Some(announcer) => Arc::new(announcer),
        None => Arc::new(LogAnnouncer),
    };
    let notifier = Notifier::new(announcer, config.speech_delay());
    let notifier_handle = tokio::spawn(notifier.run(alert_rx, shutdown.child_token()));

    let metrics = Arc::new(MetricsController::new(
        client.clone(),
        alert_tx.clone(),
        config.metrics_interval(),
        shutdown.child_token(),
    ));
    let tasks = Arc::new(TaskFeedController::new(
        client.clone(),
        alert_tx,
        shutdown.child_token(),
    ));

    // Exibição: por enquanto, cada mudança do painel vai para o log
    let mut view_rx = metrics.subscribe();
    let view_cancel = shutdown.child_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = view_cancel.cancelled() => break,
                changed = view_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view = view_rx.borrow_and_update().clone();
                    match serde_json::to_string(&view) {
                        Ok(json) => info!("[PAINEL] {}", json),
                        Err(e) => error!("[PAINEL] Falha ao serializar estado: {}", e),
                    }
                }
            }
        }
    });

    info!("Iniciando os trabalhos");
    let handles = vec![
        spawn_scheduler(metrics.clone(), config.metrics_interval(), shutdown.child_token()),
        spawn_scheduler(tasks.clone(), config.tasks_interval(), shutdown.child_token()),
    ];

    tokio::signal::ctrl_c().await?;
    info!("Encerrando o painel...");
    shutdown.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Scheduler error: {:?}", e);
        }
    }
    if let Err(e) = notifier_handle.await {
        error!("Notifier error: {:?}", e);
    }

    Ok(())
}
