// src/scheduler.rs

use crate::error::ErrorKind;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration, time::Instant};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Resultado de um ciclo de atualização.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Dados aplicados; `alerts` eventos emitidos.
    Updated { alerts: usize },
    /// Busca falhou; estado anterior preservado.
    Failed(ErrorKind),
    /// Outro ciclo ainda estava em andamento.
    Skipped,
    /// Controlador encerrado durante a busca; resultado ignorado.
    Discarded,
}

/// Algo que o scheduler sabe atualizar periodicamente.
#[async_trait]
pub trait Poller: Send + Sync {
    fn name(&self) -> &'static str;
    async fn poll(&self) -> PollOutcome;
}

/// Executa um ciclo imediatamente e depois a cada `every`, até o token ser cancelado.
/// O cancelamento impede novos ciclos mas não interrompe um ciclo em andamento.
pub async fn run_scheduler(poller: Arc<dyn Poller>, every: Duration, cancel: CancellationToken) {
    if every.is_zero() {
        error!("[{}] Intervalo zero; agendamento não iniciado.", poller.name());
        return;
    }
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle_number: u64 = 0;

    info!(
        "[{}] Agendamento iniciado, intervalo de {:?}.",
        poller.name(),
        every
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("[{}] Agendamento cancelado após {} ciclos.", poller.name(), cycle_number);
                break;
            }
            _ = ticker.tick() => {}
        }

        cycle_number += 1;
        let cycle_start = Instant::now();
        debug!("[{}][CICLO {}] Iniciando ciclo.", poller.name(), cycle_number);

        let outcome = poller.poll().await;
        match outcome {
            PollOutcome::Failed(kind) => warn!(
                "[{}][CICLO {}] Ciclo falhou ({:?}). Duração: {:?}",
                poller.name(),
                cycle_number,
                kind,
                cycle_start.elapsed()
            ),
            other => info!(
                "[{}][CICLO {}] Fim do ciclo: {:?}. Duração: {:?}",
                poller.name(),
                cycle_number,
                other,
                cycle_start.elapsed()
            ),
        }
    }
}

pub fn spawn_scheduler(
    poller: Arc<dyn Poller>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_scheduler(poller, every, cancel))
}
