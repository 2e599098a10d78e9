//! notifier.rs — Entrega dos alertas: som de aviso, pausa curta e fala sintetizada
//!
//! Entrega é "melhor esforço": falhas de áudio ou fala vão para o log e nunca
//! voltam para quem emitiu o evento.

use crate::alert::AlertEvent;
use crate::config::Config;
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Saída de áudio e voz do painel.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn play_cue(&self) -> anyhow::Result<()>;
    async fn speak(&self, sentence: &str) -> anyhow::Result<()>;
}

/// Só registra no log. Usado quando não há programa de áudio configurado.
#[derive(Debug, Default)]
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    async fn play_cue(&self) -> anyhow::Result<()> {
        info!("[ALERTA] 🔔");
        Ok(())
    }

    async fn speak(&self, sentence: &str) -> anyhow::Result<()> {
        info!("[ALERTA] {}", sentence);
        Ok(())
    }
}

/// Toca o som e fala o texto chamando programas externos (ex.: `aplay`, `espeak-ng`).
#[derive(Debug, Clone)]
pub struct CommandAnnouncer {
    audio_player: Option<String>,
    alert_sound: String,
    speech_command: Option<String>,
    speech_voice: String,
    timeout: Duration,
}

impl CommandAnnouncer {
    /// `None` quando nenhum programa foi configurado.
    pub fn from_config(config: &Config) -> Option<Self> {
        if config.audio_player.is_none() && config.speech_command.is_none() {
            return None;
        }
        Some(Self {
            audio_player: config.audio_player.clone(),
            alert_sound: config.alert_sound.clone(),
            speech_command: config.speech_command.clone(),
            speech_voice: config.speech_voice.clone(),
            timeout: Duration::from_secs(config.announcer_timeout_secs),
        })
    }

    async fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<()> {
        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);

        let output = timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| anyhow!("{} excedeu o tempo limite de {:?}", program, self.timeout))??;

        if !output.status.success() {
            bail!(
                "{} terminou com {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Announcer for CommandAnnouncer {
    async fn play_cue(&self) -> anyhow::Result<()> {
        match &self.audio_player {
            Some(player) => self.run(player, &[self.alert_sound.as_str()]).await,
            None => Ok(()),
        }
    }

    async fn speak(&self, sentence: &str) -> anyhow::Result<()> {
        match &self.speech_command {
            Some(command) => self.run(command, &["-v", self.speech_voice.as_str(), sentence]).await,
            None => {
                info!("[ALERTA] {}", sentence);
                Ok(())
            }
        }
    }
}

/// Consome eventos de alerta e os anuncia em ordem.
pub struct Notifier {
    announcer: Arc<dyn Announcer>,
    speech_delay: Duration,
}

impl Notifier {
    pub fn new(announcer: Arc<dyn Announcer>, speech_delay: Duration) -> Self {
        Self {
            announcer,
            speech_delay,
        }
    }

    /// Som, pausa para o som terminar, depois a fala.
    pub async fn deliver(&self, event: &AlertEvent) {
        let sentence = event.sentence();
        debug!("[ALERTA] Anunciando: {}", sentence);

        if let Err(e) = self.announcer.play_cue().await {
            warn!("[ALERTA] Erro ao reproduzir som de alerta: {:?}", e);
        }
        sleep(self.speech_delay).await;
        if let Err(e) = self.announcer.speak(&sentence).await {
            warn!("[ALERTA] Erro ao sintetizar fala: {:?}", e);
        }
    }

    /// Roda até o canal fechar ou o token ser cancelado.
    pub async fn run(self, mut events: UnboundedReceiver<AlertEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("[ALERTA] Notificador encerrado.");
                    break;
                }
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => self.deliver(&event).await,
                    None => break,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Direction;
    use tokio::sync::{Mutex, mpsc};
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingAnnouncer {
        calls: Mutex<Vec<(String, Instant)>>,
        fail_cue: bool,
    }

    #[async_trait]
    impl Announcer for RecordingAnnouncer {
        async fn play_cue(&self) -> anyhow::Result<()> {
            self.calls.lock().await.push(("cue".into(), Instant::now()));
            if self.fail_cue {
                bail!("sem dispositivo de áudio");
            }
            Ok(())
        }

        async fn speak(&self, sentence: &str) -> anyhow::Result<()> {
            self.calls
                .lock()
                .await
                .push((format!("fala: {sentence}"), Instant::now()));
            Ok(())
        }
    }

    fn open_increase(current: u64) -> AlertEvent {
        AlertEvent::OpenCountChanged {
            previous: current - 1,
            current,
            direction: Direction::Increase,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn speech_waits_for_the_cue() {
        let announcer = Arc::new(RecordingAnnouncer::default());
        let notifier = Notifier::new(announcer.clone(), Duration::from_millis(800));

        notifier.deliver(&open_increase(14)).await;

        let calls = announcer.calls.lock().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "cue");
        assert_eq!(
            calls[1].0,
            "fala: Atenção: o número de chamados abertos aumentou para 14."
        );
        assert!(calls[1].1 - calls[0].1 >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn cue_failure_does_not_stop_speech_or_the_loop() {
        let announcer = Arc::new(RecordingAnnouncer {
            fail_cue: true,
            ..RecordingAnnouncer::default()
        });
        let notifier = Notifier::new(announcer.clone(), Duration::from_millis(800));
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(open_increase(3)).unwrap();
        tx.send(open_increase(4)).unwrap();
        drop(tx);
        notifier.run(rx, CancellationToken::new()).await;

        let calls = announcer.calls.lock().await;
        let spoken: Vec<&str> = calls
            .iter()
            .map(|(c, _)| c.as_str())
            .filter(|c| c.starts_with("fala"))
            .collect();
        assert_eq!(spoken.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_notifier_stops() {
        let notifier = Notifier::new(Arc::new(LogAnnouncer), Duration::from_millis(1));
        let (_tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        notifier.run(rx, cancel).await;
    }

    #[tokio::test]
    async fn missing_program_is_reported_as_error() {
        let announcer = CommandAnnouncer {
            audio_player: Some("programa-que-nao-existe-painel".into()),
            alert_sound: "sounds/alert.wav".into(),
            speech_command: None,
            speech_voice: "pt-br".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(announcer.play_cue().await.is_err());
        assert!(announcer.speak("olá").await.is_ok());
    }
}
