use config as config_crate;
use config_crate::builder::DefaultState;
use config_crate::ConfigBuilder;
use serde::Deserialize;
use std::time::Duration;

/// Configuração operacional do painel.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URL base da API (sobrescrita por `PAINEL_API_URL`).
    pub api_url: String,
    /// Caminho da listagem de chamados.
    pub tickets_path: String,
    /// Caminho da listagem de tarefas do diretor.
    pub tasks_path: String,
    /// Caminho para resolver uma tarefa; `{id}` é substituído.
    pub task_resolve_path: String,
    /// Intervalo entre atualizações das métricas, em segundos.
    pub metrics_interval_secs: u64,
    /// Intervalo entre atualizações das tarefas, em segundos.
    pub tasks_interval_secs: u64,
    /// Pausa entre o som de alerta e a fala, em milissegundos.
    pub speech_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Arquivo de áudio tocado antes de cada alerta.
    pub alert_sound: String,
    /// Programa que toca o áudio (ex.: `aplay`). Sem ele, os alertas só vão para o log.
    pub audio_player: Option<String>,
    /// Programa de síntese de voz (ex.: `espeak-ng`).
    pub speech_command: Option<String>,
    pub speech_voice: String,
    /// Tempo máximo de cada comando de áudio/fala, em segundos.
    pub announcer_timeout_secs: u64,
}

impl Config {
    /// Padrões -> arquivo `config` opcional -> variáveis `PAINEL_*`.
    pub fn load() -> anyhow::Result<Self> {
        let settings = Self::defaults()?
            .add_source(config_crate::File::with_name("config").required(false))
            .add_source(
                config_crate::Environment::with_prefix("PAINEL").try_parsing(true),
            )
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
        let builder = config_crate::Config::builder()
            .set_default("api_url", "http://localhost:5000")?
            .set_default("tickets_path", "/api/chamados")?
            .set_default("tasks_path", "/api/tarefas")?
            .set_default("task_resolve_path", "/api/tarefas/{id}/resolver")?
            .set_default("metrics_interval_secs", 300)?
            .set_default("tasks_interval_secs", 60)?
            .set_default("speech_delay_ms", 800)?
            .set_default("request_timeout_secs", 30)?
            .set_default("connect_timeout_secs", 5)?
            .set_default("alert_sound", "sounds/alert.wav")?
            .set_default("speech_voice", "pt-br")?
            .set_default("announcer_timeout_secs", 10)?;
        Ok(builder)
    }

    /// Validação dos valores carregados.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err("api_url não pode ser vazio".into());
        }
        if self.metrics_interval_secs == 0 {
            return Err("metrics_interval_secs deve ser maior que zero".into());
        }
        if self.tasks_interval_secs == 0 {
            return Err("tasks_interval_secs deve ser maior que zero".into());
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err("timeouts de requisição devem ser maiores que zero".into());
        }
        if !self.task_resolve_path.contains("{id}") {
            return Err("task_resolve_path deve conter {id}".into());
        }
        Ok(())
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }

    pub fn tasks_interval(&self) -> Duration {
        Duration::from_secs(self.tasks_interval_secs)
    }

    pub fn speech_delay(&self) -> Duration {
        Duration::from_millis(self.speech_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_crate::{File, FileFormat};

    fn from_toml(toml: &str) -> Config {
        Config::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_match_dashboard_cadence() {
        let config = from_toml("");
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.tickets_path, "/api/chamados");
        assert_eq!(config.metrics_interval(), Duration::from_secs(300));
        assert_eq!(config.tasks_interval(), Duration::from_secs(60));
        assert_eq!(config.speech_delay(), Duration::from_millis(800));
        assert_eq!(config.audio_player, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = from_toml(
            r#"
            api_url = "http://milvus.interno:8080"
            metrics_interval_secs = 120
            speech_command = "espeak-ng"
            "#,
        );
        assert_eq!(config.api_url, "http://milvus.interno:8080");
        assert_eq!(config.metrics_interval_secs, 120);
        assert_eq!(config.speech_command.as_deref(), Some("espeak-ng"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = from_toml("tasks_interval_secs = 0");
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_path_without_placeholder_is_rejected() {
        let config = from_toml(r#"task_resolve_path = "/api/tarefas/resolver""#);
        assert!(config.validate().is_err());
    }
}
