use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Nome usado para chamados sem responsável identificado.
pub const UNASSIGNED: &str = "Não atribuído";

/// Texto exibido quando não há chamados para medir o atendimento.
pub const NOT_AVAILABLE: &str = "N/A";

/// Tempo médio de atendimento: texto informativo ou minutos calculados.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServiceTime {
    Minutes(u64),
    Text(String),
}

impl ServiceTime {
    pub fn not_available() -> Self {
        ServiceTime::Text(NOT_AVAILABLE.to_string())
    }
}

/// Carga de chamados de um responsável.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResponsibleLoad {
    pub name: String,
    pub tickets: u64,
    pub color: String,
}

/// Métricas canônicas consumidas pelo painel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_open: u64,
    pub overdue: u64,
    pub server_alerts: u64,
    pub by_responsible: Vec<ResponsibleLoad>,
    pub avg_service_time: ServiceTime,
    pub resolution_rate: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self {
            total_open: 0,
            overdue: 0,
            server_alerts: 0,
            by_responsible: Vec::new(),
            avg_service_time: ServiceTime::not_available(),
            resolution_rate: 0,
            last_update: None,
            next_update: None,
            error: None,
        }
    }
}

/// Estado da conexão com o backend, na visão do painel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Waiting,
    Connected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Aviso exibido ao usuário sobre o último ciclo de atualização.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// O que o painel precisa para se desenhar.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub status: ConnectionStatus,
    pub metrics: Option<DashboardMetrics>,
    pub notice: Option<Notice>,
}

/// Situação de uma tarefa do diretor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "pendente", alias = "pending")]
    Pending,
    #[serde(rename = "resolvida", alias = "resolved")]
    Resolved,
    #[serde(other)]
    Other,
}

/// Tarefa (mensagem do diretor) exibida na barra lateral.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(alias = "descricao")]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, alias = "dataCriacao")]
    pub created_at: Option<String>,
    #[serde(default, alias = "dataExpiracao")]
    pub expires_at: Option<String>,
    #[serde(default, alias = "dataResolucao")]
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Chamado do CRUD autenticado.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Dados para abrir um chamado novo.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewTicket {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Alteração parcial de um chamado.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// O backend devolve ids ora como texto, ora como número.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "id inválido: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_accepts_portuguese_payload_and_numeric_id() {
        let task: Task = serde_json::from_value(json!({
            "id": 7,
            "descricao": "Verificar backup",
            "status": "pendente",
            "dataCriacao": "2025-01-10T12:00:00Z",
            "dataExpiracao": "2025-01-11T12:00:00Z",
            "dataResolucao": null
        }))
        .unwrap();

        assert_eq!(task.id, "7");
        assert_eq!(task.description, "Verificar backup");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.created_at.as_deref(), Some("2025-01-10T12:00:00Z"));
        assert_eq!(task.resolved_at, None);
    }

    #[test]
    fn task_accepts_english_payload_and_unknown_status() {
        let task: Task = serde_json::from_value(json!({
            "id": "a1",
            "description": "Trocar toner",
            "status": "archived",
            "createdAt": "2025-01-10T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(task.status, TaskStatus::Other);
        assert_eq!(task.expires_at, None);
    }

    #[test]
    fn metrics_serialize_in_camel_case() {
        let value = serde_json::to_value(DashboardMetrics::default()).unwrap();
        assert_eq!(value["totalOpen"], 0);
        assert_eq!(value["avgServiceTime"], "N/A");
        assert_eq!(value["resolutionRate"], 0);
        assert!(value.get("error").is_none());
    }
}
