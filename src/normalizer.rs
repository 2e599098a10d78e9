//! normalizer.rs — Converte a resposta bruta do backend de chamados em métricas canônicas
//!
//! O backend mudou nomes de campos entre revisões. Cada campo semântico é
//! resolvido por uma tabela ordenada de aliases: o primeiro valor presente vence.
//! A tabela abaixo é a única regra ativa; nomes antigos só entram como fallback.

use crate::types::{DashboardMetrics, ResponsibleLoad, ServiceTime, UNASSIGNED};
use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

/// Campos que podem conter a lista de chamados, em ordem de prioridade.
pub const LIST_ALIASES: &[&str] = &["chamados", "data", "resultados"];
pub const STATUS_ALIASES: &[&str] = &["status", "situacao"];
pub const PRIORITY_ALIASES: &[&str] = &["prioridade", "urgencia"];
pub const ASSIGNEE_ALIASES: &[&str] = &["responsavel", "atendente", "tecnico"];
pub const CATEGORY_ALIASES: &[&str] = &["categoria", "tipo", "category", "type"];
pub const OPENED_AT_ALIASES: &[&str] = &["data_abertura", "dataCriacao", "created_at"];
pub const RESOLVED_AT_ALIASES: &[&str] = &["data_resolucao", "dataResolucao", "resolved_at"];

/// Campos que o backend usa para sinalizar dados degradados.
const ERROR_ALIASES: &[&str] = &["error", "erro", "message"];

const STATUS_OVERDUE: &str = "atrasado";
const STATUS_RESOLVED: &[&str] = &["resolvido", "fechado"];
const PRIORITY_HIGH: &str = "alta";
const PRIORITY_CRITICAL: &str = "crítica";
const SERVER_MARKERS: &[&str] = &["servidor", "server"];

/// Valor exibido quando há chamados mas nenhum traz datas de abertura e resolução.
pub const SERVICE_TIME_PLACEHOLDER: &str = "2h 30min";

/// Normaliza qualquer payload em `DashboardMetrics`. Nunca falha.
pub fn normalize(raw: &Value) -> DashboardMetrics {
    let found = extract_tickets(raw);
    let tickets = found.unwrap_or(&[]);
    let total_open = tickets.len() as u64;

    let mut metrics = DashboardMetrics {
        total_open,
        ..DashboardMetrics::default()
    };

    let mut resolved = 0u64;
    let mut durations: Vec<i64> = Vec::new();

    for ticket in tickets {
        let record = ticket.as_object();
        let status = record.and_then(|r| resolve_str(r, STATUS_ALIASES));
        let priority = record.and_then(|r| resolve_str(r, PRIORITY_ALIASES));
        let category = record.and_then(|r| resolve_str(r, CATEGORY_ALIASES));

        let overdue = status == Some(STATUS_OVERDUE)
            || matches!(priority, Some(PRIORITY_HIGH) | Some(PRIORITY_CRITICAL));
        if overdue {
            metrics.overdue += 1;
        }

        let server_related = category
            .map(|c| c.to_lowercase())
            .is_some_and(|c| SERVER_MARKERS.iter().any(|m| c.contains(m)));
        if priority == Some(PRIORITY_CRITICAL) || server_related {
            metrics.server_alerts += 1;
        }

        if status.is_some_and(|s| STATUS_RESOLVED.contains(&s)) {
            resolved += 1;
        }

        let assignee = record
            .and_then(resolve_assignee)
            .unwrap_or_else(|| UNASSIGNED.to_string());
        match metrics.by_responsible.iter_mut().find(|r| r.name == assignee) {
            Some(load) => load.tickets += 1,
            None => metrics.by_responsible.push(ResponsibleLoad {
                color: color_for(&assignee),
                name: assignee,
                tickets: 1,
            }),
        }

        if let Some(minutes) = record.and_then(service_minutes) {
            durations.push(minutes);
        }
    }

    metrics.resolution_rate = resolution_rate(resolved, total_open);
    metrics.avg_service_time = if total_open == 0 {
        ServiceTime::not_available()
    } else if durations.is_empty() {
        ServiceTime::Text(SERVICE_TIME_PLACEHOLDER.to_string())
    } else {
        let sum: i64 = durations.iter().sum();
        ServiceTime::Minutes((sum as f64 / durations.len() as f64).round() as u64)
    };

    if found.is_none() {
        metrics.error = degraded_message(raw);
    }

    metrics
}

/// Primeira lista encontrada: o próprio payload ou o primeiro alias que seja array.
/// `None` quando nenhuma lista existe no payload.
fn extract_tickets(raw: &Value) -> Option<&[Value]> {
    match raw {
        Value::Array(items) => Some(items.as_slice()),
        Value::Object(map) => LIST_ALIASES
            .iter()
            .find_map(|alias| map.get(*alias).and_then(Value::as_array))
            .map(Vec::as_slice),
        _ => None,
    }
}

/// Primeiro alias com texto não vazio.
fn resolve_str<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Responsável pode vir como texto ou como objeto com `nome`/`name`.
fn resolve_assignee(record: &Map<String, Value>) -> Option<String> {
    ASSIGNEE_ALIASES.iter().find_map(|alias| match record.get(*alias)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => resolve_str(obj, &["nome", "name"]).map(str::to_string),
        _ => None,
    })
}

fn service_minutes(record: &Map<String, Value>) -> Option<i64> {
    let opened = parse_timestamp(resolve_str(record, OPENED_AT_ALIASES)?)?;
    let closed = parse_timestamp(resolve_str(record, RESOLVED_AT_ALIASES)?)?;
    let minutes = (closed - opened).num_minutes();
    (minutes >= 0).then_some(minutes)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok()
}

fn resolution_rate(resolved: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((resolved as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

fn degraded_message(raw: &Value) -> Option<String> {
    let map = raw.as_object()?;
    resolve_str(map, ERROR_ALIASES).map(str::to_string)
}

/// Cor estável por nome, para que a mesma entrada gere as mesmas métricas.
fn color_for(name: &str) -> String {
    let hue = name
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
        % 360;
    format!("hsl({hue}, 70%, 50%)")
}
