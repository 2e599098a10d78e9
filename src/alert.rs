//! alert.rs — Decide quais métricas mudaram entre dois ciclos bem-sucedidos
//!
//! Só a decisão mora aqui. A entrega (som + fala) fica no `notifier`.

use crate::types::{DashboardMetrics, Task};
use std::fmt;

/// Últimos valores normalizados com sucesso, usados na comparação do próximo ciclo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertSnapshot {
    pub total_open: u64,
    pub overdue: u64,
}

impl From<&DashboardMetrics> for AlertSnapshot {
    fn from(metrics: &DashboardMetrics) -> Self {
        Self {
            total_open: metrics.total_open,
            overdue: metrics.overdue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    fn between(previous: u64, current: u64) -> Option<Self> {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Some(Direction::Increase),
            std::cmp::Ordering::Less => Some(Direction::Decrease),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Evento de alerta, independente de como será anunciado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    OpenCountChanged {
        previous: u64,
        current: u64,
        direction: Direction,
    },
    OverdueCountChanged {
        previous: u64,
        current: u64,
        direction: Direction,
    },
    NewTask {
        id: String,
        description: String,
    },
}

impl AlertEvent {
    /// Frase em pt-BR falada ao anunciar o alerta.
    pub fn sentence(&self) -> String {
        match self {
            AlertEvent::OpenCountChanged {
                current,
                direction: Direction::Increase,
                ..
            } => format!("Atenção: o número de chamados abertos aumentou para {current}."),
            AlertEvent::OpenCountChanged {
                current,
                direction: Direction::Decrease,
                ..
            } => format!("O número de chamados abertos diminuiu para {current}."),
            AlertEvent::OverdueCountChanged {
                current,
                direction: Direction::Increase,
                ..
            } => format!("Atenção: os chamados em atraso aumentaram para {current}."),
            AlertEvent::OverdueCountChanged {
                current,
                direction: Direction::Decrease,
                ..
            } => format!("Os chamados em atraso diminuíram para {current}."),
            AlertEvent::NewTask { description, .. } => format!("Nova tarefa: {description}"),
        }
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sentence())
    }
}

/// Compara as métricas novas com o snapshot anterior.
/// Sem snapshot (primeiro ciclo) não há alerta.
pub fn detect_changes(
    previous: Option<&AlertSnapshot>,
    current: &DashboardMetrics,
) -> Vec<AlertEvent> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut events = Vec::new();
    if let Some(direction) = Direction::between(previous.total_open, current.total_open) {
        events.push(AlertEvent::OpenCountChanged {
            previous: previous.total_open,
            current: current.total_open,
            direction,
        });
    }
    if let Some(direction) = Direction::between(previous.overdue, current.overdue) {
        events.push(AlertEvent::OverdueCountChanged {
            previous: previous.overdue,
            current: current.overdue,
            direction,
        });
    }
    events
}

/// Tarefas cujo id não existia na busca anterior, na ordem recebida.
pub fn detect_new_tasks(known_ids: Option<&[String]>, tasks: &[Task]) -> Vec<AlertEvent> {
    let Some(known_ids) = known_ids else {
        return Vec::new();
    };
    tasks
        .iter()
        .filter(|task| !known_ids.contains(&task.id))
        .map(|task| AlertEvent::NewTask {
            id: task.id.clone(),
            description: task.description.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;

    fn metrics(total_open: u64, overdue: u64) -> DashboardMetrics {
        DashboardMetrics {
            total_open,
            overdue,
            ..DashboardMetrics::default()
        }
    }

    fn task(id: &str, description: &str) -> Task {
        Task {
            id: id.to_string(),
            description: description.to_string(),
            status: TaskStatus::Pending,
            created_at: None,
            expires_at: None,
            resolved_at: None,
        }
    }

    #[test]
    fn first_poll_never_alerts() {
        assert!(detect_changes(None, &metrics(10, 3)).is_empty());
    }

    #[test]
    fn open_increase_is_reported_once() {
        let snapshot = AlertSnapshot { total_open: 10, overdue: 2 };
        let events = detect_changes(Some(&snapshot), &metrics(14, 2));
        assert_eq!(
            events,
            vec![AlertEvent::OpenCountChanged {
                previous: 10,
                current: 14,
                direction: Direction::Increase,
            }]
        );
    }

    #[test]
    fn both_fields_report_independently() {
        let snapshot = AlertSnapshot { total_open: 10, overdue: 5 };
        let events = detect_changes(Some(&snapshot), &metrics(9, 8));
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            AlertEvent::OpenCountChanged { direction: Direction::Decrease, current: 9, .. }
        ));
        assert!(matches!(
            events[1],
            AlertEvent::OverdueCountChanged { direction: Direction::Increase, previous: 5, current: 8 }
        ));
    }

    #[test]
    fn unchanged_values_are_silent() {
        let snapshot = AlertSnapshot { total_open: 14, overdue: 1 };
        assert!(detect_changes(Some(&snapshot), &metrics(14, 1)).is_empty());
    }

    #[test]
    fn sentences_are_in_portuguese() {
        let up = AlertEvent::OpenCountChanged {
            previous: 10,
            current: 14,
            direction: Direction::Increase,
        };
        assert_eq!(
            up.sentence(),
            "Atenção: o número de chamados abertos aumentou para 14."
        );
        let down = AlertEvent::OverdueCountChanged {
            previous: 3,
            current: 1,
            direction: Direction::Decrease,
        };
        assert_eq!(down.to_string(), "Os chamados em atraso diminuíram para 1.");
    }

    #[test]
    fn new_tasks_are_detected_by_id() {
        let known = vec!["1".to_string(), "2".to_string()];
        let tasks = vec![task("1", "a"), task("3", "Ligar para o fornecedor"), task("2", "b")];
        let events = detect_new_tasks(Some(known.as_slice()), &tasks);
        assert_eq!(
            events,
            vec![AlertEvent::NewTask {
                id: "3".into(),
                description: "Ligar para o fornecedor".into(),
            }]
        );
        assert_eq!(events[0].sentence(), "Nova tarefa: Ligar para o fornecedor");
    }

    #[test]
    fn first_task_fetch_is_silent() {
        assert!(detect_new_tasks(None, &[task("1", "a")]).is_empty());
    }
}
