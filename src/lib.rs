//! Pipeline do painel de chamados: normalização das respostas do backend,
//! detecção de mudanças e alertas sonoros, com atualização periódica.

pub mod alert;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod normalizer;
pub mod notifier;
pub mod scheduler;
pub mod session;
pub mod tasks;
pub mod types;
