//! client.rs — Cliente HTTP da API de chamados
//!
//! Instância construída explicitamente e injetada nos controladores. Rotas públicas
//! (listagem de chamados, tarefas, login) e rotas autenticadas com token bearer da sessão.

use crate::config::Config;
use crate::error::ApiError;
use crate::session::SessionStore;
use crate::types::{
    AuthResponse, LoginRequest, NewTicket, RegisterRequest, Task, Ticket, TicketUpdate, User,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fonte da listagem bruta de chamados.
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn fetch_tickets(&self) -> Result<Value, ApiError>;
}

/// Fonte das tarefas do diretor.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError>;
    async fn resolve_task(&self, id: &str) -> Result<(), ApiError>;
}

/// Rotas configuráveis da API.
#[derive(Debug, Clone)]
struct Paths {
    tickets: String,
    tasks: String,
    task_resolve: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    paths: Paths,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            paths: Paths {
                tickets: config.tickets_path.clone(),
                tasks: config.tasks_path.clone(),
                task_resolve: config.task_resolve_path.clone(),
            },
            session,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn public(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http.request(method, self.url(endpoint))
    }

    /// Falha antes de qualquer acesso à rede se não houver token.
    fn authorized(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.session.token().ok_or(ApiError::Unauthenticated)?;
        Ok(self.public(method, endpoint).bearer_auth(token))
    }

    pub async fn login(&self, data: &LoginRequest) -> Result<AuthResponse, ApiError> {
        send_json(self.public(Method::POST, "/api/login").json(data)).await
    }

    pub async fn register(&self, data: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        send_json(self.public(Method::POST, "/api/register").json(data)).await
    }

    /// Faz login e guarda o token na sessão.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let auth = self
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        let user = auth.user.clone();
        self.session.store(auth);
        Ok(user)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<User, ApiError> {
        let auth = self
            .register(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: name.map(str::to_string),
            })
            .await?;
        let user = auth.user.clone();
        self.session.store(auth);
        Ok(user)
    }

    pub fn sign_out(&self) {
        self.session.clear();
    }

    pub async fn get_tickets(&self) -> Result<Vec<Ticket>, ApiError> {
        send_json(self.authorized(Method::GET, "/api/tickets")?).await
    }

    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, ApiError> {
        send_json(self.authorized(Method::POST, "/api/tickets")?.json(ticket)).await
    }

    pub async fn update_ticket(
        &self,
        ticket_id: &str,
        changes: &TicketUpdate,
    ) -> Result<Ticket, ApiError> {
        let endpoint = format!("/api/tickets/{ticket_id}");
        send_json(self.authorized(Method::PUT, &endpoint)?.json(changes)).await
    }

    pub async fn get_profile(&self) -> Result<User, ApiError> {
        send_json(self.authorized(Method::GET, "/api/profile")?).await
    }
}

#[async_trait]
impl TicketSource for ApiClient {
    async fn fetch_tickets(&self) -> Result<Value, ApiError> {
        let response = self.public(Method::GET, &self.paths.tickets).send().await?;
        let response = check_status(response).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Err(ApiError::InvalidContentType);
        }

        let data: Value = response.json().await?;
        debug!("[API] Chamados recebidos: {}", data);
        Ok(data)
    }
}

#[async_trait]
impl TaskSource for ApiClient {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ApiError> {
        send_json(self.public(Method::GET, &self.paths.tasks)).await
    }

    async fn resolve_task(&self, id: &str) -> Result<(), ApiError> {
        let endpoint = self.paths.task_resolve.replace("{id}", id);
        let response = self.public(Method::PUT, &endpoint).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json::<T>().await?)
}

/// Respostas fora de 2xx viram `ApiError::Status`, com a mensagem do corpo quando houver.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            format!(
                "API Error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )
            .trim_end()
            .to_string()
        });
    Err(ApiError::Status { status, message })
}
