use reqwest::StatusCode;
use thiserror::Error;

/// Mensagem exibida quando o servidor não responde.
pub const CONNECTIVITY_MESSAGE: &str = "Não foi possível conectar ao servidor. Verifique se o servidor está ativo, as configurações de CORS e o firewall.";

/// Trechos de mensagem que indicam limite de requisições ou backend ainda subindo.
const TRANSIENT_MARKERS: &[&str] = &["rate limit", "too many requests", "not ready", "aguarde"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Usuário não autenticado")]
    Unauthenticated,

    #[error("Falha de conexão com o servidor: {0}")]
    Connectivity(#[source] reqwest::Error),

    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("API retornou formato inválido (esperado JSON)")]
    InvalidContentType,

    #[error("Resposta inválida da API: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Erro na requisição: {0}")]
    Request(#[source] reqwest::Error),
}

/// Classificação usada pelos controladores para decidir estado e aviso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    RateLimited,
    Malformed,
    Unauthenticated,
    Upstream,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ApiError::Connectivity(err)
        } else if err.is_decode() {
            ApiError::Decode(err)
        } else {
            ApiError::Request(err)
        }
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthenticated => ErrorKind::Unauthenticated,
            ApiError::Connectivity(_) => ErrorKind::Connectivity,
            ApiError::Request(_) => ErrorKind::Upstream,
            ApiError::InvalidContentType | ApiError::Decode(_) => ErrorKind::Malformed,
            ApiError::Status { status, message } => {
                let lowered = message.to_lowercase();
                if *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::SERVICE_UNAVAILABLE
                    || TRANSIENT_MARKERS.iter().any(|m| lowered.contains(m))
                {
                    ErrorKind::RateLimited
                } else {
                    ErrorKind::Upstream
                }
            }
        }
    }

    /// Texto para o usuário, conforme a classificação.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Connectivity => CONNECTIVITY_MESSAGE.to_string(),
            ErrorKind::RateLimited => {
                "Servidor ocupado no momento. Os últimos dados válidos continuam em exibição."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}
