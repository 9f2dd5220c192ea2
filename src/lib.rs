pub mod audio;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod protocol;
pub mod session;
pub mod transport;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SanaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SanaError {
    /// Check if this error is recoverable within the current session
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Typically transient backend conditions
            SanaError::Network(_) => true,
            SanaError::Backend(_) => true,
            SanaError::Synthesis(_) => true,
            // Fixable by the user without restarting
            SanaError::Validation(_) => true,
            // Requires a new credential
            SanaError::Auth(_) => false,
            // Hardware problems need user intervention
            SanaError::Device(_) => false,
            SanaError::Channel(_) => false,
            SanaError::Config(_) => false,
        }
    }

    /// Get the user-facing utterance spoken when this error surfaces
    pub fn user_message(&self) -> String {
        match self {
            SanaError::Network(_) => {
                "Erro de conexão. Verifique sua internet e tente novamente.".to_string()
            }
            SanaError::Auth(_) => "Sessão expirada. Faça login novamente.".to_string(),
            SanaError::Backend(_) => "Desculpe, ocorreu um erro. Tente novamente.".to_string(),
            SanaError::Device(_) => "Erro ao acessar o microfone.".to_string(),
            SanaError::Validation(message) => message.clone(),
            SanaError::Synthesis(_) => "Desculpe, não consegui reproduzir o áudio.".to_string(),
            SanaError::Channel(_) => {
                "Erro interno de comunicação. Reinicie o aplicativo.".to_string()
            }
            SanaError::Config(_) => "Erro de configuração. Verifique os ajustes.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SanaError>;
