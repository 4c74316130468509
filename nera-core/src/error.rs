//! Tipos de erro do `nera-core`.
//!
//! Erros de sentença (`SentenceParse`) são recuperáveis: o pipeline descarta as
//! entidades daquela sentença e segue. Erros de modelo, recursos e idioma são
//! fatais e devem abortar a execução antes de qualquer documento ser processado.

use thiserror::Error;

/// Alias de resultado do crate.
pub type Result<T> = std::result::Result<T, NeraError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NeraError {
    #[error("erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Nenhuma tabela de recursos disponível para o código de idioma.
    #[error("idioma não suportado: {0}")]
    UnsupportedLanguage(String),

    #[error("tabelas de recursos inválidas: {0}")]
    Resources(String),

    /// Arquivo de modelo do classificador ausente ou malformado.
    #[error("modelo inválido (linha {line}): {message}")]
    Model { line: usize, message: String },

    /// Falha ao interpretar a marcação de uma sentença.
    #[error("sentença malformada: {0}")]
    SentenceParse(String),

    /// Falha de um serviço colaborador (pré-processamento, diacríticos).
    #[error("falha no serviço: {0}")]
    Service(String),

    #[error("erro de treino: {0}")]
    Training(String),
}

impl NeraError {
    pub fn model(line: usize, message: impl Into<String>) -> Self {
        NeraError::Model {
            line,
            message: message.into(),
        }
    }

    pub fn sentence(message: impl Into<String>) -> Self {
        NeraError::SentenceParse(message.into())
    }

    pub fn service(message: impl Into<String>) -> Self {
        NeraError::Service(message.into())
    }

    /// Indica se o erro afeta apenas uma sentença/documento e o processamento pode seguir.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, NeraError::SentenceParse(_) | NeraError::Service(_))
    }
}
