//! Contratos dos serviços colaboradores.
//!
//! O pré-processador transforma texto cru em marcação XCES (tokens, lemas, POS,
//! chunks); o restaurador de diacríticos devolve o texto com os diacríticos inseridos.
//! As implementações HTTP ficam no crate do servidor; aqui ficam os traits e versões
//! locais usadas em testes e quando o serviço não é configurado.

use crate::error::{NeraError, Result};

pub trait Preprocessor: Send + Sync {
    /// Anota uma sentença crua e devolve a marcação XCES.
    fn annotate(&self, text: &str, lang: &str) -> Result<String>;
}

pub trait DiacriticRestorer: Send + Sync {
    fn restore(&self, text: &str) -> Result<String>;
}

/// Restaurador que devolve o texto sem alterações.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRestorer;

impl DiacriticRestorer for NoopRestorer {
    fn restore(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Pré-processador ausente: toda chamada falha, e o documento segue sem a sentença.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePreprocessor;

impl Preprocessor for UnavailablePreprocessor {
    fn annotate(&self, _text: &str, _lang: &str) -> Result<String> {
        Err(NeraError::service("nenhum pré-processador configurado"))
    }
}
