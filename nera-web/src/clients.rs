//! Clientes HTTP dos serviços colaboradores.
//!
//! Ambos enviam um formulário (`lang`, `text`) por POST e devolvem o corpo da resposta.
//! São bloqueantes: usados pelo driver em lote, fora de qualquer runtime assíncrono.

use std::time::Duration;

use nera_core::error::{NeraError, Result};
use nera_core::{DiacriticRestorer, Preprocessor};
use reqwest::blocking::Client;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

fn client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| NeraError::service(e.to_string()))
}

fn post_form(client: &Client, url: &str, lang: &str, text: &str) -> Result<String> {
    debug!(url, chars = text.len(), "chamada de serviço");
    client
        .post(url)
        .form(&[("lang", lang), ("text", text)])
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.text())
        .map_err(|e| NeraError::service(format!("{url}: {e}")))
}

/// Serviço de pré-processamento: texto cru → XCES.
pub struct HttpPreprocessor {
    client: Client,
    url: String,
}

impl HttpPreprocessor {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: client(timeout)?,
            url: url.into(),
        })
    }
}

impl Preprocessor for HttpPreprocessor {
    fn annotate(&self, text: &str, lang: &str) -> Result<String> {
        post_form(&self.client, &self.url, lang, text)
    }
}

/// Serviço de restauração de diacríticos (romeno).
pub struct HttpDiacriticRestorer {
    client: Client,
    url: String,
}

impl HttpDiacriticRestorer {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: client(timeout)?,
            url: url.into(),
        })
    }
}

impl DiacriticRestorer for HttpDiacriticRestorer {
    fn restore(&self, text: &str) -> Result<String> {
        post_form(&self.client, &self.url, "ro", text)
    }
}
