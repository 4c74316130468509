//! # nera-web — Servidor e Driver em Lote
//!
//! - `nera-web`: servidor Axum com `POST /annotate`, `GET /ws` (eventos do pipeline em
//!   tempo real) e `GET /languages`.
//! - `nera`: driver de linha de comando com os subcomandos `annotate` (listagem de
//!   documentos) e `train` (modelo MaxEnt a partir de eventos ou corpus de referência).

pub mod batch;
pub mod clients;
pub mod config;
pub mod server;

use tracing_subscriber::EnvFilter;

/// Logs em stderr; `RUST_LOG` tem prioridade, o padrão é `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
