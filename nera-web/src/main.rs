//! Servidor web Axum com WebSocket para anotação de entidades em tempo real

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nera_web::config::AppConfig;
use nera_web::server::{router, AppState};
use tracing::info;

#[derive(Parser)]
#[command(name = "nera-web", about = "Servidor de anotação de entidades nomeadas")]
struct Args {
    /// Arquivo de configuração JSON
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sobrescreve o endereço da configuração
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nera_web::init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let annotator = config.build_annotator()?;
    let state = Arc::new(AppState {
        annotator,
        defaults: config.serialize,
        parallel: config.parallel,
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("bind em {}", config.bind))?;
    info!(lang = %config.lang, "🚀 Servidor NER iniciado em http://{}", config.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
