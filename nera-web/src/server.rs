//! Rotas HTTP e WebSocket do servidor de anotação.
//!
//! Os textos recebidos já estão em XCES: blocos `<seg lang="..">` ou, sem eles, uma
//! única sentença com elementos `<w>`/`<c>`.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use nera_core::annotation::segments;
use nera_core::resources::BUILTIN_LANGUAGES;
use nera_core::services::UnavailablePreprocessor;
use nera_core::{Annotator, DocumentProcessor, PipelineEvent, ProcessOptions, Sentence, SentenceAnnotation, SerializeOptions};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Estado compartilhado da aplicação
pub struct AppState {
    pub annotator: Annotator,
    pub defaults: SerializeOptions,
    pub parallel: bool,
}

impl AppState {
    fn lang(&self) -> &str {
        &self.annotator.resources().code
    }

    fn options(&self, preserve_markup: Option<bool>, wrap_sentence: Option<bool>) -> SerializeOptions {
        SerializeOptions {
            preserve_markup: preserve_markup.unwrap_or(self.defaults.preserve_markup),
            wrap_sentence: wrap_sentence.unwrap_or(self.defaults.wrap_sentence),
        }
    }

    /// Blocos de sentença do texto; sem `<seg>` o texto inteiro é uma sentença.
    fn sentence_blocks<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match segments(text, self.lang()) {
            Ok(blocks) if !blocks.is_empty() => blocks,
            _ => vec![text],
        }
    }
}

#[derive(Deserialize)]
struct AnnotateRequest {
    text: String,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    preserve_markup: Option<bool>,
    #[serde(default)]
    wrap_sentence: Option<bool>,
}

/// Mensagem WebSocket recebida do cliente
#[derive(Deserialize)]
struct WsRequest {
    text: String,
    #[serde(default)]
    preserve_markup: Option<bool>,
    #[serde(default)]
    wrap_sentence: Option<bool>,
}

#[derive(Serialize)]
struct AnnotateResponse {
    sentences: Vec<SentenceAnnotation>,
    processing_ms: u64,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/annotate", post(annotate_handler))
        .route("/ws", get(ws_handler))
        .route("/languages", get(languages_handler))
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

/// Anotação via HTTP POST (sem streaming)
async fn annotate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnnotateRequest>,
) -> impl IntoResponse {
    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Texto vazio");
    }
    if let Some(lang) = req.lang.as_deref().filter(|l| *l != state.lang()) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("idioma {lang:?} não carregado (servidor em {:?})", state.lang()),
        );
    }

    let start = Instant::now();
    let serialize = state.options(req.preserve_markup, req.wrap_sentence);
    let options = ProcessOptions {
        serialize,
        parallel: state.parallel,
        ..ProcessOptions::default()
    };
    let processor = DocumentProcessor::new(state.annotator.clone(), Arc::new(UnavailablePreprocessor), options);

    let sentences = processor.annotate_blocks(&state.sentence_blocks(&req.text)).sentences;

    Json(AnnotateResponse {
        sentences,
        processing_ms: start.elapsed().as_millis() as u64,
    })
    .into_response()
}

async fn languages_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "builtin": BUILTIN_LANGUAGES,
        "active": state.lang(),
    }))
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Lógica do WebSocket: recebe XCES, executa o pipeline por sentença e envia os eventos
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // Tenta parsear como JSON {text, preserve_markup, wrap_sentence}; senão usa como texto puro
                let (text, options) = match serde_json::from_str::<WsRequest>(&text) {
                    Ok(req) => (req.text.trim().to_string(), state.options(req.preserve_markup, req.wrap_sentence)),
                    Err(_) => (text.trim().to_string(), state.defaults),
                };
                if text.is_empty() {
                    continue;
                }

                // O pipeline é síncrono: roda fora do runtime
                let st = Arc::clone(&state);
                let messages = match tokio::task::spawn_blocking(move || event_messages(&st, &text, &options)).await {
                    Ok(messages) => messages,
                    Err(e) => {
                        warn!(error = %e, "pipeline interrompido");
                        continue;
                    }
                };

                for json in messages {
                    if socket.send(Message::Text(json)).await.is_err() {
                        return; // cliente desconectou
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

/// Eventos JSON de um texto, sentença a sentença, na ordem de envio pelo WebSocket.
/// Sentenças malformadas geram um evento `Error` e o restante segue.
pub fn event_messages(state: &AppState, text: &str, options: &SerializeOptions) -> Vec<String> {
    let blocks = state.sentence_blocks(text);
    info!(sentences = blocks.len(), chars = text.len(), "anotando via WebSocket");

    let mut messages = Vec::new();
    for block in blocks {
        let sentence = match Sentence::parse(block) {
            Ok(sentence) => sentence,
            Err(e) => {
                warn!(error = %e, "sentença malformada via WebSocket");
                let json = serde_json::json!({"type": "Error", "data": {"message": e.to_string()}});
                messages.push(json.to_string());
                continue;
            }
        };

        let (tx, rx) = mpsc::channel::<PipelineEvent>();
        state.annotator.annotate_streaming(&sentence, options, tx);
        messages.extend(rx.try_iter().filter_map(|event| serde_json::to_string(&event).ok()));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use nera_core::{Classifier, LanguageResources, Score};
    use tower::ServiceExt;

    struct PersonClassifier;

    impl Classifier for PersonClassifier {
        fn score(&self, _features: &[String]) -> Option<Score> {
            Some(Score { label: "PERSON".into(), probability: 0.8 })
        }

        fn labels(&self) -> Vec<String> {
            vec!["PERSON".into()]
        }
    }

    fn app() -> Router {
        let annotator = Annotator::new(Arc::new(LanguageResources::builtin("ro").unwrap()), Arc::new(PersonClassifier));
        router(Arc::new(AppState {
            annotator,
            defaults: SerializeOptions::default(),
            parallel: false,
        }))
    }

    async fn post_json(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/annotate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_annotate_segments() {
        let text = r#"<seg lang="ro"><w lemma="Ion" ana="Np">Ion</w><w lemma="pleca" ana="Vmis3s">pleacă</w></seg><seg lang="ro"><w lemma="el" ana="Pp3msr">el</w></seg>"#;
        let (status, body) = post_json(serde_json::json!({"text": text})).await;

        assert_eq!(status, StatusCode::OK);
        let sentences = body["sentences"].as_array().unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0]["markup"], r#"<ENAMEX TYPE="PERSON">Ion</ENAMEX> pleacă"#);
        assert_eq!(sentences[0]["entities"][0]["entity_type"], "PERSON");
        assert_eq!(sentences[1]["markup"], "el");
    }

    #[tokio::test]
    async fn test_annotate_bare_sentence_with_wrap() {
        let text = r#"<w lemma="Ion" ana="Np">Ion</w>"#;
        let (status, body) = post_json(serde_json::json!({"text": text, "wrap_sentence": true})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sentences"][0]["markup"], r#"<sent><ENAMEX TYPE="PERSON">Ion</ENAMEX></sent>"#);
    }

    #[tokio::test]
    async fn test_annotate_empty_text() {
        let (status, body) = post_json(serde_json::json!({"text": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Texto vazio");
    }

    #[tokio::test]
    async fn test_annotate_other_language() {
        let (status, _) = post_json(serde_json::json!({"text": "<w>x</w>", "lang": "en"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_languages() {
        let response = app()
            .oneshot(Request::builder().uri("/languages").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["active"], "ro");
        assert_eq!(body["builtin"], serde_json::json!(["ro", "en"]));
    }

    fn state() -> AppState {
        let annotator = Annotator::new(Arc::new(LanguageResources::builtin("ro").unwrap()), Arc::new(PersonClassifier));
        AppState {
            annotator,
            defaults: SerializeOptions::default(),
            parallel: false,
        }
    }

    #[test]
    fn test_ws_event_stream() {
        let text = r#"<seg lang="ro"><w lemma="Ion" ana="Np">Ion</w><w lemma="pleca" ana="Vmis3s">pleacă</w></seg><seg lang="ro"><w lemma="Ana" ana="Np">Ana<w></seg>"#;
        let messages: Vec<serde_json::Value> = event_messages(&state(), text, &SerializeOptions::default())
            .iter()
            .map(|m| serde_json::from_str(m).unwrap())
            .collect();

        let types: Vec<&str> = messages.iter().map(|m| m["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec!["CandidatesDetected", "EntityAligned", "EntityClassified", "Done", "Error"]
        );
        assert_eq!(messages[0]["data"]["candidates"], serde_json::json!(["Ion"]));
        assert_eq!(messages[3]["data"]["markup"], r#"<ENAMEX TYPE="PERSON">Ion</ENAMEX> pleacă"#);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let response = app()
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
    }
}
