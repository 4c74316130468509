//! # Pipeline NER — Orquestrador com Eventos Observáveis
//!
//! O pipeline coordena os módulos de uma sentença (candidatos, alinhamento, features,
//! classificador, serializador) e emite eventos em cada passo via um canal Rust
//! (`mpsc`), permitindo que o servidor WebSocket transmita o progresso em tempo real.
//!
//! Cada sentença é independente: o [`Annotator`] não guarda estado mutável, apenas
//! referências compartilhadas para os recursos do idioma e o classificador.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::align::SpanAligner;
use crate::annotation::{strip_markup, Sentence};
use crate::candidate::detect_candidates;
use crate::entity::NamedEntity;
use crate::features::{extract_features, ExtractionMode};
use crate::maxent::Classifier;
use crate::resources::LanguageResources;
use crate::serializer::{serialize, SerializeOptions};

/// Por que um candidato não chegou à saída.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// O texto não casou com o fluxo cru a partir do cursor.
    Unaligned,
    /// O span cruza uma entidade anterior.
    Overlap,
    /// Texto vazio, sem features.
    Empty,
    /// O classificador não devolveu rótulo.
    Unscored,
}

/// Eventos emitidos pelo pipeline durante o processamento de uma sentença.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: candidatos detectados pelas regras e pelo agrupador de datas.
    CandidatesDetected {
        candidates: Vec<String>,
        total_nodes: usize,
    },
    /// **Passo 2**: candidato localizado no fluxo cru.
    EntityAligned {
        occurrence: String,
        start: usize,
        end: usize,
    },
    /// Candidato descartado.
    EntityDropped {
        occurrence: String,
        reason: DropReason,
    },
    /// **Passo 3**: tipo atribuído pelo classificador.
    EntityClassified {
        occurrence: String,
        entity_type: String,
        probability: f64,
        features: Vec<String>,
    },
    /// **Conclusão**: entidades finais e a sentença serializada.
    Done {
        entities: Vec<NamedEntity>,
        markup: String,
        processing_ms: u64,
    },
}

/// Resultado de uma sentença.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceAnnotation {
    /// Entidades resolvidas e classificadas, ordenadas e sem sobreposição.
    pub entities: Vec<NamedEntity>,
    pub markup: String,
}

/// O pipeline NER de uma sentença.
///
/// # Modos de Uso
/// - **Sync**: [`Annotator::annotate`] para o processamento em lote.
/// - **Streaming**: [`Annotator::annotate_streaming`] para UIs reativas (via WebSocket).
#[derive(Clone)]
pub struct Annotator {
    resources: Arc<LanguageResources>,
    classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

impl Annotator {
    pub fn new(resources: Arc<LanguageResources>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            resources,
            classifier,
        }
    }

    pub fn resources(&self) -> &LanguageResources {
        &self.resources
    }

    /// Processa a sentença de forma síncrona e retorna o resultado final.
    pub fn annotate(&self, sentence: &Sentence, options: &SerializeOptions) -> SentenceAnnotation {
        let (tx, rx) = mpsc::channel();
        self.annotate_streaming(sentence, options, tx);

        // Consome todos os eventos até o fim
        let mut result = SentenceAnnotation::default();
        while let Ok(event) = rx.recv() {
            if let PipelineEvent::Done { entities, markup, .. } = event {
                result = SentenceAnnotation { entities, markup };
            }
        }
        result
    }

    /// Lê a marcação de uma sentença e a anota.
    ///
    /// Marcação ilegível não aborta o documento: a sentença sai como texto sem tags e
    /// sem entidades.
    pub fn annotate_markup(&self, xml: &str, options: &SerializeOptions) -> SentenceAnnotation {
        match Sentence::parse(xml) {
            Ok(sentence) => self.annotate(&sentence, options),
            Err(e) => {
                warn!(error = %e, "sentença ignorada na extração de entidades");
                SentenceAnnotation {
                    entities: Vec::new(),
                    markup: strip_markup(xml),
                }
            }
        }
    }

    /// Executa o pipeline enviando eventos de progresso em tempo real.
    ///
    /// # Fluxo de Eventos
    /// 1. `CandidatesDetected`: textos candidatos na ordem de emissão.
    /// 2. `EntityAligned` / `EntityDropped` (Loop): resultado do alinhamento.
    /// 3. `EntityClassified` (Loop): tipo e probabilidade de cada entidade.
    /// 4. `Done`: entidades finais e a sentença serializada.
    pub fn annotate_streaming(&self, sentence: &Sentence, options: &SerializeOptions, tx: mpsc::Sender<PipelineEvent>) {
        let start = Instant::now();
        let res = self.resources.as_ref();

        // === Passo 1: Candidatos ===
        let mut entities: Vec<NamedEntity> = detect_candidates(sentence, res)
            .iter()
            .map(|group| NamedEntity::from_group(group, res))
            .collect();
        let _ = tx.send(PipelineEvent::CandidatesDetected {
            candidates: entities.iter().map(|e| e.occurrence.clone()).collect(),
            total_nodes: sentence.len(),
        });

        // === Passo 2: Alinhamento ===
        let raw = sentence.raw_tokens(res);
        SpanAligner::new(&raw, res).align_entities(&mut entities);

        let mut resolved: Vec<NamedEntity> = Vec::with_capacity(entities.len());
        for entity in entities {
            let reason = match entity.span {
                None => Some(DropReason::Unaligned),
                Some(_) if entity.occurrence.is_empty() => Some(DropReason::Empty),
                Some(span) if resolved.last().and_then(|p| p.end()).is_some_and(|end| span.start <= end) => {
                    Some(DropReason::Overlap)
                }
                Some(_) => None,
            };
            match (reason, entity.span) {
                (None, Some(span)) => {
                    let _ = tx.send(PipelineEvent::EntityAligned {
                        occurrence: entity.occurrence.clone(),
                        start: span.start,
                        end: span.end,
                    });
                    resolved.push(entity);
                }
                (reason, _) => {
                    let reason = reason.unwrap_or(DropReason::Unaligned);
                    debug!(candidate = %entity.occurrence, ?reason, "candidato descartado");
                    let _ = tx.send(PipelineEvent::EntityDropped {
                        occurrence: entity.occurrence,
                        reason,
                    });
                }
            }
        }

        // === Passo 3: Features + Classificação ===
        let tokens = sentence.tokens(res);
        let mut classified = Vec::with_capacity(resolved.len());
        for mut entity in resolved {
            let Some(fv) = extract_features(&entity, &tokens, res, ExtractionMode::Inference) else {
                let _ = tx.send(PipelineEvent::EntityDropped {
                    occurrence: entity.occurrence,
                    reason: DropReason::Empty,
                });
                continue;
            };
            let Some(score) = self.classifier.score(&fv.features) else {
                warn!(candidate = %entity.occurrence, "classificador sem rótulo; entidade descartada");
                let _ = tx.send(PipelineEvent::EntityDropped {
                    occurrence: entity.occurrence,
                    reason: DropReason::Unscored,
                });
                continue;
            };

            let _ = tx.send(PipelineEvent::EntityClassified {
                occurrence: entity.occurrence.clone(),
                entity_type: score.label.clone(),
                probability: score.probability,
                features: fv.features,
            });
            entity.entity_type = Some(score.label);
            entity.probability = Some(score.probability);
            classified.push(entity);
        }

        // === Passo 4: Serialização ===
        let markup = serialize(sentence, &classified, res, options);
        let _ = tx.send(PipelineEvent::Done {
            entities: classified,
            markup,
            processing_ms: start.elapsed().as_millis() as u64,
        });
    }
}
