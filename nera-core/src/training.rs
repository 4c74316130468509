//! # Eventos de Treino
//!
//! Um evento é a saída do extrator de features no modo de treino: as features da
//! entidade seguidas do tipo correto, uma linha por evento, separadas por espaço.
//!
//! ```text
//! notFirst prevToken=la prevTokenPos=s last firstIsUpper firstIsLetter single_word no_digit no_caps no_consonants LOCATION
//! ```
//!
//! Os eventos podem ser gerados a partir de sentenças com marcação de referência, no
//! mesmo formato que o serializador produz com `preserve_markup`:
//! `<ENAMEX TYPE="PERSON"><w lemma="ion" ana="Np">Ion</w></ENAMEX>`.

use std::io::{BufRead, Write};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::annotation::{Sentence, SentenceNode};
use crate::entity::{CandidateOrigin, NamedEntity, Span};
use crate::error::{NeraError, Result};
use crate::features::{extract_features, ExtractionMode};
use crate::resources::LanguageResources;

static GOLD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<(?:ENAMEX|TIMEX)\s+TYPE="([^"]*)"\s*>|(</(?:ENAMEX|TIMEX)>)|(<w\b[^>]*>.*?</w>|<c\b[^>]*>.*?</c>)"#)
        .expect("regex de referência")
});

/// Contexto (features) e desfecho (tipo) de uma entidade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEvent {
    pub context: Vec<String>,
    pub outcome: String,
}

impl TrainingEvent {
    /// Lê uma linha de evento; o último campo é o desfecho.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if fields.len() < 2 {
            return None;
        }
        let outcome = fields.pop()?;
        Some(Self {
            context: fields,
            outcome,
        })
    }

    pub fn to_line(&self) -> String {
        format!("{} {}", self.context.join(" "), self.outcome)
    }
}

/// Lê eventos, um por linha. Linhas em branco são ignoradas.
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<TrainingEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = TrainingEvent::parse_line(&line)
            .ok_or_else(|| NeraError::Training(format!("linha {}: evento sem features", idx + 1)))?;
        events.push(event);
    }
    Ok(events)
}

pub fn write_events<W: Write>(mut writer: W, events: &[TrainingEvent]) -> Result<()> {
    for event in events {
        writeln!(writer, "{}", event.to_line())?;
    }
    Ok(())
}

/// Entidade de referência: posições de nós e tipo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldEntity {
    pub span: Span,
    pub entity_type: String,
}

/// Lê uma sentença com entidades de referência marcadas por `ENAMEX`/`TIMEX`.
pub fn parse_gold(markup: &str) -> Result<(Sentence, Vec<GoldEntity>)> {
    let mut nodes: Vec<SentenceNode> = Vec::new();
    let mut gold = Vec::new();
    let mut open: Option<(usize, String)> = None;

    for caps in GOLD_RE.captures_iter(markup) {
        if let Some(entity_type) = caps.get(1) {
            if open.is_some() {
                return Err(NeraError::sentence("entidades aninhadas na referência"));
            }
            open = Some((nodes.len(), entity_type.as_str().to_string()));
        } else if caps.get(2).is_some() {
            let (start, entity_type) = open
                .take()
                .ok_or_else(|| NeraError::sentence("fechamento de entidade sem abertura"))?;
            if nodes.len() == start {
                return Err(NeraError::sentence("entidade de referência vazia"));
            }
            gold.push(GoldEntity {
                span: Span {
                    start,
                    end: nodes.len() - 1,
                },
                entity_type,
            });
        } else if let Some(element) = caps.get(3) {
            nodes.extend(Sentence::parse(element.as_str())?.nodes);
        }
    }

    if open.is_some() {
        return Err(NeraError::sentence("entidade de referência sem fechamento"));
    }
    Ok((Sentence { nodes }, gold))
}

/// Gera um evento por entidade de referência da sentença.
pub fn events_for_sentence(
    sentence: &Sentence,
    gold: &[GoldEntity],
    resources: &LanguageResources,
) -> Vec<TrainingEvent> {
    let tokens = sentence.tokens(resources);
    gold.iter()
        .filter(|g| g.span.start <= g.span.end && g.span.end < sentence.len())
        .filter_map(|g| {
            let occurrence = sentence.nodes[g.span.start..=g.span.end]
                .iter()
                .map(|n| n.node.text().replace(resources.multiword_delimiter, " "))
                .collect::<Vec<_>>()
                .join(" ");
            let mut entity = NamedEntity::new(occurrence, CandidateOrigin::Rules);
            entity.span = Some(g.span);
            entity.entity_type = Some(g.entity_type.clone());

            let fv = extract_features(&entity, &tokens, resources, ExtractionMode::Training)?;
            Some(TrainingEvent {
                context: fv.features,
                outcome: fv.label?,
            })
        })
        .collect()
}
