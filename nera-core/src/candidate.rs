//! # Construtor de Spans Candidatos
//!
//! Percorre o fluxo anotado uma única vez e decide, token a token, se a palavra
//! continua, inicia ou quebra uma cadeia de entidade. O estado é pequeno e explícito
//! ([`SpanState`]): se o token anterior fazia parte de uma entidade, o chunk ativo e o
//! lema anterior.
//!
//! ## Tabela de Decisão
//!
//! As regras formam uma lista ordenada de pares predicado → decisão ([`RULES`]); a
//! primeira que se aplica vence. A ordem é parte do contrato:
//!
//! | # | Regra               | Condição resumida                                      | Decisão |
//! |---|---------------------|--------------------------------------------------------|---------|
//! | 1 | `numeric_range`     | lema `\d{1,2}-\d{1,2}`                                 | quebra  |
//! | 2 | `proper_noun`       | POS permitida, nome próprio, forma capitalizada        | aceita  |
//! | 3 | `allowed_pos`       | POS permitida, não delicada (ou cadeia ativa)          | aceita  |
//! | 4 | `allowed_pos_break` | POS permitida que não passou nas anteriores            | quebra  |
//! | 5 | `common_entity`     | lema no léxico de entidades comuns, capitalizado       | aceita  |
//! | 6 | `capitalized_lemma` | lema começa com maiúscula                              | aceita  |
//! | 7 | `location_clue`     | após preposição de local (ou cadeia ativa), maiúscula  | aceita  |
//!
//! Nas regras 5 a 7 uma POS delicada também só é aceita com cadeia ativa.
//! | 8 | `same_chunk`        | cadeia ativa e mesmo chunk                             | aceita  |
//! | 9 | `break`             | sempre                                                 | quebra  |
//!
//! Em paralelo, o [`DateState`] acumula datas e emite grupos próprios, que nunca
//! interrompem nem absorvem o grupo de regras aberto.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::annotation::{AnnotatedWord, Node, Sentence};
use crate::date::{DateState, NUMERIC_RANGE_RE};
use crate::entity::{CandidateGroup, CandidateOrigin};
use crate::resources::LanguageResources;

/// Resultado de uma regra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// O token inicia ou continua um candidato.
    Accept,
    /// A cadeia é interrompida.
    Break,
}

/// Estado do autômato dentro de uma sentença.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanState {
    pub previous_is_ne: bool,
    /// Chunk do último token aceito.
    pub chunk: Option<String>,
    /// Lema da palavra anterior; vazio depois de um separador.
    pub previous_lemma: String,
}

/// Tudo o que um predicado de regra pode consultar.
pub struct RuleContext<'a> {
    pub word: &'a AnnotatedWord,
    pub state: &'a SpanState,
    pub resources: &'a LanguageResources,
}

impl RuleContext<'_> {
    fn allowed(&self) -> bool {
        self.resources.pos_allow.contains(&self.word.pos)
    }

    fn proper(&self) -> bool {
        self.resources.is_proper(&self.word.pos)
    }

    fn capitalized(&self) -> bool {
        starts_upper(&self.word.occurrence)
    }

    fn lower(&self) -> String {
        self.word.occurrence.to_lowercase()
    }

    /// POS delicada só continua uma cadeia ativa, nunca a inicia.
    fn may_start(&self) -> bool {
        !self.resources.is_delicate(&self.word.pos) || self.state.previous_is_ne
    }

    fn is_correction(&self) -> bool {
        self.resources.correction_words.contains(&self.lower())
    }
}

/// Uma linha da tabela de decisão.
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&RuleContext) -> bool,
    pub decision: Decision,
}

/// A cascata de regras, em ordem de prioridade. A última sempre se aplica.
pub static RULES: &[Rule] = &[
    Rule {
        name: "numeric_range",
        applies: |c| NUMERIC_RANGE_RE.is_match(&c.word.lemma),
        decision: Decision::Break,
    },
    Rule {
        name: "proper_noun",
        applies: |c| c.allowed() && c.proper() && c.capitalized(),
        decision: Decision::Accept,
    },
    Rule {
        name: "allowed_pos",
        applies: |c| {
            c.allowed()
                && !c.resources.no_continuation.contains(&c.lower())
                && !c.proper()
                && c.may_start()
        },
        decision: Decision::Accept,
    },
    Rule {
        name: "allowed_pos_break",
        applies: |c| c.allowed(),
        decision: Decision::Break,
    },
    Rule {
        name: "common_entity",
        applies: |c| {
            c.resources.common_entities.contains(&c.word.lemma)
                && c.capitalized()
                && !c.is_correction()
                && c.may_start()
        },
        decision: Decision::Accept,
    },
    Rule {
        name: "capitalized_lemma",
        applies: |c| starts_upper(&c.word.lemma) && c.may_start(),
        decision: Decision::Accept,
    },
    Rule {
        name: "location_clue",
        applies: |c| {
            (c.resources.location_clues.contains(&c.state.previous_lemma) || c.state.previous_is_ne)
                && c.capitalized()
                && c.may_start()
        },
        decision: Decision::Accept,
    },
    Rule {
        name: "same_chunk",
        applies: |c| {
            c.state.previous_is_ne
                && c.word.chunk.is_some()
                && c.state.chunk == c.word.chunk
                && !c.is_correction()
        },
        decision: Decision::Accept,
    },
    Rule {
        name: "break",
        applies: |_| true,
        decision: Decision::Break,
    },
];

/// Primeira regra da tabela que se aplica ao contexto.
pub fn first_match(ctx: &RuleContext) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.applies)(ctx))
        .unwrap_or(&RULES[RULES.len() - 1])
}

impl SpanState {
    /// Passo puro do autômato: devolve o novo estado, a decisão e o nome da regra.
    pub fn step(self, word: &AnnotatedWord, resources: &LanguageResources) -> (SpanState, Decision, &'static str) {
        let rule = first_match(&RuleContext {
            word,
            state: &self,
            resources,
        });

        let next = match rule.decision {
            Decision::Accept => SpanState {
                previous_is_ne: true,
                chunk: word.chunk.clone().or(self.chunk),
                previous_lemma: word.lemma.clone(),
            },
            Decision::Break => SpanState {
                previous_is_ne: false,
                chunk: None,
                previous_lemma: word.lemma.clone(),
            },
        };
        (next, rule.decision, rule.name)
    }

    /// Um separador quebra a cadeia e apaga a memória do token anterior.
    pub fn reset(self) -> SpanState {
        SpanState::default()
    }
}

/// Acumula os grupos candidatos de uma sentença.
#[derive(Debug, Default)]
pub struct CandidateBuilder {
    span: SpanState,
    date: DateState,
    /// Grupos com a posição do nó inicial.
    groups: Vec<(usize, CandidateGroup)>,
    /// Índice do grupo de regras aberto em `groups`.
    open: Option<usize>,
    /// Posição do próximo nó.
    position: usize,
}

impl CandidateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consome um nó do fluxo anotado.
    pub fn feed(&mut self, node: &Node, resources: &LanguageResources) {
        match node {
            Node::Word(word) => self.feed_word(word, resources),
            Node::Separator { .. } => {
                self.span = std::mem::take(&mut self.span).reset();
                self.date = std::mem::take(&mut self.date).reset();
                self.open = None;
            }
        }
        self.position += 1;
    }

    fn feed_word(&mut self, word: &AnnotatedWord, resources: &LanguageResources) {
        let was_active = self.span.previous_is_ne;
        let (span, decision, rule) = std::mem::take(&mut self.span).step(word, resources);
        self.span = span;
        trace!(token = %word.occurrence, pos = %word.pos, rule, ?decision, "decisão de span");

        match decision {
            Decision::Accept => match self.open.filter(|_| was_active) {
                Some(idx) => self.groups[idx].1.push(word.to_token()),
                None => {
                    let group = CandidateGroup::new(word.to_token(), CandidateOrigin::Rules);
                    self.groups.push((self.position, group));
                    self.open = Some(self.groups.len() - 1);
                }
            },
            Decision::Break => self.open = None,
        }

        let (date, emitted) = std::mem::take(&mut self.date).step(word, resources);
        self.date = date;
        if let Some(group) = emitted {
            // Datas são contíguas e terminam no nó atual
            let start = (self.position + 1).saturating_sub(group.tokens.len());
            self.groups.push((start, group));
        }
    }

    /// Grupos na ordem do documento (posição inicial; empate mantém a emissão).
    pub fn finish(mut self) -> Vec<CandidateGroup> {
        self.groups.sort_by_key(|(start, _)| *start);
        self.groups.into_iter().map(|(_, group)| group).collect()
    }
}

/// Detecta todos os candidatos (regras e datas) de uma sentença.
pub fn detect_candidates(sentence: &Sentence, resources: &LanguageResources) -> Vec<CandidateGroup> {
    let mut builder = CandidateBuilder::new();
    for n in &sentence.nodes {
        builder.feed(&n.node, resources);
    }
    builder.finish()
}

fn starts_upper(text: &str) -> bool {
    text.chars().next().map(char::is_uppercase).unwrap_or(false)
}
