//! # Alinhador de Spans
//!
//! Recupera, para cada candidato, o intervalo exato `[início, fim]` no fluxo cru.
//!
//! O texto do candidato é retokenizado (espaços em volta de vírgulas, de pontos em
//! números e de dois-pontos) e procurado como sequência contígua de tokens crus. A
//! busca é gulosa, da esquerda para a direita, a partir de um cursor que só avança:
//! um token cru consumido por uma entidade nunca é reaproveitado por outra da mesma
//! sentença. Assim o custo fica em O(entidades × tokens) e, quando o mesmo texto
//! aparece duas vezes, a primeira ocorrência vai para o primeiro candidato.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::annotation::RawTokens;
use crate::entity::{NamedEntity, Span};
use crate::resources::LanguageResources;

static DECIMAL_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d,\d").expect("regex de vírgula decimal"));
static DECIMAL_DOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d\.\d").expect("regex de ponto decimal"));

/// Retokeniza o texto de um candidato para comparação com o fluxo cru.
///
/// - `,` ganha espaços, exceto quando o texto tem o padrão `dígito,dígito`;
/// - `.` ganha espaços apenas quando, sem espaços, aparece `dígito.dígito`;
/// - `:` sempre ganha espaços.
pub fn normalize_candidate(text: &str) -> Vec<String> {
    let mut text = text.to_string();
    if !DECIMAL_COMMA_RE.is_match(&text) {
        text = text.replace(',', " , ");
    }
    if DECIMAL_DOT_RE.is_match(&text.replace(' ', "")) {
        text = text.replace('.', " . ");
    }
    text.replace(':', " : ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Alinha candidatos contra o fluxo cru de uma sentença.
pub struct SpanAligner<'a> {
    raw: &'a RawTokens,
    resources: &'a LanguageResources,
}

impl<'a> SpanAligner<'a> {
    pub fn new(raw: &'a RawTokens, resources: &'a LanguageResources) -> Self {
        Self { raw, resources }
    }

    /// Alinha os textos em ordem. `None` marca candidatos que não casaram.
    ///
    /// É uma função pura das entradas: realinhar a mesma lista produz os mesmos índices.
    pub fn align(&self, candidates: &[String]) -> Vec<Option<Span>> {
        let mut cursor = 0;
        candidates
            .iter()
            .map(|text| {
                let wanted = normalize_candidate(&self.resources.fold(text));
                let found = self.find_from(cursor, &wanted);
                match found {
                    Some(i) => {
                        let end = i + wanted.len() - 1;
                        cursor = i + wanted.len();
                        Some(Span {
                            start: self.raw.positions[i],
                            end: self.raw.positions[end],
                        })
                    }
                    None => {
                        debug!(candidate = %text, cursor, "candidato não alinhado");
                        None
                    }
                }
            })
            .collect()
    }

    /// Preenche `span` de cada entidade.
    pub fn align_entities(&self, entities: &mut [NamedEntity]) {
        let texts: Vec<String> = entities.iter().map(|e| e.occurrence.clone()).collect();
        for (entity, span) in entities.iter_mut().zip(self.align(&texts)) {
            entity.span = span;
        }
    }

    fn find_from(&self, cursor: usize, wanted: &[String]) -> Option<usize> {
        let n = wanted.len();
        if n == 0 || n > self.raw.len() {
            return None;
        }
        (cursor..=self.raw.len() - n).find(|&i| self.raw.tokens[i..i + n] == *wanted)
    }
}
