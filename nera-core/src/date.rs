//! # Agrupador de Datas
//!
//! Roda sobre o mesmo fluxo que o construtor de spans, com estado próprio, e emite
//! candidatos sintéticos para datas no formato dia + mês por extenso + ano:
//!
//! ```text
//! 15        ianuarie   2020
//! Idle ──▶  Day  ──▶  Month ──▶ emite "15 ianuarie 2020"
//! ```
//!
//! Qualquer quebra de forma no meio do caminho descarta o buffer. Com
//! `emit_partial_dates` ligado, um "15 ianuarie" seguido de outra palavra é emitido
//! mesmo sem o ano.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotatedWord, Token};
use crate::entity::{CandidateGroup, CandidateOrigin};
use crate::resources::LanguageResources;

/// Intervalo numérico curto (`"12-15"`), tratado como número e não como nome.
pub static NUMERIC_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}-\d{1,2}$").expect("regex de intervalo"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateStage {
    #[default]
    Idle,
    /// Um dia (ou intervalo de dias) foi lido.
    Day,
    /// Dia seguido de mês.
    Month,
}

/// Estado do agrupador: estágio e tokens acumulados.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateState {
    pub stage: DateStage,
    pub buffer: Vec<Token>,
}

impl DateState {
    /// Avança o autômato com uma palavra. Devolve o novo estado e, se uma data foi
    /// completada, o candidato correspondente.
    pub fn step(self, word: &AnnotatedWord, resources: &LanguageResources) -> (DateState, Option<CandidateGroup>) {
        let numeric = resources.is_numeral(&word.pos) || NUMERIC_RANGE_RE.is_match(&word.lemma);

        if numeric {
            return match self.stage {
                DateStage::Idle if is_day_like(&word.occurrence) => (
                    DateState {
                        stage: DateStage::Day,
                        buffer: vec![word.to_token()],
                    },
                    None,
                ),
                DateStage::Month if is_year(&word.occurrence) => {
                    let group = emit(self.buffer, Some(word.to_token()));
                    (DateState::default(), group)
                }
                _ => (DateState::default(), None),
            };
        }

        if self.stage == DateStage::Day && resources.months.contains(&word.occurrence.to_lowercase()) {
            let mut buffer = self.buffer;
            buffer.push(word.to_token());
            return (
                DateState {
                    stage: DateStage::Month,
                    buffer,
                },
                None,
            );
        }

        if self.stage == DateStage::Month && resources.emit_partial_dates {
            return (DateState::default(), emit(self.buffer, None));
        }
        (DateState::default(), None)
    }

    /// Separadores interrompem qualquer data em andamento.
    pub fn reset(self) -> DateState {
        DateState::default()
    }
}

fn emit(buffer: Vec<Token>, last: Option<Token>) -> Option<CandidateGroup> {
    let mut tokens = buffer.into_iter().chain(last);
    let first = tokens.next()?;
    let mut group = CandidateGroup::new(first, CandidateOrigin::Date);
    for token in tokens {
        group.push(token);
    }
    Some(group)
}

fn is_day_like(occurrence: &str) -> bool {
    occurrence.chars().count() < 3 || occurrence.contains('-')
}

fn is_year(occurrence: &str) -> bool {
    occurrence.chars().count() == 4 && occurrence.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(words: &[AnnotatedWord], resources: &LanguageResources) -> Vec<CandidateGroup> {
        let mut state = DateState::default();
        let mut out = Vec::new();
        for w in words {
            let (next, emitted) = state.step(w, resources);
            state = next;
            out.extend(emitted);
        }
        out
    }

    fn w(occ: &str, lemma: &str, pos: &str) -> AnnotatedWord {
        AnnotatedWord::new(occ, lemma, pos)
    }

    #[test]
    fn test_full_date_emitted() {
        let ro = LanguageResources::builtin("ro").unwrap();
        let groups = run(
            &[
                w("La", "la", "Spsa"),
                w("15", "15", "Mc"),
                w("ianuarie", "ianuarie", "Ncms-n"),
                w("2020", "2020", "Mc"),
            ],
            &ro,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].origin, CandidateOrigin::Date);
        let texts: Vec<&str> = groups[0].tokens.iter().map(|t| t.occurrence.as_str()).collect();
        assert_eq!(texts, vec!["15", "ianuarie", "2020"]);
    }

    #[test]
    fn test_day_range_starts_date() {
        let ro = LanguageResources::builtin("ro").unwrap();
        let groups = run(
            &[w("12-15", "12-15", "Ncms"), w("mai", "mai", "Ncms"), w("2021", "2021", "Mc")],
            &ro,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].tokens.len(), 3);
    }

    #[test]
    fn test_no_emission_without_year() {
        let ro = LanguageResources::builtin("ro").unwrap();
        let groups = run(
            &[w("15", "15", "Mc"), w("ianuarie", "ianuarie", "Nc"), w("a", "avea", "Va")],
            &ro,
        );
        assert!(groups.is_empty());
    }

    #[test]
    fn test_partial_date_when_enabled() {
        let mut ro = LanguageResources::builtin("ro").unwrap();
        ro.emit_partial_dates = true;
        let groups = run(
            &[w("15", "15", "Mc"), w("ianuarie", "ianuarie", "Nc"), w("a", "avea", "Va")],
            &ro,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].tokens.len(), 2);
    }

    #[test]
    fn test_wrong_shapes_reset() {
        let ro = LanguageResources::builtin("ro").unwrap();
        // Ano longo demais, número longo no início, número no lugar do mês
        let groups = run(
            &[
                w("15", "15", "Mc"), w("ianuarie", "ianuarie", "Nc"), w("20201", "20201", "Mc"),
                w("2020", "2020", "Mc"), w("ianuarie", "ianuarie", "Nc"), w("2020", "2020", "Mc"),
                w("1", "1", "Mc"), w("2", "2", "Mc"), w("mai", "mai", "Nc"), w("2020", "2020", "Mc"),
            ],
            &ro,
        );
        assert!(groups.is_empty());
    }
}
