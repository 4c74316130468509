//! # Candidatos e Entidades Nomeadas
//!
//! Um [`CandidateGroup`] é uma sequência de tokens que o construtor de spans (ou o
//! agrupador de datas) acredita formar uma menção. Depois do alinhamento ele vira uma
//! [`NamedEntity`] com posições no fluxo cru, e depois da classificação recebe um tipo.
//!
//! | Tipo classificado | Tag de saída |
//! |-------------------|--------------|
//! | `DATE`, `TIME`    | `TIMEX`      |
//! | demais            | `ENAMEX`     |

use serde::{Deserialize, Serialize};

use crate::annotation::Token;
use crate::resources::LanguageResources;

/// De onde veio o candidato.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Cascata de regras POS/capitalização.
    Rules,
    /// Agrupador de datas (dia + mês + ano).
    Date,
}

/// Sequência não vazia de tokens que forma um candidato.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateGroup {
    pub tokens: Vec<Token>,
    pub origin: CandidateOrigin,
}

impl CandidateGroup {
    pub fn new(first: Token, origin: CandidateOrigin) -> Self {
        Self {
            tokens: vec![first],
            origin,
        }
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Texto de superfície usado no alinhamento.
    ///
    /// Tokens de POS delicado só entram quando seguidos por um token não delicado,
    /// então um "de" final é descartado mas "Banca de Stat" fica inteiro. O delimitador
    /// multipalavra vira espaço para casar com o fluxo cru já dividido.
    pub fn surface_text(&self, resources: &LanguageResources) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.tokens.len());
        let mut pending: Vec<&str> = Vec::new();

        for token in &self.tokens {
            if resources.is_delicate(&token.pos) {
                pending.push(&token.occurrence);
            } else {
                parts.append(&mut pending);
                parts.push(&token.occurrence);
            }
        }

        parts
            .join(" ")
            .replace(resources.multiword_delimiter, " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Intervalo inclusivo de posições de nós.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Família da tag de saída.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Enamex,
    Timex,
}

impl EntityKind {
    pub fn tag_name(&self) -> &'static str {
        match self {
            EntityKind::Enamex => "ENAMEX",
            EntityKind::Timex => "TIMEX",
        }
    }
}

/// Menção resolvida (ou não) no fluxo cru.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    /// Texto de superfície do candidato.
    pub occurrence: String,
    /// Posições inicial e final (inclusivas); `None` quando o alinhamento falhou.
    pub span: Option<Span>,
    /// Tipo atribuído pelo classificador.
    pub entity_type: Option<String>,
    /// Probabilidade reportada para o tipo escolhido.
    pub probability: Option<f64>,
    pub origin: CandidateOrigin,
}

impl NamedEntity {
    pub fn new(occurrence: impl Into<String>, origin: CandidateOrigin) -> Self {
        Self {
            occurrence: occurrence.into(),
            span: None,
            entity_type: None,
            probability: None,
            origin,
        }
    }

    pub fn from_group(group: &CandidateGroup, resources: &LanguageResources) -> Self {
        Self::new(group.surface_text(resources), group.origin)
    }

    pub fn is_resolved(&self) -> bool {
        self.span.is_some()
    }

    pub fn start(&self) -> Option<usize> {
        self.span.map(|s| s.start)
    }

    pub fn end(&self) -> Option<usize> {
        self.span.map(|s| s.end)
    }

    /// `TIMEX` para tipos temporais, `ENAMEX` para o resto.
    pub fn kind(&self, resources: &LanguageResources) -> EntityKind {
        match &self.entity_type {
            Some(t) if resources.timex_types.contains(t) => EntityKind::Timex,
            _ => EntityKind::Enamex,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ro() -> LanguageResources {
        LanguageResources::builtin("ro").unwrap()
    }

    #[test]
    fn test_surface_text_keeps_inner_delicate() {
        let mut g = CandidateGroup::new(Token::new("Banca", "bancă", "Ncfsrn"), CandidateOrigin::Rules);
        g.push(Token::new("de", "de", "Spsa"));
        g.push(Token::new("Stat", "stat", "Np"));
        assert_eq!(g.surface_text(&ro()), "Banca de Stat");
    }

    #[test]
    fn test_surface_text_drops_trailing_delicate() {
        let mut g = CandidateGroup::new(Token::new("Ion", "ion", "Np"), CandidateOrigin::Rules);
        g.push(Token::new("de", "de", "Spsa"));
        assert_eq!(g.surface_text(&ro()), "Ion");
    }

    #[test]
    fn test_surface_text_splits_multiword() {
        let g = CandidateGroup::new(Token::new("New_York", "new_york", "Np"), CandidateOrigin::Rules);
        assert_eq!(g.surface_text(&ro()), "New York");
    }

    #[test]
    fn test_kind_from_type() {
        let res = ro();
        let mut e = NamedEntity::new("15 ianuarie 2020", CandidateOrigin::Date);
        assert_eq!(e.kind(&res), EntityKind::Enamex);
        e.entity_type = Some("DATE".into());
        assert_eq!(e.kind(&res).tag_name(), "TIMEX");
        e.entity_type = Some("PERSON".into());
        assert_eq!(e.kind(&res).tag_name(), "ENAMEX");
    }
}
