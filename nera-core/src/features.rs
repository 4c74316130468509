//! # Engenharia de Features para Classificação de Entidades
//!
//! Para cada entidade alinhada, gera uma sequência ordenada de features textuais que
//! o classificador MaxEnt consome. A ordem não altera a decisão do modelo, mas é
//! mantida fixa para que as saídas sejam reproduzíveis e comparáveis.
//!
//! ## Features Implementadas
//!
//! ### Contexto à esquerda
//! - `first` ou `notFirst`
//! - `prevToken=<lema>`, `prevTokenPos=<1ª letra do POS>`
//! - `prevMainVerb=<lema>`, `prevMainVerbDiff=1` quando o token imediatamente anterior
//!   é verbo principal
//!
//! ### Contexto à direita
//! - `last` ou `notLast`
//! - `nextToken=<lema>`, `nextTokenPos=<1ª letra do POS>`
//! - `nextMainVerb=<lema>`, `nextMainVerbDiff=<distância>` para o primeiro verbo
//!   principal depois da entidade
//!
//! ### Forma do texto
//! - `firstIsUpper`/`firstIsLower`, `firstIsDigit`/`firstIsLetter`
//! - `multi_word`/`single_word`, `contains_digit`/`no_digit`
//! - `caps`/`no_caps` (duas ou mais maiúsculas)
//! - `consonants`/`no_consonants` (nenhuma vogal no texto)

use serde::{Deserialize, Serialize};

use crate::annotation::Token;
use crate::entity::NamedEntity;
use crate::resources::LanguageResources;

/// Para que as features serão usadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Classificação: sem rótulo.
    Inference,
    /// Geração de eventos de treino: o tipo conhecido entra no fim.
    Training,
}

/// Sequência ordenada de features de uma entidade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<String>,
    /// Rótulo conhecido, presente apenas no modo de treino.
    pub label: Option<String>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: impl Into<String>) {
        self.features.push(feature.into());
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Linha no formato de evento: features separadas por espaço e o rótulo por último.
    pub fn to_line(&self) -> String {
        let mut line = self.features.join(" ");
        if let Some(label) = &self.label {
            line.push(' ');
            line.push_str(label);
        }
        line
    }
}

/// Extrai as features de uma entidade resolvida.
///
/// `tokens` é a visão por nó da sentença (não a crua). Devolve `None` para entidades
/// sem alinhamento ou com texto vazio.
pub fn extract_features(
    entity: &NamedEntity,
    tokens: &[Token],
    resources: &LanguageResources,
    mode: ExtractionMode,
) -> Option<FeatureVector> {
    let span = entity.span?;
    let first_char = entity.occurrence.chars().next()?;
    let mut fv = FeatureVector::new();

    // === Contexto à esquerda ===
    if span.start == 0 || span.start > tokens.len() {
        fv.push("first");
    } else {
        fv.push("notFirst");
        let prev = &tokens[span.start - 1];
        fv.push(format!("prevToken={}", prev.lemma));
        fv.push(format!("prevTokenPos={}", pos_initial(&prev.pos)));

        // Só o vizinho imediato é examinado
        if resources.is_main_verb(&prev.pos) {
            fv.push(format!("prevMainVerb={}", prev.lemma));
            fv.push("prevMainVerbDiff=1");
        }
    }

    // === Contexto à direita ===
    if span.end + 1 >= tokens.len() {
        fv.push("last");
    } else {
        fv.push("notLast");
        let next = &tokens[span.end + 1];
        fv.push(format!("nextToken={}", next.lemma));
        fv.push(format!("nextTokenPos={}", pos_initial(&next.pos)));

        if let Some((i, verb)) = tokens
            .iter()
            .enumerate()
            .skip(span.end + 1)
            .find(|(_, t)| resources.is_main_verb(&t.pos))
        {
            fv.push(format!("nextMainVerb={}", verb.lemma));
            fv.push(format!("nextMainVerbDiff={}", i - span.end));
        }
    }

    // === Forma ===
    let text = &entity.occurrence;
    fv.push(if first_char.is_uppercase() { "firstIsUpper" } else { "firstIsLower" });
    fv.push(if first_char.is_numeric() { "firstIsDigit" } else { "firstIsLetter" });
    fv.push(if text.contains(' ') { "multi_word" } else { "single_word" });
    fv.push(if text.chars().skip(1).any(char::is_numeric) { "contains_digit" } else { "no_digit" });
    fv.push(if text.chars().filter(|c| c.is_uppercase()).count() > 1 { "caps" } else { "no_caps" });
    fv.push(if text.chars().any(|c| resources.is_vowel(c)) { "no_consonants" } else { "consonants" });

    if mode == ExtractionMode::Training {
        fv.label = entity.entity_type.clone();
    }
    Some(fv)
}

fn pos_initial(pos: &str) -> String {
    pos.chars().take(1).flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CandidateOrigin, Span};

    fn tokens() -> Vec<Token> {
        vec![
            Token::new("A", "a", "Tf"),
            Token::new("vizitat", "vizita", "Vmp--sm"),
            Token::new("Banca", "bancă", "Np"),
            Token::new("Națională", "național", "Np"),
            Token::new("ieri", "ieri", "Rgp"),
            Token::new("și", "și", "Crssp"),
            Token::new("a", "avea", "Va--3s"),
            Token::new("semnat", "semna", "Vmp--sm"),
        ]
    }

    fn entity(text: &str, start: usize, end: usize) -> NamedEntity {
        let mut e = NamedEntity::new(text, CandidateOrigin::Rules);
        e.span = Some(Span { start, end });
        e
    }

    #[test]
    fn test_feature_order_in_context() {
        let ro = LanguageResources::builtin("ro").unwrap();
        let fv = extract_features(&entity("Banca Națională", 2, 3), &tokens(), &ro, ExtractionMode::Inference).unwrap();
        assert_eq!(
            fv.features,
            vec![
                "notFirst", "prevToken=vizita", "prevTokenPos=v", "prevMainVerb=vizita", "prevMainVerbDiff=1",
                "notLast", "nextToken=ieri", "nextTokenPos=r", "nextMainVerb=semna", "nextMainVerbDiff=4",
                "firstIsUpper", "firstIsLetter", "multi_word", "no_digit", "caps", "no_consonants",
            ]
        );
        assert!(fv.label.is_none());
    }

    #[test]
    fn test_sentence_boundaries() {
        let ro = LanguageResources::builtin("ro").unwrap();
        let toks = vec![Token::new("Ion", "ion", "Np")];
        let fv = extract_features(&entity("Ion", 0, 0), &toks, &ro, ExtractionMode::Inference).unwrap();
        assert!(fv.contains("first"));
        assert!(fv.contains("last"));
        assert!(!fv.features.iter().any(|f| f.starts_with("prevToken")));
    }

    #[test]
    fn test_previous_verb_only_adjacent() {
        let ro = LanguageResources::builtin("ro").unwrap();
        // Verbo principal mais atrás não gera prevMainVerb
        let fv = extract_features(&entity("Ion", 4, 4), &tokens(), &ro, ExtractionMode::Inference).unwrap();
        assert!(fv.contains("prevToken=național"));
        assert!(!fv.features.iter().any(|f| f.starts_with("prevMainVerb")));
    }

    #[test]
    fn test_shape_features() {
        let ro = LanguageResources::builtin("ro").unwrap();
        let toks = vec![Token::new("x", "x", "X")];
        let fv = extract_features(&entity("2020", 0, 0), &toks, &ro, ExtractionMode::Inference).unwrap();
        assert!(fv.contains("firstIsLower"));
        assert!(fv.contains("firstIsDigit"));
        assert!(fv.contains("contains_digit"));
        assert!(fv.contains("no_caps"));
        assert!(fv.contains("consonants"));

        let fv = extract_features(&entity("BCR", 0, 0), &toks, &ro, ExtractionMode::Inference).unwrap();
        assert!(fv.contains("caps"));
        assert!(fv.contains("consonants"));
        assert!(fv.contains("single_word"));
    }

    #[test]
    fn test_training_mode_appends_label() {
        let ro = LanguageResources::builtin("ro").unwrap();
        let mut e = entity("Ion", 0, 0);
        e.entity_type = Some("PERSON".into());
        let toks = vec![Token::new("Ion", "ion", "Np")];
        let fv = extract_features(&e, &toks, &ro, ExtractionMode::Training).unwrap();
        assert_eq!(fv.label.as_deref(), Some("PERSON"));
        assert!(fv.to_line().ends_with(" PERSON"));

        let fv = extract_features(&e, &toks, &ro, ExtractionMode::Inference).unwrap();
        assert!(!fv.to_line().contains("PERSON"));
    }

    #[test]
    fn test_unresolved_entity_has_no_features() {
        let ro = LanguageResources::builtin("ro").unwrap();
        let e = NamedEntity::new("Ion", CandidateOrigin::Rules);
        assert!(extract_features(&e, &tokens(), &ro, ExtractionMode::Inference).is_none());
    }
}
