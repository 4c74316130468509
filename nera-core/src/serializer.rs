//! Reconstrução da sentença com as tags de entidade.
//!
//! Percorre os nós anotados em ordem (antes da divisão multipalavra) com um ponteiro
//! para a lista de entidades resolvidas, ordenadas por início e sem sobreposição.
//! Abre `<ENAMEX TYPE="..">` ou `<TIMEX TYPE="..">` no nó inicial e fecha no nó final.

use serde::{Deserialize, Serialize};

use crate::annotation::Sentence;
use crate::entity::NamedEntity;
use crate::resources::LanguageResources;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    /// Emite a marcação original de cada nó em vez do texto achatado.
    pub preserve_markup: bool,
    /// Envolve a sentença em `<sent>..</sent>`.
    pub wrap_sentence: bool,
}

impl SerializeOptions {
    /// Modo "manter anotação": marcação original dentro de `<sent>`.
    pub fn keep_annotation() -> Self {
        Self {
            preserve_markup: true,
            wrap_sentence: true,
        }
    }
}

/// Serializa a sentença. Entidades sem span ou sem tipo são ignoradas.
pub fn serialize(
    sentence: &Sentence,
    entities: &[NamedEntity],
    resources: &LanguageResources,
    options: &SerializeOptions,
) -> String {
    if sentence.is_empty() {
        return String::new();
    }

    let tagged: Vec<(&NamedEntity, usize, usize, &str)> = entities
        .iter()
        .filter_map(|e| {
            let span = e.span?;
            Some((e, span.start, span.end, e.entity_type.as_deref()?))
        })
        .collect();

    let mut units = Vec::with_capacity(sentence.len());
    let mut next = 0;

    for (position, node) in sentence.nodes.iter().enumerate() {
        let mut unit = String::new();
        let current = tagged.get(next);

        if let Some(&(entity, start, _, entity_type)) = current {
            if position == start {
                unit.push_str(&format!("<{} TYPE=\"{}\">", entity.kind(resources).tag_name(), entity_type));
            }
        }

        if options.preserve_markup {
            unit.push_str(&node.markup);
        } else {
            unit.push_str(&node.node.text().replace(resources.multiword_delimiter, " "));
        }

        if let Some(&(entity, _, end, _)) = current {
            if position == end {
                unit.push_str(&format!("</{}>", entity.kind(resources).tag_name()));
                next += 1;
            }
        }
        units.push(unit);
    }

    let body = units.join(" ");
    if options.wrap_sentence {
        format!("<sent>{body}</sent>")
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotatedWord, Node};
    use crate::entity::{CandidateOrigin, Span};

    fn ro() -> LanguageResources {
        LanguageResources::builtin("ro").unwrap()
    }

    fn sentence(words: &[(&str, &str, &str)]) -> Sentence {
        Sentence::from_nodes(
            words
                .iter()
                .map(|(o, l, p)| Node::Word(AnnotatedWord::new(o, l, p)))
                .collect(),
        )
    }

    fn typed(text: &str, start: usize, end: usize, ty: &str) -> NamedEntity {
        let mut e = NamedEntity::new(text, CandidateOrigin::Rules);
        e.span = Some(Span { start, end });
        e.entity_type = Some(ty.to_string());
        e
    }

    #[test]
    fn test_single_token_entity() {
        let s = sentence(&[("Ion", "ion", "Np"), ("a", "avea", "Vaip3s"), ("plecat", "pleca", "Vmp--sm")]);
        let out = serialize(&s, &[typed("Ion", 0, 0, "PERSON")], &ro(), &SerializeOptions::default());
        assert_eq!(out, r#"<ENAMEX TYPE="PERSON">Ion</ENAMEX> a plecat"#);
    }

    #[test]
    fn test_date_entity_uses_timex() {
        let s = sentence(&[("15", "15", "Mc"), ("ianuarie", "ianuarie", "Ncms-n"), ("2020", "2020", "Mc")]);
        let out = serialize(&s, &[typed("15 ianuarie 2020", 0, 2, "DATE")], &ro(), &SerializeOptions::default());
        assert_eq!(out, r#"<TIMEX TYPE="DATE">15 ianuarie 2020</TIMEX>"#);
    }

    #[test]
    fn test_no_entities_round_trip() {
        let s = sentence(&[("Am", "avea", "Va"), ("ajuns", "ajunge", "Vmp"), ("la", "la", "Spsa"), ("New_York", "new_york", "Np")]);
        let out = serialize(&s, &[], &ro(), &SerializeOptions::default());
        assert_eq!(out, "Am ajuns la New York");
    }

    #[test]
    fn test_unresolved_entities_skipped() {
        let s = sentence(&[("Ion", "ion", "Np"), ("și", "și", "Crssp"), ("Maria", "maria", "Np")]);
        let mut untyped = NamedEntity::new("Ion", CandidateOrigin::Rules);
        untyped.span = Some(Span { start: 0, end: 0 });
        let entities = vec![untyped, typed("Maria", 2, 2, "PERSON")];
        let out = serialize(&s, &entities, &ro(), &SerializeOptions::default());
        assert_eq!(out, r#"Ion și <ENAMEX TYPE="PERSON">Maria</ENAMEX>"#);
    }

    #[test]
    fn test_preserve_markup_and_wrap() {
        let s = Sentence::parse(r#"<w lemma="Ion" ana="Np">Ion</w><c>.</c>"#).unwrap();
        let out = serialize(&s, &[typed("Ion", 0, 0, "PERSON")], &ro(), &SerializeOptions::keep_annotation());
        assert_eq!(
            out,
            r#"<sent><ENAMEX TYPE="PERSON"><w lemma="Ion" ana="Np">Ion</w></ENAMEX> <c>.</c></sent>"#
        );
    }

    #[test]
    fn test_empty_sentence() {
        let out = serialize(&Sentence::default(), &[], &ro(), &SerializeOptions::keep_annotation());
        assert!(out.is_empty());
    }
}
