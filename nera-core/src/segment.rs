//! # Segmentação de Sentenças
//!
//! Usado apenas no caminho de pré-processamento (texto cru → serviço XCES), que anota
//! uma sentença por chamada.
//!
//! A divisão parte das fronteiras de sentença Unicode (UAX #29) e as recombina
//! quando a fronteira não é plausível:
//! - a pontuação final vem depois de uma inicial ou abreviação curta (`J.`, `Dr.`,
//!   `Mr.`: maiúscula seguida de no máximo duas consoantes);
//! - o próximo trecho não começa com maiúscula, colchete, parêntese ou aspas.

use unicode_segmentation::UnicodeSegmentation;

use crate::resources::LanguageResources;

const TERMINALS: [char; 3] = ['.', '!', '?'];
const ABBREVIATION_CONSONANTS: &str = "bcdfgjklmnprstvxz";

/// Normaliza o texto antes da segmentação.
///
/// Quebras de linha viram fim de sentença, espaços repetidos colapsam, `" ."` e `".."`
/// viram `"."`, o texto termina com pontuação e as variantes de diacríticos são unificadas.
pub fn normalize_text(text: &str, resources: &LanguageResources) -> String {
    let mut text = resources.fold(&text.replace('\r', "").replace('\n', ". "));
    if text.trim().is_empty() {
        return String::new();
    }
    if !text.ends_with(TERMINALS) {
        text.push('.');
    }
    for (from, to) in [("  ", " "), (" .", "."), ("..", ".")] {
        while text.contains(from) {
            text = text.replace(from, to);
        }
    }
    text.trim().to_string()
}

/// Divide o texto normalizado em sentenças, sem espaços nas bordas.
pub fn split_sentences(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = text.split_sentence_bounds().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    for (i, piece) in pieces.iter().enumerate() {
        current.push_str(piece);
        let closes = match pieces.get(i + 1) {
            Some(next) => is_boundary(&current, next),
            None => true,
        };
        if closes {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }
    sentences
}

fn is_boundary(current: &str, next: &str) -> bool {
    let trimmed = current.trim_end();
    if !trimmed.ends_with(TERMINALS) {
        return false;
    }
    let body = trimmed.trim_end_matches(TERMINALS);
    let last_word = body
        .rsplit(|c: char| c.is_whitespace() || c == '.')
        .next()
        .unwrap_or_default();
    if is_abbreviation(last_word) {
        return false;
    }
    next.trim_start()
        .chars()
        .next()
        .map(|c| c.is_uppercase() || matches!(c, '[' | '(' | '"' | '\''))
        .unwrap_or(false)
}

/// `"J"`, `"Dr"`, `"Mr"`, `"Str"`: maiúscula + até duas consoantes.
fn is_abbreviation(word: &str) -> bool {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let rest: Vec<char> = chars.collect();
    first.is_uppercase() && rest.len() <= 2 && rest.iter().all(|c| ABBREVIATION_CONSONANTS.contains(*c))
}
