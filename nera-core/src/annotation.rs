//! # Fluxo Anotado (XCES)
//!
//! O serviço externo de pré-processamento devolve cada sentença como um bloco
//! `<seg lang="..">` contendo elementos de palavra e de separação:
//!
//! ```text
//! <seg lang="ro"><s><w lemma="Ion" ana="Np" chunk="Np#1">Ion</w>
//! <w lemma="avea" ana="Va--3s">a</w><w lemma="pleca" ana="Vmp--sm">plecat</w><c>.</c></s></seg>
//! ```
//!
//! Este módulo faz uma única leitura da marcação e deriva dela as três visões que o
//! pipeline precisa:
//!
//! 1. **Nós** ([`SentenceNode`]): palavras e separadores, em ordem, com a marcação original.
//! 2. **Tokens** ([`Token`]): uma entrada por nó (forma, lema, POS) para as features.
//! 3. **Tokens crus** ([`RawTokens`]): cada nó dividido no delimitador multipalavra
//!    (`New_York` → `New`, `York`), cada parte apontando para a posição do nó.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{NeraError, Result};
use crate::resources::LanguageResources;

static ELEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w\b([^>]*)>(.*?)</w>|<c\b[^>]*>(.*?)</c>").expect("regex de elementos")
});
static OPEN_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[wc][\s>]").expect("regex de abertura"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-\w:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("regex de atributos")
});
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#?[A-Za-z0-9._]+);").expect("regex de entidades"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("regex de tags"));

/// Token da visão de features: forma, lema e POS. Imutável depois de criado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub occurrence: String,
    pub lemma: String,
    pub pos: String,
}

impl Token {
    pub fn new(occurrence: impl Into<String>, lemma: impl Into<String>, pos: impl Into<String>) -> Self {
        Self {
            occurrence: occurrence.into(),
            lemma: lemma.into(),
            pos: pos.into(),
        }
    }
}

/// Elemento `<w>`: palavra com lema, POS e chunk opcional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedWord {
    pub occurrence: String,
    /// Lema em minúsculas, sem o prefixo de desambiguação (`"(x)lema"` → `lema`).
    pub lemma: String,
    pub pos: String,
    pub chunk: Option<String>,
}

impl AnnotatedWord {
    pub fn new(occurrence: &str, lemma: &str, pos: &str) -> Self {
        Self {
            occurrence: occurrence.to_string(),
            lemma: normalize_lemma(lemma),
            pos: pos.to_string(),
            chunk: None,
        }
    }

    pub fn with_chunk(mut self, chunk: &str) -> Self {
        self.chunk = Some(chunk.to_string());
        self
    }

    pub fn to_token(&self) -> Token {
        Token::new(&self.occurrence, &self.lemma, &self.pos)
    }
}

/// Item do fluxo anotado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Word(AnnotatedWord),
    /// Elemento `<c>`: pontuação ou fronteira, sem lema nem POS.
    Separator { text: String },
}

impl Node {
    /// Texto de superfície do nó.
    pub fn text(&self) -> &str {
        match self {
            Node::Word(w) => &w.occurrence,
            Node::Separator { text } => text,
        }
    }
}

/// Nó com a marcação de origem preservada (para a saída com `preserve_markup`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceNode {
    pub node: Node,
    pub markup: String,
}

/// Fluxo cru: tokens depois da divisão multipalavra e a posição do nó de cada um.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTokens {
    pub tokens: Vec<String>,
    pub positions: Vec<usize>,
}

impl RawTokens {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Uma sentença anotada.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub nodes: Vec<SentenceNode>,
}

impl Sentence {
    /// Constrói uma sentença a partir de nós já estruturados, gerando a marcação XCES.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|node| {
                let markup = render_markup(&node);
                SentenceNode { node, markup }
            })
            .collect();
        Self { nodes }
    }

    /// Lê os elementos `<w>` e `<c>` de um bloco de marcação (tipicamente um `<seg>`).
    pub fn parse(xml: &str) -> Result<Self> {
        let cleaned: String = xml
            .chars()
            .filter(|c| !matches!(c, '\u{1}' | '\u{8}' | '\u{1b}'))
            .collect();

        let mut nodes = Vec::new();
        for caps in ELEMENT_RE.captures_iter(&cleaned) {
            let markup = caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_string();

            let node = if let Some(inner) = caps.get(2) {
                let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let occurrence = inner_text(inner.as_str())?;
                let lemma = attribute(attrs, "lemma")?;
                let chunk = attribute(attrs, "chunk")?;
                let word = match lemma {
                    Some(lemma) => AnnotatedWord {
                        lemma: normalize_lemma(&lemma),
                        pos: attribute(attrs, "ana")?.unwrap_or_default(),
                        occurrence,
                        chunk,
                    },
                    // Sem lema o elemento é tratado como pontuação; o lema é a própria forma
                    None => AnnotatedWord {
                        lemma: occurrence.clone(),
                        pos: "PUNCT".to_string(),
                        occurrence,
                        chunk,
                    },
                };
                Node::Word(word)
            } else {
                let inner = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
                Node::Separator {
                    text: inner_text(inner)?,
                }
            };
            nodes.push(SentenceNode { node, markup });
        }

        let opened = OPEN_TAG_RE.find_iter(&cleaned).count();
        if opened != nodes.len() {
            return Err(NeraError::sentence(format!(
                "{} elementos abertos, {} fechados",
                opened,
                nodes.len()
            )));
        }

        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visão de features: um [`Token`] por nó, com `char_folds` aplicado.
    /// Separadores recebem POS `"_"` e lema igual à forma.
    pub fn tokens(&self, resources: &LanguageResources) -> Vec<Token> {
        self.nodes
            .iter()
            .map(|n| match &n.node {
                Node::Word(w) => Token::new(
                    resources.fold(&w.occurrence),
                    resources.fold(&w.lemma),
                    w.pos.clone(),
                ),
                Node::Separator { text } => {
                    let folded = resources.fold(text);
                    Token::new(folded.clone(), folded, "_")
                }
            })
            .collect()
    }

    /// Visão crua: divide cada nó no delimitador multipalavra.
    pub fn raw_tokens(&self, resources: &LanguageResources) -> RawTokens {
        let mut raw = RawTokens::default();
        for (position, n) in self.nodes.iter().enumerate() {
            let folded = resources.fold(n.node.text());
            for part in folded.split(resources.multiword_delimiter) {
                raw.tokens.push(part.to_string());
                raw.positions.push(position);
            }
        }
        raw
    }

    /// Texto achatado: formas dos nós separadas por um espaço.
    pub fn raw_text(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.node.text())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Extrai os blocos `<seg lang="..">` do documento, em ordem.
pub fn segments<'a>(document: &'a str, lang: &str) -> Result<Vec<&'a str>> {
    let pattern = format!(r#"(?s)<seg lang="{}">.+?</seg>"#, regex::escape(lang));
    let re = Regex::new(&pattern).map_err(|e| NeraError::Resources(e.to_string()))?;
    Ok(re.find_iter(document).map(|m| m.as_str()).collect())
}

/// Remove toda a marcação de um bloco e normaliza os espaços.
/// Usado quando a sentença não pôde ser lida.
pub fn strip_markup(xml: &str) -> String {
    TAG_RE
        .replace_all(xml, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"(a)Lema"` → `"lema"`.
pub fn normalize_lemma(lemma: &str) -> String {
    let lower = lemma.to_lowercase();
    match lower.find(')') {
        Some(idx) => lower[idx + 1..].to_string(),
        None => lower,
    }
}

fn attribute(attrs: &str, name: &str) -> Result<Option<String>> {
    for caps in ATTR_RE.captures_iter(attrs) {
        if &caps[1] == name {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            return decode_entities(value).map(Some);
        }
    }
    Ok(None)
}

fn inner_text(raw: &str) -> Result<String> {
    if raw.contains('<') {
        return Err(NeraError::sentence(format!("marcação inesperada em {raw:?}")));
    }
    decode_entities(raw)
}

/// Decodifica referências XML e as entidades SGML latinas emitidas pelo pré-processador.
pub fn decode_entities(text: &str) -> Result<String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in ENTITY_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        let name = &caps[1];
        let decoded = if let Some(num) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
            u32::from_str_radix(num, 16).ok().and_then(char::from_u32)
        } else if let Some(num) = name.strip_prefix('#') {
            num.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            named_entity(name)
        };
        match decoded {
            Some(c) => out.push(c),
            None => return Err(NeraError::sentence(format!("entidade desconhecida &{name};"))),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "abreve" => 'ă',
        "Abreve" => 'Ă',
        "acirc" => 'â',
        "Acirc" => 'Â',
        "icirc" => 'î',
        "Icirc" => 'Î',
        "scedil" => 'ş',
        "Scedil" => 'Ş',
        "tcedil" => 'ţ',
        "Tcedil" => 'Ţ',
        "scommabelow" => 'ș',
        "Scommabelow" => 'Ș',
        "tcommabelow" => 'ț',
        "Tcommabelow" => 'Ț',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "agrave" => 'à',
        "egrave" => 'è',
        "auml" => 'ä',
        "ouml" => 'ö',
        "uuml" => 'ü',
        "ccedil" => 'ç',
        "ntilde" => 'ñ',
        "szlig" => 'ß',
        "hellip" => '…',
        "ndash" => '–',
        "mdash" => '—',
        "laquo" => '«',
        "raquo" => '»',
        "bdquo" => '„',
        "rdquo" => '”',
        "ldquo" => '“',
        _ => return None,
    };
    Some(c)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_markup(node: &Node) -> String {
    match node {
        Node::Word(w) => {
            let chunk = w
                .chunk
                .as_ref()
                .map(|c| format!(r#" chunk="{}""#, escape(c)))
                .unwrap_or_default();
            format!(
                r#"<w lemma="{}" ana="{}"{}>{}</w>"#,
                escape(&w.lemma),
                escape(&w.pos),
                chunk,
                escape(&w.occurrence)
            )
        }
        Node::Separator { text } => format!("<c>{}</c>", escape(text)),
    }
}
