//! # Recursos por Idioma
//!
//! Todas as listas que as regras consultam vivem aqui, injetadas no pipeline em vez de
//! fixadas no código: etiquetas POS permitidas, o subconjunto "delicado" (palavras
//! funcionais que só podem continuar uma cadeia), substantivos comuns que sugerem
//! entidade, meses, conjunções de correção, preposições de localização e vogais.
//!
//! O crate traz tabelas embutidas para `ro` e `en`. Outros idiomas são lidos de
//! `<dir>/<código>.json` com o mesmo formato serializado de [`LanguageResources`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{NeraError, Result};

/// Códigos com tabelas embutidas.
pub const BUILTIN_LANGUAGES: &[&str] = &["ro", "en"];

/// Tabelas de configuração de um idioma. Somente leitura depois de carregadas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageResources {
    /// Código do idioma (ex: "ro").
    pub code: String,
    /// Etiquetas POS que podem formar entidades genéricas.
    pub pos_allow: HashSet<String>,
    /// Etiquetas que só continuam uma cadeia já ativa (nunca a iniciam).
    pub pos_delicate: HashSet<String>,
    /// Nome próprio e palavra estrangeira.
    pub pos_proper: HashSet<String>,
    /// Lemas de substantivos comuns que, capitalizados, indicam entidade (ex: "universitate").
    pub common_entities: HashSet<String>,
    /// Nomes de meses em minúsculas.
    pub months: HashSet<String>,
    /// Conjunções que nunca entram numa entidade, mesmo capitalizadas.
    pub correction_words: HashSet<String>,
    /// Formas excluídas da regra de continuação genérica (ex: "în").
    pub no_continuation: HashSet<String>,
    /// Preposições que sugerem que a palavra capitalizada seguinte é um local.
    pub location_clues: HashSet<String>,
    /// Vogais, incluindo variantes do idioma.
    pub vowels: HashSet<char>,
    /// Prefixo das etiquetas de numeral.
    pub numeral_prefix: String,
    /// Prefixo (case-insensitive) das etiquetas de verbo principal.
    pub main_verb_prefix: String,
    /// Delimitador interno das unidades multipalavra (ex: "New_York").
    pub multiword_delimiter: char,
    /// Substituições de caracteres aplicadas às visões crua e de features.
    pub char_folds: Vec<(char, char)>,
    /// Tipos classificados que viram `TIMEX` na saída.
    pub timex_types: HashSet<String>,
    /// Emite dia+mês como candidato de data quando o ano não aparece.
    pub emit_partial_dates: bool,
}

impl Default for LanguageResources {
    fn default() -> Self {
        Self {
            code: String::new(),
            pos_allow: HashSet::new(),
            pos_delicate: HashSet::new(),
            pos_proper: HashSet::new(),
            common_entities: HashSet::new(),
            months: HashSet::new(),
            correction_words: HashSet::new(),
            no_continuation: HashSet::new(),
            location_clues: HashSet::new(),
            vowels: "aeiou".chars().collect(),
            numeral_prefix: "M".to_string(),
            main_verb_prefix: "vm".to_string(),
            multiword_delimiter: '_',
            char_folds: Vec::new(),
            timex_types: set(&["TIME", "DATE"]),
            emit_partial_dates: false,
        }
    }
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Etiquetas MULTEXT-East compartilhadas pelos idiomas embutidos.
fn multext_base(code: &str) -> LanguageResources {
    LanguageResources {
        code: code.to_string(),
        pos_allow: set(&["Np", "Yn", "Ncmsvn", "X", "Spsa"]),
        pos_delicate: set(&["X", "Spsa", "Rw"]),
        pos_proper: set(&["Np", "Yn"]),
        ..LanguageResources::default()
    }
}

impl LanguageResources {
    /// Tabelas embutidas para o código, se existirem.
    pub fn builtin(code: &str) -> Option<Self> {
        match code {
            "ro" => Some(Self {
                common_entities: set(&[
                    "papă", "suveran", "britan", "universitate", "agenție",
                    "internațional", "național", "institut",
                ]),
                months: set(&[
                    "ianuarie", "februarie", "martie", "aprilie", "mai", "iunie", "iulie",
                    "august", "septembrie", "octombrie", "noiembrie", "decembrie",
                ]),
                correction_words: set(&["şi", "și", "sau"]),
                no_continuation: set(&["în"]),
                location_clues: set(&["de", "la", "spre", "în"]),
                vowels: "aeiouăîâ".chars().collect(),
                char_folds: vec![('ș', 'ş'), ('ț', 'ţ'), ('Ș', 'Ş'), ('Ț', 'Ţ')],
                ..multext_base("ro")
            }),
            "en" => Some(Self {
                common_entities: set(&[
                    "pope", "university", "agency", "international", "national", "institute",
                ]),
                months: set(&[
                    "january", "february", "march", "april", "may", "june", "july",
                    "august", "september", "october", "november", "december",
                ]),
                correction_words: set(&["and", "or"]),
                no_continuation: set(&["in"]),
                location_clues: set(&["from", "to", "towards", "in"]),
                ..multext_base("en")
            }),
            _ => None,
        }
    }

    /// Carrega as tabelas do idioma.
    ///
    /// Um arquivo `<dir>/<code>.json` tem precedência sobre as tabelas embutidas.
    /// Sem arquivo e sem tabela embutida, o idioma não é suportado (erro fatal).
    pub fn load(code: &str, dir: Option<&Path>) -> Result<Self> {
        let code = code.to_lowercase();
        if let Some(dir) = dir {
            let path = dir.join(format!("{code}.json"));
            if path.is_file() {
                let text = fs::read_to_string(&path)?;
                let mut resources: LanguageResources = serde_json::from_str(&text)?;
                if resources.code.is_empty() {
                    resources.code = code.clone();
                }
                resources.validate()?;
                info!(language = %code, path = %path.display(), "recursos de idioma carregados");
                return Ok(resources);
            }
        }
        Self::builtin(&code).ok_or(NeraError::UnsupportedLanguage(code))
    }

    /// Verifica se as tabelas obrigatórias estão presentes.
    pub fn validate(&self) -> Result<()> {
        if self.pos_allow.is_empty() {
            return Err(NeraError::Resources(format!("{}: pos_allow vazio", self.code)));
        }
        if self.months.is_empty() {
            return Err(NeraError::Resources(format!("{}: months vazio", self.code)));
        }
        if self.vowels.is_empty() {
            return Err(NeraError::Resources(format!("{}: vowels vazio", self.code)));
        }
        Ok(())
    }

    pub fn is_delicate(&self, pos: &str) -> bool {
        self.pos_delicate.contains(pos)
    }

    pub fn is_proper(&self, pos: &str) -> bool {
        self.pos_proper.contains(pos)
    }

    pub fn is_numeral(&self, pos: &str) -> bool {
        !self.numeral_prefix.is_empty() && pos.starts_with(self.numeral_prefix.as_str())
    }

    pub fn is_main_verb(&self, pos: &str) -> bool {
        let prefix_len = self.main_verb_prefix.chars().count();
        prefix_len > 0
            && pos.chars().count() >= prefix_len
            && pos
                .chars()
                .take(prefix_len)
                .collect::<String>()
                .to_lowercase()
                == self.main_verb_prefix.to_lowercase()
    }

    pub fn is_vowel(&self, c: char) -> bool {
        c.to_lowercase().any(|l| self.vowels.contains(&l))
    }

    /// Aplica `char_folds` ao texto (ex: "ș" → "ş").
    pub fn fold(&self, text: &str) -> String {
        if self.char_folds.is_empty() {
            return text.to_string();
        }
        text.chars()
            .map(|c| {
                self.char_folds
                    .iter()
                    .find(|(from, _)| *from == c)
                    .map(|(_, to)| *to)
                    .unwrap_or(c)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_languages() {
        for code in BUILTIN_LANGUAGES {
            let res = LanguageResources::builtin(code).unwrap();
            assert!(res.validate().is_ok());
            assert!(res.pos_allow.contains("Np"));
        }
        assert!(LanguageResources::builtin("xx").is_none());
    }

    #[test]
    fn test_unknown_language_is_error() {
        let err = LanguageResources::load("xx", None).unwrap_err();
        assert!(matches!(err, NeraError::UnsupportedLanguage(code) if code == "xx"));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("nera-res-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let json = r#"{"pos_allow": ["Np"], "months": ["enero"], "vowels": ["a", "e"]}"#;
        fs::write(dir.join("es.json"), json).unwrap();

        let res = LanguageResources::load("ES", Some(&dir)).unwrap();
        assert_eq!(res.code, "es");
        assert!(res.months.contains("enero"));
        // Campos ausentes recebem os padrões
        assert_eq!(res.numeral_prefix, "M");
        assert!(res.timex_types.contains("DATE"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fold_and_predicates() {
        let ro = LanguageResources::builtin("ro").unwrap();
        assert_eq!(ro.fold("Țara și"), "Ţara şi");
        assert!(ro.is_main_verb("Vmip3s"));
        assert!(!ro.is_main_verb("Va"));
        assert!(ro.is_numeral("Mc"));
        assert!(ro.is_vowel('Ă'));
        assert!(!ro.is_vowel('b'));
    }
}
