//! Configuração do servidor (arquivo JSON opcional).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use nera_core::{load_classifier, Annotator, LanguageResources, SerializeOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    /// Código do idioma (tabelas de recursos e modelo).
    pub lang: String,
    /// Modelo do classificador: formato texto GIS ou JSON do MaxEnt.
    pub model: PathBuf,
    /// Diretório com `<lang>.json`; sem ele só os idiomas embutidos existem.
    pub resources_dir: Option<PathBuf>,
    /// Padrões de saída; cada requisição pode sobrescrever.
    pub serialize: SerializeOptions,
    pub parallel: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            lang: "ro".to_string(),
            model: PathBuf::from("models/roModel.txt"),
            resources_dir: None,
            serialize: SerializeOptions::default(),
            parallel: false,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("lendo configuração {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("configuração inválida em {}", path.display()))
    }

    /// Carrega recursos e modelo. Qualquer falha aqui impede o servidor de subir.
    pub fn build_annotator(&self) -> anyhow::Result<Annotator> {
        let resources = LanguageResources::load(&self.lang, self.resources_dir.as_deref())
            .with_context(|| format!("recursos do idioma {:?}", self.lang))?;
        let classifier = load_classifier(&self.model)
            .with_context(|| format!("modelo {}", self.model.display()))?;
        Ok(Annotator::new(Arc::new(resources), classifier))
    }
}
