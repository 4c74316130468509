//! # Processamento de Documentos
//!
//! Um documento chega em um de dois formatos:
//! - **Já anotado** (XCES): os blocos `<seg lang="..">` são lidos diretamente.
//! - **Texto cru**: passa por restauração de diacríticos (opcional, só romeno),
//!   normalização, segmentação em sentenças e pelo serviço de pré-processamento,
//!   uma sentença por chamada.
//!
//! A saída tem uma linha por sentença, na ordem do documento.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::annotation::segments;
use crate::error::Result;
use crate::pipeline::{Annotator, SentenceAnnotation};
use crate::segment::{normalize_text, split_sentences};
use crate::serializer::SerializeOptions;
use crate::services::{DiacriticRestorer, Preprocessor};

/// Idioma cujo texto passa pelo restaurador de diacríticos.
const DIACRITICS_LANGUAGE: &str = "ro";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    pub serialize: SerializeOptions,
    /// Tenta restaurar os diacríticos antes do pré-processamento.
    pub restore_diacritics: bool,
    /// Anota as sentenças em paralelo (a ordem da saída é mantida).
    pub parallel: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnnotation {
    pub sentences: Vec<SentenceAnnotation>,
}

impl DocumentAnnotation {
    pub fn entity_count(&self) -> usize {
        self.sentences.iter().map(|s| s.entities.len()).sum()
    }

    /// Uma linha por sentença.
    pub fn to_output(&self) -> String {
        let mut out = String::new();
        for sentence in &self.sentences {
            out.push_str(&sentence.markup);
            out.push('\n');
        }
        out
    }
}

pub struct DocumentProcessor {
    annotator: Annotator,
    lang: String,
    preprocessor: Arc<dyn Preprocessor>,
    restorer: Option<Arc<dyn DiacriticRestorer>>,
    options: ProcessOptions,
}

impl DocumentProcessor {
    pub fn new(annotator: Annotator, preprocessor: Arc<dyn Preprocessor>, options: ProcessOptions) -> Self {
        let lang = annotator.resources().code.clone();
        Self {
            annotator,
            lang,
            preprocessor,
            restorer: None,
            options,
        }
    }

    pub fn with_restorer(mut self, restorer: Arc<dyn DiacriticRestorer>) -> Self {
        self.restorer = Some(restorer);
        self
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Documento XCES: cada `<seg>` do idioma é uma sentença.
    pub fn process_annotated(&self, document: &str) -> Result<DocumentAnnotation> {
        let blocks = segments(document, &self.lang)?;
        debug!(sentences = blocks.len(), lang = %self.lang, "documento anotado");
        Ok(self.annotate_blocks(&blocks))
    }

    /// Anota blocos de sentença já separados, na ordem recebida.
    pub fn annotate_blocks(&self, blocks: &[&str]) -> DocumentAnnotation {
        let annotate = |block: &&str| self.annotator.annotate_markup(block, &self.options.serialize);
        let sentences = if self.options.parallel {
            blocks.par_iter().map(annotate).collect()
        } else {
            blocks.iter().map(annotate).collect()
        };
        DocumentAnnotation { sentences }
    }

    /// Texto cru: restauração, segmentação e pré-processamento, depois anotação.
    pub fn process_text(&self, text: &str) -> Result<DocumentAnnotation> {
        let text = self.restore(text);
        let normalized = normalize_text(&text, self.annotator.resources());
        let sentences = split_sentences(&normalized);

        let mut xces = String::new();
        for (i, sentence) in sentences.iter().enumerate() {
            match self.preprocessor.annotate(sentence, &self.lang) {
                Ok(markup) => xces.push_str(&markup),
                Err(e) => warn!(error = %e, sentence = i, "pré-processamento falhou; sentença ignorada"),
            }
            debug!(progress = 100 * (i + 1) / sentences.len(), "pré-processamento");
        }
        self.process_annotated(&xces)
    }

    /// Lê `input`, anota e grava uma linha por sentença em `output`.
    pub fn process_file(&self, input: &Path, output: &Path, already_processed: bool) -> Result<DocumentAnnotation> {
        let content = fs::read_to_string(input)?;
        let annotation = if already_processed {
            self.process_annotated(&content)?
        } else {
            self.process_text(&content)?
        };
        fs::write(output, annotation.to_output())?;
        info!(
            input = %input.display(),
            sentences = annotation.sentences.len(),
            entities = annotation.entity_count(),
            "documento anotado"
        );
        Ok(annotation)
    }

    fn restore(&self, text: &str) -> String {
        if !self.options.restore_diacritics || self.lang != DIACRITICS_LANGUAGE {
            return text.to_string();
        }
        let Some(restorer) = &self.restorer else {
            warn!("restauração de diacríticos pedida sem serviço configurado");
            return text.to_string();
        };
        match restorer.restore(text) {
            Ok(restored) => restored,
            Err(e) => {
                warn!(error = %e, "restauração de diacríticos indisponível; seguindo com o texto original");
                text.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NeraError;
    use crate::maxent::{Classifier, Score};
    use crate::resources::LanguageResources;
    use std::sync::Mutex;

    struct PersonClassifier;

    impl Classifier for PersonClassifier {
        fn score(&self, _features: &[String]) -> Option<Score> {
            Some(Score { label: "PERSON".into(), probability: 1.0 })
        }

        fn labels(&self) -> Vec<String> {
            vec!["PERSON".into()]
        }
    }

    /// Marca cada palavra capitalizada como nome próprio e registra as chamadas.
    #[derive(Default)]
    struct FakePreprocessor {
        calls: Mutex<Vec<String>>,
    }

    impl Preprocessor for FakePreprocessor {
        fn annotate(&self, text: &str, lang: &str) -> Result<String> {
            self.calls.lock().unwrap().push(text.to_string());
            if text.contains("EROARE") {
                return Err(NeraError::service("timeout"));
            }
            let mut out = format!(r#"<seg lang="{lang}"><s>"#);
            for word in text.trim_end_matches('.').split_whitespace() {
                let pos = if word.starts_with(char::is_uppercase) { "Np" } else { "Vmip3s" };
                out.push_str(&format!(r#"<w lemma="{}" ana="{pos}">{word}</w>"#, word.to_lowercase()));
            }
            out.push_str("<c>.</c></s></seg>");
            Ok(out)
        }
    }

    struct FailingRestorer;

    impl DiacriticRestorer for FailingRestorer {
        fn restore(&self, _text: &str) -> Result<String> {
            Err(NeraError::service("indisponível"))
        }
    }

    struct UpperRestorer;

    impl DiacriticRestorer for UpperRestorer {
        fn restore(&self, text: &str) -> Result<String> {
            Ok(text.replace("Iasi", "Iași"))
        }
    }

    fn processor(options: ProcessOptions, pre: Arc<FakePreprocessor>) -> DocumentProcessor {
        let annotator = Annotator::new(
            Arc::new(LanguageResources::builtin("ro").unwrap()),
            Arc::new(PersonClassifier),
        );
        DocumentProcessor::new(annotator, pre, options)
    }

    const DOC: &str = r#"<doc>
<seg lang="ro"><s><w lemma="Ion" ana="Np">Ion</w><w lemma="pleca" ana="Vmis3s">pleacă</w><c>.</c></s></seg>
<seg lang="en"><s><w lemma="John" ana="Np">John</w></s></seg>
<seg lang="ro"><s><w lemma="Ana" ana="Np">Ana<w></s></seg>
<seg lang="ro"><s><w lemma="el" ana="Pp3msr">El</w><w lemma="veni" ana="Vmis3s">vine</w></s></seg>
</doc>"#;

    #[test]
    fn test_process_annotated_document() {
        let p = processor(ProcessOptions::default(), Arc::new(FakePreprocessor::default()));
        let doc = p.process_annotated(DOC).unwrap();

        assert_eq!(doc.sentences.len(), 3);
        assert_eq!(doc.sentences[0].markup, r#"<ENAMEX TYPE="PERSON">Ion</ENAMEX> pleacă ."#);
        // Sentença malformada: só o texto
        assert!(doc.sentences[1].entities.is_empty());
        assert_eq!(doc.sentences[1].markup, "Ana");
        assert_eq!(doc.entity_count(), 1);
        assert_eq!(doc.to_output().lines().count(), 3);
    }

    #[test]
    fn test_parallel_keeps_order() {
        let options = ProcessOptions { parallel: true, ..ProcessOptions::default() };
        let sequential = processor(ProcessOptions::default(), Arc::new(FakePreprocessor::default()))
            .process_annotated(DOC)
            .unwrap();
        let parallel = processor(options, Arc::new(FakePreprocessor::default()))
            .process_annotated(DOC)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_process_text_skips_failed_sentences() {
        let pre = Arc::new(FakePreprocessor::default());
        let p = processor(ProcessOptions::default(), pre.clone());
        let doc = p.process_text("Ion pleacă.\nEROARE aici. Maria vine").unwrap();

        assert_eq!(pre.calls.lock().unwrap().len(), 3);
        assert_eq!(doc.sentences.len(), 2);
        assert!(doc.sentences[1].markup.contains(r#"<ENAMEX TYPE="PERSON">Maria</ENAMEX>"#));
    }

    #[test]
    fn test_diacritic_failure_falls_back() {
        let options = ProcessOptions { restore_diacritics: true, ..ProcessOptions::default() };
        let pre = Arc::new(FakePreprocessor::default());
        let p = processor(options, pre.clone()).with_restorer(Arc::new(FailingRestorer));
        let doc = p.process_text("Ion pleacă").unwrap();
        assert_eq!(doc.sentences.len(), 1);
        assert_eq!(pre.calls.lock().unwrap()[0], "Ion pleacă.");
    }

    #[test]
    fn test_diacritic_restoration_applied() {
        let options = ProcessOptions { restore_diacritics: true, ..ProcessOptions::default() };
        let pre = Arc::new(FakePreprocessor::default());
        let p = processor(options, pre.clone()).with_restorer(Arc::new(UpperRestorer));
        p.process_text("Ion merge la Iasi").unwrap();
        // A restauração vem antes da unificação de variantes
        assert_eq!(pre.calls.lock().unwrap()[0], "Ion merge la Iaşi.");
    }
}
