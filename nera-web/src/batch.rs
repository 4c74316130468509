//! Driver em lote: um arquivo de listagem com um par `entrada<TAB>saída` por linha.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use nera_core::DocumentProcessor;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub documents: usize,
    pub failed: usize,
    pub sentences: usize,
    pub entities: usize,
}

/// Lê a listagem. Linhas em branco são ignoradas; linhas sem saída são avisadas e puladas.
pub fn read_listing(path: &Path) -> anyhow::Result<Vec<Job>> {
    let text = fs::read_to_string(path).with_context(|| format!("lendo listagem {}", path.display()))?;
    let mut jobs = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once('\t') {
            Some((input, output)) if !input.trim().is_empty() && !output.trim().is_empty() => jobs.push(Job {
                input: PathBuf::from(input.trim()),
                output: PathBuf::from(output.trim()),
            }),
            _ => warn!(line = idx + 1, "linha da listagem sem par entrada/saída"),
        }
    }
    Ok(jobs)
}

/// Processa todos os documentos em ordem. Um documento com erro é registrado e o lote segue.
pub fn run(jobs: &[Job], processor: &DocumentProcessor, already_processed: bool) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let total = jobs.len();

    for (i, job) in jobs.iter().enumerate() {
        match processor.process_file(&job.input, &job.output, already_processed) {
            Ok(doc) => {
                summary.documents += 1;
                summary.sentences += doc.sentences.len();
                summary.entities += doc.entity_count();
            }
            Err(e) => {
                summary.failed += 1;
                error!(input = %job.input.display(), error = %e, "falha ao anotar documento");
            }
        }
        info!(
            document = %job.input.display(),
            "concluído {:.2}%",
            100.0 * (i + 1) as f64 / total as f64
        );
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use nera_core::services::UnavailablePreprocessor;
    use nera_core::{Annotator, Classifier, LanguageResources, ProcessOptions, Score};
    use std::sync::Arc;

    struct PersonClassifier;

    impl Classifier for PersonClassifier {
        fn score(&self, _features: &[String]) -> Option<Score> {
            Some(Score { label: "PERSON".into(), probability: 1.0 })
        }

        fn labels(&self) -> Vec<String> {
            vec!["PERSON".into()]
        }
    }

    fn workdir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nera-batch-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_read_listing() {
        let dir = workdir("listing");
        let listing = dir.join("list.txt");
        fs::write(&listing, "a.xml\ta.out\n\nsem_saida.xml\nb.xml\tb.out\n").unwrap();

        let jobs = read_listing(&listing).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].output, PathBuf::from("b.out"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_run_continues_after_missing_document() {
        let dir = workdir("run");
        let input = dir.join("doc.xml");
        fs::write(&input, r#"<seg lang="ro"><w lemma="Ion" ana="Np">Ion</w><w lemma="pleca" ana="Vmis3s">pleacă</w></seg>"#).unwrap();
        let jobs = vec![
            Job { input: dir.join("absent.xml"), output: dir.join("absent.out") },
            Job { input: input.clone(), output: dir.join("doc.out") },
        ];

        let annotator = Annotator::new(Arc::new(LanguageResources::builtin("ro").unwrap()), Arc::new(PersonClassifier));
        let processor = DocumentProcessor::new(annotator, Arc::new(UnavailablePreprocessor), ProcessOptions::default());
        let summary = run(&jobs, &processor, true);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.documents, 1);
        assert_eq!(summary.entities, 1);
        let out = fs::read_to_string(dir.join("doc.out")).unwrap();
        assert_eq!(out, "<ENAMEX TYPE=\"PERSON\">Ion</ENAMEX> pleacă\n");
        fs::remove_dir_all(&dir).ok();
    }
}
