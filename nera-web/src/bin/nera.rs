//! Driver de linha de comando: anotação em lote e treino do modelo MaxEnt.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use nera_core::services::UnavailablePreprocessor;
use nera_core::training::{events_for_sentence, parse_gold, read_events, write_events, TrainingEvent};
use nera_core::{
    load_classifier, Annotator, DocumentProcessor, LanguageResources, MaxEntModel, Preprocessor, ProcessOptions,
    SerializeOptions,
};
use nera_web::batch;
use nera_web::clients::{HttpDiacriticRestorer, HttpPreprocessor};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "nera", about = "Reconhecimento de entidades nomeadas em documentos anotados")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Anota os documentos de uma listagem (`entrada<TAB>saída` por linha)
    Annotate(AnnotateArgs),
    /// Treina um modelo MaxEnt e grava em JSON
    Train(TrainArgs),
}

#[derive(Args)]
struct AnnotateArgs {
    /// Listagem de documentos
    #[arg(long)]
    input: PathBuf,
    /// Idioma dos documentos
    #[arg(long, default_value = "ro")]
    source: String,
    /// Modelo do classificador (GIS texto ou MaxEnt JSON); padrão `models/<idioma>Model.txt`
    #[arg(long)]
    model: Option<PathBuf>,
    /// Diretório com tabelas de recursos `<idioma>.json`
    #[arg(long)]
    resources: Option<PathBuf>,
    /// Os documentos já estão em XCES
    #[arg(long)]
    already_processed: bool,
    /// Restaura diacríticos antes do pré-processamento (só romeno)
    #[arg(long)]
    diacritics: bool,
    /// Mantém a anotação original na saída, dentro de `<sent>`
    #[arg(long)]
    keep: bool,
    /// Anota as sentenças de cada documento em paralelo
    #[arg(long)]
    parallel: bool,
    /// URL do serviço de pré-processamento
    #[arg(long, env = "NERA_PREPROCESS_URL")]
    preprocess_url: Option<String>,
    /// URL do serviço de diacríticos
    #[arg(long, env = "NERA_DIACRITICS_URL")]
    diacritics_url: Option<String>,
}

#[derive(Args)]
struct TrainArgs {
    /// Eventos já extraídos, um por linha
    #[arg(long, conflicts_with = "corpus")]
    events: Option<PathBuf>,
    /// Sentenças XCES com entidades de referência, uma por linha
    #[arg(long)]
    corpus: Option<PathBuf>,
    /// Idioma do corpus
    #[arg(long, default_value = "ro")]
    lang: String,
    #[arg(long)]
    resources: Option<PathBuf>,
    /// Grava os eventos gerados do corpus
    #[arg(long)]
    write_events: Option<PathBuf>,
    #[arg(long)]
    output: PathBuf,
    #[arg(long, default_value_t = 100)]
    iterations: usize,
    #[arg(long, default_value_t = 0.1)]
    rate: f64,
    #[arg(long, default_value_t = 0.0001)]
    lambda: f64,
}

fn main() -> anyhow::Result<()> {
    nera_web::init_tracing();
    match Cli::parse().command {
        Command::Annotate(args) => annotate(args),
        Command::Train(args) => train(args),
    }
}

fn annotate(args: AnnotateArgs) -> anyhow::Result<()> {
    // Recursos e modelo primeiro: sem eles nenhum documento é processado
    let resources = LanguageResources::load(&args.source, args.resources.as_deref())
        .with_context(|| format!("recursos do idioma {:?}", args.source))?;
    let model_path = args
        .model
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("models/{}Model.txt", args.source)));
    let classifier = load_classifier(&model_path).with_context(|| format!("modelo {}", model_path.display()))?;
    let annotator = Annotator::new(Arc::new(resources), classifier);

    let preprocessor: Arc<dyn Preprocessor> = match (&args.preprocess_url, args.already_processed) {
        (Some(url), _) => Arc::new(HttpPreprocessor::new(url.as_str())?),
        (None, true) => Arc::new(UnavailablePreprocessor),
        (None, false) => bail!("texto cru exige --preprocess-url (ou use --already-processed)"),
    };

    let options = ProcessOptions {
        serialize: if args.keep { SerializeOptions::keep_annotation() } else { SerializeOptions::default() },
        restore_diacritics: args.diacritics,
        parallel: args.parallel,
    };
    let mut processor = DocumentProcessor::new(annotator, preprocessor, options);
    match (&args.diacritics_url, args.diacritics) {
        (Some(url), true) => processor = processor.with_restorer(Arc::new(HttpDiacriticRestorer::new(url.as_str())?)),
        (None, true) => warn!("--diacritics sem --diacritics-url; o texto segue sem restauração"),
        _ => {}
    }

    let jobs = batch::read_listing(&args.input)?;
    let summary = batch::run(&jobs, &processor, args.already_processed);
    info!(
        documents = summary.documents,
        failed = summary.failed,
        sentences = summary.sentences,
        entities = summary.entities,
        "lote concluído"
    );
    if summary.failed > 0 && summary.documents == 0 {
        bail!("nenhum documento anotado");
    }
    Ok(())
}

fn train(args: TrainArgs) -> anyhow::Result<()> {
    let events: Vec<TrainingEvent> = match (&args.events, &args.corpus) {
        (Some(path), _) => {
            let file = File::open(path).with_context(|| format!("abrindo {}", path.display()))?;
            read_events(BufReader::new(file))?
        }
        (None, Some(path)) => {
            let resources = LanguageResources::load(&args.lang, args.resources.as_deref())?;
            let file = File::open(path).with_context(|| format!("abrindo {}", path.display()))?;
            let mut events = Vec::new();
            for (idx, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match parse_gold(&line) {
                    Ok((sentence, gold)) => events.extend(events_for_sentence(&sentence, &gold, &resources)),
                    Err(e) => warn!(line = idx + 1, error = %e, "sentença de referência ignorada"),
                }
            }
            if let Some(out) = &args.write_events {
                write_events(BufWriter::new(File::create(out)?), &events)?;
            }
            events
        }
        (None, None) => bail!("informe --events ou --corpus"),
    };

    info!(events = events.len(), iterations = args.iterations, "treinando MaxEnt");
    let mut model = MaxEntModel::new();
    model.train(&events, args.iterations, args.rate, args.lambda)?;
    model.save(&args.output)?;
    info!(output = %args.output.display(), "modelo gravado");
    Ok(())
}
