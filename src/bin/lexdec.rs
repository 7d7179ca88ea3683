use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use lexdec_rs::mlf::{load_mlf, save_mlf};
use lexdec_rs::report::{evaluate_parts, REPORT_SCHEMA_VERSION};
use lexdec_rs::{
    EvaluationReport, LanguageModel, LexiconKind, Meta, RecognizerBuilder, RecognizerConfig,
    SearchSettings, TrainingConfig, Vocabulary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LexiconChoice {
    Trie,
    Linear,
}

impl LexiconChoice {
    fn kind(self) -> LexiconKind {
        match self {
            LexiconChoice::Trie => LexiconKind::Trie,
            LexiconChoice::Linear => LexiconKind::Linear,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "lexdec")]
#[command(about = "Lexicon-driven word decoding over phoneme recognition output")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate a bigram language model from word-level transcriptions.
    Train(TrainArgs),
    /// Decode phoneme-level transcriptions into words.
    Test(TestArgs),
    /// Score recognized words against reference transcriptions.
    Est(EstArgs),
}

#[derive(Debug, clap::Args)]
struct TrainArgs {
    /// Word-level MLF used as the training corpus.
    #[arg(long, env = "LEXDEC_TRAIN_SRC")]
    src: PathBuf,
    /// Pronunciation dictionary (`word = ph1 ph2 ...`).
    #[arg(long, env = "LEXDEC_WORDS")]
    words: PathBuf,
    /// Output language model file.
    #[arg(long, env = "LEXDEC_LANG")]
    lang: PathBuf,
    #[arg(long, env = "LEXDEC_TRAIN_LAMBDA", default_value_t = TrainingConfig::DEFAULT_LAMBDA)]
    lambda: f32,
    #[arg(long, env = "LEXDEC_TRAIN_EPS", default_value_t = TrainingConfig::DEFAULT_EPS)]
    eps: f32,
}

#[derive(Debug, clap::Args)]
struct TestArgs {
    /// Phoneme-level MLF to decode.
    #[arg(long, env = "LEXDEC_TEST_SRC")]
    src: PathBuf,
    /// Phoneme list, one name per line.
    #[arg(long, env = "LEXDEC_PHONEMES")]
    phonemes: PathBuf,
    #[arg(long, env = "LEXDEC_WORDS")]
    words: PathBuf,
    /// Phoneme confusion counts with margin row and column.
    #[arg(long, env = "LEXDEC_CONFUSION")]
    confusion: PathBuf,
    #[arg(long, env = "LEXDEC_LANG")]
    lang: PathBuf,
    /// Output word-level MLF.
    #[arg(long, env = "LEXDEC_TEST_OUT")]
    out: PathBuf,
    /// Pruning coefficient; overrides the settings file.
    #[arg(long, env = "LEXDEC_PRUNING")]
    pr: Option<f64>,
    /// Language model weight; overrides the settings file.
    #[arg(long, env = "LEXDEC_LAMBDA")]
    lambda: Option<f64>,
    #[arg(long, env = "LEXDEC_LEXICON", value_enum)]
    lexicon: Option<LexiconChoice>,
    /// JSON search settings (`pruning_coeff`, `lambda`, `lexicon`).
    #[arg(long, env = "LEXDEC_SETTINGS")]
    settings: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
struct EstArgs {
    /// Recognized word-level MLF.
    #[arg(long, env = "LEXDEC_EST_INP")]
    inp: PathBuf,
    /// Reference word-level MLF.
    #[arg(long, env = "LEXDEC_EST_CORR")]
    corr: PathBuf,
    #[arg(long, env = "LEXDEC_WORDS")]
    words: PathBuf,
    /// Optional JSON report with per-utterance counts.
    #[arg(long, env = "LEXDEC_EST_REPORT")]
    report: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Train(args) => run_train(args),
        Command::Test(args) => run_test(args),
        Command::Est(args) => run_est(args),
    };
    if let Err(message) = result {
        eprintln!("lexdec: {message}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_train(args: TrainArgs) -> Result<(), String> {
    require_path_exists(&args.src, "Training MLF not found.")?;
    require_path_exists(&args.words, "Dictionary not found.")?;
    let training = TrainingConfig {
        lambda: args.lambda,
        eps: args.eps,
    };
    training.validate().map_err(|e| e.to_string())?;

    let words = Vocabulary::load_words(&args.words).map_err(|e| e.to_string())?;
    let corpus = load_mlf(&args.src, &words).map_err(|e| e.to_string())?;
    let model = LanguageModel::train(&corpus, words.len(), training.lambda, training.eps)
        .map_err(|e| e.to_string())?;
    model.save(&args.lang).map_err(|e| e.to_string())?;
    println!(
        "{} unigrams, {} bigrams -> {}",
        model.unigrams_number(),
        model.bigrams_number(),
        args.lang.display()
    );
    Ok(())
}

fn run_test(args: TestArgs) -> Result<(), String> {
    for (path, message) in [
        (&args.src, "Phoneme MLF not found."),
        (&args.phonemes, "Phoneme list not found."),
        (&args.words, "Dictionary not found."),
        (&args.confusion, "Confusion matrix not found."),
        (&args.lang, "Language model not found."),
    ] {
        require_path_exists(path, message)?;
    }

    let mut settings = match &args.settings {
        Some(path) => SearchSettings::load(path).map_err(|e| e.to_string())?,
        None => SearchSettings::default(),
    };
    if let Some(pruning_coeff) = args.pr {
        settings.pruning_coeff = pruning_coeff;
    }
    if let Some(lambda) = args.lambda {
        settings.lambda = lambda;
    }
    if let Some(choice) = args.lexicon {
        settings.lexicon = choice.kind();
    }

    let config = RecognizerConfig {
        phonemes_path: args.phonemes.to_string_lossy().into_owned(),
        dictionary_path: args.words.to_string_lossy().into_owned(),
        confusion_path: args.confusion.to_string_lossy().into_owned(),
        language_model_path: args.lang.to_string_lossy().into_owned(),
        lexicon: settings.lexicon,
        search: settings.params(),
    };
    let recognizer = RecognizerBuilder::new(config)
        .build()
        .map_err(|e| e.to_string())?;
    let parts = load_mlf(&args.src, recognizer.phonemes()).map_err(|e| e.to_string())?;

    let progress = ProgressBar::new(parts.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("decoding");
    let recognized = recognizer.recognize_all_with(&parts, |part| {
        progress.set_message(part.name.clone());
        progress.inc(1);
    });
    progress.finish_and_clear();
    let recognized = recognized.map_err(|e| e.to_string())?;

    save_mlf(&args.out, &recognized, recognizer.words()).map_err(|e| e.to_string())?;
    println!("{} part(s) -> {}", recognized.len(), args.out.display());
    Ok(())
}

fn run_est(args: EstArgs) -> Result<(), String> {
    require_path_exists(&args.inp, "Recognized MLF not found.")?;
    require_path_exists(&args.corr, "Reference MLF not found.")?;
    require_path_exists(&args.words, "Dictionary not found.")?;

    let words = Vocabulary::load_words(&args.words).map_err(|e| e.to_string())?;
    let recognized = load_mlf(&args.inp, &words).map_err(|e| e.to_string())?;
    let reference = load_mlf(&args.corr, &words).map_err(|e| e.to_string())?;
    let (utterances, totals) =
        evaluate_parts(&recognized, &reference).map_err(|e| e.to_string())?;

    if let Some(report_path) = &args.report {
        let report = EvaluationReport {
            schema_version: REPORT_SCHEMA_VERSION,
            meta: Meta {
                generated_at: Utc::now().to_rfc3339(),
                recognized_path: args.inp.to_string_lossy().into_owned(),
                reference_path: args.corr.to_string_lossy().into_owned(),
                utterance_count: utterances.len(),
            },
            utterances,
            totals: totals.clone(),
        };
        write_report(report_path, &report)?;
    }

    let counts = totals.counts;
    println!(
        "WER: {:.2}% (words={} ins={} del={} sub={})",
        totals.word_error_rate,
        counts.reference_len,
        counts.insertions,
        counts.deletions,
        counts.substitutions
    );
    if !totals.unmatched_recognized.is_empty() {
        eprintln!(
            "lexdec: {} recognized part(s) have no reference and were not scored",
            totals.unmatched_recognized.len()
        );
    }
    Ok(())
}

fn write_report(path: &Path, report: &EvaluationReport) -> Result<(), String> {
    let mut rendered = serde_json::to_vec_pretty(report)
        .map_err(|err| format!("Failed to serialize report JSON '{}': {err}", path.display()))?;
    rendered.push(b'\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create report output directory '{}': {err}",
                parent.display()
            )
        })?;
    }
    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create report file '{}': {err}", path.display()))?;
    file.write_all(&rendered)
        .map_err(|err| format!("Failed to write report file '{}': {err}", path.display()))?;
    Ok(())
}

fn require_path_exists(path: &Path, message: &str) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    Err(format!("{message} Missing path: {}", path.display()))
}
