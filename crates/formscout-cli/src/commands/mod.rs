//! Subcommands and the pieces they share.

pub mod config;
pub mod detect;
pub mod fill;

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use clap::Args;
use image::DynamicImage;
use tracing::{debug, info, warn};

use formscout_core::error::OcrError;
use formscout_core::models::config::{ClassifierStrategy, OcrConfig};
use formscout_core::{
    Detection, FieldDetector, FormscoutConfig, PureOcrEngine, Stage, StageObserver, StagedUpload,
    TextRecognizer,
};

/// Input selection and detection options shared by `detect` and `fill`.
#[derive(Args)]
pub struct SourceArgs {
    /// Input PDF, or `-` to read it from stdin
    #[arg(required = true)]
    pub input: PathBuf,

    /// Label classification strategy (overrides the config file)
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// OCR model directory
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,

    /// Skip the OCR fallback
    #[arg(long)]
    pub no_ocr: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StrategyArg {
    /// Separator plus a known domain keyword
    Keyword,
    /// Any label-like text followed by a colon
    Pattern,
}

impl From<StrategyArg> for ClassifierStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Keyword => ClassifierStrategy::Keyword,
            StrategyArg::Pattern => ClassifierStrategy::Pattern,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formscout")
        .join("config.json")
}

pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formscout")
        .join("models")
}

/// Load `--config`, else the default config file if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FormscoutConfig> {
    if let Some(path) = config_path {
        return Ok(FormscoutConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        Ok(FormscoutConfig::from_file(&default_path)?)
    } else {
        Ok(FormscoutConfig::default())
    }
}

/// Where the document bytes come from.
///
/// Stdin uploads are staged to a temporary file that lives until the value is
/// dropped.
enum Input {
    File(PathBuf),
    Staged(StagedUpload),
}

impl Input {
    fn open(path: &Path) -> anyhow::Result<Self> {
        if path.as_os_str() == "-" {
            let staged = StagedUpload::from_reader(std::io::stdin().lock())?;
            info!("Read {} bytes from stdin", staged.len());
            return Ok(Input::Staged(staged));
        }

        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if extension != "pdf" {
            anyhow::bail!("Unsupported file format: {}", extension);
        }

        Ok(Input::File(path.to_path_buf()))
    }

    fn read(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            Input::File(path) => Ok(std::fs::read(path)?),
            Input::Staged(staged) => Ok(staged.read_bytes()?),
        }
    }
}

/// Recognizer that loads the OCR models the first time it is asked for text.
///
/// Documents with form fields or enough embedded text never pay for model
/// loading.
struct LazyRecognizer {
    model_dir: PathBuf,
    config: OcrConfig,
    engine: OnceCell<Result<PureOcrEngine, OcrError>>,
}

impl LazyRecognizer {
    /// `None` when the model files are missing, which disables the fallback.
    fn locate(model_dir: Option<PathBuf>, config: &OcrConfig) -> Option<Self> {
        let model_dir = model_dir.unwrap_or_else(|| {
            if config.model_dir.exists() {
                config.model_dir.clone()
            } else {
                default_model_dir()
            }
        });

        let (det, rec, dict) = config.model_paths(&model_dir);
        if let Some(missing) = [det, rec, dict].iter().find(|p| !p.exists()) {
            warn!(
                "OCR model file {} not found; OCR fallback disabled",
                missing.display()
            );
            return None;
        }

        Some(Self {
            model_dir,
            config: config.clone(),
            engine: OnceCell::new(),
        })
    }
}

impl TextRecognizer for LazyRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let engine = self
            .engine
            .get_or_init(|| PureOcrEngine::from_dir(&self.model_dir, &self.config));
        match engine {
            Ok(engine) => engine.recognize(image),
            Err(e) => Err(OcrError::ModelLoad(e.to_string())),
        }
    }
}

struct StageLogger;

impl StageObserver for StageLogger {
    fn on_stage(&self, stage: Stage) {
        info!("Running stage {:?}", stage);
    }
}

/// Read the input and run the extraction cascade on it.
pub async fn run_detection(
    args: &SourceArgs,
    config_path: Option<&str>,
) -> anyhow::Result<Detection> {
    let mut config = load_config(config_path)?;
    if let Some(strategy) = args.strategy {
        config.classifier.strategy = strategy.into();
    }

    let input = Input::open(&args.input)?;
    let data = input.read()?;
    let no_ocr = args.no_ocr;
    let model_dir = args.model_dir.clone();

    let detection = tokio::task::spawn_blocking(move || {
        let recognizer = if no_ocr {
            None
        } else {
            LazyRecognizer::locate(model_dir, &config.ocr)
        };

        let mut detector = FieldDetector::new(config).with_observer(&StageLogger);
        if let Some(recognizer) = recognizer.as_ref() {
            detector = detector.with_recognizer(recognizer);
        }
        detector.detect_bytes(&data)
    })
    .await?;

    // The staged upload is removed only once detection has finished
    drop(input);

    Ok(detection)
}
