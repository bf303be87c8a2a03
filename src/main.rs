// SPDX-License-Identifier: MIT

//! Imagehound CLI - scan a directory for images matching a subject

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};

use imagehound::config::{
    AnalysisMode, BackendConfig, DispositionMode, PromptStyle, RunConfig,
};
use imagehound::sink::ScanSink;
use imagehound::{run_scan, CancelFlag, Result, ScanError};

/// Imagehound - find images where a keyword is the main subject
#[derive(Parser, Debug)]
#[command(name = "imagehound")]
#[command(version = "1.0.0")]
#[command(about = "AI-powered subject scanner for image directories", long_about = None)]
struct Cli {
    /// Directory to scan for images
    root: PathBuf,

    /// Subject to look for (e.g. "bird", "sunset")
    #[arg(short, long)]
    keyword: String,

    /// Scan subdirectories too
    #[arg(short, long)]
    recursive: bool,

    /// Vision backend to classify with
    #[arg(short, long, value_enum, default_value = "ollama")]
    backend: Provider,

    /// API key for cloud backends (falls back to the provider's env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Ollama vision model name
    #[arg(long, default_value = "llava")]
    model: String,

    /// Ollama analysis mode
    #[arg(long, value_enum, default_value = "confidence")]
    mode: Mode,

    /// Match cutoff (1-10) in confidence mode
    #[arg(long, default_value_t = 8)]
    threshold: u8,

    /// Prompt strategy in yes/no mode
    #[arg(long, value_enum, default_value = "simple")]
    prompt_style: Style,

    /// Sampling temperature for the local model
    #[arg(long, default_value_t = 0.1)]
    temperature: f64,

    /// Copy or move matches into this directory after the scan
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// What to do with matched files when --dest is set
    #[arg(long, value_enum, default_value = "copy")]
    action: Action,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Provider {
    Ollama,
    Google,
    Chatgpt,
    Deepseek,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Confidence,
    Yesno,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Style {
    Simple,
    Cot,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Action {
    Copy,
    Move,
}

impl Cli {
    fn backend_config(&self) -> Result<BackendConfig> {
        let credential = |env_var: &str| -> Result<String> {
            self.api_key
                .clone()
                .or_else(|| std::env::var(env_var).ok())
                .ok_or_else(|| {
                    ScanError::Validation(format!(
                        "API key required: pass --api-key or set {}",
                        env_var
                    ))
                })
        };

        Ok(match self.backend {
            Provider::Google => BackendConfig::Gemini {
                api_key: credential("GEMINI_API_KEY")?,
            },
            Provider::Chatgpt => BackendConfig::OpenAi {
                api_key: credential("OPENAI_API_KEY")?,
            },
            Provider::Deepseek => BackendConfig::DeepSeek {
                api_key: credential("DEEPSEEK_API_KEY")?,
            },
            Provider::Ollama => BackendConfig::Ollama {
                model: self.model.clone(),
                mode: match self.mode {
                    Mode::Confidence => AnalysisMode::Confidence,
                    Mode::Yesno => AnalysisMode::YesNo,
                },
                threshold: self.threshold,
                prompt_style: match self.prompt_style {
                    Style::Simple => PromptStyle::Simple,
                    Style::Cot => PromptStyle::Cot,
                },
                temperature: self.temperature,
            },
        })
    }

    fn run_config(&self) -> Result<RunConfig> {
        Ok(RunConfig {
            keyword: self.keyword.clone(),
            root: self.root.clone(),
            recursive: self.recursive,
            backend: self.backend_config()?,
            destination: self.dest.clone(),
            disposition: match self.action {
                Action::Copy => DispositionMode::Copy,
                Action::Move => DispositionMode::Move,
            },
        })
    }
}

/// Sink that narrates the scan through the tracing pipeline
struct ConsoleSink;

impl ScanSink for ConsoleSink {
    fn progress(&self, percent: f64) {
        info!("Progress: {:.0}%", percent);
    }

    fn log(&self, line: &str) {
        info!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = cli.run_config()?;

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop signal received. Finishing current image analysis...");
            signal_flag.cancel();
        }
    });

    let report = run_scan(&config, &ConsoleSink, &cancel).await?;

    info!(
        "Done: {}/{} images processed, {} matched",
        report.processed,
        report.total,
        report.matched.len()
    );

    Ok(())
}
