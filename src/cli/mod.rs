//! risk-forest CLI Module
//!
//! Command-line interface for exporting, inspecting and querying forest artifacts.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::assessment::{AssessmentSource, FallbackEstimator, RiskAssessment, RiskLevel};
use crate::error::RiskForestError;
use crate::export::ForestExporter;
use crate::inference::{InferenceConfig, InferenceEngine, PredictionRequest, PredictionResult};
use crate::model::ModelArtifact;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn level_colored(level: RiskLevel) -> ColoredString {
    let s = level.as_str();
    match level {
        RiskLevel::Critical => s.truecolor(239, 68, 68).bold(),
        RiskLevel::Moderate => s.truecolor(249, 115, 22).bold(),
        RiskLevel::Low => s.truecolor(16, 185, 129).bold(),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "risk-forest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Random-forest hazard model export and inference")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a trained-ensemble dump into a model artifact
    Export {
        /// Trained ensemble JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Artifact file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Assess the hazard risk at one location
    Predict {
        /// Model artifact
        #[arg(short, long, env = "RISK_FOREST_MODEL")]
        model: Option<PathBuf>,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Rainfall in mm
        #[arg(long)]
        rainfall: Option<f64>,

        #[arg(long)]
        river_level: Option<f64>,

        #[arg(long)]
        soil_moisture: Option<f64>,

        #[arg(long)]
        district: Option<String>,

        /// Primary trigger hint, e.g. "Cloudburst"
        #[arg(long)]
        trigger: Option<String>,

        /// Inference config JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use the heuristic estimator when the model cannot serve
        #[arg(long)]
        fallback: bool,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Predict every request in a JSON array, one JSON result per line
    Batch {
        /// Model artifact
        #[arg(short, long, env = "RISK_FOREST_MODEL")]
        model: PathBuf,

        /// JSON array of prediction requests
        #[arg(short, long)]
        input: PathBuf,

        /// Inference config JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show what an artifact contains
    Inspect {
        /// Model artifact
        #[arg(short, long, env = "RISK_FOREST_MODEL")]
        model: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<InferenceConfig> {
    Ok(match path {
        Some(p) => InferenceConfig::from_path(p)?,
        None => InferenceConfig::default(),
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_export(input: &Path, output: &Path) -> anyhow::Result<()> {
    section("Export");

    step_run(&format!("Converting {}", input.display()));
    let start = Instant::now();
    let artifact = ForestExporter::new().export_to_path(input, output)?;
    step_done(&format!("{:?}", start.elapsed()));

    let summary = artifact.summary();
    println!();
    kv("Output", &output.display().to_string());
    kv("Trees", &summary.n_trees.to_string());
    kv("Features", &summary.features.len().to_string());
    kv("Classes", &summary.classes.join(", "));
    println!();
    Ok(())
}

pub struct PredictArgs {
    pub model: Option<PathBuf>,
    pub request: PredictionRequest,
    pub config: Option<PathBuf>,
    pub fallback: bool,
    pub json: bool,
}

/// Model prediction, or the heuristic estimate when allowed and the model cannot serve
pub fn assess(
    model: Option<&Path>,
    config: InferenceConfig,
    request: &PredictionRequest,
    fallback: bool,
) -> anyhow::Result<(RiskAssessment, Option<PredictionResult>)> {
    let engine = InferenceEngine::new(config);
    let outcome = match model {
        Some(path) => engine.load(path).and_then(|_| engine.predict(request)),
        None => Err(RiskForestError::ModelUnavailable),
    };

    match outcome {
        Ok(prediction) => Ok((RiskAssessment::from_prediction(&prediction), Some(prediction))),
        Err(e) if fallback && e.is_recoverable() => {
            tracing::warn!(error = %e, "model cannot serve; using heuristic estimate");
            Ok((FallbackEstimator::new().estimate(request), None))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn cmd_predict(args: PredictArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let (assessment, prediction) = assess(args.model.as_deref(), config, &args.request, args.fallback)?;

    if args.json {
        let out = serde_json::json!({
            "assessment": assessment,
            "probabilities": prediction.map(|p| p.probabilities),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    section("Risk assessment");
    kv("Location", &format!("{:.4}, {:.4}", args.request.latitude, args.request.longitude));
    kv("Hazard", &assessment.hazard);
    println!("  {:<18} {}", muted("Risk level"), level_colored(assessment.level));
    kv("Confidence", &format!("{:.1}%", assessment.confidence_percent()));
    if assessment.source == AssessmentSource::Fallback {
        kv("Source", "heuristic estimate (model unavailable)");
    }
    println!();
    for rec in &assessment.recommendations {
        println!("  {} {}", accent("•"), rec);
    }
    println!();
    Ok(())
}

pub fn cmd_batch(model: &Path, input: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let engine = InferenceEngine::new(load_config(config)?);
    engine.load(model)?;

    let text = std::fs::read_to_string(input)?;
    let requests: Vec<PredictionRequest> = serde_json::from_str(&text)?;

    for outcome in engine.predict_batch(&requests) {
        let line = match outcome {
            Ok(prediction) => serde_json::json!({
                "prediction": prediction,
                "assessment": RiskAssessment::from_prediction(&prediction),
            }),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        println!("{}", line);
    }

    let stats = engine.stats();
    tracing::info!(
        total = stats.total_predictions,
        successful = stats.successful,
        undefined = stats.undefined,
        "batch finished"
    );
    Ok(())
}

pub fn cmd_inspect(model: &Path) -> anyhow::Result<()> {
    section("Inspect");

    step_run(&format!("Loading {}", model.display()));
    let start = Instant::now();
    let artifact = ModelArtifact::from_path(model)?;
    step_done(&format!("{:?}", start.elapsed()));

    let summary = artifact.summary();
    println!();
    kv("Features", &summary.features.join(", "));
    kv("Classes", &summary.classes.join(", "));
    kv("Trees", &summary.n_trees.to_string());
    kv("Nodes", &summary.total_nodes.to_string());
    kv("Leaves", &summary.total_leaves.to_string());
    kv("Max depth", &summary.max_depth.to_string());

    if !summary.categorical_features.is_empty() {
        section("Encoders");
        for (name, n) in &summary.categorical_features {
            kv(name, &format!("{} categories", n));
        }
    }
    println!();
    Ok(())
}
