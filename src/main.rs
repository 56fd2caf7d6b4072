use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

mod charts;
mod config;
mod dataset;
mod models;
mod page;
mod predictor;
mod reference;
mod seed;
mod server;
mod stress;

use config::AppConfig;
use models::{FeatureVector, DEFAULT_SCORE};

#[derive(Parser)]
#[command(name = "student-stress-analyzer")]
#[command(about = "Student stress prediction and dashboard", long_about = None)]
struct Cli {
    /// Regression model artifact (default: $STRESS_ANALYZER_HOME/rf_model.json)
    #[arg(long, global = true)]
    regressor: Option<PathBuf>,
    /// Classification model artifact (default: $STRESS_ANALYZER_HOME/xgb_model.json)
    #[arg(long, global = true)]
    classifier: Option<PathBuf>,
    /// Dashboard dataset (default: $STRESS_ANALYZER_HOME/Combined_Student_Stress.csv)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Scores {
    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(1..=5))]
    sleep: u8,
    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(1..=5))]
    academic: u8,
    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(1..=5))]
    study: u8,
    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(1..=5))]
    extracurricular: u8,
}

impl Scores {
    fn features(&self) -> anyhow::Result<FeatureVector> {
        Ok(FeatureVector::new(
            self.sleep.into(),
            self.academic.into(),
            self.study.into(),
            self.extracurricular.into(),
        )?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write demo model artifacts and a sample dataset
    Seed {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Predict stress for one set of scores
    Predict {
        #[command(flatten)]
        scores: Scores,
        #[arg(long)]
        json: bool,
    },
    /// Render the dashboard page to an HTML file
    Render {
        #[command(flatten)]
        scores: Scores,
        /// Include the prediction panel for the given scores
        #[arg(long)]
        predict: bool,
        #[arg(long, default_value = "dashboard.html")]
        out: PathBuf,
    },
    /// Serve the interactive dashboard
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8501)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("student_stress_analyzer=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env(cli.regressor, cli.classifier, cli.dataset);

    match cli.command {
        Commands::Seed { dir, force } => {
            let summary = seed::seed(&dir, force)?;
            println!(
                "Wrote {}, {} and {} ({} rows).",
                summary.config.regressor_path.display(),
                summary.config.classifier_path.display(),
                summary.config.dataset_path.display(),
                summary.rows
            );
        }
        Commands::Predict { scores, json } => {
            let state = server::AppState::load(config)?;
            let features = scores.features()?;
            let result = stress::compute_prediction(&features, &state.regressor, &state.classifier)
                .context("model prediction failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Predicted stress score: {:.2} / 5", result.regression_score);
                println!("Stress category: {}", result.category);
                println!(
                    "Stress interpretation: {} {}",
                    result.label(),
                    result.band.indicator()
                );
                println!("Recommendation: {}", result.advice());
            }
        }
        Commands::Render {
            scores,
            predict,
            out,
        } => {
            let state = server::AppState::load(config)?;
            let features = scores.features()?;
            let prediction = predict.then(|| {
                stress::compute_prediction(&features, &state.regressor, &state.classifier)
                    .map_err(|err| err.to_string())
            });
            let dashboard = page::load_dashboard(&state.config.dataset_path, &state.regressor);
            if let Err(err) = &dashboard {
                tracing::warn!(kind = err.kind(), error = %err, "dashboard unavailable");
            }

            let html = page::render_page(&features, prediction.as_ref(), &dashboard, chrono::Utc::now());
            std::fs::write(&out, html).with_context(|| format!("failed to write {}", out.display()))?;
            println!("Dashboard written to {}.", out.display());
        }
        Commands::Serve { host, port } => {
            let state = server::AppState::load(config)?;
            server::serve(state, &format!("{host}:{port}")).await?;
        }
    }

    Ok(())
}
