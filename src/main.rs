//! risk-forest - Main Entry Point

use clap::Parser;
use risk_forest::cli::{cmd_batch, cmd_export, cmd_inspect, cmd_predict, Cli, Commands, PredictArgs};
use risk_forest::inference::PredictionRequest;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "risk_forest=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export { input, output } => {
            cmd_export(&input, &output)?;
        }
        Commands::Predict {
            model,
            lat,
            lng,
            rainfall,
            river_level,
            soil_moisture,
            district,
            trigger,
            config,
            fallback,
            json,
        } => {
            let request = PredictionRequest {
                latitude: lat,
                longitude: lng,
                rainfall,
                river_level,
                soil_moisture,
                district,
                trigger,
            };
            cmd_predict(PredictArgs {
                model,
                request,
                config,
                fallback,
                json,
            })?;
        }
        Commands::Batch { model, input, config } => {
            cmd_batch(&model, &input, config.as_deref())?;
        }
        Commands::Inspect { model } => {
            cmd_inspect(&model)?;
        }
    }

    Ok(())
}
