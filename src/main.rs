use std::sync::Arc;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use tracing::{error, info, warn};

mod catalog;
mod cli;
mod config;
mod figure;
mod llm;
mod utils;

use cli::{parse_args, render_catalogs, usage, CliCommand, GenerateArgs};
use config::Config;
use figure::{FigureStudio, SubmitOutcome, GENERIC_FAILURE_MESSAGE};
use llm::GeminiImageClient;
use utils::http::build_http_client;
use utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let generate_args = match parse_args(&args)? {
        CliCommand::Help => {
            println!("{}", usage());
            return Ok(());
        }
        CliCommand::ListOptions => {
            print!("{}", render_catalogs());
            return Ok(());
        }
        CliCommand::Generate(generate_args) => generate_args,
    };

    let config = Config::load();
    let _guards = init_logging(&config);
    for warning in &config.warnings {
        warn!("{warning}");
    }
    info!(
        "Starting nano-figure (model={}, aspect_ratio={})",
        config.gemini.image_model, generate_args.options.aspect_ratio
    );

    let http = build_http_client(config.gemini.timeout).context("Failed to build HTTP client")?;
    let generator = Arc::new(GeminiImageClient::new(http, config.gemini.clone()));
    let studio = FigureStudio::new(generator);

    run(&studio, generate_args).await
}

async fn run(studio: &FigureStudio, args: GenerateArgs) -> anyhow::Result<()> {
    studio
        .select_reference(args.image.as_deref())
        .await
        .context("Failed to load reference image")?;

    match studio.submit(&args.options).await {
        SubmitOutcome::Succeeded => {
            tokio::fs::create_dir_all(&args.out_dir)
                .await
                .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
            match studio.download(&args.out_dir).await? {
                Some(path) => println!("{}", path.display()),
                None => error!("Generation succeeded but no image was stored"),
            }
            Ok(())
        }
        SubmitOutcome::Failed(err) => {
            let message = studio
                .state()
                .last_error
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            error!("Figure generation failed: {err}");
            Err(anyhow!(message))
        }
        SubmitOutcome::Busy => Err(anyhow!("A generation is already in progress")),
    }
}
