//! Prompt Blocks - command line driver
//!
//! Runs the block editor core against prompts given on the command line and
//! a translation endpoint configured in `config.toml`.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use prompt_blocks::cli::{parse_order, Args, Commands};
use prompt_blocks::config::{Config, Profile};
use prompt_blocks::editor::{BlockEditor, EditorEvent};
use prompt_blocks::error::BlocksError;
use prompt_blocks::tokens;
use prompt_blocks::translate::{BatchMode, TranslationClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    if let Some(profile) = &args.profile {
        config.apply_profile(Profile::parse(profile)?);
    }
    config.validate()?;

    match args.command {
        Commands::Normalize { prompt } => {
            println!("{}", tokens::normalize(&prompt));
        }
        Commands::Blocks { prompt } => {
            let client = Arc::new(TranslationClient::new(&config.translate)?);
            let editor = BlockEditor::new(&config.editor, client, &prompt);
            print_blocks(&editor);
        }
        Commands::Translate { text, to_english } => {
            let client = TranslationClient::new(&config.translate)?;
            let translation = client.translate_with(&text, to_english || config.translate.to_english).await?;
            println!("{}", translation);
        }
        Commands::TranslateAll { prompt, to_english, auto_direction } => {
            let prompt = tokens::normalize(&prompt);
            config.translate.to_english = if auto_direction {
                tokens::contains_cjk(&prompt)
            } else {
                to_english || config.translate.to_english
            };
            info!("Translating blocks (to_english: {})", config.translate.to_english);

            let client = Arc::new(TranslationClient::new(&config.translate)?);
            let mut editor = BlockEditor::new(&config.editor, client, &prompt);
            match editor.translate_all().await {
                Some(batch) => {
                    if batch.mode == BatchMode::Fallback {
                        println!(
                            "Batch reply did not match the block count; translated {} of {} blocks one by one",
                            batch.translated_count(),
                            batch.entries.len()
                        );
                    }
                    print_blocks(&editor);
                }
                None => {
                    let message = editor.notice().unwrap_or("Translation failed").to_string();
                    return Err(BlocksError::RequestFailed(message).into());
                }
            }
        }
        Commands::Reorder { prompt, order } => {
            let positions = parse_order(&order).map_err(BlocksError::InvalidOrder)?;
            let client = Arc::new(TranslationClient::new(&config.translate)?);
            let mut editor = BlockEditor::new(&config.editor, client, &prompt);

            let ids = positions
                .iter()
                .map(|&position| {
                    editor
                        .units()
                        .get(position)
                        .map(|unit| unit.id())
                        .ok_or_else(|| BlocksError::InvalidOrder(format!("no block at position {}", position)))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            editor.handle(EditorEvent::Reordered(ids))?;
            println!("{}", editor.source());
        }
    }

    Ok(())
}

fn print_blocks(editor: &BlockEditor) {
    for (index, block) in editor.blocks().iter().enumerate() {
        match block.translation {
            Some(translation) => println!("{:>3}  {:<40} {}", index, block.text, translation),
            None => println!("{:>3}  {}", index, block.text),
        }
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".prompt-blocks").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "prompt-blocks.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so command results stay pipeable
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("prompt-blocks.log").display());

    Ok(())
}
