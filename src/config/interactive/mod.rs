
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{ChatConfig, Config, EmbeddingConfig, IngestFailureMode};

#[inline]
pub fn run_interactive_config(mut config: Config) -> Result<()> {
    eprintln!("{}", style("🔧 Catalog RAG Configuration Setup").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("OpenAI-compatible endpoint used to turn text into vectors.");
    eprintln!();
    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Chat Provider").bold().yellow());
    eprintln!("OpenAI-compatible endpoint used to generate grounded answers.");
    eprintln!();
    configure_chat(&mut config.chat)?;

    eprintln!();
    eprintln!("{}", style("Ingestion").bold().yellow());
    configure_ingest(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_endpoint(&config.embedding.endpoint) {
        eprintln!("{}", style("✓ Embedding endpoint reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the embedding endpoint").yellow()
        );
        eprintln!("You can continue, but make sure the provider is reachable before ingesting.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Provider:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.embedding.endpoint).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Dimensions: {}", style(config.embedding.dimensions).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
    eprintln!(
        "  API Key: {}",
        if config.embedding.api_key.is_empty() {
            style("(not set)").dim()
        } else {
            style("set").green()
        }
    );

    eprintln!();
    eprintln!("{}", style("Chat Provider:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.chat.endpoint).cyan());
    eprintln!("  Model: {}", style(&config.chat.model).cyan());
    eprintln!(
        "  API Key: {}",
        if config.chat.api_key.is_empty() {
            style("(not set)").dim()
        } else {
            style("set").green()
        }
    );

    eprintln!();
    eprintln!("{}", style("Index:").bold().yellow());
    eprintln!("  Name: {}", style(&config.index.name).cyan());
    eprintln!("  Neighbors (k): {}", style(config.index.top_k).cyan());

    eprintln!();
    eprintln!("{}", style("Ingestion:").bold().yellow());
    eprintln!(
        "  Content Type: {}",
        style(&config.ingest.content_type).cyan()
    );
    eprintln!("  On Failure: {}", style(config.ingest.on_failure).cyan());
    eprintln!("  Max Retries: {}", style(config.ingest.max_retries).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let endpoint: String = Input::new()
        .with_prompt("Embedding endpoint")
        .default(embedding.endpoint.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if url::Url::parse(input).is_err() {
                Err("Endpoint must be a valid URL")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_key: String = Input::new()
        .with_prompt("Embedding API key (empty for unauthenticated endpoints)")
        .default(embedding.api_key.clone())
        .allow_empty(true)
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimensions: u32 = Input::new()
        .with_prompt("Embedding dimensions")
        .default(embedding.dimensions)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if !(64..=4096).contains(input) {
                Err("Dimensions must be between 64 and 4096")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.endpoint = endpoint;
    embedding.api_key = api_key;
    embedding.model = model;
    embedding.dimensions = dimensions;

    Ok(())
}

fn configure_chat(chat: &mut ChatConfig) -> Result<()> {
    let endpoint: String = Input::new()
        .with_prompt("Chat endpoint")
        .default(chat.endpoint.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if url::Url::parse(input).is_err() {
                Err("Endpoint must be a valid URL")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_key: String = Input::new()
        .with_prompt("Chat API key (empty for unauthenticated endpoints)")
        .default(chat.api_key.clone())
        .allow_empty(true)
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(chat.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    chat.endpoint = endpoint;
    chat.api_key = api_key;
    chat.model = model;

    Ok(())
}

fn configure_ingest(config: &mut Config) -> Result<()> {
    let content_type: String = Input::new()
        .with_prompt("Eligible content type")
        .default(config.ingest.content_type.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Content type cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let top_k: usize = Input::new()
        .with_prompt("Neighbors retrieved per query (k)")
        .default(config.index.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if !(1..=50).contains(input) {
                Err("k must be between 1 and 50")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let modes = &["block", "log-and-continue"];
    let default_index = match config.ingest.on_failure {
        IngestFailureMode::Block => 0,
        IngestFailureMode::LogAndContinue => 1,
    };
    let mode_index = Select::new()
        .with_prompt("When an ingest batch fails")
        .default(default_index)
        .items(modes)
        .interact()?;

    config.ingest.content_type = content_type;
    config.index.top_k = top_k;
    config.ingest.on_failure = if mode_index == 0 {
        IngestFailureMode::Block
    } else {
        IngestFailureMode::LogAndContinue
    };

    Ok(())
}

fn test_endpoint(endpoint: &str) -> bool {
    let url = format!("{}/models", endpoint.trim_end_matches('/'));

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        // An auth rejection still proves the endpoint is there.
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
