//! Config command implementation.

use anyhow::Result;
use task_graph_viz::FetchOrdering;

use crate::config::Config;

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("Task Graph CLI Configuration");
    println!("{:-<40}", "");
    println!("Base URL:          {}", config.base_url);
    println!("Reconnect Delay:   {} ms", config.reconnect_delay_ms);
    println!("Warm-up Ticks:     {}", config.warmup_ticks);
    println!("Tick Interval:     {} ms", config.tick_interval_ms);
    println!(
        "Viewport:          {}x{}",
        config.viewport_width, config.viewport_height
    );
    println!("Fetch Ordering:    {}", config.fetch_ordering.label());

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

fn parse_ordering(value: &str) -> Result<FetchOrdering> {
    match value {
        "last_completed" | "last-completed" => Ok(FetchOrdering::LastCompleted),
        "latest_issued" | "latest-issued" => Ok(FetchOrdering::LatestIssued),
        _ => anyhow::bail!("Unknown fetch ordering: {value}. Valid values: last_completed, latest_issued"),
    }
}

/// Set a configuration value.
pub fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "base-url" | "url" => config.base_url = value.trim_end_matches('/').to_string(),
        "reconnect-delay-ms" => config.reconnect_delay_ms = value.parse()?,
        "warmup-ticks" => config.warmup_ticks = value.parse()?,
        "tick-interval-ms" => config.tick_interval_ms = value.parse()?,
        "viewport-width" => config.viewport_width = value.parse()?,
        "viewport-height" => config.viewport_height = value.parse()?,
        "fetch-ordering" => config.fetch_ordering = parse_ordering(value)?,
        _ => {
            anyhow::bail!(
                "Unknown config key: {}. Valid keys: base-url, reconnect-delay-ms, warmup-ticks, tick-interval-ms, viewport-width, viewport-height, fetch-ordering",
                key
            );
        }
    }

    config.save()?;
    println!("Set {} to: {}", key, value);
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &Config, key: &str) -> Result<()> {
    let value = match key {
        "base-url" | "url" => config.base_url.clone(),
        "reconnect-delay-ms" => config.reconnect_delay_ms.to_string(),
        "warmup-ticks" => config.warmup_ticks.to_string(),
        "tick-interval-ms" => config.tick_interval_ms.to_string(),
        "viewport-width" => config.viewport_width.to_string(),
        "viewport-height" => config.viewport_height.to_string(),
        "fetch-ordering" => match config.fetch_ordering {
            FetchOrdering::LastCompleted => "last_completed".to_string(),
            FetchOrdering::LatestIssued => "latest_issued".to_string(),
        },
        _ => {
            anyhow::bail!("Unknown config key: {}", key);
        }
    };

    println!("{}", value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults");
    Ok(())
}
