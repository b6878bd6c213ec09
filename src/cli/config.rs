use alf_audio::config::Config;
use std::error::Error;
use std::process::Command;

pub fn handle_config_view() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    println!("Current alf configuration:");
    println!("  cache_root: {}", config.cache_root()?.display());
    println!("  state_dir: {}", config.state_dir().display());
    println!("  index_workers: {}", config.index_workers);
    println!("  index_spark_width: {}", config.index_spark_width);
    println!("  tool_timeout_secs: {}", config.tool_timeout_secs);
    println!("  poll_interval_ms: {}", config.poll_interval_ms);
    println!("  ipc_timeout_ms: {}", config.ipc_timeout_ms);
    println!("  list_max_files: {}", config.list_max_files);
    println!("  log_level: {}", config.log_level);
    println!("  tools:");
    println!("    decoder: {}", config.tools.decoder);
    println!("    beat_tracker: {}", config.tools.beat_tracker);
    println!("    pitch_detector: {}", config.tools.pitch_detector);
    println!("    player: {}", config.tools.player);
    println!("    browser: {}", config.tools.browser);

    Ok(())
}

pub fn handle_config_set(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;

    config.set_value(key, value)?;
    config.save()?;

    println!("Configuration updated: {key} = {value}");

    Ok(())
}

pub fn handle_config_edit() -> Result<(), Box<dyn Error>> {
    // Write the defaults out so there is something to edit
    if !Config::exists()? {
        Config::new().save()?;
    }

    let config_path = Config::config_path()?;
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    println!("Opening {} in {}", config_path.display(), editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                format!("Editor '{editor}' not found. Set $EDITOR to a valid editor path.")
            } else {
                format!("Failed to launch editor '{editor}': {e}")
            }
        })?;

    if !status.success() {
        return Err(format!("Editor '{editor}' exited with error").into());
    }

    match Config::load() {
        Ok(_) => println!("Configuration saved successfully"),
        Err(e) => {
            return Err(format!("Configuration validation failed: {e}").into());
        }
    }

    Ok(())
}
