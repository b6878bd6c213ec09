//! alf - audio add-on for the lf file browser.
//!
//! This binary provides the commands lf is configured to call:
//!
//! 1. **Metadata**: `index` extracts tempo, pitch, stream format and a
//!    thumbnail sparkline for every audio file in a directory and caches them
//!    per directory. `list` and `meta` present the cached data.
//!
//! 2. **Waveforms**: `wave` is the previewer, drawing a multi-row plot, a
//!    one-line sparkline, or a compact directory listing.
//!
//! 3. **Playback**: `play`, `pause`, `stop`, `seek`, `autoplay` and `status`
//!    drive a single background mpv instance whose progress is published as
//!    small files that lf polls to highlight the playhead.

use alf_audio::config::Config;
use alf_audio::constants::LOG_FILE;
use alf_audio::logging;
use alf_audio::playback::{AutoplayCommand, SeekTarget};
use alf_audio::waveform::render::SortKey;
use clap::{CommandFactory, Parser, Subcommand, builder::PossibleValuesParser};
use clap_complete::{Generator, Shell, generate};
use std::error::Error;
use std::io;

mod cli;

#[derive(Parser)]
#[command(name = "alf")]
#[command(about = "Audio previews, metadata and playback for the lf file browser")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and cache audio metadata for a directory
    Index {
        /// Directory to index
        #[arg(default_value = ".")]
        dir: String,
        /// Re-extract files that are already cached
        #[arg(short, long)]
        force: bool,
    },
    /// List audio files with sparkline, tempo, key, duration and size
    List {
        /// Directory to list
        #[arg(default_value = ".")]
        dir: String,
        /// Sort column
        #[arg(short, long, value_enum, default_value_t = SortKey::Name)]
        sort: SortKey,
        /// Sparkline width
        #[arg(long, default_value_t = 20)]
        spark: usize,
    },
    /// Render a waveform preview of a file or directory
    Wave {
        /// Audio file or directory
        path: String,
        /// Output width (defaults to the terminal width)
        #[arg(short, long)]
        width: Option<usize>,
        /// Plot height in rows
        #[arg(short = 'H', long, default_value_t = 5)]
        height: usize,
        /// One-line sparkline instead of a plot
        #[arg(short = '1', long)]
        oneline: bool,
        /// Directory listing
        #[arg(short, long)]
        directory: bool,
        /// Playback position to highlight, 0.0 to 1.0
        #[arg(short, long)]
        position: Option<f64>,
    },
    /// Print lf addcustominfo commands for cached files
    Meta {
        /// Files to describe
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Play a file in the background, replacing any current playback
    Play {
        /// Audio file
        path: String,
        /// lf client id to refresh
        viewer: String,
    },
    /// Toggle pause, or start playing the given file when idle
    Pause {
        /// Audio file to play when nothing is playing
        #[arg(requires = "viewer")]
        path: Option<String>,
        /// lf client id to refresh
        viewer: Option<String>,
    },
    /// Stop playback
    Stop,
    /// Seek: +N/-N seconds, N seconds from the start, or N%
    Seek {
        #[arg(allow_hyphen_values = true)]
        offset: SeekTarget,
    },
    /// Show or change the autoplay flag
    Autoplay {
        #[arg(value_enum)]
        command: Option<AutoplayCommand>,
    },
    /// One-line playback status for the lf status bar
    Status,
    /// Show current configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Background playback controller (started by play and pause)
    #[command(hide = true)]
    Controller { path: String, viewer: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View current configuration
    View,
    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_parser = PossibleValuesParser::new([
            "cache_dir",
            "state_dir",
            "index_workers",
            "index_spark_width",
            "tool_timeout_secs",
            "poll_interval_ms",
            "ipc_timeout_ms",
            "list_max_files",
            "log_level",
            "player",
            "browser",
            "decoder",
            "beat_tracker",
            "pitch_detector",
        ]))]
        key: String,
        /// Configuration value
        value: String,
    },
    /// Edit configuration file in your editor
    Edit,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Logging is best effort
    let config = Config::load().unwrap_or_default();
    let _ = logging::init(&config.state_dir().join(LOG_FILE), &config.log_level);

    match cli.command {
        Commands::Index { dir, force } => {
            cli::index::handle_index(&dir, force)?;
        }
        Commands::List { dir, sort, spark } => {
            cli::list::handle_list(&dir, sort, spark)?;
        }
        Commands::Wave {
            path,
            width,
            height,
            oneline,
            directory,
            position,
        } => {
            let options = cli::wave::WaveOptions {
                width,
                height,
                oneline,
                directory,
                position,
            };
            cli::wave::handle_wave(&path, &options)?;
        }
        Commands::Meta { files } => {
            cli::meta::handle_meta(&files)?;
        }
        Commands::Play { path, viewer } => {
            cli::play::handle_play(&path, &viewer)?;
        }
        Commands::Pause { path, viewer } => {
            cli::play::handle_pause(path.as_deref(), viewer.as_deref())?;
        }
        Commands::Stop => {
            cli::play::handle_stop()?;
        }
        Commands::Seek { offset } => {
            cli::play::handle_seek(&offset)?;
        }
        Commands::Autoplay { command } => {
            cli::play::handle_autoplay(command.unwrap_or(AutoplayCommand::Query))?;
        }
        Commands::Status => {
            cli::play::handle_status()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::View => {
                cli::config::handle_config_view()?;
            }
            ConfigAction::Set { key, value } => {
                cli::config::handle_config_set(&key, &value)?;
            }
            ConfigAction::Edit => {
                cli::config::handle_config_edit()?;
            }
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }
        Commands::Controller { path, viewer } => {
            cli::play::handle_controller(&path, &viewer)?;
        }
    }

    Ok(())
}
