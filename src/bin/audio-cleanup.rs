use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use audio_cleanup_core::{cleanup, CleanupOptions, JobState, OutputFormat, ProgressEvent};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "audio-cleanup")]
#[command(about = "Noise reduction, high-pass, normalization and silence trimming for audio files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean one audio file
    Clean {
        #[arg(short, long)]
        input: PathBuf,

        /// Defaults to cleaned_<stem>.<format> next to the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// wav, mp3 or m4a
        #[arg(short, long, default_value = "wav")]
        format: String,

        /// Option bag as JSON, e.g. '{"normalize": {"enabled": true, "target_dbfs": -20}}'
        #[arg(long, conflicts_with = "options_file")]
        options: Option<String>,

        #[arg(long, env = "AUDIO_CLEANUP_OPTIONS_FILE")]
        options_file: Option<PathBuf>,

        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the default option bag
    Defaults,
}

fn main() {
    let cli = Cli::parse();

    let quiet = matches!(cli.command, Commands::Clean { quiet: true, .. });
    init_tracing(quiet);

    let result = match cli.command {
        Commands::Clean {
            input,
            output,
            format,
            options,
            options_file,
            quiet,
        } => handle_clean(input, output, format, options, options_file, quiet),
        Commands::Defaults => handle_defaults(),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet {
        "audio_cleanup=warn,audio_cleanup_core=warn"
    } else {
        "audio_cleanup=info,audio_cleanup_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn handle_clean(
    input: PathBuf,
    output: Option<PathBuf>,
    format: String,
    options: Option<String>,
    options_file: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }

    let format = OutputFormat::parse(&format);
    let options = match (options, options_file) {
        (Some(json), _) => CleanupOptions::from_json_str(&json)?,
        (None, Some(path)) => CleanupOptions::from_json_str(&fs::read_to_string(path)?)?,
        (None, None) => CleanupOptions::all_defaults(),
    };
    let output = output.unwrap_or_else(|| default_output(&input, format));

    if !quiet {
        eprintln!("Audio Cleanup");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("Input:  {}", input.display());
        eprintln!("Output: {}", output.display());
        eprintln!("Steps:  {}", step_list(&options));
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let report = |event: ProgressEvent| {
        if quiet {
            return;
        }
        match event.state {
            JobState::Failure => eprintln!("[{:>3}%] ✖ {}", event.progress, event.status),
            JobState::Success => eprintln!("[{:>3}%] ✔ {}", event.progress, event.status),
            _ => eprintln!("[{:>3}%] {}", event.progress, event.status),
        }
    };

    cleanup(&input, &output, format, &options, &report)?;

    println!("{}", output.display());
    Ok(())
}

fn handle_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let value = CleanupOptions::all_defaults().to_value();
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn default_output(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    input.with_file_name(format!("cleaned_{stem}.{}", format.extension()))
}

fn step_list(options: &CleanupOptions) -> String {
    let steps = options.steps();
    if steps.is_empty() {
        return "none".to_string();
    }
    steps.iter().map(|s| s.key()).collect::<Vec<_>>().join(", ")
}
