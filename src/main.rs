use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use borehole_annotator::{Action, Config, Strategy};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "borehole-annotator",
    version,
    about = "Pre-annotate borehole profiles and transcribe drawn regions"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pre-annotate the page image of a task with layers from the layout pipeline
    Predict {
        /// Task JSON (object or array of tasks)
        #[arg(short = 't', long = "task")]
        task: PathBuf,

        /// Use this predictions file instead of running the pipeline
        #[arg(short = 'p', long = "predictions")]
        predictions: Option<PathBuf>,
    },
    /// Fill the transcription of the region drawn last
    Transcribe {
        /// Task JSON (object or array of tasks)
        #[arg(short = 't', long = "task")]
        task: PathBuf,

        /// Context JSON holding the drawn results
        #[arg(short = 'c', long = "context")]
        context: PathBuf,

        /// Text source: ocr (tesseract on the page image) or pdf (pdf text layer)
        #[arg(short = 's', long = "strategy", default_value = "ocr")]
        strategy: Strategy,
    },
    /// Map a predictions file to pre-annotations for one page
    Map {
        /// Pipeline predictions JSON
        #[arg(short = 'p', long = "predictions")]
        predictions: PathBuf,

        /// Document key inside the predictions (default: first)
        #[arg(short = 'd', long = "document")]
        document: Option<String>,

        /// Page number (0-based)
        #[arg(long = "page", default_value_t = 0)]
        page: usize,

        /// Width of the page image shown in the annotation tool
        #[arg(short = 'w', long = "ls-width")]
        ls_width: f64,
    },
    /// Read depth interval text (argument or stdin) and print `start: X end: Y`
    DepthInterval {
        text: Option<String>,
    },
    /// Print the effective settings
    ShowSettings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    borehole_annotator::logging::init(cli.verbose)?;

    let action = match cli.command {
        Command::Predict { task, predictions } => Action::Predict { task, predictions },
        Command::Transcribe {
            task,
            context,
            strategy,
        } => Action::Transcribe {
            task,
            context,
            strategy,
        },
        Command::Map {
            predictions,
            document,
            page,
            ls_width,
        } => Action::Map {
            predictions,
            document,
            page,
            ls_page_width: ls_width,
        },
        Command::DepthInterval { text } => Action::DepthInterval {
            text: match text {
                Some(text) => text,
                None => read_stdin()?,
            },
        },
        Command::ShowSettings => Action::ShowSettings,
    };

    let output = borehole_annotator::run(Config {
        settings_path: cli.read_settings,
        action,
    })?;
    println!("{}", output);
    Ok(())
}

fn read_stdin() -> Result<String> {
    if io::stdin().is_terminal() {
        return Err(anyhow!("no text given (pass it as argument or via stdin)"));
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}
