use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::run_command;
use crate::prediction::PredictionSet;
use crate::settings::Settings;

/// The external layout extraction pipeline.
pub trait LayoutPipeline {
    fn run(&self, input: &Path) -> Result<PredictionSet>;
}

/// Reads predictions a previous pipeline run left behind.
#[derive(Debug, Clone)]
pub struct PredictionsFile {
    pub path: PathBuf,
}

impl LayoutPipeline for PredictionsFile {
    fn run(&self, input: &Path) -> Result<PredictionSet> {
        info!(
            "reading stored predictions {} for {}",
            self.path.display(),
            input.display()
        );
        PredictionSet::load(&self.path)
    }
}

/// Runs the pipeline as a subprocess, then reads the predictions it wrote.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    pub command: String,
    pub args: Vec<String>,
    pub out_dir: PathBuf,
    pub predictions_file: PathBuf,
    pub ground_truth_file: PathBuf,
}

impl CommandPipeline {
    fn expand_args(&self, input: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input.to_string_lossy())
                    .replace("{out_dir}", &self.out_dir.to_string_lossy())
                    .replace("{predictions}", &self.predictions_file.to_string_lossy())
                    .replace("{ground_truth}", &self.ground_truth_file.to_string_lossy())
            })
            .collect()
    }
}

impl LayoutPipeline for CommandPipeline {
    fn run(&self, input: &Path) -> Result<PredictionSet> {
        fs::create_dir_all(&self.out_dir).with_context(|| {
            format!("failed to create pipeline output dir: {}", self.out_dir.display())
        })?;
        let args = self.expand_args(input);
        info!("running layout pipeline {} on {}", self.command, input.display());
        run_command(&self.command, &args)
            .with_context(|| format!("layout pipeline failed for {}", input.display()))?;
        PredictionSet::load(&self.predictions_file)
    }
}

pub fn from_settings(settings: &Settings) -> Box<dyn LayoutPipeline> {
    match &settings.pipeline_command {
        Some(command) => Box::new(CommandPipeline {
            command: command.clone(),
            args: settings.pipeline_args.clone(),
            out_dir: settings.out_dir.clone(),
            predictions_file: settings.predictions_file.clone(),
            ground_truth_file: settings.ground_truth_file.clone(),
        }),
        None => Box::new(PredictionsFile {
            path: settings.predictions_file.clone(),
        }),
    }
}
