//! CLI: generate | inspect | schema
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use crate::config::{includes_generated, Config, MissingInclude};
use crate::source::SourceFile;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate dictionary decoders, verifier documentation and Lua adapters from annotated C++ sources
#[derive(Parser, Debug)]
#[command(name = "dictgen", version)]
pub struct CommandLineInterface {
    /// settings file (defaults to ./dictgen.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// log pipeline details to stderr
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// write the generated file for each input
    Generate(GenerateOut),
    /// print the parsed and resolved declarations as JSON
    Inspect(InspectOut),
    /// print the documentation of every dictionary struct as JSON
    Schema(SchemaOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// directory for generated files (next to each input if omitted)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// report outputs that are out of date without writing them
    #[arg(long, default_value_t = false)]
    check: bool,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// What happened to one input during `generate`.
#[derive(Debug)]
enum Outcome {
    Written(PathBuf),
    Unchanged(PathBuf),
    Stale(PathBuf),
    Failed(anyhow::Error),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")
    }

    fn load_each(&self) -> anyhow::Result<Vec<SourceFile>> {
        self.paths()?
            .iter()
            .map(|path| {
                SourceFile::read(path).with_context(|| format!("failed to read source file {}", path.display()))
            })
            .collect()
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;
        match &self.cmd {
            Command::Generate(target) => target.run(&config),
            Command::Inspect(target) => {
                let units = target
                    .input_settings
                    .load_each()?
                    .iter()
                    .map(crate::analyze)
                    .collect::<Result<Vec<_>, _>>()?;
                let src = serde_json::to_string_pretty(&units)?;
                println!("{src}");
                Ok(())
            }
            Command::Schema(target) => {
                let mut docs = Vec::new();
                for source in target.input_settings.load_each()? {
                    let unit = crate::analyze(&source)?;
                    if let serde_json::Value::Array(items) = crate::documentation(&unit) {
                        docs.extend(items);
                    }
                }
                let src = serde_json::to_string_pretty(&docs)?;
                write_or_print(target.out.as_deref(), &src)
            }
        }
    }
}

impl GenerateOut {
    fn run(&self, config: &Config) -> anyhow::Result<()> {
        let inputs = self.input_settings.paths()?;
        tracing::debug!(files = inputs.len(), check = self.check, "generating");

        // one file per task; results come back in input order
        let outcomes: Vec<Outcome> = inputs
            .par_iter()
            .map(|input| self.process(input, config).unwrap_or_else(Outcome::Failed))
            .collect();

        let mut failures = 0usize;
        for (input, outcome) in inputs.iter().zip(outcomes) {
            match outcome {
                Outcome::Written(out) => {
                    tracing::info!(input = %input.display(), output = %out.display(), "written");
                }
                Outcome::Unchanged(out) => {
                    tracing::debug!(output = %out.display(), "unchanged");
                }
                Outcome::Stale(out) => {
                    failures += 1;
                    eprintln!("{}: {} is out of date", "stale".yellow().bold(), out.display());
                }
                Outcome::Failed(error) => {
                    failures += 1;
                    eprintln!("{}: {error:#}", "error".red().bold());
                }
            }
        }
        if failures > 0 {
            bail!("{failures} of {} file(s) failed", inputs.len());
        }
        Ok(())
    }

    fn process(&self, input: &Path, config: &Config) -> anyhow::Result<Outcome> {
        let source = SourceFile::read(input)
            .with_context(|| format!("failed to read source file {}", input.display()))?;
        let unit = crate::analyze(&source)?;
        let output = config.output_path(input, self.out_dir.as_deref());

        if !unit.is_empty() {
            let file_name = output.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            if !includes_generated(&source.text, &file_name) {
                let message = format!("{} never includes {file_name}", input.display());
                match config.missing_include {
                    MissingInclude::Ignore => {}
                    MissingInclude::Warn => eprintln!("{}: {message}", "warning".yellow().bold()),
                    MissingInclude::Error => bail!(message),
                }
            }
        }

        let generated = crate::emit::assemble(&unit);
        let current = std::fs::read_to_string(&output).ok();
        let unchanged = current.as_deref() == Some(generated.as_str());
        if self.check {
            return Ok(if unchanged { Outcome::Unchanged(output) } else { Outcome::Stale(output) });
        }
        if unchanged && config.skip_unchanged {
            return Ok(Outcome::Unchanged(output));
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&output, &generated)
            .with_context(|| format!("failed to write {}", output.display()))?;
        Ok(Outcome::Written(output))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_or_print(out: Option<&Path>, src: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{src}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched = Vec::new();
            for entry in glob::glob(pattern)? {
                matched.push(entry?);
            }
            if matched.is_empty() {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
            matched.sort();
            out.extend(matched);
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
