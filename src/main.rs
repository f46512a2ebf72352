//! Command-line front end for the tax intake rules and submission pipeline.
//!
//! Every command reads a form as a JSON object from a file (or `-` for
//! stdin) and prints its result to stdout.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use taxintake::notify::LogMailer;
use taxintake::summary::TextRenderer;
use taxintake::{steps, validate, DraftId, FileDraftStore, FormState, IntakeConfig, IntakeService};

#[derive(Parser)]
#[command(name = "taxintake", version, about = "Tax intake form rules and submission")]
struct Cli {
    /// TOML config file. Defaults to the per-user config if present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the optional fields the form currently shows.
    Visible {
        form: PathBuf,
        /// Also list the indices of the rules that fired.
        #[arg(long)]
        explain: bool,
    },
    /// Print per-step completion and overall progress.
    Progress { form: PathBuf },
    /// Check the form and list every failure.
    Validate { form: PathBuf },
    /// Validate, assign an intake id and send the notifications.
    Submit {
        form: PathBuf,
        /// Submission time (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Manage saved drafts.
    #[command(subcommand)]
    Draft(DraftCommand),
}

#[derive(Subcommand)]
enum DraftCommand {
    /// Save a form as a new draft and print its id.
    Save { form: PathBuf },
    /// Print a draft's form, or the most recent draft when no id is given.
    Load { id: Option<DraftId> },
    /// Delete a draft.
    Discard { id: DraftId },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    taxintake::logging::init(taxintake::logging::directive_for(cli.verbose));

    let config = IntakeConfig::discover(cli.config.as_deref()).context("load config")?;
    match cli.command {
        Command::Visible { form, explain } => cmd_visible(config, &form, explain),
        Command::Progress { form } => cmd_progress(&form),
        Command::Validate { form } => cmd_validate(&form),
        Command::Submit { form, at } => cmd_submit(config, &form, at),
        Command::Draft(cmd) => cmd_draft(config, cmd),
    }
}

fn service(config: IntakeConfig) -> Result<IntakeService> {
    let drafts = FileDraftStore::new(&config.draft_dir)
        .with_context(|| format!("open draft dir {}", config.draft_dir.display()))?;
    let renderer = TextRenderer::new(config.firm_name.clone());
    IntakeService::new(config, Box::new(drafts), Box::new(renderer), Box::new(LogMailer))
        .context("initialise intake service")
}

fn cmd_visible(config: IntakeConfig, path: &Path, explain: bool) -> Result<()> {
    let form = read_form(path)?;
    let service = service(config)?;
    let report = service.rules().evaluate_detailed(&form);
    for field in report.visibility().visible() {
        println!("{field}");
    }
    if explain {
        eprintln!(
            "fired rules {:?} in {:?}",
            report.fired(),
            report.duration()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct StepStatus {
    id: steps::StepId,
    title: &'static str,
    complete: bool,
    fields_filled: f64,
}

#[derive(Serialize)]
struct ProgressReport {
    steps: Vec<StepStatus>,
    progress: steps::Progress,
}

fn cmd_progress(path: &Path) -> Result<()> {
    let form = read_form(path)?;
    let report = ProgressReport {
        steps: steps::visible_steps(&form)
            .into_iter()
            .map(|step| StepStatus {
                id: step.id,
                title: step.title,
                complete: step.is_complete(&form),
                fields_filled: steps::completion_percentage(&form, step.id),
            })
            .collect(),
        progress: steps::progress(&form),
    };
    print_json(&report)
}

fn cmd_validate(path: &Path) -> Result<()> {
    let form = read_form(path)?;
    match validate::validate(&form, Utc::now().date_naive()) {
        Ok(()) => {
            println!("ok");
            Ok(())
        }
        Err(errors) => {
            for error in errors.iter() {
                println!("{error}");
            }
            bail!("{errors}")
        }
    }
}

fn cmd_submit(config: IntakeConfig, path: &Path, at: Option<DateTime<Utc>>) -> Result<()> {
    let form = read_form(path)?;
    let receipt = service(config)?.submit(&form, at)?;
    print_json(&receipt)
}

fn cmd_draft(config: IntakeConfig, cmd: DraftCommand) -> Result<()> {
    let service = service(config)?;
    let now = Utc::now();
    match cmd {
        DraftCommand::Save { form } => {
            let id = service.save_draft(read_form(&form)?, now)?;
            println!("{id}");
        }
        DraftCommand::Load { id } => {
            let draft = match id {
                Some(id) => service.load_draft(&id, now)?,
                None => service.latest_draft(now)?,
            };
            let Some(draft) = draft else {
                bail!("no draft found");
            };
            print_json(&draft)?;
        }
        DraftCommand::Discard { id } => {
            if !service.discard_draft(&id)? {
                bail!("no draft '{id}'");
            }
        }
    }
    Ok(())
}

fn read_form(path: &Path) -> Result<FormState> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("read form from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    };
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    FormState::try_from(json).with_context(|| format!("load form from {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
