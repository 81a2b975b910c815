//! Change-driven build and deploy for monorepos.
//!
//! Reads `.monodeploy.toml` from the working directory, discovers actions
//! from their manifests, and builds and deploys the ones touched by the
//! current change set.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use monodeploy::action::Action;
use monodeploy::core::selector::select;
use monodeploy::core::types::RunStatus;
use monodeploy::exit_codes;
use monodeploy::io::changes::{ChangeSource, GitChangeSource};
use monodeploy::io::config::{CONFIG_FILE, DeployConfig, load_config, write_config};
use monodeploy::io::deploy::GitDeployTarget;
use monodeploy::io::output::normalize_directories;
use monodeploy::io::report::write_report;
use monodeploy::io::workspace::{ActionCatalog, Workspace};
use monodeploy::logging;
use monodeploy::run::{RunConfig, RunEvent, run_deploy};

#[derive(Parser)]
#[command(
    name = "monodeploy",
    version,
    about = "Build and deploy the monorepo actions affected by a change"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reset the output directory, then build and deploy affected actions.
    Deploy {
        /// Working directory (monorepo root or a subdirectory of it).
        #[arg(short = 'd', long = "directory", default_value = ".")]
        directory: PathBuf,
        /// Output directory; overrides `output_dir` from the config.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// Build only, do not deploy.
        #[arg(short = 's', long = "skip-deploy")]
        skip_deploy: bool,
        /// Number of builds to run at once; overrides `build.jobs`.
        #[arg(short = 'j', long = "jobs")]
        jobs: Option<usize>,
        /// Revision to diff `HEAD` against; overrides `changes.base`.
        #[arg(long)]
        base: Option<String>,
        /// Abort actions not started within this many seconds.
        #[arg(long = "timeout")]
        timeout_secs: Option<u64>,
        /// Write the run report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the actions affected by the change set and why.
    Affected {
        #[arg(short = 'd', long = "directory", default_value = ".")]
        directory: PathBuf,
        #[arg(long)]
        base: Option<String>,
    },
    /// Print every discovered action and its ownership rules.
    List {
        #[arg(short = 'd', long = "directory", default_value = ".")]
        directory: PathBuf,
    },
    /// Write a default `.monodeploy.toml` if missing.
    Init {
        #[arg(short = 'd', long = "directory", default_value = ".")]
        directory: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Deploy {
            directory,
            output,
            skip_deploy,
            jobs,
            base,
            timeout_secs,
            report,
        } => {
            let mut config = load_workdir_config(&directory)?;
            if let Some(output) = output {
                config.output_dir = output.to_string_lossy().to_string();
            }
            if let Some(jobs) = jobs {
                config.build.jobs = jobs;
            }
            if let Some(base) = base {
                config.changes.base = base;
            }
            config.validate().context("invalid command-line overrides")?;
            cmd_deploy(&directory, config, skip_deploy, timeout_secs, report.as_deref())
        }
        Command::Affected { directory, base } => {
            let mut config = load_workdir_config(&directory)?;
            if let Some(base) = base {
                config.changes.base = base;
            }
            config.validate().context("invalid command-line overrides")?;
            cmd_affected(&directory, config)?;
            Ok(exit_codes::OK)
        }
        Command::List { directory } => {
            let config = load_workdir_config(&directory)?;
            cmd_list(&directory, config)?;
            Ok(exit_codes::OK)
        }
        Command::Init { directory, force } => {
            cmd_init(&directory, force)?;
            Ok(exit_codes::OK)
        }
    }
}

fn load_workdir_config(directory: &Path) -> Result<DeployConfig> {
    load_config(&directory.join(CONFIG_FILE)).context("load config")
}

fn cmd_deploy(
    directory: &Path,
    config: DeployConfig,
    skip_deploy: bool,
    timeout_secs: Option<u64>,
    report_path: Option<&Path>,
) -> Result<i32> {
    let (workdir, output_dir) =
        normalize_directories(directory, Path::new(&config.output_dir))?;
    let run_config = RunConfig {
        workdir,
        output_dir,
        skip_deploy,
        jobs: config.build.jobs,
        deadline: timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs)),
    };
    let changes = change_source(&config);
    let deployer = GitDeployTarget {
        commit_message: config.deploy.commit_message.clone(),
    };
    let workspace = Workspace::new(config);

    let report = run_deploy(&run_config, &workspace, &changes, &deployer, print_event)?;
    if let Some(path) = report_path {
        write_report(path, &report)?;
    }
    Ok(match report.status {
        RunStatus::Failure => exit_codes::FAILED,
        RunStatus::Success | RunStatus::NoOp => exit_codes::OK,
    })
}

fn cmd_affected(directory: &Path, config: DeployConfig) -> Result<()> {
    let (workdir, output_dir) =
        normalize_directories(directory, Path::new(&config.output_dir))?;
    let changes = change_source(&config)
        .changed_files(&workdir)
        .context("collect changed files")?;
    let actions = Workspace::new(config)
        .collect_actions(&workdir, &output_dir)
        .context("collect actions")?;
    for pick in select(&actions, &changes) {
        println!("{}\t{}", actions[pick.index].name(), pick.matched);
    }
    Ok(())
}

fn cmd_list(directory: &Path, config: DeployConfig) -> Result<()> {
    let (workdir, output_dir) =
        normalize_directories(directory, Path::new(&config.output_dir))?;
    let actions = Workspace::new(config)
        .collect_actions(&workdir, &output_dir)
        .context("collect actions")?;
    for action in &actions {
        let rules: Vec<String> = action
            .ownership()
            .map(|ownership| ownership.rules().iter().map(ToString::to_string).collect())
            .unwrap_or_default();
        println!("{}\t{}", action.name(), rules.join(" "));
    }
    Ok(())
}

fn cmd_init(directory: &Path, force: bool) -> Result<()> {
    let path = directory.join(CONFIG_FILE);
    if !force && path.exists() {
        println!("{} already exists", path.display());
        return Ok(());
    }
    write_config(&path, &DeployConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}

fn change_source(config: &DeployConfig) -> GitChangeSource {
    GitChangeSource {
        base: config.changes.base.clone(),
        include_uncommitted: config.changes.include_uncommitted,
    }
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::RunStarted { output_dir, .. } => {
            println!("output directory: {}", output_dir.display());
        }
        RunEvent::ActionsDiscovered { names } => println!("found {} actions", names.len()),
        RunEvent::ChangesDetected { files } => println!("{} changed files", files.len()),
        RunEvent::ActionSelected { name, matched } => {
            println!("selected {name} (changed: {matched})");
        }
        RunEvent::NothingToDo => println!("no actions affected, nothing to do"),
        RunEvent::BuildStarted { name } => println!("building {name}"),
        RunEvent::BuildSucceeded { name, elapsed } => {
            println!("built {name} in {}", seconds(*elapsed));
        }
        RunEvent::BuildFailed {
            name,
            elapsed,
            error,
        } => println!("build of {name} failed after {}: {error}", seconds(*elapsed)),
        RunEvent::DeploySkipped { name } => println!("skipping deploy of {name}"),
        RunEvent::DeployStarted { name } => println!("deploying {name}"),
        RunEvent::DeploySucceeded { name, elapsed } => {
            println!("deployed {name} in {}", seconds(*elapsed));
        }
        RunEvent::DeployFailed {
            name,
            elapsed,
            error,
        } => println!("deploy of {name} failed after {}: {error}", seconds(*elapsed)),
        RunEvent::ActionAborted { name } => println!("aborted {name}: deadline passed"),
        RunEvent::RunCompleted { status, elapsed } => match status {
            RunStatus::Failure => println!("completed with errors in {}", seconds(*elapsed)),
            RunStatus::Success | RunStatus::NoOp => println!("done in {}", seconds(*elapsed)),
        },
    }
}

fn seconds(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}
