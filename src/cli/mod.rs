//! MB-017: CLI subcommands (init, validate, list, run).

use crate::console::Console;
use crate::core::error::{MobyError, Result};
use crate::core::parser;
use crate::core::runner::{self, SessionOptions};
use crate::transport::docker::DockerCli;
use crate::transport::ContainerEngine;
use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter moby.yml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate moby.yml without touching docker
    Validate {
        /// Path to moby.yml
        #[arg(short, long, default_value = "moby.yml")]
        file: PathBuf,
    },

    /// List the envlist and each environment's phases
    List {
        /// Path to moby.yml
        #[arg(short, long, default_value = "moby.yml")]
        file: PathBuf,
    },

    /// Build an image, start a container and run the environments in it
    Run {
        /// Path to moby.yml
        #[arg(short, long, default_value = "moby.yml")]
        file: PathBuf,

        /// Docker build context
        #[arg(long, default_value = ".")]
        context: PathBuf,

        /// Run in an existing image instead of building one
        #[arg(long)]
        image: Option<String>,

        /// Docker binary to invoke
        #[arg(long, default_value = "docker")]
        docker: String,

        /// Run only these environments (repeatable; envlist order is kept)
        #[arg(short, long = "env")]
        env: Vec<String>,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::List { file } => cmd_list(&file, &mut std::io::stdout()),
        Commands::Run {
            file,
            context,
            image,
            docker,
            env,
        } => {
            let engine = DockerCli::with_program(docker);
            let opts = SessionOptions {
                context_dir: context,
                image,
                envs: env,
                local_root: PathBuf::from("."),
            };
            cmd_run(&engine, &file, opts, &mut Console::stdout())
        }
    }
}

const TEMPLATE: &str = r#"# Environments run in envlist order inside one container.
# Phases run as: before, push, run, pull, after.
envlist: [test]

test:
  push: [.]
  run:
    - echo "hello from $(pwd)"
  pull: []
"#;

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = path.join("moby.yml");
    if config_path.exists() {
        return Err(MobyError::Configuration(format!(
            "{} already exists",
            config_path.display()
        )));
    }

    std::fs::create_dir_all(path).map_err(|e| {
        MobyError::Configuration(format!("cannot create {}: {}", path.display(), e))
    })?;
    std::fs::write(&config_path, TEMPLATE).map_err(|e| {
        MobyError::Configuration(format!("cannot write {}: {}", config_path.display(), e))
    })?;

    println!("Created {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);

    if errors.is_empty() {
        println!(
            "OK: {} ({} in envlist, {} defined)",
            file.display(),
            config.envlist.len(),
            config.environments.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(MobyError::Configuration(format!(
            "{} validation error(s)",
            errors.len()
        )))
    }
}

fn cmd_list(file: &Path, out: &mut impl Write) -> Result<()> {
    let config = parser::load_config(file)?;
    let width = config.envlist.iter().map(String::len).max().unwrap_or(0);
    for name in &config.envlist {
        if let Some(env) = config.environment(name) {
            writeln!(out, "{:width$}  {}", name, env, width = width)?;
        }
    }
    Ok(())
}

/// Load, validate and select before any engine call, then run the session.
fn cmd_run<E, W>(engine: &E, file: &Path, mut opts: SessionOptions, console: &mut Console<W>) -> Result<()>
where
    E: ContainerEngine + ?Sized,
    W: Write,
{
    let config = parser::load_config(file)?;
    opts.envs = parser::select_envs(&config, &opts.envs)?;
    info!(file = %file.display(), envs = ?opts.envs, "starting session");
    runner::run_session(engine, &config, &opts, console)
}
