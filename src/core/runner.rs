//! MB-005: Environment runner (recursive phase processing and sessions).
//!
//! Each environment runs its phases depth-first in a fixed order:
//! before → push → run → pull → after. The first failure anywhere unwinds
//! the whole call stack; nothing after it runs, at any depth.

use super::error::{MobyError, Result};
use super::executor::run_command;
use super::transfer;
use super::types::{EnvironmentSpec, MobyConfig};
use crate::console::Console;
use crate::transport::{ContainerEngine, ContainerId};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Run one environment (and its nested environments) against `container`.
pub fn run_env<E, W>(
    engine: &E,
    container: &ContainerId,
    spec: &EnvironmentSpec,
    console: &mut Console<W>,
    local_root: &Path,
) -> Result<()>
where
    E: ContainerEngine + ?Sized,
    W: Write,
{
    if let Some(before) = &spec.before {
        run_env(engine, container, before, console, local_root)?;
    }

    if let Some(paths) = spec.push.as_deref().filter(|p| !p.is_empty()) {
        transfer::push(engine, container, paths, console, local_root)?;
    }

    for command in &spec.run {
        run_command(engine, container, command, console, false)?;
    }

    if let Some(paths) = spec.pull.as_deref().filter(|p| !p.is_empty()) {
        transfer::pull(engine, container, paths, console, local_root)?;
    }

    if let Some(after) = &spec.after {
        run_env(engine, container, after, console, local_root)?;
    }

    Ok(())
}

/// Run the named environments in order; the first failure stops the list.
pub fn run_envlist<E, W>(
    engine: &E,
    container: &ContainerId,
    config: &MobyConfig,
    names: &[String],
    console: &mut Console<W>,
    local_root: &Path,
) -> Result<()>
where
    E: ContainerEngine + ?Sized,
    W: Write,
{
    for name in names {
        let spec = config.environment(name).ok_or_else(|| {
            MobyError::Configuration(format!("environment '{}' is not defined", name))
        })?;
        info!(env = %name, "running environment");
        run_env(engine, container, spec, console, local_root)?;
    }
    Ok(())
}

/// Options for a full session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Build context for the image (ignored when `image` is set)
    pub context_dir: PathBuf,
    /// Use an existing image instead of building one
    pub image: Option<String>,
    /// Environments to run, in order
    pub envs: Vec<String>,
    /// Host directory that push reads from and pull extracts into
    pub local_root: PathBuf,
}

/// Build (or reuse) an image, start a container, run the environments, and
/// stop the container again, whatever happened.
///
/// When both the run and the stop fail, the run's error is returned and the
/// stop failure is only logged.
pub fn run_session<E, W>(
    engine: &E,
    config: &MobyConfig,
    opts: &SessionOptions,
    console: &mut Console<W>,
) -> Result<()>
where
    E: ContainerEngine + ?Sized,
    W: Write,
{
    let image = match &opts.image {
        Some(image) => image.clone(),
        None => {
            console.header("Building image...\n");
            engine.build_image(&opts.context_dir)?
        }
    };
    debug!(%image, "image ready");

    console.header("Starting container...\n");
    let container = engine.start_container(&image)?;
    debug!(%container, "container started");

    let outcome = run_envlist(engine, &container, config, &opts.envs, console, &opts.local_root);

    console.header("Stopping container...\n");
    let stopped = engine.stop_container(&container);
    if let Err(e) = &stopped {
        warn!(%container, error = %e, "failed to stop container");
    }

    outcome?;
    stopped.map_err(MobyError::from)
}
