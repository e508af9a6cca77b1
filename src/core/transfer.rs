//! MB-004: File transfer. Push and pull go through in-memory tar archives.
//!
//! Both directions resolve the container's working directory once per call
//! (a silent `pwd`) and work relative to that single snapshot.
//!
//! - push: every path goes into one archive, uploaded in one call.
//! - pull: one archive fetch and one extraction per path.

use super::error::{MobyError, Result};
use super::executor::run_command;
use crate::console::Console;
use crate::transport::{ContainerEngine, ContainerId};
use std::io::{self, Cursor, Read, Write};
use std::path::{Component, Path};
use tracing::debug;

/// Resolve a container path against the working directory.
///
/// Absolute paths pass through unchanged; relative ones are joined with a
/// single `/`.
pub fn resolve_remote_path(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    if cwd.is_empty() {
        return path.to_string();
    }
    if cwd.ends_with('/') {
        format!("{}{}", cwd, path)
    } else {
        format!("{}/{}", cwd, path)
    }
}

fn remote_cwd<E, W>(engine: &E, container: &ContainerId, console: &mut Console<W>) -> Result<String>
where
    E: ContainerEngine + ?Sized,
    W: Write,
{
    Ok(run_command(engine, container, "pwd", console, true)?.output)
}

/// Copy `paths` out of the container into `local_root`.
///
/// Entry names inside each archive decide the local layout: pulling `out`
/// (a directory) recreates `out/...` under `local_root`.
pub fn pull<E, W>(
    engine: &E,
    container: &ContainerId,
    paths: &[String],
    console: &mut Console<W>,
    local_root: &Path,
) -> Result<()>
where
    E: ContainerEngine + ?Sized,
    W: Write,
{
    let cwd = remote_cwd(engine, container, console)?;
    for path in paths {
        let remote = resolve_remote_path(&cwd, path);
        debug!(%remote, "pulling");

        let mut stream = engine
            .get_archive(container, &remote)
            .map_err(|e| MobyError::transfer(&remote, e))?;
        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .map_err(|e| MobyError::transfer(&remote, e))?;

        tar::Archive::new(Cursor::new(buf))
            .unpack(local_root)
            .map_err(|e| MobyError::transfer(&remote, e))?;
    }
    Ok(())
}

/// Copy `paths` (relative to `local_root`) into the container's working
/// directory as a single archive.
pub fn push<E, W>(
    engine: &E,
    container: &ContainerId,
    paths: &[String],
    console: &mut Console<W>,
    local_root: &Path,
) -> Result<()>
where
    E: ContainerEngine + ?Sized,
    W: Write,
{
    let cwd = remote_cwd(engine, container, console)?;
    let archive = build_archive(paths, local_root)?;
    debug!(%cwd, files = paths.len(), bytes = archive.len(), "pushing");
    engine
        .put_archive(container, &cwd, &archive)
        .map_err(|e| MobyError::transfer(&cwd, e))
}

/// Tar `paths` in order. Directories are added recursively; entry names are
/// the paths as given, minus any leading `/`. Symlinks are stored as links.
///
/// A path with a `..` component cannot be named inside the archive and is
/// rejected before anything is read.
pub fn build_archive(paths: &[String], local_root: &Path) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);

    for path in paths {
        let source = local_root.join(path);
        let name = archive_name(path);
        if Path::new(name)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(MobyError::transfer(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "paths containing '..' cannot be pushed",
                ),
            ));
        }
        let metadata =
            std::fs::symlink_metadata(&source).map_err(|e| MobyError::transfer(path, e))?;
        let added = if metadata.is_dir() {
            builder.append_dir_all(name, &source)
        } else {
            builder.append_path_with_name(&source, name)
        };
        added.map_err(|e| MobyError::transfer(path, e))?;
    }

    builder
        .into_inner()
        .map_err(|e| MobyError::transfer(paths.join(", "), e))
}

fn archive_name(path: &str) -> &str {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        "."
    } else {
        trimmed
    }
}
