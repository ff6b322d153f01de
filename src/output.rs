//! Writes generated artifacts to disk without leaving partial output behind.

use crate::codegen::GeneratedArtifact;
use crate::error::OutputError;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The single top-level directory every artifact lives under.
fn package_root(artifacts: &[GeneratedArtifact]) -> Result<OsString, OutputError> {
    let mut root: Option<OsString> = None;
    for artifact in artifacts {
        let path = artifact.path();
        let safe = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || path.components().count() < 2 {
            return Err(OutputError::UnsafePath(path.to_path_buf()));
        }
        let first = match path.components().next() {
            Some(Component::Normal(first)) => first.to_os_string(),
            _ => return Err(OutputError::UnsafePath(path.to_path_buf())),
        };
        match &root {
            Some(existing) if *existing != first => return Err(OutputError::MixedRoots),
            Some(_) => {}
            None => root = Some(first),
        }
    }
    root.ok_or(OutputError::MixedRoots)
}

/// `.<root>.<suffix>`, a hidden sibling of the package directory.
fn hidden(dir: &Path, root: &OsString, suffix: &str) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(root);
    name.push(".");
    name.push(suffix);
    dir.join(name)
}

/// Removes a file or directory tree; a missing path is not an error.
fn remove_path(path: &Path) -> Result<(), OutputError> {
    let removed = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => Err(err),
    };
    removed.map_err(io_error(path))
}

/// Writes `artifacts` below `dir` and returns the paths written.
///
/// Files are first written into a hidden staging directory inside `dir`. Only
/// when all of them are on disk does the staging tree replace the package
/// directory, so an interrupted write never leaves a half-generated package.
/// Whatever sat at the package path before is moved aside and put back if the
/// swap fails; the staging directory is removed on every path.
pub fn write_artifacts(
    dir: &Path,
    artifacts: &[GeneratedArtifact],
) -> Result<Vec<PathBuf>, OutputError> {
    let root = package_root(artifacts)?;
    let staging = hidden(dir, &root, "staging");
    let backup = hidden(dir, &root, "previous");
    let destination = dir.join(&root);

    fs::create_dir_all(dir).map_err(io_error(dir))?;
    remove_path(&staging)?;

    let result = stage(&staging, artifacts)
        .and_then(|()| swap(&staging.join(&root), &destination, &backup));
    let cleanup = remove_path(&staging);
    if let Err(err) = result {
        if let Err(leftover) = cleanup {
            tracing::warn!(error = %leftover, "could not remove staging directory");
        }
        return Err(err);
    }
    cleanup?;

    let written: Vec<PathBuf> = artifacts.iter().map(|a| dir.join(a.path())).collect();
    tracing::info!(
        files = written.len(),
        destination = %destination.display(),
        "wrote generated package"
    );
    Ok(written)
}

/// Moves `staged` to `destination`, keeping the previous occupant in `backup`
/// until the rename has succeeded.
fn swap(staged: &Path, destination: &Path, backup: &Path) -> Result<(), OutputError> {
    remove_path(backup)?;
    let previous = fs::symlink_metadata(destination).is_ok();
    if previous {
        fs::rename(destination, backup).map_err(io_error(destination))?;
    }

    if let Err(source) = fs::rename(staged, destination) {
        if previous {
            if let Err(err) = fs::rename(backup, destination) {
                tracing::warn!(
                    error = %err,
                    backup = %backup.display(),
                    "could not restore previous package"
                );
            }
        }
        return Err(OutputError::Io {
            path: destination.to_path_buf(),
            source,
        });
    }

    if previous {
        if let Err(err) = remove_path(backup) {
            tracing::warn!(error = %err, "could not remove previous package");
        }
    }
    Ok(())
}

fn stage(staging: &Path, artifacts: &[GeneratedArtifact]) -> Result<(), OutputError> {
    for artifact in artifacts {
        let path = staging.join(artifact.path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        fs::write(&path, artifact.contents()).map_err(io_error(&path))?;
        tracing::debug!(path = %artifact.path().display(), "staged artifact");
    }
    Ok(())
}
