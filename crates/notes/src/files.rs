//! Async Markdown file helpers shared by the processors.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::{StreamExt, TryStreamExt, stream};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Lines of `path`, or `None` when the file does not exist.
pub async fn read_lines(path: &Path) -> Result<Option<Vec<String>>> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw.lines().map(ToString::to_string).collect())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}

pub async fn exists(path: &Path) -> Result<bool> {
    fs::try_exists(path)
        .await
        .with_context(|| format!("stat {}", path.display()))
}

/// `*.md` files directly inside `dir`, sorted by name.  A missing directory
/// yields an empty list.
pub async fn list_markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("list {}", dir.display())),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("list {}", dir.display()))?
    {
        let path = entry.path();
        let is_markdown = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if is_markdown && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read every file with at most `parallelism` reads in flight and concatenate
/// their lines in the order of `paths`.
pub async fn read_all_lines(paths: Vec<PathBuf>, parallelism: usize) -> Result<Vec<String>> {
    let per_file: Vec<Vec<String>> = stream::iter(paths)
        .map(|path| async move {
            let raw = fs::read_to_string(&path)
                .await
                .with_context(|| format!("read {}", path.display()))?;
            Ok::<_, anyhow::Error>(raw.lines().map(ToString::to_string).collect())
        })
        .buffered(parallelism.max(1))
        .try_collect()
        .await?;
    Ok(per_file.into_iter().flatten().collect())
}

/// Append `text` to `path`, creating the file and its parent directories.
pub async fn append_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path).await?;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(text.as_bytes())
        .await
        .with_context(|| format!("append {}", path.display()))?;
    file.flush().await?;
    Ok(())
}

/// Replace the contents of `path` with `lines`, one per line.
pub async fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    ensure_parent(path).await?;
    let mut body = lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(path, body)
        .await
        .with_context(|| format!("write {}", path.display()))
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    Ok(())
}
