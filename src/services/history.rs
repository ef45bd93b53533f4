use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{AppError, Result};

/// Generated distils stored as flat markdown files.
#[derive(Debug, Clone)]
pub struct History {
    dir: PathBuf,
}

impl History {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `distil-YYYY-MM-DD.md`; a second run on the same day replaces the file.
    pub async fn save_daily(&self, markdown: &str) -> Result<PathBuf> {
        self.save(markdown, &Local::now().format("%Y-%m-%d").to_string())
            .await
    }

    /// `distil-YYYY-MM-DD_HHMM.md`
    pub async fn save_timestamped(&self, markdown: &str) -> Result<PathBuf> {
        self.save(markdown, &Local::now().format("%Y-%m-%d_%H%M").to_string())
            .await
    }

    pub async fn save(&self, markdown: &str, stamp: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("distil-{stamp}.md"));
        tokio::fs::write(&path, markdown).await?;
        tracing::info!("Saved distil to {}", path.display());
        Ok(path)
    }

    /// File names of saved distils, newest first.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.path().extension().is_some_and(|ext| ext == "md") {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    pub async fn read(&self, name: &str) -> Result<String> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(AppError::NotFound(name.to_string()));
        }

        let path = self.dir.join(name);
        let is_file = tokio::fs::metadata(&path)
            .await
            .is_ok_and(|meta| meta.is_file());
        if !is_file {
            return Err(AppError::NotFound(name.to_string()));
        }
        Ok(tokio::fs::read_to_string(path).await?)
    }
}
