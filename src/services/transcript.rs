use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use tokio::process::Command;

use crate::error::Result;

const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Outcome of one downloader invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptRun {
    /// Exit status of the downloader; a missing tool also reads as `false`.
    pub success: bool,
    /// Subtitle files that appeared in the output directory during this run.
    pub files: Vec<PathBuf>,
}

/// Downloads auto-generated subtitles with `yt-dlp` and turns them into plain text.
pub struct TranscriptFetcher {
    program: String,
    leading_args: Vec<String>,
}

impl TranscriptFetcher {
    pub fn new() -> Self {
        Self::with_command(DEFAULT_PROGRAM, Vec::<String>::new())
    }

    /// Uses `program` (followed by `leading_args`) in place of `yt-dlp`.
    pub fn with_command<I, S>(program: impl Into<String>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    pub async fn fetch_transcript(&self, url: &str, output_dir: &Path) -> TranscriptRun {
        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            tracing::warn!("Cannot create transcript directory {}: {}", output_dir.display(), e);
            return TranscriptRun::default();
        }

        tracing::info!("Fetching transcript from: {}", url);
        let before = subtitle_files(output_dir).await.unwrap_or_default();

        let template = output_dir.join("%(title)s.%(ext)s");
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args([
                "--write-subs",
                "--no-overwrites",
                "--write-auto-sub",
                "--skip-download",
                "--sub-format",
                "vtt",
                "--output",
            ])
            .arg(&template)
            .args(["--no-warnings", "--ignore-errors"])
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await;

        let success = match output {
            Ok(output) => {
                for line in String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .chain(String::from_utf8_lossy(&output.stderr).lines())
                {
                    tracing::debug!("{}: {}", self.program, line.trim());
                }
                if !output.status.success() {
                    tracing::warn!("{} exited with {} for {}", self.program, output.status, url);
                }
                output.status.success()
            }
            Err(e) => {
                tracing::warn!("Failed to run {}: {}", self.program, e);
                false
            }
        };

        let mut files: Vec<PathBuf> = subtitle_files(output_dir)
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|f| !before.contains(f))
            .collect();
        files.sort();

        TranscriptRun { success, files }
    }
}

impl Default for TranscriptFetcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn subtitle_files(dir: &Path) -> Result<HashSet<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = HashSet::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "vtt") {
            files.insert(path);
        }
    }
    Ok(files)
}

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

fn language_suffix() -> &'static Regex {
    static LANG: OnceLock<Regex> = OnceLock::new();
    LANG.get_or_init(|| Regex::new(r"\.[a-z]{2,3}(-[A-Za-z0-9]+)?$").expect("static regex"))
}

/// Converts a WebVTT document to plain caption text in file order.
pub fn parse_vtt(source: &str) -> String {
    let normalized = source.replace("\r\n", "\n");
    let mut lines: Vec<String> = Vec::new();

    for block in normalized.split("\n\n") {
        let block = block.trim_matches('\n');
        let first = block.lines().next().unwrap_or_default();
        if first.starts_with("WEBVTT")
            || first.starts_with("NOTE")
            || first.starts_with("STYLE")
            || first.starts_with("REGION")
        {
            continue;
        }

        let mut cue = block.lines().skip_while(|l| !l.contains("-->"));
        if cue.next().is_none() {
            continue;
        }

        for line in cue {
            let text = tag_pattern()
                .replace_all(line, "")
                .replace("&nbsp;", " ")
                .replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&amp;", "&");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() || lines.last() == Some(&text) {
                continue;
            }
            lines.push(text);
        }
    }

    lines.join(" ")
}

/// Title for a subtitle file written as `<title>.<lang>.vtt`.
///
/// Never empty: a file with nothing before the language tag keeps its full name.
pub fn video_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = language_suffix().replace(&stem, "");
    if !title.trim().is_empty() {
        return title.into_owned();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Untitled video".to_string())
}
