use std::path::Path;

use anyhow::{Context, Result};

/// Upper bound for a single log tail request.
pub const MAX_LOG_LINES: usize = 1000;

/// Last `lines` lines of the file at `path`, capped at [`MAX_LOG_LINES`].
pub async fn tail_lines(path: &Path, lines: usize) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read log file {}", path.display()))?;
    let wanted = lines.min(MAX_LOG_LINES);
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(wanted);
    Ok(all[start..].iter().map(|line| line.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_trailing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task_diag.log");
        std::fs::write(&path, "a\nb\nc\n").unwrap();

        assert_eq!(tail_lines(&path, 2).await.unwrap(), vec!["b", "c"]);
        assert_eq!(tail_lines(&path, 10).await.unwrap().len(), 3);
        assert!(tail_lines(&path, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn request_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.log");
        let body: String = (0..1500).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&path, body).unwrap();

        let lines = tail_lines(&path, 5000).await.unwrap();
        assert_eq!(lines.len(), MAX_LOG_LINES);
        assert_eq!(lines.last().map(String::as_str), Some("line 1499"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = tail_lines(Path::new("/no/such/navtask.log"), 5).await.unwrap_err();
        assert!(err.to_string().contains("failed to read log file"));
    }
}
