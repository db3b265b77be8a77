use super::entry::{LogEntry, LogLevel};
use crate::error::OpsError;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

const REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// A log destination. Failures are returned, never raised past the logger.
#[async_trait]
pub trait LogSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, entry: &LogEntry) -> Result<(), OpsError>;
}

/// Writes formatted lines to stderr for ERROR/WARN and stdout otherwise.
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl LogSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn write(&self, entry: &LogEntry) -> Result<(), OpsError> {
        let line = entry.format_line();
        match entry.level {
            LogLevel::Error | LogLevel::Warn => eprintln!("{}", line),
            LogLevel::Info | LogLevel::Debug => println!("{}", line),
        }
        Ok(())
    }
}

/// Appends to `<dir>/<service>-<date>.log` with size-based rotation.
pub struct FileSink {
    dir: PathBuf,
    service: String,
    max_file_size: u64,
    max_files: usize,
    // Serializes append + rotate so two writers never rotate the same file
    write_lock: Mutex<()>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, service: impl Into<String>, max_file_size: u64, max_files: usize) -> Self {
        Self {
            dir: dir.into(),
            service: service.into(),
            max_file_size,
            max_files,
            write_lock: Mutex::new(()),
        }
    }

    /// Active file for today.
    pub fn current_path(&self) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.log",
            self.service,
            Utc::now().format("%Y-%m-%d")
        ))
    }

    async fn append(&self, path: &Path, line: &str) -> std::io::Result<u64> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(file.metadata().await?.len())
    }

    async fn rotate(&self, path: &Path) -> std::io::Result<()> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(self.service.as_str())
            .to_string();
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f").to_string();

        // Rotations within the same millisecond get increasing sequence numbers
        let mut seq = 0u32;
        let rotated = loop {
            let candidate = self.dir.join(format!("{}.{}-{:04}.log", stem, stamp, seq));
            if !tokio::fs::try_exists(&candidate).await? {
                break candidate;
            }
            seq += 1;
        };
        tokio::fs::rename(path, &rotated).await?;
        debug!(from = %path.display(), to = %rotated.display(), "Rotated log file");
        self.prune(path).await
    }

    /// Deletes the oldest rotated files beyond `max_files`.
    async fn prune(&self, active: &Path) -> std::io::Result<()> {
        let prefix = format!("{}-", self.service);
        let mut rotated = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == active {
                continue;
            }
            let is_rotated = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".log") && n.matches('.').count() >= 2);
            if is_rotated {
                rotated.push(path);
            }
        }

        if rotated.len() <= self.max_files {
            return Ok(());
        }

        // Names embed date then timestamp, so lexical order is chronological
        rotated.sort();
        let excess = rotated.len() - self.max_files;
        for path in rotated.into_iter().take(excess) {
            tokio::fs::remove_file(&path).await?;
            debug!(path = %path.display(), "Pruned rotated log file");
        }
        Ok(())
    }
}

#[async_trait]
impl LogSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn write(&self, entry: &LogEntry) -> Result<(), OpsError> {
        let _guard = self.write_lock.lock().await;
        let path = self.current_path();

        let size = self
            .append(&path, &entry.format_line())
            .await
            .map_err(|e| OpsError::sink("file", e))?;

        if size > self.max_file_size {
            self.rotate(&path)
                .await
                .map_err(|e| OpsError::sink("file", e))?;
        }
        Ok(())
    }
}

/// POSTs each entry as JSON with a bearer token.
pub struct RemoteSink {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl RemoteSink {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl LogSink for RemoteSink {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn write(&self, entry: &LogEntry) -> Result<(), OpsError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(entry)
            .send()
            .await
            .map_err(|e| OpsError::sink("remote", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpsError::sink("remote", format!("HTTP {}", status)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message, "venue-api", None, None)
    }

    #[tokio::test]
    async fn test_file_sink_creates_directory_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let sink = FileSink::new(&log_dir, "venue-api", 1024 * 1024, 5);

        sink.write(&entry("first")).await.unwrap();
        sink.write(&entry("second")).await.unwrap();

        let content = std::fs::read_to_string(sink.current_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO venue-api: first"));
        assert!(lines[1].ends_with("INFO venue-api: second"));
    }

    #[tokio::test]
    async fn test_file_sink_rotates_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        // Every write exceeds the limit, so every write rotates
        let sink = FileSink::new(dir.path(), "venue-api", 10, 2);

        for i in 0..5 {
            sink.write(&entry(&format!("line {}", i))).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(names.len(), 2, "{:?}", names);
        assert!(!sink.current_path().exists());

        // The survivors are the two most recent writes
        let newest = std::fs::read_to_string(dir.path().join(&names[1])).unwrap();
        assert!(newest.contains("line 4"));
    }

    #[tokio::test]
    async fn test_back_to_back_rotations_keep_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path(), "svc", 10, 100);

        for i in 0..20 {
            sink.write(&entry(&format!("line {}", i))).await.unwrap();
        }

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 20, "{:?}", names);

        // Lexical order of rotated names follows write order
        let lines: Vec<String> = names
            .iter()
            .map(|name| std::fs::read_to_string(dir.path().join(name)).unwrap())
            .collect();
        for (i, content) in lines.iter().enumerate() {
            assert!(content.trim_end().ends_with(&format!("line {}", i)), "{}", content);
        }
    }

    #[tokio::test]
    async fn test_file_sink_reports_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let sink = FileSink::new(blocker.join("logs"), "venue-api", 1024, 5);
        let err = sink.write(&entry("lost")).await.unwrap_err();
        assert!(err.to_string().starts_with("Log sink file failed"));
    }

    #[tokio::test]
    async fn test_remote_sink_posts_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let sink = RemoteSink::new(format!("{}/ingest", server.uri()), "secret");
        sink.write(&entry("shipped")).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["message"], "shipped");
        assert_eq!(body["level"], "INFO");
    }

    #[tokio::test]
    async fn test_remote_sink_non_success_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = RemoteSink::new(server.uri(), "secret");
        let err = sink.write(&entry("dropped")).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
