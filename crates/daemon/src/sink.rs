// Result files: one numbered URL list per completed job

use async_trait::async_trait;
use chanscout_core::domain::{Job, JobId};
use chanscout_core::port::CompletionListener;
use chanscout_core::Result;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

/// Writes `<dir>/<unix_ts>_<query>.txt` when a job completes
///
/// Existing files are never overwritten: a clash gets `_2`, `_3`, ...
/// appended to the stem.
pub struct FileResultSink {
    output_dir: PathBuf,
    discovery_keyword: String,
    written: Mutex<HashMap<JobId, PathBuf>>,
}

impl FileResultSink {
    pub fn new(output_dir: impl Into<PathBuf>, discovery_keyword: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            discovery_keyword: discovery_keyword.into(),
            written: Mutex::new(HashMap::new()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Files written so far, by job id
    pub async fn written(&self) -> HashMap<JobId, PathBuf> {
        self.written.lock().await.clone()
    }

    fn file_stem(&self, job: &Job) -> String {
        let finished = job.finished_at.unwrap_or(job.created_at);
        let timestamp = finished.div_euclid(1000);
        if job.query.trim().eq_ignore_ascii_case(self.discovery_keyword.trim()) {
            format!("{}_{}", timestamp, self.discovery_keyword.trim())
        } else {
            format!("{}_{}", timestamp, safe_query(&job.query))
        }
    }

    /// Create the first free `<stem>.txt`, `<stem>_2.txt`, ...
    async fn create_unique(&self, stem: &str) -> std::io::Result<(File, PathBuf)> {
        let mut attempt = 1u32;
        loop {
            let name = if attempt == 1 {
                format!("{}.txt", stem)
            } else {
                format!("{}_{}.txt", stem, attempt)
            };
            let path = self.output_dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((file, path)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

fn safe_query(query: &str) -> String {
    query.replace([' ', '/', '\\'], "_")
}

fn render(urls: &[String]) -> String {
    urls.iter()
        .enumerate()
        .map(|(i, url)| format!("{}. {}\n", i + 1, url))
        .collect()
}

#[async_trait]
impl CompletionListener for FileResultSink {
    async fn on_completed(&self, job: &Job) -> Result<()> {
        let (mut file, path) = self.create_unique(&self.file_stem(job)).await?;
        file.write_all(render(&job.result).as_bytes()).await?;
        file.flush().await?;
        info!(job_id = %job.id, path = %path.display(), channels = job.result.len(), "Result file saved");
        self.written.lock().await.insert(job.id.clone(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanscout_core::domain::{ChannelId, StopReason};

    fn completed(id: &str, query: &str, urls: &[&str]) -> Job {
        let mut job = Job::new(id, 1_700_000_000_000, query, 10);
        job.start(1_700_000_001_000).unwrap();
        let result = urls.iter().map(|u| ChannelId::new(*u)).collect();
        job.finish(1_700_000_042_500, StopReason::EndOfResults, result, 3)
            .unwrap();
        job
    }

    #[tokio::test]
    async fn test_writes_numbered_list() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileResultSink::new(dir.path(), "random");
        let job = completed(
            "job-1",
            "lofi beats",
            &["https://www.youtube.com/@a", "https://www.youtube.com/channel/UC1"],
        );

        sink.on_completed(&job).await.unwrap();

        let path = dir.path().join("1700000042_lofi_beats.txt");
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            body,
            "1. https://www.youtube.com/@a\n2. https://www.youtube.com/channel/UC1\n"
        );
        assert_eq!(sink.written().await.get("job-1"), Some(&path));
    }

    #[tokio::test]
    async fn test_path_separators_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileResultSink::new(dir.path(), "random");
        let job = completed("job-1", r"ac/dc \ live", &["https://www.youtube.com/@a"]);

        sink.on_completed(&job).await.unwrap();

        assert!(dir.path().join("1700000042_ac_dc___live.txt").exists());
    }

    #[tokio::test]
    async fn test_discovery_jobs_use_keyword_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileResultSink::new(dir.path(), "random");
        let job = completed("job-1", "Random", &["https://www.youtube.com/@a"]);

        sink.on_completed(&job).await.unwrap();

        assert!(dir.path().join("1700000042_random.txt").exists());
    }

    #[tokio::test]
    async fn test_same_query_in_same_second_gets_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileResultSink::new(dir.path(), "random");
        let first = completed("job-1", "lofi", &["https://www.youtube.com/@a"]);
        let second = completed("job-2", "lofi", &["https://www.youtube.com/@b"]);
        let third = completed("job-3", "lofi", &["https://www.youtube.com/@c"]);

        for job in [&first, &second, &third] {
            sink.on_completed(job).await.unwrap();
        }

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("1700000042_lofi.txt"), "1. https://www.youtube.com/@a\n");
        assert_eq!(read("1700000042_lofi_2.txt"), "1. https://www.youtube.com/@b\n");
        assert_eq!(read("1700000042_lofi_3.txt"), "1. https://www.youtube.com/@c\n");

        let written = sink.written().await;
        assert_eq!(written.len(), 3);
        assert_eq!(
            written.get("job-2"),
            Some(&dir.path().join("1700000042_lofi_2.txt"))
        );
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileResultSink::new(dir.path().join("missing"), "random");
        let job = completed("job-1", "lofi", &["https://www.youtube.com/@a"]);

        let err = sink.on_completed(&job).await.unwrap_err();
        assert!(matches!(err, chanscout_core::AppError::Io(_)));
        assert!(sink.written().await.is_empty());
    }
}
