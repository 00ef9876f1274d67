//! Incremental tailing of files in watched directories.
//!
//! On every tick the [`DirectoryWatcher`] lists each watched directory (not
//! recursively), compares every file's size with the offset it recorded for
//! that path, and writes only the newly appended bytes into its [`ByteSink`],
//! in pieces of at most [`READ_CHUNK_SIZE`] bytes.
//! Offsets live for the lifetime of the process; a restart tails every file
//! from the beginning again.
//!
//! Every file feeds the same sink, so a line left unterminated at the end of
//! one file runs into the first line of the next file read.
//!
//! A failure to list a directory or read a file aborts the rest of the tick.
//! Offsets recorded before the failure are kept, so the next tick resumes
//! where the last successful read stopped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

use crate::error::WatchError;
use crate::scheduler::{JobHandle, Scheduler};
use crate::sink::{ByteSink, ByteSource, byte_channel};

/// Largest piece of a file handed to the sink at once.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Summary of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Regular files inspected.
    pub files_seen: usize,
    /// Files that had grown and were read.
    pub files_read: usize,
    /// Total bytes written to the sink.
    pub bytes_read: u64,
}

/// Tails files in a fixed set of directories.
#[derive(Debug)]
pub struct DirectoryWatcher {
    dirs: Vec<PathBuf>,
    offsets: HashMap<PathBuf, u64>,
    sink: ByteSink,
}

impl DirectoryWatcher {
    /// Creates a watcher writing into `sink`.
    #[must_use]
    pub fn new(dirs: Vec<PathBuf>, sink: ByteSink) -> Self {
        Self {
            dirs,
            offsets: HashMap::new(),
            sink,
        }
    }

    /// Returns the watched directories.
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Returns the number of bytes already consumed from `path`, if it was seen.
    #[must_use]
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.offsets.get(path).copied()
    }

    /// Scans every watched directory once and forwards appended bytes.
    ///
    /// # Errors
    ///
    /// Returns the first listing, read, or sink error; the remainder of the
    /// scan is skipped.
    pub async fn scan(&mut self) -> Result<ScanReport, WatchError> {
        let mut report = ScanReport::default();
        for dir in &self.dirs {
            scan_dir(dir, &mut self.offsets, &self.sink, &mut report).await?;
        }
        Ok(report)
    }

    /// Moves the watcher onto `scheduler`, scanning once per `interval`.
    pub fn spawn(self, scheduler: &Scheduler, interval: Duration) -> JobHandle {
        let watcher = Arc::new(tokio::sync::Mutex::new(self));
        scheduler.schedule("directory-watcher", interval, move |_| {
            let watcher = Arc::clone(&watcher);
            async move {
                let report = watcher.lock().await.scan().await?;
                if report.bytes_read > 0 {
                    debug!(
                        files = report.files_read,
                        bytes = report.bytes_read,
                        "forwarded appended bytes"
                    );
                }
                Ok::<(), WatchError>(())
            }
        })
    }
}

/// Starts tailing `dirs` on `scheduler` and returns the source of appended bytes.
///
/// At most `capacity` chunks of up to [`READ_CHUNK_SIZE`] bytes are buffered
/// before the watcher waits for the consumer.
pub fn watch(
    dirs: Vec<PathBuf>,
    interval: Duration,
    scheduler: &Scheduler,
    capacity: usize,
) -> ByteSource {
    let (sink, source) = byte_channel(capacity);
    DirectoryWatcher::new(dirs, sink).spawn(scheduler, interval);
    source
}

async fn scan_dir(
    dir: &Path,
    offsets: &mut HashMap<PathBuf, u64>,
    sink: &ByteSink,
    report: &mut ScanReport,
) -> Result<(), WatchError> {
    let read_dir_err = |source| WatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_err)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        files.push(entry.path());
    }
    files.sort();

    for path in files {
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| WatchError::ReadFile {
                path: path.clone(),
                source,
            })?;
        if !metadata.is_file() {
            continue;
        }
        report.files_seen += 1;

        let size = metadata.len();
        let from = match offsets.get(&path).copied() {
            Some(seen) if size < seen => {
                warn!(
                    path = %path.display(),
                    offset = seen,
                    size,
                    "file shrank since last read; skipping"
                );
                continue;
            }
            Some(seen) if size == seen => continue,
            Some(seen) => seen,
            None if size == 0 => continue,
            None => 0,
        };

        let mut file = open_at(&path, from).await?;
        let mut offset = from;
        while offset < size {
            let want = (size - offset).min(READ_CHUNK_SIZE as u64) as usize;
            let chunk = read_chunk(&mut file, want)
                .await
                .map_err(|source| WatchError::ReadFile {
                    path: path.clone(),
                    source,
                })?;
            if chunk.is_empty() {
                break;
            }

            let read = chunk.len() as u64;
            sink.write(chunk).await?;
            offset += read;
            offsets.insert(path.clone(), offset);
            report.bytes_read += read;
        }
        report.files_read += 1;
    }

    Ok(())
}

/// Opens `path` positioned at byte `from`.
async fn open_at(path: &Path, from: u64) -> Result<tokio::fs::File, WatchError> {
    let read_err = |source| WatchError::ReadFile {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(read_err)?;
    file.seek(std::io::SeekFrom::Start(from))
        .await
        .map_err(read_err)?;
    Ok(file)
}

/// Reads up to `want` bytes. Returns fewer only when the file ends early.
async fn read_chunk(file: &mut tokio::fs::File, want: usize) -> std::io::Result<Bytes> {
    let mut chunk = BytesMut::with_capacity(want);
    let mut limited = (&mut *file).take(want as u64);
    while chunk.len() < want {
        if limited.read_buf(&mut chunk).await? == 0 {
            break;
        }
    }
    Ok(chunk.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn drain(source: &mut ByteSource) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = source.read(&mut buf).await.unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    fn append(path: &Path, data: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(data.as_bytes()).unwrap();
    }

    fn setup() -> (TempDir, DirectoryWatcher, ByteSource) {
        let dir = TempDir::new().unwrap();
        let (sink, source) = byte_channel(64);
        let watcher = DirectoryWatcher::new(vec![dir.path().to_path_buf()], sink);
        (dir, watcher, source)
    }

    #[tokio::test]
    async fn first_scan_reads_whole_file() {
        let (dir, mut watcher, mut source) = setup();
        let file = dir.path().join("app.log");
        append(&file, "line one\nline two\n");

        let report = watcher.scan().await.unwrap();

        assert_eq!(report.files_read, 1);
        assert_eq!(report.bytes_read, 18);
        assert_eq!(drain(&mut source).await, b"line one\nline two\n");
        assert_eq!(watcher.offset(&file), Some(18));
    }

    #[tokio::test]
    async fn only_appended_bytes_are_emitted_once() {
        let (dir, mut watcher, mut source) = setup();
        let file = dir.path().join("app.log");
        append(&file, "old\n");
        watcher.scan().await.unwrap();
        drain(&mut source).await;

        append(&file, "new bytes\n");
        let report = watcher.scan().await.unwrap();
        assert_eq!(report.bytes_read, 10);
        assert_eq!(drain(&mut source).await, b"new bytes\n");

        let report = watcher.scan().await.unwrap();
        assert_eq!(report.bytes_read, 0);
        assert!(drain(&mut source).await.is_empty());
    }

    #[tokio::test]
    async fn no_growth_emits_nothing() {
        let (dir, mut watcher, mut source) = setup();
        append(&dir.path().join("a.log"), "x\n");
        watcher.scan().await.unwrap();
        drain(&mut source).await;

        let report = watcher.scan().await.unwrap();
        assert_eq!(report.files_seen, 1);
        assert_eq!(report.files_read, 0);
        assert!(drain(&mut source).await.is_empty());
    }

    #[tokio::test]
    async fn every_grown_file_is_read_in_name_order() {
        let (dir, mut watcher, mut source) = setup();
        append(&dir.path().join("b.log"), "from b\n");
        append(&dir.path().join("a.log"), "from a\n");

        let report = watcher.scan().await.unwrap();

        assert_eq!(report.files_read, 2);
        assert_eq!(drain(&mut source).await, b"from a\nfrom b\n");
    }

    #[tokio::test]
    async fn subdirectories_are_not_scanned() {
        let (dir, mut watcher, mut source) = setup();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        append(&nested.join("deep.log"), "hidden\n");

        let report = watcher.scan().await.unwrap();

        assert_eq!(report.files_seen, 0);
        assert!(drain(&mut source).await.is_empty());
    }

    #[tokio::test]
    async fn empty_unseen_file_is_skipped() {
        let (dir, mut watcher, _source) = setup();
        let file = dir.path().join("empty.log");
        append(&file, "");

        watcher.scan().await.unwrap();
        assert_eq!(watcher.offset(&file), None);
    }

    #[tokio::test]
    async fn truncated_file_is_skipped() {
        let (dir, mut watcher, mut source) = setup();
        let file = dir.path().join("app.log");
        append(&file, "0123456789\n");
        watcher.scan().await.unwrap();
        drain(&mut source).await;

        std::fs::write(&file, "new\n").unwrap();
        let report = watcher.scan().await.unwrap();

        assert_eq!(report.files_read, 0);
        assert!(drain(&mut source).await.is_empty());
        assert_eq!(watcher.offset(&file), Some(11));
    }

    #[tokio::test]
    async fn missing_directory_aborts_scan() {
        let good = TempDir::new().unwrap();
        append(&good.path().join("a.log"), "never read\n");
        let (sink, mut source) = byte_channel(8);
        let mut watcher = DirectoryWatcher::new(
            vec![good.path().join("does-not-exist"), good.path().to_path_buf()],
            sink,
        );

        let err = watcher.scan().await.unwrap_err();

        assert!(matches!(err, WatchError::ReadDir { .. }));
        assert!(drain(&mut source).await.is_empty());
    }

    #[tokio::test]
    async fn closed_sink_fails_scan_and_keeps_offset() {
        let (dir, mut watcher, source) = setup();
        let file = dir.path().join("app.log");
        append(&file, "data\n");
        drop(source);

        assert!(matches!(watcher.scan().await, Err(WatchError::SinkClosed)));
        assert_eq!(watcher.offset(&file), None);
    }

    #[tokio::test]
    async fn large_growth_is_sent_in_bounded_chunks() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("big.log");
        let line = format!("{}\n", "x".repeat(63));
        let content = line.repeat(READ_CHUNK_SIZE * 3 / line.len() + 1);
        append(&file, &content);

        let (sink, mut source) = byte_channel(1);
        let mut watcher = DirectoryWatcher::new(vec![dir.path().to_path_buf()], sink);
        let scan = tokio::spawn(async move {
            let report = watcher.scan().await;
            (watcher, report)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!scan.is_finished(), "scan waits while the channel is full");

        let mut received = Vec::new();
        while !scan.is_finished() {
            received.extend(drain(&mut source).await);
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let (watcher, report) = scan.await.unwrap();
        received.extend(drain(&mut source).await);

        assert_eq!(received, content.as_bytes());
        assert_eq!(report.unwrap().bytes_read, content.len() as u64);
        assert_eq!(watcher.offset(&file), Some(content.len() as u64));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_file_aborts_rest_of_tick() {
        let (dir, mut watcher, mut source) = setup();
        let broken = dir.path().join("a.log");
        std::os::unix::fs::symlink(dir.path().join("missing-target"), &broken).unwrap();
        let later = dir.path().join("b.log");
        append(&later, "waits\n");

        let err = watcher.scan().await.unwrap_err();
        assert!(matches!(&err, WatchError::ReadFile { path, .. } if path == &broken));
        assert!(drain(&mut source).await.is_empty());
        assert_eq!(watcher.offset(&later), None);

        std::fs::remove_file(&broken).unwrap();
        watcher.scan().await.unwrap();
        assert_eq!(drain(&mut source).await, b"waits\n");
        assert_eq!(watcher.offset(&later), Some(6));
    }

    #[tokio::test]
    async fn unterminated_tail_runs_into_next_file() {
        let (dir, mut watcher, mut source) = setup();
        append(&dir.path().join("a.log"), "{\"id\":\"a\"");
        append(&dir.path().join("b.log"), "{\"id\":\"b\"}\n");

        watcher.scan().await.unwrap();

        assert_eq!(drain(&mut source).await, b"{\"id\":\"a\"{\"id\":\"b\"}\n");
    }

    #[tokio::test]
    async fn watch_tails_on_schedule() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("app.log");
        append(&file, "first\n");

        let scheduler = Scheduler::new();
        let mut source = watch(
            vec![dir.path().to_path_buf()],
            Duration::from_millis(20),
            &scheduler,
            8,
        );

        let mut collected = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        let mut appended = false;
        while collected != b"first\nsecond\n" && tokio::time::Instant::now() < deadline {
            collected.extend(drain(&mut source).await);
            if !appended && collected == b"first\n" {
                append(&file, "second\n");
                appended = true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        scheduler.close();
        assert_eq!(collected, b"first\nsecond\n");
    }
}
