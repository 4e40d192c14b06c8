//! Job orchestration module.
//!
//! A job is one batch of copies from a source tree to a destination tree:
//! - Creating a job from the two roots and the control file
//! - Planning it (reading watermarks and building the worklist)
//! - Running it (copying one file at a time while polling progress)
//!
//! The front-end steers a running job through `JobControl`.

use crate::config::JobConfig;
use crate::control_store::{advance_watermark, hold_watermark_before, ControlStore};
use crate::copier::CopyEngine;
use crate::error::EngineError;
use crate::model::{FileOutcome, JobSummary, TransferState, Watermarks, WorkItem};
use crate::progress::ProgressCallback;
use crate::task::TaskHandle;
use crate::worklist::WorklistProvider;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The state of an entire job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created (and possibly planned), not yet started
    Pending,
    /// Currently executing
    Running,
    /// All files processed or the job was stopped
    Completed,
}

/// One batch of copies.
#[derive(Debug)]
pub struct CopyJob {
    /// Unique identifier for this job
    pub id: Uuid,

    /// Root source directory
    pub source_root: PathBuf,

    /// Root destination directory
    pub destination_root: PathBuf,

    /// Control file holding the folder watermarks
    pub control_path: PathBuf,

    /// Files to copy, sorted by relative path
    pub items: Vec<WorkItem>,

    /// Watermarks read at planning time and advanced while running
    pub watermarks: Watermarks,

    /// True when `watermarks` differ from what is on disk
    pub dirty: bool,

    /// Sum of all item lengths
    pub total_bytes: u64,

    pub state: JobState,

    /// Index of the file being copied (if Running)
    pub current_index: Option<usize>,

    pub created_at: SystemTime,
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
}

impl CopyJob {
    pub fn source_path(&self, item: &WorkItem) -> PathBuf {
        self.source_root.join(&item.relative_path)
    }

    pub fn destination_path(&self, item: &WorkItem) -> PathBuf {
        self.destination_root.join(&item.relative_path)
    }

    /// One-line description of the pending work.
    pub fn status_line(&self) -> String {
        let count = self.items.len();
        if count == 0 {
            return "Destination is up-to-date.".to_string();
        }
        format!(
            "{} {} in {} {} to be copied.",
            group_thousands(self.total_bytes),
            if self.total_bytes == 1 { "byte" } else { "bytes" },
            count,
            if count == 1 { "file" } else { "files" },
        )
    }
}

/// `8000` -> `8,000`
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Create a new job.
///
/// Validates that both roots exist and are directories and that the control
/// file exists.
///
/// # Errors
/// Returns EngineError naming the first path that fails validation
pub fn create_job<P: AsRef<Path>>(
    source_root: P,
    destination_root: P,
    control_path: P,
) -> Result<CopyJob, EngineError> {
    let source_root = source_root.as_ref();
    let destination_root = destination_root.as_ref();
    let control_path = control_path.as_ref();

    if !source_root.exists() {
        return Err(EngineError::SourceNotFound {
            path: source_root.to_path_buf(),
        });
    }
    require_dir(source_root, "Source folder")?;
    require_dir(destination_root, "Destination folder")?;

    match std::fs::metadata(control_path) {
        Ok(metadata) if metadata.is_dir() => {
            return Err(EngineError::InvalidPath {
                path: control_path.to_path_buf(),
                reason: "Control file is a directory".to_string(),
            });
        }
        Ok(_) => {}
        Err(_) => {
            return Err(EngineError::ControlFileNotFound {
                path: control_path.to_path_buf(),
            });
        }
    }

    Ok(CopyJob {
        id: Uuid::new_v4(),
        source_root: source_root.to_path_buf(),
        destination_root: destination_root.to_path_buf(),
        control_path: control_path.to_path_buf(),
        items: Vec::new(),
        watermarks: Watermarks::new(),
        dirty: false,
        total_bytes: 0,
        state: JobState::Pending,
        current_index: None,
        created_at: SystemTime::now(),
        start_time: None,
        end_time: None,
    })
}

fn require_dir(path: &Path, what: &str) -> Result<(), EngineError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::InvalidPath {
            path: path.to_path_buf(),
            reason: format!("{} must be a directory", what),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(EngineError::InvalidPath {
            path: path.to_path_buf(),
            reason: format!("{} does not exist", what),
        }),
        Err(e) => Err(EngineError::SourceAccessDenied {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Plan a job: read the watermarks and build the worklist.
///
/// May be called again on a pending job to refresh it.
///
/// # Errors
/// Returns EngineError if the job already ran, the control file can't be
/// read, or scanning fails
pub fn plan_job(
    job: &mut CopyJob,
    provider: &dyn WorklistProvider,
    store: &dyn ControlStore,
) -> Result<(), EngineError> {
    if job.state != JobState::Pending {
        return Err(EngineError::InvalidPath {
            path: job.source_root.clone(),
            reason: format!("Job must be in Pending state to plan; current state: {:?}", job.state),
        });
    }

    job.watermarks = store.read(&job.control_path)?;
    job.items = provider.worklist(&job.watermarks)?;
    job.total_bytes = job.items.iter().map(|item| item.length).sum();
    job.dirty = false;

    info!(files = job.items.len(), bytes = job.total_bytes, "job planned");
    Ok(())
}

/// Run a job, copying every planned item in order.
///
/// Each file is started on `engine` and polled every `poll_interval` until
/// done. A file that fails does not stop the job. Folder watermarks advance
/// for copied and skipped files but stay below the earliest failed file of
/// their folder, and are written to the control file once at the end if they
/// changed.
///
/// # Errors
/// Returns EngineError if the job is not pending or the control file can't
/// be written. Per-file failures are reported in the summary instead.
pub fn run_job(
    job: &mut CopyJob,
    engine: &CopyEngine,
    control: &JobControl,
    store: &dyn ControlStore,
    config: &JobConfig,
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<JobSummary, EngineError> {
    if job.state != JobState::Pending {
        return Err(EngineError::InvalidPath {
            path: job.source_root.clone(),
            reason: format!("Job must be in Pending state to run; current state: {:?}", job.state),
        });
    }

    job.state = JobState::Running;
    job.start_time = Some(SystemTime::now());

    if let Some(callback) = progress_callback {
        callback.on_job_started(job);
    }

    let mut summary = JobSummary {
        total_files: job.items.len(),
        total_bytes: job.total_bytes,
        ..JobSummary::default()
    };
    let mut bytes_before = 0u64;
    // Earliest failed mtime per folder
    let mut failed_since: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();

    for index in 0..job.items.len() {
        if !control.wait_until_runnable() {
            break;
        }
        job.current_index = Some(index);

        let item = job.items[index].clone();
        let source = job.source_path(&item);
        let destination = job.destination_path(&item);

        let started = if control.is_paused() {
            engine.start_paused(&source, &destination)
        } else {
            engine.start(&source, &destination)
        };

        let outcome = match started {
            Ok(handle) => {
                control.attach(&handle);
                if let Some(callback) = progress_callback {
                    callback.on_file_started(job, index);
                }

                while !handle.wait_timeout(config.poll_interval()) {
                    if let Some(callback) = progress_callback {
                        let bytes = handle.bytes_copied();
                        callback.on_file_progress(job, index, bytes, bytes_before + bytes);
                    }
                }
                handle.wait();
                control.detach();
                outcome_of(&handle)
            }
            Err(e) => {
                warn!(item = %item.relative_path, error = %e, "copy not started");
                if let Some(callback) = progress_callback {
                    callback.on_file_started(job, index);
                }
                FileOutcome::Failed(e.to_string())
            }
        };

        bytes_before += item.length;
        summary.record(&item, &outcome);

        // A file aborted by stop() was not the user's choice to skip.
        let keep_watermark = control.is_stopping() && outcome == FileOutcome::Skipped;
        if outcome.advances_watermark()
            && !keep_watermark
            && advance_watermark(&mut job.watermarks, &item)
        {
            job.dirty = true;
        }
        if let (FileOutcome::Failed(_), Some(folder)) = (&outcome, item.folder()) {
            let failed_at = DateTime::<Utc>::from(item.modified);
            failed_since
                .entry(folder.to_string())
                .and_modify(|earliest| *earliest = (*earliest).min(failed_at))
                .or_insert(failed_at);
        }

        if let Some(callback) = progress_callback {
            callback.on_file_completed(job, index, &outcome);
        }
    }

    // Later successes in a folder must not carry its watermark past a failure.
    for (folder, failed_at) in failed_since {
        if hold_watermark_before(&mut job.watermarks, &folder, failed_at) {
            job.dirty = true;
        }
    }

    summary.stopped = control.is_stopping();
    job.state = JobState::Completed;
    job.end_time = Some(SystemTime::now());
    job.current_index = None;

    if job.dirty {
        store.write(&job.control_path, &job.watermarks)?;
        job.dirty = false;
        debug!(path = %job.control_path.display(), "watermarks saved");
    }

    info!(
        copied = summary.copied_count,
        skipped = summary.skipped_count,
        failed = summary.failed_count,
        stopped = summary.stopped,
        "job finished"
    );

    if let Some(callback) = progress_callback {
        callback.on_job_completed(job, &summary);
    }

    Ok(summary)
}

fn outcome_of(handle: &TaskHandle) -> FileOutcome {
    match handle.error_message() {
        None => FileOutcome::Copied,
        Some(_) if handle.state() == TransferState::Aborted => FileOutcome::Skipped,
        Some(message) => FileOutcome::Failed(message),
    }
}

/// Front-end controls for a running job.
///
/// Safe to call from any thread while `run_job` runs on another.
#[derive(Debug, Default)]
pub struct JobControl {
    inner: Mutex<ControlState>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct ControlState {
    paused: bool,
    stopping: bool,
    active: Option<TaskHandle>,
}

impl JobControl {
    pub fn new() -> Self {
        JobControl::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pause the active copy; the next file will not start until `resume`.
    pub fn pause(&self) {
        let mut state = self.lock();
        state.paused = true;
        if let Some(active) = &state.active {
            active.pause();
        }
        self.changed.notify_all();
    }

    pub fn resume(&self) {
        let mut state = self.lock();
        state.paused = false;
        if let Some(active) = &state.active {
            active.resume();
        }
        self.changed.notify_all();
    }

    /// Abort the active copy and move on to the next file.
    pub fn skip(&self) {
        if let Some(active) = &self.lock().active {
            active.abort();
        }
    }

    /// Abort the active copy and end the job after it.
    pub fn stop(&self) {
        let mut state = self.lock();
        state.stopping = true;
        if let Some(active) = &state.active {
            active.abort();
        }
        self.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_stopping(&self) -> bool {
        self.lock().stopping
    }

    /// Handle of the file being copied, if any.
    pub fn active(&self) -> Option<TaskHandle> {
        self.lock().active.clone()
    }

    /// Make `handle` the target of pause/skip/stop, applying any pending
    /// pause or stop that raced with its start.
    pub(crate) fn attach(&self, handle: &TaskHandle) {
        let mut state = self.lock();
        if state.stopping {
            handle.abort();
        } else if state.paused {
            handle.pause();
        }
        state.active = Some(handle.clone());
    }

    pub(crate) fn detach(&self) {
        self.lock().active = None;
    }

    /// Block while paused. Returns false once the job should stop.
    pub(crate) fn wait_until_runnable(&self) -> bool {
        let state = self.lock();
        let state = self
            .changed
            .wait_while(state, |s| s.paused && !s.stopping)
            .unwrap_or_else(PoisonError::into_inner);
        !state.stopping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::control_store::JsonControlStore;
    use crate::worklist::FolderScanner;
    use chrono::{TimeZone, Utc};
    use filetime::FileTime;
    use std::fs;
    use std::thread;
    use std::time::Duration;

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        src: PathBuf,
        dst: PathBuf,
        control: PathBuf,
    }

    /// Source tree with folder "Show" (watermark at t=1000) holding two new
    /// videos and one already-covered video.
    fn fixture() -> Fixture {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        let control = temp_dir.path().join("control.json");
        fs::create_dir_all(src.join("Show")).expect("Failed to create src");
        fs::create_dir_all(&dst).expect("Failed to create dst");

        for (name, size, mtime) in [("ep1.avi", 3000, 2_000), ("ep2.mp4", 5000, 3_000), ("old.avi", 10, 500)] {
            let path = src.join("Show").join(name);
            fs::write(&path, vec![b'v'; size]).expect("Failed to write video");
            filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0))
                .expect("Failed to set mtime");
        }

        let mut marks = Watermarks::new();
        marks.insert("Show".to_string(), Utc.timestamp_opt(1_000, 0).unwrap());
        JsonControlStore.write(&control, &marks).expect("Failed to write control file");

        Fixture {
            _temp_dir: temp_dir,
            src,
            dst,
            control,
        }
    }

    fn planned(fx: &Fixture) -> CopyJob {
        let mut job = create_job(&fx.src, &fx.dst, &fx.control).expect("Failed to create job");
        let scanner = FolderScanner::new(&fx.src, &fx.dst, &JobConfig::default().extensions);
        plan_job(&mut job, &scanner, &JsonControlStore).expect("Failed to plan job");
        job
    }

    fn engine() -> CopyEngine {
        CopyEngine::new(EngineConfig::with_buffer_size(1024)).expect("Failed to create engine")
    }

    fn fast_config() -> JobConfig {
        JobConfig {
            poll_interval_ms: 5,
            ..JobConfig::default()
        }
    }

    // Test helper: Mock progress callback to track invocations
    #[derive(Default)]
    struct TestProgressCallback {
        calls: Mutex<Vec<String>>,
    }

    impl TestProgressCallback {
        fn get_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ProgressCallback for TestProgressCallback {
        fn on_job_started(&self, _job: &CopyJob) {
            self.calls.lock().unwrap().push("on_job_started".to_string());
        }

        fn on_file_started(&self, _job: &CopyJob, file_index: usize) {
            self.calls.lock().unwrap().push(format!("on_file_started({})", file_index));
        }

        fn on_file_progress(&self, _job: &CopyJob, file_index: usize, _bytes: u64, _total: u64) {
            self.calls.lock().unwrap().push(format!("on_file_progress({})", file_index));
        }

        fn on_file_completed(&self, _job: &CopyJob, file_index: usize, outcome: &FileOutcome) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("on_file_completed({}, {:?})", file_index, outcome));
        }

        fn on_job_completed(&self, _job: &CopyJob, _summary: &JobSummary) {
            self.calls.lock().unwrap().push("on_job_completed".to_string());
        }
    }

    /// Skips the first file as soon as it starts.
    struct SkipFirst<'a> {
        control: &'a JobControl,
    }

    impl ProgressCallback for SkipFirst<'_> {
        fn on_job_started(&self, _job: &CopyJob) {}

        fn on_file_started(&self, _job: &CopyJob, file_index: usize) {
            if file_index == 0 {
                self.control.skip();
            }
        }

        fn on_file_progress(&self, _job: &CopyJob, _file_index: usize, _bytes: u64, _total: u64) {}

        fn on_file_completed(&self, _job: &CopyJob, _file_index: usize, _outcome: &FileOutcome) {}

        fn on_job_completed(&self, _job: &CopyJob, _summary: &JobSummary) {}
    }

    #[test]
    fn test_create_job_with_missing_source() {
        let fx = fixture();
        let result = create_job(&fx.src.join("nope"), &fx.dst, &fx.control);
        assert!(matches!(result, Err(EngineError::SourceNotFound { .. })));
    }

    #[test]
    fn test_create_job_with_missing_control_file() {
        let fx = fixture();
        let result = create_job(&fx.src, &fx.dst, &fx.dst.join("absent.json"));
        assert!(matches!(result, Err(EngineError::ControlFileNotFound { .. })));
    }

    #[test]
    fn test_create_job_with_file_as_destination() {
        let fx = fixture();
        let result = create_job(&fx.src, &fx.control, &fx.control);
        assert!(matches!(result, Err(EngineError::InvalidPath { .. })));
    }

    #[test]
    fn test_plan_job_populates_items() {
        let fx = fixture();
        let job = planned(&fx);

        let paths: Vec<_> = job.items.iter().map(|i| i.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["Show/ep1.avi", "Show/ep2.mp4"]);
        assert_eq!(job.total_bytes, 8000);
        assert_eq!(job.status_line(), "8,000 bytes in 2 files to be copied.");
        assert_eq!(job.state, JobState::Pending);
    }

    #[test]
    fn test_run_job_copies_and_saves_watermarks() {
        let fx = fixture();
        let mut job = planned(&fx);
        let progress = TestProgressCallback::default();

        let summary = run_job(
            &mut job,
            &engine(),
            &JobControl::new(),
            &JsonControlStore,
            &fast_config(),
            Some(&progress),
        )
        .expect("Failed to run job");

        assert_eq!(summary.copied_count, 2);
        assert_eq!(summary.failed_count, 0);
        assert_eq!(summary.bytes_copied, 8000);
        assert!(!summary.stopped);
        assert_eq!(job.state, JobState::Completed);
        assert!(!job.dirty);

        assert_eq!(fs::read(fx.dst.join("Show/ep1.avi")).expect("read ep1").len(), 3000);
        assert_eq!(fs::read(fx.dst.join("Show/ep2.mp4")).expect("read ep2").len(), 5000);
        assert!(!fx.dst.join("Show/old.avi").exists());

        let marks = JsonControlStore.read(&fx.control).expect("Failed to read control file");
        assert_eq!(marks["Show"], Utc.timestamp_opt(3_000, 0).unwrap());

        let calls = progress.get_calls();
        assert_eq!(calls.first().map(String::as_str), Some("on_job_started"));
        assert_eq!(calls.last().map(String::as_str), Some("on_job_completed"));
        assert!(calls.contains(&"on_file_completed(0, Copied)".to_string()));
        assert!(calls.contains(&"on_file_completed(1, Copied)".to_string()));

        // Replanning finds nothing left to do
        let mut again = planned(&fx);
        assert!(again.items.is_empty());
        assert_eq!(again.status_line(), "Destination is up-to-date.");
        let summary = run_job(
            &mut again,
            &engine(),
            &JobControl::new(),
            &JsonControlStore,
            &fast_config(),
            None,
        )
        .expect("Failed to run empty job");
        assert_eq!(summary.total_files, 0);
    }

    #[test]
    fn test_run_job_requires_pending_state() {
        let fx = fixture();
        let mut job = planned(&fx);
        let control = JobControl::new();

        run_job(&mut job, &engine(), &control, &JsonControlStore, &fast_config(), None)
            .expect("First run should succeed");

        let result = run_job(&mut job, &engine(), &control, &JsonControlStore, &fast_config(), None);
        assert!(result.is_err(), "Second run should fail");
    }

    #[test]
    fn test_run_job_records_failure_without_advancing_watermark() {
        let fx = fixture();
        let mut job = planned(&fx);

        // ep2 appears at the destination after planning
        fs::create_dir_all(fx.dst.join("Show")).expect("Failed to create dst folder");
        fs::write(fx.dst.join("Show/ep2.mp4"), b"already here").expect("Failed to write dest");

        let summary = run_job(
            &mut job,
            &engine(),
            &JobControl::new(),
            &JsonControlStore,
            &fast_config(),
            None,
        )
        .expect("Failed to run job");

        assert_eq!(summary.copied_count, 1);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.failed_items[0].0, "Show/ep2.mp4");
        assert_eq!(
            fs::read(fx.dst.join("Show/ep2.mp4")).expect("read ep2"),
            b"already here"
        );

        let marks = JsonControlStore.read(&fx.control).expect("Failed to read control file");
        assert_eq!(marks["Show"], Utc.timestamp_opt(2_000, 0).unwrap());
    }

    #[test]
    fn test_failed_file_is_listed_again_after_later_success() {
        let fx = fixture();
        let mut job = planned(&fx);

        // ep1 sorts first and fails; ep2 (newer) still copies
        let blocker = fx.dst.join("Show/ep1.avi");
        fs::create_dir_all(&blocker).expect("Failed to create blocker");

        let summary = run_job(
            &mut job,
            &engine(),
            &JobControl::new(),
            &JsonControlStore,
            &fast_config(),
            None,
        )
        .expect("Failed to run job");
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.copied_count, 1);

        let marks = JsonControlStore.read(&fx.control).expect("Failed to read control file");
        assert!(marks["Show"] < Utc.timestamp_opt(2_000, 0).unwrap());
        assert!(marks["Show"] >= Utc.timestamp_opt(1_000, 0).unwrap());

        fs::remove_dir(&blocker).expect("Failed to remove blocker");
        let again = planned(&fx);
        let paths: Vec<_> = again.items.iter().map(|i| i.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["Show/ep1.avi"]);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_skip_aborts_only_the_active_file() {
        let fx = fixture();
        let mut job = planned(&fx);
        let control = JobControl::new();
        let skipper = SkipFirst { control: &control };

        let summary = run_job(
            &mut job,
            &engine(),
            &control,
            &JsonControlStore,
            &fast_config(),
            Some(&skipper),
        )
        .expect("Failed to run job");

        assert_eq!(summary.skipped_count, 1);
        assert_eq!(summary.copied_count, 1);
        assert_eq!(summary.failed_count, 0);
        assert!(fx.dst.join("Show/ep2.mp4").exists());
        assert!(!fx.dst.join("Show/ep1.avi").exists());
    }

    #[test]
    fn test_stop_before_start_copies_nothing() {
        let fx = fixture();
        let mut job = planned(&fx);
        let control = JobControl::new();
        control.stop();

        let summary = run_job(&mut job, &engine(), &control, &JsonControlStore, &fast_config(), None)
            .expect("Failed to run job");

        assert!(summary.stopped);
        assert_eq!(summary.copied_count, 0);
        assert!(!fx.dst.join("Show/ep1.avi").exists());
        let marks = JsonControlStore.read(&fx.control).expect("Failed to read control file");
        assert_eq!(marks["Show"], Utc.timestamp_opt(1_000, 0).unwrap());
    }

    #[test]
    fn test_paused_job_waits_for_resume() {
        let fx = fixture();
        let mut job = planned(&fx);
        let control = JobControl::new();
        control.pause();

        let summary = thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(100));
                assert!(control.is_paused());
                control.resume();
            });
            run_job(&mut job, &engine(), &control, &JsonControlStore, &fast_config(), None)
        })
        .expect("Failed to run job");

        assert_eq!(summary.copied_count, 2);
        assert!(!control.is_paused());
    }
}
