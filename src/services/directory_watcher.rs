//! Directory watching.
//!
//! `DirectoryWatcher` is the seam the manager talks to. `NotifyWatcher` implements it
//! on top of `notify`: the OS thread only forwards raw events over a channel, and
//! translation into `WatchEvent`s happens in `poll_events` on the caller's thread.

use crate::config::{WatcherBackend, WatcherConfig};
use crate::error::{DirError, Result};
use crate::file_utils::PathExt;
use log::{debug, warn};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use std::time::{Duration, Instant};

/// A change inside the watched directory. Names are relative to that directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(String),
    Deleted(String),
    Modified(String),
    Renamed { from: String, to: String },
}

/// Observes one directory at a time.
pub trait DirectoryWatcher {
    /// Retargets the watcher. Releases the OS watch on the previous path, if any.
    fn set_watch_path(&mut self, path: &Path) -> Result<()>;

    /// Starts observing the current watch path. No-op if already observing it.
    fn observe(&mut self) -> Result<()>;

    fn stop_observing(&mut self);

    /// Drains everything observed since the last call.
    fn poll_events(&mut self) -> Vec<WatchEvent>;
}

/// Turns raw notify events into `WatchEvent`s.
///
/// Rename halves carrying a tracker are paired: the first `To` matching a pending
/// `From` produces the rename, and the trailing `Both` for that tracker is dropped.
/// A `From` that never finds its `To` is reported as a deletion after `rename_timeout`.
#[derive(Debug)]
pub(crate) struct EventTranslator {
    watch_dir: Option<PathBuf>,
    rename_timeout: Duration,
    pending_from: HashMap<usize, (String, Instant)>,
    completed: HashMap<usize, Instant>,
}

impl EventTranslator {
    pub(crate) fn new(rename_timeout: Duration) -> Self {
        Self {
            watch_dir: None,
            rename_timeout,
            pending_from: HashMap::new(),
            completed: HashMap::new(),
        }
    }

    pub(crate) fn reset(&mut self, watch_dir: Option<PathBuf>) {
        self.watch_dir = watch_dir;
        self.pending_from.clear();
        self.completed.clear();
    }

    fn name_of(&self, path: &Path) -> Option<String> {
        if self.watch_dir.as_deref() == Some(path) {
            return None;
        }
        path.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
    }

    pub(crate) fn translate(&mut self, event: Event, now: Instant, out: &mut Vec<WatchEvent>) {
        let tracker = event.attrs.tracker();
        let simple: fn(String) -> WatchEvent = match event.kind {
            EventKind::Create(_) => WatchEvent::Created,
            EventKind::Remove(_) => WatchEvent::Deleted,
            EventKind::Modify(ModifyKind::Name(mode)) => {
                self.translate_rename(mode, &event.paths, tracker, now, out);
                return;
            }
            EventKind::Modify(_) => WatchEvent::Modified,
            _ => return,
        };
        out.extend(event.paths.iter().filter_map(|p| self.name_of(p)).map(simple));
    }

    fn translate_rename(
        &mut self,
        mode: RenameMode,
        paths: &[PathBuf],
        tracker: Option<usize>,
        now: Instant,
        out: &mut Vec<WatchEvent>,
    ) {
        match mode {
            RenameMode::Both => {
                if let Some(t) = tracker {
                    self.pending_from.remove(&t);
                    if self.completed.remove(&t).is_some() {
                        return;
                    }
                }
                let (Some(from), Some(to)) = (
                    paths.first().and_then(|p| self.name_of(p)),
                    paths.get(1).and_then(|p| self.name_of(p)),
                ) else {
                    debug!("Ignoring incomplete rename event: {:?}", paths);
                    return;
                };
                out.push(WatchEvent::Renamed { from, to });
            }
            RenameMode::From => {
                let names: Vec<String> = paths.iter().filter_map(|p| self.name_of(p)).collect();
                for name in names {
                    match tracker {
                        Some(t) => {
                            self.pending_from.insert(t, (name, now));
                        }
                        None => out.push(WatchEvent::Deleted(name)),
                    }
                }
            }
            RenameMode::To => {
                let names: Vec<String> = paths.iter().filter_map(|p| self.name_of(p)).collect();
                for name in names {
                    match tracker.and_then(|t| self.pending_from.remove(&t).map(|f| (t, f))) {
                        Some((t, (from, _))) => {
                            self.completed.insert(t, now);
                            out.push(WatchEvent::Renamed { from, to: name });
                        }
                        None => out.push(WatchEvent::Created(name)),
                    }
                }
            }
            RenameMode::Any | RenameMode::Other => {
                // FSEvents はどちら側の名前か教えてくれないので存在で判断する
                for path in paths {
                    if let Some(name) = self.name_of(path) {
                        if path.exists() {
                            out.push(WatchEvent::Created(name));
                        } else {
                            out.push(WatchEvent::Deleted(name));
                        }
                    }
                }
            }
        }
    }

    /// Reports rename halves that waited longer than the timeout as deletions.
    pub(crate) fn flush_expired(&mut self, now: Instant, out: &mut Vec<WatchEvent>) {
        let timeout = self.rename_timeout;
        let expired: Vec<usize> = self
            .pending_from
            .iter()
            .filter(|(_, (_, at))| now.duration_since(*at) >= timeout)
            .map(|(t, _)| *t)
            .collect();
        for t in expired {
            if let Some((name, _)) = self.pending_from.remove(&t) {
                out.push(WatchEvent::Deleted(name));
            }
        }
        self.completed.retain(|_, at| now.duration_since(*at) < timeout);
    }
}

/// `DirectoryWatcher` backed by a single, reusable notify watcher.
pub struct NotifyWatcher {
    watcher: Box<dyn Watcher + Send>,
    raw_rx: Receiver<notify::Result<Event>>,
    watch_path: Option<PathBuf>,
    observing: Option<PathBuf>,
    translator: EventTranslator,
}

impl NotifyWatcher {
    pub fn new(config: &WatcherConfig) -> Result<Self> {
        let (tx, raw_rx) = channel();
        let watcher: Box<dyn Watcher + Send> = match config.backend {
            WatcherBackend::Native => {
                Box::new(RecommendedWatcher::new(tx, notify::Config::default())?)
            }
            WatcherBackend::Poll => Box::new(PollWatcher::new(
                tx,
                notify::Config::default()
                    .with_poll_interval(config.poll_interval())
                    .with_compare_contents(false),
            )?),
        };
        debug!("Created {:?} directory watcher", config.backend);

        Ok(Self {
            watcher,
            raw_rx,
            watch_path: None,
            observing: None,
            translator: EventTranslator::new(config.rename_timeout()),
        })
    }

    pub fn watch_path(&self) -> Option<&Path> {
        self.watch_path.as_deref()
    }

    pub fn is_observing(&self) -> bool {
        self.observing.is_some()
    }
}

impl DirectoryWatcher for NotifyWatcher {
    fn set_watch_path(&mut self, path: &Path) -> Result<()> {
        if self.watch_path.as_deref() == Some(path) {
            return Ok(());
        }
        self.stop_observing();
        // 古いディレクトリのイベントは捨てる
        while self.raw_rx.try_recv().is_ok() {}
        self.translator.reset(Some(path.to_path_buf()));
        self.watch_path = Some(path.to_path_buf());
        Ok(())
    }

    fn observe(&mut self) -> Result<()> {
        let path = self
            .watch_path
            .clone()
            .ok_or_else(|| DirError::Watcher("no watch path set".to_string()))?;
        if self.observing.as_ref() == Some(&path) {
            return Ok(());
        }
        self.watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                DirError::Watcher(format!("failed to watch {}: {}", path.format_for_log(), e))
            })?;
        debug!("Observing {}", path.format_for_log());
        self.observing = Some(path);
        Ok(())
    }

    fn stop_observing(&mut self) {
        if let Some(path) = self.observing.take() {
            if let Err(e) = self.watcher.unwatch(&path) {
                // the directory may already be gone
                debug!("Failed to unwatch {}: {}", path.format_for_log(), e);
            }
        }
    }

    fn poll_events(&mut self) -> Vec<WatchEvent> {
        let now = Instant::now();
        let mut out = Vec::new();
        while let Ok(result) = self.raw_rx.try_recv() {
            match result {
                Ok(event) => self.translator.translate(event, now, &mut out),
                Err(error) => warn!("File watcher error: {}", error),
            }
        }
        self.translator.flush_expired(now, &mut out);
        out
    }
}
