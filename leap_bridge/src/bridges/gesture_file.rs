//! Publishes the latest gesture label through a file.
//!
//! External programs poll the file and act on its contents. The file is
//! removed at startup and again on shutdown.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use leap_common::gesture;
use leap_common::tracking::TrackingFrame;
use leap_common::{Event, Listener, Result};
use log::{debug, info};

use crate::bridges::log_device_event;

/// File name used when no path is given.
pub const DEFAULT_FILE_NAME: &str = "leap_motion_command.txt";
/// Repeats of the same label within this window are not rewritten.
const REPEAT_WINDOW: Duration = Duration::from_millis(100);
/// Frames between debug summaries.
const SUMMARY_EVERY: u64 = 30;

/// Default output path inside the system temp directory.
pub fn default_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_FILE_NAME)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Writes `parar`, `abierta`, `cerrada` (with optional side suffix) to a file.
pub struct GestureFileBridge {
    path: PathBuf,
    last_label: Option<String>,
    last_write: Option<Instant>,
    frames: u64,
}

impl GestureFileBridge {
    /// Create the bridge, removing any stale file at `path`.
    pub fn new(path: PathBuf) -> Result<Self> {
        remove_if_present(&path)?;
        info!("Writing gestures to {}", path.display());
        Ok(Self {
            path,
            last_label: None,
            last_write: None,
            frames: 0,
        })
    }

    /// Write `label` unless it repeats the previous one within 100 ms.
    pub fn publish(&mut self, label: &str, now: Instant) -> Result<bool> {
        let repeated = self.last_label.as_deref() == Some(label)
            && self
                .last_write
                .is_some_and(|t| now.saturating_duration_since(t) < REPEAT_WINDOW);
        if repeated {
            return Ok(false);
        }
        self.last_label = Some(label.to_string());
        self.last_write = Some(now);
        fs::write(&self.path, label)?;
        info!("Sent: {}", label);
        Ok(true)
    }

    fn on_frame(&mut self, frame: &TrackingFrame) -> Result<()> {
        self.frames += 1;
        if self.frames % SUMMARY_EVERY == 0 {
            debug!("Frame {}: {} hands detected", self.frames, frame.hands.len());
        }
        if let Some(label) = gesture::file_label(frame) {
            self.publish(&label, Instant::now())?;
        }
        Ok(())
    }
}

impl Listener for GestureFileBridge {
    fn on_event(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::Tracking(frame) => self.on_frame(frame),
            other => {
                log_device_event(other);
                Ok(())
            }
        }
    }

    fn on_shutdown(&mut self) -> Result<()> {
        remove_if_present(&self.path)
    }
}
