//! Codec and processing status state machines, plus reinitialisation progress.
//!
//! Both statuses are shared between the control and audio contexts, so they
//! are stored in atomic cells with explicit discriminant mapping rather than
//! integer casts.

use crate::lockfree::AtomicFloat;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of the derived render state (gain table + transform).
///
/// `NotInitialized` and `Initializing` both mean the derived state for the
/// *requested* configuration is not trustworthy; the audio path renders with
/// the last validated state, or silence if none exists yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecStatus {
    /// No valid derived state for the requested configuration.
    NotInitialized,
    /// A rebuild is in flight; poll [`Progress`] for its phase.
    Initializing,
    /// Derived state matches the requested configuration.
    Initialized,
}

impl CodecStatus {
    fn to_u8(self) -> u8 {
        match self {
            CodecStatus::NotInitialized => 0,
            CodecStatus::Initializing => 1,
            CodecStatus::Initialized => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => CodecStatus::Initializing,
            2 => CodecStatus::Initialized,
            _ => CodecStatus::NotInitialized,
        }
    }
}

/// Whether the audio context is currently inside a block.
///
/// The control side reads this to know when it is safe to release resources
/// tied to a previous configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcStatus {
    Idle,
    Processing,
}

/// Atomic cell for [`CodecStatus`].
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicCodecStatus {
    value: AtomicU8,
}

impl AtomicCodecStatus {
    pub fn new(status: CodecStatus) -> Self {
        Self {
            value: AtomicU8::new(status.to_u8()),
        }
    }

    #[inline]
    pub fn get(&self) -> CodecStatus {
        CodecStatus::from_u8(self.value.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, status: CodecStatus) {
        self.value.store(status.to_u8(), Ordering::Release);
    }
}

impl Default for AtomicCodecStatus {
    fn default() -> Self {
        Self::new(CodecStatus::NotInitialized)
    }
}

/// Atomic cell for [`ProcStatus`].
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicProcStatus {
    value: AtomicU8,
}

impl AtomicProcStatus {
    pub fn new(status: ProcStatus) -> Self {
        Self {
            value: AtomicU8::new(match status {
                ProcStatus::Idle => 0,
                ProcStatus::Processing => 1,
            }),
        }
    }

    #[inline]
    pub fn get(&self) -> ProcStatus {
        match self.value.load(Ordering::Acquire) {
            1 => ProcStatus::Processing,
            _ => ProcStatus::Idle,
        }
    }

    #[inline]
    pub fn set(&self, status: ProcStatus) {
        self.value.store(
            match status {
                ProcStatus::Idle => 0,
                ProcStatus::Processing => 1,
            },
            Ordering::Release,
        );
    }
}

impl Default for AtomicProcStatus {
    fn default() -> Self {
        Self::new(ProcStatus::Idle)
    }
}

/// Reinitialisation progress: a value in [0, 1] plus a phase label.
///
/// Written only by the reinit path; the control side polls it. The label is
/// published through a single pointer swap so readers never see a partially
/// written string.
#[derive(Debug)]
pub struct Progress {
    value: AtomicFloat,
    text: ArcSwap<String>,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            value: AtomicFloat::new(0.0),
            text: ArcSwap::from_pointee(String::new()),
        }
    }

    /// Current progress in [0, 1].
    #[inline]
    pub fn value(&self) -> f32 {
        self.value.get()
    }

    /// Current phase label.
    pub fn text(&self) -> Arc<String> {
        self.text.load_full()
    }

    pub fn report(&self, value: f32, text: &str) {
        self.value.set(value.clamp(0.0, 1.0));
        self.text.store(Arc::new(text.to_owned()));
    }

    pub fn reset(&self) {
        self.value.set(0.0);
        self.text.store(Arc::new(String::new()));
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_status_roundtrip() {
        let cell = AtomicCodecStatus::default();
        assert_eq!(cell.get(), CodecStatus::NotInitialized);
        cell.set(CodecStatus::Initializing);
        assert_eq!(cell.get(), CodecStatus::Initializing);
        cell.set(CodecStatus::Initialized);
        assert_eq!(cell.get(), CodecStatus::Initialized);
    }

    #[test]
    fn test_proc_status_roundtrip() {
        let cell = AtomicProcStatus::default();
        assert_eq!(cell.get(), ProcStatus::Idle);
        cell.set(ProcStatus::Processing);
        assert_eq!(cell.get(), ProcStatus::Processing);
    }

    #[test]
    fn test_progress_report() {
        let progress = Progress::new();
        progress.report(0.5, "Building gain table");
        assert_eq!(progress.value(), 0.5);
        assert_eq!(progress.text().as_str(), "Building gain table");
        progress.report(2.0, "done");
        assert_eq!(progress.value(), 1.0);
        progress.reset();
        assert_eq!(progress.value(), 0.0);
        assert!(progress.text().is_empty());
    }
}
