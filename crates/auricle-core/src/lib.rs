//! Core primitives for the Auricle spatial-audio panning engine.
//!
//! Lock-free parameter cells shared between a non-real-time control context
//! and a hard-real-time audio context, plus the status/progress types the two
//! sides use to coordinate reconfiguration without locks.

mod lockfree;
mod status;

pub use lockfree::{AtomicCount, AtomicDirection, AtomicFlag, AtomicFloat};
pub use status::{AtomicCodecStatus, AtomicProcStatus, CodecStatus, ProcStatus, Progress};

/// Maximum number of simultaneous input sources.
pub const MAX_SOURCES: usize = 64;

/// Maximum number of output loudspeakers.
pub const MAX_SPEAKERS: usize = 64;
