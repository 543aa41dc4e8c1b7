//! Error types for auricle-dsp.

use auricle_core::{MAX_SOURCES, MAX_SPEAKERS};
use thiserror::Error;

/// Error type for panner configuration and build operations.
///
/// All of these are configuration errors detected at setup or during a
/// reinitialisation pass. The audio path itself never produces errors; under
/// a valid prior configuration it keeps rendering, and before any successful
/// initialisation it renders silence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid block size {block_size}: must be a non-zero multiple of the hop size ({hop})")]
    BlockSize { block_size: usize, hop: usize },

    #[error("Invalid source count {0}: must be at most {MAX_SOURCES}")]
    SourceCount(usize),

    #[error("Invalid speaker count {0}: must be between 1 and {MAX_SPEAKERS}")]
    SpeakerCount(usize),

    #[error("Channel index {index} out of range (max {max})")]
    ChannelIndex { index: usize, max: usize },

    #[error("Degenerate loudspeaker layout: {0}")]
    DegenerateLayout(String),

    #[error("Invalid grid resolution {0} degrees: must be in (0, 90]")]
    GridResolution(f32),

    #[error("Invalid sample rate {0}: must be positive")]
    SampleRate(f32),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
