//! Frequency-dependent VBAP panning engine.
//!
//! Converts point-source signals with 3-D directions into loudspeaker feeds
//! using amplitude panning over a hybrid filterbank, with per-band
//! amplitude/energy gain normalization and a lock-free reconfiguration path:
//! a control thread may change source counts, the loudspeaker layout,
//! listener orientation and panning parameters at any time while the audio
//! thread keeps rendering with the last validated state.

mod error;
pub use error::{Error, Result};

mod filterbank;
pub use filterbank::{BandMap, Filterbank, FFT_SIZE, HOP_SIZE, NUM_BINS};

pub mod rotation;
pub use rotation::Orientation;

mod normalization;
pub use normalization::NormalizationCurve;

pub mod vbap;
pub use vbap::{Dimensionality, GainTable, TableOptions};

mod presets;
pub use presets::{LayoutDescription, LayoutPreset};

mod engine;
pub use engine::{Panner, PannerController};
