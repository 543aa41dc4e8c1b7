//! # Auricle - Real-time Spatial Audio Panning Engine
//!
//! Frequency-dependent VBAP panning with lock-free reconfiguration.
//!
//! ## Architecture
//!
//! Auricle is an umbrella crate that coordinates:
//! - **auricle-core** - Lock-free primitives, status state machines, progress
//! - **auricle-dsp** - Filterbank, VBAP gain tables, rotation, the panner engine
//!
//! ## Quick Start
//!
//! ```
//! use auricle::{PannerBuilder, LayoutPreset};
//!
//! // Build an initialised engine: 1 source into a 5.0 bed.
//! let mut panner = PannerBuilder::new(48000.0)
//!     .speakers(LayoutPreset::Surround5_0)
//!     .build()
//!     .unwrap();
//!
//! // Control path (any thread): move the source, rotate the listener.
//! let ctl = panner.controller();
//! ctl.set_source_direction(0, 30.0, 0.0).unwrap();
//! ctl.set_orientation(15.0, 0.0, 0.0);
//!
//! // Audio path (audio thread): render one block per call.
//! let input = vec![0.0f32; panner.block_size()];
//! let mut outputs = vec![vec![0.0f32; panner.block_size()]; 5];
//! let mut out_refs: Vec<&mut [f32]> = outputs.iter_mut().map(|o| o.as_mut_slice()).collect();
//! panner.process(&[&input], &mut out_refs);
//! ```

/// Re-export of auricle-core for direct access
pub use auricle_core as core;

// Lock-free primitives and status types
pub use auricle_core::{
    AtomicCount, AtomicDirection, AtomicFlag, AtomicFloat, CodecStatus, ProcStatus, Progress,
    MAX_SOURCES, MAX_SPEAKERS,
};

// Engine surface
pub use auricle_dsp::{
    BandMap, Dimensionality, Error, Filterbank, GainTable, LayoutDescription, LayoutPreset,
    NormalizationCurve, Orientation, Panner, PannerController, Result, TableOptions, FFT_SIZE,
    HOP_SIZE, NUM_BINS,
};

mod builder;
pub use builder::PannerBuilder;

/// Convenience prelude.
pub mod prelude {
    pub use crate::{
        CodecStatus, LayoutPreset, NormalizationCurve, Panner, PannerBuilder, PannerController,
        ProcStatus,
    };
}
