//! The panning engine: configuration store, reconfiguration state machine,
//! and the per-block audio path.
//!
//! Two execution contexts share a [`Panner`]'s state. The control context
//! holds a [`PannerController`] and only ever writes plain atomic parameter
//! fields and dirty flags. The audio context owns the [`Panner`] itself and
//! is the sole reader and writer of the derived state (filterbank, gain
//! table, gain matrices): it consumes the flags at block entry, drives the
//! bounded rebuild pass when the rebuild flag is raised, and publishes the
//! finished gain table through a single pointer swap. The audio path never
//! blocks on the control context and keeps rendering with the last valid
//! state while a requested configuration is being built or has been
//! rejected.

use crate::error::{Error, Result};
use crate::filterbank::{Filterbank, NUM_BINS};
use crate::normalization::{renormalize, NormalizationCurve};
use crate::presets::LayoutPreset;
use crate::rotation::{self, Orientation};
use crate::vbap::{GainTable, TableOptions};
use arc_swap::ArcSwapOption;
use auricle_core::{
    AtomicCodecStatus, AtomicCount, AtomicDirection, AtomicFlag, AtomicFloat, AtomicProcStatus,
    CodecStatus, ProcStatus, Progress, MAX_SOURCES, MAX_SPEAKERS,
};
use log::{debug, warn};
use rustfft::num_complex::Complex;
use std::sync::Arc;

/// User-settable parameters and dirty flags, every field independently
/// atomic. Written by the control context, consumed by the audio context.
struct Params {
    source_count: AtomicCount,
    speaker_count: AtomicCount,
    source_dirs: Vec<AtomicDirection>,
    speaker_dirs: Vec<AtomicDirection>,

    yaw_deg: AtomicFloat,
    pitch_deg: AtomicFloat,
    roll_deg: AtomicFloat,
    flip_yaw: AtomicFlag,
    flip_pitch: AtomicFlag,
    flip_roll: AtomicFlag,

    spread_deg: AtomicFloat,
    room_coeff: AtomicFloat,
    grid_resolution_deg: AtomicFloat,

    /// Per-source: panning gains need recomputing. Cleared only by the audio
    /// context when consumed.
    recalc_gains: Vec<AtomicFlag>,
    /// Rotation matrix needs recomputing (one flag: rotation is a single
    /// uniform transform).
    recalc_rotation: AtomicFlag,
    /// Gain table / transform state needs rebuilding.
    rebuild_table: AtomicFlag,

    codec_status: AtomicCodecStatus,
    proc_status: AtomicProcStatus,
    progress: Progress,

    /// Last successfully built table, published for read-only introspection.
    published_table: ArcSwapOption<GainTable>,
    /// Why the most recent rebuild was rejected; cleared on success.
    last_error: ArcSwapOption<Error>,
}

impl Params {
    fn new() -> Self {
        let params = Self {
            source_count: AtomicCount::new(1),
            speaker_count: AtomicCount::new(0),
            source_dirs: (0..MAX_SOURCES).map(|_| AtomicDirection::default()).collect(),
            speaker_dirs: (0..MAX_SPEAKERS).map(|_| AtomicDirection::default()).collect(),
            yaw_deg: AtomicFloat::default(),
            pitch_deg: AtomicFloat::default(),
            roll_deg: AtomicFloat::default(),
            flip_yaw: AtomicFlag::default(),
            flip_pitch: AtomicFlag::default(),
            flip_roll: AtomicFlag::default(),
            spread_deg: AtomicFloat::default(),
            room_coeff: AtomicFloat::new(0.5),
            grid_resolution_deg: AtomicFloat::new(2.0),
            recalc_gains: (0..MAX_SOURCES).map(|_| AtomicFlag::new(true)).collect(),
            recalc_rotation: AtomicFlag::new(true),
            rebuild_table: AtomicFlag::new(true),
            codec_status: AtomicCodecStatus::default(),
            proc_status: AtomicProcStatus::default(),
            progress: Progress::new(),
            published_table: ArcSwapOption::empty(),
            last_error: ArcSwapOption::empty(),
        };
        // Default layout: stereo speakers, one source at the front.
        let stereo = LayoutPreset::Stereo.directions();
        for (slot, &(az, el)) in params.speaker_dirs.iter().zip(stereo.iter()) {
            slot.set(az, el);
        }
        params.speaker_count.set(stereo.len());
        params
    }
}

/// Control-context handle to a [`Panner`]'s parameters.
///
/// Cloneable and `Send`; every method is safe to call concurrently with the
/// audio context at any time. Setters take effect within one block.
#[derive(Clone)]
pub struct PannerController {
    params: Arc<Params>,
}

impl PannerController {
    /// Number of active sources, at most [`MAX_SOURCES`]. Takes effect at
    /// the next reconfiguration pass.
    pub fn set_source_count(&self, count: usize) -> Result<()> {
        if count > MAX_SOURCES {
            return Err(Error::SourceCount(count));
        }
        if self.params.source_count.swap(count) != count {
            self.params.rebuild_table.raise();
        }
        Ok(())
    }

    pub fn source_count(&self) -> usize {
        self.params.source_count.get()
    }

    /// Direction of one source in degrees.
    pub fn set_source_direction(&self, index: usize, azimuth_deg: f32, elevation_deg: f32) -> Result<()> {
        if index >= MAX_SOURCES {
            return Err(Error::ChannelIndex {
                index,
                max: MAX_SOURCES - 1,
            });
        }
        self.params.source_dirs[index].set(azimuth_deg, elevation_deg.clamp(-90.0, 90.0));
        self.params.recalc_gains[index].raise();
        Ok(())
    }

    pub fn source_direction(&self, index: usize) -> Option<(f32, f32)> {
        self.params.source_dirs.get(index).map(|d| d.get())
    }

    /// Number of loudspeakers, between 1 and [`MAX_SPEAKERS`]. Layout
    /// validity (enough non-colinear directions) is checked by the rebuild.
    pub fn set_speaker_count(&self, count: usize) -> Result<()> {
        if count == 0 || count > MAX_SPEAKERS {
            return Err(Error::SpeakerCount(count));
        }
        if self.params.speaker_count.swap(count) != count {
            self.params.rebuild_table.raise();
        }
        Ok(())
    }

    pub fn speaker_count(&self) -> usize {
        self.params.speaker_count.get()
    }

    /// Direction of one loudspeaker in degrees. Triggers a table rebuild.
    pub fn set_speaker_direction(&self, index: usize, azimuth_deg: f32, elevation_deg: f32) -> Result<()> {
        if index >= MAX_SPEAKERS {
            return Err(Error::ChannelIndex {
                index,
                max: MAX_SPEAKERS - 1,
            });
        }
        self.params.speaker_dirs[index].set(azimuth_deg, elevation_deg.clamp(-90.0, 90.0));
        self.params.rebuild_table.raise();
        Ok(())
    }

    pub fn speaker_direction(&self, index: usize) -> Option<(f32, f32)> {
        self.params.speaker_dirs.get(index).map(|d| d.get())
    }

    /// Listener orientation in degrees, applied yaw first, then pitch, then
    /// roll.
    pub fn set_orientation(&self, yaw_deg: f32, pitch_deg: f32, roll_deg: f32) {
        self.params.yaw_deg.set(yaw_deg);
        self.params.pitch_deg.set(pitch_deg);
        self.params.roll_deg.set(roll_deg);
        self.params.recalc_rotation.raise();
    }

    pub fn set_yaw_deg(&self, yaw_deg: f32) {
        self.params.yaw_deg.set(yaw_deg);
        self.params.recalc_rotation.raise();
    }

    pub fn set_pitch_deg(&self, pitch_deg: f32) {
        self.params.pitch_deg.set(pitch_deg);
        self.params.recalc_rotation.raise();
    }

    pub fn set_roll_deg(&self, roll_deg: f32) {
        self.params.roll_deg.set(roll_deg);
        self.params.recalc_rotation.raise();
    }

    pub fn set_flip_yaw(&self, flip: bool) {
        self.params.flip_yaw.set(flip);
        self.params.recalc_rotation.raise();
    }

    pub fn set_flip_pitch(&self, flip: bool) {
        self.params.flip_pitch.set(flip);
        self.params.recalc_rotation.raise();
    }

    pub fn set_flip_roll(&self, flip: bool) {
        self.params.flip_roll.set(flip);
        self.params.recalc_rotation.raise();
    }

    pub fn orientation(&self) -> Orientation {
        Orientation {
            yaw_deg: self.params.yaw_deg.get(),
            pitch_deg: self.params.pitch_deg.get(),
            roll_deg: self.params.roll_deg.get(),
            flip_yaw: self.params.flip_yaw.get(),
            flip_pitch: self.params.flip_pitch.get(),
            flip_roll: self.params.flip_roll.get(),
        }
    }

    /// MDAP spread angle in degrees; baked into the gain table, so changing
    /// it triggers a rebuild.
    pub fn set_spread_deg(&self, spread_deg: f32) {
        let spread = spread_deg.clamp(0.0, 180.0);
        if self.params.spread_deg.swap(spread) != spread {
            self.params.rebuild_table.raise();
        }
    }

    pub fn spread_deg(&self) -> f32 {
        self.params.spread_deg.get()
    }

    /// Room coefficient in [0, 1]: 0 = amplitude-preserving normalization,
    /// 1 = energy-preserving at high frequencies. Only affects the per-band
    /// blend, so no rebuild is needed.
    pub fn set_room_coeff(&self, room_coeff: f32) {
        self.params.room_coeff.set(room_coeff.clamp(0.0, 1.0));
        for flag in &self.params.recalc_gains {
            flag.raise();
        }
    }

    pub fn room_coeff(&self) -> f32 {
        self.params.room_coeff.get()
    }

    /// Gain-table grid step in degrees, in (0, 90].
    pub fn set_grid_resolution_deg(&self, resolution_deg: f32) -> Result<()> {
        if !(resolution_deg > 0.0 && resolution_deg <= 90.0) {
            return Err(Error::GridResolution(resolution_deg));
        }
        if self.params.grid_resolution_deg.swap(resolution_deg) != resolution_deg {
            self.params.rebuild_table.raise();
        }
        Ok(())
    }

    pub fn grid_resolution_deg(&self) -> f32 {
        self.params.grid_resolution_deg.get()
    }

    /// Replace all source directions and the source count from a preset.
    pub fn load_source_preset(&self, preset: LayoutPreset) -> Result<()> {
        let dirs = preset.directions();
        if dirs.len() > MAX_SOURCES {
            return Err(Error::SourceCount(dirs.len()));
        }
        for (i, &(az, el)) in dirs.iter().enumerate() {
            self.params.source_dirs[i].set(az, el);
            self.params.recalc_gains[i].raise();
        }
        self.set_source_count(dirs.len())
    }

    /// Replace the loudspeaker layout from a preset.
    pub fn load_speaker_preset(&self, preset: LayoutPreset) -> Result<()> {
        let dirs = preset.directions();
        if dirs.len() > MAX_SPEAKERS {
            return Err(Error::SpeakerCount(dirs.len()));
        }
        for (i, &(az, el)) in dirs.iter().enumerate() {
            self.params.speaker_dirs[i].set(az, el);
        }
        self.params.rebuild_table.raise();
        self.set_speaker_count(dirs.len())
    }

    pub fn codec_status(&self) -> CodecStatus {
        self.params.codec_status.get()
    }

    pub fn proc_status(&self) -> ProcStatus {
        self.params.proc_status.get()
    }

    /// Reinitialisation progress: value in [0, 1] plus phase label.
    pub fn progress(&self) -> (f32, Arc<String>) {
        (self.params.progress.value(), self.params.progress.text())
    }

    /// Last successfully built gain table, if any (read-only snapshot).
    pub fn gain_table(&self) -> Option<Arc<GainTable>> {
        self.params.published_table.load_full()
    }

    /// Why the most recent rebuild was rejected; `None` after a success.
    pub fn last_error(&self) -> Option<Error> {
        self.params.last_error.load_full().map(|e| (*e).clone())
    }
}

/// Derived state validated by the last successful rebuild.
struct RenderState {
    table: Arc<GainTable>,
    num_sources: usize,
    num_speakers: usize,
}

/// The audio-context side of the engine.
///
/// Owned by the audio thread; [`Panner::process`] is called once per block.
/// Obtain a [`PannerController`] via [`Panner::controller`] for the control
/// thread.
pub struct Panner {
    params: Arc<Params>,
    filterbank: Filterbank,
    curve: NormalizationCurve,
    render: Option<RenderState>,
    rot_matrix: [[f32; 3]; 3],
    /// Per-band band center frequencies, cached from the band map.
    band_centers: Vec<f32>,
    /// Bin -> band index, cached from the band map.
    band_of_bin: [usize; NUM_BINS],
    /// `G[band][source][speaker]`, magnitude-only panning gains.
    gains: Vec<f32>,
    in_tf: Vec<Vec<Complex<f32>>>,
    out_tf: Vec<Vec<Complex<f32>>>,
}

impl std::fmt::Debug for Panner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panner").finish_non_exhaustive()
    }
}

impl Panner {
    /// Block size must be a non-zero multiple of the filterbank hop size.
    pub fn new(sample_rate: f32, block_size: usize) -> Result<Self> {
        let filterbank = Filterbank::new(sample_rate, block_size, 0, 0)?;
        let band_map = filterbank.band_map();
        let band_centers = band_map.centers_hz().to_vec();
        let mut band_of_bin = [0usize; NUM_BINS];
        for (bin, slot) in band_of_bin.iter_mut().enumerate() {
            *slot = band_map.band_of_bin(bin);
        }

        Ok(Self {
            params: Arc::new(Params::new()),
            filterbank,
            curve: NormalizationCurve::default(),
            render: None,
            rot_matrix: rotation::IDENTITY,
            band_centers,
            band_of_bin,
            gains: Vec::new(),
            in_tf: Vec::new(),
            out_tf: Vec::new(),
        })
    }

    /// Replace the amplitude/energy crossover curve.
    pub fn with_curve(mut self, curve: NormalizationCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Handle for the control context.
    pub fn controller(&self) -> PannerController {
        PannerController {
            params: Arc::clone(&self.params),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.filterbank.sample_rate()
    }

    pub fn block_size(&self) -> usize {
        self.filterbank.block_size()
    }

    /// Fixed processing latency introduced by the transform, in samples.
    pub fn latency_samples(&self) -> usize {
        self.filterbank.latency_samples()
    }

    pub fn num_bands(&self) -> usize {
        self.band_centers.len()
    }

    pub fn codec_status(&self) -> CodecStatus {
        self.params.codec_status.get()
    }

    pub fn proc_status(&self) -> ProcStatus {
        self.params.proc_status.get()
    }

    /// Run a pending rebuild outside the audio callback (setup-time
    /// convenience; `process` drives the same pass otherwise).
    pub fn init(&mut self) {
        if self.params.rebuild_table.take() {
            self.rebuild();
        }
    }

    /// Render one block: `inputs[src]` is one time-domain block per active
    /// source, `outputs[spk]` receives one block per active speaker. Slices
    /// must be `block_size` long; missing input channels are treated as
    /// silent, and output channels beyond the active speaker count are
    /// zeroed.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        self.params.proc_status.set(ProcStatus::Processing);

        if self.params.rebuild_table.take() {
            self.rebuild();
        }

        // No validated state yet: silence, never undefined output.
        let (table, num_sources, num_speakers) = match &self.render {
            Some(render) => (
                Arc::clone(&render.table),
                render.num_sources,
                render.num_speakers,
            ),
            None => {
                for out in outputs.iter_mut() {
                    out.iter_mut().for_each(|s| *s = 0.0);
                }
                self.params.proc_status.set(ProcStatus::Idle);
                return;
            }
        };

        if num_sources == 0 {
            for out in outputs.iter_mut() {
                out.iter_mut().for_each(|s| *s = 0.0);
            }
            self.params.proc_status.set(ProcStatus::Idle);
            return;
        }

        if self.params.recalc_rotation.take() {
            let orient = Orientation {
                yaw_deg: self.params.yaw_deg.get(),
                pitch_deg: self.params.pitch_deg.get(),
                roll_deg: self.params.roll_deg.get(),
                flip_yaw: self.params.flip_yaw.get(),
                flip_pitch: self.params.flip_pitch.get(),
                flip_roll: self.params.flip_roll.get(),
            };
            self.rot_matrix = orient.matrix();
            for flag in self.params.recalc_gains.iter().take(num_sources) {
                flag.raise();
            }
        }

        // Refresh gain matrices for sources whose flag is raised. Rotation
        // is a lens: the stored direction is read fresh, rotated, and used
        // for the lookup without being written back.
        let room = self.params.room_coeff.get();
        for src in 0..num_sources {
            if self.params.recalc_gains[src].take() {
                let (az, el) = self.params.source_dirs[src].get();
                let rotated = rotation::rotate(&self.rot_matrix, rotation::unit_vector(az, el));
                let (rot_az, rot_el) = rotation::to_azimuth_elevation(rotated);
                let row = table.lookup(rot_az, rot_el);
                for (band, &freq) in self.band_centers.iter().enumerate() {
                    let p = self.curve.exponent(freq, room);
                    let dst = &mut self.gains
                        [(band * num_sources + src) * num_speakers..][..num_speakers];
                    dst.copy_from_slice(row);
                    renormalize(dst, p);
                }
            }
        }

        // Analysis.
        for src in 0..num_sources {
            match inputs.get(src) {
                Some(input) => self.filterbank.analyze(src, input, &mut self.in_tf[src]),
                None => self.in_tf[src].iter_mut().for_each(|v| *v = Complex::new(0.0, 0.0)),
            }
        }

        // Per-band gain application: each output band-channel is the sum
        // over sources of the source's band value times its gain.
        let slots = self.filterbank.time_slots();
        for spk in 0..num_speakers {
            let out_tf = &mut self.out_tf[spk];
            out_tf.iter_mut().for_each(|v| *v = Complex::new(0.0, 0.0));
            for src in 0..num_sources {
                let in_tf = &self.in_tf[src];
                for slot in 0..slots {
                    let base = slot * NUM_BINS;
                    for bin in 0..NUM_BINS {
                        let band = self.band_of_bin[bin];
                        let g = self.gains[(band * num_sources + src) * num_speakers + spk];
                        if g != 0.0 {
                            out_tf[base + bin] += in_tf[base + bin] * g;
                        }
                    }
                }
            }
        }

        // Synthesis.
        for (spk, out) in outputs.iter_mut().enumerate() {
            if spk < num_speakers {
                self.filterbank.synthesize(spk, &self.out_tf[spk], out);
            } else {
                out.iter_mut().for_each(|s| *s = 0.0);
            }
        }

        self.params.proc_status.set(ProcStatus::Idle);
    }

    /// The bounded reconfiguration pass. Builds the new gain table and
    /// transform state; on success swaps them in atomically and re-raises
    /// every per-source flag, on failure keeps the previous valid state
    /// active. There is no partially applied intermediate state.
    fn rebuild(&mut self) {
        let params = Arc::clone(&self.params);
        params.codec_status.set(CodecStatus::Initializing);
        params.progress.reset();

        let num_sources = params.source_count.get().min(MAX_SOURCES);
        let num_speakers = params.speaker_count.get().min(MAX_SPEAKERS);
        let speaker_dirs: Vec<(f32, f32)> = params.speaker_dirs[..num_speakers]
            .iter()
            .map(|d| d.get())
            .collect();
        let opts = TableOptions {
            resolution_deg: params.grid_resolution_deg.get(),
            spread_deg: params.spread_deg.get(),
            force_3d: false,
        };

        let progress = &params.progress;
        match GainTable::build(&speaker_dirs, &opts, |value, text| {
            progress.report(value, text)
        }) {
            Ok(table) => {
                debug!(
                    "gain table rebuilt: {} directions x {} speakers, {} triangles",
                    table.num_directions(),
                    table.num_speakers(),
                    table.num_triangles()
                );
                self.filterbank.resize(num_sources, num_speakers);
                let tf_len = self.filterbank.time_slots() * NUM_BINS;
                self.in_tf = vec![vec![Complex::new(0.0, 0.0); tf_len]; num_sources];
                self.out_tf = vec![vec![Complex::new(0.0, 0.0); tf_len]; num_speakers];
                self.gains = vec![0.0; self.band_centers.len() * num_sources * num_speakers];

                let table = Arc::new(table);
                params.published_table.store(Some(Arc::clone(&table)));
                self.render = Some(RenderState {
                    table,
                    num_sources,
                    num_speakers,
                });

                for flag in &params.recalc_gains {
                    flag.raise();
                }
                params.recalc_rotation.raise();
                params.last_error.store(None);
                params.progress.report(1.0, "Ready");
                params.codec_status.set(CodecStatus::Initialized);
            }
            Err(err) => {
                warn!("reconfiguration rejected, keeping previous state: {err}");
                params.progress.report(1.0, "Reconfiguration failed");
                params.last_error.store(Some(Arc::new(err)));
                params.codec_status.set(CodecStatus::NotInitialized);
            }
        }
    }
}
