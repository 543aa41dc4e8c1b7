//! Builder for configuring and constructing a ready-to-run [`Panner`].

use crate::{LayoutPreset, NormalizationCurve, Panner, Result};

/// Fluent construction of a [`Panner`].
///
/// The builder applies the initial configuration through the same
/// control-path setters a running engine uses, then performs the first
/// rebuild eagerly so the returned panner is initialised before the audio
/// thread starts (a degenerate initial layout surfaces as an error here
/// rather than as silence later).
///
/// # Example
///
/// ```
/// use auricle::{PannerBuilder, LayoutPreset};
///
/// let panner = PannerBuilder::new(48000.0)
///     .block_size(256)
///     .speakers(LayoutPreset::Surround5_0)
///     .sources(2)
///     .spread_deg(15.0)
///     .room_coeff(0.3)
///     .build()
///     .unwrap();
/// assert_eq!(panner.block_size(), 256);
/// ```
pub struct PannerBuilder {
    sample_rate: f32,
    block_size: usize,
    speakers: LayoutPreset,
    speaker_dirs: Option<Vec<(f32, f32)>>,
    sources: usize,
    spread_deg: f32,
    room_coeff: f32,
    grid_resolution_deg: f32,
    curve: Option<NormalizationCurve>,
}

impl PannerBuilder {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            block_size: 128,
            speakers: LayoutPreset::Stereo,
            speaker_dirs: None,
            sources: 1,
            spread_deg: 0.0,
            room_coeff: 0.5,
            grid_resolution_deg: 2.0,
            curve: None,
        }
    }

    /// Samples per processing block; must be a multiple of the hop size.
    /// Default: 128.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Loudspeaker layout preset. Default: stereo.
    pub fn speakers(mut self, preset: LayoutPreset) -> Self {
        self.speakers = preset;
        self.speaker_dirs = None;
        self
    }

    /// Custom loudspeaker directions as (azimuth, elevation) degree pairs;
    /// overrides any preset.
    pub fn speaker_directions(mut self, dirs: Vec<(f32, f32)>) -> Self {
        self.speaker_dirs = Some(dirs);
        self
    }

    /// Initial number of sources. Default: 1.
    pub fn sources(mut self, count: usize) -> Self {
        self.sources = count;
        self
    }

    /// MDAP spread angle in degrees. Default: 0 (point sources).
    pub fn spread_deg(mut self, spread_deg: f32) -> Self {
        self.spread_deg = spread_deg;
        self
    }

    /// Room coefficient in [0, 1]. Default: 0.5.
    pub fn room_coeff(mut self, room_coeff: f32) -> Self {
        self.room_coeff = room_coeff;
        self
    }

    /// Gain-table grid step in degrees. Default: 2.
    pub fn grid_resolution_deg(mut self, resolution_deg: f32) -> Self {
        self.grid_resolution_deg = resolution_deg;
        self
    }

    /// Override the amplitude/energy crossover curve.
    pub fn normalization_curve(mut self, curve: NormalizationCurve) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn build(self) -> Result<Panner> {
        let mut panner = Panner::new(self.sample_rate, self.block_size)?;
        if let Some(curve) = self.curve {
            panner = panner.with_curve(curve);
        }

        let ctl = panner.controller();
        match &self.speaker_dirs {
            Some(dirs) => {
                ctl.set_speaker_count(dirs.len())?;
                for (i, &(az, el)) in dirs.iter().enumerate() {
                    ctl.set_speaker_direction(i, az, el)?;
                }
            }
            None => ctl.load_speaker_preset(self.speakers)?,
        }
        ctl.set_source_count(self.sources)?;
        ctl.set_spread_deg(self.spread_deg);
        ctl.set_room_coeff(self.room_coeff);
        ctl.set_grid_resolution_deg(self.grid_resolution_deg)?;

        panner.init();
        if panner.codec_status() != crate::CodecStatus::Initialized {
            return Err(ctl.last_error().unwrap_or_else(|| {
                crate::Error::DegenerateLayout(
                    "initial loudspeaker layout could not be triangulated".to_owned(),
                )
            }));
        }
        Ok(panner)
    }
}
