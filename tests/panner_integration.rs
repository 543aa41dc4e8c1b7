//! End-to-end panning scenarios: full control-path + audio-path round trips
//! through the public engine surface.

use approx::assert_relative_eq;
use auricle::prelude::*;
use auricle::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const SR: f32 = 48000.0;
const BLOCK: usize = 128;

fn sine(freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| (2.0 * std::f32::consts::PI * freq * n as f32 / SR).sin())
        .collect()
}

/// Four speakers on the cardinal directions.
fn cardinal_quad(sources: usize) -> Panner {
    PannerBuilder::new(SR)
        .block_size(BLOCK)
        .speaker_directions(vec![(0.0, 0.0), (90.0, 0.0), (180.0, 0.0), (-90.0, 0.0)])
        .sources(sources)
        .room_coeff(0.0)
        .build()
        .unwrap()
}

fn run(panner: &mut Panner, inputs: &[Vec<f32>], num_out: usize, len: usize) -> Vec<Vec<f32>> {
    let mut outputs: Vec<Vec<f32>> = vec![vec![0.0; len]; num_out];
    for blk in 0..len / BLOCK {
        let in_blocks: Vec<&[f32]> = inputs
            .iter()
            .map(|i| &i[blk * BLOCK..(blk + 1) * BLOCK])
            .collect();
        let mut out_blocks: Vec<&mut [f32]> = outputs
            .iter_mut()
            .map(|o| &mut o[blk * BLOCK..(blk + 1) * BLOCK])
            .collect();
        panner.process(&in_blocks, &mut out_blocks);
    }
    outputs
}

fn channel_energy(outputs: &[Vec<f32>]) -> Vec<f32> {
    outputs
        .iter()
        .map(|ch| ch.iter().map(|s| s * s).sum())
        .collect()
}

#[test]
fn front_source_feeds_front_speaker_only() {
    let mut panner = cardinal_quad(1);
    let len = BLOCK * 16;
    let input = sine(440.0, len);
    let outputs = run(&mut panner, &[input.clone()], 4, len);

    let latency = panner.latency_samples();
    for n in 0..len - latency {
        assert_relative_eq!(outputs[0][n + latency], input[n], epsilon = 5e-3);
    }
    let energy = channel_energy(&outputs);
    for spk in 1..4 {
        assert!(energy[spk] < 1e-3, "speaker {spk} energy {}", energy[spk]);
    }
}

#[test]
fn diagonal_source_splits_with_unit_amplitude_sum() {
    let mut panner = cardinal_quad(1);
    let ctl = panner.controller();
    ctl.set_grid_resolution_deg(5.0).unwrap();
    ctl.set_source_direction(0, 45.0, 0.0).unwrap();

    let len = BLOCK * 16;
    let input = sine(440.0, len);
    let outputs = run(&mut panner, &[input.clone()], 4, len);

    let latency = panner.latency_samples();
    // Skip the first blocks: the reconfiguration consumes one block entry.
    for n in BLOCK * 4..len - latency {
        assert_relative_eq!(
            outputs[0][n + latency] + outputs[1][n + latency],
            input[n],
            epsilon = 1e-2
        );
        assert_relative_eq!(outputs[0][n + latency], outputs[1][n + latency], epsilon = 1e-2);
    }
    let energy = channel_energy(&outputs);
    assert!(energy[2] < 1e-2 && energy[3] < 1e-2);
}

#[test]
fn two_sources_superpose() {
    let mut panner = cardinal_quad(2);
    let ctl = panner.controller();
    ctl.set_source_direction(0, 0.0, 0.0).unwrap();
    ctl.set_source_direction(1, 90.0, 0.0).unwrap();

    let len = BLOCK * 16;
    let a = sine(440.0, len);
    let b = sine(660.0, len);
    let outputs = run(&mut panner, &[a.clone(), b.clone()], 4, len);

    let latency = panner.latency_samples();
    for n in 0..len - latency {
        assert_relative_eq!(outputs[0][n + latency], a[n], epsilon = 5e-3);
        assert_relative_eq!(outputs[1][n + latency], b[n], epsilon = 5e-3);
    }
}

#[test]
fn zero_sources_render_silence() {
    let mut panner = cardinal_quad(1);
    panner.controller().set_source_count(0).unwrap();
    let outputs = run(&mut panner, &[], 4, BLOCK * 4);
    assert!(outputs.iter().flatten().all(|&s| s == 0.0));
}

#[test]
fn full_yaw_turn_matches_unrotated_render() {
    let mut plain = cardinal_quad(1);
    let mut turned = cardinal_quad(1);
    turned.controller().set_orientation(360.0, 0.0, 0.0);

    let len = BLOCK * 12;
    let input = sine(330.0, len);
    let out_plain = run(&mut plain, &[input.clone()], 4, len);
    let out_turned = run(&mut turned, &[input], 4, len);

    // Skip the first block: the rotation flag is consumed at block entry.
    for spk in 0..4 {
        for n in BLOCK * 2..len {
            assert_relative_eq!(out_plain[spk][n], out_turned[spk][n], epsilon = 1e-3);
        }
    }
}

#[test]
fn reconfiguration_mid_stream_stays_bounded() {
    let mut panner = cardinal_quad(1);
    let ctl = panner.controller();

    let len = BLOCK * 32;
    let input = sine(440.0, len);
    let mut outputs: Vec<Vec<f32>> = vec![vec![0.0; len]; 6];
    for blk in 0..len / BLOCK {
        if blk == 16 {
            // Grow the layout 4 -> 6 while audio keeps running.
            ctl.set_speaker_direction(4, 45.0, 35.0).unwrap();
            ctl.set_speaker_direction(5, -45.0, 35.0).unwrap();
            ctl.set_speaker_count(6).unwrap();
        }
        let chunk = &input[blk * BLOCK..(blk + 1) * BLOCK];
        let mut out_blocks: Vec<&mut [f32]> = outputs
            .iter_mut()
            .map(|o| &mut o[blk * BLOCK..(blk + 1) * BLOCK])
            .collect();
        panner.process(&[chunk], &mut out_blocks);
    }

    assert_eq!(panner.codec_status(), CodecStatus::Initialized);
    for sample in outputs.iter().flatten() {
        assert!(sample.is_finite());
        assert!(sample.abs() <= 2.0);
    }
    // The front speaker keeps carrying the source across the swap.
    let front: f32 = outputs[0][BLOCK * 8..].iter().map(|s| s * s).sum();
    assert!(front > 1.0);
}

#[test]
fn concurrent_control_changes_keep_output_valid() {
    let mut panner = cardinal_quad(1);
    let ctl = panner.controller();
    let stop = Arc::new(AtomicBool::new(false));

    // Control thread cycling through every class of parameter change:
    // layout growth/shrink, source and listener movement, spread, room
    // blend, grid resolution. The audio thread renders throughout.
    let control = {
        let ctl = ctl.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut i = 0usize;
            while !stop.load(Ordering::Relaxed) {
                match i % 5 {
                    0 => {
                        ctl.set_speaker_direction(4, 45.0, 35.0).unwrap();
                        ctl.set_speaker_direction(5, -45.0, 35.0).unwrap();
                        ctl.set_speaker_count(6).unwrap();
                    }
                    1 => ctl.set_speaker_count(4).unwrap(),
                    2 => {
                        let az = (i % 72) as f32 * 5.0 - 180.0;
                        ctl.set_source_direction(0, az, 10.0).unwrap();
                        ctl.set_orientation(az, 5.0, -5.0);
                    }
                    3 => ctl.set_spread_deg(if i % 2 == 0 { 0.0 } else { 30.0 }),
                    _ => {
                        ctl.set_room_coeff((i % 10) as f32 / 10.0);
                        ctl.set_grid_resolution_deg(if i % 2 == 0 { 5.0 } else { 10.0 })
                            .unwrap();
                    }
                }
                i += 1;
                thread::yield_now();
            }
        })
    };

    let input = sine(440.0, BLOCK * 400);
    let mut out: Vec<Vec<f32>> = vec![vec![0.0; BLOCK]; 6];
    for chunk in input.chunks(BLOCK) {
        let mut out_blocks: Vec<&mut [f32]> =
            out.iter_mut().map(|o| o.as_mut_slice()).collect();
        panner.process(&[chunk], &mut out_blocks);
        for sample in out.iter().flatten() {
            assert!(sample.is_finite());
            assert!(sample.abs() <= 8.0, "sample {sample} out of range");
        }
    }

    stop.store(true, Ordering::Relaxed);
    control.join().unwrap();

    // Quiesce on a known-good configuration; the engine must settle into a
    // validated state with no recorded rejection.
    ctl.set_speaker_count(4).unwrap();
    ctl.set_speaker_direction(0, 0.0, 0.0).unwrap();
    ctl.set_spread_deg(0.0);
    let mut out_blocks: Vec<&mut [f32]> = out.iter_mut().map(|o| o.as_mut_slice()).collect();
    panner.process(&[&input[..BLOCK]], &mut out_blocks);
    assert_eq!(panner.codec_status(), CodecStatus::Initialized);
    assert!(ctl.last_error().is_none());
    assert!(out.iter().flatten().all(|s| s.is_finite()));
}

#[test]
fn preset_layouts_build_and_report_status() {
    for preset in [
        LayoutPreset::Stereo,
        LayoutPreset::Quad,
        LayoutPreset::Surround5_0,
        LayoutPreset::Surround7_0,
        LayoutPreset::Octagon,
        LayoutPreset::Cube,
        LayoutPreset::Surround7_0_4,
    ] {
        let panner = PannerBuilder::new(SR)
            .block_size(BLOCK)
            .speakers(preset)
            .build()
            .unwrap_or_else(|e| panic!("{preset:?} failed: {e}"));
        assert_eq!(panner.codec_status(), CodecStatus::Initialized);
        assert_eq!(panner.proc_status(), ProcStatus::Idle);
    }
}

#[test]
fn mono_speaker_layout_is_rejected_at_build() {
    let result = PannerBuilder::new(SR)
        .block_size(BLOCK)
        .speaker_directions(vec![(0.0, 0.0)])
        .build();
    assert!(matches!(result, Err(Error::DegenerateLayout(_))));
}

#[test]
fn build_failure_reports_underlying_cause() {
    // Two coincident speakers: the table build rejects the layout and the
    // builder surfaces that rejection, not a generic placeholder.
    let err = PannerBuilder::new(SR)
        .block_size(BLOCK)
        .speaker_directions(vec![(0.0, 0.0), (0.0, 0.0)])
        .build()
        .unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("colinear") || msg.contains("need at least"),
        "unexpected build error: {msg}"
    );
}

#[test]
fn reverberant_room_preserves_energy_at_high_frequencies() {
    // Source midway between two speakers, fully reverberant room: the
    // high-frequency bands are energy-normalized, so a high-frequency tone
    // comes out with (close to) unit energy rather than unit amplitude sum.
    let mut panner = PannerBuilder::new(SR)
        .block_size(BLOCK)
        .speaker_directions(vec![(0.0, 0.0), (90.0, 0.0), (180.0, 0.0), (-90.0, 0.0)])
        .room_coeff(1.0)
        .grid_resolution_deg(5.0)
        .build()
        .unwrap();
    panner
        .controller()
        .set_source_direction(0, 45.0, 0.0)
        .unwrap();

    let len = BLOCK * 24;
    let input = sine(8000.0, len);
    let outputs = run(&mut panner, &[input.clone()], 4, len);

    let tail = BLOCK * 8;
    let in_energy: f32 = input[tail..len - tail].iter().map(|s| s * s).sum();
    let out_energy: f32 = outputs
        .iter()
        .map(|ch| ch[tail..len - tail].iter().map(|s| s * s).sum::<f32>())
        .sum();
    let ratio = out_energy / in_energy;
    assert!(
        (0.85..=1.15).contains(&ratio),
        "energy ratio {ratio} should be near 1"
    );
}
