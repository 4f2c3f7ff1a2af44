//! Allocation-free render path tests.
//!
//! These tests verify that `MixEngine::render()` and frame advancement do
//! not allocate once sources are loaded, so a tick never touches the heap
//! while it holds the mixer lock.
//!
//! Just run `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use rm_engine::MixEngine;
use rm_master::AudioChunk;

const RATE: u32 = 44100;
const LOOK_AHEAD_FRAMES: usize = 4410;

fn tone(frames: usize, step: f32) -> Vec<f32> {
    (0..frames).map(|i| ((i as f32) * step).sin() * 0.4).collect()
}

/// Tick `engine` like the mixer does for `ticks` ticks of 441 frames,
/// aborting on any heap allocation.
fn assert_ticks_alloc_free(engine: &mut MixEngine, ticks: usize) {
    assert_no_alloc(|| {
        for _ in 0..ticks {
            engine.advance_bytes(441 * 4 + 2);
            engine.render();
        }
    });
}

#[test]
fn mono_and_stereo_sources_alloc_free() {
    let mut engine = MixEngine::new(RATE, LOOK_AHEAD_FRAMES);
    let mono = AudioChunk::mono(tone(RATE as usize * 5, 0.05));
    let stereo = AudioChunk::stereo(tone(RATE as usize * 5, 0.03), tone(RATE as usize * 5, 0.07));
    engine.add(mono.clone());
    engine.add(mono);
    engine.add(stereo);

    assert_ticks_alloc_free(&mut engine, 300);
}

#[test]
fn paused_and_panned_sources_alloc_free() {
    let mut engine = MixEngine::new(RATE, LOOK_AHEAD_FRAMES);
    let audio = AudioChunk::mono(tone(RATE as usize * 5, 0.02));
    let a = engine.add(audio.clone());
    let b = engine.add(audio);
    engine.source_mut(a).unwrap().set_pan(-0.7);
    engine.source_mut(b).unwrap().set_paused(true);
    engine.set_master_volume(0.8);

    assert_ticks_alloc_free(&mut engine, 300);
}

#[test]
fn finishing_source_leaves_mix_without_allocating() {
    let mut engine = MixEngine::new(RATE, LOOK_AHEAD_FRAMES);
    // Shorter than the run, so it leaves the active list mid-test. The
    // caller still holds its handle, so nothing is freed.
    let short = engine.add(AudioChunk::mono(tone(RATE as usize, 0.05)));
    engine.add(AudioChunk::mono(tone(RATE as usize * 5, 0.05)));

    assert_ticks_alloc_free(&mut engine, 200);
    assert!(!engine.is_active(short));
    assert_eq!(engine.active_count(), 1);
}
