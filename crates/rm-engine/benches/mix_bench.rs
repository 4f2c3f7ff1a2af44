use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rm_engine::{resample, MixEngine};
use rm_ir::AudioChunk;

const RATE: u32 = 44100;
const LOOK_AHEAD_FRAMES: usize = 4410;

fn tone(frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / RATE as f32).sin() * 0.5)
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let audio = AudioChunk::mono(tone(RATE as usize * 10));
    for count in [1usize, 8, 32] {
        let mut engine = MixEngine::new(RATE, LOOK_AHEAD_FRAMES);
        for _ in 0..count {
            engine.add(audio.clone());
        }
        c.bench_function(&format!("render_look_ahead_{}_sources", count), |b| {
            b.iter(|| black_box(engine.render().len()))
        });
    }
}

fn bench_resample(c: &mut Criterion) {
    let input = tone(22050);
    c.bench_function("resample_22050_to_44100_1s", |b| {
        b.iter(|| black_box(resample(black_box(&input), 22050, RATE)))
    });
}

criterion_group!(benches, bench_render, bench_resample);
criterion_main!(benches);
