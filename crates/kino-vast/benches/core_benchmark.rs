//! Benchmark tests for kino-vast operations
//!
//! Run with: cargo bench -p kino-vast

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use kino_vast::sim::{self, AdSpec, BeaconLog, ManualHost, MediaSpec, ScriptedAd, SimulatedVideo};
use kino_vast::{AdHandle, AdPlayer, BreakPosition, BreakSchedule, Offset, TrackingPoint, TrackingQueue};

// ============================================================================
// Helpers
// ============================================================================

fn create_test_ad(log: &BeaconLog) -> AdHandle {
    ScriptedAd::chain(
        &[AdSpec::new("bench").with_media(MediaSpec::new("bench.mp4", 15.0))],
        log,
    )
    .unwrap()
}

fn create_schedule(count: usize, log: &BeaconLog) -> BreakSchedule {
    let mut schedule = BreakSchedule::new();
    for i in 0..count {
        let position = BreakPosition::At(Offset::Absolute((i * 60) as f64));
        schedule.insert(position, create_test_ad(log), None).unwrap();
    }
    schedule
}

fn create_tracking_points(count: usize) -> Vec<TrackingPoint> {
    (0..count)
        .map(|i| {
            let offset = if i % 2 == 0 {
                Offset::Fraction(i as f64 / count as f64)
            } else {
                Offset::Absolute(i as f64 * 0.25)
            };
            TrackingPoint::new("progress", offset)
        })
        .collect()
}

// ============================================================================
// Schedule Benchmarks
// ============================================================================

fn bench_schedule_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("Break Insertion");
    let log = BeaconLog::new();

    for &count in &[1, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::new("insert", count), &count, |b, &count| {
            b.iter(|| black_box(create_schedule(count, &log)));
        });
    }

    group.finish();
}

fn bench_due_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mid-roll Lookup");
    let log = BeaconLog::new();

    for &count in &[10, 100, 1000] {
        let schedule = create_schedule(count, &log);
        let end = (count * 60) as f64;
        group.bench_with_input(BenchmarkId::new("due_index", count), &schedule, |b, schedule| {
            b.iter(|| black_box(schedule.due_index(black_box(end / 2.0))));
        });
    }

    group.finish();
}

// ============================================================================
// Tracking Benchmarks
// ============================================================================

fn bench_take_due(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tracking Points");

    for &count in &[4, 16, 64] {
        let points = create_tracking_points(count);
        group.bench_with_input(BenchmarkId::new("take_due", count), &points, |b, points| {
            b.iter(|| {
                let mut queue = TrackingQueue::new();
                queue.load(points.clone());
                let mut fired = 0;
                let mut time = 0.0;
                while !queue.is_empty() && time <= 30.0 {
                    fired += queue.take_due(time, Some(30.0)).len();
                    time += 0.25;
                }
                black_box(fired)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Playback Benchmarks
// ============================================================================

fn bench_preroll_break(c: &mut Criterion) {
    c.bench_function("preroll_break", |b| {
        b.iter(|| {
            let log = BeaconLog::new();
            let mut player = AdPlayer::new(ManualHost::new());
            player.add_break(BreakPosition::Start, create_test_ad(&log)).unwrap();
            let video = SimulatedVideo::with_content("content.mp4", 600.0)
                .with_media("bench.mp4", sim::SimMedia::new(15.0));
            player.watch_player(video).unwrap();
            sim::Action::Play.apply(&mut player);
            sim::run_for(&mut player, 16.0, 0.25);
            black_box(log.len())
        });
    });
}

criterion_group!(schedule_benches, bench_schedule_insertion, bench_due_index);

criterion_group!(tracking_benches, bench_take_due);

criterion_group!(playback_benches, bench_preroll_break);

criterion_main!(schedule_benches, tracking_benches, playback_benches);
