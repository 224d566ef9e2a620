//! Release-mode benchmarks for the Haptick statics and geometry search.
//!
//! Run with:   cargo test --release --test bench_release -- --nocapture
//!
//! These are not criterion benchmarks; they time key operations with
//! `std::time::Instant` and print the results.

use haptick::acquisition::{SampleProcessor, CHANNELS};
use haptick::geometry::GeometryModel;
use haptick::objectives::EvennessError;
use haptick::statics::WrenchSolver;
use haptick::types::*;
use ndarray::Array2;
use std::time::Instant;

// ─────────────────────────────────────────────────────────────
//  Helpers
// ─────────────────────────────────────────────────────────────

fn params() -> GeometryParameters {
    GeometryParameters {
        top_radius: 30e-3,
        top_separation: 6e-3,
        bottom_radius: 15e-3,
        bottom_separation: 6e-3,
        height: 20e-3,
    }
}

fn wrench_rows(n: usize) -> (Array2<f64>, Array2<f64>) {
    let forces = Array2::from_shape_fn((n, 3), |(i, d)| 0.2 * ((i * 3 + d) as f64 * 0.37).sin());
    let torques = Array2::from_shape_fn((n, 3), |(i, d)| 6e-3 * ((i * 3 + d) as f64 * 0.91).cos());
    (forces, torques)
}

const BATCH_SIZES: &[usize] = &[1, 100, 1_000, PARALLEL_BATCH_THRESHOLD, 20_000, 200_000];

fn fmt_count(n: usize) -> String {
    if n >= 1_000_000 { format!("{:.2}M", n as f64 / 1e6) }
    else if n >= 1_000 { format!("{:.1}k", n as f64 / 1e3) }
    else { format!("{}", n) }
}

fn fmt_time(us: f64) -> String {
    if us >= 1_000_000.0 { format!("{:.2} s",  us / 1e6) }
    else if us >= 1_000.0 { format!("{:.2} ms", us / 1e3) }
    else { format!("{:.1} μs", us) }
}

// ─────────────────────────────────────────────────────────────
//  Benchmarks
// ─────────────────────────────────────────────────────────────

#[test]
fn bench_strut_forces_batch_scaling() {
    let model = GeometryModel::new(params()).unwrap();
    let solver = WrenchSolver::new(&model);

    eprintln!("\n┌─────────────────────────────────────────────────────────────────┐");
    eprintln!("│              STRUT FORCES BATCH  (P⁻¹ · −w per row)             │");
    eprintln!("├──────────┬──────────┬───────────┬───────────────────────────────┤");
    eprintln!("│  rows    │  mode    │  per-row  │  total (iters)                │");
    eprintln!("├──────────┼──────────┼───────────┼───────────────────────────────┤");

    for &n in BATCH_SIZES {
        let (forces, torques) = wrench_rows(n);

        // Warm-up
        let _ = solver.strut_forces_batch(forces.view(), torques.view()).unwrap();

        let iters: usize = if n < 1_000 { 2000 }
            else if n < 100_000 { 100 }
            else if n < 200_000 { 10 }
            else { 3 };

        let start = Instant::now();
        for _ in 0..iters {
            let x = solver.strut_forces_batch(forces.view(), torques.view()).unwrap();
            let _ = std::hint::black_box(x);
        }
        let elapsed = start.elapsed();
        let per_us = elapsed.as_micros() as f64 / (iters * n) as f64;
        let mode = if n >= PARALLEL_BATCH_THRESHOLD { "rayon" } else { "serial" };

        eprintln!(
            "│  {:<7} │ {:>8} │ {:>9} │  {:.2} ms  ({} iters){}│",
            fmt_count(n),
            mode,
            fmt_time(per_us),
            elapsed.as_secs_f64() * 1000.0,
            iters,
            " ".repeat(3usize.saturating_sub(format!("{}", iters).len())),
        );
    }
    eprintln!("└──────────┴──────────┴───────────┴───────────────────────────────┘\n");
}

#[test]
fn bench_evenness_evaluation() {
    eprintln!("\n┌─────────────────────────────────────────────────────────────────┐");
    eprintln!("│           EVENNESS ERROR  (model build + two sweeps)            │");
    eprintln!("├──────────┬──────────┬───────────┬───────────────────────────────┤");
    eprintln!("│  samples │  loads   │  per-eval │  total (iters)                │");
    eprintln!("├──────────┼──────────┼───────────┼───────────────────────────────┤");

    for &samples in &[20usize, 100, 1_000, 10_000] {
        let objective = EvennessError::new(EvennessSettings {
            samples,
            ..Default::default()
        })
        .unwrap();

        let iters: usize = if samples <= 100 { 1000 } else if samples <= 1_000 { 100 } else { 10 };

        let start = Instant::now();
        for _ in 0..iters {
            let cost = objective.evaluate(&params());
            let _ = std::hint::black_box(cost);
        }
        let elapsed = start.elapsed();
        let per_us = elapsed.as_micros() as f64 / iters as f64;

        eprintln!(
            "│  {:<7} │ {:>8} │ {:>9} │  {:.2} ms  ({} iters){}│",
            fmt_count(samples),
            fmt_count(2 * samples),
            fmt_time(per_us),
            elapsed.as_secs_f64() * 1000.0,
            iters,
            " ".repeat(4usize.saturating_sub(format!("{}", iters).len())),
        );
    }
    eprintln!("└──────────┴──────────┴───────────┴───────────────────────────────┘\n");
}

#[test]
fn bench_sample_processing() {
    let settings = MonitorSettings {
        filter_cutoff: Some(30.0),
        ..Default::default()
    };
    // One serial read's worth of samples
    let block = Array2::from_shape_fn((64, CHANNELS), |(i, ch)| 1e-3 * ((i + ch) as f64 * 0.05).sin());
    let blocks = 2_000;

    let mut processor = SampleProcessor::new(settings).unwrap();
    let start = Instant::now();
    for _ in 0..blocks {
        let out = processor.process(block.view()).unwrap();
        let _ = std::hint::black_box(out);
    }
    let elapsed = start.elapsed();
    let per_us = elapsed.as_micros() as f64 / blocks as f64;

    eprintln!(
        "\nsample processing: {} blocks of 64 in {:.2} ms ({} per block)\n",
        blocks,
        elapsed.as_secs_f64() * 1000.0,
        fmt_time(per_us),
    );
    assert!(processor.bias().is_some());
}
