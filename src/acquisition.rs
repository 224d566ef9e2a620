//! Six-channel sample conditioning between the serial reader and the core.
//!
//! Raw ADC counts are scaled to volts, optionally low-pass filtered, then
//! bias (zero-offset) corrected.  Blocks are N × 6, one row per sample.

use crate::objectives::population_std;
use crate::types::{BiasCorrectionSettings, HaptickError, MonitorSettings};
use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;
use std::f64::consts::PI;

pub const CHANNELS: usize = 6;

/// Seconds between consecutive samples.
pub const SAMPLE_PERIOD: f64 = 256e-6;

pub const SAMPLE_RATE: f64 = 1.0 / SAMPLE_PERIOD;

/// Volts per count of the 24-bit ADC (2.4 V reference, gain 64).
pub const ADC_GAIN: f64 = (2.4 / 64.0) / (1u64 << 24) as f64;

/// Samples kept for bias estimation (4 s).
pub const BIAS_CACHE_LEN: usize = 15625;

/// Window averaged for the first bias estimate.
pub const INITIAL_BIAS_WINDOW: f64 = 3.0;

pub fn volts_from_counts(counts: i32) -> f64 {
    counts as f64 * ADC_GAIN
}

/// Samples in a window of `seconds`, clamped to the cache.  Zero for
/// windows shorter than half a sample period, negative or NaN.
fn window_len(seconds: f64) -> usize {
    ((seconds / SAMPLE_PERIOD).round() as usize).min(BIAS_CACHE_LEN)
}

// ─────────────────────────────────────────────────────────────
//  Butterworth low-pass
// ─────────────────────────────────────────────────────────────

const FILTER_ORDER: usize = 4;
const SECTIONS: usize = FILTER_ORDER / 2;

/// One biquad `b0 + b1 z⁻¹ + b2 z⁻²  /  1 + a1 z⁻¹ + a2 z⁻²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub b: [f64; 3],
    pub a: [f64; 2],
}

impl Section {
    /// Transposed direct-form II state after an infinitely long constant
    /// input of 1.  Sections have unit DC gain, so the output is 1 as well.
    fn steady_state(&self) -> [f64; 2] {
        let z2 = self.b[2] - self.a[1];
        let z1 = self.b[1] - self.a[0] + z2;
        [z1, z2]
    }
}

/// 4th-order Butterworth low-pass as cascaded second-order sections.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    cutoff: f64,
    sections: [Section; SECTIONS],
    /// Per channel, per section: `[z1, z2]`.  `None` until the first sample.
    state: Option<Vec<[[f64; 2]; SECTIONS]>>,
}

impl LowPassFilter {
    /// Design by bilinear transform with pre-warping.
    pub fn new(cutoff: f64, sample_rate: f64) -> Result<Self, HaptickError> {
        if !(cutoff.is_finite() && cutoff > 0.0 && cutoff < 0.5 * sample_rate) {
            return Err(HaptickError::InvalidParameter(format!(
                "filter cutoff must lie in (0, {}) Hz, got {cutoff}",
                0.5 * sample_rate
            )));
        }

        let c = 2.0 * sample_rate;
        let warped = c * (PI * cutoff / sample_rate).tan();

        let mut sections = [Section { b: [0.0; 3], a: [0.0; 2] }; SECTIONS];
        for (k, section) in sections.iter_mut().enumerate() {
            // Analog pole in the upper half plane; its conjugate completes the pair.
            let theta = PI * (2 * k + 1) as f64 / (2 * FILTER_ORDER) as f64;
            let pr = -warped * theta.sin();
            let pi = warped * theta.cos();

            // z = (c + p) / (c − p)
            let den = (c - pr) * (c - pr) + pi * pi;
            let zr = (c * c - pr * pr - pi * pi) / den;
            let zi = 2.0 * c * pi / den;

            let a1 = -2.0 * zr;
            let a2 = zr * zr + zi * zi;
            // Zeros at z = −1; scale for unit gain at DC.
            let g = (1.0 + a1 + a2) / 4.0;
            *section = Section {
                b: [g, 2.0 * g, g],
                a: [a1, a2],
            };
        }

        Ok(Self {
            cutoff,
            sections,
            state: None,
        })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn sections(&self) -> &[Section; SECTIONS] {
        &self.sections
    }

    /// Filter a block along the sample axis, carrying state across calls.
    pub fn apply(&mut self, block: ArrayView2<f64>) -> Array2<f64> {
        let mut out = block.to_owned();
        if out.nrows() == 0 {
            return out;
        }

        if self.state.as_ref().is_some_and(|s| s.len() != block.ncols()) {
            self.state = None;
        }

        let sections = self.sections;
        let state = self.state.get_or_insert_with(|| {
            // Start each channel at rest on its first value.
            (0..block.ncols())
                .map(|ch| {
                    let x0 = block[[0, ch]];
                    let mut zi = [[0.0; 2]; SECTIONS];
                    for (s, section) in sections.iter().enumerate() {
                        let [z1, z2] = section.steady_state();
                        zi[s] = [z1 * x0, z2 * x0];
                    }
                    zi
                })
                .collect()
        });

        for mut row in out.rows_mut() {
            for (ch, value) in row.iter_mut().enumerate() {
                let mut x = *value;
                for (s, section) in sections.iter().enumerate() {
                    let z = &mut state[ch][s];
                    let y = section.b[0] * x + z[0];
                    z[0] = section.b[1] * x - section.a[0] * y + z[1];
                    z[1] = section.b[2] * x - section.a[1] * y;
                    x = y;
                }
                *value = x;
            }
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────
//  Bias correction
// ─────────────────────────────────────────────────────────────

/// Tracks the zero offset of each channel and subtracts it.
#[derive(Debug, Clone)]
pub struct BiasCorrector {
    settings: BiasCorrectionSettings,
    /// Most recent samples, newest at the back.
    cache: VecDeque<[f64; CHANNELS]>,
    seen: usize,
    bias: Option<[f64; CHANNELS]>,
}

impl BiasCorrector {
    pub fn new(settings: BiasCorrectionSettings) -> Self {
        Self {
            settings,
            cache: VecDeque::with_capacity(BIAS_CACHE_LEN),
            seen: 0,
            bias: None,
        }
    }

    pub fn settings(&self) -> &BiasCorrectionSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: BiasCorrectionSettings) {
        self.settings = settings;
    }

    pub fn bias(&self) -> Option<[f64; CHANNELS]> {
        self.bias
    }

    /// Record a block and return it bias-corrected.  Rows are NaN until
    /// enough samples have arrived for a first estimate.
    pub fn apply(&mut self, block: ArrayView2<f64>) -> Array2<f64> {
        for row in block.rows() {
            if self.cache.len() == BIAS_CACHE_LEN {
                self.cache.pop_front();
            }
            let mut sample = [0.0; CHANNELS];
            for (s, &v) in sample.iter_mut().zip(row.iter()) {
                *s = v;
            }
            self.cache.push_back(sample);
        }
        self.seen += block.nrows();

        if self.seen > BIAS_CACHE_LEN {
            if self.bias.is_none() {
                let (mean, _) = self.window_stats(window_len(INITIAL_BIAS_WINDOW));
                debug!("initial bias estimate {mean:?}");
                self.bias = Some(mean);
            } else if self.settings.enabled && window_len(self.settings.time) > 0 {
                // An empty rest window is never quiet.
                let (mean, std) = self.window_stats(window_len(self.settings.time));
                if std.iter().all(|&s| s < self.settings.threshold) {
                    debug!("bias updated to {mean:?}");
                    self.bias = Some(mean);
                }
            }
        }

        match self.bias {
            Some(bias) => {
                let mut out = block.to_owned();
                for mut row in out.rows_mut() {
                    for (v, b) in row.iter_mut().zip(bias.iter()) {
                        *v -= b;
                    }
                }
                out
            }
            None => Array2::from_elem(block.raw_dim(), f64::NAN),
        }
    }

    /// Per-channel mean and population standard deviation of the newest
    /// `len` samples.
    fn window_stats(&self, len: usize) -> ([f64; CHANNELS], [f64; CHANNELS]) {
        let len = len.min(self.cache.len());
        let mut mean = [0.0; CHANNELS];
        let mut std = [0.0; CHANNELS];
        let mut column = Vec::with_capacity(len);
        for ch in 0..CHANNELS {
            column.clear();
            column.extend(self.cache.iter().rev().take(len).map(|s| s[ch]));
            mean[ch] = column.iter().sum::<f64>() / len as f64;
            std[ch] = population_std(&column);
        }
        (mean, std)
    }
}

// ─────────────────────────────────────────────────────────────
//  Processor
// ─────────────────────────────────────────────────────────────

/// Filter → bias pipeline fed by the acquisition loop.
#[derive(Debug, Clone)]
pub struct SampleProcessor {
    filter: Option<LowPassFilter>,
    bias: BiasCorrector,
}

impl SampleProcessor {
    pub fn new(settings: MonitorSettings) -> Result<Self, HaptickError> {
        let filter = settings
            .filter_cutoff
            .map(|cutoff| LowPassFilter::new(cutoff, SAMPLE_RATE))
            .transpose()?;
        Ok(Self {
            filter,
            bias: BiasCorrector::new(settings.bias_correction),
        })
    }

    pub fn filter_cutoff(&self) -> Option<f64> {
        self.filter.as_ref().map(LowPassFilter::cutoff)
    }

    /// Replace the low-pass filter; its state restarts on the next block.
    pub fn set_filter_cutoff(&mut self, cutoff: Option<f64>) -> Result<(), HaptickError> {
        self.filter = cutoff.map(|c| LowPassFilter::new(c, SAMPLE_RATE)).transpose()?;
        match cutoff {
            Some(c) => info!("low-pass filter set to {c:.1} Hz"),
            None => info!("low-pass filter disabled"),
        }
        Ok(())
    }

    pub fn bias_correction(&self) -> &BiasCorrectionSettings {
        self.bias.settings()
    }

    pub fn set_bias_correction(&mut self, settings: BiasCorrectionSettings) {
        self.bias.set_settings(settings);
    }

    pub fn bias(&self) -> Option<[f64; CHANNELS]> {
        self.bias.bias()
    }

    /// Condition a block of volts (N × 6).
    pub fn process(&mut self, block: ArrayView2<f64>) -> Result<Array2<f64>, HaptickError> {
        if block.ncols() != CHANNELS {
            return Err(HaptickError::DimensionMismatch(format!(
                "samples must be {CHANNELS} wide, got {}",
                block.ncols()
            )));
        }
        let filtered = match self.filter.as_mut() {
            Some(filter) => filter.apply(block),
            None => block.to_owned(),
        };
        Ok(self.bias.apply(filtered.view()))
    }
}
