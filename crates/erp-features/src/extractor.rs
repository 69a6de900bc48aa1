//! Waveform window extraction
//!
//! Converts one event onset plus a preloaded recording into a flat feature
//! vector: baseline-corrected sub-window means, peak statistics, and
//! frequency-band powers from a real-input FFT. Trials whose epoch or
//! baseline window falls outside the recording are dropped, not clamped.

use erp_core::{EpochConfig, Recording};
use realfft::RealFftPlanner;
use std::collections::BTreeMap;

/// Descriptive statistics columns, in output order
const STAT_COLUMNS: [&str; 6] = [
    "erp_peak_positive",
    "erp_peak_negative",
    "erp_peak_to_peak",
    "erp_mean_abs",
    "erp_std",
    "erp_abs_auc",
];

/// Feature column names for one epoch configuration, fixed once per run
pub fn feature_columns(epoch: &EpochConfig) -> Vec<String> {
    let mut columns = Vec::new();
    for window in &epoch.windows {
        columns.push(format!("win_{}_mean", window.name));
    }
    for stat in STAT_COLUMNS {
        columns.push(stat.to_string());
    }
    for band in &epoch.bands {
        columns.push(format!("bandpower_{}", band.name));
        columns.push(format!("bandpower_{}_rel", band.name));
    }
    columns
}

/// Per-trial feature extractor
pub struct WindowExtractor {
    epoch: EpochConfig,
    fft_planner: RealFftPlanner<f64>,
}

impl WindowExtractor {
    pub fn new(epoch: EpochConfig) -> Self {
        WindowExtractor {
            epoch,
            fft_planner: RealFftPlanner::new(),
        }
    }

    /// Extract features for one event onset.
    ///
    /// Returns `None` when the epoch or baseline window cannot be sliced
    /// from the recording; such trials are dropped by the caller.
    pub fn extract(&mut self, recording: &Recording, onset_sec: f64) -> Option<BTreeMap<String, f64>> {
        let rate = recording.sampling_rate;
        let n_samples = recording.samples_per_channel() as i64;
        let onset_sample = (onset_sec * rate).round() as i64;

        let start = onset_sample + (self.epoch.tmin_sec * rate).round() as i64;
        let stop = onset_sample + (self.epoch.tmax_sec * rate).round() as i64;

        // Hard boundary check, not a clamp
        if start < 0 || stop <= start || stop >= n_samples {
            return None;
        }

        let mut epoch_channels: Vec<Vec<f64>> = Vec::with_capacity(recording.channel_count());
        for channel in 0..recording.channel_count() {
            let slice = recording
                .channel_slice(channel, start as usize, stop as usize)
                .ok()?;
            if slice.is_empty() {
                return None;
            }
            epoch_channels.push(slice);
        }

        let baseline_start = onset_sample + (self.epoch.baseline_start_sec * rate).round() as i64;
        let baseline_stop = onset_sample + (self.epoch.baseline_end_sec * rate).round() as i64;
        let baseline_start = baseline_start.clamp(0, n_samples) as usize;
        let baseline_stop = baseline_stop.clamp(0, n_samples) as usize;
        if baseline_stop <= baseline_start {
            return None;
        }

        // Per-channel baseline mean, subtracted before channel averaging
        for (channel, epoch_data) in epoch_channels.iter_mut().enumerate() {
            let baseline = recording
                .channel_slice(channel, baseline_start, baseline_stop)
                .ok()?;
            if baseline.is_empty() {
                return None;
            }
            let baseline_mean = baseline.iter().sum::<f64>() / baseline.len() as f64;
            for value in epoch_data.iter_mut() {
                *value -= baseline_mean;
            }
        }

        let epoch_len = (stop - start) as usize;
        let n_channels = epoch_channels.len() as f64;
        let global: Vec<f64> = (0..epoch_len)
            .map(|i| epoch_channels.iter().map(|ch| ch[i]).sum::<f64>() / n_channels)
            .collect();

        let mut features = BTreeMap::new();

        for window in &self.epoch.windows {
            let w_start = onset_sample + (window.start_sec * rate).round() as i64 - start;
            let w_stop = onset_sample + (window.end_sec * rate).round() as i64 - start;
            let w_start = w_start.clamp(0, epoch_len as i64) as usize;
            let w_stop = w_stop.clamp(0, epoch_len as i64) as usize;

            // Empty clamped window records 0.0, not a failure
            let mean = if w_stop > w_start {
                global[w_start..w_stop].iter().sum::<f64>() / (w_stop - w_start) as f64
            } else {
                0.0
            };
            features.insert(format!("win_{}_mean", window.name), mean);
        }

        self.insert_stats(&global, rate, &mut features);
        self.insert_band_powers(&global, rate, &mut features);

        Some(features)
    }

    fn insert_stats(&self, global: &[f64], rate: f64, features: &mut BTreeMap<String, f64>) {
        let n = global.len() as f64;
        let peak_positive = global.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let peak_negative = global.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let mean = global.iter().sum::<f64>() / n;
        let mean_abs = global.iter().map(|x| x.abs()).sum::<f64>() / n;
        let variance = global.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        // Trapezoidal area under |x| with sample spacing 1/rate
        let dx = 1.0 / rate;
        let abs_auc = global
            .windows(2)
            .map(|pair| (pair[0].abs() + pair[1].abs()) * 0.5 * dx)
            .sum::<f64>();

        features.insert("erp_peak_positive".to_string(), peak_positive);
        features.insert("erp_peak_negative".to_string(), peak_negative);
        features.insert("erp_peak_to_peak".to_string(), peak_positive - peak_negative);
        features.insert("erp_mean_abs".to_string(), mean_abs);
        features.insert("erp_std".to_string(), variance.sqrt());
        features.insert("erp_abs_auc".to_string(), abs_auc);
    }

    fn insert_band_powers(&mut self, global: &[f64], rate: f64, features: &mut BTreeMap<String, f64>) {
        let n = global.len();
        if n == 0 {
            for band in &self.epoch.bands {
                features.insert(format!("bandpower_{}", band.name), 0.0);
                features.insert(format!("bandpower_{}_rel", band.name), 0.0);
            }
            return;
        }

        let mean = global.iter().sum::<f64>() / n as f64;
        let mut demeaned: Vec<f64> = global.iter().map(|x| x - mean).collect();

        let fft = self.fft_planner.plan_fft_forward(n);
        let mut spectrum = fft.make_output_vec();
        if fft.process(&mut demeaned, &mut spectrum).is_err() {
            for band in &self.epoch.bands {
                features.insert(format!("bandpower_{}", band.name), 0.0);
                features.insert(format!("bandpower_{}_rel", band.name), 0.0);
            }
            return;
        }

        let power: Vec<f64> = spectrum.iter().map(|c| c.norm_sqr()).collect();
        let total_power: f64 = power.iter().sum();

        for band in &self.epoch.bands {
            let band_power: f64 = power
                .iter()
                .enumerate()
                .filter(|(k, _)| {
                    let freq = *k as f64 * rate / n as f64;
                    freq >= band.low_hz && freq <= band.high_hz
                })
                .map(|(_, p)| p)
                .sum();

            let relative = if total_power > 0.0 {
                band_power / total_power
            } else {
                0.0
            };
            features.insert(format!("bandpower_{}", band.name), band_power);
            features.insert(format!("bandpower_{}_rel", band.name), relative);
        }
    }
}
