//! Band-pass preprocessing for continuous recordings
//!
//! Second-order Butterworth sections designed via bilinear transform,
//! applied offline over the whole buffer with zero initial state.

use erp_core::{ErpError, ErpResult, Recording};

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// One second-order IIR section
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    /// Butterworth low-pass section
    fn lowpass(cutoff_hz: f64, sampling_rate: f64) -> ErpResult<Self> {
        check_cutoff(cutoff_hz, sampling_rate)?;
        let k = (std::f64::consts::PI * cutoff_hz / sampling_rate).tan();
        let norm = 1.0 / (1.0 + SQRT_2 * k + k * k);
        Ok(Biquad {
            b: [k * k * norm, 2.0 * k * k * norm, k * k * norm],
            a: [
                2.0 * (k * k - 1.0) * norm,
                (1.0 - SQRT_2 * k + k * k) * norm,
            ],
        })
    }

    /// Butterworth high-pass section
    fn highpass(cutoff_hz: f64, sampling_rate: f64) -> ErpResult<Self> {
        check_cutoff(cutoff_hz, sampling_rate)?;
        let k = (std::f64::consts::PI * cutoff_hz / sampling_rate).tan();
        let norm = 1.0 / (1.0 + SQRT_2 * k + k * k);
        Ok(Biquad {
            b: [norm, -2.0 * norm, norm],
            a: [
                2.0 * (k * k - 1.0) * norm,
                (1.0 - SQRT_2 * k + k * k) * norm,
            ],
        })
    }

    /// Direct-form I over a full buffer, zero initial state
    fn apply(&self, input: &[f64]) -> Vec<f64> {
        let mut output = Vec::with_capacity(input.len());
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);

        for &x in input {
            let y = self.b[0] * x + self.b[1] * x1 + self.b[2] * x2
                - self.a[0] * y1
                - self.a[1] * y2;
            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
            output.push(y);
        }
        output
    }
}

fn check_cutoff(cutoff_hz: f64, sampling_rate: f64) -> ErpResult<()> {
    if cutoff_hz <= 0.0 {
        return Err(ErpError::ConfigError {
            message: format!("cutoff frequency must be positive, got {} Hz", cutoff_hz),
        });
    }
    if cutoff_hz >= sampling_rate / 2.0 {
        return Err(ErpError::ConfigError {
            message: format!(
                "cutoff {} Hz reaches the Nyquist frequency at {} Hz sampling",
                cutoff_hz, sampling_rate
            ),
        });
    }
    Ok(())
}

/// High-pass + low-pass cascade forming the configured band-pass
#[derive(Debug, Clone)]
pub struct BandPassFilter {
    highpass: Biquad,
    lowpass: Biquad,
}

impl BandPassFilter {
    pub fn new(low_cutoff_hz: f64, high_cutoff_hz: f64, sampling_rate: f64) -> ErpResult<Self> {
        if low_cutoff_hz >= high_cutoff_hz {
            return Err(ErpError::ConfigError {
                message: format!(
                    "band-pass low cutoff {} Hz must be below high cutoff {} Hz",
                    low_cutoff_hz, high_cutoff_hz
                ),
            });
        }
        Ok(BandPassFilter {
            highpass: Biquad::highpass(low_cutoff_hz, sampling_rate)?,
            lowpass: Biquad::lowpass(high_cutoff_hz, sampling_rate)?,
        })
    }

    /// Filter one channel buffer
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        self.lowpass.apply(&self.highpass.apply(input))
    }
}

/// Band-pass every channel of a recording in place of the original data
pub fn band_pass_recording(
    recording: &Recording,
    low_cutoff_hz: f64,
    high_cutoff_hz: f64,
) -> ErpResult<Recording> {
    let filter = BandPassFilter::new(low_cutoff_hz, high_cutoff_hz, recording.sampling_rate)?;

    let mut filtered = recording.clone();
    for channel in 0..recording.channel_count() {
        let data = recording.channel_data(channel)?;
        filtered.set_channel_data(channel, &filter.apply(&data))?;
    }
    Ok(filtered)
}
