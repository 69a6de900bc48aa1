//! Recording: container for continuous multi-channel EEG data

use crate::error::{ErpError, ErpResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channel class from the recording montage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Eeg,
    Eog,
    Emg,
    Misc,
}

impl ChannelKind {
    /// Map a montage type string ("EEG", "eog", ...) to a channel kind
    pub fn from_type(type_name: &str) -> Self {
        match type_name.trim().to_ascii_lowercase().as_str() {
            "eeg" => ChannelKind::Eeg,
            "eog" => ChannelKind::Eog,
            "emg" => ChannelKind::Emg,
            _ => ChannelKind::Misc,
        }
    }
}

/// One channel of the montage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub label: String,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn eeg(label: &str) -> Self {
        Self {
            label: label.to_string(),
            kind: ChannelKind::Eeg,
        }
    }
}

/// Continuous multi-channel recording with interleaved sample data
#[derive(Debug, Clone)]
pub struct Recording {
    /// Unique identifier for this recording
    pub id: Uuid,
    /// Sample data, interleaved across channels
    pub data: Vec<f64>,
    /// Montage description, one entry per channel
    pub channels: Vec<Channel>,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
}

impl Recording {
    /// Create a new recording from interleaved data and a montage
    pub fn new(data: Vec<f64>, channels: Vec<Channel>, sampling_rate: f64) -> ErpResult<Self> {
        if channels.is_empty() {
            return Err(ErpError::RecordingError {
                reason: "recording requires at least one channel".to_string(),
            });
        }
        if sampling_rate <= 0.0 {
            return Err(ErpError::RecordingError {
                reason: format!("invalid sampling rate: {} Hz", sampling_rate),
            });
        }
        if data.len() % channels.len() != 0 {
            return Err(ErpError::RecordingError {
                reason: format!(
                    "data length {} is not a multiple of channel count {}",
                    data.len(),
                    channels.len()
                ),
            });
        }

        Ok(Recording {
            id: Uuid::new_v4(),
            data,
            channels,
            sampling_rate,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        if self.channels.is_empty() {
            0
        } else {
            self.data.len() / self.channels.len()
        }
    }

    /// Recording duration in seconds
    pub fn duration_sec(&self) -> f64 {
        self.samples_per_channel() as f64 / self.sampling_rate
    }

    /// Extract one channel's samples over `[start, stop)` sample indices
    pub fn channel_slice(&self, channel: usize, start: usize, stop: usize) -> ErpResult<Vec<f64>> {
        if channel >= self.channel_count() {
            return Err(ErpError::RecordingError {
                reason: format!(
                    "channel index {} out of bounds (0-{})",
                    channel,
                    self.channel_count() - 1
                ),
            });
        }
        let stop = stop.min(self.samples_per_channel());
        if start >= stop {
            return Ok(Vec::new());
        }

        let n_channels = self.channel_count();
        let mut slice = Vec::with_capacity(stop - start);
        for sample_idx in start..stop {
            slice.push(self.data[sample_idx * n_channels + channel]);
        }
        Ok(slice)
    }

    /// Full sample vector for one channel
    pub fn channel_data(&self, channel: usize) -> ErpResult<Vec<f64>> {
        self.channel_slice(channel, 0, self.samples_per_channel())
    }

    /// Restrict the recording to EEG channels only
    pub fn retain_eeg(&self) -> ErpResult<Recording> {
        let kept: Vec<usize> = self
            .channels
            .iter()
            .enumerate()
            .filter(|(_, ch)| ch.kind == ChannelKind::Eeg)
            .map(|(idx, _)| idx)
            .collect();

        if kept.is_empty() {
            return Err(ErpError::RecordingError {
                reason: "recording has no EEG channels".to_string(),
            });
        }

        let samples = self.samples_per_channel();
        let n_channels = self.channel_count();
        let mut data = Vec::with_capacity(samples * kept.len());
        for sample_idx in 0..samples {
            for &ch in &kept {
                data.push(self.data[sample_idx * n_channels + ch]);
            }
        }

        let channels = kept
            .iter()
            .map(|&idx| self.channels[idx].clone())
            .collect();
        Recording::new(data, channels, self.sampling_rate)
    }

    /// Replace one channel's samples, keeping the interleaved layout
    pub fn set_channel_data(&mut self, channel: usize, samples: &[f64]) -> ErpResult<()> {
        if channel >= self.channel_count() {
            return Err(ErpError::RecordingError {
                reason: format!("channel index {} out of bounds", channel),
            });
        }
        if samples.len() != self.samples_per_channel() {
            return Err(ErpError::RecordingError {
                reason: format!(
                    "channel data length {} does not match {} samples per channel",
                    samples.len(),
                    self.samples_per_channel()
                ),
            });
        }
        let n_channels = self.channel_count();
        for (sample_idx, &value) in samples.iter().enumerate() {
            self.data[sample_idx * n_channels + channel] = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel_recording() -> Recording {
        // Interleaved: [ch0_s0, ch1_s0, ch0_s1, ch1_s1, ...]
        let data = (0..20).map(|i| i as f64).collect();
        let channels = vec![Channel::eeg("Cz"), Channel::eeg("Pz")];
        Recording::new(data, channels, 100.0).unwrap()
    }

    #[test]
    fn test_recording_creation() {
        let recording = two_channel_recording();
        assert_eq!(recording.channel_count(), 2);
        assert_eq!(recording.samples_per_channel(), 10);
        assert!((recording.duration_sec() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_interleaving() {
        let recording = two_channel_recording();
        let ch0 = recording.channel_data(0).unwrap();
        let ch1 = recording.channel_data(1).unwrap();
        assert_eq!(ch0[0], 0.0);
        assert_eq!(ch1[0], 1.0);
        assert_eq!(ch0[1], 2.0);
        assert_eq!(ch1[1], 3.0);
    }

    #[test]
    fn test_channel_slice_bounds() {
        let recording = two_channel_recording();
        let slice = recording.channel_slice(0, 2, 5).unwrap();
        assert_eq!(slice, vec![4.0, 6.0, 8.0]);
        // Degenerate range yields an empty slice, not an error
        assert!(recording.channel_slice(0, 5, 5).unwrap().is_empty());
        assert!(recording.channel_slice(2, 0, 5).is_err());
    }

    #[test]
    fn test_retain_eeg_drops_non_eeg() {
        let data = (0..30).map(|i| i as f64).collect();
        let channels = vec![
            Channel::eeg("Cz"),
            Channel {
                label: "HEOG".to_string(),
                kind: ChannelKind::Eog,
            },
            Channel::eeg("Pz"),
        ];
        let recording = Recording::new(data, channels, 100.0).unwrap();

        let eeg_only = recording.retain_eeg().unwrap();
        assert_eq!(eeg_only.channel_count(), 2);
        assert_eq!(eeg_only.channels[0].label, "Cz");
        assert_eq!(eeg_only.channels[1].label, "Pz");
        // Sample 1 of Pz was at interleaved index 1*3 + 2 = 5
        assert_eq!(eeg_only.channel_data(1).unwrap()[1], 5.0);
    }

    #[test]
    fn test_retain_eeg_requires_eeg() {
        let channels = vec![Channel {
            label: "HEOG".to_string(),
            kind: ChannelKind::Eog,
        }];
        let recording = Recording::new(vec![0.0; 5], channels, 100.0).unwrap();
        assert!(recording.retain_eeg().is_err());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(Recording::new(vec![0.0; 3], vec![Channel::eeg("Cz"), Channel::eeg("Pz")], 100.0).is_err());
        assert!(Recording::new(vec![0.0; 4], vec![], 100.0).is_err());
        assert!(Recording::new(vec![0.0; 4], vec![Channel::eeg("Cz")], 0.0).is_err());
    }
}
