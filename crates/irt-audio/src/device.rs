//! Audio device enumeration and selection

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SupportedStreamConfigRange};

use crate::{AudioError, AudioResult};

/// Output device information
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub output_channels: u16,
    pub sample_rates: Vec<u32>,
}

/// Get the audio host (platform default backend)
pub fn get_host() -> Host {
    cpal::default_host()
}

/// List available output devices
pub fn list_output_devices() -> AudioResult<Vec<DeviceInfo>> {
    let host = get_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host
        .output_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        let Ok(name) = device.name() else {
            continue;
        };
        let is_default = default_name.as_deref() == Some(name.as_str());
        let configs: Vec<SupportedStreamConfigRange> = device
            .supported_output_configs()
            .map(|c| c.collect())
            .unwrap_or_default();
        let (output_channels, sample_rates) = extract_device_info(&configs);

        devices.push(DeviceInfo {
            name,
            is_default,
            output_channels,
            sample_rates,
        });
    }

    Ok(devices)
}

/// Get default output device
pub fn get_default_output_device() -> AudioResult<Device> {
    get_host().default_output_device().ok_or(AudioError::NoDevice)
}

/// Get output device by name
pub fn get_output_device_by_name(name: &str) -> AudioResult<Device> {
    let host = get_host();

    for device in host
        .output_devices()
        .map_err(|e| AudioError::BackendError(e.to_string()))?
    {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}

fn extract_device_info(configs: &[SupportedStreamConfigRange]) -> (u16, Vec<u32>) {
    let max_channels = configs.iter().map(|c| c.channels()).max().unwrap_or(0);

    let mut sample_rates: Vec<u32> = configs
        .iter()
        .flat_map(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            [22050, 44100, 48000, 88200, 96000, 176400, 192000]
                .into_iter()
                .filter(move |&r| r >= min && r <= max)
        })
        .collect();
    sample_rates.sort_unstable();
    sample_rates.dedup();

    (max_channels, sample_rates)
}
