use anyhow::Context;
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

//picks the input device with the given name, or the host's default input device
pub fn get_or_default_input(device_name: Option<&str>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());

    let Some(target) = device_name else {
        return host
            .default_input_device()
            .context("No default input device");
    };

    host.input_devices()
        .context("Failed to enumerate input devices")?
        .find(|device| device.name().is_ok_and(|name| name == target))
        .with_context(|| format!("No input device named \"{target}\""))
}

/// Whether the host exposes any input device at all.
pub fn has_input_device() -> bool {
    get_host().default_input_device().is_some()
}

pub fn get_available_inputs() -> anyhow::Result<String> {
    for host in cpal::available_hosts() {
        tracing::debug!("Available host: {:?}", host);
    }

    let host = get_host();

    let default_device = host
        .default_input_device()
        .and_then(|device| device.name().ok());

    let mut device_names: Vec<String> = Vec::new();
    for in_device in host.input_devices().context("No input devices found")? {
        let d_name = in_device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        //devices without a usable config are still listed
        let mut d = match in_device.default_input_config() {
            Ok(d_cfg) => format!(
                " * {}({}ch, {}hz)",
                d_name,
                d_cfg.channels(),
                d_cfg.sample_rate().0
            ),
            Err(e) => {
                tracing::debug!("Device {} has no default input config: {}", d_name, e);
                format!(" * {}(no default config)", d_name)
            }
        };
        if default_device.as_deref() == Some(d_name.as_str()) {
            d.push_str(" [default]");
        }
        device_names.push(d);
    }

    if device_names.is_empty() {
        return Ok(" (no input devices)".to_string());
    }
    Ok(device_names.join("\n"))
}
