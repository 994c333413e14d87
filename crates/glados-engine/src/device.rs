use glados_config::DeviceSetting;
use serde::Serialize;

/// Execution backend the inference runtime is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    /// Specialized inference accelerator
    Accelerator,
    /// General-purpose GPU
    Gpu,
    Cpu,
}

impl DeviceKind {
    /// Device forced by configuration, `None` when probing is requested
    pub const fn from_setting(setting: DeviceSetting) -> Option<Self> {
        match setting {
            DeviceSetting::Auto => None,
            DeviceSetting::Accelerator => Some(Self::Accelerator),
            DeviceSetting::Gpu => Some(Self::Gpu),
            DeviceSetting::Cpu => Some(Self::Cpu),
        }
    }
}

/// Reports which accelerators the host can use
pub trait AcceleratorProbe: Send + Sync {
    fn has_accelerator(&self) -> bool;

    fn has_gpu(&self) -> bool;
}

/// Probe for hosts (or builds) without any accelerator support
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuOnly;

impl AcceleratorProbe for CpuOnly {
    fn has_accelerator(&self) -> bool {
        false
    }

    fn has_gpu(&self) -> bool {
        false
    }
}

/// Pick the best available execution device
///
/// The specialized accelerator wins over a general GPU; anything else runs
/// on the CPU.
pub fn select_device(probe: &dyn AcceleratorProbe) -> DeviceKind {
    let device = if probe.has_accelerator() {
        DeviceKind::Accelerator
    } else if probe.has_gpu() {
        DeviceKind::Gpu
    } else {
        DeviceKind::Cpu
    };

    tracing::info!(%device, "selected execution device");

    device
}
