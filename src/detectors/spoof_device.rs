use crate::common::Config;
use crate::detectors::RemoteDeviceWorkingFrame;

/// Remote device and replay-attack detector.
///
/// Inference happens on the fusion endpoint; locally this only knows the
/// working frame the endpoint's model was trained on.
#[derive(Debug, Clone)]
pub struct SpoofDeviceDetector {
    working_frame_size: u32,
}

impl SpoofDeviceDetector {
    pub fn new(config: &Config) -> Self {
        Self::with_working_frame_size(config.spoof_device.working_frame_size)
    }

    pub fn with_working_frame_size(working_frame_size: u32) -> Self {
        Self { working_frame_size }
    }
}

impl RemoteDeviceWorkingFrame for SpoofDeviceDetector {
    fn working_frame_size(&self) -> u32 {
        self.working_frame_size
    }
}
