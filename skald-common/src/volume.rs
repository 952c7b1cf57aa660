//! Volume curve math.
//!
//! The engine and settings layer speak in logical volumes (0 to 100). The
//! audio device speaks a coarser 0 to 128 range. The mapping scales the
//! logical value to the device range and attenuates it by the square of the
//! normalized global volume setting; the quadratic curve approximates
//! perceptual loudness over a range this coarse.

/// Upper bound of the device volume range.
pub const DEVICE_VOLUME_MAX: u8 = 128;

/// Upper bound of the logical volume range.
pub const LOGICAL_VOLUME_MAX: u8 = 100;

/// Clamp a caller-supplied volume into the logical range.
pub fn clamp_logical(volume: i32) -> u8 {
    volume.clamp(0, LOGICAL_VOLUME_MAX as i32) as u8
}

/// Map a logical volume and global attenuation to a device volume.
pub fn device_volume(logical: u8, attenuation: u8) -> u8 {
    let logical = logical.min(LOGICAL_VOLUME_MAX);
    let attenuation = attenuation.min(LOGICAL_VOLUME_MAX);
    let scaled = (logical as u32 * DEVICE_VOLUME_MAX as u32) / LOGICAL_VOLUME_MAX as u32;
    let factor = (attenuation as f32 / 100.0).powi(2);
    (scaled as f32 * factor).round() as u8
}

/// Device volume expressed as a unit gain for the mixer.
pub fn device_gain(device: u8) -> f32 {
    device.min(DEVICE_VOLUME_MAX) as f32 / DEVICE_VOLUME_MAX as f32
}
