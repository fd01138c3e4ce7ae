/// Width and height the classifier was trained on.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (256, 256);

/// Quality used for the intermediate JPEG round-trip.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerConfig {
    /// Output frame size as (width, height). Uploads are stretched to it.
    pub input_size: (u32, u32),
    /// JPEG quality of the encode/decode pass run on the grayscale frame
    /// before pixel extraction. `None` extracts pixels directly.
    pub jpeg_quality: Option<u8>,
}

impl NormalizerConfig {
    /// Quality 0 disables the round-trip; anything above 100 is clamped.
    pub fn with_jpeg_quality(mut self, quality: u16) -> Self {
        self.jpeg_quality = match quality {
            0 => None,
            q => Some(q.min(100) as u8),
        };
        self
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            jpeg_quality: Some(DEFAULT_JPEG_QUALITY),
        }
    }
}
