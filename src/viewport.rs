/// Upper bound on the pixel ratio used for the drawing buffer
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// `min(device_pixel_ratio, 2)`; non-positive or NaN ratios fall back to 1
pub fn clamp_pixel_ratio(device_pixel_ratio: f32) -> f32 {
    if device_pixel_ratio.is_nan() || device_pixel_ratio <= 0.0 {
        return 1.0;
    }
    device_pixel_ratio.min(MAX_PIXEL_RATIO)
}

/// Scale `size` down uniformly so neither side exceeds `max_dimension`
///
/// Sizes already within the limit are returned unchanged (apart from the
/// 1×1 minimum).
pub fn fit_to_max_dimension(size: (u32, u32), max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    let (width, height) = (size.0.max(1), size.1.max(1));
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / longest as f64;
    let fit = |side: u32| ((side as f64 * scale).floor() as u32).clamp(1, max_dimension);
    (fit(width), fit(height))
}

/// Output size in logical pixels plus the pixel ratio applied to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    device_pixel_ratio: f32,
    pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
            pixel_ratio: clamp_pixel_ratio(device_pixel_ratio),
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn set_pixel_ratio(&mut self, device_pixel_ratio: f32) {
        self.device_pixel_ratio = device_pixel_ratio;
        self.pixel_ratio = clamp_pixel_ratio(device_pixel_ratio);
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    /// Ratio actually used for rendering
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Width over height; 1.0 while either side is zero
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Rendered pixel size, never smaller than 1×1
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scale = |side: u32| ((side as f32 * self.pixel_ratio).floor() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}
