use ndarray::{Array4, ArrayView4};

/// Model input in NHWC layout: `[1, height, width, 1]`, one `i32` per
/// grayscale pixel in `0..=255`.
///
/// The batch dimension is always 1. Dropping the tensor releases its buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Array4<i32>,
}

impl InputTensor {
    /// Packs a row-major single-channel frame into a tensor.
    pub fn from_frame(frame: &[u8], width: u32, height: u32) -> Result<Self, ndarray::ShapeError> {
        let values: Vec<i32> = frame.iter().map(|&v| i32::from(v)).collect();
        let data =
            Array4::from_shape_vec((1, height as usize, width as usize, 1), values)?;
        Ok(Self { data })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    /// Intensity at row `y`, column `x`.
    pub fn pixel(&self, y: usize, x: usize) -> i32 {
        self.data[[0, y, x, 0]]
    }

    pub fn view(&self) -> ArrayView4<'_, i32> {
        self.data.view()
    }

    /// Flat row-major values.
    pub fn values(&self) -> impl Iterator<Item = i32> + '_ {
        self.data.iter().copied()
    }
}
