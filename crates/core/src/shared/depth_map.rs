use ndarray::ArrayView2;

/// Per-pixel distances in meters, row-major. Non-finite values mark pixels
/// the sensor could not measure.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthMap {
    data: Vec<f32>,
    width: u32,
    height: u32,
}

impl DepthMap {
    pub fn new(data: Vec<f32>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn filled(width: u32, height: u32, meters: f32) -> Self {
        Self::new(
            vec![meters; (width as usize) * (height as usize)],
            width,
            height,
        )
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn as_ndarray(&self) -> ArrayView2<'_, f32> {
        ArrayView2::from_shape((self.height as usize, self.width as usize), &self.data)
            .expect("DepthMap data length must match dimensions")
    }
}
