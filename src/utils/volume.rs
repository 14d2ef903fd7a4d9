//! Square maps, volumes and the convolution kernels
//!
//! A [`Grid`] is a square 2-D map and a [`Volume`] a stack of equally-sized
//! maps, both stored as one contiguous buffer with explicit shape and
//! bounds-checked accessors. Volumes are laid out channel-major, row-major
//! within each channel, and the flat representation used when a dense layer
//! borders a convolutional one follows the same order (filter-major, then
//! row-major within each map).
//!
//! The free functions implement the numeric core shared by the convolutional
//! layer: the cross-correlation (`convolve`), the transposed convolution used
//! to route errors backwards (`transposed_convolve`), and the filter-gradient
//! accumulation (`accumulate_filter_gradients`). Zero padding is applied
//! implicitly by treating out-of-range input positions as zero.

/// Square 2-D map with side length `size`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T = f64> {
    size: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Grid<T> {
    /// Create a `size` x `size` grid filled with the default value.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![T::default(); size * size],
        }
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Read the value at (`row`, `col`).
    pub fn at(&self, row: usize, col: usize) -> T {
        assert!(row < self.size && col < self.size, "grid index out of range");
        self.data[row * self.size + col]
    }

    /// Mutable access to the value at (`row`, `col`).
    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut T {
        assert!(row < self.size && col < self.size, "grid index out of range");
        &mut self.data[row * self.size + col]
    }

    /// Overwrite every cell with the default value.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }

    /// Row-major view of the underlying buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }
}

/// Stack of `channels` square maps, each `size` x `size`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T = f64> {
    channels: usize,
    size: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Volume<T> {
    /// Create a zeroed volume of the given shape.
    pub fn new(channels: usize, size: usize) -> Self {
        Self {
            channels,
            size,
            data: vec![T::default(); channels * size * size],
        }
    }

    /// Reshape a flat, channel-major slice into a volume.
    ///
    /// # Panics
    ///
    /// Panics if `flat.len() != channels * size * size`; the caller validates
    /// shapes when the layer chain is joined.
    pub fn from_flat(flat: &[T], channels: usize, size: usize) -> Self {
        assert_eq!(
            flat.len(),
            channels * size * size,
            "flat length does not match volume shape"
        );
        Self {
            channels,
            size,
            data: flat.to_vec(),
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Side length of each channel map.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Read the value at (`channel`, `row`, `col`).
    pub fn at(&self, channel: usize, row: usize, col: usize) -> T {
        assert!(
            channel < self.channels && row < self.size && col < self.size,
            "volume index out of range"
        );
        self.data[(channel * self.size + row) * self.size + col]
    }

    /// Mutable access to the value at (`channel`, `row`, `col`).
    pub fn at_mut(&mut self, channel: usize, row: usize, col: usize) -> &mut T {
        assert!(
            channel < self.channels && row < self.size && col < self.size,
            "volume index out of range"
        );
        &mut self.data[(channel * self.size + row) * self.size + col]
    }

    /// Overwrite every cell with the default value.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }

    /// Channel-major view of the underlying buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }
}

/// Cross-correlate `input` with one filter's `weights`, adding `bias` to
/// every output cell.
///
/// The output map has side `(input + 2*padding - filter) / stride + 1`.
/// Positions that fall into the zero padding contribute nothing.
pub fn convolve(
    input: &Volume<f64>,
    padding: usize,
    weights: &Volume<f64>,
    stride: usize,
    bias: f64,
) -> Grid<f64> {
    let in_size = input.size();
    let f_size = weights.size();
    let out_size = (in_size + 2 * padding - f_size) / stride + 1;
    let mut out = Grid::new(out_size);

    for out_y in 0..out_size {
        for out_x in 0..out_size {
            let mut sum = bias;

            for c in 0..weights.channels() {
                for w_y in 0..f_size {
                    let in_y = (out_y * stride + w_y) as isize - padding as isize;
                    if in_y < 0 || in_y >= in_size as isize {
                        continue;
                    }
                    for w_x in 0..f_size {
                        let in_x = (out_x * stride + w_x) as isize - padding as isize;
                        if in_x < 0 || in_x >= in_size as isize {
                            continue;
                        }
                        sum += input.at(c, in_y as usize, in_x as usize) * weights.at(c, w_y, w_x);
                    }
                }
            }

            *out.at_mut(out_y, out_x) = sum;
        }
    }

    out
}

/// Build the error volume for a convolutional layer's input by "unconvolving"
/// the layer's filter errors through its weights.
///
/// `errors[f]` and `weights[f]` belong to filter `f` of the layer whose input
/// errors are wanted; `out_size` is the side length of that input (without
/// padding). Every filter error is smeared over the padded input positions it
/// was computed from, and the padding border is discarded at the end.
pub fn transposed_convolve(
    errors: &[&Grid<f64>],
    weights: &[&Volume<f64>],
    stride: usize,
    padding: usize,
    out_size: usize,
) -> Volume<f64> {
    assert_eq!(errors.len(), weights.len(), "one error map per filter");

    let channels = weights.first().map_or(0, |w| w.channels());
    let padded_size = out_size + 2 * padding;
    let mut padded = Volume::new(channels, padded_size);

    for (error_map, filter_weights) in errors.iter().zip(weights.iter()) {
        let f_size = filter_weights.size();

        for e_y in 0..error_map.size() {
            for e_x in 0..error_map.size() {
                let err = error_map.at(e_y, e_x);
                if err == 0.0 {
                    continue;
                }

                for c in 0..channels {
                    for w_y in 0..f_size {
                        for w_x in 0..f_size {
                            *padded.at_mut(c, e_y * stride + w_y, e_x * stride + w_x) +=
                                filter_weights.at(c, w_y, w_x) * err;
                        }
                    }
                }
            }
        }
    }

    if padding == 0 {
        return padded;
    }

    // Strip the zero-padding border.
    let mut out = Volume::new(channels, out_size);
    for c in 0..channels {
        for y in 0..out_size {
            for x in 0..out_size {
                *out.at_mut(c, y, x) = padded.at(c, y + padding, x + padding);
            }
        }
    }
    out
}

/// Accumulate one filter's weight and bias gradients from its error map.
///
/// For every kernel position, sums `error * input` over the output map,
/// honouring stride and padding offsets; the bias gradient is the plain sum
/// of the error map. Values are added into the accumulators, matching the
/// mini-batch accumulation contract.
pub fn accumulate_filter_gradients(
    input: &Volume<f64>,
    error_map: &Grid<f64>,
    padding: usize,
    stride: usize,
    delta_weights: &mut Volume<f64>,
    delta_bias: &mut f64,
) {
    let in_size = input.size();
    let f_size = delta_weights.size();

    for c in 0..delta_weights.channels() {
        for w_y in 0..f_size {
            for w_x in 0..f_size {
                let mut acc = 0.0;

                for e_y in 0..error_map.size() {
                    let in_y = (e_y * stride + w_y) as isize - padding as isize;
                    if in_y < 0 || in_y >= in_size as isize {
                        continue;
                    }
                    for e_x in 0..error_map.size() {
                        let in_x = (e_x * stride + w_x) as isize - padding as isize;
                        if in_x < 0 || in_x >= in_size as isize {
                            continue;
                        }
                        acc += error_map.at(e_y, e_x) * input.at(c, in_y as usize, in_x as usize);
                    }
                }

                *delta_weights.at_mut(c, w_y, w_x) += acc;
            }
        }
    }

    *delta_bias += error_map.data().iter().sum::<f64>();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_from(values: &[f64], channels: usize, size: usize) -> Volume<f64> {
        Volume::from_flat(values, channels, size)
    }

    #[test]
    fn test_grid_accessors() {
        let mut grid: Grid<f64> = Grid::new(3);
        *grid.at_mut(1, 2) = 4.5;
        assert_eq!(grid.at(1, 2), 4.5);
        assert_eq!(grid.at(0, 0), 0.0);

        grid.clear();
        assert_eq!(grid.at(1, 2), 0.0);
    }

    #[test]
    #[should_panic(expected = "grid index out of range")]
    fn test_grid_out_of_range() {
        let grid: Grid<f64> = Grid::new(2);
        grid.at(0, 2);
    }

    #[test]
    fn test_volume_from_flat_ordering() {
        // Channel-major: channel 0 first, row-major inside each channel.
        let v = volume_from(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 2, 2);
        assert_eq!(v.at(0, 0, 1), 2.0);
        assert_eq!(v.at(0, 1, 0), 3.0);
        assert_eq!(v.at(1, 0, 0), 5.0);
        assert_eq!(v.at(1, 1, 1), 8.0);
    }

    #[test]
    fn test_convolve_output_sizes() {
        let input = Volume::new(1, 5);
        let weights = Volume::new(1, 3);

        assert_eq!(convolve(&input, 0, &weights, 1, 0.0).size(), 3);
        assert_eq!(convolve(&input, 1, &weights, 1, 0.0).size(), 5);
        assert_eq!(convolve(&input, 1, &weights, 2, 0.0).size(), 3);
    }

    #[test]
    fn test_convolve_identity_kernel() {
        // A 1x1 kernel of weight 1 reproduces the input map plus bias.
        let input = volume_from(&[1.0, 2.0, 3.0, 4.0], 1, 2);
        let weights = volume_from(&[1.0], 1, 1);

        let out = convolve(&input, 0, &weights, 1, 0.5);
        assert_eq!(out.at(0, 0), 1.5);
        assert_eq!(out.at(0, 1), 2.5);
        assert_eq!(out.at(1, 0), 3.5);
        assert_eq!(out.at(1, 1), 4.5);
    }

    #[test]
    fn test_convolve_known_sum() {
        // 3x3 input, 3x3 kernel of ones, no padding: single output cell is
        // the sum of the input.
        let input = volume_from(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0], 1, 3);
        let weights = volume_from(&[1.0; 9], 1, 3);

        let out = convolve(&input, 0, &weights, 1, 0.0);
        assert_eq!(out.size(), 1);
        assert_eq!(out.at(0, 0), 45.0);
    }

    #[test]
    fn test_convolve_padding_zeroes_border() {
        // With padding 1, the corner output only sees the kernel cells that
        // overlap real input.
        let input = volume_from(&[1.0, 2.0, 3.0, 4.0], 1, 2);
        let weights = volume_from(&[1.0; 9], 1, 3);

        let out = convolve(&input, 1, &weights, 1, 0.0);
        assert_eq!(out.size(), 2);
        // Every output cell covers the whole 2x2 input here.
        assert_eq!(out.at(0, 0), 10.0);
        assert_eq!(out.at(1, 1), 10.0);
    }

    #[test]
    fn test_convolve_multi_channel() {
        let input = volume_from(&[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0], 2, 2);
        let weights = volume_from(&[1.0, 3.0], 2, 1);

        let out = convolve(&input, 0, &weights, 1, 0.0);
        // Each cell: 1*1 + 2*3 = 7.
        assert_eq!(out.at(0, 0), 7.0);
        assert_eq!(out.at(1, 1), 7.0);
    }

    #[test]
    fn test_transposed_convolve_single_error() {
        // One filter, one error cell: the error smears the kernel over the
        // input positions it came from.
        let mut errs = Grid::new(1);
        *errs.at_mut(0, 0) = 2.0;
        let weights = volume_from(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0], 1, 3);

        let out = transposed_convolve(&[&errs], &[&weights], 1, 0, 3);
        assert_eq!(out.channels(), 1);
        assert_eq!(out.size(), 3);
        assert_eq!(out.at(0, 0, 0), 2.0);
        assert_eq!(out.at(0, 1, 1), 10.0);
        assert_eq!(out.at(0, 2, 2), 18.0);
    }

    #[test]
    fn test_transposed_convolve_trims_padding() {
        // in 3, fs 3, pad 1, stride 1 -> out map 3. The padded accumulation
        // map is 5x5 and the returned volume drops the border.
        let mut errs = Grid::new(3);
        *errs.at_mut(0, 0) = 1.0;
        let weights = volume_from(&[1.0; 9], 1, 3);

        let out = transposed_convolve(&[&errs], &[&weights], 1, 1, 3);
        assert_eq!(out.size(), 3);
        // Kernel centred on input (0,0): only the 2x2 in-bounds part remains.
        assert_eq!(out.at(0, 0, 0), 1.0);
        assert_eq!(out.at(0, 1, 1), 1.0);
        assert_eq!(out.at(0, 2, 2), 0.0);
    }

    #[test]
    fn test_accumulate_filter_gradients_known_values() {
        // Uniform error of 1 over a 2x2 output with a 1x1 kernel: the weight
        // gradient is the sum of the input, the bias gradient the error sum.
        let input = volume_from(&[1.0, 2.0, 3.0, 4.0], 1, 2);
        let mut errs = Grid::new(2);
        for y in 0..2 {
            for x in 0..2 {
                *errs.at_mut(y, x) = 1.0;
            }
        }

        let mut dw = Volume::new(1, 1);
        let mut db = 0.0;
        accumulate_filter_gradients(&input, &errs, 0, 1, &mut dw, &mut db);

        assert_eq!(dw.at(0, 0, 0), 10.0);
        assert_eq!(db, 4.0);

        // Accumulates rather than overwrites.
        accumulate_filter_gradients(&input, &errs, 0, 1, &mut dw, &mut db);
        assert_eq!(dw.at(0, 0, 0), 20.0);
        assert_eq!(db, 8.0);
    }
}
