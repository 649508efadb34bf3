use std::num::NonZeroUsize;

use crate::{
    image::Image,
    kernel::Kernel,
    window::{LayerError, WindowIter},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ConvLayerConfig {
    pub kernel: Kernel,
    pub stride: NonZeroUsize,
    pub padding: usize,
}
impl ConvLayerConfig {
    /// Stride 1, no padding.
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            stride: NonZeroUsize::MIN,
            padding: 0,
        }
    }
}

pub fn conv_layer(inputs: &Image, config: &ConvLayerConfig) -> Result<Image, LayerError> {
    convolve(inputs, config.kernel.weights(), config.padding, config.stride)
}

/// Zero-pads `image` by `padding` and sums the element-wise product of
/// `kernel` with every window of the padded image.
///
/// Output values are not normalized or clipped.
pub fn convolve(
    image: &Image,
    kernel: &Image,
    padding: usize,
    stride: NonZeroUsize,
) -> Result<Image, LayerError> {
    let too_large = || LayerError::InvalidLayerGeometry {
        input: image.shape(),
        window: kernel.shape(),
    };
    let padded_shape = image.padded_shape(padding).ok_or_else(too_large)?;
    let origins = WindowIter::new(padded_shape, kernel.shape(), stride)?;
    let padded = image.pad(padding).ok_or_else(too_large)?;
    let geometry_err = || LayerError::InvalidLayerGeometry {
        input: padded.shape(),
        window: kernel.shape(),
    };
    let shape = origins.shape();
    let mut outputs = Vec::with_capacity(origins.len());
    for origin in origins {
        let window = padded
            .window(origin, kernel.shape())
            .ok_or_else(geometry_err)?;
        let feature = window
            .zip(kernel.as_slice().iter().copied())
            .map(|(x, w)| x * w)
            .sum::<f64>();
        outputs.push(feature);
    }
    Image::new(outputs, shape).ok_or_else(geometry_err)
}
