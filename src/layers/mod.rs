use std::num::NonZeroUsize;

use conv::{conv_layer, ConvLayerConfig};
use pooling::{pooling_layer, PoolingLayerConfig};

use crate::{image::Image, window::LayerError};

pub mod conv;
pub mod pooling;

#[derive(Debug, Clone, PartialEq)]
pub enum LayerDescriptor {
    Conv(ConvLayerConfig),
    Pool(PoolingLayerConfig),
}
impl LayerDescriptor {
    pub fn forward(&self, inputs: &Image) -> Result<Image, LayerError> {
        match self {
            LayerDescriptor::Conv(config) => conv_layer(inputs, config),
            LayerDescriptor::Pool(config) => pooling_layer(inputs, config),
        }
    }

    /// `position` is 1-based.
    pub fn display_name(&self, position: usize) -> String {
        match self {
            LayerDescriptor::Conv(_) => format!("Conv {position}"),
            LayerDescriptor::Pool(_) => format!("Pool {position}"),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            LayerDescriptor::Conv(config) => {
                let side = config.kernel.side();
                format!(
                    "Kernel: ({side}, {side}), Stride: {}, Padding: {}",
                    config.stride, config.padding
                )
            }
            LayerDescriptor::Pool(config) => format!(
                "Size: {size}×{size}, Type: {}, Stride: {}",
                config.kind,
                config.stride,
                size = config.size
            ),
        }
    }

    /// Side of the kernel or pooling window, and the stride it slides with.
    pub fn footprint(&self) -> (usize, NonZeroUsize) {
        match self {
            LayerDescriptor::Conv(config) => (config.kernel.side(), config.stride),
            LayerDescriptor::Pool(config) => (config.size.get(), config.stride),
        }
    }
}
impl From<ConvLayerConfig> for LayerDescriptor {
    fn from(config: ConvLayerConfig) -> Self {
        LayerDescriptor::Conv(config)
    }
}
impl From<PoolingLayerConfig> for LayerDescriptor {
    fn from(config: PoolingLayerConfig) -> Self {
        LayerDescriptor::Pool(config)
    }
}
