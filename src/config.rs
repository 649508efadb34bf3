use std::{num::NonZeroUsize, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    image::Image,
    kernel::{Kernel, KernelKind, KernelTable},
    layers::{
        conv::ConvLayerConfig,
        pooling::{PoolingKind, PoolingLayerConfig},
        LayerDescriptor,
    },
    pipeline::{Pipeline, PipelineError},
};

pub const DEFAULT_KERNEL_TYPE: &str = "edge_detection";
pub const DEFAULT_POOL_SIZE: usize = 2;
pub const DEFAULT_POOL_TYPE: &str = "max";
/// Largest stride accepted from a request.
pub const MAX_STRIDE: usize = 64;
/// Largest padding accepted from a request.
pub const MAX_PADDING: usize = 64;
const CUSTOM_KERNEL_FALLBACK_SIDE: usize = 3;

/// One layer as the service receives it. Only `type` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_kernel: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<String>,
}
impl LayerConfig {
    pub fn conv(kernel_type: &str) -> Self {
        Self::new("conv", Some(kernel_type.to_owned()), None)
    }
    pub fn pool(pool_type: &str) -> Self {
        Self::new("pool", None, Some(pool_type.to_owned()))
    }
    fn new(layer_type: &str, kernel_type: Option<String>, pool_type: Option<String>) -> Self {
        Self {
            layer_type: layer_type.to_owned(),
            kernel_type,
            custom_kernel: None,
            stride: None,
            padding: None,
            pool_size: None,
            pool_type,
        }
    }

    /// Checks every tag and number and fills in the defaults.
    pub fn resolve(&self, kernels: &KernelTable) -> Result<LayerDescriptor, ConfigError> {
        let layer_type = LayerType::from_str(&self.layer_type)
            .map_err(|()| ConfigError::UnknownLayerType(self.layer_type.clone()))?;
        Ok(match layer_type {
            LayerType::Conv => LayerDescriptor::Conv(self.resolve_conv(kernels)?),
            LayerType::Pool => LayerDescriptor::Pool(self.resolve_pool()?),
        })
    }

    fn resolve_conv(&self, kernels: &KernelTable) -> Result<ConvLayerConfig, ConfigError> {
        let kernel_type = self.kernel_type.as_deref().unwrap_or(DEFAULT_KERNEL_TYPE);
        let kind = KernelKind::from_str(kernel_type)
            .map_err(|()| ConfigError::UnknownKernelType(kernel_type.to_owned()))?;
        let kernel = match kind {
            KernelKind::Named(name) => kernels.get(name).clone(),
            KernelKind::Custom => match &self.custom_kernel {
                Some(rows) => custom_kernel(rows)?,
                None => Kernel::filled(CUSTOM_KERNEL_FALLBACK_SIDE, 1.)
                    .ok_or(ConfigError::EmptyKernel)?,
            },
        };
        let stride = self.checked_stride()?.unwrap_or(NonZeroUsize::MIN);
        let padding = self.padding.unwrap_or(0);
        if MAX_PADDING < padding {
            return Err(ConfigError::PaddingTooLarge {
                padding,
                max: MAX_PADDING,
            });
        }
        Ok(ConvLayerConfig {
            kernel,
            stride,
            padding,
        })
    }

    fn resolve_pool(&self) -> Result<PoolingLayerConfig, ConfigError> {
        let pool_type = self.pool_type.as_deref().unwrap_or(DEFAULT_POOL_TYPE);
        let kind = PoolingKind::from_str(pool_type)
            .map_err(|()| ConfigError::UnknownPoolingKind(pool_type.to_owned()))?;
        let size = NonZeroUsize::new(self.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
            .ok_or(ConfigError::ZeroPoolSize)?;
        let stride = self.checked_stride()?.unwrap_or(size);
        Ok(PoolingLayerConfig { size, stride, kind })
    }

    fn checked_stride(&self) -> Result<Option<NonZeroUsize>, ConfigError> {
        let Some(stride) = self.stride else {
            return Ok(None);
        };
        if MAX_STRIDE < stride {
            return Err(ConfigError::StrideTooLarge {
                stride,
                max: MAX_STRIDE,
            });
        }
        NonZeroUsize::new(stride)
            .map(Some)
            .ok_or(ConfigError::ZeroStride)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Conv,
    Pool,
}
impl FromStr for LayerType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "conv" => LayerType::Conv,
            "pool" => LayerType::Pool,
            _ => return Err(()),
        })
    }
}

fn custom_kernel(rows: &[Vec<f64>]) -> Result<Kernel, ConfigError> {
    let side = rows.len();
    let width = rows.first().map(|row| row.len()).unwrap_or(0);
    if side == 0 || width == 0 {
        return Err(ConfigError::EmptyKernel);
    }
    let weights = Image::from_rows(rows).ok_or(ConfigError::RaggedKernel)?;
    Kernel::new(weights).ok_or(ConfigError::NonSquareKernel {
        height: side,
        width,
    })
}

/// Parses a JSON array of layer records.
pub fn parse_layers(json: &str) -> Result<Vec<LayerConfig>, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// Resolves every record in order, stopping at the first invalid one.
pub fn build_pipeline(
    configs: &[LayerConfig],
    kernels: &KernelTable,
) -> Result<Pipeline, PipelineError> {
    configs
        .iter()
        .enumerate()
        .map(|(index, config)| {
            config
                .resolve(kernels)
                .map_err(|source| PipelineError::Config { index, source })
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown layer type `{0}`")]
    UnknownLayerType(String),
    #[error("Unknown kernel type `{0}`")]
    UnknownKernelType(String),
    #[error("Unknown pooling kind `{0}`")]
    UnknownPoolingKind(String),
    #[error("Custom kernel is empty")]
    EmptyKernel,
    #[error("Custom kernel rows have different lengths")]
    RaggedKernel,
    #[error("Custom kernel is {height}x{width}, not square")]
    NonSquareKernel { height: usize, width: usize },
    #[error("Stride must be positive")]
    ZeroStride,
    #[error("Stride {stride} exceeds the maximum of {max}")]
    StrideTooLarge { stride: usize, max: usize },
    #[error("Padding {padding} exceeds the maximum of {max}")]
    PaddingTooLarge { padding: usize, max: usize },
    #[error("Pool size must be positive")]
    ZeroPoolSize,
    #[error("Malformed layer configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
