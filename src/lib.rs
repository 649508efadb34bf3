//! Single-channel convolution and pooling pipelines with per-layer
//! receptive-field bookkeeping.

pub mod config;
pub mod image;
pub mod kernel;
pub mod layers;
pub mod pipeline;
pub mod receptive_field;
pub mod report;
pub mod window;

pub use config::{build_pipeline, parse_layers, ConfigError, LayerConfig};
pub use image::{Image, Shape2};
pub use kernel::{Kernel, KernelTable, NamedKernel};
pub use layers::LayerDescriptor;
pub use pipeline::{run, LayerRunRecord, Pipeline, PipelineError, PipelineRun};
pub use receptive_field::{receptive_fields, ReceptiveFieldBox};
pub use report::{process, process_json, RunReport};
pub use window::LayerError;
