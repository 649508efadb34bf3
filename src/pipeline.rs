use thiserror::Error;
use tracing::{debug, info_span, warn};

use crate::{
    config::ConfigError,
    image::{Image, Shape2},
    layers::LayerDescriptor,
    receptive_field::receptive_fields,
    window::LayerError,
};

const _: fn() = || {
    fn assert_send<T: Sync + Send + 'static>() {}
    assert_send::<Pipeline>();
    assert_send::<PipelineRun>();
};

#[derive(Debug, Clone, PartialEq)]
pub struct LayerRunRecord {
    pub name: String,
    pub summary: String,
    pub input_shape: Shape2,
    pub output: Image,
}
impl LayerRunRecord {
    pub fn output_shape(&self) -> Shape2 {
        self.output.shape()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    input: Image,
    records: Vec<LayerRunRecord>,
}
impl PipelineRun {
    pub fn input(&self) -> &Image {
        &self.input
    }
    pub fn records(&self) -> &[LayerRunRecord] {
        &self.records
    }
    /// The last layer's output, or the input if there are no layers.
    pub fn final_image(&self) -> &Image {
        self.records
            .last()
            .map(|record| &record.output)
            .unwrap_or(&self.input)
    }
    pub fn into_parts(self) -> (Vec<LayerRunRecord>, Image) {
        let Self { input, records } = self;
        let output = match records.last() {
            Some(record) => record.output.clone(),
            None => input,
        };
        (records, output)
    }
}

/// Feeds `input` through `layers` in order.
///
/// Stops at the first layer whose window does not fit its input; no records
/// are returned in that case.
pub fn run(input: Image, layers: &[LayerDescriptor]) -> Result<PipelineRun, LayerError> {
    let span = info_span!("pipeline", layers = layers.len(), input = ?input.shape());
    let _enter = span.enter();

    let mut records: Vec<LayerRunRecord> = Vec::with_capacity(layers.len());
    for (i, layer) in layers.iter().enumerate() {
        let current = records.last().map(|r| &r.output).unwrap_or(&input);
        let input_shape = current.shape();
        let name = layer.display_name(i + 1);
        let output = match layer.forward(current) {
            Ok(output) => output,
            Err(e) => {
                warn!(layer = %name, error = %e, "layer rejected its input");
                return Err(e);
            }
        };
        debug!(
            layer = %name,
            input = ?input_shape,
            output = ?output.shape(),
            "layer applied"
        );
        records.push(LayerRunRecord {
            name,
            summary: layer.summary(),
            input_shape,
            output,
        });
    }
    Ok(PipelineRun { input, records })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    layers: Vec<LayerDescriptor>,
}
impl Pipeline {
    pub fn new(layers: Vec<LayerDescriptor>) -> Self {
        Self { layers }
    }

    pub fn push(&mut self, layer: impl Into<LayerDescriptor>) -> &mut Self {
        self.layers.push(layer.into());
        self
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn receptive_fields(&self) -> Vec<usize> {
        receptive_fields(&self.layers)
    }

    pub fn run(&self, input: Image) -> Result<PipelineRun, LayerError> {
        run(input, &self.layers)
    }
}
impl FromIterator<LayerDescriptor> for Pipeline {
    fn from_iter<T: IntoIterator<Item = LayerDescriptor>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration for layer {}: {source}", .index + 1)]
    Config { index: usize, source: ConfigError },
    #[error(transparent)]
    Layer(#[from] LayerError),
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use crate::{
        kernel::{Kernel, KernelTable, NamedKernel},
        layers::{conv::ConvLayerConfig, pooling::PoolingLayerConfig},
    };

    use super::*;

    #[test]
    fn test_empty_pipeline() {
        let input = Image::sample();
        let run = Pipeline::default().run(input.clone()).unwrap();
        assert!(run.records().is_empty());
        assert_eq!(run.final_image(), &input);
        let (records, output) = run.into_parts();
        assert!(records.is_empty());
        assert_eq!(output, input);
    }

    #[test]
    fn test_chained_shapes() {
        let table = KernelTable::new();
        let mut pipeline = Pipeline::default();
        pipeline
            .push(ConvLayerConfig::new(table.get(NamedKernel::Sharpen).clone()))
            .push(PoolingLayerConfig::default())
            .push(ConvLayerConfig {
                kernel: Kernel::filled(2, 0.5).unwrap(),
                stride: NonZeroUsize::MIN,
                padding: 1,
            });
        let run = pipeline.run(Image::zeros((10, 10))).unwrap();
        let shapes = run
            .records()
            .iter()
            .map(|r| (r.input_shape, r.output_shape()))
            .collect::<Vec<_>>();
        assert_eq!(shapes, [((10, 10), (8, 8)), ((8, 8), (4, 4)), ((4, 4), (5, 5))]);
        let names = run.records().iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["Conv 1", "Pool 2", "Conv 3"]);
        assert_eq!(run.final_image().shape(), (5, 5));
        assert_eq!(pipeline.receptive_fields(), [1, 3, 5, 6]);
    }

    #[test]
    fn test_abort_on_geometry() {
        let pipeline = Pipeline::from_iter([
            LayerDescriptor::Pool(PoolingLayerConfig::default()),
            LayerDescriptor::Pool(PoolingLayerConfig::default()),
            LayerDescriptor::Pool(PoolingLayerConfig::default()),
        ]);
        let err = pipeline.run(Image::zeros((4, 4))).unwrap_err();
        assert_eq!(
            err,
            LayerError::InvalidLayerGeometry {
                input: (1, 1),
                window: (2, 2),
            }
        );
    }
}
