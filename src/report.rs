use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::{build_pipeline, ConfigError, LayerConfig},
    image::{Image, Shape2},
    kernel::KernelTable,
    pipeline::{LayerRunRecord, PipelineError, PipelineRun},
    receptive_field::ReceptiveFieldBox,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerInfo {
    pub name: String,
    pub config: String,
    pub input_shape: Shape2,
    pub output_shape: Shape2,
}
impl From<&LayerRunRecord> for LayerInfo {
    fn from(record: &LayerRunRecord) -> Self {
        Self {
            name: record.name.clone(),
            config: record.summary.clone(),
            input_shape: record.input_shape,
            output_shape: record.output_shape(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub receptive_fields: Vec<usize>,
    /// Where each receptive field sits on the input, for drawing.
    pub receptive_field_boxes: Vec<ReceptiveFieldBox>,
    pub layer_info: Vec<LayerInfo>,
    pub final_shape: Shape2,
}
impl RunSummary {
    pub fn new(run: &PipelineRun, receptive_fields: Vec<usize>) -> Self {
        let input_shape = run.input().shape();
        let receptive_field_boxes = receptive_fields
            .iter()
            .map(|&field| ReceptiveFieldBox::centered(field, input_shape))
            .collect();
        Self {
            receptive_fields,
            receptive_field_boxes,
            layer_info: run.records().iter().map(LayerInfo::from).collect(),
            final_shape: run.final_image().shape(),
        }
    }
}

/// Either a full summary with `success: true`, or `success: false` and an
/// error message. A failed run carries no layer data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub success: bool,
    #[serde(flatten)]
    pub summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
impl RunReport {
    pub fn succeeded(summary: RunSummary) -> Self {
        Self {
            success: true,
            summary: Some(summary),
            error: None,
        }
    }

    pub fn failed(error: &dyn std::error::Error) -> Self {
        Self {
            success: false,
            summary: None,
            error: Some(error.to_string()),
        }
    }
}

/// Resolves `layers`, runs them over `image` (or [`Image::sample`]) and
/// summarizes the run.
pub fn try_process(
    layers: &[LayerConfig],
    image: Option<Image>,
    kernels: &KernelTable,
) -> Result<(PipelineRun, RunSummary), PipelineError> {
    let pipeline = build_pipeline(layers, kernels)?;
    let image = image.unwrap_or_else(Image::sample);
    let run = pipeline.run(image)?;
    let summary = RunSummary::new(&run, pipeline.receptive_fields());
    info!(
        layers = run.records().len(),
        final_shape = ?summary.final_shape,
        "pipeline finished"
    );
    Ok((run, summary))
}

pub fn process(
    request: &ProcessRequest,
    image: Option<Image>,
    kernels: &KernelTable,
) -> RunReport {
    match try_process(&request.layers, image, kernels) {
        Ok((_, summary)) => RunReport::succeeded(summary),
        Err(e) => {
            warn!(error = %e, "pipeline failed");
            RunReport::failed(&e)
        }
    }
}

/// [`process`] for a raw JSON request body.
pub fn process_json(body: &str, image: Option<Image>, kernels: &KernelTable) -> RunReport {
    match serde_json::from_str::<ProcessRequest>(body) {
        Ok(request) => process(&request, image, kernels),
        Err(e) => {
            let e = ConfigError::from(e);
            warn!(error = %e, "rejected request body");
            RunReport::failed(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_shape() {
        let kernels = KernelTable::new();
        let report = process_json(
            r#"{"layers": [{"type": "conv", "kernel_type": "blur", "padding": 1}, {"type": "pool"}]}"#,
            None,
            &kernels,
        );
        assert!(report.success);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["receptive_fields"], json!([1, 3, 5]));
        assert_eq!(value["final_shape"], json!([4, 4]));
        assert_eq!(
            value["layer_info"][0],
            json!({
                "name": "Conv 1",
                "config": "Kernel: (3, 3), Stride: 1, Padding: 1",
                "input_shape": [8, 8],
                "output_shape": [8, 8],
            })
        );
        assert_eq!(value["layer_info"][1]["name"], json!("Pool 2"));
        assert_eq!(value["receptive_field_boxes"][2]["origin"], json!([2, 2]));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failure_has_no_data() {
        let kernels = KernelTable::new();
        let request = ProcessRequest {
            layers: vec![LayerConfig {
                custom_kernel: Some(vec![vec![1.; 9]; 9]),
                ..LayerConfig::conv("custom")
            }],
        };
        let report = process(&request, None, &kernels);
        assert!(!report.success);
        assert!(report.summary.is_none());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid layer geometry"));
        assert!(value.get("layer_info").is_none());
        assert!(value.get("receptive_fields").is_none());
    }

    #[test]
    fn test_bad_body() {
        let kernels = KernelTable::new();
        let report = process_json("{not json", None, &kernels);
        assert!(!report.success);
        assert!(report.error.unwrap().starts_with("Malformed layer configuration"));

        let report = process_json(r#"{"layers": [{"type": "fc"}]}"#, None, &kernels);
        assert_eq!(
            report.error.as_deref(),
            Some("Invalid configuration for layer 1: Unknown layer type `fc`")
        );
    }

    #[test]
    fn test_missing_layers_is_empty_pipeline() {
        let kernels = KernelTable::new();
        let image = Image::zeros((5, 7));
        let report = process_json("{}", Some(image), &kernels);
        let summary = report.summary.unwrap();
        assert_eq!(summary.receptive_fields, [1]);
        assert!(summary.layer_info.is_empty());
        assert_eq!(summary.final_shape, (5, 7));
    }
}
