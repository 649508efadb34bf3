use serde::Serialize;

use crate::{image::Shape2, layers::LayerDescriptor};

/// Side length of the input region seen by one unit at each pipeline
/// boundary, starting with the input itself.
///
/// Each layer adds `(window − 1) · stride` using only its own stride; the
/// strides of earlier layers are not multiplied in. Sizes saturate at
/// `usize::MAX`.
pub fn receptive_fields(layers: &[LayerDescriptor]) -> Vec<usize> {
    let mut fields = Vec::with_capacity(layers.len() + 1);
    let mut field: usize = 1;
    fields.push(field);
    for layer in layers {
        let (window, stride) = layer.footprint();
        field = field.saturating_add(window.saturating_sub(1).saturating_mul(stride.get()));
        fields.push(field);
    }
    fields
}

/// Rectangle covering a receptive field centred on the middle unit of an
/// image, clipped to the image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceptiveFieldBox {
    pub center: Shape2,
    pub origin: Shape2,
    pub extent: Shape2,
}
impl ReceptiveFieldBox {
    pub fn centered(field: usize, image: Shape2) -> Self {
        let (height, width) = image;
        let center = (height / 2, width / 2);
        let half = field / 2;
        let origin = (center.0.saturating_sub(half), center.1.saturating_sub(half));
        let extent = (
            field.min(height - origin.0.min(height)),
            field.min(width - origin.1.min(width)),
        );
        Self {
            center,
            origin,
            extent,
        }
    }
}
