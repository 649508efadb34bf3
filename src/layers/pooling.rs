use std::{fmt, num::NonZeroUsize, str::FromStr};

use serde::Serialize;

use crate::{
    image::Image,
    window::{LayerError, WindowIter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolingKind {
    #[default]
    Max,
    Average,
}
impl FromStr for PoolingKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "max" => PoolingKind::Max,
            "average" | "avg" => PoolingKind::Average,
            _ => return Err(()),
        })
    }
}
impl fmt::Display for PoolingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolingKind::Max => write!(f, "max"),
            PoolingKind::Average => write!(f, "average"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolingLayerConfig {
    pub size: NonZeroUsize,
    pub stride: NonZeroUsize,
    pub kind: PoolingKind,
}
impl PoolingLayerConfig {
    /// Non-overlapping windows: the stride equals the window size.
    pub fn new(size: NonZeroUsize, kind: PoolingKind) -> Self {
        Self {
            size,
            stride: size,
            kind,
        }
    }
}
impl Default for PoolingLayerConfig {
    fn default() -> Self {
        let size = NonZeroUsize::MIN.saturating_add(1);
        Self::new(size, PoolingKind::Max)
    }
}

pub fn pooling_layer(inputs: &Image, config: &PoolingLayerConfig) -> Result<Image, LayerError> {
    pool(inputs, config.size, Some(config.stride), config.kind)
}

pub fn max_pooling_layer(
    inputs: &Image,
    size: NonZeroUsize,
    stride: NonZeroUsize,
) -> Result<Image, LayerError> {
    pool(inputs, size, Some(stride), PoolingKind::Max)
}

pub fn avg_pooling_layer(
    inputs: &Image,
    size: NonZeroUsize,
    stride: NonZeroUsize,
) -> Result<Image, LayerError> {
    pool(inputs, size, Some(stride), PoolingKind::Average)
}

/// Reduces every `size × size` window of `image` to one value. No padding.
/// A NaN cell makes its window reduce to NaN.
///
/// `stride` defaults to `size`.
pub fn pool(
    image: &Image,
    size: NonZeroUsize,
    stride: Option<NonZeroUsize>,
    kind: PoolingKind,
) -> Result<Image, LayerError> {
    let stride = stride.unwrap_or(size);
    let window = (size.get(), size.get());
    let geometry_err = || LayerError::InvalidLayerGeometry {
        input: image.shape(),
        window,
    };
    let origins = WindowIter::new(image.shape(), window, stride)?;
    let shape = origins.shape();
    let mut outputs = Vec::with_capacity(origins.len());
    for origin in origins {
        let cells = image.window(origin, window).ok_or_else(geometry_err)?;
        let reduced = match kind {
            // NaN cells propagate
            PoolingKind::Max => cells.fold(f64::NEG_INFINITY, |acc, x| {
                if x.is_nan() || x > acc {
                    x
                } else {
                    acc
                }
            }),
            PoolingKind::Average => cells.sum::<f64>() / (size.get() * size.get()) as f64,
        };
        outputs.push(reduced);
    }
    Image::new(outputs, shape).ok_or_else(geometry_err)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    fn nz(x: usize) -> NonZeroUsize {
        NonZeroUsize::new(x).unwrap()
    }

    fn image() -> Image {
        Image::from_rows(&[
            [2., 2., 7., 3.], //
            [9., 4., 6., 1.], //
            [8., 5., 2., 4.], //
            [3., 1., 2., 6.], //
        ])
        .unwrap()
    }

    #[test]
    fn test_max_pooling() {
        let output = max_pooling_layer(&image(), nz(2), nz(2)).unwrap();
        assert_eq!(output.shape(), (2, 2));
        assert_eq!(
            output.as_slice(),
            [
                9., 7., //
                8., 6., //
            ]
        );
    }

    #[test]
    fn test_avg_pooling() {
        let output = avg_pooling_layer(&image(), nz(2), nz(2)).unwrap();
        assert_eq!(
            output.as_slice(),
            [
                4.25, 4.25, //
                4.25, 3.5, //
            ]
        );
    }

    #[test]
    fn test_stride_defaults_to_size() {
        let defaulted = pool(&image(), nz(2), None, PoolingKind::Max).unwrap();
        let explicit = pool(&image(), nz(2), Some(nz(2)), PoolingKind::Max).unwrap();
        assert_eq!(defaulted, explicit);
        assert_eq!(PoolingLayerConfig::default().stride.get(), 2);
    }

    #[test]
    fn test_overlapping_windows() {
        let output = pool(&image(), nz(3), Some(nz(1)), PoolingKind::Max).unwrap();
        assert_eq!(output.shape(), (2, 2));
        assert_eq!(output.as_slice(), [9., 7., 9., 6.]);
    }

    #[test]
    fn test_unit_window_is_identity() {
        for kind in [PoolingKind::Max, PoolingKind::Average] {
            assert_eq!(pool(&image(), nz(1), None, kind).unwrap(), image());
        }
    }

    #[test]
    fn test_max_dominates_average() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            let (h, w) = (rng.gen_range(3..12), rng.gen_range(3..12));
            let pixels = (0..h * w).map(|_| rng.gen::<u8>()).collect::<Vec<_>>();
            let image = Image::from_gray8(&pixels, (h, w)).unwrap();
            let size = nz(rng.gen_range(1..=3));
            let stride = nz(rng.gen_range(1..=3));
            let max = pool(&image, size, Some(stride), PoolingKind::Max).unwrap();
            let avg = pool(&image, size, Some(stride), PoolingKind::Average).unwrap();
            assert_eq!(max.shape(), avg.shape());
            for (max, avg) in max.as_slice().iter().zip(avg.as_slice()) {
                assert!(max >= avg);
            }
        }
    }

    #[test]
    fn test_nan_propagates() {
        let image = Image::from_rows(&[
            [1., f64::NAN, 3., 4.], //
            [5., 6., 7., 8.], //
        ])
        .unwrap();
        for kind in [PoolingKind::Max, PoolingKind::Average] {
            let output = pool(&image, nz(2), None, kind).unwrap();
            assert!(output.get(0, 0).unwrap().is_nan());
            assert!(!output.get(0, 1).unwrap().is_nan());
        }
        let max = pool(&image, nz(2), None, PoolingKind::Max).unwrap();
        assert_eq!(max.get(0, 1), Some(8.));
    }

    #[test]
    fn test_window_larger_than_input() {
        let err = pool(&image(), nz(5), None, PoolingKind::Average).unwrap_err();
        assert_eq!(
            err,
            LayerError::InvalidLayerGeometry {
                input: (4, 4),
                window: (5, 5),
            }
        );
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("max".parse(), Ok(PoolingKind::Max));
        assert_eq!("average".parse(), Ok(PoolingKind::Average));
        assert_eq!("avg".parse(), Ok(PoolingKind::Average));
        assert_eq!("min".parse::<PoolingKind>(), Err(()));
        assert_eq!(PoolingKind::Average.to_string(), "average");
    }
}
