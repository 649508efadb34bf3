use std::str::FromStr;

use crate::image::Image;

/// Square convolution weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Image,
}
impl Kernel {
    /// Returns `None` unless `weights` is square with side at least 1.
    pub fn new(weights: Image) -> Option<Self> {
        let (height, width) = weights.shape();
        if height == 0 || height != width {
            return None;
        }
        Some(Self { weights })
    }

    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Option<Self> {
        Self::new(Image::from_rows(rows)?)
    }

    pub fn filled(side: usize, weight: f64) -> Option<Self> {
        Self::new(Image::from_fn((side, side), |_, _| weight))
    }

    pub fn side(&self) -> usize {
        self.weights.height()
    }
    pub fn weights(&self) -> &Image {
        &self.weights
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKernel {
    EdgeDetection = 0,
    Blur = 1,
    Sharpen = 2,
}
impl NamedKernel {
    pub const ALL: [NamedKernel; 3] = [
        NamedKernel::EdgeDetection,
        NamedKernel::Blur,
        NamedKernel::Sharpen,
    ];

    fn weights(self) -> [[f64; 3]; 3] {
        match self {
            NamedKernel::EdgeDetection => [
                [-1., -1., -1.], //
                [-1., 8., -1.],  //
                [-1., -1., -1.], //
            ],
            NamedKernel::Blur => [[1. / 9.; 3]; 3],
            NamedKernel::Sharpen => [
                [0., -1., 0.],  //
                [-1., 5., -1.], //
                [0., -1., 0.],  //
            ],
        }
    }
}

/// Kernel selector as it appears in a layer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    Named(NamedKernel),
    Custom,
}
impl FromStr for KernelKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "edge_detection" | "edge-detection" => KernelKind::Named(NamedKernel::EdgeDetection),
            "blur" => KernelKind::Named(NamedKernel::Blur),
            "sharpen" => KernelKind::Named(NamedKernel::Sharpen),
            "custom" => KernelKind::Custom,
            _ => return Err(()),
        })
    }
}

/// Weights of every named kernel, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct KernelTable {
    kernels: [Kernel; 3],
}
impl KernelTable {
    pub fn new() -> Self {
        let kernels = NamedKernel::ALL.map(|name| {
            let weights = name.weights();
            Kernel {
                weights: Image::from_fn((3, 3), |row, col| weights[row][col]),
            }
        });
        Self { kernels }
    }

    pub fn get(&self, name: NamedKernel) -> &Kernel {
        &self.kernels[name as usize]
    }
}
impl Default for KernelTable {
    fn default() -> Self {
        Self::new()
    }
}
