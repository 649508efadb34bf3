use std::num::NonZeroUsize;

use thiserror::Error;

use crate::image::Shape2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("Invalid layer geometry: {window:?} window does not fit {input:?} input")]
    InvalidLayerGeometry { input: Shape2, window: Shape2 },
}

/// `⌊(input − window) / stride⌋ + 1`, or `None` if the window does not fit.
pub fn output_len(input: usize, window: usize, stride: NonZeroUsize) -> Option<NonZeroUsize> {
    if window == 0 {
        return None;
    }
    let room = input.checked_sub(window)?;
    NonZeroUsize::new(room / stride.get() + 1)
}

/// Origins of a window sliding over an input with a fixed stride on both
/// axes, row-major.
#[derive(Debug, Clone)]
pub struct WindowIter {
    output: Shape2,
    stride: NonZeroUsize,
    next: usize,
}
impl WindowIter {
    pub fn new(input: Shape2, window: Shape2, stride: NonZeroUsize) -> Result<Self, LayerError> {
        let err = || LayerError::InvalidLayerGeometry { input, window };
        let height = output_len(input.0, window.0, stride).ok_or_else(err)?;
        let width = output_len(input.1, window.1, stride).ok_or_else(err)?;
        Ok(Self {
            output: (height.get(), width.get()),
            stride,
            next: 0,
        })
    }

    pub fn shape(&self) -> Shape2 {
        self.output
    }
}
impl Iterator for WindowIter {
    type Item = Shape2;

    fn next(&mut self) -> Option<Self::Item> {
        let (height, width) = self.output;
        if height * width <= self.next {
            return None;
        }
        let (i, j) = (self.next / width, self.next % width);
        self.next += 1;
        let stride = self.stride.get();
        Some((i * stride, j * stride))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.output.0 * self.output.1 - self.next;
        (remaining, Some(remaining))
    }
}
impl ExactSizeIterator for WindowIter {}
