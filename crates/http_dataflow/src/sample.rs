//! src/sample.rs
//!
//! The units that flow through the pipeline: a `SampleReference` names a
//! remote image and carries its labels; a `DecodedSample` is the terminal
//! unit handed to the consumer once the image has been fetched and decoded.

use image::RgbImage;

/// A reference to a remote image together with its labels.
///
/// Labels are opaque to the pipeline: they ride along unchanged from the
/// reference store to the decoded output. For classification datasets `L` is
/// typically `i64`, but anything `Clone + Send + Sync` works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleReference<L> {
    pub url: String,
    pub labels: Vec<L>,
}

impl<L> SampleReference<L> {
    pub fn new(url: impl Into<String>, labels: Vec<L>) -> Self {
        Self {
            url: url.into(),
            labels,
        }
    }
}

/// A fetched and decoded image sample, ready for batching.
///
/// The image is always RGB, height-major, with interleaved channels.
/// Ownership transfers to the consumer on yield; the pipeline keeps nothing.
#[derive(Debug, Clone)]
pub struct DecodedSample<L> {
    pub image: RgbImage,
    pub labels: Vec<L>,
}

impl<L> DecodedSample<L> {
    pub fn new(image: RgbImage, labels: Vec<L>) -> Self {
        Self { image, labels }
    }

    /// Image dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
