use thiserror::Error;

/// Failures raised by the reconstruction pipeline. Every stage after
/// decode is deterministic local computation, so there is no
/// transient-failure class and no retry path: a failed build attempt
/// is abandoned outright.
#[derive(Debug, Error)]
pub enum ReliefError {
    #[error("decoding photo bytes")]
    Decode(#[from] image::ImageError),

    #[error("photo has degenerate dimensions {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
}
