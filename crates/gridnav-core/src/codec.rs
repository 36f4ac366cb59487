//! Boundary to the population-code codec used for angle and position channels.

use crate::pattern::Tensor2;

/// Encoder/decoder for ring (circular) and 2D bump population codes.
///
/// The environment only normalizes its own quantities into the unit interval / unit square
/// and calls through this trait, so alternative codecs can be swapped in without touching the
/// stepping logic.
pub trait PopulationCodec: Send {
    /// Static identifier of the codec implementation.
    fn kind(&self) -> &'static str;

    /// Number of units produced by [`PopulationCodec::encode_ring`].
    fn ring_units(&self) -> usize;

    /// Shape of the grid produced by [`PopulationCodec::encode_2d`].
    fn grid_shape(&self) -> [usize; 2];

    /// Encode `value` in `[0, 1)` on a ring with bump `width` (fraction of the circle).
    fn encode_ring(&self, value: f32, width: f32) -> Vec<f32>;

    /// Circular weighted-mean decode back into `[0, 1)`.
    fn decode_ring(&self, activity: &[f32]) -> f32;

    /// Encode a point in the unit square.
    fn encode_2d(&self, point: [f32; 2]) -> Tensor2;

    /// Decode a grid back into a point in the unit square.
    fn decode_2d(&self, grid: &Tensor2) -> [f32; 2];
}
