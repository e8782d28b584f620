//! Pixel change maps, the target of the pixel control objective.
use crate::error::AuxReplayError;
use ndarray::{s, Array2, Array3, Axis};

/// Pixels cropped from each border of the observation.
pub const CROP: usize = 2;

/// Side of the square cells the cropped difference is averaged over.
pub const CELL: usize = 4;

/// Returns the pixel change between two observations.
///
/// Observations are `(height, width, channels)`. The absolute difference of
/// the observations, cropped by [`CROP`] pixels on every border, is averaged
/// over channels and then over non-overlapping [`CELL`]x[`CELL`] cells. An
/// 84x84 observation gives a 20x20 map.
pub fn calc_pixel_change(
    state: &Array3<f32>,
    last_state: &Array3<f32>,
) -> Result<Array2<f32>, AuxReplayError> {
    if state.shape() != last_state.shape() {
        return Err(AuxReplayError::ShapeMismatch(format!(
            "observations of shape {:?} and {:?}",
            state.shape(),
            last_state.shape()
        )));
    }

    let (h, w, c) = state.dim();
    let (ch, cw) = (h.saturating_sub(2 * CROP), w.saturating_sub(2 * CROP));
    if c == 0 || ch == 0 || cw == 0 || ch % CELL != 0 || cw % CELL != 0 {
        return Err(AuxReplayError::ShapeMismatch(format!(
            "cropped observation {}x{}x{} does not split into {}x{} cells",
            ch, cw, c, CELL, CELL
        )));
    }

    let d = (&state.slice(s![CROP..h - CROP, CROP..w - CROP, ..])
        - &last_state.slice(s![CROP..h - CROP, CROP..w - CROP, ..]))
        .mapv(f32::abs);
    let m = d.sum_axis(Axis(2)) / c as f32;

    let mut pc = Array2::zeros((ch / CELL, cw / CELL));
    for ((i, j), v) in pc.indexed_iter_mut() {
        let cell = m.slice(s![i * CELL..(i + 1) * CELL, j * CELL..(j + 1) * CELL]);
        *v = cell.sum() / (CELL * CELL) as f32;
    }

    Ok(pc)
}
