use super::ErosionParameters;
use crate::terrain::grid::Heightfield;
use crate::terrain::noise::NoiseSynthesizer;

/// Height moved from each dig cell to its pile cell.
const GRAIN: f32 = 0.001;
/// Distance between swept rows before rotation.
const ROW_STEP: usize = 10;
/// Rows between the dig and pile coordinates.
const PILE_OFFSET: i64 = 5;
const NOISE_SCALE: f32 = 0.06;
const NOISE_AMPLITUDE: f32 = 20.0;

/// Sweeps a rotated lattice twice the grid's extent. For each lattice point
/// a grain is dug at one rotated coordinate and piled a few rows downwind,
/// whenever both land inside the grid.
pub(super) fn run(field: &mut Heightfield, params: &ErosionParameters, noise: &NoiseSynthesizer) {
    let size = field.resolution() as i64;
    let last = size - 1;
    let radians = params.wind_direction_degrees.to_radians();
    let sin = -radians.sin();
    let cos = radians.cos();

    let rotate = |x: i64, y: i64| -> (i64, i64) {
        let (x, y) = (x as f32, y as f32);
        ((x * cos - y * sin) as i64, (y * cos + x * sin) as i64)
    };
    let inside = |(x, y): (i64, i64)| (0..=last).contains(&x) && (0..=last).contains(&y);

    let mut moved = 0usize;
    for y in (-last * 2..=size * 2).step_by(ROW_STEP) {
        for x in -last * 2..=size * 2 {
            let jitter = noise.base_noise(x as f32 * NOISE_SCALE, y as f32 * NOISE_SCALE)
                * NOISE_AMPLITUDE
                * params.strength;
            let dig_y = y + jitter as i64;
            let pile_y = y + PILE_OFFSET + jitter as i64;

            let dig = rotate(x, dig_y);
            let pile = rotate(x, pile_y);
            if inside(dig) && inside(pile) {
                field.add_height(dig.0, dig.1, -GRAIN);
                field.add_height(pile.0, pile.1, GRAIN);
                moved += 1;
            }
        }
    }
    log::trace!("Wind: moved {moved} grain(s)");
}
