//! Canyon carving.
//!
//! A crawler walks from the left edge towards the right, and at every stop
//! floods outwards, lowering cells to a carve height that rises by a small
//! random bank slope per step away from the trench. The flood is a
//! depth-first search driven by an explicit stack; branches are visited and
//! their random slopes drawn in the same order a recursive crawler would.

use super::ErosionParameters;
use crate::terrain::error::{Result, TerrainError};
use crate::terrain::grid::Heightfield;
use crate::terrain::random::TerrainRng;

/// Default cap on pending crawler frames.
pub const CANYON_STACK_LIMIT: usize = 1 << 20;

const DIG_DEPTH: f32 = 0.05;
const BANK_SLOPE: f32 = 0.01;
const BANK_SLOPE_JITTER: f32 = 0.01;
const MAX_DEPTH: f32 = 0.0;
/// Rows kept clear of the top and bottom edge when picking the start row.
const START_MARGIN: i32 = 10;

const BRANCHES: [(i64, i64); 6] = [(1, 0), (-1, 0), (1, 1), (-1, 1), (0, 1), (0, -1)];

struct Frame {
    x: i64,
    y: i64,
    height: f32,
    next_branch: usize,
}

pub(super) fn run(field: &mut Heightfield, params: &ErosionParameters, rng: &mut TerrainRng) -> Result<()> {
    let size = field.resolution() as i32;
    let mut cy = if size > START_MARGIN * 2 {
        rng.range_int(START_MARGIN, size - START_MARGIN)
    } else {
        log::warn!("Canyon: {size}-cell grid too narrow for a start margin, using any row");
        rng.range_int(0, size)
    };
    let mut cx = 1;

    let mut carved = 0;
    while (0..size).contains(&cy) && cx > 0 && cx < size {
        let start = field.get_height(cx as i64, cy as i64) - DIG_DEPTH;
        carved += crawl(field, cx as i64, cy as i64, start, params.canyon_stack_limit, rng)?;
        cx += rng.range_int(-1, 5);
        cy += rng.range_int(-3, 5);
    }
    log::trace!("Canyon: carved {carved} cell(s)");
    Ok(())
}

/// Lowers `(x, y)` to `height` if the cell is in range, higher than `height`
/// and `height` is above the floor.
fn dig(field: &mut Heightfield, x: i64, y: i64, height: f32) -> bool {
    let size = field.resolution() as i64;
    if !(0..size).contains(&x) || !(0..size).contains(&y) {
        return false;
    }
    if height <= MAX_DEPTH || field.get_height(x, y) <= height {
        return false;
    }
    field.set_height(x, y, height);
    true
}

fn crawl(
    field: &mut Heightfield,
    x: i64,
    y: i64,
    height: f32,
    limit: usize,
    rng: &mut TerrainRng,
) -> Result<usize> {
    if !dig(field, x, y, height) {
        return Ok(0);
    }
    let mut carved = 1;
    let mut stack = vec![Frame {
        x,
        y,
        height,
        next_branch: 0,
    }];

    while let Some(top) = stack.last_mut() {
        let Some(&(dx, dy)) = BRANCHES.get(top.next_branch) else {
            stack.pop();
            continue;
        };
        top.next_branch += 1;

        let (nx, ny) = (top.x + dx, top.y + dy);
        let next_height = top.height + rng.uniform(BANK_SLOPE, BANK_SLOPE + BANK_SLOPE_JITTER);
        if dig(field, nx, ny, next_height) {
            carved += 1;
            if stack.len() >= limit {
                return Err(TerrainError::RecursionLimitExceeded { limit });
            }
            stack.push(Frame {
                x: nx,
                y: ny,
                height: next_height,
                next_branch: 0,
            });
        }
    }
    Ok(carved)
}
