// 水面与海岸线
//
// 这里只计算位置，生成网格或场景物体由调用方负责

use serde::{Deserialize, Serialize};

use super::grid::{Heightfield, TerrainSize};

/// Where to put a flat water plane over the terrain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterPlane {
    /// Centre in terrain-local world units (x, y, z)
    pub center: [f32; 3],
    /// Horizontal extent (x, z)
    pub scale: [f32; 2],
}

/// Plane at `water_height` (normalized) covering three quarters of the terrain.
pub fn water_plane(size: TerrainSize, water_height: f32) -> WaterPlane {
    WaterPlane {
        center: [
            size.width / 2.0,
            water_height * size.height,
            size.length / 2.0,
        ],
        scale: [size.width * 0.75, size.length * 0.75],
    }
}

/// A wet cell next to a dry one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShoreSegment {
    pub wet: (usize, usize),
    pub dry: (usize, usize),
    /// World position of the wet cell at the water line
    pub position: [f32; 3],
    /// World position the segment faces, towards the dry cell
    pub facing: [f32; 3],
}

/// Every (wet, dry) neighbor pair: wet strictly below `water_height`,
/// dry strictly above it. A wet cell appears once per dry neighbor.
pub fn find_shoreline(field: &Heightfield, water_height: f32) -> Vec<ShoreSegment> {
    let resolution = field.resolution();
    let size = field.size();
    let y = water_height * size.height;
    let to_world = |(cx, cy): (usize, usize)| {
        [
            cx as f32 / resolution as f32 * size.width,
            y,
            cy as f32 / resolution as f32 * size.length,
        ]
    };

    let heights = field.heights();
    let mut segments = Vec::new();
    for cy in 0..resolution {
        for cx in 0..resolution {
            if heights[field.index(cx, cy)] >= water_height {
                continue;
            }
            for &(nx, ny) in field.neighbors(cx, cy).iter() {
                if heights[field.index(nx, ny)] > water_height {
                    segments.push(ShoreSegment {
                        wet: (cx, cy),
                        dry: (nx, ny),
                        position: to_world((cx, cy)),
                        facing: to_world((nx, ny)),
                    });
                }
            }
        }
    }
    log::debug!("Shoreline at {water_height}: {} segment(s)", segments.len());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_water_plane_placement() {
        let plane = water_plane(TerrainSize::new(1000.0, 600.0, 800.0), 0.1);
        assert_eq!(plane.center[0], 500.0);
        assert_relative_eq!(plane.center[1], 60.0, epsilon = 1e-4);
        assert_eq!(plane.center[2], 400.0);
        assert_eq!(plane.scale, [750.0, 600.0]);
    }

    #[test]
    fn test_island_shoreline() {
        let mut f = Heightfield::new(5, TerrainSize::default()).unwrap();
        f.set_height(2, 2, 1.0);
        let shore = find_shoreline(&f, 0.5);

        // 岛屿周围的八个水格各贡献一段
        assert_eq!(shore.len(), 8);
        assert!(shore.iter().all(|s| s.dry == (2, 2)));
        assert!(shore.iter().any(|s| s.wet == (1, 1)));
    }

    #[test]
    fn test_cell_at_water_line_is_neither() {
        let mut f = Heightfield::new(3, TerrainSize::default()).unwrap();
        f.fill(0.5);
        assert!(find_shoreline(&f, 0.5).is_empty());
    }
}
