use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Vec3, Transform};

use super::aabb::Aabb;
use super::convex::ConvexPolyhedron;

/// A regular height grid in the local XY plane with heights along local +Z.
///
/// `data[xi][yi]` is the height at `(xi * element_size, yi * element_size)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    data: Vec<Vec<f32>>,
    element_size: f32,
    min_value: f32,
    max_value: f32,
}

impl Heightfield {
    pub fn new(data: Vec<Vec<f32>>, element_size: f32) -> PhysicsResult<Self> {
        if !(element_size.is_finite() && element_size > 0.0) {
            return Err(PhysicsError::InvalidHeightfield(format!(
                "element size must be positive, got {}",
                element_size
            )));
        }
        if data.len() < 2 {
            return Err(PhysicsError::InvalidHeightfield(format!(
                "need at least 2 rows, got {}",
                data.len()
            )));
        }
        let columns = data[0].len();
        if columns < 2 {
            return Err(PhysicsError::InvalidHeightfield(format!(
                "need at least 2 columns, got {}",
                columns
            )));
        }
        if let Some(row) = data.iter().position(|r| r.len() != columns) {
            return Err(PhysicsError::InvalidHeightfield(format!(
                "row {} has {} columns, expected {}",
                row,
                data[row].len(),
                columns
            )));
        }
        if data.iter().flatten().any(|h| !h.is_finite()) {
            return Err(PhysicsError::InvalidHeightfield("heights must be finite".into()));
        }

        let mut field = Self {
            data,
            element_size,
            min_value: 0.0,
            max_value: 0.0,
        };
        field.update_min_max();
        Ok(field)
    }

    /// Number of samples along local X
    #[inline]
    pub fn size_x(&self) -> usize {
        self.data.len()
    }

    /// Number of samples along local Y
    #[inline]
    pub fn size_y(&self) -> usize {
        self.data[0].len()
    }

    #[inline]
    pub fn element_size(&self) -> f32 {
        self.element_size
    }

    #[inline]
    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    #[inline]
    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn data(&self) -> &[Vec<f32>] {
        &self.data
    }

    pub fn height_at_index(&self, xi: usize, yi: usize) -> PhysicsResult<f32> {
        self.data
            .get(xi)
            .and_then(|row| row.get(yi))
            .copied()
            .ok_or_else(|| self.out_of_range(xi, yi))
    }

    pub fn set_height_at_index(&mut self, xi: usize, yi: usize, value: f32) -> PhysicsResult<()> {
        let err = self.out_of_range(xi, yi);
        let slot = self
            .data
            .get_mut(xi)
            .and_then(|row| row.get_mut(yi))
            .ok_or(err)?;
        *slot = value;
        self.update_min_max();
        Ok(())
    }

    /// Cell containing the local point `(x, y)`.
    ///
    /// With `clamp` the index is forced into the grid; without it, points outside
    /// the grid yield `None`.
    pub fn index_of_position(&self, x: f32, y: f32, clamp: bool) -> Option<(usize, usize)> {
        let xi = (x / self.element_size).floor();
        let yi = (y / self.element_size).floor();
        let max_x = (self.size_x() - 2) as f32;
        let max_y = (self.size_y() - 2) as f32;

        if clamp {
            return Some((xi.clamp(0.0, max_x) as usize, yi.clamp(0.0, max_y) as usize));
        }
        if xi < 0.0 || yi < 0.0 || xi > max_x || yi > max_y {
            return None;
        }
        Some((xi as usize, yi as usize))
    }

    /// Interpolated height at local `(x, y)` over the triangle covering that point
    pub fn height_at(&self, x: f32, y: f32, clamp: bool) -> Option<f32> {
        let (xi, yi) = self.index_of_position(x, y, clamp)?;
        let w = self.element_size;

        let lower_dist2 = (x / w - xi as f32).powi(2) + (y / w - yi as f32).powi(2);
        let upper_dist2 = (x / w - (xi + 1) as f32).powi(2) + (y / w - (yi + 1) as f32).powi(2);
        let upper = lower_dist2 > upper_dist2;

        let [a, b, c] = self.triangle(xi, yi, upper);
        let weights = barycentric_weights(x, y, a, b, c)?;
        Some(a.z * weights.x + b.z * weights.y + c.z * weights.z)
    }

    /// Minimum and maximum height over the inclusive index rectangle.
    ///
    /// The minimum is the global minimum; the pillars below every cell reach down to it.
    pub fn rect_min_max(&self, min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> (f32, f32) {
        let max_x = max_x.min(self.size_x() - 1);
        let max_y = max_y.min(self.size_y() - 1);

        let mut max = self.min_value;
        for row in self.data.iter().take(max_x + 1).skip(min_x) {
            for &h in row.iter().take(max_y + 1).skip(min_y) {
                max = max.max(h);
            }
        }
        (self.min_value, max)
    }

    /// Triangular prism under the lower (`upper == false`) or upper triangle of
    /// cell `(xi, yi)`, returned with its offset in heightfield space.
    pub fn convex_triangle_pillar(
        &self,
        xi: usize,
        yi: usize,
        upper: bool,
    ) -> PhysicsResult<(ConvexPolyhedron, Vec3)> {
        if xi + 1 >= self.size_x() || yi + 1 >= self.size_y() {
            return Err(self.out_of_range(xi, yi));
        }

        let d = &self.data;
        let w = self.element_size;
        let lowest = d[xi][yi].min(d[xi + 1][yi]).min(d[xi][yi + 1]).min(d[xi + 1][yi + 1]);
        let h = (lowest - self.min_value) / 2.0 + self.min_value;
        let bottom = self.min_value - 1.0 - h;

        let (offset, vertices) = if upper {
            (
                Vec3::new((xi as f32 + 0.75) * w, (yi as f32 + 0.75) * w, h),
                vec![
                    Vec3::new(0.25 * w, 0.25 * w, d[xi + 1][yi + 1] - h),
                    Vec3::new(-0.75 * w, 0.25 * w, d[xi][yi + 1] - h),
                    Vec3::new(0.25 * w, -0.75 * w, d[xi + 1][yi] - h),
                    Vec3::new(0.25 * w, 0.25 * w, bottom),
                    Vec3::new(-0.75 * w, 0.25 * w, bottom),
                    Vec3::new(0.25 * w, -0.75 * w, bottom),
                ],
            )
        } else {
            (
                Vec3::new((xi as f32 + 0.25) * w, (yi as f32 + 0.25) * w, h),
                vec![
                    Vec3::new(-0.25 * w, -0.25 * w, d[xi][yi] - h),
                    Vec3::new(0.75 * w, -0.25 * w, d[xi + 1][yi] - h),
                    Vec3::new(-0.25 * w, 0.75 * w, d[xi][yi + 1] - h),
                    Vec3::new(-0.25 * w, -0.25 * w, bottom),
                    Vec3::new(0.75 * w, -0.25 * w, bottom),
                    Vec3::new(-0.25 * w, 0.75 * w, bottom),
                ],
            )
        };

        // top, bottom, then the three side quads
        let faces = vec![
            vec![0, 1, 2],
            vec![5, 4, 3],
            vec![0, 2, 5, 3],
            vec![1, 0, 3, 4],
            vec![4, 5, 2, 1],
        ];

        Ok((ConvexPolyhedron::new(vertices, faces)?, offset))
    }

    pub fn local_aabb(&self) -> Aabb {
        Aabb::new(
            Vec3::new(0.0, 0.0, self.min_value),
            Vec3::new(
                (self.size_x() - 1) as f32 * self.element_size,
                (self.size_y() - 1) as f32 * self.element_size,
                self.max_value,
            ),
        )
    }

    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        self.local_aabb().to_world_frame(transform)
    }

    pub fn bounding_radius(&self) -> f32 {
        Vec3::new(
            self.size_x() as f32 * self.element_size,
            self.size_y() as f32 * self.element_size,
            self.max_value.abs().max(self.min_value.abs()),
        )
        .length()
    }

    /// Surface triangle of cell `(xi, yi)` in heightfield space, counter-clockwise
    /// seen from +Z. The caller keeps `xi + 1` and `yi + 1` inside the grid.
    pub fn triangle(&self, xi: usize, yi: usize, upper: bool) -> [Vec3; 3] {
        let d = &self.data;
        let w = self.element_size;
        let point = |i: usize, j: usize| Vec3::new(i as f32 * w, j as f32 * w, d[i][j]);
        if upper {
            [point(xi + 1, yi + 1), point(xi, yi + 1), point(xi + 1, yi)]
        } else {
            [point(xi, yi), point(xi + 1, yi), point(xi, yi + 1)]
        }
    }

    /// Triangle across edge `edge` (from vertex `edge` to the next) of a cell
    /// triangle; `None` on the grid border.
    pub fn edge_neighbour(&self, xi: usize, yi: usize, upper: bool, edge: usize) -> Option<(usize, usize, bool)> {
        let (cells_x, cells_y) = (self.size_x() - 1, self.size_y() - 1);
        let (nx, ny) = match (upper, edge) {
            (false, 0) => (Some(xi), yi.checked_sub(1)),
            (false, 2) => (xi.checked_sub(1), Some(yi)),
            (true, 0) => (Some(xi), Some(yi + 1)),
            (true, 2) => (Some(xi + 1), Some(yi)),
            _ => (Some(xi), Some(yi)),
        };
        match (nx, ny) {
            (Some(nx), Some(ny)) if nx < cells_x && ny < cells_y => Some((nx, ny, !upper)),
            _ => None,
        }
    }

    /// Grid sample under vertex `k` of a cell triangle
    pub fn triangle_vertex_index(xi: usize, yi: usize, upper: bool, k: usize) -> (usize, usize) {
        let offsets = if upper {
            [(1, 1), (0, 1), (1, 0)]
        } else {
            [(0, 0), (1, 0), (0, 1)]
        };
        let (dx, dy) = offsets[k % 3];
        (xi + dx, yi + dy)
    }

    /// The six triangles sharing an interior grid sample; `None` for border samples
    pub fn triangles_around(&self, i: usize, j: usize) -> Option<[(usize, usize, bool); 6]> {
        if i == 0 || j == 0 || i + 1 >= self.size_x() || j + 1 >= self.size_y() {
            return None;
        }
        Some([
            (i, j, false),
            (i - 1, j, false),
            (i, j - 1, false),
            (i - 1, j - 1, true),
            (i, j - 1, true),
            (i - 1, j, true),
        ])
    }

    fn update_min_max(&mut self) {
        let (min, max) = self
            .data
            .iter()
            .flatten()
            .fold((f32::MAX, -f32::MAX), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        self.min_value = min;
        self.max_value = max;
    }

    fn out_of_range(&self, xi: usize, yi: usize) -> PhysicsError {
        PhysicsError::HeightfieldIndexOutOfRange {
            xi,
            yi,
            size_x: self.size_x(),
            size_y: self.size_y(),
        }
    }
}

fn barycentric_weights(x: f32, y: f32, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if denom.abs() < 1e-12 {
        return None;
    }
    let wa = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / denom;
    let wb = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / denom;
    Some(Vec3::new(wa, wb, 1.0 - wa - wb))
}
