//! Integer line traversal between two cells.

use cgmath::Point3;

use crate::voxels::coord::Coord;

/// Iterator over the cells of a 3D Bresenham line, both endpoints included.
///
/// Every step advances the dominant axis by one cell, so consecutive cells
/// always touch and no cell is visited twice.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use sparse_voxel_grid::occupancy::CellLine;
///
/// let cells: Vec<_> = CellLine::new(Point3::new(0, 0, 0), Point3::new(3, 1, 0)).collect();
/// assert_eq!(cells.len(), 4);
/// assert_eq!(cells[0], Point3::new(0, 0, 0));
/// assert_eq!(cells[3], Point3::new(3, 1, 0));
/// ```
#[derive(Debug, Clone)]
pub struct CellLine {
    current: [i64; 3],
    step: [i64; 3],
    delta: [i64; 3],
    error: [i64; 3],
    major: usize,
    remaining: u64,
}

impl CellLine {
    /// Creates a line from `start` to `end`.
    pub fn new(start: Coord, end: Coord) -> Self {
        let current = [i64::from(start.x), i64::from(start.y), i64::from(start.z)];
        let target = [i64::from(end.x), i64::from(end.y), i64::from(end.z)];

        let mut step = [0i64; 3];
        let mut delta = [0i64; 3];
        for axis in 0..3 {
            let d = target[axis] - current[axis];
            step[axis] = d.signum();
            delta[axis] = d.abs();
        }

        let major = if delta[0] >= delta[1] && delta[0] >= delta[2] {
            0
        } else if delta[1] >= delta[2] {
            1
        } else {
            2
        };

        let mut error = [0i64; 3];
        for axis in 0..3 {
            if axis != major {
                error[axis] = 2 * delta[axis] - delta[major];
            }
        }

        CellLine {
            current,
            step,
            delta,
            error,
            major,
            remaining: delta[major] as u64 + 1,
        }
    }

    fn advance(&mut self) {
        let major = self.major;
        for axis in 0..3 {
            if axis == major {
                continue;
            }
            if self.error[axis] > 0 {
                self.current[axis] += self.step[axis];
                self.error[axis] -= 2 * self.delta[major];
            }
            self.error[axis] += 2 * self.delta[axis];
        }
        self.current[major] += self.step[major];
    }
}

impl Iterator for CellLine {
    type Item = Coord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // Every visited cell lies between two i32 endpoints.
        let cell = Point3::new(self.current[0] as i32, self.current[1] as i32, self.current[2] as i32);
        self.remaining -= 1;
        if self.remaining > 0 {
            self.advance();
        }
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellLine {}
