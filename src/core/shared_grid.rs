use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::GridError;
use crate::voxels::cell::CellValue;
use crate::voxels::grid::VoxelGrid;

/// A thread-safe, reference-counted handle to one `VoxelGrid`.
///
/// `SharedGrid` pairs the grid with an `Arc<RwLock<_>>` so that many readers
/// can query it at once while a single writer mutates it. Clones share the
/// same grid.
///
/// # Type Parameters
/// - `T`: The cell value type of the wrapped grid
///
/// # Examples
///
/// ## Basic Usage
/// ```
/// use cgmath::Point3;
/// use sparse_voxel_grid::{SharedGrid, VoxelGrid};
///
/// let shared = SharedGrid::new(VoxelGrid::<u8>::new(0.1));
/// shared.write().unwrap().set(Point3::new(1, 1, 1), 4).unwrap();
/// assert_eq!(shared.read().unwrap().get(Point3::new(1, 1, 1)), 4);
/// ```
///
/// ## Sharing Between Threads
/// ```
/// # use std::thread;
/// use cgmath::Point3;
/// use sparse_voxel_grid::{SharedGrid, VoxelGrid};
///
/// let shared = SharedGrid::new(VoxelGrid::<u32>::new(1.0));
/// let writer = shared.clone();
///
/// let handle = thread::spawn(move || {
///     writer.write().unwrap().set(Point3::new(0, 0, 7), 99).unwrap();
/// });
///
/// handle.join().unwrap();
/// assert_eq!(shared.read().unwrap().get(Point3::new(0, 0, 7)), 99);
/// ```
///
/// # Performance Considerations
/// - Read guards (`read()`) can be held concurrently
/// - The write guard (`write()`) is exclusive and blocks every reader
/// - Use `snapshot()` to take a copy for long-running work without holding the lock
pub struct SharedGrid<T: CellValue> {
    grid: Arc<RwLock<VoxelGrid<T>>>,
}

impl<T: CellValue> SharedGrid<T> {
    /// Wraps `grid` for shared access.
    ///
    /// # Arguments
    /// * `grid` - The grid to share
    ///
    /// # Returns
    /// A new `SharedGrid` owning the grid
    pub fn new(grid: VoxelGrid<T>) -> Self {
        Self {
            grid: Arc::new(RwLock::new(grid)),
        }
    }

    /// Returns a guard allowing reads of the grid.
    ///
    /// # Errors
    /// Returns [`GridError::Poisoned`] if a writer panicked while holding the lock.
    ///
    /// # Returns
    /// A guard that provides read access to the grid
    pub fn read(&self) -> Result<RwLockReadGuard<'_, VoxelGrid<T>>, GridError> {
        self.grid.read().map_err(|_| GridError::Poisoned)
    }

    /// Returns a guard allowing mutation of the grid.
    ///
    /// # Errors
    /// Returns [`GridError::Poisoned`] if a writer panicked while holding the lock.
    ///
    /// # Returns
    /// A guard that provides mutable access to the grid
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, VoxelGrid<T>>, GridError> {
        self.grid.write().map_err(|_| GridError::Poisoned)
    }

    /// Copies the grid as it stands under a read lock.
    ///
    /// # Errors
    /// Returns [`GridError::Poisoned`] if a writer panicked while holding the lock.
    pub fn snapshot(&self) -> Result<VoxelGrid<T>, GridError> {
        Ok(self.read()?.clone())
    }
}

impl<T: CellValue> Clone for SharedGrid<T> {
    fn clone(&self) -> Self {
        Self {
            grid: self.grid.clone(),
        }
    }
}
