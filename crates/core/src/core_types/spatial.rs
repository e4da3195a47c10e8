use crate::core_types::component_data::ComponentData;
use crate::core_types::vec3::Vec3;
use rustc_hash::FxHashMap;

/// Proximity queries over the records of one pass.
///
/// Candidates are indices into the slice handed to the last [`rebuild`].
/// Implementations may report too many candidates (the calculator re-checks
/// distance) but must not miss any record within `radius`.
///
/// [`rebuild`]: SpatialLookup::rebuild
pub trait SpatialLookup: Send + Sync {
    /// Index the positions of `records` for the coming pass
    fn rebuild(&mut self, records: &[ComponentData]);

    /// Clear `out` and fill it with candidates within `radius` of `center`
    fn find_nearby(&self, center: Vec3, radius: f32, out: &mut Vec<usize>);
}

/// Beyond this many cells per axis a query scans every entry instead
const MAX_QUERY_CELLS_PER_AXIS: i64 = 32;

/// Spatial index using a hashed uniform grid for fast neighbor queries.
///
/// The world is unbounded: cells are addressed by their integer coordinates,
/// Morton-encoded into the hash key.
pub struct SpatialIndex {
    cells: FxHashMap<u64, Vec<usize>>,
    entries: Vec<(usize, Vec3)>,
    cell_size: f32,
}

impl SpatialIndex {
    /// Create a new spatial index. Non-positive cell sizes fall back to 1m.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        SpatialIndex {
            cells: FxHashMap::default(),
            entries: Vec::new(),
            cell_size,
        }
    }

    /// Saturates for positions far outside `i64` range; those share edge cells.
    #[inline]
    fn cell_coords(&self, pos: Vec3) -> (i64, i64, i64) {
        (
            (pos.x / self.cell_size).floor() as i64,
            (pos.y / self.cell_size).floor() as i64,
            (pos.z / self.cell_size).floor() as i64,
        )
    }

    /// Insert a record index at a position
    pub fn insert(&mut self, index: usize, position: Vec3) {
        let (x, y, z) = self.cell_coords(position);
        self.cells
            .entry(morton_encode(x, y, z))
            .or_default()
            .push(index);
        self.entries.push((index, position));
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
    }

    /// Get the configured cell size
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Get number of cells in the index
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Get number of entries in the index
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl SpatialLookup for SpatialIndex {
    fn rebuild(&mut self, records: &[ComponentData]) {
        self.clear();
        for (index, record) in records.iter().enumerate() {
            if let Some(position) = record.position {
                if position.iter().all(|c| c.is_finite()) {
                    self.insert(index, position);
                }
            }
        }
    }

    fn find_nearby(&self, center: Vec3, radius: f32, out: &mut Vec<usize>) {
        out.clear();
        if !(radius.is_finite() && radius >= 0.0) || !center.iter().all(|c| c.is_finite()) {
            return;
        }

        let cells_needed = (radius / self.cell_size).ceil() as i64;
        if cells_needed > MAX_QUERY_CELLS_PER_AXIS {
            let radius_sq = radius * radius;
            out.extend(
                self.entries
                    .iter()
                    .filter(|(_, pos)| (pos - center).norm_squared() <= radius_sq)
                    .map(|&(index, _)| index),
            );
            return;
        }

        let (cx, cy, cz) = self.cell_coords(center);
        for dx in -cells_needed..=cells_needed {
            for dy in -cells_needed..=cells_needed {
                for dz in -cells_needed..=cells_needed {
                    // Wrapping keeps the low bits the key is built from
                    let hash = morton_encode(
                        cx.wrapping_add(dx),
                        cy.wrapping_add(dy),
                        cz.wrapping_add(dz),
                    );
                    if let Some(indices) = self.cells.get(&hash) {
                        out.extend(indices);
                    }
                }
            }
        }
    }
}

/// Brute-force lookup: every positioned record is a candidate.
///
/// Fine for a few hundred records and handy as a reference in tests.
#[derive(Debug, Default)]
pub struct LinearScan {
    entries: Vec<(usize, Vec3)>,
}

impl LinearScan {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialLookup for LinearScan {
    fn rebuild(&mut self, records: &[ComponentData]) {
        self.entries.clear();
        self.entries.extend(
            records
                .iter()
                .enumerate()
                .filter_map(|(index, record)| record.position.map(|pos| (index, pos))),
        );
    }

    fn find_nearby(&self, center: Vec3, radius: f32, out: &mut Vec<usize>) {
        out.clear();
        let radius_sq = radius * radius;
        out.extend(
            self.entries
                .iter()
                .filter(|(_, pos)| (pos - center).norm_squared() <= radius_sq)
                .map(|&(index, _)| index),
        );
    }
}

/// Morton encode 3D cell coordinates into a single 64-bit integer.
/// Interleaves the low 21 bits of each axis; distant cells may share a key,
/// which only adds candidates.
fn morton_encode(x: i64, y: i64, z: i64) -> u64 {
    // Two's complement bits, so negative coordinates map like positive ones
    let x = x as u64;
    let y = y as u64;
    let z = z as u64;

    let mut result = 0u64;

    for i in 0..21 {
        result |= ((x & (1 << i)) << (2 * i))
            | ((y & (1 << i)) << (2 * i + 1))
            | ((z & (1 << i)) << (2 * i + 2));
    }

    result
}
