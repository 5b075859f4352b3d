//! Regular 3-D lattice with face- or full-connected neighbourhoods.

use crate::error::LatticeError;
use smallvec::SmallVec;
use stroma_core::{GridMeta, SiteIndex};

/// The six axis-aligned unit offsets (±x, ±y, ±z).
const FACE_OFFSETS: [(i32, i32, i32); 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

/// Lattice extents `(nx, ny, nz)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extents {
    /// Sites along x.
    pub nx: u32,
    /// Sites along y.
    pub ny: u32,
    /// Sites along z.
    pub nz: u32,
}

impl Extents {
    /// Create extents from the three axis lengths.
    pub fn new(nx: u32, ny: u32, nz: u32) -> Self {
        Self { nx, ny, nz }
    }

    /// Total number of sites.
    pub fn count(&self) -> usize {
        (self.nx as usize) * (self.ny as usize) * (self.nz as usize)
    }
}

/// Which offsets count as neighbours of a site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Neighbourhood {
    /// The 6 axis-aligned unit steps (von Neumann).
    Face,
    /// All 26 surrounding offsets excluding self (Moore).
    Full,
}

impl Neighbourhood {
    fn offsets(self) -> Vec<(i32, i32, i32)> {
        match self {
            Self::Face => FACE_OFFSETS.to_vec(),
            Self::Full => {
                let mut offsets = Vec::with_capacity(26);
                for dz in -1..=1 {
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            if (dx, dy, dz) != (0, 0, 0) {
                                offsets.push((dx, dy, dz));
                            }
                        }
                    }
                }
                offsets
            }
        }
    }
}

/// A regular 3-D lattice of sites with a fixed neighbour relation.
///
/// Sites are indexed `0..N` by the x-fastest flattening
/// `index = i + nx·(j + ny·k)`; the index↔coordinate mapping is
/// bijective and stable for the lattice's lifetime. The neighbour table
/// is computed once at construction; topology never mutates afterwards.
///
/// Out-of-bounds neighbour coordinates are clamped per axis to the
/// nearest valid index — never wrapped, never dropped — so a boundary
/// site's neighbour in a clamped direction lands on the boundary
/// itself. Self-references and duplicate indices produced by clamping
/// are filtered when the per-site neighbour list is populated, so
/// boundary sites simply have fewer distinct neighbours.
///
/// # Examples
///
/// ```
/// use stroma_lattice::{Extents, Lattice, Neighbourhood};
///
/// let lattice = Lattice::new(Extents::new(3, 3, 3), 1.0, Neighbourhood::Face).unwrap();
/// assert_eq!(lattice.site_count(), 27);
///
/// // Interior site: all 6 face neighbours are distinct.
/// let centre = lattice.index_of(1, 1, 1);
/// assert_eq!(lattice.neighbours(centre).len(), 6);
///
/// // Corner site: three directions clamp onto the corner itself.
/// let corner = lattice.index_of(0, 0, 0);
/// assert_eq!(lattice.neighbours(corner).len(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct Lattice {
    extents: Extents,
    spacing: f64,
    neighbourhood: Neighbourhood,
    neighbours: Vec<SmallVec<[SiteIndex; 6]>>,
}

impl Lattice {
    /// Maximum axis length: coordinates use `i32`, so each axis must fit.
    pub const MAX_DIM: u32 = i32::MAX as u32;

    /// Build a lattice and its neighbour table.
    ///
    /// Returns `Err(LatticeError::EmptyLattice)` if any extent is 0, or
    /// `Err(LatticeError::DimensionTooLarge)` if an axis exceeds
    /// `i32::MAX`.
    pub fn new(
        extents: Extents,
        spacing: f64,
        neighbourhood: Neighbourhood,
    ) -> Result<Self, LatticeError> {
        if extents.nx == 0 || extents.ny == 0 || extents.nz == 0 {
            return Err(LatticeError::EmptyLattice);
        }
        for (name, value) in [
            ("nx", extents.nx),
            ("ny", extents.ny),
            ("nz", extents.nz),
        ] {
            if value > Self::MAX_DIM {
                return Err(LatticeError::DimensionTooLarge {
                    name,
                    value,
                    max: Self::MAX_DIM,
                });
            }
        }
        let count = extents.count();
        if u32::try_from(count).is_err() {
            return Err(LatticeError::TooManySites { count });
        }

        let offsets = neighbourhood.offsets();
        let mut neighbours = Vec::with_capacity(count);
        for index in 0..count {
            neighbours.push(site_neighbours(extents, index, &offsets));
        }

        Ok(Self {
            extents,
            spacing,
            neighbourhood,
            neighbours,
        })
    }

    /// Lattice extents.
    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Physical distance per lattice step.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// The neighbourhood kind this lattice was built with.
    pub fn neighbourhood(&self) -> Neighbourhood {
        self.neighbourhood
    }

    /// Total number of sites.
    pub fn site_count(&self) -> usize {
        self.extents.count()
    }

    /// Flatten a coordinate to its site index (x-fastest ordering).
    pub fn index_of(&self, i: u32, j: u32, k: u32) -> SiteIndex {
        debug_assert!(i < self.extents.nx && j < self.extents.ny && k < self.extents.nz);
        SiteIndex(i + self.extents.nx * (j + self.extents.ny * k))
    }

    /// Unflatten a site index to its `(i, j, k)` coordinate.
    pub fn coords_of(&self, index: SiteIndex) -> (u32, u32, u32) {
        let n = index.0;
        let i = n % self.extents.nx;
        let j = (n / self.extents.nx) % self.extents.ny;
        let k = n / (self.extents.nx * self.extents.ny);
        (i, j, k)
    }

    /// Continuous location of a site (lattice coordinate × spacing).
    pub fn location(&self, index: SiteIndex) -> [f64; 3] {
        let (i, j, k) = self.coords_of(index);
        [
            f64::from(i) * self.spacing,
            f64::from(j) * self.spacing,
            f64::from(k) * self.spacing,
        ]
    }

    /// All site locations in canonical order.
    pub fn locations(&self) -> Vec<[f64; 3]> {
        (0..self.site_count() as u32)
            .map(|n| self.location(SiteIndex(n)))
            .collect()
    }

    /// The distinct neighbours of a site, in offset-table order.
    pub fn neighbours(&self, index: SiteIndex) -> &[SiteIndex] {
        &self.neighbours[index.as_usize()]
    }

    /// Grid metadata for frame bundles produced on this lattice.
    pub fn meta(&self) -> GridMeta {
        GridMeta {
            extents: (self.extents.nx, self.extents.ny, self.extents.nz),
            origin: [0.0; 3],
            spacing: self.spacing,
        }
    }
}

/// Compute one site's clamped, self-filtered, deduplicated neighbour list.
fn site_neighbours(
    extents: Extents,
    index: usize,
    offsets: &[(i32, i32, i32)],
) -> SmallVec<[SiteIndex; 6]> {
    let nx = extents.nx;
    let ny = extents.ny;
    let i = (index as u32 % nx) as i32;
    let j = ((index as u32 / nx) % ny) as i32;
    let k = (index as u32 / (nx * ny)) as i32;

    let mut list: SmallVec<[SiteIndex; 6]> = SmallVec::new();
    for &(dx, dy, dz) in offsets {
        let ni = (i + dx).clamp(0, extents.nx as i32 - 1) as u32;
        let nj = (j + dy).clamp(0, extents.ny as i32 - 1) as u32;
        let nk = (k + dz).clamp(0, extents.nz as i32 - 1) as u32;
        let neighbour = SiteIndex(ni + nx * (nj + ny * nk));
        if neighbour.as_usize() != index && !list.contains(&neighbour) {
            list.push(neighbour);
        }
    }
    list
}
