//! Per-step distance-to-free-space field and overflow processing order.
//!
//! Each cycle that may trigger redistribution starts by classifying
//! sites as free (zero occupancy) or occupied, computing the exact
//! Euclidean distance from every site to the nearest free site, and
//! ranking sites by descending distance. The descending order is
//! load-bearing: deeply packed interior sites resolve their overflow
//! before sites already near free space, so a later site's resolution
//! cannot invalidate an earlier decision.

use crate::error::DistanceError;
use crate::lattice::Lattice;
use stroma_core::SiteIndex;

/// Squared-distance sentinel for occupied sites before the transform.
/// Large enough to dominate any real squared lattice distance while
/// staying finite for the parabola intersection arithmetic.
const FAR: f64 = 1e20;

/// A transient snapshot of distances to free space.
///
/// Computed fresh from the current occupancy at the start of each
/// cycle; never persisted across steps or runs.
#[derive(Clone, Debug)]
pub struct DistanceField {
    distances: Vec<f64>,
    ranked: Vec<SiteIndex>,
    free_count: usize,
}

impl DistanceField {
    /// Compute the field from per-site total occupancy.
    ///
    /// A site is free iff its occupancy is exactly zero. Distances are
    /// exact Euclidean, in physical units (`spacing` per lattice step).
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::DomainSaturated`] when no site is free:
    /// the domain has no space left to absorb overflow and the run must
    /// abort rather than attempt redistribution.
    ///
    /// # Panics
    ///
    /// Panics if `occupancy.len()` differs from the lattice's site
    /// count; producer and lattice are owned by the same driver, so a
    /// mismatch is a programming error.
    pub fn compute(lattice: &Lattice, occupancy: &[f64]) -> Result<Self, DistanceError> {
        assert_eq!(
            occupancy.len(),
            lattice.site_count(),
            "occupancy length does not match lattice site count"
        );

        let free_count = occupancy.iter().filter(|&&n| n == 0.0).count();
        if free_count == 0 {
            return Err(DistanceError::DomainSaturated);
        }

        let mut squared: Vec<f64> = occupancy
            .iter()
            .map(|&n| if n == 0.0 { 0.0 } else { FAR })
            .collect();
        transform_3d(lattice, &mut squared);

        let spacing = lattice.spacing();
        let distances: Vec<f64> = squared.iter().map(|&d2| d2.sqrt() * spacing).collect();

        let mut ranked: Vec<SiteIndex> = (0..lattice.site_count() as u32).map(SiteIndex).collect();
        ranked.sort_by(|a, b| {
            distances[b.as_usize()]
                .total_cmp(&distances[a.as_usize()])
                .then(a.cmp(b))
        });

        Ok(Self {
            distances,
            ranked,
            free_count,
        })
    }

    /// Distance from a site to the nearest free site.
    pub fn distance(&self, index: SiteIndex) -> f64 {
        self.distances[index.as_usize()]
    }

    /// All distances in canonical site order.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Site indices by strictly descending distance (ties broken by
    /// ascending index) — the order overflow is resolved in.
    pub fn ranked(&self) -> &[SiteIndex] {
        &self.ranked
    }

    /// Number of free sites at computation time.
    pub fn free_count(&self) -> usize {
        self.free_count
    }
}

/// Exact squared Euclidean distance transform, one separable
/// lower-envelope pass per axis (Felzenszwalb–Huttenlocher).
fn transform_3d(lattice: &Lattice, squared: &mut [f64]) {
    let extents = lattice.extents();
    let (nx, ny, nz) = (
        extents.nx as usize,
        extents.ny as usize,
        extents.nz as usize,
    );
    let max_axis = nx.max(ny).max(nz);
    let mut line = vec![0.0; max_axis];
    let mut out = vec![0.0; max_axis];
    let mut hull = vec![0usize; max_axis];
    let mut bounds = vec![0.0; max_axis + 1];

    // x lines
    for k in 0..nz {
        for j in 0..ny {
            let base = nx * (j + ny * k);
            line[..nx].copy_from_slice(&squared[base..base + nx]);
            transform_1d(&line[..nx], &mut out[..nx], &mut hull, &mut bounds);
            squared[base..base + nx].copy_from_slice(&out[..nx]);
        }
    }
    // y lines
    for k in 0..nz {
        for i in 0..nx {
            for j in 0..ny {
                line[j] = squared[i + nx * (j + ny * k)];
            }
            transform_1d(&line[..ny], &mut out[..ny], &mut hull, &mut bounds);
            for j in 0..ny {
                squared[i + nx * (j + ny * k)] = out[j];
            }
        }
    }
    // z lines
    for j in 0..ny {
        for i in 0..nx {
            for k in 0..nz {
                line[k] = squared[i + nx * (j + ny * k)];
            }
            transform_1d(&line[..nz], &mut out[..nz], &mut hull, &mut bounds);
            for k in 0..nz {
                squared[i + nx * (j + ny * k)] = out[k];
            }
        }
    }
}

/// One-dimensional squared distance transform of the sampled function
/// `f`, writing into `out`. `hull` and `bounds` are caller-provided
/// scratch (parabola indices and intersection abscissae).
fn transform_1d(f: &[f64], out: &mut [f64], hull: &mut [usize], bounds: &mut [f64]) {
    let n = f.len();
    if n == 1 {
        out[0] = f[0];
        return;
    }

    let mut k = 0usize;
    hull[0] = 0;
    bounds[0] = f64::NEG_INFINITY;
    bounds[1] = f64::INFINITY;

    for q in 1..n {
        loop {
            let p = hull[k];
            let s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64))
                / (2.0 * (q as f64 - p as f64));
            if s <= bounds[k] {
                // Parabola q buries the current hull top.
                if k == 0 {
                    hull[0] = q;
                    bounds[1] = f64::INFINITY;
                    break;
                }
                k -= 1;
            } else {
                k += 1;
                hull[k] = q;
                bounds[k] = s;
                bounds[k + 1] = f64::INFINITY;
                break;
            }
        }
    }

    let mut k = 0usize;
    for q in 0..n {
        while bounds[k + 1] < q as f64 {
            k += 1;
        }
        let p = hull[k];
        let d = q as f64 - p as f64;
        out[q] = d * d + f[p];
    }
}
