/// Volumetric scalar images and their on-disk format
///
/// A volume file is a small binary container: the magic `MVOL`, three
/// little-endian `u32` dimensions, three `f32` voxel spacings, then one
/// little-endian `i32` sample per voxel with x varying fastest.
use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use nom::{
    bytes::complete::tag,
    multi::count,
    number::complete::{le_f32, le_i32, le_u32},
    sequence::tuple,
    IResult,
};
use tracing::debug;

use crate::error::SourceError;

const MAGIC: &[u8] = b"MVOL";

/// Largest grid a volume may hold (1 GiB of `f32` samples).
pub const MAX_VOXELS: usize = 1 << 28;

/// A regular grid of scalar samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    dims: [usize; 3],
    spacing: Vector3<f32>,
    samples: Vec<f32>,
}

impl Volume {
    pub fn new(
        dims: [usize; 3],
        spacing: Vector3<f32>,
        samples: Vec<f32>,
    ) -> Result<Self, SourceError> {
        let expected = voxel_count(dims)?;
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(SourceError::Volume(format!(
                "voxel spacing must be positive, got ({}, {}, {})",
                spacing.x, spacing.y, spacing.z
            )));
        }
        if samples.len() != expected {
            return Err(SourceError::Volume(format!(
                "{dims:?} needs {expected} samples, got {}",
                samples.len()
            )));
        }
        Ok(Self {
            dims,
            spacing,
            samples,
        })
    }

    /// Build a volume by evaluating `f` at every voxel index.
    pub fn from_fn(
        dims: [usize; 3],
        spacing: Vector3<f32>,
        f: impl Fn(usize, usize, usize) -> f32,
    ) -> Result<Self, SourceError> {
        let mut samples = Vec::with_capacity(voxel_count(dims)?);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    samples.push(f(x, y, z));
                }
            }
        }
        Self::new(dims, spacing, samples)
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn spacing(&self) -> Vector3<f32> {
        self.spacing
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.samples[x + self.dims[0] * (y + self.dims[1] * z)]
    }

    /// Trilinear sample at fractional voxel coordinates, clamped to the grid.
    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let (x0, x1, tx) = lerp_cell(x, self.dims[0]);
        let (y0, y1, ty) = lerp_cell(y, self.dims[1]);
        let (z0, z1, tz) = lerp_cell(z, self.dims[2]);

        let plane = |z: usize| {
            let a = lerp(self.get(x0, y0, z), self.get(x1, y0, z), tx);
            let b = lerp(self.get(x0, y1, z), self.get(x1, y1, z), tx);
            lerp(a, b, ty)
        };
        lerp(plane(z0), plane(z1), tz)
    }

    /// Central-difference gradient in physical units, one-sided at the borders.
    pub fn gradient(&self, x: usize, y: usize, z: usize) -> Vector3<f32> {
        let axis = |i: usize, n: usize, at: &dyn Fn(usize) -> f32, h: f32| {
            let lo = i.saturating_sub(1);
            let hi = (i + 1).min(n - 1);
            if hi == lo {
                0.0
            } else {
                (at(hi) - at(lo)) / ((hi - lo) as f32 * h)
            }
        };
        Vector3::new(
            axis(x, self.dims[0], &|i| self.get(i, y, z), self.spacing.x),
            axis(y, self.dims[1], &|i| self.get(x, i, z), self.spacing.y),
            axis(z, self.dims[2], &|i| self.get(x, y, i), self.spacing.z),
        )
    }
}

/// Number of voxels in a grid of `dims`, rejecting empty and oversized grids.
fn voxel_count(dims: [usize; 3]) -> Result<usize, SourceError> {
    if dims.iter().any(|&d| d == 0) {
        return Err(SourceError::Volume(format!("zero dimension in {dims:?}")));
    }
    dims[0]
        .checked_mul(dims[1])
        .and_then(|n| n.checked_mul(dims[2]))
        .filter(|&n| n <= MAX_VOXELS)
        .ok_or_else(|| {
            SourceError::Volume(format!("{dims:?} exceeds the limit of {MAX_VOXELS} voxels"))
        })
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp_cell(coord: f32, n: usize) -> (usize, usize, f32) {
    let max = (n - 1) as f32;
    let c = coord.clamp(0.0, max);
    let i0 = c.floor() as usize;
    let i1 = (i0 + 1).min(n - 1);
    (i0, i1, c - i0 as f32)
}

/// Read a volume file from disk.
pub fn read_volume(path: &Path) -> Result<Volume, SourceError> {
    let data = fs::read(path).map_err(|e| SourceError::from_io(path, e))?;
    let volume = parse_volume(&data)?;
    debug!(path = %path.display(), dims = ?volume.dims(), "Read volume");
    Ok(volume)
}

/// Parse the `MVOL` container.
pub fn parse_volume(data: &[u8]) -> Result<Volume, SourceError> {
    let (body, (dims, spacing)) = volume_header(data)
        .map_err(|_| SourceError::Volume("missing or short MVOL header".to_string()))?;

    let dims = dims.map(|d| d as usize);
    let voxels = voxel_count(dims)?;
    if body.len() / 4 < voxels {
        return Err(SourceError::Volume(format!(
            "unexpected end of file: {voxels} voxels need {} bytes, found {}",
            voxels * 4,
            body.len()
        )));
    }

    let (_, raw) = count(le_i32::<_, nom::error::Error<_>>, voxels)(body)
        .map_err(|_| SourceError::Volume("malformed voxel data".to_string()))?;
    Volume::new(dims, spacing, raw.into_iter().map(|v| v as f32).collect())
}

fn volume_header(input: &[u8]) -> IResult<&[u8], ([u32; 3], Vector3<f32>)> {
    let (input, _) = tag(MAGIC)(input)?;
    let (input, (nx, ny, nz)) = tuple((le_u32, le_u32, le_u32))(input)?;
    let (input, (sx, sy, sz)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, ([nx, ny, nz], Vector3::new(sx, sy, sz))))
}

/// Resample `volume` by `factor` on every axis with trilinear interpolation.
///
/// Each output dimension is `max(1, round(d * factor))`. With `preserve_aspect`
/// the voxel spacing shrinks by `factor` so the physical size and proportions
/// stay the same; without it the result uses unit spacing.
pub fn scale(volume: &Volume, factor: f32, preserve_aspect: bool) -> Result<Volume, SourceError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(SourceError::Volume(format!("scale factor must be positive, got {factor}")));
    }

    let src = volume.dims();
    let dims = src.map(|d| ((d as f32 * factor).round() as usize).max(1));
    voxel_count(dims)?;
    let step = |axis: usize| {
        if dims[axis] > 1 {
            (src[axis] - 1) as f32 / (dims[axis] - 1) as f32
        } else {
            0.0
        }
    };
    let (sx, sy, sz) = (step(0), step(1), step(2));

    let resampled = Volume::from_fn(dims, volume.spacing(), |x, y, z| {
        volume.sample(x as f32 * sx, y as f32 * sy, z as f32 * sz)
    })?;
    let spacing = if preserve_aspect {
        volume.spacing() / factor
    } else {
        Vector3::repeat(1.0)
    };

    debug!(from = ?src, to = ?dims, factor, "Resampled volume");
    Volume::new(dims, spacing, resampled.samples)
}
