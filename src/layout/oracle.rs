// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    error::{bad_args, unsupported, Error, Result},
    format::ImageFormat,
};

/// Per-plane answer of a [`PlaneOracle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub stride: u32,
    pub actual_height: u32,
    pub plane_size: usize,
    /// Extra bytes appended after the plane
    pub padding: usize,
}

/// Source of hardware plane geometry for a format.
///
/// Hardware consumers dictate stride and row alignment, so image layouts in
/// by-geometry mode are delegated to an oracle instead of being computed from
/// the format tables alone.
pub trait PlaneOracle: Send + Sync {
    /// Number of memory planes for `format`.
    fn plane_count(&self, format: ImageFormat) -> Result<usize>;

    /// Geometry of `plane` for a `width` x `height` image.
    fn plane_layout(
        &self,
        format: ImageFormat,
        width: u32,
        height: u32,
        plane: usize,
    ) -> Result<PlaneGeometry>;
}

/// Software oracle for linear (non-tiled) formats.
///
/// Rows are padded to `stride_align` bytes, plane heights to `height_align`
/// rows and whole planes to `size_align` bytes. Vendor compressed layouts are
/// not linear and are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearPlanes {
    stride_align: u32,
    height_align: u32,
    size_align: usize,
}

impl Default for LinearPlanes {
    fn default() -> Self {
        LinearPlanes {
            stride_align: 128,
            height_align: 16,
            size_align: 4096,
        }
    }
}

impl LinearPlanes {
    /// Creates an oracle with custom alignments, each a power of two.
    pub fn new(stride_align: u32, height_align: u32, size_align: usize) -> Result<Self> {
        if !stride_align.is_power_of_two()
            || !height_align.is_power_of_two()
            || !size_align.is_power_of_two()
        {
            return Err(bad_args(format!(
                "alignments must be powers of two: stride {stride_align} height {height_align} size {size_align}"
            )));
        }
        Ok(LinearPlanes {
            stride_align,
            height_align,
            size_align,
        })
    }

    pub fn stride_align(&self) -> u32 {
        self.stride_align
    }

    pub fn height_align(&self) -> u32 {
        self.height_align
    }

    pub fn size_align(&self) -> usize {
        self.size_align
    }
}

fn align_u64(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

fn too_large(format: ImageFormat, width: u32, height: u32) -> Error {
    Error::Fail(format!("{format} {width}x{height} exceeds the plane geometry range"))
}

impl PlaneOracle for LinearPlanes {
    fn plane_count(&self, format: ImageFormat) -> Result<usize> {
        match format {
            ImageFormat::Nv12Ubwc | ImageFormat::Tp10Ubwc => {
                Err(unsupported(format!("{format} needs a vendor plane oracle")))
            }
            f if f.is_compressed() => Err(bad_args(format!("{f} has no plane geometry"))),
            f => Ok(f.num_planes()),
        }
    }

    fn plane_layout(
        &self,
        format: ImageFormat,
        width: u32,
        height: u32,
        plane: usize,
    ) -> Result<PlaneGeometry> {
        if plane >= self.plane_count(format)? {
            return Err(bad_args(format!("{format} has no plane {plane}")));
        }

        let row = width as u64 * format.bytes_per_pixel() as u64;
        let rows = (height as u64).div_ceil(format.height_divider(plane) as u64);

        let stride = u32::try_from(align_u64(row, self.stride_align as u64))
            .map_err(|_| too_large(format, width, height))?;
        let actual_height = u32::try_from(align_u64(rows, self.height_align as u64))
            .map_err(|_| too_large(format, width, height))?;
        let plane_size = stride as u64 * actual_height as u64;
        let aligned = align_u64(plane_size, self.size_align as u64);
        if aligned > u32::MAX as u64 {
            return Err(too_large(format, width, height));
        }

        Ok(PlaneGeometry {
            stride,
            actual_height,
            plane_size: plane_size as usize,
            padding: (aligned - plane_size) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn nv12_4k() {
        let oracle = LinearPlanes::default();
        let luma = oracle.plane_layout(ImageFormat::Nv12, 3840, 2160, 0).unwrap();
        assert_eq!(luma.stride, 3840);
        assert_eq!(luma.actual_height, 2160);
        assert_eq!(luma.plane_size, 3840 * 2160);
        assert_eq!(luma.padding, 0);

        let chroma = oracle.plane_layout(ImageFormat::Nv12, 3840, 2160, 1).unwrap();
        assert_eq!(chroma.stride, 3840);
        assert_eq!(chroma.actual_height, 1088);
        assert_eq!((chroma.plane_size + chroma.padding) % 4096, 0);
    }

    #[test]
    fn odd_geometry_is_padded() {
        let oracle = LinearPlanes::default();
        let g = oracle.plane_layout(ImageFormat::Bgr888, 1013, 753, 0).unwrap();
        assert_eq!(g.stride, 3072);
        assert_eq!(g.actual_height, 768);
        assert!(g.stride >= 1013 * 3);
    }

    #[test]
    fn rejects() {
        let oracle = LinearPlanes::default();
        assert_eq!(
            oracle.plane_count(ImageFormat::Nv12Ubwc).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            oracle.plane_layout(ImageFormat::Rgb888, 64, 64, 1).unwrap_err().kind(),
            ErrorKind::BadArguments
        );
        assert_eq!(
            oracle
                .plane_layout(ImageFormat::Rgb888, u32::MAX, 2, 0)
                .unwrap_err()
                .kind(),
            ErrorKind::Fail
        );
        assert!(LinearPlanes::new(100, 16, 4096).is_err());
        assert!(LinearPlanes::new(64, 2, 1).is_ok());
    }
}
