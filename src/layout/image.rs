// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use super::oracle::PlaneOracle;
use crate::{
    descriptor::{ImageView, PlaneLayout},
    error::{bad_args, Error, Result},
    format::{ImageFormat, MAX_IMAGE_PLANES},
    props::{ImageBasicProps, ImageProps},
};
use tracing::error;

fn check_geometry(format: ImageFormat, batch_size: u32, width: u32, height: u32) -> Result<()> {
    if batch_size == 0 || width == 0 || height == 0 {
        error!(
            "invalid image {} {}x{} batch {}",
            format, width, height, batch_size
        );
        return Err(bad_args(format!(
            "{format} {width}x{height} batch {batch_size}: dimensions must be non-zero"
        )));
    }
    Ok(())
}

/// Lays out an image from its geometry, asking `oracle` for each plane.
///
/// Returns the view and the total byte size of the batch.
pub fn layout_basic(oracle: &dyn PlaneOracle, props: &ImageBasicProps) -> Result<(ImageView, usize)> {
    let ImageBasicProps {
        format,
        batch_size,
        width,
        height,
    } = *props;
    check_geometry(format, batch_size, width, height)?;
    if format.is_compressed() {
        return Err(bad_args(format!(
            "{format} needs an explicit buffer size"
        )));
    }

    let num_planes = oracle.plane_count(format)?;
    if num_planes == 0 || num_planes > MAX_IMAGE_PLANES {
        return Err(Error::Fail(format!(
            "plane oracle reported {num_planes} planes for {format}"
        )));
    }

    let mut planes = [PlaneLayout::default(); MAX_IMAGE_PLANES];
    let mut item = 0usize;
    for (i, plane) in planes.iter_mut().enumerate().take(num_planes) {
        let g = oracle.plane_layout(format, width, height, i)?;
        *plane = PlaneLayout {
            stride: g.stride,
            actual_height: g.actual_height,
            size: g.plane_size + g.padding,
        };
        item += plane.size;
    }

    let total = item
        .checked_mul(batch_size as usize)
        .ok_or_else(|| Error::Fail(format!("{format} batch {batch_size} overflows")))?;
    Ok((
        ImageView::new(format, batch_size, width, height, &planes[..num_planes]),
        total,
    ))
}

/// Validates caller supplied plane geometry and fills in missing plane sizes.
///
/// Returns the view and the total byte size. Compressed formats are a single
/// plane holding the bitstream and are never multiplied by the batch size.
pub fn layout_explicit(props: &ImageProps) -> Result<(ImageView, usize)> {
    let ImageProps {
        format,
        batch_size,
        width,
        height,
        ref planes,
    } = *props;
    check_geometry(format, batch_size, width, height)?;

    if format.is_compressed() {
        if planes.len() != 1 {
            return Err(bad_args(format!(
                "{format} takes 1 plane, got {}",
                planes.len()
            )));
        }
        if planes[0].size == 0 {
            error!("compressed {} buffer without a size", format);
            return Err(bad_args(format!("{format} buffer size must be non-zero")));
        }
        let plane = PlaneLayout {
            stride: planes[0].stride,
            actual_height: planes[0].actual_height,
            size: planes[0].size,
        };
        return Ok((
            ImageView::new(format, batch_size, width, height, &[plane]),
            plane.size,
        ));
    }

    if planes.len() != format.num_planes() {
        error!(
            "{} expects {} planes, got {}",
            format,
            format.num_planes(),
            planes.len()
        );
        return Err(bad_args(format!(
            "{format} takes {} planes, got {}",
            format.num_planes(),
            planes.len()
        )));
    }

    let row = width as u64 * format.bytes_per_pixel() as u64;
    let mut layouts = [PlaneLayout::default(); MAX_IMAGE_PLANES];
    let mut item = 0usize;
    for (i, p) in planes.iter().enumerate() {
        if row > p.stride as u64 {
            error!("plane {} stride {} too small for {}", i, p.stride, row);
            return Err(bad_args(format!(
                "plane {i} stride {} is smaller than {row}",
                p.stride
            )));
        }
        let rows = height / format.height_divider(i);
        if rows > p.actual_height {
            return Err(bad_args(format!(
                "plane {i} actual height {} is smaller than {rows}",
                p.actual_height
            )));
        }
        let min = p.stride as usize * p.actual_height as usize;
        if p.size != 0 && p.size < min {
            return Err(bad_args(format!(
                "plane {i} size {} is smaller than {min}",
                p.size
            )));
        }
        layouts[i] = PlaneLayout {
            stride: p.stride,
            actual_height: p.actual_height,
            size: if p.size == 0 { min } else { p.size },
        };
        item += layouts[i].size;
    }

    let total = item
        .checked_mul(batch_size as usize)
        .ok_or_else(|| bad_args(format!("{format} batch {batch_size} overflows")))?;
    Ok((
        ImageView::new(format, batch_size, width, height, &layouts[..planes.len()]),
        total,
    ))
}
