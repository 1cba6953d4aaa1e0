// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Zero-copy reinterpretation of allocated buffers.
//!
//! Every operation here returns a new descriptor over the same memory with
//! [`Origin::SubView`]. Such descriptors never own memory and cannot be freed.

use crate::{
    descriptor::{BufferDescriptor, ImageView, Origin, TensorView, View},
    error::{bad_args, unsupported, Error, Result},
    format::{ImageFormat, TensorType},
};
use tracing::{debug, error};

impl BufferDescriptor {
    fn check_allocated(&self) -> Result<()> {
        if !self.is_allocated() {
            return Err(Error::InvalidBuffer("buffer is not allocated".to_owned()));
        }
        Ok(())
    }

    fn borrowed(&self, view: View, offset: usize, valid_size: usize) -> Result<BufferDescriptor> {
        match offset.checked_add(valid_size) {
            Some(end) if end <= self.total_size => {}
            _ => {
                error!(
                    "view {}+{} exceeds buffer {} of {} bytes",
                    offset, valid_size, self.id, self.total_size
                );
                return Err(Error::OutOfBounds(format!(
                    "view {offset}+{valid_size} exceeds {} bytes",
                    self.total_size
                )));
            }
        }
        Ok(BufferDescriptor {
            offset,
            valid_size,
            origin: Origin::SubView,
            view,
            ..self.clone()
        })
    }

    /// Carves logical item `batch_index` out of a batched image or tensor.
    ///
    /// For an image, `channel` further narrows the view to one plane of the
    /// item, and the result describes only that plane. The result has a batch
    /// of one and shares the parent's memory.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBuffer`] if the descriptor is not allocated
    /// - [`Error::Unsupported`] for raw buffers
    /// - [`Error::BadArguments`] if `batch_index` or `channel` is out of range,
    ///   or a channel is given for a tensor
    /// - [`Error::OutOfBounds`] if the view would run past the allocation
    pub fn sub_view(&self, batch_index: u32, channel: Option<u32>) -> Result<BufferDescriptor> {
        self.check_allocated()?;
        let c = match (channel, &self.view) {
            (None, _) => return self.sub_view_range(batch_index, 1),
            (Some(_), View::Tensor(_)) => {
                return Err(bad_args("tensors have no channel planes"))
            }
            (Some(c), _) => c as usize,
        };
        let item = self.sub_view_range(batch_index, 1)?;
        let img = item.image()?;
        if c >= img.num_planes() {
            return Err(bad_args(format!(
                "channel {c} out of range for {} planes",
                img.num_planes()
            )));
        }

        let planes = img.planes();
        let offset = item.offset + planes[..c].iter().map(|p| p.size).sum::<usize>();
        let view = ImageView::new(img.format, 1, img.width, img.height, &planes[c..=c]);
        debug!("plane {} of item {} in {}: offset {}", c, batch_index, self.id, offset);
        self.borrowed(View::Image(view), offset, planes[c].size)
    }

    /// Views `count` consecutive items starting at `first` of a batched image
    /// or tensor.
    ///
    /// The result keeps the per-item layout with a batch of `count`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBuffer`] if the descriptor is not allocated
    /// - [`Error::Unsupported`] for raw buffers
    /// - [`Error::BadArguments`] if `count` is zero or the range runs past
    ///   the batch
    /// - [`Error::OutOfBounds`] if the view would run past the allocation
    pub fn sub_view_range(&self, first: u32, count: u32) -> Result<BufferDescriptor> {
        self.check_allocated()?;

        let (view, item) = match self.view {
            View::Raw => return Err(unsupported("raw buffers have no batch")),
            View::Image(img) => {
                let item = self.batch_item(first, count, img.batch_size)?;
                let view = ImageView {
                    batch_size: count,
                    ..img
                };
                (View::Image(view), item)
            }
            View::Tensor(t) => {
                let item = self.batch_item(first, count, t.dims()[0])?;
                let mut view = t;
                view.dims[0] = count;
                (View::Tensor(view), item)
            }
        };
        let offset = self.offset + first as usize * item;
        debug!(
            "{} sub-view {}..{} of {}: offset {}",
            self.kind(),
            first,
            first as u64 + count as u64,
            self.id,
            offset
        );
        self.borrowed(view, offset, count as usize * item)
    }

    fn batch_item(&self, first: u32, count: u32, batch: u32) -> Result<usize> {
        if count == 0 || first >= batch || count > batch - first {
            return Err(bad_args(format!(
                "batch range {first}+{count} out of range for batch {batch}"
            )));
        }
        Ok(self.valid_size / batch as usize)
    }

    /// Reinterprets a packed RGB888, BGR888 or UYVY image as a
    /// `[batch, height, width, channels]` tensor of `UFIXED8`.
    ///
    /// Rows must not be padded: the stride has to equal `width * bpp` and the
    /// allocated height the logical height.
    pub fn image_to_tensor(&self) -> Result<BufferDescriptor> {
        self.check_allocated()?;
        let img = self
            .as_image()
            .ok_or_else(|| unsupported(format!("{} buffer is not an image", self.kind())))?;

        if !matches!(
            img.format,
            ImageFormat::Rgb888 | ImageFormat::Bgr888 | ImageFormat::Uyvy
        ) {
            error!("{} cannot be viewed as a single tensor", img.format);
            return Err(unsupported(format!(
                "{} cannot be viewed as a single tensor",
                img.format
            )));
        }

        let bpp = img.format.bytes_per_pixel();
        let plane = img.planes()[0];
        let row = img.width as usize * bpp as usize;
        if plane.stride as usize != row || plane.actual_height != img.height {
            return Err(unsupported(format!(
                "{} stride {} rows {} is padded beyond {}x{}",
                img.format, plane.stride, plane.actual_height, img.width, img.height
            )));
        }

        let item = row * img.height as usize;
        if img.batch_size > 1 && plane.size != item {
            return Err(unsupported(format!(
                "batched {} items are padded to {} bytes",
                img.format, plane.size
            )));
        }

        let view = TensorView::new(
            TensorType::Ufixed8,
            &[img.batch_size, img.height, img.width, bpp],
        );
        self.borrowed(
            View::Tensor(view),
            self.offset,
            img.batch_size as usize * item,
        )
    }

    /// Splits a single NV12 or P010 image into a luma tensor `[1, h, w, 1]`
    /// and an interleaved chroma tensor `[1, h/2, w/2, 2]`.
    ///
    /// The chroma tensor starts right after the first plane.
    pub fn image_to_luma_chroma(&self) -> Result<(BufferDescriptor, BufferDescriptor)> {
        self.check_allocated()?;
        let img = self
            .as_image()
            .ok_or_else(|| unsupported(format!("{} buffer is not an image", self.kind())))?;

        let element_type = match img.format {
            ImageFormat::Nv12 => TensorType::Ufixed8,
            ImageFormat::P010 => TensorType::Ufixed16,
            f => {
                error!("{} has no luma/chroma split", f);
                return Err(unsupported(format!("{f} has no luma/chroma split")));
            }
        };
        if img.num_planes() != 2 {
            return Err(unsupported(format!(
                "luma/chroma split needs both planes, view has {}",
                img.num_planes()
            )));
        }
        if img.batch_size != 1 {
            return Err(unsupported(format!(
                "luma/chroma split needs batch 1, got {}",
                img.batch_size
            )));
        }
        if img.width % 2 != 0 || img.height % 2 != 0 {
            return Err(unsupported(format!(
                "{} {}x{} is not evenly subsampled",
                img.format, img.width, img.height
            )));
        }

        let bpp = img.format.bytes_per_pixel() as usize;
        let row = img.width as usize * bpp;
        if img.planes().iter().any(|p| p.stride as usize != row) {
            return Err(unsupported(format!(
                "{} rows are padded beyond {} bytes",
                img.format, row
            )));
        }

        let (w, h) = (img.width, img.height);
        let luma_size = w as usize * h as usize * bpp;
        let luma = self.borrowed(
            View::Tensor(TensorView::new(element_type, &[1, h, w, 1])),
            self.offset,
            luma_size,
        )?;
        let chroma = self.borrowed(
            View::Tensor(TensorView::new(element_type, &[1, h / 2, w / 2, 2])),
            self.offset + img.planes()[0].size,
            luma_size / 2,
        )?;
        Ok((luma, chroma))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        descriptor::{BufferDescriptor, ImageView, Origin, PlaneLayout, TensorView, View},
        error::ErrorKind,
        format::{ImageFormat, TensorType},
    };
    use std::ptr::NonNull;

    fn fake(view: View, size: usize) -> BufferDescriptor {
        BufferDescriptor {
            data: Some(NonNull::dangling()),
            handle: 1,
            total_size: size,
            valid_size: size,
            id: 1,
            origin: Origin::Allocated,
            view,
            ..Default::default()
        }
    }

    fn nv12(width: u32, height: u32) -> BufferDescriptor {
        let luma = PlaneLayout {
            stride: width,
            actual_height: height,
            size: (width * height) as usize,
        };
        let chroma = PlaneLayout {
            stride: width,
            actual_height: height / 2,
            size: (width * height / 2) as usize,
        };
        let view = ImageView::new(ImageFormat::Nv12, 1, width, height, &[luma, chroma]);
        fake(View::Image(view), luma.size + chroma.size)
    }

    #[test]
    fn channel_selects_plane() {
        let desc = nv12(64, 32);
        let chroma = desc.sub_view(0, Some(1)).unwrap();
        assert_eq!(chroma.offset(), 64 * 32);
        assert_eq!(chroma.valid_size(), 64 * 16);
        assert_eq!(chroma.origin(), Origin::SubView);
        assert_eq!(
            desc.sub_view(0, Some(2)).unwrap_err().kind(),
            ErrorKind::BadArguments
        );
    }

    #[test]
    fn channel_view_is_one_plane() {
        let desc = nv12(64, 32);
        let chroma = desc.sub_view(0, Some(1)).unwrap();
        let img = chroma.image().unwrap();
        assert_eq!(img.num_planes(), 1);
        assert_eq!(img.planes()[0].size, 64 * 16);

        let again = chroma.sub_view(0, Some(0)).unwrap();
        assert_eq!(again.offset(), chroma.offset());
        assert_eq!(again.valid_size(), chroma.valid_size());
        assert_eq!(
            chroma.sub_view(0, Some(1)).unwrap_err().kind(),
            ErrorKind::BadArguments
        );
        assert_eq!(
            chroma.image_to_luma_chroma().unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn view_past_end_is_rejected() {
        let mut desc = nv12(64, 32);
        desc.total_size = 64 * 32;
        assert_eq!(
            desc.sub_view(0, Some(1)).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
        assert_eq!(
            desc.image_to_luma_chroma().unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
    }

    #[test]
    fn batch_range() {
        let plane = PlaneLayout {
            stride: 30,
            actual_height: 10,
            size: 300,
        };
        let view = ImageView::new(ImageFormat::Rgb888, 4, 10, 10, &[plane]);
        let desc = fake(View::Image(view), 1200);

        let range = desc.sub_view_range(1, 3).unwrap();
        assert_eq!(range.offset(), 300);
        assert_eq!(range.valid_size(), 900);
        assert_eq!(range.image().unwrap().batch_size, 3);
        assert_eq!(range.origin(), Origin::SubView);

        let last = range.sub_view(2, None).unwrap();
        assert_eq!(last.offset(), 900);
        assert_eq!(last.valid_size(), 300);

        let tensor = range.image_to_tensor().unwrap();
        assert_eq!(tensor.tensor().unwrap().dims(), &[3, 10, 10, 3]);
        assert_eq!(tensor.offset(), 300);

        for (first, count) in [(0, 0), (4, 1), (1, 4), (3, 2), (u32::MAX, 2)] {
            assert_eq!(
                desc.sub_view_range(first, count).unwrap_err().kind(),
                ErrorKind::BadArguments
            );
        }
        assert_eq!(desc.sub_view_range(0, 4).unwrap().valid_size(), 1200);
    }

    #[test]
    fn tensor_batch_range() {
        let view = TensorView::new(TensorType::Int16, &[6, 4]);
        let desc = fake(View::Tensor(view), 6 * 4 * 2);
        let range = desc.sub_view_range(2, 2).unwrap();
        assert_eq!(range.offset(), 16);
        assert_eq!(range.valid_size(), 16);
        assert_eq!(range.tensor().unwrap().dims(), &[2, 4]);
        assert_eq!(
            fake(View::Raw, 16).sub_view_range(0, 1).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn tensor_batch() {
        let view = TensorView::new(TensorType::Float32, &[4, 8, 8]);
        let desc = fake(View::Tensor(view), 4 * 8 * 8 * 4);
        let sub = desc.sub_view(2, None).unwrap();
        assert_eq!(sub.offset(), 2 * 256);
        assert_eq!(sub.valid_size(), 256);
        assert_eq!(sub.tensor().unwrap().dims(), &[1, 8, 8]);
        assert_eq!(
            desc.sub_view(4, None).unwrap_err().kind(),
            ErrorKind::BadArguments
        );
        assert_eq!(
            desc.sub_view(0, Some(0)).unwrap_err().kind(),
            ErrorKind::BadArguments
        );
    }

    #[test]
    fn nested_sub_view_keeps_offset() {
        let plane = PlaneLayout {
            stride: 30,
            actual_height: 10,
            size: 300,
        };
        let view = ImageView::new(ImageFormat::Rgb888, 4, 10, 10, &[plane]);
        let desc = fake(View::Image(view), 1200);
        let item = desc.sub_view(3, None).unwrap();
        assert_eq!(item.offset(), 900);
        let tensor = item.image_to_tensor().unwrap();
        assert_eq!(tensor.offset(), 900);
        assert_eq!(tensor.valid_size(), 300);
        assert_eq!(tensor.tensor().unwrap().dims(), &[1, 10, 10, 3]);
    }

    #[test]
    fn raw_and_unallocated() {
        let raw = fake(View::Raw, 16);
        assert_eq!(raw.sub_view(0, None).unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(raw.image_to_tensor().unwrap_err().kind(), ErrorKind::Unsupported);

        let empty = BufferDescriptor::default();
        assert_eq!(
            empty.sub_view(0, None).unwrap_err().kind(),
            ErrorKind::InvalidBuffer
        );
        assert_eq!(
            empty.image_to_luma_chroma().unwrap_err().kind(),
            ErrorKind::InvalidBuffer
        );
    }

    #[test]
    fn luma_chroma_odd_sizes() {
        assert_eq!(
            nv12(64, 31).image_to_luma_chroma().unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        let (luma, chroma) = nv12(64, 32).image_to_luma_chroma().unwrap();
        assert_eq!(luma.tensor().unwrap().dims(), &[1, 32, 64, 1]);
        assert_eq!(chroma.tensor().unwrap().dims(), &[1, 16, 32, 2]);
        assert_eq!(chroma.offset(), luma.valid_size());
    }
}
