// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Buffer descriptors.
//!
//! A [`BufferDescriptor`] carries the fields common to every shared buffer
//! (mapping, handle, sizes, ownership) and exactly one [`View`] describing how
//! the bytes are interpreted: raw, image or tensor.

use crate::{
    error::{Error, Result},
    format::{BufferKind, Cache, ImageFormat, TensorType, Usage, MAX_IMAGE_PLANES, MAX_TENSOR_DIMS},
};
use serde::Serialize;
use std::{
    fmt,
    ptr::NonNull,
    slice::{from_raw_parts, from_raw_parts_mut},
};

/// Geometry of one image plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaneLayout {
    /// Bytes per row
    pub stride: u32,
    /// Allocated rows, at least the logical height divided by the plane's
    /// height divider
    pub actual_height: u32,
    /// Bytes occupied by the plane including padding
    pub size: usize,
}

/// Image interpretation of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageView {
    pub format: ImageFormat,
    /// Number of logical images stored back to back
    pub batch_size: u32,
    pub width: u32,
    pub height: u32,
    pub(crate) num_planes: usize,
    pub(crate) planes: [PlaneLayout; MAX_IMAGE_PLANES],
}

impl ImageView {
    pub(crate) fn new(
        format: ImageFormat,
        batch_size: u32,
        width: u32,
        height: u32,
        planes: &[PlaneLayout],
    ) -> Self {
        let mut view = ImageView {
            format,
            batch_size,
            width,
            height,
            num_planes: planes.len(),
            planes: [PlaneLayout::default(); MAX_IMAGE_PLANES],
        };
        view.planes[..planes.len()].copy_from_slice(planes);
        view
    }

    pub fn num_planes(&self) -> usize {
        self.num_planes
    }

    pub fn planes(&self) -> &[PlaneLayout] {
        &self.planes[..self.num_planes]
    }

    /// Bytes of one logical image, the sum of its plane sizes.
    pub fn item_size(&self) -> usize {
        self.planes().iter().map(|p| p.size).sum()
    }
}

impl Serialize for ImageView {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("ImageView", 5)?;
        s.serialize_field("format", &self.format)?;
        s.serialize_field("batch_size", &self.batch_size)?;
        s.serialize_field("width", &self.width)?;
        s.serialize_field("height", &self.height)?;
        s.serialize_field("planes", self.planes())?;
        s.end()
    }
}

/// Tensor interpretation of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorView {
    pub element_type: TensorType,
    pub(crate) num_dims: usize,
    pub(crate) dims: [u32; MAX_TENSOR_DIMS],
}

impl TensorView {
    pub(crate) fn new(element_type: TensorType, dims: &[u32]) -> Self {
        let mut view = TensorView {
            element_type,
            num_dims: dims.len(),
            dims: [0; MAX_TENSOR_DIMS],
        };
        view.dims[..dims.len()].copy_from_slice(dims);
        view
    }

    pub fn dims(&self) -> &[u32] {
        &self.dims[..self.num_dims]
    }

    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    /// Bytes spanned by the tensor.
    pub fn byte_size(&self) -> usize {
        self.dims()
            .iter()
            .fold(self.element_type.byte_width(), |acc, d| acc * *d as usize)
    }
}

impl Serialize for TensorView {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("TensorView", 2)?;
        s.serialize_field("element_type", &self.element_type)?;
        s.serialize_field("dims", self.dims())?;
        s.end()
    }
}

/// How the bytes of a descriptor are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Raw,
    Image(ImageView),
    Tensor(TensorView),
}

impl View {
    pub fn kind(&self) -> BufferKind {
        match self {
            View::Raw => BufferKind::Raw,
            View::Image(_) => BufferKind::Image,
            View::Tensor(_) => BufferKind::Tensor,
        }
    }
}

impl Serialize for View {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "kind", rename_all = "lowercase")]
        enum Repr<'a> {
            Raw,
            Image(&'a ImageView),
            Tensor(&'a TensorView),
        }

        let repr = match self {
            View::Raw => Repr::Raw,
            View::Image(img) => Repr::Image(img),
            View::Tensor(t) => Repr::Tensor(t),
        };
        repr.serialize(serializer)
    }
}

/// Relationship between a descriptor and the memory it references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// No memory attached
    #[default]
    Unallocated,
    /// Memory allocated by this process; the descriptor owns it
    Allocated,
    /// Memory of another process mapped into this one
    Imported,
    /// Borrowed window into another descriptor's memory
    SubView,
}

/// A shared buffer as seen by the current process.
///
/// Descriptors are plain values: cloning copies the description, never the
/// memory. Only the descriptor returned by an allocation may free the memory
/// and only an imported descriptor may be unimported.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BufferDescriptor {
    #[serde(skip)]
    pub(crate) data: Option<NonNull<u8>>,
    pub(crate) handle: u64,
    pub(crate) total_size: usize,
    pub(crate) valid_size: usize,
    pub(crate) offset: usize,
    pub(crate) id: u64,
    pub(crate) pid: u32,
    pub(crate) cache: Cache,
    pub(crate) usage: Usage,
    pub(crate) origin: Origin,
    #[serde(flatten)]
    pub(crate) view: View,
}

// The mapping address is only dereferenced through the unsafe slice
// accessors, whose callers take responsibility for synchronisation.
unsafe impl Send for BufferDescriptor {}
unsafe impl Sync for BufferDescriptor {}

impl BufferDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> BufferKind {
        self.view.kind()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn as_image(&self) -> Option<&ImageView> {
        match &self.view {
            View::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&TensorView> {
        match &self.view {
            View::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Image view of the descriptor, or [`Error::InvalidBuffer`] for other
    /// kinds.
    pub fn image(&self) -> Result<&ImageView> {
        self.as_image()
            .ok_or_else(|| Error::InvalidBuffer(format!("{} buffer is not an image", self.kind())))
    }

    /// Tensor view of the descriptor, or [`Error::InvalidBuffer`] for other
    /// kinds.
    pub fn tensor(&self) -> Result<&TensorView> {
        self.as_tensor()
            .ok_or_else(|| Error::InvalidBuffer(format!("{} buffer is not a tensor", self.kind())))
    }

    pub fn is_allocated(&self) -> bool {
        self.origin != Origin::Unallocated && self.data.is_some()
    }

    /// Base address of the whole mapping.
    pub fn base_ptr(&self) -> Option<NonNull<u8>> {
        self.data
    }

    /// Address of the first valid byte, the base address plus the offset.
    pub fn data_ptr(&self) -> Option<NonNull<u8>> {
        self.data
            .map(|base| unsafe { NonNull::new_unchecked(base.as_ptr().add(self.offset)) })
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn valid_size(&self) -> usize {
        self.valid_size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn cache(&self) -> Cache {
        self.cache
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// View the valid bytes of the buffer.
    ///
    /// Returns an empty slice when the descriptor is not allocated.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - The memory has not been freed or unimported through another copy of
    ///   this descriptor
    /// - No hardware engine or other process writes the region while the slice
    ///   is alive
    pub unsafe fn as_slice(&self) -> &[u8] {
        match self.data_ptr() {
            Some(ptr) => from_raw_parts(ptr.as_ptr(), self.valid_size),
            None => &[],
        }
    }

    /// Mutable view of the valid bytes of the buffer.
    ///
    /// # Safety
    ///
    /// Same requirements as [`BufferDescriptor::as_slice`]; in addition no
    /// other slice over the same region may be alive, including slices
    /// obtained through sub-views or imports of this buffer.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut_slice(&self) -> &mut [u8] {
        match self.data_ptr() {
            Some(ptr) => from_raw_parts_mut(ptr.as_ptr(), self.valid_size),
            None => &mut [],
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = BufferDescriptor::default();
    }
}

impl fmt::Display for BufferDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "id:{} pid:{} handle:{} size:{}/{} offset:{} {:?} {:?} {}",
            self.id,
            self.pid,
            self.handle,
            self.valid_size,
            self.total_size,
            self.offset,
            self.cache,
            self.usage,
            self.kind()
        )?;
        match &self.view {
            View::Raw => Ok(()),
            View::Image(img) => {
                write!(
                    f,
                    " {} {}x{} batch:{}",
                    img.format, img.width, img.height, img.batch_size
                )?;
                let strides: Vec<_> = img.planes().iter().map(|p| p.stride).collect();
                let heights: Vec<_> = img.planes().iter().map(|p| p.actual_height).collect();
                let sizes: Vec<_> = img.planes().iter().map(|p| p.size).collect();
                write!(
                    f,
                    " stride:{:?} actual_height:{:?} plane_size:{:?}",
                    strides, heights, sizes
                )
            }
            View::Tensor(t) => write!(f, " {} dims:{:?}", t.element_type, t.dims()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcasts() {
        let mut desc = BufferDescriptor::new();
        assert_eq!(desc.kind(), BufferKind::Raw);
        assert!(desc.as_image().is_none());
        assert!(matches!(desc.image(), Err(Error::InvalidBuffer(_))));

        desc.view = View::Tensor(TensorView::new(TensorType::Uint8, &[1, 2, 3]));
        assert_eq!(desc.kind(), BufferKind::Tensor);
        assert_eq!(desc.tensor().unwrap().dims(), &[1, 2, 3]);
        assert_eq!(desc.tensor().unwrap().byte_size(), 6);
        assert!(desc.as_image().is_none());
    }

    #[test]
    fn unallocated_defaults() {
        let desc = BufferDescriptor::default();
        assert!(!desc.is_allocated());
        assert_eq!(desc.origin(), Origin::Unallocated);
        assert_eq!(desc.cache(), Cache::WriteBack);
        assert!(desc.data_ptr().is_none());
        assert!(unsafe { desc.as_slice() }.is_empty());
    }

    #[test]
    fn display_and_json() {
        let mut desc = BufferDescriptor::new();
        let planes = [
            PlaneLayout {
                stride: 1920,
                actual_height: 1088,
                size: 1920 * 1088,
            },
            PlaneLayout {
                stride: 1920,
                actual_height: 544,
                size: 1920 * 544,
            },
        ];
        desc.view = View::Image(ImageView::new(ImageFormat::Nv12, 1, 1920, 1080, &planes));
        let text = desc.to_string();
        assert!(text.contains("NV12 1920x1080"), "{text}");
        assert!(text.contains("stride:[1920, 1920]"), "{text}");

        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["format"], "NV12");
        assert_eq!(json["planes"].as_array().unwrap().len(), 2);
        assert_eq!(json["planes"][1]["actual_height"], 544);
    }
}
