// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst Buffer Library
//!
//! This library describes and shares the memory buffers that flow through an
//! EdgeFirst vision pipeline. Camera frames, encoder bitstreams and neural
//! network tensors all live in DMA-capable memory that several processes and
//! hardware engines access without copying.
//!
//! ## Features
//!
//! - **Typed Descriptors**: One [`BufferDescriptor`] type viewed as raw bytes,
//!   a multi-plane image or a tensor, with checked downcasts.
//! - **Layout Calculation**: Per-format stride, plane height and plane size
//!   rules for geometry-only requests or caller supplied plane layouts.
//! - **Zero-Copy Views**: Reinterpret packed images as tensors, split NV12 and
//!   P010 frames into luma and chroma tensors, and carve single items or item
//!   ranges out of a batch.
//! - **Buffer Pools**: Pre-allocate a fixed set of identical buffers and hand
//!   them out at runtime.
//! - **Cross-Process Sharing**: A registry of live buffers with pid based
//!   ownership, and import of DMA-BUF memory owned by another process.
//!
//! ## Example
//!
//! ```
//! use edgefirst_buffer::{
//!     BufferDescriptor, BufferManager, ImageBasicProps, ImageFormat, TensorProps, TensorType,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mgr = BufferManager::new();
//!
//! // A batch of four 640x480 RGB frames
//! let mut frames = BufferDescriptor::new();
//! let props = ImageBasicProps {
//!     format: ImageFormat::Rgb888,
//!     batch_size: 4,
//!     width: 640,
//!     height: 480,
//! };
//! mgr.allocate(&mut frames, &props.into())?;
//!
//! // The third frame, viewed as a [1, 480, 640, 3] tensor
//! let tensor = frames.sub_view(2, None)?.image_to_tensor()?;
//! assert_eq!(tensor.tensor()?.dims(), &[1, 480, 640, 3]);
//!
//! // A standalone tensor
//! let mut scores = BufferDescriptor::new();
//! let props = TensorProps {
//!     element_type: TensorType::Float32,
//!     dims: vec![1, 1000],
//! };
//! mgr.allocate(&mut scores, &props.into())?;
//! assert_eq!(scores.valid_size(), 4000);
//!
//! mgr.free(&mut scores)?;
//! mgr.free(&mut frames)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Requirements
//!
//! - **Linux**: Kernel 5.6+ with DMA heap support for [`DmaHeapProvider`], and
//!   `pidfd_getfd` permission (ptrace access) to import from other processes
//! - **Other platforms**: [`HeapProvider`] backs buffers with process memory
//!
//! ## Safety
//!
//! Descriptors carry raw mapping addresses. The crate never dereferences them
//! except through the `unsafe` slice accessors on [`BufferDescriptor`]; freeing
//! a buffer while sub-views or imports of it are in use must be synchronised
//! by the caller.

pub mod descriptor;
pub mod error;
pub mod format;
pub mod layout;
pub mod manager;
pub mod memory;
pub mod pool;
pub mod props;
pub mod registry;
mod view;

pub use descriptor::{BufferDescriptor, ImageView, Origin, PlaneLayout, TensorView, View};
pub use error::{Error, ErrorKind, Result};
pub use format::{
    BufferKind, Cache, ImageFormat, TensorType, Usage, MAX_IMAGE_PLANES, MAX_TENSOR_DIMS,
};
pub use layout::{LinearPlanes, PlaneGeometry, PlaneOracle};
pub use manager::{BufferManager, BufferManagerBuilder};
#[cfg(target_os = "linux")]
pub use memory::{DmaHeapProvider, HeapSource};
pub use memory::{HeapProvider, Mapping, MemoryProvider};
pub use pool::BufferPool;
pub use props::{ImageBasicProps, ImageProps, PlaneProps, Properties, RawProps, TensorProps};
pub use registry::Registry;
