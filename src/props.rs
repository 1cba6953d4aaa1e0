// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Allocation requests.
//!
//! A [`Properties`] value describes the buffer a caller wants; the layout
//! calculators turn it into a concrete [`View`](crate::descriptor::View) and
//! byte size.

use crate::format::{ImageFormat, TensorType, Usage};

/// An untyped buffer of `size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawProps {
    pub size: usize,
}

/// An image described by geometry only; strides and plane heights come from
/// the plane oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBasicProps {
    pub format: ImageFormat,
    pub batch_size: u32,
    pub width: u32,
    pub height: u32,
}

/// Caller supplied geometry of one plane.
///
/// A zero `size` is filled in as `stride * actual_height`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaneProps {
    pub stride: u32,
    pub actual_height: u32,
    pub size: usize,
}

/// An image with explicit per-plane layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageProps {
    pub format: ImageFormat,
    pub batch_size: u32,
    pub width: u32,
    pub height: u32,
    pub planes: Vec<PlaneProps>,
}

/// A tensor of `dims` elements of `element_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorProps {
    pub element_type: TensorType,
    pub dims: Vec<u32>,
}

/// Everything an allocation can be asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Properties {
    Raw(RawProps),
    ImageBasic(ImageBasicProps),
    Image(ImageProps),
    Tensor(TensorProps),
}

impl Properties {
    /// Usage hint applied when the caller does not pick one.
    pub fn default_usage(&self) -> Usage {
        match self {
            Properties::Raw(_) => Usage::Default,
            Properties::ImageBasic(_) | Properties::Image(_) => Usage::Camera,
            Properties::Tensor(_) => Usage::Htp,
        }
    }
}

impl From<RawProps> for Properties {
    fn from(value: RawProps) -> Self {
        Properties::Raw(value)
    }
}

impl From<ImageBasicProps> for Properties {
    fn from(value: ImageBasicProps) -> Self {
        Properties::ImageBasic(value)
    }
}

impl From<ImageProps> for Properties {
    fn from(value: ImageProps) -> Self {
        Properties::Image(value)
    }
}

impl From<TensorProps> for Properties {
    fn from(value: TensorProps) -> Self {
        Properties::Tensor(value)
    }
}
