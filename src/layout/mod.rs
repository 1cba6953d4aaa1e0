// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Layout calculators.
//!
//! Turn allocation [`Properties`] into a concrete [`View`] and the number of
//! bytes to request from the memory provider. No memory is touched here.

pub mod image;
mod oracle;
pub mod tensor;

pub use oracle::{LinearPlanes, PlaneGeometry, PlaneOracle};

use crate::{
    descriptor::View,
    error::{bad_args, Result},
    props::Properties,
};

/// Computes the view and byte size for `props`.
pub fn compute(oracle: &dyn PlaneOracle, props: &Properties) -> Result<(View, usize)> {
    match props {
        Properties::Raw(raw) => {
            if raw.size == 0 {
                return Err(bad_args("raw buffer size must be non-zero"));
            }
            Ok((View::Raw, raw.size))
        }
        Properties::ImageBasic(p) => {
            image::layout_basic(oracle, p).map(|(view, size)| (View::Image(view), size))
        }
        Properties::Image(p) => {
            image::layout_explicit(p).map(|(view, size)| (View::Image(view), size))
        }
        Properties::Tensor(p) => tensor::layout(p).map(|(view, size)| (View::Tensor(view), size)),
    }
}
