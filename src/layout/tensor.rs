// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    descriptor::TensorView,
    error::{bad_args, Result},
    format::MAX_TENSOR_DIMS,
    props::TensorProps,
};
use tracing::error;

/// Lays out a dense tensor: the byte size is the product of the dimensions
/// times the element width.
pub fn layout(props: &TensorProps) -> Result<(TensorView, usize)> {
    let dims = &props.dims;
    if dims.is_empty() || dims.len() > MAX_TENSOR_DIMS {
        error!("invalid tensor rank {}", dims.len());
        return Err(bad_args(format!(
            "tensor rank {} outside 1..={MAX_TENSOR_DIMS}",
            dims.len()
        )));
    }
    if let Some(i) = dims.iter().position(|d| *d == 0) {
        error!("tensor dimension {} is zero in {:?}", i, dims);
        return Err(bad_args(format!("tensor dimension {i} is zero")));
    }

    let size = dims
        .iter()
        .try_fold(props.element_type.byte_width(), |acc, d| {
            acc.checked_mul(*d as usize)
        })
        .ok_or_else(|| bad_args(format!("tensor {dims:?} overflows")))?;

    Ok((TensorView::new(props.element_type, dims), size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, format::TensorType};

    #[test]
    fn dense_size() {
        let props = TensorProps {
            element_type: TensorType::Uint8,
            dims: vec![1, 128, 128, 10],
        };
        let (view, size) = layout(&props).unwrap();
        assert_eq!(size, 163840);
        assert_eq!(view.byte_size(), size);
        assert_eq!(view.dims(), &[1, 128, 128, 10]);

        let props = TensorProps {
            element_type: TensorType::Float32,
            dims: vec![2, 3],
        };
        assert_eq!(layout(&props).unwrap().1, 24);
    }

    #[test]
    fn rejects() {
        let mut props = TensorProps {
            element_type: TensorType::Uint8,
            dims: vec![1, 128, 0, 10],
        };
        assert_eq!(layout(&props).unwrap_err().kind(), ErrorKind::BadArguments);

        props.dims = vec![];
        assert_eq!(layout(&props).unwrap_err().kind(), ErrorKind::BadArguments);

        props.dims = vec![1; MAX_TENSOR_DIMS + 1];
        assert_eq!(layout(&props).unwrap_err().kind(), ErrorKind::BadArguments);

        props.dims = vec![u32::MAX; MAX_TENSOR_DIMS];
        assert_eq!(layout(&props).unwrap_err().kind(), ErrorKind::BadArguments);
    }
}
