// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Pixel formats, tensor element types and buffer attributes.
//!
//! The per-format constant tables (bytes per pixel, plane count, plane height
//! dividers) are what hardware consumers agree on, so they are kept as plain
//! `const fn` lookups rather than data read at runtime.

use crate::error::{bad_args, Error};
use serde::Serialize;
use std::{fmt, str::FromStr};

/// Maximum number of planes an image buffer can describe.
pub const MAX_IMAGE_PLANES: usize = 4;

/// Maximum number of tensor dimensions.
pub const MAX_TENSOR_DIMS: usize = 8;

/// Image pixel formats.
///
/// Values below [`ImageFormat::COMPRESSED_MIN`] are uncompressed raster
/// formats with a fixed plane structure; the compressed range holds encoded
/// bitstreams stored in a single plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ImageFormat {
    /// Packed 24-bit RGB
    Rgb888 = 0,
    /// Packed 24-bit BGR
    Bgr888 = 1,
    /// Packed 4:2:2 YUV
    Uyvy = 2,
    /// 4:2:0 YUV semi-planar, 8-bit
    Nv12 = 3,
    /// 4:2:0 YUV semi-planar, 10-bit in 16-bit words
    P010 = 4,
    /// Vendor compressed NV12 (two data planes plus two metadata planes)
    Nv12Ubwc = 5,
    /// Vendor compressed 10-bit 4:2:0
    Tp10Ubwc = 6,
    /// H.264 elementary stream
    H264 = 100,
    /// H.265 elementary stream
    H265 = 101,
}

impl ImageFormat {
    pub const COMPRESSED_MIN: u32 = 100;

    /// All known formats in value order.
    pub const ALL: [ImageFormat; 9] = [
        ImageFormat::Rgb888,
        ImageFormat::Bgr888,
        ImageFormat::Uyvy,
        ImageFormat::Nv12,
        ImageFormat::P010,
        ImageFormat::Nv12Ubwc,
        ImageFormat::Tp10Ubwc,
        ImageFormat::H264,
        ImageFormat::H265,
    ];

    pub const fn is_compressed(self) -> bool {
        self as u32 >= Self::COMPRESSED_MIN
    }

    /// Bytes per pixel of the first plane. Zero for compressed formats.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            ImageFormat::Rgb888 | ImageFormat::Bgr888 => 3,
            ImageFormat::Uyvy => 2,
            ImageFormat::Nv12 => 1,
            ImageFormat::P010 => 2,
            ImageFormat::Nv12Ubwc => 1,
            ImageFormat::Tp10Ubwc => 2,
            ImageFormat::H264 | ImageFormat::H265 => 0,
        }
    }

    /// Number of memory planes the format occupies.
    pub const fn num_planes(self) -> usize {
        match self {
            ImageFormat::Rgb888 | ImageFormat::Bgr888 | ImageFormat::Uyvy => 1,
            ImageFormat::Nv12 | ImageFormat::P010 => 2,
            ImageFormat::Nv12Ubwc | ImageFormat::Tp10Ubwc => 4,
            ImageFormat::H264 | ImageFormat::H265 => 1,
        }
    }

    /// Vertical subsampling of `plane`: the plane holds `height / divider`
    /// logical rows.
    pub const fn height_divider(self, plane: usize) -> u32 {
        match self {
            ImageFormat::Nv12 | ImageFormat::P010 => {
                if plane == 0 {
                    1
                } else {
                    2
                }
            }
            ImageFormat::Nv12Ubwc | ImageFormat::Tp10Ubwc => {
                if plane < 2 {
                    1
                } else {
                    2
                }
            }
            _ => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ImageFormat::Rgb888 => "RGB888",
            ImageFormat::Bgr888 => "BGR888",
            ImageFormat::Uyvy => "UYVY",
            ImageFormat::Nv12 => "NV12",
            ImageFormat::P010 => "P010",
            ImageFormat::Nv12Ubwc => "NV12_UBWC",
            ImageFormat::Tp10Ubwc => "TP10_UBWC",
            ImageFormat::H264 => "H264",
            ImageFormat::H265 => "H265",
        }
    }
}

impl TryFrom<u32> for ImageFormat {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        ImageFormat::ALL
            .into_iter()
            .find(|f| *f as u32 == value)
            .ok_or_else(|| bad_args(format!("unknown image format {value}")))
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageFormat::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| bad_args(format!("unknown image format {s}")))
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tensor element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum TensorType {
    Int8 = 0,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float16,
    Float32,
    Float64,
    /// Signed fixed point, 8-bit
    Sfixed8,
    /// Signed fixed point, 16-bit
    Sfixed16,
    /// Signed fixed point, 32-bit
    Sfixed32,
    /// Unsigned fixed point, 8-bit
    Ufixed8,
    /// Unsigned fixed point, 16-bit
    Ufixed16,
    /// Unsigned fixed point, 32-bit
    Ufixed32,
}

impl TensorType {
    pub const ALL: [TensorType; 17] = [
        TensorType::Int8,
        TensorType::Int16,
        TensorType::Int32,
        TensorType::Int64,
        TensorType::Uint8,
        TensorType::Uint16,
        TensorType::Uint32,
        TensorType::Uint64,
        TensorType::Float16,
        TensorType::Float32,
        TensorType::Float64,
        TensorType::Sfixed8,
        TensorType::Sfixed16,
        TensorType::Sfixed32,
        TensorType::Ufixed8,
        TensorType::Ufixed16,
        TensorType::Ufixed32,
    ];

    /// Size of one element in bytes.
    pub const fn byte_width(self) -> usize {
        match self {
            TensorType::Int8 | TensorType::Uint8 | TensorType::Sfixed8 | TensorType::Ufixed8 => 1,
            TensorType::Int16
            | TensorType::Uint16
            | TensorType::Float16
            | TensorType::Sfixed16
            | TensorType::Ufixed16 => 2,
            TensorType::Int32
            | TensorType::Uint32
            | TensorType::Float32
            | TensorType::Sfixed32
            | TensorType::Ufixed32 => 4,
            TensorType::Int64 | TensorType::Uint64 | TensorType::Float64 => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TensorType::Int8 => "INT8",
            TensorType::Int16 => "INT16",
            TensorType::Int32 => "INT32",
            TensorType::Int64 => "INT64",
            TensorType::Uint8 => "UINT8",
            TensorType::Uint16 => "UINT16",
            TensorType::Uint32 => "UINT32",
            TensorType::Uint64 => "UINT64",
            TensorType::Float16 => "FLOAT16",
            TensorType::Float32 => "FLOAT32",
            TensorType::Float64 => "FLOAT64",
            TensorType::Sfixed8 => "SFIXED8",
            TensorType::Sfixed16 => "SFIXED16",
            TensorType::Sfixed32 => "SFIXED32",
            TensorType::Ufixed8 => "UFIXED8",
            TensorType::Ufixed16 => "UFIXED16",
            TensorType::Ufixed32 => "UFIXED32",
        }
    }
}

impl TryFrom<u32> for TensorType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        TensorType::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| bad_args(format!("unknown tensor type {value}")))
    }
}

impl FromStr for TensorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TensorType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| bad_args(format!("unknown tensor type {s}")))
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hint describing which engine will touch the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Usage {
    #[default]
    Default,
    Camera,
    Gpu,
    /// Video codec
    Vpu,
    /// Computer vision engine
    Eva,
    /// Neural network accelerator
    Htp,
}

/// CPU cacheability of the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Cache {
    #[serde(rename = "NONE")]
    None,
    /// Write-back, write-allocate
    #[default]
    #[serde(rename = "WB_WA")]
    WriteBack,
}

/// The view a descriptor carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    Raw,
    Image,
    Tensor,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BufferKind::Raw => f.write_str("raw"),
            BufferKind::Image => f.write_str("image"),
            BufferKind::Tensor => f.write_str("tensor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_tables() {
        assert_eq!(ImageFormat::Nv12.num_planes(), 2);
        assert_eq!(ImageFormat::Nv12.height_divider(0), 1);
        assert_eq!(ImageFormat::Nv12.height_divider(1), 2);
        assert_eq!(ImageFormat::Tp10Ubwc.height_divider(1), 1);
        assert_eq!(ImageFormat::Tp10Ubwc.height_divider(3), 2);
        assert_eq!(ImageFormat::P010.bytes_per_pixel(), 2);
        assert!(ImageFormat::H265.is_compressed());
        assert!(!ImageFormat::Tp10Ubwc.is_compressed());
    }

    #[test]
    fn raw_codes() {
        assert_eq!(ImageFormat::try_from(4).unwrap(), ImageFormat::P010);
        assert_eq!(ImageFormat::try_from(101).unwrap(), ImageFormat::H265);
        assert!(ImageFormat::try_from(7).is_err());
        assert!(ImageFormat::try_from(102).is_err());

        assert_eq!(TensorType::try_from(8).unwrap(), TensorType::Float16);
        assert_eq!(TensorType::Float16.byte_width(), 2);
        assert!(TensorType::try_from(17).is_err());
    }

    #[test]
    fn names_parse() {
        assert_eq!("nv12_ubwc".parse::<ImageFormat>().unwrap(), ImageFormat::Nv12Ubwc);
        assert_eq!("ufixed16".parse::<TensorType>().unwrap(), TensorType::Ufixed16);
        assert!("YUYV".parse::<ImageFormat>().is_err());
        assert_eq!(
            serde_json::to_string(&ImageFormat::Nv12Ubwc).unwrap(),
            "\"NV12_UBWC\""
        );
        assert_eq!(serde_json::to_string(&Cache::WriteBack).unwrap(), "\"WB_WA\"");
    }
}
