// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_buffer::{
    Error, ImageBasicProps, ImageFormat, ImageProps, LinearPlanes, PlaneProps, Properties,
    TensorProps, TensorType,
};

/// Memory backing for allocated buffers.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum HeapSetting {
    /// Process heap memory, not shareable with other processes
    Process,
    /// Contiguous DMA memory (/dev/dma_heap/linux,cma)
    Cma,
    /// Scattered DMA memory (/dev/dma_heap/system)
    System,
}

/// Output encoding of the report.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum OutputFormat {
    /// Pretty printed JSON
    Json,
    /// One descriptor summary per line
    Text,
}

/// Command-line arguments for the EdgeFirst buffer inspector.
///
/// Computes the memory layout of an image or tensor buffer, optionally
/// allocates it and reports the resulting descriptors. Arguments can be
/// specified via command line or environment variables.
///
/// # Example
///
/// ```bash
/// # NV12 4K frame layout
/// edgefirst-buffer --format nv12 --image-size "3840 2160"
///
/// # Allocate a batch of RGB frames from the CMA heap and show sub-views
/// edgefirst-buffer --format rgb888 --batch 4 --allocate --heap cma --views
///
/// # Tensor layout via environment variables
/// export TENSOR_DIMS="1 224 224 3"
/// export TENSOR_TYPE=float32
/// edgefirst-buffer
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image pixel format
    #[arg(long, env = "FORMAT", default_value = "NV12")]
    pub format: ImageFormat,

    /// Image resolution in pixels (width height)
    #[arg(
        long,
        env = "IMAGE_SIZE",
        default_value = "1920 1080",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub image_size: Vec<u32>,

    /// Number of images stored back to back
    #[arg(long, env = "BATCH", default_value = "1")]
    pub batch: u32,

    /// Compressed bitstream buffer size in bytes (H264/H265 only)
    #[arg(long, env = "BITSTREAM_SIZE", default_value = "0")]
    pub bitstream_size: usize,

    /// Tensor dimensions; when set a tensor is laid out instead of an image
    #[arg(long, env = "TENSOR_DIMS", value_delimiter = ' ', num_args = 1..)]
    pub tensor_dims: Option<Vec<u32>>,

    /// Tensor element type
    #[arg(long, env = "TENSOR_TYPE", default_value = "UINT8")]
    pub tensor_type: TensorType,

    /// Row alignment in bytes for geometry based image layouts
    #[arg(long, env = "STRIDE_ALIGN", default_value = "128")]
    pub stride_align: u32,

    /// Plane height alignment in rows
    #[arg(long, env = "HEIGHT_ALIGN", default_value = "16")]
    pub height_align: u32,

    /// Plane size alignment in bytes
    #[arg(long, env = "SIZE_ALIGN", default_value = "4096")]
    pub size_align: usize,

    /// Allocate the buffer instead of only computing its layout
    #[arg(long, env = "ALLOCATE")]
    pub allocate: bool,

    /// Memory backing used with --allocate
    #[arg(long, env = "HEAP", default_value = "process", value_enum)]
    pub heap: HeapSetting,

    /// Report batch sub-views and tensor reinterpretations of the buffer
    #[arg(long, env = "VIEWS")]
    pub views: bool,

    /// Report encoding
    #[arg(long, env = "OUTPUT", default_value = "json", value_enum)]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, env = "VERBOSE")]
    pub verbose: bool,
}

impl Args {
    pub fn oracle(&self) -> Result<LinearPlanes, Error> {
        LinearPlanes::new(self.stride_align, self.height_align, self.size_align)
    }

    /// Allocation request described by the arguments.
    pub fn properties(&self) -> Properties {
        if let Some(dims) = &self.tensor_dims {
            return TensorProps {
                element_type: self.tensor_type,
                dims: dims.clone(),
            }
            .into();
        }

        let (width, height) = (self.image_size[0], self.image_size[1]);
        if self.format.is_compressed() {
            return ImageProps {
                format: self.format,
                batch_size: self.batch,
                width,
                height,
                planes: vec![PlaneProps {
                    stride: 0,
                    actual_height: 0,
                    size: self.bitstream_size,
                }],
            }
            .into();
        }

        ImageBasicProps {
            format: self.format,
            batch_size: self.batch,
            width,
            height,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["edgefirst-buffer"]);
        assert_eq!(args.format, ImageFormat::Nv12);
        assert_eq!(args.image_size, vec![1920, 1080]);
        assert_eq!(args.heap, HeapSetting::Process);
        assert_eq!(args.oracle().unwrap(), LinearPlanes::default());
        assert!(matches!(args.properties(), Properties::ImageBasic(_)));
    }

    #[test]
    fn tensor_and_bitstream() {
        let args = Args::parse_from([
            "edgefirst-buffer",
            "--tensor-dims",
            "1 224 224 3",
            "--tensor-type",
            "float32",
        ]);
        match args.properties() {
            Properties::Tensor(t) => {
                assert_eq!(t.dims, vec![1, 224, 224, 3]);
                assert_eq!(t.element_type, TensorType::Float32);
            }
            p => panic!("unexpected {p:?}"),
        }

        let args = Args::parse_from([
            "edgefirst-buffer",
            "--format",
            "h265",
            "--bitstream-size",
            "65536",
        ]);
        match args.properties() {
            Properties::Image(p) => assert_eq!(p.planes[0].size, 65536),
            p => panic!("unexpected {p:?}"),
        }
    }
}
