// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Error types for buffer allocation, layout and sharing.

use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the descriptor, layout, registry and manager APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller supplied property or argument failed validation.
    #[error("bad arguments: {0}")]
    BadArguments(String),

    /// The descriptor is not in a state that allows the operation.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),

    /// The buffer kind or format does not support the operation.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The operation crosses an ownership boundary.
    #[error("out of bound: {0}")]
    OutOfBounds(String),

    /// The descriptor already holds memory.
    #[error("buffer already allocated")]
    AlreadyAllocated,

    /// The memory provider could not satisfy the request.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// A collaborator (plane oracle or memory provider) failed.
    #[error("failed: {0}")]
    Fail(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless mirror of [`Error`] for matching without caring about the
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadArguments,
    InvalidBuffer,
    Unsupported,
    OutOfBounds,
    AlreadyAllocated,
    OutOfMemory,
    Fail,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadArguments(_) => ErrorKind::BadArguments,
            Error::InvalidBuffer(_) => ErrorKind::InvalidBuffer,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::OutOfBounds(_) => ErrorKind::OutOfBounds,
            Error::AlreadyAllocated => ErrorKind::AlreadyAllocated,
            Error::OutOfMemory(_) => ErrorKind::OutOfMemory,
            Error::Fail(_) => ErrorKind::Fail,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

pub(crate) fn bad_args(msg: impl Into<String>) -> Error {
    Error::BadArguments(msg.into())
}

pub(crate) fn unsupported(msg: impl Into<String>) -> Error {
    Error::Unsupported(msg.into())
}
