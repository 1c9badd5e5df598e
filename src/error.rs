use thiserror::Error;

/// Every operation fails with exactly one of these; `errno` recovers the
/// POSIX code a dispatch layer would report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("region too small or not a filesystem")]
    BadRegion,
    #[error("no such file or directory")]
    NotFound,
    #[error("file exists")]
    Exists,
    #[error("file name too long")]
    NameTooLong,
    #[error("is a directory")]
    IsADirectory,
    #[error("not a directory")]
    NotADirectory,
    #[error("directory not empty")]
    NotEmpty,
    #[error("out of filesystem memory")]
    OutOfMemory,
    #[error("resource busy")]
    Busy,
    #[error("invalid path")]
    InvalidPath,
}

impl FsError {
    pub fn errno(&self) -> i32 {
        match self {
            FsError::BadRegion => libc::EFAULT,
            FsError::NotFound => libc::ENOENT,
            FsError::Exists => libc::EEXIST,
            FsError::NameTooLong => libc::ENAMETOOLONG,
            FsError::IsADirectory => libc::EISDIR,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::NotEmpty => libc::ENOTEMPTY,
            FsError::OutOfMemory => libc::ENOMEM,
            FsError::Busy => libc::EBUSY,
            FsError::InvalidPath => libc::EINVAL,
        }
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
