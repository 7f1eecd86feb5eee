use std::error::Error;
use std::fmt;
use std::io;

use crate::frame::FrameError;

#[derive(Debug)]
pub enum ClientError {
    IoError { source: io::Error },
    FrameError { source: FrameError },
    ConnectionError(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClientError::IoError { source } => write!(f, "An I/O error occurred: {}", source),
            ClientError::FrameError { source } => {
                write!(f, "An error occurred while framing a message: {}", source)
            }
            ClientError::ConnectionError(s) => write!(f, "Connection error: {}", s),
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(source: io::Error) -> Self {
        Self::IoError { source }
    }
}

impl From<FrameError> for ClientError {
    fn from(source: FrameError) -> Self {
        Self::FrameError { source }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IoError { source } => Some(source),
            Self::FrameError { source } => Some(source),
            _ => None,
        }
    }
}
