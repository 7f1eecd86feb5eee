use std::error::Error;
use std::fmt;
use std::io;

use crate::frame::FrameError;

/// Errors that can arise while the server is running.
///
/// Protocol/transport failures and persistence failures both end up here;
/// callers distinguish them by variant, per the error handling design's
/// four-way partition: protocol failure tears the session down,
/// persistence failure is reported to the caller but the in-memory
/// mutation still stands.
#[derive(Debug)]
pub enum ServerError {
    /// An I/O error occurred on a socket or a data file.
    IoError { source: io::Error },
    /// An error occurred while framing a message on the wire.
    FrameError { source: FrameError },
    /// The client table has no free slot.
    ServerFull,
    /// The requested username is already claimed by a live session.
    UsernameTaken,
    /// The supplied username fails the character/length rules.
    InvalidUsername,
    /// A user record could not be found.
    NoSuchUser,
    /// The supplied password did not match the stored one.
    WrongPassword,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServerError::IoError { source } => write!(f, "An I/O error occurred: {}", source),
            ServerError::FrameError { source } => {
                write!(f, "An error occurred while framing a message: {}", source)
            }
            ServerError::ServerFull => write!(f, "Server is at max capacity."),
            ServerError::UsernameTaken => write!(f, "That username is already in use."),
            ServerError::InvalidUsername => {
                write!(f, "Usernames must be 1-31 alphanumeric characters.")
            }
            ServerError::NoSuchUser => write!(f, "No such user."),
            ServerError::WrongPassword => write!(f, "Incorrect password."),
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(source: io::Error) -> Self {
        Self::IoError { source }
    }
}

impl From<FrameError> for ServerError {
    fn from(source: FrameError) -> Self {
        Self::FrameError { source }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IoError { source } => Some(source),
            Self::FrameError { source } => Some(source),
            _ => None,
        }
    }
}
