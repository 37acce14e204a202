// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! The error taxonomy shared by every component of the driver.
//!
//! Kinds, not types: each variant names a disposition (fatal to the
//! session, recoverable, config-build failure) rather than a specific
//! failure site, mirroring how the session loop and device state
//! machine actually branch on errors.

use std::fmt;
use std::io;

/// Every fallible operation in this crate returns one of these kinds.
#[derive(Debug)]
pub enum Error {
    /// Wire framing violation: bad length prefix, oversized frame, truncated header.
    Malformed(String),
    /// Device type or message id not supported by this driver.
    Unsupported(String),
    /// Registration denied by policy: unknown device, registry collision, no guest slot.
    PolicyDenied(String),
    /// Auth timer or keepalive watchdog expired.
    Timeout(TimeoutKind),
    /// Socket read/write/poll failure.
    TransportError(io::Error),
    /// An invariant was violated; the device is torn down and counted.
    Panic(String),
    /// Configuration snapshot failed to build; the previous snapshot remains live.
    Config(String),
    /// The command queue has been closed and rejects further puts.
    QueueClosed,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TimeoutKind {
    Auth,
    Keepalive,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Malformed(s) => write!(f, "malformed frame: {}", s),
            Error::Unsupported(s) => write!(f, "unsupported: {}", s),
            Error::PolicyDenied(s) => write!(f, "policy denied: {}", s),
            Error::Timeout(TimeoutKind::Auth) => write!(f, "authentication timer expired"),
            Error::Timeout(TimeoutKind::Keepalive) => write!(f, "keepalive watchdog expired"),
            Error::TransportError(e) => write!(f, "transport error: {}", e),
            Error::Panic(s) => write!(f, "invariant violated: {}", s),
            Error::Config(s) => write!(f, "configuration error: {}", s),
            Error::QueueClosed => write!(f, "command queue is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::TransportError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::TransportError(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
