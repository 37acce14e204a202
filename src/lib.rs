// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! A channel driver for Cisco-family SCCP (Skinny Client Control
//! Protocol) phones: the wire codec, the per-connection session loop,
//! the device/call state machine, and the configuration and registry
//! layers that tie them together.
//!
//! The driver is consumed through [`host::ChannelTechnology`] — it does
//! not assume any particular PBX is linked in. [`server::Server`] drives
//! the TCP accept loop; [`cli`] exposes the operator-facing queries.
//!
//! # Examples
//! ```no_run
//! # use sccp_driver::config::{Config, RawConfig};
//! # use sccp_driver::runtime::Runtime;
//! # use sccp_driver::server::Server;
//! # use std::sync::Arc;
//! # fn main() -> sccp_driver::error::Result<()> {
//! let raw = RawConfig::default();
//! let runtime = Arc::new(Runtime::new(Config::build(&raw)?));
//! let server = Server::bind("0.0.0.0:2000", runtime)?;
//! server.serve()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod deserializer;
pub mod device;
pub mod error;
pub mod host;
pub mod queue;
pub mod registry;
pub mod runtime;
pub mod server;
pub mod session;
pub mod stats;
pub mod task;
pub mod wire;
