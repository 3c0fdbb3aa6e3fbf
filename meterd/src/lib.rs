//! Modbus RTU polling daemon for multi-phase grid power meters.
//!
//! Device families ("producers") map the shared measurement vocabulary onto
//! their register layout; the query engine executes each producer's
//! operation list against its serial link and publishes one timestamped
//! [`meterd_common::Reading`] per successful poll cycle.
//!
//! # Data flow
//!
//! ```text
//! registry -> producer -> operations -> engine -> transport
//!                                         |
//!                                decoded reading snapshot
//!                                         v
//!                                  mpsc channel -> consumer
//! ```

pub mod config;
pub mod decode;
pub mod engine;
pub mod producer;
pub mod sdm;
pub mod transport;
