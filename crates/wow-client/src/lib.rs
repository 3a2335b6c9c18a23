//! Word-of-wisdom protocol client: connects, mints a proof of work, and
//! redeems it for a quote.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod error;
mod session;

pub use error::ClientError;
pub use session::{KEEP_ALIVE_INTERVAL, run_client_session};
