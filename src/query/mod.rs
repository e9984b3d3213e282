//! Remote query cache.
//!
//! Reads are cached per [`QueryKey`] and gated on session and scope; writes go
//! through [`QueryClient::mutate`], which invalidates the affected kinds only
//! after the remote call succeeds.

mod cache;
mod coalesce;
mod key;
mod view;

pub use cache::QueryClient;
pub use coalesce::{Claim, Flight, QueryCoalescer};
pub use key::{QueryKey, QueryParams, ResourceKind};
pub use view::ViewGuard;
