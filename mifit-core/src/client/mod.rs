//! Mi Fit API client
//!
//! Three calls make up the remote side of a sync:
//!
//! - **login**: exchange an authorization code for an app token
//! - **history**: list track summaries
//! - **detail**: fetch one track's full record
//!
//! The [`MifitApi`] trait is what [`crate::Session`] talks to. The HTTP
//! implementation is async (reqwest); [`BlockingMifitClient`] drives it on a
//! private current-thread runtime so that callers stay synchronous.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mifit_core::client::{BlockingMifitClient, MifitApi};
//! use mifit_core::config::ApiConfig;
//!
//! let client = BlockingMifitClient::new(ApiConfig::default()).expect("client");
//! let token = client.exchange_code("authorization-code").expect("login");
//! let listing = client.fetch_listing(&token).expect("listing");
//! println!("{} tracks", listing.summary.len());
//! ```

mod http;
mod payload;

pub use http::{BlockingMifitClient, MifitClient};

use crate::error::Result;
use crate::types::{AppToken, Details, Listing, TrackId};

/// Remote operations needed by a sync.
///
/// Implementations block until the call completes.
pub trait MifitApi {
    /// Exchange an authorization code for an app token.
    ///
    /// Fails with [`crate::Error::Authentication`].
    fn exchange_code(&self, code: &str) -> Result<AppToken>;

    /// Fetch the activity listing.
    ///
    /// Fails with [`crate::Error::RemoteFetch`].
    fn fetch_listing(&self, token: &AppToken) -> Result<Listing>;

    /// Fetch the details of one track.
    ///
    /// Fails with [`crate::Error::RemoteFetch`].
    fn fetch_detail(&self, token: &AppToken, id: TrackId, source: &str) -> Result<Details>;
}
