//! Fetching image bytes: the [`Fetcher`] capability, its blocking HTTP
//! implementation, wrapper-page resolution, retry policy and validation.

pub mod http;
pub mod retry;
pub mod validate;
pub mod wrapper;

use crate::error::Result;

pub use http::HttpFetcher;
pub use retry::RetryPolicy;

/// Network access as the downloader sees it.
pub trait Fetcher {
    /// Lightweight metadata request. `Ok(None)` means the server did not
    /// report a size.
    fn probe(&self, url: &str) -> Result<Option<u64>>;

    /// Retrieve the image bytes, following a wrapper page if one is served.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn probe(&self, url: &str) -> Result<Option<u64>> {
        (**self).probe(url)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}
