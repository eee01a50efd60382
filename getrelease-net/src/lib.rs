// getrelease-net/src/lib.rs
pub mod api;
pub mod http;
pub mod validation;

pub use api::ForgeClient;
pub use http::{build_http_client, HttpFetcher};
pub use validation::{find_checksum, sha256_file, validate_url, verify_checksum};
