//! Gateway status documents: parsing, normalization and link census.

mod census;
mod metric;
mod model;
mod normalize;
mod tree;
mod uptime;

pub use census::*;
pub use metric::*;
pub use model::*;
pub use normalize::normalize;
pub use tree::*;

use thiserror::Error;

/// A status document that cannot be turned into a [`GatewayStatus`].
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("malformed status XML: {0}")]
    Xml(String),
    #[error("status document has no gateway element")]
    MissingGateway,
}

/// Parse and normalize a raw `status.xml` body.
pub fn parse_status_document(body: &[u8]) -> Result<GatewayStatus, StatusError> {
    let tree = parse_document(body)?;
    normalize(&tree)
}
