//! Remote catalog sources.

mod error;
mod socrata;
mod traits;
mod types;

pub use error::SourceError;
pub use socrata::SocrataSource;
pub use traits::CatalogSource;
pub use types::ResourceHeaders;
