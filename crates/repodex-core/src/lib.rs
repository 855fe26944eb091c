pub mod cancel;
pub mod error;
pub mod extractor;
pub mod models;

pub use cancel::CancellationToken;
pub use error::{CoordinateError, ExtractionError, UnknownExtractor};
pub use extractor::{ArtifactExtractor, ExtractorRegistry};
pub use models::*;
