//! Capability traits at the pipeline's I/O seams.

pub mod fetcher;
pub mod model;
pub mod store;

pub use fetcher::{FetchedPage, PageFetcher};
pub use model::{FieldSpec, ModelExtractor, ModelFields, ModelResponse, NoModel};
pub use store::ProductStore;
