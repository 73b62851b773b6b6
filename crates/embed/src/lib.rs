pub mod backends;
pub mod batcher;
pub mod similarity;
pub mod traits;

pub use backends::create_embedder;
pub use batcher::EmbeddingBatcher;
pub use similarity::cosine_similarity;
pub use traits::{Embedder, EmbeddingError};
