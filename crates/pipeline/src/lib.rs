pub mod category;
pub mod clusterer;
pub mod competitor;
pub mod embed_phase;
pub mod enrich;
pub mod filter;
pub mod geo;
pub mod merger;
pub mod normalize;
pub mod scorer;
pub mod synth;
pub mod tag;
pub mod trend;
