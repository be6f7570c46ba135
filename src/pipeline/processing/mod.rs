// Pipeline processing: cleaning, validation, normalization, enrichment and persistence

pub mod catalog;
pub mod enrich;
pub mod normalize;
pub mod sanitize;
pub mod validate;
