pub mod decoder;
pub mod extractor;
pub mod inspector;
pub mod materialize;
pub mod pipeline;
