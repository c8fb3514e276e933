pub mod pipeline;

pub use pipeline::{AssetOutcome, AssetPipeline};
