//! 特征工程模块

pub mod extractor;

pub use extractor::FeatureExtractor;
