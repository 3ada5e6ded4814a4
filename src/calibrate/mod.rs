//! 概率校准模块

pub mod isotonic;

pub use isotonic::{expected_calibration_error, CalibrationData, IsotonicCalibrator, IsotonicMapping};
