//! 错误类型定义
//!
//! 装载期错误（配置、校准数据）必须在处理任何题目之前被拒绝；
//! 题目处理路径上的异常一律降级为低置信度结果，不在此定义。

use thiserror::Error;

/// 识别系统错误类型
#[derive(Debug, Error)]
pub enum RecogError {
    /// 某类别的复核阈值高于接受阈值
    #[error("阈值配置不合法: 类别 {class} 的复核阈值 {review} 大于接受阈值 {accept}")]
    InvalidThresholdPair {
        class: &'static str,
        review: f64,
        accept: f64,
    },

    /// 阈值或置信度常量超出 [0,1]
    #[error("配置值超出范围 [0,1]: {name} = {value}")]
    ValueOutOfRange { name: String, value: f64 },

    /// 校准映射断点不满足单调非减
    #[error("校准数据不满足单调性: 类别 {class}")]
    NonMonotonicCalibration { class: String },

    /// 校准映射断点数量不一致或为空
    #[error("校准数据断点不合法: 类别 {class} ({x_len} 个 x 断点, {y_len} 个 y 断点)")]
    MalformedCalibration {
        class: String,
        x_len: usize,
        y_len: usize,
    },

    /// 校准数据中出现未知类别标签
    #[error("校准数据包含未知类别: {label}")]
    UnknownCalibrationClass { label: String },

    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 识别系统结果类型别名
pub type RecogResult<T> = Result<T, RecogError>;
