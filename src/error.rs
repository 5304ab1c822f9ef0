// 错误类型
//
// 只有脚本文件的读写失败会跨越模块边界报告给调用者；
// 无法识别的脚本行、越界访问、生长死路都在内部处理。

use std::path::PathBuf;
use thiserror::Error;

/// 生成器对外报告的错误
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// 脚本文件无法读取
    #[error("failed to load script {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 脚本文件无法写入
    #[error("failed to save script {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件无效
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// 单行 agent 脚本解析错误
///
/// 加载器遇到这种错误时跳过该行，继续加载其余内容。
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}
