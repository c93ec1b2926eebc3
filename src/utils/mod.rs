pub mod logger;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RefbotError {
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("网络请求错误: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("API错误: {0}")]
    ApiError(String),

    #[error("PDF处理错误: {0}")]
    PdfError(String),
}

pub type RefbotResult<T> = Result<T, RefbotError>;

/// 是否为 CJK 统一表意文字
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// 生成安全的 PDF 文件名：去掉文件系统非法字符，标题截断到 100 字符
pub fn safe_filename(title: &str, number: i64) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(100).collect();
    format!("{}_{}.pdf", number, truncated.trim())
}
