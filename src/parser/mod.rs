use std::path::Path;
use tracing::{info, warn};

use crate::utils::{RefbotError, RefbotResult};

pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }

    /// 提取PDF完整文本
    pub fn extract_full_text(&self, pdf_path: &Path) -> RefbotResult<String> {
        info!("提取PDF文本: {}", pdf_path.display());

        if !pdf_path.exists() {
            return Err(RefbotError::PdfError(format!(
                "PDF文件不存在: {}",
                pdf_path.display()
            )));
        }

        let text = pdf_extract::extract_text(pdf_path).map_err(|e| {
            RefbotError::PdfError(format!("无法读取 {}: {}", pdf_path.display(), e))
        })?;

        if text.trim().is_empty() {
            warn!("PDF中未提取到文本内容: {}", pdf_path.display());
        } else {
            info!("提取文本长度: {} 字符", text.len());
        }

        Ok(text)
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}
