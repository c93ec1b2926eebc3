use std::sync::Arc;

use crate::deepseek::ChatApi;
use crate::utils::{is_cjk, RefbotResult};

const SYSTEM_PROMPT: &str = "你是一位专业的学术翻译专家。请将以下英文学术内容翻译为中文。\n\
翻译要求：\n\
1. 保持学术风格，翻译准确流畅\n\
2. 专业术语保留英文原文（用括号标注），如：卷积神经网络（CNN）\n\
3. 不要翻译LaTeX公式、数学符号、人名\n\
4. 不要添加任何解释，只输出翻译结果";

pub struct Translator {
    api: Arc<dyn ChatApi>,
}

impl Translator {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self { api }
    }

    /// 判断文本是否已含中文
    pub fn is_chinese(text: &str) -> bool {
        text.chars().any(is_cjk)
    }

    /// 翻译为中文
    pub async fn translate_to_chinese(&self, text: &str) -> RefbotResult<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        self.api.chat(SYSTEM_PROMPT, text, false).await
    }
}
