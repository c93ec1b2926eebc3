use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::deepseek::ChatApi;
use crate::parser::PdfParser;
use crate::utils::{is_cjk, RefbotResult};

/// DeepSeek 上限 65536，留足提示开销
pub const TOKEN_BUDGET: usize = 55_000;
/// 预算低于此值仍超限则放弃
pub const MIN_RETRY_BUDGET: usize = 1_000;

/// 摘要提示词，要求模型仅输出固定四字段的 JSON
const PROMPT_HEADER: &str = "请根据以下论文内容，用中文（不要是英文！！！）总结要点，且缩写需给出中文全称（英文全称，英文缩写）：\n\
  (1) 涉及的现象；\n  (2) 由该现象产生的问题（问题与机制要一一对应，用（1）（2）（3）…标号）；\n\
  (3) 论文提出的机制（问题与机制要一一对应，用（1）（2）（3）…标号）；\n\
  (4) 论文实验结果（需说明具体数据集 / 环境名称；以及数据集 / 环境对应的性能具体数值）。\n\n\
⚠️ 仅输出 JSON，字段必须且只能为 phenomenon / problem / mechanism / result。\n\n";

/// 每篇论文持久化的摘要文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSummary {
    pub title: String,
    pub summary: Value,
}

/// 近似 token 计数：CJK 每字符 1 token，其余约 4 字符 1 token
pub fn estimate_tokens(text: &str) -> usize {
    let cjk = text.chars().filter(|c| is_cjk(*c)).count();
    let other = text.chars().count() - cjk;
    cjk + other / 4 + 1
}

/// 线性截断到 token 预算内，按字符边界切
pub fn clip_to_budget(text: &str, budget: usize) -> String {
    let total = estimate_tokens(text);
    if total <= budget {
        return text.to_string();
    }
    let ratio = budget as f64 / total as f64;
    let keep = (text.chars().count() as f64 * ratio) as usize;
    text.chars().take(keep).collect()
}

/// 从模型输出中提取 JSON 对象：先去掉 ``` 围栏整体解析，
/// 失败则找第一个配平的 {...} 块
pub fn extract_json(blob: &str) -> Option<Value> {
    let cleaned = strip_fences(blob.trim());

    if let Ok(value) = serde_json::from_str::<Value>(cleaned.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = cleaned.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in cleaned[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &cleaned[start..start + i + c.len_utf8()];
                    return serde_json::from_str::<Value>(candidate)
                        .ok()
                        .filter(Value::is_object);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_fences(text: &str) -> &str {
    let mut body = text;
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.split_once('\n').map(|(_, tail)| tail).unwrap_or(rest);
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest.trim_end();
    }
    body
}

pub struct Summarizer {
    api: Arc<dyn ChatApi>,
    parser: PdfParser,
    token_budget: usize,
}

impl Summarizer {
    pub fn new(api: Arc<dyn ChatApi>, token_budget: usize) -> Self {
        Self {
            api,
            parser: PdfParser::new(),
            token_budget,
        }
    }

    /// 总结一篇论文全文。上下文超限时预算递减 10% 重试，低于下限放弃
    pub async fn summarize(&self, text: &str) -> RefbotResult<Value> {
        let mut budget = self.token_budget;

        loop {
            let clipped = clip_to_budget(text, budget);
            let prompt = format!("{}{}\n", PROMPT_HEADER, clipped);

            match self.api.chat("You are a helpful assistant", &prompt, true).await {
                Ok(content) => {
                    let value = extract_json(&content)
                        .unwrap_or_else(|| serde_json::json!({ "raw": content }));
                    return Ok(value);
                }
                Err(e) => {
                    if e.to_string().contains("maximum context length") && budget > MIN_RETRY_BUDGET {
                        budget = budget * 9 / 10;
                        warn!("上下文超限，预算降至 {} 后重试", budget);
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// 批量处理目录（含子目录）下全部 PDF，单篇失败只记录并跳过，
    /// 返回成功写出的摘要数
    pub async fn run(&self, pdf_dir: &Path, out_dir: &Path) -> RefbotResult<usize> {
        let mut pdfs: Vec<PathBuf> = WalkDir::new(pdf_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file()
                    && e.path().extension().map(|x| x == "pdf").unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        pdfs.sort();

        if pdfs.is_empty() {
            warn!("{} 中没有找到 PDF", pdf_dir.display());
            return Ok(0);
        }

        info!("找到 {} 个 PDF 文件", pdfs.len());
        std::fs::create_dir_all(out_dir)?;

        let mut saved = 0usize;
        for (idx, pdf) in pdfs.iter().enumerate() {
            let stem = pdf
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            info!("[{}/{}] 处理: {}", idx + 1, pdfs.len(), stem);

            let raw = match self.parser.extract_full_text(pdf) {
                Ok(text) => text,
                Err(e) => {
                    warn!("[skip] {}: {}", stem, e);
                    continue;
                }
            };
            if raw.trim().is_empty() {
                warn!("[skip] {} 提取文本为空", stem);
                continue;
            }

            let summary = match self.summarize(&raw).await {
                Ok(value) => value,
                Err(e) => {
                    warn!("[error] {}: {}", stem, e);
                    continue;
                }
            };

            let record = PaperSummary {
                title: stem.clone(),
                summary,
            };
            let out_path = out_dir.join(format!("{}.json", stem));
            std::fs::write(&out_path, serde_json::to_string_pretty(&record)?)?;
            info!("✅ {}.json 已保存", stem);
            saved += 1;
        }

        Ok(saved)
    }
}
