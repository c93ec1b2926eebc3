use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{info, warn};

use crate::translator::Translator;
use crate::utils::{RefbotError, RefbotResult};

/// 模板中幻灯片内容的占位符
const SLIDES_PLACEHOLDER: &str = "{{slides}}";

/// 内置模板，约定的 template.html 不存在时使用
const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>论文摘要幻灯片</title>
<style>
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: -apple-system, "Segoe UI", Roboto, "Noto Sans SC", sans-serif; background: #f5f5f5; color: #333; line-height: 1.6; }
.slide { position: relative; background: white; max-width: 1100px; min-height: 620px; margin: 24px auto; padding: 48px 56px 64px; border-radius: 12px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); page-break-after: always; }
.slide-title { font-size: 26px; color: #1a237e; margin-bottom: 20px; padding-bottom: 12px; border-bottom: 2px solid #e8eaf6; }
.slide h3 { font-size: 17px; color: #283593; margin: 20px 0 10px 0; padding-left: 12px; border-left: 4px solid #5c6bc0; }
.slide p.field { margin-bottom: 8px; }
.slide ol { margin-left: 28px; }
.slide li { margin-bottom: 6px; }
.page-num { position: absolute; right: 28px; bottom: 18px; font-size: 14px; color: #888; }
</style>
</head>
<body>
{{slides}}
</body>
</html>
"#;

pub struct SlideGenerator {
    translator: Option<Translator>,
}

impl SlideGenerator {
    pub fn new(translator: Option<Translator>) -> Self {
        Self { translator }
    }

    /// 按文件名顺序读取摘要目录，渲染为单个幻灯片文件，返回页数
    pub async fn generate(
        &self,
        summaries_dir: &Path,
        template_path: &Path,
        out_path: &Path,
    ) -> RefbotResult<usize> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(summaries_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|x| x == "json").unwrap_or(false))
            .collect();
        files.sort();

        if files.is_empty() {
            warn!("{} 中没有 JSON 摘要", summaries_dir.display());
        }

        let mut slides_html = String::new();
        let mut page = 0usize;

        for file in &files {
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();

            let text = match std::fs::read_to_string(file) {
                Ok(text) => text,
                Err(e) => {
                    warn!("读取 {} 失败: {}，跳过", file.display(), e);
                    continue;
                }
            };
            let value: Value = match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    warn!("{} 不是有效 JSON: {}，跳过", file.display(), e);
                    continue;
                }
            };

            // summarize 写出的是 {title, summary}；也兼容裸四字段对象
            let (title, mut sections) = match (value.get("title"), value.get("summary")) {
                (Some(Value::String(t)), Some(s)) => (t.clone(), s.clone()),
                _ => (stem.clone(), value),
            };

            let mut title = Value::String(title);
            self.localize(&mut title).await;
            self.localize(&mut sections).await;
            let title = title.as_str().unwrap_or(&stem).to_string();

            page += 1;
            slides_html.push_str(&render_slide(&title, &sections, page));
            info!("[{}] {}", page, title);
        }

        let template = self.load_template(template_path)?;
        let html = template.replace(SLIDES_PLACEHOLDER, &slides_html);

        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(out_path, html)?;
        Ok(page)
    }

    fn load_template(&self, template_path: &Path) -> RefbotResult<String> {
        if !template_path.exists() {
            info!("模板 {} 不存在，使用内置模板", template_path.display());
            return Ok(DEFAULT_TEMPLATE.to_string());
        }

        let template = std::fs::read_to_string(template_path)?;
        if !template.contains(SLIDES_PLACEHOLDER) {
            return Err(RefbotError::ParseError(format!(
                "模板 {} 缺少 {} 占位符",
                template_path.display(),
                SLIDES_PLACEHOLDER
            )));
        }
        Ok(template)
    }

    /// 递归把 JSON 中的非中文字符串翻译为中文，失败保留原文
    fn localize<'a>(
        &'a self,
        value: &'a mut Value,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            match value {
                Value::String(s) => {
                    let Some(translator) = &self.translator else {
                        return;
                    };
                    if s.is_empty() || Translator::is_chinese(s) {
                        return;
                    }
                    match translator.translate_to_chinese(s).await {
                        Ok(translated) if !translated.is_empty() => *s = translated,
                        Ok(_) => {}
                        Err(e) => {
                            warn!("翻译失败，保留原文: {}", e);
                        }
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        self.localize(item).await;
                    }
                }
                Value::Object(map) => {
                    for (_key, item) in map.iter_mut() {
                        self.localize(item).await;
                    }
                }
                _ => {}
            }
        })
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_field(html: &mut String, label: &str, value: &Value) {
    html.push_str(&format!(
        "<p class=\"field\"><b>{}：</b>{}</p>\n",
        label,
        html_escape(&text_of(value))
    ));
}

fn push_list(html: &mut String, heading: &str, value: &Value) {
    html.push_str(&format!("<h3>{}</h3>\n<ol>\n", heading));
    match value {
        Value::Array(items) => {
            for item in items {
                html.push_str(&format!("<li>{}</li>\n", html_escape(&text_of(item))));
            }
        }
        other => {
            html.push_str(&format!("<li>{}</li>\n", html_escape(&text_of(other))));
        }
    }
    html.push_str("</ol>\n");
}

/// result 字段形态不固定：对象（datasets/performance）、数组、字符串都可能出现
fn push_result(html: &mut String, value: &Value) {
    html.push_str("<h3>结果</h3>\n");
    match value {
        Value::Object(map) => {
            if let Some(datasets) = map.get("datasets") {
                let joined = match datasets {
                    Value::Array(items) => items
                        .iter()
                        .map(|v| text_of(v))
                        .collect::<Vec<_>>()
                        .join(", "),
                    other => text_of(other),
                };
                html.push_str(&format!(
                    "<p class=\"field\"><b>数据集：</b>{}</p>\n",
                    html_escape(&joined)
                ));
            }
            match map.get("performance") {
                Some(Value::Array(items)) => {
                    html.push_str("<ol>\n");
                    for item in items {
                        html.push_str(&format!("<li>{}</li>\n", html_escape(&text_of(item))));
                    }
                    html.push_str("</ol>\n");
                }
                Some(Value::Object(perf)) => {
                    html.push_str("<ol>\n");
                    for (key, item) in perf {
                        html.push_str(&format!(
                            "<li>{}: {}</li>\n",
                            html_escape(key),
                            html_escape(&text_of(item))
                        ));
                    }
                    html.push_str("</ol>\n");
                }
                Some(other) => {
                    html.push_str(&format!(
                        "<p class=\"field\">{}</p>\n",
                        html_escape(&text_of(other))
                    ));
                }
                None => {}
            }
        }
        Value::Array(items) => {
            html.push_str("<ol>\n");
            for item in items {
                html.push_str(&format!("<li>{}</li>\n", html_escape(&text_of(item))));
            }
            html.push_str("</ol>\n");
        }
        other => {
            html.push_str(&format!(
                "<p class=\"field\">{}</p>\n",
                html_escape(&text_of(other))
            ));
        }
    }
}

/// 渲染一页幻灯片：标题、四段内容、右下角页码
fn render_slide(title: &str, sections: &Value, page: usize) -> String {
    let mut html = String::new();
    html.push_str("<div class=\"slide\">\n");
    html.push_str(&format!(
        "<h2 class=\"slide-title\">{}</h2>\n",
        html_escape(title)
    ));

    if let Some(phenomenon) = sections.get("phenomenon") {
        push_field(&mut html, "现象", phenomenon);
    }
    if let Some(problem) = sections.get("problem") {
        push_list(&mut html, "问题", problem);
    }
    if let Some(mechanism) = sections.get("mechanism") {
        push_list(&mut html, "机制", mechanism);
    }
    if let Some(result) = sections.get("result") {
        push_result(&mut html, result);
    }
    if let Some(raw) = sections.get("raw") {
        html.push_str(&format!(
            "<p class=\"field\">{}</p>\n",
            html_escape(&text_of(raw))
        ));
    }

    html.push_str(&format!("<div class=\"page-num\">{}</div>\n", page));
    html.push_str("</div>\n");
    html
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
