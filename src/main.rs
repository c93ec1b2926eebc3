use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use refbot::client::{OpenReviewClient, PaperRecord};
use refbot::config::{AppConfig, Credentials, RunContext};
use refbot::deepseek::DeepSeekClient;
use refbot::filter::KeywordFilter;
use refbot::reference::{self, RefStyle};
use refbot::slides::SlideGenerator;
use refbot::summarizer::Summarizer;
use refbot::translator::Translator;
use refbot::utils::{logger, safe_filename};

#[derive(Parser)]
#[command(name = "refbot")]
#[command(about = "OpenReview 论文抓取、摘要与幻灯片生成工具", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化配置文件
    Init,
    /// 检索并下载论文，生成参考文献列表
    Fetch {
        /// 关键词（正则，忽略大小写），匹配标题或摘要
        #[arg(long)]
        query: String,
        /// OpenReview venue ID，可多个，如 ICLR.cc/2025/Conference
        #[arg(long, num_args = 1.., required = true)]
        venues: Vec<String>,
        /// PDF 输出目录
        #[arg(long, default_value = "papers")]
        out: PathBuf,
        /// 运行子目录名
        #[arg(long)]
        run_name: Option<String>,
        /// 参考文献格式
        #[arg(long, value_enum, default_value_t = RefStyle::Gb7714)]
        style: RefStyle,
        /// 最多下载 N 篇
        #[arg(long)]
        max: Option<usize>,
        /// 同时保留在审/撤稿的投稿
        #[arg(long)]
        include_submitted: bool,
    },
    /// 批量总结 PDF，生成 JSON 摘要
    Summarize {
        /// 包含 PDF 的目录
        path: PathBuf,
        /// JSON 输出目录，默认 <path>/../summaries
        #[arg(long)]
        out: Option<PathBuf>,
        /// DeepSeek API key，缺省读取 DEEPSEEK_API_KEY
        #[arg(long)]
        api_key: Option<String>,
    },
    /// 根据 JSON 摘要生成幻灯片
    Slides {
        /// 包含 JSON 摘要的目录
        summaries: PathBuf,
        /// 幻灯片模板
        #[arg(long, default_value = "template.html")]
        template: PathBuf,
        /// 输出文件
        #[arg(long, default_value = "slides.html")]
        out: PathBuf,
        /// DeepSeek API key，用于翻译非中文内容
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();
    info!("refbot 启动");

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_command().await?;
        }
        Commands::Fetch {
            query,
            venues,
            out,
            run_name,
            style,
            max,
            include_submitted,
        } => {
            let ctx = RunContext::new(out, run_name, style, max, include_submitted);
            fetch_command(&query, &venues, &ctx).await?;
        }
        Commands::Summarize { path, out, api_key } => {
            summarize_command(path, out, api_key).await?;
        }
        Commands::Slides {
            summaries,
            template,
            out,
            api_key,
        } => {
            slides_command(summaries, template, out, api_key).await?;
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("初始化配置...");

    tokio::fs::create_dir_all("config").await?;
    let app_config = AppConfig::default();
    app_config.save("config/settings.toml")?;
    info!("已生成配置文件: config/settings.toml");

    info!("✅ 初始化完成！");
    info!("下一步:");
    info!("  1. 设置 OPENREVIEW_USERNAME / OPENREVIEW_PASSWORD 环境变量");
    info!("  2. 设置 DEEPSEEK_API_KEY 环境变量（summarize / slides 需要）");
    info!("  3. 运行 'refbot fetch --query <关键词> --venues <venue ID>' 开始检索");

    Ok(())
}

/// 脚本一：检索 → 过滤 → 下载 → 生成参考文献
async fn fetch_command(query: &str, venues: &[String], ctx: &RunContext) -> Result<()> {
    let app_config = AppConfig::load()?;
    // 凭证缺失属致命错误，在任何网络请求前退出
    let credentials = Credentials::from_env()?;
    let filter = KeywordFilter::new(query, ctx.include_submitted, ctx.max)?;

    let mut client = OpenReviewClient::new(
        &app_config.openreview.api_url,
        &app_config.openreview.user_agent,
    )?;
    client
        .login(&credentials.username, &credentials.password)
        .await?;

    // 逐个 venue 拉取，单个失败只记录不中断
    let mut records: Vec<PaperRecord> = Vec::new();
    for venue in venues {
        info!(">>> 扫描 {}", venue);
        let notes = match client.get_submissions(venue).await {
            Ok(notes) => notes,
            Err(e) => {
                warn!("获取 {} 失败: {}", venue, e);
                continue;
            }
        };
        if notes.is_empty() {
            warn!("{} 没有返回投稿", venue);
            continue;
        }
        records.extend(notes.iter().map(|n| PaperRecord::from_note(n, venue)));
    }

    let selected = filter.apply(records);
    info!("匹配 {} 篇论文", selected.len());

    let mut references: Vec<String> = Vec::new();
    let mut downloaded = 0usize;

    for record in &selected {
        if record.pdf.is_none() {
            warn!("论文 {} 没有 PDF，跳过", record.id);
            continue;
        }

        let filename = safe_filename(&record.title, record.number);
        let pdf_path = ctx
            .run_dir
            .join(record.source_venue.replace('/', "_"))
            .join(filename);

        if pdf_path.exists() {
            info!("已存在，跳过下载: {}", pdf_path.display());
        } else {
            if let Err(e) = client.download_pdf(&record.id, &pdf_path).await {
                warn!("下载 {} 失败: {}", record.id, e);
                continue;
            }
            tokio::time::sleep(Duration::from_millis(app_config.fetcher.request_delay_ms)).await;
        }

        downloaded += 1;
        references.push(reference::format_reference(
            record,
            references.len() + 1,
            ctx.style,
        ));
    }

    // 零匹配也写出（空）参考文献文件
    let ref_path = reference::write_references(&references, &ctx.run_dir, ctx.style)?;
    if references.is_empty() {
        info!("没有匹配的论文，已生成空参考文献文件: {}", ref_path.display());
    } else {
        info!("✔ 已保存 {} 条参考文献到 {}", references.len(), ref_path.display());
    }

    info!("✅ 完成，共下载 {} 个 PDF", downloaded);
    Ok(())
}

/// 脚本二：PDF 目录 → DeepSeek 摘要 → 每篇一个 JSON
async fn summarize_command(
    path: PathBuf,
    out: Option<PathBuf>,
    api_key: Option<String>,
) -> Result<()> {
    let app_config = AppConfig::load()?;
    let api_key = app_config
        .deepseek
        .resolve_api_key(api_key)
        .ok_or_else(|| {
            anyhow::anyhow!("必须提供 DeepSeek API key（--api-key 或 DEEPSEEK_API_KEY 环境变量）")
        })?;

    let out_dir = out.unwrap_or_else(|| {
        path.parent()
            .unwrap_or_else(|| Path::new("."))
            .join("summaries")
    });

    let api = Arc::new(DeepSeekClient::new(&app_config.deepseek, api_key)?);
    let summarizer = Summarizer::new(api, app_config.deepseek.token_budget);

    let saved = summarizer.run(&path, &out_dir).await?;
    info!("✔ {} 份摘要已保存至 {}", saved, out_dir.display());
    Ok(())
}

/// 脚本三：JSON 摘要目录 → 幻灯片文件
async fn slides_command(
    summaries: PathBuf,
    template: PathBuf,
    out: PathBuf,
    api_key: Option<String>,
) -> Result<()> {
    let app_config = AppConfig::load()?;

    // 翻译是尽力而为：没有 API key 时跳过翻译，原文直接上页
    let translator = match app_config.deepseek.resolve_api_key(api_key) {
        Some(key) => {
            let api = Arc::new(DeepSeekClient::new(&app_config.deepseek, key)?);
            Some(Translator::new(api))
        }
        None => {
            info!("未配置 DeepSeek API key，非中文内容将保留原文");
            None
        }
    };

    let generator = SlideGenerator::new(translator);
    let count = generator.generate(&summaries, &template, &out).await?;
    info!("✔ 已生成 {} 页幻灯片: {}", count, out.display());
    Ok(())
}
