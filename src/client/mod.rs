use chrono::Datelike;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::utils::{RefbotError, RefbotResult};

/// OpenReview API v2 的 note 原始结构，content 字段全部可选
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub cdate: Option<i64>,
    #[serde(default)]
    pub content: NoteContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteContent {
    #[serde(default)]
    pub title: Option<TextField>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<TextField>,
    #[serde(default)]
    pub authors: Option<ListField>,
    #[serde(default)]
    pub venue: Option<TextField>,
    #[serde(default)]
    pub venueid: Option<TextField>,
    #[serde(default)]
    pub year: Option<RawField>,
    #[serde(default)]
    pub pages: Option<RawField>,
    #[serde(default)]
    pub pdf: Option<TextField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextField {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListField {
    #[serde(default)]
    pub value: Vec<String>,
}

/// 取值类型不稳定的字段（year 可能是数字也可能是字符串）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawField {
    #[serde(default)]
    pub value: serde_json::Value,
}

impl RawField {
    fn as_i64(&self) -> Option<i64> {
        match &self.value {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// 投稿状态，由 venue/venueid 推断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Published,
    UnderReview,
    Withdrawn,
}

/// 一篇论文的元数据，从 Note 构造后不再变化
#[derive(Debug, Clone)]
pub struct PaperRecord {
    pub id: String,
    pub number: i64,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub venue: String,
    pub venue_id: String,
    pub year: i32,
    pub status: SubmissionStatus,
    pub pages: Option<String>,
    pub pdf: Option<String>,
    /// 命令行指定的 venue ID，决定 PDF 落盘的子目录
    pub source_venue: String,
}

impl PaperRecord {
    /// 从原始 note 构造，缺失字段在此一次性补默认值，下游不再判空
    pub fn from_note(note: &Note, source_venue: &str) -> Self {
        let content = &note.content;

        let title = content
            .title
            .as_ref()
            .map(|f| f.value.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let abstract_text = content
            .abstract_text
            .as_ref()
            .map(|f| f.value.clone())
            .unwrap_or_default();

        let authors = content
            .authors
            .as_ref()
            .map(|f| f.value.clone())
            .unwrap_or_default();

        let venue_id = content
            .venueid
            .as_ref()
            .map(|f| f.value.clone())
            .unwrap_or_default();

        let venue = content
            .venue
            .as_ref()
            .map(|f| f.value.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| venue_id.clone());

        // year 字段缺失时退回 cdate 推算
        let year = content
            .year
            .as_ref()
            .and_then(|f| f.as_i64())
            .or_else(|| {
                note.cdate
                    .and_then(|ms| chrono::DateTime::from_timestamp(ms / 1000, 0))
                    .map(|dt| dt.year() as i64)
            })
            .unwrap_or_else(|| chrono::Utc::now().year() as i64) as i32;

        let status = derive_status(&venue, &venue_id);

        let pages = content.pages.as_ref().and_then(|f| f.as_text());

        let pdf = content
            .pdf
            .as_ref()
            .map(|f| f.value.clone())
            .filter(|p| !p.is_empty());

        Self {
            id: note.id.clone(),
            number: note.number,
            title,
            abstract_text,
            authors,
            venue,
            venue_id,
            year,
            status,
            pages,
            pdf,
            source_venue: source_venue.to_string(),
        }
    }
}

/// OpenReview 对撤稿/在审没有独立的状态字段，只能从 venue 标记推断：
/// venueid 以 Withdrawn_Submission / Desk_Rejected_Submission 结尾视为撤稿，
/// venue 以 "Submitted to" 开头视为在审，其余视为已发表
fn derive_status(venue: &str, venue_id: &str) -> SubmissionStatus {
    if venue_id.ends_with("Withdrawn_Submission")
        || venue_id.ends_with("Desk_Rejected_Submission")
        || venue.contains("Withdrawn")
    {
        SubmissionStatus::Withdrawn
    } else if venue.starts_with("Submitted to") {
        SubmissionStatus::UnderReview
    } else {
        SubmissionStatus::Published
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    id: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct NotesResponse {
    #[serde(default)]
    notes: Vec<Note>,
    /// API 可能不带总数，此时只能靠页大小判断是否取完
    #[serde(default)]
    count: Option<usize>,
}

pub struct OpenReviewClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl OpenReviewClient {
    pub fn new(base_url: &str, user_agent: &str) -> RefbotResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// 登录换取 bearer token，凭证错误直接失败
    pub async fn login(&mut self, username: &str, password: &str) -> RefbotResult<()> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                id: username,
                password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefbotError::ApiError(format!("登录失败 {}: {}", status, body)));
        }

        let login: LoginResponse = response.json().await?;
        self.token = Some(login.token);
        info!("OpenReview 登录成功");
        Ok(())
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token.as_deref().unwrap_or_default())
    }

    /// 查询 venue group 的 submission_name，拼出投稿 invitation
    async fn submission_invitation(&self, venue_id: &str) -> RefbotResult<String> {
        let url = format!("{}/groups", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("id", venue_id)])
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefbotError::ApiError(format!(
                "获取 venue {} 失败: {}",
                venue_id, status
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let sub_name = body["groups"][0]["content"]["submission_name"]["value"]
            .as_str()
            .ok_or_else(|| {
                RefbotError::ParseError(format!("venue {} 缺少 submission_name", venue_id))
            })?;

        Ok(format!("{}/-/{}", venue_id, sub_name))
    }

    /// 分页拉取 venue 的全部投稿
    pub async fn get_submissions(&self, venue_id: &str) -> RefbotResult<Vec<Note>> {
        let invitation = self.submission_invitation(venue_id).await?;
        info!("查询投稿: {}", invitation);

        let mut notes: Vec<Note> = Vec::new();
        let mut offset = 0usize;
        let limit = 1000usize;

        loop {
            let url = format!("{}/notes", self.base_url);
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("invitation", invitation.as_str()),
                    ("offset", offset.to_string().as_str()),
                    ("limit", limit.to_string().as_str()),
                ])
                .header("Authorization", self.auth_header())
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(RefbotError::ApiError(format!(
                    "查询 {} 失败: {}",
                    invitation, status
                )));
            }

            let page: NotesResponse = response.json().await?;
            let fetched = page.notes.len();
            let total = page.count;
            notes.extend(page.notes);
            offset += limit;

            if fetched < limit || total.is_some_and(|count| notes.len() >= count) {
                break;
            }
        }

        info!("{} 返回 {} 条投稿", venue_id, notes.len());
        Ok(notes)
    }

    /// 下载 note 的 PDF 附件到指定路径，必要时创建父目录
    pub async fn download_pdf(&self, note_id: &str, dest: &Path) -> RefbotResult<()> {
        let url = format!("{}/attachment", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("id", note_id), ("name", "pdf")])
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefbotError::ApiError(format!(
                "PDF 下载失败 {}: {}",
                note_id, status
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            warn!("{} 返回空的 PDF 附件", note_id);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;

        info!("PDF 已保存: {}", dest.display());
        Ok(())
    }
}
