use regex::{Regex, RegexBuilder};

use crate::client::{PaperRecord, SubmissionStatus};
use crate::utils::{RefbotError, RefbotResult};

/// 关键词过滤器：标题或摘要命中即保留，保持输入顺序，截断到上限
pub struct KeywordFilter {
    pattern: Regex,
    include_submitted: bool,
    max: Option<usize>,
}

impl KeywordFilter {
    pub fn new(query: &str, include_submitted: bool, max: Option<usize>) -> RefbotResult<Self> {
        let pattern = RegexBuilder::new(query)
            .case_insensitive(true)
            .build()
            .map_err(|e| RefbotError::ConfigError(format!("关键词正则无效 '{}': {}", query, e)))?;

        Ok(Self {
            pattern,
            include_submitted,
            max,
        })
    }

    fn matches(&self, record: &PaperRecord) -> bool {
        self.pattern.is_match(&record.title) || self.pattern.is_match(&record.abstract_text)
    }

    fn status_allowed(&self, record: &PaperRecord) -> bool {
        self.include_submitted || record.status == SubmissionStatus::Published
    }

    pub fn apply(&self, records: Vec<PaperRecord>) -> Vec<PaperRecord> {
        let filtered = records
            .into_iter()
            .filter(|r| self.status_allowed(r) && self.matches(r));

        match self.max {
            Some(n) => filtered.take(n).collect(),
            None => filtered.collect(),
        }
    }
}
