use clap::ValueEnum;
use std::path::{Path, PathBuf};

use crate::client::PaperRecord;
use crate::utils::RefbotResult;

/// 著者缺失时的占位符
const ANONYMOUS: &str = "Anonymous";

/// GB/T 7714 著者列表超过该人数时截断并加 et al
const GB7714_AUTHOR_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RefStyle {
    Gb7714,
    Ieee,
}

impl RefStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefStyle::Gb7714 => "gb7714",
            RefStyle::Ieee => "ieee",
        }
    }
}

/// 按 1 起始的序号格式化一条参考文献
pub fn format_reference(record: &PaperRecord, idx: usize, style: RefStyle) -> String {
    match style {
        RefStyle::Gb7714 => gb7714_reference(record, idx),
        RefStyle::Ieee => ieee_reference(record, idx),
    }
}

/// 把全部引用写入 references_<style>.txt，一行一条，返回文件路径
pub fn write_references(refs: &[String], run_dir: &Path, style: RefStyle) -> RefbotResult<PathBuf> {
    std::fs::create_dir_all(run_dir)?;
    let path = run_dir.join(format!("references_{}.txt", style.as_str()));

    let mut content = refs.join("\n");
    if !refs.is_empty() {
        content.push('\n');
    }
    std::fs::write(&path, content)?;
    Ok(path)
}

/// 拆分姓与名，兼容 "Zhang, Wei" 与 "Wei Zhang" 两种写法
fn split_name(name: &str) -> (String, Vec<String>) {
    if let Some((surname, given)) = name.split_once(',') {
        let given = given.split_whitespace().map(|s| s.to_string()).collect();
        return (surname.trim().to_string(), given);
    }

    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.split_last() {
        Some((surname, given)) => (
            surname.to_string(),
            given.iter().map(|s| s.to_string()).collect(),
        ),
        None => (String::new(), Vec::new()),
    }
}

fn initial(word: &str) -> Option<String> {
    word.chars().next().map(|c| c.to_uppercase().to_string())
}

/// GB/T 7714 著者缩写：姓 + 名首字母，如 "Zhang W"
fn gb7714_author(name: &str) -> String {
    let (surname, given) = split_name(name);
    if given.is_empty() {
        return surname;
    }
    let initials: Vec<String> = given.iter().filter_map(|g| initial(g)).collect();
    format!("{} {}", surname, initials.join(" "))
}

fn gb7714_authors(authors: &[String]) -> String {
    if authors.is_empty() {
        return ANONYMOUS.to_string();
    }
    let abbreviated: Vec<String> = authors.iter().map(|a| gb7714_author(a)).collect();
    if abbreviated.len() <= GB7714_AUTHOR_LIMIT {
        abbreviated.join(", ")
    } else {
        format!("{}, et al", abbreviated[..GB7714_AUTHOR_LIMIT].join(", "))
    }
}

/// IEEE 著者缩写：名首字母 + 姓，如 "W. Zhang"
fn ieee_author(name: &str) -> String {
    let (surname, given) = split_name(name);
    if given.is_empty() {
        return surname;
    }
    let initials: Vec<String> = given
        .iter()
        .filter_map(|g| initial(g).map(|i| format!("{}.", i)))
        .collect();
    format!("{} {}", initials.join(" "), surname)
}

fn ieee_authors(authors: &[String]) -> String {
    if authors.is_empty() {
        return ANONYMOUS.to_string();
    }
    let names: Vec<String> = authors.iter().map(|a| ieee_author(a)).collect();
    match names.len() {
        1 => names[0].clone(),
        2 => format!("{} and {}", names[0], names[1]),
        n => format!("{}, and {}", names[..n - 1].join(", "), names[n - 1]),
    }
}

/// 文献类型标识：OpenReview 收录的基本都是会议论文，只有 venue
/// 明确是期刊时才标 [J]
fn pub_type(venue: &str) -> &'static str {
    let lower = venue.to_lowercase();
    if lower.contains("journal") || lower.contains("transactions") || lower.contains("trans.") {
        "[J]"
    } else {
        "[C]"
    }
}

fn gb7714_reference(record: &PaperRecord, idx: usize) -> String {
    format!(
        "[{}] {}. {}{}. {}, {}.",
        idx,
        gb7714_authors(&record.authors),
        record.title,
        pub_type(&record.venue),
        record.venue,
        record.year
    )
}

fn ieee_reference(record: &PaperRecord, idx: usize) -> String {
    let venue_str = if record.venue.is_empty() || record.venue.to_lowercase().starts_with("in ") {
        record.venue.clone()
    } else {
        format!("in Proc. {}", record.venue)
    };

    let pages_part = record
        .pages
        .as_deref()
        .map(|p| format!(", pp. {}", p))
        .unwrap_or_default();

    format!(
        "[{}] {}, \"{},\" {}, {}{}.",
        idx,
        ieee_authors(&record.authors),
        record.title,
        venue_str,
        record.year,
        pages_part
    )
}
