use httpmock::prelude::*;
use tempfile::TempDir;

use refbot::client::{OpenReviewClient, PaperRecord, SubmissionStatus};
use refbot::filter::KeywordFilter;
use refbot::reference::{self, RefStyle};

fn notes_body() -> serde_json::Value {
    serde_json::json!({
        "count": 3,
        "notes": [
            {
                "id": "note1",
                "number": 1,
                "cdate": 1735689600000i64,
                "content": {
                    "title": {"value": "Deep Reinforcement Learning at Scale"},
                    "abstract": {"value": "We study large-scale RL."},
                    "authors": {"value": ["Zhang, Wei", "Li, Ming"]},
                    "venue": {"value": "ICLR 2025"},
                    "venueid": {"value": "ICLR.cc/2025/Conference"},
                    "pdf": {"value": "/pdf/note1.pdf"}
                }
            },
            {
                "id": "note2",
                "number": 2,
                "content": {
                    "title": {"value": "Graph Neural Networks"},
                    "abstract": {"value": "Message passing."},
                    "venue": {"value": "ICLR 2025"},
                    "venueid": {"value": "ICLR.cc/2025/Conference"}
                }
            },
            {
                "id": "note3",
                "number": 3,
                "content": {
                    "title": {"value": "Reinforcement Learning, Withdrawn"},
                    "venue": {"value": "ICLR 2025 Withdrawn Submission"},
                    "venueid": {"value": "ICLR.cc/2025/Conference/Withdrawn_Submission"},
                    "pdf": {"value": "/pdf/note3.pdf"}
                }
            }
        ]
    })
}

async fn logged_in_client(server: &MockServer) -> OpenReviewClient {
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).json_body(serde_json::json!({"token": "tok-123"}));
    });

    let mut client = OpenReviewClient::new(&server.base_url(), "refbot-test").unwrap();
    client.login("user@example.com", "secret").await.unwrap();
    client
}

#[tokio::test]
async fn login_failure_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(401).body("invalid credentials");
    });

    let mut client = OpenReviewClient::new(&server.base_url(), "refbot-test").unwrap();
    let err = client.login("user@example.com", "wrong").await.unwrap_err();
    assert!(err.to_string().contains("登录失败"));
}

#[tokio::test]
async fn submissions_are_fetched_via_group_invitation() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET)
            .path("/groups")
            .query_param("id", "ICLR.cc/2025/Conference");
        then.status(200).json_body(serde_json::json!({
            "groups": [{"content": {"submission_name": {"value": "Submission"}}}]
        }));
    });
    let notes_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/notes")
            .query_param("invitation", "ICLR.cc/2025/Conference/-/Submission")
            .header("Authorization", "Bearer tok-123");
        then.status(200).json_body(notes_body());
    });

    let client = logged_in_client(&server).await;
    let notes = client.get_submissions("ICLR.cc/2025/Conference").await.unwrap();

    notes_mock.assert();
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[0].id, "note1");
}

#[tokio::test]
async fn pagination_continues_when_count_is_missing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/groups");
        then.status(200).json_body(serde_json::json!({
            "groups": [{"content": {"submission_name": {"value": "Submission"}}}]
        }));
    });

    // 第一页整页 1000 条且不带 count 字段，必须再翻一页确认取完
    let full_page: Vec<serde_json::Value> = (0..1000)
        .map(|i| {
            serde_json::json!({
                "id": format!("note{}", i),
                "number": i,
                "content": {"title": {"value": format!("Paper {}", i)}}
            })
        })
        .collect();
    let first_page = server.mock(|when, then| {
        when.method(GET).path("/notes").query_param("offset", "0");
        then.status(200).json_body(serde_json::json!({"notes": full_page}));
    });
    let second_page = server.mock(|when, then| {
        when.method(GET).path("/notes").query_param("offset", "1000");
        then.status(200).json_body(serde_json::json!({"notes": []}));
    });

    let client = logged_in_client(&server).await;
    let notes = client.get_submissions("ICLR.cc/2025/Conference").await.unwrap();

    first_page.assert();
    second_page.assert();
    assert_eq!(notes.len(), 1000);
}

#[tokio::test]
async fn failing_venue_returns_error_not_panic() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/groups");
        then.status(500);
    });

    let client = logged_in_client(&server).await;
    assert!(client.get_submissions("Broken.cc/2025/Conference").await.is_err());
}

#[tokio::test]
async fn pdf_is_downloaded_with_auth_token() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/attachment")
            .query_param("id", "note1")
            .query_param("name", "pdf")
            .header("Authorization", "Bearer tok-123");
        then.status(200).body("%PDF-1.4 fake body");
    });

    let client = logged_in_client(&server).await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("venue_sub/1_paper.pdf");

    client.download_pdf("note1", &dest).await.unwrap();

    let bytes = std::fs::read(&dest).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn missing_pdf_attachment_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/attachment");
        then.status(404);
    });

    let client = logged_in_client(&server).await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("missing.pdf");
    assert!(client.download_pdf("ghost", &dest).await.is_err());
    assert!(!dest.exists());
}

/// 从 API 响应到参考文献文件的主链路：过滤、状态排除、格式化、落盘
#[tokio::test]
async fn fetch_pipeline_from_notes_to_reference_file() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/groups");
        then.status(200).json_body(serde_json::json!({
            "groups": [{"content": {"submission_name": {"value": "Submission"}}}]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/notes");
        then.status(200).json_body(notes_body());
    });

    let client = logged_in_client(&server).await;
    let notes = client.get_submissions("ICLR.cc/2025/Conference").await.unwrap();

    let records: Vec<PaperRecord> = notes
        .iter()
        .map(|n| PaperRecord::from_note(n, "ICLR.cc/2025/Conference"))
        .collect();
    assert_eq!(records[2].status, SubmissionStatus::Withdrawn);

    // "reinforcement" 命中 note1 与 note3，后者因撤稿被排除
    let filter = KeywordFilter::new("reinforcement", false, Some(10)).unwrap();
    let selected = filter.apply(records);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, "note1");

    let refs: Vec<String> = selected
        .iter()
        .enumerate()
        .map(|(i, r)| reference::format_reference(r, i + 1, RefStyle::Gb7714))
        .collect();
    assert_eq!(
        refs[0],
        "[1] Zhang W, Li M. Deep Reinforcement Learning at Scale[C]. ICLR 2025, 2025."
    );

    let dir = TempDir::new().unwrap();
    let path = reference::write_references(&refs, dir.path(), RefStyle::Gb7714).unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), selected.len());
}
