// HTTP contract tests for the Twitter recent-search client
// Feature: poll-detector

use common::config::TwitterConfig;
use common::errors::TwitterError;
use chrono::{TimeZone, Utc};
use common::twitter::{SearchWindow, TweetSource, TwitterClient};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, max_pages: u32) -> TwitterConfig {
    TwitterConfig {
        api_base: server.uri(),
        query: "has:polls vote".to_string(),
        max_results: 10,
        max_pages,
    }
}

fn page(ids: &[&str], next_token: Option<&str>) -> serde_json::Value {
    let data: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "text": "Who gets your vote?",
                "author_id": "42",
                "created_at": "2027-08-01T10:00:00.000Z",
                "attachments": { "poll_ids": [format!("p{}", id)] }
            })
        })
        .collect();
    let polls: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "id": format!("p{}", id),
                "options": [{ "position": 1, "label": "Ruto", "votes": 0 }],
                "voting_status": "open"
            })
        })
        .collect();
    let mut meta = json!({ "result_count": ids.len(), "newest_id": ids.first() });
    if let Some(token) = next_token {
        meta["next_token"] = json!(token);
    }
    json!({
        "data": data,
        "includes": { "polls": polls, "users": [{ "id": "42", "username": "pollster" }] },
        "meta": meta
    })
}

#[tokio::test]
async fn test_search_sends_auth_and_expansions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(header("Authorization", "Bearer twitter-token"))
        .and(query_param("query", "has:polls vote"))
        .and(query_param("expansions", "attachments.poll_ids,author_id"))
        .and(query_param("max_results", "10"))
        .and(query_param("since_id", "1500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["1600"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = TwitterClient::new(&config(&server, 3), "twitter-token", 5).unwrap();
    let batch = client.search(&SearchWindow::SinceId("1500".to_string())).await.unwrap();

    assert_eq!(batch.tweets.len(), 1);
    assert_eq!(batch.newest_id.as_deref(), Some("1600"));
    assert!(batch.polls.contains_key("p1600"));
    assert_eq!(batch.users["42"].username, "pollster");
}

#[tokio::test]
async fn test_pages_are_merged_and_first_newest_id_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(query_param("pagination_token", "next-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["1700", "1650"], None)))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(&["1900", "1800"], Some("next-1"))),
        )
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let client = TwitterClient::new(&config(&server, 5), "t", 5).unwrap();
    let batch = client.search(&SearchWindow::Recent).await.unwrap();

    assert_eq!(batch.tweets.len(), 4);
    assert_eq!(batch.polls.len(), 4);
    assert_eq!(batch.newest_id.as_deref(), Some("1900"));
}

#[tokio::test]
async fn test_paging_stops_at_max_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["1900"], Some("more"))))
        .expect(2)
        .mount(&server)
        .await;

    let client = TwitterClient::new(&config(&server, 2), "t", 5).unwrap();
    let batch = client.search(&SearchWindow::Recent).await.unwrap();
    assert_eq!(batch.tweets.len(), 2);
}

#[tokio::test]
async fn test_empty_result_is_empty_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "meta": { "result_count": 0 } })),
        )
        .mount(&server)
        .await;

    let client = TwitterClient::new(&config(&server, 5), "t", 5).unwrap();
    let batch = client.search(&SearchWindow::Recent).await.unwrap();
    assert!(batch.is_empty());
    assert!(batch.newest_id.is_none());
}

#[tokio::test]
async fn test_rate_limit_reports_reset_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("x-rate-limit-reset", "1893456000"),
        )
        .mount(&server)
        .await;

    let client = TwitterClient::new(&config(&server, 5), "t", 5).unwrap();
    match client.search(&SearchWindow::Recent).await {
        Err(TwitterError::RateLimited { reset_at }) => assert_eq!(reset_at, Some(1893456000)),
        other => panic!("expected rate limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let client = TwitterClient::new(&config(&server, 5), "bad", 5).unwrap();
    match client.search(&SearchWindow::Recent).await {
        Err(TwitterError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = TwitterClient::new(&config(&server, 5), "t", 5).unwrap();
    assert!(matches!(
        client.search(&SearchWindow::Recent).await,
        Err(TwitterError::Decode(_))
    ));
}

#[tokio::test]
async fn test_start_time_window_replaces_since_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(query_param("start_time", "2027-07-25T12:10:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["1600"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = TwitterClient::new(&config(&server, 3), "t", 5).unwrap();
    let start = Utc.with_ymd_and_hms(2027, 7, 25, 12, 10, 0).unwrap();
    let batch = client
        .search(&SearchWindow::StartTime(start))
        .await
        .unwrap();
    assert_eq!(batch.tweets.len(), 1);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0]
        .url
        .query_pairs()
        .all(|(key, _)| key != "since_id"));
}
