use mockito::Matcher;
use news_feed::{types::*, Fetcher, FeedEvent, FeedSession, MessageSource};
use news_feed::aggregator::FeedItem;
use news_feed::traits::FeedRenderer;
use tracing::info;

const CHANNELS_JSON: &str = r#"[
    {"id": "1", "name": "🟡 markets", "type": 0, "position": 3},
    {"id": "2", "name": "⚫ wire", "type": 0},
    {"id": "3", "name": "🔴 breaking", "type": 0, "position": null}
]"#;

const STREAM_BODY: &str = concat!(
    "data: [{\"id\":\"10\",\"timestamp\":\"2024-03-01T10:00:00+00:00\",\"content\":\"https://t.me/wire/10\"}]\n\n",
    "data: [{\"id\":\"11\",\"timestamp\":\"2024-03-01T12:00:00+00:00\",\"content\":\"later\"},",
    "{\"id\":\"10\",\"timestamp\":\"2024-03-01T10:00:00+00:00\",\"content\":\"dup\"}]\n\n",
    "data: not json\n\n",
    "event: complete\ndata: null\n\n",
);

struct NullRenderer;

impl FeedRenderer for NullRenderer {
    fn render(&mut self, _visible: &[FeedItem], _total: usize) -> Result<()> {
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn fetcher_for(server: &mockito::ServerGuard) -> Fetcher {
    Fetcher::new(ClientConfig {
        api_url: server.url(),
        ..ClientConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_channels() -> Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/channels")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(CHANNELS_JSON)
        .create_async()
        .await;

    let fetcher = fetcher_for(&server);
    let channels = fetcher.channels().await?;
    info!("Fetched {} channels", channels.len());

    assert_eq!(channels.len(), 3);
    assert_eq!(channels[0].position, Some(3));
    assert_eq!(channels[1].position, None);
    assert_eq!(channels[2].kind, 0);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_api_error_carries_status_and_body() -> Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/channels")
        .with_status(500)
        .with_body(r#"{"detail":"No channels found"}"#)
        .create_async()
        .await;

    let result = fetcher_for(&server).fetch_channels().await;
    match result {
        Err(FeedError::Api { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.contains("No channels found"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_stream_delivers_batches_then_complete() -> Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/api/scrape/42".to_string()))
        .match_query(Matcher::UrlEncoded("hours".into(), "12".into()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(STREAM_BODY)
        .create_async()
        .await;

    let fetcher = fetcher_for(&server);
    let mut stream = fetcher.stream("42", 12);

    let mut events = Vec::new();
    while let Some(event) = stream.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], FeedEvent::Batch(batch) if batch.len() == 1));
    assert!(matches!(&events[1], FeedEvent::Batch(batch) if batch.len() == 2));
    assert!(matches!(&events[2], FeedEvent::Malformed(_)));
    assert_eq!(events[3], FeedEvent::Complete);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_stream_into_session_dedups_and_skips_malformed() -> Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Regex(r"^/api/scrape/42".to_string()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(STREAM_BODY)
        .create_async()
        .await;

    let fetcher = fetcher_for(&server);
    let mut stream = fetcher.stream("42", 24);
    let mut session = FeedSession::new(100);
    let outcome = session.run(&mut stream, &mut NullRenderer).await;

    assert_eq!(outcome, news_feed::FeedOutcome::Completed { total: 2 });
    let ids: Vec<&str> = session.aggregator().all().iter().map(|item| item.id()).collect();
    assert_eq!(ids, vec!["11", "10"]);
    assert_eq!(session.aggregator().all()[1].message.content, "https://t.me/wire/10");
    assert_eq!(session.errors().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_stream_reports_server_error_event() -> Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Regex(r"^/api/scrape/7".to_string()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: [{\"id\":\"1\",\"timestamp\":\"2024-03-01T10:00:00Z\"}]\n\nevent: error\ndata: {\"error\": \"rate limited\"}\n\n")
        .create_async()
        .await;

    let mut stream = fetcher_for(&server).stream("7", 24);
    let mut session = FeedSession::new(100);
    let outcome = session.run(&mut stream, &mut NullRenderer).await;

    assert_eq!(
        outcome,
        news_feed::FeedOutcome::Failed { error: "rate limited".to_string(), total: 1 }
    );
    Ok(())
}

#[tokio::test]
async fn test_stream_closed_without_complete_fails() -> Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Regex(r"^/api/scrape/8".to_string()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: [{\"id\":\"1\",\"timestamp\":\"2024-03-01T10:00:00Z\"}]\n\n")
        .create_async()
        .await;

    let mut stream = fetcher_for(&server).stream("8", 24);
    let mut session = FeedSession::new(100);
    let outcome = session.run(&mut stream, &mut NullRenderer).await;

    match outcome {
        news_feed::FeedOutcome::Failed { error, total } => {
            assert_eq!(total, 1);
            assert!(error.contains("closed before completion"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_batch_scrape_accepts_json_and_event_stream() -> Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let _json = server
        .mock("GET", Matcher::Regex(r"^/api/scrape/json".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"1","timestamp":"2024-03-01T10:00:00Z","embeds":null}]"#)
        .create_async()
        .await;
    let _sse = server
        .mock("GET", Matcher::Regex(r"^/api/scrape/sse".to_string()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: [{\"id\":\"1\",\"timestamp\":\"2024-03-01T10:00:00Z\"}]\n\ndata: [{\"id\":\"2\",\"timestamp\":\"2024-03-01T11:00:00Z\"}]\n\nevent: complete\ndata: null\n\n")
        .create_async()
        .await;
    let _bad = server
        .mock("GET", Matcher::Regex(r"^/api/scrape/bad".to_string()))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: [{\"id\":\"1\",\"timestamp\":\"2024-03-01T10:00:00Z\"}]\n\ndata: {broken\n\n")
        .create_async()
        .await;

    let fetcher = fetcher_for(&server);
    assert_eq!(fetcher.scrape("json", 24).await?.len(), 1);
    assert_eq!(fetcher.scrape("sse", 24).await?.len(), 2);
    assert!(matches!(fetcher.scrape("bad", 24).await, Err(FeedError::Malformed(_))));
    Ok(())
}

#[tokio::test]
async fn test_summarize_posts_visible_messages() -> Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/summarize")
        .match_header("content-type", "application/json")
        .match_body(Matcher::JsonString(
            r#"[{"id":"1","timestamp":"2024-03-01T10:00:00Z","content":"Markets rally","embeds":[],"attachments":[]}]"#
                .to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"summary": "- Markets rallied."}"#)
        .create_async()
        .await;

    let messages = vec![Message {
        id: "1".to_string(),
        timestamp: "2024-03-01T10:00:00Z".to_string(),
        content: "Markets rally".to_string(),
        embeds: Vec::new(),
        attachments: Vec::new(),
    }];

    let summary = fetcher_for(&server).summarize(&messages).await?;
    assert_eq!(summary, "- Markets rallied.");
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() -> Result<()> {
    init_tracing();
    let fetcher = Fetcher::new(ClientConfig {
        api_url: "http://127.0.0.1:1".to_string(),
        ..ClientConfig::default()
    })?;

    assert!(matches!(fetcher.fetch_channels().await, Err(FeedError::Http(_))));

    let mut stream = fetcher.stream("1", 24);
    match stream.recv().await {
        Some(FeedEvent::Failed(reason)) => info!("Stream failed as expected: {}", reason),
        other => panic!("expected failure event, got {:?}", other),
    }
    Ok(())
}
