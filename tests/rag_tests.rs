use mockito::Matcher;
use mockito::Server;
use mockito::ServerGuard;
use patientrag::config::AppConfig;
use patientrag::store::StoreBackend;
use patientrag::PatientRagError;
use patientrag::RagService;
use patientrag::Result;

const GENERATE_PATH: &str = "/models/gemini-1.5-flash-latest:generateContent";

const FEED: &str = r#"{"data": [
    {"user": "38M, fever 39C, body aches", "explanation": "influenza", "explanation_embedding": [1.0, 0.0, 0.0]},
    {"user": "25F, sneezing, itchy eyes", "explanation": "allergy", "explanation_embedding": [0.0, 1.0, 0.0]},
    {"user": "41F, sore throat, runny nose", "explanation": "common cold", "explanation_embedding": [0.8, 0.2, 0.0]},
    {"user": "30M, throbbing headache", "explanation": "migraine", "explanation_embedding": [0.0, 0.0, 1.0]},
    {"user": "55M, productive cough", "explanation": "bronchitis", "explanation_embedding": [0.6, 0.6, 0.1]}
]}"#;

fn test_config(server: &ServerGuard) -> AppConfig {
    let mut config = AppConfig::default();
    config.loader.source = format!("{}/feed.json", server.url());
    config.embeddings.provider = "ollama".to_string();
    config.embeddings.endpoint = server.url();
    config.embeddings.dimension = 3;
    config.generation.endpoint = server.url();
    config.generation.api_key = "test-key".to_string();
    config.generation.max_retries = 0;
    config.generation.retry_backoff_ms = 1;
    config
}

async fn mock_embedding(server: &mut ServerGuard, embedding: &str) -> mockito::Mock {
    server
        .mock("POST", "/api/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"embedding": {embedding}}}"#))
        .create_async()
        .await
}

#[tokio::test]
async fn test_symptom_to_answer() -> Result<()> {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed.json")
        .with_status(200)
        .with_body(FEED)
        .create_async()
        .await;
    let _embed = mock_embedding(&mut server, "[1.0, 0.1, 0.0]").await;
    let generate = server
        .mock("POST", GENERATE_PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::Regex("influenza.*common cold.*bronchitis".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "**Rest** and fluids"}]}}]}"#)
        .create_async()
        .await;

    let service = RagService::new(&test_config(&server)).await?;
    let response = service.ask("fever and aches").await?;

    assert_eq!(response.answer, "Rest and fluids");
    assert_eq!(response.sources.ids(), vec!["0", "2", "4"]);
    assert!(response.prompt.contains("fever and aches"));
    generate.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_generation_failure_becomes_text() -> Result<()> {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed.json")
        .with_status(200)
        .with_body(FEED)
        .create_async()
        .await;
    let _embed = mock_embedding(&mut server, "[0.0, 1.0, 0.0]").await;
    let _generate = server
        .mock("POST", GENERATE_PATH)
        .with_status(500)
        .with_body("internal")
        .create_async()
        .await;

    let service = RagService::new(&test_config(&server)).await?;
    let response = service.ask("sneezing").await?;

    assert_eq!(response.answer, "Error: 500\ninternal");
    assert_eq!(response.sources.ids()[0], "1");
    Ok(())
}

#[tokio::test]
async fn test_empty_candidates_sentinel() -> Result<()> {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed.json")
        .with_status(200)
        .with_body(FEED)
        .create_async()
        .await;
    let _embed = mock_embedding(&mut server, "[0.0, 0.0, 1.0]").await;
    let _generate = server
        .mock("POST", GENERATE_PATH)
        .with_status(200)
        .with_body(r#"{"candidates": []}"#)
        .create_async()
        .await;

    let service = RagService::new(&test_config(&server)).await?;
    let response = service.ask_with_k("headache", 1).await?;

    assert_eq!(response.answer, "No candidates found in the response.");
    assert_eq!(response.sources.ids(), vec!["3"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_feed_aborts_ingestion() -> Result<()> {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed.json")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let _embed = mock_embedding(&mut server, "[1.0, 0.0, 0.0]").await;

    let service = RagService::new(&test_config(&server)).await?;
    let err = service.ask("fever").await.unwrap_err();

    assert!(matches!(err, PatientRagError::EmptyData(_)));
    assert!(!service.corpus().is_loaded().await);
    assert_eq!(service.corpus().store().count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_row_aborts_ingestion() -> Result<()> {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed.json")
        .with_status(200)
        .with_body(
            r#"[
                {"user": "u", "explanation": "e", "explanation_embedding": [1.0, 0.0, 0.0]},
                {"user": "u", "explanation": "e"}
            ]"#,
        )
        .create_async()
        .await;

    let service = RagService::new(&test_config(&server)).await?;
    let err = service.corpus().load().await.unwrap_err();

    assert!(matches!(err, PatientRagError::Parse(_)));
    assert_eq!(service.corpus().store().count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_feed_is_fetch_error() -> Result<()> {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed.json")
        .with_status(404)
        .create_async()
        .await;

    let service = RagService::new(&test_config(&server)).await?;
    assert!(matches!(
        service.corpus().load().await,
        Err(PatientRagError::Fetch(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_persisted_corpus_fetched_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = Server::new_async().await;
    let feed = server
        .mock("GET", "/feed.json")
        .with_status(200)
        .with_body(FEED)
        .expect(1)
        .create_async()
        .await;

    let mut config = test_config(&server);
    config.store.backend = StoreBackend::Persisted;
    config.store.path = dir.path().join("records.db").display().to_string();

    let first = RagService::new(&config).await?;
    assert_eq!(first.corpus().load().await?.records_loaded, 5);
    drop(first);

    // A new process finds the collection already populated
    let second = RagService::new(&config).await?;
    let summary = second.corpus().load().await?;
    assert_eq!(summary.records_loaded, 5);
    assert!(second.corpus().is_loaded().await);

    feed.assert_async().await;
    Ok(())
}
