use consultant_client::{AnalysisRequest, ApiSettings, BackendApi, ReqwestApi};
use consultant_core::JobId;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn async_submission_carries_the_key_and_flattened_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze/async"))
        .and(header("X-API-Key", "secret-key"))
        .and(body_json(json!({
            "company": "Acme GmbH",
            "framework": "swot",
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "job_id": "abc123",
            "status": "pending",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ReqwestApi::new(
        ApiSettings::default()
            .with_base_url(server.uri())
            .with_api_key("secret-key"),
    )
    .expect("client");

    let request = AnalysisRequest::new("Acme GmbH").with_option("framework", json!("swot"));
    let job_id = api.submit_analysis_async(&request).await.expect("submit ok");
    assert_eq!(job_id, JobId::from("abc123"));
}

#[tokio::test]
async fn sync_submission_returns_the_raw_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "looks healthy",
            "score": 8,
        })))
        .mount(&server)
        .await;

    let api = ReqwestApi::new(ApiSettings::default().with_base_url(server.uri())).expect("client");
    let report = api
        .submit_analysis(&AnalysisRequest::new("Acme GmbH"))
        .await
        .expect("submit ok");
    assert_eq!(report["score"], 8);
}

#[tokio::test]
async fn rejected_submission_maps_to_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze/async"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let api = ReqwestApi::new(ApiSettings::default().with_base_url(server.uri())).expect("client");
    let err = api
        .submit_analysis_async(&AnalysisRequest::new("Acme GmbH"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "unexpected http status 401");
}
