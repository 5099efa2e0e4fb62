//! Domain pipeline against a mock scrape endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use firebatch::models::Config;
use firebatch::pipeline::domains::{AVAILABLE_TXT, RESULTS_CSV, domain_client};
use firebatch::pipeline::run_domain_check;
use firebatch::storage::LEDGER_JSON;
use firebatch::utils::console;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> Config {
    let env: HashMap<&str, String> = HashMap::from([
        ("FIRECRAWL_API_KEY", "test-key".to_string()),
        ("FIRECRAWL_API_URL", server.uri()),
        ("DOMAIN_CHECK_DELAY_MS", "0".to_string()),
        ("DOMAIN_CHECK_RETRIES", "0".to_string()),
    ]);
    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}

async fn mount_search(server: &MockServer, domain: &str, markdown: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "url": format!("https://instantdomainsearch.com/?q={domain}")
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "markdown": markdown,
                "extract": {"availability": "unknown", "price": null, "notes": ""}
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_domains_classified_once_across_runs() {
    console::set_quiet(true);
    let server = MockServer::start().await;
    mount_search(&server, "fresh.dev", "[fresh.dev](https://x)\nContinue\n$12.99\n").await;
    mount_search(&server, "owned.com", "[owned.com](https://x)\nMake offer\n").await;

    let config = config(&server);
    let tmp = TempDir::new().unwrap();
    let input = vec!["fresh.dev".to_string(), "owned.com".to_string()];

    let api = Arc::new(domain_client(&config).unwrap());
    let report = run_domain_check(&config, api.clone(), input.clone(), tmp.path(), false)
        .await
        .unwrap();
    assert_eq!(report.success, 2);
    assert_eq!(report.highlight, ("Available domains", 1));

    let ledger: Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join(LEDGER_JSON)).unwrap())
            .unwrap();
    let results = &ledger[0]["results"];
    assert_eq!(results[0]["domain"], "fresh.dev");
    assert_eq!(results[0]["availability"], "available");
    assert_eq!(results[0]["price"], "$12.99");
    assert_eq!(results[1]["availability"], "taken");
    assert_eq!(
        std::fs::read_to_string(tmp.path().join(AVAILABLE_TXT)).unwrap(),
        "fresh.dev\n"
    );

    let csv_before = std::fs::read_to_string(tmp.path().join(RESULTS_CSV)).unwrap();
    let report = run_domain_check(&config, api, input, tmp.path(), false)
        .await
        .unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(
        std::fs::read_to_string(tmp.path().join(RESULTS_CSV)).unwrap(),
        csv_before
    );
}

#[tokio::test]
async fn test_api_failure_is_recorded_not_fatal() {
    console::set_quiet(true);
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({"error": "Payment required"})))
        .mount(&server)
        .await;

    let config = config(&server);
    let tmp = TempDir::new().unwrap();
    let api = Arc::new(domain_client(&config).unwrap());
    let report = run_domain_check(&config, api, vec!["any.io".into()], tmp.path(), false)
        .await
        .unwrap();

    assert_eq!(report.failures, 1);
    assert!(report.ensure_progress().is_err());

    let ledger: Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join(LEDGER_JSON)).unwrap())
            .unwrap();
    assert_eq!(ledger[0]["results"][0]["ok"], false);
    assert_eq!(ledger[0]["results"][0]["error"], "Payment required");
}
