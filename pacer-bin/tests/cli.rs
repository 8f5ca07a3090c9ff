#[cfg(test)]
mod cli {
    use assert_cmd::cargo::cargo_bin_cmd;
    use http::StatusCode;
    use predicates::{prelude::PredicateBooleanExt, str::contains};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::{
        error::Error,
        io::Write,
        time::{Duration, Instant},
    };
    use tempfile::NamedTempFile;
    use test_utils::{expecting_mock_server, mock_server, received_count};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method},
    };

    type Result<T> = std::result::Result<T, Box<dyn Error>>;

    fn config_file(contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(contents.as_bytes())?;
        Ok(file)
    }

    #[tokio::test]
    async fn test_reports_status_and_content_type() -> Result<()> {
        let mock_server = mock_server!(
            StatusCode::OK,
            insert_header("Content-Type", "text/plain")
        );
        let url = format!("{}/", mock_server.uri());

        cargo_bin_cmd!()
            .arg(&url)
            .assert()
            .success()
            .stdout(contains(format!(
                "Request 1 to {url} completed with status 200 (text/plain)"
            )))
            .stdout(contains("1 requests (100% success, 0 failed)"));

        Ok(())
    }

    #[tokio::test]
    async fn test_requests_are_rate_limited() -> Result<()> {
        let mock_server = expecting_mock_server!("/limited", StatusCode::OK, 3);
        let url = format!("{}/limited", mock_server.uri());

        let start = Instant::now();
        cargo_bin_cmd!()
            .args(["--window", "1s", "--limit", "2", "--repeat", "3"])
            .arg(&url)
            .assert()
            .success()
            .stdout(contains("Request 3"))
            .stdout(contains("throttled 1 times"));

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(received_count!(mock_server), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_urls_are_requested_in_order() -> Result<()> {
        let mock_server = mock_server!(StatusCode::OK);
        let first = format!("{}/first", mock_server.uri());
        let second = format!("{}/second", mock_server.uri());

        cargo_bin_cmd!().arg(&first).arg(&second).assert().success();

        let paths: Vec<String> = mock_server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|request| request.url.path().to_string())
            .collect();
        assert_eq!(paths, vec!["/first", "/second"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_fails() -> Result<()> {
        let mock_server = mock_server!(StatusCode::INTERNAL_SERVER_ERROR);

        cargo_bin_cmd!()
            .arg(mock_server.uri())
            .assert()
            .failure()
            .code(2)
            .stdout(contains("completed with status 500"));

        Ok(())
    }

    #[test]
    fn test_network_error_fails() {
        // Nothing listens on port 9 of the loopback interface
        cargo_bin_cmd!()
            .args(["--timeout", "2", "http://127.0.0.1:9/"])
            .assert()
            .failure()
            .code(2)
            .stdout(contains("Request 1 to http://127.0.0.1:9/ failed"));
    }

    #[test]
    fn test_invalid_limit_is_a_config_error() {
        cargo_bin_cmd!()
            .args(["--limit", "0", "https://example.com"])
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Invalid rate limit"));
    }

    #[test]
    fn test_zero_window_is_a_config_error() {
        cargo_bin_cmd!()
            .args(["--window", "0s", "https://example.com"])
            .assert()
            .failure()
            .code(3);
    }

    #[test]
    fn test_invalid_url_is_a_config_error() {
        cargo_bin_cmd!()
            .arg("not a url")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Invalid URL"));
    }

    #[test]
    fn test_invalid_method_is_a_config_error() {
        cargo_bin_cmd!()
            .args(["-X", "NOT A METHOD", "https://example.com"])
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Invalid request method"));
    }

    #[tokio::test]
    async fn test_json_output() -> Result<()> {
        let mock_server = mock_server!(StatusCode::OK);

        let assert = cargo_bin_cmd!()
            .args(["--format", "json", "--repeat", "2"])
            .arg(mock_server.uri())
            .assert()
            .success();
        let output = serde_json::from_slice::<Value>(&assert.get_output().stdout)?;

        let requests = output["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["index"], 1);
        assert_eq!(requests[1]["status"], 200);
        assert_eq!(output["stats"]["total_requests"], 2);
        assert_eq!(output["stats"]["failed_requests"], 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_config_file() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(header("x-token", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&mock_server)
            .await;

        let config = config_file(
            r#"
            window = "1s"
            limit = 5
            repeat = 2
            method = "head"

            [header]
            X-Token = "secret"
            "#,
        )?;

        cargo_bin_cmd!()
            .arg("--config")
            .arg(config.path())
            .arg(mock_server.uri())
            .assert()
            .success()
            .stdout(contains("2 requests (100% success, 0 failed)"));

        Ok(())
    }

    #[test]
    fn test_invalid_config_file() -> Result<()> {
        let config = config_file("burst = 3")?;

        cargo_bin_cmd!()
            .arg("--config")
            .arg(config.path())
            .arg("https://example.com")
            .assert()
            .failure()
            .code(3)
            .stderr(contains("Cannot load configuration file"));

        Ok(())
    }

    #[test]
    fn test_missing_config_file() {
        cargo_bin_cmd!()
            .args(["--config", "does-not-exist.toml", "https://example.com"])
            .assert()
            .failure()
            .code(3);
    }

    #[tokio::test]
    async fn test_config_file_sets_log_level() -> Result<()> {
        let mock_server = mock_server!(StatusCode::OK);
        let config = config_file(r#"verbose = "debug""#)?;

        cargo_bin_cmd!()
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(config.path())
            .arg(mock_server.uri())
            .assert()
            .success()
            .stderr(contains("[DEBUG] Dispatch worker started"));

        Ok(())
    }

    #[test]
    fn test_cli_overrides_config_file() -> Result<()> {
        let config = config_file("limit = 0")?;

        // The zero limit of the file is replaced by the CLI value
        cargo_bin_cmd!()
            .arg("--config")
            .arg(config.path())
            .args(["--limit", "1", "--timeout", "2", "http://127.0.0.1:9/"])
            .assert()
            .code(2)
            .stderr(contains("Invalid rate limit").not());

        Ok(())
    }

    #[test]
    fn test_help_lists_rate_limit_options() {
        cargo_bin_cmd!()
            .arg("--help")
            .assert()
            .success()
            .stdout(contains("--window").and(contains("--limit")).and(contains("--repeat")));
    }
}
