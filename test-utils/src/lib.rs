//! `test-utils` is used for testing in both `pacer-lib` and `pacer-bin`.
//! This crate does not depend on `pacer-lib` or `pacer-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status when
/// handling any GET request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Create a mock web server serving `path` with the given status, and
/// verifying on drop that it received exactly `$times` requests for it
#[macro_export]
macro_rules! expecting_mock_server {
    ($path:expr, $status:expr, $times:expr) => {{
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path($path))
            .respond_with(wiremock::ResponseTemplate::new(http::StatusCode::from($status)))
            .expect($times)
            .mount(&mock_server)
            .await;
        mock_server
    }};
}

/// Number of requests a mock server has received so far.
///
/// Request recording is enabled by default for `wiremock::MockServer`.
#[macro_export]
macro_rules! received_count {
    ($mock_server:expr) => {{
        $mock_server
            .received_requests()
            .await
            .expect("Request recording should be enabled")
            .len()
    }};
}
