use httpmock::Method::GET;
use httpmock::{Mock, MockServer};
use serde_json::json;

pub fn mock_method_success<'a>(
    server: &'a MockServer,
    method: &str,
    body: serde_json::Value,
) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path(format!("/{method}"));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(body);
    })
}

pub fn mock_method_error<'a>(
    server: &'a MockServer,
    method: &str,
    code: i64,
    description: &str,
) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path(format!("/{method}"));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "error_code": code,
                "error_description": description,
            }));
    })
}

pub fn mock_method_unavailable<'a>(server: &'a MockServer, method: &str) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path(format!("/{method}"));
        then.status(503).body("service unavailable");
    })
}

pub fn mock_method_invalid_payload<'a>(server: &'a MockServer, method: &str) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path(format!("/{method}"));
        then.status(200)
            .header("content-type", "text/html")
            .body("<html>maintenance</html>");
    })
}

pub fn mock_news_getmany(server: &MockServer) -> Mock<'_> {
    mock_method_success(
        server,
        "news/getmany",
        json!({
            "items": [
                {"id": 101, "title": "New seasonal menu"},
                {"id": 102, "title": "Weekend opening hours"}
            ]
        }),
    )
}

/// Catch-all GET mock, used to prove that a code path made no network call.
pub fn mock_any_get(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({}));
    })
}
