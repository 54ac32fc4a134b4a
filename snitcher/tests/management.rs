use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};
use snitcher::{Client, Error, Interval, SnitchAttributes, SnitchFilter, Status};
use wiremock::matchers::{body_json, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "abc123";
// base64("abc123:")
const AUTH: &str = "Basic YWJjMTIzOg==";

fn snitch_json(token: &str, tags: &[&str]) -> Value {
    json!({
        "token": token,
        "href": format!("/v1/snitches/{token}"),
        "name": "Daily Backups",
        "tags": tags,
        "status": "healthy",
        "checked_in_at": "2014-01-01T12:00:00.000Z",
        "type": { "interval": "daily" },
        "check_in_url": format!("https://nosnch.in/{token}"),
        "created_at": "2014-01-01T08:00:00.000Z",
        "notes": "Important user data.",
        "alert_email": ["ops@example.com"]
    })
}

async fn setup() -> (MockServer, Client) {
    let server = MockServer::start().await;
    let client = Client::new(API_KEY)
        .unwrap()
        .with_endpoint(&server.uri())
        .unwrap();
    (server, client)
}

#[tokio::test]
async fn list_sends_auth_and_user_agent() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/v1/snitches"))
        .and(header("authorization", AUTH))
        .and(header_regex("user-agent", r"^Snitcher; Rust/.*; v\d+\.\d+\.\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            snitch_json("c2354d53d2", &["production"]),
            snitch_json("c2354d53d3", &[]),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let snitches = client.list(&SnitchFilter::new()).await.unwrap();
    assert_eq!(snitches.len(), 2);
    assert_eq!(snitches[0].token, "c2354d53d2");
    assert_eq!(snitches[0].status, Status::Healthy);
    assert_eq!(snitches[0].alert_email, vec!["ops@example.com"]);
    assert_eq!(snitches[1].token, "c2354d53d3");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn list_filters_by_tags() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/v1/snitches"))
        .and(query_param("tags", "production,critical"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            snitch_json("c2354d53d2", &["production", "critical"]),
            snitch_json("c2354d53d3", &["production", "critical", "backups"]),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let filter = SnitchFilter::new().tags([" production", "critical", "production "]);
    let snitches = client.list(&filter).await.unwrap();
    assert_eq!(snitches.len(), 2);
    for snitch in &snitches {
        assert!(snitch.tags.contains(&"production".to_string()));
        assert!(snitch.tags.contains(&"critical".to_string()));
    }
}

#[tokio::test]
async fn get_returns_snitch() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/v1/snitches/c2354d53d2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(snitch_json("c2354d53d2", &["critical"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let snitch = client.get("c2354d53d2").await.unwrap();
    assert_eq!(snitch.token, "c2354d53d2");
    assert_eq!(snitch.name, "Daily Backups");
    assert_eq!(snitch.tags, vec!["critical"]);
    assert_eq!(snitch.interval, Interval::Daily);
    assert_eq!(snitch.notes.as_deref(), Some("Important user data."));
    assert!(snitch.checked_in_time().is_some());
}

#[tokio::test]
async fn get_missing_snitch_is_not_found() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/v1/snitches/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "type": "resource_not_found",
            "error": "Not Found"
        })))
        .mount(&server)
        .await;

    let err = client.get("missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err:?}");
    assert_eq!(err.error_type(), Some("resource_not_found"));
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn create_promotes_interval() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/snitches"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "name": "Daily Backups",
            "type": { "interval": "daily" },
            "notes": "On error check the print tray for paper jams",
            "tags": ["backups", "maintenance"]
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(snitch_json("c2354d53d2", &["backups", "maintenance"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let attrs = SnitchAttributes::new()
        .name("Daily Backups")
        .interval(Interval::Daily)
        .notes("On error check the print tray for paper jams")
        .tags(["backups", " maintenance", "backups"]);
    let snitch = client.create(&attrs).await.unwrap();
    assert_eq!(snitch.token, "c2354d53d2");
    assert_eq!(snitch.check_in_url.as_deref(), Some("https://nosnch.in/c2354d53d2"));
    assert!(snitch.created_time().is_some());
}

#[tokio::test]
async fn create_invalid_snitch_reports_validations() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/snitches"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "type": "resource_invalid",
            "error": "Snitch is invalid",
            "validations": [
                { "attribute": "name", "message": "Can't be blank." },
                { "attribute": "type.interval", "message": "Can't be blank." }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let attrs = SnitchAttributes::from_json(json!({ "name": "", "interval": "" })).unwrap();
    let err = client.create(&attrs).await.unwrap_err();
    let Error::Validation(validation) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    let expected: BTreeMap<String, String> = [
        ("name".to_string(), "Can't be blank.".to_string()),
        ("type.interval".to_string(), "Can't be blank.".to_string()),
    ]
    .into_iter()
    .collect();
    assert_eq!(validation.errors, expected);
    assert_eq!(validation.api.message, "Snitch is invalid");
}

#[tokio::test]
async fn update_with_null_tags_clears_them() {
    let (server, client) = setup().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/snitches/c2354d53d2"))
        .and(body_json(json!({ "tags": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(snitch_json("c2354d53d2", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let attrs = SnitchAttributes::from_json(json!({ "tags": null })).unwrap();
    let snitch = client.update("c2354d53d2", &attrs).await.unwrap();
    assert!(snitch.tags.is_empty());
}

#[tokio::test]
async fn update_sends_only_given_fields() {
    let (server, client) = setup().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/snitches/c2354d53d2"))
        .and(body_json(json!({
            "name": "Monthly Backups",
            "type": { "interval": "monthly" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(snitch_json("c2354d53d2", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let attrs = SnitchAttributes::from_json(json!({
        "name": "Monthly Backups",
        "interval": "hourly",
        "type": { "interval": "monthly" }
    }))
    .unwrap();
    client.update("c2354d53d2", &attrs).await.unwrap();
}

#[tokio::test]
async fn replace_and_clear_tags_patch_the_snitch() {
    let (server, client) = setup().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/snitches/c2354d53d2"))
        .and(body_json(json!({ "tags": ["production", "urgent"] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(snitch_json("c2354d53d2", &["production", "urgent"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/snitches/c2354d53d2"))
        .and(body_json(json!({ "tags": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(snitch_json("c2354d53d2", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let snitch = client
        .replace_tags("c2354d53d2", ["production", "urgent"])
        .await
        .unwrap();
    assert_eq!(snitch.tags, vec!["production", "urgent"]);

    let snitch = client.clear_tags("c2354d53d2").await.unwrap();
    assert!(snitch.tags.is_empty());
}

#[tokio::test]
async fn add_tags_posts_array() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/snitches/c2354d53d2/tags"))
        .and(body_json(json!(["red", "green"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["yellow", "red", "green"])))
        .expect(1)
        .mount(&server)
        .await;

    let tags = client.add_tags("c2354d53d2", ["red", "green"]).await.unwrap();
    assert_eq!(tags, vec!["yellow", "red", "green"]);
}

#[tokio::test]
async fn remove_tag_encodes_the_tag() {
    let (server, client) = setup().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["critical"])))
        .expect(1)
        .mount(&server)
        .await;

    let tags = client
        .remove_tag("c2354d53d2", "tag with spaces")
        .await
        .unwrap();
    assert_eq!(tags, vec!["critical"]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].url.path(),
        "/v1/snitches/c2354d53d2/tags/tag%20with%20spaces"
    );
}

#[tokio::test]
async fn pause_with_no_content_is_unit() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/snitches/c2354d53d2/pause"))
        .and(header("authorization", AUTH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let () = client.pause("c2354d53d2").await.unwrap();
}

#[tokio::test]
async fn delete_snitch() {
    let (server, client) = setup().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/snitches/c2354d53d2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete("c2354d53d2").await.unwrap();
}

#[tokio::test]
async fn forbidden_is_unauthorized() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client.list(&SnitchFilter::new()).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)), "{err:?}");
}

#[tokio::test]
async fn invalid_api_key_is_authentication_error() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "api_key_invalid",
            "error": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let err = client.get("c2354d53d2").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)), "{err:?}");
    assert_eq!(err.api_error().unwrap().message, "Invalid API key");
}

#[tokio::test]
async fn plan_limit_and_account_hold() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/snitches"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "type": "plan_limit_reached",
            "error": "Upgrade your plan"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "type": "account_on_hold",
            "error": "Account is on hold"
        })))
        .mount(&server)
        .await;

    let attrs = SnitchAttributes::new().name("x").interval(Interval::Hourly);
    let err = client.create(&attrs).await.unwrap_err();
    assert!(matches!(err, Error::PlanLimitReached(_)), "{err:?}");
    let err = client.update("c2354d53d2", &attrs).await.unwrap_err();
    assert!(matches!(err, Error::AccountOnHold(_)), "{err:?}");
}

#[tokio::test]
async fn server_error_keeps_raw_body() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    match client.get("c2354d53d2").await {
        Err(Error::InternalServer { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body, "<html>Bad Gateway</html>");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_error_type_is_generic_api_error() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "type": "not_documented",
            "error": "Oh noes!"
        })))
        .mount(&server)
        .await;

    let err = client.get("c2354d53d2").await.unwrap_err();
    match err {
        Error::Api(api) => {
            assert_eq!(api.error_type, "not_documented");
            assert_eq!(api.message, "Oh noes!");
            assert_eq!(api.status_code, Some(400));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = client
        .with_timeout(Duration::from_millis(50))
        .list(&SnitchFilter::new())
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
}

#[tokio::test]
async fn username_password_mode_uses_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/snitches"))
        // base64("user:pass")
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::with_credentials("user", "pass")
        .unwrap()
        .with_endpoint(&server.uri())
        .unwrap();
    assert!(client.list(&SnitchFilter::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_with_null_notes_clears_them() {
    let (server, client) = setup().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/snitches/c2354d53d2"))
        .and(body_json(json!({ "notes": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(snitch_json("c2354d53d2", &[])))
        .expect(2)
        .mount(&server)
        .await;

    let attrs = SnitchAttributes::from_json(json!({ "notes": null })).unwrap();
    client.update("c2354d53d2", &attrs).await.unwrap();
    client
        .update("c2354d53d2", &SnitchAttributes::new().clear_notes())
        .await
        .unwrap();
}

#[tokio::test]
async fn list_tolerates_unknown_intervals() {
    let (server, client) = setup().await;
    let mut newer = snitch_json("c2354d53d3", &[]);
    newer["type"]["interval"] = json!("5_minute");
    Mock::given(method("GET"))
        .and(path("/v1/snitches"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([snitch_json("c2354d53d2", &[]), newer])),
        )
        .mount(&server)
        .await;

    let snitches = client.list(&SnitchFilter::new()).await.unwrap();
    assert_eq!(snitches.len(), 2);
    assert_eq!(snitches[0].interval, Interval::Daily);
    assert_eq!(snitches[1].interval, Interval::Unknown);
}

#[tokio::test]
async fn remove_blank_tag_is_rejected_without_a_request() {
    let (server, client) = setup().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    for tag in ["", "   "] {
        let err = client.remove_tag("c2354d53d2", tag).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err:?}");
    }
}
