mod common;

use anyhow::{anyhow, Result};
use common::{build_test_context, request_no_body};
use std::collections::{BTreeSet, HashSet};

#[tokio::test]
async fn openapi_paths_should_be_covered_by_test_matrix() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(paths) = body["paths"].as_object() else {
        return Err(anyhow!("openapi paths should be object"));
    };

    let mut exposed: BTreeSet<String> = BTreeSet::new();
    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            return Err(anyhow!("path methods should be object for {path}"));
        };
        for method in methods.keys() {
            let method = method.to_ascii_uppercase();
            exposed.insert(format!("{method} {path}"));
        }
    }

    let covered: HashSet<String> = [
        "GET /v1/health",
        "POST /v1/auth/register",
        "POST /v1/auth/login",
        "POST /v1/auth/otp/send",
        "POST /v1/auth/otp/verify",
        "GET /v1/me",
        "PUT /v1/me",
        "GET /v1/ngos",
        "GET /v1/campaigns",
        "POST /v1/campaigns",
        "GET /v1/campaigns/{id}",
        "PUT /v1/campaigns/{id}",
        "POST /v1/campaigns/{id}/applications",
        "GET /v1/applications/mine",
        "GET /v1/applications/review",
        "PUT /v1/applications/{id}/status",
        "POST /v1/ngos/{id}/registrations",
        "GET /v1/registrations/mine",
        "GET /v1/registrations/review",
        "PUT /v1/registrations/{id}/status",
        "GET /v1/notifications",
        "POST /v1/notifications/{id}/read",
        "POST /v1/notifications/read-all",
        "GET /v1/notifications/stream",
        "POST /v1/notifications/send",
        "POST /v1/match/volunteer",
    ]
    .into_iter()
    .map(|s| s.to_string())
    .collect();

    let missing: Vec<String> = exposed
        .into_iter()
        .filter(|route| {
            route.starts_with("GET /v1/")
                || route.starts_with("POST /v1/")
                || route.starts_with("PUT /v1/")
                || route.starts_with("DELETE /v1/")
        })
        .filter(|route| !route.starts_with("GET /v1/openapi"))
        .filter(|route| !covered.contains(route))
        .collect();

    assert!(
        missing.is_empty(),
        "missing endpoint coverage for: {missing:?}"
    );
    Ok(())
}

#[tokio::test]
async fn openapi_list_query_params_should_be_optional() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(paths) = body["paths"].as_object() else {
        return Err(anyhow!("openapi paths should be object"));
    };

    let cases: &[(&str, &[&str])] = &[
        ("/v1/ngos", &["limit", "offset"]),
        (
            "/v1/campaigns",
            &["category__eq", "ngo_id__eq", "limit", "offset"],
        ),
        ("/v1/applications/mine", &["status__eq"]),
        (
            "/v1/applications/review",
            &["status__eq", "campaign_id__eq", "limit", "offset"],
        ),
        ("/v1/registrations/mine", &["status__eq"]),
        (
            "/v1/registrations/review",
            &["status__eq", "limit", "offset"],
        ),
    ];

    for (path, names) in cases {
        let operation = paths
            .get(*path)
            .and_then(|item| item.get("get"))
            .ok_or_else(|| anyhow!("missing GET operation for path {path}"))?;
        let Some(parameters) = operation["parameters"].as_array() else {
            return Err(anyhow!("missing parameters for GET {path}"));
        };

        for name in *names {
            let parameter = parameters
                .iter()
                .find(|param| {
                    param["in"].as_str() == Some("query") && param["name"].as_str() == Some(*name)
                })
                .ok_or_else(|| anyhow!("missing query parameter {name} on GET {path}"))?;

            let required = parameter
                .get("required")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);

            assert!(
                !required,
                "query parameter {name} on GET {path} should be optional"
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn openapi_schemas_should_expose_the_session_and_feed_contracts() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(schemas) = body["components"]["schemas"].as_object() else {
        return Err(anyhow!("openapi components.schemas should be object"));
    };

    let otp_auth = schemas
        .get("OtpAuthResponse")
        .ok_or_else(|| anyhow!("OtpAuthResponse schema should exist"))?;
    let Some(props) = otp_auth["properties"].as_object() else {
        return Err(anyhow!("OtpAuthResponse.properties should be object"));
    };
    for field in [
        "access_token",
        "expires_in",
        "profile_id",
        "account_type",
        "magic_link",
    ] {
        assert!(
            props.contains_key(field),
            "OtpAuthResponse should contain field {field}"
        );
    }

    let page = schemas
        .get("NotificationsPage")
        .ok_or_else(|| anyhow!("NotificationsPage schema should exist"))?;
    let Some(props) = page["properties"].as_object() else {
        return Err(anyhow!("NotificationsPage.properties should be object"));
    };
    for field in ["items", "unread_count"] {
        assert!(
            props.contains_key(field),
            "NotificationsPage should contain field {field}"
        );
    }

    let matches = schemas
        .get("MatchResponse")
        .ok_or_else(|| anyhow!("MatchResponse schema should exist"))?;
    let Some(props) = matches["properties"].as_object() else {
        return Err(anyhow!("MatchResponse.properties should be object"));
    };
    for field in ["provider", "model", "matches"] {
        assert!(
            props.contains_key(field),
            "MatchResponse should contain field {field}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn openapi_yaml_mirror_should_serve_the_same_document() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.yaml", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let text = body
        .as_str()
        .ok_or_else(|| anyhow!("yaml body should be text"))?;
    assert!(text.contains("openapi:"));
    assert!(text.contains("/v1/campaigns"));
    Ok(())
}
