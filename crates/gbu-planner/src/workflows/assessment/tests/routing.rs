use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::assessment::domain::{ProjectAttributes, SiteFlag};
use crate::workflows::assessment::router::{create_project_handler, get_project_handler};
use crate::workflows::assessment::RiskAssessmentService;

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn create_project_handler_returns_created_with_selection() {
    let service = build_service();
    let template = service
        .create_template(hazard_draft("Elektroinstallation", Some(electricity_in_winter())))
        .expect("template stored");

    let response = create_project_handler::<
        MemoryTemplates,
        MemoryCriteria,
        MemoryProjects,
        MemoryAudit,
    >(
        State(Arc::new(service)),
        axum::Json(submission(flags(&[SiteFlag::HasElectricity]), winter_date())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["selection"]["selected"], json!([template.id.0]));
    assert_eq!(body["project"]["status"], "draft");
}

#[tokio::test]
async fn create_project_handler_returns_internal_error_on_store_outage() {
    let service = Arc::new(RiskAssessmentService::new(
        Arc::new(MemoryTemplates::default()),
        Arc::new(MemoryCriteria::default()),
        Arc::new(UnavailableProjects),
        Arc::new(MemoryAudit::default()),
    ));

    let response = create_project_handler::<
        MemoryTemplates,
        MemoryCriteria,
        UnavailableProjects,
        MemoryAudit,
    >(
        State(service),
        axum::Json(submission(ProjectAttributes::default(), winter_date())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn get_project_handler_returns_not_found() {
    let response = get_project_handler::<
        MemoryTemplates,
        MemoryCriteria,
        MemoryProjects,
        MemoryAudit,
    >(
        State(Arc::new(build_service())),
        Path("prj-unknown".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "record not found");
}

#[tokio::test]
async fn submission_with_reversed_schedule_is_unprocessable() {
    let router = router_for(build_service());
    let mut payload =
        serde_json::to_value(submission(ProjectAttributes::default(), winter_date()))
            .expect("serialize submission");
    payload["schedule"]["event_end"] = json!("2023-12-01");

    let response = router
        .oneshot(json_request("POST", "/api/v1/projects", payload))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn criteria_routes_define_and_reject_duplicates() {
    let router = router_for(build_service());
    let draft = json!({
        "name": "Bereiche",
        "type": "multiselect",
        "category": "custom",
        "options": ["A", "B", "C"]
    });

    let created = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/criteria", draft.clone()))
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json_body(created).await;
    assert_eq!(body["type"], "multiselect");

    let duplicate = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/criteria", draft))
        .await
        .expect("router responds");
    assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let listing = router
        .oneshot(get("/api/v1/criteria"))
        .await
        .expect("router responds");
    let body = read_json_body(listing).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn selection_route_rejects_unknown_template() {
    let service = build_service();
    let created = service
        .create_project(submission(ProjectAttributes::default(), winter_date()))
        .expect("project created");
    let router = router_for(service);

    let response = router
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/projects/{}/selection", created.project.id),
            json!({ "template_ids": ["hzd-ghost"] }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "hazard template hzd-ghost does not exist");
}

#[tokio::test]
async fn reevaluate_route_defaults_to_merge() {
    let service = build_service();
    let manual = service
        .create_template(hazard_draft("Lärm", None))
        .expect("template stored");
    let created = service
        .create_project(submission(ProjectAttributes::default(), winter_date()))
        .expect("project created");
    service
        .set_selection(&created.project.id, vec![manual.id.clone()])
        .expect("selection stored");
    let router = router_for(service);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!(
                    "/api/v1/projects/{}/selection/reevaluate",
                    created.project.id
                ))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["project"]["selected_templates"], json!([manual.id.0]));
}

#[tokio::test]
async fn evaluate_route_reports_mismatch_reason() {
    let router = router_for(build_service());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/selection/evaluate",
            json!({
                "rule": { "required_flags": ["has_electricity"], "seasons": ["winter"] },
                "attributes": { "has_electricity": true },
                "event_date": "2024-07-15"
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["matches"], false);
    assert_eq!(body["season"], "summer");
    assert_eq!(body["mismatch"]["kind"], "season");
}

#[tokio::test]
async fn briefing_route_renders_markdown() {
    let service = build_service();
    let created = service
        .create_project(submission(ProjectAttributes::default(), winter_date()))
        .expect("project created");
    let router = router_for(service);

    let response = router
        .oneshot(get(&format!(
            "/api/v1/projects/{}/briefing?country=USA&date=2024-01-12",
            created.project.id
        )))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/markdown; charset=utf-8"
    );
    let text = read_text_body(response).await;
    assert!(text.contains("**Datum:** 12.01.2024"));
    assert!(text.contains("- **Polizei:** 911"));
    assert!(!text.contains("EU-weite Notrufnummer"));
}

#[tokio::test]
async fn participant_routes_sign_and_remove() {
    let service = build_service();
    let created = service
        .create_project(submission(ProjectAttributes::default(), winter_date()))
        .expect("project created");
    let project_path = format!("/api/v1/projects/{}", created.project.id);
    let router = router_for(service);

    let added = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{project_path}/participants"),
            json!({ "first_name": "Mia", "last_name": "Roth" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(added.status(), StatusCode::CREATED);
    let participant = read_json_body(added).await;
    let participant_id = participant["id"].as_str().expect("participant id").to_string();

    let signed = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{project_path}/participants/{participant_id}/signature"),
            json!({ "data": "data:image/png;base64,AAAA" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(signed.status(), StatusCode::OK);

    let removed = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("{project_path}/participants/{participant_id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let project = router
        .oneshot(get(&project_path))
        .await
        .expect("router responds");
    let body = read_json_body(project).await;
    assert_eq!(body["participants"], json!([]));
}

#[tokio::test]
async fn hazard_routes_round_trip_templates() {
    let criteria = MemoryCriteria::seeded(catalog());
    let service = RiskAssessmentService::new(
        Arc::new(MemoryTemplates::default()),
        Arc::new(criteria),
        Arc::new(MemoryProjects::default()),
        Arc::new(MemoryAudit::default()),
    );
    let router = router_for(service);
    let draft = serde_json::to_value(hazard_draft(
        "Hochwasser",
        Some(custom_rule("crit-water", None)),
    ))
    .expect("serialize draft");

    let created = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/hazards", draft))
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let template = read_json_body(created).await;
    let id = template["id"].as_str().expect("template id").to_string();
    assert_eq!(
        template["selection_rule"]["custom_criteria"],
        json!(["crit-water"])
    );

    let fetched = router
        .clone()
        .oneshot(get(&format!("/api/v1/hazards/{id}")))
        .await
        .expect("router responds");
    assert_eq!(fetched.status(), StatusCode::OK);

    let deleted = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/hazards/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = router
        .oneshot(get(&format!("/api/v1/hazards/{id}")))
        .await
        .expect("router responds");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reevaluate_route_rejects_malformed_mode() {
    let service = build_service();
    let manual = service
        .create_template(hazard_draft("Lärm", None))
        .expect("template stored");
    let created = service
        .create_project(submission(ProjectAttributes::default(), winter_date()))
        .expect("project created");
    service
        .set_selection(&created.project.id, vec![manual.id.clone()])
        .expect("selection stored");
    let router = router_for(service);
    let uri = format!(
        "/api/v1/projects/{}/selection/reevaluate",
        created.project.id
    );

    for body in [
        json!({ "mode": "Replace" }),
        json!({ "mode": "replce" }),
        json!({ "mod": "replace" }),
    ] {
        let response = router
            .clone()
            .oneshot(json_request("POST", &uri, body))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let garbled = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri.as_str())
                .body(Body::from("mode=replace"))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(garbled.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let project = router
        .clone()
        .oneshot(get(&format!("/api/v1/projects/{}", created.project.id)))
        .await
        .expect("router responds");
    let body = read_json_body(project).await;
    assert_eq!(body["selected_templates"], json!([manual.id.0.clone()]));

    let replaced = router
        .oneshot(json_request("POST", &uri, json!({ "mode": "replace" })))
        .await
        .expect("router responds");
    assert_eq!(replaced.status(), StatusCode::OK);
    let body = read_json_body(replaced).await;
    assert_eq!(body["project"]["selected_templates"], json!([]));
}

#[tokio::test]
async fn camel_case_rule_and_attribute_keys_are_rejected() {
    let router = router_for(build_service());

    let evaluated = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/selection/evaluate",
            json!({
                "rule": { "hasElectricity": true },
                "attributes": { "has_electricity": true },
                "event_date": "2024-01-15"
            }),
        ))
        .await
        .expect("router responds");
    assert!(evaluated.status().is_client_error());

    let mut project = serde_json::to_value(submission(
        ProjectAttributes::default(),
        winter_date(),
    ))
    .expect("serialize submission");
    project["attributes"] = json!({ "isOutdoor": true });
    let created = router
        .clone()
        .oneshot(json_request("POST", "/api/v1/projects", project))
        .await
        .expect("router responds");
    assert!(created.status().is_client_error());

    let mut draft = serde_json::to_value(hazard_draft("Lärm", None)).expect("serialize draft");
    draft["selection_rule"] = json!({});
    let empty_rule = router
        .oneshot(json_request("POST", "/api/v1/hazards", draft))
        .await
        .expect("router responds");
    assert_eq!(empty_rule.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn hazard_group_routes_filter_rename_and_delete() {
    let service = build_service();
    for (activity, group) in [
        ("Kabelverlegung", "Elektrik"),
        ("Verteilerkasten", "Elektrik"),
        ("Traversenmontage", "Hoehe"),
    ] {
        let mut draft = hazard_draft(activity, None);
        draft.group = Some(group.to_string());
        service.create_template(draft).expect("template stored");
    }
    let router = router_for(service);

    let filtered = router
        .clone()
        .oneshot(get("/api/v1/hazards?group=Elektrik"))
        .await
        .expect("router responds");
    assert_eq!(filtered.status(), StatusCode::OK);
    let body = read_json_body(filtered).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let renamed = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/hazard-groups/Elektrik",
            json!({ "name": "Strom" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(renamed.status(), StatusCode::OK);

    let duplicate = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/hazard-groups/Strom",
            json!({ "name": "Hoehe" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let deleted = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/hazard-groups/Hoehe")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let groups = router
        .clone()
        .oneshot(get("/api/v1/hazard-groups"))
        .await
        .expect("router responds");
    let body = read_json_body(groups).await;
    assert_eq!(body, json!([{ "name": "Strom", "templates": 2 }]));

    let library = router
        .oneshot(get("/api/v1/hazards"))
        .await
        .expect("router responds");
    let body = read_json_body(library).await;
    assert_eq!(body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn dashboard_route_reports_counts() {
    let service = build_service();
    service
        .create_template(hazard_draft("Elektroinstallation", Some(electricity_in_winter())))
        .expect("template stored");
    let created = service
        .create_project(submission(flags(&[SiteFlag::HasElectricity]), winter_date()))
        .expect("project created");
    let router = router_for(service);

    let activated = router
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/projects/{}/status", created.project.id),
            json!({ "status": "active" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(activated.status(), StatusCode::OK);

    let response = router
        .oneshot(get("/api/v1/dashboard"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(
        body,
        json!({
            "total_projects": 1,
            "active_projects": 1,
            "assigned_assessments": 1,
            "hazard_templates": 1
        })
    );
}
