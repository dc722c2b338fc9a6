use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::briefing::BriefingOptions;
use super::domain::{
    CriterionDraft, CriterionId, HazardTemplateDraft, ParticipantDraft, ParticipantId,
    ProjectAttributes, ProjectId, ProjectStatus, ProjectSubmission, SelectionRule, TemplateId,
};
use super::repository::{
    AuditTrail, CriterionDefinitionStore, HazardTemplateStore, ProjectStore, RepositoryError,
};
use super::service::{AssessmentServiceError, ReevaluationMode, RiskAssessmentService};

type Shared<T, C, P, A> = State<Arc<RiskAssessmentService<T, C, P, A>>>;

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionRequest {
    pub(crate) template_ids: Vec<TemplateId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    pub(crate) status: ProjectStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReevaluateRequest {
    #[serde(default)]
    pub(crate) mode: ReevaluationMode,
}

/// An empty body selects the default mode; anything else must parse.
fn reevaluation_mode(body: &[u8]) -> Result<ReevaluationMode, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ReevaluationMode::default());
    }
    serde_json::from_slice::<ReevaluateRequest>(body).map(|request| request.mode)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TemplateFilter {
    pub(crate) group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupRenameRequest {
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignatureRequest {
    pub(crate) data: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateRuleRequest {
    #[serde(default)]
    pub(crate) rule: Option<SelectionRule>,
    #[serde(default)]
    pub(crate) attributes: ProjectAttributes,
    pub(crate) event_date: NaiveDate,
}

/// Router builder exposing the catalog, project and selection endpoints.
pub fn assessment_router<T, C, P, A>(service: Arc<RiskAssessmentService<T, C, P, A>>) -> Router
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    Router::new()
        .route(
            "/api/v1/criteria",
            get(list_criteria_handler::<T, C, P, A>).post(define_criterion_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/criteria/:criterion_id",
            put(update_criterion_handler::<T, C, P, A>)
                .delete(delete_criterion_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/hazards",
            get(list_templates_handler::<T, C, P, A>).post(create_template_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/hazards/:template_id",
            get(get_template_handler::<T, C, P, A>)
                .put(update_template_handler::<T, C, P, A>)
                .delete(delete_template_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/hazard-groups",
            get(list_groups_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/hazard-groups/:group",
            put(rename_group_handler::<T, C, P, A>).delete(delete_group_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/dashboard",
            get(dashboard_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects",
            get(list_projects_handler::<T, C, P, A>).post(create_project_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id",
            get(get_project_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/attributes",
            put(update_attributes_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/selection",
            put(set_selection_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/selection/preview",
            get(preview_selection_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/selection/reevaluate",
            post(reevaluate_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/status",
            put(set_status_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/risk",
            get(risk_summary_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/briefing",
            get(briefing_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/participants",
            post(add_participant_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/participants/:participant_id",
            axum::routing::delete(remove_participant_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/participants/:participant_id/signature",
            post(signature_handler::<T, C, P, A>),
        )
        .route(
            "/api/v1/selection/evaluate",
            post(evaluate_rule_handler::<T, C, P, A>),
        )
        .with_state(service)
}

/// Map a service error onto the HTTP status and `{"error": ...}` body used by every route.
pub fn error_response(err: AssessmentServiceError) -> Response {
    let status = match &err {
        AssessmentServiceError::Catalog(_) | AssessmentServiceError::UnknownTemplate(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AssessmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AssessmentServiceError::Repository(RepositoryError::Unavailable(_)) => {
            error!(error = %err, "store unavailable");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}

fn respond<V: serde::Serialize>(
    status: StatusCode,
    result: Result<V, AssessmentServiceError>,
) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_criteria_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::OK, service.list_criteria())
}

pub(crate) async fn define_criterion_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Json(draft): Json<CriterionDraft>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::CREATED, service.define_criterion(draft))
}

pub(crate) async fn update_criterion_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(criterion_id): Path<String>,
    Json(draft): Json<CriterionDraft>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.update_criterion(&CriterionId(criterion_id), draft),
    )
}

pub(crate) async fn delete_criterion_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(criterion_id): Path<String>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    match service.delete_criterion(&CriterionId(criterion_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_templates_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Query(filter): Query<TemplateFilter>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.list_templates_in(filter.group.as_deref()),
    )
}

pub(crate) async fn list_groups_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::OK, service.list_groups())
}

pub(crate) async fn rename_group_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(group): Path<String>,
    Json(request): Json<GroupRenameRequest>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::OK, service.rename_group(&group, &request.name))
}

pub(crate) async fn delete_group_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(group): Path<String>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    match service.delete_group(&group) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn dashboard_handler<T, C, P, A>(State(service): Shared<T, C, P, A>) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::OK, service.dashboard_summary())
}

pub(crate) async fn get_template_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(template_id): Path<String>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::OK, service.get_template(&TemplateId(template_id)))
}

pub(crate) async fn create_template_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Json(draft): Json<HazardTemplateDraft>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::CREATED, service.create_template(draft))
}

pub(crate) async fn update_template_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(template_id): Path<String>,
    Json(draft): Json<HazardTemplateDraft>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.update_template(&TemplateId(template_id), draft),
    )
}

pub(crate) async fn delete_template_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(template_id): Path<String>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    match service.delete_template(&TemplateId(template_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_projects_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::OK, service.list_projects())
}

pub(crate) async fn create_project_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Json(submission): Json<ProjectSubmission>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::CREATED, service.create_project(submission))
}

pub(crate) async fn get_project_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::OK, service.get_project(&ProjectId(project_id)))
}

pub(crate) async fn update_attributes_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
    Json(attributes): Json<ProjectAttributes>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.update_attributes(&ProjectId(project_id), attributes),
    )
}

pub(crate) async fn set_selection_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.set_selection(&ProjectId(project_id), request.template_ids),
    )
}

pub(crate) async fn preview_selection_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.preview_selection(&ProjectId(project_id)),
    )
}

pub(crate) async fn reevaluate_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    let mode = match reevaluation_mode(&body) {
        Ok(mode) => mode,
        Err(err) => {
            let payload = json!({ "error": format!("invalid reevaluation request: {err}") });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };
    respond(
        StatusCode::OK,
        service.reevaluate(&ProjectId(project_id), mode),
    )
}

pub(crate) async fn set_status_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.set_status(&ProjectId(project_id), request.status),
    )
}

pub(crate) async fn risk_summary_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(StatusCode::OK, service.risk_summary(&ProjectId(project_id)))
}

pub(crate) async fn briefing_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
    Query(options): Query<BriefingOptions>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    match service.briefing(&ProjectId(project_id), &options) {
        Ok(markdown) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            markdown,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn add_participant_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path(project_id): Path<String>,
    Json(draft): Json<ParticipantDraft>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::CREATED,
        service.add_participant(&ProjectId(project_id), draft),
    )
}

pub(crate) async fn signature_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path((project_id, participant_id)): Path<(String, String)>,
    Json(request): Json<SignatureRequest>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.record_signature(
            &ProjectId(project_id),
            &ParticipantId(participant_id),
            request.data,
        ),
    )
}

pub(crate) async fn remove_participant_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Path((project_id, participant_id)): Path<(String, String)>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    match service.remove_participant(&ProjectId(project_id), &ParticipantId(participant_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn evaluate_rule_handler<T, C, P, A>(
    State(service): Shared<T, C, P, A>,
    Json(request): Json<EvaluateRuleRequest>,
) -> Response
where
    T: HazardTemplateStore + 'static,
    C: CriterionDefinitionStore + 'static,
    P: ProjectStore + 'static,
    A: AuditTrail + 'static,
{
    respond(
        StatusCode::OK,
        service.evaluate_rule(
            request.rule.as_ref(),
            &request.attributes,
            request.event_date,
        ),
    )
}
