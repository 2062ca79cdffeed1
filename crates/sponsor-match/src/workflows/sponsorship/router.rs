use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::allocation::AllocationError;
use super::bulk::BulkMatchingError;
use super::domain::{AllocationId, JobId, RuleId, SponsorId, StudentId};
use super::finder::{MatchError, MatchQuery};
use super::repository::{MatchingStore, NotificationPublisher, RepositoryError};
use super::rules::RuleDraft;
use super::service::{SponsorshipMatchingService, SponsorshipServiceError};

type SharedService<S, N> = Arc<SponsorshipMatchingService<S, N>>;

/// Router builder exposing the matching engine to admin tooling and schedulers.
pub fn sponsorship_router<S, N>(service: SharedService<S, N>) -> Router
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/sponsorship/matches", post(find_matches_handler::<S, N>))
        .route("/api/v1/sponsorship/bulk-jobs", post(bulk_matching_handler::<S, N>))
        .route(
            "/api/v1/sponsorship/bulk-jobs/:job_id",
            get(job_status_handler::<S, N>),
        )
        .route("/api/v1/sponsorship/rules", get(list_rules_handler::<S, N>))
        .route(
            "/api/v1/sponsorship/rules/:rule_id",
            put(save_rule_handler::<S, N>).delete(delete_rule_handler::<S, N>),
        )
        .route(
            "/api/v1/sponsorship/allocations",
            post(create_allocation_handler::<S, N>),
        )
        .route(
            "/api/v1/sponsorship/allocations/:allocation_id/approve",
            post(approve_allocation_handler::<S, N>),
        )
        .route(
            "/api/v1/sponsorship/conflicts/resolve",
            post(resolve_conflicts_handler::<S, N>),
        )
        .route(
            "/api/v1/sponsorship/students/:student_id/allocations",
            get(student_allocations_handler::<S, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentRequest {
    pub(crate) student_id: StudentId,
    pub(crate) sponsor_id: SponsorId,
}

pub(crate) async fn find_matches_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Json(query): Json<MatchQuery>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.find_matches(&query) {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn bulk_matching_handler<S, N>(
    State(service): State<SharedService<S, N>>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.run_bulk_matching() {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn job_status_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(job_id): Path<String>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.job(&JobId(job_id)) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_rules_handler<S, N>(State(service): State<SharedService<S, N>>) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.matching_rules() {
        Ok(rules) => (StatusCode::OK, Json(rules)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn save_rule_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(rule_id): Path<String>,
    Json(draft): Json<RuleDraft>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.save_rule(RuleId(rule_id), draft) {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_rule_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(rule_id): Path<String>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.delete_rule(&RuleId(rule_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_allocation_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Json(request): Json<AssignmentRequest>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.assign_pair(&request.student_id, &request.sponsor_id) {
        Ok(Some(allocation)) => {
            let view = allocation.view(allocation.assignment_date);
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Ok(None) => {
            let payload = json!({
                "error": "allocation not created",
                "reason": "pair already allocated or sponsor at capacity",
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approve_allocation_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(allocation_id): Path<String>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.approve_allocation(&AllocationId(allocation_id)) {
        Ok(allocation) => {
            let view = allocation.view(allocation.assignment_date);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn resolve_conflicts_handler<S, N>(
    State(service): State<SharedService<S, N>>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.resolve_conflicts() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn student_allocations_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(student_id): Path<String>,
) -> Response
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    match service.allocations_for_student(&StudentId(student_id)) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::InvalidRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(err: SponsorshipServiceError) -> Response {
    let status = match &err {
        SponsorshipServiceError::Repository(inner)
        | SponsorshipServiceError::Match(MatchError::Repository(inner))
        | SponsorshipServiceError::Allocation(AllocationError::Repository(inner))
        | SponsorshipServiceError::Bulk(BulkMatchingError::Repository(inner)) => {
            repository_status(inner)
        }
        SponsorshipServiceError::Rule(_)
        | SponsorshipServiceError::Match(MatchError::InvalidProfile { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SponsorshipServiceError::Allocation(AllocationError::NotFound(_)) => StatusCode::NOT_FOUND,
        SponsorshipServiceError::Allocation(AllocationError::InvalidTransition { .. }) => {
            StatusCode::CONFLICT
        }
        SponsorshipServiceError::Bulk(BulkMatchingError::Transition(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
