use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use cms_db::Database;
use cms_db::models::{ComplaintRow, NewComplaint};
use cms_types::api::{Claims, CreateComplaintRequest, StatusUpdateRequest};
use cms_types::models::{Complaint, ComplaintStatus, Role, User};

use crate::Error;
use crate::auth::AppState;
use crate::blocking;
use crate::middleware::ensure_owner_or_admin;

// -- Handlers --

/// POST /api/complaints
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateComplaintRequest>, Error>,
) -> Result<impl IntoResponse, Error> {
    // Users file for themselves; admins may file on anyone's behalf
    ensure_owner_or_admin(&claims, req.user_id)?;

    let complaint = blocking(&state, move |s| create_complaint(&s.db, &req)).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

/// GET /api/complaints/my/{user_id}
pub async fn list_mine(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<i64>, Error>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, Error> {
    ensure_owner_or_admin(&claims, user_id)?;

    let complaints = blocking(&state, move |s| complaints_by_owner(&s.db, user_id)).await?;
    Ok(Json(complaints))
}

/// GET /api/complaints/{id}
///
/// Someone else's complaint reads as missing, so other users cannot enumerate ids.
pub async fn get_one(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, Error>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, Error> {
    let complaint = blocking(&state, move |s| complaint_by_id(&s.db, id)).await?;
    if ensure_owner_or_admin(&claims, complaint.user.id).is_err() {
        return Err(complaint_not_found(id));
    }

    Ok(Json(complaint))
}

/// GET /api/admin/complaints/all
pub async fn list_all(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let complaints = blocking(&state, |s| all_complaints(&s.db)).await?;
    Ok(Json(complaints))
}

/// PUT /api/admin/complaints/{id}/status
pub async fn update(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, Error>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<StatusUpdateRequest>, Error>,
) -> Result<impl IntoResponse, Error> {
    let complaint = blocking(&state, move |s| update_status(&s.db, id, req.status)).await?;

    info!("Complaint {} set to {} by {}", id, complaint.status, claims.sub);
    Ok(Json(complaint))
}

// -- Service --

/// Files a new complaint for an existing user. The status always starts out
/// `OPEN` and the creation time is taken from the server clock.
pub fn create_complaint(db: &Database, req: &CreateComplaintRequest) -> Result<Complaint, Error> {
    if db.get_user_by_id(req.user_id)?.is_none() {
        return Err(Error::NotFound(format!("user {} not found", req.user_id)));
    }

    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let id = db.insert_complaint(&NewComplaint {
        title: &req.title,
        description: &req.description,
        category: &req.category,
        status: ComplaintStatus::Open.as_str(),
        created_at: &created_at,
        user_id: req.user_id,
    })?;

    info!("Complaint {} filed by user {}", id, req.user_id);
    complaint_by_id(db, id)
}

pub fn complaints_by_owner(db: &Database, user_id: i64) -> Result<Vec<Complaint>, Error> {
    db.get_complaints_by_user(user_id)?
        .into_iter()
        .map(to_complaint)
        .collect()
}

pub fn complaint_by_id(db: &Database, id: i64) -> Result<Complaint, Error> {
    let row = db
        .get_complaint(id)?
        .ok_or_else(|| complaint_not_found(id))?;

    to_complaint(row)
}

pub fn all_complaints(db: &Database) -> Result<Vec<Complaint>, Error> {
    db.get_all_complaints()?.into_iter().map(to_complaint).collect()
}

/// Any status may follow any other; setting the current status again is a
/// no-op with the same result.
pub fn update_status(db: &Database, id: i64, status: ComplaintStatus) -> Result<Complaint, Error> {
    if !db.update_complaint_status(id, status.as_str())? {
        return Err(complaint_not_found(id));
    }

    complaint_by_id(db, id)
}

fn complaint_not_found(id: i64) -> Error {
    Error::NotFound(format!("complaint {} not found", id))
}

fn to_complaint(row: ComplaintRow) -> Result<Complaint, Error> {
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map_err(|e| anyhow::anyhow!("corrupt created_at '{}' on complaint {}: {}", row.created_at, row.id, e))?
        .with_timezone(&Utc);

    let status: ComplaintStatus = row.status.parse().map_err(anyhow::Error::from)?;
    let role: Role = row.role.parse().map_err(anyhow::Error::from)?;

    Ok(Complaint {
        id: row.id,
        title: row.title,
        description: row.description,
        category: row.category,
        created_at,
        status,
        user: User {
            id: row.user_id,
            username: row.username,
            email: row.email,
            role,
        },
    })
}
