//! Public student check-in.
//!
//! This is the only write that does not need a signed-in admin. It enforces
//! the activity window, the participant cap and, when the activity requires
//! it, the geofence.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use crate::db::records::CheckInInsert;
use crate::db::{ActivityRecordRepository, ActivityRepository, StudentRepository};
use crate::error::{AppError, Result};
use crate::models::activity::valid_coordinates;
use crate::models::{ActivityRecord, NewActivityRecord};
use crate::services::{GeoPoint, GeofenceCheck, LiveEvent, tokens};
use crate::state::AppState;

/// Build the check-in router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/checkin", post(checkin))
}

#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    pub code: String,
    /// Student number.
    pub student_id: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Coordinates sent by the student, if both are present and valid.
fn reported_point(body: &CheckinRequest) -> Result<Option<GeoPoint>> {
    match (body.latitude, body.longitude) {
        (Some(lat), Some(lon)) if valid_coordinates(lat, lon) => Ok(Some(GeoPoint::new(lat, lon))),
        (None, None) => Ok(None),
        _ => Err(AppError::BadRequest("coordinates are out of range".to_string())),
    }
}

/// POST /api/checkin
#[instrument(skip(state, body))]
async fn checkin(
    State(state): State<AppState>,
    Json(body): Json<CheckinRequest>,
) -> Result<(StatusCode, Json<ActivityRecord>)> {
    let code = body.code.trim().to_ascii_uppercase();
    if !tokens::is_activity_code(&code) {
        return Err(AppError::BadRequest("รหัสกิจกรรมไม่ถูกต้อง (invalid activity code)".to_string()));
    }
    let point = reported_point(&body)?;

    let activity = ActivityRepository::new(state.pool())
        .get_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound("ไม่พบกิจกรรม (activity not found)".to_string()))?;
    if !activity.is_open(Utc::now()) {
        return Err(AppError::BadRequest(
            "กิจกรรมนี้ไม่เปิดให้ลงชื่อในขณะนี้ (activity is not open for check-in)".to_string(),
        ));
    }

    let student = StudentRepository::new(state.pool())
        .get_by_code(&body.student_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::NotFound("ไม่พบรหัสนักศึกษา (student not found)".to_string()))?;

    if activity.require_location {
        let point = point.ok_or_else(|| {
            AppError::BadRequest("กิจกรรมนี้ต้องใช้ตำแหน่ง (location is required)".to_string())
        })?;
        let check = GeofenceCheck::evaluate(
            GeoPoint::new(activity.latitude, activity.longitude),
            point,
            f64::from(activity.checkin_radius_m),
        );
        if !check.within {
            return Err(AppError::BadRequest(format!(
                "อยู่นอกพื้นที่กิจกรรม (outside check-in radius: {:.0} m > {} m)",
                check.distance_m, activity.checkin_radius_m
            )));
        }
    }

    let inserted = ActivityRecordRepository::new(state.pool())
        .insert_within_capacity(
            &NewActivityRecord {
                activity_code: activity.code.clone(),
                activity_name: activity.name.clone(),
                student_id: student.student_code.clone(),
                student_name: student.full_name(),
                department: student.department.clone(),
                major: student.major.clone(),
                location: activity.location_name.clone(),
                latitude: point.map(|p| p.latitude),
                longitude: point.map(|p| p.longitude),
            },
            activity.max_participants,
        )
        .await?;
    let CheckInInsert::Recorded(record) = inserted else {
        return Err(AppError::Conflict("กิจกรรมเต็มแล้ว (activity is full)".to_string()));
    };

    tracing::info!(record_id = %record.id, student = %record.student_id, "check-in recorded");
    state.events().publish(LiveEvent::attendance(&record));

    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(latitude: Option<f64>, longitude: Option<f64>) -> CheckinRequest {
        CheckinRequest {
            code: "AB12CD".to_string(),
            student_id: "6400001".to_string(),
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_reported_point() {
        assert!(matches!(reported_point(&request(None, None)), Ok(None)));
        assert!(matches!(
            reported_point(&request(Some(13.75), Some(100.5))),
            Ok(Some(_))
        ));
        assert!(reported_point(&request(Some(13.75), None)).is_err());
        assert!(reported_point(&request(Some(95.0), Some(100.5))).is_err());
    }
}
