use crate::db::{must, Database, MentorshipFilter};
use crate::error::{require, CampusError, CampusResult};
use crate::models::{MentorshipRequest, MentorshipStatus};
use crate::role::is_mentor_candidate;
use crate::session::Session;

/// A student asks a mentor for guidance. The request starts out pending.
///
/// Only one open (pending or accepted) request may exist per student/mentor
/// pair; a rejected request can be followed by a fresh one.
pub fn request_mentorship(
    db: &Database,
    session: &Session,
    mentor_id: i64,
    domain: &str,
    message: &str,
    goals: Option<&str>,
) -> CampusResult<MentorshipRequest> {
    require(domain, "domain")?;
    require(message, "message")?;

    let student_id = session.user_id();
    if student_id == mentor_id {
        return Err(CampusError::validation("you cannot request mentorship from yourself"));
    }
    let mentor = must(db.get_user(mentor_id)?, "user", mentor_id)?;
    if !is_mentor_candidate(&mentor) {
        return Err(CampusError::validation(format!(
            "{} is not available as a mentor",
            mentor.full_name
        )));
    }

    let existing = db.list_mentorship_requests(
        &MentorshipFilter {
            student_id: Some(student_id),
            mentor_id: Some(mentor_id),
            status: None,
        },
        None,
    )?;
    if let Some(open) = existing.iter().find(|r| r.status != MentorshipStatus::Rejected) {
        return Err(CampusError::validation(format!(
            "you already have a {} request (#{}) with {}",
            open.status, open.id, mentor.full_name
        )));
    }

    let goals = goals.map(str::trim).filter(|g| !g.is_empty());
    let request =
        db.create_mentorship_request(student_id, mentor_id, domain.trim(), message.trim(), goals)?;
    tracing::info!(request_id = request.id, student_id, mentor_id, "mentorship requested");
    Ok(request)
}

/// The named mentor accepts or rejects a pending request.
pub fn respond(
    db: &Database,
    session: &Session,
    request_id: i64,
    decision: MentorshipStatus,
) -> CampusResult<MentorshipRequest> {
    let request = must(
        db.get_mentorship_request(request_id)?,
        "mentorship request",
        request_id,
    )?;
    if request.mentor_id != session.user_id() {
        tracing::warn!(
            request_id,
            actor = session.user_id(),
            "blocked response from someone other than the mentor"
        );
        return Err(CampusError::unauthorized(
            "only the requested mentor can respond to this request",
        ));
    }
    if !decision.is_terminal() || request.status != MentorshipStatus::Pending {
        return Err(CampusError::InvalidTransition {
            from: request.status.to_string(),
            to: decision.to_string(),
        });
    }
    if !db.set_mentorship_status(request_id, decision)? {
        // someone else finished the transition first
        let current = must(
            db.get_mentorship_request(request_id)?,
            "mentorship request",
            request_id,
        )?;
        return Err(CampusError::InvalidTransition {
            from: current.status.to_string(),
            to: decision.to_string(),
        });
    }
    tracing::info!(request_id, status = %decision, "mentorship request answered");
    must(
        db.get_mentorship_request(request_id)?,
        "mentorship request",
        request_id,
    )
}

/// Requests addressed to the signed-in mentor, newest first.
pub fn incoming(
    db: &Database,
    session: &Session,
    status: Option<MentorshipStatus>,
) -> CampusResult<Vec<MentorshipRequest>> {
    db.list_mentorship_requests(
        &MentorshipFilter {
            mentor_id: Some(session.user_id()),
            status,
            ..Default::default()
        },
        Some("-created_date"),
    )
}

/// Requests sent by the signed-in student, newest first.
pub fn outgoing(
    db: &Database,
    session: &Session,
    status: Option<MentorshipStatus>,
) -> CampusResult<Vec<MentorshipRequest>> {
    db.list_mentorship_requests(
        &MentorshipFilter {
            student_id: Some(session.user_id()),
            status,
            ..Default::default()
        },
        Some("-created_date"),
    )
}
