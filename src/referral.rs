use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

use crate::db::{must, ApplicationFilter, Database, OpportunityFilter};
use crate::error::{require, CampusError, CampusResult};
use crate::models::{
    ApplicationStatus, NewOpportunity, OpportunityUpdate, ReferralApplication, ReferralOpportunity,
};
use crate::role::{is_mentor_candidate, Role};
use crate::session::Session;
use crate::upload::{require_pdf, Uploader};
use crate::views::user_name;

// --- Opportunities ---

/// Posts a new opportunity. Mentors post as themselves; admins may post on
/// behalf of any mentor by naming them in `posted_by`.
pub fn post_opportunity(
    db: &Database,
    session: &Session,
    mut opp: NewOpportunity,
) -> CampusResult<ReferralOpportunity> {
    require(&opp.company_name, "company name")?;
    require(&opp.position, "position")?;
    require(&opp.description, "description")?;

    match session.role {
        Role::Admin => {
            if opp.posted_by != session.user_id() {
                let poster = must(db.get_user(opp.posted_by)?, "user", opp.posted_by)?;
                if !is_mentor_candidate(&poster) {
                    return Err(CampusError::validation(format!(
                        "{} is not an alumni mentor",
                        poster.full_name
                    )));
                }
            }
        }
        Role::Mentor => {
            if opp.posted_by != session.user_id() {
                return Err(CampusError::unauthorized(
                    "mentors can only post opportunities as themselves",
                ));
            }
        }
        Role::User => {
            return Err(CampusError::unauthorized("only alumni and admins can post opportunities"));
        }
    }

    opp.required_skills.retain(|s| !s.trim().is_empty());
    let created = db.create_opportunity(&opp)?;
    tracing::info!(
        opportunity_id = created.id,
        posted_by = created.posted_by,
        company = %created.company_name,
        "opportunity posted"
    );
    Ok(created)
}

/// Admin-only edit. Fields left as `None` are untouched.
pub fn edit_opportunity(
    db: &Database,
    session: &Session,
    opportunity_id: i64,
    update: OpportunityUpdate,
) -> CampusResult<ReferralOpportunity> {
    if session.role != Role::Admin {
        return Err(CampusError::unauthorized("only admins can edit opportunities"));
    }
    must(db.get_opportunity(opportunity_id)?, "opportunity", opportunity_id)?;
    if let Some(v) = &update.company_name {
        require(v, "company name")?;
    }
    if let Some(v) = &update.position {
        require(v, "position")?;
    }
    if let Some(v) = &update.description {
        require(v, "description")?;
    }
    if let Some(poster_id) = update.posted_by {
        let poster = must(db.get_user(poster_id)?, "user", poster_id)?;
        if poster_id != session.user_id() && !is_mentor_candidate(&poster) {
            return Err(CampusError::validation(format!(
                "{} is not an alumni mentor",
                poster.full_name
            )));
        }
    }
    db.update_opportunity(opportunity_id, &update)
}

/// Admin-only: flips `is_active`. Existing applications keep their state.
pub fn toggle_opportunity(
    db: &Database,
    session: &Session,
    opportunity_id: i64,
) -> CampusResult<ReferralOpportunity> {
    if session.role != Role::Admin {
        return Err(CampusError::unauthorized("only admins can activate or deactivate opportunities"));
    }
    let current = must(db.get_opportunity(opportunity_id)?, "opportunity", opportunity_id)?;
    let updated = db.update_opportunity(
        opportunity_id,
        &OpportunityUpdate {
            is_active: Some(!current.is_active),
            ..Default::default()
        },
    )?;
    tracing::info!(opportunity_id, active = updated.is_active, "opportunity toggled");
    Ok(updated)
}

/// Opportunities a role gets to see: students only see open postings.
pub fn visible_opportunities(
    db: &Database,
    session: &Session,
    limit: Option<usize>,
) -> CampusResult<Vec<ReferralOpportunity>> {
    let filter = OpportunityFilter {
        is_active: (session.role == Role::User).then_some(true),
        ..Default::default()
    };
    db.list_opportunities(&filter, Some("-created_date"), limit)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpportunityStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

pub fn opportunity_stats(applications: &[ReferralApplication], opportunity_id: i64) -> OpportunityStats {
    let mut stats = OpportunityStats::default();
    for app in applications.iter().filter(|a| a.opportunity_id == opportunity_id) {
        stats.total += 1;
        match app.status {
            ApplicationStatus::Pending => stats.pending += 1,
            ApplicationStatus::Approved => stats.approved += 1,
            ApplicationStatus::Rejected => stats.rejected += 1,
        }
    }
    stats
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunityDetail {
    pub opportunity: ReferralOpportunity,
    pub posted_by: String,
    /// Only shown to admins and the poster.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<OpportunityStats>,
}

/// One posting as the signed-in user may see it. Inactive postings are
/// hidden from students, like in `visible_opportunities`.
pub fn opportunity_detail(
    db: &Database,
    session: &Session,
    opportunity_id: i64,
) -> CampusResult<OpportunityDetail> {
    let opportunity = must(db.get_opportunity(opportunity_id)?, "opportunity", opportunity_id)?;
    if !opportunity.is_active && session.role == Role::User {
        return Err(CampusError::NotFound {
            entity: "opportunity",
            id: opportunity_id,
        });
    }
    let stats = if session.role == Role::Admin || opportunity.posted_by == session.user_id() {
        let applications = db.list_applications(
            &ApplicationFilter {
                opportunity_id: Some(opportunity_id),
                ..Default::default()
            },
            None,
        )?;
        Some(opportunity_stats(&applications, opportunity_id))
    } else {
        None
    };
    let poster = db.get_user(opportunity.posted_by)?;
    Ok(OpportunityDetail {
        posted_by: user_name(poster.as_ref()),
        opportunity,
        stats,
    })
}

// --- Applications ---

/// Records an application with an already-uploaded resume.
///
/// Inactive or expired postings, and a second open application to the same
/// posting, are refused.
pub fn apply(
    db: &Database,
    session: &Session,
    opportunity_id: i64,
    resume_url: &str,
    cover_note: &str,
    today: NaiveDate,
) -> CampusResult<ReferralApplication> {
    require(cover_note, "cover note")?;
    require(resume_url, "resume")?;

    let opportunity = must(db.get_opportunity(opportunity_id)?, "opportunity", opportunity_id)?;
    check_open_for(db, session, &opportunity, today)?;

    let application = db.create_application(
        opportunity_id,
        session.user_id(),
        resume_url.trim(),
        cover_note.trim(),
    )?;
    tracing::info!(
        application_id = application.id,
        opportunity_id,
        applicant_id = application.applicant_id,
        "referral application submitted"
    );
    Ok(application)
}

/// Full submission: validates the cover note and the PDF before anything is
/// uploaded, then uploads the resume and records the application.
pub fn submit_application(
    db: &Database,
    session: &Session,
    uploader: &dyn Uploader,
    opportunity_id: i64,
    resume_path: &Path,
    cover_note: &str,
    today: NaiveDate,
) -> CampusResult<ReferralApplication> {
    require(cover_note, "cover note")?;
    require_pdf(resume_path)?;
    let opportunity = must(db.get_opportunity(opportunity_id)?, "opportunity", opportunity_id)?;
    check_open_for(db, session, &opportunity, today)?;

    let uploaded = uploader.upload(resume_path)?;
    apply(db, session, opportunity_id, &uploaded.file_url, cover_note, today)
}

fn check_open_for(
    db: &Database,
    session: &Session,
    opportunity: &ReferralOpportunity,
    today: NaiveDate,
) -> CampusResult<()> {
    if opportunity.posted_by == session.user_id() {
        return Err(CampusError::unauthorized("you cannot apply to your own posting"));
    }
    if !opportunity.is_active {
        return Err(CampusError::validation(format!(
            "{} at {} is no longer accepting applications",
            opportunity.position, opportunity.company_name
        )));
    }
    if let Some(deadline) = opportunity.application_deadline {
        if deadline < today {
            return Err(CampusError::validation(format!(
                "the application deadline ({}) has passed",
                deadline
            )));
        }
    }
    let previous = db.list_applications(
        &ApplicationFilter {
            opportunity_id: Some(opportunity.id),
            applicant_id: Some(session.user_id()),
            ..Default::default()
        },
        None,
    )?;
    if let Some(open) = previous.iter().find(|a| a.status != ApplicationStatus::Rejected) {
        return Err(CampusError::validation(format!(
            "you already applied to this opportunity (application #{}, {})",
            open.id, open.status
        )));
    }
    Ok(())
}

pub fn default_reviewer_notes(status: ApplicationStatus) -> String {
    format!("Application {} by alumni", status)
}

/// The poster (or an admin acting for them) approves or rejects a pending
/// application. Blank notes fall back to a templated message.
pub fn review(
    db: &Database,
    session: &Session,
    application_id: i64,
    decision: ApplicationStatus,
    notes: Option<&str>,
) -> CampusResult<ReferralApplication> {
    let application = must(db.get_application(application_id)?, "application", application_id)?;
    if application.applicant_id == session.user_id() {
        tracing::warn!(application_id, actor = session.user_id(), "blocked self-review");
        return Err(CampusError::unauthorized("you cannot review your own application"));
    }
    let opportunity = db.get_opportunity(application.opportunity_id)?;
    let is_poster = opportunity
        .as_ref()
        .is_some_and(|o| o.posted_by == session.user_id());
    if !is_poster && session.role != Role::Admin {
        tracing::warn!(
            application_id,
            actor = session.user_id(),
            "blocked review from someone other than the poster"
        );
        return Err(CampusError::unauthorized(
            "only the alumni who posted this opportunity can review applications",
        ));
    }
    if !decision.is_terminal() || application.status != ApplicationStatus::Pending {
        return Err(CampusError::InvalidTransition {
            from: application.status.to_string(),
            to: decision.to_string(),
        });
    }

    let notes = notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_reviewer_notes(decision));
    if !db.set_application_review(application_id, decision, &notes)? {
        let current = must(db.get_application(application_id)?, "application", application_id)?;
        return Err(CampusError::InvalidTransition {
            from: current.status.to_string(),
            to: decision.to_string(),
        });
    }
    tracing::info!(application_id, status = %decision, "referral application reviewed");
    must(db.get_application(application_id)?, "application", application_id)
}

/// Applications the signed-in user can review: on their own postings, or
/// every application for admins.
pub fn reviewable_applications(
    db: &Database,
    session: &Session,
    status: Option<ApplicationStatus>,
) -> CampusResult<Vec<ReferralApplication>> {
    let filter = ApplicationFilter {
        status,
        posted_by: (session.role != Role::Admin).then_some(session.user_id()),
        ..Default::default()
    };
    db.list_applications(&filter, Some("-created_date"))
}

pub fn my_applications(db: &Database, session: &Session) -> CampusResult<Vec<ReferralApplication>> {
    db.list_applications(
        &ApplicationFilter {
            applicant_id: Some(session.user_id()),
            ..Default::default()
        },
        Some("-created_date"),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::tests::user;
    use crate::models::{JobType, NewUser};
    use crate::upload::tests::{write_pdf, RecordingUploader};

    pub(crate) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    pub(crate) fn admin_session(db: &Database) -> Session {
        Session::new(
            db.create_user(&NewUser {
                full_name: "Admin".into(),
                email: "admin@campus.test".into(),
                role: Some("admin".into()),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    pub(crate) fn acme(posted_by: i64) -> NewOpportunity {
        NewOpportunity {
            posted_by,
            company_name: "Acme".into(),
            position: "SWE Intern".into(),
            job_type: JobType::Internship,
            location: None,
            required_skills: vec!["Rust".into(), " ".into()],
            description: "...".into(),
            salary_range: None,
            application_deadline: None,
            is_active: true,
        }
    }

    #[test]
    fn test_post_opportunity_permissions() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let alumni = Session::new(user(&db, "Alumni", Some("Alumni")));
        let student = Session::new(user(&db, "Student", None));

        let by_admin = post_opportunity(&db, &admin, acme(admin.user_id())).unwrap();
        assert_eq!(by_admin.required_skills, vec!["Rust"]);
        post_opportunity(&db, &admin, acme(alumni.user_id())).unwrap();
        assert!(matches!(
            post_opportunity(&db, &admin, acme(student.user_id())),
            Err(CampusError::Validation(_))
        ));

        post_opportunity(&db, &alumni, acme(alumni.user_id())).unwrap();
        assert!(matches!(
            post_opportunity(&db, &alumni, acme(admin.user_id())),
            Err(CampusError::Unauthorized(_))
        ));
        assert!(matches!(
            post_opportunity(&db, &student, acme(student.user_id())),
            Err(CampusError::Unauthorized(_))
        ));

        let mut blank = acme(admin.user_id());
        blank.description = " ".into();
        assert!(matches!(
            post_opportunity(&db, &admin, blank),
            Err(CampusError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_cover_note_creates_nothing() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let opp = post_opportunity(&db, &admin, acme(admin.user_id())).unwrap();

        let result = apply(&db, &student, opp.id, "file:///cv.pdf", "   ", today());
        assert!(matches!(result, Err(CampusError::Validation(_))));
        assert!(my_applications(&db, &student).unwrap().is_empty());
    }

    #[test]
    fn test_inactive_expired_and_duplicate_applications_refused() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let opp = post_opportunity(&db, &admin, acme(admin.user_id())).unwrap();

        apply(&db, &student, opp.id, "file:///cv.pdf", "Keen", today()).unwrap();
        let dup = apply(&db, &student, opp.id, "file:///cv.pdf", "Keen again", today());
        assert!(matches!(dup, Err(CampusError::Validation(_))));

        toggle_opportunity(&db, &admin, opp.id).unwrap();
        let other = Session::new(user(&db, "Other Student", None));
        let inactive = apply(&db, &other, opp.id, "file:///cv.pdf", "Keen", today());
        assert!(matches!(inactive, Err(CampusError::Validation(_))));

        let mut expired = acme(admin.user_id());
        expired.application_deadline = today().pred_opt();
        let expired = post_opportunity(&db, &admin, expired).unwrap();
        let late = apply(&db, &other, expired.id, "file:///cv.pdf", "Keen", today());
        assert!(matches!(late, Err(CampusError::Validation(_))));
    }

    #[test]
    fn test_toggle_keeps_existing_applications() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let opp = post_opportunity(&db, &admin, acme(admin.user_id())).unwrap();
        let app = apply(&db, &student, opp.id, "file:///cv.pdf", "Keen", today()).unwrap();

        assert!(matches!(
            toggle_opportunity(&db, &student, opp.id),
            Err(CampusError::Unauthorized(_))
        ));
        let off = toggle_opportunity(&db, &admin, opp.id).unwrap();
        assert!(!off.is_active);
        let still = db.get_application(app.id).unwrap().unwrap();
        assert_eq!(still.status, ApplicationStatus::Pending);
        assert!(toggle_opportunity(&db, &admin, opp.id).unwrap().is_active);
    }

    #[test]
    fn test_review_authorization_and_default_notes() {
        let db = Database::open_in_memory().unwrap();
        let alumni = Session::new(user(&db, "Alumni", Some("Alumni")));
        let student = Session::new(user(&db, "Student", None));
        let stranger = Session::new(user(&db, "Other Alumni", Some("Alumni")));
        let opp = post_opportunity(&db, &alumni, acme(alumni.user_id())).unwrap();
        let app = apply(&db, &student, opp.id, "file:///cv.pdf", "Keen", today()).unwrap();

        for actor in [&student, &stranger] {
            let result = review(&db, actor, app.id, ApplicationStatus::Approved, None);
            assert!(matches!(result, Err(CampusError::Unauthorized(_))));
        }

        let rejected = review(&db, &alumni, app.id, ApplicationStatus::Rejected, Some("  ")).unwrap();
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
        assert_eq!(
            rejected.reviewer_notes.as_deref(),
            Some("Application rejected by alumni")
        );

        let again = review(&db, &alumni, app.id, ApplicationStatus::Approved, None);
        assert!(matches!(again, Err(CampusError::InvalidTransition { .. })));
    }

    #[test]
    fn test_admin_cannot_review_own_application() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let alumni = Session::new(user(&db, "Alumni", Some("Alumni")));
        let opp = post_opportunity(&db, &alumni, acme(alumni.user_id())).unwrap();
        let app = apply(&db, &admin, opp.id, "file:///cv.pdf", "Me", today()).unwrap();

        let result = review(&db, &admin, app.id, ApplicationStatus::Approved, Some("self"));
        assert!(matches!(result, Err(CampusError::Unauthorized(_))));
        let unchanged = db.get_application(app.id).unwrap().unwrap();
        assert_eq!(unchanged.status, ApplicationStatus::Pending);

        let approved = review(&db, &alumni, app.id, ApplicationStatus::Approved, None).unwrap();
        assert_eq!(approved.status, ApplicationStatus::Approved);
    }

    #[test]
    fn test_edit_cannot_hand_posting_to_student() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let alumni = Session::new(user(&db, "Alumni", Some("Alumni")));
        let student = Session::new(user(&db, "Student", None));
        let opp = post_opportunity(&db, &admin, acme(admin.user_id())).unwrap();

        let to_student = OpportunityUpdate {
            posted_by: Some(student.user_id()),
            ..Default::default()
        };
        assert!(matches!(
            edit_opportunity(&db, &admin, opp.id, to_student),
            Err(CampusError::Validation(_))
        ));
        assert_eq!(db.get_opportunity(opp.id).unwrap().unwrap().posted_by, admin.user_id());

        let to_alumni = OpportunityUpdate {
            posted_by: Some(alumni.user_id()),
            ..Default::default()
        };
        let moved = edit_opportunity(&db, &admin, opp.id, to_alumni).unwrap();
        assert_eq!(moved.posted_by, alumni.user_id());
    }

    #[test]
    fn test_detail_hides_inactive_postings_and_stats() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let alumni = Session::new(user(&db, "Alumni", Some("Alumni")));
        let student = Session::new(user(&db, "Student", None));
        let opp = post_opportunity(&db, &alumni, acme(alumni.user_id())).unwrap();
        apply(&db, &student, opp.id, "file:///cv.pdf", "Keen", today()).unwrap();

        let seen = opportunity_detail(&db, &student, opp.id).unwrap();
        assert_eq!(seen.posted_by, "Alumni");
        assert!(seen.stats.is_none());
        let own = opportunity_detail(&db, &alumni, opp.id).unwrap();
        assert_eq!(own.stats.map(|s| s.pending), Some(1));

        toggle_opportunity(&db, &admin, opp.id).unwrap();
        assert!(matches!(
            opportunity_detail(&db, &student, opp.id),
            Err(CampusError::NotFound { .. })
        ));
        let as_admin = opportunity_detail(&db, &admin, opp.id).unwrap();
        assert_eq!(as_admin.stats.map(|s| s.total), Some(1));
    }

    #[test]
    fn test_cannot_apply_to_own_posting() {
        let db = Database::open_in_memory().unwrap();
        let alumni = Session::new(user(&db, "Alumni", Some("Alumni")));
        let opp = post_opportunity(&db, &alumni, acme(alumni.user_id())).unwrap();
        let result = apply(&db, &alumni, opp.id, "file:///cv.pdf", "Me", today());
        assert!(matches!(result, Err(CampusError::Unauthorized(_))));
    }

    #[test]
    fn test_submit_application_uploads_only_valid_input() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let opp = post_opportunity(&db, &admin, acme(admin.user_id())).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pdf(dir.path(), "resume.pdf");
        let uploader = RecordingUploader::default();

        let no_note = submit_application(&db, &student, &uploader, opp.id, &pdf, "", today());
        assert!(no_note.is_err());
        let text = dir.path().join("resume.txt");
        std::fs::write(&text, "plain").unwrap();
        let not_pdf = submit_application(&db, &student, &uploader, opp.id, &text, "Keen", today());
        assert!(not_pdf.is_err());
        assert!(uploader.uploads.borrow().is_empty());

        let app = submit_application(&db, &student, &uploader, opp.id, &pdf, "Keen", today()).unwrap();
        assert_eq!(app.resume_url, "memory://resume.pdf");
        assert_eq!(uploader.uploads.borrow().len(), 1);
    }

    #[test]
    fn test_stats_and_reviewable_scope() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let alumni = Session::new(user(&db, "Alumni", Some("Alumni")));
        let s1 = Session::new(user(&db, "S1", None));
        let s2 = Session::new(user(&db, "S2", None));
        let mine = post_opportunity(&db, &alumni, acme(alumni.user_id())).unwrap();
        let admins = post_opportunity(&db, &admin, acme(admin.user_id())).unwrap();
        let a1 = apply(&db, &s1, mine.id, "file:///a.pdf", "one", today()).unwrap();
        apply(&db, &s2, mine.id, "file:///b.pdf", "two", today()).unwrap();
        apply(&db, &s1, admins.id, "file:///a.pdf", "three", today()).unwrap();
        review(&db, &alumni, a1.id, ApplicationStatus::Approved, Some("Great fit")).unwrap();

        assert_eq!(reviewable_applications(&db, &alumni, None).unwrap().len(), 2);
        assert_eq!(reviewable_applications(&db, &admin, None).unwrap().len(), 3);
        assert_eq!(
            reviewable_applications(&db, &alumni, Some(ApplicationStatus::Pending))
                .unwrap()
                .len(),
            1
        );

        let all = db.list_applications(&ApplicationFilter::default(), None).unwrap();
        assert_eq!(
            opportunity_stats(&all, mine.id),
            OpportunityStats {
                total: 2,
                pending: 1,
                approved: 1,
                rejected: 0
            }
        );
    }
}
