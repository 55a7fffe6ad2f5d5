use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use strsim::jaro_winkler;

use crate::db::{ApplicationFilter, Database, MentorshipFilter, OpportunityFilter};
use crate::error::{CampusError, CampusResult};
use crate::models::{
    ApplicationStatus, MentorshipRequest, MentorshipStatus, ReferralApplication,
    ReferralOpportunity, User,
};
use crate::referral::{my_applications, reviewable_applications};
use crate::role::{is_mentor_candidate, resolve_role, Role};
use crate::session::Session;

pub const UNKNOWN_USER: &str = "Unknown user";
pub const OPPORTUNITY_UNAVAILABLE: &str = "Opportunity unavailable";

/// Minimum Jaro-Winkler similarity for a fuzzy expertise match.
const FUZZY_THRESHOLD: f64 = 0.88;

pub fn user_name(user: Option<&User>) -> String {
    user.map(|u| u.full_name.clone())
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

pub fn opportunity_title(opportunity: Option<&ReferralOpportunity>) -> String {
    opportunity
        .map(|o| format!("{} at {}", o.position, o.company_name))
        .unwrap_or_else(|| OPPORTUNITY_UNAVAILABLE.to_string())
}

fn users_by_id(db: &Database) -> CampusResult<HashMap<i64, User>> {
    Ok(db
        .list_users(None, None)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

fn opportunities_by_id(db: &Database) -> CampusResult<HashMap<i64, ReferralOpportunity>> {
    Ok(db
        .list_opportunities(&OpportunityFilter::default(), None, None)?
        .into_iter()
        .map(|o| (o.id, o))
        .collect())
}

// --- Joined rows ---

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub application: ReferralApplication,
    pub opportunity: String,
    pub applicant: String,
    pub poster: String,
}

fn join_applications(
    db: &Database,
    applications: Vec<ReferralApplication>,
) -> CampusResult<Vec<ApplicationView>> {
    let users = users_by_id(db)?;
    let opportunities = opportunities_by_id(db)?;
    Ok(applications
        .into_iter()
        .map(|application| {
            let opportunity = opportunities.get(&application.opportunity_id);
            ApplicationView {
                opportunity: opportunity_title(opportunity),
                applicant: user_name(users.get(&application.applicant_id)),
                poster: user_name(opportunity.and_then(|o| users.get(&o.posted_by))),
                application,
            }
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct MentorshipView {
    pub request: MentorshipRequest,
    /// The other party from the viewer's side.
    pub counterpart: String,
    pub counterpart_company: Option<String>,
}

fn join_mentorships(
    users: &HashMap<i64, User>,
    viewer_id: i64,
    requests: Vec<MentorshipRequest>,
) -> Vec<MentorshipView> {
    requests
        .into_iter()
        .map(|request| {
            let other = request
                .counterpart_of(viewer_id)
                .and_then(|id| users.get(&id));
            MentorshipView {
                counterpart: user_name(other),
                counterpart_company: other.and_then(|u| u.current_company.clone()),
                request,
            }
        })
        .collect()
}

// --- Dashboards ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Application,
    Mentorship,
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub description: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDashboard {
    pub mentorship_requests: usize,
    pub applications: usize,
    pub latest_opportunities: Vec<ReferralOpportunity>,
    pub recent_activity: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MentorDashboard {
    pub pending_requests: Vec<MentorshipView>,
    pub active_mentees: Vec<MentorshipView>,
    pub total_connections: usize,
    pub referral_applications: Vec<ApplicationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub total_users: i64,
    pub communities: i64,
    pub opportunities: i64,
    pub active_mentorships: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    User(StudentDashboard),
    Mentor(MentorDashboard),
    Admin(AdminDashboard),
}

pub fn dashboard(db: &Database, session: &Session) -> CampusResult<Dashboard> {
    Ok(match session.role {
        Role::User => Dashboard::User(student_dashboard(db, session)?),
        Role::Mentor => Dashboard::Mentor(mentor_dashboard(db, session)?),
        Role::Admin => Dashboard::Admin(admin_dashboard(db)?),
    })
}

pub fn student_dashboard(db: &Database, session: &Session) -> CampusResult<StudentDashboard> {
    let requests = db.list_mentorship_requests(
        &MentorshipFilter {
            student_id: Some(session.user_id()),
            ..Default::default()
        },
        Some("-created_date"),
    )?;
    let applications = my_applications(db, session)?;
    let latest_opportunities =
        db.list_opportunities(&OpportunityFilter::default(), Some("-created_date"), Some(5))?;
    let opportunities = opportunities_by_id(db)?;

    let mut recent_activity: Vec<Activity> = applications
        .iter()
        .take(3)
        .map(|a| Activity {
            kind: ActivityKind::Application,
            description: format!(
                "Applied for {}",
                opportunity_title(opportunities.get(&a.opportunity_id))
            ),
            status: a.status.to_string(),
            created_at: a.created_at.clone(),
        })
        .chain(requests.iter().take(2).map(|r| Activity {
            kind: ActivityKind::Mentorship,
            description: format!("Requested mentorship in {}", r.domain),
            status: r.status.to_string(),
            created_at: r.created_at.clone(),
        }))
        .collect();
    recent_activity.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(StudentDashboard {
        mentorship_requests: requests.len(),
        applications: applications.len(),
        latest_opportunities,
        recent_activity,
    })
}

pub fn mentor_dashboard(db: &Database, session: &Session) -> CampusResult<MentorDashboard> {
    let users = users_by_id(db)?;
    let incoming = db.list_mentorship_requests(
        &MentorshipFilter {
            mentor_id: Some(session.user_id()),
            ..Default::default()
        },
        Some("-created_date"),
    )?;
    let total_connections = incoming.len();
    let (pending, rest): (Vec<_>, Vec<_>) = incoming
        .into_iter()
        .partition(|r| r.status == MentorshipStatus::Pending);
    let accepted = rest
        .into_iter()
        .filter(|r| r.status == MentorshipStatus::Accepted)
        .collect();

    let applications = db.list_applications(
        &ApplicationFilter {
            posted_by: Some(session.user_id()),
            ..Default::default()
        },
        Some("-created_date"),
    )?;

    Ok(MentorDashboard {
        pending_requests: join_mentorships(&users, session.user_id(), pending),
        active_mentees: join_mentorships(&users, session.user_id(), accepted),
        total_connections,
        referral_applications: join_applications(db, applications)?,
    })
}

pub fn admin_dashboard(db: &Database) -> CampusResult<AdminDashboard> {
    let active = db.list_mentorship_requests(
        &MentorshipFilter {
            status: Some(MentorshipStatus::Accepted),
            ..Default::default()
        },
        None,
    )?;
    Ok(AdminDashboard {
        total_users: db.count_users()?,
        communities: db.count_communities()?,
        opportunities: db.count_opportunities()?,
        active_mentorships: active.len(),
    })
}

// --- Mentor directory ---

#[derive(Debug, Clone, Default)]
pub struct DirectoryFilter {
    pub branch: Option<String>,
    pub year: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MentorCard {
    pub mentor: User,
    /// Status of the viewer's latest request to this mentor.
    pub request_status: Option<MentorshipStatus>,
}

fn matches_search(mentor: &User, term: &str) -> bool {
    let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(term));
    contains(Some(mentor.full_name.as_str()))
        || contains(mentor.current_company.as_deref())
        || mentor.expertise_domains.iter().any(|d| {
            let d = d.to_lowercase();
            d.contains(term) || jaro_winkler(&d, term) >= FUZZY_THRESHOLD
        })
}

/// Everyone who passes the mentor predicate, except the viewer.
pub fn mentor_directory(
    db: &Database,
    session: &Session,
    filter: &DirectoryFilter,
) -> CampusResult<Vec<MentorCard>> {
    let term = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let requests = db.list_mentorship_requests(
        &MentorshipFilter {
            student_id: Some(session.user_id()),
            ..Default::default()
        },
        Some("created_date"),
    )?;
    // oldest first, so the newest request per mentor wins
    let latest: HashMap<i64, MentorshipStatus> =
        requests.iter().map(|r| (r.mentor_id, r.status)).collect();

    Ok(db
        .list_users(Some("full_name"), None)?
        .into_iter()
        .filter(|u| u.id != session.user_id() && is_mentor_candidate(u))
        .filter(|u| {
            filter
                .branch
                .as_deref()
                .is_none_or(|b| u.branch.as_deref() == Some(b))
        })
        .filter(|u| {
            filter
                .year
                .as_deref()
                .is_none_or(|y| u.year.as_deref() == Some(y))
        })
        .filter(|u| term.as_deref().is_none_or(|t| matches_search(u, t)))
        .map(|mentor| MentorCard {
            request_status: latest.get(&mentor.id).copied(),
            mentor,
        })
        .collect())
}

// --- Admin mentor management ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MentorActivity {
    #[default]
    All,
    Active,
    Pending,
    Inactive,
}

impl FromStr for MentorActivity {
    type Err = CampusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "inactive" => Ok(Self::Inactive),
            other => Err(CampusError::validation(format!(
                "unknown mentor filter '{}' (all, active, pending, inactive)",
                other
            ))),
        }
    }
}

impl fmt::Display for MentorActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Inactive => "inactive",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MentorStats {
    pub mentor: User,
    pub total: usize,
    pub pending: usize,
    pub active: usize,
    pub rejected: usize,
}

impl MentorStats {
    fn matches(&self, activity: MentorActivity) -> bool {
        match activity {
            MentorActivity::All => true,
            MentorActivity::Active => self.active > 0,
            MentorActivity::Pending => self.pending > 0,
            MentorActivity::Inactive => self.total == 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MentorOverview {
    pub mentors: Vec<MentorStats>,
    pub total_mentors: usize,
    pub active_mentors: usize,
    pub pending_requests: usize,
    pub students: usize,
}

pub fn mentor_overview(
    db: &Database,
    session: &Session,
    activity: MentorActivity,
    search: Option<&str>,
) -> CampusResult<MentorOverview> {
    if session.role != Role::Admin {
        return Err(CampusError::unauthorized("mentor management is for admins"));
    }
    let term = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let users = db.list_users(Some("full_name"), None)?;
    let requests = db.list_mentorship_requests(&MentorshipFilter::default(), None)?;

    let mut stats: Vec<MentorStats> = users
        .iter()
        .filter(|u| is_mentor_candidate(u))
        .map(|mentor| {
            let mut s = MentorStats {
                mentor: mentor.clone(),
                total: 0,
                pending: 0,
                active: 0,
                rejected: 0,
            };
            for r in requests.iter().filter(|r| r.mentor_id == mentor.id) {
                s.total += 1;
                match r.status {
                    MentorshipStatus::Pending => s.pending += 1,
                    MentorshipStatus::Accepted => s.active += 1,
                    MentorshipStatus::Rejected => s.rejected += 1,
                }
            }
            s
        })
        .collect();
    let total_mentors = stats.len();
    let active_mentors = stats.iter().filter(|s| s.active > 0).count();
    stats.retain(|s| s.matches(activity));
    if let Some(t) = term.as_deref() {
        stats.retain(|s| matches_search(&s.mentor, t));
    }

    Ok(MentorOverview {
        mentors: stats,
        total_mentors,
        active_mentors,
        pending_requests: requests
            .iter()
            .filter(|r| r.status == MentorshipStatus::Pending)
            .count(),
        students: users
            .iter()
            .filter(|u| resolve_role(u) == Role::User)
            .count(),
    })
}

// --- Connections ---

#[derive(Debug, Clone, Serialize)]
pub struct Connections {
    pub mentorships: Vec<MentorshipView>,
    pub applications: Vec<ApplicationView>,
}

/// Accepted mentorships on either side plus the viewer's own referral
/// applications.
pub fn connections(db: &Database, session: &Session) -> CampusResult<Connections> {
    let users = users_by_id(db)?;
    let me = session.user_id();
    let accepted: Vec<MentorshipRequest> = db
        .list_mentorship_requests(
            &MentorshipFilter {
                status: Some(MentorshipStatus::Accepted),
                ..Default::default()
            },
            Some("-created_date"),
        )?
        .into_iter()
        .filter(|r| r.involves(me))
        .collect();
    Ok(Connections {
        mentorships: join_mentorships(&users, me, accepted),
        applications: join_applications(db, my_applications(db, session)?)?,
    })
}

// --- Referral dashboards ---

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    fn tally(applications: &[ApplicationView]) -> Self {
        let mut counts = Self::default();
        for view in applications {
            match view.application.status {
                ApplicationStatus::Pending => counts.pending += 1,
                ApplicationStatus::Approved => counts.approved += 1,
                ApplicationStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentReferrals {
    pub applications: Vec<ApplicationView>,
    pub counts: StatusCounts,
}

pub fn student_referrals(db: &Database, session: &Session) -> CampusResult<StudentReferrals> {
    let applications = join_applications(db, my_applications(db, session)?)?;
    Ok(StudentReferrals {
        counts: StatusCounts::tally(&applications),
        applications,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewerReferrals {
    pub pending: Vec<ApplicationView>,
    pub reviewed: Vec<ApplicationView>,
}

pub fn reviewer_referrals(db: &Database, session: &Session) -> CampusResult<ReviewerReferrals> {
    let applications = join_applications(db, reviewable_applications(db, session, None)?)?;
    let (pending, reviewed) = applications
        .into_iter()
        .partition(|v| v.application.status == ApplicationStatus::Pending);
    Ok(ReviewerReferrals { pending, reviewed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{opportunity, user};
    use crate::mentorship::{request_mentorship, respond};
    use crate::models::UserUpdate;
    use crate::referral::tests::{acme, admin_session, today};
    use crate::referral::{apply, post_opportunity, review};

    #[test]
    fn test_placeholders() {
        assert_eq!(user_name(None), "Unknown user");
        assert_eq!(opportunity_title(None), "Opportunity unavailable");
    }

    #[test]
    fn test_joined_applications_fall_back_to_placeholders() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let opp = opportunity(&db, admin.user_id(), "Acme");
        let orphan = |opportunity_id| ReferralApplication {
            id: 1,
            opportunity_id,
            applicant_id: 404,
            resume_url: "file:///cv.pdf".into(),
            cover_note: "Keen".into(),
            status: ApplicationStatus::Pending,
            reviewer_notes: None,
            created_at: "2026-10-18 09:00:00".into(),
            updated_at: "2026-10-18 09:00:00".into(),
        };

        let views = join_applications(&db, vec![orphan(opp.id), orphan(999)]).unwrap();
        assert_eq!(views[0].opportunity, "SWE Intern at Acme");
        assert_eq!(views[0].applicant, "Unknown user");
        assert_eq!(views[0].poster, "Admin");
        assert_eq!(views[1].opportunity, "Opportunity unavailable");
        assert_eq!(views[1].poster, "Unknown user");
    }

    #[test]
    fn test_referral_end_to_end() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));

        let opp = post_opportunity(&db, &admin, acme(admin.user_id())).unwrap();
        let app = apply(&db, &student, opp.id, "file:///cv.pdf", "Keen to join", today()).unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);

        let reviewer = reviewer_referrals(&db, &admin).unwrap();
        assert_eq!(reviewer.pending.len(), 1);
        assert_eq!(reviewer.pending[0].applicant, "Student");

        let approved = review(&db, &admin, app.id, ApplicationStatus::Approved, Some("Great fit")).unwrap();
        assert_eq!(approved.status, ApplicationStatus::Approved);
        assert_eq!(approved.reviewer_notes.as_deref(), Some("Great fit"));

        let mine = student_referrals(&db, &student).unwrap();
        assert_eq!(mine.counts.approved, 1);
        assert_eq!(mine.applications[0].opportunity, "SWE Intern at Acme");
        assert_eq!(mine.applications[0].poster, "Admin");
        assert_eq!(
            mine.applications[0].application.reviewer_notes.as_deref(),
            Some("Great fit")
        );
        assert_eq!(reviewer_referrals(&db, &admin).unwrap().reviewed.len(), 1);
    }

    #[test]
    fn test_student_dashboard_activity() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let mentor = user(&db, "Mentor", Some("Alumni"));
        for i in 0..4 {
            let opp = opportunity(&db, admin.user_id(), &format!("Co{}", i));
            apply(&db, &student, opp.id, "file:///cv.pdf", "hi", today()).unwrap();
        }
        request_mentorship(&db, &student, mentor.id, "DSA", "Help", None).unwrap();

        let dash = student_dashboard(&db, &student).unwrap();
        assert_eq!(dash.applications, 4);
        assert_eq!(dash.mentorship_requests, 1);
        assert_eq!(dash.latest_opportunities.len(), 4);
        assert_eq!(dash.recent_activity.len(), 4);
        assert!(dash
            .recent_activity
            .iter()
            .any(|a| a.description == "Requested mentorship in DSA"));
    }

    #[test]
    fn test_mentor_and_admin_dashboards() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let s1 = Session::new(user(&db, "S1", None));
        let s2 = Session::new(user(&db, "S2", None));
        let mentor = Session::new(user(&db, "Mentor", Some("Alumni")));
        let r1 = request_mentorship(&db, &s1, mentor.user_id(), "DSA", "Help", None).unwrap();
        request_mentorship(&db, &s2, mentor.user_id(), "DSA", "Help", None).unwrap();
        respond(&db, &mentor, r1.id, MentorshipStatus::Accepted).unwrap();

        let Dashboard::Mentor(dash) = dashboard(&db, &mentor).unwrap() else {
            panic!("expected mentor dashboard");
        };
        assert_eq!(dash.pending_requests.len(), 1);
        assert_eq!(dash.pending_requests[0].counterpart, "S2");
        assert_eq!(dash.active_mentees[0].counterpart, "S1");
        assert_eq!(dash.total_connections, 2);

        let Dashboard::Admin(stats) = dashboard(&db, &admin).unwrap() else {
            panic!("expected admin dashboard");
        };
        assert_eq!(stats.total_users, 4);
        assert_eq!(stats.active_mentorships, 1);
    }

    #[test]
    fn test_mentor_directory_filters_and_status() {
        let db = Database::open_in_memory().unwrap();
        let student = Session::new(user(&db, "Student", None));
        let ravi = user(&db, "Ravi", Some("Alumni"));
        db.update_user(
            ravi.id,
            &UserUpdate {
                branch: Some("CSE".into()),
                expertise_domains: Some(vec!["Machine Learning".into()]),
                ..Default::default()
            },
        )
        .unwrap();
        let meera = user(&db, "Meera", None);
        db.update_user(
            meera.id,
            &UserUpdate {
                branch: Some("ECE".into()),
                expertise_domains: Some(vec!["Embedded".into()]),
                current_company: Some("Chipworks".into()),
                ..Default::default()
            },
        )
        .unwrap();
        user(&db, "Plain Student", None);

        let all = mentor_directory(&db, &student, &DirectoryFilter::default()).unwrap();
        let names: Vec<_> = all.iter().map(|c| c.mentor.full_name.as_str()).collect();
        assert_eq!(names, vec!["Meera", "Ravi"]);

        let cse = DirectoryFilter {
            branch: Some("CSE".into()),
            ..Default::default()
        };
        assert_eq!(mentor_directory(&db, &student, &cse).unwrap().len(), 1);

        let fuzzy = DirectoryFilter {
            search: Some("machine lerning".into()),
            ..Default::default()
        };
        let found = mentor_directory(&db, &student, &fuzzy).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mentor.id, ravi.id);

        let company = DirectoryFilter {
            search: Some("chip".into()),
            ..Default::default()
        };
        assert_eq!(mentor_directory(&db, &student, &company).unwrap()[0].mentor.id, meera.id);

        request_mentorship(&db, &student, ravi.id, "ML", "Hi", None).unwrap();
        let annotated = mentor_directory(&db, &student, &DirectoryFilter::default()).unwrap();
        let ravi_card = annotated.iter().find(|c| c.mentor.id == ravi.id).unwrap();
        assert_eq!(ravi_card.request_status, Some(MentorshipStatus::Pending));
    }

    #[test]
    fn test_alumni_admin_listed_as_mentor() {
        let db = Database::open_in_memory().unwrap();
        let student = Session::new(user(&db, "Student", None));
        let admin = admin_session(&db);
        db.update_user(
            admin.user_id(),
            &UserUpdate {
                year: Some("Alumni".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let all = mentor_directory(&db, &student, &DirectoryFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].mentor.id, admin.user_id());
    }

    #[test]
    fn test_mentor_overview_filters() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let busy = Session::new(user(&db, "Busy", Some("Alumni")));
        user(&db, "Idle", Some("Alumni"));
        let r = request_mentorship(&db, &student, busy.user_id(), "DSA", "Help", None).unwrap();
        respond(&db, &busy, r.id, MentorshipStatus::Accepted).unwrap();

        assert!(matches!(
            mentor_overview(&db, &student, MentorActivity::All, None),
            Err(CampusError::Unauthorized(_))
        ));
        let all = mentor_overview(&db, &admin, MentorActivity::All, None).unwrap();
        assert_eq!(all.total_mentors, 2);
        assert_eq!(all.active_mentors, 1);
        assert_eq!(all.students, 1);

        let active = mentor_overview(&db, &admin, MentorActivity::Active, None).unwrap();
        assert_eq!(active.mentors.len(), 1);
        assert_eq!(active.mentors[0].mentor.full_name, "Busy");
        let inactive = mentor_overview(&db, &admin, "INACTIVE".parse().unwrap(), None).unwrap();
        assert_eq!(inactive.mentors[0].mentor.full_name, "Idle");
        assert!("sleepy".parse::<MentorActivity>().is_err());
    }

    #[test]
    fn test_connections_from_both_sides() {
        let db = Database::open_in_memory().unwrap();
        let student = Session::new(user(&db, "Student", None));
        let mentor = Session::new(user(&db, "Mentor", Some("Alumni")));
        let r = request_mentorship(&db, &student, mentor.user_id(), "DSA", "Help", None).unwrap();
        assert!(connections(&db, &student).unwrap().mentorships.is_empty());
        respond(&db, &mentor, r.id, MentorshipStatus::Accepted).unwrap();

        assert_eq!(connections(&db, &student).unwrap().mentorships[0].counterpart, "Mentor");
        assert_eq!(connections(&db, &mentor).unwrap().mentorships[0].counterpart, "Student");
    }
}
