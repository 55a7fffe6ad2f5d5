use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of string values stored and displayed by their label.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

string_enum!(
    /// Lifecycle of a mentorship request.
    MentorshipStatus, "mentorship status" {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
    }
);

string_enum!(
    /// Lifecycle of a referral application.
    ApplicationStatus, "application status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

string_enum!(JobType, "job type" {
    FullTime => "Full-time",
    Internship => "Internship",
    PartTime => "Part-time",
    Contract => "Contract",
});

string_enum!(PostType, "post type" {
    General => "General",
    Opportunity => "Opportunity",
    CareerJourney => "Career Journey",
    SuccessStory => "Success Story",
    TipsAndAdvice => "Tips & Advice",
    IndustryUpdate => "Industry Update",
});

string_enum!(ResourceCategory, "resource category" {
    ResumeTemplates => "Resume Templates",
    InterviewPrep => "Interview Prep",
    DsaPractice => "DSA Practice",
    SystemDesign => "System Design",
    HrTips => "HR Tips",
    CodingPractice => "Coding Practice",
    CareerGuidance => "Career Guidance",
    Other => "Other",
});

string_enum!(ResourceType, "resource type" {
    Document => "Document",
    Link => "Link",
    Video => "Video",
    Guide => "Guide",
});

impl MentorshipStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MentorshipStatus::Pending)
    }
}

impl ApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub branch: Option<String>,
    pub batch: Option<String>,
    pub year: Option<String>,
    pub role: Option<String>, // explicit override, only "admin" is meaningful
    pub expertise_domains: Vec<String>,
    pub current_company: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub linkedin_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorshipRequest {
    pub id: i64,
    pub student_id: i64,
    pub mentor_id: i64,
    pub domain: String,
    pub message: String,
    pub goals: Option<String>,
    pub status: MentorshipStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl MentorshipRequest {
    pub fn involves(&self, user_id: i64) -> bool {
        self.student_id == user_id || self.mentor_id == user_id
    }

    /// The party on the other side of the request from `user_id`.
    pub fn counterpart_of(&self, user_id: i64) -> Option<i64> {
        if user_id == self.student_id {
            Some(self.mentor_id)
        } else if user_id == self.mentor_id {
            Some(self.student_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralOpportunity {
    pub id: i64,
    pub posted_by: i64,
    pub company_name: String,
    pub position: String,
    pub job_type: JobType,
    pub location: Option<String>,
    pub required_skills: Vec<String>,
    pub description: String,
    pub salary_range: Option<String>,
    pub application_deadline: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ReferralOpportunity {
    /// Whether new applications are accepted on `today`.
    pub fn accepts_applications(&self, today: NaiveDate) -> bool {
        self.is_active && self.application_deadline.is_none_or(|deadline| deadline >= today)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralApplication {
    pub id: i64,
    pub opportunity_id: i64,
    pub applicant_id: i64,
    pub resume_url: String,
    pub cover_note: String,
    pub status: ApplicationStatus,
    pub reviewer_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub cover_image_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityMember {
    pub id: i64,
    pub community_id: i64,
    pub user_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: i64,
    pub community_id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub post_type: PostType,
    pub opportunity_id: Option<i64>,
    pub tags: Vec<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub mentorship_request_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerResource {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: ResourceCategory,
    pub resource_type: ResourceType,
    pub content_url: String,
    pub uploaded_by: i64,
    pub is_approved: bool,
    pub likes_count: i64,
    pub created_at: String,
}

// --- Inputs for create/update ---

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub branch: Option<String>,
    pub batch: Option<String>,
    pub year: Option<String>,
    pub role: Option<String>,
    pub expertise_domains: Vec<String>,
    pub current_company: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub linkedin_url: Option<String>,
}

/// Partial profile update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub branch: Option<String>,
    pub batch: Option<String>,
    pub year: Option<String>,
    pub role: Option<String>,
    pub expertise_domains: Option<Vec<String>>,
    pub current_company: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOpportunity {
    pub posted_by: i64,
    pub company_name: String,
    pub position: String,
    pub job_type: JobType,
    pub location: Option<String>,
    pub required_skills: Vec<String>,
    pub description: String,
    pub salary_range: Option<String>,
    pub application_deadline: Option<NaiveDate>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityUpdate {
    pub posted_by: Option<i64>,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub job_type: Option<JobType>,
    pub location: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub description: Option<String>,
    pub salary_range: Option<String>,
    pub application_deadline: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub post_type: PostType,
    pub opportunity_id: Option<i64>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub description: Option<String>,
    pub category: ResourceCategory,
    pub resource_type: ResourceType,
    pub content_url: String,
}

/// Splits a comma-separated form value into trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_labels_parse_case_insensitively() {
        assert_eq!("full-time".parse::<JobType>().unwrap(), JobType::FullTime);
        assert_eq!("Career Journey".parse::<PostType>().unwrap(), PostType::CareerJourney);
        assert_eq!(" ACCEPTED ".parse::<MentorshipStatus>().unwrap(), MentorshipStatus::Accepted);
        assert!("archived".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_enum_serializes_as_label() {
        let json = serde_json::to_string(&ResourceCategory::DsaPractice).unwrap();
        assert_eq!(json, "\"DSA Practice\"");
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list(" rust, ,go,"), vec!["rust", "go"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_accepts_applications_respects_deadline_and_toggle() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut opp = ReferralOpportunity {
            id: 1,
            posted_by: 1,
            company_name: "Acme".into(),
            position: "SWE Intern".into(),
            job_type: JobType::Internship,
            location: None,
            required_skills: vec![],
            description: "...".into(),
            salary_range: None,
            application_deadline: Some(today),
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(opp.accepts_applications(today));
        assert!(!opp.accepts_applications(today.succ_opt().unwrap()));
        opp.application_deadline = None;
        opp.is_active = false;
        assert!(!opp.accepts_applications(today));
    }

    #[test]
    fn test_counterpart_of() {
        let req = MentorshipRequest {
            id: 1,
            student_id: 10,
            mentor_id: 20,
            domain: "Career Guidance".into(),
            message: "Hi".into(),
            goals: None,
            status: MentorshipStatus::Pending,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(req.counterpart_of(10), Some(20));
        assert_eq!(req.counterpart_of(20), Some(10));
        assert_eq!(req.counterpart_of(30), None);
    }
}
