use serde::Serialize;
use std::fmt;

use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Mentor,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Mentor => "mentor",
            Role::User => "user",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Mentor => "Mentor",
            Role::User => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a user. The explicit admin override wins; otherwise alumni and
/// anyone with declared expertise count as mentors.
pub fn resolve_role(user: &User) -> Role {
    if user.role.as_deref() == Some("admin") {
        return Role::Admin;
    }
    if is_mentor_candidate(user) {
        return Role::Mentor;
    }
    Role::User
}

/// The mentor predicate alone, without the admin check. Mentor listings use
/// this, so an alumni admin shows up there too.
pub fn is_mentor_candidate(user: &User) -> bool {
    user.year.as_deref() == Some("Alumni") || !user.expertise_domains.is_empty()
}

pub fn is_admin(user: &User) -> bool {
    resolve_role(user) == Role::Admin
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub title: &'static str,
    pub command: &'static str,
}

const STUDENT_NAV: &[NavItem] = &[
    NavItem { title: "Dashboard", command: "campus dashboard" },
    NavItem { title: "Find Mentors", command: "campus mentors" },
    NavItem { title: "Job Referrals", command: "campus opportunity list" },
    NavItem { title: "Career Resources", command: "campus resource list" },
    NavItem { title: "Community", command: "campus community list" },
    NavItem { title: "My Connections", command: "campus connections" },
    NavItem { title: "AI Assistant", command: "campus ask" },
];

const MENTOR_NAV: &[NavItem] = &[
    NavItem { title: "Dashboard", command: "campus dashboard" },
    NavItem { title: "My Mentees", command: "campus mentorship list" },
    NavItem { title: "Referral Requests", command: "campus applications" },
    NavItem { title: "My Connections", command: "campus connections" },
];

const ADMIN_NAV: &[NavItem] = &[
    NavItem { title: "Dashboard", command: "campus dashboard" },
    NavItem { title: "Manage Communities", command: "campus community list" },
    NavItem { title: "Manage Mentors", command: "campus mentor-stats" },
    NavItem { title: "Post Opportunities", command: "campus opportunity add" },
];

/// Menu entries available to a role, in display order.
pub fn navigation(role: Role) -> &'static [NavItem] {
    match role {
        Role::User => STUDENT_NAV,
        Role::Mentor => MENTOR_NAV,
        Role::Admin => ADMIN_NAV,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> User {
        User::default()
    }

    #[test]
    fn test_admin_override_wins() {
        let user = User {
            role: Some("admin".into()),
            year: Some("Alumni".into()),
            expertise_domains: vec!["ML".into()],
            ..blank()
        };
        assert_eq!(resolve_role(&user), Role::Admin);
        // the mentor predicate is not exclusive of admins
        assert!(is_mentor_candidate(&user));
    }

    #[test]
    fn test_alumni_and_experts_are_mentors() {
        let alumni = User {
            year: Some("Alumni".into()),
            ..blank()
        };
        let expert = User {
            expertise_domains: vec!["X".into()],
            ..blank()
        };
        assert_eq!(resolve_role(&alumni), Role::Mentor);
        assert_eq!(resolve_role(&expert), Role::Mentor);
    }

    #[test]
    fn test_empty_user_is_student() {
        assert_eq!(resolve_role(&blank()), Role::User);
        let senior = User {
            year: Some("4th Year".into()),
            role: Some("user".into()),
            ..blank()
        };
        assert_eq!(resolve_role(&senior), Role::User);
    }

    #[test]
    fn test_role_override_is_case_sensitive() {
        let user = User {
            role: Some("Admin".into()),
            ..blank()
        };
        assert_eq!(resolve_role(&user), Role::User);
    }

    #[test]
    fn test_navigation_per_role() {
        assert_eq!(navigation(Role::User).len(), 7);
        assert_eq!(navigation(Role::Mentor)[1].title, "My Mentees");
        assert_eq!(navigation(Role::Admin).last().unwrap().title, "Post Opportunities");
    }
}
