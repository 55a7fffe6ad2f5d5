use regex::Regex;
use std::sync::LazyLock;

use crate::db::{must, Database};
use crate::error::{require, CampusError, CampusResult};
use crate::models::{NewUser, User, UserUpdate};
use crate::role::{is_admin, resolve_role, Role};
use crate::session::Session;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(https?|file)://\S+$").expect("valid url regex"));

pub fn validate_url(value: &str, field: &str) -> CampusResult<()> {
    if URL_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(CampusError::validation(format!("{} must be a URL (http, https or file)", field)))
    }
}

fn validate_role(role: Option<&str>) -> CampusResult<()> {
    match role {
        None | Some("admin") | Some("user") => Ok(()),
        Some(other) => Err(CampusError::validation(format!(
            "unknown role '{}' (expected 'admin' or 'user')",
            other
        ))),
    }
}

/// Signs a new user up. The explicit admin role can only be granted by an
/// existing admin, except for the very first account.
pub fn register(db: &Database, actor: Option<&Session>, new: NewUser) -> CampusResult<User> {
    require(&new.full_name, "full name")?;
    require(&new.email, "email")?;
    if !EMAIL_RE.is_match(new.email.trim()) {
        return Err(CampusError::validation(format!("'{}' is not an email address", new.email)));
    }
    if let Some(url) = &new.linkedin_url {
        validate_url(url, "LinkedIn URL")?;
    }
    validate_role(new.role.as_deref())?;
    if db.get_user_by_email(&new.email)?.is_some() {
        return Err(CampusError::validation(format!(
            "an account for '{}' already exists",
            new.email.trim()
        )));
    }

    if new.role.as_deref() == Some("admin") {
        let bootstrapping = db.count_users()? == 0;
        let by_admin = actor.is_some_and(|s| s.role == Role::Admin);
        if !bootstrapping && !by_admin {
            return Err(CampusError::unauthorized("only an admin can create admin accounts"));
        }
    }

    let user = db.create_user(&new)?;
    tracing::info!(user_id = user.id, role = %resolve_role(&user), "user registered");
    Ok(user)
}

/// Profile edit by the user themself or an admin. Only admins may change the
/// role override.
pub fn edit_profile(
    db: &Database,
    session: &Session,
    user_id: i64,
    update: UserUpdate,
) -> CampusResult<User> {
    must(db.get_user(user_id)?, "user", user_id)?;
    let acting_admin = is_admin(&session.user);
    if session.user_id() != user_id && !acting_admin {
        return Err(CampusError::unauthorized("you can only edit your own profile"));
    }
    if update.role.is_some() && !acting_admin {
        return Err(CampusError::unauthorized("only an admin can change roles"));
    }
    validate_role(update.role.as_deref())?;
    if let Some(name) = &update.full_name {
        require(name, "full name")?;
    }
    if let Some(url) = &update.linkedin_url {
        validate_url(url, "LinkedIn URL")?;
    }
    db.update_user(user_id, &update)
}

#[derive(Debug, Clone, Default)]
pub struct Promotion {
    pub expertise_domains: Vec<String>,
    pub current_company: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub year: Option<String>,
    pub batch: Option<String>,
}

/// Admin-only: turns a user into a mentor by recording expertise and, usually,
/// marking them Alumni. Year and batch keep their old values when omitted.
pub fn promote_to_mentor(
    db: &Database,
    session: &Session,
    user_id: i64,
    promotion: Promotion,
) -> CampusResult<User> {
    if session.role != Role::Admin {
        return Err(CampusError::unauthorized("only admins can promote mentors"));
    }
    let target = must(db.get_user(user_id)?, "user", user_id)?;
    let update = UserUpdate {
        expertise_domains: Some(promotion.expertise_domains),
        current_company: promotion.current_company,
        position: promotion.position,
        bio: promotion.bio,
        year: promotion.year.or(target.year),
        batch: promotion.batch.or(target.batch),
        ..Default::default()
    };
    let promoted = db.update_user(user_id, &update)?;
    if resolve_role(&promoted) == Role::User {
        tracing::warn!(user_id, "promotion left user without expertise or alumni status");
    } else {
        tracing::info!(user_id, "user promoted to mentor");
    }
    Ok(promoted)
}
