use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::error::{CampusError, CampusResult};
use crate::models::User;
use crate::role::{resolve_role, Role};

/// The signed-in user, passed explicitly to every operation.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub role: Role,
    /// Resources already liked during this session.
    pub liked_resources: BTreeSet<i64>,
}

impl Session {
    pub fn new(user: User) -> Self {
        let role = resolve_role(&user);
        Self {
            user,
            role,
            liked_resources: BTreeSet::new(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    user_id: i64,
    #[serde(default)]
    liked_resources: BTreeSet<i64>,
}

/// Identity provider backed by a small JSON file next to the database.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Loads the current user. The profile is re-read from the store so role
    /// changes made by an admin apply on the next command.
    pub fn me(&self, db: &Database) -> CampusResult<Session> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CampusError::NotLoggedIn);
            }
            Err(e) => return Err(e.into()),
        };
        let file: SessionFile = serde_json::from_str(&raw)?;
        let Some(user) = db.get_user(file.user_id)? else {
            // account vanished underneath the session
            return Err(CampusError::NotLoggedIn);
        };
        let mut session = Session::new(user);
        session.liked_resources = file.liked_resources;
        Ok(session)
    }

    pub fn login(&self, db: &Database, email: &str) -> CampusResult<Session> {
        let user = db
            .get_user_by_email(email)?
            .ok_or_else(|| CampusError::validation(format!("no account for '{}'", email.trim())))?;
        let session = Session::new(user);
        self.save(&session)?;
        tracing::info!(user_id = session.user_id(), role = %session.role, "logged in");
        Ok(session)
    }

    pub fn logout(&self) -> CampusResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, session: &Session) -> CampusResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = SessionFile {
            user_id: session.user_id(),
            liked_resources: session.liked_resources.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}
