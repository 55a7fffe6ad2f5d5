use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CampusError, CampusResult};
use crate::models::{
    ApplicationStatus, CareerResource, ChatMessage, Community, CommunityMember, CommunityPost,
    MentorshipRequest, MentorshipStatus, NewOpportunity, NewPost, NewResource, NewUser,
    OpportunityUpdate, ParseEnumError, ReferralApplication, ReferralOpportunity, User, UserUpdate,
};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

const USER_COLUMNS: &str = "id, full_name, email, branch, batch, year, role, expertise_domains, \
     current_company, position, bio, skills, linkedin_url, created_at, updated_at";
const REQUEST_COLUMNS: &str =
    "id, student_id, mentor_id, domain, message, goals, status, created_at, updated_at";
const OPPORTUNITY_COLUMNS: &str = "id, posted_by, company_name, position, job_type, location, \
     required_skills, description, salary_range, application_deadline, is_active, created_at, updated_at";
const APPLICATION_COLUMNS: &str = "a.id, a.opportunity_id, a.applicant_id, a.resume_url, a.cover_note, \
     a.status, a.reviewer_notes, a.created_at, a.updated_at";
const COMMUNITY_COLUMNS: &str = "id, name, description, cover_image_url, created_at";
const POST_COLUMNS: &str = "id, community_id, author_id, title, content, post_type, opportunity_id, \
     tags, likes_count, comments_count, created_at";
const MESSAGE_COLUMNS: &str = "id, mentorship_request_id, sender_id, receiver_id, content, \
     file_url, file_name, created_at";
const RESOURCE_COLUMNS: &str = "id, title, description, category, resource_type, content_url, \
     uploaded_by, is_approved, likes_count, created_at";

// --- Query filters ---

#[derive(Debug, Clone, Default)]
pub struct MentorshipFilter {
    pub student_id: Option<i64>,
    pub mentor_id: Option<i64>,
    pub status: Option<MentorshipStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub opportunity_id: Option<i64>,
    pub applicant_id: Option<i64>,
    pub status: Option<ApplicationStatus>,
    /// Applications on opportunities posted by this user.
    pub posted_by: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub posted_by: Option<i64>,
    pub is_active: Option<bool>,
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub community_id: Option<i64>,
    pub user_id: Option<i64>,
}

/// Accumulates `AND`-joined conditions with their bound values.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Conditions {
    fn eq(&mut self, column: &str, value: impl Into<Value>) {
        self.values.push(value.into());
        self.clauses.push(format!("{} = ?{}", column, self.values.len()));
    }

    fn any_of(&mut self, column: &str, ids: &[i64]) {
        if ids.is_empty() {
            self.clauses.push("0".to_string());
            return;
        }
        let mut slots = Vec::with_capacity(ids.len());
        for id in ids {
            self.values.push(Value::Integer(*id));
            slots.push(format!("?{}", self.values.len()));
        }
        self.clauses.push(format!("{} IN ({})", column, slots.join(", ")));
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Accumulates `SET` assignments for a partial update.
#[derive(Default)]
struct Assignments {
    sets: Vec<String>,
    values: Vec<Value>,
}

impl Assignments {
    fn set(&mut self, column: &str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.values.push(value.into());
            self.sets.push(format!("{} = ?{}", column, self.values.len()));
        }
    }

    fn set_list(&mut self, column: &str, value: Option<&Vec<String>>) -> CampusResult<()> {
        if let Some(list) = value {
            self.set(column, Some(serde_json::to_string(list)?));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Turns a `"-field"` / `"field"` ordering string into an `ORDER BY` clause.
/// Only columns in `allowed` are accepted; `created_date` is an alias of
/// `created_at`. With no ordering, rows come back newest first.
pub fn order_clause(order_by: Option<&str>, allowed: &[&str], prefix: &str) -> CampusResult<String> {
    let Some(raw) = order_by.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(format!(" ORDER BY {p}created_at DESC, {p}id DESC", p = prefix));
    };
    let (field, direction) = match raw.strip_prefix('-') {
        Some(rest) => (rest, "DESC"),
        None => (raw, "ASC"),
    };
    let field = if field == "created_date" { "created_at" } else { field };
    if field != "created_at" && field != "id" && !allowed.contains(&field) {
        return Err(CampusError::validation(format!("cannot order by '{}'", field)));
    }
    Ok(format!(
        " ORDER BY {p}{f} {d}, {p}id {d}",
        p = prefix,
        f = field,
        d = direction
    ))
}

fn limit_clause(limit: Option<usize>) -> String {
    limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default()
}

pub fn must<T>(value: Option<T>, entity: &'static str, id: i64) -> CampusResult<T> {
    value.ok_or(CampusError::NotFound { entity, id })
}

impl Database {
    pub fn open(path: &Path) -> CampusResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Fresh, initialized database that lives only as long as the handle.
    pub fn open_in_memory() -> CampusResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> CampusResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                branch TEXT,
                batch TEXT,
                year TEXT,
                role TEXT,
                expertise_domains TEXT NOT NULL DEFAULT '[]',
                current_company TEXT,
                position TEXT,
                bio TEXT,
                skills TEXT NOT NULL DEFAULT '[]',
                linkedin_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS mentorship_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL REFERENCES users(id),
                mentor_id INTEGER NOT NULL REFERENCES users(id),
                domain TEXT NOT NULL,
                message TEXT NOT NULL,
                goals TEXT,
                status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'accepted', 'rejected')),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS referral_opportunities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                posted_by INTEGER NOT NULL REFERENCES users(id),
                company_name TEXT NOT NULL,
                position TEXT NOT NULL,
                job_type TEXT NOT NULL DEFAULT 'Full-time' CHECK (job_type IN ('Full-time', 'Internship', 'Part-time', 'Contract')),
                location TEXT,
                required_skills TEXT NOT NULL DEFAULT '[]',
                description TEXT NOT NULL,
                salary_range TEXT,
                application_deadline TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS referral_applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                opportunity_id INTEGER NOT NULL REFERENCES referral_opportunities(id),
                applicant_id INTEGER NOT NULL REFERENCES users(id),
                resume_url TEXT NOT NULL,
                cover_note TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
                reviewer_notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS communities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                cover_image_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS community_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                community_id INTEGER NOT NULL REFERENCES communities(id),
                user_id INTEGER NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (community_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS community_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                community_id INTEGER NOT NULL REFERENCES communities(id),
                author_id INTEGER NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                post_type TEXT NOT NULL DEFAULT 'General',
                opportunity_id INTEGER,
                tags TEXT NOT NULL DEFAULT '[]',
                likes_count INTEGER NOT NULL DEFAULT 0,
                comments_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mentorship_request_id INTEGER NOT NULL REFERENCES mentorship_requests(id),
                sender_id INTEGER NOT NULL REFERENCES users(id),
                receiver_id INTEGER NOT NULL REFERENCES users(id),
                content TEXT NOT NULL DEFAULT '',
                file_url TEXT,
                file_name TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS career_resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL DEFAULT 'Resume Templates',
                resource_type TEXT NOT NULL DEFAULT 'Document',
                content_url TEXT NOT NULL,
                uploaded_by INTEGER NOT NULL REFERENCES users(id),
                is_approved INTEGER NOT NULL DEFAULT 1,
                likes_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_requests_mentor ON mentorship_requests(mentor_id);
            CREATE INDEX IF NOT EXISTS idx_requests_student ON mentorship_requests(student_id);
            CREATE INDEX IF NOT EXISTS idx_applications_opportunity ON referral_applications(opportunity_id);
            CREATE INDEX IF NOT EXISTS idx_applications_applicant ON referral_applications(applicant_id);
            CREATE INDEX IF NOT EXISTS idx_posts_community ON community_posts(community_id);
            CREATE INDEX IF NOT EXISTS idx_messages_request ON chat_messages(mentorship_request_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> CampusResult<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='users'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(CampusError::validation(
                "database not initialized. Run 'campus init' first.",
            ));
        }
        Ok(())
    }

    fn query_all<T>(
        &self,
        sql: &str,
        values: &[Value],
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> CampusResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), map)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn query_one<T>(
        &self,
        sql: &str,
        id: i64,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> CampusResult<Option<T>> {
        Ok(self.conn.query_row(sql, [id], map).optional()?)
    }

    fn count(&self, table: &str) -> CampusResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    // --- User operations ---

    pub fn create_user(&self, user: &NewUser) -> CampusResult<User> {
        self.conn.execute(
            "INSERT INTO users (full_name, email, branch, batch, year, role, expertise_domains,
                                current_company, position, bio, skills, linkedin_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                user.full_name.trim(),
                user.email.trim(),
                user.branch,
                user.batch,
                user.year,
                user.role,
                serde_json::to_string(&user.expertise_domains)?,
                user.current_company,
                user.position,
                user.bio,
                serde_json::to_string(&user.skills)?,
                user.linkedin_url,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        must(self.get_user(id)?, "user", id)
    }

    pub fn get_user(&self, id: i64) -> CampusResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        self.query_one(&sql, id, row_to_user)
    }

    pub fn get_user_by_email(&self, email: &str) -> CampusResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [email.trim()], row_to_user)
            .optional()?)
    }

    pub fn list_users(&self, order_by: Option<&str>, limit: Option<usize>) -> CampusResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users{}{}",
            USER_COLUMNS,
            order_clause(order_by, &["full_name", "email", "year", "batch", "updated_at"], "")?,
            limit_clause(limit)
        );
        self.query_all(&sql, &[], row_to_user)
    }

    pub fn update_user(&self, id: i64, update: &UserUpdate) -> CampusResult<User> {
        let mut set = Assignments::default();
        set.set("full_name", update.full_name.clone());
        set.set("branch", update.branch.clone());
        set.set("batch", update.batch.clone());
        set.set("year", update.year.clone());
        set.set("role", update.role.clone());
        set.set_list("expertise_domains", update.expertise_domains.as_ref())?;
        set.set("current_company", update.current_company.clone());
        set.set("position", update.position.clone());
        set.set("bio", update.bio.clone());
        set.set_list("skills", update.skills.as_ref())?;
        set.set("linkedin_url", update.linkedin_url.clone());
        self.apply_update("users", id, set)?;
        must(self.get_user(id)?, "user", id)
    }

    pub fn count_users(&self) -> CampusResult<i64> {
        self.count("users")
    }

    fn apply_update(&self, table: &str, id: i64, mut set: Assignments) -> CampusResult<()> {
        if set.is_empty() {
            return Ok(());
        }
        set.sets.push("updated_at = datetime('now')".to_string());
        set.values.push(Value::Integer(id));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            set.sets.join(", "),
            set.values.len()
        );
        let changed = self.conn.execute(&sql, params_from_iter(set.values.iter()))?;
        if changed == 0 {
            return Err(CampusError::NotFound {
                entity: entity_name(table),
                id,
            });
        }
        Ok(())
    }

    // --- Mentorship request operations ---

    pub fn create_mentorship_request(
        &self,
        student_id: i64,
        mentor_id: i64,
        domain: &str,
        message: &str,
        goals: Option<&str>,
    ) -> CampusResult<MentorshipRequest> {
        self.conn.execute(
            "INSERT INTO mentorship_requests (student_id, mentor_id, domain, message, goals, status)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
            params![student_id, mentor_id, domain, message, goals],
        )?;
        let id = self.conn.last_insert_rowid();
        must(self.get_mentorship_request(id)?, "mentorship request", id)
    }

    pub fn get_mentorship_request(&self, id: i64) -> CampusResult<Option<MentorshipRequest>> {
        let sql = format!("SELECT {} FROM mentorship_requests WHERE id = ?1", REQUEST_COLUMNS);
        self.query_one(&sql, id, row_to_request)
    }

    pub fn list_mentorship_requests(
        &self,
        filter: &MentorshipFilter,
        order_by: Option<&str>,
    ) -> CampusResult<Vec<MentorshipRequest>> {
        let mut cond = Conditions::default();
        if let Some(id) = filter.student_id {
            cond.eq("student_id", id);
        }
        if let Some(id) = filter.mentor_id {
            cond.eq("mentor_id", id);
        }
        if let Some(status) = filter.status {
            cond.eq("status", status.as_str().to_string());
        }
        let sql = format!(
            "SELECT {} FROM mentorship_requests{}{}",
            REQUEST_COLUMNS,
            cond.sql(),
            order_clause(order_by, &["status", "domain", "updated_at"], "")?
        );
        self.query_all(&sql, &cond.values, row_to_request)
    }

    /// Moves a pending request to `status`. Returns false when the row was no
    /// longer pending, so a concurrent transition never gets overwritten.
    pub fn set_mentorship_status(&self, id: i64, status: MentorshipStatus) -> CampusResult<bool> {
        let changed = self.conn.execute(
            "UPDATE mentorship_requests SET status = ?1, updated_at = datetime('now')
             WHERE id = ?2 AND status = 'pending'",
            params![status.as_str(), id],
        )?;
        Ok(changed == 1)
    }

    // --- Referral opportunity operations ---

    pub fn create_opportunity(&self, opp: &NewOpportunity) -> CampusResult<ReferralOpportunity> {
        self.conn.execute(
            "INSERT INTO referral_opportunities (posted_by, company_name, position, job_type, location,
                required_skills, description, salary_range, application_deadline, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                opp.posted_by,
                opp.company_name.trim(),
                opp.position.trim(),
                opp.job_type.as_str(),
                opp.location,
                serde_json::to_string(&opp.required_skills)?,
                opp.description,
                opp.salary_range,
                opp.application_deadline,
                opp.is_active,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        must(self.get_opportunity(id)?, "opportunity", id)
    }

    pub fn get_opportunity(&self, id: i64) -> CampusResult<Option<ReferralOpportunity>> {
        let sql = format!(
            "SELECT {} FROM referral_opportunities WHERE id = ?1",
            OPPORTUNITY_COLUMNS
        );
        self.query_one(&sql, id, row_to_opportunity)
    }

    pub fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
        order_by: Option<&str>,
        limit: Option<usize>,
    ) -> CampusResult<Vec<ReferralOpportunity>> {
        let mut cond = Conditions::default();
        if let Some(id) = filter.posted_by {
            cond.eq("posted_by", id);
        }
        if let Some(active) = filter.is_active {
            cond.eq("is_active", active);
        }
        if let Some(ids) = &filter.ids {
            cond.any_of("id", ids);
        }
        let sql = format!(
            "SELECT {} FROM referral_opportunities{}{}{}",
            OPPORTUNITY_COLUMNS,
            cond.sql(),
            order_clause(
                order_by,
                &["company_name", "position", "application_deadline", "updated_at"],
                ""
            )?,
            limit_clause(limit)
        );
        self.query_all(&sql, &cond.values, row_to_opportunity)
    }

    pub fn update_opportunity(
        &self,
        id: i64,
        update: &OpportunityUpdate,
    ) -> CampusResult<ReferralOpportunity> {
        let mut set = Assignments::default();
        set.set("posted_by", update.posted_by);
        set.set("company_name", update.company_name.clone());
        set.set("position", update.position.clone());
        set.set("job_type", update.job_type.map(|t| t.as_str().to_string()));
        set.set("location", update.location.clone());
        set.set_list("required_skills", update.required_skills.as_ref())?;
        set.set("description", update.description.clone());
        set.set("salary_range", update.salary_range.clone());
        set.set(
            "application_deadline",
            update
                .application_deadline
                .map(|d| d.format("%Y-%m-%d").to_string()),
        );
        set.set("is_active", update.is_active);
        self.apply_update("referral_opportunities", id, set)?;
        must(self.get_opportunity(id)?, "opportunity", id)
    }

    pub fn count_opportunities(&self) -> CampusResult<i64> {
        self.count("referral_opportunities")
    }

    // --- Referral application operations ---

    pub fn create_application(
        &self,
        opportunity_id: i64,
        applicant_id: i64,
        resume_url: &str,
        cover_note: &str,
    ) -> CampusResult<ReferralApplication> {
        self.conn.execute(
            "INSERT INTO referral_applications (opportunity_id, applicant_id, resume_url, cover_note, status)
             VALUES (?1, ?2, ?3, ?4, 'pending')",
            params![opportunity_id, applicant_id, resume_url, cover_note],
        )?;
        let id = self.conn.last_insert_rowid();
        must(self.get_application(id)?, "application", id)
    }

    pub fn get_application(&self, id: i64) -> CampusResult<Option<ReferralApplication>> {
        let sql = format!(
            "SELECT {} FROM referral_applications a WHERE a.id = ?1",
            APPLICATION_COLUMNS
        );
        self.query_one(&sql, id, row_to_application)
    }

    pub fn list_applications(
        &self,
        filter: &ApplicationFilter,
        order_by: Option<&str>,
    ) -> CampusResult<Vec<ReferralApplication>> {
        let mut cond = Conditions::default();
        if let Some(id) = filter.opportunity_id {
            cond.eq("a.opportunity_id", id);
        }
        if let Some(id) = filter.applicant_id {
            cond.eq("a.applicant_id", id);
        }
        if let Some(status) = filter.status {
            cond.eq("a.status", status.as_str().to_string());
        }
        if let Some(id) = filter.posted_by {
            cond.eq("o.posted_by", id);
        }
        let sql = format!(
            "SELECT {} FROM referral_applications a
             JOIN referral_opportunities o ON a.opportunity_id = o.id{}{}",
            APPLICATION_COLUMNS,
            cond.sql(),
            order_clause(order_by, &["status", "updated_at"], "a.")?
        );
        self.query_all(&sql, &cond.values, row_to_application)
    }

    /// Records a review on a pending application; false when it was already reviewed.
    pub fn set_application_review(
        &self,
        id: i64,
        status: ApplicationStatus,
        reviewer_notes: &str,
    ) -> CampusResult<bool> {
        let changed = self.conn.execute(
            "UPDATE referral_applications
             SET status = ?1, reviewer_notes = ?2, updated_at = datetime('now')
             WHERE id = ?3 AND status = 'pending'",
            params![status.as_str(), reviewer_notes, id],
        )?;
        Ok(changed == 1)
    }

    // --- Community operations ---

    pub fn create_community(
        &self,
        name: &str,
        description: &str,
        cover_image_url: Option<&str>,
    ) -> CampusResult<Community> {
        self.conn.execute(
            "INSERT INTO communities (name, description, cover_image_url) VALUES (?1, ?2, ?3)",
            params![name.trim(), description.trim(), cover_image_url],
        )?;
        let id = self.conn.last_insert_rowid();
        must(self.get_community(id)?, "community", id)
    }

    pub fn get_community(&self, id: i64) -> CampusResult<Option<Community>> {
        let sql = format!("SELECT {} FROM communities WHERE id = ?1", COMMUNITY_COLUMNS);
        self.query_one(&sql, id, row_to_community)
    }

    pub fn list_communities(&self, order_by: Option<&str>) -> CampusResult<Vec<Community>> {
        let sql = format!(
            "SELECT {} FROM communities{}",
            COMMUNITY_COLUMNS,
            order_clause(order_by, &["name"], "")?
        );
        self.query_all(&sql, &[], row_to_community)
    }

    pub fn count_communities(&self) -> CampusResult<i64> {
        self.count("communities")
    }

    /// Adds a membership row, or returns the existing one for the pair.
    pub fn add_member(&self, community_id: i64, user_id: i64) -> CampusResult<CommunityMember> {
        self.conn.execute(
            "INSERT OR IGNORE INTO community_members (community_id, user_id) VALUES (?1, ?2)",
            params![community_id, user_id],
        )?;
        Ok(self.conn.query_row(
            "SELECT id, community_id, user_id, created_at FROM community_members
             WHERE community_id = ?1 AND user_id = ?2",
            params![community_id, user_id],
            row_to_member,
        )?)
    }

    pub fn list_members(&self, filter: &MemberFilter) -> CampusResult<Vec<CommunityMember>> {
        let mut cond = Conditions::default();
        if let Some(id) = filter.community_id {
            cond.eq("community_id", id);
        }
        if let Some(id) = filter.user_id {
            cond.eq("user_id", id);
        }
        let sql = format!(
            "SELECT id, community_id, user_id, created_at FROM community_members{} ORDER BY id",
            cond.sql()
        );
        self.query_all(&sql, &cond.values, row_to_member)
    }

    pub fn create_post(
        &self,
        community_id: i64,
        author_id: i64,
        post: &NewPost,
    ) -> CampusResult<CommunityPost> {
        self.conn.execute(
            "INSERT INTO community_posts (community_id, author_id, title, content, post_type,
                                          opportunity_id, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                community_id,
                author_id,
                post.title.trim(),
                post.content,
                post.post_type.as_str(),
                post.opportunity_id,
                serde_json::to_string(&post.tags)?,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let sql = format!("SELECT {} FROM community_posts WHERE id = ?1", POST_COLUMNS);
        must(self.query_one(&sql, id, row_to_post)?, "post", id)
    }

    pub fn list_posts(
        &self,
        community_id: i64,
        order_by: Option<&str>,
    ) -> CampusResult<Vec<CommunityPost>> {
        let sql = format!(
            "SELECT {} FROM community_posts WHERE community_id = ?1{}",
            POST_COLUMNS,
            order_clause(order_by, &["likes_count", "title"], "")?
        );
        self.query_all(&sql, &[Value::Integer(community_id)], row_to_post)
    }

    // --- Chat operations ---

    pub fn create_chat_message(
        &self,
        request_id: i64,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
        file: Option<(&str, &str)>,
    ) -> CampusResult<ChatMessage> {
        let (file_url, file_name) = match file {
            Some((url, name)) => (Some(url), Some(name)),
            None => (None, None),
        };
        self.conn.execute(
            "INSERT INTO chat_messages (mentorship_request_id, sender_id, receiver_id, content,
                                        file_url, file_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![request_id, sender_id, receiver_id, content, file_url, file_name],
        )?;
        let id = self.conn.last_insert_rowid();
        let sql = format!("SELECT {} FROM chat_messages WHERE id = ?1", MESSAGE_COLUMNS);
        must(self.query_one(&sql, id, row_to_message)?, "chat message", id)
    }

    /// Messages of one thread, oldest first.
    pub fn list_chat_messages(&self, request_id: i64) -> CampusResult<Vec<ChatMessage>> {
        let sql = format!(
            "SELECT {} FROM chat_messages WHERE mentorship_request_id = ?1{}",
            MESSAGE_COLUMNS,
            order_clause(Some("created_at"), &[], "")?
        );
        self.query_all(&sql, &[Value::Integer(request_id)], row_to_message)
    }

    // --- Career resource operations ---

    pub fn create_resource(&self, uploaded_by: i64, res: &NewResource) -> CampusResult<CareerResource> {
        self.conn.execute(
            "INSERT INTO career_resources (title, description, category, resource_type, content_url,
                                           uploaded_by, is_approved)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
            params![
                res.title.trim(),
                res.description,
                res.category.as_str(),
                res.resource_type.as_str(),
                res.content_url.trim(),
                uploaded_by,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        must(self.get_resource(id)?, "resource", id)
    }

    pub fn get_resource(&self, id: i64) -> CampusResult<Option<CareerResource>> {
        let sql = format!("SELECT {} FROM career_resources WHERE id = ?1", RESOURCE_COLUMNS);
        self.query_one(&sql, id, row_to_resource)
    }

    pub fn list_resources(
        &self,
        approved_only: bool,
        order_by: Option<&str>,
    ) -> CampusResult<Vec<CareerResource>> {
        let mut cond = Conditions::default();
        if approved_only {
            cond.eq("is_approved", true);
        }
        let sql = format!(
            "SELECT {} FROM career_resources{}{}",
            RESOURCE_COLUMNS,
            cond.sql(),
            order_clause(order_by, &["likes_count", "title", "category"], "")?
        );
        self.query_all(&sql, &cond.values, row_to_resource)
    }

    pub fn set_resource_likes(&self, id: i64, likes_count: i64) -> CampusResult<()> {
        let changed = self.conn.execute(
            "UPDATE career_resources SET likes_count = ?1 WHERE id = ?2",
            params![likes_count, id],
        )?;
        if changed == 0 {
            return Err(CampusError::NotFound {
                entity: "resource",
                id,
            });
        }
        Ok(())
    }
}

fn entity_name(table: &str) -> &'static str {
    match table {
        "users" => "user",
        "referral_opportunities" => "opportunity",
        _ => "record",
    }
}

// --- Row mapping ---

fn enum_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn list_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        }),
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        branch: row.get(3)?,
        batch: row.get(4)?,
        year: row.get(5)?,
        role: row.get(6)?,
        expertise_domains: list_column(row, 7)?,
        current_company: row.get(8)?,
        position: row.get(9)?,
        bio: row.get(10)?,
        skills: list_column(row, 11)?,
        linkedin_url: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn row_to_request(row: &Row) -> rusqlite::Result<MentorshipRequest> {
    Ok(MentorshipRequest {
        id: row.get(0)?,
        student_id: row.get(1)?,
        mentor_id: row.get(2)?,
        domain: row.get(3)?,
        message: row.get(4)?,
        goals: row.get(5)?,
        status: enum_column(row, 6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_opportunity(row: &Row) -> rusqlite::Result<ReferralOpportunity> {
    Ok(ReferralOpportunity {
        id: row.get(0)?,
        posted_by: row.get(1)?,
        company_name: row.get(2)?,
        position: row.get(3)?,
        job_type: enum_column(row, 4)?,
        location: row.get(5)?,
        required_skills: list_column(row, 6)?,
        description: row.get(7)?,
        salary_range: row.get(8)?,
        application_deadline: row.get(9)?,
        is_active: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn row_to_application(row: &Row) -> rusqlite::Result<ReferralApplication> {
    Ok(ReferralApplication {
        id: row.get(0)?,
        opportunity_id: row.get(1)?,
        applicant_id: row.get(2)?,
        resume_url: row.get(3)?,
        cover_note: row.get(4)?,
        status: enum_column(row, 5)?,
        reviewer_notes: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_community(row: &Row) -> rusqlite::Result<Community> {
    Ok(Community {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        cover_image_url: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_member(row: &Row) -> rusqlite::Result<CommunityMember> {
    Ok(CommunityMember {
        id: row.get(0)?,
        community_id: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_post(row: &Row) -> rusqlite::Result<CommunityPost> {
    Ok(CommunityPost {
        id: row.get(0)?,
        community_id: row.get(1)?,
        author_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        post_type: enum_column(row, 5)?,
        opportunity_id: row.get(6)?,
        tags: list_column(row, 7)?,
        likes_count: row.get(8)?,
        comments_count: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn row_to_message(row: &Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        mentorship_request_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        content: row.get(4)?,
        file_url: row.get(5)?,
        file_name: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn row_to_resource(row: &Row) -> rusqlite::Result<CareerResource> {
    Ok(CareerResource {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: enum_column(row, 3)?,
        resource_type: enum_column(row, 4)?,
        content_url: row.get(5)?,
        uploaded_by: row.get(6)?,
        is_approved: row.get(7)?,
        likes_count: row.get(8)?,
        created_at: row.get(9)?,
    })
}
