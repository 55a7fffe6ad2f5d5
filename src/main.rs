mod ai;
mod chat;
mod community;
mod config;
mod db;
mod error;
mod mentorship;
mod models;
mod profile;
mod referral;
mod resources;
mod role;
mod session;
mod tui;
mod upload;
mod views;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::Config;
use db::Database;
use error::CampusError;
use models::{
    split_list, ApplicationStatus, JobType, MentorshipStatus, NewOpportunity, NewPost, NewResource,
    OpportunityUpdate, PostType, ResourceCategory, ResourceType, User, UserUpdate,
};
use role::{navigation, resolve_role};
use session::{Session, SessionStore};
use upload::LocalUploader;
use views::{Dashboard, DirectoryFilter, MentorActivity};

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Campus networking - mentorships, referrals, communities and career resources")]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Sign in as an existing user
    Login {
        email: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user, their role and menu
    Whoami,

    /// Manage user profiles
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Find mentors
    Mentors {
        #[arg(short, long)]
        branch: Option<String>,

        #[arg(short, long)]
        year: Option<String>,

        /// Match name, company or expertise
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Mentorship requests
    Mentorship {
        #[command(subcommand)]
        command: MentorshipCommands,
    },

    /// Chat on an accepted mentorship
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },

    /// Referral opportunities
    Opportunity {
        #[command(subcommand)]
        command: OpportunityCommands,
    },

    /// Apply for a referral with a PDF resume
    Apply {
        opportunity_id: i64,

        #[arg(short, long)]
        resume: PathBuf,

        /// Why you are a good fit
        #[arg(short, long)]
        note: String,
    },

    /// Referral applications (your own, or the ones you can review)
    Applications,

    /// Approve or reject a referral application
    Review {
        application_id: i64,

        #[arg(value_enum)]
        decision: Decision,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Communities and posts
    Community {
        #[command(subcommand)]
        command: CommunityCommands,
    },

    /// Career resources
    Resource {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Role dashboard
    Dashboard,

    /// Accepted mentorships and your referral applications
    Connections,

    /// Mentor activity overview (admin)
    MentorStats {
        /// all, active, pending or inactive
        #[arg(short, long, default_value = "all")]
        filter: String,

        #[arg(short, long)]
        search: Option<String>,
    },

    /// Ask the campus AI assistant
    Ask {
        question: Vec<String>,

        /// Model to use (default: claude-sonnet)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Browse opportunities in the terminal
    Browse,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Grant the admin role (first account, or by an admin)
        #[arg(long)]
        admin: bool,
    },

    /// List users
    List,

    /// Show a profile
    Show {
        id: i64,
    },

    /// Edit a profile (your own unless you are an admin)
    Edit {
        /// User ID (defaults to yourself)
        id: Option<i64>,

        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Set the role override ("admin" or "user")
        #[arg(long)]
        role: Option<String>,
    },

    /// Make a user a mentor (admin)
    Promote {
        id: i64,

        /// Comma-separated expertise domains
        #[arg(long)]
        expertise: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        position: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        year: Option<String>,

        #[arg(long)]
        batch: Option<String>,
    },
}

#[derive(clap::Args)]
struct ProfileArgs {
    #[arg(long)]
    branch: Option<String>,

    #[arg(long)]
    batch: Option<String>,

    /// e.g. "3rd Year" or "Alumni"
    #[arg(long)]
    year: Option<String>,

    /// Comma-separated
    #[arg(long)]
    skills: Option<String>,

    /// Comma-separated
    #[arg(long)]
    expertise: Option<String>,

    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    position: Option<String>,

    #[arg(long)]
    bio: Option<String>,

    #[arg(long)]
    linkedin: Option<String>,
}

#[derive(Subcommand)]
enum MentorshipCommands {
    /// Ask a mentor for guidance
    Request {
        mentor_id: i64,

        #[arg(short, long)]
        domain: String,

        #[arg(short, long)]
        message: String,

        #[arg(short, long)]
        goals: Option<String>,
    },

    /// Accept or reject a request addressed to you
    Respond {
        request_id: i64,

        #[arg(value_enum)]
        decision: Decision,
    },

    /// List requests (incoming for mentors, outgoing otherwise)
    List {
        /// pending, accepted or rejected
        #[arg(short, long)]
        status: Option<String>,

        /// Show requests you sent even if you are a mentor
        #[arg(long)]
        sent: bool,
    },
}

#[derive(Subcommand)]
enum ChatCommands {
    /// Show the conversation
    Show {
        request_id: i64,
    },

    /// Send a message
    Send {
        request_id: i64,

        message: Option<String>,

        /// Attach a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum OpportunityCommands {
    /// Post an opportunity (mentors and admins)
    Add {
        #[arg(long)]
        company: String,

        #[arg(long)]
        position: String,

        #[arg(long)]
        description: String,

        /// Full-time, Internship, Part-time or Contract
        #[arg(long, default_value = "Full-time")]
        job_type: String,

        #[arg(long)]
        location: Option<String>,

        /// Comma-separated
        #[arg(long)]
        skills: Option<String>,

        #[arg(long)]
        salary: Option<String>,

        /// YYYY-MM-DD
        #[arg(long)]
        deadline: Option<NaiveDate>,

        /// Post on behalf of this mentor (admin)
        #[arg(long)]
        posted_by: Option<i64>,
    },

    /// Edit an opportunity (admin)
    Edit {
        id: i64,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        position: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        job_type: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        skills: Option<String>,

        #[arg(long)]
        salary: Option<String>,

        #[arg(long)]
        deadline: Option<NaiveDate>,

        #[arg(long)]
        posted_by: Option<i64>,
    },

    /// Activate or deactivate an opportunity (admin)
    Toggle {
        id: i64,
    },

    /// List opportunities
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show an opportunity with its stats
    Show {
        id: i64,
    },
}

#[derive(Subcommand)]
enum CommunityCommands {
    /// Create a community (admin)
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        cover: Option<String>,
    },

    /// List communities
    List,

    /// Join a community
    Join {
        id: i64,
    },

    /// Show a community feed
    Show {
        id: i64,
    },

    /// Post to a community
    Post {
        id: i64,

        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        /// General, Opportunity, Career Journey, Success Story, Tips & Advice, Industry Update
        #[arg(long, default_value = "General")]
        post_type: String,

        /// Link a referral opportunity
        #[arg(long)]
        opportunity: Option<i64>,

        /// Comma-separated
        #[arg(long)]
        tags: Option<String>,
    },
}

#[derive(Subcommand)]
enum ResourceCommands {
    /// Share a resource
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        url: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, default_value = "Resume Templates")]
        category: String,

        /// Document, Link, Video or Guide
        #[arg(long = "type", default_value = "Document")]
        resource_type: String,
    },

    /// List approved resources
    List {
        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        search: Option<String>,
    },

    /// Like a resource (once per session)
    Like {
        id: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    #[value(alias = "approve")]
    Accept,
    Reject,
}

impl Decision {
    fn mentorship(self) -> MentorshipStatus {
        match self {
            Decision::Accept => MentorshipStatus::Accepted,
            Decision::Reject => MentorshipStatus::Rejected,
        }
    }

    fn application(self) -> ApplicationStatus {
        match self {
            Decision::Accept => ApplicationStatus::Approved,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// Everything a command needs: config, storage and the identity provider.
struct App {
    config: Config,
    db: Database,
    sessions: SessionStore,
    json: bool,
}

impl App {
    fn me(&self) -> Result<Session> {
        self.db.ensure_initialized()?;
        Ok(self.sessions.me(&self.db)?)
    }

    fn uploader(&self) -> LocalUploader {
        LocalUploader::new(&self.config.upload_dir)
    }

    /// Prints `value` as JSON when `--json` was given; otherwise runs `table`.
    fn emit<T: Serialize>(&self, value: &T, table: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            table(value);
        }
        Ok(())
    }
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Hint printed after a failure that is worth retrying as is.
fn retry_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CampusError>())
        .filter(|e| e.is_transient())
        .map(|_| "This looks like a temporary failure, try again.")
}

fn main() -> Result<()> {
    let result = run(Cli::parse());
    if let Err(e) = &result {
        if let Some(hint) = retry_hint(e) {
            eprintln!("{}", hint);
        }
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_json);

    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    let app = App {
        sessions: SessionStore::new(&config.session_path),
        config,
        db,
        json: cli.json,
    };

    match cli.command {
        Commands::Init => {
            app.db.init()?;
            println!("Database initialized at {}", app.db.path().display());
        }

        Commands::Login { email } => {
            app.db.ensure_initialized()?;
            let session = app.sessions.login(&app.db, &email)?;
            println!(
                "Logged in as {} ({})",
                session.user.full_name,
                session.role.display_name()
            );
        }

        Commands::Logout => {
            app.sessions.logout()?;
            println!("Logged out.");
        }

        Commands::Whoami => {
            let session = app.me()?;
            app.emit(&session.user, |user| {
                print_user(user);
                println!();
                println!("Menu:");
                for item in navigation(session.role) {
                    println!("  {:<20} {}", item.title, item.command);
                }
            })?;
        }

        Commands::User { command } => run_user(&app, command)?,

        Commands::Mentors { branch, year, search } => {
            let session = app.me()?;
            let filter = DirectoryFilter { branch, year, search };
            let cards = views::mentor_directory(&app.db, &session, &filter)?;
            app.emit(&cards, |cards| {
                if cards.is_empty() {
                    println!("No mentors match.");
                    return;
                }
                println!("{:<6} {:<22} {:<18} {:<28} {:<10}", "ID", "NAME", "COMPANY", "EXPERTISE", "REQUEST");
                println!("{}", "-".repeat(88));
                for card in cards {
                    let m = &card.mentor;
                    println!(
                        "{:<6} {:<22} {:<18} {:<28} {:<10}",
                        m.id,
                        truncate(&m.full_name, 20),
                        truncate(m.current_company.as_deref().unwrap_or("-"), 16),
                        truncate(&m.expertise_domains.join(", "), 26),
                        card.request_status.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
                    );
                }
            })?;
        }

        Commands::Mentorship { command } => run_mentorship(&app, command)?,

        Commands::Chat { command } => run_chat(&app, command)?,

        Commands::Opportunity { command } => run_opportunity(&app, command)?,

        Commands::Apply {
            opportunity_id,
            resume,
            note,
        } => {
            let session = app.me()?;
            let application = referral::submit_application(
                &app.db,
                &session,
                &app.uploader(),
                opportunity_id,
                &resume,
                &note,
                today(),
            )?;
            println!(
                "Submitted application #{} for opportunity #{} (status: {})",
                application.id, application.opportunity_id, application.status
            );
        }

        Commands::Applications => {
            let session = app.me()?;
            if session.role == role::Role::User {
                let mine = views::student_referrals(&app.db, &session)?;
                app.emit(&mine, |mine| {
                    println!(
                        "Pending: {}  Approved: {}  Rejected: {}",
                        mine.counts.pending, mine.counts.approved, mine.counts.rejected
                    );
                    println!();
                    print_applications(&mine.applications);
                })?;
            } else {
                let queue = views::reviewer_referrals(&app.db, &session)?;
                app.emit(&queue, |queue| {
                    println!("Pending review ({})", queue.pending.len());
                    print_applications(&queue.pending);
                    println!();
                    println!("Reviewed ({})", queue.reviewed.len());
                    print_applications(&queue.reviewed);
                })?;
            }
        }

        Commands::Review {
            application_id,
            decision,
            notes,
        } => {
            let session = app.me()?;
            let reviewed = referral::review(
                &app.db,
                &session,
                application_id,
                decision.application(),
                notes.as_deref(),
            )?;
            println!(
                "Application #{} {}: {}",
                reviewed.id,
                reviewed.status,
                reviewed.reviewer_notes.unwrap_or_default()
            );
        }

        Commands::Community { command } => run_community(&app, command)?,

        Commands::Resource { command } => run_resource(&app, command)?,

        Commands::Dashboard => {
            let session = app.me()?;
            let dashboard = views::dashboard(&app.db, &session)?;
            app.emit(&dashboard, |d| print_dashboard(&session, d))?;
        }

        Commands::Connections => {
            let session = app.me()?;
            let connections = views::connections(&app.db, &session)?;
            app.emit(&connections, |c| {
                println!("Mentorships ({})", c.mentorships.len());
                for m in &c.mentorships {
                    println!(
                        "  #{:<5} {:<22} {:<18} {}",
                        m.request.id,
                        truncate(&m.counterpart, 20),
                        truncate(m.counterpart_company.as_deref().unwrap_or("-"), 16),
                        m.request.domain
                    );
                }
                println!();
                println!("Referral applications ({})", c.applications.len());
                print_applications(&c.applications);
            })?;
        }

        Commands::MentorStats { filter, search } => {
            let session = app.me()?;
            let activity: MentorActivity = filter.parse()?;
            let overview = views::mentor_overview(&app.db, &session, activity, search.as_deref())?;
            app.emit(&overview, |o| {
                println!(
                    "Mentors: {}  Active: {}  Pending requests: {}  Students: {}",
                    o.total_mentors, o.active_mentors, o.pending_requests, o.students
                );
                println!();
                println!("{:<6} {:<22} {:>6} {:>8} {:>7} {:>9}", "ID", "NAME", "TOTAL", "PENDING", "ACTIVE", "REJECTED");
                println!("{}", "-".repeat(62));
                for s in &o.mentors {
                    println!(
                        "{:<6} {:<22} {:>6} {:>8} {:>7} {:>9}",
                        s.mentor.id,
                        truncate(&s.mentor.full_name, 20),
                        s.total,
                        s.pending,
                        s.active,
                        s.rejected
                    );
                }
            })?;
        }

        Commands::Ask { question, model } => {
            let question = question.join(" ");
            if question.trim().is_empty() {
                println!("Try asking:");
                for (title, prompt) in ai::SUGGESTED_PROMPTS {
                    println!("  {:<16} {}", title, prompt);
                }
                return Ok(());
            }
            let user = app.me().ok().map(|s| s.user);
            let model_name = model.unwrap_or_else(|| app.config.model.clone());
            let spec = ai::resolve_model(&model_name)?;
            let provider = ai::create_provider(&spec)?;
            eprintln!("Asking {}...", spec.short_name);
            let answer = ai::ask(provider.as_ref(), user.as_ref(), &question)?;
            println!("{}", textwrap::fill(answer.trim(), 80));
        }

        Commands::Browse => {
            let session = app.me()?;
            tui::run_browse(&app.db, &session, today())?;
        }
    }

    Ok(())
}

fn run_user(app: &App, command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Add {
            name,
            email,
            profile: details,
            admin,
        } => {
            app.db.ensure_initialized()?;
            let actor = app.sessions.me(&app.db).ok();
            let new = models::NewUser {
                full_name: name,
                email,
                branch: details.branch,
                batch: details.batch,
                year: details.year,
                role: admin.then(|| "admin".to_string()),
                expertise_domains: details.expertise.as_deref().map(split_list).unwrap_or_default(),
                current_company: details.company,
                position: details.position,
                bio: details.bio,
                skills: details.skills.as_deref().map(split_list).unwrap_or_default(),
                linkedin_url: details.linkedin,
            };
            let user = profile::register(&app.db, actor.as_ref(), new)?;
            println!(
                "Registered #{} {} as {}",
                user.id,
                user.full_name,
                resolve_role(&user).display_name()
            );
        }

        UserCommands::List => {
            app.me()?;
            let users = app.db.list_users(Some("full_name"), None)?;
            app.emit(&users, |users| {
                println!("{:<6} {:<22} {:<28} {:<8} {:<10}", "ID", "NAME", "EMAIL", "ROLE", "YEAR");
                println!("{}", "-".repeat(78));
                for u in users {
                    println!(
                        "{:<6} {:<22} {:<28} {:<8} {:<10}",
                        u.id,
                        truncate(&u.full_name, 20),
                        truncate(&u.email, 26),
                        resolve_role(u).display_name(),
                        u.year.as_deref().unwrap_or("-")
                    );
                }
            })?;
        }

        UserCommands::Show { id } => {
            app.me()?;
            let user = db::must(app.db.get_user(id)?, "user", id)?;
            app.emit(&user, print_user)?;
        }

        UserCommands::Edit {
            id,
            name,
            profile: details,
            role,
        } => {
            let session = app.me()?;
            let update = UserUpdate {
                full_name: name,
                branch: details.branch,
                batch: details.batch,
                year: details.year,
                role,
                expertise_domains: details.expertise.as_deref().map(split_list),
                current_company: details.company,
                position: details.position,
                bio: details.bio,
                skills: details.skills.as_deref().map(split_list),
                linkedin_url: details.linkedin,
            };
            let target = id.unwrap_or(session.user_id());
            let user = profile::edit_profile(&app.db, &session, target, update)?;
            println!("Updated #{} {}", user.id, user.full_name);
        }

        UserCommands::Promote {
            id,
            expertise,
            company,
            position,
            bio,
            year,
            batch,
        } => {
            let session = app.me()?;
            let promotion = profile::Promotion {
                expertise_domains: split_list(&expertise),
                current_company: company,
                position,
                bio,
                year,
                batch,
            };
            let user = profile::promote_to_mentor(&app.db, &session, id, promotion)?;
            println!(
                "#{} {} is now a {}",
                user.id,
                user.full_name,
                resolve_role(&user).display_name()
            );
        }
    }
    Ok(())
}

fn run_mentorship(app: &App, command: MentorshipCommands) -> Result<()> {
    let session = app.me()?;
    match command {
        MentorshipCommands::Request {
            mentor_id,
            domain,
            message,
            goals,
        } => {
            let request = mentorship::request_mentorship(
                &app.db,
                &session,
                mentor_id,
                &domain,
                &message,
                goals.as_deref(),
            )?;
            println!("Sent mentorship request #{} ({})", request.id, request.status);
        }

        MentorshipCommands::Respond {
            request_id,
            decision,
        } => {
            let request = mentorship::respond(&app.db, &session, request_id, decision.mentorship())?;
            println!("Request #{} is now {}", request.id, request.status);
            if request.status == MentorshipStatus::Accepted {
                println!("Chat is open: campus chat show {}", request.id);
            }
        }

        MentorshipCommands::List { status, sent } => {
            let status = status
                .as_deref()
                .map(str::parse::<MentorshipStatus>)
                .transpose()?;
            let incoming = session.role == role::Role::Mentor && !sent;
            let requests = if incoming {
                mentorship::incoming(&app.db, &session, status)?
            } else {
                mentorship::outgoing(&app.db, &session, status)?
            };
            let users: std::collections::HashMap<i64, User> = app
                .db
                .list_users(None, None)?
                .into_iter()
                .map(|u| (u.id, u))
                .collect();
            app.emit(&requests, |requests| {
                if requests.is_empty() {
                    println!("No mentorship requests.");
                    return;
                }
                let who = if incoming { "STUDENT" } else { "MENTOR" };
                println!("{:<6} {:<10} {:<22} {:<20} {}", "ID", "STATUS", who, "DOMAIN", "MESSAGE");
                println!("{}", "-".repeat(90));
                for r in requests {
                    let other = r.counterpart_of(session.user_id()).and_then(|id| users.get(&id));
                    println!(
                        "{:<6} {:<10} {:<22} {:<20} {}",
                        r.id,
                        r.status,
                        truncate(&views::user_name(other), 20),
                        truncate(&r.domain, 18),
                        truncate(&r.message, 40)
                    );
                }
            })?;
        }
    }
    Ok(())
}

fn run_chat(app: &App, command: ChatCommands) -> Result<()> {
    let session = app.me()?;
    match command {
        ChatCommands::Show { request_id } => {
            let messages = chat::thread(&app.db, &session, request_id)?;
            let users: std::collections::HashMap<i64, User> = app
                .db
                .list_users(None, None)?
                .into_iter()
                .map(|u| (u.id, u))
                .collect();
            app.emit(&messages, |messages| {
                if messages.is_empty() {
                    println!("No messages yet.");
                }
                for m in messages {
                    let who = if m.sender_id == session.user_id() {
                        "You".to_string()
                    } else {
                        views::user_name(users.get(&m.sender_id))
                    };
                    println!("[{}] {}:", m.created_at, who);
                    if !m.content.is_empty() {
                        for line in textwrap::wrap(&m.content, 76) {
                            println!("    {}", line);
                        }
                    }
                    if let (Some(name), Some(url)) = (&m.file_name, &m.file_url) {
                        println!("    attachment: {} <{}>", name, url);
                    }
                }
            })?;
        }

        ChatCommands::Send {
            request_id,
            message,
            file,
        } => {
            let sent = chat::send_message(
                &app.db,
                &session,
                &app.uploader(),
                request_id,
                message.as_deref().unwrap_or(""),
                file.as_deref(),
            )?;
            println!("Sent message #{}", sent.id);
        }
    }
    Ok(())
}

fn run_opportunity(app: &App, command: OpportunityCommands) -> Result<()> {
    let session = app.me()?;
    match command {
        OpportunityCommands::Add {
            company,
            position,
            description,
            job_type,
            location,
            skills,
            salary,
            deadline,
            posted_by,
        } => {
            let opp = NewOpportunity {
                posted_by: posted_by.unwrap_or(session.user_id()),
                company_name: company,
                position,
                job_type: job_type.parse::<JobType>()?,
                location,
                required_skills: skills.as_deref().map(split_list).unwrap_or_default(),
                description,
                salary_range: salary,
                application_deadline: deadline,
                is_active: true,
            };
            let created = referral::post_opportunity(&app.db, &session, opp)?;
            println!(
                "Posted opportunity #{}: {} at {}",
                created.id, created.position, created.company_name
            );
        }

        OpportunityCommands::Edit {
            id,
            company,
            position,
            description,
            job_type,
            location,
            skills,
            salary,
            deadline,
            posted_by,
        } => {
            let update = OpportunityUpdate {
                posted_by,
                company_name: company,
                position,
                job_type: job_type.as_deref().map(str::parse::<JobType>).transpose()?,
                location,
                required_skills: skills.as_deref().map(split_list),
                description,
                salary_range: salary,
                application_deadline: deadline,
                is_active: None,
            };
            let updated = referral::edit_opportunity(&app.db, &session, id, update)?;
            println!("Updated opportunity #{}", updated.id);
        }

        OpportunityCommands::Toggle { id } => {
            let updated = referral::toggle_opportunity(&app.db, &session, id)?;
            println!(
                "Opportunity #{} is now {}",
                updated.id,
                if updated.is_active { "active" } else { "inactive" }
            );
        }

        OpportunityCommands::List { limit } => {
            let opportunities = referral::visible_opportunities(&app.db, &session, limit)?;
            let today = today();
            app.emit(&opportunities, |opps| {
                if opps.is_empty() {
                    println!("No opportunities found.");
                    return;
                }
                println!("{:<6} {:<24} {:<18} {:<11} {:<12} {}", "ID", "POSITION", "COMPANY", "TYPE", "DEADLINE", "STATE");
                println!("{}", "-".repeat(84));
                for o in opps {
                    let state = if !o.is_active {
                        "inactive"
                    } else if o.accepts_applications(today) {
                        "open"
                    } else {
                        "closed"
                    };
                    println!(
                        "{:<6} {:<24} {:<18} {:<11} {:<12} {}",
                        o.id,
                        truncate(&o.position, 22),
                        truncate(&o.company_name, 16),
                        o.job_type,
                        o.application_deadline.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                        state
                    );
                }
            })?;
        }

        OpportunityCommands::Show { id } => {
            let detail = referral::opportunity_detail(&app.db, &session, id)?;
            app.emit(&detail, |d| {
                let o = &d.opportunity;
                println!("#{} {} at {}", o.id, o.position, o.company_name);
                println!("{} | {}", o.job_type, o.location.as_deref().unwrap_or("Location not specified"));
                println!("Posted by {}", d.posted_by);
                if let Some(salary) = &o.salary_range {
                    println!("Salary: {}", salary);
                }
                if let Some(deadline) = o.application_deadline {
                    println!("Deadline: {}", deadline);
                }
                if !o.required_skills.is_empty() {
                    println!("Skills: {}", o.required_skills.join(", "));
                }
                println!("Active: {}", if o.is_active { "yes" } else { "no" });
                println!();
                println!("{}", textwrap::fill(&o.description, 80));
                if let Some(stats) = &d.stats {
                    println!();
                    println!(
                        "Applications: {} ({} pending, {} approved, {} rejected)",
                        stats.total, stats.pending, stats.approved, stats.rejected
                    );
                }
            })?;
        }
    }
    Ok(())
}

fn run_community(app: &App, command: CommunityCommands) -> Result<()> {
    let session = app.me()?;
    match command {
        CommunityCommands::Create {
            name,
            description,
            cover,
        } => {
            let created =
                community::create_community(&app.db, &session, &name, &description, cover.as_deref())?;
            println!("Created community #{} {}", created.id, created.name);
        }

        CommunityCommands::List => {
            let communities = community::list_communities(&app.db, &session)?;
            app.emit(&communities, |list| {
                if list.is_empty() {
                    println!("No communities yet.");
                    return;
                }
                for c in list {
                    println!(
                        "#{:<4} {} ({} members){}",
                        c.community.id,
                        c.community.name,
                        c.member_count,
                        if c.joined { " [joined]" } else { "" }
                    );
                    println!("      {}", truncate(&c.community.description, 70));
                }
            })?;
        }

        CommunityCommands::Join { id } => {
            let membership = community::join(&app.db, &session, id)?;
            println!("Member of community #{} since {}", membership.community_id, membership.created_at);
        }

        CommunityCommands::Show { id } => {
            let c = db::must(app.db.get_community(id)?, "community", id)?;
            let feed = community::feed(&app.db, &session, id)?;
            app.emit(&feed, |feed| {
                println!("{}", c.name);
                println!("{}", textwrap::fill(&c.description, 80));
                println!();
                if feed.is_empty() {
                    println!("No posts yet.");
                }
                for item in feed {
                    let p = &item.post;
                    println!("#{} [{}] {}", p.id, p.post_type, p.title);
                    println!("  by {} on {}", item.author_name, p.created_at);
                    for line in textwrap::wrap(&p.content, 76) {
                        println!("  {}", line);
                    }
                    if let Some(title) = &item.opportunity_title {
                        println!("  Opportunity: {}", title);
                    }
                    if !item.suggested_mentors.is_empty() {
                        let names: Vec<_> =
                            item.suggested_mentors.iter().map(|m| m.full_name.as_str()).collect();
                        println!("  Mentors who can help: {}", names.join(", "));
                    }
                    if !p.tags.is_empty() {
                        println!("  #{}", p.tags.join(" #"));
                    }
                    println!();
                }
            })?;
        }

        CommunityCommands::Post {
            id,
            title,
            content,
            post_type,
            opportunity,
            tags,
        } => {
            let post = NewPost {
                title,
                content,
                post_type: post_type.parse::<PostType>()?,
                opportunity_id: opportunity,
                tags: tags.as_deref().map(split_list).unwrap_or_default(),
            };
            let created = community::create_post(&app.db, &session, id, post)?;
            println!("Posted #{} to community #{}", created.id, created.community_id);
        }
    }
    Ok(())
}

fn run_resource(app: &App, command: ResourceCommands) -> Result<()> {
    let mut session = app.me()?;
    match command {
        ResourceCommands::Add {
            title,
            url,
            description,
            category,
            resource_type,
        } => {
            let res = NewResource {
                title,
                description,
                category: category.parse::<ResourceCategory>()?,
                resource_type: resource_type.parse::<ResourceType>()?,
                content_url: url,
            };
            let created = resources::add_resource(&app.db, &session, res)?;
            println!("Shared resource #{} {}", created.id, created.title);
        }

        ResourceCommands::List { category, search } => {
            let category = category
                .as_deref()
                .map(str::parse::<ResourceCategory>)
                .transpose()?;
            let board = resources::ResourceBoard::load(&app.db, category, search.as_deref())?;
            app.emit(&board.resources(), |list| {
                if list.is_empty() {
                    println!("No resources found.");
                    return;
                }
                for r in list.iter() {
                    let liked = if session.liked_resources.contains(&r.id) { "*" } else { " " };
                    println!(
                        "#{:<4} {} {} [{} | {}] {} likes",
                        r.id, liked, r.title, r.category, r.resource_type, r.likes_count
                    );
                    if let Some(d) = &r.description {
                        println!("       {}", truncate(d, 70));
                    }
                    println!("       {}", r.content_url);
                }
            })?;
        }

        ResourceCommands::Like { id } => {
            let outcome =
                resources::like_resource(&app.db, &mut session, id, |s| app.sessions.save(s))?;
            match outcome {
                resources::LikeOutcome::Liked { likes } => {
                    println!("Liked resource #{} ({} likes)", id, likes)
                }
                resources::LikeOutcome::AlreadyLiked { likes } => {
                    println!("Already liked resource #{} ({} likes)", id, likes)
                }
            }
        }
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("#{} {} <{}>", user.id, user.full_name, user.email);
    println!("Role: {}", resolve_role(user).display_name());
    let fields = [
        ("Branch", user.branch.as_deref()),
        ("Batch", user.batch.as_deref()),
        ("Year", user.year.as_deref()),
        ("Company", user.current_company.as_deref()),
        ("Position", user.position.as_deref()),
        ("LinkedIn", user.linkedin_url.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
    if !user.expertise_domains.is_empty() {
        println!("Expertise: {}", user.expertise_domains.join(", "));
    }
    if !user.skills.is_empty() {
        println!("Skills: {}", user.skills.join(", "));
    }
    if let Some(bio) = &user.bio {
        println!();
        println!("{}", textwrap::fill(bio, 80));
    }
}

fn print_applications(applications: &[views::ApplicationView]) {
    if applications.is_empty() {
        println!("  (none)");
        return;
    }
    for v in applications {
        let a = &v.application;
        println!(
            "  #{:<5} {:<9} {:<30} applicant: {}",
            a.id,
            a.status,
            truncate(&v.opportunity, 28),
            v.applicant
        );
        if let Some(notes) = &a.reviewer_notes {
            println!("         notes: {}", notes);
        }
    }
}

fn print_dashboard(session: &Session, dashboard: &Dashboard) {
    println!(
        "Welcome back, {} ({})",
        session.user.full_name,
        session.role.display_name()
    );
    println!();
    match dashboard {
        Dashboard::User(d) => {
            println!(
                "Mentorship requests: {}  Applications: {}",
                d.mentorship_requests, d.applications
            );
            println!();
            println!("Latest opportunities");
            for o in &d.latest_opportunities {
                println!("  #{:<5} {} at {}", o.id, o.position, o.company_name);
            }
            println!();
            println!("Recent activity");
            if d.recent_activity.is_empty() {
                println!("  (none)");
            }
            for a in &d.recent_activity {
                println!("  {} [{}] {}", a.created_at, a.status, a.description);
            }
        }
        Dashboard::Mentor(d) => {
            println!(
                "Pending requests: {}  Active mentees: {}  Total connections: {}",
                d.pending_requests.len(),
                d.active_mentees.len(),
                d.total_connections
            );
            println!();
            println!("Incoming requests");
            for m in &d.pending_requests {
                println!("  #{:<5} {} - {}", m.request.id, m.counterpart, m.request.domain);
            }
            println!();
            println!("Referral requests on your postings");
            print_applications(&d.referral_applications);
        }
        Dashboard::Admin(d) => {
            println!("Users: {}", d.total_users);
            println!("Communities: {}", d.communities);
            println!("Opportunities: {}", d.opportunities);
            println!("Active mentorships: {}", d.active_mentorships);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
