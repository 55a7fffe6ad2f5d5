use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::db::{must, Database, MemberFilter, OpportunityFilter};
use crate::error::{require, CampusError, CampusResult};
use crate::models::{
    Community, CommunityMember, CommunityPost, NewPost, ReferralOpportunity, User,
};
use crate::profile::validate_url;
use crate::role::{is_mentor_candidate, Role};
use crate::session::Session;
use crate::views::{opportunity_title, user_name};

const MAX_SUGGESTED_MENTORS: usize = 5;

pub fn create_community(
    db: &Database,
    session: &Session,
    name: &str,
    description: &str,
    cover_image_url: Option<&str>,
) -> CampusResult<Community> {
    if session.role != Role::Admin {
        return Err(CampusError::unauthorized("only admins can create communities"));
    }
    require(name, "name")?;
    require(description, "description")?;
    let cover = cover_image_url.map(str::trim).filter(|u| !u.is_empty());
    if let Some(url) = cover {
        validate_url(url, "cover image URL")?;
    }
    let community = db.create_community(name, description, cover)?;
    tracing::info!(community_id = community.id, name = %community.name, "community created");
    Ok(community)
}

/// Joining is idempotent: a second join returns the existing membership.
pub fn join(db: &Database, session: &Session, community_id: i64) -> CampusResult<CommunityMember> {
    must(db.get_community(community_id)?, "community", community_id)?;
    db.add_member(community_id, session.user_id())
}

pub fn is_member(db: &Database, community_id: i64, user_id: i64) -> CampusResult<bool> {
    let rows = db.list_members(&MemberFilter {
        community_id: Some(community_id),
        user_id: Some(user_id),
    })?;
    Ok(!rows.is_empty())
}

/// Admins and members of the community may post. Posts are never edited.
pub fn create_post(
    db: &Database,
    session: &Session,
    community_id: i64,
    post: NewPost,
) -> CampusResult<CommunityPost> {
    must(db.get_community(community_id)?, "community", community_id)?;
    if session.role != Role::Admin && !is_member(db, community_id, session.user_id())? {
        return Err(CampusError::unauthorized("join the community before posting"));
    }
    require(&post.title, "title")?;
    require(&post.content, "content")?;
    if let Some(opportunity_id) = post.opportunity_id {
        must(db.get_opportunity(opportunity_id)?, "opportunity", opportunity_id)?;
    }
    let created = db.create_post(community_id, session.user_id(), &post)?;
    tracing::info!(post_id = created.id, community_id, post_type = %created.post_type, "post created");
    Ok(created)
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunitySummary {
    pub community: Community,
    pub member_count: usize,
    pub joined: bool,
}

pub fn list_communities(db: &Database, session: &Session) -> CampusResult<Vec<CommunitySummary>> {
    let members = db.list_members(&MemberFilter::default())?;
    let mut counts: HashMap<i64, usize> = HashMap::new();
    let mut joined = HashSet::new();
    for m in &members {
        *counts.entry(m.community_id).or_default() += 1;
        if m.user_id == session.user_id() {
            joined.insert(m.community_id);
        }
    }
    Ok(db
        .list_communities(Some("-created_date"))?
        .into_iter()
        .map(|community| CommunitySummary {
            member_count: counts.get(&community.id).copied().unwrap_or(0),
            joined: joined.contains(&community.id),
            community,
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub post: CommunityPost,
    pub author_name: String,
    /// Set when the post links an opportunity; a placeholder if it is gone.
    pub opportunity_title: Option<String>,
    pub suggested_mentors: Vec<User>,
}

/// Posts of one community, newest first, joined with their authors and
/// linked opportunities.
pub fn feed(db: &Database, session: &Session, community_id: i64) -> CampusResult<Vec<FeedItem>> {
    must(db.get_community(community_id)?, "community", community_id)?;
    let posts = db.list_posts(community_id, Some("-created_date"))?;
    let users: HashMap<i64, User> = db
        .list_users(None, None)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let opportunity_ids: Vec<i64> = posts.iter().filter_map(|p| p.opportunity_id).collect();
    let opportunities: HashMap<i64, ReferralOpportunity> = if opportunity_ids.is_empty() {
        HashMap::new()
    } else {
        db.list_opportunities(
            &OpportunityFilter {
                ids: Some(opportunity_ids),
                ..Default::default()
            },
            None,
            None,
        )?
        .into_iter()
        .map(|o| (o.id, o))
        .collect()
    };
    let mentors: Vec<User> = users
        .values()
        .filter(|u| u.id != session.user_id() && is_mentor_candidate(u))
        .cloned()
        .collect();

    Ok(posts
        .into_iter()
        .map(|post| {
            let opportunity = post.opportunity_id.and_then(|id| opportunities.get(&id));
            FeedItem {
                author_name: user_name(users.get(&post.author_id)),
                opportunity_title: post.opportunity_id.map(|_| opportunity_title(opportunity)),
                suggested_mentors: opportunity
                    .map(|o| suggest_mentors(&mentors, o))
                    .unwrap_or_default(),
                post,
            }
        })
        .collect())
}

/// Mentors who work at the hiring company, or whose expertise shows up in
/// one of the required skills.
pub fn suggest_mentors(mentors: &[User], opportunity: &ReferralOpportunity) -> Vec<User> {
    let skills: Vec<String> = opportunity
        .required_skills
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    let mut matched: Vec<User> = mentors
        .iter()
        .filter(|m| {
            m.current_company.as_deref() == Some(opportunity.company_name.as_str())
                || m.expertise_domains.iter().any(|domain| {
                    let domain = domain.to_lowercase();
                    skills.iter().any(|skill| skill.contains(&domain))
                })
        })
        .cloned()
        .collect();
    matched.sort_by_key(|m| m.id);
    matched.truncate(MAX_SUGGESTED_MENTORS);
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{opportunity, user};
    use crate::models::{PostType, UserUpdate};
    use crate::referral::tests::admin_session;

    fn post(title: &str, opportunity_id: Option<i64>) -> NewPost {
        NewPost {
            title: title.into(),
            content: "Details inside".into(),
            post_type: if opportunity_id.is_some() {
                PostType::Opportunity
            } else {
                PostType::General
            },
            opportunity_id,
            tags: vec!["jobs".into()],
        }
    }

    #[test]
    fn test_only_admins_create_communities() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));

        let denied = create_community(&db, &student, "Backend", "Servers", None);
        assert!(matches!(denied, Err(CampusError::Unauthorized(_))));
        let blank = create_community(&db, &admin, "Backend", " ", None);
        assert!(matches!(blank, Err(CampusError::Validation(_))));
        let bad_cover = create_community(&db, &admin, "Backend", "Servers", Some("cover.png"));
        assert!(matches!(bad_cover, Err(CampusError::Validation(_))));

        let created = create_community(&db, &admin, "Backend", "Servers", Some("")).unwrap();
        assert_eq!(created.cover_image_url, None);
    }

    #[test]
    fn test_join_twice_is_a_no_op() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let c = create_community(&db, &admin, "Backend", "Servers", None).unwrap();

        let first = join(&db, &student, c.id).unwrap();
        let second = join(&db, &student, c.id).unwrap();
        assert_eq!(first.id, second.id);

        let summaries = list_communities(&db, &student).unwrap();
        assert_eq!(summaries[0].member_count, 1);
        assert!(summaries[0].joined);
        assert!(!list_communities(&db, &admin).unwrap()[0].joined);
        assert!(matches!(join(&db, &student, 42), Err(CampusError::NotFound { .. })));
    }

    #[test]
    fn test_posting_requires_membership() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let student = Session::new(user(&db, "Student", None));
        let c = create_community(&db, &admin, "Backend", "Servers", None).unwrap();

        let outsider = create_post(&db, &student, c.id, post("Hello", None));
        assert!(matches!(outsider, Err(CampusError::Unauthorized(_))));

        join(&db, &student, c.id).unwrap();
        let mut untitled = post("", None);
        untitled.title = "  ".into();
        assert!(matches!(
            create_post(&db, &student, c.id, untitled),
            Err(CampusError::Validation(_))
        ));
        create_post(&db, &student, c.id, post("Hello", None)).unwrap();
        create_post(&db, &admin, c.id, post("Welcome", None)).unwrap();

        let items = feed(&db, &student, c.id).unwrap();
        let titles: Vec<_> = items.iter().map(|i| i.post.title.as_str()).collect();
        assert_eq!(titles, vec!["Welcome", "Hello"]);
        assert_eq!(items[0].author_name, "Admin");
        assert_eq!(items[0].opportunity_title, None);
    }

    #[test]
    fn test_feed_tolerates_missing_opportunity() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let c = create_community(&db, &admin, "Jobs", "Openings", None).unwrap();
        db.create_post(c.id, admin.user_id(), &post("Old opening", Some(999)))
            .unwrap();

        let items = feed(&db, &admin, c.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].opportunity_title.as_deref(),
            Some("Opportunity unavailable")
        );
        assert!(items[0].suggested_mentors.is_empty());
        assert_eq!(items[0].author_name, "Admin");
    }

    #[test]
    fn test_feed_suggests_mentors_for_opportunity_posts() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let c = create_community(&db, &admin, "Jobs", "Openings", None).unwrap();
        let opp = opportunity(&db, admin.user_id(), "Acme");

        let insider = user(&db, "Insider", Some("Alumni"));
        db.update_user(
            insider.id,
            &UserUpdate {
                current_company: Some("Acme".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let sql_expert = user(&db, "Sql Expert", None);
        db.update_user(
            sql_expert.id,
            &UserUpdate {
                expertise_domains: Some(vec!["sql".into()]),
                ..Default::default()
            },
        )
        .unwrap();
        let unrelated = user(&db, "Designer", None);
        db.update_user(
            unrelated.id,
            &UserUpdate {
                expertise_domains: Some(vec!["Figma".into()]),
                ..Default::default()
            },
        )
        .unwrap();

        create_post(&db, &admin, c.id, post("Acme is hiring", Some(opp.id))).unwrap();
        let viewer = Session::new(db.get_user(insider.id).unwrap().unwrap());
        let items = feed(&db, &viewer, c.id).unwrap();
        let names: Vec<_> = items[0]
            .suggested_mentors
            .iter()
            .map(|m| m.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["Sql Expert"]);
        assert_eq!(items[0].opportunity_title.as_deref(), Some("SWE Intern at Acme"));
    }

    #[test]
    fn test_suggestions_capped_at_five() {
        let db = Database::open_in_memory().unwrap();
        let admin = admin_session(&db);
        let opp = opportunity(&db, admin.user_id(), "Acme");
        let mut mentors = Vec::new();
        for i in 0..7 {
            let mut m = user(&db, &format!("Mentor {}", i), Some("Alumni"));
            m.current_company = Some("Acme".into());
            mentors.push(m);
        }
        assert_eq!(suggest_mentors(&mentors, &opp).len(), 5);
    }
}
