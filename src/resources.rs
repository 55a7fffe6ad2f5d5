use std::collections::BTreeSet;

use crate::db::{must, Database};
use crate::error::{require, CampusError, CampusResult};
use crate::models::{CareerResource, NewResource, ResourceCategory};
use crate::profile::validate_url;
use crate::session::Session;

/// Shares a resource. Everything shared is approved right away.
pub fn add_resource(db: &Database, session: &Session, res: NewResource) -> CampusResult<CareerResource> {
    require(&res.title, "title")?;
    require(&res.content_url, "content URL")?;
    validate_url(&res.content_url, "content URL")?;
    let created = db.create_resource(session.user_id(), &res)?;
    tracing::info!(resource_id = created.id, category = %created.category, "resource shared");
    Ok(created)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked { likes: i64 },
    AlreadyLiked { likes: i64 },
}

/// Local projection of the approved resources with optimistic likes.
#[derive(Debug, Default)]
pub struct ResourceBoard {
    resources: Vec<CareerResource>,
}

impl ResourceBoard {
    /// Approved resources, newest first, optionally narrowed by category and
    /// a case-insensitive search over title and description.
    pub fn load(
        db: &Database,
        category: Option<ResourceCategory>,
        search: Option<&str>,
    ) -> CampusResult<Self> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let resources = db
            .list_resources(true, Some("-created_date"))?
            .into_iter()
            .filter(|r| category.is_none_or(|c| r.category == c))
            .filter(|r| {
                needle.as_deref().is_none_or(|n| {
                    r.title.to_lowercase().contains(n)
                        || r
                            .description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(n))
                })
            })
            .collect();
        Ok(Self { resources })
    }

    pub fn resources(&self) -> &[CareerResource] {
        &self.resources
    }

    /// Bumps the like count locally, then persists it. If persisting fails
    /// the count and the liked set are restored and the error is returned.
    /// A resource already in `liked` is left alone.
    pub fn like<F>(&mut self, liked: &mut BTreeSet<i64>, id: i64, persist: F) -> CampusResult<LikeOutcome>
    where
        F: FnOnce(i64, i64) -> CampusResult<()>,
    {
        let resource = self
            .resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(CampusError::NotFound {
                entity: "resource",
                id,
            })?;
        if liked.contains(&id) {
            return Ok(LikeOutcome::AlreadyLiked {
                likes: resource.likes_count,
            });
        }

        let previous = resource.likes_count;
        resource.likes_count += 1;
        liked.insert(id);

        match persist(id, resource.likes_count) {
            Ok(()) => Ok(LikeOutcome::Liked {
                likes: resource.likes_count,
            }),
            Err(e) => {
                resource.likes_count = previous;
                liked.remove(&id);
                tracing::warn!(resource_id = id, error = %e, "like failed, rolled back");
                Err(e)
            }
        }
    }
}

/// Likes a resource for the signed-in session. `save_session` records the
/// liked set before the new count is written, so a failed save leaves the
/// count alone. If the count write fails, the previous session is saved back.
pub fn like_resource<S>(
    db: &Database,
    session: &mut Session,
    id: i64,
    save_session: S,
) -> CampusResult<LikeOutcome>
where
    S: Fn(&Session) -> CampusResult<()>,
{
    let resource = must(db.get_resource(id)?, "resource", id)?;
    if !resource.is_approved {
        return Err(CampusError::NotFound {
            entity: "resource",
            id,
        });
    }
    let mut board = ResourceBoard {
        resources: vec![resource],
    };
    let mut liked = session.liked_resources.clone();
    let current: &Session = session;
    let outcome = board.like(&mut liked, id, |id, count| {
        let mut pending = current.clone();
        pending.liked_resources.insert(id);
        save_session(&pending)?;
        if let Err(e) = db.set_resource_likes(id, count) {
            if let Err(restore) = save_session(current) {
                tracing::warn!(resource_id = id, error = %restore, "could not restore session");
            }
            return Err(e);
        }
        Ok(())
    })?;
    session.liked_resources = liked;
    Ok(outcome)
}
