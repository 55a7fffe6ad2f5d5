use std::path::Path;

use crate::db::{must, Database};
use crate::error::{CampusError, CampusResult};
use crate::models::{ChatMessage, MentorshipRequest, MentorshipStatus};
use crate::session::Session;
use crate::upload::Uploader;

/// Loads a request and checks that `session` may use its thread.
fn open_thread(db: &Database, session: &Session, request_id: i64) -> CampusResult<MentorshipRequest> {
    let request = must(
        db.get_mentorship_request(request_id)?,
        "mentorship request",
        request_id,
    )?;
    if !request.involves(session.user_id()) {
        tracing::warn!(request_id, actor = session.user_id(), "blocked chat access by outsider");
        return Err(CampusError::unauthorized(
            "only the student and mentor of this mentorship can use its chat",
        ));
    }
    if request.status != MentorshipStatus::Accepted {
        return Err(CampusError::InvalidTransition {
            from: request.status.to_string(),
            to: "chat".to_string(),
        });
    }
    Ok(request)
}

/// Appends a message to the thread of an accepted mentorship. The receiver
/// is always the other party. An optional attachment goes through `uploader`.
pub fn send_message(
    db: &Database,
    session: &Session,
    uploader: &dyn Uploader,
    request_id: i64,
    content: &str,
    attachment: Option<&Path>,
) -> CampusResult<ChatMessage> {
    let request = open_thread(db, session, request_id)?;
    let content = content.trim();
    if content.is_empty() && attachment.is_none() {
        return Err(CampusError::validation("a message needs text or a file"));
    }
    let Some(receiver_id) = request.counterpart_of(session.user_id()) else {
        return Err(CampusError::unauthorized("you are not part of this mentorship"));
    };

    let uploaded = attachment.map(|path| uploader.upload(path)).transpose()?;
    let message = db.create_chat_message(
        request_id,
        session.user_id(),
        receiver_id,
        content,
        uploaded
            .as_ref()
            .map(|f| (f.file_url.as_str(), f.file_name.as_str())),
    )?;
    tracing::debug!(message_id = message.id, request_id, "chat message sent");
    Ok(message)
}

/// The full thread, oldest first.
pub fn thread(db: &Database, session: &Session, request_id: i64) -> CampusResult<Vec<ChatMessage>> {
    open_thread(db, session, request_id)?;
    db.list_chat_messages(request_id)
}
