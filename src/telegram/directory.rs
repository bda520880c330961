//! Discovery of the groups the bot may post into.

use tracing::{debug, error, warn};

use super::messenger::{ChatId, Messenger};

/// Lists joined groups and supergroups the account can still post to.
///
/// A group whose membership check fails is skipped with a warning; the rest
/// of the list is still returned. If the chat list itself cannot be fetched
/// the result is empty.
pub async fn list_postable_groups<M: Messenger + ?Sized>(messenger: &M) -> Vec<ChatId> {
    let dialogs = match messenger.dialogs().await {
        Ok(dialogs) => dialogs,
        Err(e) => {
            error!("Error getting dialogs: {}", e);
            return Vec::new();
        }
    };

    let mut groups = Vec::new();
    for dialog in dialogs.into_iter().filter(|d| d.kind.is_group()) {
        if !dialog.can_post {
            debug!("Skipping group {} ({}): posting not allowed", dialog.chat, dialog.title);
            continue;
        }

        match messenger.check_membership(dialog.chat).await {
            Ok(()) => groups.push(dialog.chat),
            Err(e) => warn!("Cannot access group {} ({}): {}", dialog.chat, dialog.title, e),
        }
    }

    debug!("Found {} postable groups", groups.len());
    groups
}
