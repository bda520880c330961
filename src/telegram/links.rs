//! Parsing and building of `t.me` links and channel references.

use std::sync::LazyLock;

use regex::Regex;

use super::messenger::{ChannelRef, ChatId, JoinTarget, MessageId, PeerKind};

#[allow(clippy::expect_used)]
static INVITE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?t\.me/(joinchat/|\+)?([A-Za-z0-9_-]+)")
        .expect("invite link pattern is valid")
});

#[allow(clippy::expect_used)]
static MESSAGE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://t\.me/(c/)?([^/\s]+)/(\d+)").expect("message link pattern is valid")
});

/// An invite link found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLink {
    /// The username or invite hash after `t.me/`.
    pub token: String,
    /// Whether the link was a private `joinchat/` or `+` invite.
    pub private: bool,
}

impl InviteLink {
    /// What to ask Telegram to join for this link.
    #[must_use]
    pub fn target(&self) -> JoinTarget {
        if self.private {
            JoinTarget::InviteHash(self.token.clone())
        } else {
            JoinTarget::Username(self.token.clone())
        }
    }
}

/// Extracts every distinct invite link from `text`, in order of appearance.
#[must_use]
pub fn extract_invite_links(text: &str) -> Vec<InviteLink> {
    let mut links: Vec<InviteLink> = Vec::new();

    for caps in INVITE_LINK.captures_iter(text) {
        let Some(token) = caps.get(2) else { continue };
        let link = InviteLink {
            token: token.as_str().to_owned(),
            private: caps.get(1).is_some(),
        };
        if !links.contains(&link) {
            links.push(link);
        }
    }

    links
}

/// Channel part of a message link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkChannel {
    /// `t.me/<username>/<id>`
    Public(String),
    /// `t.me/c/<bare id>/<id>`, a channel without a public username.
    Private(i64),
}

/// A parsed link to a single channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLink {
    pub channel: LinkChannel,
    pub message_id: MessageId,
}

impl MessageLink {
    /// The channel reference to resolve for this link.
    #[must_use]
    pub fn channel_ref(&self) -> ChannelRef {
        match &self.channel {
            LinkChannel::Public(name) => ChannelRef::Username(name.clone()),
            LinkChannel::Private(bare) => ChannelRef::Id(ChatId::channel(*bare)),
        }
    }
}

/// Parses `https://t.me/<name>/<id>` or `https://t.me/c/<id>/<id>`.
///
/// A purely numeric channel segment is treated as a private channel id even
/// without the `c/` marker.
#[must_use]
pub fn parse_message_link(link: &str) -> Option<MessageLink> {
    let caps = MESSAGE_LINK.captures(link.trim())?;
    let private_marker = caps.get(1).is_some();
    let channel = caps.get(2)?.as_str();
    let message_id: MessageId = caps.get(3)?.as_str().parse().ok()?;

    let channel = if channel.bytes().all(|b| b.is_ascii_digit()) {
        let bare = channel
            .parse()
            .ok()
            .filter(|&bare| ChatId::try_channel(bare).is_some())?;
        LinkChannel::Private(bare)
    } else if private_marker {
        return None;
    } else {
        LinkChannel::Public(channel.to_owned())
    };

    Some(MessageLink {
        channel,
        message_id,
    })
}

/// Interprets a user-typed channel reference.
///
/// Accepts `@username`, `username`, a marked `-100…` id, or the bare numeric
/// id used in `t.me/c/` links.
#[must_use]
pub fn parse_channel_ref(raw: &str) -> Option<ChannelRef> {
    let raw = raw.trim();

    if let Some(name) = raw.strip_prefix('@') {
        return is_username(name).then(|| ChannelRef::Username(name.to_owned()));
    }

    if let Ok(id) = raw.parse::<i64>() {
        return match id {
            // i64::MIN has no bare id to split off.
            id if id < 0 => id.checked_neg().map(|_| ChannelRef::Id(ChatId(id))),
            bare => ChatId::try_channel(bare).map(ChannelRef::Id),
        };
    }

    is_username(raw).then(|| ChannelRef::Username(raw.to_owned()))
}

fn is_username(name: &str) -> bool {
    !name.is_empty()
        && !name.bytes().all(|b| b.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Builds the public link of a channel post.
///
/// Channels without a username get a `t.me/c/` link built from the bare id,
/// which is the marked id minus its exact `-100` marker.
#[must_use]
pub fn build_message_link(chat: ChatId, username: Option<&str>, message_id: MessageId) -> String {
    if let Some(name) = username.filter(|n| !n.is_empty()) {
        return format!("https://t.me/{name}/{message_id}");
    }

    let (PeerKind::Channel(bare) | PeerKind::Group(bare) | PeerKind::User(bare)) = chat.kind();
    format!("https://t.me/c/{bare}/{message_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_public_and_private_links() {
        let links = extract_invite_links("join https://t.me/foo and t.me/joinchat/bar");
        let tokens: Vec<_> = links.iter().map(|l| l.token.as_str()).collect();
        assert_eq!(tokens, vec!["foo", "bar"]);
        assert!(!links[0].private);
        assert!(links[1].private);
        assert_eq!(links[0].target(), JoinTarget::Username("foo".into()));
        assert_eq!(links[1].target(), JoinTarget::InviteHash("bar".into()));
    }

    #[test]
    fn test_extract_handles_www_and_plus_links() {
        let links = extract_invite_links("http://www.t.me/some_group, https://t.me/+AbC-123");
        assert_eq!(
            links,
            vec![
                InviteLink { token: "some_group".into(), private: false },
                InviteLink { token: "AbC-123".into(), private: true },
            ]
        );
    }

    #[test]
    fn test_extract_deduplicates_in_order() {
        let links = extract_invite_links("t.me/a t.me/b https://t.me/a");
        let tokens: Vec<_> = links.iter().map(|l| l.token.as_str()).collect();
        assert_eq!(tokens, vec!["a", "b"]);
    }

    #[test]
    fn test_extract_without_links() {
        assert!(extract_invite_links("no links here, just telegram talk").is_empty());
    }

    #[test]
    fn test_parse_public_message_link() {
        let link = parse_message_link("https://t.me/globalcryptogang/2354").unwrap();
        assert_eq!(link.channel, LinkChannel::Public("globalcryptogang".into()));
        assert_eq!(link.message_id, 2354);
        assert_eq!(link.channel_ref(), ChannelRef::Username("globalcryptogang".into()));

        let http = parse_message_link("http://t.me/globalcryptogang/2354").unwrap();
        assert_eq!(http, link);
    }

    #[test]
    fn test_parse_private_message_link() {
        let link = parse_message_link("https://t.me/c/123456789/2354").unwrap();
        assert_eq!(link.channel, LinkChannel::Private(123_456_789));
        assert_eq!(link.message_id, 2354);
        assert_eq!(
            link.channel_ref(),
            ChannelRef::Id(ChatId(-1_000_123_456_789))
        );
    }

    #[test]
    fn test_parse_invalid_message_links() {
        assert!(parse_message_link("https://t.me/channel").is_none());
        assert!(parse_message_link("https://t.me/channel/abc").is_none());
        assert!(parse_message_link("t.me/channel/12").is_none());
        assert!(parse_message_link("https://example.com/channel/12").is_none());
        assert!(parse_message_link("https://t.me/c/name/12").is_none());
    }

    #[test]
    fn test_message_link_with_oversized_channel_id() {
        assert!(parse_message_link("https://t.me/c/9223372036854775807/1").is_none());
        assert!(parse_message_link("https://t.me/c/99999999999999999999/1").is_none());
        assert!(parse_message_link("https://t.me/c/0/1").is_none());
    }

    #[test]
    fn test_parse_channel_ref() {
        assert_eq!(parse_channel_ref("@news"), Some(ChannelRef::Username("news".into())));
        assert_eq!(parse_channel_ref("news_2"), Some(ChannelRef::Username("news_2".into())));
        assert_eq!(
            parse_channel_ref("-1001234567890"),
            Some(ChannelRef::Id(ChatId(-1_001_234_567_890)))
        );
        assert_eq!(
            parse_channel_ref("1234567890"),
            Some(ChannelRef::Id(ChatId::channel(1_234_567_890)))
        );
        assert_eq!(parse_channel_ref("@"), None);
        assert_eq!(parse_channel_ref("bad name!"), None);
        assert_eq!(parse_channel_ref("0"), None);
    }

    #[test]
    fn test_channel_ref_at_integer_limits() {
        assert_eq!(parse_channel_ref("9223372036854775807"), None);
        assert_eq!(parse_channel_ref("-9223372036854775808"), None);
        assert_eq!(parse_channel_ref("99999999999999999999"), None);

        let Some(ChannelRef::Id(chat)) = parse_channel_ref("-9223372036854775807") else {
            panic!("largest negative marked id should parse");
        };
        assert_eq!(chat.kind(), PeerKind::Channel(i64::MAX - 1_000_000_000_000));
    }

    #[test]
    fn test_build_public_link() {
        assert_eq!(
            build_message_link(ChatId::channel(5), Some("news"), 10),
            "https://t.me/news/10"
        );
    }

    #[test]
    fn test_build_private_link_strips_exact_prefix() {
        assert_eq!(
            build_message_link(ChatId(-1_001_234_567_890), None, 7),
            "https://t.me/c/1234567890/7"
        );
        // A character-set trim would also eat the "1001" that starts the bare id.
        assert_eq!(
            build_message_link(ChatId(-1_001_001_234_567), None, 7),
            "https://t.me/c/1001234567/7"
        );
    }
}
