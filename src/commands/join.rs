//! Sequential joining shared by the `join` command and auto-join.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::telegram::{ChatId, FloodControl, JoinTarget, Messenger};

/// Outcome of a join run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinReport {
    pub joined: usize,
    pub attempted: usize,
}

/// Joins `targets` one by one, pausing `delay` between two joins.
///
/// Every join goes through flood control. Each outcome is reported to
/// `reply_chat` as it happens; a shutdown during a pause ends the run.
pub async fn join_sequentially<M: Messenger + ?Sized>(
    messenger: &M,
    flood: &FloodControl,
    delay: Duration,
    targets: &[JoinTarget],
    reply_chat: ChatId,
) -> JoinReport {
    let mut report = JoinReport {
        joined: 0,
        attempted: 0,
    };

    for (i, target) in targets.iter().enumerate() {
        if i > 0 && !flood.pause(delay).await {
            warn!("Shutdown requested, {} joins skipped", targets.len() - i);
            break;
        }

        report.attempted += 1;
        let reply = match flood.call(|| messenger.join(target)).await {
            Ok(()) => {
                info!("Joined {}", target.label());
                report.joined += 1;
                format!("Joined {}", target.label())
            }
            Err(e) => {
                error!("Error joining {}: {}", target.label(), e);
                format!("Error joining {}: {}", target.label(), e)
            }
        };

        if let Err(e) = messenger.send_text(reply_chat, &reply).await {
            warn!("Failed to report join result: {}", e);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::telegram::mock::{Call, Failure, MockMessenger};

    fn targets(names: &[&str]) -> Vec<JoinTarget> {
        names
            .iter()
            .map(|n| JoinTarget::Username((*n).to_owned()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_joins_in_order_with_delay_between() {
        let mock = MockMessenger::new();
        let flood = FloodControl::new(CancellationToken::new());
        let chat = ChatId::user(9);
        let started = Instant::now();

        let report = join_sequentially(
            &mock,
            &flood,
            Duration::from_secs(30),
            &targets(&["a", "b", "c"]),
            chat,
        )
        .await;

        assert_eq!(report, JoinReport { joined: 3, attempted: 3 });
        // Two pauses, none after the last join.
        assert_eq!(started.elapsed(), Duration::from_secs(60));

        let joins: Vec<_> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Join(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(joins, targets(&["a", "b", "c"]));
        assert_eq!(mock.texts_to(chat), vec!["Joined @a", "Joined @b", "Joined @c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_reported_per_target() {
        let mock = MockMessenger::new().fail_join("b", &[Failure::NotFound]);
        let flood = FloodControl::new(CancellationToken::new());
        let chat = ChatId::user(9);

        let report =
            join_sequentially(&mock, &flood, Duration::from_secs(1), &targets(&["a", "b"]), chat)
                .await;

        assert_eq!(report, JoinReport { joined: 1, attempted: 2 });
        let texts = mock.texts_to(chat);
        assert_eq!(texts[0], "Joined @a");
        assert!(texts[1].starts_with("Error joining @b: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_wait_is_retried_once() {
        let mock = MockMessenger::new().fail_join("a", &[Failure::Flood(5)]);
        let flood = FloodControl::new(CancellationToken::new());

        let report =
            join_sequentially(&mock, &flood, Duration::ZERO, &targets(&["a"]), ChatId::user(9))
                .await;

        assert_eq!(report, JoinReport { joined: 1, attempted: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_between_joins() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let mock = MockMessenger::new();
        let flood = FloodControl::new(shutdown);

        let report = join_sequentially(
            &mock,
            &flood,
            Duration::from_secs(30),
            &targets(&["a", "b"]),
            ChatId::user(9),
        )
        .await;

        assert_eq!(report, JoinReport { joined: 1, attempted: 1 });
    }
}
