//! Admission control and countdown feedback, driven end to end through the
//! dispatcher with a paused clock

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use throttle_bot::channels::{Category, ChatId, MessageHandle, Notifier, Update};
use throttle_bot::config::{FeedbackTexts, ThrottleConfig};
use throttle_bot::throttle::{FeedbackController, SessionRegistry};
use throttle_bot::{Dispatch, Dispatcher, Result, ThrottleRegistry};
use tokio::time::Instant;

mod common;
use common::{Call, CountingHandler, FIRST_SENT_ID, MockNotifier};

struct Bot {
    notifier: Arc<MockNotifier>,
    handler: Arc<CountingHandler>,
    registry: ThrottleRegistry,
    feedback: FeedbackController,
    dispatcher: Dispatcher,
}

fn bot(config: ThrottleConfig) -> Bot {
    let notifier = Arc::new(MockNotifier::new());
    let handler = Arc::new(CountingHandler::new());
    let registry = ThrottleRegistry::new(&config);

    let throttle = registry.middleware(notifier.clone(), &config, FeedbackTexts::default());
    let feedback = throttle.feedback().clone();
    let dispatcher = Dispatcher::new(handler.clone()).layer(Arc::new(throttle));

    Bot {
        notifier,
        handler,
        registry,
        feedback,
        dispatcher,
    }
}

fn message_limit(secs: u64) -> ThrottleConfig {
    ThrottleConfig {
        message_rate_limit: Duration::from_secs(secs),
        ..ThrottleConfig::default()
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn second_message_within_a_second_gets_a_countdown() {
    let bot = bot(ThrottleConfig::default());
    let start = Instant::now();

    let first = bot.dispatcher.dispatch(Update::message(42, 1, "hi")).await.unwrap();
    assert_eq!(first, Dispatch::Handled);

    sleep_ms(200).await;
    let second = bot.dispatcher.dispatch(Update::message(42, 2, "hi again")).await.unwrap();
    assert_eq!(second, Dispatch::Suppressed);
    assert_eq!(bot.handler.count(), 1);

    let notice = MessageHandle::new(42, FIRST_SENT_ID);
    assert_eq!(
        bot.notifier.calls(),
        vec![
            Call::Delete {
                handle: MessageHandle::new(42, 2)
            },
            Call::Send {
                handle: notice,
                text: FeedbackTexts::default().wait_text(Duration::from_millis(800)),
            },
        ]
    );
    assert!(bot.registry.sessions.contains(42, Category::Message));

    sleep_ms(2000).await;

    let calls = bot.notifier.timed_calls();
    assert_eq!(calls.len(), 4);
    let (deleted_at, deleted) = &calls[2];
    assert_eq!(*deleted, Call::Delete { handle: notice });
    let elapsed = deleted_at.duration_since(start);
    assert!(elapsed >= Duration::from_secs(1), "finished early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1100), "finished late: {elapsed:?}");
    assert_eq!(
        calls[3].1,
        Call::Send {
            handle: MessageHandle::new(42, FIRST_SENT_ID + 1),
            text: FeedbackTexts::default().proceed,
        }
    );

    // Cooldown below the finish threshold: no countdown edits at all
    assert_eq!(bot.notifier.edit_count(), 0);
    assert!(bot.registry.sessions.is_empty());

    let third = bot.dispatcher.dispatch(Update::message(42, 3, "back")).await.unwrap();
    assert_eq!(third, Dispatch::Handled);
    assert_eq!(bot.handler.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn rapid_button_presses_get_alerts_without_a_session() {
    let bot = bot(ThrottleConfig::default());

    let press = |n: u32| Update::button(7, &format!("q{n}"), "noop");

    assert_eq!(bot.dispatcher.dispatch(press(1)).await.unwrap(), Dispatch::Handled);

    sleep_ms(100).await;
    assert_eq!(bot.dispatcher.dispatch(press(2)).await.unwrap(), Dispatch::Suppressed);

    sleep_ms(100).await;
    assert_eq!(bot.dispatcher.dispatch(press(3)).await.unwrap(), Dispatch::Suppressed);

    let acks = bot.notifier.acks();
    assert_eq!(acks.len(), 2);
    assert!(acks[0].0.contains("0.3"), "unexpected alert: {}", acks[0].0);
    assert!(acks[1].0.contains("0.2"), "unexpected alert: {}", acks[1].0);
    assert!(acks.iter().all(|(_, alert)| *alert));

    assert!(bot.registry.sessions.is_empty());
    assert!(bot.notifier.sent_texts().is_empty());

    sleep_ms(300).await;
    assert_eq!(bot.dispatcher.dispatch(press(4)).await.unwrap(), Dispatch::Handled);
    assert_eq!(bot.handler.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn categories_are_throttled_independently() {
    let bot = bot(ThrottleConfig::default());

    bot.dispatcher.dispatch(Update::message(5, 1, "hi")).await.unwrap();
    let press = bot.dispatcher.dispatch(Update::button(5, "q", "noop")).await.unwrap();
    let other = bot.dispatcher.dispatch(Update::message(6, 1, "hi")).await.unwrap();

    assert_eq!(press, Dispatch::Handled);
    assert_eq!(other, Dispatch::Handled);
    assert_eq!(bot.handler.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn repeated_rejections_share_one_session() {
    let bot = bot(message_limit(10));

    bot.dispatcher.dispatch(Update::message(42, 1, "hi")).await.unwrap();
    for id in 2..6 {
        sleep_ms(100).await;
        let outcome = bot.dispatcher.dispatch(Update::message(42, id, "spam")).await.unwrap();
        assert_eq!(outcome, Dispatch::Suppressed);
    }

    assert_eq!(bot.handler.count(), 1);
    assert_eq!(bot.registry.sessions.len(), 1);
    assert_eq!(bot.notifier.sent_texts().len(), 1);

    // Every rejected message is removed from the chat
    let deleted: Vec<i64> = bot.notifier.deleted().iter().map(|h| h.message_id).collect();
    assert_eq!(deleted, vec![2, 3, 4, 5]);

    bot.feedback.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn long_cooldown_is_counted_down_by_edits() {
    let bot = bot(message_limit(10));

    bot.dispatcher.dispatch(Update::message(42, 1, "hi")).await.unwrap();
    sleep_ms(200).await;
    bot.dispatcher.dispatch(Update::message(42, 2, "again")).await.unwrap();

    let texts = FeedbackTexts::default();
    assert_eq!(bot.notifier.sent_texts(), vec![texts.wait_text(Duration::from_secs(10))]);

    // First tick after the 5s ceiling shows ~5s left
    sleep_ms(5100).await;
    let edits: Vec<String> = bot
        .notifier
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Edit { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(edits, vec![texts.wait_text(Duration::from_millis(4800))]);
    assert!(bot.registry.sessions.contains(42, Category::Message));

    sleep_ms(5000).await;
    assert!(bot.registry.sessions.is_empty());
    assert_eq!(bot.notifier.edit_count(), 1);
    assert_eq!(bot.notifier.sent_texts().last(), Some(&texts.proceed));

    // Nothing happens once the session is finished
    let settled = bot.notifier.calls().len();
    sleep_ms(30_000).await;
    assert_eq!(bot.notifier.calls().len(), settled);
}

#[tokio::test(start_paused = true)]
async fn vanished_notice_finishes_the_session_early() {
    let bot = bot(message_limit(10));
    bot.notifier.edits_gone();

    bot.dispatcher.dispatch(Update::message(42, 1, "hi")).await.unwrap();
    sleep_ms(200).await;
    bot.dispatcher.dispatch(Update::message(42, 2, "again")).await.unwrap();

    sleep_ms(5500).await;
    assert!(bot.registry.sessions.is_empty());
    assert_eq!(
        bot.notifier.sent_texts().last(),
        Some(&FeedbackTexts::default().proceed)
    );
    assert_eq!(bot.notifier.edit_count(), 0);

    // The actor is still in cooldown: the next message opens a fresh session
    bot.dispatcher.dispatch(Update::message(42, 3, "still")).await.unwrap();
    assert!(bot.registry.sessions.contains(42, Category::Message));

    bot.feedback.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transient_edit_failures_keep_the_countdown_running() {
    let bot = bot(message_limit(20));
    bot.notifier.edits_fail();

    bot.dispatcher.dispatch(Update::message(42, 1, "hi")).await.unwrap();
    sleep_ms(200).await;
    bot.dispatcher.dispatch(Update::message(42, 2, "again")).await.unwrap();

    sleep_ms(16_000).await;
    assert_eq!(bot.notifier.edit_count(), 3);
    assert!(bot.registry.sessions.contains(42, Category::Message));

    sleep_ms(5000).await;
    assert!(bot.registry.sessions.is_empty());
    assert_eq!(bot.notifier.edit_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn panicking_updater_still_finishes_once() {
    let bot = bot(message_limit(10));
    bot.notifier.edits_panic();

    bot.dispatcher.dispatch(Update::message(42, 1, "hi")).await.unwrap();
    sleep_ms(200).await;
    bot.dispatcher.dispatch(Update::message(42, 2, "again")).await.unwrap();
    assert!(bot.registry.sessions.contains(42, Category::Message));

    // The first edit at ~5.2s panics inside the updater task
    sleep_ms(6000).await;
    assert!(!bot.registry.sessions.contains(42, Category::Message));

    let proceed = FeedbackTexts::default().proceed;
    let sent = bot.notifier.sent_texts();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent.iter().filter(|text| **text == proceed).count(), 1);
    assert!(
        bot.notifier
            .deleted()
            .contains(&MessageHandle::new(42, FIRST_SENT_ID))
    );

    sleep_ms(20_000).await;
    assert_eq!(bot.notifier.sent_texts().len(), 2);

    // The dispatcher keeps working after the panic
    let next = bot.dispatcher.dispatch(Update::message(42, 3, "later")).await.unwrap();
    assert_eq!(next, Dispatch::Handled);
}

#[tokio::test(start_paused = true)]
async fn failed_notice_closes_the_session() {
    let bot = bot(message_limit(10));
    bot.notifier.fail_sends();

    bot.dispatcher.dispatch(Update::message(42, 1, "hi")).await.unwrap();
    sleep_ms(100).await;
    let outcome = bot.dispatcher.dispatch(Update::message(42, 2, "again")).await.unwrap();

    assert_eq!(outcome, Dispatch::Suppressed);
    assert!(bot.registry.sessions.is_empty());
    assert_eq!(bot.notifier.deleted(), vec![MessageHandle::new(42, 2)]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_countdowns_without_proceed_notice() {
    let bot = bot(message_limit(10));

    for actor in [1, 2, 3] {
        bot.dispatcher.dispatch(Update::message(actor, 1, "hi")).await.unwrap();
        bot.dispatcher.dispatch(Update::message(actor, 2, "again")).await.unwrap();
    }
    assert_eq!(bot.registry.sessions.len(), 3);

    bot.feedback.shutdown().await;
    assert!(bot.registry.sessions.is_empty());

    let notices: Vec<MessageHandle> = bot
        .notifier
        .deleted()
        .into_iter()
        .filter(|handle| handle.message_id >= FIRST_SENT_ID)
        .collect();
    assert_eq!(notices.len(), 3);

    let settled = bot.notifier.calls().len();
    sleep_ms(20_000).await;
    assert_eq!(bot.notifier.calls().len(), settled);
    assert!(
        !bot.notifier
            .sent_texts()
            .contains(&FeedbackTexts::default().proceed)
    );
}

/// Records whether the session was still registered when each message went out
struct Probe {
    sessions: Arc<SessionRegistry>,
    open_during_send: Mutex<Vec<bool>>,
}

#[async_trait]
impl Notifier for Probe {
    async fn send(&self, chat_id: ChatId, _text: &str) -> Result<MessageHandle> {
        let open = self.sessions.contains(chat_id, Category::Message);
        let mut seen = self.open_during_send.lock().unwrap();
        seen.push(open);
        Ok(MessageHandle::new(chat_id, 500 + seen.len() as i64))
    }

    async fn edit(&self, _handle: &MessageHandle, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _handle: &MessageHandle) -> Result<()> {
        Ok(())
    }

    async fn ack(&self, _query_id: &str, _text: &str, _alert: bool) -> Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn session_is_gone_before_proceed_notice_is_sent() {
    let sessions = Arc::new(SessionRegistry::new());
    let probe = Arc::new(Probe {
        sessions: Arc::clone(&sessions),
        open_during_send: Mutex::new(Vec::new()),
    });
    let config = ThrottleConfig::default();
    let feedback =
        FeedbackController::new(probe.clone(), Arc::clone(&sessions), &config, FeedbackTexts::default());

    let ticket = sessions
        .try_open(9, Category::Message, Instant::now())
        .unwrap();
    assert!(sessions.attach_notification(&ticket, MessageHandle::new(9, 77)));

    assert!(feedback.finish(&ticket).await);
    assert!(!feedback.finish(&ticket).await);

    // Exactly one proceed notice, sent after the session was closed
    assert_eq!(*probe.open_during_send.lock().unwrap(), vec![false]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rejections_open_a_single_session() {
    let bot = bot(message_limit(60));
    bot.dispatcher.dispatch(Update::message(42, 1, "hi")).await.unwrap();

    let tasks: Vec<_> = (2..34)
        .map(|id| {
            let dispatcher = bot.dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(Update::message(42, id, "spam")).await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), Dispatch::Suppressed);
    }

    assert_eq!(bot.handler.count(), 1);
    assert_eq!(bot.registry.sessions.len(), 1);
    assert_eq!(bot.notifier.sent_texts().len(), 1);

    bot.feedback.shutdown().await;
    assert!(bot.registry.sessions.is_empty());
}
