//! End-to-end tests: channel → bot loop → hand pipeline → reply.
//!
//! A scripted channel feeds messages into the real `Bot`, and a counting
//! stub stands in for the advice backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use tokio::time::timeout;

use pokerbot::advice::AdviceProvider;
use pokerbot::bot::Bot;
use pokerbot::channels::{Channel, ChannelManager, IncomingMessage, MessageStream, OutgoingResponse};
use pokerbot::error::{AdviceError, ChannelError};
use pokerbot::hand::RuleSet;
use pokerbot::pipeline::HandPipeline;
use pokerbot::store::{MemoryStore, MessageStore, UserStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const HAND: &str = "\
Hand #12345 Mystery Battle Royale Tournament #T1- Level 5
Blinds: 1,000/2,000 (Ante 200)
Mystery Elements: [Bounty, Boost]
Seat 1: Hero (52,000 in chips)
Seat 2: Villain (48,500 in chips)
*** HOLE CARDS ***
Dealt to Hero [Ah Kd]
Hero raises to 4,000
Villain calls 4,000
*** FLOP *** [Qs 9h 3d]
Villain checks
Hero bets 5,000
Villain folds
Hero collected 13,400";

/// Counting advice stub.
struct StubAdvisor {
    calls: AtomicU32,
    seen: Mutex<Vec<String>>,
}

impl StubAdvisor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl AdviceProvider for StubAdvisor {
    fn name(&self) -> &str {
        "stub"
    }

    async fn advise(&self, hand_history: &str) -> Result<String, AdviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(hand_history.to_string());
        Ok("Solid c-bet on a dry board\nConsider a smaller sizing".to_string())
    }
}

/// Channel that emits a fixed script and records replies.
struct ScriptedChannel {
    script: Vec<IncomingMessage>,
    replies: Arc<Mutex<Vec<OutgoingResponse>>>,
}

#[async_trait]
impl Channel for ScriptedChannel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        Ok(stream::iter(self.script.clone()).boxed())
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.replies.lock().unwrap().push(response);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

fn message(user: &str, text: &str, message_id: i64) -> IncomingMessage {
    IncomingMessage::new("scripted", user, text)
        .with_user_name(user)
        .with_metadata(serde_json::json!({"chat_id": "1", "message_id": message_id}))
}

/// Shared buffer that collects formatted log output.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// Run the bot over `script`, returning the replies sent.
async fn run_bot(
    script: Vec<IncomingMessage>,
    advisor: Arc<StubAdvisor>,
    store: Arc<MemoryStore>,
) -> Vec<OutgoingResponse> {
    let replies = Arc::new(Mutex::new(Vec::new()));
    let mut channels = ChannelManager::new();
    channels.add(Box::new(ScriptedChannel {
        script,
        replies: replies.clone(),
    }));

    let pipeline = HandPipeline::new(advisor, RuleSet::default());
    let bot = Bot::new(channels, pipeline).with_stores(store.clone(), store);
    bot.run().await.unwrap();

    let out = replies.lock().unwrap().clone();
    out
}

#[tokio::test]
async fn compliant_hand_is_advised_and_chat_is_ignored() {
    timeout(TEST_TIMEOUT, async {
        let advisor = StubAdvisor::new();
        let store = Arc::new(MemoryStore::new());
        let replies = run_bot(
            vec![
                message("42", "hello there", 1),
                message("42", HAND, 2),
                message("7", "nice hand!", 3),
            ],
            advisor.clone(),
            store.clone(),
        )
        .await;

        // Only the hand history produces a reply.
        assert_eq!(replies.len(), 1);
        let reply = &replies[0];
        assert!(reply.markdown);
        assert_eq!(reply.reply_to.as_deref(), Some("2"));
        assert!(reply.content.starts_with("🃏 *Hand #12345 analysis*\nTournament: `T1`\n"));
        assert!(reply.content.contains("Blinds: 1,000/2,000\nAnte: 200\n"));
        assert!(reply.content.contains("Mystery elements: [Bounty, Boost]"));
        assert!(reply.content.contains("✅ *Hand is compliant*"));
        assert!(reply.content.contains("_Checked: "));
        assert!(reply.content.ends_with(
            "🎓 *Coach advice:*\nSolid c-bet on a dry board\n• Consider a smaller sizing"
        ));

        // One advice call, carrying the raw transcript.
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(advisor.seen.lock().unwrap()[0], HAND);

        // Every message is recorded, answered or not.
        assert_eq!(store.message_count().await, 3);
        assert_eq!(store.last_messages("42", 10).await.unwrap().len(), 2);
        let user = store.get("7").await.unwrap().unwrap();
        assert_eq!(user.user_name.as_deref(), Some("7"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn non_compliant_hand_lists_violations_without_advice() {
    timeout(TEST_TIMEOUT, async {
        let advisor = StubAdvisor::new();
        let text = HAND
            .replace("1,000/2,000 (Ante 200)", "500/1,500 (Ante 50)")
            .replace("Mystery Elements: [Bounty, Boost]\n", "");
        let replies = run_bot(
            vec![message("42", &text, 9)],
            advisor.clone(),
            Arc::new(MemoryStore::new()),
        )
        .await;

        assert_eq!(replies.len(), 1);
        let content = &replies[0].content;
        assert!(content.contains("❌ *Violations:*\n"));
        assert!(content.contains("• invalid ante size\n"));
        assert!(content.contains("• missing mystery elements\n"));
        assert!(content.contains("• invalid big blind size for mystery format\n"));
        assert!(!content.contains("Coach advice"));
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unparsable_blinds_reply_with_error_report() {
    timeout(TEST_TIMEOUT, async {
        let advisor = StubAdvisor::new();
        let text = HAND.replace("Blinds: 1,000/2,000 (Ante 200)", "Blinds: TBD");
        let replies = run_bot(
            vec![message("42", &text, 4)],
            advisor.clone(),
            Arc::new(MemoryStore::new()),
        )
        .await;

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "❌ Parse error: blinds unparsable");
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn processed_hand_logs_advice_flag_and_elapsed_time() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    timeout(TEST_TIMEOUT, async {
        let advisor = StubAdvisor::new();
        run_bot(
            vec![message("42", HAND, 2)],
            advisor,
            Arc::new(MemoryStore::new()),
        )
        .await;
    })
    .await
    .expect("test timed out");

    let output = logs.contents();
    let line = output
        .lines()
        .find(|l| l.contains("Hand processed"))
        .expect("no Hand processed line");
    assert!(line.contains("advice_requested=true"), "{line}");
    assert!(line.contains("elapsed_ms="), "{line}");
    assert!(line.contains("hand{"), "{line}");
}
