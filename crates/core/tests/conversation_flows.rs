//! Conversation flow integration tests.
//!
//! These tests drive the full engine (auth gate, menu, flows) over mock
//! collaborators, message by message, the way the transport would.

use std::sync::Arc;

use telemission_core::testing::{MockStorageReporter, MockTorrentControl, RecordedCall};
use telemission_core::{
    register_commands, BackendErrorPolicy, ChatId, CommandDeps, ConversationEngine,
    DownloadsConfig, Incoming, Keyboard, Outgoing, StorageReporter, TorrentControl,
    TorrentControlError, UserId,
};

const CHAT: ChatId = ChatId(100);
const TRUSTED: UserId = UserId(111);
const STRANGER: UserId = UserId(999);

/// Test helper wiring the standard catalog over mocks.
struct TestHarness {
    engine: ConversationEngine,
    control: Arc<MockTorrentControl>,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_policy(BackendErrorPolicy::Report)
    }

    fn with_policy(policy: BackendErrorPolicy) -> Self {
        let control = Arc::new(MockTorrentControl::new());
        let storage = Arc::new(MockStorageReporter::new("Filesystem Use%\n/plex/media 80%"));

        let deps = CommandDeps {
            control: Arc::clone(&control) as Arc<dyn TorrentControl>,
            storage: storage as Arc<dyn StorageReporter>,
            downloads: DownloadsConfig {
                movies_dir: "/media/movies".to_string(),
                tv_shows_dir: "/media/tv_shows".to_string(),
            },
        };

        let builder = ConversationEngine::builder(Arc::clone(&deps.control), policy)
            .allow_users([TRUSTED.0]);
        let engine = register_commands(builder, &deps)
            .build()
            .expect("engine builds");

        Self { engine, control }
    }

    async fn send_as(&self, user: UserId, text: &str) -> Vec<Outgoing> {
        self.engine
            .handle_message(Incoming {
                chat_id: CHAT,
                user_id: user,
                text: text.to_string(),
            })
            .await
            .expect("handled")
    }

    async fn send(&self, text: &str) -> Vec<Outgoing> {
        self.send_as(TRUSTED, text).await
    }

    /// Authenticate the trusted user and land on the menu.
    async fn open_menu(&self) {
        let replies = self.send("/start").await;
        assert_eq!(texts(&replies), vec!["Enter command:"]);
    }

    async fn current_state(&self) -> String {
        let state = self.engine.session_state(CHAT).await.expect("session");
        for name in [
            "entry",
            "await_password",
            "menu_choice",
            "add_tv_show",
            "add_movie",
            "start_torrent",
            "stop_torrent",
            "delete_torrent",
            "list_torrent_files",
            "toggle_torrent_file",
            "toggle_torrent_file_file_choice",
            "toggle_all_torrent_files",
        ] {
            if self.engine.state_id(name) == Some(state) {
                return name.to_string();
            }
        }
        panic!("session parked in unknown state {state}");
    }
}

fn texts(replies: &[Outgoing]) -> Vec<String> {
    replies.iter().map(|r| r.text.clone()).collect()
}

fn keyboard_rows(reply: &Outgoing) -> Vec<Vec<String>> {
    match &reply.keyboard {
        Keyboard::Buttons(rows) => rows.clone(),
        Keyboard::Remove => panic!("expected a button keyboard"),
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_allow_listed_user_goes_straight_to_menu() {
    let h = TestHarness::new();

    let replies = h.send_as(TRUSTED, "/start").await;

    assert_eq!(texts(&replies), vec!["Enter command:"]);
    let rows = keyboard_rows(&replies[0]);
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0], vec!["Add Tv Show".to_string()]);
    assert_eq!(rows[1], vec!["Add Movie".to_string()]);
    assert_eq!(h.current_state().await, "menu_choice");
    assert!(h.engine.session_challenge(CHAT).await.is_none());
}

#[tokio::test]
async fn test_stranger_is_challenged_with_five_digit_code() {
    let h = TestHarness::new();

    let replies = h.send_as(STRANGER, "/start").await;

    assert_eq!(replies.len(), 1);
    assert!(replies[0].text.contains("999"));
    assert!(replies[0].text.contains("authenticate"));
    assert_eq!(h.current_state().await, "await_password");

    let code = h.engine.session_challenge(CHAT).await.unwrap();
    assert_eq!(code.len(), 5);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_wrong_code_ends_conversation_and_rotates_code() {
    let h = TestHarness::new();

    h.send_as(STRANGER, "/start").await;
    let first_code = h.engine.session_challenge(CHAT).await.unwrap();

    // A wrong attempt: flip the first digit so it never matches.
    let wrong = format!(
        "{}{}",
        (first_code.as_bytes()[0] as char).to_digit(10).map(|d| (d + 1) % 10).unwrap(),
        &first_code[1..]
    );
    let replies = h.send_as(STRANGER, &wrong).await;

    assert!(replies.is_empty());
    assert_eq!(h.current_state().await, "entry");

    // Re-invoking entry issues a different code; the old one is dead.
    h.send_as(STRANGER, "/start").await;
    let second_code = h.engine.session_challenge(CHAT).await.unwrap();
    assert_ne!(first_code, second_code);

    let replies = h.send_as(STRANGER, &first_code).await;
    assert!(replies.is_empty());
    assert_eq!(h.current_state().await, "entry");
}

#[tokio::test]
async fn test_correct_code_reaches_menu() {
    let h = TestHarness::new();

    h.send_as(STRANGER, "/start").await;
    let code = h.engine.session_challenge(CHAT).await.unwrap();

    let replies = h.send_as(STRANGER, &code).await;

    assert_eq!(texts(&replies), vec!["Enter command:"]);
    assert_eq!(h.current_state().await, "menu_choice");
    assert!(h.engine.session_challenge(CHAT).await.is_none());
}

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unrecognized_label_re_presents_menu() {
    let h = TestHarness::new();
    h.open_menu().await;

    let replies = h.send("do something").await;

    assert_eq!(texts(&replies), vec!["Enter command:"]);
    assert_eq!(h.current_state().await, "menu_choice");
}

#[tokio::test]
async fn test_list_torrents_replies_one_message_per_torrent() {
    let h = TestHarness::new();
    h.control.push_torrent(12, "Ubuntu.iso").await;
    h.control.push_torrent(7, "Movie.mkv").await;
    h.open_menu().await;

    let replies = h.send("List Torrents").await;

    assert_eq!(
        texts(&replies),
        vec![
            "12: Ubuntu.iso [downloading 0%]",
            "7: Movie.mkv [downloading 0%]",
            "Enter command:",
        ]
    );
}

#[tokio::test]
async fn test_storage_stats_replies_report() {
    let h = TestHarness::new();
    h.open_menu().await;

    let replies = h.send("Storage Stats").await;

    assert_eq!(replies[0].text, "Filesystem Use%\n/plex/media 80%");
    assert_eq!(replies[1].text, "Enter command:");
}

// ---------------------------------------------------------------------------
// Magnet flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_add_movie_flow_end_to_end() {
    let h = TestHarness::new();
    h.open_menu().await;

    let replies = h.send("Add Movie").await;
    assert_eq!(texts(&replies), vec!["Enter magnet url (or type 'cancel'):"]);
    assert_eq!(h.current_state().await, "add_movie");

    let replies = h.send("magnet:?xt=urn:btih:XYZ&dn=Ubuntu+ISO").await;
    assert_eq!(replies[0].text, "add_movie('Ubuntu ISO') = Ubuntu ISO (id 1, added)");
    assert_eq!(replies[1].text, "Enter command:");
    assert_eq!(h.current_state().await, "menu_choice");

    assert_eq!(
        h.control.recorded_calls().await,
        vec![RecordedCall::Add {
            uri: "magnet:?xt=urn:btih:XYZ&dn=Ubuntu+ISO".to_string(),
            dir: "/media/movies".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_add_tv_show_targets_tv_dir() {
    let h = TestHarness::new();
    h.open_menu().await;
    h.send("Add Tv Show").await;

    h.send("magnet:?xt=urn:btih:XYZ&dn=Show").await;

    assert_eq!(
        h.control.recorded_calls().await,
        vec![RecordedCall::Add {
            uri: "magnet:?xt=urn:btih:XYZ&dn=Show".to_string(),
            dir: "/media/tv_shows".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_non_magnet_reprompts_without_backend_call() {
    let h = TestHarness::new();
    h.open_menu().await;
    h.send("Add Movie").await;

    let replies = h.send("not-a-magnet").await;

    assert_eq!(texts(&replies), vec!["Enter magnet url (or type 'cancel'):"]);
    assert_eq!(h.current_state().await, "add_movie");
    assert!(h.control.recorded_calls().await.is_empty());
}

// ---------------------------------------------------------------------------
// Single-torrent flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_stop_torrent_flow_end_to_end() {
    let h = TestHarness::new();
    h.control.push_torrent(12, "Ubuntu.iso").await;
    h.control.push_torrent(7, "Movie.mkv").await;
    h.open_menu().await;

    let replies = h.send("Stop Torrent").await;
    assert_eq!(texts(&replies), vec!["Choose torrent:"]);
    let rows = keyboard_rows(&replies[0]);
    assert_eq!(
        rows,
        vec![
            vec!["Cancel".to_string()],
            vec!["12: Ubuntu.iso".to_string()],
            vec!["7: Movie.mkv".to_string()],
        ]
    );

    let replies = h.send("12: Ubuntu.iso").await;
    assert_eq!(
        texts(&replies),
        vec!["stop_torrent(12) = ok", "Enter command:"]
    );
    assert!(h
        .control
        .recorded_calls()
        .await
        .contains(&RecordedCall::Stop(12)));
}

#[tokio::test]
async fn test_bare_id_is_not_a_selection() {
    let h = TestHarness::new();
    h.control.push_torrent(12, "Ubuntu.iso").await;
    h.open_menu().await;
    h.send("Stop Torrent").await;

    // "12" alone does not match a displayed string, so the list re-renders.
    let replies = h.send("12").await;

    assert_eq!(texts(&replies), vec!["Choose torrent:"]);
    assert_eq!(h.current_state().await, "stop_torrent");
    assert!(!h
        .control
        .recorded_calls()
        .await
        .contains(&RecordedCall::Stop(12)));
}

#[tokio::test]
async fn test_list_torrent_files_emits_sorted_lines() {
    let h = TestHarness::new();
    h.control.push_torrent(3, "Bundle").await;
    h.control
        .set_files(3, &[("video.mkv", true), ("audio.mp3", false)])
        .await;
    h.open_menu().await;
    h.send("List Torrent Files").await;

    let replies = h.send("3: Bundle").await;

    assert_eq!(
        texts(&replies),
        vec![
            "list_torrent_files(3) = 3.1: audio.mp3 [off]",
            "list_torrent_files(3) = 3.0: video.mkv [on]",
            "Enter command:",
        ]
    );
}

#[tokio::test]
async fn test_toggle_all_torrent_files_toggles_each() {
    let h = TestHarness::new();
    h.control.push_torrent(3, "Bundle").await;
    h.control
        .set_files(3, &[("video.mkv", true), ("audio.mp3", false)])
        .await;
    h.open_menu().await;
    h.send("Toggle All Torrent Files").await;

    let replies = h.send("3: Bundle").await;

    assert_eq!(
        texts(&replies),
        vec![
            "toggle_all_torrent_files(3) = 3.0: video.mkv -> off",
            "toggle_all_torrent_files(3) = 3.1: audio.mp3 -> on",
            "Enter command:",
        ]
    );
}

// ---------------------------------------------------------------------------
// Torrent-file flow
// ---------------------------------------------------------------------------

async fn enter_file_choice(h: &TestHarness) {
    h.control.push_torrent(3, "Bundle").await;
    h.control
        .set_files(3, &[("video.mkv", true), ("audio.mp3", true)])
        .await;
    h.open_menu().await;
    h.send("Toggle Torrent File").await;

    let replies = h.send("3: Bundle").await;
    assert_eq!(texts(&replies), vec!["Choose file:"]);
    // Files listed sorted by name, Cancel first.
    let rows = keyboard_rows(&replies[0]);
    assert_eq!(
        rows,
        vec![
            vec!["Cancel".to_string()],
            vec!["3.1: audio.mp3".to_string()],
            vec!["3.0: video.mkv".to_string()],
        ]
    );
    assert_eq!(h.current_state().await, "toggle_torrent_file_file_choice");
}

#[tokio::test]
async fn test_toggle_torrent_file_end_to_end() {
    let h = TestHarness::new();
    enter_file_choice(&h).await;

    let replies = h.send("3.0: video.mkv").await;

    assert_eq!(
        texts(&replies),
        vec!["toggle_torrent_file(3.0) = off", "Enter command:"]
    );
    assert!(h.control.recorded_calls().await.contains(&RecordedCall::Toggle {
        torrent_id: 3,
        file_id: 0,
    }));
}

#[tokio::test]
async fn test_malformed_file_choice_aborts_to_menu() {
    let h = TestHarness::new();
    enter_file_choice(&h).await;

    // Missing the file-id segment: aborts, does not re-prompt.
    let replies = h.send("3:video.mkv").await;

    assert_eq!(
        texts(&replies),
        vec!["Error choosing torrent file", "Enter command:"]
    );
    assert_eq!(h.current_state().await, "menu_choice");
}

#[tokio::test]
async fn test_stale_file_choice_aborts_to_menu() {
    let h = TestHarness::new();
    enter_file_choice(&h).await;

    // Valid format, but no such file id anymore.
    let replies = h.send("3.9: gone.mkv").await;

    assert_eq!(
        texts(&replies),
        vec!["Error choosing torrent file", "Enter command:"]
    );
    assert_eq!(h.current_state().await, "menu_choice");
}

#[tokio::test]
async fn test_vanished_torrent_aborts_to_menu() {
    let h = TestHarness::new();
    enter_file_choice(&h).await;
    h.control.delete_torrent(3).await.unwrap();

    let replies = h.send("3.0: video.mkv").await;

    assert_eq!(
        texts(&replies),
        vec!["Error choosing torrent file", "Enter command:"]
    );
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cancel_escapes_every_flow_stage() {
    let h = TestHarness::new();
    h.control.push_torrent(3, "Bundle").await;
    h.control.set_files(3, &[("video.mkv", true)]).await;

    // Magnet stage.
    h.open_menu().await;
    h.send("Add Movie").await;
    let replies = h.send("  CANCEL  ").await;
    assert_eq!(texts(&replies), vec!["Enter command:"]);
    assert_eq!(h.current_state().await, "menu_choice");

    // Torrent-selection stage.
    h.send("Stop Torrent").await;
    let replies = h.send("cancel").await;
    assert_eq!(texts(&replies), vec!["Enter command:"]);

    // File-selection stage.
    h.send("Toggle Torrent File").await;
    h.send("3: Bundle").await;
    let replies = h.send("\tCanCel\n").await;
    assert_eq!(texts(&replies), vec!["Enter command:"]);
    assert_eq!(h.current_state().await, "menu_choice");
}

#[tokio::test]
async fn test_slash_cancel_resets_to_entry() {
    let h = TestHarness::new();
    h.open_menu().await;
    h.send("Add Movie").await;

    let replies = h.send("/cancel").await;

    assert_eq!(texts(&replies), vec!["Cancelled."]);
    assert_eq!(h.current_state().await, "entry");
}

#[tokio::test]
async fn test_slash_cancel_does_not_bypass_authentication() {
    let h = TestHarness::new();
    h.send_as(STRANGER, "/start").await;

    let replies = h.send_as(STRANGER, "/cancel").await;

    // Back to entry, challenge gone; no menu for the unauthenticated.
    assert_eq!(texts(&replies), vec!["Cancelled."]);
    assert_eq!(h.current_state().await, "entry");
    assert!(h.engine.session_challenge(CHAT).await.is_none());
}

// ---------------------------------------------------------------------------
// Backend failure policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_report_policy_replies_and_returns_to_menu() {
    let h = TestHarness::new();
    h.open_menu().await;
    h.control.fail_next(TorrentControlError::Timeout).await;

    let replies = h.send("Stop Torrent").await;

    assert!(replies[0].text.starts_with("stop_torrent failed:"));
    assert_eq!(replies[1].text, "Enter command:");
    assert_eq!(h.current_state().await, "menu_choice");
}

#[tokio::test]
async fn test_fail_policy_propagates_engine_error() {
    let h = TestHarness::with_policy(BackendErrorPolicy::Fail);
    h.open_menu().await;
    h.control.fail_next(TorrentControlError::Timeout).await;

    let result = h
        .engine
        .handle_message(Incoming {
            chat_id: CHAT,
            user_id: TRUSTED,
            text: "Stop Torrent".to_string(),
        })
        .await;

    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_session_from_challenge_to_flow() {
    let h = TestHarness::new();

    // New user: challenged.
    h.send_as(STRANGER, "/start").await;
    let first_code = h.engine.session_challenge(CHAT).await.unwrap();

    // Wrong guess: conversation over.
    let wrong = if first_code == "00000" { "11111" } else { "00000" };
    assert!(h.send_as(STRANGER, wrong).await.is_empty());

    // Second entry: a different code.
    h.send_as(STRANGER, "/start").await;
    let second_code = h.engine.session_challenge(CHAT).await.unwrap();
    assert_ne!(first_code, second_code);

    // Correct code: the menu.
    let replies = h.send_as(STRANGER, &second_code).await;
    assert_eq!(texts(&replies), vec!["Enter command:"]);

    // Pick a command: the magnet flow begins.
    let replies = h.send_as(STRANGER, "Add Movie").await;
    assert_eq!(texts(&replies), vec!["Enter magnet url (or type 'cancel'):"]);
    assert_eq!(h.current_state().await, "add_movie");
}
