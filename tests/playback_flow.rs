use std::sync::Arc;
use tempfile::tempdir;
use tunequeue::config::{self, DataPaths};
use tunequeue::error::NotFound;
use tunequeue::message::{Message, MessageKey};
use tunequeue::model::{Direction, PlayMode, Song};
use tunequeue::store::{CatalogStore, JsonFileStore, QueueStore};
use tunequeue::target::{Action, RecordingTarget, Signal};
use tunequeue::{Player, PlayerError};

fn songs() -> Vec<Song> {
    vec![
        Song::new("Alpha", "a", vec![String::from("One")]).with_duration(10),
        Song::new("Bravo", "b", vec![String::from("Two")]).with_duration(20),
        Song::new("Charlie", "c", vec![String::from("Three")]).with_duration(30),
    ]
}

fn open(paths: &DataPaths) -> (Player, Arc<JsonFileStore>, Arc<RecordingTarget>) {
    let store = Arc::new(JsonFileStore::open(paths.clone()).expect("store"));
    let target = Arc::new(RecordingTarget::new());
    let player = Player::builder(store.clone())
        .target(target.clone())
        .seed(42)
        .build()
        .expect("player");
    (player, store, target)
}

fn seeded(paths: &DataPaths, queue: &[&str]) -> (Player, Arc<JsonFileStore>, Arc<RecordingTarget>) {
    let (player, store, target) = open(paths);
    CatalogStore::save(store.as_ref(), &songs()).expect("catalog");
    let queue: Vec<String> = queue.iter().map(|link| link.to_string()).collect();
    QueueStore::save(store.as_ref(), "alex", &queue).expect("queue");
    (player, store, target)
}

#[tokio::test]
async fn fresh_data_dir_starts_empty() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    let (player, store, _) = open(&paths);

    assert!(paths.songs().exists());
    assert!(matches!(
        player.play("alex", None),
        Err(PlayerError::NotFound(NotFound::EmptyQueue))
    ));
    assert!(matches!(
        player.pause("alex"),
        Err(PlayerError::NotFound(NotFound::Queue))
    ));
    assert!(!store.exists("alex"));
}

#[tokio::test]
async fn sequential_next_stops_at_the_tail_and_prev_wraps() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    let (player, _, target) = seeded(&paths, &["a", "b", "c"]);

    player.play("alex", Some("3")).expect("play c");
    let reply = player.next("alex").expect("next");
    assert_eq!(reply, vec![Message::new(MessageKey::SequentialEnd)]);
    let view = player.session_view("alex");
    assert_eq!(view.current.as_deref(), Some("c"));
    assert!(view.timer.is_none());

    player.play("alex", Some("1")).expect("play a");
    let reply = player.prev("alex").expect("prev");
    assert_eq!(reply, vec![Message::with(MessageKey::PrevPlaying, ["Charlie"])]);
    assert_eq!(
        target.signals_for("alex").last(),
        Some(&Signal::new("alex", "c", Action::Play))
    );
}

#[tokio::test]
async fn loop_next_wraps_to_the_head() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    let (player, _, target) = seeded(&paths, &["a", "b", "c"]);

    player.set_mode("alex", "loop").expect("mode");
    player.play("alex", Some("3")).expect("play");
    target.clear();

    let reply = player.next("alex").expect("next");
    assert_eq!(reply, vec![Message::with(MessageKey::NextPlaying, ["Alpha"])]);
    assert_eq!(
        target.signals(),
        vec![
            Signal::new("alex", "c", Action::Stop),
            Signal::new("alex", "a", Action::Play),
        ]
    );
}

#[tokio::test]
async fn random_next_always_leaves_the_current_song() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    let (player, _, _) = seeded(&paths, &["a", "b"]);

    player.set_mode("alex", "random").expect("mode");
    player.play("alex", Some("1")).expect("play");
    for expected in ["b", "a", "b", "a"] {
        player.next("alex").expect("next");
        assert_eq!(player.session_view("alex").current.as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn single_mode_next_stops_then_replays() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    let (player, _, target) = seeded(&paths, &["a", "b"]);

    player.set_mode("alex", "single").expect("mode");
    assert!(matches!(
        player.next("alex"),
        Err(PlayerError::NotFound(NotFound::CurrentSong))
    ));

    player.play("alex", Some("2")).expect("play");
    target.clear();
    player.next("alex").expect("repeat");
    assert_eq!(
        target.signals(),
        vec![
            Signal::new("alex", "b", Action::Stop),
            Signal::new("alex", "b", Action::Play),
        ]
    );

    target.clear();
    player.prev("alex").expect("repeat backwards");
    assert_eq!(
        target.signals(),
        vec![
            Signal::new("alex", "b", Action::Stop),
            Signal::new("alex", "b", Action::Play),
        ]
    );
    assert_eq!(player.session_view("alex").current.as_deref(), Some("b"));
    assert!(player.session_view("alex").timer.is_some());
}

#[tokio::test]
async fn cannot_advance_a_single_entry_queue() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    let (player, _, _) = seeded(&paths, &["a"]);

    let err = player.next("alex").expect_err("one entry");
    assert!(matches!(err, PlayerError::CannotAdvance(Direction::Forward)));
    assert_eq!(err.message(), Message::new(MessageKey::QueueOneSongNoNext));
}

#[tokio::test]
async fn sessions_survive_a_restart_without_timers() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    {
        let (player, _, _) = seeded(&paths, &["a", "b"]);
        player.set_mode("alex", "loop").expect("mode");
        player.play("alex", Some("2")).expect("play");
        player.list("alex", Some(1)).expect("list");
        config::save_sessions(&paths, &player.snapshot_sessions()).expect("save");
        player.cancel_all_timers();
    }

    let (player, _, target) = open(&paths);
    player.restore_sessions(&config::load_sessions(&paths).expect("load"));
    let view = player.session_view("alex");
    assert_eq!(view.current.as_deref(), Some("b"));
    assert_eq!(view.mode, PlayMode::Loop);
    assert!(view.timer.is_none());

    let reply = player.play("alex", None).expect("resume current");
    assert_eq!(reply, vec![Message::with(MessageKey::Resumed, ["Bravo"])]);
    assert_eq!(target.last(), Some(Signal::new("alex", "b", Action::Play)));
    assert!(player.session_view("alex").timer.is_some());
}

#[tokio::test]
async fn catalog_edits_reach_the_file() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    let (player, _, _) = open(&paths);

    player
        .admin_add("Wet_Hands", "C418", "Wet_Hands")
        .expect("add");
    player.admin_set_duration("1", "90").expect("duration");

    let reopened = JsonFileStore::open(paths.clone()).expect("reopen");
    let songs = CatalogStore::load(&reopened).expect("load");
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].name, "Wet Hands");
    assert_eq!(songs[0].link, "wet_hands");
    assert_eq!(songs[0].duration, 90);
}

#[tokio::test]
async fn users_keep_separate_queues_and_sessions() {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::new(dir.path());
    let (player, store, _) = seeded(&paths, &["a"]);

    player.add("sam", "2").expect("add for sam");
    player.play("sam", None).expect("play for sam");

    assert_eq!(QueueStore::load(store.as_ref(), "alex").expect("alex"), vec!["a"]);
    assert_eq!(QueueStore::load(store.as_ref(), "sam").expect("sam"), vec!["b"]);
    assert_eq!(player.session_view("sam").current.as_deref(), Some("b"));
    assert!(player.session_view("alex").current.is_none());
}
