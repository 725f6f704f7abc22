//! Integration tests for the SQLite schema and repositories

use melody_common::db::{self, playlists, songs, SongRecord};
use melody_common::LyricLine;
use sqlx::SqlitePool;

fn record(playlist_id: i64, title: &str) -> SongRecord {
    SongRecord {
        playlist_id,
        title: title.to_string(),
        artist: "Test Artist".to_string(),
        album: None,
        cover_url: None,
        audio_url: format!("https://example.com/{}.mp3", title),
        duration: Some(12.5),
        lyrics: Vec::new(),
    }
}

async fn memory_pool() -> SqlitePool {
    db::init_memory_database()
        .await
        .expect("in-memory database should initialize")
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("melody.db");

    let pool = db::init_database(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("melody.db");

    let first = db::init_database(&db_path).await.unwrap();
    playlists::insert(&first, "Kept", None).await.unwrap();
    first.close().await;

    let second = db::init_database(&db_path).await.unwrap();
    let library = playlists::list_with_songs(&second).await.unwrap();
    assert_eq!(library.len(), 1);
    assert_eq!(library[0].name, "Kept");
}

#[tokio::test]
async fn test_library_is_ordered_by_id() {
    let pool = memory_pool().await;
    let a = playlists::insert(&pool, "A", Some("#fb7185")).await.unwrap();
    let b = playlists::insert(&pool, "B", None).await.unwrap();

    songs::insert(&pool, &record(b.id, "b1")).await.unwrap();
    songs::insert(&pool, &record(a.id, "a1")).await.unwrap();
    songs::insert(&pool, &record(a.id, "a2")).await.unwrap();

    let library = playlists::list_with_songs(&pool).await.unwrap();

    assert_eq!(library.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    let a_titles: Vec<_> = library[0].songs.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(a_titles, vec!["a1", "a2"]);
    assert_eq!(library[1].songs.len(), 1);
    assert_eq!(library[1].accent, None);
}

#[tokio::test]
async fn test_delete_playlist_cascades_to_songs() {
    let pool = memory_pool().await;
    let playlist = playlists::insert(&pool, "Doomed", None).await.unwrap();
    let keep = playlists::insert(&pool, "Keep", None).await.unwrap();
    songs::insert(&pool, &record(playlist.id, "one")).await.unwrap();
    songs::insert(&pool, &record(playlist.id, "two")).await.unwrap();
    songs::insert(&pool, &record(keep.id, "three")).await.unwrap();

    let deleted = playlists::delete(&pool, playlist.id).await.unwrap().unwrap();

    assert_eq!(deleted.songs.len(), 2);
    assert_eq!(songs::count(&pool).await.unwrap(), 1);
    assert!(!playlists::exists(&pool, playlist.id).await.unwrap());
}

#[tokio::test]
async fn test_song_lyrics_round_trip_normalized() {
    let pool = memory_pool().await;
    let playlist = playlists::insert(&pool, "Lyrics", None).await.unwrap();

    let mut song = record(playlist.id, "sung");
    song.lyrics = vec![
        LyricLine::new(5.0, "later"),
        LyricLine::new(-2.0, "start"),
        LyricLine::new(3.0, ""),
    ];

    let stored = songs::insert(&pool, &song).await.unwrap();

    assert_eq!(
        stored.lyrics,
        vec![LyricLine::new(0.0, "start"), LyricLine::new(5.0, "later")]
    );
}

#[tokio::test]
async fn test_update_and_delete_missing_song() {
    let pool = memory_pool().await;
    let playlist = playlists::insert(&pool, "P", None).await.unwrap();

    assert!(songs::update(&pool, 999, &record(playlist.id, "x")).await.unwrap().is_none());
    assert!(songs::delete(&pool, 999).await.unwrap().is_none());
    assert!(playlists::update(&pool, 999, "n", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_url_in_use_checks_audio_and_cover() {
    let pool = memory_pool().await;
    let playlist = playlists::insert(&pool, "P", None).await.unwrap();

    let mut with_cover = record(playlist.id, "a");
    with_cover.cover_url = Some("/storage/covers/c.png".to_string());
    let song = songs::insert(&pool, &with_cover).await.unwrap();

    assert!(songs::url_in_use(&pool, "https://example.com/a.mp3").await.unwrap());
    assert!(songs::url_in_use(&pool, "/storage/covers/c.png").await.unwrap());
    assert!(!songs::url_in_use(&pool, "https://example.com/b.mp3").await.unwrap());

    songs::delete(&pool, song.id).await.unwrap();
    assert!(!songs::url_in_use(&pool, "/storage/covers/c.png").await.unwrap());
}

#[tokio::test]
async fn test_song_requires_existing_playlist() {
    let pool = memory_pool().await;

    let result = songs::insert(&pool, &record(42, "orphan")).await;

    assert!(result.is_err(), "foreign key should reject unknown playlist");
}

#[tokio::test]
async fn test_seed_runs_once() {
    let pool = memory_pool().await;

    assert!(db::seed_demo_library(&pool).await.unwrap());
    assert!(!db::seed_demo_library(&pool).await.unwrap());

    let library = playlists::list_with_songs(&pool).await.unwrap();
    assert_eq!(library.len(), 2);
    assert_eq!(library[0].songs.len(), 2);
    assert_eq!(library[0].songs[0].lyrics.len(), 4);
}
