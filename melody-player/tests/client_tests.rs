//! Integration tests for the library client against a running server
//!
//! The real melody-server router is served on an ephemeral port over an
//! in-memory database, so requests go through the full HTTP stack.

use axum::{http::StatusCode, routing::get, Router};
use melody_common::{db, LyricLine, Playlist};
use melody_player::{
    ClientError, LibraryClient, PlaybackMode, PlayerState, PlaylistInput, SongInput, Transition,
};
use melody_server::config::ServerConfig;
use melody_server::{build_router, AppState};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tempfile::TempDir;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn start_server() -> (LibraryClient, TempDir) {
    let root = tempfile::tempdir().unwrap();
    let pool = db::init_memory_database().await.unwrap();
    let config = ServerConfig {
        root_folder: root.path().to_path_buf(),
        bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        proxy_allowed_hosts: vec!["samplelib.com".to_string()],
        proxy_timeout: Duration::from_secs(5),
        app_url: None,
        upload_limit_mb: 5,
        seed: false,
    };
    let state = AppState::new(pool, &config).unwrap();
    let addr = serve(build_router(state)).await;

    let client = LibraryClient::new(&format!("http://{}", addr)).unwrap();
    (client, root)
}

fn song_input(playlist_id: i64, title: &str) -> SongInput {
    SongInput {
        playlist_id,
        title: title.to_string(),
        artist: "Lumen".to_string(),
        album: None,
        cover: None,
        audio: format!("https://samplelib.com/{}.mp3", title.to_lowercase()),
        duration: Some(12.0),
        lyrics: vec![
            LyricLine::new(3.5, "second"),
            LyricLine::new(0.0, "first"),
        ],
    }
}

#[tokio::test]
async fn test_crud_round_trip() {
    let (client, _root) = start_server().await;

    let playlist = client
        .create_playlist(&PlaylistInput {
            name: Some("Deep Focus".to_string()),
            accent: Some(Some("#f97316".to_string())),
        })
        .await
        .unwrap();
    assert_eq!(playlist.name, "Deep Focus");
    assert_eq!(playlist.accent.as_deref(), Some("#f97316"));

    let song = client
        .create_song(&song_input(playlist.id, "Midnight"))
        .await
        .unwrap();
    assert_eq!(song.audio, "https://samplelib.com/midnight.mp3");
    assert!(song.stream_url.starts_with("/audio/proxy?url="));
    assert_eq!(song.lyrics[0].text, "first");

    let mut changed = song_input(playlist.id, "Midnight");
    changed.title = "Midnight Drift".to_string();
    let updated = client.update_song(song.id, &changed).await.unwrap();
    assert_eq!(updated.title, "Midnight Drift");

    let renamed = client
        .update_playlist(
            playlist.id,
            &PlaylistInput {
                name: Some("Focus".to_string()),
                accent: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Focus");
    assert_eq!(renamed.accent.as_deref(), Some("#f97316"));

    let library = client.library().await.unwrap();
    assert_eq!(library.len(), 1);
    assert_eq!(library[0].songs.len(), 1);

    client.delete_song(song.id).await.unwrap();
    let deleted = client.delete_playlist(playlist.id).await.unwrap();
    assert_eq!(deleted.id, playlist.id);
    assert!(deleted.songs.is_empty());
    assert!(client.library().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_validation_error_message() {
    let (client, _root) = start_server().await;

    let err = client
        .create_playlist(&PlaylistInput::default())
        .await
        .unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "The name field is required.");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found_status() {
    let (client, _root) = start_server().await;

    let err = client.delete_song(12345).await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    let err = client
        .create_song(&song_input(999, "Orphan"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let app = Router::new().route(
        "/api/library",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance window") }),
    );
    let addr = serve(app).await;
    let client = LibraryClient::new(&format!("http://{}/", addr)).unwrap();

    let err = client.library().await.unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance window");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_library_feeds_player_state() {
    let (client, _root) = start_server().await;
    let playlist = client
        .create_playlist(&PlaylistInput {
            name: Some("Sunset Vibes".to_string()),
            accent: None,
        })
        .await
        .unwrap();
    for title in ["Aurora", "Neon", "Drift"] {
        client.create_song(&song_input(playlist.id, title)).await.unwrap();
    }

    let library: Vec<Playlist> = client
        .library()
        .await
        .unwrap()
        .into_iter()
        .map(Playlist::from)
        .collect();

    let mut player = PlayerState::with_seed(5);
    let first = library[0].songs[0].id;
    assert_eq!(player.set_library(library), Transition::Load(first));
    let current = player.current_song().unwrap();
    assert_eq!(current.audio_url, "https://samplelib.com/aurora.mp3");
    assert_eq!(
        current.playback_url(),
        "/audio/proxy?url=https%3A%2F%2Fsamplelib.com%2Faurora.mp3"
    );

    player.set_mode(PlaybackMode::Shuffle);
    let mut played = vec![first];
    for _ in 0..2 {
        match player.next() {
            Transition::Play(id) => played.push(id),
            other => panic!("unexpected {:?}", other),
        }
    }
    played.sort_unstable();
    played.dedup();
    assert_eq!(played.len(), 3);
}
