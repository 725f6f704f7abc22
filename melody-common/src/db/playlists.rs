//! Playlist queries

use super::songs;
use crate::models::{Playlist, PlaylistId};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// Every playlist with its songs, both ordered by id
pub async fn list_with_songs(pool: &SqlitePool) -> Result<Vec<Playlist>> {
    let rows = sqlx::query("SELECT id, name, accent FROM playlists ORDER BY id")
        .fetch_all(pool)
        .await?;

    let mut playlists = rows
        .iter()
        .map(playlist_from_row)
        .collect::<Result<Vec<_>>>()?;

    let mut by_playlist: HashMap<PlaylistId, Vec<_>> = HashMap::new();
    for song in songs::list_all(pool).await? {
        by_playlist.entry(song.playlist_id).or_default().push(song);
    }

    for playlist in &mut playlists {
        playlist.songs = by_playlist.remove(&playlist.id).unwrap_or_default();
    }

    Ok(playlists)
}

/// Find a playlist with its songs
pub async fn find(pool: &SqlitePool, id: PlaylistId) -> Result<Option<Playlist>> {
    let row = sqlx::query("SELECT id, name, accent FROM playlists WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut playlist = playlist_from_row(&row)?;
    playlist.songs = songs::list_for_playlist(pool, id).await?;
    Ok(Some(playlist))
}

pub async fn exists(pool: &SqlitePool, id: PlaylistId) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM playlists WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Insert a playlist and return it (with an empty song list)
pub async fn insert(pool: &SqlitePool, name: &str, accent: Option<&str>) -> Result<Playlist> {
    let result = sqlx::query("INSERT INTO playlists (name, accent) VALUES (?, ?)")
        .bind(name)
        .bind(accent)
        .execute(pool)
        .await?;

    Ok(Playlist {
        id: result.last_insert_rowid(),
        name: name.to_string(),
        accent: accent.map(str::to_string),
        songs: Vec::new(),
    })
}

/// Overwrite name and accent of a playlist
///
/// Returns `None` when no playlist has the given id.
pub async fn update(
    pool: &SqlitePool,
    id: PlaylistId,
    name: &str,
    accent: Option<&str>,
) -> Result<Option<Playlist>> {
    let result = sqlx::query(
        "UPDATE playlists SET name = ?, accent = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(name)
    .bind(accent)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    find(pool, id).await
}

/// Delete a playlist and, through the foreign key cascade, its songs
///
/// Returns the playlist as it was before deletion, songs included.
pub async fn delete(pool: &SqlitePool, id: PlaylistId) -> Result<Option<Playlist>> {
    let Some(playlist) = find(pool, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(Some(playlist))
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM playlists")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn playlist_from_row(row: &SqliteRow) -> Result<Playlist> {
    Ok(Playlist {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        accent: row.try_get("accent")?,
        songs: Vec::new(),
    })
}
