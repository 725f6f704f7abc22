//! Song queries

use crate::lyrics::normalize_lyrics;
use crate::models::{LyricLine, PlaylistId, Song, SongId};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

const SONG_COLUMNS: &str =
    "id, playlist_id, title, artist, album, cover_url, audio_url, duration, lyrics";

/// Validated song fields ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub playlist_id: PlaylistId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover_url: Option<String>,
    pub audio_url: String,
    pub duration: Option<f64>,
    pub lyrics: Vec<LyricLine>,
}

/// All songs ordered by id
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!("SELECT {} FROM songs ORDER BY id", SONG_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(song_from_row).collect()
}

/// Songs of one playlist ordered by id
pub async fn list_for_playlist(pool: &SqlitePool, playlist_id: PlaylistId) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM songs WHERE playlist_id = ? ORDER BY id",
        SONG_COLUMNS
    ))
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(song_from_row).collect()
}

pub async fn find(pool: &SqlitePool, id: SongId) -> Result<Option<Song>> {
    let row = sqlx::query(&format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(song_from_row).transpose()
}

/// Insert a song and return it as stored
pub async fn insert(pool: &SqlitePool, record: &SongRecord) -> Result<Song> {
    let lyrics = encode_lyrics(&record.lyrics)?;

    let result = sqlx::query(
        r#"
        INSERT INTO songs (playlist_id, title, artist, album, cover_url, audio_url, duration, lyrics)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.playlist_id)
    .bind(&record.title)
    .bind(&record.artist)
    .bind(&record.album)
    .bind(&record.cover_url)
    .bind(&record.audio_url)
    .bind(record.duration)
    .bind(lyrics)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    find(pool, id)
        .await?
        .ok_or_else(|| crate::Error::NotFound(format!("song {} after insert", id)))
}

/// Replace every field of an existing song
///
/// Returns `None` when no song has the given id.
pub async fn update(pool: &SqlitePool, id: SongId, record: &SongRecord) -> Result<Option<Song>> {
    let lyrics = encode_lyrics(&record.lyrics)?;

    let result = sqlx::query(
        r#"
        UPDATE songs
        SET playlist_id = ?, title = ?, artist = ?, album = ?, cover_url = ?,
            audio_url = ?, duration = ?, lyrics = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(record.playlist_id)
    .bind(&record.title)
    .bind(&record.artist)
    .bind(&record.album)
    .bind(&record.cover_url)
    .bind(&record.audio_url)
    .bind(record.duration)
    .bind(lyrics)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    find(pool, id).await
}

/// Delete a song, returning the removed row
pub async fn delete(pool: &SqlitePool, id: SongId) -> Result<Option<Song>> {
    let Some(song) = find(pool, id).await? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(Some(song))
}

/// Whether any song still references `url` as its audio or cover
pub async fn url_in_use(pool: &SqlitePool, url: &str) -> Result<bool> {
    let in_use: i64 = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM songs WHERE audio_url = ? OR cover_url = ?)",
    )
    .bind(url)
    .bind(url)
    .fetch_one(pool)
    .await?;
    Ok(in_use != 0)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn song_from_row(row: &SqliteRow) -> Result<Song> {
    let id: SongId = row.try_get("id")?;
    let lyrics: Option<String> = row.try_get("lyrics")?;

    Ok(Song {
        id,
        playlist_id: row.try_get("playlist_id")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        cover_url: row.try_get("cover_url")?,
        audio_url: row.try_get("audio_url")?,
        stream_url: None,
        duration: row.try_get("duration")?,
        lyrics: decode_lyrics(lyrics.as_deref(), id),
    })
}

/// Empty lyric lists are stored as NULL
fn encode_lyrics(lines: &[LyricLine]) -> Result<Option<String>> {
    let normalized = normalize_lyrics(lines.iter().cloned());
    if normalized.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(&normalized)?))
}

fn decode_lyrics(raw: Option<&str>, song_id: SongId) -> Vec<LyricLine> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<LyricLine>>(raw) {
        Ok(lines) => normalize_lyrics(lines),
        Err(e) => {
            warn!("Ignoring unreadable lyrics for song {}: {}", song_id, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_empty_lyrics_is_null() {
        assert_eq!(encode_lyrics(&[]).unwrap(), None);
        assert_eq!(encode_lyrics(&[LyricLine::new(1.0, "  ")]).unwrap(), None);
    }

    #[test]
    fn decode_tolerates_garbage() {
        assert!(decode_lyrics(Some("not json"), 1).is_empty());
        assert!(decode_lyrics(None, 1).is_empty());
    }

    #[test]
    fn decode_renormalizes_stored_lines() {
        let lines = decode_lyrics(Some(r#"[{"time":3,"text":"b"},{"time":-1,"text":"a"}]"#), 7);
        assert_eq!(lines, vec![LyricLine::new(0.0, "a"), LyricLine::new(3.0, "b")]);
    }
}
