use super::{format_time, merge_json, parse_time, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{Profile, UpdateProfilePayload};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_.\-]{3,30}$").expect("valid username regex"));

const PROFILE_COLUMNS: &str =
    "id, user_id, username, bio, avatar_url, theme_config_json, created_at, updated_at";

fn parse_profile_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let theme_raw: String = row.get(5)?;
    Ok(Profile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        bio: row.get(3)?,
        avatar_url: row.get(4)?,
        theme_config: serde_json::from_str(&theme_raw).unwrap_or_else(|_| serde_json::json!({})),
        created_at: parse_time(&row.get::<_, String>(6)?)?,
        updated_at: parse_time(&row.get::<_, String>(7)?)?,
    })
}

fn load_profile(conn: &Connection, profile_id: &str) -> AppResult<Profile> {
    let sql = format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS);
    conn.query_row(&sql, params![profile_id], parse_profile_row)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("profile {} not found", profile_id)))
}

pub fn normalize_username(raw: &str) -> AppResult<String> {
    let username = raw.trim().to_lowercase();
    if !USERNAME_RE.is_match(&username) {
        return Err(AppError::Validation(format!(
            "username '{}' must be 3-30 characters of a-z, 0-9, '_', '.' or '-'",
            username
        )));
    }
    Ok(username)
}

impl Database {
    /// Returns the profile of `user_id`, creating an empty one on first access.
    pub fn profile_for_user(&self, user_id: &str) -> AppResult<Profile> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::Validation("user id must not be empty".to_string()));
        }
        self.write(|tx| {
            let sql = format!("SELECT {} FROM profiles WHERE user_id = ?1", PROFILE_COLUMNS);
            if let Some(profile) = tx
                .query_row(&sql, params![user_id], parse_profile_row)
                .optional()?
            {
                return Ok(profile);
            }

            let id = Uuid::new_v4().to_string();
            let now = format_time(Utc::now());
            tx.execute(
                "INSERT INTO profiles (id, user_id, theme_config_json, created_at, updated_at)
                 VALUES (?1, ?2, '{}', ?3, ?3)",
                params![id, user_id, now],
            )?;
            tracing::info!(user_id = %user_id, profile_id = %id, "created profile");
            load_profile(tx, &id)
        })
    }

    pub fn profile_by_username(&self, username: &str) -> AppResult<Profile> {
        let username = username.trim().to_lowercase();
        self.read(|conn| {
            let sql = format!("SELECT {} FROM profiles WHERE username = ?1", PROFILE_COLUMNS);
            conn.query_row(&sql, params![username], parse_profile_row)
                .optional()?
                .ok_or_else(|| AppError::NotFound(format!("profile '{}' not found", username)))
        })
    }

    /// Partial update; the theme config is merged key-wise into the stored one.
    pub fn update_profile(&self, profile_id: &str, payload: UpdateProfilePayload) -> AppResult<Profile> {
        self.write(|tx| {
            let existing = load_profile(tx, profile_id)?;
            let mut theme = existing.theme_config;
            if let Some(update) = payload.theme_config {
                merge_json(&mut theme, update);
            }
            tx.execute(
                "UPDATE profiles
                 SET bio = COALESCE(?1, bio),
                     avatar_url = COALESCE(?2, avatar_url),
                     theme_config_json = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    payload.bio,
                    payload.avatar_url,
                    serde_json::to_string(&theme)?,
                    format_time(Utc::now()),
                    profile_id
                ],
            )?;
            load_profile(tx, profile_id)
        })
    }

    pub fn claim_username(&self, profile_id: &str, username: &str) -> AppResult<Profile> {
        let username = normalize_username(username)?;
        let profile = self.write(|tx| {
            let owner: Option<String> = tx
                .query_row(
                    "SELECT id FROM profiles WHERE username = ?1",
                    params![username],
                    |row| row.get(0),
                )
                .optional()?;
            match owner {
                Some(owner) if owner == profile_id => return load_profile(tx, profile_id),
                Some(_) => {
                    return Err(AppError::Conflict(format!(
                        "username '{}' is already taken",
                        username
                    )))
                }
                None => {}
            }
            let changed = tx.execute(
                "UPDATE profiles SET username = ?1, updated_at = ?2 WHERE id = ?3",
                params![username, format_time(Utc::now()), profile_id],
            )?;
            if changed == 0 {
                return Err(AppError::NotFound(format!("profile {} not found", profile_id)));
            }
            load_profile(tx, profile_id)
        })?;
        tracing::info!(profile_id = %profile_id, username = %username, "claimed username");
        Ok(profile)
    }
}
