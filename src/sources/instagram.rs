//! Instagram profile scraping
//!
//! Reads the public `web_profile_info` endpoint and extracts timeline media
//! so recent post images can be fed into OCR.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::SourceError;
use crate::config::{SourcesConfig, DEFAULT_USER_AGENT};
use crate::http::BlockingClient;

/// Timestamps above this are taken to be milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Parsed profile with its timeline media
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserProfile {
    pub name: Option<String>,
    pub username: Option<String>,
    pub id: Option<String>,
    pub category: Option<String>,
    pub business_category: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub bio_links: Vec<String>,
    pub homepage: Option<String>,
    pub followers: Option<u64>,
    pub follows: Option<u64>,
    pub facebook_id: Option<String>,
    pub is_private: bool,
    pub is_verified: bool,
    pub profile_image: Option<String>,
    pub image_count: Option<u64>,
    pub images: Vec<MediaPost>,
    pub video_count: Option<u64>,
    pub videos: Vec<MediaPost>,
    pub saved_count: Option<u64>,
    /// Usernames of suggested similar accounts
    pub related_profiles: Vec<String>,
}

/// One timeline image or video
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaPost {
    pub id: Option<String>,
    pub title: Option<String>,
    pub shortcode: Option<String>,
    /// Display image URL
    pub src: Option<String>,
    /// Video URL, for videos
    pub url: Option<String>,
    pub views: Option<u64>,
    /// Usernames tagged in the post
    pub tagged: Vec<String>,
    pub captions: Vec<String>,
    pub likes: Option<u64>,
    pub comments_count: Option<u64>,
    pub comments_disabled: bool,
    /// Unix seconds
    pub taken_at: Option<i64>,
    pub location: Option<String>,
    pub accessibility_caption: Option<String>,
    /// Video length in seconds
    pub duration: Option<f64>,
}

/// Post selected by `recent_posts`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPost {
    pub shortcode: Option<String>,
    pub src: Option<String>,
    pub taken_at: i64,
    pub taken_at_iso_utc: String,
}

/// Client for the Instagram web API
pub struct InstagramClient {
    client: BlockingClient,
    base_url: String,
    app_id: String,
}

impl InstagramClient {
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let client = BlockingClient::new(Duration::from_secs(config.timeout_secs), DEFAULT_USER_AGENT)?;
        Ok(Self {
            client,
            base_url: config.instagram_base_url.trim_end_matches('/').to_string(),
            app_id: config.instagram_app_id.clone(),
        })
    }

    /// Fetch the raw `data.user` object for `username`
    pub fn fetch_user(&self, username: &str) -> Result<Value, SourceError> {
        let url = format!("{}/api/v1/users/web_profile_info/", self.base_url);
        info!("Fetching Instagram profile {}", username);

        let response = self.client.get_with_query(
            &url,
            &[("username", username.to_string())],
            &[
                ("x-ig-app-id", self.app_id.as_str()),
                ("Accept-Language", "en-US,en;q=0.9"),
                ("Accept", "*/*"),
            ],
        )?;
        if !response.status.is_success() {
            return Err(SourceError::Status {
                url,
                status: response.status.as_u16(),
            });
        }

        let mut body: Value = serde_json::from_slice(&response.body)?;
        match body.pointer_mut("/data/user") {
            Some(user) if user.is_object() => Ok(user.take()),
            _ => Err(SourceError::MissingField("data.user")),
        }
    }

    /// Fetch and parse a profile
    pub fn profile(&self, username: &str) -> Result<UserProfile, SourceError> {
        let user = self.fetch_user(username)?;
        Ok(parse_user(&user))
    }
}

/// Extract the fields we care about from a `data.user` object
pub fn parse_user(user: &Value) -> UserProfile {
    debug!("Parsing user data {:?}", user.get("username"));

    UserProfile {
        name: string_at(user, "/full_name"),
        username: string_at(user, "/username"),
        id: string_at(user, "/id"),
        category: string_at(user, "/category_name"),
        business_category: string_at(user, "/business_category_name"),
        phone: string_at(user, "/business_phone_number"),
        email: string_at(user, "/business_email"),
        bio: string_at(user, "/biography"),
        bio_links: strings_at(user, "/bio_links", "/url"),
        homepage: string_at(user, "/external_url"),
        followers: count_at(user, "/edge_followed_by/count"),
        follows: count_at(user, "/edge_follow/count"),
        facebook_id: string_at(user, "/fbid"),
        is_private: bool_at(user, "/is_private"),
        is_verified: bool_at(user, "/is_verified"),
        profile_image: string_at(user, "/profile_pic_url_hd"),
        image_count: count_at(user, "/edge_owner_to_timeline_media/count"),
        images: media_at(user, "/edge_owner_to_timeline_media/edges"),
        video_count: count_at(user, "/edge_felix_video_timeline/count"),
        videos: media_at(user, "/edge_felix_video_timeline/edges"),
        saved_count: count_at(user, "/edge_saved_media/count"),
        related_profiles: strings_at(user, "/edge_related_profiles/edges", "/node/username"),
    }
}

fn media_at(user: &Value, pointer: &str) -> Vec<MediaPost> {
    user.pointer(pointer)
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|edge| edge.get("node"))
                .map(parse_media)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_media(node: &Value) -> MediaPost {
    MediaPost {
        id: string_at(node, "/id"),
        title: string_at(node, "/title"),
        shortcode: string_at(node, "/shortcode"),
        src: string_at(node, "/display_url"),
        url: string_at(node, "/video_url"),
        views: count_at(node, "/video_view_count"),
        tagged: strings_at(node, "/edge_media_to_tagged_user/edges", "/node/user/username"),
        captions: strings_at(node, "/edge_media_to_caption/edges", "/node/text"),
        likes: count_at(node, "/edge_liked_by/count"),
        comments_count: count_at(node, "/edge_media_to_comment/count"),
        comments_disabled: bool_at(node, "/comments_disabled"),
        taken_at: node.get("taken_at_timestamp").and_then(normalize_timestamp),
        location: string_at(node, "/location/name"),
        accessibility_caption: string_at(node, "/accessibility_caption"),
        duration: node.get("video_duration").and_then(Value::as_f64),
    }
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `item_pointer` of every element in the array at `pointer`, strings only
fn strings_at(value: &Value, pointer: &str, item_pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer(item_pointer).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn count_at(value: &Value, pointer: &str) -> Option<u64> {
    value.pointer(pointer).and_then(Value::as_u64)
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value
        .pointer(pointer)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Coerce a timestamp (integer, float, or numeric string) to Unix seconds.
///
/// Millisecond values are scaled down. Anything else yields `None`.
pub fn normalize_timestamp(value: &Value) -> Option<i64> {
    let seconds = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))?
        }
        _ => return None,
    };

    if seconds > MILLIS_THRESHOLD {
        Some(seconds / 1000)
    } else {
        Some(seconds)
    }
}

/// RFC 3339 rendering of Unix seconds in UTC
pub fn timestamp_to_iso_utc(seconds: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|dt| dt.to_rfc3339())
}

/// Timeline images taken within `window_secs` of `now`, in timeline order
pub fn recent_posts(profile: &UserProfile, now: i64, window_secs: i64) -> Vec<RecentPost> {
    let cutoff = now - window_secs;

    profile
        .images
        .iter()
        .filter_map(|post| {
            let taken_at = post.taken_at.filter(|t| *t >= cutoff)?;
            Some(RecentPost {
                shortcode: post.shortcode.clone(),
                src: post.src.clone(),
                taken_at,
                taken_at_iso_utc: timestamp_to_iso_utc(taken_at)?,
            })
        })
        .collect()
}

/// Link to the newest post: images first, then videos.
///
/// Prefers the post page (`/p/{shortcode}/`), then the video URL, then the
/// display image.
pub fn most_recent_post_url(profile: &UserProfile) -> Option<String> {
    let first = profile.images.first().or_else(|| profile.videos.first())?;

    if let Some(shortcode) = &first.shortcode {
        return Some(format!("https://www.instagram.com/p/{}/", shortcode));
    }
    first.url.clone().or_else(|| first.src.clone())
}
