//! X (Twitter) API v2 recent-search backend for [`ProfileSearchApi`].
//!
//! One search page yields posts plus the expanded author objects. Authors
//! become profiles; each author's first matching post is kept as the
//! recent-activity snippet.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::profile::RawProfile;
use crate::sourcing::{ProfileSearchApi, SourceError};

/// Page size bounds enforced by the recent-search endpoint.
const MIN_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;
const MAX_PAGES: usize = 5;
const ACTIVITY_SNIPPET_CHARS: usize = 200;
const USER_FIELDS: &str =
    "description,public_metrics,profile_image_url,profile_banner_url,name,username";

#[derive(Debug, Deserialize)]
struct SearchResponseWire {
    #[serde(default)]
    data: Vec<PostWire>,
    #[serde(default)]
    includes: Option<IncludesWire>,
    #[serde(default)]
    meta: Option<MetaWire>,
}

#[derive(Debug, Deserialize)]
struct PostWire {
    author_id: Option<String>,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct IncludesWire {
    #[serde(default)]
    users: Vec<UserWire>,
}

#[derive(Debug, Deserialize)]
struct MetaWire {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserWire {
    id: String,
    username: String,
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    profile_image_url: String,
    profile_banner_url: Option<String>,
    public_metrics: Option<PublicMetricsWire>,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetricsWire {
    #[serde(default)]
    followers_count: u64,
    #[serde(default)]
    following_count: u64,
}

#[derive(Clone)]
pub struct XSearchClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl XSearchClient {
    pub fn new(base_url: String, bearer_token: Option<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
        })
    }

    async fn fetch_page(
        &self,
        token: &str,
        query: &str,
        page_size: u32,
        next_token: Option<&str>,
    ) -> Result<SearchResponseWire, SourceError> {
        let url = format!("{}/tweets/search/recent", self.base_url);
        let page_size = page_size.to_string();
        let mut params = vec![
            ("query", query),
            ("max_results", page_size.as_str()),
            ("expansions", "author_id"),
            ("tweet.fields", "author_id,text"),
            ("user.fields", USER_FIELDS),
        ];
        if let Some(next) = next_token {
            params.push(("next_token", next));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<SearchResponseWire>().await?)
    }
}

#[async_trait]
impl ProfileSearchApi for XSearchClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<RawProfile>, SourceError> {
        let token = self.bearer_token.as_deref().ok_or(SourceError::NotConfigured)?;

        let mut profiles = Vec::new();
        let mut next_token: Option<String> = None;

        for page in 0..MAX_PAGES {
            let remaining = max_results.saturating_sub(profiles.len() as u32);
            if remaining == 0 {
                break;
            }
            let page_size = remaining.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);

            let body = match self
                .fetch_page(token, query, page_size, next_token.as_deref())
                .await
            {
                Ok(body) => body,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    warn!(
                        "Search page {} failed, keeping {} profiles from earlier pages: {e}",
                        page + 1,
                        profiles.len()
                    );
                    break;
                }
            };
            next_token = body.meta.as_ref().and_then(|m| m.next_token.clone());

            let page_profiles = profiles_from_page(body);
            debug!("Search page {} yielded {} authors", page + 1, page_profiles.len());
            profiles.extend(page_profiles);

            if next_token.is_none() {
                break;
            }
        }

        Ok(profiles)
    }
}

/// Joins posts to their expanded authors. Authors appear in order of their
/// first post on the page; authors with no post on the page are kept last.
fn profiles_from_page(body: SearchResponseWire) -> Vec<RawProfile> {
    let mut first_post: HashMap<&str, &str> = HashMap::new();
    let mut author_order: Vec<&str> = Vec::new();
    for post in &body.data {
        if let Some(author) = post.author_id.as_deref() {
            if let Entry::Vacant(slot) = first_post.entry(author) {
                slot.insert(post.text.as_str());
                author_order.push(author);
            }
        }
    }

    let users = body.includes.map(|i| i.users).unwrap_or_default();
    let mut by_id: HashMap<&str, &UserWire> = users.iter().map(|u| (u.id.as_str(), u)).collect();

    let mut ordered: Vec<&UserWire> = author_order
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect();
    ordered.extend(users.iter().filter(|u| by_id.contains_key(u.id.as_str())));

    ordered
        .into_iter()
        .map(|user| {
            let metrics = user.public_metrics.as_ref();
            RawProfile {
                external_id: user.id.clone(),
                handle: user.username.clone(),
                display_name: user.name.clone().unwrap_or_else(|| user.username.clone()),
                bio: user.description.clone(),
                follower_count: metrics.map(|m| m.followers_count).unwrap_or(0),
                following_count: metrics.map(|m| m.following_count).unwrap_or(0),
                avatar_url: user.profile_image_url.clone(),
                banner_url: user.profile_banner_url.clone(),
                recent_activity_text: snippet(
                    first_post.get(user.id.as_str()).copied().unwrap_or_default(),
                ),
            }
        })
        .collect()
}

fn snippet(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > ACTIVITY_SNIPPET_CHARS {
        let cut: String = text.chars().take(ACTIVITY_SNIPPET_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
