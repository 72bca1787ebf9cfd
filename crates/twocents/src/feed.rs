//! # Feed
//!
//! Cursor paging over a group's posts and grouping of posts by day.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::PostWithMedia;

/// Pages through a group feed, newest first.
///
/// The server's cursor is the id of the last post on the previous page and
/// pages may overlap on it, so posts already seen are dropped.
pub struct FeedPager<'a> {
    client: &'a ApiClient,
    group_id: Uuid,
    posts: Vec<PostWithMedia>,
    seen: HashSet<Uuid>,
    cursor: Option<Uuid>,
    has_more: bool,
    loaded: bool,
}

impl<'a> FeedPager<'a> {
    pub fn new(client: &'a ApiClient, group_id: Uuid) -> Self {
        Self {
            client,
            group_id,
            posts: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            has_more: false,
            loaded: false,
        }
    }

    /// Load the first page, discarding anything loaded before
    pub async fn load_initial(&mut self) -> Result<&[PostWithMedia]> {
        let page = self.client.get_group_posts(self.group_id, None).await?;

        self.posts.clear();
        self.seen.clear();
        self.loaded = true;
        self.cursor = page.next_cursor();
        self.has_more = page.has_more;
        let start = self.append(page.posts);

        debug!(
            group = %self.group_id,
            count = self.posts.len(),
            has_more = self.has_more,
            "Loaded feed"
        );
        Ok(&self.posts[start..])
    }

    /// Load the next page; returns only the newly added posts, empty when
    /// there is nothing more.
    pub async fn load_more(&mut self) -> Result<&[PostWithMedia]> {
        let Some(cursor) = self.cursor.filter(|_| self.can_load_more()) else {
            return Ok(&[]);
        };

        let page = self.client.get_group_posts(self.group_id, Some(cursor)).await?;
        self.cursor = page.next_cursor();
        self.has_more = page.has_more && self.cursor.is_some_and(|c| c != cursor);
        let start = self.append(page.posts);

        debug!(group = %self.group_id, added = self.posts.len() - start, "Loaded more posts");
        Ok(&self.posts[start..])
    }

    pub fn can_load_more(&self) -> bool {
        self.loaded && self.has_more && self.cursor.is_some()
    }

    pub fn posts(&self) -> &[PostWithMedia] {
        &self.posts
    }

    pub fn into_posts(self) -> Vec<PostWithMedia> {
        self.posts
    }

    fn append(&mut self, posts: Vec<PostWithMedia>) -> usize {
        let start = self.posts.len();
        for item in posts {
            if self.seen.insert(item.post.id) {
                self.posts.push(item);
            }
        }
        start
    }
}

/// Posts created on one UTC calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub day: NaiveDate,
    pub posts: Vec<PostWithMedia>,
}

/// Buckets posts by UTC day, newest day first and newest post first within a day
pub fn group_by_day(posts: &[PostWithMedia]) -> Vec<DayBucket> {
    let mut days: BTreeMap<NaiveDate, Vec<PostWithMedia>> = BTreeMap::new();
    for item in posts {
        days.entry(item.post.date_created.date_naive())
            .or_default()
            .push(item.clone());
    }

    days.into_iter()
        .rev()
        .map(|(day, mut posts)| {
            posts.sort_by(|a, b| b.post.date_created.cmp(&a.post.date_created));
            DayBucket { day, posts }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{BASE, client};
    use crate::models::{Media, MediaPayload, Post};
    use crate::test_support::{ScriptedTransport, response};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn item(n: u128, day: u32, hour: u32) -> PostWithMedia {
        PostWithMedia {
            post: Post {
                id: Uuid::from_u128(n),
                user_id: Uuid::nil(),
                media: Media::Text,
                date_created: Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
                caption: None,
            },
            media: MediaPayload::Text(vec![]),
        }
    }

    fn page(items: &[PostWithMedia], offset: Option<Uuid>, has_more: bool) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "posts": items,
            "offset": offset.unwrap_or_else(Uuid::nil),
            "hasMore": has_more,
        }))
        .unwrap()
    }

    #[test]
    fn test_group_by_day_orders_newest_first() {
        let posts = vec![item(1, 1, 9), item(2, 2, 8), item(3, 1, 18), item(4, 2, 20)];
        let buckets = group_by_day(&posts);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].day, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        let ids: Vec<_> = buckets[0].posts.iter().map(|p| p.post.id.as_u128()).collect();
        assert_eq!(ids, [4, 2]);
        let ids: Vec<_> = buckets[1].posts.iter().map(|p| p.post.id.as_u128()).collect();
        assert_eq!(ids, [3, 1]);
    }

    #[tokio::test]
    async fn test_pager_follows_cursor_and_drops_overlap() {
        let group = Uuid::from_u128(99);
        let transport = ScriptedTransport::new();
        transport.respond(
            &format!("{BASE}post/get-group-posts?groupId={group}"),
            response(
                200,
                &[],
                &page(&[item(5, 3, 12), item(4, 3, 11)], Some(Uuid::from_u128(4)), true),
            ),
        );
        transport.respond(
            &format!("{BASE}post/get-group-posts?groupId={group}&offset={}", Uuid::from_u128(4)),
            response(200, &[], &page(&[item(4, 3, 11), item(3, 2, 10)], None, false)),
        );
        let client = client(transport.clone());

        let mut pager = FeedPager::new(&client, group);
        assert!(!pager.can_load_more());
        assert_eq!(pager.load_initial().await.unwrap().len(), 2);
        assert!(pager.can_load_more());

        let added = pager.load_more().await.unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].post.id, Uuid::from_u128(3));
        assert!(!pager.can_load_more());

        assert!(pager.load_more().await.unwrap().is_empty());
        assert_eq!(transport.request_count(), 2);
        assert_eq!(pager.posts().len(), 3);
    }
}
