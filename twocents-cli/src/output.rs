use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use twocents_client::{
    CacheUsage, CachedMedia, DayBucket, FriendGroup, GroupMember, MediaPayload, PostWithMedia,
    ResolvedMedia, SweepReport, User,
};

pub struct OutputManager {
    format: OutputFormat,
}

impl OutputManager {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Renders `value` as JSON, or with `pretty` in human-readable mode
    fn render<T, F>(&self, value: &T, pretty: F) -> Result<String>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&mut String),
    {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(value).context("Failed to serialize output")
            }
            OutputFormat::Pretty => {
                let mut out = String::new();
                pretty(&mut out);
                Ok(out.trim_end().to_string())
            }
        }
    }

    pub fn format_user(&self, user: &User) -> Result<String> {
        self.render(user, |out| {
            let _ = writeln!(out, "{} (@{})", user.display_name(), user.username);
            let _ = writeln!(out, "  id: {}", user.user_id);
            if let Some(pic) = &user.profile_pic {
                let _ = writeln!(out, "  picture: {pic}");
            }
        })
    }

    pub fn format_groups(&self, groups: &[FriendGroup]) -> Result<String> {
        self.render(groups, |out| {
            if groups.is_empty() {
                out.push_str("No groups\n");
            }
            for group in groups {
                let _ = writeln!(
                    out,
                    "{}  {}  (created {})",
                    group.id,
                    group.name,
                    group.date_created.format("%Y-%m-%d")
                );
            }
        })
    }

    pub fn format_members(&self, members: &[GroupMember]) -> Result<String> {
        self.render(members, |out| {
            for member in members {
                let role = if member.is_admin() { "admin" } else { "member" };
                let _ = writeln!(
                    out,
                    "{:<24} {:<8} joined {}",
                    member.user.display_name(),
                    role,
                    member.member.joined_at.format("%Y-%m-%d")
                );
            }
        })
    }

    pub fn format_feed(&self, days: &[DayBucket]) -> Result<String> {
        self.render(days, |out| {
            if days.is_empty() {
                out.push_str("No posts\n");
            }
            for bucket in days {
                let _ = writeln!(out, "{}", bucket.day.format("%A, %B %-d %Y"));
                for post in &bucket.posts {
                    write_post(out, post, "  ");
                }
            }
        })
    }

    pub fn format_post(&self, post: &PostWithMedia) -> Result<String> {
        self.render(post, |out| write_post(out, post, ""))
    }

    pub fn format_resolved(&self, items: &[ResolvedMedia]) -> Result<String> {
        self.render(items, |out| {
            for item in items {
                match item {
                    ResolvedMedia::Image { id, path } | ResolvedMedia::Video { id, path } => {
                        let _ = writeln!(out, "{id}  {}", path.display());
                    }
                    ResolvedMedia::Link { id, metadata } => {
                        let title = metadata.title.as_deref().unwrap_or(&metadata.url);
                        let _ = writeln!(out, "{id}  {title}");
                    }
                    ResolvedMedia::Text { id, text } => {
                        let _ = writeln!(out, "{id}  \"{text}\"");
                    }
                }
            }
        })
    }

    pub fn format_cached(&self, media: &CachedMedia) -> Result<String> {
        let value = serde_json::json!({
            "path": media.path,
            "status": format!("{:?}", media.status).to_lowercase(),
        });
        self.render(&value, |out| {
            let _ = writeln!(
                out,
                "{} ({:?})",
                media.path.display(),
                media.status
            );
        })
    }

    pub fn format_usage(&self, dir: &Path, usage: &CacheUsage) -> Result<String> {
        let value = serde_json::json!({
            "directory": dir,
            "entries": usage.entries,
            "totalBytes": usage.total_bytes,
        });
        self.render(&value, |out| {
            let _ = writeln!(out, "Cache directory: {}", dir.display());
            let _ = writeln!(out, "Entries: {}", usage.entries);
            let _ = writeln!(out, "Size: {}", human_bytes(usage.total_bytes));
        })
    }

    pub fn format_sweep(&self, report: &SweepReport) -> Result<String> {
        let value = serde_json::json!({
            "scanned": report.scanned,
            "expired": report.expired,
            "evicted": report.evicted,
            "freedBytes": report.freed_bytes,
            "remainingBytes": report.remaining_bytes,
        });
        self.render(&value, |out| {
            let _ = writeln!(
                out,
                "Removed {} of {} files ({} expired, {} over size), freed {}, {} remaining",
                report.removed(),
                report.scanned,
                report.expired,
                report.evicted,
                human_bytes(report.freed_bytes),
                human_bytes(report.remaining_bytes)
            );
        })
    }
}

fn write_post(out: &mut String, item: &PostWithMedia, indent: &str) {
    let post = &item.post;
    let _ = write!(
        out,
        "{indent}{} [{}] {}",
        post.date_created.format("%H:%M"),
        post.media,
        post.id
    );
    if let Some(caption) = &post.caption {
        let _ = write!(out, " - {caption}");
    }
    out.push('\n');

    match &item.media {
        MediaPayload::Image(records) => {
            for record in records {
                let _ = writeln!(out, "{indent}    {}", record.media_url);
            }
        }
        MediaPayload::Video(records) => {
            for record in records {
                let _ = writeln!(out, "{indent}    {}", record.media_url);
            }
        }
        MediaPayload::Link(records) => {
            for record in records {
                let _ = writeln!(out, "{indent}    {}", record.media_url);
            }
        }
        MediaPayload::Text(records) => {
            for record in records {
                let _ = writeln!(out, "{indent}    \"{}\"", record.text);
            }
        }
        MediaPayload::Other => {}
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use twocents_client::{Media, Post, TextDownload};
    use uuid::Uuid;

    fn text_post() -> PostWithMedia {
        let id = Uuid::from_u128(7);
        PostWithMedia {
            post: Post {
                id,
                user_id: Uuid::nil(),
                media: Media::Text,
                date_created: Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
                caption: Some("morning".into()),
            },
            media: MediaPayload::Text(vec![TextDownload {
                id: Uuid::from_u128(8),
                post_id: id,
                text: "coffee first".into(),
            }]),
        }
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(1536), "1.5 KB");
        assert_eq!(human_bytes(500 * 1024 * 1024), "500.0 MB");
    }

    #[test]
    fn test_pretty_post_lists_text() {
        let output = OutputManager::new(OutputFormat::Pretty)
            .format_post(&text_post())
            .unwrap();
        assert!(output.starts_with("09:30 [TEXT]"));
        assert!(output.contains("- morning"));
        assert!(output.ends_with("\"coffee first\""));
    }

    #[test]
    fn test_json_post_is_camel_case() {
        let output = OutputManager::new(OutputFormat::Json)
            .format_post(&text_post())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["post"]["media"], "TEXT");
        assert_eq!(value["media"][0]["text"], "coffee first");
    }
}
