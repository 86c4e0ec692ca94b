//! Notification grouping and link validation.

use chrono::{DateTime, Duration, Utc};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Comment,
    Reply,
    Mention,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

/// Recency buckets, evaluated in fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Unread,
    Today,
    ThisWeek,
    Earlier,
}

impl Bucket {
    pub fn label(self) -> &'static str {
        match self {
            Bucket::Unread => "Unread",
            Bucket::Today => "Today",
            Bucket::ThisWeek => "This Week",
            Bucket::Earlier => "Earlier",
        }
    }
}

const BUCKET_ORDER: [Bucket; 4] = [Bucket::Unread, Bucket::Today, Bucket::ThisWeek, Bucket::Earlier];

/// Partitions notifications into recency buckets.
///
/// Unread items land in `Unread` regardless of age. The remaining read items
/// split into `Today` (same calendar date as `now`), `ThisWeek` (within the
/// last 7 days, before today) and `Earlier`. Every notification lands in
/// exactly one bucket; empty buckets are omitted from the result.
pub fn group_notifications(
    notifications: &[Notification],
    now: DateTime<Utc>,
) -> Vec<(Bucket, Vec<Notification>)> {
    let today = now.date_naive();
    let week_ago = now - Duration::days(7);

    let mut groups: Vec<(Bucket, Vec<Notification>)> = BUCKET_ORDER
        .iter()
        .map(|bucket| (*bucket, Vec::new()))
        .collect();

    for notification in notifications {
        let bucket = if !notification.read {
            Bucket::Unread
        } else if notification.created_at.date_naive() == today {
            Bucket::Today
        } else if notification.created_at >= week_ago {
            Bucket::ThisWeek
        } else {
            Bucket::Earlier
        };
        let slot = groups
            .iter_mut()
            .find(|(candidate, _)| *candidate == bucket)
            .expect("bucket present in order table");
        slot.1.push(notification.clone());
    }

    groups.retain(|(_, members)| !members.is_empty());
    groups
}

/// Navigation target derived from a notification link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigate {
    /// Client-side route within the application shell.
    Internal(String),
    /// Absolute `http`/`https` URL.
    External(String),
}

/// Validates a notification link before it is allowed to navigate.
///
/// Relative paths route internally. Absolute URLs must use `http` or `https`;
/// any other scheme is rejected, a guard against link-based injection from
/// untrusted notification payloads.
pub fn validate_link(link: &str) -> Option<Navigate> {
    if link.starts_with('/') {
        return Some(Navigate::Internal(link.to_string()));
    }
    match Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Some(Navigate::External(url.to_string()))
        }
        _ => None,
    }
}
