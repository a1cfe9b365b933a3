// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! User-facing notification queue with TTL + dedupe.
//!
//! The engine never renders anything; it pushes notifications here (for
//! example when a unit placement is rejected) and whatever front-end is
//! attached drains them.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Informational note.
    Info,
    /// Warning that may need attention.
    Warn,
    /// Error requiring user awareness.
    Error,
}

/// Identifier for a notification entry.
pub type NotificationId = u64;

/// Notification data stored in the service.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Stable identifier.
    pub id: NotificationId,
    /// Severity.
    pub level: NotificationLevel,
    /// Short title line.
    pub title: String,
    /// Optional body text.
    pub message: Option<String>,
    /// Time-to-live duration.
    pub ttl: Duration,
    /// Creation (or last refresh) time.
    pub created: Instant,
}

impl Notification {
    /// True while the notification is within its TTL at `now`.
    pub fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.created) < self.ttl
    }
}

/// In-memory notification queue with TTL and dedupe window.
#[derive(Debug)]
pub struct NotificationService {
    queue: VecDeque<Notification>,
    max: usize,
    ttl: Duration,
    dedupe_window: Duration,
    next_id: NotificationId,
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new(32, Duration::from_secs(10))
    }
}

impl NotificationService {
    /// Create a queue holding at most `max` entries, each living for `ttl`.
    pub fn new(max: usize, ttl: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            max: max.max(1),
            ttl,
            dedupe_window: Duration::from_millis(500),
            next_id: 1,
        }
    }

    /// Push a notification stamped with the current time.
    pub fn add<S, B>(&mut self, level: NotificationLevel, title: S, message: B) -> NotificationId
    where
        S: Into<String>,
        B: Into<Option<String>>,
    {
        self.push_at(level, title, message, Instant::now())
    }

    /// Push a notification, deduping identical recent entries (same
    /// level/title/message within the dedupe window). A duplicate refreshes
    /// the existing entry and returns its id.
    pub fn push_at<S, B>(
        &mut self,
        level: NotificationLevel,
        title: S,
        message: B,
        now: Instant,
    ) -> NotificationId
    where
        S: Into<String>,
        B: Into<Option<String>>,
    {
        let title = title.into();
        let message = message.into();

        if let Some(existing) = self.queue.iter_mut().find(|n| {
            n.level == level
                && n.title == title
                && n.message == message
                && now.duration_since(n.created) <= self.dedupe_window
        }) {
            existing.created = now;
            return existing.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        if self.queue.len() == self.max {
            self.queue.pop_front();
        }
        self.queue.push_back(Notification {
            id,
            level,
            title,
            message,
            ttl: self.ttl,
            created: now,
        });
        id
    }

    /// Drop expired notifications.
    pub fn retain_live(&mut self, now: Instant) {
        self.queue.retain(|n| n.is_live(now));
    }

    /// Notifications still within their TTL, oldest first.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        self.queue.iter().filter(move |n| n.is_live(now))
    }

    /// Most recently pushed notification, regardless of TTL.
    pub fn latest(&self) -> Option<&Notification> {
        self.queue.back()
    }

    /// Number of queued notifications (including expired ones not yet retained).
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
