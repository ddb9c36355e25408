//! Change feed for realtime invalidation
//!
//! Every mutation publishes a `TableChange`; browsers subscribe over SSE and
//! refetch the affected queries.

use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::broadcast;

use crate::models::Role;

/// Buffered changes per subscriber before it is considered lagging
const FEED_CAPACITY: usize = 256;

/// Tables announced on the change feed
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    Courses,
    Videos,
    Passcodes,
    Enrollments,
    VideoProgress,
    Certificates,
    Payments,
    RevenueRecords,
    PaidWorks,
    WithdrawalRequests,
    SupportTickets,
    EmailThreads,
    EmailMessages,
    TeamMembers,
    Works,
    FooterLinks,
    FooterContent,
    PageContent,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Courses => "courses",
            Table::Videos => "videos",
            Table::Passcodes => "passcodes",
            Table::Enrollments => "enrollments",
            Table::VideoProgress => "video_progress",
            Table::Certificates => "certificates",
            Table::Payments => "payments",
            Table::RevenueRecords => "revenue_records",
            Table::PaidWorks => "paid_works",
            Table::WithdrawalRequests => "withdrawal_requests",
            Table::SupportTickets => "support_tickets",
            Table::EmailThreads => "email_threads",
            Table::EmailMessages => "email_messages",
            Table::TeamMembers => "team_members",
            Table::Works => "works",
            Table::FooterLinks => "footer_links",
            Table::FooterContent => "footer_content",
            Table::PageContent => "page_content",
        }
    }

    /// Whether subscribers with `role` may see changes to this table
    pub fn visible_to(&self, role: Role) -> bool {
        match self {
            Table::EmailThreads | Table::EmailMessages => role == Role::Admin,
            Table::Profiles
            | Table::Passcodes
            | Table::Payments
            | Table::RevenueRecords
            | Table::PaidWorks
            | Table::WithdrawalRequests => role != Role::Student,
            _ => true,
        }
    }
}

/// Kind of row mutation
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// One row mutation announced to subscribers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableChange {
    pub table: Table,
    pub action: ChangeAction,
    pub id: String,
}

/// Broadcast hub for table changes
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<TableChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Announce a change; silently dropped when nobody listens
    pub fn publish(&self, table: Table, action: ChangeAction, id: impl ToString) {
        let change = TableChange {
            table,
            action,
            id: id.to_string(),
        };
        tracing::trace!(table = table.as_str(), ?action, id = %change.id, "table change");
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Table filter requested by a subscriber (`?tables=courses,videos`)
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    tables: Option<HashSet<String>>,
    role: Option<Role>,
}

impl ChangeFilter {
    pub fn parse(tables: Option<&str>) -> Self {
        let tables = tables
            .map(|list| {
                list.split(',')
                    .map(|t| t.trim().to_ascii_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());
        Self { tables, role: None }
    }

    /// Drop tables the subscriber's role may not see
    pub fn for_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn matches(&self, change: &TableChange) -> bool {
        if let Some(role) = self.role {
            if !change.table.visible_to(role) {
                return false;
            }
        }
        self.tables
            .as_ref()
            .map_or(true, |tables| tables.contains(change.table.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(table: Table) -> TableChange {
        TableChange {
            table,
            action: ChangeAction::Insert,
            id: "1".to_string(),
        }
    }

    #[test]
    fn test_filter_all_when_empty() {
        let filter = ChangeFilter::parse(None);
        assert!(filter.matches(&change(Table::Courses)));

        let filter = ChangeFilter::parse(Some(" , "));
        assert!(filter.matches(&change(Table::Works)));
    }

    #[test]
    fn test_filter_named_tables() {
        let filter = ChangeFilter::parse(Some("courses, Video_Progress"));
        assert!(filter.matches(&change(Table::Courses)));
        assert!(filter.matches(&change(Table::VideoProgress)));
        assert!(!filter.matches(&change(Table::Videos)));
    }

    #[test]
    fn test_students_only_see_their_tables() {
        let filter = ChangeFilter::parse(Some("payments,email_messages,courses")).for_role(Role::Student);
        assert!(!filter.matches(&change(Table::Payments)));
        assert!(!filter.matches(&change(Table::EmailMessages)));
        assert!(!filter.matches(&change(Table::WithdrawalRequests)));
        assert!(filter.matches(&change(Table::Courses)));

        let filter = ChangeFilter::parse(None).for_role(Role::Student);
        assert!(filter.matches(&change(Table::Enrollments)));
        assert!(filter.matches(&change(Table::SupportTickets)));
        assert!(!filter.matches(&change(Table::RevenueRecords)));
    }

    #[test]
    fn test_staff_visibility() {
        let teacher = ChangeFilter::parse(None).for_role(Role::Teacher);
        assert!(teacher.matches(&change(Table::WithdrawalRequests)));
        assert!(!teacher.matches(&change(Table::EmailThreads)));

        let admin = ChangeFilter::parse(None).for_role(Role::Admin);
        assert!(admin.matches(&change(Table::EmailMessages)));
        assert!(admin.matches(&change(Table::Payments)));
    }

    #[test]
    fn test_change_serialization() {
        let json = serde_json::to_value(TableChange {
            table: Table::SupportTickets,
            action: ChangeAction::Update,
            id: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(json["table"], "support_tickets");
        assert_eq!(json["action"], "UPDATE");
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        feed.publish(Table::Courses, ChangeAction::Delete, 42);
        let received = tokio_test::block_on(rx.recv()).unwrap();
        assert_eq!(received.table, Table::Courses);
        assert_eq!(received.action, ChangeAction::Delete);
        assert_eq!(received.id, "42");
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let feed = ChangeFeed::new(8);
        feed.publish(Table::Works, ChangeAction::Insert, "x");
        assert_eq!(feed.subscriber_count(), 0);
    }
}
