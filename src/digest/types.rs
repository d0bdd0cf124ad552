use crate::pr::{QueryStrategy, Review, ReviewState};

/// Age-based urgency marker appended to the creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Warning,
    Alert,
}

impl Urgency {
    pub fn marker(self) -> &'static str {
        match self {
            Urgency::Warning => ":warning:",
            Urgency::Alert => ":fire:",
        }
    }
}

/// Day thresholds for urgency markers.
///
/// A pull request is a warning when `warning_after_days < days < alert_from_days`
/// and an alert when `days >= alert_from_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrgencyThresholds {
    pub warning_after_days: i64,
    pub alert_from_days: i64,
}

impl UrgencyThresholds {
    pub const SEARCH: UrgencyThresholds = UrgencyThresholds {
        warning_after_days: 3,
        alert_from_days: 6,
    };

    pub const REPOSITORIES: UrgencyThresholds = UrgencyThresholds {
        warning_after_days: 2,
        alert_from_days: 5,
    };

    pub fn classify(&self, days: i64) -> Option<Urgency> {
        if days >= self.alert_from_days {
            Some(Urgency::Alert)
        } else if days > self.warning_after_days {
            Some(Urgency::Warning)
        } else {
            None
        }
    }
}

/// How each pull request block is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestStyle {
    pub thresholds: UrgencyThresholds,
    /// Render the changes-requested warning and the `Activity:` line
    pub include_activity: bool,
}

impl DigestStyle {
    pub fn for_strategy(strategy: QueryStrategy) -> DigestStyle {
        match strategy {
            QueryStrategy::Search => DigestStyle {
                thresholds: UrgencyThresholds::SEARCH,
                include_activity: true,
            },
            QueryStrategy::Repositories => DigestStyle {
                thresholds: UrgencyThresholds::REPOSITORIES,
                include_activity: false,
            },
        }
    }
}

/// Review states tallied per pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewActivity {
    pub approved: u32,
    pub changes_requested: u32,
    pub commented: u32,
    pub dismissed: u32,
    pub pending: u32,
}

impl ReviewActivity {
    pub fn tally(reviews: &[Review]) -> ReviewActivity {
        let mut activity = ReviewActivity::default();
        for review in reviews {
            match review.state {
                ReviewState::Approved => activity.approved += 1,
                ReviewState::ChangesRequested => activity.changes_requested += 1,
                ReviewState::Commented => activity.commented += 1,
                ReviewState::Dismissed => activity.dismissed += 1,
                ReviewState::Pending => activity.pending += 1,
                ReviewState::Unknown => {}
            }
        }
        activity
    }

    /// Comma-joined approvals, comments and dismissed approvals, or `None`
    /// when all three are zero.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<String> = [
            (self.approved, "approval"),
            (self.commented, "comment"),
            (self.dismissed, "dismissed approval"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, noun)| super::plural(i64::from(count), noun))
        .collect();

        (!parts.is_empty()).then(|| parts.join(", "))
    }
}
