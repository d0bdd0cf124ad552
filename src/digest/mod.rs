pub mod types;

pub use types::{DigestStyle, ReviewActivity, UrgencyThresholds};

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

use crate::pr::PullRequest;

pub const CHANGES_REQUESTED_LINE: &str =
    " :changes_requested: Changes requested, completion may take some time.\n";

/// `"1 day"`, `"3 days"`, `"1 dismissed approval"`...
pub(crate) fn plural(count: i64, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Render elapsed time as days, hours or minutes, with an urgency marker
/// once the day count crosses `thresholds`. Negative durations count as zero.
pub fn relative_age(elapsed: Duration, thresholds: &UrgencyThresholds) -> String {
    let elapsed = elapsed.max(Duration::zero());

    let days = elapsed.num_days();
    if days >= 1 {
        let mut text = format!("{} ago", plural(days, "day"));
        if let Some(urgency) = thresholds.classify(days) {
            text.push(' ');
            text.push_str(urgency.marker());
        }
        return text;
    }

    let hours = elapsed.num_hours();
    if hours >= 1 {
        return format!("{} ago", plural(hours, "hour"));
    }

    format!("{} ago", plural(elapsed.num_minutes(), "minute"))
}

/// Render one pull request as a digest paragraph, including its trailing
/// blank line.
pub fn format_block(pr: &PullRequest, now: DateTime<Utc>, style: &DigestStyle) -> String {
    let age = relative_age(now - pr.created_at, &style.thresholds);
    let activity = ReviewActivity::tally(&pr.reviews);

    let mut block = String::new();
    block.push_str(&format!(" Repository: {}.", pr.repository));
    block.push_str(&format!(" Pull: {}.\n", pr.title));
    block.push_str(&format!(" URL: {}.\n", pr.url));

    if style.include_activity && activity.changes_requested > 0 {
        block.push_str(CHANGES_REQUESTED_LINE);
    }

    block.push_str(&format!(" Author: {}. Created: {}\n", pr.author, age));

    if pr.review_request_count > 0 {
        block.push_str(&format!(" Reviewers: {} pending.\n", pr.review_request_count));
    } else {
        block.push_str(" No pending reviewers.\n");
    }

    if style.include_activity {
        if let Some(summary) = activity.summary() {
            block.push_str(&format!(" Activity: {summary}.\n"));
        }
    }

    block.push('\n');
    block
}

/// Build the digest for every pull request outside `skip_repositories`, in
/// the order given. An empty string means there is nothing to report.
#[instrument(skip_all, fields(pull_requests = pull_requests.len(), skipped_repositories = skip_repositories.len()))]
pub fn format_digest(
    pull_requests: &[PullRequest],
    skip_repositories: &HashSet<String>,
    now: DateTime<Utc>,
    style: &DigestStyle,
) -> String {
    let mut digest = String::new();
    let mut included = 0usize;

    for pr in pull_requests {
        if skip_repositories.contains(&pr.repository) {
            debug!(repository = %pr.repository, url = %pr.url, "skipping pull request from skip-listed repository");
            continue;
        }
        digest.push_str(&format_block(pr, now, style));
        included += 1;
    }

    debug!(included, digest_bytes = digest.len(), "digest formatted");
    digest
}
