use chrono::{DateTime, Local};

/// Whether a remote fetch should be attempted now.
///
/// Privileged sessions always fetch. Otherwise a fetch happens when there is
/// no usable record of a previous one, or when the last one happened on a
/// different local calendar day.
pub fn should_fetch_remote(last_fetch: Option<&str>, privileged: bool) -> bool {
    should_fetch_remote_at(last_fetch, privileged, Local::now())
}

/// `should_fetch_remote` with an explicit clock.
pub fn should_fetch_remote_at(last_fetch: Option<&str>, privileged: bool, now: DateTime<Local>) -> bool {
    if privileged {
        return true;
    }
    let Some(raw) = last_fetch else {
        return true;
    };
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(last) => last.with_timezone(&Local).date_naive() != now.date_naive(),
        // An unreadable stamp is as good as none
        Err(_) => true,
    }
}
