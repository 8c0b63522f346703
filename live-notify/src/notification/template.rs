//! Message template rendering.
//!
//! Supported placeholders:
//!
//! | placeholder                | value                                  |
//! |----------------------------|----------------------------------------|
//! | `{username}`, `{channel}`  | channel display name                   |
//! | `{title}`                  | broadcast title                        |
//! | `{game}`, `{category}`     | category name                          |
//! | `{url}`                    | channel URL                            |
//! | `{started_at}`             | start time in local time, or `Unknown` |
//!
//! Unknown placeholders are left untouched.

use std::fmt::Write;

use chrono::Local;

use crate::domain::{DEFAULT_CATEGORY, DEFAULT_TITLE, StreamSessionState};

const UNKNOWN_TIME: &str = "Unknown";
const FALLBACK_TIME_FORMAT: &str = "%H:%M";

/// Render `template` for `state`.
pub fn render(template: &str, state: &StreamSessionState, time_format: &str) -> String {
    let title = state.title.as_deref().unwrap_or(DEFAULT_TITLE);
    let category = state.category_name.as_deref().unwrap_or(DEFAULT_CATEGORY);
    let started_at = format_started_at(state, time_format);
    let url = state.channel_url();

    template
        .replace("{username}", &state.channel_name)
        .replace("{channel}", &state.channel_name)
        .replace("{title}", title)
        .replace("{game}", category)
        .replace("{category}", category)
        .replace("{url}", &url)
        .replace("{started_at}", &started_at)
}

fn format_started_at(state: &StreamSessionState, time_format: &str) -> String {
    let Some(started_at) = state.started_at else {
        return UNKNOWN_TIME.to_string();
    };
    let local = started_at.with_timezone(&Local);

    let mut out = String::new();
    if write!(out, "{}", local.format(time_format)).is_ok() {
        return out;
    }

    out.clear();
    match write!(out, "{}", local.format(FALLBACK_TIME_FORMAT)) {
        Ok(()) => out,
        Err(_) => UNKNOWN_TIME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::config::DEFAULT_MESSAGE_TEMPLATE;
    use crate::domain::Broadcast;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 18, 5, 0).unwrap()
    }

    fn live_state() -> StreamSessionState {
        let mut state = StreamSessionState::new("Alice", started());
        state.observe(
            Some(&Broadcast {
                id: "s1".to_string(),
                broadcaster_id: "1".to_string(),
                title: Some("Any% speedrun".to_string()),
                category: Some("Celeste".to_string()),
                started_at: Some(started().to_rfc3339()),
            }),
            started(),
        );
        state
    }

    #[test]
    fn test_default_template() {
        let rendered = render(DEFAULT_MESSAGE_TEMPLATE, &live_state(), "%H:%M");
        assert_eq!(
            rendered,
            "Alice is now live!\n\n🎮 Celeste\n📺 Any% speedrun\n🔗 https://twitch.tv/Alice"
        );
    }

    #[test]
    fn test_all_placeholders() {
        let expected_time = started().with_timezone(&Local).format("%H:%M").to_string();
        let rendered = render(
            "{channel}|{category}|{started_at}|{unknown}",
            &live_state(),
            "%H:%M",
        );
        assert_eq!(rendered, format!("Alice|Celeste|{expected_time}|{{unknown}}"));
    }

    #[test]
    fn test_missing_start_time_is_unknown() {
        let state = StreamSessionState::new("bob", started());
        assert_eq!(render("at {started_at}", &state, "%H:%M"), "at Unknown");
        assert_eq!(render("{title} / {game}", &state, "%H:%M"), "Untitled / Unknown");
    }

    #[test]
    fn test_invalid_time_format_falls_back() {
        let expected = started().with_timezone(&Local).format("%H:%M").to_string();
        assert_eq!(render("{started_at}", &live_state(), "%H:%Q"), expected);
    }
}
