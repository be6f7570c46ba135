use chrono::{DateTime, NaiveDate};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Parse a decree date as written in the feed. Returns `None` for anything
/// unrecognized; callers decide whether that deserves a warning.
pub fn parse_feed_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 5, 2);
        assert_eq!(parse_feed_date("2019-05-02"), expected);
        assert_eq!(parse_feed_date(" 02/05/2019 "), expected);
        assert_eq!(parse_feed_date("2019-05-02T10:00:00+03:00"), expected);
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_feed_date("le 2 mai"), None);
        assert_eq!(parse_feed_date("2019-13-45"), None);
        assert_eq!(parse_feed_date(""), None);
    }
}
