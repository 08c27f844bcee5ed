//! Outbound `Cache-Control` policy.
//!
//! A fixed table maps a resource's content type to a max-age.  HTML is
//! kept short so redeploys show up quickly; fingerprint-stable assets
//! (images, fonts, media, stylesheets, scripts) get a year.  Anything
//! not in the table is `no-cache`.

/// One year, in seconds.
const LONG_MAX_AGE: u64 = 31_536_000;

/// Five minutes, in seconds.
const SHORT_MAX_AGE: u64 = 300;

/// Static (content type, max-age seconds) policy table.
const CACHE_MAX_AGES: &[(&str, u64)] = &[
    ("text/html", SHORT_MAX_AGE),
    ("text/css", LONG_MAX_AGE),
    ("text/xml", LONG_MAX_AGE),
    ("application/javascript", LONG_MAX_AGE),
    ("text/javascript", LONG_MAX_AGE),
    ("image/png", LONG_MAX_AGE),
    ("image/jpeg", LONG_MAX_AGE),
    ("image/gif", LONG_MAX_AGE),
    ("image/svg+xml", LONG_MAX_AGE),
    ("image/webp", LONG_MAX_AGE),
    ("image/x-icon", LONG_MAX_AGE),
    ("font/woff", LONG_MAX_AGE),
    ("font/woff2", LONG_MAX_AGE),
    ("font/ttf", LONG_MAX_AGE),
    ("font/otf", LONG_MAX_AGE),
    ("application/font-woff", LONG_MAX_AGE),
    ("application/vnd.ms-fontobject", LONG_MAX_AGE),
    ("audio/mpeg", LONG_MAX_AGE),
    ("video/mp4", LONG_MAX_AGE),
    ("video/webm", LONG_MAX_AGE),
    ("application/pdf", LONG_MAX_AGE),
];

/// Compute the outbound `Cache-Control` value for a content type.
///
/// Total: content types absent from the table yield `no-cache`.  Any
/// charset parameter on the content type is ignored for the lookup.
pub fn cache_control(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();

    match CACHE_MAX_AGES.iter().find(|(ct, _)| *ct == essence) {
        Some((_, max_age)) => format!("max-age={max_age}"),
        None => "no-cache".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_gets_short_max_age() {
        assert_eq!(cache_control("text/html"), "max-age=300");
    }

    #[test]
    fn assets_get_year_long_max_age() {
        assert_eq!(cache_control("image/png"), "max-age=31536000");
        assert_eq!(cache_control("text/css"), "max-age=31536000");
        assert_eq!(cache_control("font/woff2"), "max-age=31536000");
        assert_eq!(cache_control("video/mp4"), "max-age=31536000");
    }

    #[test]
    fn unknown_types_are_no_cache() {
        assert_eq!(cache_control("application/json"), "no-cache");
        assert_eq!(cache_control("text/plain"), "no-cache");
        assert_eq!(cache_control(""), "no-cache");
    }

    #[test]
    fn charset_parameter_is_ignored() {
        assert_eq!(cache_control("text/html; charset=utf-8"), "max-age=300");
    }

    #[test]
    fn table_lookups_are_deterministic() {
        for (ct, max_age) in CACHE_MAX_AGES {
            let expected = format!("max-age={max_age}");
            assert_eq!(cache_control(ct), expected);
            assert_eq!(cache_control(ct), expected);
        }
    }
}
