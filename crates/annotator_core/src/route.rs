use url::Url;

pub const DEFAULT_SUBJECT_MARKER: &str = "/issues/";
pub const DEFAULT_LISTING_INFIX: &str = "map";

/// URL shapes the host application uses for its detail and listing views.
///
/// A subject id is `{marker}` followed by an optional `{infix}/` and one or
/// more ASCII digits, e.g. `/issues/123` or `/issues/map/123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    pub subject_marker: String,
    pub listing_infix: String,
}

impl Default for RoutePattern {
    fn default() -> Self {
        Self {
            subject_marker: DEFAULT_SUBJECT_MARKER.to_string(),
            listing_infix: DEFAULT_LISTING_INFIX.to_string(),
        }
    }
}

/// What the current location asks the overlay to do.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Route {
    pub subject_id: Option<String>,
    pub listing: bool,
}

impl RoutePattern {
    pub fn classify(&self, location: &Url) -> Route {
        let path = location.path();
        Route {
            subject_id: self.extract_subject_id(path).map(str::to_owned),
            listing: self.is_listing(path),
        }
    }

    pub fn is_listing(&self, path: &str) -> bool {
        path.contains(&self.listing_prefix())
    }

    /// Substring every candidate link's `href` must contain.
    pub fn listing_link_marker(&self) -> String {
        format!("{}/", self.listing_prefix())
    }

    /// First subject id embedded anywhere in `text` (a path or a raw href).
    pub fn extract_subject_id<'a>(&self, text: &'a str) -> Option<&'a str> {
        let marker = self.subject_marker.as_str();
        if marker.is_empty() {
            return None;
        }
        let mut from = 0;
        while let Some(offset) = text[from..].find(marker) {
            let start = from + offset;
            let rest = &text[start + marker.len()..];
            let after_infix = rest
                .strip_prefix(self.listing_infix.as_str())
                .and_then(|r| r.strip_prefix('/'));
            if let Some(digits) = after_infix.and_then(leading_digits) {
                return Some(digits);
            }
            if let Some(digits) = leading_digits(rest) {
                return Some(digits);
            }
            // Occurrences may overlap (`/issues/issues/5`), so step one char.
            from = start + marker.chars().next().map_or(1, char::len_utf8);
        }
        None
    }

    fn listing_prefix(&self) -> String {
        format!("{}{}", self.subject_marker, self.listing_infix)
    }
}

fn leading_digits(text: &str) -> Option<&str> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    (end > 0).then(|| &text[..end])
}
