//! Candidate URL extraction.
//!
//! Loose mode takes everything after `http://` or `https://` up to the next
//! whitespace. Strict mode accepts only absolute `http:` URIs (scheme in any
//! case) built from characters the URI grammar allows, so trailing quotes,
//! brackets and the like are left out.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static LOOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)https?://[^\s]+").unwrap());

static STRICT: LazyLock<Regex> = LazyLock::new(|| {
    let escaped = "%[0-9A-Fa-f]{2}";
    let userinfo = format!(r"(?:[A-Za-z0-9\-_.!~*'();:&=+$,]|{escaped})*@");
    let hostname = r"(?:[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?\.)*[A-Za-z](?:[A-Za-z0-9\-]*[A-Za-z0-9])?\.?";
    let ipv4 = r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}";
    let ipv6 = r"\[[0-9A-Fa-f:.]+\]";
    let pchar = format!(r"(?:[A-Za-z0-9\-_.!~*'():@&=+$,;/]|{escaped})");
    let uric = format!(r"(?:[A-Za-z0-9\-_.!~*'();/?:@&=+$,]|{escaped})");

    Regex::new(&format!(
        r"(?i:http)://(?:{userinfo})?(?:{ipv4}|{ipv6}|{hostname})(?::\d*)?(?:/{pchar}*)?(?:\?{uric}*)?(?:#{uric}*)?"
    ))
    .unwrap()
});

/// Lazily extract candidate URLs from `text`, left to right.
///
/// Duplicates are yielded once per occurrence. The iterator is cheap to
/// clone, and a clone restarts from wherever the original was.
///
/// # Example
///
/// ```
/// use oembed_links::transform::extract_candidate_urls;
///
/// let text = "see http://vimeo.com/1, and \"http://t.net/x\"";
/// let loose: Vec<_> = extract_candidate_urls(text, false).collect();
/// assert_eq!(loose, vec!["http://vimeo.com/1,", "http://t.net/x\""]);
///
/// let strict: Vec<_> = extract_candidate_urls(text, true).collect();
/// assert_eq!(strict, vec!["http://vimeo.com/1,", "http://t.net/x"]);
/// ```
pub fn extract_candidate_urls(text: &str, strict: bool) -> CandidateUrls<'_> {
    CandidateUrls {
        text,
        pattern: if strict { &*STRICT } else { &*LOOSE },
        position: 0,
    }
}

/// Iterator over candidate URLs in a piece of text.
#[derive(Debug, Clone)]
pub struct CandidateUrls<'t> {
    text: &'t str,
    pattern: &'static Regex,
    position: usize,
}

impl<'t> CandidateUrls<'t> {
    /// Yield each candidate together with its byte range in the text.
    pub fn spans(self) -> impl Iterator<Item = (Range<usize>, &'t str)> {
        let CandidateUrls {
            text,
            pattern,
            mut position,
        } = self;
        std::iter::from_fn(move || {
            let found = pattern.find_at(text, position)?;
            position = found.end();
            Some((found.range(), found.as_str()))
        })
    }
}

impl<'t> Iterator for CandidateUrls<'t> {
    type Item = &'t str;

    fn next(&mut self) -> Option<Self::Item> {
        let found = self.pattern.find_at(self.text, self.position)?;
        self.position = found.end();
        Some(found.as_str())
    }
}
