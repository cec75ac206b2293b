//! Provider-agnostic pagination cursor and rate-limit snapshot.

/// Opaque continuation token. Each provider fills this from whatever it
/// natively uses (GitHub's `Link: rel="next"` URL, GitLab's `page` query
/// param, Bitbucket's `next` body field) so callers never branch on
/// provider kind to keep paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(pub String);

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

/// Snapshot of a provider's rate-limit headers, read opportunistically so
/// the stager can pace itself before hitting 429.
#[derive(Debug, Clone, Default)]
pub struct RateLimitSnapshot {
    pub remaining: Option<u32>,
    pub limit: Option<u32>,
    pub retry_after_secs: Option<u64>,
}

pub fn parse_retry_after(header: Option<&str>) -> Option<u64> {
    header.and_then(|v| v.trim().parse::<u64>().ok())
}

pub fn parse_github_link_next(header: Option<&str>) -> Option<PageCursor> {
    let header = header?;
    for part in header.split(',') {
        let mut segs = part.split(';');
        let url = segs.next()?.trim();
        let rel_is_next = segs.any(|s| s.trim() == "rel=\"next\"");
        if rel_is_next {
            let url = url.trim_start_matches('<').trim_end_matches('>');
            return Some(PageCursor(url.to_string()));
        }
    }
    None
}
