//! URL classification against the built-in blocklist.
//!
//! Matching is plain substring containment: the normalized hostname is checked
//! against the domain list and the full lowercased URL against the keyword
//! list. Substring matching over-blocks (`sex.com` also hits `essex.com.au`);
//! that false-positive rate is accepted.

use url::Url;

const BLOCKED_DOMAINS: &[&str] = &[
    "pornhub.com",
    "xvideos.com",
    "xnxx.com",
    "redtube.com",
    "youporn.com",
    "tube8.com",
    "spankbang.com",
    "xhamster.com",
    "pornhd.com",
    "txxx.com",
    "hqporner.com",
    "eporner.com",
    "tnaflix.com",
    "drtuber.com",
    "upornia.com",
    "porn.com",
    "beeg.com",
    "sex.com",
    "xxx.com",
    "hentai.xxx",
    "nhentai.net",
    "hanime.tv",
    "hentaihaven.xxx",
    "fakku.net",
];

const BLOCKED_KEYWORDS: &[&str] = &[
    "porn", "xxx", "sex", "adult", "hentai", "nsfw", "nude", "naked", "erotic", "fetish",
    "camgirl", "webcam", "onlyfans",
];

/// Static classification policy. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct BlockRule {
    domains: Vec<String>,
    keywords: Vec<String>,
}

impl Default for BlockRule {
    fn default() -> Self {
        Self::new(BLOCKED_DOMAINS.iter().copied(), BLOCKED_KEYWORDS.iter().copied())
    }
}

impl BlockRule {
    pub fn new<D, K>(domains: D, keywords: K) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().to_ascii_lowercase())
                .collect(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns `true` when `url` hits a blocked domain or keyword.
    ///
    /// Unparseable input is never blocked.
    pub fn is_blocked(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };

        let hostname = normalize_host(parsed.host_str().unwrap_or_default());
        if self.domains.iter().any(|domain| hostname.contains(domain.as_str())) {
            return true;
        }

        let full_url = url.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| full_url.contains(keyword.as_str()))
    }
}

/// Domain key used for whitelisting and timer records.
///
/// Lowercased with any leading `www.` removed. Falls back to the raw input when
/// it does not parse as a URL.
pub fn page_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => normalize_host(parsed.host_str().unwrap_or_default()),
        Err(_) => url.to_string(),
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}
