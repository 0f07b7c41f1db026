//! Static lookup tables used by query understanding and normalization.
//!
//! Everything here is compile-time data. Query enhancement and topic
//! inference are pure functions of their input and these tables.

/// Synonym expansion: a lowercase term (or phrase) and the terms it expands to.
pub const SYNONYMS: &[(&str, &[&str])] = &[
    // countries: demonym + major cities
    ("usa", &["american", "washington", "new york"]),
    ("united states", &["american", "washington", "new york"]),
    ("america", &["american", "washington"]),
    ("uk", &["british", "london", "westminster"]),
    ("united kingdom", &["british", "london", "westminster"]),
    ("canada", &["canadian", "ottawa", "toronto"]),
    ("mexico", &["mexican", "mexico city"]),
    ("france", &["french", "paris"]),
    ("germany", &["german", "berlin"]),
    ("india", &["indian", "delhi", "mumbai"]),
    ("china", &["chinese", "beijing", "shanghai"]),
    ("japan", &["japanese", "tokyo"]),
    ("brazil", &["brazilian", "brasilia", "sao paulo"]),
    ("ukraine", &["ukrainian", "kyiv"]),
    ("russia", &["russian", "moscow"]),
    ("australia", &["australian", "canberra", "sydney"]),
    // civic vocabulary
    ("congress", &["senate", "house of representatives", "capitol"]),
    ("senate", &["congress", "senator"]),
    ("election", &["vote", "ballot", "polls", "campaign"]),
    ("elections", &["vote", "ballot", "polls", "campaign"]),
    ("supreme court", &["scotus", "justices", "ruling"]),
    ("scotus", &["supreme court", "justices"]),
    ("climate", &["climate change", "emissions", "environment"]),
    ("healthcare", &["health care", "medicare", "medicaid"]),
    ("immigration", &["border", "asylum", "migrants"]),
    ("economy", &["inflation", "jobs", "budget"]),
    ("budget", &["spending", "appropriations", "deficit"]),
];

/// Frequently searched queries offered as completions.
pub const POPULAR_QUERIES: &[&str] = &[
    "congress hearing",
    "congress live",
    "senate debate",
    "supreme court ruling",
    "election results",
    "election polls",
    "state of the union",
    "city council meeting",
    "climate policy",
    "healthcare reform",
    "immigration bill",
    "budget negotiations",
    "town hall",
    "press briefing",
    "foreign policy",
];

/// A discoverable topic: stable id, display label, and matching keywords.
#[derive(Debug, Clone, Copy)]
pub struct Topic {
    pub id: &'static str,
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

/// Topic catalog, in priority order. `infer_topics` returns matches in this
/// order, so earlier topics win the dominant-topic slot.
pub const TOPIC_CATALOG: &[Topic] = &[
    Topic {
        id: "congress",
        label: "Congress",
        keywords: &["congress", "senate", "senator", "house of representatives", "capitol", "lawmakers"],
    },
    Topic {
        id: "elections",
        label: "Elections",
        keywords: &["election", "elections", "ballot", "vote", "voting", "polls", "campaign"],
    },
    Topic {
        id: "supreme-court",
        label: "Supreme Court",
        keywords: &["supreme court", "scotus", "justices", "ruling"],
    },
    Topic {
        id: "climate",
        label: "Climate",
        keywords: &["climate", "emissions", "environment", "renewable"],
    },
    Topic {
        id: "healthcare",
        label: "Healthcare",
        keywords: &["healthcare", "health care", "medicare", "medicaid", "insurance"],
    },
    Topic {
        id: "immigration",
        label: "Immigration",
        keywords: &["immigration", "border", "asylum", "migrants", "visa"],
    },
    Topic {
        id: "economy",
        label: "Economy",
        keywords: &["economy", "inflation", "jobs", "budget", "deficit", "tax"],
    },
    Topic {
        id: "education",
        label: "Education",
        keywords: &["education", "school", "schools", "teachers", "students"],
    },
    Topic {
        id: "foreign-policy",
        label: "Foreign Policy",
        keywords: &["foreign policy", "diplomacy", "sanctions", "treaty", "nato"],
    },
    Topic {
        id: "local-government",
        label: "Local Government",
        keywords: &["city council", "mayor", "county", "town hall", "zoning"],
    },
];

/// Names of filters a user can type, offered as completions.
pub const FILTER_NAMES: &[&str] = &[
    "live",
    "recent",
    "newest",
    "trending",
    "popular",
    "short",
    "long",
    "subtitles",
];

pub const LIVE_TOKENS: &[&str] = &["live", "livestream", "streaming"];
pub const RECENT_TOKENS: &[&str] = &["recent", "newest", "latest"];
pub const TRENDING_TOKENS: &[&str] = &["trending", "viral"];
pub const POPULAR_TOKENS: &[&str] = &["popular"];
pub const SHORT_TOKENS: &[&str] = &["short"];
pub const LONG_TOKENS: &[&str] = &["long"];
pub const SUBTITLE_TOKENS: &[&str] = &["subtitles", "captions", "subtitled"];
pub const EXPLORE_TOKENS: &[&str] = &["explore", "discover", "browse"];

/// Upper bound of a "short" video, in seconds.
pub const SHORT_MAX_SECONDS: u64 = 240;
/// Lower bound of a "long" video, in seconds.
pub const LONG_MIN_SECONDS: u64 = 1200;

pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "has", "have",
    "had", "not", "but", "you", "your", "our", "their", "they", "his", "her", "its", "will",
    "would", "can", "could", "should", "about", "into", "over", "after", "before", "than",
    "then", "them", "what", "when", "where", "which", "who", "why", "how", "all", "any", "more",
    "most", "some", "such", "only", "own", "same", "very", "just", "also", "here", "there",
    "watch", "video", "videos", "new", "today", "full",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

pub fn synonyms_for(term: &str) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == term)
        .map(|(_, expansions)| *expansions)
        .unwrap_or(&[])
}
