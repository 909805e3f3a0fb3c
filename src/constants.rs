//! Fixed tuning constants. None of these are runtime-configurable.

/// How many ranked stories are checked against the visited set per run.
pub const TOP_SLICE: usize = 100;

/// Hard cap on extracted article text, in characters.
pub const MAX_CONTENT_LENGTH: usize = 50_000;

/// Upper bound on a posted summary, in characters.
pub const TWEET_MAX_CHARS: usize = 250;

/// Boilerplate regions dropped before text extraction.
pub const SELECTORS_TO_REMOVE: &[&str] = &[
    "script",
    "style",
    "header",
    "footer",
    "nav",
    "iframe",
    "noscript",
    "svg",
    r#"[role="banner"]"#,
    r#"[role="navigation"]"#,
    r#"[role="complementary"]"#,
    ".ad",
    ".advertisement",
    ".social-share",
    "aside",
    ".sidebar",
    "#sidebar",
    ".comments",
    "#comments",
];

/// Regions preferred as the article body, first match in document order wins.
pub const MAIN_CONTENT_SELECTORS: &[&str] = &["main", "article", r#"[role="main"]"#];

// Image style used for the illustrated variant.
pub const IMAGE_MODEL: &str = "V_2";
pub const IMAGE_ASPECT_RATIO: &str = "ASPECT_16_9";
pub const IMAGE_STYLE_TYPE: &str = "DESIGN";
pub const IMAGE_COLOR_PALETTE: &str = "PASTEL";
