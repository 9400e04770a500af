//! Immutable run options

use std::fmt;
use std::str::FromStr;

/// Ordering the current metric must satisfy relative to the base metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    LessThan,
    LessEqual,
    Equal,
    GreaterEqual,
    GreaterThan,
}

impl Comparison {
    pub const ALL: [Comparison; 5] = [
        Self::LessThan,
        Self::LessEqual,
        Self::Equal,
        Self::GreaterEqual,
        Self::GreaterThan,
    ];

    /// Whether `current` satisfies the relation against `base`.
    pub fn holds(self, current: f64, base: f64) -> bool {
        match self {
            Self::LessThan => current < base,
            Self::LessEqual => current <= base,
            Self::Equal => current == base,
            Self::GreaterEqual => current >= base,
            Self::GreaterThan => current > base,
        }
    }

    /// Phrase used in verdict lines: "is less than", "is NOT equal to"
    pub fn phrase(self) -> &'static str {
        match self {
            Self::LessThan => "less than",
            Self::LessEqual => "less than or equal to",
            Self::Equal => "equal to",
            Self::GreaterEqual => "greater than or equal to",
            Self::GreaterThan => "greater than",
        }
    }

    /// Short flag / config key: `lt`, `le`, `eq`, `ge`, `gt`
    pub fn key(self) -> &'static str {
        match self {
            Self::LessThan => "lt",
            Self::LessEqual => "le",
            Self::Equal => "eq",
            Self::GreaterEqual => "ge",
            Self::GreaterThan => "gt",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LessThan => "less-than",
            Self::LessEqual => "less-equal",
            Self::Equal => "equal-to",
            Self::GreaterEqual => "greater-equal",
            Self::GreaterThan => "greater-than",
        };
        f.write_str(name)
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| format!("unknown comparison '{s}' (expected lt, le, eq, ge or gt)"))
    }
}

/// A comparison together with the base ref it is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseComparison {
    pub comparison: Comparison,
    pub base_ref: String,
}

/// Validated options for one ratchet run.
///
/// Built once (from config file and flags) and passed by reference; nothing
/// inside the engine reads global configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub metric: String,
    pub pre: Option<String>,
    pub post: Option<String>,
    /// `None` reports the current metric without comparing
    pub compare: Option<BaseComparison>,
    pub verbose: bool,
}

impl Options {
    /// Report-only options for `metric`
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            pre: None,
            post: None,
            compare: None,
            verbose: false,
        }
    }

    pub fn with_pre(mut self, pre: impl Into<String>) -> Self {
        self.pre = Some(pre.into());
        self
    }

    pub fn with_post(mut self, post: impl Into<String>) -> Self {
        self.post = Some(post.into());
        self
    }

    pub fn compare_to(mut self, comparison: Comparison, base_ref: impl Into<String>) -> Self {
        self.compare = Some(BaseComparison {
            comparison,
            base_ref: base_ref.into(),
        });
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn base_ref(&self) -> Option<&str> {
        self.compare.as_ref().map(|c| c.base_ref.as_str())
    }
}
