//! Header card type policy
//!
//! A [`HeaderPolicy`] is an ordered table of keyword rules. The first
//! rule whose key matches decides how an attribute is written; keywords
//! no rule covers fall back to a value-shape test (see
//! [`classify_value`]).

/// How an attribute becomes a header card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    /// Not written
    Skip,
    /// Integer-valued card, value parsed leniently
    Integer,
    /// String-valued card, value verbatim
    String,
    /// Floating-point card, value parsed leniently
    Float,
    /// COMMENT card holding the value as text
    Comment,
    /// HISTORY card holding the value as text
    History,
}

/// Keyword matcher of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Exact(String),
    Prefix(String),
}

impl KeyMatch {
    pub fn matches(&self, keyword: &str) -> bool {
        match self {
            KeyMatch::Exact(key) => keyword == key,
            KeyMatch::Prefix(prefix) => keyword.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pub key: KeyMatch,
    pub kind: CardKind,
}

impl HeaderRule {
    pub fn exact(key: &str, kind: CardKind) -> Self {
        Self {
            key: KeyMatch::Exact(key.to_string()),
            kind,
        }
    }

    pub fn prefix(prefix: &str, kind: CardKind) -> Self {
        Self {
            key: KeyMatch::Prefix(prefix.to_string()),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPolicy {
    rules: Vec<HeaderRule>,
}

impl Default for HeaderPolicy {
    /// Skips keywords image creation already writes or that only
    /// describe viewer state, types structural keywords as integers and
    /// dates or cell descriptors as strings.
    fn default() -> Self {
        let mut rules = Vec::new();
        for key in ["SIMPLE", "EXTEND", "BLOCKED"] {
            rules.push(HeaderRule::prefix(key, CardKind::Skip));
        }
        for key in ["RMSMEAN", "RENDERINGINIT", "PRESETACTIVE", "DATAMODEL"] {
            rules.push(HeaderRule::exact(key, CardKind::Skip));
        }
        for key in ["BITPIX", "NAXIS", "BLANK"] {
            rules.push(HeaderRule::prefix(key, CardKind::Integer));
        }
        for key in ["DATE", "CELLSCAL", "DATATYPE"] {
            rules.push(HeaderRule::prefix(key, CardKind::String));
        }
        rules.push(HeaderRule::prefix("COMMENT", CardKind::Comment));
        rules.push(HeaderRule::prefix("HISTORY", CardKind::History));
        Self { rules }
    }
}

impl HeaderPolicy {
    /// A policy with no rules, so every keyword is typed by its value
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule ahead of the existing ones
    pub fn with_rule(mut self, rule: HeaderRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    /// Add a rule after the existing ones
    pub fn push(&mut self, rule: HeaderRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[HeaderRule] {
        &self.rules
    }

    /// Card kind for a keyword (prefix already stripped) and its value
    pub fn classify(&self, keyword: &str, value: &str) -> CardKind {
        self.rules
            .iter()
            .find(|rule| rule.key.matches(keyword))
            .map(|rule| rule.kind)
            .unwrap_or_else(|| classify_value(value))
    }
}

/// String unless the value starts with a digit or `-`, float otherwise
pub fn classify_value(value: &str) -> CardKind {
    match value.chars().next() {
        Some(c) if c == '-' || c.is_ascii_digit() => CardKind::Float,
        _ => CardKind::String,
    }
}
