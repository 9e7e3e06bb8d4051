//! Heading classification.
//!
//! Turns the text of one markdown heading into an optional structural
//! reference plus a title. Classification is an ordered chain of
//! [`HeadingRule`]s; the first rule whose pattern matches wins, so the order
//! matters where patterns overlap (a bare `A.1` must not shadow `A.1 - Title`).
//!
//! | Order | Rule | Example | Reference |
//! |-------|------|---------|-----------|
//! | 1 | structural | `A.1.2 – Scope` | `A.1.2` |
//! | 2 | part | `Part B — Runtime` | `Part-B` |
//! | 3 | cluster | `**Cluster C-II - Storage**` | `Cluster-C-II` |
//! | 4 | bare structural | `A.1.2` | `A.1.2` (title = id) |
//! | 5 | fallback | `Introduction` | none |

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Matches a heading line: `#` run of 1–6, whitespace, text.
pub(crate) static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*$").expect("heading line pattern"));

static STRUCTURAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]\.\d+(?:\.\d+)*(?::\d+(?:\.\d+)*)?)\s*[-–—]\s*(.+)$")
        .expect("structural heading pattern")
});

static PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Part\s+([A-Z])\s*[-–—]\s*(.+)$").expect("part heading pattern")
});

static CLUSTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*)?Cluster\s+([A-Z](?:-?[IVXLC]+)?)\s*[-–—]\s*(.+?)(?:\*\*)?$")
        .expect("cluster heading pattern")
});

static BARE_STRUCTURAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]\.\d+(?:\.\d+)*(?::\d+(?:\.\d+)*)?)$").expect("bare structural pattern")
});

/// Reference and title recovered from one heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedHeading {
    /// `None` when no structural id was recoverable; the caller synthesizes one.
    pub reference: Option<String>,
    pub title: String,
}

/// One link in the classification chain.
#[derive(Clone)]
pub struct HeadingRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub build: fn(&Captures) -> ClassifiedHeading,
}

impl std::fmt::Debug for HeadingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadingRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Ordered, extensible chain of [`HeadingRule`]s.
#[derive(Debug, Clone)]
pub struct HeadingClassifier {
    rules: Vec<HeadingRule>,
}

fn capture(caps: &Captures, i: usize) -> String {
    caps.get(i)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

impl HeadingClassifier {
    /// The built-in chain, in precedence order.
    pub fn new() -> Self {
        Self {
            rules: vec![
                HeadingRule {
                    name: "structural",
                    pattern: STRUCTURAL.clone(),
                    build: |c| ClassifiedHeading {
                        reference: Some(capture(c, 1)),
                        title: capture(c, 2),
                    },
                },
                HeadingRule {
                    name: "part",
                    pattern: PART.clone(),
                    build: |c| ClassifiedHeading {
                        reference: Some(format!("Part-{}", capture(c, 1))),
                        title: capture(c, 2),
                    },
                },
                HeadingRule {
                    name: "cluster",
                    pattern: CLUSTER.clone(),
                    build: |c| ClassifiedHeading {
                        reference: Some(format!("Cluster-{}", capture(c, 1))),
                        title: capture(c, 2),
                    },
                },
                HeadingRule {
                    name: "bare-structural",
                    pattern: BARE_STRUCTURAL.clone(),
                    build: |c| {
                        let id = capture(c, 1);
                        ClassifiedHeading {
                            reference: Some(id.clone()),
                            title: id,
                        }
                    },
                },
            ],
        }
    }

    /// Insert a rule ahead of the built-in ones.
    pub fn with_leading_rule(mut self, rule: HeadingRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    /// Append a rule after the built-in ones (still before the fallback).
    pub fn with_rule(mut self, rule: HeadingRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Classify heading text (without the leading `#` run).
    pub fn classify(&self, text: &str) -> ClassifiedHeading {
        let text = text.trim();
        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(text) {
                return (rule.build)(&caps);
            }
        }
        ClassifiedHeading {
            reference: None,
            title: text.to_string(),
        }
    }
}

impl Default for HeadingClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a markdown heading line into `(level, text)`.
///
/// Returns `None` for lines that are not ATX headings, including `#` runs
/// longer than six and runs with no text after them.
pub fn split_heading(line: &str) -> Option<(u8, &str)> {
    let caps = HEADING_LINE.captures(line)?;
    let level = caps.get(1)?.as_str().len() as u8;
    let text = caps.get(2)?.as_str();
    if text.is_empty() {
        return None;
    }
    Some((level, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> ClassifiedHeading {
        HeadingClassifier::new().classify(text)
    }

    #[test]
    fn test_structural_with_each_dash() {
        for text in ["A.1 - Overview", "A.1 – Overview", "A.1 — Overview"] {
            let h = classify(text);
            assert_eq!(h.reference.as_deref(), Some("A.1"), "{}", text);
            assert_eq!(h.title, "Overview");
        }
    }

    #[test]
    fn test_structural_deep_and_colon_suffix() {
        let h = classify("C.2.1:3.1 – Retention rules");
        assert_eq!(h.reference.as_deref(), Some("C.2.1:3.1"));
        assert_eq!(h.title, "Retention rules");
    }

    #[test]
    fn test_part() {
        let h = classify("Part A – Kernel");
        assert_eq!(h.reference.as_deref(), Some("Part-A"));
        assert_eq!(h.title, "Kernel");
    }

    #[test]
    fn test_cluster_plain_and_bold() {
        let h = classify("Cluster B - Identity");
        assert_eq!(h.reference.as_deref(), Some("Cluster-B"));
        assert_eq!(h.title, "Identity");

        let h = classify("**Cluster C-II — Storage**");
        assert_eq!(h.reference.as_deref(), Some("Cluster-C-II"));
        assert_eq!(h.title, "Storage");
    }

    #[test]
    fn test_bare_id_title_defaults_to_id() {
        let h = classify("A.1.1");
        assert_eq!(h.reference.as_deref(), Some("A.1.1"));
        assert_eq!(h.title, "A.1.1");
    }

    #[test]
    fn test_fallback_keeps_full_text() {
        let h = classify("Introduction to the Kernel");
        assert_eq!(h.reference, None);
        assert_eq!(h.title, "Introduction to the Kernel");
    }

    #[test]
    fn test_lowercase_part_is_not_a_part() {
        let h = classify("part a - lower");
        assert_eq!(h.reference, None);
    }

    #[test]
    fn test_leading_rule_takes_precedence() {
        let rule = HeadingRule {
            name: "appendix",
            pattern: Regex::new(r"^Appendix\s+(\d+)$").unwrap(),
            build: |c| ClassifiedHeading {
                reference: Some(format!("Appendix-{}", &c[1])),
                title: c[0].to_string(),
            },
        };
        let classifier = HeadingClassifier::new().with_leading_rule(rule);
        let h = classifier.classify("Appendix 2");
        assert_eq!(h.reference.as_deref(), Some("Appendix-2"));
    }

    #[test]
    fn test_split_heading() {
        assert_eq!(split_heading("## Part A – Kernel"), Some((2, "Part A – Kernel")));
        assert_eq!(split_heading("###### deep"), Some((6, "deep")));
        assert_eq!(split_heading("####### too deep"), None);
        assert_eq!(split_heading("#no-space"), None);
        assert_eq!(split_heading("##   "), None);
        assert_eq!(split_heading("plain text"), None);
    }
}
