//! Placeholder scanners
//!
//! Every placeholder kind has its own pattern and is found in its own pass
//! over the text. Expansion runs the passes one after another, so text
//! produced by one pass is seen by the next.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::ast::{Placeholder, Span, Spanned};

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%%%(?P<op>NOW|MONTHDELTA)@(?P<offset>-?\d*)@(?P<format>.*?)%%%").unwrap()
});

static CONSTANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%%CONSTANT@(?P<id>\S*?)%%%").unwrap());

static COUNTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%%INC@(?P<base>[-\d.]+)@(?P<step>[-\d.]+)%%%").unwrap());

static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%%%INDEX%%%").unwrap());

static LOOP_COUNTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%%%LOOPINC@(?P<base>[-\d.]+)@(?P<step>[-\d.]+)%%%").unwrap()
});

static LOOP_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%%LOOPLIST@(?P<id>[A-Za-z0-9_]+)%%%").unwrap());

/// Placeholder kind scanned for by one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Date,
    Constant,
    Counter,
    Index,
    LoopCounter,
    LoopList,
}

impl PlaceholderKind {
    fn pattern(self) -> &'static Regex {
        match self {
            PlaceholderKind::Date => &*DATE_RE,
            PlaceholderKind::Constant => &*CONSTANT_RE,
            PlaceholderKind::Counter => &*COUNTER_RE,
            PlaceholderKind::Index => &*INDEX_RE,
            PlaceholderKind::LoopCounter => &*LOOP_COUNTER_RE,
            PlaceholderKind::LoopList => &*LOOP_LIST_RE,
        }
    }

    fn placeholder(self, caps: &Captures<'_>) -> Placeholder {
        let text = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };
        match self {
            PlaceholderKind::Date => Placeholder::Date {
                operation: text("op"),
                offset: text("offset"),
                format: text("format"),
            },
            PlaceholderKind::Constant => Placeholder::Constant(text("id")),
            PlaceholderKind::Counter => Placeholder::Counter {
                base: text("base"),
                step: text("step"),
            },
            PlaceholderKind::Index => Placeholder::Index,
            PlaceholderKind::LoopCounter => Placeholder::LoopCounter {
                base: text("base"),
                step: text("step"),
            },
            PlaceholderKind::LoopList => Placeholder::LoopList(text("id")),
        }
    }
}

/// Find every placeholder of one kind, left to right and non-overlapping
pub fn scan(input: &str, kind: PlaceholderKind) -> Vec<Spanned<Placeholder>> {
    kind.pattern()
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let span: Span = whole.range();
            Some(Spanned::new(kind.placeholder(&caps), span))
        })
        .collect()
}
