use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Per-document-type outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Updated,
    NoChanges,
    UpdateErrors,
    DryRunUpdated,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Updated => "Document Types Updated",
            Category::NoChanges => "Document Types Not Needing Changes",
            Category::UpdateErrors => "Errors updating document types",
            Category::DryRunUpdated => "DRY RUN: Document Types (that would have been) Updated",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    counts: BTreeMap<Category, u64>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&mut self, category: Category) {
        *self.counts.entry(category).or_insert(0) += 1;
    }

    pub fn get(&self, category: Category) -> u64 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Recorded categories as `(label, count)`, sorted by label.
    pub fn sorted(&self) -> Vec<(&'static str, u64)> {
        let mut out: Vec<_> = self.counts.iter().map(|(c, n)| (c.label(), *n)).collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counts.is_empty() {
            return writeln!(f, "  (no document types processed)");
        }
        for (label, n) in self.sorted() {
            writeln!(f, "  {label}: {n}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_sorts_by_label() {
        let mut stats = Stats::new();
        stats.inc(Category::Updated);
        stats.inc(Category::NoChanges);
        stats.inc(Category::Updated);
        stats.inc(Category::DryRunUpdated);
        assert_eq!(stats.get(Category::Updated), 2);
        assert_eq!(stats.get(Category::UpdateErrors), 0);
        assert_eq!(stats.total(), 4);
        let labels: Vec<_> = stats.sorted().into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec![
                "DRY RUN: Document Types (that would have been) Updated",
                "Document Types Not Needing Changes",
                "Document Types Updated",
            ]
        );
    }

    #[test]
    fn renders_one_line_per_category() {
        let mut stats = Stats::new();
        stats.inc(Category::UpdateErrors);
        assert_eq!(stats.to_string(), "  Errors updating document types: 1\n");
        assert!(Stats::new().to_string().contains("no document types"));
    }
}
