use chrono::NaiveDate;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 50.0;
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Title fragments that veto a posting outright. Checked as literal,
/// case-sensitive substrings after the fuzzy score passes.
pub const DEFAULT_IGNORE_TERMS: &[&str] = &[
    "Senior", "Sr.", "Staff", "Principal", "Manager", "Director", "Intern",
];

/// Decides whether a posting is worth notifying about: the title must be
/// close enough to the search keyword, must not contain any ignore term,
/// and the posting must be newer than the recency window.
#[derive(Debug, Clone)]
pub struct TitleFilter {
    pub threshold: f64,
    pub window_days: i64,
    pub ignore_terms: Vec<String>,
}

impl Default for TitleFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            window_days: DEFAULT_WINDOW_DAYS,
            ignore_terms: DEFAULT_IGNORE_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl TitleFilter {
    /// Levenshtein-ratio similarity scaled to 0-100.
    pub fn similarity(title: &str, keyword: &str) -> f64 {
        strsim::normalized_levenshtein(title, keyword) * 100.0
    }

    /// Fuzzy-score and ignore-term clauses only; used by adapters whose
    /// vendors expose no posting date.
    pub fn title_matches(&self, title: &str, keyword: &str) -> bool {
        if Self::similarity(title, keyword) <= self.threshold {
            return false;
        }
        !self.ignore_terms.iter().any(|term| title.contains(term.as_str()))
    }

    /// Strictly-newer-than-window: a posting exactly `window_days` old is out.
    pub fn is_recent(&self, posted: NaiveDate, today: NaiveDate) -> bool {
        (today - posted).num_days() < self.window_days
    }

    pub fn accepts(&self, title: &str, keyword: &str, posted: NaiveDate, today: NaiveDate) -> bool {
        self.title_matches(title, keyword) && self.is_recent(posted, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn filter() -> TitleFilter {
        TitleFilter::default()
    }

    #[test]
    fn test_identical_title_scores_100() {
        assert_eq!(TitleFilter::similarity("Software Engineer", "Software Engineer"), 100.0);
    }

    #[test]
    fn test_score_at_threshold_is_rejected() {
        let f = TitleFilter {
            threshold: 50.0,
            ..TitleFilter::default()
        };
        // "ab" vs "ax": distance 1 over length 2 gives exactly 50.0
        assert_eq!(TitleFilter::similarity("ab", "ax"), 50.0);
        assert!(!f.title_matches("ab", "ax"));
        // Just above the threshold passes
        assert!(TitleFilter::similarity("abc", "abx") > 50.0);
        assert!(f.title_matches("abc", "abx"));
    }

    #[test]
    fn test_ignore_term_vetoes_even_perfect_match() {
        let f = filter();
        assert!(!f.title_matches("Senior Software Engineer", "Senior Software Engineer"));
    }

    #[test]
    fn test_ignore_terms_are_case_sensitive() {
        let f = filter();
        // lowercase "senior" is not in the ignore list
        assert!(f.title_matches("senior software engineer", "senior software engineer"));
    }

    #[test]
    fn test_recency_window_boundary() {
        let f = filter();
        let today = day(2024, 3, 15);
        // Exactly 7 days old: rejected
        assert!(!f.is_recent(day(2024, 3, 8), today));
        // 6 days old: accepted
        assert!(f.is_recent(day(2024, 3, 9), today));
        assert!(f.is_recent(today, today));
    }

    #[test]
    fn test_accepts_requires_every_clause() {
        let f = filter();
        let today = day(2024, 3, 15);
        let fresh = day(2024, 3, 14);
        let stale = day(2024, 3, 1);
        assert!(f.accepts("Software Engineer", "Software Engineer", fresh, today));
        assert!(!f.accepts("Software Engineer", "Software Engineer", stale, today));
        assert!(!f.accepts("Senior Software Engineer", "Software Engineer", fresh, today));
        assert!(!f.accepts("Accountant II", "Software Engineer", fresh, today));
    }

    #[test]
    fn test_configurable_window_and_threshold() {
        let f = TitleFilter {
            threshold: 80.0,
            window_days: 2,
            ignore_terms: vec![],
        };
        let today = day(2024, 3, 15);
        assert!(!f.is_recent(day(2024, 3, 13), today));
        assert!(f.is_recent(day(2024, 3, 14), today));
        // Similarity in the 50-80 band fails the raised threshold
        assert!(!f.title_matches("Platform Engineer", "Software Engineer"));
    }
}
