//! Working copy status summary

use std::fmt;

/// Summary of one working copy, rendered on a single line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatus {
    /// Current branch, `HEAD` when detached
    pub branch: String,
    /// Files changed in the working tree
    pub modified: usize,
    /// Untracked files
    pub untracked: usize,
    /// Commits (ahead, behind) relative to upstream, if it could be computed
    pub divergence: Option<(usize, usize)>,
    /// `git describe --tags --always`
    pub describe: String,
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.branch.is_empty() {
            parts.push(format!("[{}]", self.branch));
        }
        if self.modified > 0 {
            parts.push(format!("≠{}", self.modified));
        }
        if self.untracked > 0 {
            parts.push(format!("?{}", self.untracked));
        }
        parts.push(match self.divergence {
            None => "-".to_string(),
            Some((0, 0)) => "✓".to_string(),
            Some((ahead, behind)) => {
                let mut diff = String::new();
                if ahead > 0 {
                    diff.push_str(&format!("▲{}", ahead));
                }
                if behind > 0 {
                    diff.push_str(&format!("▼{}", behind));
                }
                diff
            }
        });
        if !self.describe.is_empty() {
            parts.push(self.describe.clone());
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Number of changed files from `git diff --shortstat`
pub(crate) fn parse_shortstat(output: &str) -> usize {
    output
        .trim_start()
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Number of non-empty lines
pub(crate) fn count_lines(output: &str) -> usize {
    output.lines().filter(|l| !l.trim().is_empty()).count()
}

/// (ahead, behind) from `git rev-list --left-right --count a...b`
pub(crate) fn parse_left_right(output: &str) -> Option<(usize, usize)> {
    let mut counts = output.split_whitespace().map(|n| n.parse::<usize>());
    match (counts.next(), counts.next()) {
        (Some(Ok(ahead)), Some(Ok(behind))) => Some((ahead, behind)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shortstat() {
        assert_eq!(
            parse_shortstat(" 3 files changed, 10 insertions(+), 2 deletions(-)\n"),
            3
        );
        assert_eq!(parse_shortstat(""), 0);
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines("a.txt\nb.txt\n"), 2);
        assert_eq!(count_lines(""), 0);
    }

    #[test]
    fn test_parse_left_right() {
        assert_eq!(parse_left_right("2\t5\n"), Some((2, 5)));
        assert_eq!(parse_left_right("fatal: bad revision"), None);
    }

    #[test]
    fn test_display() {
        let status = RepoStatus {
            branch: "main".to_string(),
            modified: 2,
            untracked: 1,
            divergence: Some((1, 3)),
            describe: "v1.0.0".to_string(),
        };
        assert_eq!(status.to_string(), "[main] ≠2 ?1 ▲1▼3 v1.0.0");

        let clean = RepoStatus {
            divergence: Some((0, 0)),
            ..Default::default()
        };
        assert_eq!(clean.to_string(), "✓");
    }
}
