//! Exit-status-keyed transition rules.

use crate::models::ExitStatus;
use std::fmt;

/// Where a matched transition leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionTarget {
    /// Continue with the named node
    Node(String),
    /// End the flow as COMPLETED with the given exit status
    End(ExitStatus),
    /// End the flow as FAILED; a restart re-runs the failed node
    Fail,
    /// End the flow as STOPPED; a restart re-runs the stopped node
    Stop,
    /// End the flow as STOPPED; a restart resumes at the named node
    StopAndRestart(String),
}

impl TransitionTarget {
    /// Node this target names, if any
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::Node(name) | Self::StopAndRestart(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(name) => write!(f, "to({name})"),
            Self::End(status) => write!(f, "end({status})"),
            Self::Fail => write!(f, "fail"),
            Self::Stop => write!(f, "stop"),
            Self::StopAndRestart(name) => write!(f, "stopAndRestart({name})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub pattern: String,
    pub target: TransitionTarget,
}

impl Transition {
    pub fn new(pattern: impl Into<String>, target: TransitionTarget) -> Self {
        Self {
            pattern: pattern.into(),
            target,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.pattern.contains(['*', '?'])
    }

    pub fn matches(&self, exit_status: &ExitStatus) -> bool {
        pattern_matches(&self.pattern, exit_status.code())
    }
}

/// Resolve the transition for `exit_status`: an exact match wins, otherwise
/// the first matching pattern in declaration order.
pub fn resolve<'a>(transitions: &'a [Transition], exit_status: &ExitStatus) -> Option<&'a Transition> {
    transitions
        .iter()
        .find(|transition| !transition.is_wildcard() && transition.pattern == exit_status.code())
        .or_else(|| {
            transitions
                .iter()
                .find(|transition| transition.is_wildcard() && transition.matches(exit_status))
        })
}

/// Glob match where `*` is any run of characters and `?` exactly one
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();

    let (mut p, mut v) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, v));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            v = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        assert!(pattern_matches("*", "FAILED"));
        assert!(pattern_matches("*", ""));
        assert!(pattern_matches("FAILED", "FAILED"));
        assert!(!pattern_matches("FAILED", "COMPLETED"));
        assert!(pattern_matches("COMPLETED*", "COMPLETED WITH SKIPS"));
        assert!(pattern_matches("C?MPLETED", "COMPLETED"));
        assert!(!pattern_matches("C?MPLETED", "CMPLETED"));
        assert!(pattern_matches("*SKIPS", "COMPLETED WITH SKIPS"));
        assert!(pattern_matches("*WITH*", "COMPLETED WITH SKIPS"));
    }

    #[test]
    fn test_exact_match_beats_earlier_pattern() {
        let transitions = vec![
            Transition::new("*", TransitionTarget::Node("B".to_string())),
            Transition::new("FAILED", TransitionTarget::Node("C".to_string())),
        ];
        let resolved = resolve(&transitions, &ExitStatus::failed()).unwrap();
        assert_eq!(resolved.target, TransitionTarget::Node("C".to_string()));

        let resolved = resolve(&transitions, &ExitStatus::completed()).unwrap();
        assert_eq!(resolved.target, TransitionTarget::Node("B".to_string()));
    }

    #[test]
    fn test_patterns_resolve_in_declaration_order() {
        let transitions = vec![
            Transition::new("COMPLETED*", TransitionTarget::Node("first".to_string())),
            Transition::new("*SKIPS", TransitionTarget::Node("second".to_string())),
        ];
        let resolved = resolve(&transitions, &ExitStatus::new("COMPLETED WITH SKIPS")).unwrap();
        assert_eq!(resolved.target.node(), Some("first"));
        assert!(resolve(&transitions, &ExitStatus::failed()).is_none());
    }
}
