//! Delegation markers in leader output.
//!
//! A leader hands a sub-task to a team member by writing
//!
//! ```text
//! [Member_Name] instruction text
//! ```
//!
//! anywhere in its reply. Grammar, applied at each `[` from left to right:
//!
//! - the name is everything up to the next `]`; `[]` is not a marker;
//! - whitespace (including line breaks) after the `]` is skipped;
//! - the instruction is the rest of that line, trimmed, and must not be empty.
//!
//! The first position that satisfies the grammar wins; later markers are
//! ignored. A winning marker whose name is blank means no delegation.
//! Whether the name is actually on the team is decided by the caller,
//! case-sensitively.

/// A parsed `[Name] instruction` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationMarker {
    pub target: String,
    pub instruction: String,
}

/// Find the first delegation marker in `text`.
pub fn parse_delegation(text: &str) -> Option<DelegationMarker> {
    let mut offset = 0;
    while let Some(open) = text[offset..].find('[') {
        let start = offset + open + 1;
        offset = start;

        let Some(close) = text[start..].find(']') else {
            // No closing bracket anywhere after this point
            return None;
        };
        if close == 0 {
            continue;
        }

        let rest = text[start + close + 1..].trim_start();
        let instruction = rest.lines().next().unwrap_or_default().trim();
        if instruction.is_empty() {
            continue;
        }

        // A blank name still claims the first marker position
        let target = text[start..start + close].trim();
        if target.is_empty() {
            return None;
        }

        return Some(DelegationMarker {
            target: target.to_string(),
            instruction: instruction.to_string(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(target: &str, instruction: &str) -> Option<DelegationMarker> {
        Some(DelegationMarker {
            target: target.into(),
            instruction: instruction.into(),
        })
    }

    #[test]
    fn parses_simple_marker() {
        assert_eq!(parse_delegation("[Data_Analyst] compute X"), marker("Data_Analyst", "compute X"));
    }

    #[test]
    fn no_bracket_means_no_delegation() {
        assert_eq!(parse_delegation("I will handle this myself."), None);
        assert_eq!(parse_delegation(""), None);
    }

    #[test]
    fn marker_inside_prose() {
        let text = "Let me ask the team.\n[Market_Analyst] fetch the NVDA price\nThen I'll summarize.";
        assert_eq!(parse_delegation(text), marker("Market_Analyst", "fetch the NVDA price"));
    }

    #[test]
    fn first_marker_wins() {
        let text = "[Market_Analyst] fetch price\n[Accountant] audit books";
        assert_eq!(parse_delegation(text), marker("Market_Analyst", "fetch price"));
    }

    #[test]
    fn name_and_instruction_are_trimmed() {
        assert_eq!(parse_delegation("[  Statistician ]   run a regression  "), marker("Statistician", "run a regression"));
    }

    #[test]
    fn instruction_may_start_on_next_line() {
        assert_eq!(parse_delegation("[Programmer]\n  write the script"), marker("Programmer", "write the script"));
    }

    #[test]
    fn malformed_markers_are_skipped() {
        assert_eq!(parse_delegation("[] nothing here"), None);
        assert_eq!(parse_delegation("[Accountant]   "), None);
        assert_eq!(parse_delegation("[Accountant] \n\n"), None);
        assert_eq!(parse_delegation("[Unclosed marker text"), None);
        assert_eq!(parse_delegation("[] skip [Accountant] audit"), marker("Accountant", "audit"));
    }

    #[test]
    fn blank_name_in_first_marker_means_no_delegation() {
        assert_eq!(parse_delegation("[ ] skip [Accountant] audit"), None);
        assert_eq!(parse_delegation("[\t] audit"), None);
    }
}
