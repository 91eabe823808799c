//! Status Line Parser
//!
//! Classifies one line of `cinc-server-ctl status` (runit `sv status`) output.
//!
//! Rules are tried in order and the first match wins:
//!
//! | Pattern                                 | State   |
//! |-----------------------------------------|---------|
//! | `run: <service>: (pid <n>) <n>s`        | Running |
//! | `down: <service>: <n>s`                 | Down    |
//! | `run: <service>: connected OK`          | Running |
//!
//! Anything else is [`StatusLine::Unrecognized`]. Patterns are not anchored,
//! so trailing text such as `; run: log: (pid 7) 500s` or `, normally up`
//! does not prevent a match. Rule order beats position in the line: a down
//! service followed by a running `log:` supervisor reports `log` as running.

use crate::cinc::types::{ServiceState, StatusLine};
use regex::Regex;
use std::sync::LazyLock;

struct StatusRule {
    pattern: Regex,
    state: ServiceState,
}

static RULES: LazyLock<Vec<StatusRule>> = LazyLock::new(|| {
    [
        (r"run: (\w+): \(pid \d+\) \d+s", ServiceState::Running),
        (r"down: (\w+): \d+s", ServiceState::Down),
        (r"run: (\w+): connected OK", ServiceState::Running),
    ]
    .into_iter()
    .map(|(pattern, state)| StatusRule {
        // Patterns are literals above; a failure here is a programming error
        pattern: Regex::new(pattern).expect("status rule pattern is valid"),
        state,
    })
    .collect()
});

/// Parse a single status line.
///
/// Never fails: lines that match no rule, including empty or truncated
/// output, come back as [`StatusLine::Unrecognized`].
pub fn parse_status_line(line: &str) -> StatusLine {
    RULES
        .iter()
        .find_map(|rule| {
            rule.pattern
                .captures(line)
                .map(|caps| StatusLine::Recognized {
                    service: caps[1].to_string(),
                    state: rule.state,
                })
        })
        .unwrap_or(StatusLine::Unrecognized)
}
