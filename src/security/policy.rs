use crate::{EchoError, Result};
use fancy_regex::Regex;
use serde::Deserialize;
use std::path::Path;

/// Body sent with every `403` produced by the policy.
pub const DENIED_BODY: &str = "Your request does not meet our security policies.";

/// Outcome of checking a User-Agent against a [`UserAgentPolicy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Request may proceed
    Allow,
    /// Request must be refused; carries the rule that decided it
    Deny { reason: String },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// User-Agent whitelist/blacklist applied before the echo handler runs.
///
/// A non-empty whitelist takes precedence: only User-Agents matching one of
/// its patterns are let through and the blacklist is not consulted. With an
/// empty whitelist, a User-Agent matching any blacklist pattern is refused.
/// Patterns use search semantics, so `Googlebot` matches anywhere in the
/// header value; anchor with `^`/`$` when that is not wanted.
///
/// # Examples
///
/// ```
/// use headerecho::UserAgentPolicy;
///
/// let policy = UserAgentPolicy::new(&[], &["(?i)curl"]).unwrap();
/// assert!(policy.evaluate("Mozilla/5.0").is_allowed());
/// assert!(!policy.evaluate("curl/8.4.0").is_allowed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct UserAgentPolicy {
    whitelist: Vec<Regex>,
    blacklist: Vec<Regex>,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    whitelist: RuleList,
    #[serde(default)]
    blacklist: RuleList,
}

#[derive(Debug, Default, Deserialize)]
struct RuleList {
    #[serde(default)]
    user_agents: Vec<String>,
}

impl UserAgentPolicy {
    /// A policy with no rules; every request is allowed.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Compiles the given whitelist and blacklist patterns.
    pub fn new<S: AsRef<str>>(whitelist: &[S], blacklist: &[S]) -> Result<Self> {
        Ok(Self {
            whitelist: compile_all(whitelist)?,
            blacklist: compile_all(blacklist)?,
        })
    }

    /// Parses a policy from its YAML form.
    ///
    /// ```yaml
    /// whitelist:
    ///   user_agents: ["Googlebot"]
    /// blacklist:
    ///   user_agents: ["(?i)curl"]
    /// ```
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let file: PolicyFile = serde_yaml::from_str(source)
            .map_err(|e| EchoError::Policy(format!("Invalid policy document: {e}")))?;
        Self::new(&file.whitelist.user_agents, &file.blacklist.user_agents)
    }

    /// Reads and parses a YAML policy file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            EchoError::Policy(format!("Failed to read policy {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&source)
    }

    /// True when no rule is configured.
    pub fn is_empty(&self) -> bool {
        self.whitelist.is_empty() && self.blacklist.is_empty()
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.len()
    }

    pub fn blacklist_len(&self) -> usize {
        self.blacklist.len()
    }

    /// Decides whether a request carrying `user_agent` may be served.
    ///
    /// A request without a User-Agent header should pass `""`.
    pub fn evaluate(&self, user_agent: &str) -> Verdict {
        if !self.whitelist.is_empty() {
            return match first_match(&self.whitelist, user_agent) {
                Some(_) => Verdict::Allow,
                None => Verdict::Deny {
                    reason: "not whitelisted".to_string(),
                },
            };
        }

        match first_match(&self.blacklist, user_agent) {
            Some(pattern) => Verdict::Deny {
                reason: format!("blacklisted by {pattern}"),
            },
            None => Verdict::Allow,
        }
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Regex::new(p).map_err(|e| EchoError::Policy(format!("Invalid pattern {p:?}: {e}")))
        })
        .collect()
}

fn first_match<'a>(patterns: &'a [Regex], user_agent: &str) -> Option<&'a str> {
    patterns.iter().find_map(|re| match re.is_match(user_agent) {
        Ok(true) => Some(re.as_str()),
        Ok(false) => None,
        // Backtrack limit hit
        Err(e) => {
            tracing::warn!(pattern = re.as_str(), error = %e, "User-Agent pattern failed to evaluate");
            None
        }
    })
}
