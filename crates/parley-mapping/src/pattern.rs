//! Simple glob matching for header and variable names.

/// Match `candidate` against a simple pattern.
///
/// A pattern without `*` must equal the candidate. Each `*` matches any
/// run of characters, so `"crm*"`, `"*Id"`, `"*cust*"`, `"a*b*c"` and `"*"`
/// are all supported.
pub fn simple_match(pattern: &str, candidate: &str) -> bool {
  match pattern.find('*') {
    None => pattern == candidate,
    Some(0) => {
      let rest = pattern.trim_start_matches('*');
      if rest.is_empty() {
        return true;
      }
      match rest.find('*') {
        None => candidate.ends_with(rest),
        Some(next) => {
          // The next segment is followed by another `*`, so its leftmost
          // occurrence leaves the longest tail to match against.
          let segment = &rest[..next];
          match candidate.find(segment) {
            Some(pos) => simple_match(&rest[next..], &candidate[pos + segment.len()..]),
            None => false,
          }
        }
      }
    }
    Some(first) => {
      let prefix = &pattern[..first];
      candidate.starts_with(prefix) && simple_match(&pattern[first..], &candidate[first..])
    }
  }
}

/// True if any pattern matches `candidate`.
pub fn matches_any<S: AsRef<str>>(patterns: &[S], candidate: &str) -> bool {
  patterns.iter().any(|p| simple_match(p.as_ref(), candidate))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exact() {
    assert!(simple_match("customerId", "customerId"));
    assert!(!simple_match("customerId", "customerIds"));
    assert!(!simple_match("customerId", "customer"));
  }

  #[test]
  fn test_whole_string_wildcard() {
    assert!(simple_match("*", "anything"));
    assert!(simple_match("*", ""));
    assert!(simple_match("**", "anything"));
  }

  #[test]
  fn test_prefix_and_suffix() {
    assert!(simple_match("crm*", "crmData"));
    assert!(simple_match("crm*", "crm"));
    assert!(!simple_match("crm*", "xcrm"));

    assert!(simple_match("*Id", "customerId"));
    assert!(!simple_match("*Id", "customerIdx"));
  }

  #[test]
  fn test_infix_and_multiple() {
    assert!(simple_match("*cust*", "the_customer"));
    assert!(!simple_match("*cust*", "client"));
    assert!(simple_match("a*b*c", "axxbyyc"));
    assert!(simple_match("a*b*c", "abc"));
    assert!(!simple_match("a*b*c", "acb"));
    assert!(simple_match("pre*mid*", "pre-the-mid-end"));
  }

  #[test]
  fn test_multibyte_candidates() {
    assert!(simple_match("é*", "étape"));
    assert!(simple_match("*ß", "straß"));
    assert!(!simple_match("a*", "étape"));
  }

  #[test]
  fn test_empty_pattern_only_matches_empty() {
    assert!(simple_match("", ""));
    assert!(!simple_match("", "x"));
  }

  #[test]
  fn test_matches_any() {
    let patterns = ["crm*", "customerId"];
    assert!(matches_any(&patterns, "crmId"));
    assert!(matches_any(&patterns, "customerId"));
    assert!(!matches_any(&patterns, "food"));

    let none: [&str; 0] = [];
    assert!(!matches_any(&none, "food"));
  }
}
