//! Shared utilities.

#[cfg(test)]
pub mod testutil;

/// Join `segments` onto `base` with `/`, the separator of the remote host.
///
/// The local path type is not used: the host running roundsman may not share
/// the remote host's conventions.
pub fn join_remote<S: AsRef<str>>(base: &str, segments: &[S]) -> String {
  let mut joined = base.trim_end_matches('/').to_string();
  if joined.is_empty() && base.starts_with('/') {
    joined.push('/');
  }
  for segment in segments {
    let segment = segment.as_ref().trim_matches('/');
    if segment.is_empty() {
      continue;
    }
    if !joined.is_empty() && !joined.ends_with('/') {
      joined.push('/');
    }
    joined.push_str(segment);
  }
  joined
}

/// Quote `s` for a POSIX shell, leaving plain words bare.
pub fn shell_escape(s: &str) -> String {
  if s.is_empty() {
    return "''".to_string();
  }
  if s
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '+' | '@'))
  {
    return s.to_string();
  }
  format!("'{}'", s.replace('\'', "'\\''"))
}
