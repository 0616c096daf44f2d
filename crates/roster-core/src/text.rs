//! Small string helpers shared by validation and import.

/// Capitalise the first letter of every all-lowercase word.
///
/// Words that already contain an uppercase letter are assumed to be
/// deliberate (`PO`, `McNab`) and are left alone. Whitespace is preserved.
pub fn friendly_capitalize(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut word = String::new();

  for ch in input.chars() {
    if ch.is_whitespace() {
      push_word(&mut out, &word);
      word.clear();
      out.push(ch);
    } else {
      word.push(ch);
    }
  }
  push_word(&mut out, &word);
  out
}

fn push_word(out: &mut String, word: &str) {
  if word.chars().any(char::is_uppercase) {
    out.push_str(word);
    return;
  }
  let mut chars = word.chars();
  if let Some(first) = chars.next() {
    out.extend(first.to_uppercase());
    out.push_str(chars.as_str());
  }
}

/// Trim and map an empty result to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
  value
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
}
