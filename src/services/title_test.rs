use super::*;

#[test]
fn short_text_kept_verbatim() {
    assert_eq!(derive_title("hello"), "hello");
}

#[test]
fn exactly_twenty_chars_has_no_marker() {
    let text = "abcdefghijklmnopqrst";
    assert_eq!(text.chars().count(), 20);
    assert_eq!(derive_title(text), text);
}

#[test]
fn long_text_truncated_with_marker() {
    assert_eq!(derive_title("abcdefghijklmnopqrstu"), "abcdefghijklmnopqrst...");
}

#[test]
fn multibyte_text_counts_characters() {
    let text = "什么是批判性思维？为什么它对大学生如此重要呢？请详细说明";
    let title = derive_title(text);
    assert!(title.ends_with(TITLE_CONTINUATION));
    assert_eq!(title.trim_end_matches(TITLE_CONTINUATION).chars().count(), TITLE_MAX_CHARS);
}

#[test]
fn whitespace_is_preserved() {
    assert_eq!(derive_title("  spaced  "), "  spaced  ");
}

#[test]
fn every_message_policy_always_renames() {
    assert_eq!(TitlePolicy::EveryMessage.next_title(false, "second"), Some("second".into()));
    assert_eq!(TitlePolicy::EveryMessage.next_title(true, "first"), Some("first".into()));
}

#[test]
fn first_message_policy_renames_once() {
    assert_eq!(TitlePolicy::FirstMessage.next_title(true, "first"), Some("first".into()));
    assert_eq!(TitlePolicy::FirstMessage.next_title(false, "second"), None);
}

#[test]
fn default_policy_is_every_message() {
    assert_eq!(TitlePolicy::default(), TitlePolicy::EveryMessage);
}

#[test]
fn policy_parses_from_config_value() {
    assert_eq!("every_message".parse::<TitlePolicy>(), Ok(TitlePolicy::EveryMessage));
    assert_eq!(" First_Message ".parse::<TitlePolicy>(), Ok(TitlePolicy::FirstMessage));
}

#[test]
fn policy_rejects_unknown_value() {
    let err = "sometimes".parse::<TitlePolicy>().unwrap_err();
    assert!(err.contains(TITLE_POLICY_VAR));
    assert!(err.contains("sometimes"));
}
