// tests/prompt_builder.rs
//
// The prompt builder is pure: fixed inputs must give byte-identical output,
// and every contract element (history context, safelist, JSON response
// shape, fail-open bias, language) must appear in the text.

use chat_sentry::ai::prompt::build_moderation_prompt;

#[test]
fn prompt_is_deterministic() {
    let history = vec!["[12:00:01] hi".to_string(), "[12:00:05] p".to_string()];
    let false_positives = vec!["KEKW".to_string()];

    let a = build_moderation_prompt("u", &history, &false_positives, "German");
    let b = build_moderation_prompt("u", &history, &false_positives, "German");
    assert_eq!(a, b);
}

#[test]
fn prompt_embeds_message_history_and_language() {
    let history = vec!["[09:15:00] earlier message".to_string()];
    let prompt = build_moderation_prompt("you are terrible", &history, &[], "Czech");

    assert!(prompt.contains("New Message: \"you are terrible\""));
    assert!(prompt.contains("Recent Chat History"));
    assert!(prompt.contains("- [09:15:00] earlier message"));
    assert!(prompt.contains("short explanation in Czech"));
}

#[test]
fn prompt_embeds_safelist_as_do_not_flag() {
    let false_positives = vec!["just a meme".to_string()];
    let prompt = build_moderation_prompt("hello", &[], &false_positives, "English");

    assert!(prompt.contains("Known False Positives"));
    assert!(prompt.contains("- \"just a meme\""));
    assert!(prompt.contains("do NOT flag"));
}

#[test]
fn prompt_omits_empty_sections() {
    let prompt = build_moderation_prompt("hello", &[], &[], "English");
    assert!(!prompt.contains("Recent Chat History"));
    assert!(!prompt.contains("Known False Positives"));
}

#[test]
fn prompt_requests_strict_json_and_fail_open_bias() {
    let prompt = build_moderation_prompt("hello", &[], &[], "English");

    assert!(prompt.contains("\"flagged\": boolean"));
    assert!(prompt.contains("\"suggestedAction\": \"none\" | \"timeout\" | \"ban\""));
    assert!(prompt.contains("lean towards \"flagged\": false"));
    assert!(prompt.contains("FRAGMENTED INSULTS"));
}
