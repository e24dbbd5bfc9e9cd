//! Moderation prompt builder.
//!
//! Pure and deterministic: the same (message, history, false positives,
//! language) always yields the byte-identical prompt, which keeps it
//! testable against fixed inputs and the providers free of prompt logic.

/// Build the moderation prompt sent to the AI model.
///
/// The prompt instructs the model to use recent history for cross-message
/// pattern detection (fragmented slurs in particular), to treat the
/// false-positive safelist as do-not-flag examples, to answer with a strict
/// JSON object, and to lean toward not flagging when unsure.
pub fn build_moderation_prompt(
    message: &str,
    history: &[String],
    false_positives: &[String],
    language: &str,
) -> String {
    let history_context = if history.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = history.iter().map(|m| format!("- {m}")).collect();
        format!(
            "\nRecent Chat History (CONSIDER THIS FOR CONTEXT AND PATTERN DETECTION):\n{}\n",
            lines.join("\n")
        )
    };

    let safelist = if false_positives.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = false_positives.iter().map(|m| format!("- \"{m}\"")).collect();
        format!(
            "\nKnown False Positives (a human reviewed these and they are NOT violations — do NOT flag messages like these):\n{}\n",
            lines.join("\n")
        )
    };

    format!(
        r#"You are a Twitch Chat Moderator. Your job is to analyze messages for Hateful content, Harassment, Excessive Vulgarity, or Spam.
{history_context}{safelist}
Analyze the LATEST message(s) below from this user.
New Message: "{message}"

CRITICAL INSTRUCTION:
- Look at the "Recent Chat History" above.
- Determine if the new message is harassment *in context* of previous messages (e.g. repeated badgering, circumventing blocks, multi-message insults).
- SPECIFICALLY CHECK FOR FRAGMENTED INSULTS: If the user is sending single letters or short segments that spell out a slur when combined with recent history, FLAG IT.
- If the history shows a pattern of abuse, FLAG the new message.

Respond ONLY with a JSON object in this format:
{{
  "flagged": boolean,
  "reason": "short explanation in {language} (max 1 sentence)",
  "suggestedAction": "none" | "timeout" | "ban"
}}

If the message is safe, set "flagged": false and "suggestedAction": "none".
If unsure, lean towards "flagged": false to avoid over-moderation.

IMPORTANT: Provide ONLY the JSON. Do not wrap in markdown code blocks if possible."#
    )
}
