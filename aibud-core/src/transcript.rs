//! Pure editing operations over a transcript string.
//!
//! A transcript is a template's description line followed by conversation
//! turns, one per line. Lengths are counted in chars, never bytes, so the
//! budget behaves the same for non-ASCII names and messages.

use std::borrow::Cow;

/// Replace every occurrence of `placeholder` with `"{real_name}:"`.
pub fn substitute_placeholder(text: &str, placeholder: &str, real_name: &str) -> String {
    if placeholder.is_empty() {
        return text.to_string();
    }
    text.replace(placeholder, &format!("{}:", real_name))
}

/// Append a turn to the end of the transcript.
pub fn append(transcript: &mut String, turn: &str) {
    transcript.push_str(turn);
}

/// Format a user turn and open the bot's turn right after it.
pub fn user_turn(name: &str, text: &str, bot_label: &str) -> String {
    format!("{}: {}\n{}: ", name, text, bot_label)
}

/// Strip the trigger prefix once, collapse whitespace runs and trim.
pub fn normalize_input(raw: &str, trigger_prefix: &str) -> String {
    let without_prefix: Cow<'_, str> = if trigger_prefix.is_empty() {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(raw.replacen(trigger_prefix, "", 1))
    };
    without_prefix.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The template's description line.
pub fn description_line(transcript: &str) -> &str {
    transcript.split('\n').next().unwrap_or_default()
}

/// Drop the oldest conversation lines until the transcript is shorter than
/// `char_limit`.
///
/// Line 0 is never removed. If the description alone is still over budget
/// the transcript is returned as just that line (plus its trailing newline,
/// if it had one), so the next turn still starts on a fresh line.
pub fn truncate(transcript: &str, char_limit: usize) -> Cow<'_, str> {
    let total = transcript.chars().count();
    if total < char_limit {
        return Cow::Borrowed(transcript);
    }

    let (body, terminator) = match transcript.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (transcript, ""),
    };

    let mut lines = body.split('\n');
    let description = lines.next().unwrap_or_default();
    let conversation: Vec<&str> = lines.collect();

    let mut length = total;
    let mut dropped = 0;
    while length >= char_limit && dropped < conversation.len() {
        // +1 for the newline that separated the dropped line
        length -= conversation[dropped].chars().count() + 1;
        dropped += 1;
    }

    if dropped == 0 {
        return Cow::Borrowed(transcript);
    }

    let mut out = String::with_capacity(transcript.len());
    out.push_str(description);
    for line in &conversation[dropped..] {
        out.push('\n');
        out.push_str(line);
    }
    out.push_str(terminator);
    Cow::Owned(out)
}
