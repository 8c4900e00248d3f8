use aibud_core::{ModelChoice, Notice, NoticeKind, TemplateSet};
use serenity::builder::CreateEmbed;

pub const DISCORD_MESSAGE_LIMIT: usize = 2000;
pub const SUCCESS_EMBED_COLOR: u32 = 0x00_CC_00;
pub const INFO_EMBED_COLOR: u32 = 0x00_77_CC;
pub const WARNING_EMBED_COLOR: u32 = 0xCC_77_00;
pub const ERROR_EMBED_COLOR: u32 = 0xCC_00_00;

/// Zero-width space, renders an empty spacer field
const SPACER: &str = "\u{200B}";

pub fn notice_title(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Success => "Operation Successful",
        NoticeKind::Info => "Message",
        NoticeKind::Warning => "Warning",
        NoticeKind::Error => "Error",
    }
}

pub fn notice_color(kind: NoticeKind) -> u32 {
    match kind {
        NoticeKind::Success => SUCCESS_EMBED_COLOR,
        NoticeKind::Info => INFO_EMBED_COLOR,
        NoticeKind::Warning => WARNING_EMBED_COLOR,
        NoticeKind::Error => ERROR_EMBED_COLOR,
    }
}

pub fn notice_embed(notice: &Notice) -> CreateEmbed {
    CreateEmbed::new()
        .title(notice_title(notice.kind))
        .description(&notice.message)
        .color(notice_color(notice.kind))
}

/// Capitalized label for a template name ("sarcastic" -> "Sarcastic").
pub fn personality_label(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl HelpField {
    fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }

    fn spacer() -> Self {
        Self::new(SPACER, SPACER, false)
    }
}

pub fn help_fields(templates: &TemplateSet, models: &[ModelChoice], bot_label: &str) -> Vec<HelpField> {
    let personalities = templates
        .names()
        .map(|name| format!("`{}`", personality_label(name)))
        .collect::<Vec<_>>()
        .join(", ");
    let models = models
        .iter()
        .map(|model| format!("`{}` ({})", model.label, model.id))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        HelpField::new(
            "Usage",
            format!(
                "To chat with {bot_label}, send a message mentioning it in a server channel.\n\
                 Try it -> **`@{bot_label} Whats up?`**"
            ),
            false,
        ),
        HelpField::spacer(),
        HelpField::new(
            "**Commands**",
            "All commands are available through the slash command interface by typing `/ai` in a channel.",
            false,
        ),
        HelpField::new("/ai help", "Show this help message", true),
        HelpField::new(
            "/ai reset",
            "Reset the conversation. This erases any memory of previous messages.",
            true,
        ),
        HelpField::new(
            "/ai set-personality",
            format!(
                "Set the personality {bot_label} answers with.\nAvailable personalities: {personalities}"
            ),
            true,
        ),
        HelpField::new(
            "/ai set-model",
            format!(
                "Set the completion model. Switching models resets the conversation.\nAvailable models:\n{models}"
            ),
            true,
        ),
        HelpField::spacer(),
    ]
}

pub fn help_embed(templates: &TemplateSet, models: &[ModelChoice], bot_label: &str) -> CreateEmbed {
    help_fields(templates, models, bot_label)
        .into_iter()
        .fold(
            CreateEmbed::new().color(INFO_EMBED_COLOR).title(format!("{bot_label} Help")),
            |embed, field| embed.field(field.name, field.value, field.inline),
        )
}

const FENCE_CLOSE: &str = "\n```";
const FENCE_OPEN: &str = "```\n";

/// Split text into chunks Discord accepts.
///
/// Chunks break between lines. A code fence left open at the end of a chunk
/// is closed there and reopened at the start of the next one. A line too long
/// for one chunk is cut after its last whitespace that fits, or mid-word if
/// it has none.
pub fn split_discord_message(content: &str) -> Vec<String> {
    if content.chars().count() <= DISCORD_MESSAGE_LIMIT {
        return vec![content.to_string()];
    }

    // Leave room to close a fence at the end of every chunk
    let budget = DISCORD_MESSAGE_LIMIT - FENCE_CLOSE.len();
    let max_piece = budget - FENCE_OPEN.len();

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut open_fence = false;

    for line in content.split_inclusive('\n') {
        let starts_fence = line.trim_start().starts_with("```");

        for piece in split_long_line(line, max_piece) {
            let piece_len = piece.chars().count();
            if current_len + piece_len > budget && !current.is_empty() {
                if open_fence {
                    current.push_str(FENCE_CLOSE);
                }
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                if open_fence {
                    current.push_str(FENCE_OPEN);
                    current_len = FENCE_OPEN.len();
                }
            }
            current.push_str(piece);
            current_len += piece_len;
        }

        if starts_fence {
            open_fence = !open_fence;
        }
    }

    if !current.is_empty() {
        if open_fence {
            current.push_str(FENCE_CLOSE);
        }
        chunks.push(current);
    }

    chunks
}

fn split_long_line(line: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;

    while rest.chars().count() > max_chars {
        let hard = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let cut = match rest[..hard].rfind(char::is_whitespace) {
            Some(i) if i > 0 => i + rest[i..].chars().next().map_or(1, char::len_utf8),
            _ => hard,
        };
        let (piece, tail) = rest.split_at(cut);
        pieces.push(piece);
        rest = tail;
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}
