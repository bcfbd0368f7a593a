//! Wire protocol: `KIND|payload` frames and bracketed control tags.

use std::fmt;

/// A recognized inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `USER|text`: a conversational turn.
    User(String),
    /// `SPEC|text`: product-intent request.
    Spec(String),
    /// `MATSPEC|text`: material-intent request.
    MatSpec(String),
}

impl Inbound {
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::User(_) => "USER",
            Inbound::Spec(_) => "SPEC",
            Inbound::MatSpec(_) => "MATSPEC",
        }
    }
}

/// Parses one frame. Unknown kinds and frames without a separator yield
/// `None` and are ignored by the caller.
pub fn parse_inbound(frame: &str) -> Option<Inbound> {
    let frame = frame.trim_end_matches(['\r', '\n']);
    let (kind, payload) = frame.split_once('|')?;
    let payload = payload.to_string();
    match kind.trim() {
        "USER" => Some(Inbound::User(payload)),
        "SPEC" => Some(Inbound::Spec(payload)),
        "MATSPEC" => Some(Inbound::MatSpec(payload)),
        _ => None,
    }
}

/// What a control tag does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagEffect {
    SetFocus,
    ClearFocus,
    /// Only changes the tone of the generated reply.
    ToneOnly,
}

/// Bracketed control tags sent by the client at the start of `USER` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTag {
    ItemSelected,
    ItemDeselected,
    ItemPlaced,
    ItemReplaced,
    SuggestionShown,
    MaterialApplied,
    NoMatch,
}

impl ControlTag {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ITEM_SELECTED" => Some(Self::ItemSelected),
            "ITEM_DESELECTED" => Some(Self::ItemDeselected),
            "ITEM_PLACED" => Some(Self::ItemPlaced),
            "ITEM_REPLACED" => Some(Self::ItemReplaced),
            "SUGGESTION_SHOWN" => Some(Self::SuggestionShown),
            "MATERIAL_APPLIED" => Some(Self::MaterialApplied),
            "NO_MATCH" => Some(Self::NoMatch),
            _ => None,
        }
    }

    /// Recognizes a control tag at the very start of the text (leading
    /// whitespace allowed) and returns it with the remaining text.
    pub fn parse_leading(text: &str) -> Option<(Self, &str)> {
        let (name, rest) = split_leading_brackets(text)?;
        Self::from_name(name).map(|tag| (tag, rest))
    }

    pub fn effect(self) -> TagEffect {
        match self {
            Self::ItemSelected => TagEffect::SetFocus,
            Self::ItemDeselected | Self::ItemPlaced | Self::ItemReplaced => TagEffect::ClearFocus,
            Self::SuggestionShown | Self::MaterialApplied | Self::NoMatch => TagEffect::ToneOnly,
        }
    }

    /// Guidance appended to the chat prompt for this tag.
    pub fn tone_hint(self) -> Option<&'static str> {
        match self {
            Self::ItemSelected => Some(
                "The player just selected an item in the room. Acknowledge it briefly before answering.",
            ),
            Self::SuggestionShown => Some(
                "A product suggestion was just shown to the player. Do not list products again; invite a reaction.",
            ),
            Self::MaterialApplied => Some(
                "A new material was just applied to the selected item. Comment on the new look in one sentence.",
            ),
            Self::NoMatch => Some(
                "No catalog item matched the last request. Apologize lightly and ask how to relax the constraints.",
            ),
            Self::ItemDeselected | Self::ItemPlaced | Self::ItemReplaced => None,
        }
    }
}

fn split_leading_brackets(text: &str) -> Option<(&str, &str)> {
    let body = text.trim_start().strip_prefix('[')?;
    let close = body.find(']')?;
    Some((&body[..close], body[close + 1..].trim_start()))
}

/// Removes any leading `[...]` tag, recognized or not, and trims the rest.
pub fn strip_leading_tag(text: &str) -> &str {
    match split_leading_brackets(text) {
        Some((_, rest)) => rest.trim(),
        None => text.trim(),
    }
}

/// True when the text is nothing but a bracketed tag.
pub fn is_tag_only(text: &str) -> bool {
    split_leading_brackets(text).is_some_and(|(_, rest)| rest.trim().is_empty())
}

/// Outbound frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Chunk(String),
    Final(String),
    Error(String),
    /// Encoded product record.
    Spec(String),
    /// Encoded material record.
    MatSpec(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Chunk(text) => write!(f, "CHUNK|{text}"),
            Reply::Final(text) => write!(f, "FINAL|{text}"),
            Reply::Error(message) => write!(f, "ERROR|{message}"),
            Reply::Spec(record) => write!(f, "SPEC|{record}"),
            Reply::MatSpec(record) => write!(f, "MATSPEC|{record}"),
        }
    }
}
