pub mod normalize;

use tracing::debug;

use crate::platform::Message;
pub use normalize::{normalize, normalize_opt};

/// Phrases that mark a human-verification prompt, checked in this order.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "captcha",
    "verify",
    "verification",
    "are you a real human",
    "verify that you are human",
    "please complete your captcha",
    "please complete this within 10 minutes",
    "please complete this within 120 minutes",
    "owobot.com/captcha",
];

/// Ordered, normalized, duplicate-free list of challenge phrases
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSet {
    phrases: Vec<String>,
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

impl KeywordSet {
    /// Build a set from arbitrary phrases. Each phrase is normalized; empty
    /// results and repeats are dropped, first occurrence wins.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self {
            phrases: Vec::new(),
        };
        set.extend(phrases);
        set
    }

    /// The default phrases followed by `extra`
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.extend(extra);
        set
    }

    fn extend<I, S>(&mut self, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in phrases {
            let phrase = normalize(phrase.as_ref());
            if !phrase.is_empty() && !self.phrases.contains(&phrase) {
                self.phrases.push(phrase);
            }
        }
    }

    /// First phrase contained in `buffer`, if any
    pub fn first_match(&self, buffer: &str) -> Option<&str> {
        self.phrases
            .iter()
            .find(|phrase| buffer.contains(phrase.as_str()))
            .map(String::as_str)
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

/// Outcome of inspecting a single message
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_challenge: bool,
    /// The phrase that triggered detection
    pub matched: Option<String>,
    /// Unnormalized text surfaces joined with spaces, for logs only
    pub raw_text: String,
}

/// Text surfaces of a message in scan order: body, then for each embed its
/// description, title, field names and values, and author name.
fn surfaces(message: &Message) -> Vec<Option<&str>> {
    let mut out = vec![message.content.as_deref()];
    for embed in &message.embeds {
        out.push(embed.description.as_deref());
        out.push(embed.title.as_deref());
        for field in &embed.fields {
            out.push(field.name.as_deref());
            out.push(field.value.as_deref());
        }
        out.push(embed.author.as_ref().and_then(|a| a.name.as_deref()));
    }
    out
}

/// Scans chat messages for captcha prompts
#[derive(Debug, Clone, Default)]
pub struct Detector {
    keywords: KeywordSet,
}

impl Detector {
    pub fn new(keywords: KeywordSet) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Normalized search buffer for one message
    pub fn search_buffer(message: &Message) -> String {
        surfaces(message)
            .into_iter()
            .map(normalize_opt)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn inspect(&self, message: &Message) -> Verdict {
        let parts = surfaces(message);

        let raw_text = parts
            .iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        let buffer = Self::search_buffer(message);
        let matched = self.keywords.first_match(&buffer).map(str::to_string);

        Verdict {
            is_challenge: matched.is_some(),
            matched,
            raw_text,
        }
    }

    /// First message in `messages` that carries a challenge
    pub fn find(&self, messages: &[Message]) -> Option<Verdict> {
        messages.iter().find_map(|message| {
            let verdict = self.inspect(message);
            debug!(
                "Message {} content: {}",
                message.id.as_deref().unwrap_or("?"),
                verdict.raw_text
            );
            verdict.is_challenge.then_some(verdict)
        })
    }

    /// True iff any message in the batch contains a challenge phrase
    pub fn detect(&self, messages: &[Message]) -> bool {
        self.find(messages).is_some()
    }
}
