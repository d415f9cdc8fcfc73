//! Canned replies for conversation that is not about the data.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATA_WORDS: Regex =
        Regex::new(r"\b(scripts?|forms?|services?|fields?|count|list|diagnosis|progress note|phd)\b").unwrap();
    static ref GREETING: Regex =
        Regex::new(r"\b(hi|hello|hey|good morning|good afternoon|good evening)\b").unwrap();
    static ref THANKS: Regex = Regex::new(r"\b(thank you|thanks|thx|appreciate it)\b").unwrap();
    static ref HOW_ARE_YOU: Regex = Regex::new(r"\b(how are you|how's it going|how are things)\b").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallTalk {
    Greeting,
    Thanks,
    HowAreYou,
    Other,
}

/// Recognizes small talk from the user's own words. Text mentioning anything
/// that looks like a data question is never small talk.
pub fn detect(text: &str) -> Option<SmallTalk> {
    let text = text.trim().to_lowercase();
    if DATA_WORDS.is_match(&text) {
        return None;
    }
    if GREETING.is_match(&text) {
        Some(SmallTalk::Greeting)
    } else if THANKS.is_match(&text) {
        Some(SmallTalk::Thanks)
    } else if HOW_ARE_YOU.is_match(&text) {
        Some(SmallTalk::HowAreYou)
    } else {
        None
    }
}

pub fn reply(kind: SmallTalk) -> &'static str {
    match kind {
        SmallTalk::Greeting => "Hello! How can I assist you with EHR scripts today?",
        SmallTalk::Thanks => "You're welcome! Happy to help.",
        SmallTalk::HowAreYou => "I'm doing well, thanks for asking! What would you like to know about the scripts?",
        SmallTalk::Other => "I'm here to answer questions about EHR scripts, forms, fields and services.",
    }
}
