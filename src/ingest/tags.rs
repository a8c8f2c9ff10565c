// src/ingest/tags.rs
//! Topical tag derivation from title + description. Keyword table union,
//! a baseline "ai" tag, and a few derived meta-tags.

use std::collections::BTreeSet;

use crate::ingest::classify::INFLUENTIAL_PEOPLE;

/// keyword -> tags it contributes. Keywords are matched as substrings of the
/// lower-cased content.
const TAG_TABLE: &[(&str, &[&str])] = &[
    ("openai", &["openai", "company"]),
    ("chatgpt", &["chatgpt"]),
    ("gpt-", &["chatgpt", "llm"]),
    ("anthropic", &["anthropic", "company"]),
    ("claude", &["claude", "llm"]),
    ("deepmind", &["deepmind", "google", "company"]),
    ("gemini", &["gemini", "google", "llm"]),
    ("google", &["google", "company"]),
    ("meta ai", &["meta", "company"]),
    ("llama", &["llama", "llm"]),
    ("hugging face", &["hugging-face", "open-source"]),
    ("open source", &["open-source"]),
    ("open-source", &["open-source"]),
    ("mistral", &["mistral", "company", "open-source"]),
    ("nvidia", &["nvidia", "company", "hardware"]),
    ("large language model", &["llm"]),
    ("llm", &["llm"]),
    ("machine learning", &["machine-learning"]),
    ("deep learning", &["machine-learning"]),
    ("neural network", &["machine-learning"]),
    ("generative", &["generative-ai"]),
    ("diffusion", &["generative-ai", "image-generation"]),
    ("classroom", &["education"]),
    ("education", &["education"]),
    ("student", &["education"]),
    ("teacher", &["education"]),
    ("school", &["education"]),
    ("university", &["education", "research"]),
    ("curriculum", &["education"]),
    ("literacy", &["education", "ai-literacy"]),
    ("research", &["research"]),
    ("paper", &["research"]),
    ("benchmark", &["research"]),
    ("regulation", &["policy"]),
    ("policy", &["policy"]),
    ("governance", &["policy"]),
    ("ai act", &["policy", "eu"]),
    ("ethics", &["ethics"]),
    ("bias", &["ethics"]),
    ("safety", &["safety"]),
    ("alignment", &["safety"]),
    ("robot", &["robotics"]),
    ("healthcare", &["healthcare"]),
    ("medicine", &["healthcare"]),
];

/// Terms marking an international event or body.
const INTERNATIONAL_EVENT_TERMS: &[&str] = &[
    "conference",
    "summit",
    "world economic forum",
    "davos",
    "unesco",
    "oecd",
    "g7",
    "g20",
    "neurips",
    "icml",
    "iclr",
];

/// Derive the tag set for an item. Deterministic: the result is an ordered
/// set, independent of table iteration details.
pub fn extract_tags(title: &str, description: &str) -> BTreeSet<String> {
    let content = format!("{} {}", title, description).to_lowercase();
    let mut tags = BTreeSet::new();

    // Baseline: everything that got past the relevance gate is AI news.
    tags.insert("ai".to_string());

    for (keyword, mapped) in TAG_TABLE {
        if content.contains(keyword) {
            for t in *mapped {
                tags.insert((*t).to_string());
            }
        }
    }

    if INFLUENTIAL_PEOPLE.iter().any(|p| content.contains(p)) {
        tags.insert("influential-expert".to_string());
    }
    if INTERNATIONAL_EVENT_TERMS.iter().any(|t| content.contains(t)) {
        tags.insert("international-event".to_string());
    }
    // Accented or non-Latin characters are a cheap signal for non-English
    // coverage.
    if content.chars().any(|c| !c.is_ascii() && c.is_alphabetic()) {
        tags.insert("international".to_string());
    }

    tags
}
