// src/ingest/classify.rs
//! Relevance gate for feed items. A deliberately permissive allow-list
//! filter: recall over precision, since a missed AI-education story costs
//! more than an occasional off-topic one slipping through to curation.

/// Named individuals whose statements are newsworthy for the platform.
/// Shared with the tag extractor for the influential-expert meta-tag.
pub(crate) const INFLUENTIAL_PEOPLE: &[&str] = &[
    "sam altman",
    "demis hassabis",
    "dario amodei",
    "yann lecun",
    "geoffrey hinton",
    "yoshua bengio",
    "andrew ng",
    "fei-fei li",
    "ilya sutskever",
    "andrej karpathy",
    "mustafa suleyman",
    "jensen huang",
];

const ORGANIZATIONS: &[&str] = &[
    "openai",
    "deepmind",
    "anthropic",
    "hugging face",
    "google ai",
    "meta ai",
    "microsoft research",
    "mistral",
    "stability ai",
    "nvidia",
    "allen institute",
    "unesco",
    "oecd",
];

/// Broad AI/ML/education vocabulary, multilingual terms and conference
/// acronyms included.
const KEYWORDS: &[&str] = &[
    "artificial intelligence",
    " ai ",
    "machine learning",
    "deep learning",
    "neural network",
    "large language model",
    " llm",
    "generative ai",
    "foundation model",
    "chatgpt",
    "gpt-",
    "gemini",
    "claude",
    "llama",
    "transformer",
    "prompt engineering",
    "ai literacy",
    "ai education",
    "ai classroom",
    "edtech",
    "ai policy",
    "ai regulation",
    "ai safety",
    "ai ethics",
    "responsible ai",
    // multilingual
    "intelligence artificielle",
    "inteligencia artificial",
    "intelligenza artificiale",
    "künstliche intelligenz",
    "umělá inteligence",
    "sztuczna inteligencja",
    "人工知能",
    "人工智能",
    "인공지능",
    // conferences
    "neurips",
    "icml",
    "iclr",
    "aaai",
    "cvpr",
    "emnlp",
    "aied",
];

/// True when the item is AI-education-relevant. Pure; runs per item in a
/// tight loop, so it is plain lower-case substring containment.
pub fn is_relevant(title: &str, description: &str) -> bool {
    // Pad with spaces so word-ish needles like " ai " can match at the edges.
    let content = format!(" {} {} ", title.to_lowercase(), description.to_lowercase());

    KEYWORDS.iter().any(|k| content.contains(k))
        || INFLUENTIAL_PEOPLE.iter().any(|p| content.contains(p))
        || ORGANIZATIONS.iter().any(|o| content.contains(o))
}
