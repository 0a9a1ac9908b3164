use std::fmt::Write;

/// Cap on texts included when labeling a single group.
pub(crate) const LABEL_SAMPLE_LIMIT: usize = 10;

pub(crate) const ANALYZE_SYSTEM: &str = "You are a teaching-assistant triage service for a programming course. \
Given one student question, respond with strict JSON only — no markdown fences, no commentary. \
Schema: {\"keywords\": [string], \"difficulty_score\": number between 0 and 1, \
\"sentiment\": \"negative\"|\"neutral\"|\"positive\", \"summary\": string}. \
Keywords are 1-5 short technical terms in the question's language.";

pub(crate) const DRAFT_SYSTEM: &str = "You are a friendly teaching assistant for a programming course. \
Write a concise, encouraging draft reply to the student's question. \
Plain text only, at most three short paragraphs.";

pub(crate) const LABEL_SYSTEM: &str = "You name groups of related student questions. \
Respond with strict JSON only — no markdown fences. \
Schema: {\"topic_label\": string, \"summary\": string}. \
The label is a concise noun phrase (2-5 words); the summary is one sentence.";

pub(crate) const CLUSTER_SYSTEM: &str = "You group student questions into topics. \
Respond with strict JSON only — no markdown fences, no commentary. \
Schema: {\"clusters\": [{\"topic_label\": string, \"summary\": string, \
\"question_indices\": [integer]}]}.";

/// Build the user prompt for `cluster_many`. States the contract the caller
/// later re-validates: prefer existing labels, bounded new-topic budget,
/// every index covered, near-duplicates merged.
pub(crate) fn cluster_user_prompt(
    texts: &[String],
    max_new_topics: usize,
    existing_topics: &[String],
) -> String {
    let mut prompt = String::new();

    if existing_topics.is_empty() {
        prompt.push_str("There are no existing topics yet.\n");
    } else {
        prompt.push_str("Existing topics (reuse these labels verbatim whenever a question fits; reusing costs nothing):\n");
        for label in existing_topics {
            let _ = writeln!(prompt, "- {label}");
        }
    }

    let _ = writeln!(
        prompt,
        "\nRules:\n\
         1. Prefer assigning questions to an existing topic label.\n\
         2. Create at most {max_new_topics} new topics beyond the existing ones.\n\
         3. Every question index from 0 to {} must appear in exactly one cluster — no omissions.\n\
         4. Merge semantically similar topics instead of creating near-duplicates.",
        texts.len().saturating_sub(1)
    );

    prompt.push_str("\nQuestions:\n");
    for (i, text) in texts.iter().enumerate() {
        let _ = writeln!(prompt, "[{i}] {text}");
    }

    prompt
}

/// Build the user prompt for `label_cluster` from up to the first 10 texts.
pub(crate) fn label_user_prompt(texts: &[String]) -> String {
    let mut prompt = String::from("Questions in this group:\n");
    for text in texts.iter().take(LABEL_SAMPLE_LIMIT) {
        let _ = writeln!(prompt, "- {text}");
    }
    prompt
}
