//! Scoring prompt assembly.

use climate_core::{EmotionKind, Post};

/// Post bodies longer than this are cut before they reach the prompt.
pub const MAX_BODY_CHARS: usize = 1_000;

const INSTRUCTIONS: &str = r#"You are the emotion analyst for a university campus community board.
Read all of the posts below and rate how strongly each of six emotions is expressed across them as a whole.

Rules:
1. Respond with ONE JSON object and nothing else. No explanations, no markdown, no code fences.
2. Use exactly these keys: {keys}.
3. Every value is an integer from 1 to 100.
4. IMPORTANT: if an emotion is only weakly felt or not present, you MUST score it low (1-20). Reserve high scores for emotions that are clearly and strongly expressed."#;

const OUTPUT_EXAMPLE: &str = r#"{"depression": 10, "brightness": 60, "excitement": 45, "anger": 5, "sadness": 12, "thrill": 30}"#;

/// Build the prompt for one chunk of posts.
pub fn build_prompt(posts: &[Post]) -> String {
    let keys = EmotionKind::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = INSTRUCTIONS.replace("{keys}", &keys);
    prompt.push_str("\n\nPosts:\n");

    for (i, post) in posts.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. Title: {}\n   Body: {}\n",
            i + 1,
            single_line(&post.title),
            truncate(&single_line(&post.body), MAX_BODY_CHARS),
        ));
    }

    prompt.push_str("\nOutput format (JSON only):\n");
    prompt.push_str(OUTPUT_EXAMPLE);
    prompt
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}
