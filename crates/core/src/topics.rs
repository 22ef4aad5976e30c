use crate::models::{Chunk, TopicGrounding};
use std::collections::BTreeSet;

/// Pages whose chunks contain `topic` as a case-insensitive substring,
/// ascending and without duplicates.
pub fn find_topic_pages(chunks: &[Chunk], topic: &str) -> Vec<u32> {
    let needle = topic.to_lowercase();
    chunks
        .iter()
        .filter(|chunk| chunk.text.to_lowercase().contains(&needle))
        .map(|chunk| chunk.page_number)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn ground_topics<S: AsRef<str>>(chunks: &[Chunk], topics: &[S]) -> Vec<TopicGrounding> {
    topics
        .iter()
        .map(|topic| TopicGrounding {
            topic: topic.as_ref().to_string(),
            pages: find_topic_pages(chunks, topic.as_ref()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("This is about AI.", 1, 0, 17),
            Chunk::new("AI is interesting.", 1, 17, 35),
            Chunk::new("Machine learning is part of AI.", 2, 0, 31),
            Chunk::new("Deep learning is also part of AI.", 2, 31, 64),
        ]
    }

    #[test]
    fn finds_every_page_mentioning_topic() {
        assert_eq!(find_topic_pages(&chunks(), "AI"), vec![1, 2]);
    }

    #[test]
    fn match_ignores_case() {
        assert_eq!(find_topic_pages(&chunks(), "machine learning"), vec![2]);
        assert_eq!(find_topic_pages(&chunks(), "DEEP LEARNING"), vec![2]);
    }

    #[test]
    fn unknown_topic_has_no_pages() {
        assert!(find_topic_pages(&chunks(), "blockchain").is_empty());
    }

    #[test]
    fn blank_topics_are_matched_literally() {
        let mut chunks = chunks();
        chunks.push(Chunk::new("Table   of contents", 4, 0, 19));

        assert_eq!(find_topic_pages(&chunks, "   "), vec![4]);
        assert_eq!(find_topic_pages(&chunks, ""), vec![1, 2, 4]);
    }

    #[test]
    fn pages_come_back_sorted_regardless_of_chunk_order() {
        let mut shuffled = chunks();
        shuffled.reverse();
        shuffled.push(Chunk::new("AI again", 7, 0, 8));
        shuffled.insert(0, Chunk::new("more AI", 4, 0, 7));

        assert_eq!(find_topic_pages(&shuffled, "ai"), vec![1, 2, 4, 7]);
    }

    #[test]
    fn grounding_keeps_topic_order() {
        let grounded = ground_topics(&chunks(), &["machine learning", "blockchain", "AI"]);

        assert_eq!(
            grounded,
            vec![
                TopicGrounding {
                    topic: "machine learning".to_string(),
                    pages: vec![2]
                },
                TopicGrounding {
                    topic: "blockchain".to_string(),
                    pages: vec![]
                },
                TopicGrounding {
                    topic: "AI".to_string(),
                    pages: vec![1, 2]
                },
            ]
        );
    }
}
