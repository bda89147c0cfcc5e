//! Reading time estimation

use super::Section;

/// Number of whitespace-delimited words in `text`
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words in every heading and body block of a post
pub fn total_words(sections: &[Section]) -> usize {
    sections
        .iter()
        .map(|section| {
            count_words(&section.heading)
                + section
                    .body
                    .iter()
                    .map(|block| count_words(&block.text))
                    .sum::<usize>()
        })
        .sum()
}

/// Estimated reading time in whole minutes, rounded up
///
/// `words_per_minute` must be non-zero; the site config enforces this.
pub fn reading_time(sections: &[Section], words_per_minute: usize) -> usize {
    total_words(sections).div_ceil(words_per_minute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::RichTextBlock;

    fn section(heading: &str, body: &[&str]) -> Section {
        Section {
            heading: heading.to_string(),
            body: body.iter().map(|t| RichTextBlock::paragraph(*t)).collect(),
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   "), 0);
        assert_eq!(count_words("a b  c\n d\te"), 5);
    }

    #[test]
    fn test_intro_example() {
        let sections = vec![section("Intro", &["a b c"])];
        assert_eq!(total_words(&sections), 4);
        assert_eq!(reading_time(&sections, 200), 1);
    }

    #[test]
    fn test_rounding_boundaries() {
        assert_eq!(reading_time(&[], 200), 0);
        assert_eq!(reading_time(&[section("", &[&words(200)])], 200), 1);
        assert_eq!(reading_time(&[section("", &[&words(201)])], 200), 2);
    }

    #[test]
    fn test_accumulates_across_sections_and_blocks() {
        let sections = vec![
            section("Primeira parte", &[&words(150), &words(50)]),
            section("Segunda", &[&words(99)]),
        ];
        assert_eq!(total_words(&sections), 2 + 200 + 1 + 99);
        assert_eq!(reading_time(&sections, 200), 2);
    }

    #[test]
    fn test_blocks_without_text_add_nothing() {
        let mut image = RichTextBlock::paragraph("");
        image.kind = crate::cms::BlockKind::Image;
        let sections = vec![Section {
            heading: String::new(),
            body: vec![image],
        }];
        assert_eq!(reading_time(&sections, 200), 0);
    }
}
