//! English sentence and term tokenization.
//!
//! Sentences are returned as slices of the input so the summary can only
//! ever contain text that was really there.

/// Lowercased forms that end with a period without ending a sentence
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "vs", "etc", "inc", "ltd", "co",
    "corp", "gen", "gov", "sen", "rep", "lt", "col", "capt", "sgt", "rev", "no", "fig", "approx",
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec", "u.s",
    "u.k", "u.n", "e.g", "i.e", "a.m", "p.m",
];

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "said", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn is_opening(c: char) -> bool {
    matches!(c, '"' | '\'' | '(' | '[' | '\u{201c}' | '\u{2018}')
}

/// A single capital letter, optionally followed by its period ("J" or "J.")
fn is_initial(token: &str) -> bool {
    let word = token
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches('.');
    let mut chars = word.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
}

fn is_roman_numeral_letter(token: &str) -> bool {
    matches!(token.trim_start_matches(|c: char| !c.is_alphanumeric()), "I" | "V" | "X")
}

/// Does the word just before a period look like an abbreviation or an initial?
///
/// `preceding` is the current sentence up to the period, `following` the text
/// after it. A single capital letter counts as an initial when it opens the
/// sentence, sits next to another initial ("J. R. Tolkien"), or follows a
/// capitalized word other than the opening one ("President John F. Kennedy").
/// "World War I." still ends its sentence, as does "Plan B." when it opens one.
fn ends_with_abbreviation(preceding: &str, following: &str) -> bool {
    let tokens: Vec<&str> = preceding.split_whitespace().collect();
    let Some(&last) = tokens.last() else {
        return false;
    };
    let word = last.trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.is_empty() {
        return false;
    }

    if is_initial(word) {
        if tokens.len() == 1 {
            return true;
        }
        let previous = tokens[tokens.len() - 2];
        let next = following.split_whitespace().next().unwrap_or("");
        if is_initial(previous) || (next.ends_with('.') && is_initial(next)) {
            return true;
        }
        let previous_capitalized = previous
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .chars()
            .next()
            .is_some_and(char::is_uppercase);
        return previous_capitalized && tokens.len() > 2 && !is_roman_numeral_letter(word);
    }

    let lowered = word.to_lowercase();
    ABBREVIATIONS.contains(&lowered.as_str())
}

/// Split text into trimmed sentence slices, in order.
///
/// A boundary is a run of `.`, `!` or `?` (plus closing quotes or brackets)
/// followed by whitespace and an uppercase letter, digit or opening quote,
/// or by the end of the text. A lone period after a known abbreviation or a
/// name initial does not end a sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !is_terminator(c) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && (is_terminator(chars[j].1) || is_closing(chars[j].1)) {
            j += 1;
        }
        let end = chars.get(j).map(|(p, _)| *p).unwrap_or(text.len());

        let boundary = if j == chars.len() {
            true
        } else if !chars[j].1.is_whitespace() {
            false
        } else {
            let next = chars[j..].iter().map(|(_, ch)| *ch).find(|ch| !ch.is_whitespace());
            let starts_new = next.map_or(true, |ch| ch.is_uppercase() || ch.is_ascii_digit() || is_opening(ch));
            let single_period = c == '.' && j == i + 1;
            starts_new && !(single_period && ends_with_abbreviation(&text[start..pos], &text[end..]))
        };

        if boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
        i = j;
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Lowercased content words of a sentence, stop words removed
pub fn terms(sentence: &str) -> Vec<String> {
    sentence
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|w| w.trim_matches(|c: char| c == '\'' || c == '\u{2019}'))
        .filter(|w| w.chars().any(char::is_alphabetic))
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let text = "The vote passed. Was it close? Nobody knows! Results follow.";
        assert_eq!(
            split_sentences(text),
            vec!["The vote passed.", "Was it close?", "Nobody knows!", "Results follow."]
        );
    }

    #[test]
    fn keeps_abbreviations_and_initials_together() {
        let text = "Mr. Smith met Dr. Jones in St. Louis. J. R. Tolkien wrote books. They left.";
        assert_eq!(
            split_sentences(text),
            vec![
                "Mr. Smith met Dr. Jones in St. Louis.",
                "J. R. Tolkien wrote books.",
                "They left."
            ]
        );
    }

    #[test]
    fn single_letters_that_are_not_initials_end_sentences() {
        let text = "Plan B. Officials declined to comment. It was the worst since World War I. \
                    Later, President John F. Kennedy spoke.";
        assert_eq!(
            split_sentences(text),
            vec![
                "Plan B.",
                "Officials declined to comment.",
                "It was the worst since World War I.",
                "Later, President John F. Kennedy spoke."
            ]
        );
    }

    #[test]
    fn decimals_and_lowercase_continuations_do_not_split() {
        let text = "Growth was 3.5 percent. prices rose... then fell. Markets closed.";
        assert_eq!(
            split_sentences(text),
            vec!["Growth was 3.5 percent. prices rose... then fell.", "Markets closed."]
        );
    }

    #[test]
    fn closing_quotes_stay_with_their_sentence() {
        let text = "He said \"we will win.\" The crowd cheered.";
        assert_eq!(
            split_sentences(text),
            vec!["He said \"we will win.\"", "The crowd cheered."]
        );
    }

    #[test]
    fn trailing_text_without_terminator_is_a_sentence() {
        assert_eq!(split_sentences("First one. and a tail"), vec!["First one. and a tail"]);
        assert_eq!(split_sentences("First one. Second tail"), vec!["First one.", "Second tail"]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn every_sentence_is_a_substring() {
        let text = "Storms hit the coast on Monday. Thousands lost power! Crews worked overnight? Yes.";
        for sentence in split_sentences(text) {
            assert!(text.contains(sentence));
        }
    }

    #[test]
    fn terms_drop_stop_words_and_punctuation() {
        assert_eq!(
            terms("The Government's plan, for 2024, is \"bold\"."),
            vec!["government's", "plan", "bold"]
        );
    }
}
