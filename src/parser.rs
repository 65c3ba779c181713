//! 题目文本解析：把 `"题干 A. 选项 B. 选项"` 拆成题干和有序选项列表。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// 选项标记：A. 到 H.，后面可以跟空白
static OPTION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-H])\.\s*").expect("valid option marker pattern"));
// 下一个选项的起点（空白 + 字母 + 点）
static NEXT_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[A-H]\.").expect("valid option boundary pattern"));
static FIRST_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+A\.").expect("valid first option pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOption {
    pub letter: char,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuestion {
    pub stem: String,
    pub options: Vec<QuestionOption>,
}

/// 选项保持原文顺序；识别不出选项时整段作为题干
pub fn parse_question(raw: &str) -> ParsedQuestion {
    let text = raw.trim();
    let mut options = Vec::new();
    let mut pos = 0;

    while let Some(caps) = OPTION_MARKER.captures_at(text, pos) {
        let (Some(letter), Some(marker)) = (caps.get(1), caps.get(0)) else {
            break;
        };
        let body_start = marker.end();
        // 选项内容至少一个字符
        let Some(first) = text[body_start..].chars().next() else {
            break;
        };
        let end = NEXT_OPTION
            .find_at(text, body_start + first.len_utf8())
            .map_or(text.len(), |m| m.start());

        options.push(QuestionOption {
            letter: letter.as_str().chars().next().unwrap_or('A'),
            text: text[body_start..end].trim().to_string(),
        });
        pos = end;
    }

    let stem = if options.is_empty() {
        text
    } else {
        FIRST_OPTION
            .find(text)
            .map_or(text, |m| text[..m.start()].trim())
    };

    ParsedQuestion {
        stem: stem.to_string(),
        options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(parsed: &ParsedQuestion) -> String {
        parsed.options.iter().map(|o| o.letter).collect()
    }

    #[test]
    fn splits_stem_and_options() {
        let parsed = parse_question("Stem A. opt1 B. opt2");
        assert_eq!(parsed.stem, "Stem");
        assert_eq!(
            parsed.options,
            vec![
                QuestionOption { letter: 'A', text: "opt1".into() },
                QuestionOption { letter: 'B', text: "opt2".into() },
            ]
        );
    }

    #[test]
    fn no_options_keeps_trimmed_text() {
        let parsed = parse_question("  判断：地球是圆的。  ");
        assert_eq!(parsed.stem, "判断：地球是圆的。");
        assert!(parsed.options.is_empty());
    }

    #[test]
    fn keeps_source_order() {
        let parsed = parse_question("哪个正确？ B. 乙 A. 甲 C. 丙");
        assert_eq!(letters(&parsed), "BAC");
        assert_eq!(parsed.stem, "哪个正确？ B. 乙");
        assert_eq!(parsed.options[1].text, "甲");
    }

    #[test]
    fn ignores_letters_after_h() {
        let parsed = parse_question("Pick A. one H. eight I. nine");
        assert_eq!(letters(&parsed), "AH");
        assert_eq!(parsed.options[1].text, "eight I. nine");
    }

    #[test]
    fn newlines_are_whitespace() {
        let parsed = parse_question("下列说法\nA. 第一项\nB. 第二项\nC.第三项");
        assert_eq!(parsed.stem, "下列说法");
        assert_eq!(letters(&parsed), "ABC");
        assert_eq!(parsed.options[2].text, "第三项");
    }

    #[test]
    fn options_without_leading_a_keep_full_stem() {
        let parsed = parse_question("Only B. beta C. gamma");
        assert_eq!(parsed.stem, "Only B. beta C. gamma");
        assert_eq!(letters(&parsed), "BC");
    }

    #[test]
    fn trailing_marker_without_text_is_dropped() {
        let parsed = parse_question("Stem A. yes B.");
        assert_eq!(letters(&parsed), "A");
        assert_eq!(parsed.options[0].text, "yes");
    }
}
