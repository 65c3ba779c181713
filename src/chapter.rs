use once_cell::sync::Lazy;
use regex::Regex;

/// 无法识别的章节排在最后
pub const UNRANKED: u32 = 999;

static CHAPTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"第(.+?)章").expect("valid chapter pattern"));

fn cn_digit(c: char) -> Option<u32> {
    match c {
        '零' => Some(0),
        '一' => Some(1),
        '二' => Some(2),
        '三' => Some(3),
        '四' => Some(4),
        '五' => Some(5),
        '六' => Some(6),
        '七' => Some(7),
        '八' => Some(8),
        '九' => Some(9),
        '十' => Some(10),
        _ => None,
    }
}

/// 章节排序键：`导论` 最前，`第X章` 按数字，其余排最后
pub fn chapter_sort_key(name: &str) -> u32 {
    if name.contains("导论") {
        return 0;
    }
    let Some(caps) = CHAPTER.captures(name) else {
        return UNRANKED;
    };
    let numeral = &caps[1];

    if numeral.bytes().all(|b| b.is_ascii_digit()) {
        return numeral.parse().unwrap_or(UNRANKED);
    }

    let chars: Vec<char> = numeral.chars().collect();
    let digit = |c: char| cn_digit(c).unwrap_or(0);
    match chars.as_slice() {
        [single] => cn_digit(*single).unwrap_or(UNRANKED),
        ['十', ones] => 10 + digit(*ones),
        [tens, '十'] => digit(*tens) * 10,
        [tens, '十', ones] => digit(*tens) * 10 + digit(*ones),
        _ => UNRANKED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn introduction_always_first() {
        assert_eq!(chapter_sort_key("导论"), 0);
        assert_eq!(chapter_sort_key("第三章 导论补充"), 0);
    }

    #[test]
    fn chinese_numerals() {
        assert_eq!(chapter_sort_key("第一章 绪论"), 1);
        assert_eq!(chapter_sort_key("第十章"), 10);
        assert_eq!(chapter_sort_key("第十一章"), 11);
        assert_eq!(chapter_sort_key("第二十三章"), 23);
        assert_eq!(chapter_sort_key("第三十章"), 30);
        assert_eq!(chapter_sort_key("第九十九章"), 99);
    }

    #[test]
    fn ascii_digits() {
        assert_eq!(chapter_sort_key("第12章 网络"), 12);
        assert_eq!(chapter_sort_key("第99999999999章"), UNRANKED);
    }

    #[test]
    fn unrecognized_names_rank_last() {
        assert_eq!(chapter_sort_key("期末复习"), UNRANKED);
        assert_eq!(chapter_sort_key("第甲章"), UNRANKED);
        assert_eq!(chapter_sort_key("第一百零一章"), UNRANKED);
        assert_eq!(chapter_sort_key("第二三章"), UNRANKED);
    }

    #[test]
    fn stable_sort_keeps_ties_in_order() {
        let mut names = vec!["附录B", "第二章", "附录A", "导论", "第一章"];
        names.sort_by_key(|n| chapter_sort_key(n));
        assert_eq!(names, vec!["导论", "第一章", "第二章", "附录B", "附录A"]);
    }
}
