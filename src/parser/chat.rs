//! Chat-service bracket markup (`[To:123]`, `[qt]…[/qt]`, `[info]`, …) to plain text.

use std::sync::OnceLock;

use regex::Regex;

/// `(pattern, replacement)` pairs, applied in order.
fn markup_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // Mentions and reply markers, with the auto-inserted "Name さん" line
            (r"\[To:\d+\](?:[ \t]*[^\s\[]{1,20}[ \t]*さん[ \t]*(?:\n|$))?", ""),
            (
                r"\[(?:rp|返信) aid=\d+ to=\d+-\d+\](?:[ \t]*[^\s\[]{1,20}[ \t]*さん[ \t]*(?:\n|$))?",
                "",
            ),
            (r"(?i)\[toall\]", ""),
            (r"\[picon(?:name)?:\d+\]", ""),
            // Quotes keep their text, lose their metadata
            (r"\[qtmeta[^\]]*\]", ""),
            (r"\[qt\]", ""),
            (r"\[/qt\]", "\n"),
            (r"\[info\]", ""),
            (r"\[/info\]", "\n"),
            (r"\[title\]", ""),
            (r"\[/title\]", "\n"),
            (r"\[hr\]", "\n"),
            (r"\[/?code\]", ""),
            (r"\[preview[^\]]*\]", ""),
            (r"(?s)\[download:\d+\](.*?)\[/download\]", "$1"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("valid chat markup regex"),
                replacement,
            )
        })
        .collect()
    })
}

fn blank_run_re() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blank run regex"))
}

/// Strip chat markup from a message body.
///
/// Quoted and info-block text is kept; mentions, reply markers, icons and
/// quote metadata are removed. Lines are trimmed and runs of blank lines
/// collapse to one.
pub fn clean_chat_markup(text: &str) -> String {
    let mut cleaned = text.replace("\r\n", "\n");
    for (regex, replacement) in markup_rules() {
        cleaned = regex.replace_all(&cleaned, *replacement).into_owned();
    }

    let joined = cleaned.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    blank_run_re()
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_removed() {
        assert_eq!(
            clean_chat_markup("[To:12345]田中太郎さん\n明日の件、確認お願いします。"),
            "明日の件、確認お願いします。"
        );
        assert_eq!(clean_chat_markup("[toall]\nお知らせです"), "お知らせです");
    }

    #[test]
    fn test_san_in_message_text_is_kept() {
        assert_eq!(
            clean_chat_markup("[To:123] 明日は山田さんと打ち合わせです"),
            "明日は山田さんと打ち合わせです"
        );
        assert_eq!(
            clean_chat_markup("[To:123]佐藤さん\n鈴木さんにも共有してください"),
            "鈴木さんにも共有してください"
        );
        assert_eq!(
            clean_chat_markup("[rp aid=1 to=2-3]田中さん、了解です"),
            "田中さん、了解です"
        );
    }

    #[test]
    fn test_mention_without_name() {
        assert_eq!(clean_chat_markup("[To:1] hello"), "hello");
    }

    #[test]
    fn test_reply_marker_removed() {
        assert_eq!(
            clean_chat_markup("[rp aid=111 to=222-333] Suzuki さん\nOK です"),
            "OK です"
        );
    }

    #[test]
    fn test_quote_keeps_text() {
        let input = "[qt][qtmeta aid=1 time=1700000000]original words[/qt]my reply";
        assert_eq!(clean_chat_markup(input), "original words\nmy reply");
    }

    #[test]
    fn test_info_and_title() {
        let input = "[info][title]Release[/title]v1.2 is out[hr]see notes[/info]";
        assert_eq!(clean_chat_markup(input), "Release\nv1.2 is out\nsee notes");
    }

    #[test]
    fn test_icons_code_and_download() {
        let input = "[piconname:42] said:\n[code]let x = 1;[/code]\n[download:99]report.pdf[/download]";
        assert_eq!(clean_chat_markup(input), "said:\nlet x = 1;\nreport.pdf");
    }

    #[test]
    fn test_blank_lines_collapse() {
        assert_eq!(clean_chat_markup("a\n\n\n\n\nb\r\n"), "a\n\nb");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(clean_chat_markup("no markup [here]"), "no markup [here]");
    }
}
