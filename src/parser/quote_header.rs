//! Quote attribution lines ("On … wrote:" and the Japanese Gmail form).

use std::sync::OnceLock;

use regex::Regex;

use crate::model::address::EmailAddress;
use crate::model::message::{QuoteGrammar, QuoteHeader};

/// `<addr>` or `<mailto:addr>`, capturing the bare address.
const EMAIL: &str = r"<(?:mailto:)?([^<>\s@]+@[^<>\s@]+)>";

struct Rule {
    grammar: QuoteGrammar,
    regex: Regex,
}

/// Attribution grammars in match order. Each regex captures date, name, email.
///
/// Names never contain `:`, so a Gmail line without the comma before the
/// name cannot be split inside its time by the prose rule.
fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let patterns = [
            (
                QuoteGrammar::Japanese,
                format!(
                    r"^(\d{{4}}年\d{{1,2}}月\d{{1,2}}日(?:\s*[(（][^)）]*[)）])?\s*\d{{1,2}}:\d{{2}})(?:\s+([^<>]*?))?\s*{EMAIL}\s*[:：]?\s*$"
                ),
            ),
            (
                QuoteGrammar::EnglishProse,
                format!(r"^On\s+([^/<>]+?),\s+([^,:<>]+?)\s*{EMAIL}\s*wrote:\s*$"),
            ),
            (
                QuoteGrammar::EnglishSlashDate,
                format!(
                    r"^On\s+(\d{{1,4}}/\d{{1,2}}/\d{{1,4}}\s+\d{{1,2}}:\d{{2}}(?:\s*[AP]M)?),\s+([^,:<>]+?)\s*{EMAIL}\s*wrote:\s*$"
                ),
            ),
            (
                QuoteGrammar::EnglishGmail,
                format!(
                    r"^On\s+([^<>]+?\d{{1,2}}:\d{{2}}(?:\s*[AP]M)?)\s+([^,<>]+?)\s*{EMAIL}\s*wrote:\s*$"
                ),
            ),
        ];
        patterns
            .into_iter()
            .map(|(grammar, pattern)| Rule {
                grammar,
                regex: Regex::new(&pattern).expect("valid quote header regex"),
            })
            .collect()
    })
}

/// Match one line (quote prefix already removed) against the attribution grammars.
///
/// The whole trimmed line must match; a line that merely contains a date is
/// not a header.
pub fn match_quote_header(line: &str) -> Option<QuoteHeader> {
    let line = line.trim();
    if line.is_empty() || !line.contains('@') {
        return None;
    }

    rules().iter().find_map(|rule| {
        let caps = rule.regex.captures(line)?;
        let date_str = caps.get(1)?.as_str().trim().to_string();
        let name = caps.get(2).map_or("", |m| m.as_str());
        let email = caps.get(3)?.as_str();
        let address = EmailAddress::from_parts(name, email);
        Some(QuoteHeader {
            date_str,
            display_name: address.display_name,
            email_address: address.address,
            grammar: rule.grammar,
        })
    })
}
