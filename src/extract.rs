//! Entity extraction — pure text → typed artifacts.
//!
//! Runs on every inbound message, no LLM involved. Output merges into
//! the session's [`Intelligence`] sets; because values are normalized
//! here and the sets deduplicate, re-extracting identical text is a
//! no-op.
//!
//! Category precedence for ambiguous tokens is fixed: UPI handle >
//! phone number > generic digit run.

use std::sync::LazyLock;

use regex::Regex;

use crate::session::Intelligence;

/// `handle@provider` tokens. Email-shaped matches (dotted domain
/// after the `@`) are rejected in code since the token shape overlaps.
static UPI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z0-9][a-z0-9._-]*)@([a-z][a-z0-9]+(?:\.[a-z]{2,})*)\b").unwrap()
});

/// Scheme-prefixed or `www.` URLs.
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>()]+").unwrap());

/// Bare domains with a common TLD, optionally with a path.
static BARE_DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.(?:com|net|org|in|io|co|me|info|xyz|site|online|top|club|link)(?:/[^\s<>()]*)?")
        .unwrap()
});

/// Digit runs with optional `+CC` prefix and common separators.
static DIGIT_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d(?:[\d\s().\-]*\d)?").unwrap());

/// Words that force a nearby digit run to be read as an account number.
static ACCOUNT_CONTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:account|acct|ac\s*no|a/c)\b").unwrap());

/// Curated scam vocabulary for the weak-signal keyword set.
static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(blocked|block|verify|verification|urgent|urgently|immediately|account|otp|suspend|suspended|password|pin|cvv|kyc|lottery|prize|winner|refund|expire|expired|penalty|arrest|police|customs|fee|cashback|reward)\b",
    )
    .unwrap()
});

/// Extract every recognized artifact from `text`.
///
/// Never fails: unrecognizable or garbled input just yields an empty
/// result. The caller merges the result into session intelligence.
pub fn extract(text: &str) -> Intelligence {
    let mut intel = Intelligence::default();
    if text.is_empty() {
        return intel;
    }

    // Spans already claimed by a more specific category; digit runs
    // inside them are not re-classified.
    let mut claimed: Vec<(usize, usize)> = Vec::new();

    extract_upi_ids(text, &mut intel, &mut claimed);
    extract_links(text, &mut intel, &mut claimed);
    extract_numbers(text, &mut intel, &claimed);
    extract_keywords(text, &mut intel);

    intel
}

fn extract_upi_ids(text: &str, intel: &mut Intelligence, claimed: &mut Vec<(usize, usize)>) {
    for caps in UPI_RE.captures_iter(text) {
        let whole = caps.get(0).expect("capture 0 always present");
        let provider = &caps[2];
        // Dotted provider segment means an email address, not a UPI
        // handle (user@okaxis vs user@gmail.com).
        if provider.contains('.') {
            claimed.push((whole.start(), whole.end()));
            continue;
        }
        intel.upi_ids.insert(whole.as_str().to_lowercase());
        claimed.push((whole.start(), whole.end()));
    }
}

fn extract_links(text: &str, intel: &mut Intelligence, claimed: &mut Vec<(usize, usize)>) {
    for m in URL_RE.find_iter(text) {
        intel
            .phishing_links
            .insert(normalize_link(m.as_str()));
        claimed.push((m.start(), m.end()));
    }
    for m in BARE_DOMAIN_RE.find_iter(text) {
        if overlaps(claimed, m.start(), m.end()) {
            continue;
        }
        // The domain part of an email is not a link.
        if text[..m.start()].ends_with('@') {
            continue;
        }
        intel
            .phishing_links
            .insert(normalize_link(m.as_str()));
        claimed.push((m.start(), m.end()));
    }
}

fn extract_numbers(text: &str, intel: &mut Intelligence, claimed: &[(usize, usize)]) {
    for m in DIGIT_RUN_RE.find_iter(text) {
        if overlaps(claimed, m.start(), m.end()) {
            continue;
        }
        let raw = m.as_str();
        let has_plus = raw.starts_with('+');
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() < 9 || digits.len() > 18 {
            continue;
        }

        let account_context = has_account_context(text, m.start());
        // Precedence after UPI: an explicit `+CC` prefix or a plain
        // 10-digit run reads as a phone, unless the surrounding text
        // talks about an account. Everything else in range is an
        // account-like run.
        if !account_context && (has_plus || digits.len() == 10) {
            intel.phone_numbers.insert(digits);
        } else {
            intel.bank_accounts.insert(digits);
        }
    }
}

fn extract_keywords(text: &str, intel: &mut Intelligence) {
    for m in KEYWORD_RE.find_iter(text) {
        intel.suspicious_keywords.insert(m.as_str().to_lowercase());
    }
}

/// Look a short window back from `start` for account vocabulary.
fn has_account_context(text: &str, start: usize) -> bool {
    let window_start = text[..start]
        .char_indices()
        .rev()
        .take(24)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    ACCOUNT_CONTEXT_RE.is_match(&text[window_start..start])
}

fn overlaps(claimed: &[(usize, usize)], start: usize, end: usize) -> bool {
    claimed.iter().any(|(s, e)| start < *e && end > *s)
}

fn normalize_link(raw: &str) -> String {
    raw.trim_end_matches(['.', ',', ';', ':', '!', '?', ')'])
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_upi_handle() {
        let intel = extract("please pay to scammer@upi right away");
        assert!(intel.upi_ids.contains("scammer@upi"));
        assert!(intel.phone_numbers.is_empty());
    }

    #[test]
    fn email_is_not_a_upi_handle() {
        let intel = extract("write to support@gmail.com for help");
        assert!(intel.upi_ids.is_empty());
        // Nor does its domain half leak into the link set.
        assert!(intel.phishing_links.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "pay scammer@upi or call +91 98765 43210, see http://evil.example.com/login";
        let once = extract(text);
        let mut twice = once.clone();
        twice.merge(&extract(text));
        assert_eq!(once, twice);
    }

    #[test]
    fn ten_digit_run_is_a_phone() {
        let intel = extract("call me on 9876543210 now");
        assert!(intel.phone_numbers.contains("9876543210"));
        assert!(intel.bank_accounts.is_empty());
    }

    #[test]
    fn plus_prefixed_number_keeps_country_code() {
        let intel = extract("whatsapp +91-98765-43210");
        assert!(intel.phone_numbers.contains("919876543210"));
    }

    #[test]
    fn account_context_beats_phone_length() {
        let intel = extract("transfer to account 9876543210 today");
        assert!(intel.bank_accounts.contains("9876543210"));
        assert!(intel.phone_numbers.is_empty());
    }

    #[test]
    fn long_digit_run_is_account_like() {
        let intel = extract("deposit into 123456789012345");
        assert!(intel.bank_accounts.contains("123456789012345"));
    }

    #[test]
    fn short_digit_runs_are_ignored() {
        let intel = extract("your otp is 482913");
        assert!(intel.bank_accounts.is_empty());
        assert!(intel.phone_numbers.is_empty());
        assert!(intel.suspicious_keywords.contains("otp"));
    }

    #[test]
    fn urls_and_bare_domains_are_flagged() {
        let intel = extract("click https://Secure-Bank.xyz/verify or visit phish.top now");
        assert!(intel.phishing_links.contains("https://secure-bank.xyz/verify"));
        assert!(intel.phishing_links.contains("phish.top"));
    }

    #[test]
    fn keyword_scenario_from_contract() {
        let intel = extract("Your bank account will be blocked today. Verify immediately.");
        for kw in ["blocked", "verify", "account"] {
            assert!(intel.suspicious_keywords.contains(kw), "missing {kw}");
        }
    }

    #[test]
    fn garbage_input_yields_nothing() {
        let intel = extract("\u{fffd}\u{0000}☃☃☃");
        assert_eq!(intel.total_items(), 0);
    }
}
