//! Look-alike and invisible character detection.
//!
//! Applied separately to the local-part and to each domain label, so an
//! internationalised label next to an ASCII TLD (`пример.com`) stays valid.
//! A unit is rejected when it:
//!
//! - contains an invisible or formatting character (zero-width, bidi
//!   controls, soft hyphen, variation selectors),
//! - mixes scripts outside the combinations a real writing system uses
//!   (Latin with Han and Kana, or Latin with Han and Hangul),
//! - is written in a single non-Latin script using only letters that are
//!   indistinguishable from Latin ones (`аррӏе` in Cyrillic).

use std::collections::BTreeSet;

use async_trait::async_trait;
use empath_common::parse_address;

use super::{Check, CheckKind, CheckResult, Reason};
use crate::error::CheckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Script {
    Latin,
    Greek,
    Cyrillic,
    Armenian,
    Hebrew,
    Arabic,
    Devanagari,
    Thai,
    Hangul,
    Hiragana,
    Katakana,
    Han,
    Other,
}

const JAPANESE: &[Script] = &[Script::Latin, Script::Han, Script::Hiragana, Script::Katakana];
const KOREAN: &[Script] = &[Script::Latin, Script::Han, Script::Hangul];

/// Cyrillic letters rendered like Latin ones
const CYRILLIC_CONFUSABLES: &str = "авсеһіјкмнорѕтухӏԁԛԝүАВЕКМНОРСТХЅІЈ";

/// Greek letters rendered like Latin ones
const GREEK_CONFUSABLES: &str = "οαινκτυρΑΒΕΖΗΙΚΜΝΟΡΤΥΧ";

/// Heuristic check for homoglyph and invisible character abuse.
#[derive(Debug, Default, Clone, Copy)]
pub struct AntiSpoofCheck;

#[async_trait]
impl Check for AntiSpoofCheck {
    fn kind(&self) -> CheckKind {
        CheckKind::AntiSpoof
    }

    async fn evaluate(&self, candidate: &str) -> Result<CheckResult, CheckError> {
        let mailbox = match parse_address(candidate) {
            Ok(parsed) => parsed.mailbox,
            Err(err) => return Ok(CheckResult::fail(Reason::Syntax, err.to_string())),
        };

        let units = std::iter::once(mailbox.local_part.as_str()).chain(mailbox.domain.labels());
        for unit in units {
            if let Some(problem) = inspect(unit) {
                return Ok(CheckResult::fail(Reason::Spoof, problem));
            }
        }

        Ok(CheckResult::Pass)
    }
}

/// Describe what is deceptive about `unit`, if anything.
fn inspect(unit: &str) -> Option<String> {
    if let Some(ch) = unit.chars().find(|&ch| is_invisible(ch)) {
        return Some(format!(
            "invisible character U+{:04X} in '{unit}'",
            u32::from(ch)
        ));
    }

    if unit.is_ascii() {
        return None;
    }

    let scripts: BTreeSet<Script> = unit.chars().filter_map(script_of).collect();

    if !is_allowed_mix(&scripts) {
        let names = scripts
            .iter()
            .map(|script| format!("{script:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        return Some(format!("mixed scripts ({names}) in '{unit}'"));
    }

    let confusables = match scripts.iter().next() {
        Some(Script::Cyrillic) if scripts.len() == 1 => CYRILLIC_CONFUSABLES,
        Some(Script::Greek) if scripts.len() == 1 => GREEK_CONFUSABLES,
        _ => return None,
    };

    let letters_all_confusable = unit
        .chars()
        .filter(|&ch| script_of(ch).is_some())
        .all(|ch| confusables.contains(ch));

    letters_all_confusable.then(|| format!("'{unit}' is made only of Latin look-alike letters"))
}

fn is_allowed_mix(scripts: &BTreeSet<Script>) -> bool {
    scripts.len() <= 1
        || scripts.iter().all(|script| JAPANESE.contains(script))
        || scripts.iter().all(|script| KOREAN.contains(script))
}

/// Script of a letter; `None` for digits, punctuation and combining marks.
fn script_of(ch: char) -> Option<Script> {
    if ch.is_ascii() {
        return ch.is_ascii_alphabetic().then_some(Script::Latin);
    }

    let script = match u32::from(ch) {
        0x00D7 | 0x00F7 | 0x0300..=0x036F => return None,
        0x00C0..=0x024F | 0x1E00..=0x1EFF => Script::Latin,
        0x0370..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
        0x0400..=0x052F | 0x2DE0..=0x2DFF | 0xA640..=0xA69F => Script::Cyrillic,
        0x0530..=0x058F => Script::Armenian,
        0x0590..=0x05FF => Script::Hebrew,
        0x0600..=0x06FF | 0x0750..=0x077F => Script::Arabic,
        0x0900..=0x097F => Script::Devanagari,
        0x0E00..=0x0E7F => Script::Thai,
        0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Script::Hangul,
        0x3040..=0x309F => Script::Hiragana,
        0x30A0..=0x30FF => Script::Katakana,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF => Script::Han,
        _ if ch.is_alphabetic() => Script::Other,
        _ => return None,
    };

    Some(script)
}

const fn is_invisible(ch: char) -> bool {
    matches!(
        ch,
        '\u{00AD}'
            | '\u{034F}'
            | '\u{061C}'
            | '\u{115F}'
            | '\u{1160}'
            | '\u{17B4}'
            | '\u{17B5}'
            | '\u{180B}'..='\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{3164}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{FEFF}'
            | '\u{FFA0}'
    )
}
