//! RFC 5322 addr-spec parser for candidate email addresses
//!
//! This module parses a bare address (no angle brackets, no display name) the
//! way it appears in an address list, and reports two kinds of findings:
//!
//! - **Errors** make the address unusable and stop the parse.
//! - **Warnings** are constructs the grammar allows but that are obsolete or
//!   discouraged in practice (quoted local-parts, comments, address literals,
//!   oversized parts). A parse with warnings still yields a [`Mailbox`].
//!
//! UTF-8 is accepted in the local-part and in domain labels (RFC 6531), so
//! look-alike characters can reach later checks instead of being rejected as
//! plain syntax errors.
//!
//! # ABNF Grammar (RFC 5322 Section 3.4.1, RFC 5321 Section 4.1.2)
//!
//! ```text
//! addr-spec      = local-part "@" domain
//! local-part     = [CFWS] ( dot-atom-text / quoted-string ) [CFWS]
//! domain         = [CFWS] ( dot-atom-text / domain-literal ) [CFWS]
//! dot-atom-text  = 1*atext *("." 1*atext)
//! quoted-string  = DQUOTE *( qtext / quoted-pair ) DQUOTE
//! quoted-pair    = "\" ( VCHAR / WSP )
//! CFWS           = 1*( [FWS] comment ) [FWS] / FWS
//! comment        = "(" *( [FWS] ccontent ) [FWS] ")"
//! sub-domain     = Let-dig [Ldh-str]
//! address-literal = "[" ( IPv4-address-literal / IPv6-address-literal /
//!                         General-address-literal ) "]"
//!
//! atext          = ALPHA / DIGIT / "!" / "#" / "$" / "%" / "&" / "'" /
//!                  "*" / "+" / "-" / "/" / "=" / "?" / "^" / "_" / "`" /
//!                  "{" / "|" / "}" / "~" / UTF8-non-ascii
//! ```
//!
//! # Size Constraints
//!
//! - Local-part longer than 64 octets: warning
//! - Address longer than 254 octets: warning
//! - Domain longer than 255 octets in A-label form: error
//! - Domain label longer than 63 octets in A-label form: error

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::domain::Domain;

/// Result type for address parsing
pub type Result<T> = std::result::Result<T, AddressError>;

const MAX_LOCAL_PART: usize = 64;
const MAX_ADDRESS: usize = 254;
const MAX_DOMAIN: usize = 255;
const MAX_LABEL: usize = 63;

/// Errors that can occur during address parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Empty or whitespace-only input
    Empty,
    /// Missing '@' separator
    MissingAtSign,
    /// Domain exceeds 255 octets
    DomainTooLong,
    /// A domain label exceeds 63 octets
    LabelTooLong(String),
    /// Control characters are never valid in an address
    ControlCharacter,
    /// Invalid character in local-part
    InvalidLocalPart(String),
    /// Invalid character in domain
    InvalidDomain(String),
    /// Invalid address literal format
    InvalidAddressLiteral(String),
    /// Unclosed quoted string
    UnclosedQuotedString,
    /// Invalid character in quoted string
    InvalidQuotedString(String),
    /// Comment opened with '(' but never closed
    UnclosedComment,
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty address"),
            Self::MissingAtSign => write!(f, "Missing '@' separator"),
            Self::DomainTooLong => write!(f, "Domain exceeds {MAX_DOMAIN} octets"),
            Self::LabelTooLong(label) => {
                write!(f, "Domain label '{label}' exceeds {MAX_LABEL} octets")
            }
            Self::ControlCharacter => write!(f, "Address contains a control character"),
            Self::InvalidLocalPart(s) => write!(f, "Invalid local-part: {s}"),
            Self::InvalidDomain(s) => write!(f, "Invalid domain: {s}"),
            Self::InvalidAddressLiteral(s) => write!(f, "Invalid address literal: {s}"),
            Self::UnclosedQuotedString => write!(f, "Unclosed quoted string in local-part"),
            Self::InvalidQuotedString(s) => write!(f, "Invalid quoted string: {s}"),
            Self::UnclosedComment => write!(f, "Unclosed comment"),
        }
    }
}

impl std::error::Error for AddressError {}

/// Legal but discouraged constructs found while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressWarning {
    /// Local-part is a quoted string
    QuotedString,
    /// A comment appears around the local-part or domain
    Comment,
    /// Folding whitespace surrounds the local-part or domain
    Cfws,
    /// Domain is an address literal rather than a name
    AddressLiteral,
    /// Domain is a single label with no dot
    TldOnly,
    /// Local-part exceeds 64 octets
    LocalPartTooLong,
    /// Whole address exceeds 254 octets
    AddressTooLong,
}

impl std::fmt::Display for AddressWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::QuotedString => "quoted local-part",
            Self::Comment => "comment",
            Self::Cfws => "whitespace around address part",
            Self::AddressLiteral => "address literal domain",
            Self::TldOnly => "domain without a dot",
            Self::LocalPartTooLong => "local-part longer than 64 octets",
            Self::AddressTooLong => "address longer than 254 octets",
        })
    }
}

/// A parsed mailbox (local-part@domain)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Mailbox {
    /// The local part (before @), without surrounding comments or whitespace
    pub local_part: String,
    /// The domain or address literal (after @)
    pub domain: Domain,
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// A successfully parsed address together with any warnings raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub mailbox: Mailbox,
    /// Sorted and deduplicated
    pub warnings: Vec<AddressWarning>,
}

impl ParsedAddress {
    /// Returns `true` when the address parsed without any warning.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Parse a bare addr-spec such as `user@example.com`.
///
/// # Errors
///
/// Returns `AddressError` if the input is not a valid address. Discouraged but
/// legal constructs are reported through [`ParsedAddress::warnings`] instead.
pub fn parse_address(input: &str) -> Result<ParsedAddress> {
    if input.trim().is_empty() {
        return Err(AddressError::Empty);
    }

    if input.chars().any(|ch| ch.is_control() && ch != '\t') {
        return Err(AddressError::ControlCharacter);
    }

    let mut warnings = Vec::new();
    let at_pos = find_unquoted_at(input)?;

    let local_raw = strip_cfws(&input[..at_pos], &mut warnings)?;
    let domain_raw = strip_cfws(&input[at_pos + 1..], &mut warnings)?;

    let local_part = parse_local_part(local_raw, &mut warnings)?;
    let domain = parse_domain_or_address_literal(domain_raw, &mut warnings)?;

    if local_part.len() > MAX_LOCAL_PART {
        warnings.push(AddressWarning::LocalPartTooLong);
    }
    if local_part.len() + 1 + domain.len() > MAX_ADDRESS {
        warnings.push(AddressWarning::AddressTooLong);
    }

    warnings.sort_unstable();
    warnings.dedup();

    Ok(ParsedAddress {
        mailbox: Mailbox {
            local_part,
            domain: Domain::new(domain),
        },
        warnings,
    })
}

/// Find the byte position of the '@' that is not inside a quoted string,
/// comment or address literal
fn find_unquoted_at(input: &str) -> Result<usize> {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut comment_depth = 0usize;
    let mut escaped = false;

    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match ch {
            '\\' if in_quotes || comment_depth > 0 => escaped = true,
            '"' if !in_brackets && comment_depth == 0 => in_quotes = !in_quotes,
            '(' if !in_quotes && !in_brackets => comment_depth += 1,
            ')' if !in_quotes && !in_brackets && comment_depth > 0 => comment_depth -= 1,
            '[' if !in_quotes && comment_depth == 0 => in_brackets = true,
            ']' if !in_quotes && comment_depth == 0 => in_brackets = false,
            '@' if !in_quotes && !in_brackets && comment_depth == 0 => return Ok(i),
            _ => {}
        }
    }

    if in_quotes {
        Err(AddressError::UnclosedQuotedString)
    } else if comment_depth > 0 {
        Err(AddressError::UnclosedComment)
    } else {
        Err(AddressError::MissingAtSign)
    }
}

/// Remove comments and folding whitespace from both ends of an address part
fn strip_cfws<'a>(part: &'a str, warnings: &mut Vec<AddressWarning>) -> Result<&'a str> {
    let mut rest = part;

    loop {
        let trimmed = rest.trim_start_matches([' ', '\t']);
        if trimmed.len() != rest.len() {
            warnings.push(AddressWarning::Cfws);
        }
        rest = trimmed;

        if !rest.starts_with('(') {
            break;
        }
        warnings.push(AddressWarning::Comment);
        rest = &rest[leading_comment_end(rest)?..];
    }

    loop {
        let trimmed = rest.trim_end_matches([' ', '\t']);
        if trimmed.len() != rest.len() {
            warnings.push(AddressWarning::Cfws);
        }
        rest = trimmed;

        // A stray ')' is left for the part parser to reject
        let Some(start) = trailing_comment_start(rest) else {
            break;
        };
        warnings.push(AddressWarning::Comment);
        rest = &rest[..start];
    }

    Ok(rest)
}

/// Byte index just past the comment that opens `input`
fn leading_comment_end(input: &str) -> Result<usize> {
    let mut depth = 0usize;
    let mut escaped = false;

    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match ch {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
    }

    Err(AddressError::UnclosedComment)
}

/// Byte index of the '(' whose matching ')' is the last character of `input`
fn trailing_comment_start(input: &str) -> Option<usize> {
    if !input.ends_with(')') {
        return None;
    }

    let mut depth = 0usize;
    let mut open = None;
    let mut escaped = false;
    let mut in_quotes = false;

    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match ch {
            '\\' if in_quotes || depth > 0 => escaped = true,
            '"' if depth == 0 => in_quotes = !in_quotes,
            '(' if !in_quotes => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            ')' if !in_quotes && depth > 0 => {
                depth -= 1;
                if depth == 0 && i + 1 == input.len() {
                    return open;
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a local-part: Dot-string or Quoted-string
fn parse_local_part(input: &str, warnings: &mut Vec<AddressWarning>) -> Result<String> {
    if input.is_empty() {
        return Err(AddressError::InvalidLocalPart(
            "Empty local-part".to_string(),
        ));
    }

    if input.starts_with('"') {
        warnings.push(AddressWarning::QuotedString);
        parse_quoted_string(input)
    } else {
        parse_dot_string(input)
    }
}

/// Parse a Dot-string: Atom *("." Atom)
fn parse_dot_string(input: &str) -> Result<String> {
    if input.starts_with('.') || input.ends_with('.') {
        return Err(AddressError::InvalidLocalPart(
            "Dot-string cannot start or end with '.'".to_string(),
        ));
    }

    if input.contains("..") {
        return Err(AddressError::InvalidLocalPart(
            "Dot-string cannot contain consecutive dots".to_string(),
        ));
    }

    for atom in input.split('.') {
        if let Some(ch) = atom.chars().find(|&ch| !is_atext(ch)) {
            return Err(AddressError::InvalidLocalPart(format!(
                "Invalid character '{ch}' in atom"
            )));
        }
    }

    Ok(input.to_string())
}

/// Parse a Quoted-string: DQUOTE *( qtext / quoted-pair ) DQUOTE
fn parse_quoted_string(input: &str) -> Result<String> {
    if input.len() < 2 || !input.ends_with('"') {
        return Err(AddressError::UnclosedQuotedString);
    }

    let content = &input[1..input.len() - 1];

    let mut chars = content.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next_ch)
                    if next_ch.is_ascii_graphic() || next_ch == ' ' || next_ch == '\t' => {}
                Some(next_ch) => {
                    return Err(AddressError::InvalidQuotedString(format!(
                        "Invalid quoted-pair: \\{next_ch}"
                    )));
                }
                None => {
                    return Err(AddressError::InvalidQuotedString(
                        "Backslash at end of quoted string".to_string(),
                    ));
                }
            }
        } else if !is_qtext(ch) {
            return Err(AddressError::InvalidQuotedString(format!(
                "Invalid character '{ch}' in quoted string"
            )));
        }
    }

    Ok(input.to_string())
}

/// Parse domain or address-literal
fn parse_domain_or_address_literal(
    input: &str,
    warnings: &mut Vec<AddressWarning>,
) -> Result<String> {
    if input.starts_with('[') {
        warnings.push(AddressWarning::AddressLiteral);
        parse_address_literal(input)
    } else {
        parse_domain(input, warnings)
    }
}

/// Parse a Domain: sub-domain *("." sub-domain)
fn parse_domain(input: &str, warnings: &mut Vec<AddressWarning>) -> Result<String> {
    if input.is_empty() {
        return Err(AddressError::InvalidDomain("Empty domain".to_string()));
    }

    if input.starts_with('.') || input.ends_with('.') {
        return Err(AddressError::InvalidDomain(
            "Domain cannot start or end with '.'".to_string(),
        ));
    }

    if input.contains("..") {
        return Err(AddressError::InvalidDomain(
            "Domain cannot contain consecutive dots".to_string(),
        ));
    }

    // Limits apply to the wire form: A-labels joined by dots
    let mut octets = 0;
    for label in input.split('.') {
        octets += parse_label(label)? + 1;
    }

    if octets - 1 > MAX_DOMAIN {
        return Err(AddressError::DomainTooLong);
    }

    if !input.contains('.') {
        warnings.push(AddressWarning::TldOnly);
    }

    Ok(input.to_string())
}

/// Parse a sub-domain: Let-dig [Ldh-str], with U-labels allowed
///
/// Returns the length of the label's ASCII (A-label) form.
fn parse_label(input: &str) -> Result<usize> {
    if input.starts_with('-') || input.ends_with('-') {
        return Err(AddressError::InvalidDomain(format!(
            "Label '{input}' must start and end with a letter or digit"
        )));
    }

    if let Some(ch) = input.chars().find(|&ch| !is_label_char(ch)) {
        return Err(AddressError::InvalidDomain(format!(
            "Invalid character '{ch}' in label"
        )));
    }

    let octets = a_label_len(input)?;
    if octets > MAX_LABEL {
        return Err(AddressError::LabelTooLong(input.to_string()));
    }

    Ok(octets)
}

/// Length of `label` once punycode-encoded as `xn--...` (RFC 3492)
fn a_label_len(label: &str) -> Result<usize> {
    if label.is_ascii() {
        return Ok(label.len());
    }

    idna::punycode::encode_str(&label.to_lowercase())
        .map(|encoded| "xn--".len() + encoded.len())
        .ok_or_else(|| AddressError::LabelTooLong(label.to_string()))
}

/// Parse an address-literal: `[IPv4]` or `[IPv6:...]` or `[tag:...]`
fn parse_address_literal(input: &str) -> Result<String> {
    if !input.ends_with(']') || input.len() < 2 {
        return Err(AddressError::InvalidAddressLiteral(
            "Address literal must be enclosed in brackets".to_string(),
        ));
    }

    let content = &input[1..input.len() - 1];

    if content.parse::<Ipv4Addr>().is_ok() {
        return Ok(input.to_string());
    }

    if let Some(ipv6_str) = content.strip_prefix("IPv6:") {
        return if ipv6_str.parse::<Ipv6Addr>().is_ok() {
            Ok(input.to_string())
        } else {
            Err(AddressError::InvalidAddressLiteral(format!(
                "Invalid IPv6 address: {ipv6_str}"
            )))
        };
    }

    // General-address-literal = Standardized-tag ":" 1*dcontent
    if let Some((tag, value)) = content.split_once(':')
        && !tag.is_empty()
        && tag.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
        && !value.is_empty()
        && value.chars().all(is_dtext)
    {
        return Ok(input.to_string());
    }

    Err(AddressError::InvalidAddressLiteral(format!(
        "Invalid address literal format: {content}"
    )))
}

/// Check if character is valid atext (atom text), including UTF-8 beyond ASCII
///
/// atext = ALPHA / DIGIT / "!" / "#" / "$" / "%" / "&" / "'" /
///         "*" / "+" / "-" / "/" / "=" / "?" / "^" / "_" / "\`" /
///         "{" / "|" / "}" / "~" / UTF8-non-ascii
#[inline]
fn is_atext(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
        || is_utf8_non_ascii(ch)
}

/// qtext: printable ASCII except backslash and quote, plus space and UTF-8
#[inline]
fn is_qtext(ch: char) -> bool {
    matches!(ch as u32, 32..=33 | 35..=91 | 93..=126) || ch == '\t' || is_utf8_non_ascii(ch)
}

/// dtext: printable ASCII except '[', ']' and '\'
#[inline]
const fn is_dtext(ch: char) -> bool {
    matches!(ch as u32, 33..=90 | 94..=126)
}

#[inline]
fn is_label_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || is_utf8_non_ascii(ch)
}

#[inline]
fn is_utf8_non_ascii(ch: char) -> bool {
    !ch.is_ascii() && !ch.is_whitespace()
}
