//! `rule-list` grammar: one `TYPE,VALUE[,POLICY][,OPTION...]` rule per line.
//!
//! Commas inside parentheses (logical rules) or double quotes (regex values)
//! do not split fields.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::entry::{CanonicalEntry, Normalized, RuleEntry};
use crate::error::{FormatError, RecordError};
use crate::text::{decode, is_comment, numbered_lines};

/// Rule types accepted in rule lists and module `[Rule]` sections.
pub const RULE_TYPES: &[&str] = &[
    "DOMAIN",
    "DOMAIN-SUFFIX",
    "DOMAIN-KEYWORD",
    "DOMAIN-WILDCARD",
    "DOMAIN-SET",
    "RULE-SET",
    "IP-CIDR",
    "IP-CIDR6",
    "IP-ASN",
    "GEOIP",
    "USER-AGENT",
    "URL-REGEX",
    "PROCESS-NAME",
    "DEST-PORT",
    "SRC-PORT",
    "IN-PORT",
    "SRC-IP",
    "PROTOCOL",
    "SUBNET",
    "CELLULAR-RADIO",
    "DEVICE-NAME",
    "AND",
    "OR",
    "NOT",
];

/// Trailing flags that are not policies.
pub const RULE_OPTIONS: &[&str] = &["no-resolve", "extended-matching", "pre-matching"];

/// Normalize a whole rule list.
pub fn normalize_rules(raw: &[u8]) -> Result<Normalized, FormatError> {
    let text = decode(raw)?;
    let mut out = Normalized::default();
    let mut seen = HashSet::new();
    let mut candidates = 0usize;

    for (line_no, line) in numbered_lines(text) {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }
        candidates += 1;
        match parse_rule(trimmed) {
            Ok(rule) => out.push_unique(&mut seen, CanonicalEntry::Rule(rule)),
            Err(reason) => out.rejected.push(RecordError::new(line_no, reason, trimmed)),
        }
    }

    if candidates > 0 && out.entries.is_empty() {
        let first = out.rejected[0].clone();
        return Err(FormatError::NoValidRecords {
            rejected: out.rejected.len(),
            first,
        });
    }
    Ok(out)
}

/// Parse one non-comment rule line.
pub fn parse_rule(line: &str) -> Result<RuleEntry, String> {
    let fields = split_fields(line)?;
    let mut fields = fields.into_iter();

    let kind = fields.next().unwrap_or_default().to_ascii_uppercase();
    if !RULE_TYPES.contains(&kind.as_str()) {
        return Err(format!("unknown rule type '{kind}'"));
    }
    let raw_value = fields.next().unwrap_or_default();
    if raw_value.is_empty() {
        return Err(format!("{kind} rule has no value"));
    }
    let value = normalize_value(&kind, raw_value)?;

    let mut policy: Option<String> = None;
    let mut options: Vec<String> = Vec::new();
    for field in fields {
        if field.is_empty() {
            return Err("empty field".to_string());
        }
        let lowered = field.to_ascii_lowercase();
        if RULE_OPTIONS.contains(&lowered.as_str()) {
            if !options.contains(&lowered) {
                options.push(lowered);
            }
        } else if policy.is_none() && options.is_empty() {
            policy = Some(field.to_string());
        } else {
            return Err(format!("unexpected field '{field}'"));
        }
    }

    Ok(RuleEntry {
        kind,
        value,
        policy,
        options,
    })
}

/// Split on top-level commas, trimming each field.
fn split_fields(line: &str) -> Result<Vec<&str>, String> {
    let mut fields = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced ')'".to_string());
                }
            }
            ',' if !quoted && depth == 0 => {
                fields.push(line[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err("unterminated quote".to_string());
    }
    if depth != 0 {
        return Err("unbalanced '('".to_string());
    }
    fields.push(line[start..].trim());
    Ok(fields)
}

fn normalize_value(kind: &str, value: &str) -> Result<String, String> {
    match kind {
        "DOMAIN" | "DOMAIN-SUFFIX" => {
            let v = value.trim_matches('.').to_ascii_lowercase();
            if v.is_empty()
                || !v
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
            {
                return Err(format!("invalid domain '{value}'"));
            }
            Ok(v)
        }
        "DOMAIN-WILDCARD" => {
            let v = value.to_ascii_lowercase();
            if !v.chars().all(|c| {
                c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '*' | '?')
            }) {
                return Err(format!("invalid wildcard domain '{value}'"));
            }
            Ok(v)
        }
        "DOMAIN-KEYWORD" => {
            if value.chars().any(char::is_whitespace) {
                return Err(format!("keyword '{value}' contains whitespace"));
            }
            Ok(value.to_ascii_lowercase())
        }
        "IP-CIDR" => parse_cidr::<Ipv4Addr>(value, 32).map_err(|e| format!("{e} in '{value}'")),
        "IP-CIDR6" => {
            parse_cidr::<Ipv6Addr>(value, 128).map_err(|e| format!("{e} in '{value}'"))
        }
        "SRC-IP" => value
            .parse::<IpAddr>()
            .map(|ip| ip.to_string())
            .map_err(|_| format!("invalid IP address '{value}'")),
        "IP-ASN" => {
            let digits = value
                .strip_prefix("AS")
                .or_else(|| value.strip_prefix("as"))
                .unwrap_or(value);
            digits
                .parse::<u32>()
                .map(|n| n.to_string())
                .map_err(|_| format!("invalid ASN '{value}'"))
        }
        "GEOIP" => {
            if value.len() != 2 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(format!("invalid country code '{value}'"));
            }
            Ok(value.to_ascii_uppercase())
        }
        "AND" | "OR" | "NOT" => {
            if !(value.starts_with('(') && value.ends_with(')')) {
                return Err(format!("{kind} rule value must be parenthesised"));
            }
            Ok(value.to_string())
        }
        "PROTOCOL" => Ok(value.to_ascii_uppercase()),
        _ => Ok(value.to_string()),
    }
}

/// Parse `addr/prefix` and re-render it canonically.
fn parse_cidr<A>(value: &str, max_prefix: u8) -> Result<String, &'static str>
where
    A: std::str::FromStr + std::fmt::Display,
{
    let (addr, prefix) = value.split_once('/').ok_or("missing prefix length")?;
    let addr: A = addr.parse().map_err(|_| "invalid address")?;
    let prefix: u8 = prefix.parse().map_err(|_| "invalid prefix length")?;
    if prefix > max_prefix {
        return Err("prefix length out of range");
    }
    Ok(format!("{addr}/{prefix}"))
}
