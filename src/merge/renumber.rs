//! Auto-renumbering of incoming identifiers

use crate::types::Item;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;

static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)$").expect("trailing digits pattern is valid"));

/// Trailing digit run of an identifier without leading zeros
/// ("q12" -> "12", "q007" -> "7", "q000" -> "0")
fn trailing_digits(id: &str) -> Option<&str> {
    let digits = TRAILING_DIGITS.captures(id.trim())?.get(1)?.as_str();
    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

/// Numeric order of canonical decimal strings of any length
fn cmp_decimal(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// `n + 1` for a canonical decimal string
fn increment_decimal(n: &str) -> String {
    let mut digits = n.as_bytes().to_vec();
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return String::from_utf8_lossy(&digits).into_owned();
        }
    }
    let mut carried = String::with_capacity(digits.len() + 1);
    carried.push('1');
    carried.push_str(&String::from_utf8_lossy(&digits));
    carried
}

/// Whether the incoming ids are exactly {0, 1, ..., N-1}, in any order.
///
/// Such ids are usually positional artifacts of the upload, so the caller
/// can renumber silently instead of surfacing collisions. An empty
/// collection is never sequential.
pub fn is_trivially_sequential(incoming: &[Item]) -> bool {
    if incoming.is_empty() {
        return false;
    }
    let mut seen = HashSet::with_capacity(incoming.len());
    for (index, item) in incoming.iter().enumerate() {
        let id = item.resolved_id(index);
        if !id.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        match id.parse::<usize>() {
            Ok(n) if n < incoming.len() && n.to_string() == id && seen.insert(n) => {}
            _ => return false,
        }
    }
    true
}

/// Copies of `incoming` with ids `max+1, max+2, ...`, where `max` is the
/// largest trailing integer among the existing ids. Numbering starts at 0
/// when no existing id ends in digits.
pub fn auto_renumber(existing: &[Item], incoming: &[Item]) -> Vec<Item> {
    let existing_ids: Vec<String> = existing
        .iter()
        .enumerate()
        .map(|(i, item)| item.resolved_id(i))
        .collect();
    let mut next = existing_ids
        .iter()
        .filter_map(|id| trailing_digits(id))
        .max_by(|a, b| cmp_decimal(a, b))
        .map_or_else(|| "0".to_string(), increment_decimal);

    incoming
        .iter()
        .map(|item| {
            let mut item = item.clone();
            let id = increment_decimal(&next);
            item.id = Some(std::mem::replace(&mut next, id));
            item
        })
        .collect()
}
