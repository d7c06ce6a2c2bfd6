//! Formula DSL for dynamic value calculation.
//!
//! Formulas are short strings combining integer literals, dice notation,
//! arithmetic, and `@` shortcut tokens resolved against an actor snapshot:
//!
//! ```text
//! "1d8 + @str"          melee damage scaling with the strength modifier
//! "@rank[1,1,2]"        value keyed on the owning path's rank
//! "@nivmod[5,2] + @agi" +2 from level 5 on
//! "1d6e"                evolving die, sized by the actor's level band
//! ```
//!
//! Evaluation has two explicit modes:
//! - [`evaluate`] substitutes every token and collapses the result to a
//!   number with the arithmetic evaluator (dice terms contribute 0);
//! - [`evaluate_keep_dice`] substitutes tokens but preserves dice terms,
//!   returning a normalized string for the external roll primitive.
//!
//! Failure policy: formulas degrade instead of blocking play. Unresolvable
//! tokens and malformed brackets are left in place; anything that then fails
//! arithmetic parsing evaluates to 0.

pub mod evaluate;

pub use evaluate::evaluate_arithmetic;

use crate::actor::ItemId;
use crate::stats::Snapshot;

/// Shortcut substitution table, longest token first so `@init` is never
/// shadowed by `@int`.
const SHORTCUTS: [&str; 13] = [
    "init", "atc", "atd", "atm", "def", "lvl", "str", "agi", "con", "int", "per", "cha", "hp",
];

/// Evaluate a formula to a number against the actor snapshot.
///
/// `source` anchors `@rank` resolution (usually the item owning the formula).
/// Empty input is 0; anything unparseable after substitution is 0.
pub fn evaluate(snapshot: &Snapshot<'_>, formula: &str, source: Option<ItemId>) -> i32 {
    if formula.trim().is_empty() {
        return 0;
    }
    let substituted = substitute(snapshot, formula, source);
    evaluate_arithmetic(&substituted).unwrap_or(0) as i32
}

/// Substitute tokens but defer dice terms to the external roll primitive.
///
/// Returns the substituted formula with normalized sign spacing, or an empty
/// string for empty input.
pub fn evaluate_keep_dice(snapshot: &Snapshot<'_>, formula: &str, source: Option<ItemId>) -> String {
    if formula.trim().is_empty() {
        return String::new();
    }
    normalize_signs(&substitute(snapshot, formula, source))
}

/// Run every substitution pass in order. Weapon expansion goes first because
/// the spliced-in formulas may themselves carry further tokens.
fn substitute(snapshot: &Snapshot<'_>, formula: &str, source: Option<ItemId>) -> String {
    let expanded = expand_weapon(snapshot, formula);
    let expanded = expand_at_tokens(snapshot, &expanded, source);
    expand_evolving_dice(snapshot, &expanded)
}

fn expand_weapon(snapshot: &Snapshot<'_>, formula: &str) -> String {
    if !formula.contains("@wpn.") {
        return formula.to_string();
    }
    let (dmg, skill) = snapshot.weapon_formulas();
    formula.replace("@wpn.dmg", &dmg).replace("@wpn.skill", &skill)
}

/// Substitute `@rank`, `@allrank`, `@nivmod`, and the plain shortcut table.
fn expand_at_tokens(snapshot: &Snapshot<'_>, formula: &str, source: Option<ItemId>) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut rest = formula;

    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let token = &rest[at..];

        let replaced = expand_rank(snapshot, token, source)
            .or_else(|| expand_all_rank(snapshot, token))
            .or_else(|| expand_level_gate(snapshot, token))
            .or_else(|| expand_shortcut(snapshot, token));

        match replaced {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &token[consumed..];
            }
            None => {
                // Unknown token: leave the '@' in place and move on.
                out.push('@');
                rest = &token[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// `@rank` and `@rank[v1,...,vN]`. The bracket list is 1-indexed by rank and
/// clipped to its length; rank 0 (nothing learned yet) yields 0.
fn expand_rank(
    snapshot: &Snapshot<'_>,
    token: &str,
    source: Option<ItemId>,
) -> Option<(String, usize)> {
    let body = token.strip_prefix("@rank")?;
    let rank = snapshot.rank_for(source)?;

    if let Some(list) = body.strip_prefix('[') {
        let close = list.find(']')?;
        let values = parse_int_list(&list[..close])?;
        if values.is_empty() {
            return None;
        }
        let picked = if rank <= 0 {
            0
        } else {
            values[(rank as usize).min(values.len()) - 1]
        };
        Some((picked.to_string(), "@rank[".len() + close + 1))
    } else {
        Some((rank.to_string(), "@rank".len()))
    }
}

/// `@allrank[N]` (legacy data also spells it `@toutrang[N]`): how many paths
/// have reached rank N.
fn expand_all_rank(snapshot: &Snapshot<'_>, token: &str) -> Option<(String, usize)> {
    let (body, prefix_len) = if let Some(body) = token.strip_prefix("@allrank[") {
        (body, "@allrank[".len())
    } else if let Some(body) = token.strip_prefix("@toutrang[") {
        (body, "@toutrang[".len())
    } else {
        return None;
    };
    let close = body.find(']')?;
    let values = parse_int_list(&body[..close])?;
    let [threshold] = values[..] else {
        return None;
    };
    Some((
        snapshot.paths_at_rank(threshold).to_string(),
        prefix_len + close + 1,
    ))
}

/// `@nivmod[L,M]`: M from level L on, 0 below.
fn expand_level_gate(snapshot: &Snapshot<'_>, token: &str) -> Option<(String, usize)> {
    let body = token.strip_prefix("@nivmod[")?;
    let close = body.find(']')?;
    let values = parse_int_list(&body[..close])?;
    let [gate, bonus] = values[..] else {
        return None;
    };
    let value = if snapshot.level() >= gate { bonus } else { 0 };
    Some((value.to_string(), "@nivmod[".len() + close + 1))
}

fn expand_shortcut(snapshot: &Snapshot<'_>, token: &str) -> Option<(String, usize)> {
    let body = &token[1..];
    for name in SHORTCUTS {
        if body.starts_with(name) {
            let value = snapshot.shortcut(name)?;
            return Some((value.to_string(), 1 + name.len()));
        }
    }
    None
}

fn parse_int_list(body: &str) -> Option<Vec<i32>> {
    body.split(',')
        .map(|part| part.trim().parse::<i32>().ok())
        .collect()
}

/// Replace evolving-dice markers (`NdSe`) with the ladder die for the
/// actor's level band, e.g. `1d6e` → `1d8` in the third band.
fn expand_evolving_dice(snapshot: &Snapshot<'_>, formula: &str) -> String {
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'd' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            let has_size = j > i + 1;
            if has_size && bytes.get(j) == Some(&b'e') {
                // The count digits (if any) were already emitted; swap the size.
                out.push('d');
                out.push_str(&snapshot.evolving_die().to_string());
                i = j + 1;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

/// Collapse doubled signs and space out binary `+`/`-` so the roll primitive
/// gets a clean expression (`2+-1` → `2 - 1`).
fn normalize_signs(formula: &str) -> String {
    let mut compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    loop {
        let folded = compact
            .replace("+-", "-")
            .replace("-+", "-")
            .replace("--", "+")
            .replace("++", "+");
        if folded == compact {
            break;
        }
        compact = folded;
    }

    let mut out = String::with_capacity(compact.len());
    for (index, c) in compact.chars().enumerate() {
        if (c == '+' || c == '-') && index > 0 {
            out.push(' ');
            out.push(c);
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}
