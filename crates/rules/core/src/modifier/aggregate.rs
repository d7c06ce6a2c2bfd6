//! Modifier collection and per-target aggregation.

use crate::actor::Actor;
use crate::modifier::{ApplyScope, Modifier, ModifierTarget};
use crate::stats::Snapshot;

/// A modifier that survived enablement filtering, with its display name.
#[derive(Clone, Copy, Debug)]
pub struct EnabledModifier<'a> {
    pub modifier: &'a Modifier,
    pub source_name: &'a str,
}

/// Sum plus human-readable breakdown for one target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub total: i32,
    /// One `"<source> : <signed value> "` chunk per non-zero contribution.
    pub tooltip: String,
}

/// Walk the four owner categories plus live effects and keep only the
/// modifiers that currently count:
///
/// - item-level modifiers of active items (features and profiles are always
///   active; capacities while learned, equipment while equipped);
/// - action-owned modifiers while their action is enabled;
/// - custom-effect modifiers, scope-filtered so an effect a caster put on
///   someone else never loops back onto the caster's own sheet.
pub fn collect_enabled(actor: &Actor) -> Vec<EnabledModifier<'_>> {
    let mut collected = Vec::new();

    for item in &actor.items {
        if !item.is_active() {
            continue;
        }
        for modifier in &item.modifiers {
            if modifier.scope != ApplyScope::OthersOnly {
                collected.push(EnabledModifier {
                    modifier,
                    source_name: &item.name,
                });
            }
        }
        for action in &item.actions {
            if !action.effectively_enabled() {
                continue;
            }
            for modifier in &action.modifiers {
                if modifier.scope != ApplyScope::OthersOnly {
                    collected.push(EnabledModifier {
                        modifier,
                        source_name: &item.name,
                    });
                }
            }
        }
    }

    for effect in actor.effects.iter() {
        for modifier in &effect.modifiers {
            let counts = if effect.self_applied {
                modifier.scope != ApplyScope::OthersOnly
            } else {
                modifier.scope != ApplyScope::SelfOnly
            };
            if counts {
                collected.push(EnabledModifier {
                    modifier,
                    source_name: &effect.name,
                });
            }
        }
    }

    collected
}

/// Sum every matching modifier for `target` and build the tooltip.
///
/// The `All` wildcard folds into ability and skill-roll targets only.
pub fn aggregate(
    snapshot: &Snapshot<'_>,
    modifiers: &[EnabledModifier<'_>],
    target: ModifierTarget,
) -> Aggregate {
    let mut result = Aggregate::default();

    for entry in modifiers {
        let matches = entry.modifier.target == target
            || (entry.modifier.target == ModifierTarget::All && target.accepts_wildcard());
        if !matches {
            continue;
        }

        let value = entry.modifier.evaluate(snapshot);
        result.total += value;
        if value != 0 && !entry.source_name.is_empty() {
            result.tooltip.push_str(entry.source_name);
            result.tooltip.push_str(" : ");
            if value > 0 {
                result.tooltip.push('+');
            }
            result.tooltip.push_str(&value.to_string());
            result.tooltip.push(' ');
        }
    }

    result
}
