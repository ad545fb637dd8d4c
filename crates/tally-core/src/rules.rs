//! # Approval Rule Evaluation
//!
//! Data-driven evaluation of approval rules against event facts.
//!
//! ## Evaluation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Event fires (large movement, discrepancy, ...)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Build a fact: plain JSON describing the event                          │
//! │    { "amount": 1500.0, "category": "expense" }                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  evaluate(event_type, rules, fact)                                      │
//! │    for each ACTIVE rule of this event type, in stored order:            │
//! │      all conditions hold? ──no──► next rule                             │
//! │            │yes                                                         │
//! │            ├── auto_approve?            → AutoApproved (stop)           │
//! │            ├── require_manager_approval → NeedsApproval (stop)          │
//! │            └── neither flag set         → next rule                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  nothing decisive matched → Pass (the event goes through untouched)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules Are Data
//! Thresholds live in rule rows, not in code. Administrators edit the
//! condition list; the evaluator stays generic. Condition values are in
//! display units (a threshold of 1000 means $1000.00), matching how the
//! rules read in an admin console.
//!
//! A rule with an empty condition list never fires. "Every condition
//! holds" is vacuously true of an empty list, and a freshly created rule
//! with no conditions yet must not wave everything through.

use serde_json::Value;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{
    ApprovalEventType, ApprovalRule, ConditionOperator, RequestPriority, RuleCondition,
};

// =============================================================================
// Priority Thresholds
// =============================================================================

/// |amount| above which a request is urgent ($500).
pub const URGENT_AMOUNT: Money = Money::from_cents(50_000);

/// |amount| above which a request is high ($200).
pub const HIGH_AMOUNT: Money = Money::from_cents(20_000);

/// |amount| above which a request is medium ($50).
pub const MEDIUM_AMOUNT: Money = Money::from_cents(5_000);

/// |percentage| above which a request is urgent.
pub const URGENT_PCT: f64 = 10.0;

/// |percentage| above which a request is high.
pub const HIGH_PCT: f64 = 5.0;

/// |percentage| above which a request is medium.
pub const MEDIUM_PCT: f64 = 2.0;

// =============================================================================
// Decision
// =============================================================================

/// What the rule engine decided for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleDecision<'a> {
    /// A matching rule waved the event through; no request needed.
    AutoApproved { rule: &'a ApprovalRule },
    /// A matching rule wants a manager to look at this.
    NeedsApproval { rule: &'a ApprovalRule },
    /// No decisive rule matched; the event proceeds untouched.
    Pass,
}

// =============================================================================
// Evaluation
// =============================================================================

/// Runs an event fact through the rule set.
///
/// ## Rules
/// - Only active rules of the matching event type participate
/// - Rules are tried in slice order; the first decisive match wins
/// - auto_approve beats require_manager_approval on the same rule
/// - A matching rule with neither flag set decides nothing
///
/// Errors only when a stored condition list fails to decode, which means
/// the row was corrupted outside the application.
pub fn evaluate<'a>(
    event_type: ApprovalEventType,
    rules: &'a [ApprovalRule],
    fact: &Value,
) -> CoreResult<RuleDecision<'a>> {
    for rule in rules {
        if rule.event_type != event_type || !rule.is_active {
            continue;
        }

        let conditions = rule.conditions()?;
        if !rule_matches(&conditions, fact) {
            continue;
        }

        if rule.auto_approve {
            return Ok(RuleDecision::AutoApproved { rule });
        }
        if rule.require_manager_approval {
            return Ok(RuleDecision::NeedsApproval { rule });
        }
    }

    Ok(RuleDecision::Pass)
}

/// Whether every condition of a rule holds for the fact (AND).
///
/// An empty condition list does NOT match; see the module docs.
pub fn rule_matches(conditions: &[RuleCondition], fact: &Value) -> bool {
    if conditions.is_empty() {
        return false;
    }

    conditions.iter().all(|c| condition_matches(c, fact))
}

/// Evaluates a single condition against the fact.
///
/// ## Rules
/// - A field missing from the fact fails the condition
/// - Ordering operators need both sides numeric; otherwise false
/// - equals compares numerically when both sides are numeric, else by
///   exact JSON equality (strings, booleans)
pub fn condition_matches(condition: &RuleCondition, fact: &Value) -> bool {
    let Some(actual) = lookup_field(fact, &condition.field) else {
        return false;
    };

    match (actual.as_f64(), condition.value.as_f64()) {
        (Some(lhs), Some(rhs)) => match condition.operator {
            ConditionOperator::GreaterThan => lhs > rhs,
            ConditionOperator::LessThan => lhs < rhs,
            ConditionOperator::Equals => lhs == rhs,
            ConditionOperator::GreaterThanOrEqual => lhs >= rhs,
            ConditionOperator::LessThanOrEqual => lhs <= rhs,
        },
        _ => match condition.operator {
            ConditionOperator::Equals => actual == &condition.value,
            _ => false,
        },
    }
}

/// Resolves a dotted path ("session.openingBalance") inside a fact.
fn lookup_field<'v>(fact: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = fact;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

// =============================================================================
// Priority
// =============================================================================

/// Grades how urgently a manager should look at a request.
///
/// Either dimension can escalate: a huge absolute amount on a big float is
/// a small percentage but still demands attention, and a huge percentage
/// on a small float is barely any money but smells like systematic theft.
///
/// ## Rules
/// - Callers with no percentage dimension (large movements) pass 0.0
/// - The zero-expected sentinel arrives as `f64::MAX` and lands urgent
pub fn calculate_priority(amount: Money, percentage_magnitude: f64) -> RequestPriority {
    let amount = amount.abs();

    if percentage_magnitude > URGENT_PCT || amount > URGENT_AMOUNT {
        RequestPriority::Urgent
    } else if percentage_magnitude > HIGH_PCT || amount > HIGH_AMOUNT {
        RequestPriority::High
    } else if percentage_magnitude > MEDIUM_PCT || amount > MEDIUM_AMOUNT {
        RequestPriority::Medium
    } else {
        RequestPriority::Low
    }
}

// =============================================================================
// Fact Builders
// =============================================================================

/// Fact for a freshly recorded movement (large_movement rules).
pub fn movement_fact(movement: &crate::types::Movement) -> Value {
    serde_json::json!({
        "amount": movement.amount().to_major_units(),
        "category": movement.category,
        "movementTypeId": movement.movement_type_id,
        "description": movement.description,
        "reference": movement.reference,
    })
}

/// Fact for a close-time discrepancy (discrepancy rules).
///
/// `discrepancyPercentage` carries the MAGNITUDE: the stock ">5%" rule
/// must catch a till that is 15% short, not just 15% over. The signed
/// figure is still available as `discrepancy` for direction-sensitive
/// rules. The zero-expected sentinel surfaces as `f64::MAX`, which any
/// finite threshold is below.
pub fn discrepancy_fact(finding: &crate::discrepancy::DiscrepancyFinding) -> Value {
    let percentage_magnitude = match finding.percentage {
        Some(pct) => pct.abs(),
        None => f64::MAX,
    };

    serde_json::json!({
        "discrepancy": finding.discrepancy.to_major_units(),
        "discrepancyPercentage": percentage_magnitude,
        "expectedBalance": finding.expected.to_major_units(),
        "actualBalance": finding.actual.to_major_units(),
        "severity": finding.severity,
    })
}

/// Fact for a balance that is about to go negative (negative_balance rules).
pub fn balance_fact(resulting_balance: Money, movement_amount: Money) -> Value {
    serde_json::json!({
        "balance": resulting_balance.to_major_units(),
        "amount": movement_amount.to_major_units(),
    })
}

/// Fact for a session close (session_close rules).
pub fn session_close_fact(
    opening: Money,
    closing: Money,
    expected: Money,
    movement_count: usize,
) -> Value {
    serde_json::json!({
        "openingBalance": opening.to_major_units(),
        "closingBalance": closing.to_major_units(),
        "expectedBalance": expected.to_major_units(),
        "movementCount": movement_count,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn rule(
        event_type: ApprovalEventType,
        conditions: &str,
        auto_approve: bool,
        require_manager_approval: bool,
    ) -> ApprovalRule {
        ApprovalRule {
            id: uuid::Uuid::new_v4().to_string(),
            name: "test rule".to_string(),
            description: None,
            event_type,
            conditions_json: conditions.to_string(),
            auto_approve,
            require_manager_approval,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn condition(field: &str, operator: ConditionOperator, value: Value) -> RuleCondition {
        RuleCondition {
            field: field.to_string(),
            operator,
            value,
        }
    }

    #[test]
    fn test_operators_on_numbers() {
        let fact = json!({ "amount": 1500.0 });

        assert!(condition_matches(
            &condition("amount", ConditionOperator::GreaterThan, json!(1000)),
            &fact
        ));
        assert!(!condition_matches(
            &condition("amount", ConditionOperator::LessThan, json!(1000)),
            &fact
        ));
        assert!(condition_matches(
            &condition("amount", ConditionOperator::Equals, json!(1500)),
            &fact
        ));
        assert!(condition_matches(
            &condition("amount", ConditionOperator::GreaterThanOrEqual, json!(1500)),
            &fact
        ));
        assert!(condition_matches(
            &condition("amount", ConditionOperator::LessThanOrEqual, json!(1500)),
            &fact
        ));
    }

    #[test]
    fn test_equals_on_strings() {
        let fact = json!({ "severity": "critical" });

        assert!(condition_matches(
            &condition("severity", ConditionOperator::Equals, json!("critical")),
            &fact
        ));
        assert!(!condition_matches(
            &condition("severity", ConditionOperator::Equals, json!("low")),
            &fact
        ));
        // Ordering a string is meaningless, never a match
        assert!(!condition_matches(
            &condition("severity", ConditionOperator::GreaterThan, json!("low")),
            &fact
        ));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let fact = json!({ "amount": 100 });

        assert!(!condition_matches(
            &condition("balance", ConditionOperator::GreaterThan, json!(0)),
            &fact
        ));
    }

    #[test]
    fn test_dotted_path_lookup() {
        let fact = json!({ "session": { "openingBalance": 100.0 } });

        assert!(condition_matches(
            &condition(
                "session.openingBalance",
                ConditionOperator::Equals,
                json!(100)
            ),
            &fact
        ));
        assert!(!condition_matches(
            &condition("session.missing", ConditionOperator::Equals, json!(100)),
            &fact
        ));
    }

    #[test]
    fn test_zero_condition_rule_never_fires() {
        let rules = vec![rule(ApprovalEventType::LargeMovement, "[]", false, true)];
        let fact = json!({ "amount": 99999.0 });

        let decision = evaluate(ApprovalEventType::LargeMovement, &rules, &fact).unwrap();
        assert_eq!(decision, RuleDecision::Pass);
    }

    #[test]
    fn test_first_decisive_rule_wins() {
        let rules = vec![
            // Matches but decides nothing: neither flag set
            rule(
                ApprovalEventType::LargeMovement,
                r#"[{"field":"amount","operator":"greater_than","value":100}]"#,
                false,
                false,
            ),
            // Matches and auto-approves
            rule(
                ApprovalEventType::LargeMovement,
                r#"[{"field":"amount","operator":"greater_than","value":500}]"#,
                true,
                false,
            ),
            // Would need approval, but never reached
            rule(
                ApprovalEventType::LargeMovement,
                r#"[{"field":"amount","operator":"greater_than","value":500}]"#,
                false,
                true,
            ),
        ];
        let fact = json!({ "amount": 1500.0 });

        let decision = evaluate(ApprovalEventType::LargeMovement, &rules, &fact).unwrap();
        assert!(matches!(decision, RuleDecision::AutoApproved { rule } if rule.auto_approve));
    }

    #[test]
    fn test_manager_approval_decision() {
        let rules = vec![rule(
            ApprovalEventType::Discrepancy,
            r#"[{"field":"discrepancyPercentage","operator":"greater_than","value":5}]"#,
            false,
            true,
        )];

        // A 15% shortfall arrives with the magnitude in the fact
        let fact = json!({ "discrepancyPercentage": 15.0, "discrepancy": -15.0 });

        let decision = evaluate(ApprovalEventType::Discrepancy, &rules, &fact).unwrap();
        assert!(matches!(decision, RuleDecision::NeedsApproval { .. }));
    }

    #[test]
    fn test_inactive_and_foreign_rules_skipped() {
        let mut inactive = rule(
            ApprovalEventType::LargeMovement,
            r#"[{"field":"amount","operator":"greater_than","value":100}]"#,
            false,
            true,
        );
        inactive.is_active = false;

        let other_event = rule(
            ApprovalEventType::Discrepancy,
            r#"[{"field":"amount","operator":"greater_than","value":100}]"#,
            false,
            true,
        );

        let rules = vec![inactive, other_event];
        let fact = json!({ "amount": 1500.0 });

        let decision = evaluate(ApprovalEventType::LargeMovement, &rules, &fact).unwrap();
        assert_eq!(decision, RuleDecision::Pass);
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let rules = vec![rule(
            ApprovalEventType::LargeMovement,
            r#"[
                {"field":"amount","operator":"greater_than","value":1000},
                {"field":"category","operator":"equals","value":"expense"}
            ]"#,
            false,
            true,
        )];

        let income = json!({ "amount": 1500.0, "category": "income" });
        let decision = evaluate(ApprovalEventType::LargeMovement, &rules, &income).unwrap();
        assert_eq!(decision, RuleDecision::Pass);

        let expense = json!({ "amount": 1500.0, "category": "expense" });
        let decision = evaluate(ApprovalEventType::LargeMovement, &rules, &expense).unwrap();
        assert!(matches!(decision, RuleDecision::NeedsApproval { .. }));
    }

    #[test]
    fn test_corrupt_conditions_surface_as_error() {
        let rules = vec![rule(ApprovalEventType::LargeMovement, "not json", false, true)];
        let fact = json!({ "amount": 1500.0 });

        assert!(evaluate(ApprovalEventType::LargeMovement, &rules, &fact).is_err());
    }

    #[test]
    fn test_calculate_priority_tiers() {
        // Percentage dimension escalates
        assert_eq!(
            calculate_priority(Money::from_cents(1500), 15.0),
            RequestPriority::Urgent
        );
        assert_eq!(
            calculate_priority(Money::from_cents(1500), 7.0),
            RequestPriority::High
        );
        assert_eq!(
            calculate_priority(Money::from_cents(1500), 3.0),
            RequestPriority::Medium
        );
        assert_eq!(
            calculate_priority(Money::from_cents(1500), 1.0),
            RequestPriority::Low
        );

        // Amount dimension escalates independently of percentage
        assert_eq!(
            calculate_priority(Money::from_cents(60_000), 0.5),
            RequestPriority::Urgent
        );
        assert_eq!(
            calculate_priority(Money::from_cents(25_000), 0.0),
            RequestPriority::High
        );
        assert_eq!(
            calculate_priority(Money::from_cents(6_000), 0.0),
            RequestPriority::Medium
        );

        // Sign never matters
        assert_eq!(
            calculate_priority(Money::from_cents(-60_000), 0.0),
            RequestPriority::Urgent
        );
    }

    #[test]
    fn test_calculate_priority_boundaries_are_strict() {
        // Exactly $500 / 10% is still only high
        assert_eq!(
            calculate_priority(Money::from_cents(50_000), 10.0),
            RequestPriority::High
        );
        assert_eq!(
            calculate_priority(Money::from_cents(50_001), 0.0),
            RequestPriority::Urgent
        );
    }

    #[test]
    fn test_zero_expected_sentinel_lands_urgent() {
        assert_eq!(
            calculate_priority(Money::from_cents(100), f64::MAX),
            RequestPriority::Urgent
        );
    }

    #[test]
    fn test_discrepancy_fact_carries_magnitude() {
        let finding = crate::discrepancy::detect(
            Money::from_cents(10000), // expected $100
            Money::from_cents(8500),  // counted $85
        )
        .unwrap();

        let fact = discrepancy_fact(&finding);
        assert_eq!(fact["discrepancyPercentage"], json!(15.0));
        assert_eq!(fact["discrepancy"], json!(-15.0));
        assert_eq!(fact["severity"], json!("critical"));

        // The stock ">5%" rule fires on a shortfall
        let rules = vec![rule(
            ApprovalEventType::Discrepancy,
            r#"[{"field":"discrepancyPercentage","operator":"greater_than","value":5}]"#,
            false,
            true,
        )];
        let decision = evaluate(ApprovalEventType::Discrepancy, &rules, &fact).unwrap();
        assert!(matches!(decision, RuleDecision::NeedsApproval { .. }));
    }

    #[test]
    fn test_balance_fact_matches_negative_balance_rule() {
        let fact = balance_fact(Money::from_cents(-2500), Money::from_cents(10000));

        let rules = vec![rule(
            ApprovalEventType::NegativeBalance,
            r#"[{"field":"balance","operator":"less_than","value":0}]"#,
            false,
            true,
        )];
        let decision = evaluate(ApprovalEventType::NegativeBalance, &rules, &fact).unwrap();
        assert!(matches!(decision, RuleDecision::NeedsApproval { .. }));
    }
}
