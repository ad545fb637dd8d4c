//! # Validation Module
//!
//! Input validation utilities for Tally.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API client)                                     │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine Operation (Rust)                                      │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (one active session per register)              │
//! │  └── CHECK constraints (movement amounts positive)                     │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use tally_core::validation::{validate_register_name, validate_movement_amount};
//!
//! // Validate name before database insert
//! validate_register_name("Front Desk 1").unwrap();
//!
//! // Validate amount before recording a movement
//! validate_movement_amount(5000).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::RuleCondition;
use crate::{MAX_NOTES_LEN, MAX_RULE_CONDITIONS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a register name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 100 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_register_name;
///
/// assert!(validate_register_name("Front Desk 1").is_ok());
/// assert!(validate_register_name("").is_err());
/// assert!(validate_register_name("A".repeat(200).as_str()).is_err());
/// ```
pub fn validate_register_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a movement type code.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
pub fn validate_type_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    // Check for valid characters (alphanumeric, hyphen, underscore)
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates free-text notes (session notes, review notes).
///
/// ## Rules
/// - Can be empty
/// - Maximum 500 characters
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.len() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(())
}

/// Validates an external reference (receipt number, invoice, deposit slip).
///
/// ## Rules
/// - Can be empty
/// - Maximum 100 characters
pub fn validate_reference(reference: &str) -> ValidationResult<()> {
    if reference.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "reference".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates the explanation recorded when resolving a discrepancy.
///
/// ## Rules
/// - Must not be empty (an unexplained resolution is useless in an audit)
/// - Maximum 500 characters
pub fn validate_resolution(resolution: &str) -> ValidationResult<()> {
    let resolution = resolution.trim();

    if resolution.is_empty() {
        return Err(ValidationError::Required {
            field: "resolution".to_string(),
        });
    }

    if resolution.len() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "resolution".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Direction comes from the movement category, never from a sign
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Record Movement                                                        │
/// │                                                                         │
/// │  User enters amount: $50.00 (5000 cents)                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_movement_amount(5000) ← THIS FUNCTION                        │
/// │       │                                                                 │
/// │       ├── amount <= 0? → Error: "amount must be positive"              │
/// │       │                                                                 │
/// │       └── OK → Proceed with record_movement                            │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_movement_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates an opening balance in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (empty drawer at open)
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_opening_balance;
///
/// assert!(validate_opening_balance(10000).is_ok()); // $100.00
/// assert!(validate_opening_balance(0).is_ok());     // Empty drawer
/// assert!(validate_opening_balance(-100).is_err()); // Invalid
/// ```
pub fn validate_opening_balance(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "opening_balance".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a counted closing balance in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - You cannot count negative cash out of a physical drawer
pub fn validate_counted_balance(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "counted_balance".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Rule Validators
// =============================================================================

/// Validates an approval rule name.
///
/// ## Rules
/// - Must not be empty
/// - Maximum 100 characters
pub fn validate_rule_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a rule's condition list.
///
/// ## Rules
/// - An empty list is legal to store (such a rule never fires)
/// - Must not exceed MAX_RULE_CONDITIONS (20)
/// - Every condition needs a non-empty field path
pub fn validate_rule_conditions(conditions: &[RuleCondition]) -> ValidationResult<()> {
    if conditions.len() > MAX_RULE_CONDITIONS {
        return Err(ValidationError::OutOfRange {
            field: "conditions".to_string(),
            min: 0,
            max: MAX_RULE_CONDITIONS as i64,
        });
    }

    for condition in conditions {
        if condition.field.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "condition field".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Rules
/// - Must be a valid UUID v4 format
/// - 36 characters with hyphens: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    // Try to parse as UUID
    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConditionOperator;

    #[test]
    fn test_validate_register_name() {
        assert!(validate_register_name("Front Desk 1").is_ok());
        assert!(validate_register_name("").is_err());
        assert!(validate_register_name("   ").is_err());
        assert!(validate_register_name(&"A".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_type_code() {
        // Valid codes
        assert!(validate_type_code("SALE").is_ok());
        assert!(validate_type_code("SUPPLIER_PAY").is_ok());
        assert!(validate_type_code("transfer-in").is_ok());

        // Invalid codes
        assert!(validate_type_code("").is_err());
        assert!(validate_type_code("has space").is_err());
        assert!(validate_type_code(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_movement_amount() {
        assert!(validate_movement_amount(1).is_ok());
        assert!(validate_movement_amount(100000).is_ok());

        assert!(validate_movement_amount(0).is_err());
        assert!(validate_movement_amount(-500).is_err());
    }

    #[test]
    fn test_validate_balances() {
        assert!(validate_opening_balance(0).is_ok());
        assert!(validate_opening_balance(10000).is_ok());
        assert!(validate_opening_balance(-1).is_err());

        assert!(validate_counted_balance(0).is_ok());
        assert!(validate_counted_balance(-1).is_err());
    }

    #[test]
    fn test_validate_notes_and_reference() {
        assert!(validate_notes("").is_ok());
        assert!(validate_notes("till light by $5, see note").is_ok());
        assert!(validate_notes(&"x".repeat(501)).is_err());

        assert!(validate_reference("RCPT-0042").is_ok());
        assert!(validate_reference(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_resolution() {
        assert!(validate_resolution("Miscounted fives, recount matched").is_ok());
        assert!(validate_resolution("").is_err());
        assert!(validate_resolution("   ").is_err());
        assert!(validate_resolution(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_rule_conditions() {
        let good = vec![RuleCondition {
            field: "amount".to_string(),
            operator: ConditionOperator::GreaterThan,
            value: serde_json::json!(1000),
        }];
        assert!(validate_rule_conditions(&good).is_ok());

        // Empty list is storable
        assert!(validate_rule_conditions(&[]).is_ok());

        // Blank field path is not
        let blank = vec![RuleCondition {
            field: "  ".to_string(),
            operator: ConditionOperator::Equals,
            value: serde_json::json!(0),
        }];
        assert!(validate_rule_conditions(&blank).is_err());

        // Too many conditions
        let too_many: Vec<RuleCondition> = (0..25)
            .map(|i| RuleCondition {
                field: format!("field{i}"),
                operator: ConditionOperator::Equals,
                value: serde_json::json!(i),
            })
            .collect();
        assert!(validate_rule_conditions(&too_many).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
