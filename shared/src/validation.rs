//! Validation utilities for the Feedlot Purchase Management Platform

use rust_decimal::Decimal;

// ============================================================================
// Lot Validations
// ============================================================================

/// Validate a head count is positive
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a weight is positive
pub fn validate_weight(weight_kg: Decimal) -> Result<(), &'static str> {
    if weight_kg <= Decimal::ZERO {
        return Err("Weight must be positive");
    }
    Ok(())
}

/// Validate carcass yield is in (0, 100]
pub fn validate_carcass_yield(yield_percent: Decimal) -> Result<(), &'static str> {
    if yield_percent <= Decimal::ZERO || yield_percent > Decimal::from(100) {
        return Err("Carcass yield must be between 0 and 100");
    }
    Ok(())
}

/// Validate a monetary amount is not negative
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Allocation Validations
// ============================================================================

/// Validate an allocation plan distributes exactly `expected_total` head
/// across positive, non-duplicated requests.
pub fn validate_allocation_totals(
    quantities: &[i32],
    expected_total: i32,
) -> Result<(), &'static str> {
    if quantities.is_empty() {
        return Err("At least one enclosure allocation is required");
    }
    for q in quantities {
        if *q <= 0 {
            return Err("Allocation quantities must be positive");
        }
    }
    let total: i64 = quantities.iter().map(|q| i64::from(*q)).sum();
    if total != i64::from(expected_total) {
        return Err("Allocated total must equal the lot quantity");
    }
    Ok(())
}

/// Whether a requested quantity fits in an enclosure given its current
/// occupancy. Occupancy must come from a committed read inside the same
/// transaction that consumes the space.
pub fn fits_capacity(requested: i32, capacity: i32, occupancy: i32) -> bool {
    i64::from(occupancy) + i64::from(requested) <= i64::from(capacity)
}

// ============================================================================
// Loss Validations
// ============================================================================

/// Validate a loss quantity against the placement it draws from
pub fn validate_loss_quantity(
    loss_quantity: i32,
    placement_quantity: i32,
) -> Result<(), &'static str> {
    if loss_quantity <= 0 {
        return Err("Loss quantity must be positive");
    }
    if loss_quantity > placement_quantity {
        return Err("Loss quantity exceeds the animals placed in the enclosure");
    }
    Ok(())
}
