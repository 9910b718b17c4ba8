use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Approved,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub outcome: Outcome,
    pub new_balance: Decimal,
}

/// Pure approve/decline decision.
///
/// Declines iff `requested > current_balance`, leaving the balance untouched;
/// otherwise approves and returns the reduced balance. Spending the exact
/// balance is approved down to zero. Callers must validate that `requested`
/// is positive before asking for a decision; non-positive amounts are a
/// validation concern, not an authorization one.
pub fn decide(current_balance: Decimal, requested: Decimal) -> Decision {
    debug_assert!(requested > Decimal::ZERO);
    if requested > current_balance {
        Decision {
            outcome: Outcome::Declined,
            new_balance: current_balance,
        }
    } else {
        Decision {
            outcome: Outcome::Approved,
            new_balance: current_balance - requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sufficient_funds_approved() {
        let decision = decide(dec!(10000), dec!(4000));
        assert_eq!(decision.outcome, Outcome::Approved);
        assert_eq!(decision.new_balance, dec!(6000));
    }

    #[test]
    fn test_insufficient_funds_declined_balance_unchanged() {
        let decision = decide(dec!(100), dec!(500));
        assert_eq!(decision.outcome, Outcome::Declined);
        assert_eq!(decision.new_balance, dec!(100));
    }

    #[test]
    fn test_exact_balance_approved_to_zero() {
        let decision = decide(dec!(75.25), dec!(75.25));
        assert_eq!(decision.outcome, Outcome::Approved);
        assert_eq!(decision.new_balance, Decimal::ZERO);
    }

    #[test]
    fn test_zero_balance_declines_any_amount() {
        let decision = decide(Decimal::ZERO, dec!(0.01));
        assert_eq!(decision.outcome, Outcome::Declined);
        assert_eq!(decision.new_balance, Decimal::ZERO);
    }
}
