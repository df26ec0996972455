//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = 10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole-unit value.
    pub fn from_units(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after whole units).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Adds another amount, returning None on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Multiplies by a quantity, returning None on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-{}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.units(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// How the buyer intends to pay.
///
/// The numeric codes are the ones the storefront persists and receives
/// from the checkout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayMethod {
    /// Cash on delivery.
    Cash,
    /// Online payment through the external gateway.
    Online,
}

impl PayMethod {
    /// Returns the persisted code.
    pub fn code(&self) -> i16 {
        match self {
            PayMethod::Cash => 1,
            PayMethod::Online => 2,
        }
    }

    /// Parses a persisted or submitted code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(PayMethod::Cash),
            2 => Some(PayMethod::Online),
            _ => None,
        }
    }

    /// Status a freshly committed order starts in.
    ///
    /// Online orders wait for the gateway; cash orders go straight to the
    /// shipping queue.
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            PayMethod::Online => OrderStatus::Unpaid,
            PayMethod::Cash => OrderStatus::Unsent,
        }
    }
}

impl std::fmt::Display for PayMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayMethod::Cash => write!(f, "Cash"),
            PayMethod::Online => write!(f, "Online"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.units(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_from_units() {
        let money = Money::from_units(10);
        assert_eq!(money.cents(), 1000);
        assert_eq!(money.cents_part(), 0);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(1000).to_string(), "10.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn test_money_checked_arithmetic() {
        let a = Money::from_cents(1000);
        assert_eq!(a.checked_multiply(3), Some(Money::from_cents(3000)));
        assert_eq!(
            a.checked_add(Money::from_cents(1)),
            Some(Money::from_cents(1001))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_multiply(2), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(a), None);
    }

    #[test]
    fn test_money_sum_is_exact() {
        // 0.10 summed ten times is exactly 1.00 in cents
        let total: Money = std::iter::repeat_n(Money::from_cents(10), 10).sum();
        assert_eq!(total, Money::from_units(1));
    }

    #[test]
    fn test_pay_method_codes() {
        assert_eq!(PayMethod::from_code(1), Some(PayMethod::Cash));
        assert_eq!(PayMethod::from_code(2), Some(PayMethod::Online));
        assert_eq!(PayMethod::from_code(3), None);
        assert_eq!(PayMethod::Online.code(), 2);
    }

    #[test]
    fn test_pay_method_initial_status() {
        assert_eq!(PayMethod::Online.initial_status(), OrderStatus::Unpaid);
        assert_eq!(PayMethod::Cash.initial_status(), OrderStatus::Unsent);
    }
}
