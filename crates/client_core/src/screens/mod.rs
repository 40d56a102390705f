//! The four back-office screens: record bindings, sources, seed data and reports.
//!
//! Values the demo APIs do not provide (roles, statuses, dates, amounts) are
//! derived from the record id so that repeated loads agree.

pub mod invoices;
pub mod orders;
pub mod products;
pub mod users;

use chrono::{Days, NaiveDate};
use shared::{domain::Customer, protocol::PlaceholderAddress};

/// splitmix64 over `(seed, salt)`.
pub(crate) fn mix(seed: i64, salt: u64) -> u64 {
    let mut z = (seed as u64)
        .wrapping_add(salt.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Value in `0..n`; `n` must be non-zero.
pub(crate) fn below(seed: i64, salt: u64, n: u64) -> u64 {
    mix(seed, salt) % n.max(1)
}

pub(crate) fn pick<T: Copy, const N: usize>(options: &[T; N], seed: i64, salt: u64) -> T {
    options[below(seed, salt, N as u64) as usize]
}

/// Index into `weights`, chosen proportionally to each weight.
pub(crate) fn weighted(weights: &[u64], seed: i64, salt: u64) -> usize {
    let total: u64 = weights.iter().sum();
    let mut roll = below(seed, salt, total);
    for (index, weight) in weights.iter().enumerate() {
        if roll < *weight {
            return index;
        }
        roll -= weight;
    }
    weights.len().saturating_sub(1)
}

pub(crate) fn days_before(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(days)).unwrap_or(day)
}

pub(crate) fn days_after(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_add_days(Days::new(days)).unwrap_or(day)
}

pub(crate) fn postal_address(address: &PlaceholderAddress) -> String {
    format!("{}, {} {}", address.street, address.zipcode, address.city)
}

/// Picks the customer for a derived record, spreading records across the directory.
pub(crate) fn assign_customer(customers: &[Customer], seed: i64) -> Option<&Customer> {
    if customers.is_empty() {
        return None;
    }
    customers.get(below(seed, 11, customers.len() as u64) as usize)
}
