//! Budget control entry domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spendline_shared::ControlSettings;
use spendline_shared::types::EntryId;
use std::fmt;

use crate::dimension::Dimensions;

/// Kind of budget control entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// Provisional hold before spend is recognized.
    Reservation,
    /// Conversion of a reservation into recognized spend.
    Consumption,
    /// Undo of a consumption, restoring the reservation.
    Reversal,
    /// Undo of a reservation without consumption.
    Release,
    /// Budget moved between two keys.
    Reclass,
    /// Additional budget granted to a key.
    Supplement,
}

impl EntryType {
    /// Returns the string representation of the entry type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reservation => "RESERVATION",
            Self::Consumption => "CONSUMPTION",
            Self::Reversal => "REVERSAL",
            Self::Release => "RELEASE",
            Self::Reclass => "RECLASS",
            Self::Supplement => "SUPPLEMENT",
        }
    }

    /// Parses an entry type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RESERVATION" => Some(Self::Reservation),
            "CONSUMPTION" => Some(Self::Consumption),
            "REVERSAL" => Some(Self::Reversal),
            "RELEASE" => Some(Self::Release),
            "RECLASS" => Some(Self::Reclass),
            "SUPPLEMENT" => Some(Self::Supplement),
            _ => None,
        }
    }

    /// Returns true if the feature flag gating this entry type is on.
    #[must_use]
    pub fn is_enabled(self, settings: &ControlSettings) -> bool {
        match self {
            Self::Reservation | Self::Consumption | Self::Reversal | Self::Release => {
                settings.enable_budget_lock
            }
            Self::Reclass => settings.enable_budget_reclass,
            Self::Supplement => settings.enable_additional_budget,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of an entry relative to the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Budget flowing back in.
    In,
    /// Budget flowing out.
    Out,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
        }
    }
}

/// Reference to a business document (doctype and name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocRef {
    /// Document type, e.g. "Expense Request" or "Purchase Invoice".
    pub doctype: String,
    /// Document name.
    pub name: String,
}

impl DocRef {
    /// Creates a reference.
    #[must_use]
    pub fn new(doctype: &str, name: &str) -> Self {
        Self {
            doctype: doctype.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.doctype, self.name)
    }
}

/// An append-only budget control fact.
///
/// Entries are never mutated or deleted; corrections are new entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetControlEntry {
    /// Unique identifier for this entry.
    pub id: EntryId,
    /// Kind of entry.
    pub entry_type: EntryType,
    /// Direction relative to the budget.
    pub direction: Direction,
    /// Non-negative amount.
    pub amount: Decimal,
    /// Budget key.
    pub dimensions: Dimensions,
    /// Document that triggered the entry.
    pub reference: DocRef,
    /// Spend request the entry is attributed to, if any.
    pub request: Option<DocRef>,
    /// Free-text remarks.
    pub remarks: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Only finalized entries count toward availability.
    pub finalized: bool,
}

impl BudgetControlEntry {
    /// Returns this entry's signed contribution to the reserved figure.
    ///
    /// RESERVATION(OUT) and REVERSAL(OUT) add; CONSUMPTION(IN) and
    /// RELEASE(IN) subtract. Everything else, and unfinalized entries,
    /// contribute nothing.
    ///
    /// Note for reporting consumers: RELEASE participates here, so
    /// `reserved` is net of releases and a reserve followed by its release
    /// sums to zero. A formula over RESERVATION, CONSUMPTION and REVERSAL
    /// alone will not match this figure; use `released_amount` for the
    /// gross released total.
    #[must_use]
    pub fn reserved_effect(&self) -> Decimal {
        if !self.finalized {
            return Decimal::ZERO;
        }
        match (self.entry_type, self.direction) {
            (EntryType::Reservation | EntryType::Reversal, Direction::Out) => self.amount,
            (EntryType::Consumption | EntryType::Release, Direction::In) => -self.amount,
            _ => Decimal::ZERO,
        }
    }

    /// Returns the released amount carried by this entry, if it is a finalized RELEASE.
    #[must_use]
    pub fn released_amount(&self) -> Decimal {
        match (self.finalized, self.entry_type, self.direction) {
            (true, EntryType::Release, Direction::In) => self.amount,
            _ => Decimal::ZERO,
        }
    }
}

/// Input for posting a new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Kind of entry.
    pub entry_type: EntryType,
    /// Direction relative to the budget.
    pub direction: Direction,
    /// Non-negative amount.
    pub amount: Decimal,
    /// Budget key.
    pub dimensions: Dimensions,
    /// Document that triggered the entry.
    pub reference: DocRef,
    /// Spend request the entry is attributed to.
    pub request: Option<DocRef>,
    /// Free-text remarks.
    pub remarks: Option<String>,
}

impl NewEntry {
    /// Creates a posting input.
    #[must_use]
    pub fn new(
        entry_type: EntryType,
        dimensions: Dimensions,
        amount: Decimal,
        direction: Direction,
        reference: DocRef,
    ) -> Self {
        Self {
            entry_type,
            direction,
            amount,
            dimensions,
            reference,
            request: None,
            remarks: None,
        }
    }

    /// Attributes the entry to a spend request.
    #[must_use]
    pub fn for_request(mut self, request: &DocRef) -> Self {
        self.request = Some(request.clone());
        self
    }

    /// Attaches remarks.
    #[must_use]
    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    /// Materializes a finalized entry.
    #[must_use]
    pub fn finalize(self, created_at: DateTime<Utc>) -> BudgetControlEntry {
        BudgetControlEntry {
            id: EntryId::new(),
            entry_type: self.entry_type,
            direction: self.direction,
            amount: self.amount,
            dimensions: self.dimensions,
            reference: self.reference,
            request: self.request,
            remarks: self.remarks,
            created_at,
            finalized: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(entry_type: EntryType, direction: Direction) -> BudgetControlEntry {
        NewEntry::new(
            entry_type,
            Dimensions::new("ACME", "2026", "CC-OPS", "5110"),
            dec!(100),
            direction,
            DocRef::new("Expense Request", "ER-0001"),
        )
        .finalize(Utc::now())
    }

    #[test]
    fn test_reserved_effect_signs() {
        assert_eq!(
            entry(EntryType::Reservation, Direction::Out).reserved_effect(),
            dec!(100)
        );
        assert_eq!(
            entry(EntryType::Consumption, Direction::In).reserved_effect(),
            dec!(-100)
        );
        assert_eq!(
            entry(EntryType::Reversal, Direction::Out).reserved_effect(),
            dec!(100)
        );
        assert_eq!(
            entry(EntryType::Release, Direction::In).reserved_effect(),
            dec!(-100)
        );
        assert_eq!(
            entry(EntryType::Reclass, Direction::Out).reserved_effect(),
            Decimal::ZERO
        );
        assert_eq!(
            entry(EntryType::Supplement, Direction::In).reserved_effect(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_release_nets_reserved_but_reports_gross() {
        let pair = [
            entry(EntryType::Reservation, Direction::Out),
            entry(EntryType::Release, Direction::In),
        ];
        let reserved: Decimal = pair.iter().map(BudgetControlEntry::reserved_effect).sum();
        let released: Decimal = pair.iter().map(BudgetControlEntry::released_amount).sum();
        assert_eq!(reserved, Decimal::ZERO);
        assert_eq!(released, dec!(100));
    }

    #[test]
    fn test_unfinalized_entries_do_not_count() {
        let mut draft = entry(EntryType::Reservation, Direction::Out);
        draft.finalized = false;
        assert_eq!(draft.reserved_effect(), Decimal::ZERO);
    }

    #[test]
    fn test_entry_type_round_trip_str() {
        for entry_type in [
            EntryType::Reservation,
            EntryType::Consumption,
            EntryType::Reversal,
            EntryType::Release,
            EntryType::Reclass,
            EntryType::Supplement,
        ] {
            assert_eq!(EntryType::parse(entry_type.as_str()), Some(entry_type));
        }
        assert_eq!(EntryType::parse("reservation"), Some(EntryType::Reservation));
        assert_eq!(EntryType::parse("bogus"), None);
    }

    #[test]
    fn test_feature_gates() {
        let settings = ControlSettings::default();
        assert!(EntryType::Reservation.is_enabled(&settings));
        assert!(!EntryType::Reclass.is_enabled(&settings));
        assert!(!EntryType::Supplement.is_enabled(&settings));

        let locked_off = ControlSettings {
            enable_budget_lock: false,
            ..ControlSettings::default()
        };
        assert!(!EntryType::Consumption.is_enabled(&locked_off));
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::In.opposite(), Direction::Out);
        assert_eq!(Direction::Out.opposite(), Direction::In);
    }
}
