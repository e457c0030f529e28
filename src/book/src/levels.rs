use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Price to quantity for one side of a book. Levels set to zero are removed rather
/// than stored, so the map only ever holds live levels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLevelMap {
    levels: BTreeMap<Decimal, Decimal>,
}

impl PriceLevelMap {
    pub fn new() -> PriceLevelMap {
        PriceLevelMap::default()
    }

    pub fn set(&mut self, price: Decimal, quantity: Decimal) {
        if quantity.is_zero() {
            self.levels.remove(&price);
        } else {
            self.levels.insert(price, quantity);
        }
    }

    pub fn get(&self, price: &Decimal) -> Option<Decimal> {
        self.levels.get(price).copied()
    }

    pub fn highest(&self) -> Option<Decimal> {
        self.levels.last_key_value().map(|(p, _)| *p)
    }

    pub fn lowest(&self) -> Option<Decimal> {
        self.levels.first_key_value().map(|(p, _)| *p)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
