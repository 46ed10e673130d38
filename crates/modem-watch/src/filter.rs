//! Vendor/product filters

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// A USB vendor/product pair to track
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbFilter {
    /// Vendor ID as sysfs reports it (e.g., "12d1")
    pub vendor_id: String,
    /// Product ID as sysfs reports it (e.g., "1506")
    pub product_id: String,
}

impl UsbFilter {
    /// Create a filter
    pub fn new(vendor_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            product_id: product_id.into(),
        }
    }

    /// Exact match on both IDs
    pub fn matches(&self, vendor_id: &str, product_id: &str) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

/// Ordered, append-only set of filters
///
/// Safe to extend while the event loop is reading it. A filter added while
/// an event is in flight may or may not apply to that event.
#[derive(Debug, Default)]
pub struct FilterSet {
    filters: RwLock<Vec<UsbFilter>>,
}

impl FilterSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; duplicates are kept
    pub fn add(&self, filter: UsbFilter) {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(filter);
    }

    /// Check if any filter matches the given IDs
    pub fn matches(&self, vendor_id: &str, product_id: &str) -> bool {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|f| f.matches(vendor_id, product_id))
    }

    /// Copy of the filters in insertion order
    pub fn to_vec(&self) -> Vec<UsbFilter> {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of filters
    pub fn len(&self) -> usize {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if no filters have been added
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<UsbFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = UsbFilter>>(iter: I) -> Self {
        Self {
            filters: RwLock::new(iter.into_iter().collect()),
        }
    }
}
