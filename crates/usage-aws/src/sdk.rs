//! Helpers for reading SDK shapes.
//!
//! Generated SDK accessors return `&str`/`i32`/`bool` for required members
//! and `Option<..>` for optional ones. These traits read both the same way
//! so conversions do not depend on which members a service marks required.

use std::error::Error;

use aws_sdk_cloudwatch::error::DisplayErrorContext;
use usage_metrics::{ResourceKind, Tag, TagFilter, UsageError};

/// Reads a string-like member, defaulting to empty.
pub(crate) trait OrEmpty {
    fn or_empty(self) -> String;
}

impl<T: AsRef<str> + ?Sized> OrEmpty for &T {
    fn or_empty(self) -> String {
        self.as_ref().to_string()
    }
}

impl<T: AsRef<str> + ?Sized> OrEmpty for Option<&T> {
    fn or_empty(self) -> String {
        self.map(|v| v.as_ref().to_string()).unwrap_or_default()
    }
}

/// Reads an integer member, defaulting to zero.
pub(crate) trait OrZero {
    fn or_zero(self) -> i64;
}

impl OrZero for i32 {
    fn or_zero(self) -> i64 {
        i64::from(self)
    }
}

impl OrZero for Option<i32> {
    fn or_zero(self) -> i64 {
        self.map(i64::from).unwrap_or_default()
    }
}

impl OrZero for i64 {
    fn or_zero(self) -> i64 {
        self
    }
}

impl OrZero for Option<i64> {
    fn or_zero(self) -> i64 {
        self.unwrap_or_default()
    }
}

/// Reads a boolean member, defaulting to false.
pub(crate) trait Flag {
    fn flag(self) -> bool;
}

impl Flag for bool {
    fn flag(self) -> bool {
        self
    }
}

impl Flag for Option<bool> {
    fn flag(self) -> bool {
        self.unwrap_or_default()
    }
}

/// Reads a nested structure member as an option.
pub(crate) trait MaybeRef<'a> {
    type Target: ?Sized;
    fn maybe(self) -> Option<&'a Self::Target>;
}

impl<'a, T: ?Sized> MaybeRef<'a> for &'a T {
    type Target = T;
    fn maybe(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> MaybeRef<'a> for Option<&'a T> {
    type Target = T;
    fn maybe(self) -> Option<&'a T> {
        self
    }
}

/// Wraps a provider failure as an isolated discovery error.
pub(crate) fn discovery_error<E: Error>(kind: ResourceKind, err: &E) -> UsageError {
    UsageError::Discovery {
        kind,
        reason: DisplayErrorContext(err).to_string(),
    }
}

/// Wraps a provider failure as an isolated fetch error.
pub(crate) fn fetch_error<E: Error>(kind: ResourceKind, err: &E) -> UsageError {
    UsageError::Fetch {
        kind,
        reason: DisplayErrorContext(err).to_string(),
    }
}

/// Returns true if `tags` satisfy every filter.
pub(crate) fn matches_filters(tags: &[Tag], filters: &[TagFilter]) -> bool {
    filters
        .iter()
        .all(|filter| tags.iter().any(|tag| tag.key == filter.name && tag.value == filter.value))
}
