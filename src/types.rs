// SPDX-License-Identifier: MIT

//! Standalone HID quantities that exist for type safety only, each a thin
//! wrapper around its underlying integer type.
//!
//! Signedness follows the report descriptor encoding: logical and physical
//! bounds and the unit exponent are sign-extended from their payload bytes,
//! everything else is unsigned.

/// Creates `From` conversions between the given newtype and its underlying
/// integer. Use like this: `impl_from!(Foo, Foo, u32)`.
macro_rules! impl_from {
    ($tipo:ty, $tipo_expr:expr, $to:ty) => {
        impl From<$tipo> for $to {
            fn from(f: $tipo) -> $to {
                f.0
            }
        }
        impl From<&$tipo> for $to {
            fn from(f: &$tipo) -> $to {
                f.0
            }
        }
        impl From<$to> for $tipo {
            fn from(f: $to) -> Self {
                $tipo_expr(f)
            }
        }
    };
}

/// Creates a `impl Display for Foo` that just converts into the underlying
/// number. Use like this: `impl_fmt!(Foo, u32)`.
macro_rules! impl_fmt {
    ($tipo:ty, $to:ty) => {
        impl std::fmt::Display for $tipo {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let v: $to = self.into();
                write!(f, "{v}")
            }
        }
    };
}

// ---------- GLOBAL ITEMS ---------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UsagePage(pub u16);

impl_from!(UsagePage, UsagePage, u16);
impl_fmt!(UsagePage, u16);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalMinimum(pub i32);

impl_from!(LogicalMinimum, LogicalMinimum, i32);
impl_fmt!(LogicalMinimum, i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalMaximum(pub i32);

impl_from!(LogicalMaximum, LogicalMaximum, i32);
impl_fmt!(LogicalMaximum, i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicalMinimum(pub i32);

impl_from!(PhysicalMinimum, PhysicalMinimum, i32);
impl_fmt!(PhysicalMinimum, i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicalMaximum(pub i32);

impl_from!(PhysicalMaximum, PhysicalMaximum, i32);
impl_fmt!(PhysicalMaximum, i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unit(pub u32);

impl_from!(Unit, Unit, u32);
impl_fmt!(Unit, u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitExponent(pub i32);

impl_from!(UnitExponent, UnitExponent, i32);
impl_fmt!(UnitExponent, i32);

/// The width in bits of one repetition of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSize(pub u16);

impl_from!(ReportSize, ReportSize, u16);
impl_fmt!(ReportSize, u16);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReportId(pub u8);

impl_from!(ReportId, ReportId, u8);
impl_fmt!(ReportId, u8);

/// The number of repetitions of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCount(pub u16);

impl_from!(ReportCount, ReportCount, u16);
impl_fmt!(ReportCount, u16);

// ----------------- LOCAL ITEMS --------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UsageId(pub u16);

impl_from!(UsageId, UsageId, u16);
impl_fmt!(UsageId, u16);
