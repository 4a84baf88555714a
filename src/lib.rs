// SPDX-License-Identifier: MIT

//! A parser for HID report descriptors, producing a flat, immutable
//! capability table ("preparsed data") from which consumers can locate
//! every Input, Output and Feature field of a device's reports without
//! looking at the descriptor again.
//!
//! The descriptor format is defined in the [HID specification], Section
//! 6.2.2. A descriptor is a stream of short items that drive a stateful
//! interpreter: global items persist (and can be saved with Push/Pop),
//! local items accumulate until the next Main item, and Main items emit
//! fields into the current collection.
//!
//! ```
//! # use hidcaps::{parse, ReportType};
//! let descriptor = [
//!     0x05, 0x01, // Usage Page (Generic Desktop)
//!     0x09, 0x30, // Usage (X)
//!     0x15, 0x81, // Logical Minimum (-127)
//!     0x25, 0x7F, // Logical Maximum (127)
//!     0x75, 0x08, // Report Size (8)
//!     0x95, 0x01, // Report Count (1)
//!     0x81, 0x06, // Input (Data,Var,Rel)
//! ];
//! let data = parse(&descriptor)?;
//! let caps = data.caps(ReportType::Input);
//! assert_eq!(caps.len(), 1);
//! assert_eq!(u16::from(caps[0].usage_min), 0x30);
//! # Ok::<(), hidcaps::ParserError>(())
//! ```
//!
//! [HID specification]: https://www.usb.org/sites/default/files/hid1_11.pdf

use bitflags::bitflags;
use thiserror::Error;

pub mod hid;
mod parse;
pub mod types;

use crate::hid::{CollectionKind, DataItemFlags};
use crate::types::*;

/// Errors that can occur while parsing a report descriptor. All of them
/// abort the parse; there is no partial result.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("malformed item at offset {offset}: {message}")]
    MalformedItem { offset: usize, message: String },
    #[error("{0} exceeded its capacity")]
    StackOverflow(&'static str),
    #[error("{0} is empty")]
    StackUnderflow(&'static str),
    #[error("allocation failure")]
    OutOfMemory,
}

/// The three report directions a descriptor can declare fields for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ReportType {
    Input = 0,
    Output = 1,
    Feature = 2,
}

bitflags! {
    /// Derived per-capability properties, complementing the raw control
    /// word in [ValueCaps::bit_field].
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct CapsFlags: u8 {
        /// Usage minimum and maximum describe a declared range rather
        /// than a single usage.
        const IS_RANGE = 0x01;
        const IS_STRING_RANGE = 0x02;
        const IS_DESIGNATOR_RANGE = 0x04;
        const IS_ABSOLUTE = 0x08;
        const IS_CONSTANT = 0x10;
        /// Single-bit field or array entry, reported by on/off state
        /// rather than by value.
        const IS_BUTTON = 0x20;
        const IS_ARRAY = 0x40;
        /// Set on every capability of an array block except the one
        /// holding the first-declared usage.
        const ARRAY_HAS_MORE = 0x80;
    }
}

/// One entry of the capability table: a single usage (or usage range)
/// within one Input, Output or Feature report, with everything needed to
/// locate and interpret its bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCaps {
    pub report_id: ReportId,
    pub usage_page: UsagePage,
    pub usage_min: UsageId,
    pub usage_max: UsageId,
    pub flags: CapsFlags,
    /// The raw control word of the Main item that emitted this field.
    pub bit_field: DataItemFlags,
    pub bit_size: ReportSize,
    pub report_count: ReportCount,
    /// Position of the field's first bit within the report, counting the
    /// leading report-id byte.
    pub start_byte: u16,
    pub start_bit: u8,
    pub logical_min: LogicalMinimum,
    pub logical_max: LogicalMaximum,
    pub physical_min: PhysicalMinimum,
    pub physical_max: PhysicalMaximum,
    pub unit: Unit,
    pub unit_exponent: UnitExponent,
    pub designator_min: u16,
    pub designator_max: u16,
    pub string_min: u16,
    pub string_max: u16,
    /// Contiguous per-report-type indices assigned to the usages of this
    /// capability. Capabilities with a zero usage consume none.
    pub data_index_min: u16,
    pub data_index_max: u16,
    /// Index into [PreparsedData::collections] of the enclosing node.
    pub link_collection: u16,
    pub link_usage_page: UsagePage,
    pub link_usage: UsageId,
}

/// One node of the collection tree, in descriptor declaration order. The
/// root node is its own parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNode {
    pub usage_page: UsagePage,
    pub usage: UsageId,
    pub kind: CollectionKind,
    pub parent: u16,
}

/// Location of one report type's capabilities within the concatenated
/// table, plus the longest report length declared for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportTypeInfo {
    pub caps_start: u16,
    pub caps_count: u16,
    /// In bytes, including the leading report-id byte; the maximum over
    /// all report ids of this type. Zero if the type declares nothing.
    pub byte_length: u16,
}

impl ReportTypeInfo {
    /// Index one past this type's last capability.
    pub fn caps_end(&self) -> u16 {
        self.caps_start + self.caps_count
    }
}

/// The immutable output of a parse: the device's top-level usage, the
/// capability table and the collection tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparsedData {
    pub(crate) usage_page: UsagePage,
    pub(crate) usage: UsageId,
    pub(crate) reports: [ReportTypeInfo; 3],
    pub(crate) caps: Vec<ValueCaps>,
    pub(crate) collections: Vec<CollectionNode>,
}

impl PreparsedData {
    /// Layout version stamp, `"HidP"` as a big-endian word.
    pub const MAGIC: u32 = 0x48696450;

    /// Usage page of the first top-level collection.
    pub fn usage_page(&self) -> UsagePage {
        self.usage_page
    }

    /// Usage of the first top-level collection.
    pub fn usage(&self) -> UsageId {
        self.usage
    }

    pub fn report(&self, ty: ReportType) -> &ReportTypeInfo {
        &self.reports[ty as usize]
    }

    /// The capabilities of one report type, in emission order.
    pub fn caps(&self, ty: ReportType) -> &[ValueCaps] {
        let info = &self.reports[ty as usize];
        let start = info.caps_start as usize;
        &self.caps[start..start + info.caps_count as usize]
    }

    /// The whole table, Input then Output then Feature.
    pub fn all_caps(&self) -> &[ValueCaps] {
        &self.caps
    }

    pub fn report_byte_length(&self, ty: ReportType) -> u16 {
        self.reports[ty as usize].byte_length
    }

    pub fn collections(&self) -> &[CollectionNode] {
        &self.collections
    }

    /// Total in-memory size of the table, header included, as a consumer
    /// serializing the blob would reserve.
    pub fn size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.caps.len() * std::mem::size_of::<ValueCaps>()
            + self.collections.len() * std::mem::size_of::<CollectionNode>()
    }
}

impl TryFrom<&[u8]> for PreparsedData {
    type Error = ParserError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        parse::parse_descriptor(bytes)
    }
}

/// Parses a report descriptor into its capability table.
pub fn parse(bytes: &[u8]) -> Result<PreparsedData, ParserError> {
    parse::parse_descriptor(bytes)
}

/// Per-report-id sizing summary, see [describe].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportIdLength {
    pub report_id: ReportId,
    /// Number of the owning top-level collection, counting from 1.
    pub collection: u16,
    pub input_length: u16,
    pub output_length: u16,
    pub feature_length: u16,
}

/// A parsed descriptor together with the byte length of every report id
/// it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    pub preparsed: PreparsedData,
    pub reports: Vec<ReportIdLength>,
}

/// Parses a report descriptor and summarizes, per report id actually
/// declared, how long each of its input, output and feature reports is.
pub fn describe(bytes: &[u8]) -> Result<DeviceDescription, ParserError> {
    let preparsed = parse(bytes)?;

    // Per report id, the highest bit any field of that id reaches.
    let mut bits = [[0u32; 256]; 3];
    for (ti, ty) in [ReportType::Input, ReportType::Output, ReportType::Feature]
        .into_iter()
        .enumerate()
    {
        for caps in preparsed.caps(ty) {
            let end = u32::from(caps.start_byte) * 8
                + u32::from(caps.start_bit)
                + u32::from(u16::from(caps.bit_size)) * u32::from(u16::from(caps.report_count));
            let slot = &mut bits[ti][u8::from(caps.report_id) as usize];
            *slot = (*slot).max(end);
        }
    }

    let mut reports = Vec::new();
    for id in 0..256 {
        let [input, output, feature] = [bits[0][id], bits[1][id], bits[2][id]];
        if input == 0 && output == 0 && feature == 0 {
            continue;
        }
        reports.try_reserve(1).map_err(|_| ParserError::OutOfMemory)?;
        reports.push(ReportIdLength {
            report_id: ReportId(id as u8),
            collection: 1,
            input_length: ((input + 7) / 8) as u16,
            output_length: ((output + 7) / 8) as u16,
            feature_length: ((feature + 7) / 8) as u16,
        });
    }

    Ok(DeviceDescription { preparsed, reports })
}
