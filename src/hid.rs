// SPDX-License-Identifier: MIT

//! Splitting a report descriptor byte stream into its individual short
//! items. Interpretation of the resulting items is left to the caller.
//!
//! In this document and unless stated otherwise, a reference to "Section a.b.c" refers to the
//! [HID Device Class Definition for HID 1.11](https://www.usb.org/document-library/device-class-definition-hid-111).
//!
//! Every short item is a one-byte header (tag, type, size selector)
//! followed by 0, 1, 2 or 4 little-endian payload bytes (a size selector of
//! 3 means 4 bytes, see Section 6.2.2.2). The payload is decoded once as an
//! unsigned value and once sign-extended; the signed interpretation is used
//! by the signed global items (logical/physical bounds, unit exponent).

use crate::types::*;
use crate::ParserError;

/// Convenience function to extract a single bit as bool from a value
fn bit(bits: u32, bit: u8) -> bool {
    assert!(bit < 32);
    bits & (1 << bit) != 0
}

/// The payload of one item, decoded from its little-endian bytes.
///
/// The payload length is needed to tell how far a value must be
/// sign-extended, so it is kept alongside the raw bits.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ItemValue {
    value: u32,
    nbytes: usize,
}

impl ItemValue {
    /// Decodes a 0/1/2/4 byte payload. The caller guarantees the slice
    /// length, the item header's size selector cannot produce anything else.
    fn new(bytes: &[u8]) -> ItemValue {
        let value = match bytes.len() {
            0 => 0,
            1 => bytes[0] as u32,
            2 => u16::from_le_bytes(bytes[0..2].try_into().unwrap()) as u32,
            4 => u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            n => panic!("Size {n} cannot happen"),
        };
        ItemValue {
            value,
            nbytes: bytes.len(),
        }
    }
}

impl From<&ItemValue> for u32 {
    fn from(v: &ItemValue) -> u32 {
        v.value
    }
}

impl From<&ItemValue> for u16 {
    fn from(v: &ItemValue) -> u16 {
        (v.value & 0xFFFF) as u16
    }
}

impl From<&ItemValue> for u8 {
    fn from(v: &ItemValue) -> u8 {
        (v.value & 0xFF) as u8
    }
}

impl From<&ItemValue> for i32 {
    /// The sign-extended interpretation of the payload.
    fn from(v: &ItemValue) -> i32 {
        match v.nbytes {
            0 => 0,
            1 => ((v.value & 0xFF) as u8 as i8) as i32,
            2 => ((v.value & 0xFFFF) as u16 as i16) as i32,
            4 => v.value as i32,
            n => panic!("Size {n} cannot happen"),
        }
    }
}

/// The type of a HID item may be one of [MainItem], [GlobalItem], or
/// [LocalItem], see Section 6.2.2.2. Anything else (the reserved item type,
/// long items, and tags the format does not define) is [ItemType::Reserved]
/// and fatal to the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Main(MainItem),
    Global(GlobalItem),
    Local(LocalItem),
    Reserved { header: u8 },
}

/// Main Items, see Section 6.2.2.4. The data items (Input/Output/Feature)
/// emit fields, Collection/EndCollection structure the collection tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainItem {
    Input(DataItemFlags),
    Output(DataItemFlags),
    Feature(DataItemFlags),
    Collection(CollectionKind),
    EndCollection,
}

/// The control word of an Input, Output or Feature item, see Section
/// 6.2.2.5. Kept as the raw bits because the parser classifies fields from
/// the literal flag state and stores the word in the emitted capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataItemFlags(pub u32);

impl DataItemFlags {
    /// True if the data is constant and never changes. Mutually exclusive
    /// with [DataItemFlags::is_data].
    pub fn is_constant(&self) -> bool {
        bit(self.0, 0)
    }

    /// True if the field carries data.
    pub fn is_data(&self) -> bool {
        !self.is_constant()
    }

    /// True if the data is a variable field, false for an array field.
    pub fn is_variable(&self) -> bool {
        bit(self.0, 1)
    }

    /// True if the data is relative compared to a previous report.
    pub fn is_relative(&self) -> bool {
        bit(self.0, 2)
    }

    /// True if the data is absolute.
    pub fn is_absolute(&self) -> bool {
        !self.is_relative()
    }

    /// True if the data wraps around at the logical minimum/maximum
    /// (e.g. a dial that can spin at 360 degrees).
    pub fn wraps(&self) -> bool {
        bit(self.0, 3)
    }

    /// True if the data was pre-processed on the device and the logical
    /// range is not linear.
    pub fn is_nonlinear(&self) -> bool {
        bit(self.0, 4)
    }

    /// True if the control does not have a preferred state it returns to
    /// when the user stops interacting.
    pub fn has_no_preferred_state(&self) -> bool {
        bit(self.0, 5)
    }

    /// True if the control has a null state where it does not send data
    /// (e.g. a joystick in neutral position).
    pub fn has_null_state(&self) -> bool {
        bit(self.0, 6)
    }

    /// True if the control value should be changed by the host. Reserved
    /// on Input items.
    pub fn is_volatile(&self) -> bool {
        bit(self.0, 7)
    }

    /// True if the control emits a fixed size stream of bytes.
    pub fn is_buffered_bytes(&self) -> bool {
        bit(self.0, 8)
    }

    /// The literal classification the field layout depends on: an array
    /// field has neither the Constant bit nor the Variable bit set.
    pub(crate) fn is_array_field(&self) -> bool {
        self.0 & 0x03 == 0
    }
}

/// The collection type carried by a Collection item, see Section 6.2.2.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Physical,
    Application,
    Logical,
    Report,
    NamedArray,
    UsageSwitch,
    UsageModifier,
    Reserved { value: u8 },
    VendorDefined { value: u8 },
}

impl From<u8> for CollectionKind {
    fn from(v: u8) -> CollectionKind {
        match v {
            0x00 => CollectionKind::Physical,
            0x01 => CollectionKind::Application,
            0x02 => CollectionKind::Logical,
            0x03 => CollectionKind::Report,
            0x04 => CollectionKind::NamedArray,
            0x05 => CollectionKind::UsageSwitch,
            0x06 => CollectionKind::UsageModifier,
            value @ 0x07..=0x7f => CollectionKind::Reserved { value },
            value @ 0x80..=0xff => CollectionKind::VendorDefined { value },
        }
    }
}

impl From<&CollectionKind> for u8 {
    fn from(c: &CollectionKind) -> u8 {
        match c {
            CollectionKind::Physical => 0u8,
            CollectionKind::Application => 1u8,
            CollectionKind::Logical => 2u8,
            CollectionKind::Report => 3u8,
            CollectionKind::NamedArray => 4u8,
            CollectionKind::UsageSwitch => 5u8,
            CollectionKind::UsageModifier => 6u8,
            CollectionKind::Reserved { value } => *value,
            CollectionKind::VendorDefined { value } => *value,
        }
    }
}

/// Global items, see Section 6.2.2.7. These set scope-wide attributes that
/// stay in effect until changed, and nest via Push/Pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalItem {
    UsagePage(UsagePage),
    LogicalMinimum(LogicalMinimum),
    LogicalMaximum(LogicalMaximum),
    PhysicalMinimum(PhysicalMinimum),
    PhysicalMaximum(PhysicalMaximum),
    UnitExponent(UnitExponent),
    Unit(Unit),
    ReportSize(ReportSize),
    ReportId(ReportId),
    ReportCount(ReportCount),
    Push,
    Pop,
}

/// Local items, see Section 6.2.2.8. These apply to the next Main item
/// only and are cleared after it.
///
/// A usage declaration may carry its usage page in the upper 16 payload
/// bits (a 4-byte item). Where it does not, the decoded page is 0 and the
/// interpreter substitutes the active global usage page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalItem {
    Usage { usage_page: UsagePage, usage: UsageId },
    UsageMinimum { usage_page: UsagePage, usage: UsageId },
    UsageMaximum { usage_page: UsagePage, usage: UsageId },
    DesignatorIndex(u16),
    DesignatorMinimum(u16),
    DesignatorMaximum(u16),
    StringIndex(u16),
    StringMinimum(u16),
    StringMaximum(u16),
    Delimiter(u32),
}

fn decode_usage(value: &ItemValue) -> (UsagePage, UsageId) {
    let v = u32::from(value);
    (UsagePage((v >> 16) as u16), UsageId(v as u16))
}

impl ItemType {
    fn decode(header: u8, value: &ItemValue) -> ItemType {
        let tag = header >> 4;
        match (header >> 2) & 0x03 {
            0b00 => match tag {
                0x8 => ItemType::Main(MainItem::Input(DataItemFlags(value.into()))),
                0x9 => ItemType::Main(MainItem::Output(DataItemFlags(value.into()))),
                0xB => ItemType::Main(MainItem::Feature(DataItemFlags(value.into()))),
                0xA => ItemType::Main(MainItem::Collection(CollectionKind::from(u8::from(value)))),
                0xC => ItemType::Main(MainItem::EndCollection),
                _ => ItemType::Reserved { header },
            },
            0b01 => match tag {
                0x0 => ItemType::Global(GlobalItem::UsagePage(UsagePage(value.into()))),
                0x1 => ItemType::Global(GlobalItem::LogicalMinimum(LogicalMinimum(value.into()))),
                0x2 => ItemType::Global(GlobalItem::LogicalMaximum(LogicalMaximum(value.into()))),
                0x3 => ItemType::Global(GlobalItem::PhysicalMinimum(PhysicalMinimum(value.into()))),
                0x4 => ItemType::Global(GlobalItem::PhysicalMaximum(PhysicalMaximum(value.into()))),
                0x5 => ItemType::Global(GlobalItem::UnitExponent(UnitExponent(value.into()))),
                0x6 => ItemType::Global(GlobalItem::Unit(Unit(i32::from(value) as u32))),
                0x7 => ItemType::Global(GlobalItem::ReportSize(ReportSize(value.into()))),
                0x8 => ItemType::Global(GlobalItem::ReportId(ReportId(value.into()))),
                0x9 => ItemType::Global(GlobalItem::ReportCount(ReportCount(value.into()))),
                0xA => ItemType::Global(GlobalItem::Push),
                0xB => ItemType::Global(GlobalItem::Pop),
                _ => ItemType::Reserved { header },
            },
            0b10 => match tag {
                0x0 => {
                    let (usage_page, usage) = decode_usage(value);
                    ItemType::Local(LocalItem::Usage { usage_page, usage })
                }
                0x1 => {
                    let (usage_page, usage) = decode_usage(value);
                    ItemType::Local(LocalItem::UsageMinimum { usage_page, usage })
                }
                0x2 => {
                    let (usage_page, usage) = decode_usage(value);
                    ItemType::Local(LocalItem::UsageMaximum { usage_page, usage })
                }
                0x3 => ItemType::Local(LocalItem::DesignatorIndex(value.into())),
                0x4 => ItemType::Local(LocalItem::DesignatorMinimum(value.into())),
                0x5 => ItemType::Local(LocalItem::DesignatorMaximum(value.into())),
                // Local tag 6 is reserved, see Section 6.2.2.8.
                0x7 => ItemType::Local(LocalItem::StringIndex(value.into())),
                0x8 => ItemType::Local(LocalItem::StringMinimum(value.into())),
                0x9 => ItemType::Local(LocalItem::StringMaximum(value.into())),
                0xA => ItemType::Local(LocalItem::Delimiter(value.into())),
                _ => ItemType::Reserved { header },
            },
            _ => ItemType::Reserved { header },
        }
    }
}

/// One item decoded from the descriptor, together with its byte offset for
/// diagnostics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodedItem {
    pub(crate) offset: usize,
    pub(crate) item: ItemType,
}

/// Streaming reader over the items of a report descriptor. Advances by
/// `1 + payload size` per item; a payload that would read past the end of
/// the input yields a fatal [ParserError::MalformedItem].
pub(crate) struct ItemReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ItemReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> ItemReader<'a> {
        ItemReader { bytes, offset: 0 }
    }
}

impl Iterator for ItemReader<'_> {
    type Item = Result<DecodedItem, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let rest = &self.bytes[self.offset..];
        let header = rest[0];
        let size = match header & 0x03 {
            3 => 4,
            n => n as usize,
        };
        if rest.len() < 1 + size {
            return Some(Err(ParserError::MalformedItem {
                offset: self.offset,
                message: format!("need {size} bytes to read item value"),
            }));
        }
        let value = ItemValue::new(&rest[1..1 + size]);
        let offset = self.offset;
        self.offset += 1 + size;
        Some(Ok(DecodedItem {
            offset,
            item: ItemType::decode(header, &value),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(bytes: &[u8]) -> ItemType {
        ItemReader::new(bytes).next().unwrap().unwrap().item
    }

    #[test]
    fn decode_global_items() {
        assert_eq!(
            decode_one(&[0x05, 0x01]),
            ItemType::Global(GlobalItem::UsagePage(UsagePage(1)))
        );
        assert_eq!(
            decode_one(&[0x85, 0x42]),
            ItemType::Global(GlobalItem::ReportId(ReportId(0x42)))
        );
        assert_eq!(decode_one(&[0xA4]), ItemType::Global(GlobalItem::Push));
        assert_eq!(decode_one(&[0xB4]), ItemType::Global(GlobalItem::Pop));
    }

    #[test]
    fn sign_extension() {
        // 1-byte logical minimum -127
        assert_eq!(
            decode_one(&[0x15, 0x81]),
            ItemType::Global(GlobalItem::LogicalMinimum(LogicalMinimum(-127)))
        );
        // 2-byte logical maximum 0x7fff
        assert_eq!(
            decode_one(&[0x26, 0xFF, 0x7F]),
            ItemType::Global(GlobalItem::LogicalMaximum(LogicalMaximum(32767)))
        );
        // size selector 3 means 4 payload bytes
        assert_eq!(
            decode_one(&[0x17, 0xFF, 0xFF, 0xFF, 0xFF]),
            ItemType::Global(GlobalItem::LogicalMinimum(LogicalMinimum(-1)))
        );
    }

    #[test]
    fn usage_with_and_without_page() {
        assert_eq!(
            decode_one(&[0x09, 0x30]),
            ItemType::Local(LocalItem::Usage {
                usage_page: UsagePage(0),
                usage: UsageId(0x30)
            })
        );
        // 4-byte usage carries the page in the upper 16 bits
        assert_eq!(
            decode_one(&[0x0B, 0x30, 0x00, 0x01, 0x00]),
            ItemType::Local(LocalItem::Usage {
                usage_page: UsagePage(1),
                usage: UsageId(0x30)
            })
        );
    }

    #[test]
    fn main_items() {
        let item = decode_one(&[0x81, 0x02]);
        match item {
            ItemType::Main(MainItem::Input(flags)) => {
                assert!(flags.is_data());
                assert!(flags.is_variable());
                assert!(flags.is_absolute());
                assert!(!flags.is_array_field());
            }
            _ => panic!("unexpected item {item:?}"),
        }
        assert_eq!(
            decode_one(&[0xA1, 0x01]),
            ItemType::Main(MainItem::Collection(CollectionKind::Application))
        );
        assert_eq!(decode_one(&[0xC0]), ItemType::Main(MainItem::EndCollection));
    }

    #[test]
    fn array_classification_is_flag_derived() {
        // Data + Array
        assert!(DataItemFlags(0x00).is_array_field());
        // Constant padding is not an array
        assert!(!DataItemFlags(0x01).is_array_field());
        // Variable is not an array
        assert!(!DataItemFlags(0x02).is_array_field());
        // Relative does not affect the classification
        assert!(DataItemFlags(0x04).is_array_field());
    }

    #[test]
    fn truncated_payload() {
        let err = ItemReader::new(&[0x75]).next().unwrap().unwrap_err();
        assert!(matches!(err, ParserError::MalformedItem { offset: 0, .. }));
        // second item truncated, first one fine
        let mut reader = ItemReader::new(&[0x05, 0x01, 0x26, 0xFF]);
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, ParserError::MalformedItem { offset: 2, .. }));
    }

    #[test]
    fn reserved_items() {
        // reserved item type
        assert_eq!(decode_one(&[0x0C]), ItemType::Reserved { header: 0x0C });
        // reserved local tag 6
        assert_eq!(decode_one(&[0x68]), ItemType::Reserved { header: 0x68 });
        // delimiters are decoded, rejection is the interpreter's business
        assert_eq!(
            decode_one(&[0xA9, 0x01]),
            ItemType::Local(LocalItem::Delimiter(1))
        );
    }

    #[test]
    fn offsets_advance_by_item_size() {
        let bytes = [0x05, 0x01, 0xA4, 0x17, 0x00, 0x00, 0x00, 0x00, 0xC0];
        let offsets: Vec<usize> = ItemReader::new(&bytes)
            .map(|i| i.unwrap().offset)
            .collect();
        assert_eq!(offsets, vec![0, 2, 3, 8]);
    }
}
