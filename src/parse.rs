// SPDX-License-Identifier: MIT

//! The stateful interpreter that turns the item stream of a report
//! descriptor into [PreparsedData].
//!
//! All state lives in one [ParserState] owned by the parse call: the global
//! attribute stack, the local usage buffer, the collection stack and node
//! arena, the three per-report-type capability arrays, and the per-report-id
//! bit cursors. The state is consumed by the assembler at the end of the
//! stream and never shared across calls.

use tracing::{debug, trace, warn};

use crate::hid::{DataItemFlags, GlobalItem, ItemReader, ItemType, LocalItem, MainItem};
use crate::types::*;
use crate::{
    CapsFlags, CollectionNode, ParserError, PreparsedData, ReportType, ReportTypeInfo, ValueCaps,
};

/// Nesting bound for Push/Pop and for open collections. Anything deeper is
/// a broken descriptor.
pub(crate) const STACK_LIMIT: usize = 256;
/// A main item may be preceded by at most this many usage declarations.
pub(crate) const USAGES_LIMIT: usize = 255;
/// Capability and collection arrays are indexed by u16.
pub(crate) const CAPS_LIMIT: usize = u16::MAX as usize;

type Result<T> = std::result::Result<T, ParserError>;

/// Bounded, allocation-checked push shared by all growable parser storage.
fn try_push<T>(vec: &mut Vec<T>, limit: usize, what: &'static str, value: T) -> Result<()> {
    if vec.len() >= limit {
        return Err(ParserError::StackOverflow(what));
    }
    vec.try_reserve(1).map_err(|_| ParserError::OutOfMemory)?;
    vec.push(value);
    Ok(())
}

/// The nine global attributes subject to Push/Pop, see Section 6.2.2.7.
#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    usage_page: UsagePage,
    logical_min: LogicalMinimum,
    logical_max: LogicalMaximum,
    physical_min: PhysicalMinimum,
    physical_max: PhysicalMaximum,
    unit: Unit,
    unit_exponent: UnitExponent,
    report_size: ReportSize,
    report_id: ReportId,
    report_count: ReportCount,
}

/// One entry of the local usage buffer. Single usages have min == max, a
/// declared Usage Minimum/Maximum pair collapses the buffer to one entry
/// with min != max.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct UsageEntry {
    page: UsagePage,
    min: UsageId,
    max: UsageId,
}

/// Local attributes, cleared after every Main item, see Section 6.2.2.8.
#[derive(Debug, Default)]
struct LocalState {
    usages: Vec<UsageEntry>,
    is_range: bool,
    designator_min: u16,
    designator_max: u16,
    is_designator_range: bool,
    string_min: u16,
    string_max: u16,
    is_string_range: bool,
}

impl LocalState {
    fn reset(&mut self) {
        self.usages.clear();
        self.is_range = false;
        self.designator_min = 0;
        self.designator_max = 0;
        self.is_designator_range = false;
        self.string_min = 0;
        self.string_max = 0;
        self.is_string_range = false;
    }

    /// A single Usage discards a previously declared range and appends to
    /// the list.
    fn add_usage(&mut self, page: UsagePage, usage: UsageId) -> Result<()> {
        if self.is_range {
            self.usages.clear();
            self.is_range = false;
        }
        try_push(
            &mut self.usages,
            USAGES_LIMIT,
            "local usage buffer",
            UsageEntry {
                page,
                min: usage,
                max: usage,
            },
        )
    }

    /// Collapses the buffer to the single range entry. Min and max may
    /// arrive in either order; when switching from a usage list to a range
    /// the other bound starts over at zero.
    fn range_entry(&mut self) -> &mut UsageEntry {
        if !self.is_range {
            self.usages.clear();
            self.usages.push(UsageEntry::default());
            self.is_range = true;
        }
        self.usages.truncate(1);
        &mut self.usages[0]
    }

    fn set_usage_min(&mut self, page: UsagePage, usage: UsageId) {
        let entry = self.range_entry();
        entry.page = page;
        entry.min = usage;
    }

    fn set_usage_max(&mut self, page: UsagePage, usage: UsageId) {
        let entry = self.range_entry();
        entry.page = page;
        entry.max = usage;
    }
}

/// The collection linkage visible to emitted capabilities: the enclosing
/// node's index and its usage. Saved/restored by Collection/EndCollection.
#[derive(Debug, Clone, Copy, Default)]
struct LinkState {
    collection: u16,
    usage_page: UsagePage,
    usage: UsageId,
}

const REPORT_TYPES: usize = 3;

struct ParserState {
    globals: GlobalState,
    global_stack: Vec<GlobalState>,
    locals: LocalState,
    link: LinkState,
    collection_stack: Vec<LinkState>,
    collections: Vec<CollectionNode>,
    values: [Vec<ValueCaps>; REPORT_TYPES],
    data_index: [u16; REPORT_TYPES],
    /// Per report type and report id: running bit position of the next
    /// field. Zero means the report id has not been seen yet.
    bit_cursor: Box<[[u32; 256]; REPORT_TYPES]>,
    byte_length: [u16; REPORT_TYPES],
    top_usage_page: UsagePage,
    top_usage: UsageId,
}

impl ParserState {
    fn new() -> ParserState {
        ParserState {
            globals: GlobalState::default(),
            global_stack: Vec::new(),
            locals: LocalState::default(),
            link: LinkState::default(),
            collection_stack: Vec::new(),
            collections: Vec::new(),
            values: [Vec::new(), Vec::new(), Vec::new()],
            data_index: [0; REPORT_TYPES],
            bit_cursor: Box::new([[0; 256]; REPORT_TYPES]),
            byte_length: [0; REPORT_TYPES],
            top_usage_page: UsagePage::default(),
            top_usage: UsageId::default(),
        }
    }

    /// Substitute the active global usage page for local usage declarations
    /// that did not carry one.
    fn resolve_page(&self, page: UsagePage) -> UsagePage {
        if u16::from(page) == 0 {
            self.globals.usage_page
        } else {
            page
        }
    }

    fn push_globals(&mut self) -> Result<()> {
        try_push(
            &mut self.global_stack,
            STACK_LIMIT,
            "global state stack",
            self.globals,
        )
    }

    fn pop_globals(&mut self) -> Result<()> {
        self.globals = self
            .global_stack
            .pop()
            .ok_or(ParserError::StackUnderflow("global state stack"))?;
        Ok(())
    }

    fn open_collection(&mut self, kind: crate::hid::CollectionKind) -> Result<()> {
        try_push(
            &mut self.collection_stack,
            STACK_LIMIT,
            "collection stack",
            self.link,
        )?;
        if self.collections.len() >= CAPS_LIMIT {
            return Err(ParserError::StackOverflow("collection node arena"));
        }
        self.collections
            .try_reserve(1)
            .map_err(|_| ParserError::OutOfMemory)?;

        // The node's usage comes from the first declared local usage (or
        // zero), its page from the active global usage page.
        let usage = self.locals.usages.first().map(|e| e.min).unwrap_or_default();
        let node = CollectionNode {
            usage_page: self.globals.usage_page,
            usage,
            kind,
            parent: self.link.collection,
        };
        let index = self.collections.len() as u16;
        if index == 0 {
            // The first collection seeds the device's top-level usage.
            self.top_usage_page = node.usage_page;
            self.top_usage = node.usage;
        }
        self.link = LinkState {
            collection: index,
            usage_page: node.usage_page,
            usage: node.usage,
        };
        self.collections.push(node);
        self.locals.reset();
        Ok(())
    }

    fn close_collection(&mut self) -> Result<()> {
        self.link = self
            .collection_stack
            .pop()
            .ok_or(ParserError::StackUnderflow("collection stack"))?;
        self.locals.reset();
        Ok(())
    }

    /// The Value Capability Builder: emits one capability per declared
    /// usage (or one for the implicit usage) for an Input/Output/Feature
    /// item and advances the per-report-id bit cursor.
    fn add_fields(&mut self, ty: ReportType, item: DataItemFlags) -> Result<()> {
        let ti = ty as usize;
        let report_id = self.globals.report_id;
        let bit_size = u32::from(u16::from(self.globals.report_size));
        let declared_count = u16::from(self.globals.report_count);

        let cursor = &mut self.bit_cursor[ti][u8::from(report_id) as usize];
        if *cursor == 0 {
            // Reserve the leading report-id byte the first time this
            // report id is seen for this report type.
            *cursor = 8;
        }
        *cursor = cursor.wrapping_add(bit_size * u32::from(declared_count));
        self.byte_length[ti] = self.byte_length[ti].max((cursor.wrapping_add(7) / 8) as u16);
        let mut start = *cursor;

        if declared_count == 0 {
            // Nothing to emit; the zero added width made the cursor update
            // above a no-op beyond registering the report id.
            self.locals.reset();
            return Ok(());
        }

        let usages = self.locals.usages.len().max(1);
        // The assembler indexes the concatenated table with u16, so the
        // bound holds across all three report types together.
        let total: usize = self.values.iter().map(Vec::len).sum();
        if CAPS_LIMIT - total < usages {
            return Err(ParserError::StackOverflow("value capability array"));
        }
        let values = &mut self.values[ti];
        values
            .try_reserve(usages)
            .map_err(|_| ParserError::OutOfMemory)?;

        let is_array = item.is_array_field();
        let mut report_count = declared_count;
        if !is_array {
            // The remaining repetitions beyond one-per-usage go to the
            // last-declared usage, which is emitted first.
            report_count = report_count.wrapping_sub(usages as u16 - 1);
        } else {
            // Array entries share one contiguous block.
            start = start.wrapping_sub(u32::from(declared_count) * bit_size);
        }

        let mut flags = CapsFlags::empty();
        if item.is_absolute() {
            flags |= CapsFlags::IS_ABSOLUTE;
        }
        if item.is_constant() {
            flags |= CapsFlags::IS_CONSTANT;
        }
        if bit_size == 1 || is_array {
            flags |= CapsFlags::IS_BUTTON;
        }
        if is_array {
            flags |= CapsFlags::IS_ARRAY;
        }
        if self.locals.is_range {
            flags |= CapsFlags::IS_RANGE;
        }
        if self.locals.is_designator_range {
            flags |= CapsFlags::IS_DESIGNATOR_RANGE;
        }
        if self.locals.is_string_range {
            flags |= CapsFlags::IS_STRING_RANGE;
        }

        // Walk from the highest declared usage down so that the
        // first-declared usage ends up at the lowest bit offset.
        for idx in (0..usages).rev() {
            if !is_array {
                start = start.wrapping_sub(u32::from(report_count) * bit_size);
            }
            let mut flags = flags;
            if is_array && idx != 0 {
                flags |= CapsFlags::ARRAY_HAS_MORE;
            }
            let entry = self.locals.usages.get(idx).copied().unwrap_or_default();

            let data_index_min = self.data_index[ti];
            let data_index_max = data_index_min
                .wrapping_add(u16::from(entry.max).wrapping_sub(u16::from(entry.min)));
            if u16::from(entry.min) != 0 || u16::from(entry.max) != 0 {
                self.data_index[ti] = data_index_max.wrapping_add(1);
            }

            values.push(ValueCaps {
                report_id,
                usage_page: entry.page,
                usage_min: entry.min,
                usage_max: entry.max,
                flags,
                bit_field: item,
                bit_size: self.globals.report_size,
                report_count: ReportCount(report_count),
                start_byte: (start / 8) as u16,
                start_bit: (start % 8) as u8,
                logical_min: self.globals.logical_min,
                logical_max: self.globals.logical_max,
                physical_min: self.globals.physical_min,
                physical_max: self.globals.physical_max,
                unit: self.globals.unit,
                unit_exponent: self.globals.unit_exponent,
                designator_min: self.locals.designator_min,
                designator_max: self.locals.designator_max,
                string_min: self.locals.string_min,
                string_max: self.locals.string_max,
                data_index_min,
                data_index_max,
                link_collection: self.link.collection,
                link_usage_page: self.link.usage_page,
                link_usage: self.link.usage,
            });
            if !is_array {
                report_count = 1;
            }
        }

        trace!(
            report_type = ?ty,
            report_id = %report_id,
            count = usages,
            "emitted value capabilities"
        );
        self.locals.reset();
        Ok(())
    }

    /// The assembler: packs the three capability arrays and the collection
    /// arena into the immutable output table.
    fn build(self) -> Result<PreparsedData> {
        let [input, output, feature] = self.values;
        let total = input.len() + output.len() + feature.len();
        let mut caps = Vec::new();
        caps.try_reserve_exact(total)
            .map_err(|_| ParserError::OutOfMemory)?;

        let mut reports = [ReportTypeInfo::default(); REPORT_TYPES];
        let mut start = 0u16;
        for (ti, values) in [input, output, feature].into_iter().enumerate() {
            reports[ti] = ReportTypeInfo {
                caps_start: start,
                caps_count: values.len() as u16,
                byte_length: self.byte_length[ti],
            };
            start += values.len() as u16;
            caps.extend(values);
        }

        Ok(PreparsedData {
            usage_page: self.top_usage_page,
            usage: self.top_usage,
            reports,
            caps,
            collections: self.collections,
        })
    }
}

pub(crate) fn parse_descriptor(bytes: &[u8]) -> Result<PreparsedData> {
    debug!(length = bytes.len(), "parsing report descriptor");

    let mut state = ParserState::new();
    for decoded in ItemReader::new(bytes) {
        let decoded = decoded?;
        match decoded.item {
            ItemType::Main(MainItem::Input(item)) => state.add_fields(ReportType::Input, item)?,
            ItemType::Main(MainItem::Output(item)) => state.add_fields(ReportType::Output, item)?,
            ItemType::Main(MainItem::Feature(item)) => {
                state.add_fields(ReportType::Feature, item)?
            }
            ItemType::Main(MainItem::Collection(kind)) => state.open_collection(kind)?,
            ItemType::Main(MainItem::EndCollection) => state.close_collection()?,

            ItemType::Global(GlobalItem::UsagePage(page)) => state.globals.usage_page = page,
            ItemType::Global(GlobalItem::LogicalMinimum(min)) => state.globals.logical_min = min,
            ItemType::Global(GlobalItem::LogicalMaximum(max)) => state.globals.logical_max = max,
            ItemType::Global(GlobalItem::PhysicalMinimum(min)) => state.globals.physical_min = min,
            ItemType::Global(GlobalItem::PhysicalMaximum(max)) => state.globals.physical_max = max,
            ItemType::Global(GlobalItem::UnitExponent(exp)) => state.globals.unit_exponent = exp,
            ItemType::Global(GlobalItem::Unit(unit)) => state.globals.unit = unit,
            ItemType::Global(GlobalItem::ReportSize(size)) => state.globals.report_size = size,
            ItemType::Global(GlobalItem::ReportId(id)) => state.globals.report_id = id,
            ItemType::Global(GlobalItem::ReportCount(count)) => state.globals.report_count = count,
            ItemType::Global(GlobalItem::Push) => state.push_globals()?,
            ItemType::Global(GlobalItem::Pop) => state.pop_globals()?,

            ItemType::Local(LocalItem::Usage { usage_page, usage }) => {
                let page = state.resolve_page(usage_page);
                state.locals.add_usage(page, usage)?;
            }
            ItemType::Local(LocalItem::UsageMinimum { usage_page, usage }) => {
                let page = state.resolve_page(usage_page);
                state.locals.set_usage_min(page, usage);
            }
            ItemType::Local(LocalItem::UsageMaximum { usage_page, usage }) => {
                let page = state.resolve_page(usage_page);
                state.locals.set_usage_max(page, usage);
            }
            ItemType::Local(LocalItem::DesignatorIndex(value)) => {
                state.locals.designator_min = value;
                state.locals.designator_max = value;
                state.locals.is_designator_range = false;
            }
            ItemType::Local(LocalItem::DesignatorMinimum(value)) => {
                state.locals.designator_min = value;
                state.locals.is_designator_range = true;
            }
            ItemType::Local(LocalItem::DesignatorMaximum(value)) => {
                state.locals.designator_max = value;
                state.locals.is_designator_range = true;
            }
            ItemType::Local(LocalItem::StringIndex(value)) => {
                state.locals.string_min = value;
                state.locals.string_max = value;
                state.locals.is_string_range = false;
            }
            ItemType::Local(LocalItem::StringMinimum(value)) => {
                state.locals.string_min = value;
                state.locals.is_string_range = true;
            }
            ItemType::Local(LocalItem::StringMaximum(value)) => {
                state.locals.string_max = value;
                state.locals.is_string_range = true;
            }
            ItemType::Local(LocalItem::Delimiter(_)) => {
                return Err(ParserError::MalformedItem {
                    offset: decoded.offset,
                    message: "Delimiter items are not supported".into(),
                });
            }

            ItemType::Reserved { header } => {
                return Err(ParserError::MalformedItem {
                    offset: decoded.offset,
                    message: format!("reserved or unsupported item {header:#04x}"),
                });
            }
        }
    }

    // Unbalanced state at the end of the stream is worth a diagnostic but
    // the assembled result is still usable.
    if !state.global_stack.is_empty() {
        warn!(
            depth = state.global_stack.len(),
            "descriptor ends with unpopped global state"
        );
    }
    if !state.collection_stack.is_empty() {
        warn!(
            depth = state.collection_stack.len(),
            "descriptor ends with open collections"
        );
    }

    state.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn locals_reset_after_main_item() {
        // Usage(X), Input, Input: the second input must see the implicit
        // zero usage, not X again.
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x15, 0x00, // Logical Minimum (0)
            0x25, 0x01, // Logical Maximum (1)
            0x75, 0x08, // Report Size (8)
            0x95, 0x01, // Report Count (1)
            0x09, 0x30, // Usage (X)
            0x81, 0x02, // Input (Data,Var,Abs)
            0x81, 0x02, // Input (Data,Var,Abs)
        ];
        let data = parse(&bytes).unwrap();
        let caps = data.caps(ReportType::Input);
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[0].usage_min, UsageId(0x30));
        assert_eq!(caps[0].usage_page, UsagePage(1));
        assert_eq!(caps[1].usage_min, UsageId(0));
        assert_eq!(caps[1].usage_max, UsageId(0));
        assert_eq!(caps[1].usage_page, UsagePage(0));
        assert_eq!(caps[1].designator_min, 0);
        assert_eq!(caps[1].string_min, 0);
    }

    #[test]
    fn push_pop_restores_globals() {
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x15, 0x05, // Logical Minimum (5)
            0xA4, // Push
            0x15, 0x01, // Logical Minimum (1)
            0xB4, // Pop
            0x09, 0x30, // Usage (X)
            0x25, 0x7F, // Logical Maximum (127)
            0x75, 0x08, // Report Size (8)
            0x95, 0x01, // Report Count (1)
            0x81, 0x02, // Input (Data,Var,Abs)
        ];
        let data = parse(&bytes).unwrap();
        let caps = data.caps(ReportType::Input);
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].logical_min, LogicalMinimum(5));
    }

    #[test]
    fn usage_range_merges_in_either_order() {
        // Maximum before minimum
        let bytes = [
            0x05, 0x09, // Usage Page (Button)
            0x29, 0x08, // Usage Maximum (8)
            0x19, 0x01, // Usage Minimum (1)
            0x75, 0x01, // Report Size (1)
            0x95, 0x08, // Report Count (8)
            0x81, 0x02, // Input (Data,Var,Abs)
        ];
        let data = parse(&bytes).unwrap();
        let caps = data.caps(ReportType::Input);
        assert_eq!(caps.len(), 1);
        assert!(caps[0].flags.contains(CapsFlags::IS_RANGE));
        assert_eq!(caps[0].usage_min, UsageId(1));
        assert_eq!(caps[0].usage_max, UsageId(8));
        assert_eq!(caps[0].report_count, ReportCount(8));
    }

    #[test]
    fn usage_list_discarded_by_range() {
        // Two single usages followed by a min/max pair: only the range
        // survives.
        let bytes = [
            0x05, 0x09, // Usage Page (Button)
            0x09, 0x20, // Usage (0x20)
            0x09, 0x21, // Usage (0x21)
            0x19, 0x01, // Usage Minimum (1)
            0x29, 0x04, // Usage Maximum (4)
            0x75, 0x01, // Report Size (1)
            0x95, 0x04, // Report Count (4)
            0x81, 0x02, // Input (Data,Var,Abs)
        ];
        let data = parse(&bytes).unwrap();
        let caps = data.caps(ReportType::Input);
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].usage_min, UsageId(1));
        assert_eq!(caps[0].usage_max, UsageId(4));
    }

    #[test]
    fn usage_page_inherited_from_globals() {
        let bytes = [
            0x05, 0x0C, // Usage Page (Consumer)
            0x09, 0xE9, // Usage (Volume Up), no page of its own
            0x0B, 0x30, 0x00, 0x01, 0x00, // Usage (Generic Desktop / X), explicit page
            0x75, 0x01, // Report Size (1)
            0x95, 0x02, // Report Count (2)
            0x81, 0x02, // Input (Data,Var,Abs)
        ];
        let data = parse(&bytes).unwrap();
        let caps = data.caps(ReportType::Input);
        assert_eq!(caps.len(), 2);
        // emitted highest declared usage first
        assert_eq!(caps[0].usage_page, UsagePage(1));
        assert_eq!(caps[0].usage_min, UsageId(0x30));
        assert_eq!(caps[1].usage_page, UsagePage(0x0C));
        assert_eq!(caps[1].usage_min, UsageId(0xE9));
    }

    #[test]
    fn zero_report_count_registers_report_id_only() {
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x30, // Usage (X)
            0x75, 0x08, // Report Size (8)
            0x81, 0x02, // Input with Report Count still 0
        ];
        let data = parse(&bytes).unwrap();
        assert!(data.caps(ReportType::Input).is_empty());
        // the reserved report-id byte is still accounted for
        assert_eq!(data.report_byte_length(ReportType::Input), 1);
        assert_eq!(data.report_byte_length(ReportType::Output), 0);
    }

    #[test]
    fn pop_on_empty_stack_fails() {
        let err = parse(&[0xB4]).unwrap_err();
        assert!(matches!(
            err,
            ParserError::StackUnderflow("global state stack")
        ));
    }

    #[test]
    fn unmatched_end_collection_fails() {
        let err = parse(&[0xC0]).unwrap_err();
        assert!(matches!(err, ParserError::StackUnderflow("collection stack")));
    }

    #[test]
    fn delimiter_is_unsupported() {
        let err = parse(&[0xA9, 0x01]).unwrap_err();
        assert!(matches!(err, ParserError::MalformedItem { offset: 0, .. }));
    }

    #[test]
    fn usage_buffer_overflow_fails() {
        let mut bytes = Vec::new();
        for _ in 0..256 {
            bytes.extend_from_slice(&[0x09, 0x01]); // Usage (1)
        }
        let err = parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ParserError::StackOverflow("local usage buffer")
        ));
    }

    #[test]
    fn global_stack_overflow_fails() {
        let bytes = vec![0xA4; STACK_LIMIT + 1]; // Push
        let err = parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ParserError::StackOverflow("global state stack")
        ));
    }

    #[test]
    fn unbalanced_push_at_end_is_diagnostic_only() {
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0xA4, // Push, never popped
            0x09, 0x30, // Usage (X)
            0x75, 0x08, // Report Size (8)
            0x95, 0x01, // Report Count (1)
            0x81, 0x02, // Input (Data,Var,Abs)
        ];
        let data = parse(&bytes).unwrap();
        assert_eq!(data.caps(ReportType::Input).len(), 1);
    }

    #[test]
    fn caps_total_is_bounded_across_report_types() {
        // 257 zero-width Input items with 255 usages each fill the
        // concatenated table exactly; one more capability of any report
        // type must fail instead of wrapping the u16 table indices.
        let mut bytes = vec![
            0x75, 0x00, // Report Size (0)
            0x95, 0xFF, // Report Count (255)
        ];
        for _ in 0..257 {
            for usage in 1..=255u8 {
                bytes.extend_from_slice(&[0x09, usage]); // Usage (n)
            }
            bytes.extend_from_slice(&[0x81, 0x02]); // Input (Data,Var,Abs)
        }
        let data = parse(&bytes).unwrap();
        assert_eq!(data.caps(ReportType::Input).len(), CAPS_LIMIT);

        bytes.extend_from_slice(&[0x09, 0x01]); // Usage (1)
        bytes.extend_from_slice(&[0x91, 0x02]); // Output (Data,Var,Abs)
        let err = parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ParserError::StackOverflow("value capability array")
        ));
    }

    #[test]
    fn designator_and_string_locals() {
        let bytes = [
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x30, // Usage (X)
            0x39, 0x03, // Designator Index (3)
            0x89, 0x02, // String Minimum (2)
            0x99, 0x04, // String Maximum (4)
            0x75, 0x08, // Report Size (8)
            0x95, 0x01, // Report Count (1)
            0x81, 0x02, // Input (Data,Var,Abs)
        ];
        let data = parse(&bytes).unwrap();
        let caps = data.caps(ReportType::Input);
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].designator_min, 3);
        assert_eq!(caps[0].designator_max, 3);
        assert!(!caps[0].flags.contains(CapsFlags::IS_DESIGNATOR_RANGE));
        assert_eq!(caps[0].string_min, 2);
        assert_eq!(caps[0].string_max, 4);
        assert!(caps[0].flags.contains(CapsFlags::IS_STRING_RANGE));
    }
}
