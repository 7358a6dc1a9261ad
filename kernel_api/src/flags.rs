//! Per-operation flag sets

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Flags for `write_message`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct WriteMessageFlags: u32 {}
}

bitflags! {
    /// Flags for `read_message`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ReadMessageFlags: u32 {
        /// Drop a message that does not fit the supplied buffers
        const MAY_DISCARD = 1 << 0;
    }
}

bitflags! {
    /// Flags for `write_data`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct WriteDataFlags: u32 {
        /// Write everything or nothing
        const ALL_OR_NONE = 1 << 0;
    }
}

bitflags! {
    /// Flags for `read_data`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ReadDataFlags: u32 {
        /// Read everything or nothing
        const ALL_OR_NONE = 1 << 0;
        /// Consume data without copying it
        const DISCARD = 1 << 1;
        /// Report the number of readable bytes
        const QUERY = 1 << 2;
        /// Copy data without consuming it
        const PEEK = 1 << 3;
    }
}

impl ReadDataFlags {
    /// Returns true for combinations the consumer cannot honour
    ///
    /// `QUERY` stands alone, and `DISCARD` cannot be combined with `PEEK`.
    pub fn is_conflicting(&self) -> bool {
        let query_with_other = self.contains(ReadDataFlags::QUERY)
            && self.intersects(ReadDataFlags::DISCARD | ReadDataFlags::PEEK);
        let discard_and_peek = self.contains(ReadDataFlags::DISCARD | ReadDataFlags::PEEK);
        query_with_other || discard_and_peek
    }
}

bitflags! {
    /// Flags for `map_buffer`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MapBufferFlags: u32 {}
}

bitflags! {
    /// Flags reported by `get_buffer_information`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BufferInformationFlags: u32 {}
}
