//! Fixed-width binary packing of interval lists.
//!
//! Each interval occupies 8 bytes: `begin` then `end`, each a little-endian
//! `u32`. The packed form carries no header; its length is always a multiple
//! of 8.

use std::io::Cursor;

use byteorder::{LE, ReadBytesExt, WriteBytesExt};
use qscope_common::{Result, error::ErrorKind, verify_data};

use crate::{Interval, IntervalList};

/// Size of one packed interval, in bytes.
pub const PACKED_PAIR_SIZE: usize = 8;

/// Packs an interval list into its binary form.
pub fn pack(list: &IntervalList) -> Vec<u8> {
    let mut buf = Vec::with_capacity(list.len() * PACKED_PAIR_SIZE);
    for interval in list {
        // Writing into a Vec cannot fail.
        let _ = buf.write_u32::<LE>(interval.begin);
        let _ = buf.write_u32::<LE>(interval.end);
    }
    buf
}

/// Unpacks a binary blob produced by [`pack`].
///
/// Fails when the blob length is not a multiple of 8 or when the decoded
/// intervals violate the sorted/disjoint invariant.
pub fn unpack(blob: &[u8]) -> Result<IntervalList> {
    verify_data!(blob, blob.len() % PACKED_PAIR_SIZE == 0);
    let mut cursor = Cursor::new(blob);
    let mut intervals = Vec::with_capacity(blob.len() / PACKED_PAIR_SIZE);
    for _ in 0..blob.len() / PACKED_PAIR_SIZE {
        let begin = cursor.read_u32::<LE>()?;
        let end = cursor.read_u32::<LE>()?;
        let interval = Interval::try_new(begin, end).ok_or_else(|| ErrorKind::InvalidFormat {
            element: "blob".to_string(),
            message: format!("reversed interval [{begin}, {end}]"),
        })?;
        intervals.push(interval);
    }
    IntervalList::from_sorted(intervals).map_err(|e| {
        ErrorKind::InvalidFormat {
            element: "blob".to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::{pack, unpack};
    use crate::IntervalList;

    #[test]
    fn test_layout_is_little_endian() {
        let list = IntervalList::from_pairs([(5, 9), (0x0102_0304, 0x0102_0305)]).unwrap();
        let blob = pack(&list);
        assert_eq!(blob.len(), 16);
        assert_eq!(&blob[..8], &[5, 0, 0, 0, 9, 0, 0, 0]);
        assert_eq!(&blob[8..12], &[4, 3, 2, 1]);
        assert_eq!(unpack(&blob).unwrap(), list);
    }

    #[test]
    fn test_empty() {
        assert!(pack(&IntervalList::new()).is_empty());
        assert!(unpack(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_truncated_or_unordered() {
        assert!(unpack(&[1, 0, 0, 0, 2, 0, 0]).is_err());

        let mut blob = Vec::new();
        for v in [10u32, 12, 0, 3] {
            blob.extend_from_slice(&v.to_le_bytes());
        }
        let err = unpack(&blob).unwrap_err();
        assert!(err.is_storage_failure());
    }
}
