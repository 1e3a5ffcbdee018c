/*!
The binary encoding for time zone transition tables.

A "zpak" blob is a versioned container holding any number of zones:

```text
magic "zpak", one version byte
zone count (varint)
for each zone:
    ID length (varint), ID bytes (UTF-8)
    block length (varint), block bytes
```

Each zone block encodes one [`ZoneTable`]:

```text
name pool:   count, then (length, UTF-8 bytes) per name
time types:  count, then (offset seconds as zigzag varint,
             DST byte, name pool index) per type
initial:     index of the type in effect before the first transition
transitions: count, then per transition a second value (an absolute
             zigzag varint for the first, a strictly positive delta from
             the previous for the rest) and a type index
```

All integers are LEB128 varints; signed values are zigzag encoded. Storing
transition instants as deltas keeps blocks compact, since consecutive
transitions are typically months apart rather than decades.

Decoding is deterministic and total: it either produces a fully validated
table or fails with an invalid-zone-data error. It is safe on arbitrary or
untrusted input, and the resources it uses are limited to a small constant
factor of the size of the input. Encoding is canonical, so
`decode(encode(table)) == table` for every valid table.
*/

use alloc::{boxed::Box, sync::Arc, vec::Vec};

use crate::{
    error::Error,
    tz::table::{TimeType, ZoneTable},
    util::crc32,
};

const MAGIC: &[u8; 4] = b"zpak";
const VERSION: u8 = 1;

/// Encodes the given tables into a single database blob, suitable for
/// [`TimeZoneDatabase::from_bytes`](crate::tz::TimeZoneDatabase::from_bytes).
///
/// # Example
///
/// ```
/// use zoneline::tz::{encode_database, Dst, Offset, TimeZoneDatabase, ZoneTable};
///
/// let utc_like = ZoneTable::builder("Etc/UTC")
///     .initial(Offset::ZERO, Dst::No, "UTC")
///     .build()?;
/// let blob = encode_database([&utc_like]);
/// let db = TimeZoneDatabase::from_bytes(&blob)?;
/// assert!(db.get("Etc/UTC").is_ok());
/// # Ok::<(), zoneline::Error>(())
/// ```
pub fn encode_database<'a, I>(tables: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a ZoneTable>,
{
    let tables: Vec<&ZoneTable> = tables.into_iter().collect();
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    push_uvarint(&mut buf, tables.len() as u64);
    for table in tables {
        let id = table.id().as_bytes();
        push_uvarint(&mut buf, id.len() as u64);
        buf.extend_from_slice(id);
        let block = encode_block(table);
        push_uvarint(&mut buf, block.len() as u64);
        buf.extend_from_slice(&block);
    }
    buf
}

/// One zone located inside a database blob: its ID and the byte range of
/// its block. Produced eagerly by [`parse_index`]; the block itself is
/// decoded lazily.
#[derive(Clone, Debug)]
pub(crate) struct ZoneEntry {
    pub(crate) id: Box<str>,
    /// The ASCII-lowercased ID, for case-insensitive lookup.
    pub(crate) lower: Box<str>,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

/// Validates a database blob's container structure and returns its zone
/// index, sorted by lowercased ID.
///
/// The zone blocks themselves are not decoded here.
pub(crate) fn parse_index(bytes: &[u8]) -> Result<Vec<ZoneEntry>, Error> {
    let mut cursor = Cursor::new(bytes);
    let magic = cursor.read_exact(MAGIC.len(), "magic")?;
    if magic != MAGIC {
        return Err(Error::invalid_zone_data(format_args!(
            "expected magic bytes {MAGIC:?}, but got {magic:?}",
        )));
    }
    let version = cursor.read_u8("version")?;
    if version != VERSION {
        return Err(Error::invalid_zone_data(format_args!(
            "unsupported zone database version {version}, expected {VERSION}",
        )));
    }
    let count = cursor.read_count("zone count")?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let id_len = cursor.read_count("zone ID length")?;
        let id = cursor.read_str(id_len, "zone ID")?;
        if id.is_empty() {
            return Err(Error::invalid_zone_data(format_args!(
                "zone database contains an empty zone ID",
            )));
        }
        let block_len = cursor.read_count("zone block length")?;
        let start = cursor.position();
        cursor.read_exact(block_len, "zone block")?;
        let end = cursor.position();
        entries.push(ZoneEntry {
            id: id.into(),
            lower: id.to_ascii_lowercase().into_boxed_str(),
            start,
            end,
        });
    }
    if !cursor.is_empty() {
        return Err(Error::invalid_zone_data(format_args!(
            "found {} trailing bytes after the last zone block",
            cursor.remaining_len(),
        )));
    }
    entries.sort_by(|e1, e2| e1.lower.cmp(&e2.lower));
    for window in entries.windows(2) {
        if window[0].lower == window[1].lower {
            return Err(Error::invalid_zone_data(format_args!(
                "zone database contains duplicate zone ID `{}`",
                window[1].id,
            )));
        }
    }
    Ok(entries)
}

/// Encodes a single zone table into its block form.
pub(crate) fn encode_block(table: &ZoneTable) -> Vec<u8> {
    let mut buf = Vec::new();

    let pool = table.pool();
    push_uvarint(&mut buf, pool.len() as u64);
    for name in pool {
        push_uvarint(&mut buf, name.len() as u64);
        buf.extend_from_slice(name.as_bytes());
    }

    let types = table.types();
    push_uvarint(&mut buf, types.len() as u64);
    for typ in types {
        push_ivarint(&mut buf, i64::from(typ.offset.seconds()));
        buf.push(if typ.dst.is_dst() { 1 } else { 0 });
        push_uvarint(&mut buf, u64::from(typ.name));
    }

    // The first transition is the synthetic sentinel; its type is the
    // zone's initial type and its instant is implied.
    let transitions = table.transitions();
    push_uvarint(&mut buf, u64::from(transitions[0].type_index));
    let real = &transitions[1..];
    push_uvarint(&mut buf, real.len() as u64);
    let mut prev = 0;
    for (i, transition) in real.iter().enumerate() {
        if i == 0 {
            push_ivarint(&mut buf, transition.second);
        } else {
            // Transitions are strictly increasing, so the delta is always
            // positive and encodes compactly.
            push_uvarint(&mut buf, (transition.second - prev) as u64);
        }
        prev = transition.second;
        push_uvarint(&mut buf, u64::from(transition.type_index));
    }
    buf
}

/// Decodes a single zone block into a fully validated table.
pub(crate) fn decode_block(
    id: Box<str>,
    bytes: &[u8],
) -> Result<ZoneTable, Error> {
    let mut cursor = Cursor::new(bytes);

    let pool_len = cursor.read_count("name pool count")?;
    let mut pool: Vec<Arc<str>> = Vec::with_capacity(pool_len);
    for _ in 0..pool_len {
        let name_len = cursor.read_count("name length")?;
        if name_len > 255 {
            return Err(Error::invalid_zone_data(format_args!(
                "name of {name_len} bytes exceeds the maximum of 255",
            )));
        }
        let name = cursor.read_str(name_len, "name")?;
        if pool.iter().any(|pooled| &**pooled == name) {
            return Err(Error::invalid_zone_data(format_args!(
                "name pool contains `{name}` more than once",
            )));
        }
        pool.push(Arc::from(name));
    }

    let type_len = cursor.read_count("time type count")?;
    let mut types = Vec::with_capacity(type_len);
    for _ in 0..type_len {
        let seconds = cursor.read_ivarint("time type offset")?;
        let offset = i32::try_from(seconds)
            .ok()
            .and_then(|seconds| {
                crate::tz::Offset::from_seconds(seconds).ok()
            })
            .ok_or_else(|| {
                Error::invalid_zone_data(format_args!(
                    "time type offset of {seconds} seconds is out of range",
                ))
            })?;
        let dst = match cursor.read_u8("DST flag")? {
            0 => crate::tz::Dst::No,
            1 => crate::tz::Dst::Yes,
            byte => {
                return Err(Error::invalid_zone_data(format_args!(
                    "invalid DST flag {byte}, expected 0 or 1",
                )))
            }
        };
        let name = cursor.read_index("name pool index")?;
        types.push(TimeType { offset, dst, name });
    }

    let initial_type = cursor.read_index("initial time type index")?;
    let transition_len = cursor.read_count("transition count")?;
    let mut raw_transitions = Vec::with_capacity(transition_len);
    let mut prev: i64 = 0;
    for i in 0..transition_len {
        let second = if i == 0 {
            cursor.read_ivarint("transition second")?
        } else {
            let delta = cursor.read_uvarint("transition delta")?;
            i64::try_from(delta)
                .ok()
                .and_then(|delta| prev.checked_add(delta))
                .ok_or_else(|| {
                    Error::invalid_zone_data(format_args!(
                        "transition delta {delta} overflows the \
                         previous transition second {prev}",
                    ))
                })?
        };
        prev = second;
        let type_index = cursor.read_index("transition type index")?;
        raw_transitions.push((second, type_index));
    }

    if !cursor.is_empty() {
        return Err(Error::invalid_zone_data(format_args!(
            "found {} trailing bytes after zone block",
            cursor.remaining_len(),
        )));
    }

    let table = ZoneTable::from_parts(
        id,
        pool,
        types,
        initial_type,
        raw_transitions,
    )?;
    Ok(table.with_checksum(crc32::sum(bytes)))
}

fn push_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn push_ivarint(buf: &mut Vec<u8>, value: i64) {
    push_uvarint(buf, ((value << 1) ^ (value >> 63)) as u64);
}

/// A cursor over raw bytes that fails with invalid-zone-data errors
/// instead of panicking or reading out of bounds.
pub(crate) struct Cursor<'a> {
    remaining: &'a [u8],
    read_count: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(remaining: &'a [u8]) -> Cursor<'a> {
        Cursor { remaining, read_count: 0 }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    pub(crate) fn remaining_len(&self) -> usize {
        self.remaining.len()
    }

    /// The number of bytes consumed so far.
    pub(crate) fn position(&self) -> usize {
        self.read_count
    }

    pub(crate) fn read_exact(
        &mut self,
        count: usize,
        what: &'static str,
    ) -> Result<&'a [u8], Error> {
        match (self.remaining.get(..count), self.remaining.get(count..)) {
            (Some(bytes), Some(rest)) => {
                self.remaining = rest;
                self.read_count += count;
                Ok(bytes)
            }
            _ => Err(Error::invalid_zone_data(format_args!(
                "truncated data: expected {count} bytes for {what}, \
                 but only {} remain",
                self.remaining.len(),
            ))),
        }
    }

    pub(crate) fn read_u8(
        &mut self,
        what: &'static str,
    ) -> Result<u8, Error> {
        Ok(self.read_exact(1, what)?[0])
    }

    pub(crate) fn read_str(
        &mut self,
        len: usize,
        what: &'static str,
    ) -> Result<&'a str, Error> {
        let bytes = self.read_exact(len, what)?;
        core::str::from_utf8(bytes).map_err(|_| {
            Error::invalid_zone_data(format_args!(
                "{what} is not valid UTF-8",
            ))
        })
    }

    pub(crate) fn read_uvarint(
        &mut self,
        what: &'static str,
    ) -> Result<u64, Error> {
        let mut value: u64 = 0;
        for shift_index in 0..10 {
            let byte = self.read_u8(what)?;
            let bits = u64::from(byte & 0x7F);
            let shift = shift_index * 7;
            // The tenth byte can only contribute a single bit.
            if shift == 63 && bits > 1 {
                break;
            }
            value |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::invalid_zone_data(format_args!(
            "varint for {what} is too long",
        )))
    }

    pub(crate) fn read_ivarint(
        &mut self,
        what: &'static str,
    ) -> Result<i64, Error> {
        let zigzag = self.read_uvarint(what)?;
        Ok(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64))
    }

    /// Reads a count prefix. A count can never legitimately exceed the
    /// number of bytes remaining, since every counted record takes at
    /// least one byte. The bound doubles as a defense against allocating for
    /// absurd claimed counts in corrupt data.
    fn read_count(&mut self, what: &'static str) -> Result<usize, Error> {
        let count = self.read_uvarint(what)?;
        let limit = self.remaining.len() as u64;
        if count > limit {
            return Err(Error::invalid_zone_data(format_args!(
                "{what} of {count} exceeds the {limit} bytes remaining",
            )));
        }
        Ok(count as usize)
    }

    /// Reads an index that must fit in a `u8`.
    fn read_index(&mut self, what: &'static str) -> Result<u8, Error> {
        let index = self.read_uvarint(what)?;
        u8::try_from(index).map_err(|_| {
            Error::invalid_zone_data(format_args!(
                "{what} of {index} exceeds the maximum of 255",
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, string::ToString, vec};

    use crate::{
        tz::{testdata, Dst, Offset},
        Instant,
    };

    use super::*;

    fn roundtrip(table: &ZoneTable) -> ZoneTable {
        let bytes = encode_block(table);
        decode_block(table.id().into(), &bytes).unwrap()
    }

    #[test]
    fn block_round_trips() {
        for table in [
            testdata::new_york(),
            testdata::gap_1970(),
            testdata::fold_1970(),
            testdata::double_gap_and_fold(),
            testdata::half_hour(),
        ] {
            let decoded = roundtrip(&table);
            assert_eq!(decoded, table, "{}", table.id());
            // Checksums agree too, since both sides fingerprint the same
            // canonical bytes.
            assert_eq!(decoded.checksum(), table.checksum(), "{}", table.id());
        }
    }

    #[test]
    fn fixed_table_round_trips() {
        let table = ZoneTable::builder("Test/Fixed")
            .initial(Offset::hms(5, 30, 0), Dst::No, "TST")
            .build()
            .unwrap();
        assert_eq!(roundtrip(&table), table);
    }

    #[test]
    fn negative_transition_seconds_round_trip() {
        let table = ZoneTable::builder("Test/Past")
            .initial(Offset::hms(14, 58, 47), Dst::No, "LMT")
            .transition(
                Instant::from_unix(-3_225_223_727, 0).unwrap(),
                Offset::hms(-9, -1, -13),
                Dst::No,
                "LMT2",
            )
            .transition(
                Instant::from_unix(-2_188_954_800, 0).unwrap(),
                Offset::constant(-8),
                Dst::No,
                "PST",
            )
            .build()
            .unwrap();
        assert_eq!(roundtrip(&table), table);
    }

    #[test]
    fn truncated_data_is_fatal_at_every_prefix() {
        let table = testdata::new_york();
        let bytes = encode_block(&table);
        for len in 0..bytes.len() {
            let err = decode_block("America/New_York".into(), &bytes[..len])
                .unwrap_err();
            assert!(err.is_invalid_zone_data(), "prefix of {len} bytes");
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let table = testdata::gap_1970();
        let mut bytes = encode_block(&table);
        bytes.push(0);
        let err = decode_block("Test/Gap1970".into(), &bytes).unwrap_err();
        assert!(err.is_invalid_zone_data());
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn corrupt_blocks_are_rejected() {
        // name pool count claiming more entries than bytes remain
        let err = decode_block("Test/Bad".into(), &[0xFF, 0x01]).unwrap_err();
        assert!(err.is_invalid_zone_data());

        // A block with one unnamed type and a bogus DST flag.
        let mut bytes = vec![];
        push_uvarint(&mut bytes, 1); // pool count
        push_uvarint(&mut bytes, 1); // name length
        bytes.push(b'X');
        push_uvarint(&mut bytes, 1); // type count
        push_ivarint(&mut bytes, 0); // offset
        bytes.push(2); // invalid DST flag
        push_uvarint(&mut bytes, 0); // name index
        let err = decode_block("Test/Bad".into(), &bytes).unwrap_err();
        assert!(err.is_invalid_zone_data());
        assert!(err.to_string().contains("DST"));
    }

    #[test]
    fn out_of_range_offsets_are_rejected() {
        let mut bytes = vec![];
        push_uvarint(&mut bytes, 1);
        push_uvarint(&mut bytes, 1);
        bytes.push(b'X');
        push_uvarint(&mut bytes, 1);
        push_ivarint(&mut bytes, 100_000); // > 18 hours
        bytes.push(0);
        push_uvarint(&mut bytes, 0);
        push_uvarint(&mut bytes, 0); // initial type
        push_uvarint(&mut bytes, 0); // no transitions
        let err = decode_block("Test/Bad".into(), &bytes).unwrap_err();
        assert!(err.is_invalid_zone_data());
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn zero_delta_transitions_are_rejected() {
        let mut bytes = vec![];
        push_uvarint(&mut bytes, 1); // pool
        push_uvarint(&mut bytes, 1);
        bytes.push(b'X');
        push_uvarint(&mut bytes, 2); // types
        push_ivarint(&mut bytes, 0);
        bytes.push(0);
        push_uvarint(&mut bytes, 0);
        push_ivarint(&mut bytes, 3600);
        bytes.push(1);
        push_uvarint(&mut bytes, 0);
        push_uvarint(&mut bytes, 0); // initial
        push_uvarint(&mut bytes, 2); // two transitions
        push_ivarint(&mut bytes, 1000); // absolute
        push_uvarint(&mut bytes, 1);
        push_uvarint(&mut bytes, 0); // delta of zero
        push_uvarint(&mut bytes, 0);
        let err = decode_block("Test/Bad".into(), &bytes).unwrap_err();
        assert!(err.is_invalid_zone_data());
    }

    #[test]
    fn database_container_round_trips() {
        let tables = [testdata::new_york(), testdata::gap_1970()];
        let blob = encode_database(tables.iter());
        let index = parse_index(&blob).unwrap();
        assert_eq!(index.len(), 2);
        // Sorted by lowercased ID.
        assert_eq!(&*index[0].id, "America/New_York");
        assert_eq!(&*index[1].id, "Test/Gap1970");
        for (entry, table) in index.iter().zip([&tables[0], &tables[1]]) {
            let decoded = decode_block(
                entry.id.clone(),
                &blob[entry.start..entry.end],
            )
            .unwrap();
            assert_eq!(decoded, *table);
        }
    }

    #[test]
    fn database_container_rejects_corruption() {
        let blob = encode_database([&testdata::gap_1970()]);

        let err = parse_index(b"nope").unwrap_err();
        assert!(err.is_invalid_zone_data());

        let mut bad_magic = blob.clone();
        bad_magic[0] = b'Z';
        assert!(parse_index(&bad_magic).unwrap_err().is_invalid_zone_data());

        let mut bad_version = blob.clone();
        bad_version[4] = 99;
        assert!(
            parse_index(&bad_version).unwrap_err().is_invalid_zone_data()
        );

        let mut trailing = blob.clone();
        trailing.push(0);
        assert!(parse_index(&trailing).unwrap_err().is_invalid_zone_data());

        for len in 0..blob.len() {
            assert!(
                parse_index(&blob[..len]).unwrap_err().is_invalid_zone_data(),
                "prefix of {len} bytes",
            );
        }
    }

    #[test]
    fn database_rejects_duplicate_ids() {
        let t1 = testdata::gap_1970();
        let mut blob = vec![];
        blob.extend_from_slice(MAGIC);
        blob.push(VERSION);
        push_uvarint(&mut blob, 2);
        for _ in 0..2 {
            let id = t1.id().as_bytes();
            push_uvarint(&mut blob, id.len() as u64);
            blob.extend_from_slice(id);
            let block = encode_block(&t1);
            push_uvarint(&mut blob, block.len() as u64);
            blob.extend_from_slice(&block);
        }
        let err = parse_index(&blob).unwrap_err();
        assert!(err.is_invalid_zone_data());
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn varints_round_trip() {
        let values: &[u64] =
            &[0, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX];
        for &value in values {
            let mut buf = vec![];
            push_uvarint(&mut buf, value);
            let mut cursor = Cursor::new(&buf);
            assert_eq!(cursor.read_uvarint("test").unwrap(), value);
            assert!(cursor.is_empty());
        }
        let values: &[i64] =
            &[0, -1, 1, 63, -64, 64, i32::MIN as i64, i64::MIN, i64::MAX];
        for &value in values {
            let mut buf = vec![];
            push_ivarint(&mut buf, value);
            let mut cursor = Cursor::new(&buf);
            assert_eq!(cursor.read_ivarint("test").unwrap(), value);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn prop_generated_tables_round_trip() {
        fn prop(plan: Vec<(u16, i16, bool, u8)>) -> bool {
            const NAMES: &[&str] = &["AAA", "BBB", "CCC", "DDD"];
            let mut builder = ZoneTable::builder("Test/Prop").initial(
                Offset::ZERO,
                Dst::No,
                "INIT",
            );
            let mut second = 0i64;
            for &(delta, offset, dst, name) in plan.iter() {
                second += 1 + i64::from(delta);
                builder = builder.transition(
                    Instant::from_unix(second, 0).unwrap(),
                    Offset::from_seconds(i32::from(offset)).unwrap(),
                    Dst::from(dst),
                    NAMES[usize::from(name) % NAMES.len()],
                );
            }
            let table = match builder.build() {
                Ok(table) => table,
                Err(_) => return false,
            };
            let bytes = encode_block(&table);
            match decode_block("Test/Prop".into(), &bytes) {
                Ok(decoded) => decoded == table,
                Err(_) => false,
            }
        }
        quickcheck::quickcheck(prop as fn(Vec<(u16, i16, bool, u8)>) -> bool);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic() {
        fn prop(bytes: Vec<u8>) -> bool {
            let _ = decode_block("Test/Fuzz".into(), &bytes);
            let _ = parse_index(&bytes);
            true
        }
        quickcheck::quickcheck(prop as fn(Vec<u8>) -> bool);
    }

    #[test]
    fn delta_encoding_is_compact() {
        // Two transitions six months apart fit in a handful of bytes each.
        let table = testdata::new_york();
        let bytes = encode_block(&table);
        let per_transition =
            bytes.len() / (table.transitions().len() - 1);
        assert!(
            per_transition < 16,
            "expected compact encoding, got {per_transition} \
             bytes per transition ({} total: {bytes:?})",
            bytes.len(),
        );
        // Keep the formatting machinery honest about what it claims.
        let _ = format!("{table:?}");
    }
}
