use std::sync::RwLock;

use alloc::{boxed::Box, vec::Vec};

use crate::{
    error::{err, Error, ErrorContext},
    tz::{
        timezone::TimeZone,
        zpak::{self, ZoneEntry},
    },
};

/// A provider of [`TimeZone`] values, keyed by zone ID.
///
/// A database is constructed from a binary blob (see
/// [`encode_database`](crate::tz::encode_database) for the producing side)
/// and owns a copy of it. The container structure is validated and indexed
/// eagerly, but individual zones are only decoded on first lookup and then
/// cached for the lifetime of the database.
///
/// # Lookup semantics
///
/// Zone IDs are matched ASCII-case-insensitively, following the common
/// convention for IANA identifiers. Repeated lookups of the same ID return
/// equal `TimeZone` values, and so do lookups against *another* database
/// built from the same bytes, since zone equality is based on the zone ID
/// and a checksum of its encoded table.
///
/// # Concurrency
///
/// A database is safe to share across threads. The cache is guarded by a
/// reader/writer lock: the hot path takes only a read lock, and a cache
/// miss decodes the zone *before* taking the write lock, so no thread ever
/// blocks on another's decode.
///
/// # Example
///
/// ```
/// use zoneline::tz::{
///     encode_database, Dst, Offset, TimeZoneDatabase, ZoneTable,
/// };
///
/// let table = ZoneTable::builder("America/New_York")
///     .initial(Offset::constant(-5), Dst::No, "EST")
///     .build()?;
/// let db = TimeZoneDatabase::from_bytes(&encode_database([&table]))?;
///
/// let tz = db.get("america/new_york")?;
/// assert_eq!(tz.id(), "America/New_York");
/// assert!(db.get("Mars/Olympus_Mons").unwrap_err().is_unknown_zone());
/// # Ok::<(), zoneline::Error>(())
/// ```
pub struct TimeZoneDatabase {
    data: Vec<u8>,
    /// Zone locations in `data`, sorted by lowercased ID.
    index: Vec<ZoneEntry>,
    /// Zones decoded so far, sorted by lowercased ID.
    zones: RwLock<Vec<CachedZone>>,
}

struct CachedZone {
    lower: Box<str>,
    tz: TimeZone,
}

impl TimeZoneDatabase {
    /// Creates a database from a binary zone data blob.
    ///
    /// The container structure (magic, version, zone directory) is
    /// validated up front. The zone blocks themselves are decoded lazily
    /// by [`TimeZoneDatabase::get`].
    ///
    /// # Errors
    ///
    /// Returns an invalid-zone-data error when the container is malformed
    /// or truncated, or contains duplicate zone IDs.
    pub fn from_bytes(bytes: &[u8]) -> Result<TimeZoneDatabase, Error> {
        let index = zpak::parse_index(bytes)?;
        debug!("opened time zone database with {} zones", index.len());
        Ok(TimeZoneDatabase {
            data: bytes.to_vec(),
            index,
            zones: RwLock::new(Vec::new()),
        })
    }

    /// Returns the time zone registered under the ID given, decoding and
    /// caching it on first use.
    ///
    /// Lookups are ASCII-case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns an unknown-zone error when no zone has the ID given, and an
    /// invalid-zone-data error when the zone exists but its block is
    /// corrupt. The two are always distinguishable; see
    /// [`Error::is_unknown_zone`](crate::Error::is_unknown_zone) and
    /// [`Error::is_invalid_zone_data`](crate::Error::is_invalid_zone_data).
    pub fn get(&self, query: &str) -> Result<TimeZone, Error> {
        // The fast path is when the query matches an already decoded zone.
        {
            let zones = self.zones.read().unwrap();
            if let Ok(i) = zones
                .binary_search_by(|z| cmp_ignore_ascii_case(&z.lower, query))
            {
                trace!("time zone cache hit for {query}");
                return Ok(zones[i].tz.clone());
            }
        }
        let Ok(i) = self
            .index
            .binary_search_by(|e| cmp_ignore_ascii_case(&e.lower, query))
        else {
            return Err(Error::unknown_zone(query));
        };
        let entry = &self.index[i];
        // Decoding happens outside the write lock. It is deterministic, so
        // if another thread races us here, both produce equal values and
        // whichever insert wins is correct.
        let block = &self.data[entry.start..entry.end];
        let table = match zpak::decode_block(entry.id.clone(), block) {
            Ok(table) => table,
            Err(e) => {
                warn!(
                    "failed to decode time zone {id} from database: {e}",
                    id = entry.id,
                );
                return Err(e).with_context(|| {
                    err!(
                        "failed to load time zone {id} from database",
                        id = entry.id,
                    )
                });
            }
        };
        let tz = TimeZone::from_table(table);
        let mut zones = self.zones.write().unwrap();
        match zones
            .binary_search_by(|z| cmp_ignore_ascii_case(&z.lower, query))
        {
            // Another thread finished first. Use its value.
            Ok(i) => Ok(zones[i].tz.clone()),
            Err(i) => {
                debug!("cached time zone {id}", id = entry.id);
                zones.insert(
                    i,
                    CachedZone { lower: entry.lower.clone(), tz: tz.clone() },
                );
                Ok(tz)
            }
        }
    }

    /// Returns an iterator over all zone IDs in this database, in
    /// lexicographic order of their lowercased form.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.iter().map(|entry| &*entry.id)
    }

    /// Returns the number of zones in this database.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true when this database contains no zones at all.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl core::fmt::Debug for TimeZoneDatabase {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("TimeZoneDatabase")
            .field("zones", &self.index.len())
            .finish()
    }
}

/// Like std's `eq_ignore_ascii_case`, but returns a full `Ordering`.
fn cmp_ignore_ascii_case(s1: &str, s2: &str) -> core::cmp::Ordering {
    let it1 = s1.as_bytes().iter().map(|&b| b.to_ascii_lowercase());
    let it2 = s2.as_bytes().iter().map(|&b| b.to_ascii_lowercase());
    it1.cmp(it2)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use crate::tz::{testdata, zpak::encode_database};

    use super::*;

    fn sample_db() -> TimeZoneDatabase {
        let _ = env_logger::try_init();
        let tables = [
            testdata::new_york(),
            testdata::gap_1970(),
            testdata::fold_1970(),
        ];
        TimeZoneDatabase::from_bytes(&encode_database(tables.iter())).unwrap()
    }

    /// DEBUG COMMAND
    ///
    /// Takes environment variable `ZONELINE_DEBUG_ZPAK_PATH` as input,
    /// treats the value as the path to a zone database blob, opens it and
    /// prints the ID of every zone it contains (one per line).
    ///
    /// Callers may also set `RUST_LOG` to get extra debugging output.
    #[test]
    fn debug_zpak() -> anyhow::Result<()> {
        use alloc::string::ToString;

        use anyhow::Context;

        let _ = env_logger::try_init();

        const ENV: &str = "ZONELINE_DEBUG_ZPAK_PATH";
        let Some(val) = std::env::var_os(ENV) else { return Ok(()) };
        let path = std::path::PathBuf::from(val);
        let bytes = std::fs::read(&path)
            .with_context(|| path.display().to_string())?;
        let db = TimeZoneDatabase::from_bytes(&bytes)?;
        for id in db.ids() {
            std::eprintln!("{id}");
        }
        Ok(())
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let db = sample_db();
        for query in
            ["America/New_York", "america/new_york", "AMERICA/NEW_YORK"]
        {
            let tz = db.get(query).unwrap();
            assert_eq!(tz.id(), "America/New_York", "query {query}");
        }
    }

    #[test]
    fn unknown_zone_is_distinguishable() {
        let db = sample_db();
        let err = db.get("Nope/Nowhere").unwrap_err();
        assert!(err.is_unknown_zone());
        assert!(!err.is_invalid_zone_data());
    }

    #[test]
    fn repeated_lookups_return_equal_zones() {
        let db = sample_db();
        let tz1 = db.get("Test/Gap1970").unwrap();
        let tz2 = db.get("Test/Gap1970").unwrap();
        assert_eq!(tz1, tz2);
    }

    #[test]
    fn lookups_agree_across_database_instances() {
        let db1 = sample_db();
        let db2 = sample_db();
        assert_eq!(
            db1.get("America/New_York").unwrap(),
            db2.get("America/New_York").unwrap(),
        );
    }

    #[test]
    fn ids_are_sorted_and_complete() {
        let db = sample_db();
        let ids: Vec<&str> = db.ids().collect();
        assert_eq!(
            ids,
            vec!["America/New_York", "Test/Fold1970", "Test/Gap1970"],
        );
        assert_eq!(db.len(), 3);
        assert!(!db.is_empty());
    }

    #[test]
    fn empty_database_works() {
        let no_tables: [&crate::tz::ZoneTable; 0] = [];
        let db = TimeZoneDatabase::from_bytes(&encode_database(no_tables))
            .unwrap();
        assert!(db.is_empty());
        assert!(db.get("UTC").unwrap_err().is_unknown_zone());
    }

    #[test]
    fn corrupt_zone_block_reports_invalid_data() {
        // Corrupt one zone's block in an otherwise valid container. The
        // container index still parses; the corruption surfaces on lookup
        // as invalid data, not as an unknown zone.
        let table = testdata::gap_1970();
        let good = encode_database([&table]);
        let db = TimeZoneDatabase::from_bytes(&good).unwrap();
        let entry_start = {
            // Find the block range by re-parsing the index.
            let index = crate::tz::zpak::parse_index(&good).unwrap();
            index[0].start
        };
        let mut corrupt = good.clone();
        // Stomp the block's first byte (the name pool count) with a count
        // that overruns the block.
        corrupt[entry_start] = 0x7F;
        let db_corrupt = TimeZoneDatabase::from_bytes(&corrupt).unwrap();
        assert!(db.get("Test/Gap1970").is_ok());
        let err = db_corrupt.get("Test/Gap1970").unwrap_err();
        assert!(err.is_invalid_zone_data());
        assert!(!err.is_unknown_zone());
    }

    #[test]
    fn concurrent_lookups_return_equal_zones() {
        use std::sync::Arc;

        let db = Arc::new(sample_db());
        let mut handles = vec![];
        for _ in 0..4 {
            let db = Arc::clone(&db);
            handles.push(std::thread::spawn(move || {
                db.get("America/New_York").unwrap()
            }));
        }
        let zones: Vec<_> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for window in zones.windows(2) {
            assert_eq!(window[0], window[1]);
        }
    }
}
