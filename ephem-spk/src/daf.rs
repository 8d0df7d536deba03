use crate::SpkError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

const RECORD_BYTES: usize = 1024;
const FTPSTR: &[u8] = b"FTPSTR:\r:\n:\r\n:\r\x00:\x81:\x10\xce:ENDFTP";

/// A memory-mapped DAF (Double precision Array File) container.
///
/// DAF addresses are 1-based 8-byte words; summary records chain forward
/// from `first_summary_record` and each holds up to 25 packed summaries.
pub struct DafArchive {
    map: Mmap,
    little_endian: bool,
    nd: usize,
    ni: usize,
    first_summary_record: usize,
}

/// One descriptor record: `nd` doubles followed by `ni` packed i32s.
#[derive(Debug, Clone)]
pub struct DafSummary {
    pub doubles: Vec<f64>,
    pub ints: Vec<i32>,
}

impl DafArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SpkError> {
        let file = File::open(path.as_ref()).map_err(|e| SpkError::Io(e.to_string()))?;
        let map = unsafe { Mmap::map(&file).map_err(|e| SpkError::Io(e.to_string()))? };
        log::debug!(
            "mapped DAF {} ({} bytes)",
            path.as_ref().display(),
            map.len()
        );
        Self::from_map(map)
    }

    fn from_map(map: Mmap) -> Result<Self, SpkError> {
        if map.len() < RECORD_BYTES {
            return Err(SpkError::Format("file shorter than one DAF record".into()));
        }
        if !map[0..8].starts_with(b"DAF/") {
            return Err(SpkError::Format(format!(
                "bad DAF signature {:?}",
                String::from_utf8_lossy(&map[0..8])
            )));
        }
        // ND must land in 1..=100 under exactly one byte order.
        let nd_le = i32::from_le_bytes(map[8..12].try_into().unwrap());
        let nd_be = i32::from_be_bytes(map[8..12].try_into().unwrap());
        let little_endian = if (1..=100).contains(&nd_le) {
            true
        } else if (1..=100).contains(&nd_be) {
            false
        } else {
            return Err(SpkError::Format("cannot determine byte order".into()));
        };
        if map.len() >= 1000 && &map[699..727] != FTPSTR {
            return Err(SpkError::Format("FTP transfer corruption detected".into()));
        }

        let mut archive = Self {
            map,
            little_endian,
            nd: 0,
            ni: 0,
            first_summary_record: 0,
        };
        archive.nd = archive.read_i32(8) as usize;
        archive.ni = archive.read_i32(12) as usize;
        archive.first_summary_record = archive.read_i32(76) as usize;
        Ok(archive)
    }

    fn read_i32(&self, byte_offset: usize) -> i32 {
        let bytes: [u8; 4] = self.map[byte_offset..byte_offset + 4].try_into().unwrap();
        if self.little_endian {
            i32::from_le_bytes(bytes)
        } else {
            i32::from_be_bytes(bytes)
        }
    }

    fn read_f64(&self, byte_offset: usize) -> f64 {
        let bytes: [u8; 8] = self.map[byte_offset..byte_offset + 8].try_into().unwrap();
        if self.little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        }
    }

    /// Words per packed summary: `nd` doubles plus `ni` ints two-per-word.
    fn summary_words(&self) -> usize {
        self.nd + self.ni.div_ceil(2)
    }

    /// Reads `count` doubles starting at 1-based word address `start`.
    pub fn read_words(&self, start: usize, count: usize) -> Result<Vec<f64>, SpkError> {
        if start == 0 {
            return Err(SpkError::Data("word addresses are 1-based".into()));
        }
        let byte_start = (start - 1) * 8;
        let byte_end = byte_start + count * 8;
        if byte_end > self.map.len() {
            return Err(SpkError::Data("word range beyond end of file".into()));
        }
        Ok((0..count)
            .map(|i| self.read_f64(byte_start + i * 8))
            .collect())
    }

    /// Walks the summary-record chain and returns every summary in file order.
    pub fn summaries(&self) -> Result<Vec<DafSummary>, SpkError> {
        let mut out = Vec::new();
        let mut record = self.first_summary_record;
        let words = self.summary_words();
        while record != 0 {
            let base = (record - 1) * RECORD_BYTES;
            if base + RECORD_BYTES > self.map.len() {
                return Err(SpkError::Data(format!(
                    "summary record {} beyond end of file",
                    record
                )));
            }
            let next = self.read_f64(base) as usize;
            let count = self.read_f64(base + 16) as usize;
            for idx in 0..count {
                let offset = base + 24 + idx * words * 8;
                if offset + words * 8 > self.map.len() {
                    return Err(SpkError::Data("summary beyond end of file".into()));
                }
                out.push(self.parse_summary(offset));
            }
            record = next;
        }
        Ok(out)
    }

    fn parse_summary(&self, byte_offset: usize) -> DafSummary {
        let doubles = (0..self.nd)
            .map(|i| self.read_f64(byte_offset + i * 8))
            .collect();
        let int_base = byte_offset + self.nd * 8;
        let ints = (0..self.ni).map(|i| self.read_i32(int_base + i * 4)).collect();
        DafSummary { doubles, ints }
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use tempfile::TempDir;

    fn write_temp(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn rejects_short_file() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "short.bsp", b"tiny");
        match DafArchive::open(&path) {
            Err(SpkError::Format(msg)) => assert!(msg.contains("shorter")),
            other => panic!("expected Format error, got {:?}", other.err()),
        }
    }

    #[test]
    fn rejects_bad_signature() {
        let dir = TempDir::new().unwrap();
        let mut data = vec![0u8; RECORD_BYTES];
        data[0..8].copy_from_slice(b"NOTADAF!");
        let path = write_temp(&dir, "bad.bsp", &data);
        match DafArchive::open(&path) {
            Err(SpkError::Format(msg)) => assert!(msg.contains("signature")),
            other => panic!("expected Format error, got {:?}", other.err()),
        }
    }

    #[test]
    fn rejects_undetectable_byte_order() {
        let dir = TempDir::new().unwrap();
        let mut data = vec![0u8; RECORD_BYTES];
        data[0..8].copy_from_slice(b"DAF/SPK ");
        data[8..12].copy_from_slice(&[0xFF; 4]);
        data[699..727].copy_from_slice(FTPSTR);
        let path = write_temp(&dir, "endian.bsp", &data);
        match DafArchive::open(&path) {
            Err(SpkError::Format(msg)) => assert!(msg.contains("byte order")),
            other => panic!("expected Format error, got {:?}", other.err()),
        }
    }

    #[test]
    fn rejects_ftp_corruption() {
        let dir = TempDir::new().unwrap();
        let mut data = header(2, 6, 0);
        data[699..727].copy_from_slice(&[0u8; 28]);
        let path = write_temp(&dir, "ftp.bsp", &data);
        match DafArchive::open(&path) {
            Err(SpkError::Format(msg)) => assert!(msg.contains("FTP")),
            other => panic!("expected Format error, got {:?}", other.err()),
        }
    }

    #[test]
    fn opens_minimal_file_little_endian() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "ok.bsp", &header(2, 6, 0));
        let daf = DafArchive::open(&path).unwrap();
        assert_eq!(daf.nd, 2);
        assert_eq!(daf.ni, 6);
        assert!(daf.little_endian);
        assert!(daf.summaries().unwrap().is_empty());
    }

    #[test]
    fn opens_big_endian_file() {
        let dir = TempDir::new().unwrap();
        let mut data = vec![0u8; RECORD_BYTES];
        data[0..8].copy_from_slice(b"DAF/SPK ");
        data[8..12].copy_from_slice(&2i32.to_be_bytes());
        data[12..16].copy_from_slice(&6i32.to_be_bytes());
        data[76..80].copy_from_slice(&0i32.to_be_bytes());
        data[699..727].copy_from_slice(FTPSTR);
        let path = write_temp(&dir, "be.bsp", &data);
        let daf = DafArchive::open(&path).unwrap();
        assert!(!daf.little_endian);
    }

    #[test]
    fn missing_file_is_io_error() {
        match DafArchive::open("/nonexistent/kernel.bsp") {
            Err(SpkError::Io(_)) => {}
            other => panic!("expected Io error, got {:?}", other.err()),
        }
    }

    #[test]
    fn read_words_bounds_checked() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "ok.bsp", &header(2, 6, 0));
        let daf = DafArchive::open(&path).unwrap();
        assert!(daf.read_words(1, 10).is_ok());
        assert!(matches!(daf.read_words(1, 10_000), Err(SpkError::Data(_))));
        assert!(matches!(daf.read_words(0, 1), Err(SpkError::Data(_))));
    }

    #[test]
    fn read_words_roundtrips_values() {
        let dir = TempDir::new().unwrap();
        let mut data = header(2, 6, 0);
        // word 12 starts at byte 88, clear of the header fields
        for (i, v) in [1.5f64, -2.5, 3.25].iter().enumerate() {
            put_f64(&mut data, 88 + i * 8, *v);
        }
        let path = write_temp(&dir, "vals.bsp", &data);
        let daf = DafArchive::open(&path).unwrap();
        let words = daf.read_words(12, 3).unwrap();
        assert_eq!(words, vec![1.5, -2.5, 3.25]);
    }

    #[test]
    fn walks_summary_chain() {
        let dir = TempDir::new().unwrap();
        let mut data = header(2, 6, 2);

        // record 2 -> record 3, one summary each
        let mut rec2 = summary_record(3.0, 1.0);
        put_f64(&mut rec2, 24, 100.0);
        put_f64(&mut rec2, 32, 200.0);
        for i in 0..6 {
            put_i32(&mut rec2, 40 + i * 4, (i + 1) as i32);
        }
        let mut rec3 = summary_record(0.0, 1.0);
        put_f64(&mut rec3, 24, 300.0);
        put_f64(&mut rec3, 32, 400.0);
        for i in 0..6 {
            put_i32(&mut rec3, 40 + i * 4, (i + 10) as i32);
        }
        data.extend(rec2);
        data.extend(rec3);

        let path = write_temp(&dir, "chain.bsp", &data);
        let daf = DafArchive::open(&path).unwrap();
        let summaries = daf.summaries().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].doubles, vec![100.0, 200.0]);
        assert_eq!(summaries[0].ints, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(summaries[1].doubles, vec![300.0, 400.0]);
        assert_eq!(summaries[1].ints[0], 10);
    }

    #[test]
    fn truncated_summary_record_is_data_error() {
        let dir = TempDir::new().unwrap();
        // header points at record 10, which does not exist
        let path = write_temp(&dir, "trunc.bsp", &header(2, 6, 10));
        let daf = DafArchive::open(&path).unwrap();
        assert!(matches!(daf.summaries(), Err(SpkError::Data(_))));
    }
}
