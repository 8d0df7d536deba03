use crate::chebyshev::evaluate_state;
use crate::daf::{DafArchive, DafSummary};
use crate::{naif, SpkError};
use ephem_core::constants::{J2000_JD, SECONDS_PER_DAY};
use std::path::Path;

fn jd_to_et(jd_tdb: f64) -> f64 {
    (jd_tdb - J2000_JD) * SECONDS_PER_DAY
}

/// A body state in km, km/s, km/s^2, ICRF axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct State {
    pub pos: [f64; 3],
    pub vel: [f64; 3],
    pub acc: [f64; 3],
}

impl State {
    fn accumulate(&mut self, other: &State) {
        for k in 0..3 {
            self.pos[k] += other.pos[k];
            self.vel[k] += other.vel[k];
            self.acc[k] += other.acc[k];
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpkSegment {
    pub target: i32,
    pub center: i32,
    pub frame: i32,
    pub data_type: i32,
    pub start_et: f64,
    pub end_et: f64,
    pub start_word: usize,
    pub end_word: usize,
}

impl SpkSegment {
    fn from_summary(summary: &DafSummary) -> Result<Self, SpkError> {
        if summary.doubles.len() < 2 || summary.ints.len() < 6 {
            return Err(SpkError::Data("incomplete SPK segment summary".into()));
        }
        Ok(Self {
            start_et: summary.doubles[0],
            end_et: summary.doubles[1],
            target: summary.ints[0],
            center: summary.ints[1],
            frame: summary.ints[2],
            data_type: summary.ints[3],
            start_word: summary.ints[4] as usize,
            end_word: summary.ints[5] as usize,
        })
    }

    pub fn covers(&self, jd_tdb: f64) -> bool {
        let et = jd_to_et(jd_tdb);
        et >= self.start_et && et <= self.end_et
    }
}

struct Type2Directory {
    init: f64,
    intlen: f64,
    rsize: usize,
    n_records: usize,
}

/// An SPK kernel restricted to the type-2 segments the DE and sb441
/// families use.
pub struct SpkFile {
    daf: DafArchive,
    segments: Vec<SpkSegment>,
}

impl SpkFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SpkError> {
        let daf = DafArchive::open(path)?;
        let mut segments = Vec::new();
        for summary in daf.summaries()? {
            let segment = SpkSegment::from_summary(&summary)?;
            if segment.data_type == 2 {
                segments.push(segment);
            }
        }
        log::debug!("loaded {} type-2 SPK segments", segments.len());
        Ok(Self { daf, segments })
    }

    pub fn segments(&self) -> &[SpkSegment] {
        &self.segments
    }

    /// Indices of segments centered on the given body, in file order.
    /// Small-body kernels are addressed positionally through this list.
    pub fn segments_centered_on(&self, center: i32) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.center == center)
            .map(|(i, _)| i)
            .collect()
    }

    fn find_segment(&self, target: i32, center: i32, jd_tdb: f64) -> Option<&SpkSegment> {
        self.segments
            .iter()
            .find(|s| s.target == target && s.center == center && s.covers(jd_tdb))
    }

    fn directory(&self, segment: &SpkSegment) -> Result<Type2Directory, SpkError> {
        let meta = self.daf.read_words(segment.end_word - 3, 4)?;
        Ok(Type2Directory {
            init: meta[0],
            intlen: meta[1],
            rsize: meta[2] as usize,
            n_records: meta[3] as usize,
        })
    }

    fn evaluate(&self, segment: &SpkSegment, jd_tdb: f64) -> Result<State, SpkError> {
        let dir = self.directory(segment)?;
        if dir.rsize < 5 || dir.n_records == 0 {
            return Err(SpkError::Data("malformed type-2 directory".into()));
        }
        let et = jd_to_et(jd_tdb);
        let record_index =
            (libm::floor((et - dir.init) / dir.intlen) as usize).min(dir.n_records - 1);
        let record = self
            .daf
            .read_words(segment.start_word + record_index * dir.rsize, dir.rsize)?;
        let mid = record[0];
        let radius = record[1];
        let n = (dir.rsize - 2) / 3;
        let t = (et - mid) / radius;
        let coeffs = &record[2..];
        let (pos, vel, acc) =
            evaluate_state(&coeffs[..n], &coeffs[n..2 * n], &coeffs[2 * n..3 * n], t, radius)?;
        Ok(State { pos, vel, acc })
    }

    /// State of `target` relative to `center` from a single segment.
    pub fn state(&self, target: i32, center: i32, jd_tdb: f64) -> Result<State, SpkError> {
        let segment =
            self.find_segment(target, center, jd_tdb)
                .ok_or(SpkError::SegmentNotFound {
                    target,
                    center,
                    epoch: jd_tdb,
                })?;
        self.evaluate(segment, jd_tdb)
    }

    /// State of the segment at `index` relative to its own center.
    pub fn segment_state(&self, index: usize, jd_tdb: f64) -> Result<State, SpkError> {
        let segment = self
            .segments
            .get(index)
            .ok_or_else(|| SpkError::Data(format!("segment index {} out of range", index)))?;
        if !segment.covers(jd_tdb) {
            return Err(SpkError::SegmentNotFound {
                target: segment.target,
                center: segment.center,
                epoch: jd_tdb,
            });
        }
        self.evaluate(segment, jd_tdb)
    }

    /// State of `target` relative to the solar-system barycenter, following
    /// the center chain (e.g. 399 -> 3 -> 0 for the Earth in DE440).
    pub fn state_to_ssb(&self, target: i32, jd_tdb: f64) -> Result<State, SpkError> {
        let mut total = State::default();
        let mut body = target;
        // DE kernels chain at most body -> barycenter -> SSB; the bound
        // guards against malformed files with center cycles.
        for _ in 0..8 {
            if body == naif::SOLAR_SYSTEM_BARYCENTER {
                return Ok(total);
            }
            let segment = self
                .segments
                .iter()
                .find(|s| s.target == body && s.covers(jd_tdb))
                .ok_or(SpkError::SegmentNotFound {
                    target: body,
                    center: naif::SOLAR_SYSTEM_BARYCENTER,
                    epoch: jd_tdb,
                })?;
            total.accumulate(&self.evaluate(segment, jd_tdb)?);
            body = segment.center;
        }
        Err(SpkError::Data(format!(
            "center chain from body {} does not reach the barycenter",
            target
        )))
    }
}
