//! Drives the end-to-end flow: pick a target, build the oracles,
//! iterate regions, stop as soon as both keys are known.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::db_oracle::{DbKeyOracle, DbOracleError};
use crate::error::ExtractError;
use crate::image_oracle::ImageKeyOracle;
use crate::process::ProcessRecord;
use crate::region::chunk_region;
use crate::scanner::{CandidateKey, DedupSet, KeyScanner, RawCandidate};
use crate::MemoryBackend;

/// Informational counters for one extraction run — not persisted,
/// purely for the caller's logs/metrics.
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub regions_visited: u64,
    pub db_candidates_tried: u64,
    pub image_candidates_tried: u64,
}

/// Result of one [`Extractor::extract`] call.
#[derive(Debug, Default, Clone)]
pub struct ExtractionReport {
    pub db_key_hex: Option<String>,
    pub image_key_hex: Option<String>,
    pub stats: ScanStats,
    /// Why the db oracle couldn't be built, if it couldn't — the key
    /// scan still ran, it just had nothing to validate candidates
    /// against.
    pub db_oracle_issue: Option<ExtractError>,
    /// Why the image oracle couldn't be built, if it couldn't.
    pub image_oracle_issue: Option<ExtractError>,
}

/// Map a failed oracle build to the taxonomy the caller sees on the
/// report; a plaintext database is distinguished since it means there
/// is no key to find at all, not just nothing to validate one against.
fn db_oracle_issue(e: DbOracleError) -> ExtractError {
    match e {
        DbOracleError::PlaintextDatabase => ExtractError::PlaintextDatabase,
        DbOracleError::FileTooShort | DbOracleError::NotFound => ExtractError::OracleUnavailable("db"),
    }
}

/// Controller tying a [`MemoryBackend`] and a [`KeyScanner`] strategy
/// to the two oracles. Generic over the backend so the platform-
/// specific implementation lives entirely in the sibling backend crate.
pub struct Extractor<B: MemoryBackend> {
    backend: B,
    scanner: KeyScanner,
    config: ScanConfig,
}

impl<B: MemoryBackend> Extractor<B> {
    pub fn new(backend: B, scanner: KeyScanner, config: ScanConfig) -> Self {
        Self { backend, scanner, config }
    }

    /// Pick the first suitable record and try to recover both keys from
    /// its process memory.
    ///
    /// Oracle construction failures degrade gracefully — the scan still
    /// runs, recorded on the report as `db_oracle_issue`/
    /// `image_oracle_issue` — since either key alone can still be found
    /// and reported even if the other can't be validated. The one error
    /// that aborts the whole extraction is a failed `open_target`: with
    /// no handle there is nothing left to scan.
    pub fn extract(&self, records: &[ProcessRecord]) -> Result<ExtractionReport, ExtractError> {
        let Some(target) = ProcessRecord::pick_target(records) else {
            warn!("no process record to target");
            return Ok(ExtractionReport::default());
        };

        let mut report = ExtractionReport::default();

        let db_oracle = match target.data_dir.as_deref() {
            Some(dir) => match DbKeyOracle::from_data_dir(Path::new(dir), &self.config) {
                Ok(oracle) => Some(oracle),
                Err(e) => {
                    let issue = db_oracle_issue(e);
                    debug!(error = %issue, "db oracle unavailable");
                    report.db_oracle_issue = Some(issue);
                    None
                }
            },
            None => {
                report.db_oracle_issue = Some(ExtractError::OracleUnavailable("db"));
                None
            }
        };
        let image_oracle = target
            .data_dir
            .as_deref()
            .map(|dir| ImageKeyOracle::from_data_dir(Path::new(dir)))
            .unwrap_or_else(ImageKeyOracle::unavailable);
        if !image_oracle.is_available() {
            report.image_oracle_issue = Some(ExtractError::OracleUnavailable("image"));
        }

        let handle = match self.backend.open_target(target.pid) {
            Ok(h) => h,
            Err(e) => {
                warn!(pid = target.pid, error = %e, "failed to attach to target");
                return Err(ExtractError::from(e));
            }
        };

        self.scan_loop(&handle, db_oracle.as_ref(), &image_oracle, &mut report);
        self.backend.close_target(handle);

        info!(
            db_found = report.db_key_hex.is_some(),
            image_found = report.image_key_hex.is_some(),
            regions = report.stats.regions_visited,
            "extraction finished"
        );
        Ok(report)
    }

    fn scan_loop(
        &self,
        handle: &B::Handle,
        db_oracle: Option<&DbKeyOracle>,
        image_oracle: &ImageKeyOracle,
        report: &mut ExtractionReport,
    ) {
        let regions = match self.backend.enumerate_regions(handle) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "failed to enumerate regions");
                return;
            }
        };

        let mut db_dedup = DedupSet::new();
        let mut image_dedup = DedupSet::new();

        for region in regions {
            for chunk in chunk_region(region, &self.config) {
                if report.db_key_hex.is_some() && report.image_key_hex.is_some() {
                    return;
                }

                let block = match self.backend.read(handle, chunk.base, chunk.size) {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => continue,
                    Err(e) => {
                        debug!(base = chunk.base, error = %e, "region unreadable, skipping");
                        continue;
                    }
                };
                report.stats.regions_visited += 1;

                for raw in self.scanner.scan(&block) {
                    let candidate = match raw {
                        RawCandidate::Inline(key) => key,
                        RawCandidate::PointerFollowUp(ptr) => {
                            match self.backend.read(handle, ptr, 32) {
                                Ok(Some(bytes)) if bytes.len() == 32 => CandidateKey::new(bytes),
                                _ => continue,
                            }
                        }
                    };

                    self.try_db_candidate(db_oracle, &mut db_dedup, &candidate, report);
                    self.try_image_candidate(image_oracle, &mut image_dedup, &candidate, report);

                    if report.db_key_hex.is_some() && report.image_key_hex.is_some() {
                        return;
                    }
                }
            }
        }
    }

    fn try_db_candidate(
        &self,
        db_oracle: Option<&DbKeyOracle>,
        dedup: &mut DedupSet,
        candidate: &CandidateKey,
        report: &mut ExtractionReport,
    ) {
        if report.db_key_hex.is_some() || candidate.bytes().len() != 32 {
            return;
        }
        if !dedup.insert(candidate) {
            return;
        }
        report.stats.db_candidates_tried += 1;
        if let Some(oracle) = db_oracle {
            if oracle.validate(candidate.bytes()) {
                report.db_key_hex = Some(candidate.hex());
            }
        }
    }

    fn try_image_candidate(
        &self,
        image_oracle: &ImageKeyOracle,
        dedup: &mut DedupSet,
        candidate: &CandidateKey,
        report: &mut ExtractionReport,
    ) {
        if report.image_key_hex.is_some() || candidate.bytes().len() < 16 {
            return;
        }
        if !dedup.insert(candidate) {
            return;
        }
        report.stats.image_candidates_tried += 1;
        if image_oracle.validate(candidate.bytes()) {
            report.image_key_hex = Some(hex::encode(&candidate.bytes()[..16]));
        }
    }
}
