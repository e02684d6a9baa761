//! Condition interpretations read from an annotation VCF.
//!
//! Some annotation records are indexed without their conditions. The
//! submitting source publishes them as a VCF whose INFO column carries
//! `CONDITIONS=<entry>|<entry>|...`, each entry `:`-separated with the
//! classification in the third field. The file is indexed once per registry
//! load, keyed by the VCF ID column.

use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use togovar_format::{ConditionEnricher, ConditionInterpretation, ConditionLookup};

use crate::{Error, Result};

const CONDITIONS_KEY: &str = "CONDITIONS=";
const ID_COLUMN: usize = 2;
const INFO_COLUMN: usize = 7;

#[derive(Debug, Clone, Default)]
pub struct VcfConditionIndex {
    entries: HashMap<String, Vec<ConditionInterpretation>>,
}

impl VcfConditionIndex {
    /// Open a plain or gzip/bgzip compressed VCF.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Registry(format!("Failed to open {}: {e}", path.display())))?;
        let reader: Box<dyn Read> = if path.extension() == Some(OsStr::new("gz")) {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Self::from_reader(BufReader::new(reader))
            .map_err(|e| Error::Registry(format!("Failed to read {}: {e}", path.display())))
    }

    pub fn from_reader(reader: impl BufRead) -> std::io::Result<Self> {
        let mut entries: HashMap<String, Vec<ConditionInterpretation>> = HashMap::new();

        for line in reader.lines() {
            let line = line?;
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').collect();
            let (Some(ids), Some(info)) = (columns.get(ID_COLUMN), columns.get(INFO_COLUMN))
            else {
                continue;
            };
            let Some(conditions) = parse_conditions(info) else {
                continue;
            };

            for id in ids.split(';').filter(|id| !id.is_empty() && *id != ".") {
                // The first line naming an accession wins.
                entries
                    .entry(id.to_string())
                    .or_insert_with(|| conditions.clone());
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConditionEnricher for VcfConditionIndex {
    fn lookup(&self, accession: &str) -> ConditionLookup {
        match self.entries.get(accession) {
            Some(found) => ConditionLookup::Found(found.clone()),
            None => ConditionLookup::NotFound,
        }
    }
}

/// `None` when the INFO column has no `CONDITIONS` key.
fn parse_conditions(info: &str) -> Option<Vec<ConditionInterpretation>> {
    let value = info
        .split(';')
        .find_map(|field| field.strip_prefix(CONDITIONS_KEY))?;

    Some(
        value
            .split('|')
            .filter_map(|entry| {
                let classification = entry.split(':').nth(2).map(str::trim)?;
                if classification.is_empty() {
                    return None;
                }
                Some(ConditionInterpretation {
                    classification: vec![normalize(classification)],
                })
            })
            .collect(),
    )
}

/// `"Likely pathogenic, low penetrance"` → `likely_pathogenic_low_penetrance`.
fn normalize(classification: &str) -> String {
    classification
        .to_lowercase()
        .replace(',', "")
        .replace(' ', "_")
}
