//! Course catalog store and flat-file table I/O.
//!
//! This crate provides:
//! - [`Catalog`] — the read-only course table, a title lookup, and the
//!   derived [`CompetencyIndex`]
//! - [`table`] — reading the verifier's URL column and writing its results

mod index;
pub mod table;

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use coursewise_shared::{COL_COMPETENCY, COL_TITLE, CourseRecord, CoursewiseError, Result};

pub use index::CompetencyIndex;
pub use table::{read_url_column, read_url_column_from, write_scrape_results};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The course table loaded at startup. Immutable after load.
#[derive(Debug, Clone)]
pub struct Catalog {
    headers: Vec<String>,
    records: Vec<CourseRecord>,
    /// Trimmed title → index into `records`. Later rows overwrite earlier ones.
    by_title: HashMap<String, usize>,
    competencies: CompetencyIndex,
}

impl Catalog {
    /// Load the catalog from a delimited file.
    ///
    /// A missing or malformed file is an error; there is no fallback catalog.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CoursewiseError::io(path, e))?;
        let catalog = Self::from_reader(file)?;
        info!(
            courses = catalog.len(),
            competencies = catalog.competencies.len(),
            "course catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse a catalog from any CSV source. Header names and cells are trimmed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| CoursewiseError::parse(format!("catalog header: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        for required in [COL_TITLE, COL_COMPETENCY] {
            if !headers.iter().any(|h| h == required) {
                return Err(CoursewiseError::Catalog(format!(
                    "missing required column `{required}`"
                )));
            }
        }

        let mut records = Vec::new();
        let mut by_title = HashMap::new();
        let mut competencies = CompetencyIndex::new();

        for (row, result) in reader.records().enumerate() {
            let row_data = result
                .map_err(|e| CoursewiseError::parse(format!("catalog row {}: {e}", row + 1)))?;

            let record = CourseRecord::from_pairs(
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), row_data.get(i).unwrap_or("").to_string())),
            );

            let title = record.title().to_string();
            if title.is_empty() {
                warn!(row = row + 1, "catalog row without a course title, skipping");
                continue;
            }

            if by_title.insert(title.clone(), records.len()).is_some() {
                debug!(%title, "duplicate course title, later row wins");
            }
            competencies.insert(record.competency(), &title);
            records.push(record);
        }

        Ok(Self {
            headers,
            records,
            by_title,
            competencies,
        })
    }

    /// Column names in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Every loaded row in file order (duplicates included).
    pub fn records(&self) -> &[CourseRecord] {
        &self.records
    }

    /// Look up a course by title (surrounding whitespace ignored).
    pub fn get(&self, title: &str) -> Option<&CourseRecord> {
        self.by_title
            .get(title.trim())
            .map(|idx| &self.records[*idx])
    }

    /// Resolve course names to records, skipping names not in the catalog.
    pub fn courses_named<'a, I>(&self, names: I) -> Vec<CourseRecord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                let found = self.get(name).cloned();
                if found.is_none() {
                    debug!(name, "course name not found in catalog");
                }
                found
            })
            .collect()
    }

    pub fn competencies(&self) -> &CompetencyIndex {
        &self.competencies
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
