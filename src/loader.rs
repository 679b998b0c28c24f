use encoding_rs::WINDOWS_1252;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Column names the dashboard reads from the dataset
pub const COL_USER: &str = "user";
pub const COL_STIMULI: &str = "StimuliName";
pub const COL_DESCRIPTION: &str = "description";
pub const COL_X: &str = "MappedFixationPointX";
pub const COL_Y: &str = "MappedFixationPointY";
pub const COL_DURATION: &str = "FixationDuration";

const REQUIRED_COLUMNS: [&str; 6] = [
    COL_USER,
    COL_STIMULI,
    COL_DESCRIPTION,
    COL_X,
    COL_Y,
    COL_DURATION,
];

/// Errors that stop the dataset from loading
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("line {line}: unknown condition `{value}` (expected `color` or `gray`)")]
    InvalidCondition { line: usize, value: String },

    #[error("line {line}: `{column}` is not a number: `{value}`")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("dataset contains no fixation records")]
    Empty,
}

/// Presentation condition of a stimulus
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Color,
    Gray,
}

impl Condition {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "color" => Some(Condition::Color),
            "gray" => Some(Condition::Gray),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Color => "color",
            Condition::Gray => "gray",
        }
    }
}

/// One fixation: where a participant looked on a stimulus, and for how long
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FixationRecord {
    /// Participant identifier, `u` followed by a number
    pub user: String,

    /// Stimulus image file name
    pub stimuli_name: String,

    /// Color or grayscale presentation
    pub description: Condition,

    /// Horizontal pixel coordinate on the stimulus image
    pub x: f64,

    /// Vertical pixel coordinate on the stimulus image
    pub y: f64,

    /// Fixation duration in milliseconds
    pub duration: f64,
}

/// The fixation dataset, loaded once and never modified
///
/// Besides the typed records, the raw cells of every column are kept so the
/// dataset table can show passthrough columns verbatim.
#[derive(Clone, Debug)]
pub struct Dataset {
    /// Header names in file order
    pub columns: Vec<String>,

    /// Raw cell text per row, aligned with `columns`
    pub rows: Vec<Vec<String>>,

    /// Typed records in file order
    pub records: Vec<FixationRecord>,

    /// Distinct users, ordered by their numeric suffix
    pub users: Vec<String>,

    /// Distinct stimulus names in lexical order
    pub maps: Vec<String>,
}

impl Dataset {
    /// Load the dataset from a Windows-1252 encoded, tab-delimited file
    ///
    /// # Arguments
    /// * `path` - Location of the CSV file
    ///
    /// # Returns
    /// * `Result<Dataset, LoadError>` - The loaded dataset or the reason it could not be read
    ///
    /// # Examples
    /// ```no_run
    /// use eyetrack_dashboard::loader::Dataset;
    ///
    /// match Dataset::load("data/all_fixation_data_cleaned_up.csv") {
    ///     Ok(data) => println!("{} fixations from {} users", data.records.len(), data.users.len()),
    ///     Err(e) => eprintln!("Error loading dataset: {}", e),
    /// }
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let (text, _, had_errors) = WINDOWS_1252.decode(&bytes);
        if had_errors {
            log::warn!("{}: some bytes could not be decoded", path.display());
        }

        let dataset = Self::from_tsv(&text)?;
        log::info!(
            "Loaded {} fixations from {} ({} users, {} maps)",
            dataset.records.len(),
            path.display(),
            dataset.users.len(),
            dataset.maps.len()
        );
        Ok(dataset)
    }

    /// Parse already decoded tab-delimited text with a header row
    pub fn from_tsv(text: &str) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut index = [0usize; 6];
        for (slot, name) in index.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = columns
                .iter()
                .position(|c| c.trim() == name)
                .ok_or(LoadError::MissingColumn(name))?;
        }
        let [i_user, i_stimuli, i_description, i_x, i_y, i_duration] = index;

        let mut rows = Vec::new();
        let mut records = Vec::new();

        for (n, result) in reader.records().enumerate() {
            let record = result?;
            // header is line 1
            let line = n + 2;
            let cell = |i: usize| record.get(i).unwrap_or("");

            let description = Condition::parse(cell(i_description)).ok_or_else(|| {
                LoadError::InvalidCondition {
                    line,
                    value: cell(i_description).to_string(),
                }
            })?;

            records.push(FixationRecord {
                user: cell(i_user).to_string(),
                stimuli_name: cell(i_stimuli).to_string(),
                description,
                x: parse_number(cell(i_x), COL_X, line)?,
                y: parse_number(cell(i_y), COL_Y, line)?,
                duration: parse_number(cell(i_duration), COL_DURATION, line)?,
            });
            rows.push(record.iter().map(str::to_string).collect());
        }

        if records.is_empty() {
            return Err(LoadError::Empty);
        }

        let mut dataset = Self::from_records(records);
        dataset.columns = columns;
        dataset.rows = rows;
        Ok(dataset)
    }

    /// Build a dataset from typed records
    ///
    /// The raw table is synthesised from the records using the six
    /// dashboard columns.
    pub fn from_records(records: Vec<FixationRecord>) -> Self {
        let columns = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = records
            .iter()
            .map(|r| {
                vec![
                    r.user.clone(),
                    r.stimuli_name.clone(),
                    r.description.as_str().to_string(),
                    r.x.to_string(),
                    r.y.to_string(),
                    r.duration.to_string(),
                ]
            })
            .collect();

        let users = distinct_users(&records);
        let maps = records
            .iter()
            .map(|r| r.stimuli_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Dataset {
            columns,
            rows,
            records,
            users,
            maps,
        }
    }

    /// Fixations of one user on one stimulus, in file order
    pub fn fixations<'a>(
        &'a self,
        user: &'a str,
        map: &'a str,
    ) -> impl Iterator<Item = &'a FixationRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.user == user && r.stimuli_name == map)
    }
    /// Raw table rows containing `filter` in any cell, ignoring case
    ///
    /// An empty filter keeps every row.
    pub fn table_rows(&self, filter: &str) -> Vec<&[String]> {
        let needle = filter.trim().to_lowercase();
        self.rows
            .iter()
            .filter(|row| {
                needle.is_empty() || row.iter().any(|cell| cell.to_lowercase().contains(&needle))
            })
            .map(Vec::as_slice)
            .collect()
    }
}

fn parse_number(value: &str, column: &'static str, line: usize) -> Result<f64, LoadError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| LoadError::InvalidNumber {
            line,
            column,
            value: value.to_string(),
        })
}

fn distinct_users(records: &[FixationRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut users: Vec<String> = records
        .iter()
        .filter(|r| seen.insert(r.user.as_str()))
        .map(|r| r.user.clone())
        .collect();
    sort_users(&mut users);
    users
}

/// Numeric part of a user identifier (`"u12"` -> `12.0`)
///
/// The first character is dropped and the remainder parsed as a number.
pub fn user_sort_key(user: &str) -> Option<f64> {
    let mut chars = user.chars();
    chars.next()?;
    chars.as_str().parse::<f64>().ok()
}

/// Sort user identifiers by their numeric suffix, so `u2` comes before `u10`
///
/// Identifiers without a numeric suffix go last, in lexical order.
pub fn sort_users(users: &mut [String]) {
    users.sort_by(|a, b| match (user_sort_key(a), user_sort_key(b)) {
        (Some(ka), Some(kb)) => ka
            .partial_cmp(&kb)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
}
