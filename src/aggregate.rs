//! Chart-ready views of the fixation dataset
//!
//! Each function here is a pure query over an immutable [`Dataset`]; the
//! only outside input is the existence check on stimulus images.

use crate::config::Config;
use crate::loader::{Condition, Dataset, FixationRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Characters cut from the front of a stimulus name for its display label
pub const LABEL_PREFIX_LEN: usize = 3;
/// Characters cut from the end of a stimulus name for its display label
pub const LABEL_SUFFIX_LEN: usize = 7;

/// A single point on a fixation path
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FixationPoint {
    pub x: f64,
    pub y: f64,
    pub duration: f64,
    pub marker_size: f64,
}

/// What to draw for a (user, map) selection
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixationPath {
    /// The stimulus image with the fixation sequence drawn over it
    Overlay {
        map: String,
        image: PathBuf,
        points: Vec<FixationPoint>,
    },
    /// Missing image or no fixations; only the error image is shown
    Placeholder { image: PathBuf },
}

impl FixationPath {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, FixationPath::Placeholder { .. })
    }

    pub fn image(&self) -> &Path {
        match self {
            FixationPath::Overlay { image, .. } | FixationPath::Placeholder { image } => image,
        }
    }
}

/// Mean looking time per stimulus for one user, per condition
///
/// Color and gray series carry their own labels. Gray entries are ordered to
/// follow the color stimulus they correspond to, so a bar chart keyed on the
/// labels lines the two conditions up by stimulus rather than by position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserAverage {
    pub user: String,
    pub labels: Vec<String>,
    pub color: Vec<f64>,
    pub gray_labels: Vec<String>,
    pub gray: Vec<f64>,
}

/// Mean looking time per user on one stimulus
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapAverage {
    pub map: String,
    /// Users in the order they first appear in the dataset
    pub labels: Vec<String>,
    pub means: Vec<f64>,
}

/// Build the fixation path of `user` on `map`
///
/// Falls back to the placeholder image when the stimulus image does not
/// exist or when the user has no fixations on that map.
///
/// # Examples
/// ```
/// use eyetrack_dashboard::aggregate::fixation_path;
/// use eyetrack_dashboard::config::Config;
/// use eyetrack_dashboard::loader::Dataset;
///
/// let data = Dataset::from_records(Vec::new());
/// let path = fixation_path(&data, &Config::default(), "u1", "01_Antwerpen_S1.jpg");
/// assert!(path.is_placeholder());
/// ```
pub fn fixation_path(dataset: &Dataset, config: &Config, user: &str, map: &str) -> FixationPath {
    let rows: Vec<&FixationRecord> = dataset.fixations(user, map).collect();

    let image = stimulus_path(&config.stimuli_dir, map);
    match image {
        Some(image) if image.is_file() && !rows.is_empty() => FixationPath::Overlay {
            map: map.to_string(),
            image,
            points: rows
                .iter()
                .map(|r| FixationPoint {
                    x: r.x,
                    y: r.y,
                    duration: r.duration,
                    marker_size: r.duration / config.marker_scale,
                })
                .collect(),
        },
        _ => {
            log::debug!(
                "No fixation path for {} on {} ({} rows), using placeholder",
                user,
                map,
                rows.len()
            );
            FixationPath::Placeholder {
                image: config.error_image.clone(),
            }
        }
    }
}

/// Image file for a stimulus; names that are not a plain file name are refused
fn stimulus_path(stimuli_dir: &Path, map: &str) -> Option<PathBuf> {
    let name = Path::new(map).file_name()?;
    if name != map {
        return None;
    }
    Some(stimuli_dir.join(name))
}

/// Average fixation duration of `user` per stimulus, color and gray
pub fn user_average(dataset: &Dataset, user: &str) -> UserAverage {
    let rows: Vec<&FixationRecord> = dataset.records.iter().filter(|r| r.user == user).collect();

    let color = mean_by_stimulus(&rows, Condition::Color);
    let gray = mean_by_stimulus(&rows, Condition::Gray);

    let labels: Vec<String> = color.keys().map(|name| short_label(name)).collect();
    let color_keys: HashMap<&str, usize> = color
        .keys()
        .enumerate()
        .map(|(i, name)| (stimulus_key(name), i))
        .collect();

    // matched gray stimuli first, in color order; the rest keep lexical order
    let mut gray_entries: Vec<(usize, String, f64)> = gray
        .iter()
        .map(|(name, mean)| match color_keys.get(stimulus_key(name)) {
            Some(&i) => (i, labels[i].clone(), *mean),
            None => (usize::MAX, short_label(name), *mean),
        })
        .collect();
    gray_entries.sort_by_key(|(i, _, _)| *i);

    UserAverage {
        user: user.to_string(),
        labels,
        color: color.into_values().collect(),
        gray_labels: gray_entries.iter().map(|(_, l, _)| l.clone()).collect(),
        gray: gray_entries.into_iter().map(|(_, _, m)| m).collect(),
    }
}

/// Average fixation duration per user on `map`
pub fn map_average(dataset: &Dataset, map: &str) -> MapAverage {
    let mut labels: Vec<String> = Vec::new();
    let mut sums: Vec<(f64, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for r in dataset.records.iter().filter(|r| r.stimuli_name == map) {
        let i = *index.entry(r.user.as_str()).or_insert_with(|| {
            labels.push(r.user.clone());
            sums.push((0.0, 0));
            labels.len() - 1
        });
        sums[i].0 += r.duration;
        sums[i].1 += 1;
    }

    MapAverage {
        map: map.to_string(),
        labels,
        means: sums.into_iter().map(|(s, n)| s / n as f64).collect(),
    }
}

fn mean_by_stimulus(rows: &[&FixationRecord], condition: Condition) -> BTreeMap<String, f64> {
    let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.description == condition) {
        let entry = groups.entry(r.stimuli_name.clone()).or_insert((0.0, 0));
        entry.0 += r.duration;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(name, (sum, n))| (name, sum / n as f64))
        .collect()
}

/// Display label for a stimulus file name
///
/// Drops the three character index prefix and the seven character
/// `_S1.jpg` style suffix: `"01_Antwerpen_S1.jpg"` -> `"Antwerpen"`.
/// Names too short to strip give an empty label.
pub fn short_label(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let end = chars.len().saturating_sub(LABEL_SUFFIX_LEN);
    if end <= LABEL_PREFIX_LEN {
        return String::new();
    }
    chars[LABEL_PREFIX_LEN..end].iter().collect()
}

/// Stimulus identity shared by color and gray variants
///
/// Variants differ only in the index token before the first underscore
/// (`01_` vs `01b_`), so everything after it identifies the stimulus.
fn stimulus_key(name: &str) -> &str {
    name.split_once('_').map_or(name, |(_, rest)| rest)
}
