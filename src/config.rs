use std::path::PathBuf;

/// Location of the fixation dataset relative to the working directory
pub const DATA_PATH: &str = "data/all_fixation_data_cleaned_up.csv";
/// Directory holding one image per stimulus, named after `StimuliName`
pub const STIMULI_DIR: &str = "data/stimuli";
/// Image shown when a fixation path cannot be drawn
pub const ERROR_IMAGE: &str = "data/error.png";
const BIND_ADDR: &str = "0.0.0.0:8050";

/// Runtime settings for the dashboard
///
/// Everything here is fixed at startup; the dashboard takes no command line
/// flags and reads no environment variables besides `RUST_LOG`.
#[derive(Clone, Debug)]
pub struct Config {
    /// Tab-delimited fixation dataset
    pub data_path: PathBuf,

    /// Directory containing the stimulus images
    pub stimuli_dir: PathBuf,

    /// Placeholder image for missing stimuli or empty selections
    pub error_image: PathBuf,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Fixation durations are divided by this to get the marker size
    pub marker_scale: f64,

    /// Width of rendered bar charts in pixels
    pub chart_width: u32,

    /// Height of rendered bar charts in pixels
    pub chart_height: u32,

    /// Rows per page on the dataset table
    pub table_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DATA_PATH),
            stimuli_dir: PathBuf::from(STIMULI_DIR),
            error_image: PathBuf::from(ERROR_IMAGE),
            bind_addr: BIND_ADDR.to_string(),
            marker_scale: 10.0,
            chart_width: 1000,
            chart_height: 600,
            table_page_size: 100,
        }
    }
}
