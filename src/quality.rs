//! Video quality estimation.
//!
//! Hosts that sort media by resolution parse each file, read the height from its metadata and
//! map it to a coarse [`Quality`]. When a file cannot be parsed the file name is the only hint
//! left, see [`assume_quality`].
//!
//! ```rust,no_run
//! use fieldscope::{quality::probe_all, ParserConfig};
//! use std::path::PathBuf;
//!
//! let paths = vec![PathBuf::from("episode.mkv"), PathBuf::from("font.ttf")];
//! for (path, quality) in probe_all(&paths, ParserConfig::minimal()) {
//!     println!("{}: {quality}", path.display());
//! }
//! ```

use std::path::{Path, PathBuf};

use log::{debug, warn};
use rayon::prelude::*;
use strum::{Display, EnumIter};

use crate::{config::ParserConfig, Parser};

/// Coarse video quality classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Quality {
    /// Nothing could be determined
    #[strum(serialize = "Unknown")]
    Unknown,
    /// Standard definition
    #[strum(serialize = "SD TV")]
    SdTv,
    /// 720p
    #[strum(serialize = "HD TV")]
    HdTv,
    /// 1080p
    #[strum(serialize = "Full HD TV")]
    FullHdTv,
    /// Raw broadcast capture
    #[strum(serialize = "Raw HD TV")]
    RawHdTv,
}

/// `value` lowered by `percent` percent, rounded to the nearest integer
fn tolerance(value: i64, percent: i64) -> i64 {
    let value = value as f64;
    (value - value * percent as f64 / 100.0).round() as i64
}

/// Map a frame height in pixels to a quality class.
///
/// ```rust
/// use fieldscope::quality::{quality_from_height, Quality};
///
/// assert_eq!(quality_from_height(576), Quality::SdTv);
/// assert_eq!(quality_from_height(1080), Quality::FullHdTv);
/// ```
pub fn quality_from_height(height: i64) -> Quality {
    if height < tolerance(352, 5) {
        Quality::Unknown
    } else if height <= tolerance(720, 2) {
        Quality::SdTv
    } else if height >= tolerance(1080, 1) {
        Quality::FullHdTv
    } else {
        Quality::HdTv
    }
}

/// Parse `path` and classify the height found in its metadata.
///
/// Any failure, from an unreadable file to a document without a height, yields
/// [`Quality::Unknown`].
pub fn file_quality(path: &Path, config: ParserConfig) -> Quality {
    let parser = match Parser::from_file(path, config) {
        Ok(parser) => parser,
        Err(e) => {
            debug!("Cannot parse {}: {e}", path.display());
            return Quality::Unknown;
        }
    };
    if let Err(reason) = parser.validate() {
        warn!("{} is not valid: {reason}", path.display());
        return Quality::Unknown;
    }

    match parser.metadata().height() {
        Some(height) => quality_from_height(height),
        None => {
            debug!("No height in the metadata of {}", path.display());
            Quality::Unknown
        }
    }
}

/// Guess the quality from the file extension alone.
///
/// ```rust
/// use fieldscope::quality::{assume_quality, Quality};
///
/// assert_eq!(assume_quality("show.s01e01.MKV"), Quality::SdTv);
/// assert_eq!(assume_quality("capture.ts"), Quality::RawHdTv);
/// assert_eq!(assume_quality("notes.txt"), Quality::Unknown);
/// ```
pub fn assume_quality(name: &str) -> Quality {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("avi" | "mp4" | "mkv") => Quality::SdTv,
        Some("ts") => Quality::RawHdTv,
        _ => Quality::Unknown,
    }
}

/// [`file_quality`], falling back to [`assume_quality`] on the file name.
pub fn probe_quality(path: &Path, config: ParserConfig) -> Quality {
    match file_quality(path, config) {
        Quality::Unknown => {
            let name = path.file_name().and_then(|name| name.to_str()).unwrap_or("");
            assume_quality(name)
        }
        quality => quality,
    }
}

/// Probe many files in parallel, one parser per file. Results keep the order of `paths`.
pub fn probe_all<P>(paths: &[P], config: ParserConfig) -> Vec<(PathBuf, Quality)>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            (path.to_path_buf(), probe_quality(path, config))
        })
        .collect()
}
