//! Differential protein abundance between two experimental conditions,
//! computed from replicate label-free quantification data.
//!
//! This library's API is based around several types that form
//! a data analysis pipeline.
//!
//! Each quantified replicate is a [`Replicate`], mapping protein names to a
//! [`Measurement`] of both quantification channels. The replicates of one
//! condition are merged into a [`Condition`], where every protein carries a
//! [`Profile`] with one slot per replicate.
//!
//! ```rust,ignore
//! # use diffquant::*;
//! let control = Condition::from_replicates(vec![ctl1, ctl2, ctl3])?;
//! let treatment = Condition::from_replicates(vec![trt1, trt2, trt3])?;
//! ```
//!
//! Proteins that were not quantified in every replicate have absent slots,
//! which are filled by one of the [`Imputation`] strategies. Random jitter
//! is drawn from a caller-supplied RNG, so a seeded RNG reproduces a run.
//!
//! ```rust,ignore
//! # use diffquant::*;
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let excluded = Imputation::Minimum.impute(&mut control, &mut rng);
//! ```
//!
//! Imputed conditions are compared protein-by-protein with Welch's t-test,
//! and the resulting [`TestResult`]s are filtered by a Benjamini-Hochberg
//! p-value cutoff and a minimum fold change into a [`Selection`]
//!
//! ```rust,ignore
//! # use diffquant::*;
//! let tested = differential(&control, &treatment, Channel::SIn, Scale::Linear, &mut rng);
//! let selection = select(&tested.results, 0.01, 1.0);
//! for protein in selection.upregulated() {
//!     println!("{}\t{}", protein.accession, protein.log2_fold);
//! }
//! ```
//!
//! [`Parameters::run`] strings all of the above together.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;

mod condition;
mod differential;
mod error;
mod fdr;
mod impute;
mod pipeline;
mod profile;
pub mod stats;

pub use condition::Condition;
pub use differential::{
    differential, Scale, TestResult, Tested, UNIQUE_LOG2_FOLD, UNIQUE_P_VALUE, VARIANCE_JITTER,
};
pub use error::Error;
pub use fdr::{select, Selected, Selection};
pub use impute::{Imputation, IMPUTE_JITTER};
pub use pipeline::{load_replicates, Input, Parameters, Report};
pub use profile::Profile;

/// One of the two quantification channels reported for every protein
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    /// Normalized spectral index
    SIn,
    /// Normalized spectral abundance factor
    Nsaf,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::SIn, Channel::Nsaf];
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sin" | "si" => Ok(Channel::SIn),
            "nsaf" => Ok(Channel::Nsaf),
            _ => Err(Error::Configuration(format!(
                "unrecognized quantification channel `{}` (expected `SIn` or `NSAF`)",
                s
            ))),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::SIn => f.write_str("SIn"),
            Channel::Nsaf => f.write_str("NSAF"),
        }
    }
}

/// Values of both quantification channels for one protein in one replicate
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub sin: f64,
    pub nsaf: f64,
}

impl Measurement {
    pub fn new(sin: f64, nsaf: f64) -> Measurement {
        Measurement { sin, nsaf }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::SIn => self.sin,
            Channel::Nsaf => self.nsaf,
        }
    }
}

/// Quantification data from a single replicate run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Replicate {
    pub path: String,
    pub proteins: HashMap<String, Measurement>,
}

impl Replicate {
    pub fn new<S: Into<String>>(path: S, proteins: HashMap<String, Measurement>) -> Replicate {
        Replicate {
            path: path.into(),
            proteins,
        }
    }
}
