use super::*;
use rand::Rng;

/// Imputed values are offset by up to this fraction of the value they are
/// based on, so that imputed slots never tie exactly
pub const IMPUTE_JITTER: f64 = 1e-3;

/// Strategy used to fill absent replicate slots
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Imputation {
    /// Fill with the mean of the values observed for the same protein
    Average,
    /// Fill with the smallest value observed for any protein in the same
    /// replicate
    Minimum,
}

impl FromStr for Imputation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" | "mean" => Ok(Imputation::Average),
            "minimum" | "min" | "minimum in replicate" => Ok(Imputation::Minimum),
            _ => Err(Error::Configuration(format!(
                "unrecognized imputation strategy `{}` (expected `average` or `minimum`)",
                s
            ))),
        }
    }
}

impl fmt::Display for Imputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imputation::Average => f.write_str("average"),
            Imputation::Minimum => f.write_str("minimum"),
        }
    }
}

impl Imputation {
    /// Fill every absent slot of `condition` in place.
    ///
    /// Profiles without absent slots are left untouched. Proteins that cannot
    /// be imputed are removed from `condition`, and returned as
    /// [`Error::Data`]
    pub fn impute<R: Rng + ?Sized>(&self, condition: &mut Condition, rng: &mut R) -> Vec<Error> {
        let excluded = match self {
            Imputation::Average => average(condition, rng),
            Imputation::Minimum => minimum(condition, rng),
        };

        for err in &excluded {
            log::warn!("{}", err);
            if let Some(acc) = err.accession() {
                condition.proteins.remove(acc);
            }
        }
        excluded
    }
}

#[inline]
fn jitter<R: Rng + ?Sized>(base: f64, rng: &mut R) -> f64 {
    base + rng.gen::<f64>() * IMPUTE_JITTER * base
}

fn average<R: Rng + ?Sized>(condition: &mut Condition, rng: &mut R) -> Vec<Error> {
    let mut excluded = Vec::new();
    let mut imputed = 0;

    for (acc, profile) in condition.proteins.iter_mut() {
        if profile.is_complete() {
            continue;
        }

        let means = Channel::ALL
            .iter()
            .map(|&c| {
                let present = profile.present(c);
                match present.is_empty() {
                    true => None,
                    false => Some(stats::mean(&present)),
                }
            })
            .collect::<Vec<_>>();

        if let Some(idx) = means.iter().position(Option::is_none) {
            excluded.push(Error::data(
                acc,
                format!("no {} values in any replicate", Channel::ALL[idx]),
            ));
            continue;
        }

        for (&channel, mean) in Channel::ALL.iter().zip(means.into_iter().flatten()) {
            for slot in profile.channel_mut(channel) {
                if slot.is_none() {
                    *slot = Some(jitter(mean, rng));
                    imputed += 1;
                }
            }
        }
    }

    log::debug!("imputed {} values from protein averages", imputed);
    excluded
}

/// Smallest observed value of each replicate slot, per channel
fn replicate_minima(condition: &Condition, channel: Channel) -> Vec<Option<f64>> {
    let mut minima = vec![None; condition.replicates.len()];
    for profile in condition.proteins.values() {
        for (min, value) in minima.iter_mut().zip(profile.channel(channel)) {
            if let Some(x) = *value {
                *min = Some(min.map_or(x, |m: f64| m.min(x)));
            }
        }
    }
    minima
}

fn minimum<R: Rng + ?Sized>(condition: &mut Condition, rng: &mut R) -> Vec<Error> {
    let minima = Channel::ALL
        .iter()
        .map(|&c| (c, replicate_minima(condition, c)))
        .collect::<Vec<_>>();

    let mut excluded = Vec::new();
    let mut imputed = 0;

    'outer: for (acc, profile) in condition.proteins.iter_mut() {
        if profile.is_complete() {
            continue;
        }

        for (channel, mins) in &minima {
            for (idx, slot) in profile.channel(*channel).iter().enumerate() {
                if slot.is_none() && mins.get(idx).copied().flatten().is_none() {
                    excluded.push(Error::data(
                        acc,
                        format!("no {} values quantified in replicate {}", channel, idx),
                    ));
                    continue 'outer;
                }
            }
        }

        for (channel, mins) in &minima {
            for (slot, min) in profile.channel_mut(*channel).iter_mut().zip(mins) {
                if slot.is_none() {
                    // Checked above
                    if let Some(min) = *min {
                        *slot = Some(jitter(min, rng));
                        imputed += 1;
                    }
                }
            }
        }
    }

    log::debug!("imputed {} values from replicate minima", imputed);
    excluded
}
