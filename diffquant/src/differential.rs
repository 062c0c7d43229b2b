use super::*;
use rand::Rng;

/// p-value assigned to proteins quantified in only one of the conditions
pub const UNIQUE_P_VALUE: f64 = 1e-16;
/// Magnitude of the log2 fold change assigned to proteins quantified in
/// only one of the conditions
pub const UNIQUE_LOG2_FOLD: f64 = 5.0;
/// Samples with zero variance are offset by up to this fraction of their
/// smallest value before testing
pub const VARIANCE_JITTER: f64 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct TestResult {
    pub p_value: f64,
    /// log2(treatment / control)
    pub log2_fold: f64,
}

impl TestResult {
    /// y-coordinate of a volcano plot
    pub fn neg_log10_p(&self) -> f64 {
        -self.p_value.log10()
    }
}

/// Scale of the quantification values being compared
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// Raw abundances; fold change is log2(mean(treatment) / mean(control))
    Linear,
    /// Already log2-transformed; fold change is mean(treatment) - mean(control)
    Log2,
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Linear
    }
}

impl FromStr for Scale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Scale::Linear),
            "log2" => Ok(Scale::Log2),
            _ => Err(Error::Configuration(format!(
                "unrecognized scale `{}` (expected `linear` or `log2`)",
                s
            ))),
        }
    }
}

impl Scale {
    pub fn log2_fold(&self, control: f64, treatment: f64) -> f64 {
        match self {
            Scale::Linear => treatment.log2() - control.log2(),
            Scale::Log2 => treatment - control,
        }
    }
}

/// Output of [`differential`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tested {
    pub results: BTreeMap<String, TestResult>,
    /// Proteins for which no [`TestResult`] could be computed
    pub failures: Vec<Error>,
}

/// Compare every protein of `control` and `treatment` with Welch's t-test
/// on the values of `channel`. Both conditions must already be imputed.
///
/// Proteins quantified in only one condition are not tested, and are
/// reported with [`UNIQUE_P_VALUE`] and a fold change of
/// +/-[`UNIQUE_LOG2_FOLD`]
pub fn differential<R: Rng + ?Sized>(
    control: &Condition,
    treatment: &Condition,
    channel: Channel,
    scale: Scale,
    rng: &mut R,
) -> Tested {
    let names = control
        .proteins
        .keys()
        .chain(treatment.proteins.keys())
        .collect::<BTreeSet<_>>();

    let mut tested = Tested::default();
    for name in names {
        let result = match (control.get(name), treatment.get(name)) {
            (Some(ctl), Some(trt)) => compare(name, ctl, trt, channel, scale, rng),
            (None, _) => Ok(TestResult {
                p_value: UNIQUE_P_VALUE,
                log2_fold: UNIQUE_LOG2_FOLD,
            }),
            (_, None) => Ok(TestResult {
                p_value: UNIQUE_P_VALUE,
                log2_fold: -UNIQUE_LOG2_FOLD,
            }),
        };

        match result {
            Ok(res) => {
                tested.results.insert(name.clone(), res);
            }
            Err(err) => {
                log::debug!("{}", err);
                tested.failures.push(err);
            }
        }
    }

    if !tested.failures.is_empty() {
        log::warn!(
            "{} proteins could not be tested on {}",
            tested.failures.len(),
            channel
        );
    }
    tested
}

fn compare<R: Rng + ?Sized>(
    name: &str,
    control: &Profile,
    treatment: &Profile,
    channel: Channel,
    scale: Scale,
    rng: &mut R,
) -> Result<TestResult, Error> {
    let mut ctl = control
        .values(channel)
        .ok_or_else(|| Error::numerical(name, "control has values that were not imputed"))?;
    let mut trt = treatment
        .values(channel)
        .ok_or_else(|| Error::numerical(name, "treatment has values that were not imputed"))?;

    // Fold change is taken before any jitter is added
    let log2_fold = scale.log2_fold(stats::mean(&ctl), stats::mean(&trt));
    if !log2_fold.is_finite() {
        return Err(Error::numerical(name, "fold change is not finite"));
    }

    if is_constant(&ctl) {
        perturb(&mut ctl, rng);
    }
    if is_constant(&trt) {
        perturb(&mut trt, rng);
    }

    let test = stats::welch(&trt, &ctl).map_err(|e| Error::numerical(name, e.to_string()))?;
    Ok(TestResult {
        p_value: test.p_value,
        log2_fold,
    })
}

#[inline]
fn is_constant(sample: &[f64]) -> bool {
    sample.windows(2).all(|w| w[0] == w[1])
}

/// Add independent jitter to every value of a zero-variance sample
fn perturb<R: Rng + ?Sized>(sample: &mut [f64], rng: &mut R) {
    let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
    for x in sample.iter_mut() {
        *x += rng.gen::<f64>() * VARIANCE_JITTER * min;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn condition(profiles: Vec<(&str, Vec<f64>)>) -> Condition {
        let n = profiles.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        Condition {
            proteins: profiles
                .into_iter()
                .map(|(acc, sin)| {
                    let sin = sin.into_iter().map(Some).collect::<Vec<_>>();
                    (
                        acc.to_string(),
                        Profile {
                            nsaf: sin.clone(),
                            sin,
                        },
                    )
                })
                .collect(),
            replicates: (0..n).map(|i| format!("rep{}", i)).collect(),
        }
    }

    #[test]
    fn unique_proteins() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let ctl = condition(vec![("A", vec![1.0, 2.0]), ("C", vec![1.0, 1.5])]);
        let trt = condition(vec![("B", vec![1.0, 2.0]), ("C", vec![2.0, 2.5])]);

        let tested = differential(&ctl, &trt, Channel::SIn, Scale::Linear, &mut rng);
        assert!(tested.failures.is_empty());
        assert_eq!(tested.results.len(), 3);
        assert_eq!(
            tested.results["A"],
            TestResult {
                p_value: 1e-16,
                log2_fold: -5.0
            }
        );
        assert_eq!(
            tested.results["B"],
            TestResult {
                p_value: 1e-16,
                log2_fold: 5.0
            }
        );
    }

    #[test]
    fn zero_variance() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ctl = condition(vec![("P", vec![1.0, 1.0])]);
        let trt = condition(vec![("P", vec![2.0, 2.0])]);

        let tested = differential(&ctl, &trt, Channel::SIn, Scale::Linear, &mut rng);
        assert!(tested.failures.is_empty());
        let res = tested.results["P"];
        assert_approx_eq!(res.log2_fold, 1.0, 1e-3);
        assert!(res.p_value > 0.0 && res.p_value <= 1.0);
    }

    #[test]
    fn swap_conditions() {
        let ctl = condition(vec![
            ("A", vec![1.0, 1.2, 0.9]),
            ("B", vec![5.0, 5.5, 4.0, 4.5]),
        ]);
        let trt = condition(vec![
            ("A", vec![2.2, 1.9, 2.4]),
            ("B", vec![5.1, 5.4, 4.4]),
        ]);

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let fwd = differential(&ctl, &trt, Channel::SIn, Scale::Linear, &mut rng);
        let rev = differential(&trt, &ctl, Channel::SIn, Scale::Linear, &mut rng);

        for name in &["A", "B"] {
            let (f, r) = (fwd.results[*name], rev.results[*name]);
            assert!(f.p_value > 0.0 && f.p_value <= 1.0);
            assert_eq!(f.p_value, r.p_value);
            assert_eq!(f.log2_fold, -r.log2_fold);
        }
        assert!(fwd.results["A"].log2_fold > 0.0);
        assert!(fwd.results["A"].p_value < fwd.results["B"].p_value);
    }

    #[test]
    fn log2_scale() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let ctl = condition(vec![("A", vec![10.0, 11.0, 12.0])]);
        let trt = condition(vec![("A", vec![13.0, 14.0, 15.0])]);

        let tested = differential(&ctl, &trt, Channel::Nsaf, Scale::Log2, &mut rng);
        assert_approx_eq!(tested.results["A"].log2_fold, 3.0);
    }

    #[test]
    fn numerical_failures() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let ctl = condition(vec![
            ("single", vec![1.0]),
            ("zeroes", vec![0.0, 0.0]),
            ("ok", vec![1.0, 2.0]),
        ]);
        let trt = condition(vec![
            ("single", vec![2.0]),
            ("zeroes", vec![1.0, 2.0]),
            ("ok", vec![3.0, 4.0]),
        ]);

        let tested = differential(&ctl, &trt, Channel::SIn, Scale::Linear, &mut rng);
        assert_eq!(tested.results.len(), 1);
        assert!(tested.results.contains_key("ok"));
        assert_eq!(tested.failures.len(), 2);
        assert!(tested
            .failures
            .iter()
            .all(|e| matches!(e, Error::Numerical { .. })));
    }

    #[test]
    fn not_imputed() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut ctl = condition(vec![("A", vec![1.0, 2.0])]);
        ctl.proteins.get_mut("A").unwrap().sin[0] = None;
        let trt = condition(vec![("A", vec![1.0, 2.0])]);

        let tested = differential(&ctl, &trt, Channel::SIn, Scale::Linear, &mut rng);
        assert!(tested.results.is_empty());
        assert_eq!(tested.failures[0].accession(), Some("A"));
    }

    #[test]
    fn scale_names() {
        assert_eq!("Linear".parse::<Scale>(), Ok(Scale::Linear));
        assert_eq!("log2".parse::<Scale>(), Ok(Scale::Log2));
        assert!(matches!(
            "ln".parse::<Scale>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn volcano() {
        let res = TestResult {
            p_value: 0.001,
            log2_fold: 1.0,
        };
        assert_approx_eq!(res.neg_log10_p(), 3.0);
    }
}
