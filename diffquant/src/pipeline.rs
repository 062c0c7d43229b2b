use super::*;
use rand::Rng;
use rayon::prelude::*;

/// FDR used when none is configured
pub const DEFAULT_FDR: f64 = 0.01;
/// Absolute log2 fold change used when none is configured
pub const DEFAULT_FOLD_CHANGE: f64 = 1.0;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
/// Analysis parameters deserialized from a JSON file. Missing values fall
/// back to defaults when the [`Input`] is built into [`Parameters`]
pub struct Input {
    pub channel: Option<String>,
    pub imputation: Option<String>,
    pub fdr: Option<f64>,
    pub fold_change: Option<f64>,
    pub scale: Option<Scale>,
    #[serde(default)]
    pub control: Vec<String>,
    #[serde(default)]
    pub treatment: Vec<String>,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Actual analysis parameters - may include default values not set by user
pub struct Parameters {
    pub channel: Channel,
    pub imputation: Imputation,
    pub fdr: f64,
    pub fold_change: f64,
    pub scale: Scale,
    pub control: Vec<String>,
    pub treatment: Vec<String>,
    pub seed: Option<u64>,
}

impl Input {
    /// Resolve names and defaults. Fails with [`Error::Configuration`] if a
    /// channel or imputation name is not recognized, a threshold is out of
    /// range, or either condition has no replicates
    pub fn build(self) -> Result<Parameters, Error> {
        let channel = match self.channel {
            Some(s) => s.parse()?,
            None => Channel::SIn,
        };
        let imputation = match self.imputation {
            Some(s) => s.parse()?,
            None => Imputation::Minimum,
        };

        let parameters = Parameters {
            channel,
            imputation,
            fdr: self.fdr.unwrap_or(DEFAULT_FDR),
            fold_change: self.fold_change.unwrap_or(DEFAULT_FOLD_CHANGE),
            scale: self.scale.unwrap_or_default(),
            control: self.control,
            treatment: self.treatment,
            seed: self.seed,
        };

        if parameters.control.is_empty() {
            return Err(Error::Configuration(
                "no control replicates were supplied".into(),
            ));
        }
        if parameters.treatment.is_empty() {
            return Err(Error::Configuration(
                "no treatment replicates were supplied".into(),
            ));
        }
        parameters.validate()?;
        Ok(parameters)
    }
}

/// Output of a full analysis
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    /// Every protein that could be tested, selected or not
    pub results: BTreeMap<String, TestResult>,
    pub selection: Selection,
    /// Proteins dropped during imputation or testing, and why
    pub excluded: Vec<Error>,
}

impl Parameters {
    /// Check statistical thresholds
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.fdr.is_finite() && (0.0..=1.0).contains(&self.fdr)) {
            return Err(Error::Configuration(format!(
                "FDR must be between 0 and 1, got {}",
                self.fdr
            )));
        }
        if !(self.fold_change.is_finite() && self.fold_change >= 0.0) {
            return Err(Error::Configuration(format!(
                "fold change threshold must be a non-negative number, got {}",
                self.fold_change
            )));
        }
        if self.fdr > 0.05 {
            log::warn!("FDR of {} is higher than expected", self.fdr);
        }
        Ok(())
    }

    /// Run the full analysis: merge each condition's replicates, impute
    /// absent values, test every protein, and select at the configured FDR
    /// and fold change.
    ///
    /// Configuration errors are returned before any protein is processed;
    /// proteins that fail later on are listed in [`Report::excluded`]
    pub fn run<R: Rng + ?Sized>(
        &self,
        control: Vec<Replicate>,
        treatment: Vec<Replicate>,
        rng: &mut R,
    ) -> Result<Report, Error> {
        self.validate()?;
        let mut control = Condition::from_replicates(control)?;
        let mut treatment = Condition::from_replicates(treatment)?;

        log::info!(
            "{} control proteins from {} replicates, {} treatment proteins from {} replicates",
            control.len(),
            control.replicates.len(),
            treatment.len(),
            treatment.replicates.len()
        );

        let mut excluded = self.imputation.impute(&mut control, rng);
        excluded.extend(self.imputation.impute(&mut treatment, rng));

        let tested = differential(&control, &treatment, self.channel, self.scale, rng);
        excluded.extend(tested.failures);

        let selection = select(&tested.results, self.fdr, self.fold_change);
        log::info!(
            "{} proteins tested on {}: {} up, {} down, {} excluded",
            tested.results.len(),
            self.channel,
            selection.upregulated().count(),
            selection.downregulated().count(),
            excluded.len()
        );

        Ok(Report {
            results: tested.results,
            selection,
            excluded,
        })
    }
}

/// Read replicates in parallel, using `loader` to turn each path into a
/// protein -> [`Measurement`] mapping. Replicates are returned in the same
/// order as `paths`, regardless of which finishes loading first. If any
/// path fails, the error of the earliest failing path is returned
pub fn load_replicates<F, E>(paths: &[String], loader: F) -> Result<Vec<Replicate>, E>
where
    F: Fn(&str) -> Result<HashMap<String, Measurement>, E> + Sync,
    E: Send,
{
    paths
        .par_iter()
        .map(|path| loader(path.as_str()).map(|proteins| Replicate::new(path.as_str(), proteins)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn input() -> Input {
        Input {
            control: vec!["c1".into(), "c2".into()],
            treatment: vec!["t1".into(), "t2".into()],
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let p = input().build().unwrap();
        assert_eq!(p.channel, Channel::SIn);
        assert_eq!(p.imputation, Imputation::Minimum);
        assert_eq!(p.fdr, DEFAULT_FDR);
        assert_eq!(p.fold_change, DEFAULT_FOLD_CHANGE);
        assert_eq!(p.scale, Scale::Linear);
    }

    #[test]
    fn from_json() {
        let json = r#"{
            "channel": "NSAF",
            "imputation": "average",
            "fdr": 0.05,
            "fold_change": 2.0,
            "scale": "log2",
            "control": ["c1.tsv", "c2.tsv"],
            "treatment": ["t1.tsv"],
            "seed": 11
        }"#;
        let input: Input = serde_json::from_str(json).unwrap();
        let p = input.build().unwrap();
        assert_eq!(p.channel, Channel::Nsaf);
        assert_eq!(p.imputation, Imputation::Average);
        assert_eq!(p.scale, Scale::Log2);
        assert_eq!(p.treatment, vec!["t1.tsv"]);
        assert_eq!(p.seed, Some(11));
    }

    #[test]
    fn configuration_errors() {
        let bad = vec![
            Input {
                channel: Some("iBAQ".into()),
                ..input()
            },
            Input {
                imputation: Some("zero".into()),
                ..input()
            },
            Input {
                fdr: Some(1.5),
                ..input()
            },
            Input {
                fdr: Some(f64::NAN),
                ..input()
            },
            Input {
                fold_change: Some(-1.0),
                ..input()
            },
            Input {
                control: Vec::new(),
                ..input()
            },
            Input {
                treatment: Vec::new(),
                ..input()
            },
        ];
        for input in bad {
            assert!(matches!(input.build(), Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn run_requires_replicates() {
        let p = input().build().unwrap();
        let rep = Replicate::new(
            "c1",
            vec![("A".to_string(), Measurement::new(1.0, 1.0))]
                .into_iter()
                .collect(),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let res = p.run(vec![rep], Vec::new(), &mut rng);
        assert!(matches!(res, Err(Error::Configuration(_))));
    }

    #[test]
    fn merged_proteins_always_impute() {
        let rep = |path: &str, proteins: &[(&str, f64)]| {
            Replicate::new(
                path,
                proteins
                    .iter()
                    .map(|&(acc, x)| (acc.to_string(), Measurement::new(x, x / 10.0)))
                    .collect(),
            )
        };

        for strategy in &["average", "minimum"] {
            let p = Input {
                imputation: Some(strategy.to_string()),
                ..input()
            }
            .build()
            .unwrap();

            let control = vec![
                rep("c1", &[("A", 1.0), ("B", 2.0)]),
                rep("c2", &[("C", 3.0)]),
                rep("c3", &[("A", 1.5), ("D", 0.5)]),
            ];
            let treatment = vec![rep("t1", &[("B", 4.0)]), rep("t2", &[("A", 2.0), ("C", 1.0)])];

            let mut rng = ChaCha8Rng::seed_from_u64(6);
            let report = p.run(control, treatment, &mut rng).unwrap();
            assert!(report
                .excluded
                .iter()
                .all(|e| !matches!(e, Error::Data { .. })));
            assert_eq!(report.results.len(), 4);
        }
    }

    #[test]
    fn load_in_order() {
        let paths = (0..16).map(|i| format!("rep{}", i)).collect::<Vec<_>>();
        let reps = load_replicates(&paths, |path| {
            let idx = path.trim_start_matches("rep").parse::<f64>().unwrap();
            let mut map = HashMap::new();
            map.insert("A".to_string(), Measurement::new(idx, idx));
            Ok::<_, std::io::Error>(map)
        })
        .unwrap();

        for (i, rep) in reps.iter().enumerate() {
            assert_eq!(rep.path, paths[i]);
            assert_eq!(rep.proteins["A"].sin, i as f64);
        }
    }

    #[test]
    fn load_failure() {
        let paths = vec![
            "ok".to_string(),
            "missing".to_string(),
            "unreadable".to_string(),
        ];
        let res = load_replicates(&paths, |path| match path {
            "ok" => Ok(HashMap::new()),
            _ => Err(format!("{} not found", path)),
        });
        assert_eq!(res, Err("missing not found".to_string()));
    }

    #[test]
    fn earliest_failure_wins() {
        // The first path is the slowest to fail
        let paths = (0..8).map(|i| i.to_string()).collect::<Vec<_>>();
        let res = load_replicates(&paths, |path| {
            if path == "0" {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            Err::<HashMap<String, Measurement>, _>(format!("failed {}", path))
        });
        assert_eq!(res, Err("failed 0".to_string()));
    }
}
