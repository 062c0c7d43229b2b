use super::*;

/// A collection of [`Replicate`]s from one experimental condition, merged
/// on the protein level
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Condition {
    /// Every profile has exactly `replicates.len()` slots per channel.
    /// Ordered by protein name, so that iteration order (and therefore the
    /// order random jitter is drawn in) is the same on every run.
    pub proteins: BTreeMap<String, Profile>,
    pub replicates: Vec<String>,
}

impl Condition {
    /// Merge replicates into a new condition, where slot `i` of every
    /// [`Profile`] holds the value from the `i`th replicate of `replicates`
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// # use diffquant::*;
    /// let condition = Condition::from_replicates(vec![rep1, rep2])?;
    /// // condition now contains the full outer join of rep1 and rep2
    /// assert_eq!(condition.replicates.len(), 2);
    /// ```
    pub fn from_replicates<I>(replicates: I) -> Result<Condition, Error>
    where
        I: IntoIterator<Item = Replicate>,
    {
        let mut condition = Condition::default();
        for replicate in replicates {
            if replicate.proteins.is_empty() {
                return Err(Error::Configuration(format!(
                    "replicate `{}` does not contain any quantified proteins",
                    replicate.path
                )));
            }
            condition.merge(&replicate);
        }

        if condition.replicates.is_empty() {
            return Err(Error::Configuration(
                "at least one replicate is required per condition".into(),
            ));
        }
        Ok(condition)
    }

    /// Add a [`Replicate`] into the condition as the next slot
    pub fn merge(&mut self, replicate: &Replicate) {
        // Union of current and new protein names
        let names = self
            .proteins
            .keys()
            .chain(replicate.proteins.keys())
            .cloned()
            .collect::<BTreeSet<_>>();

        let n = self.replicates.len();

        for name in names {
            let measurement = replicate.proteins.get(&name).copied();
            self.proteins
                .entry(name)
                .or_insert_with(|| Profile::absent(n))
                .push(measurement);
        }

        self.replicates.push(replicate.path.clone());
    }

    pub fn get(&self, protein: &str) -> Option<&Profile> {
        self.proteins.get(protein)
    }

    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }

    /// True if no profile has an absent slot left
    pub fn is_complete(&self) -> bool {
        self.proteins.values().all(Profile::is_complete)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! rep {
        ($path:expr, $($name:expr => $sin:expr),*) => {
            Replicate::new(
                $path,
                vec![$(($name.to_string(), Measurement::new($sin, $sin / 100.0))),*]
                    .into_iter()
                    .collect(),
            )
        };
    }

    #[test]
    fn merge() {
        let condition = Condition::from_replicates(vec![
            rep!("a", "P1" => 1.0, "P2" => 2.0),
            rep!("b", "P2" => 3.0, "P3" => 4.0),
            rep!("c", "P1" => 5.0),
        ])
        .unwrap();

        assert_eq!(condition.replicates, vec!["a", "b", "c"]);
        assert_eq!(condition.len(), 3);
        assert_eq!(
            condition.get("P1").unwrap().sin,
            vec![Some(1.0), None, Some(5.0)]
        );
        assert_eq!(
            condition.get("P2").unwrap().sin,
            vec![Some(2.0), Some(3.0), None]
        );
        assert_eq!(
            condition.get("P3").unwrap().nsaf,
            vec![None, Some(0.04), None]
        );
        assert!(condition.proteins.values().all(|p| p.len() == 3));
        assert!(!condition.is_complete());
    }

    #[test]
    fn no_replicates() {
        assert!(matches!(
            Condition::from_replicates(Vec::new()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn empty_replicate() {
        let res = Condition::from_replicates(vec![
            rep!("a", "P1" => 1.0),
            Replicate::new("b", HashMap::new()),
        ]);
        assert!(matches!(res, Err(Error::Configuration(_))));
    }
}
