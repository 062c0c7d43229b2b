use super::*;

#[derive(Clone, Debug, Default, PartialEq)]
/// Per-replicate values of both quantification channels for one protein
pub struct Profile {
    /// A value is `None` if the protein was not quantified in that
    /// replicate, and it has not been imputed yet.
    pub sin: Vec<Option<f64>>,
    pub nsaf: Vec<Option<f64>>,
}

impl Profile {
    /// Create a profile of `n` absent slots
    pub fn absent(n: usize) -> Profile {
        Profile {
            sin: vec![None; n],
            nsaf: vec![None; n],
        }
    }

    /// Number of replicate slots
    pub fn len(&self) -> usize {
        self.sin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sin.is_empty()
    }

    /// Append the slot for the next replicate
    pub fn push(&mut self, measurement: Option<Measurement>) {
        self.sin.push(measurement.map(|m| m.sin));
        self.nsaf.push(measurement.map(|m| m.nsaf));
    }

    pub fn channel(&self, channel: Channel) -> &[Option<f64>] {
        match channel {
            Channel::SIn => &self.sin,
            Channel::Nsaf => &self.nsaf,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut [Option<f64>] {
        match channel {
            Channel::SIn => &mut self.sin,
            Channel::Nsaf => &mut self.nsaf,
        }
    }

    /// Return a `Vec` of all non-None values for a channel
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// # use diffquant::*;
    /// let profile = vec![Some(Measurement::new(1.0, 0.1)), None]
    ///     .into_iter()
    ///     .collect::<Profile>();
    ///
    /// assert_eq!(profile.present(Channel::SIn), vec![1.0]);
    /// ```
    pub fn present(&self, channel: Channel) -> Vec<f64> {
        self.channel(channel).iter().copied().flatten().collect()
    }

    pub fn is_complete(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|&c| self.channel(c).iter().all(Option::is_some))
    }

    /// All values for a channel, or `None` if any slot is still absent
    pub fn values(&self, channel: Channel) -> Option<Vec<f64>> {
        self.channel(channel).iter().copied().collect()
    }
}

impl FromIterator<Option<Measurement>> for Profile {
    fn from_iter<I: IntoIterator<Item = Option<Measurement>>>(iter: I) -> Self {
        let mut profile = Profile::default();
        for measurement in iter {
            profile.push(measurement);
        }
        profile
    }
}
