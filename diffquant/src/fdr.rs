//! False discovery rate control of differential abundance calls using the
//! Benjamini-Hochberg step-up procedure
//!
//! Benjamini & Hochberg, https://doi.org/10.1111/j.2517-6161.1995.tb02031.x

use super::*;

/// A protein that passed both the p-value cutoff and the fold change
/// threshold
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Selected {
    pub accession: String,
    pub p_value: f64,
    pub log2_fold: f64,
    /// Benjamini-Hochberg adjusted p-value
    pub q_value: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Selection {
    /// Largest raw p-value that is still accepted at the requested FDR.
    /// `None` if no protein can be accepted
    pub cutoff: Option<f64>,
    /// Sorted by ascending p-value
    pub proteins: Vec<Selected>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }

    pub fn upregulated(&self) -> impl Iterator<Item = &Selected> {
        self.proteins.iter().filter(|p| p.log2_fold > 0.0)
    }

    pub fn downregulated(&self) -> impl Iterator<Item = &Selected> {
        self.proteins.iter().filter(|p| p.log2_fold < 0.0)
    }
}

/// Select proteins with a p-value at or below the Benjamini-Hochberg cutoff
/// for `fdr`, and an absolute log2 fold change of at least `min_fold`
///
/// # Example
///
/// ```rust,ignore
/// # use diffquant::*;
/// let selection = select(&tested.results, 0.05, 1.0);
/// match selection.cutoff {
///     Some(p) => println!("{} proteins with p <= {}", selection.len(), p),
///     None => println!("nothing passes 5% FDR"),
/// }
/// ```
pub fn select(results: &BTreeMap<String, TestResult>, fdr: f64, min_fold: f64) -> Selection {
    struct Row<'a> {
        accession: &'a str,
        result: TestResult,
        q: f64,
    }

    let mut rows = results
        .iter()
        .filter(|(_, res)| res.p_value.is_finite())
        .map(|(acc, res)| Row {
            accession: acc,
            result: *res,
            q: 1.0,
        })
        .collect::<Vec<Row>>();

    rows.sort_by(|a, b| {
        a.result
            .p_value
            .total_cmp(&b.result.p_value)
            .then_with(|| a.accession.cmp(b.accession))
    });

    // Largest rank whose adjusted p-value is within `fdr`
    let n = rows.len() as f64;
    let mut passing = 0;
    for (idx, row) in rows.iter_mut().enumerate() {
        row.q = row.result.p_value * n / (idx + 1) as f64;
        if row.q <= fdr {
            passing = idx + 1;
        }
    }

    // Q-value is the minimum adjusted p-value at any higher rank
    let mut q_min = 1.0f64;
    for row in rows.iter_mut().rev() {
        q_min = q_min.min(row.q);
        row.q = q_min;
    }

    // No rank qualifies: nothing is selected, rather than falling back to
    // the last (largest) p-value
    if passing == 0 {
        log::info!(
            "no proteins pass {} FDR among {} tested",
            fdr,
            rows.len()
        );
        return Selection::default();
    }

    let cutoff = rows[passing - 1].result.p_value;
    let proteins = rows
        .into_iter()
        .filter(|row| row.result.p_value <= cutoff && row.result.log2_fold.abs() >= min_fold)
        .map(|row| Selected {
            accession: row.accession.into(),
            p_value: row.result.p_value,
            log2_fold: row.result.log2_fold,
            q_value: row.q,
        })
        .collect::<Vec<_>>();

    log::info!(
        "p-value cutoff {:e} at {} FDR: {} of {} proteins selected",
        cutoff,
        fdr,
        proteins.len(),
        results.len()
    );

    Selection {
        cutoff: Some(cutoff),
        proteins,
    }
}
