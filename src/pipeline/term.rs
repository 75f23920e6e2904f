use crate::geometry::*;

/// One gathered input of a term: which source, along which offset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TermInput {
    pub source: usize,
    pub offset: OffsetId,
}

impl TermInput {
    pub fn new(source: usize, offset: impl Into<OffsetId>) -> Self {
        TermInput {
            source,
            offset: offset.into(),
        }
    }
}

/// One step of a stencil operator.
/// The kernel sees this term's gathered inputs, its result is scaled by
/// `weight` (and the boundary phase of `boundary`, if set) and added to
/// accumulator `output`.
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub inputs: Vec<TermInput>,
    pub output: usize,
    pub weight: f64,
    pub boundary: Option<OffsetId>,
}

impl Term {
    pub fn new(inputs: Vec<TermInput>, output: usize, weight: f64) -> Self {
        Term {
            inputs,
            output,
            weight,
            boundary: None,
        }
    }

    pub fn with_boundary(mut self, offset: impl Into<OffsetId>) -> Self {
        self.boundary = Some(offset.into());
        self
    }
}

/// Ordered terms, all with the same number of inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct TermTable {
    name: String,
    terms: Vec<Term>,
    inputs_per_term: usize,
}

impl TermTable {
    /// A malformed table is a programming error and aborts.
    pub fn new(name: &str, terms: Vec<Term>) -> Self {
        if terms.is_empty() {
            panic!("ERROR: term table {} has no terms", name);
        }
        let inputs_per_term = terms[0].inputs.len();
        if inputs_per_term == 0 {
            panic!("ERROR: term table {} gathers nothing", name);
        }
        if let Some(k) = terms.iter().position(|t| t.inputs.len() != inputs_per_term) {
            panic!(
                "ERROR: term table {}: term {} has {} inputs, term 0 has {}",
                name,
                k,
                terms[k].inputs.len(),
                inputs_per_term
            );
        }
        TermTable {
            name: name.to_string(),
            terms,
            inputs_per_term,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn inputs_per_term(&self) -> usize {
        self.inputs_per_term
    }

    /// Two buffer sets of one slot per input.
    pub fn slots_required(&self) -> usize {
        2 * self.inputs_per_term
    }

    /// Number of accumulators the table writes to.
    pub fn outputs(&self) -> usize {
        self.terms.iter().map(|t| t.output + 1).max().unwrap_or(0)
    }

    /// Number of sources the table reads from.
    pub fn sources(&self) -> usize {
        self.terms
            .iter()
            .flat_map(|t| t.inputs.iter())
            .map(|i| i.source + 1)
            .max()
            .unwrap_or(0)
    }
}
