
use std::mem::swap;

use crate::data::Label;

/// Computes expected confidences of itemsets whose members belong to them only with some probability.
///
/// For members with independent inclusion probabilities the expected confidence of a label is
/// `E[ matching members / members ]`, taken as 0 when no member is present.
/// The dynamic program keeps two pairs of rolling buffers and runs in quadratic time and linear space.
/// The buffers are kept between calls.
#[derive( Debug, Default )]
pub struct ConfidenceEstimator {
    /// probability that no member occurs among a prefix, previous and current round
    empty_old: Vec<f64>,
    empty_new: Vec<f64>,
    /// accumulated expected numerator, previous and current round
    expect_old: Vec<f64>,
    expect_new: Vec<f64>,
    pruning: bool,
    runs: u64,
    pruned: u64,
}

impl ConfidenceEstimator {

    pub fn new( pruning: bool ) -> ConfidenceEstimator {
	ConfidenceEstimator{ pruning, ..Default::default() }
    }

    /// number of dynamic programs started
    pub fn runs( &self ) -> u64 { self.runs }
    /// number of dynamic programs abandoned by the bound
    pub fn pruned( &self ) -> u64 { self.pruned }

    /// Expected confidence of `target` among members with the given labels and inclusion probabilities.
    ///
    /// `positive_support` is the expected number of members carrying the target label.
    /// With pruning, returns `None` if the upper bound on the result drops to `best` or below
    /// before the last round, i.e., the label cannot improve on `best` here.
    pub fn expected_confidence( &mut self, labels: &[Label], probabilities: &[f64], target: Label,
				positive_support: f64, best: f64 ) -> Option<f64> {
	self.estimate( labels, probabilities, target, positive_support, best ).0
    }

    /// Runs the dynamic program and reports whether the bound fell to `best` before the last round.
    /// Without pruning the computation goes on to the end all the same.
    fn estimate( &mut self, labels: &[Label], probabilities: &[f64], target: Label,
		 positive_support: f64, best: f64 ) -> (Option<f64>, bool) {
	assert_eq!( labels.len(), probabilities.len() );
	let n = labels.len();
	self.runs += 1;
	self.prepare( probabilities );

	let mut expectation = 0.0;
	let mut contribution_sum = 0.0;
	let mut bound = 0.0;
	let mut bounded = false;
	for i in 1 ..= n {
	    if !bounded {
		bound = if i == 1 { positive_support }
		else { bound - ( positive_support - contribution_sum ) / ( i * ( i - 1 )) as f64 };
		if i < n && bound <= best {
		    bounded = true;
		    if self.pruning {
			self.pruned += 1;
			return (None, true);
		    }
		}
	    }

	    let p = probabilities[ i - 1 ];
	    self.empty_new[ i ] = self.empty_old[ i - 1 ] * p;
	    self.expect_new[ i ] = self.expect_old[ i - 1 ] * p;
	    if labels[ i - 1 ] == target {
		self.expect_new[ i ] += self.empty_old[ i - 1 ] * p;
	    }
	    for j in i + 1 ..= n {
		let p = probabilities[ j - 1 ];
		self.empty_new[ j ] = self.empty_old[ j - 1 ] * p + self.empty_new[ j - 1 ] * ( 1.0 - p );
		self.expect_new[ j ] = self.expect_old[ j - 1 ] * p + self.expect_new[ j - 1 ] * ( 1.0 - p );
		if labels[ j - 1 ] == target {
		    self.expect_new[ j ] += self.empty_old[ j - 1 ] * p;
		}
	    }
	    let contribution = self.expect_new[ n ];
	    expectation += contribution / i as f64;
	    contribution_sum += contribution;

	    swap( &mut self.empty_new, &mut self.empty_old );
	    swap( &mut self.expect_new, &mut self.expect_old );
	}
	(Some( expectation ), bounded)
    }

    /// Sizes the buffers for n members and fills in the first round
    fn prepare( &mut self, probabilities: &[f64] ) {
	let size = probabilities.len() + 1;
	for buffer in [ &mut self.empty_old, &mut self.empty_new, &mut self.expect_old, &mut self.expect_new ] {
	    buffer.clear();
	    buffer.resize( size, 0.0 );
	}
	self.empty_old[ 0 ] = 1.0;
	for (i, p) in probabilities.iter().enumerate() {
	    self.empty_old[ i + 1 ] = self.empty_old[ i ] * ( 1.0 - p );
	}
    }

    /// Confidences of all labels at a node with uncertain members.
    ///
    /// Labels without positive support get 0, labels supported by every member get 1.
    /// The highest remaining label is derived as one minus the others, unless the bound showed
    /// that another label cannot improve here. This holds whether or not pruning is switched on,
    /// so both settings produce the same confidences for every label that can improve.
    pub fn node_confidences( &mut self, labels: &[Label], probabilities: &[f64], support: f64,
			     positive_support: &[f64], best: &[f64] ) -> Vec<Option<f64>> {
	let mut derived = ( 0 .. positive_support.len() ).rev()
	    .find( |label| positive_support[ *label ] > 0.0 && positive_support[ *label ] < support );

	let mut confidences = Vec::with_capacity( positive_support.len() );
	let mut sum: f64 = 0.0;
	for (label, positive) in positive_support.iter().enumerate() {
	    let confidence = if *positive == 0.0 {
		Some( 0.0 )
	    } else if *positive == support {
		Some( 1.0 )
	    } else if derived == Some( label ) {
		Some( ( 1.0 - sum ).clamp( 0.0, 1.0 ))
	    } else {
		let (confidence, bounded) = self.estimate( labels, probabilities, label, *positive, best[ label ] );
		if bounded {
		    derived = None;
		}
		if let Some( c ) = confidence {
		    sum += c;
		}
		confidence
	    };
	    confidences.push( confidence );
	}
	confidences
    }
}

/// Confidence of a label when membership is certain, or its approximation from expected counts
pub fn ratio( positive_support: f64, support: f64 ) -> f64 {
    if support > 0.0 { positive_support / support } else { 0.0 }
}
