use crate::error::{MineError, Result};

/// How confidences of itemsets with uncertain attributes are computed
#[derive( Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum )]
pub enum Exactness {
    /// expected confidence via dynamic programming
    Exact,
    /// ratio of expected positive support to expected support
    Approximate,
}

/// Thresholds and switches of a mining run.
#[derive( Debug, Clone, PartialEq )]
pub struct MiningParameters {
    /// absolute (expected) support a branch needs to be explored
    min_support: f64,
    /// coverage probability beyond which further rules for an instance are redundant
    min_cover_prob: f64,
    exactness: Exactness,
    /// abort confidence computations that cannot improve on the ancestors
    pruning: bool,
}

impl MiningParameters {

    pub fn new( min_support: f64, min_cover_prob: f64 ) -> Result<MiningParameters> {
	if !( min_support.is_finite() && min_support >= 0.0 ) {
	    return Err( MineError::configuration( format!( "minimum support must be a non-negative number, got {min_support}" )));
	}
	if !( 0.0 ..= 1.0 ).contains( &min_cover_prob ) {
	    return Err( MineError::configuration( format!( "minimum cover probability must lie in [0, 1], got {min_cover_prob}" )));
	}
	Ok( MiningParameters{ min_support, min_cover_prob, exactness: Exactness::Exact, pruning: true } )
    }

    /// Converts a support given as a fraction of the instances into an absolute threshold
    pub fn with_relative_support( relative: f64, instances: usize, min_cover_prob: f64 ) -> Result<MiningParameters> {
	if !( 0.0 ..= 1.0 ).contains( &relative ) {
	    return Err( MineError::configuration( format!( "relative minimum support must lie in [0, 1], got {relative}" )));
	}
	MiningParameters::new( relative * instances as f64, min_cover_prob )
    }

    pub fn set_exactness( &mut self, exactness: Exactness ) { self.exactness = exactness; }
    pub fn set_pruning( &mut self, pruning: bool ) { self.pruning = pruning; }

    pub fn min_support( &self ) -> f64 { self.min_support }
    pub fn min_cover_prob( &self ) -> f64 { self.min_cover_prob }
    pub fn exactness( &self ) -> Exactness { self.exactness }
    pub fn pruning( &self ) -> bool { self.pruning }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validation() {
	assert!( MiningParameters::new( 2.0, 0.9 ).is_ok() );
	assert!( MiningParameters::new( -1.0, 0.9 ).is_err() );
	assert!( MiningParameters::new( f64::NAN, 0.9 ).is_err() );
	assert!( MiningParameters::new( 1.0, 1.5 ).is_err() );
	assert!( MiningParameters::with_relative_support( 1.2, 10, 0.9 ).is_err() );
    }

    #[test]
    fn test_relative_support() {
	let parameters = MiningParameters::with_relative_support( 0.25, 40, 0.5 ).unwrap();
	assert_eq!( parameters.min_support(), 10.0 );
	assert_eq!( parameters.exactness(), Exactness::Exact );
	assert!( parameters.pruning() );
    }
}
