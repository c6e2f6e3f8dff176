
use tracing::trace;

use crate::data::{Count, Instance, Label};

use super::{Rule, RuleId, RuleStore};

/// A rule explaining an instance together with the probability that the instance matches the rule
#[derive( Debug, Clone, Copy, PartialEq )]
pub struct CoverEntry {
    pub rule: RuleId,
    pub probability: f64,
}

/// Per instance, the rules that explain its label ordered from best to worst.
#[derive( Debug, Clone, Default )]
pub struct CoverIndex {
    entries: Vec<Vec<CoverEntry>>,
}

/// A scored itemset asking to become a rule
#[derive( Debug )]
pub struct Candidate<'a> {
    /// token the rule receives once registered
    pub id: RuleId,
    pub rule: &'a Rule,
    /// instances matching the itemset
    pub members: &'a [Instance],
    /// inclusion probability per member, `None` if all members match with certainty
    pub probabilities: Option<&'a [f64]>,
}

/// Decides which instances a candidate rule has to explain and drops entries made redundant by it.
#[derive( Debug, Clone )]
pub struct CoverManager {
    /// coverage probability at which an instance is explained well enough
    min_cover_prob: f64,
}

impl CoverIndex {

    /// Empty cover lists for the given number of instances
    pub fn new( instances: usize ) -> CoverIndex {
	CoverIndex{ entries: vec!( Vec::new(); instances ) }
    }

    pub fn len( &self ) -> usize { self.entries.len() }
    pub fn is_empty( &self ) -> bool { self.entries.is_empty() }

    pub fn entries( &self, instance: Instance ) -> &[CoverEntry] {
	&self.entries[ instance ]
    }

    /// Probability that none of the rules covering the instance applies
    pub fn uncovered_probability( &self, instance: Instance ) -> f64 {
	self.entries[ instance ].iter().map( |entry| 1.0 - entry.probability ).product()
    }

    /// Number of instances whose cover list refers to the rule
    pub fn references( &self, rule: RuleId ) -> usize {
	self.entries.iter()
	    .filter( |list| list.iter().any( |entry| entry.rule == rule ))
	    .count()
    }
}

impl CoverManager {

    pub fn new( min_cover_prob: f64 ) -> CoverManager {
	CoverManager{ min_cover_prob }
    }

    fn is_covered( &self, uncovered: f64 ) -> bool {
	1.0 - uncovered > self.min_cover_prob
    }

    /// Inserts the candidate into the cover lists of all members with the given label that still need it.
    /// Entries that become redundant are removed and rules left without cover are deleted from the store.
    /// Returns the number of instances the candidate now covers for this label.
    pub fn admit( &self, covers: &mut CoverIndex, store: &mut RuleStore, labels: &[Label], candidate: &Candidate, label: Label ) -> Count {
	let mut gained = 0;

	'members: for (position, instance) in candidate.members.iter().enumerate() {
	    if labels[ *instance ] != label {
		continue;
	    }
	    let probability = candidate.probabilities.map_or( 1.0, |probabilities| probabilities[ position ] );
	    let list = &mut covers.entries[ *instance ];

	    // walk the better rules to find the insertion point
	    let mut uncovered = 1.0;
	    let mut insert_at = list.len();
	    for (index, entry) in list.iter().enumerate() {
		let existing = store.get( entry.rule ).expect( "cover entries refer to stored rules" );
		if existing.is_worse_than( candidate.rule, label ) {
		    insert_at = index;
		    break;
		}
		if candidate.rule.itemset().is_subset_of( existing.itemset() ) {
		    // a specialisation at least as good already explains the instance
		    continue 'members;
		}
		uncovered *= 1.0 - entry.probability;
	    }
	    if self.is_covered( uncovered ) {
		continue;
	    }

	    list.insert( insert_at, CoverEntry{ rule: candidate.id, probability } );
	    if insert_at + 1 < list.len() {
		uncovered *= 1.0 - probability;
		let mut cut = None;
		for index in insert_at + 1 .. list.len() {
		    if self.is_covered( uncovered ) {
			cut = Some( index );
			break;
		    }
		    uncovered *= 1.0 - list[ index ].probability;
		}
		if let Some( cut ) = cut {
		    for evicted in list.drain( cut .. ) {
			trace!( "instance {instance} drops rule {}", evicted.rule );
			store.release( evicted.rule );
		    }
		}
	    }
	    gained += 1;
	}
	gained
    }
}
