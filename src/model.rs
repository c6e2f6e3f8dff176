use tracing::Level;

use crate::*;

mod cover;
mod serialize; // rule file format and record conversion
mod store;

pub use cover::{CoverEntry, CoverIndex, CoverManager, Candidate};
pub use serialize::{RuleRecord, RuleFormatter, format_decimal, parse_rule, records};
pub use store::RuleStore;

/// Token to identify a rule in the store
pub type RuleId = usize;

/// A constraint `attribute == value`. The attribute is given by its column position in the table.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub struct Item {
    pub column: usize,
    pub value: Value,
}

/// Items ordered by strictly decreasing column, i.e., the most recently added item comes first.
#[derive( Debug, Clone, PartialEq, Eq, Default )]
pub struct Itemset {
    items: Vec<Item>,
}

/// Antecedent with its support, a confidence per label and the number of instances relying on it.
#[derive( Debug, Clone, PartialEq )]
pub struct Rule {
    itemset: Itemset,
    support: f64,
    /// `None` if the computation was abandoned because it could not improve on the ancestors
    confidences: Vec<Option<f64>>,
    cover_count: Count,
}

impl Item {
    pub fn new( column: usize, value: Value ) -> Item {
	Item{ column, value }
    }
}

impl Itemset {

    /// Builds the itemset from the enumeration stack, where items were pushed in increasing column order.
    pub fn from_stack( stack: &[Item] ) -> Itemset {
	let items: Vec<Item> = stack.iter().rev().copied().collect();
	assert!( items.windows( 2 ).all( |pair| pair[0].column > pair[1].column ),
		 "itemset columns must be strictly decreasing: {items:?}" );
	Itemset{ items }
    }

    pub fn len( &self ) -> usize { self.items.len() }
    pub fn is_empty( &self ) -> bool { self.items.is_empty() }
    pub fn items( &self ) -> &[Item] { &self.items }

    /// Checks whether every item of self occurs in other.
    /// Both sequences are ordered by decreasing column, so a single scan suffices.
    pub fn is_subset_of( &self, other: &Itemset ) -> bool {
	let (mine, theirs) = (&self.items, &other.items);
	let mut matched = 0;
	for (position, item) in theirs.iter().enumerate() {
	    if matched == mine.len() {
		return true;
	    }
	    // not enough items left to match the rest
	    if mine.len() - matched > theirs.len() - position {
		return false;
	    }
	    let wanted = &mine[ matched ];
	    if item == wanted {
		matched += 1;
	    } else if item.column <= wanted.column {
		// the wanted column was passed or holds a different value
		return false;
	    }
	}
	matched == mine.len()
    }
}

impl Rule {

    pub fn new( itemset: Itemset, support: f64, confidences: Vec<Option<f64>> ) -> Rule {
	Rule{ itemset, support, confidences, cover_count: 0 }
    }

    pub fn itemset( &self ) -> &Itemset { &self.itemset }
    pub fn support( &self ) -> f64 { self.support }
    pub fn confidences( &self ) -> &[Option<f64>] { &self.confidences }
    pub fn cover_count( &self ) -> Count { self.cover_count }

    pub fn confidence( &self, label: Label ) -> Option<f64> {
	self.confidences.get( label ).copied().flatten()
    }

    pub fn add_cover( &mut self, count: Count ) {
	self.cover_count += count;
    }

    /// Decrements the cover count and returns the remaining count
    pub fn remove_cover( &mut self ) -> Count {
	assert!( self.cover_count > 0, "cannot release a rule that covers nothing" );
	self.cover_count -= 1;
	self.cover_count
    }

    /// Whether self ranks strictly below other as an explanation of the label:
    /// lower confidence, then lower support, then the longer itemset.
    pub fn is_worse_than( &self, other: &Rule, label: Label ) -> bool {
	let mine = self.confidence( label ).expect( "a covering rule has a confidence for its label" );
	let theirs = other.confidence( label ).expect( "a candidate has a confidence for its label" );
	mine < theirs || mine == theirs &&
	    ( self.support < other.support || self.support == other.support &&
	      self.itemset.len() > other.itemset.len() )
    }
}

impl Loggable for Rule {
    fn log( &self, message: &str, level: Level ) {
	log_at( level, &format!( "{message}: {:?} support {:.3} cover {} confidences {:?}",
				 self.itemset.items(), self.support, self.cover_count, self.confidences ));
    }
}

impl Loggable for RuleStore {
    fn log( &self, message: &str, level: Level ) {
	log_at( level, &format!( "{message}: {} rules, {} purged", self.len(), self.purged() ));
	for (id, rule) in self.ordered() {
	    rule.log( &format!( "rule {id}" ), Level::TRACE );
	}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn itemset( items: &[(usize, Value)] ) -> Itemset {
	// given in decreasing column order
	let stack: Vec<Item> = items.iter().rev().map( |(c, v)| Item::new( *c, *v )).collect();
	Itemset::from_stack( &stack )
    }

    #[test]
    fn test_subset() {
	let big = itemset( &[ (5, 1), (3, 0), (1, 2) ] );
	assert!( itemset( &[] ).is_subset_of( &big ));
	assert!( itemset( &[ (5, 1) ] ).is_subset_of( &big ));
	assert!( itemset( &[ (3, 0), (1, 2) ] ).is_subset_of( &big ));
	assert!( itemset( &[ (5, 1), (1, 2) ] ).is_subset_of( &big ));
	assert!( big.is_subset_of( &big ));
	// different value
	assert!( !itemset( &[ (3, 1) ] ).is_subset_of( &big ));
	// column missing
	assert!( !itemset( &[ (4, 1) ] ).is_subset_of( &big ));
	assert!( !itemset( &[ (0, 0) ] ).is_subset_of( &big ));
	// longer than the other
	assert!( !big.is_subset_of( &itemset( &[ (5, 1), (3, 0) ] )));
	assert!( !itemset( &[ (5, 1) ] ).is_subset_of( &itemset( &[] )));
    }

    #[test]
    #[should_panic]
    fn test_unordered_stack() {
	Itemset::from_stack( &[ Item::new( 2, 0 ), Item::new( 1, 0 ) ] );
    }

    #[test]
    fn test_rule_order() {
	let short = Rule::new( itemset( &[ (1, 0) ] ), 4.0, vec!( Some( 0.8 ), Some( 0.2 )));
	let long = Rule::new( itemset( &[ (2, 0), (1, 0) ] ), 4.0, vec!( Some( 0.8 ), Some( 0.2 )));
	let weak = Rule::new( itemset( &[ (2, 1) ] ), 6.0, vec!( Some( 0.7 ), Some( 0.3 )));
	let frequent = Rule::new( itemset( &[ (3, 1), (2, 1) ] ), 5.0, vec!( Some( 0.8 ), None ));

	assert!( long.is_worse_than( &short, 0 ));
	assert!( !short.is_worse_than( &long, 0 ));
	assert!( !short.is_worse_than( &short, 0 ));
	assert!( weak.is_worse_than( &short, 0 ));
	assert!( short.is_worse_than( &weak, 1 ));
	assert!( short.is_worse_than( &frequent, 0 ));
	assert!( long.is_worse_than( &frequent, 0 ));
    }

    #[test]
    fn test_cover_count() {
	let mut rule = Rule::new( itemset( &[ (0, 1) ] ), 1.0, vec!( Some( 1.0 )));
	rule.add_cover( 2 );
	assert_eq!( rule.remove_cover(), 1 );
	assert_eq!( rule.remove_cover(), 0 );
	assert_eq!( rule.confidence( 0 ), Some( 1.0 ));
	assert_eq!( rule.confidence( 3 ), None );
    }
}
