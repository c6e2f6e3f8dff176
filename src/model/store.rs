
use rustc_hash::FxHashMap;
use tracing::trace;

use super::{Rule, RuleId};

/// Rules that currently cover at least one instance, keyed by their token.
#[derive( Debug, Default )]
pub struct RuleStore {
    rules: FxHashMap<RuleId, Rule>,
    /// token handed to the next registered rule
    token_count: RuleId,
    /// number of rules deleted after losing their last cover
    purged: usize,
}

impl RuleStore {

    pub fn new() -> RuleStore {
	RuleStore::default()
    }

    /// Token that the next registered rule will receive.
    /// Cover entries of a candidate refer to this token before the candidate is registered.
    pub fn next_token( &self ) -> RuleId {
	self.token_count
    }

    /// Adds a rule that covers at least one instance and returns its token
    pub fn register( &mut self, rule: Rule ) -> RuleId {
	assert!( rule.cover_count() > 0, "rules without cover are never stored" );
	let token = self.token_count;
	self.token_count += 1;
	self.rules.insert( token, rule );
	token
    }

    pub fn get( &self, token: RuleId ) -> Option<&Rule> {
	self.rules.get( &token )
    }

    pub fn contains( &self, token: RuleId ) -> bool {
	self.rules.contains_key( &token )
    }

    /// Takes one cover away from the rule and deletes it once it covers nothing.
    /// Returns whether the rule was deleted.
    pub fn release( &mut self, token: RuleId ) -> bool {
	let rule = self.rules.get_mut( &token ).expect( "cover entries refer to stored rules" );
	if rule.remove_cover() == 0 {
	    trace!( "purging rule {token} {:?}", rule.itemset().items() );
	    self.rules.remove( &token );
	    self.purged += 1;
	    true
	} else {
	    false
	}
    }

    pub fn len( &self ) -> usize { self.rules.len() }
    pub fn is_empty( &self ) -> bool { self.rules.is_empty() }
    pub fn purged( &self ) -> usize { self.purged }

    pub fn iter( &self ) -> impl Iterator<Item = (RuleId, &Rule)> {
	self.rules.iter().map( |(token, rule)| (*token, rule) )
    }

    /// Rules by decreasing cover count, ties broken by age
    pub fn ordered( &self ) -> Vec<(RuleId, &Rule)> {
	let mut rules: Vec<(RuleId, &Rule)> = self.iter().collect();
	rules.sort_unstable_by( |(left_token, left), (right_token, right)| {
	    right.cover_count().cmp( &left.cover_count() )
		.then( left_token.cmp( right_token ))
	});
	rules
    }
}
