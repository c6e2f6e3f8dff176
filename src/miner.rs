
use crate::*;
use crate::data::Column;
use crate::model::{Candidate, CoverIndex, CoverManager, Item, Itemset};

mod confidence;

pub use confidence::{ConfidenceEstimator, ratio};

/// Algorithms turning an attribute table into a set of rules
pub trait Miner {
    fn mine( &mut self, table: &AttributeTable ) -> MinedRules;
}

/// Result of a mining run: the surviving rules and, per instance, the rules that cover it.
#[derive( Debug )]
pub struct MinedRules {
    pub rules: RuleStore,
    pub covers: CoverIndex,
    pub statistics: MiningStatistics,
}

/// Counters of a mining run, reported in the log.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct MiningStatistics {
    /// itemsets visited, the empty itemset excluded
    pub nodes: u64,
    /// child itemsets discarded for lack of support
    pub support_pruned: u64,
    pub confidence_runs: u64,
    pub confidence_pruned: u64,
    /// rules registered, including those purged later
    pub registered: u64,
    pub purged: usize,
}

/// Enumerates itemsets depth first in increasing column order.
/// A node becomes a rule if it beats all its ancestors on some label and some instance still needs it.
pub struct DepthFirstMiner {
    parameters: MiningParameters,
}

/// Instances reaching a node of the enumeration tree
struct Node<'n> {
    members: &'n [Instance],
    /// inclusion probability per member, `None` while only certain attributes are on the path
    probabilities: Option<&'n [f64]>,
    support: f64,
    /// (expected) number of members per label
    positive_support: &'n [f64],
}

/// State of one run
struct Search<'t> {
    table: &'t AttributeTable,
    parameters: &'t MiningParameters,
    estimator: ConfidenceEstimator,
    cover: CoverManager,
    /// items of the current node in the order they were added
    stack: Vec<Item>,
    store: RuleStore,
    covers: CoverIndex,
    statistics: MiningStatistics,
}

impl Miner for DepthFirstMiner {

    fn mine( &mut self, table: &AttributeTable ) -> MinedRules {
	let mining_span = info_span!( "mining", instances = table.instance_count(), columns = table.column_count() );
	let _guard = mining_span.enter();
	info!( "min support {:.3}, min cover probability {:.3}, {:?} confidences, pruning {}",
	       self.parameters.min_support(), self.parameters.min_cover_prob(),
	       self.parameters.exactness(), self.parameters.pruning() );

	let mut search = Search {
	    table,
	    parameters: &self.parameters,
	    estimator: ConfidenceEstimator::new( self.parameters.pruning() ),
	    cover: CoverManager::new( self.parameters.min_cover_prob() ),
	    stack: Vec::with_capacity( table.column_count() ),
	    store: RuleStore::new(),
	    covers: CoverIndex::new( table.instance_count() ),
	    statistics: MiningStatistics::default(),
	};

	let n = table.instance_count();
	if n == 0 {
	    warn!( "the table holds no instances" );
	} else {
	    let members: Vec<Instance> = ( 0 .. n ).collect();
	    let positive_support: Vec<f64> = table.class_frequencies().iter().map( |count| *count as f64 ).collect();
	    // a rule has to beat the class prior
	    let prior: Vec<f64> = positive_support.iter().map( |count| count / n as f64 ).collect();
	    let root = Node {
		members: &members,
		probabilities: None,
		support: n as f64,
		positive_support: &positive_support,
	    };
	    search.visit( &root, 0, &prior );
	}
	search.finish()
    }
}

impl DepthFirstMiner {
    pub fn new( parameters: MiningParameters ) -> DepthFirstMiner {
	DepthFirstMiner{ parameters }
    }

    pub fn parameters( &self ) -> &MiningParameters {
	&self.parameters
    }
}

impl<'t> Search<'t> {

    /// Scores the node, offers it to the cover manager and descends into the extensions from column `start` on
    fn visit( &mut self, node: &Node, start: usize, ancestor_best: &[f64] ) {
	let mut best = ancestor_best.to_vec();
	if !self.stack.is_empty() {
	    self.statistics.nodes += 1;
	    self.offer( node, &mut best );
	}

	let table = self.table;
	for column in start .. table.certain_count() {
	    self.extend_certain( node, column, &best );
	}
	for column in start.max( table.certain_count() ) .. table.column_count() {
	    self.extend_uncertain( node, column, &best );
	}
    }

    /// Tries to admit the current itemset for every label on which it improves
    fn offer( &mut self, node: &Node, best: &mut [f64] ) {
	let confidences = self.score( node, best );
	let mut rule = Rule::new( Itemset::from_stack( &self.stack ), node.support, confidences );
	let id = self.store.next_token();

	for label in 0 .. best.len() {
	    let confidence = match rule.confidence( label ) {
		Some( confidence ) if confidence > best[ label ] => confidence,
		_ => continue,
	    };
	    let gained = {
		let candidate = Candidate{ id, rule: &rule, members: node.members, probabilities: node.probabilities };
		self.cover.admit( &mut self.covers, &mut self.store, self.table.labels(), &candidate, label )
	    };
	    rule.add_cover( gained );
	    best[ label ] = confidence;
	}

	if rule.cover_count() > 0 {
	    rule.log( "admitted", Level::DEBUG );
	    self.store.register( rule );
	    self.statistics.registered += 1;
	}
    }

    fn score( &mut self, node: &Node, best: &[f64] ) -> Vec<Option<f64>> {
	match node.probabilities {
	    Some( probabilities ) if self.parameters.exactness() == Exactness::Exact => {
		let labels: Vec<Label> = node.members.iter().map( |instance| self.table.label( *instance )).collect();
		self.estimator.node_confidences( &labels, probabilities, node.support, node.positive_support, best )
	    },
	    _ => node.positive_support.iter()
		.map( |positive| Some( ratio( *positive, node.support )))
		.collect(),
	}
    }

    /// Whether a child with this (expected) support is worth exploring
    fn is_frequent( &mut self, support: f64 ) -> bool {
	if support > 0.0 && support >= self.parameters.min_support() {
	    true
	} else {
	    if support > 0.0 {
		self.statistics.support_pruned += 1;
	    }
	    false
	}
    }

    fn extend_certain( &mut self, node: &Node, column: usize, best: &[f64] ) {
	assert!( node.probabilities.is_none(), "certain columns precede uncertain columns" );
	let table = self.table;
	let attribute = table.attribute( column );
	let values = match attribute.column() {
	    Column::Certain( values ) => values,
	    Column::Uncertain( _ ) => unreachable!( "column {column} lies in the certain range" ),
	};

	let mut partitions: Vec<Vec<Instance>> = vec!( Vec::new(); attribute.domain() );
	for instance in node.members {
	    if let Some( value ) = values[ *instance ] {
		partitions[ value ].push( *instance );
	    }
	}

	for (value, members) in partitions.iter().enumerate() {
	    let support = members.len() as f64;
	    if !self.is_frequent( support ) {
		continue;
	    }
	    let mut positive_support = vec!( 0.0; self.table.label_count() );
	    for instance in members {
		positive_support[ self.table.label( *instance ) ] += 1.0;
	    }
	    let child = Node {
		members,
		probabilities: None,
		support,
		positive_support: &positive_support,
	    };
	    self.descend( Item::new( column, value ), &child, best );
	}
    }

    fn extend_uncertain( &mut self, node: &Node, column: usize, best: &[f64] ) {
	let table = self.table;
	let attribute = table.attribute( column );
	for value in 0 .. attribute.domain() {
	    let mut probabilities = Vec::with_capacity( node.members.len() );
	    let mut positive_support = vec!( 0.0; self.table.label_count() );
	    for (position, instance) in node.members.iter().enumerate() {
		let inherited = node.probabilities.map_or( 1.0, |probabilities| probabilities[ position ] );
		let probability = inherited * attribute.probability( *instance, value );
		positive_support[ self.table.label( *instance ) ] += probability;
		probabilities.push( probability );
	    }
	    let support: f64 = probabilities.iter().sum();
	    if !self.is_frequent( support ) {
		continue;
	    }
	    let child = Node {
		members: node.members,
		probabilities: Some( &probabilities[..] ),
		support,
		positive_support: &positive_support,
	    };
	    self.descend( Item::new( column, value ), &child, best );
	}
    }

    fn descend( &mut self, item: Item, child: &Node, best: &[f64] ) {
	self.stack.push( item );
	self.visit( child, item.column + 1, best );
	self.stack.pop();
    }

    fn finish( self ) -> MinedRules {
	let mut statistics = self.statistics;
	statistics.confidence_runs = self.estimator.runs();
	statistics.confidence_pruned = self.estimator.pruned();
	statistics.purged = self.store.purged();

	info!( "visited {} itemsets, {} cut by support", statistics.nodes, statistics.support_pruned );
	info!( "{} confidence computations, {} abandoned", statistics.confidence_runs, statistics.confidence_pruned );
	self.store.log( &format!( "registered {} rules", statistics.registered ), Level::INFO );

	MinedRules{ rules: self.store, covers: self.covers, statistics }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{Attribute, LabelColumn};
    use crate::data::synthetic::{SyntheticShape, generate_table};
    use crate::model::{RuleRecord, records};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn mine( table: &AttributeTable, min_support: f64, min_cover_prob: f64, configure: impl FnOnce( &mut MiningParameters )) -> MinedRules {
	let mut parameters = MiningParameters::new( min_support, min_cover_prob ).unwrap();
	configure( &mut parameters );
	DepthFirstMiner::new( parameters ).mine( table )
    }

    fn synthetic( seed: u64, shape: SyntheticShape ) -> AttributeTable {
	generate_table( &shape, &mut StdRng::seed_from_u64( seed )).unwrap()
    }

    /// Probability that the instance matches every item of the rule
    fn match_probability( table: &AttributeTable, rule: &Rule, instance: Instance ) -> f64 {
	rule.itemset().items().iter()
	    .map( |item| table.attribute( item.column ).probability( instance, item.value ))
	    .product()
    }

    /// (support, positive support per label) of an itemset by scanning the whole table
    fn count( table: &AttributeTable, items: &[Item] ) -> (f64, Vec<f64>) {
	let mut positive = vec!( 0.0; table.label_count() );
	let mut support = 0.0;
	for instance in 0 .. table.instance_count() {
	    let p: f64 = items.iter().map( |item| table.attribute( item.column ).probability( instance, item.value )).product();
	    support += p;
	    positive[ table.label( instance ) ] += p;
	}
	(support, positive)
    }

    fn check_covers( table: &AttributeTable, mined: &MinedRules, min_cover_prob: f64 ) {
	for instance in 0 .. table.instance_count() {
	    let mut uncovered = 1.0;
	    for entry in mined.covers.entries( instance ) {
		// no entry is kept behind entries that already cover the instance
		assert!( 1.0 - uncovered <= min_cover_prob, "redundant entry at instance {instance}" );
		let rule = mined.rules.get( entry.rule ).expect( "entry refers to a stored rule" );
		assert_approx!( entry.probability, match_probability( table, rule, instance ), 1e-9 );
		uncovered *= 1.0 - entry.probability;
	    }
	}
	for (id, rule) in mined.rules.iter() {
	    assert!( rule.cover_count() > 0 );
	    assert_eq!( rule.cover_count() as usize, mined.covers.references( id ));
	    for confidence in rule.confidences().iter().flatten() {
		assert!( ( 0.0 ..= 1.0 ).contains( confidence ), "confidence {confidence} out of range" );
	    }
	}
    }

    #[test]
    fn test_three_instances() {
	let table = AttributeTable::new(
	    vec!( Attribute::certain( 1, 2, vec!( Some( 0 ), Some( 0 ), Some( 1 )))),
	    LabelColumn::new( 0, 2, vec!( 0, 0, 1 ))).unwrap();
	let mined = mine( &table, 1.0, 0.99, |_| {} );

	let records = records( &mined.rules, &table );
	assert_eq!( records, vec!(
	    RuleRecord{ items: vec!( (1, 0) ), support: 2.0, cover_count: 2, confidences: vec!( Some( 1.0 ), Some( 0.0 )) },
	    RuleRecord{ items: vec!( (1, 1) ), support: 1.0, cover_count: 1, confidences: vec!( Some( 0.0 ), Some( 1.0 )) },
	));
	check_covers( &table, &mined, 0.99 );
	assert_eq!( mined.statistics.nodes, 2 );
	assert_eq!( mined.statistics.registered, 2 );
    }

    #[test]
    fn test_equal_confidence_is_not_admitted() {
	// the second attribute repeats the first one
	let values = vec!( Some( 0 ), Some( 0 ), Some( 1 ), Some( 1 ));
	let table = AttributeTable::new(
	    vec!( Attribute::certain( 1, 2, values.clone() ), Attribute::certain( 2, 2, values )),
	    LabelColumn::new( 0, 2, vec!( 0, 0, 1, 1 ))).unwrap();
	let mined = mine( &table, 1.0, 0.5, |_| {} );

	let items: Vec<Vec<(AttributeId, Value)>> = records( &mined.rules, &table ).into_iter().map( |r| r.items ).collect();
	assert_eq!( items, vec!( vec!( (1, 0) ), vec!( (1, 1) )));
	assert_eq!( mined.statistics.nodes, 6 );
    }

    #[test]
    fn test_support_threshold() {
	let table = AttributeTable::new(
	    vec!( Attribute::certain( 1, 2, vec!( Some( 0 ), Some( 0 ), None, Some( 1 )))),
	    LabelColumn::new( 0, 2, vec!( 0, 0, 1, 1 ))).unwrap();
	let mined = mine( &table, 2.0, 0.9, |_| {} );
	assert_eq!( mined.statistics.nodes, 1 );
	assert_eq!( mined.statistics.support_pruned, 1 );
	assert_eq!( records( &mined.rules, &table ).len(), 1 );
    }

    #[test]
    fn test_certain_confidences_are_ratios() {
	let shape = SyntheticShape{ instances: 150, certain: 4, uncertain: 0, labels: 3, ..Default::default() };
	let table = synthetic( 11, shape );
	let mined = mine( &table, 5.0, 0.8, |_| {} );
	assert!( !mined.rules.is_empty() );
	check_covers( &table, &mined, 0.8 );

	let prior: Vec<f64> = table.class_frequencies().iter().map( |c| *c as f64 / 150.0 ).collect();
	for (_, rule) in mined.rules.iter() {
	    let items = rule.itemset().items();
	    let (support, positive) = count( &table, items );
	    assert_eq!( rule.support(), support );
	    for label in 0 .. table.label_count() {
		assert_eq!( rule.confidence( label ), Some( positive[ label ] / support ));
	    }

	    // some label beats the prior and every prefix on the enumeration path
	    let improves = ( 0 .. table.label_count() ).any( |label| {
		let confidence = positive[ label ] / support;
		confidence > prior[ label ] && ( 1 .. items.len() ).all( |k| {
		    // the enumeration adds items by increasing column, so ancestors are suffixes here
		    let (s, p) = count( &table, &items[ items.len() - k .. ] );
		    confidence > p[ label ] / s
		})
	    });
	    assert!( improves, "rule {:?} does not improve on its ancestors", items );
	}
    }

    #[test]
    fn test_uncertain_cover_invariants() {
	let table = synthetic( 3, SyntheticShape{ instances: 120, ..Default::default() } );
	let mined = mine( &table, 8.0, 0.9, |_| {} );
	assert!( !mined.rules.is_empty() );
	assert!( mined.statistics.confidence_runs > 0 );
	check_covers( &table, &mined, 0.9 );

	for (_, rule) in mined.rules.iter() {
	    let (support, _) = count( &table, rule.itemset().items() );
	    assert_approx!( rule.support(), support, 1e-9 );
	}
    }

    /// Runs with and without pruning agree on every rule and every cover list
    fn assert_same_rules( table: &AttributeTable, min_support: f64, min_cover_prob: f64 ) -> u64 {
	let pruned = mine( table, min_support, min_cover_prob, |_| {} );
	let full = mine( table, min_support, min_cover_prob, |parameters| parameters.set_pruning( false ));
	assert_eq!( full.statistics.confidence_pruned, 0 );

	let pruned_records = records( &pruned.rules, table );
	let full_records = records( &full.rules, table );
	assert_eq!( pruned_records.len(), full_records.len() );
	for (left, right) in pruned_records.iter().zip( full_records.iter() ) {
	    assert_eq!( left.items, right.items );
	    assert_eq!( left.support, right.support );
	    assert_eq!( left.cover_count, right.cover_count );
	    for (l, r) in left.confidences.iter().zip( right.confidences.iter() ) {
		if l.is_some() {
		    assert_eq!( l, r );
		}
	    }
	}
	for instance in 0 .. table.instance_count() {
	    assert_eq!( pruned.covers.entries( instance ), full.covers.entries( instance ));
	}
	pruned.statistics.confidence_pruned
    }

    #[test]
    fn test_pruning_keeps_rules() {
	let mut abandoned = 0;
	for seed in 0 .. 40 {
	    let shape = SyntheticShape{ instances: 40, certain: 1, uncertain: 3, labels: 3, ..Default::default() };
	    let table = synthetic( seed, shape );
	    for min_support in [ 1.0, 2.0, 4.0 ] {
		abandoned += assert_same_rules( &table, min_support, 0.9 );
	    }
	}
	// the sweep has to exercise the bound
	assert!( abandoned > 0 );

	let shape = SyntheticShape{ instances: 150, certain: 2, uncertain: 2, labels: 3, ..Default::default() };
	assert_same_rules( &synthetic( 5, shape ), 15.0, 0.85 );
    }

    /// Exact expected confidence of every label for an itemset, over all instances of the table
    fn exact_confidences( table: &AttributeTable, items: &[Item] ) -> Vec<f64> {
	let probabilities: Vec<f64> = ( 0 .. table.instance_count() )
	    .map( |instance| items.iter().map( |item| table.attribute( item.column ).probability( instance, item.value )).product::<f64>() )
	    .collect();
	let (_, positive) = count( table, items );
	let mut estimator = ConfidenceEstimator::new( false );
	( 0 .. table.label_count() )
	    .map( |label| estimator.expected_confidence( table.labels(), &probabilities, label, positive[ label ], 0.0 )
		  .expect( "nothing is abandoned without pruning" ))
	    .collect()
    }

    #[test]
    fn test_uncertain_rules_improve_on_prefixes() {
	let shape = SyntheticShape{ instances: 80, certain: 1, uncertain: 3, labels: 3, ..Default::default() };
	let table = synthetic( 13, shape );
	let mined = mine( &table, 4.0, 0.9, |_| {} );
	assert!( mined.rules.iter().any( |(_, rule)| rule.itemset().items().iter().any( |item| item.column >= table.certain_count() )));

	let prior: Vec<f64> = table.class_frequencies().iter().map( |c| *c as f64 / 80.0 ).collect();
	for (_, rule) in mined.rules.iter() {
	    let items = rule.itemset().items();
	    // ancestors on the enumeration path are suffixes of the itemset
	    let ancestors: Vec<Vec<f64>> = ( 1 .. items.len() )
		.map( |k| exact_confidences( &table, &items[ items.len() - k .. ] ))
		.collect();
	    let improves = ( 0 .. table.label_count() ).any( |label| match rule.confidence( label ) {
		Some( confidence ) => confidence > prior[ label ] &&
		    ancestors.iter().all( |ancestor| confidence + 1e-9 > ancestor[ label ] ),
		None => false,
	    });
	    assert!( improves, "rule {:?} does not improve on its ancestors", items );
	}
    }

    #[test]
    fn test_approximate_confidences() {
	let table = synthetic( 9, SyntheticShape{ instances: 100, ..Default::default() } );
	let mined = mine( &table, 5.0, 0.9, |parameters| parameters.set_exactness( Exactness::Approximate ));
	assert_eq!( mined.statistics.confidence_runs, 0 );
	check_covers( &table, &mined, 0.9 );

	for (_, rule) in mined.rules.iter() {
	    let (support, positive) = count( &table, rule.itemset().items() );
	    for label in 0 .. table.label_count() {
		assert_approx!( rule.confidence( label ).unwrap(), positive[ label ] / support, 1e-9 );
	    }
	}
    }

    #[test]
    fn test_empty_table() {
	let table = AttributeTable::new( Vec::new(), LabelColumn::new( 0, 2, Vec::new() )).unwrap();
	let mined = mine( &table, 1.0, 0.9, |_| {} );
	assert!( mined.rules.is_empty() );
	assert!( mined.covers.is_empty() );
    }
}
