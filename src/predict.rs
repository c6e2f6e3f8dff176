
use rayon::prelude::*;

use crate::*;
use crate::data::Column;
use crate::error::Result;
use crate::model::{Item, RuleRecord, format_decimal};

/// The items of a rule read from a rule file, with their attributes located in a table.
#[derive( Debug, Clone, PartialEq )]
pub struct Antecedent {
    items: Vec<Item>,
}

/// An antecedent together with a confidence for every label of the table
#[derive( Debug, Clone, PartialEq )]
pub struct ResolvedRule {
    antecedent: Antecedent,
    /// values that were not computed are filled in
    confidences: Vec<f64>,
}

/// Predicted label per instance
#[derive( Debug, Clone, PartialEq )]
pub struct Predictions {
    pub labels: Vec<Label>,
    pub accuracy: f64,
}

/// Predicts the label with the largest confidence mass of the matching rules.
pub struct Classifier {
    rules: Vec<ResolvedRule>,
}

/// Turns rule match probabilities into sparse feature vectors.
pub struct FeatureExporter {
    rules: Vec<Antecedent>,
}

impl Antecedent {

    /// Looks up the attributes of the record. The confidences are not needed here.
    pub fn resolve( record: &RuleRecord, table: &AttributeTable ) -> Result<Antecedent> {
	let mut items = Vec::with_capacity( record.items.len() );
	for (id, value) in &record.items {
	    let (column, _) = table.find( *id ).ok_or( MineError::UnknownAttribute{ id: *id } )?;
	    items.push( Item::new( column, *value ));
	}
	Ok( Antecedent{ items } )
    }

    /// Probability that the instance satisfies every item.
    /// Certain attributes have to match exactly, uncertain ones contribute the probability of the value.
    pub fn match_probability( &self, table: &AttributeTable, instance: Instance ) -> f64 {
	let mut probability = 1.0;
	for item in &self.items {
	    probability *= match table.attribute( item.column ).column() {
		Column::Certain( values ) => if values[ instance ] == Some( item.value ) { 1.0 } else { 0.0 },
		Column::Uncertain( rows ) => rows[ instance ].get( item.value ).copied().unwrap_or( 0.0 ),
	    };
	    if probability == 0.0 {
		break;
	    }
	}
	probability
    }
}

impl ResolvedRule {

    pub fn resolve( record: &RuleRecord, table: &AttributeTable ) -> Result<ResolvedRule> {
	if record.confidences.len() != table.label_count() {
	    return Err( MineError::configuration( format!(
		"rule {:?} has {} confidences but the label has {} values",
		record.items, record.confidences.len(), table.label_count() )));
	}
	let antecedent = Antecedent::resolve( record, table )?;
	Ok( ResolvedRule{ antecedent, confidences: fill_unknown( &record.confidences ) } )
    }

    pub fn antecedent( &self ) -> &Antecedent { &self.antecedent }
    pub fn confidences( &self ) -> &[f64] { &self.confidences }
}

/// Shares the mass left by the known confidences equally among the unknown ones
fn fill_unknown( confidences: &[Option<f64>] ) -> Vec<f64> {
    let unknown = confidences.iter().filter( |c| c.is_none() ).count();
    let known: f64 = confidences.iter().flatten().sum();
    confidences.iter()
	.map( |confidence| confidence.unwrap_or_else( || ( 1.0 - known ) / unknown as f64 ))
	.collect()
}

impl Classifier {

    pub fn new( records: &[RuleRecord], table: &AttributeTable ) -> Result<Classifier> {
	let rules = records.iter()
	    .map( |record| ResolvedRule::resolve( record, table ))
	    .collect::<Result<Vec<ResolvedRule>>>()?;
	Ok( Classifier{ rules } )
    }

    /// Confidence mass per label, weighted by the match probability of every rule
    pub fn scores( &self, table: &AttributeTable, instance: Instance ) -> Vec<f64> {
	let mut scores = vec!( 0.0; table.label_count() );
	for rule in &self.rules {
	    let probability = rule.antecedent().match_probability( table, instance );
	    if probability > 0.0 {
		for (score, confidence) in scores.iter_mut().zip( rule.confidences() ) {
		    *score += confidence * probability;
		}
	    }
	}
	scores
    }

    /// First label with the highest score
    pub fn predict( &self, table: &AttributeTable, instance: Instance ) -> Label {
	let mut label = 0;
	let mut max_score = -1.0;
	for (candidate, score) in self.scores( table, instance ).into_iter().enumerate() {
	    if score > max_score {
		label = candidate;
		max_score = score;
	    }
	}
	label
    }

    pub fn classify( &self, table: &AttributeTable ) -> Predictions {
	let labels: Vec<Label> = ( 0 .. table.instance_count() ).into_par_iter()
	    .map( |instance| self.predict( table, instance ))
	    .collect();
	let correct = labels.iter().zip( table.labels() ).filter( |(predicted, real)| predicted == real ).count();
	let accuracy = if labels.is_empty() { 0.0 } else { correct as f64 / labels.len() as f64 };
	info!( "{correct} of {} instances classified correctly", labels.len() );
	Predictions{ labels, accuracy }
    }
}

impl FeatureExporter {

    pub fn new( records: &[RuleRecord], table: &AttributeTable ) -> Result<FeatureExporter> {
	let rules = records.iter()
	    .map( |record| Antecedent::resolve( record, table ))
	    .collect::<Result<Vec<Antecedent>>>()?;
	Ok( FeatureExporter{ rules } )
    }

    /// `<target> <feature>:<probability> ...` with features numbered from 1 in rule order
    pub fn export_line( &self, table: &AttributeTable, instance: Instance ) -> String {
	let label = table.label( instance );
	let mut line = if table.label_count() == 2 {
	    String::from( if label == 1 { "+1" } else { "-1" } )
	} else {
	    ( label + 1 ).to_string()
	};
	for (index, rule) in self.rules.iter().enumerate() {
	    let probability = rule.match_probability( table, instance );
	    if probability > 0.0 {
		line.push_str( &format!( " {}:{}", index + 1, format_decimal( probability, 1, 4 )));
	    }
	}
	line
    }

    pub fn export( &self, table: &AttributeTable ) -> Vec<String> {
	let lines: Vec<String> = ( 0 .. table.instance_count() ).into_par_iter()
	    .map( |instance| self.export_line( table, instance ))
	    .collect();
	debug!( "exported {} instances over {} features", lines.len(), self.rules.len() );
	lines
    }
}
