
use serde::Serialize;

use crate::*;
use crate::error::{MineError, Result};
use crate::io::PrettyFormatter;

use super::{Rule, RuleStore};

/// A rule in terms of attribute identifiers, as exchanged with the classifier and the exporter.
#[derive( Debug, Clone, PartialEq, Serialize )]
pub struct RuleRecord {
    /// (attribute id, value) ordered by attribute id
    pub items: Vec<(AttributeId, Value)>,
    pub support: f64,
    pub cover_count: Count,
    /// `None` where the confidence was not computed
    pub confidences: Vec<Option<f64>>,
}

/// Writes one rule per line: `{3: 1, 5: 0} : 12.5 (4) / 0: 0.25, 1: 0.75`
pub struct RuleFormatter;

impl RuleRecord {
    pub fn from_rule( rule: &Rule, table: &AttributeTable ) -> RuleRecord {
	let mut items: Vec<(AttributeId, Value)> = rule.itemset().items().iter()
	    .map( |item| (table.attribute( item.column ).id(), item.value) )
	    .collect();
	items.sort();
	RuleRecord {
	    items,
	    support: rule.support(),
	    cover_count: rule.cover_count(),
	    confidences: rule.confidences().to_vec(),
	}
    }
}

/// Converts the store into records ordered by decreasing cover count
pub fn records( store: &RuleStore, table: &AttributeTable ) -> Vec<RuleRecord> {
    store.ordered().into_iter()
	.map( |(_, rule)| RuleRecord::from_rule( rule, table ))
	.collect()
}

impl PrettyFormatter<RuleRecord> for RuleFormatter {

    fn format_pretty( &self, record: &RuleRecord ) -> String {
	let items: Vec<String> = record.items.iter()
	    .map( |(attribute, value)| format!( "{attribute}: {value}" ))
	    .collect();
	let confidences: Vec<String> = record.confidences.iter().enumerate()
	    .map( |(label, confidence)| format!( "{label}: {}", format_decimal( confidence.unwrap_or( -1.0 ), 1, 4 )))
	    .collect();
	format!( "{{{}}} : {} ({}) / {}",
		 items.join( ", " ), format_decimal( record.support, 0, 4 ), record.cover_count, confidences.join( ", " ))
    }
}

/// Formats with at most max_digits decimals, dropping trailing zeros beyond min_digits
pub fn format_decimal( number: f64, min_digits: usize, max_digits: usize ) -> String {
    let mut text = format!( "{number:.max_digits$}" );
    if max_digits > 0 {
	let point = text.find( '.' ).expect( "fixed precision output has a decimal point" );
	while text.len() > point + 1 + min_digits && text.ends_with( '0' ) {
	    text.pop();
	}
	if text.ends_with( '.' ) {
	    text.pop();
	}
    }
    if text == "-0" || text.starts_with( "-0." ) && text[ 3 .. ].chars().all( |c| c == '0' ) {
	text.remove( 0 );
    }
    text
}

/// Parses a line written by the [`RuleFormatter`].
/// Negative confidences mark values that were not computed.
pub fn parse_rule( line: &str, line_number: usize ) -> Result<RuleRecord> {
    let error = |message: &str| MineError::format( line_number, format!( "{message} in rule '{line}'" ));

    let line = line.trim();
    let body_start = line.find( '{' ).ok_or_else( || error( "missing '{'" ))?;
    let body_end = line.find( '}' ).ok_or_else( || error( "missing '}'" ))?;
    if body_end < body_start {
	return Err( error( "misplaced '}'" ));
    }

    let mut items = Vec::new();
    for chunk in line[ body_start + 1 .. body_end ].split( ',' ).map( str::trim ).filter( |c| !c.is_empty() ) {
	let (attribute, value) = chunk.split_once( ':' ).ok_or_else( || error( "item without ':'" ))?;
	let attribute = attribute.trim().parse::<AttributeId>().map_err( |_| error( "bad attribute id" ))?;
	let value = value.trim().parse::<Value>().map_err( |_| error( "bad attribute value" ))?;
	items.push( (attribute, value) );
    }

    let rest = line[ body_end + 1 .. ].trim_start();
    let rest = rest.strip_prefix( ':' ).ok_or_else( || error( "missing ':' after itemset" ))?;
    let (support, rest) = rest.split_once( '(' ).ok_or_else( || error( "missing cover count" ))?;
    let support = support.trim().parse::<f64>().map_err( |_| error( "bad support" ))?;
    let (cover_count, rest) = rest.split_once( ')' ).ok_or_else( || error( "unterminated cover count" ))?;
    let cover_count = cover_count.trim().parse::<Count>().map_err( |_| error( "bad cover count" ))?;
    let rest = rest.trim_start().strip_prefix( '/' ).ok_or_else( || error( "missing '/'" ))?;

    let mut confidences = Vec::new();
    for (position, chunk) in rest.split( ',' ).map( str::trim ).filter( |c| !c.is_empty() ).enumerate() {
	let (label, confidence) = chunk.split_once( ':' ).ok_or_else( || error( "confidence without label" ))?;
	let label = label.trim().parse::<Label>().map_err( |_| error( "bad label" ))?;
	if label != position {
	    return Err( error( "confidences out of label order" ));
	}
	let confidence = confidence.trim().parse::<f64>().map_err( |_| error( "bad confidence" ))?;
	confidences.push( if confidence < 0.0 { None } else { Some( confidence ) } );
    }

    Ok( RuleRecord{ items, support, cover_count, confidences } )
}
